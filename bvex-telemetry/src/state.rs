use std::sync::Arc;
use tokio::sync::Mutex;

/// A client shared between a polling task and its readers.
///
/// The lock is held for a whole poll cycle, which keeps at most one request
/// batch in flight per client.
pub type Shared<T> = Arc<Mutex<T>>;

pub fn new_state<T>(value: T) -> Shared<T> {
    Arc::new(Mutex::new(value))
}
