/*!
Mock instrument server for development without flight hardware

Stands in for the BCP telemetry and heater servers: answers one datagram per
request from a per-channel script, stays silent where told to (so clients see
real timeouts), and records every request for assertions.
*/

use anyhow::Result;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

/// What the stub does with one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Text(String),
    /// Send nothing; the client's timeout fires.
    Silent,
}

impl Reply {
    pub fn text<S: Into<String>>(s: S) -> Self {
        Reply::Text(s.into())
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub payload: String,
    pub from: SocketAddr,
}

#[derive(Debug, Default)]
struct Script {
    /// One-shot replies, consumed before `steady`.
    queued: VecDeque<Reply>,
    steady: Option<Reply>,
}

#[derive(Debug)]
struct Inner {
    scripts: HashMap<String, Script>,
    fallback: Reply,
    requests: Vec<RecordedRequest>,
}

impl Inner {
    fn reply_for(&mut self, payload: &str) -> Reply {
        let fallback = &self.fallback;
        match self.scripts.get_mut(payload) {
            Some(script) => script
                .queued
                .pop_front()
                .or_else(|| script.steady.clone())
                .unwrap_or_else(|| fallback.clone()),
            None => fallback.clone(),
        }
    }
}

/// UDP responder bound to an ephemeral localhost port.
pub struct MockInstrumentServer {
    addr: SocketAddr,
    inner: Arc<Mutex<Inner>>,
    task: JoinHandle<()>,
}

impl MockInstrumentServer {
    /// Binds `127.0.0.1:0` and starts answering. Unknown channels get no reply.
    pub async fn start() -> Result<Self> {
        let socket = UdpSocket::bind("127.0.0.1:0").await?;
        let addr = socket.local_addr()?;
        let inner = Arc::new(Mutex::new(Inner {
            scripts: HashMap::new(),
            fallback: Reply::Silent,
            requests: Vec::new(),
        }));

        let state = inner.clone();
        let task = tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            loop {
                let (len, from) = match socket.recv_from(&mut buf).await {
                    Ok(received) => received,
                    Err(e) => {
                        log::warn!("[MOCK] recv failed: {}", e);
                        continue;
                    }
                };
                let payload = String::from_utf8_lossy(&buf[..len]).to_string();

                let reply = {
                    let mut inner = state.lock();
                    inner.requests.push(RecordedRequest {
                        payload: payload.clone(),
                        from,
                    });
                    inner.reply_for(&payload)
                };

                match reply {
                    Reply::Text(text) => {
                        if let Err(e) = socket.send_to(text.as_bytes(), from).await {
                            log::warn!("[MOCK] reply to {} failed: {}", from, e);
                        }
                        log::debug!("[MOCK] {} -> {:?}", payload, text);
                    }
                    Reply::Silent => log::debug!("[MOCK] {} -> (silent)", payload),
                }
            }
        });

        log::info!("[MOCK] instrument server listening on {}", addr);
        Ok(Self { addr, inner, task })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn host(&self) -> String {
        self.addr.ip().to_string()
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Answers `channel` with `text` on every request.
    pub fn set_reply<C: Into<String>, S: Into<String>>(&self, channel: C, text: S) {
        self.set(channel, Reply::Text(text.into()));
    }

    /// Never answers `channel`.
    pub fn set_silent<C: Into<String>>(&self, channel: C) {
        self.set(channel, Reply::Silent);
    }

    pub fn set<C: Into<String>>(&self, channel: C, reply: Reply) {
        self.inner
            .lock()
            .scripts
            .entry(channel.into())
            .or_default()
            .steady = Some(reply);
    }

    /// Queues a one-shot reply used before the steady one.
    pub fn queue<C: Into<String>>(&self, channel: C, reply: Reply) {
        self.inner
            .lock()
            .scripts
            .entry(channel.into())
            .or_default()
            .queued
            .push_back(reply);
    }

    /// Reply for channels without a script.
    pub fn set_fallback(&self, reply: Reply) {
        self.inner.lock().fallback = reply;
    }

    /// Answers every listed channel.
    pub fn load_replies<I, C, S>(&self, replies: I)
    where
        I: IntoIterator<Item = (C, S)>,
        C: Into<String>,
        S: Into<String>,
    {
        for (channel, text) in replies {
            self.set_reply(channel, text);
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.inner.lock().requests.clone()
    }

    pub fn request_count(&self, channel: &str) -> usize {
        self.inner
            .lock()
            .requests
            .iter()
            .filter(|r| r.payload == channel)
            .count()
    }

    pub fn total_requests(&self) -> usize {
        self.inner.lock().requests.len()
    }

    /// Forgets recorded requests; scripts stay.
    pub fn clear_requests(&self) {
        self.inner.lock().requests.clear();
    }

    /// Drops every script and recorded request.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.scripts.clear();
        inner.requests.clear();
        inner.fallback = Reply::Silent;
    }
}

impl Drop for MockInstrumentServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    async fn ask(server: &MockInstrumentServer, payload: &str) -> Option<String> {
        let sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sock.send_to(payload.as_bytes(), server.addr()).await.unwrap();
        let mut buf = [0u8; 1024];
        match timeout(Duration::from_millis(200), sock.recv_from(&mut buf)).await {
            Ok(Ok((n, _))) => Some(String::from_utf8_lossy(&buf[..n]).to_string()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn test_steady_and_queued_replies() {
        let server = MockInstrumentServer::start().await.unwrap();
        server.set_reply("hk_powered", "1");
        server.queue("hk_powered", Reply::Silent);
        server.queue("hk_powered", Reply::text("0"));

        assert_eq!(ask(&server, "hk_powered").await, None);
        assert_eq!(ask(&server, "hk_powered").await.as_deref(), Some("0"));
        assert_eq!(ask(&server, "hk_powered").await.as_deref(), Some("1"));
        assert_eq!(server.request_count("hk_powered"), 3);
    }

    #[tokio::test]
    async fn test_unknown_channel_uses_fallback() {
        let server = MockInstrumentServer::start().await.unwrap();
        assert_eq!(ask(&server, "nope").await, None);

        server.set_fallback(Reply::text("N/A"));
        assert_eq!(ask(&server, "nope").await.as_deref(), Some("N/A"));

        server.reset();
        assert_eq!(server.total_requests(), 0);
    }

    #[tokio::test]
    async fn test_clear_requests_keeps_scripts() {
        let server = MockInstrumentServer::start().await.unwrap();
        server.set_reply("pos_status", "tracking");
        ask(&server, "pos_status").await;
        assert_eq!(server.total_requests(), 1);

        server.clear_requests();
        assert_eq!(server.total_requests(), 0);
        assert_eq!(ask(&server, "pos_status").await.as_deref(), Some("tracking"));
        assert_eq!(server.request_count("pos_status"), 1);
    }
}
