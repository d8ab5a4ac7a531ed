//! Qualitative buckets for raw readings, used to colour displays.

use crate::channels::UNSET_READING;
use serde::Serialize;
use std::fmt;

pub const TEMP_WARNING_ABOVE: f64 = 60.0;
/// Readings at or above this are critical.
pub const TEMP_CRITICAL_FROM: f64 = 80.0;
pub const TEMP_CRITICAL_BELOW: f64 = 0.0;
/// 25 PSI expressed in bar.
pub const PRESSURE_MAX_BAR: f64 = 1.72;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureStatus {
    Normal,
    Warning,
    Critical,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PressureStatus {
    Normal,
    Warning,
    Invalid,
}

impl TemperatureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemperatureStatus::Normal => "normal",
            TemperatureStatus::Warning => "warning",
            TemperatureStatus::Critical => "critical",
            TemperatureStatus::Error => "error",
        }
    }
}

impl PressureStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PressureStatus::Normal => "normal",
            PressureStatus::Warning => "warning",
            PressureStatus::Invalid => "invalid",
        }
    }
}

impl fmt::Display for TemperatureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PressureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn temperature_status(celsius: f64) -> TemperatureStatus {
    if celsius == UNSET_READING {
        TemperatureStatus::Error
    } else if celsius < TEMP_CRITICAL_BELOW || celsius >= TEMP_CRITICAL_FROM {
        TemperatureStatus::Critical
    } else if celsius > TEMP_WARNING_ABOVE {
        TemperatureStatus::Warning
    } else {
        TemperatureStatus::Normal
    }
}

pub fn pressure_status(bar: f64) -> PressureStatus {
    if bar == UNSET_READING {
        PressureStatus::Invalid
    } else if (0.0..=PRESSURE_MAX_BAR).contains(&bar) {
        PressureStatus::Normal
    } else {
        PressureStatus::Warning
    }
}
