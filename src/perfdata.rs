//! Performance data in the Nagios plugin format
//!
//! A metric renders as `label=value;warn;crit;min;max`. A metric without
//! any thresholds or bounds renders as just `label=value`; as soon as one of
//! them is set all four slots are written, left empty where unset.

use std::fmt;

/// A single performance metric
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerfData {
    label: String,
    value: i64,
    warn: Option<i64>,
    crit: Option<i64>,
    min: Option<i64>,
    max: Option<i64>,
}

impl PerfData {
    pub fn new<S: Into<String>>(label: S, value: i64) -> PerfData {
        PerfData {
            label: label.into(),
            value,
            warn: None,
            crit: None,
            min: None,
            max: None,
        }
    }

    pub fn with_warn(mut self, warn: i64) -> PerfData {
        self.warn = Some(warn);
        self
    }

    pub fn with_crit(mut self, crit: i64) -> PerfData {
        self.crit = Some(crit);
        self
    }

    pub fn with_thresholds(self, warn: i64, crit: i64) -> PerfData {
        self.with_warn(warn).with_crit(crit)
    }

    pub fn with_bounds(mut self, min: i64, max: i64) -> PerfData {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn value(&self) -> i64 {
        self.value
    }

    fn has_extras(&self) -> bool {
        self.warn.is_some() || self.crit.is_some() || self.min.is_some() || self.max.is_some()
    }
}

struct Slot(Option<i64>);

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{}", v),
            None => Ok(()),
        }
    }
}

impl fmt::Display for PerfData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}={}", self.label, self.value)?;
        if self.has_extras() {
            write!(
                f,
                ";{};{};{};{}",
                Slot(self.warn),
                Slot(self.crit),
                Slot(self.min),
                Slot(self.max)
            )?;
        }
        Ok(())
    }
}

/// Join metrics the way plugins print them: space separated
pub fn join(metrics: &[PerfData]) -> String {
    metrics
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
