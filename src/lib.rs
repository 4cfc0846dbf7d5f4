//! Spectrum Scale checks: strongly typed Nagios/Sensu checks for GPFS
//!
//! The library half of `check-spectrum-scale`. It knows how to find and run
//! the Spectrum Scale administration tools, how to pull typed values out of
//! their `-Y` (colon separated) output, and how to turn those values into a
//! check result that a monitoring system understands.
//!
//! Expected use: build a `Check`, run it against an `Mmfs` installation and
//! hand the result to `report`, which prints it and exits:
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use check_spectrum_scale::mmfs::{Mmfs, DEFAULT_BIN_DIR};
//! use check_spectrum_scale::node_status::{Mode, NodeStatusCheck, Thresholds};
//! use check_spectrum_scale::{report, Check, Status};
//!
//! let mmfs = Mmfs::new(DEFAULT_BIN_DIR, Duration::from_secs(10));
//! let check = NodeStatusCheck {
//!     mode: Mode::Quorum,
//!     thresholds: Thresholds::default(),
//!     command_error: Status::Unknown,
//! };
//! report(check.run(&mmfs));
//! ```

use std::error::Error as StdError;
use std::fmt;
use std::process;
use std::str::FromStr;

use derive_more::From;
use serde::Deserialize;

pub mod check;
pub mod mmfs;
pub mod node_status;
pub mod perfdata;

pub use crate::check::{report, Check, CheckResult};
pub use crate::perfdata::PerfData;

use crate::mmfs::command::CommandError;
use crate::mmfs::table::{NonNumericField, TableError};
use crate::mmfs::NotInstalled;

/// The verdict of a check, and the exit code that goes with it
///
/// Ordered by how bad things are, so `max` of two statuses is the one to
/// report.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Status {
    /// The process exit code monitoring systems expect for this status
    pub fn code(self) -> i32 {
        match self {
            Status::Ok => 0,
            Status::Warning => 1,
            Status::Critical => 2,
            Status::Unknown => 3,
        }
    }

    pub fn exit(self) -> ! {
        process::exit(self.code())
    }

    pub fn str_values() -> [&'static str; 4] {
        ["ok", "warning", "critical", "unknown"]
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Status, String> {
        match s {
            "ok" => Ok(Status::Ok),
            "warn" | "warning" => Ok(Status::Warning),
            "crit" | "critical" => Ok(Status::Critical),
            "unknown" => Ok(Status::Unknown),
            _ => Err(format!(
                "Unexpected status '{}', expected one of {}",
                s,
                Status::str_values().join(", ")
            )),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match *self {
            Status::Ok => "OK",
            Status::Warning => "WARNING",
            Status::Critical => "CRITICAL",
            Status::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// Everything that can go wrong between finding the tools and having a
/// typed view of their output
///
/// Every error in this crate can be converted into an `Error`
#[derive(Debug, From)]
pub enum Error {
    /// The Spectrum Scale tools are not installed on this host
    NotInstalled(NotInstalled),
    /// Running an administration command failed
    Command(CommandError),
    /// The command output did not have the expected shape
    Table(TableError),
    /// A field that should have been a number wasn't
    NonNumeric(NonNumericField),
}

impl Error {
    /// The status a check should report when it fails with this error
    ///
    /// A missing installation or tool is always critical. `command_error` is
    /// used when the tool was found but failed, hung or printed something
    /// unreadable; output that doesn't parse is always unknown.
    pub fn status(&self, command_error: Status) -> Status {
        match self {
            Error::NotInstalled(_) => Status::Critical,
            Error::Command(CommandError::NotFound(_)) => Status::Critical,
            Error::Command(_) => command_error,
            Error::Table(_) | Error::NonNumeric(_) => Status::Unknown,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::NotInstalled(e) => write!(f, "{}", e),
            Error::Command(e) => write!(f, "{}", e),
            Error::Table(e) => write!(f, "unexpected mmgetstate output: {}", e),
            Error::NonNumeric(e) => write!(f, "unexpected mmgetstate output: {}", e),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::NotInstalled(e) => Some(e),
            Error::Command(e) => Some(e),
            Error::Table(e) => Some(e),
            Error::NonNumeric(e) => Some(e),
        }
    }
}
