//! Check results and how they leave the process

use crate::mmfs::Mmfs;
use crate::perfdata::{self, PerfData};
use crate::{Error, Status};

/// Something that can be checked against a Spectrum Scale installation
pub trait Check {
    /// Run the check. `None` means the check had nothing to report.
    fn run(&self, mmfs: &Mmfs) -> Option<CheckResult>;
}

/// The outcome of a single check invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    status: Status,
    message: String,
    perfdata: Vec<PerfData>,
}

impl CheckResult {
    pub fn new<S: Into<String>>(status: Status, message: S) -> CheckResult {
        CheckResult {
            status,
            message: message.into(),
            perfdata: Vec::new(),
        }
    }

    /// A result describing `err`, reported as `status`
    pub fn from_error(status: Status, err: &Error) -> CheckResult {
        CheckResult::new(status, format!("{} - {}", status, err))
    }

    pub fn with_perfdata(mut self, metric: PerfData) -> CheckResult {
        self.perfdata.push(metric);
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn perfdata(&self) -> &[PerfData] {
        &self.perfdata
    }

    /// The line monitoring systems read: `message|perfdata`
    pub fn render(&self) -> String {
        format!("{}|{}", self.message, perfdata::join(&self.perfdata))
    }

    /// Print the result and exit with its status code
    pub fn exit(&self) -> ! {
        println!("{}", self.render());
        self.status.exit()
    }
}

/// Print `result` and exit, or go critical if there is no result at all
pub fn report(result: Option<CheckResult>) -> ! {
    match result {
        Some(result) => result.exit(),
        None => CheckResult::new(Status::Critical, "CRITICAL - Error in script").exit(),
    }
}
