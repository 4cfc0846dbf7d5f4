//! Interact with an installed IBM Spectrum Scale (GPFS)
//!
//! Everything here goes through the `mm*` administration commands, always
//! asking for their `-Y` machine readable output.

use std::error::Error as StdError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::debug;

use crate::Error;

pub mod command;
pub mod table;

use self::table::Table;

/// Where Spectrum Scale puts its administration commands
pub const DEFAULT_BIN_DIR: &str = "/usr/lpp/mmfs/bin";

/// The Spectrum Scale tools could not be found
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotInstalled {
    pub bin_dir: PathBuf,
}

impl fmt::Display for NotInstalled {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "No IBM Spectrum Scale installation detected in {}",
            self.bin_dir.display()
        )
    }
}

impl StdError for NotInstalled {}

/// A local Spectrum Scale installation
#[derive(Debug, Clone)]
pub struct Mmfs {
    bin_dir: PathBuf,
    timeout: Duration,
}

impl Mmfs {
    /// `timeout` bounds every command run through this installation
    pub fn new<P: Into<PathBuf>>(bin_dir: P, timeout: Duration) -> Mmfs {
        Mmfs {
            bin_dir: bin_dir.into(),
            timeout,
        }
    }

    pub fn bin_dir(&self) -> &Path {
        &self.bin_dir
    }

    fn tool(&self, name: &str) -> PathBuf {
        self.bin_dir.join(name)
    }

    /// Either the bin directory or `mmgetstate` itself must exist
    pub fn is_installed(&self) -> bool {
        self.bin_dir.is_dir() || self.tool("mmgetstate").is_file()
    }

    pub fn ensure_installed(&self) -> Result<(), NotInstalled> {
        if self.is_installed() {
            Ok(())
        } else {
            Err(NotInstalled {
                bin_dir: self.bin_dir.clone(),
            })
        }
    }

    /// Run `mmgetstate -LY` and parse what it printed
    pub fn getstate(&self) -> Result<Table, Error> {
        let output = command::run(&self.tool("mmgetstate"), &["-LY"], self.timeout)?;
        let table = Table::parse(&output);
        debug!(rows = table.len(), "parsed mmgetstate output");
        Ok(table)
    }
}
