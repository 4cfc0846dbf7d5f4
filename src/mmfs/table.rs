//! The `-Y` output format shared by the `mm*` commands
//!
//! The first line names the columns, each following line is one record,
//! and fields are separated by colons:
//!
//! ```plain
//! mmgetstate::HEADER:version:reserved:reserved:nodeName:nodeNumber:state:quorum:nodesUp:totalNodes:remarks:cnfsState:
//! mmgetstate::0:1:::gpfs01:1:active:2:3:3:quorum node:(undefined):
//! ```
//!
//! Values are looked up by column name and row number. Nothing here knows
//! what the values mean; `lookup` returns the raw text.

use std::error::Error as StdError;
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use crate::Error;

pub const SEPARATOR: char = ':';

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// The header has no column with this name
    ColumnNotFound { column: String },
    /// The row doesn't exist, or is too short to have the column
    RowOutOfRange { column: String, row: usize },
}

impl fmt::Display for TableError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TableError::ColumnNotFound { column } => write!(f, "no column named '{}'", column),
            TableError::RowOutOfRange { column, row } => {
                write!(f, "no value for '{}' in row {}", column, row)
            }
        }
    }
}

impl StdError for TableError {}

/// A field that was expected to be a non-negative integer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonNumericField {
    pub column: String,
    pub value: String,
    pub source: ParseIntError,
}

impl fmt::Display for NonNumericField {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "'{}' should be a non-negative integer, got '{}'",
            self.column, self.value
        )
    }
}

impl StdError for NonNumericField {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.source)
    }
}

/// Parsed `-Y` output. Row 0 is the header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Table {
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Split `raw` into rows and fields. Blank lines are skipped.
    pub fn parse(raw: &str) -> Table {
        let rows = raw
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| line.split(SEPARATOR).map(str::to_owned).collect())
            .collect();
        Table { rows }
    }

    /// Number of rows, including the header
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Position of `column` in the header
    pub fn column(&self, column: &str) -> Result<usize, TableError> {
        self.header()
            .and_then(|header| header.iter().position(|name| name == column))
            .ok_or_else(|| TableError::ColumnNotFound {
                column: column.to_owned(),
            })
    }

    /// The raw value of `column` in `row`
    pub fn lookup(&self, column: &str, row: usize) -> Result<&str, TableError> {
        let idx = self.column(column)?;
        self.rows
            .get(row)
            .and_then(|fields| fields.get(idx))
            .map(String::as_str)
            .ok_or_else(|| TableError::RowOutOfRange {
                column: column.to_owned(),
                row,
            })
    }

    /// The value of `column` in `row`, parsed as `T`. With an unsigned `T`
    /// negative or oversized values fail like any other non-numeric text.
    pub fn lookup_int<T>(&self, column: &str, row: usize) -> Result<T, Error>
    where
        T: FromStr<Err = ParseIntError>,
    {
        let value = self.lookup(column, row)?;
        value.trim().parse::<T>().map_err(|source| {
            NonNumericField {
                column: column.to_owned(),
                value: value.to_owned(),
                source,
            }
            .into()
        })
    }
}
