//! Change log (`.changes`) line format.
//!
//! Each line is tab separated:
//!
//! ```text
//! date  ip  type  id  user  summary  extra  [size-change]
//! ```
//!
//! The trailing size delta only exists in logs written by newer releases.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::node::Timestamp;

/// Minimum number of fields a change line must carry (date to user).
const MIN_FIELDS: usize = 5;

/// Reasons a change line cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChangeLineError {
    #[error("expected at least {MIN_FIELDS} tab separated fields, found {found}")]
    TooFewFields { found: usize },

    #[error("'{value}' is not a timestamp")]
    BadTimestamp { value: String },

    #[error("'{value}' is not a size change")]
    BadSizeChange { value: String },
}

/// Kind of edit recorded in the change log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeType {
    Create,
    Edit,
    MinorEdit,
    Delete,
    Revert,
    /// Any other flag, kept verbatim.
    Other(String),
}

impl ChangeType {
    fn from_flag(flag: &str) -> Self {
        match flag {
            "C" => Self::Create,
            "E" => Self::Edit,
            "e" => Self::MinorEdit,
            "D" => Self::Delete,
            "R" => Self::Revert,
            other => Self::Other(other.to_string()),
        }
    }

    /// Single-letter flag as written in the log.
    pub fn flag(&self) -> &str {
        match self {
            Self::Create => "C",
            Self::Edit => "E",
            Self::MinorEdit => "e",
            Self::Delete => "D",
            Self::Revert => "R",
            Self::Other(flag) => flag,
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.flag())
    }
}

/// One decoded change log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub timestamp: Timestamp,
    /// Editor IP address.
    pub ip: String,
    pub change_type: ChangeType,
    /// Full page id as written by the wiki (`ns:page`).
    pub id: String,
    /// Editor login, empty for anonymous edits.
    pub user: String,
    pub summary: String,
    /// Extra flags (revert target, etc.).
    pub extra: String,
    pub size_change: Option<i64>,
}

impl FromStr for ChangeRecord {
    type Err = ChangeLineError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
        if fields.len() < MIN_FIELDS {
            return Err(ChangeLineError::TooFewFields {
                found: fields.len(),
            });
        }

        let timestamp = fields[0]
            .parse::<u64>()
            .map(Timestamp)
            .map_err(|_| ChangeLineError::BadTimestamp {
                value: fields[0].to_string(),
            })?;

        let size_change = match fields.get(7).copied().filter(|v| !v.is_empty()) {
            Some(value) => Some(value.parse::<i64>().map_err(|_| {
                ChangeLineError::BadSizeChange {
                    value: value.to_string(),
                }
            })?),
            None => None,
        };

        let field = |i: usize| fields.get(i).copied().unwrap_or_default().to_string();

        Ok(Self {
            timestamp,
            ip: field(1),
            change_type: ChangeType::from_flag(fields[2]),
            id: field(3),
            user: field(4),
            summary: field(5),
            extra: field(6),
            size_change,
        })
    }
}

/// Decode every non-empty line, keeping 1-based line numbers for failures.
pub fn parse_change_log(raw: &str) -> Vec<(usize, Result<ChangeRecord, ChangeLineError>)> {
    raw.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| (i + 1, line.parse()))
        .collect()
}
