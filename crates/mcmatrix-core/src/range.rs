//! Version-range expressions written into artifact descriptors.
//!
//! A compatibility run's revision list is folded into a single range
//! expression whose syntax depends on the descriptor format: JSON
//! descriptors take inclusive min/max operators (`>=1.20 <=1.21`), TOML
//! descriptors take maven-style bracket intervals (`[1.20,1.21]`).

use crate::record::FUTURE_SENTINEL;

/// Descriptor range syntax flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeFlavor {
    /// Inclusive comparison operators, used by `.json` descriptors.
    MinMax,
    /// Bracket intervals, used by `.toml` descriptors.
    Interval,
}

impl RangeFlavor {
    /// Infer the flavor from the descriptor entry path.
    pub fn from_descriptor_path(path: &str) -> Option<Self> {
        if path.ends_with(".json") {
            Some(RangeFlavor::MinMax)
        } else if path.ends_with(".toml") {
            Some(RangeFlavor::Interval)
        } else {
            None
        }
    }
}

/// Fold a run record's token list into one range expression.
///
/// The token list is ordered ascending; an optional trailing `*` marks
/// the run as open-ended ("and all future revisions").
pub fn version_range(flavor: RangeFlavor, tokens: &[String]) -> String {
    let open_ended = tokens.last().map(String::as_str) == Some(FUTURE_SENTINEL);
    let versions: Vec<&str> = tokens
        .iter()
        .map(String::as_str)
        .filter(|t| *t != FUTURE_SENTINEL)
        .collect();

    match (versions.first(), versions.last()) {
        (None, _) | (_, None) => match flavor {
            RangeFlavor::MinMax => "*".to_string(),
            RangeFlavor::Interval => "(,)".to_string(),
        },
        (Some(first), Some(last)) => match flavor {
            RangeFlavor::MinMax => {
                if open_ended {
                    format!(">={}", first)
                } else if versions.len() == 1 {
                    (*first).to_string()
                } else {
                    format!(">={} <={}", first, last)
                }
            }
            RangeFlavor::Interval => {
                if open_ended {
                    format!("[{},)", first)
                } else if versions.len() == 1 {
                    format!("[{}]", first)
                } else {
                    format!("[{},{}]", first, last)
                }
            }
        },
    }
}
