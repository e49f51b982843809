// Failure classification and top-N ranking

use serde::ser::{Serialize, SerializeMap, Serializer};
use siftbench_scanner::PageResult;
use std::collections::HashMap;
use std::fmt;

pub const TOP_FAILURES_LIMIT: usize = 6;

/// Class of a non-ok page. Every failure maps to exactly one class.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// The page carried an explicit reason code.
    Reason(String),
    /// Fetched with a status but produced no tokens.
    NoTextStatus(u16),
    Unknown,
}

impl FailureClass {
    pub fn of(failure: &PageResult) -> Self {
        match (failure.error.as_deref(), failure.status) {
            (Some(reason), _) if !reason.is_empty() => FailureClass::Reason(reason.to_string()),
            (_, Some(status)) if failure.tokens == 0 => FailureClass::NoTextStatus(status),
            _ => FailureClass::Unknown,
        }
    }

    pub fn label(&self) -> String {
        match self {
            FailureClass::Reason(reason) => reason.clone(),
            FailureClass::NoTextStatus(status) => format!("no_text_status_{}", status),
            FailureClass::Unknown => "unknown".to_string(),
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Ranked `(label, count)` pairs. Serializes as a JSON object in rank order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopFailures(pub Vec<(String, usize)>);

impl TopFailures {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(label, count)| (label.as_str(), *count))
    }

    pub fn total(&self) -> usize {
        self.0.iter().map(|(_, count)| count).sum()
    }
}

impl Serialize for TopFailures {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, count) in &self.0 {
            map.serialize_entry(label, count)?;
        }
        map.end()
    }
}

/// Count failures by class and keep the `limit` most common.
///
/// Ties keep the order in which each class was first seen.
pub fn top_failures(failures: &[PageResult], limit: usize) -> TopFailures {
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for failure in failures {
        let label = FailureClass::of(failure).label();
        match counts.get_mut(&label) {
            Some(count) => *count += 1,
            None => {
                counts.insert(label.clone(), 1);
                order.push(label);
            }
        }
    }

    let mut ranked: Vec<(String, usize)> = order
        .into_iter()
        .map(|label| {
            let count = counts[&label];
            (label, count)
        })
        .collect();
    // stable sort keeps first-seen order among equal counts
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(limit);
    TopFailures(ranked)
}
