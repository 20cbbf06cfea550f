//! Intent classification for assistant commands.
//!
//! Free text is matched against a fixed list of rules in priority order;
//! the first rule that matches decides the [`Intent`]. A rule whose
//! keywords are present but whose pattern does not match lets the next
//! rule try.
//!
//! | Priority | Keywords | Intent |
//! |----------|----------|--------|
//! | 1 | `assign` and `to` | [`Intent::Assign`] |
//! | 2 | `how many` or `count` | [`Intent::Count`] |
//! | 3 | `show` plus `rejected`/`approved`/`assigned` | [`Intent::Filter`] |
//! | — | anything else | [`Intent::Unknown`] |

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::normalize_batch_id;

static ASSIGN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bjobs?\s+(.+?)\s+to\s+(\S+@\S+)").expect("assignment pattern")
});

static BATCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bbatch(?:[-_\s]+(\w+)|(\d+))\b").expect("batch pattern")
});

static STATUS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(pending|completed|in[_\s]+progress|rejected|approved)\b")
        .expect("status pattern")
});

static FILTER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(rejected|approved|assigned)\b").expect("filter pattern"));

static LIST_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[,\s]+").expect("list separator pattern"));

/// Words that may sit between job ids without being ids themselves.
const LIST_FILLERS: [&str; 5] = ["and", "in", "from", "of", "the"];

/// A reference to a batch as typed by the user (`Batch-1`, `batch 7`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchRef {
    pub token: String,
}

impl BatchRef {
    /// Stored batch id (`batch-<token>`).
    pub fn id(&self) -> String {
        normalize_batch_id(&format!("batch-{}", self.token))
    }

    /// Label for replies (`Batch-<token>`).
    pub fn label(&self) -> String {
        format!("Batch-{}", self.token)
    }
}

impl fmt::Display for BatchRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Statuses a "show" command can filter by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterStatus {
    Rejected,
    Approved,
    Assigned,
}

impl FilterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterStatus::Rejected => "rejected",
            FilterStatus::Approved => "approved",
            FilterStatus::Assigned => "assigned",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignIntent {
    pub job_ids: Vec<String>,
    pub assignee: String,
    pub batch: Option<BatchRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountIntent {
    pub batch: BatchRef,
    /// Normalised status (`in_progress`, not `in progress`).
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterIntent {
    pub batch: BatchRef,
    pub status: FilterStatus,
}

/// What a command asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Assign(AssignIntent),
    Count(CountIntent),
    Filter(FilterIntent),
    Unknown,
}

/// Classify a free-text command.
pub fn classify(text: &str) -> Intent {
    if let Some(intent) = match_assignment(text) {
        return Intent::Assign(intent);
    }
    if let Some(intent) = match_count(text) {
        return Intent::Count(intent);
    }
    if let Some(intent) = match_filter(text) {
        return Intent::Filter(intent);
    }
    Intent::Unknown
}

/// `Assign job(s) <ids> [in Batch-N] to <email> [in Batch-N]`.
pub fn match_assignment(text: &str) -> Option<AssignIntent> {
    let lower = text.to_lowercase();
    if !(lower.contains("assign") && lower.contains("to")) {
        return None;
    }
    let caps = ASSIGN_RE.captures(text)?;

    let list = BATCH_RE.replace_all(&caps[1], " ");
    let job_ids: Vec<String> = LIST_SPLIT_RE
        .split(&list)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .filter(|t| !LIST_FILLERS.contains(&t.to_lowercase().as_str()))
        .map(str::to_string)
        .collect();
    if job_ids.is_empty() {
        return None;
    }

    let assignee = caps[2]
        .trim_end_matches(['.', ',', ';', ':', '!', '?', ')'])
        .to_string();

    Some(AssignIntent {
        job_ids,
        assignee,
        batch: extract_batch_ref(text),
    })
}

/// `How many [status] jobs in Batch-N` / `count ... Batch-N`.
pub fn match_count(text: &str) -> Option<CountIntent> {
    let lower = text.to_lowercase();
    if !(lower.contains("how many") || lower.contains("count")) {
        return None;
    }
    Some(CountIntent {
        batch: extract_batch_ref(text)?,
        status: extract_status(text),
    })
}

/// `Show rejected|approved|assigned jobs in Batch-N`.
pub fn match_filter(text: &str) -> Option<FilterIntent> {
    let lower = text.to_lowercase();
    if !lower.contains("show") {
        return None;
    }
    let status = match FILTER_RE.captures(text)?[1].to_lowercase().as_str() {
        "rejected" => FilterStatus::Rejected,
        "approved" => FilterStatus::Approved,
        _ => FilterStatus::Assigned,
    };
    Some(FilterIntent {
        batch: extract_batch_ref(text)?,
        status,
    })
}

/// First batch reference in `text`, preferring tokens that contain a digit
/// (`batch jobs in Batch-2` refers to `Batch-2`).
pub fn extract_batch_ref(text: &str) -> Option<BatchRef> {
    let tokens: Vec<&str> = BATCH_RE
        .captures_iter(text)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)))
        .map(|m| m.as_str())
        .collect();
    tokens
        .iter()
        .find(|t| t.chars().any(|c| c.is_ascii_digit()))
        .or_else(|| tokens.first())
        .map(|t| BatchRef {
            token: t.to_string(),
        })
}

/// First status keyword in `text`, with spaces/underscores normalised.
pub fn extract_status(text: &str) -> Option<String> {
    let caps = STATUS_RE.captures(text)?;
    let words: Vec<&str> = caps[1].split(|c: char| c == '_' || c.is_whitespace())
        .filter(|w| !w.is_empty())
        .collect();
    Some(words.join("_").to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(token: &str) -> Option<BatchRef> {
        Some(BatchRef {
            token: token.to_string(),
        })
    }

    #[test]
    fn assignment_with_batch_before_email() {
        let intent = classify("Assign jobs job-001, job-002 and job-003 in Batch-1 to x@y.com");
        assert_eq!(
            intent,
            Intent::Assign(AssignIntent {
                job_ids: vec!["job-001".into(), "job-002".into(), "job-003".into()],
                assignee: "x@y.com".into(),
                batch: batch("1"),
            })
        );
    }

    #[test]
    fn assignment_with_batch_after_email() {
        let Intent::Assign(a) = classify("assign job J7 to lead@corp.io in batch 12.") else {
            panic!("expected assignment");
        };
        assert_eq!(a.job_ids, vec!["J7"]);
        assert_eq!(a.assignee, "lead@corp.io");
        assert_eq!(a.batch, batch("12"));
    }

    #[test]
    fn assignment_without_email_falls_through() {
        assert_eq!(classify("assign jobs a, b to Priya"), Intent::Unknown);
    }

    #[test]
    fn job_ids_containing_t_and_o_survive() {
        let Intent::Assign(a) = classify("Assign jobs tot-1 otto-2 to a@b.co") else {
            panic!("expected assignment");
        };
        assert_eq!(a.job_ids, vec!["tot-1", "otto-2"]);
        assert_eq!(a.batch, None);
    }

    #[test]
    fn count_with_status() {
        assert_eq!(
            classify("How many pending jobs in Batch-1?"),
            Intent::Count(CountIntent {
                batch: batch("1").unwrap(),
                status: Some("pending".into()),
            })
        );
        let Intent::Count(c) = classify("count in progress jobs for batch_3") else {
            panic!("expected count");
        };
        assert_eq!(c.status.as_deref(), Some("in_progress"));
        assert_eq!(c.batch.id(), "batch-3");
    }

    #[test]
    fn count_without_status_is_breakdown() {
        let Intent::Count(c) = classify("How many jobs are in Batch-2?") else {
            panic!("expected count");
        };
        assert_eq!(c.status, None);
    }

    #[test]
    fn count_without_batch_falls_through() {
        assert_eq!(classify("How many pending jobs are there?"), Intent::Unknown);
    }

    #[test]
    fn filter_statuses() {
        assert_eq!(
            classify("Show rejected jobs in Batch-2"),
            Intent::Filter(FilterIntent {
                batch: batch("2").unwrap(),
                status: FilterStatus::Rejected,
            })
        );
        let Intent::Filter(f) = classify("show me assigned work from batch 5") else {
            panic!("expected filter");
        };
        assert_eq!(f.status, FilterStatus::Assigned);
    }

    #[test]
    fn filter_requires_a_status_word() {
        assert_eq!(classify("show pending jobs in Batch-2"), Intent::Unknown);
    }

    #[test]
    fn batch_ref_prefers_numbered_tokens() {
        assert_eq!(
            extract_batch_ref("count batch jobs in Batch-4"),
            batch("4")
        );
        assert_eq!(extract_batch_ref("no batches here"), None);
        assert_eq!(extract_batch_ref("batch7 please"), batch("7"));
        assert_eq!(batch("Q1").unwrap().id(), "batch-q1");
        assert_eq!(batch("Q1").unwrap().label(), "Batch-Q1");
    }

    #[test]
    fn unrelated_text_is_unknown() {
        assert_eq!(classify("hello there"), Intent::Unknown);
    }
}
