//! Executes classified assistant commands against a [`BatchStore`].
//!
//! Problems the user can fix (unknown batch, unknown jobs, missing batch
//! reference) come back as reply text with failed actions. Only storage
//! failures surface as `Err`.

use anyhow::Result;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::command::{classify, AssignIntent, CountIntent, FilterIntent, FilterStatus, Intent};
use crate::models::{fields, Job, KNOWN_STATUSES};
use crate::store::{today, BatchStore, BlobStore};

/// Jobs listed by id in a filter reply.
const FILTER_SAMPLE: usize = 5;

pub const DEFAULT_ASSIGNED_BY: &str = "ai-assistant";

pub const HELP_TEXT: &str = "I understand you want to work with the dashboard data. \
Could you try rephrasing? I can help with:\n\
• Job assignments: 'Assign jobs A, B, C in Batch-1 to user@email.com'\n\
• Status queries: 'How many pending jobs in Batch-1?'\n\
• Data filtering: 'Show rejected jobs in Batch-2'";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Assignment,
    Filter,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Assignment => "assignment",
            ActionKind::Filter => "filter",
        }
    }
}

/// Side effect (or attempted side effect) reported alongside a reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotAction {
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub data: serde_json::Value,
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<BotAction>,
}

impl Reply {
    fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            actions: Vec::new(),
        }
    }

    fn with_action(content: impl Into<String>, action: BotAction) -> Self {
        Self {
            content: content.into(),
            actions: vec![action],
        }
    }
}

pub struct Interpreter<'a, B> {
    store: &'a BatchStore<B>,
    assigned_by: String,
    today: Option<NaiveDate>,
}

impl<'a, B: BlobStore> Interpreter<'a, B> {
    pub fn new(store: &'a BatchStore<B>) -> Self {
        Self {
            store,
            assigned_by: DEFAULT_ASSIGNED_BY.to_string(),
            today: None,
        }
    }

    /// Name recorded in `assigned_by` for assignments made here.
    pub fn assigned_by(mut self, name: impl Into<String>) -> Self {
        self.assigned_by = name.into();
        self
    }

    /// Pin the assignment date instead of using the local date.
    pub fn with_today(mut self, date: NaiveDate) -> Self {
        self.today = Some(date);
        self
    }

    pub async fn respond(&self, text: &str) -> Result<Reply> {
        match classify(text) {
            Intent::Assign(intent) => self.assign(intent).await,
            Intent::Count(intent) => self.count(intent).await,
            Intent::Filter(intent) => self.filter(intent).await,
            Intent::Unknown => Ok(Reply::text(HELP_TEXT)),
        }
    }

    async fn assign(&self, intent: AssignIntent) -> Result<Reply> {
        let AssignIntent {
            job_ids,
            assignee,
            batch,
        } = intent;
        let data = json!({ "jobs": job_ids, "assignee": assignee });

        let Some(batch) = batch else {
            let message = format!(
                "Which batch are jobs {} in? Try 'Assign jobs {} in Batch-1 to {}'.",
                job_ids.join(", "),
                job_ids.join(", "),
                assignee
            );
            return Ok(Reply::with_action(
                message.clone(),
                BotAction {
                    kind: ActionKind::Assignment,
                    data,
                    success: false,
                    message,
                },
            ));
        };

        let date = self.today.unwrap_or_else(today);
        let outcome = self
            .store
            .assign_jobs(&batch.id(), &job_ids, &assignee, &self.assigned_by, date)
            .await?;

        if outcome.updated.is_empty() {
            let message = format!(
                "No jobs were assigned: {} not found in {}.",
                job_ids.join(", "),
                batch
            );
            return Ok(Reply::with_action(
                message.clone(),
                BotAction {
                    kind: ActionKind::Assignment,
                    data,
                    success: false,
                    message,
                },
            ));
        }

        let mut content = format!(
            "Successfully assigned {} jobs to {}",
            outcome.updated.len(),
            assignee
        );
        if !outcome.missing.is_empty() {
            content.push_str(&format!(
                " (not found in {}: {})",
                batch,
                outcome.missing.join(", ")
            ));
        }
        let message = format!(
            "Jobs {} assigned to {}",
            outcome.updated.join(", "),
            assignee
        );
        Ok(Reply::with_action(
            content,
            BotAction {
                kind: ActionKind::Assignment,
                data: json!({
                    "batch": batch.id(),
                    "jobs": outcome.updated,
                    "missing": outcome.missing,
                    "assignee": assignee,
                }),
                success: true,
                message,
            },
        ))
    }

    async fn count(&self, intent: CountIntent) -> Result<Reply> {
        let id = intent.batch.id();
        if self.store.get_batch(&id).await?.is_none() {
            return Ok(Reply::text(format!("I couldn't find {}.", intent.batch)));
        }
        let counts = self.store.get_job_counts_by_status(Some(&id)).await?;
        let count_of = |s: &str| counts.get(s).copied().unwrap_or(0);

        if let Some(status) = intent.status {
            return Ok(Reply::text(format!(
                "{} has {} {} jobs.",
                intent.batch,
                count_of(status.as_str()),
                status.replace('_', " ")
            )));
        }

        let total = self.store.get_batch_jobs(&id).await?.len();
        let mut content = format!("{} summary:", intent.batch);
        for status in KNOWN_STATUSES {
            content.push_str(&format!("\n• {}: {}", status_title(status), count_of(status)));
        }
        content.push_str(&format!("\n• Total: {}", total));
        Ok(Reply::text(content))
    }

    async fn filter(&self, intent: FilterIntent) -> Result<Reply> {
        let id = intent.batch.id();
        let status = intent.status.as_str();
        if self.store.get_batch(&id).await?.is_none() {
            let message = format!("I couldn't find {}.", intent.batch);
            return Ok(Reply::with_action(
                message.clone(),
                BotAction {
                    kind: ActionKind::Filter,
                    data: json!({ "batch": id, "status": status }),
                    success: false,
                    message,
                },
            ));
        }

        let jobs = self.store.get_batch_jobs(&id).await?;
        let hits: Vec<&Job> = jobs
            .iter()
            .filter(|j| matches_filter(j, intent.status))
            .collect();

        let mut content = format!(
            "Showing {} jobs in {}. Found {} jobs matching your criteria.",
            status,
            intent.batch,
            hits.len()
        );
        if !hits.is_empty() {
            let sample: Vec<&str> = hits
                .iter()
                .take(FILTER_SAMPLE)
                .map(|j| j.job_id.as_str())
                .collect();
            content.push_str(&format!(" {}", sample.join(", ")));
            if hits.len() > FILTER_SAMPLE {
                content.push('…');
            }
        }

        let ids: Vec<&str> = hits.iter().map(|j| j.job_id.as_str()).collect();
        Ok(Reply::with_action(
            content,
            BotAction {
                kind: ActionKind::Filter,
                data: json!({ "batch": id, "status": status, "jobs": ids }),
                success: true,
                message: format!("Filtered to show {} jobs in {}", status, intent.batch),
            },
        ))
    }
}

fn matches_filter(job: &Job, status: FilterStatus) -> bool {
    match status {
        FilterStatus::Assigned => job.assigned_to().is_some(),
        other => {
            let s = other.as_str();
            job.field(fields::QC_STATUS) == s || job.field(fields::DATA_STATUS) == s
        }
    }
}

/// `in_progress` → `In Progress`.
fn status_title(status: &str) -> String {
    status
        .split('_')
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DataType;
    use crate::store::{count_by_status, InMemoryBlobStore};

    fn store() -> BatchStore<InMemoryBlobStore> {
        BatchStore::new(InMemoryBlobStore::new())
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
    }

    #[tokio::test]
    async fn pending_count_agrees_with_store() {
        let s = store();
        let reply = Interpreter::new(&s)
            .respond("How many pending jobs in Batch-1?")
            .await
            .unwrap();
        let jobs = s.get_batch_jobs("batch-1").await.unwrap();
        let expected = count_by_status(&jobs).get("pending").copied().unwrap_or(0);
        assert_eq!(
            reply.content,
            format!("Batch-1 has {} pending jobs.", expected)
        );
        assert!(reply.actions.is_empty());
    }

    #[tokio::test]
    async fn summary_lists_every_status_and_total() {
        let s = store();
        let reply = Interpreter::new(&s)
            .respond("How many jobs are in Batch-2?")
            .await
            .unwrap();
        assert!(reply.content.starts_with("Batch-2 summary:"));
        assert!(reply.content.contains("• Pending: 2"));
        assert!(reply.content.contains("• In Progress: 0"));
        assert!(reply.content.ends_with("• Total: 2"));
    }

    #[tokio::test]
    async fn count_on_unknown_batch() {
        let s = store();
        let reply = Interpreter::new(&s)
            .respond("count pending in batch 42")
            .await
            .unwrap();
        assert_eq!(reply.content, "I couldn't find Batch-42.");
    }

    #[tokio::test]
    async fn assignment_writes_audit_fields() {
        let s = store();
        let reply = Interpreter::new(&s)
            .with_today(date())
            .respond("Assign jobs job-001, job-404 in Batch-1 to x@y.com")
            .await
            .unwrap();
        assert!(reply.content.starts_with("Successfully assigned 1 jobs to x@y.com"));
        assert!(reply.content.contains("job-404"));
        assert!(reply.actions[0].success);
        assert_eq!(reply.actions[0].kind, ActionKind::Assignment);

        let job = &s.get_batch_jobs("batch-1").await.unwrap()[0];
        assert_eq!(job.field("assigned_to"), "x@y.com");
        assert_eq!(job.field("assigned_date"), "2024-02-01");
        assert_eq!(job.field("assigned_by"), "ai-assistant");
    }

    #[tokio::test]
    async fn assignment_by_is_configurable() {
        let s = store();
        Interpreter::new(&s)
            .assigned_by("ops-bot")
            .respond("assign job job-101 to a@b.co in Batch-2")
            .await
            .unwrap();
        let job = &s.get_batch_jobs("batch-2").await.unwrap()[0];
        assert_eq!(job.field("assigned_by"), "ops-bot");
    }

    #[tokio::test]
    async fn assignment_without_batch_asks_for_one() {
        let s = store();
        let reply = Interpreter::new(&s)
            .respond("Assign jobs job-001 to x@y.com")
            .await
            .unwrap();
        assert!(!reply.actions[0].success);
        assert!(reply.content.contains("Which batch"));
        assert!(s.backend().load(crate::store::JOBS_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn assignment_of_unknown_jobs_fails() {
        let s = store();
        let reply = Interpreter::new(&s)
            .respond("Assign jobs nope-1 in Batch-1 to x@y.com")
            .await
            .unwrap();
        assert!(reply.content.starts_with("No jobs were assigned"));
        assert!(!reply.actions[0].success);
    }

    #[tokio::test]
    async fn filter_samples_at_most_five_ids() {
        let s = store();
        let headers: Vec<String> = ["job_id", "qc_status"].iter().map(|h| h.to_string()).collect();
        let rows: Vec<Vec<String>> = (1..=7)
            .map(|i| vec![format!("r{}", i), "rejected".to_string()])
            .collect();
        s.import_jobs("batch-5", &headers, &rows, DataType::Qced)
            .await
            .unwrap();
        let reply = Interpreter::new(&s)
            .respond("Show rejected jobs in Batch-5")
            .await
            .unwrap();
        assert_eq!(
            reply.content,
            "Showing rejected jobs in Batch-5. Found 7 jobs matching your criteria. r1, r2, r3, r4, r5…"
        );
        assert_eq!(reply.actions[0].kind, ActionKind::Filter);
    }

    #[tokio::test]
    async fn filter_assigned_uses_assignee() {
        let s = store();
        let reply = Interpreter::new(&s)
            .respond("show assigned jobs in Batch-1")
            .await
            .unwrap();
        assert!(reply.content.contains("Found 2 jobs"));
        let reply = Interpreter::new(&s)
            .respond("show approved jobs in Batch-1")
            .await
            .unwrap();
        assert!(reply.content.ends_with("Found 1 jobs matching your criteria. job-001"));
    }

    #[tokio::test]
    async fn unknown_text_gets_help() {
        let s = store();
        let reply = Interpreter::new(&s).respond("hello").await.unwrap();
        assert_eq!(reply.content, HELP_TEXT);
    }

    #[test]
    fn status_titles() {
        assert_eq!(status_title("in_progress"), "In Progress");
        assert_eq!(status_title("pending"), "Pending");
    }
}
