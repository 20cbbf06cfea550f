//! Job filtering and pagination for batch job tables.

use crate::models::{fields, Job};

/// Filters applied to a batch's jobs. Unset filters match everything.
#[derive(Debug, Clone, Default)]
pub struct JobQuery {
    /// Case-insensitive substring matched against every column value.
    pub search: Option<String>,
    /// Exact `data_status` match.
    pub status: Option<String>,
    /// Exact `assigned_to` match.
    pub assignee: Option<String>,
}

impl JobQuery {
    pub fn matches(&self, job: &Job) -> bool {
        let search_ok = match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                job.columns()
                    .any(|(_, value)| value.to_lowercase().contains(&needle))
            }
        };
        let status_ok = self
            .status
            .as_deref()
            .map_or(true, |s| job.field(fields::DATA_STATUS) == s);
        let assignee_ok = self
            .assignee
            .as_deref()
            .map_or(true, |a| job.field(fields::ASSIGNED_TO) == a);
        search_ok && status_ok && assignee_ok
    }

    pub fn apply(&self, jobs: &[Job]) -> Vec<Job> {
        jobs.iter().filter(|j| self.matches(j)).cloned().collect()
    }
}

/// One page of a longer list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number actually returned.
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Slice `items` into pages of `per_page` and return page `page`
/// (1-based, clamped to the available range).
pub fn paginate<T: Clone>(items: &[T], page: usize, per_page: usize) -> Page<T> {
    let per_page = per_page.max(1);
    let total_pages = items.len().div_ceil(per_page).max(1);
    let page = page.clamp(1, total_pages);
    let start = (page - 1) * per_page;
    let end = (start + per_page).min(items.len());
    Page {
        items: items[start..end].to_vec(),
        page,
        total_pages,
        total_items: items.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jobs() -> Vec<Job> {
        vec![
            Job::new("job-001")
                .with("data_status", "completed")
                .with("assigned_to", "dimpal@b2r.co.in")
                .with("client_file_name", "Invoice_A.pdf"),
            Job::new("job-002")
                .with("data_status", "pending")
                .with("assigned_to", "harshita@b2r.in"),
            Job::new("job-003").with("data_status", "pending"),
        ]
    }

    #[test]
    fn empty_query_matches_all() {
        assert_eq!(JobQuery::default().apply(&jobs()).len(), 3);
    }

    #[test]
    fn search_is_case_insensitive_over_all_columns() {
        let q = JobQuery {
            search: Some("invoice".into()),
            ..Default::default()
        };
        let hits = q.apply(&jobs());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].job_id, "job-001");

        let q = JobQuery {
            search: Some("JOB-00".into()),
            ..Default::default()
        };
        assert_eq!(q.apply(&jobs()).len(), 3);
    }

    #[test]
    fn filters_combine() {
        let q = JobQuery {
            status: Some("pending".into()),
            assignee: Some("harshita@b2r.in".into()),
            ..Default::default()
        };
        let hits = q.apply(&jobs());
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].job_id, "job-002");
    }

    #[test]
    fn pagination_clamps_page() {
        let items: Vec<u32> = (1..=23).collect();
        let p = paginate(&items, 3, 10);
        assert_eq!(p.items, vec![21, 22, 23]);
        assert_eq!(p.total_pages, 3);
        assert_eq!(paginate(&items, 99, 10).page, 3);
        assert_eq!(paginate(&items, 0, 10).page, 1);
    }

    #[test]
    fn empty_list_is_one_empty_page() {
        let p = paginate::<u32>(&[], 1, 10);
        assert!(p.items.is_empty());
        assert_eq!(p.total_pages, 1);
        assert_eq!(p.total_items, 0);
    }
}
