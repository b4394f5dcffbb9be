use chrono::{DateTime, NaiveDateTime, Utc};
use std::collections::HashMap;

use crate::models::JobRecord;

/// Existing postings scraped longer ago than this are dropped on merge.
pub const DEFAULT_MAX_AGE_DAYS: i64 = 30;

#[derive(Debug, Default)]
pub struct MergeReport {
    pub records: Vec<JobRecord>,
    pub stale_dropped: usize,
    pub missing_id: usize,
    pub replaced: usize,
}

/// Accepts RFC 3339, or a naive ISO timestamp taken as UTC.
fn parse_scraped_at(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    let trimmed = raw.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Merges a fresh scrape into the existing dataset, keyed by job identifier.
///
/// Existing records older than `max_age_days` (by `scraped_at`) are dropped; records with no
/// or unparseable `scraped_at` are kept. Fresh records always win. Records without an
/// identifier are discarded from both sides. First-seen order is preserved.
pub fn merge(
    existing: Vec<JobRecord>,
    fresh: Vec<JobRecord>,
    now: DateTime<Utc>,
    max_age_days: i64,
) -> MergeReport {
    let mut report = MergeReport::default();
    let mut index: HashMap<String, usize> = HashMap::new();

    for job in existing {
        let Some(id) = job.job_id().map(str::to_string) else {
            report.missing_id += 1;
            continue;
        };

        let stale = job
            .scraped_at
            .as_deref()
            .and_then(parse_scraped_at)
            .is_some_and(|scraped| (now - scraped).num_days() > max_age_days);
        if stale {
            report.stale_dropped += 1;
            continue;
        }

        upsert(&mut report, &mut index, id, job);
    }

    for job in fresh {
        let Some(id) = job.job_id().map(str::to_string) else {
            report.missing_id += 1;
            continue;
        };
        if index.contains_key(&id) {
            report.replaced += 1;
        }
        upsert(&mut report, &mut index, id, job);
    }

    tracing::info!(
        total = report.records.len(),
        stale = report.stale_dropped,
        replaced = report.replaced,
        missing_id = report.missing_id,
        "datasets merged"
    );
    report
}

fn upsert(report: &mut MergeReport, index: &mut HashMap<String, usize>, id: String, job: JobRecord) {
    match index.get(&id) {
        Some(&pos) => report.records[pos] = job,
        None => {
            index.insert(id, report.records.len());
            report.records.push(job);
        }
    }
}
