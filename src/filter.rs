use regex::{Regex, RegexBuilder};
use std::time::Instant;

use crate::models::{ApplicationStatus, FilterCriteria, JobRecord, StatusMap};

/// Case-insensitive match anchored on word boundaries at both ends of the needle.
#[derive(Debug)]
pub enum WordMatcher {
    Pattern(Regex),
    /// Used only if the escaped pattern cannot be compiled (e.g. size limit).
    Contains(String),
}

impl WordMatcher {
    /// `None` for blank input, meaning the criterion is inactive.
    pub fn new(needle: &str) -> Option<Self> {
        let needle = needle.trim();
        if needle.is_empty() {
            return None;
        }
        let pattern = format!(r"\b{}\b", regex::escape(needle));
        match RegexBuilder::new(&pattern).case_insensitive(true).build() {
            Ok(re) => Some(WordMatcher::Pattern(re)),
            Err(e) => {
                tracing::warn!(error = %e, "filter pattern rejected, using substring match");
                Some(WordMatcher::Contains(needle.to_lowercase()))
            }
        }
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        match self {
            WordMatcher::Pattern(re) => re.is_match(haystack),
            WordMatcher::Contains(needle) => haystack.to_lowercase().contains(needle.as_str()),
        }
    }
}

/// Criteria with their text matchers compiled once per pass.
struct CompiledFilter<'c> {
    criteria: &'c FilterCriteria,
    title: Option<WordMatcher>,
    company: Option<WordMatcher>,
    location: Option<WordMatcher>,
}

impl<'c> CompiledFilter<'c> {
    fn new(criteria: &'c FilterCriteria) -> Self {
        Self {
            criteria,
            title: WordMatcher::new(&criteria.title),
            company: WordMatcher::new(&criteria.company),
            location: WordMatcher::new(&criteria.location),
        }
    }

    fn matches(&self, job: &JobRecord, statuses: &StatusMap) -> bool {
        let criteria = self.criteria;

        if criteria.hide_recruiters && job.is_recruiter() {
            return false;
        }

        let status = resolve_status(job, statuses);

        if criteria.hide_applied
            && matches!(
                status,
                Some(ApplicationStatus::Applied | ApplicationStatus::Ignored)
            )
        {
            return false;
        }

        if criteria.status.is_some() && status != criteria.status {
            return false;
        }

        if criteria.remote_only && !job.is_remote() {
            return false;
        }

        if let Some(m) = &self.title {
            if !m.is_match(job.title_text()) {
                return false;
            }
        }
        if let Some(m) = &self.company {
            if !m.is_match(job.company_name()) {
                return false;
            }
        }
        if let Some(m) = &self.location {
            if !m.is_match(job.location_text()) {
                return false;
            }
        }

        true
    }
}

/// Status for a record, or `None` when it has no identifier or no entry.
pub fn resolve_status(job: &JobRecord, statuses: &StatusMap) -> Option<ApplicationStatus> {
    job.job_id()
        .and_then(|id| statuses.get(id))
        .map(|entry| entry.status)
}

/// Records satisfying every active criterion, in their original relative order.
pub fn apply<'a>(
    records: &'a [JobRecord],
    statuses: &StatusMap,
    criteria: &FilterCriteria,
) -> Vec<&'a JobRecord> {
    let started = Instant::now();
    let compiled = CompiledFilter::new(criteria);

    let filtered: Vec<&JobRecord> = records
        .iter()
        .filter(|job| compiled.matches(job, statuses))
        .collect();

    tracing::debug!(
        total = records.len(),
        matched = filtered.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "filter pass"
    );
    filtered
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Location, StatusEntry};
    use chrono::Utc;

    fn job(url: &str, title: &str, company: &str) -> JobRecord {
        JobRecord {
            url: Some(url.into()),
            title: Some(title.into()),
            company: Some(company.into()),
            ..Default::default()
        }
    }

    fn urls(jobs: &[&JobRecord]) -> Vec<String> {
        jobs.iter()
            .map(|j| j.job_id().unwrap_or_default().to_string())
            .collect()
    }

    fn status_map(pairs: &[(&str, ApplicationStatus)]) -> StatusMap {
        pairs
            .iter()
            .map(|(id, status)| {
                (
                    id.to_string(),
                    StatusEntry {
                        status: *status,
                        date: Utc::now(),
                    },
                )
            })
            .collect()
    }

    fn sample() -> Vec<JobRecord> {
        vec![
            job("a", "Staff Engineer", "Acme"),
            job("b", "Engineer", "Beta"),
        ]
    }

    #[test]
    fn title_matches_on_word_boundary() {
        let records = sample();
        let statuses = StatusMap::new();

        let criteria = FilterCriteria {
            title: "engineer".into(),
            ..Default::default()
        };
        assert_eq!(urls(&apply(&records, &statuses, &criteria)), ["a", "b"]);

        let criteria = FilterCriteria {
            title: "staff".into(),
            ..Default::default()
        };
        assert_eq!(urls(&apply(&records, &statuses, &criteria)), ["a"]);
    }

    #[test]
    fn partial_word_does_not_match() {
        let records = vec![job("a", "Engineering Manager", "Acme")];
        let criteria = FilterCriteria {
            title: "engineer".into(),
            ..Default::default()
        };
        assert!(apply(&records, &StatusMap::new(), &criteria).is_empty());
    }

    #[test]
    fn metacharacters_are_literal() {
        let records = vec![
            job("a", "Developer (Backend)", "Acme"),
            job("b", "Developer Backend", "Beta"),
            job("c", "Sr. Engineer", "Gamma"),
            job("d", "Srx Engineer", "Delta"),
        ];
        let statuses = StatusMap::new();

        let criteria = FilterCriteria {
            title: "developer (backend".into(),
            ..Default::default()
        };
        assert_eq!(urls(&apply(&records, &statuses, &criteria)), ["a"]);

        let criteria = FilterCriteria {
            title: "sr.".into(),
            ..Default::default()
        };
        // `\b` after a trailing '.' needs a word char next, as "Sr. " has a space.
        assert!(apply(&records, &statuses, &criteria).is_empty());

        let criteria = FilterCriteria {
            title: "sr. engineer".into(),
            ..Default::default()
        };
        assert_eq!(urls(&apply(&records, &statuses, &criteria)), ["c"]);
    }

    #[test]
    fn company_uses_slug_fallback() {
        let records = vec![JobRecord {
            url: Some("a".into()),
            company_slug: Some("acme-corp".into()),
            ..Default::default()
        }];
        let criteria = FilterCriteria {
            company: "ACME".into(),
            ..Default::default()
        };
        assert_eq!(urls(&apply(&records, &StatusMap::new(), &criteria)), ["a"]);
    }

    #[test]
    fn location_unwraps_named_variant() {
        let records = vec![
            JobRecord {
                url: Some("a".into()),
                location: Some(Location::Named {
                    name: Some("San Francisco, CA".into()),
                }),
                ..Default::default()
            },
            JobRecord {
                url: Some("b".into()),
                location: Some(Location::Plain("New York".into())),
                ..Default::default()
            },
        ];
        let criteria = FilterCriteria {
            location: "francisco".into(),
            ..Default::default()
        };
        assert_eq!(urls(&apply(&records, &StatusMap::new(), &criteria)), ["a"]);
    }

    #[test]
    fn hide_recruiters_only_drops_flagged() {
        let mut records = sample();
        records[0].is_recruiter = Some(true);
        records[1].is_recruiter = Some(false);
        let criteria = FilterCriteria {
            hide_recruiters: true,
            ..Default::default()
        };
        assert_eq!(urls(&apply(&records, &StatusMap::new(), &criteria)), ["b"]);
    }

    #[test]
    fn hide_applied_drops_applied_and_ignored() {
        let records = vec![
            job("a", "One", "X"),
            job("b", "Two", "X"),
            job("c", "Three", "X"),
            job("d", "Four", "X"),
        ];
        let statuses = status_map(&[
            ("a", ApplicationStatus::Applied),
            ("b", ApplicationStatus::Ignored),
            ("c", ApplicationStatus::Saved),
        ]);
        let criteria = FilterCriteria {
            hide_applied: true,
            ..Default::default()
        };
        assert_eq!(urls(&apply(&records, &statuses, &criteria)), ["c", "d"]);
    }

    #[test]
    fn status_filter_requires_exact_match() {
        let records = vec![job("a", "One", "X"), job("b", "Two", "X")];
        let statuses = status_map(&[("a", ApplicationStatus::Saved)]);
        let criteria = FilterCriteria {
            status: Some(ApplicationStatus::Saved),
            ..Default::default()
        };
        assert_eq!(urls(&apply(&records, &statuses, &criteria)), ["a"]);

        let criteria = FilterCriteria {
            status: Some(ApplicationStatus::Applied),
            ..Default::default()
        };
        assert!(apply(&records, &statuses, &criteria).is_empty());
    }

    #[test]
    fn remote_only() {
        let records = vec![
            JobRecord {
                url: Some("a".into()),
                location: Some(Location::Plain("Remote, US".into())),
                ..Default::default()
            },
            JobRecord {
                url: Some("b".into()),
                location: Some(Location::Plain("Austin".into())),
                workplace_type: Some("REMOTE".into()),
                ..Default::default()
            },
            JobRecord {
                url: Some("c".into()),
                location: Some(Location::Plain("Austin".into())),
                ..Default::default()
            },
        ];
        let criteria = FilterCriteria {
            remote_only: true,
            ..Default::default()
        };
        assert_eq!(urls(&apply(&records, &StatusMap::new(), &criteria)), ["a", "b"]);
    }

    #[test]
    fn default_criteria_reproduce_original_order() {
        let records = vec![
            job("c", "Gamma", "Z"),
            job("a", "Alpha", "Y"),
            job("b", "Beta", "X"),
        ];
        let statuses = status_map(&[("a", ApplicationStatus::Applied)]);

        let narrowed = FilterCriteria {
            title: "alpha".into(),
            ..Default::default()
        };
        assert_eq!(apply(&records, &statuses, &narrowed).len(), 1);

        let reset = apply(&records, &statuses, &FilterCriteria::default());
        assert_eq!(urls(&reset), ["c", "a", "b"]);
    }

    #[test]
    fn filtering_is_idempotent() {
        let records = vec![
            job("a", "Staff Engineer", "Acme"),
            job("b", "Designer", "Acme"),
            job("c", "Engineer II", "Beta"),
        ];
        let criteria = FilterCriteria {
            title: "engineer".into(),
            company: "acme".into(),
            ..Default::default()
        };
        let statuses = StatusMap::new();
        let first = urls(&apply(&records, &statuses, &criteria));
        let second = urls(&apply(&records, &statuses, &criteria));
        assert_eq!(first, second);
        assert_eq!(first, ["a"]);
    }

    #[test]
    fn blank_criteria_are_inactive() {
        assert!(WordMatcher::new("   ").is_none());
        let records = sample();
        let criteria = FilterCriteria {
            title: "  ".into(),
            ..Default::default()
        };
        assert_eq!(apply(&records, &StatusMap::new(), &criteria).len(), 2);
    }
}
