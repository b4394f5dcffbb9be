use crate::models::{JobRecord, SortDirection, SortKey, SortState};

/// Comparison value for a column, using the same accessors as filtering and rendering.
pub fn sort_value(job: &JobRecord, key: SortKey) -> String {
    let raw = match key {
        SortKey::Title => job.title_text(),
        SortKey::Company => job.company_name(),
        SortKey::Location => job.location_text(),
        SortKey::Ats => job.ats.as_deref().unwrap_or(""),
        SortKey::Updated => job.updated_at.as_deref().unwrap_or(""),
    };
    raw.to_lowercase()
}

/// Returns a newly ordered copy; ties keep their input order.
pub fn sorted<'a>(items: &[&'a JobRecord], state: &SortState) -> Vec<&'a JobRecord> {
    let Some(key) = state.key else {
        return items.to_vec();
    };

    // Lowercase each value once rather than per comparison.
    let mut keyed: Vec<(String, &'a JobRecord)> =
        items.iter().map(|job| (sort_value(job, key), *job)).collect();

    keyed.sort_by(|a, b| {
        let ord = a.0.cmp(&b.0);
        match state.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });

    keyed.into_iter().map(|(_, job)| job).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Location;

    fn job(url: &str, title: &str) -> JobRecord {
        JobRecord {
            url: Some(url.into()),
            title: Some(title.into()),
            ..Default::default()
        }
    }

    fn ids(jobs: &[&JobRecord]) -> Vec<String> {
        jobs.iter()
            .map(|j| j.job_id().unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn no_key_keeps_input_order() {
        let records = [job("b", "Beta"), job("a", "Alpha")];
        let refs: Vec<&JobRecord> = records.iter().collect();
        assert_eq!(ids(&sorted(&refs, &SortState::default())), ["b", "a"]);
    }

    #[test]
    fn sorts_case_insensitively() {
        let records = [job("1", "beta"), job("2", "Alpha"), job("3", "GAMMA")];
        let refs: Vec<&JobRecord> = records.iter().collect();
        let asc = sorted(&refs, &SortState::by(SortKey::Title, SortDirection::Asc));
        assert_eq!(ids(&asc), ["2", "1", "3"]);
        // input untouched
        assert_eq!(ids(&refs), ["1", "2", "3"]);
    }

    #[test]
    fn desc_exactly_reverses_distinct_keys() {
        let records = [job("1", "d"), job("2", "a"), job("3", "c"), job("4", "b")];
        let refs: Vec<&JobRecord> = records.iter().collect();
        let asc = ids(&sorted(&refs, &SortState::by(SortKey::Title, SortDirection::Asc)));
        let mut desc = ids(&sorted(&refs, &SortState::by(SortKey::Title, SortDirection::Desc)));
        desc.reverse();
        assert_eq!(asc, desc);
    }

    #[test]
    fn ties_keep_input_order_and_repeat_is_idempotent() {
        let records = [
            job("1", "Same"),
            job("2", "Other"),
            job("3", "same"),
            job("4", "SAME"),
        ];
        let refs: Vec<&JobRecord> = records.iter().collect();
        let state = SortState::by(SortKey::Title, SortDirection::Asc);
        let once = sorted(&refs, &state);
        assert_eq!(ids(&once), ["2", "1", "3", "4"]);
        let twice = sorted(&once, &state);
        assert_eq!(ids(&once), ids(&twice));

        let desc = sorted(&refs, &SortState::by(SortKey::Title, SortDirection::Desc));
        assert_eq!(ids(&desc), ["1", "3", "4", "2"]);
    }

    #[test]
    fn missing_values_sort_first_ascending() {
        let records = [job("1", "b"), JobRecord { url: Some("2".into()), ..Default::default() }];
        let refs: Vec<&JobRecord> = records.iter().collect();
        let asc = sorted(&refs, &SortState::by(SortKey::Title, SortDirection::Asc));
        assert_eq!(ids(&asc), ["2", "1"]);
    }

    #[test]
    fn company_and_location_use_resolved_values() {
        let records = [
            JobRecord {
                url: Some("1".into()),
                company: Some("zeta".into()),
                location: Some(Location::Named { name: Some("Austin".into()) }),
                ..Default::default()
            },
            JobRecord {
                url: Some("2".into()),
                company_slug: Some("alpha".into()),
                location: Some(Location::Plain("Zurich".into())),
                ..Default::default()
            },
        ];
        let refs: Vec<&JobRecord> = records.iter().collect();
        let by_company = sorted(&refs, &SortState::by(SortKey::Company, SortDirection::Asc));
        assert_eq!(ids(&by_company), ["2", "1"]);
        let by_location = sorted(&refs, &SortState::by(SortKey::Location, SortDirection::Asc));
        assert_eq!(ids(&by_location), ["1", "2"]);
    }
}
