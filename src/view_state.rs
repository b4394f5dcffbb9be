//! Shareable view state: filter criteria and page mirrored into a URL query string.

use url::form_urlencoded;

use crate::models::FilterCriteria;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    pub criteria: FilterCriteria,
    pub page: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            criteria: FilterCriteria::default(),
            page: 1,
        }
    }
}

impl ViewState {
    pub fn new(criteria: FilterCriteria, page: usize) -> Self {
        Self {
            criteria,
            page: page.max(1),
        }
    }

    /// Query string without the leading `?`. Empty for the unfiltered first page.
    pub fn to_query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        for (name, value) in [
            ("title", &self.criteria.title),
            ("company", &self.criteria.company),
            ("location", &self.criteria.location),
        ] {
            let value = value.trim();
            if !value.is_empty() {
                query.append_pair(name, value);
            }
        }
        if self.criteria.remote_only {
            query.append_pair("remote", "1");
        }
        if self.page > 1 {
            query.append_pair("page", &self.page.to_string());
        }
        query.finish()
    }

    /// `path` alone when there is nothing to share, else `path?query`.
    pub fn to_url(&self, path: &str) -> String {
        let query = self.to_query();
        if query.is_empty() {
            path.to_string()
        } else {
            format!("{path}?{query}")
        }
    }

    /// Accepts a bare query, one with a leading `?`, or a full URL. Bad values fall back
    /// to defaults; unknown parameters are ignored.
    pub fn from_query(input: &str) -> Self {
        let query = match input.split_once('?') {
            Some((_, rest)) => rest,
            None => input,
        };
        let query = query.split('#').next().unwrap_or("");

        let mut state = ViewState::default();
        for (name, value) in form_urlencoded::parse(query.as_bytes()) {
            match name.as_ref() {
                "title" => state.criteria.title = value.trim().to_string(),
                "company" => state.criteria.company = value.trim().to_string(),
                "location" => state.criteria.location = value.trim().to_string(),
                "remote" => state.criteria.remote_only = value == "1",
                "page" => {
                    state.page = value
                        .trim()
                        .parse::<usize>()
                        .ok()
                        .filter(|p| *p >= 1)
                        .unwrap_or(1)
                }
                _ => {}
            }
        }
        state
    }

    /// Whether restoring this state needs a filter pass before the first render.
    pub fn has_filters(&self) -> bool {
        self.criteria.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria(title: &str, company: &str, location: &str, remote: bool) -> FilterCriteria {
        FilterCriteria {
            title: title.into(),
            company: company.into(),
            location: location.into(),
            remote_only: remote,
            ..Default::default()
        }
    }

    #[test]
    fn default_state_is_bare_path() {
        let state = ViewState::default();
        assert_eq!(state.to_query(), "");
        assert_eq!(state.to_url("/jobs"), "/jobs");
        assert!(!state.has_filters());
    }

    #[test]
    fn serializes_only_set_values() {
        let state = ViewState::new(criteria("staff engineer", "", "", true), 3);
        assert_eq!(state.to_query(), "title=staff+engineer&remote=1&page=3");
    }

    #[test]
    fn page_one_is_omitted() {
        let state = ViewState::new(criteria("", "acme", "", false), 1);
        assert_eq!(state.to_query(), "company=acme");
    }

    #[test]
    fn round_trip_reproduces_criteria() {
        let cases = [
            criteria("Staff Engineer", "Acme Inc.", "Remote - US", true),
            criteria("c++ / rust", "", "", false),
            criteria("", "", "New York, NY", false),
            criteria("100% remote?", "a+b", "", true),
        ];
        for original in cases {
            let state = ViewState::new(original.clone(), 2);
            let restored = ViewState::from_query(&state.to_query());
            assert_eq!(restored.criteria, original);
            assert_eq!(restored.page, 2);
        }
    }

    #[test]
    fn serialize_is_idempotent() {
        let state = ViewState::new(criteria(" lead ", "x", "", false), 4);
        let once = state.to_query();
        let twice = ViewState::from_query(&once).to_query();
        assert_eq!(once, twice);
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let state = ViewState::from_query("?page=abc&remote=yes&sort=title");
        assert_eq!(state, ViewState::default());

        let state = ViewState::from_query("page=0");
        assert_eq!(state.page, 1);

        let state = ViewState::from_query("page=-2");
        assert_eq!(state.page, 1);
    }

    #[test]
    fn parses_full_urls() {
        let state = ViewState::from_query("https://example.com/jobs/?location=berlin&page=2#top");
        assert_eq!(state.criteria.location, "berlin");
        assert_eq!(state.page, 2);
        assert!(state.has_filters());
    }

    #[test]
    fn page_alone_is_not_a_filter() {
        let state = ViewState::from_query("page=5");
        assert!(!state.has_filters());
        assert_eq!(state.page, 5);
    }
}
