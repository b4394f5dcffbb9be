use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Location as emitted by the scrapers: either a bare string or an object with a `name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Location {
    Plain(String),
    Named {
        #[serde(default)]
        name: Option<String>,
    },
}

impl Location {
    pub fn text(&self) -> &str {
        match self {
            Location::Plain(s) => s,
            Location::Named { name } => name.as_deref().unwrap_or(""),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub absolute_url: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub company_slug: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub ats: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub is_recruiter: Option<bool>,
    #[serde(
        rename = "workplaceType",
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub workplace_type: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub scraped_at: Option<String>,
    /// Fields we don't interpret (`id`, `departments`, ...), kept so a merge round-trips them.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// A field with the wrong JSON type reads as absent instead of failing the whole dataset.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

impl JobRecord {
    /// Status key: `absolute_url`, else `url`. Empty strings count as missing.
    pub fn job_id(&self) -> Option<&str> {
        non_empty(self.absolute_url.as_deref()).or_else(|| non_empty(self.url.as_deref()))
    }

    pub fn title_text(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    /// Display company: `company`, falling back to `company_slug`.
    pub fn company_name(&self) -> &str {
        non_empty(self.company.as_deref())
            .or_else(|| non_empty(self.company_slug.as_deref()))
            .unwrap_or("")
    }

    pub fn location_text(&self) -> &str {
        self.location.as_ref().map(Location::text).unwrap_or("")
    }

    pub fn is_recruiter(&self) -> bool {
        self.is_recruiter == Some(true)
    }

    pub fn is_remote(&self) -> bool {
        self.location_text().to_lowercase().contains("remote")
            || self
                .workplace_type
                .as_deref()
                .is_some_and(|w| w.eq_ignore_ascii_case("remote"))
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Saved,
    Applied,
    Ignored,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 3] = [
        ApplicationStatus::Saved,
        ApplicationStatus::Applied,
        ApplicationStatus::Ignored,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ApplicationStatus::Saved => "saved",
            ApplicationStatus::Applied => "applied",
            ApplicationStatus::Ignored => "ignored",
        }
    }

    /// Lenient parse: anything unrecognised (including "") means no status.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "saved" => Some(ApplicationStatus::Saved),
            "applied" => Some(ApplicationStatus::Applied),
            "ignored" => Some(ApplicationStatus::Ignored),
            _ => None,
        }
    }
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub status: ApplicationStatus,
    pub date: DateTime<Utc>,
}

pub type StatusMap = HashMap<String, StatusEntry>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub title: String,
    pub company: String,
    pub location: String,
    pub hide_recruiters: bool,
    pub remote_only: bool,
    pub hide_applied: bool,
    pub status: Option<ApplicationStatus>,
}

impl FilterCriteria {
    /// True when any predicate would exclude something.
    pub fn is_active(&self) -> bool {
        self.has_shareable_filters()
            || self.hide_recruiters
            || self.hide_applied
            || self.status.is_some()
    }

    /// The subset of criteria mirrored into the shareable URL.
    pub fn has_shareable_filters(&self) -> bool {
        !self.title.trim().is_empty()
            || !self.company.trim().is_empty()
            || !self.location.trim().is_empty()
            || self.remote_only
    }

    pub fn depends_on_status(&self) -> bool {
        self.hide_applied || self.status.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Title,
    Company,
    Location,
    Ats,
    Updated,
}

impl SortKey {
    pub const ALL: [SortKey; 5] = [
        SortKey::Title,
        SortKey::Company,
        SortKey::Location,
        SortKey::Ats,
        SortKey::Updated,
    ];

    /// Unknown column names parse to `None`, i.e. no sort.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "title" => Some(SortKey::Title),
            "company" => Some(SortKey::Company),
            "location" => Some(SortKey::Location),
            "ats" => Some(SortKey::Ats),
            "updated" | "updated_at" => Some(SortKey::Updated),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortKey::Title => "title",
            SortKey::Company => "company",
            SortKey::Location => "location",
            SortKey::Ats => "ats",
            SortKey::Updated => "updated",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SortState {
    pub key: Option<SortKey>,
    pub direction: SortDirection,
}

impl SortState {
    pub fn by(key: SortKey, direction: SortDirection) -> Self {
        Self {
            key: Some(key),
            direction,
        }
    }

    /// Same key flips direction; a new key starts ascending.
    pub fn toggle(&mut self, key: SortKey) {
        if self.key == Some(key) {
            self.direction = self.direction.flipped();
        } else {
            self.key = Some(key);
            self.direction = SortDirection::Asc;
        }
    }
}

/// Summary written next to the dataset by the scrape pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatasetMetadata {
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub total_companies: Option<u64>,
    #[serde(default)]
    pub active_companies: Option<u64>,
    #[serde(default)]
    pub total_jobs: Option<u64>,
    #[serde(default)]
    pub source: Option<String>,
    /// Anything else the pipeline wrote, kept so a rewrite loses nothing.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The decoded dataset. Never mutated after load.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Vec<JobRecord>,
    metadata: Option<DatasetMetadata>,
}

impl RecordStore {
    pub fn new(records: Vec<JobRecord>, metadata: Option<DatasetMetadata>) -> Self {
        Self { records, metadata }
    }

    pub fn records(&self) -> &[JobRecord] {
        &self.records
    }

    pub fn metadata(&self) -> Option<&DatasetMetadata> {
        self.metadata.as_ref()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<JobRecord> {
        self.records
    }
}
