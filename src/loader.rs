use anyhow::Context;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

use crate::models::{DatasetMetadata, JobRecord, RecordStore};

/// Summary file the scrape pipeline writes next to the dataset.
const METADATA_FILE: &str = "metadata.json";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read dataset {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to fetch dataset {url}: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to decompress dataset: {0}")]
    Decompress(#[source] std::io::Error),

    #[error("failed to parse dataset: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetSource {
    Path(PathBuf),
    Url(String),
}

impl DatasetSource {
    pub fn parse(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            DatasetSource::Url(raw.to_string())
        } else {
            DatasetSource::Path(PathBuf::from(raw))
        }
    }
}

impl fmt::Display for DatasetSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetSource::Path(path) => write!(f, "{}", path.display()),
            DatasetSource::Url(url) => f.write_str(url),
        }
    }
}

/// Gzip magic bytes check.
pub fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[0] == 0x1f && data[1] == 0x8b
}

/// Decodes a JSON array of records, decompressing first if the bytes are gzip.
pub fn decode(bytes: &[u8]) -> Result<Vec<JobRecord>, LoadError> {
    if is_gzip(bytes) {
        let mut json = Vec::with_capacity(bytes.len() * 8);
        GzDecoder::new(bytes)
            .read_to_end(&mut json)
            .map_err(LoadError::Decompress)?;
        Ok(serde_json::from_slice(&json)?)
    } else {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Loads the whole dataset. Any failure is fatal: no partial dataset is returned.
pub fn load(source: &DatasetSource) -> Result<RecordStore, LoadError> {
    let started = Instant::now();

    let (bytes, metadata) = match source {
        DatasetSource::Path(path) => {
            let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
                path: path.clone(),
                source,
            })?;
            (bytes, load_metadata(path))
        }
        DatasetSource::Url(url) => (fetch(url)?, None),
    };

    let records = decode(&bytes)?;
    tracing::info!(
        %source,
        records = records.len(),
        bytes = bytes.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "dataset loaded"
    );
    Ok(RecordStore::new(records, metadata))
}

fn fetch(url: &str) -> Result<Vec<u8>, LoadError> {
    let http = |source: reqwest::Error| LoadError::Http {
        url: url.to_string(),
        source,
    };
    let response = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(http)?;
    let bytes = response.bytes().map_err(http)?;
    Ok(bytes.to_vec())
}

/// Reads `metadata.json` beside a local dataset. Absent or malformed metadata is ignored.
pub fn load_metadata(dataset: &Path) -> Option<DatasetMetadata> {
    let path = dataset.parent()?.join(METADATA_FILE);
    let raw = std::fs::read_to_string(&path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(meta) => Some(meta),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring malformed metadata");
            None
        }
    }
}

/// Writes `metadata.json` beside `dataset`.
pub fn write_metadata(dataset: &Path, meta: &DatasetMetadata) -> anyhow::Result<()> {
    let path = match dataset.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent)?;
            parent.join(METADATA_FILE)
        }
        _ => PathBuf::from(METADATA_FILE),
    };
    let file = File::create(&path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, meta).context("Failed to encode metadata")?;
    writer.flush()?;
    Ok(())
}

/// Copies the scrape's metadata next to a merged dataset with `total_jobs` updated.
/// Returns `None`, writing nothing, when the scrape has no readable metadata.
pub fn carry_metadata(
    fresh: &Path,
    output: &Path,
    total_jobs: usize,
) -> anyhow::Result<Option<DatasetMetadata>> {
    let Some(mut meta) = load_metadata(fresh) else {
        return Ok(None);
    };
    meta.total_jobs = Some(total_jobs as u64);
    write_metadata(output, &meta)?;
    Ok(Some(meta))
}

/// Writes records as gzip-compressed JSON, the format `load` reads back.
pub fn write_dataset(path: &Path, records: &[JobRecord]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    serde_json::to_writer(&mut encoder, records).context("Failed to encode dataset")?;
    encoder.finish()?.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"url": "a", "title": "Staff Engineer", "company": "Acme", "location": {"name": "Remote"}},
        {"absolute_url": "b", "title": "Engineer", "company_slug": "beta", "location": "NYC", "ats": "lever"}
    ]"#;

    fn gzip(bytes: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(bytes).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn detects_gzip_magic() {
        assert!(is_gzip(&gzip(b"[]")));
        assert!(!is_gzip(b"[]"));
        assert!(!is_gzip(b""));
    }

    #[test]
    fn decodes_plain_and_gzip_json() {
        let plain = decode(SAMPLE.as_bytes()).unwrap();
        let packed = decode(&gzip(SAMPLE.as_bytes())).unwrap();
        assert_eq!(plain, packed);
        assert_eq!(plain.len(), 2);
        assert_eq!(plain[1].company_name(), "beta");
    }

    #[test]
    fn rejects_non_array_and_truncated_input() {
        assert!(matches!(decode(br#"{"jobs": []}"#), Err(LoadError::Parse(_))));
        let packed = gzip(SAMPLE.as_bytes());
        let truncated = &packed[..packed.len() / 2];
        assert!(decode(truncated).is_err());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = DatasetSource::Path(dir.path().join("missing.json.gz"));
        assert!(matches!(load(&source), Err(LoadError::Io { .. })));
    }

    #[test]
    fn write_then_load_with_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("all_jobs.json.gz");
        let records = decode(SAMPLE.as_bytes()).unwrap();
        write_dataset(&path, &records).unwrap();
        std::fs::write(
            dir.path().join(METADATA_FILE),
            r#"{"last_updated": "2024-05-01T00:00:00Z", "total_jobs": 2, "source": "greenhouse_api"}"#,
        )
        .unwrap();

        let store = load(&DatasetSource::Path(path)).unwrap();
        assert_eq!(store.records(), records.as_slice());
        let meta = store.metadata().unwrap();
        assert_eq!(meta.total_jobs, Some(2));
        assert_eq!(meta.source.as_deref(), Some("greenhouse_api"));
    }

    #[test]
    fn merged_dataset_gets_updated_metadata() {
        let scrape = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let fresh = scrape.path().join("new_jobs.json.gz");
        let output = data.path().join("all_jobs.json.gz");
        std::fs::write(
            scrape.path().join(METADATA_FILE),
            r#"{"last_updated": "2024-05-01T00:00:00Z", "total_jobs": 10, "total_companies": 4, "failed_companies": ["x"]}"#,
        )
        .unwrap();
        std::fs::write(data.path().join(METADATA_FILE), r#"{"total_jobs": 1}"#).unwrap();

        let meta = carry_metadata(&fresh, &output, 42).unwrap().unwrap();
        assert_eq!(meta.total_jobs, Some(42));

        let written = load_metadata(&output).unwrap();
        assert_eq!(written.total_jobs, Some(42));
        assert_eq!(written.total_companies, Some(4));
        assert_eq!(written.last_updated.as_deref(), Some("2024-05-01T00:00:00Z"));
        assert_eq!(written.extra["failed_companies"], serde_json::json!(["x"]));
    }

    #[test]
    fn merge_without_scrape_metadata_leaves_output_alone() {
        let scrape = tempfile::tempdir().unwrap();
        let data = tempfile::tempdir().unwrap();
        let output = data.path().join("all_jobs.json.gz");

        let carried = carry_metadata(&scrape.path().join("new.json.gz"), &output, 3).unwrap();
        assert!(carried.is_none());
        assert!(!data.path().join(METADATA_FILE).exists());
    }

    #[test]
    fn source_parse() {
        assert_eq!(
            DatasetSource::parse("https://host/all_jobs.json.gz"),
            DatasetSource::Url("https://host/all_jobs.json.gz".into())
        );
        assert_eq!(
            DatasetSource::parse("data/all_jobs.json.gz"),
            DatasetSource::Path(PathBuf::from("data/all_jobs.json.gz"))
        );
    }
}
