//! Output sinks for an assembled augmented diff document: local
//! filesystem or S3, each optionally gzip-compressed by URI suffix, plus
//! the `status.txt` sequence-id sidecar a replication consumer polls.

use std::fs;
use std::io::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use log::info;
use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use url::Url;

/// Seconds between the OSM replication epoch (2012-09-12T10:36:00Z) and
/// `00:00:00Z`, dividing by 60 turns a timestamp into a minutely sequence
/// id — the formula the replication consumer expects to invert.
const ADIFF_EPOCH_SECONDS: i64 = 1_347_432_960;

/// Converts a UTC instant to the minutely augmented-diff sequence id.
pub fn datetime_to_adiff_sequence(ts: DateTime<Utc>) -> i64 {
    (ts.timestamp() - ADIFF_EPOCH_SECONDS).div_euclid(60)
}

/// Where the assembled document (and its `status.txt` sidecar) should go.
/// `s3://bucket/key` dispatches to S3; anything else is a local path.
/// A `.gz` suffix on the document path gzip-compresses the body.
pub struct Destination {
    pub document_uri: String,
    pub status_dir_uri: String,
}

/// Writes `document` (already pretty-printed XML) to `destination`,
/// auto-selecting a local, S3, or gzip writer from the URI, then writes
/// the sequence-id sidecar alongside it.
pub async fn write_diff(destination: &Destination, document: &str, sequence_id: i64) -> Result<()> {
    if destination.document_uri.starts_with("s3://") {
        if destination.document_uri.ends_with(".gz") {
            s3_gzip_writer(&destination.document_uri, document).await?;
        } else {
            s3_writer(&destination.document_uri, document).await?;
        }
    } else if destination.document_uri.ends_with(".gz") {
        file_gzip_writer(&destination.document_uri, document)?;
    } else {
        file_writer(&destination.document_uri, document)?;
    }

    write_status(&destination.status_dir_uri, sequence_id).await
}

fn file_writer(output_file: &str, document: &str) -> Result<()> {
    let path = Path::new(output_file);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
    }
    fs::write(path, document).with_context(|| format!("writing {}", output_file))?;
    info!("augmented diff written to: {} (gzip=false)", output_file);
    Ok(())
}

fn file_gzip_writer(output_file: &str, document: &str) -> Result<()> {
    let path = Path::new(output_file);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating directory {}", parent.display()))?;
        }
    }
    let file = fs::File::create(path).with_context(|| format!("creating {}", output_file))?;
    let mut gz = GzEncoder::new(file, Compression::default());
    gz.write_all(document.as_bytes())?;
    gz.finish()?;
    info!("augmented diff written to: {} (gzip=true)", output_file);
    Ok(())
}

fn gzip_bytes(document: &str) -> Result<Vec<u8>> {
    let mut gz = GzEncoder::new(Vec::new(), Compression::default());
    gz.write_all(document.as_bytes())?;
    Ok(gz.finish()?)
}

fn s3_store_and_path(uri: &str) -> Result<(object_store::aws::AmazonS3, ObjectPath)> {
    let url = Url::parse(uri).with_context(|| format!("parsing S3 uri {}", uri))?;
    let bucket = url.host_str().with_context(|| format!("S3 uri {} has no bucket", uri))?;
    let store = AmazonS3Builder::from_env()
        .with_bucket_name(bucket)
        .build()
        .with_context(|| format!("building S3 client for bucket {}", bucket))?;
    let key = ObjectPath::from(url.path().trim_start_matches('/'));
    Ok((store, key))
}

async fn s3_writer(uri: &str, document: &str) -> Result<()> {
    let (store, key) = s3_store_and_path(uri)?;
    store
        .put(&key, Bytes::copy_from_slice(document.as_bytes()))
        .await
        .with_context(|| format!("uploading {}", uri))?;
    info!("augmented diff written to: {} (gzip=false)", uri);
    Ok(())
}

async fn s3_gzip_writer(uri: &str, document: &str) -> Result<()> {
    let (store, key) = s3_store_and_path(uri)?;
    let compressed = gzip_bytes(document)?;
    store
        .put(&key, Bytes::from(compressed))
        .await
        .with_context(|| format!("uploading {}", uri))?;
    info!("augmented diff written to: {} (gzip=true)", uri);
    Ok(())
}

async fn write_status(status_dir_uri: &str, sequence_id: i64) -> Result<()> {
    let body = sequence_id.to_string();
    if status_dir_uri.starts_with("s3://") {
        let joined = format!("{}/status.txt", status_dir_uri.trim_end_matches('/'));
        let (store, key) = s3_store_and_path(&joined)?;
        store
            .put(&key, Bytes::from(body.into_bytes()))
            .await
            .with_context(|| format!("uploading {}", joined))?;
    } else {
        let dir = Path::new(status_dir_uri);
        fs::create_dir_all(dir).with_context(|| format!("creating directory {}", dir.display()))?;
        fs::write(dir.join("status.txt"), body)
            .with_context(|| format!("writing status.txt under {}", status_dir_uri))?;
    }
    Ok(())
}

/// Convenience constructor for callers that only have a naive sequence
/// timestamp — wraps it as UTC before delegating to
/// [`datetime_to_adiff_sequence`].
pub fn sequence_for_timestamp(epoch_seconds: i64) -> i64 {
    datetime_to_adiff_sequence(Utc.timestamp_opt(epoch_seconds, 0).single().unwrap_or_else(Utc::now))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_formula_matches_replication_epoch() {
        let ts = Utc.timestamp_opt(ADIFF_EPOCH_SECONDS, 0).unwrap();
        assert_eq!(datetime_to_adiff_sequence(ts), 0);
        assert_eq!(datetime_to_adiff_sequence(ts + chrono::Duration::seconds(59)), 0);
        assert_eq!(datetime_to_adiff_sequence(ts + chrono::Duration::seconds(60)), 1);
    }

    #[test]
    fn file_writer_creates_parent_directories() {
        let dir = std::env::temp_dir().join(format!("osm-adiff-sink-test-{}", std::process::id()));
        let file = dir.join("nested").join("000000001.osc.xml");
        file_writer(file.to_str().unwrap(), "<osm></osm>").unwrap();
        assert!(file.exists());
        let _ = fs::remove_dir_all(&dir);
    }
}
