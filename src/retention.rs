//! Age-based truncation of the newline-delimited JSON log file.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use tokio::fs;

/// Result of one truncation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruncateOutcome {
    /// No log file yet; nothing to do.
    Missing,
    Rewritten { kept: usize, dropped: usize },
}

/// Cutoff in epoch milliseconds: `now - max_age_ms`.
pub fn cutoff_ms(now: DateTime<Utc>, max_age_ms: f64) -> f64 {
    now.timestamp_millis() as f64 - max_age_ms
}

/// Drops every record older than `max_age_ms`, measured from the current time.
pub async fn truncate_log_file(path: &Path, max_age_ms: f64) -> io::Result<TruncateOutcome> {
    truncate_before(path, cutoff_ms(Utc::now(), max_age_ms)).await
}

/// Rewrites `path` keeping lines whose `time` is at or after `cutoff`, plus every line
/// whose timestamp cannot be determined.
pub async fn truncate_before(path: &Path, cutoff: f64) -> io::Result<TruncateOutcome> {
    truncate_with_pause(path, cutoff, None).await
}

pub(crate) async fn truncate_with_pause(
    path: &Path,
    cutoff: f64,
    pause_before_rename: Option<Duration>,
) -> io::Result<TruncateOutcome> {
    let raw = match fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(TruncateOutcome::Missing),
        Err(e) => return Err(e),
    };

    let (kept, dropped) = filter_lines(&raw, cutoff);
    let mut payload = Vec::with_capacity(raw.len());
    for line in &kept {
        payload.extend_from_slice(line);
        payload.push(b'\n');
    }

    replace_atomically(path, &payload, pause_before_rename).await?;
    Ok(TruncateOutcome::Rewritten {
        kept: kept.len(),
        dropped,
    })
}

/// Order-preserving filter over non-empty lines. Returns the survivors and the drop count.
/// Lines that are not valid UTF-8 are kept byte-for-byte.
pub fn filter_lines(raw: &[u8], cutoff: f64) -> (Vec<&[u8]>, usize) {
    let mut kept = Vec::new();
    let mut dropped = 0;
    let lines = raw
        .split(|b| *b == b'\n')
        .map(|l| l.strip_suffix(b"\r").unwrap_or(l))
        .filter(|l| !l.is_empty());
    for line in lines {
        let ts = std::str::from_utf8(line).ok().and_then(record_timestamp_ms);
        match ts {
            Some(ts) if ts < cutoff => dropped += 1,
            _ => kept.push(line),
        }
    }
    (kept, dropped)
}

/// Epoch milliseconds of a record's `time` field, when there is one we understand.
pub fn record_timestamp_ms(line: &str) -> Option<f64> {
    let Ok(Value::Object(record)) = serde_json::from_str::<Value>(line) else {
        return None;
    };
    match record.get("time")? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_time(s).map(|t| t.timestamp_millis() as f64),
        _ => None,
    }
}

/// Accepts RFC 3339, RFC 2822, offset-less date-times (read as UTC) and bare dates.
pub fn parse_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = DateTime::parse_from_rfc2822(s) {
        return Some(t.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(t) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(t.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// Writes `payload` to a sibling temp file, then renames it over `path`.
async fn replace_atomically(
    path: &Path,
    payload: &[u8],
    pause_before_rename: Option<Duration>,
) -> io::Result<()> {
    let temp = temp_path_for(path);
    if let Err(e) = write_with_mode_of(&temp, path, payload).await {
        let _ = fs::remove_file(&temp).await;
        return Err(e);
    }
    if let Some(pause) = pause_before_rename {
        tokio::time::sleep(pause).await;
    }
    if let Err(e) = fs::rename(&temp, path).await {
        let _ = fs::remove_file(&temp).await;
        return Err(e);
    }
    Ok(())
}

/// Writes the temp file and gives it the permissions of the file it will replace.
async fn write_with_mode_of(temp: &Path, original: &Path, payload: &[u8]) -> io::Result<()> {
    fs::write(temp, payload).await?;
    let permissions = fs::metadata(original).await?.permissions();
    fs::set_permissions(temp, permissions).await
}

fn temp_path_for(path: &Path) -> PathBuf {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}.{}.tmp", std::process::id(), nanos));
    path.with_file_name(name)
}
