//! JSON inventory report.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use color_eyre::eyre::{Context, Result};
use serde::Serialize;

use fsinventory_scan::{FileSystemEntry, WalkOutcome};

/// Top-level report document.
#[derive(Debug, Serialize)]
struct InventoryDocument<'a> {
    root: Cow<'a, str>,
    generated_at: String,
    entry_count: usize,
    entries: Vec<ReportEntry<'a>>,
}

/// One entry as written to the report.
#[derive(Debug, Serialize)]
struct ReportEntry<'a> {
    path: Cow<'a, str>,
    parent: Cow<'a, str>,
    created: Option<String>,
    modified: Option<String>,
    size: i64,
    attributes: u32,
}

impl<'a> From<&'a FileSystemEntry> for ReportEntry<'a> {
    fn from(entry: &'a FileSystemEntry) -> Self {
        Self {
            path: entry.path.to_string_lossy(),
            parent: entry.parent.to_string_lossy(),
            created: entry.created.as_ref().map(format_timestamp),
            modified: entry.modified.as_ref().map(format_timestamp),
            size: entry.size,
            attributes: entry.attributes.bits(),
        }
    }
}

/// UTC, second precision.
fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Report file name for a run started at `now`.
pub fn report_file_name(now: DateTime<Utc>) -> String {
    format!("inventory_{}.json", now.format("%Y%m%d_%H%M%S"))
}

/// Write the inventory for `outcome` into `output_dir`.
///
/// Returns the path of the written file.
pub fn write_report(outcome: &WalkOutcome, output_dir: &Path, now: DateTime<Utc>) -> Result<PathBuf> {
    std::fs::create_dir_all(output_dir)
        .wrap_err_with(|| format!("Failed to create output directory {}", output_dir.display()))?;
    let path = output_dir.join(report_file_name(now));

    let document = InventoryDocument {
        root: outcome.root.to_string_lossy(),
        generated_at: format_timestamp(&now),
        entry_count: outcome.entries.len(),
        entries: outcome.entries.iter().map(ReportEntry::from).collect(),
    };

    let file =
        File::create(&path).wrap_err_with(|| format!("Failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &document)
        .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
    writer.flush()?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use fsinventory_scan::{Attributes, WalkSummary};
    use tempfile::TempDir;

    fn sample_outcome() -> WalkOutcome {
        let created = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 15).unwrap();
        let file = FileSystemEntry {
            path: PathBuf::from("/r/a/file1"),
            parent: PathBuf::from("/r/a"),
            created: Some(created + chrono::Duration::milliseconds(750)),
            modified: Some(created),
            size: 12,
            attributes: Attributes(Attributes::ARCHIVE),
        };
        let gone = FileSystemEntry::missing(PathBuf::from("/r/a/gone"));
        WalkOutcome {
            root: PathBuf::from("/r"),
            entries: vec![file, gone],
            summary: WalkSummary::default(),
        }
    }

    #[test]
    fn test_file_name_is_timestamped() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 7).unwrap();
        assert_eq!(report_file_name(now), "inventory_20241231_235907.json");
    }

    #[test]
    fn test_report_contents() {
        let temp = TempDir::new().unwrap();
        let now = Utc.with_ymd_and_hms(2024, 3, 2, 0, 0, 0).unwrap();

        let path = write_report(&sample_outcome(), temp.path(), now).unwrap();
        assert_eq!(path, temp.path().join("inventory_20240302_000000.json"));

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["entry_count"], 2);
        assert_eq!(json["generated_at"], "2024-03-02T00:00:00Z");

        let first = &json["entries"][0];
        assert_eq!(first["path"], "/r/a/file1");
        assert_eq!(first["parent"], "/r/a");
        assert_eq!(first["created"], "2024-03-01T08:30:15Z");
        assert_eq!(first["size"], 12);
        assert_eq!(first["attributes"], 0x20);

        let gone = &json["entries"][1];
        assert_eq!(gone["size"], -1);
        assert!(gone["modified"].is_null());
    }
}
