//! Human-readable rendering of an [`AuditReport`], plus CSV copies of the
//! tables for diffing successive audits.

use std::io::Write;
use std::path::Path;

use csv::Writer;

use crate::audit::AuditReport;
use crate::error::Result;
use crate::keys::{sort_by_count, AttrSet};
use crate::tables::KeyPatterns;

/// Examples shown per key-type bucket.
pub const EXAMPLES_SHOWN: usize = 10;

pub fn write_report<W: Write>(out: &mut W, report: &AuditReport) -> Result<()> {
    writeln!(out, "== Element tags ==")?;
    for (tag, count) in &report.tag_counts {
        writeln!(out, "{tag}: {count}")?;
    }
    writeln!(out)?;

    writeln!(out, "== Tag keys ==")?;
    for (key, count) in sort_by_count(&report.key_counts, false) {
        writeln!(out, "{key}: {count}")?;
    }
    writeln!(out)?;

    writeln!(out, "== Key types ==")?;
    for (key_type, bucket) in report.key_types.iter() {
        writeln!(out, "{key_type} count: {}", bucket.count)?;
        for example in bucket.examples.iter().take(EXAMPLES_SHOWN) {
            writeln!(out, "  {}", format_attrs(example))?;
        }
    }
    writeln!(out)?;

    writeln!(out, "== Unexpected street types ==")?;
    for (suffix, names) in &report.street_types {
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        writeln!(out, "{suffix}: {}", names.join(", "))?;
    }
    writeln!(out)?;

    writeln!(out, "== Postal codes ==")?;
    for (code, count) in &report.zip_codes.counts {
        writeln!(out, "{code}: {count}")?;
    }
    let other: Vec<&str> = report.zip_codes.other.iter().map(String::as_str).collect();
    writeln!(out, "other: {}", other.join(", "))?;
    Ok(())
}

fn format_attrs(attrs: &AttrSet) -> String {
    let pairs: Vec<String> = attrs
        .iter()
        .map(|(name, value)| format!("{name}={value:?}"))
        .collect();
    format!("{{{}}}", pairs.join(", "))
}

/// Writes `tag_counts.csv`, `key_counts.csv`, `street_types.csv` and
/// `zip_codes.csv` into `dir`, creating it if needed.
pub fn write_csv_reports(dir: &Path, report: &AuditReport, patterns: &KeyPatterns) -> Result<()> {
    std::fs::create_dir_all(dir)?;

    let mut writer = Writer::from_path(dir.join("tag_counts.csv"))?;
    writer.write_record(["tag", "count"])?;
    for (tag, count) in &report.tag_counts {
        let count = count.to_string();
        writer.write_record([tag.as_str(), count.as_str()])?;
    }
    writer.flush()?;

    let mut writer = Writer::from_path(dir.join("key_counts.csv"))?;
    writer.write_record(["key", "key_type", "count"])?;
    for (key, count) in sort_by_count(&report.key_counts, false) {
        let count = count.to_string();
        let key_type = patterns.classify_key(&key);
        writer.write_record([key.as_str(), key_type.as_str(), count.as_str()])?;
    }
    writer.flush()?;

    let mut writer = Writer::from_path(dir.join("street_types.csv"))?;
    writer.write_record(["suffix", "street_name"])?;
    for (suffix, names) in &report.street_types {
        for name in names {
            writer.write_record([suffix.as_str(), name.as_str()])?;
        }
    }
    writer.flush()?;

    let mut writer = Writer::from_path(dir.join("zip_codes.csv"))?;
    writer.write_record(["postcode", "count"])?;
    for (code, count) in &report.zip_codes.counts {
        let count = count.to_string();
        writer.write_record([code.as_str(), count.as_str()])?;
    }
    for code in &report.zip_codes.other {
        writer.write_record([code.as_str(), "other"])?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::audit_all;
    use crate::tables::AuditTables;
    use csv::ReaderBuilder;
    use tempfile::tempdir;

    const OSM_REPORT: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<osm version="0.6" generator="test">
  <node id="1" lat="40.0" lon="-76.3">
    <tag k="addr:street" v="Orange St" />
    <tag k="addr:postcode" v="17602" />
  </node>
  <node id="2" lat="40.0" lon="-76.3">
    <tag k="addr:street" v="Prince St" />
    <tag k="addr:postcode" v="17602-9999" />
    <tag k="note:en" v="corner, shop" />
  </node>
</osm>
"#;

    fn sample_report(dir: &tempfile::TempDir) -> AuditReport {
        let path = dir.path().join("report.osm");
        std::fs::write(&path, OSM_REPORT).unwrap();
        audit_all(&path, &AuditTables::new().unwrap(), Some(EXAMPLES_SHOWN)).unwrap()
    }

    fn read_rows(path: &Path) -> Vec<Vec<String>> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .from_path(path)
            .unwrap();
        reader
            .records()
            .map(|row| row.unwrap().iter().map(|value| value.to_string()).collect())
            .collect()
    }

    #[test]
    fn text_report_lists_every_section() {
        let dir = tempdir().unwrap();
        let report = sample_report(&dir);

        let mut out = Vec::new();
        write_report(&mut out, &report).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("== Element tags ==\nnode: 2\nosm: 1\ntag: 5\n"));
        assert!(text.contains("addr:postcode: 2\n"));
        assert!(text.contains("lower_colon count: 5\n"));
        assert!(text.contains("  {k=\"note:en\", v=\"corner, shop\"}\n"));
        assert!(text.contains("St: Orange St, Prince St\n"));
        assert!(text.contains("17602: 1\n"));
        assert!(text.ends_with("other: 17602-9999\n"));
    }

    #[test]
    fn csv_reports_are_written() {
        let dir = tempdir().unwrap();
        let report = sample_report(&dir);
        let out_dir = dir.path().join("reports");

        let patterns = KeyPatterns::new().unwrap();
        write_csv_reports(&out_dir, &report, &patterns).unwrap();

        let tags = read_rows(&out_dir.join("tag_counts.csv"));
        assert_eq!(tags[0], vec!["tag", "count"]);
        assert!(tags.contains(&vec!["tag".to_string(), "5".to_string()]));

        let keys = read_rows(&out_dir.join("key_counts.csv"));
        assert_eq!(keys[1], vec!["addr:postcode", "lower_colon", "2"]);

        let streets = read_rows(&out_dir.join("street_types.csv"));
        assert_eq!(
            streets[1..].to_vec(),
            vec![
                vec!["St".to_string(), "Orange St".to_string()],
                vec!["St".to_string(), "Prince St".to_string()],
            ]
        );

        let zips = read_rows(&out_dir.join("zip_codes.csv"));
        assert_eq!(zips.len(), 1 + 36 + 1);
        assert_eq!(zips.last().unwrap(), &vec!["17602-9999", "other"]);
    }
}
