use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use tracing::{debug, info};

use crate::error::Result;
use crate::reader::{self, Element};
use crate::tables::AuditTables;

pub const POSTCODE_KEY: &str = "addr:postcode";

type ZipRule = fn(&AuditTables, &str) -> Option<String>;

/// Corrections in priority order; the first rule that fires decides.
const ZIP_RULES: [(&str, ZipRule); 3] = [
    ("known typo", fix_known_typo),
    ("extended code", truncate_extended_code),
    ("state prefix", strip_state_prefix),
];

fn fix_known_typo(tables: &AuditTables, code: &str) -> Option<String> {
    tables.zip_typos.get(code).cloned()
}

/// ZIP+4 => ZIP.
fn truncate_extended_code(_: &AuditTables, code: &str) -> Option<String> {
    code.split_once('-').map(|(base, _)| base.to_string())
}

fn strip_state_prefix(tables: &AuditTables, code: &str) -> Option<String> {
    let prefix = tables.zip_state_prefix.as_str();
    if !code.starts_with(prefix) {
        return None;
    }
    code.rsplit(prefix).next().map(str::to_string)
}

/// Applies the first matching correction. The result is not re-validated.
pub fn update_zip_code(code: &str, tables: &AuditTables) -> String {
    for (rule, apply) in ZIP_RULES {
        if let Some(fixed) = apply(tables, code) {
            debug!(rule, from = code, to = %fixed, "corrected postal code");
            return fixed;
        }
    }
    code.to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZipAudit {
    /// Occurrences of each expected code, including those never seen.
    pub counts: BTreeMap<String, usize>,
    /// Codes outside the expected set.
    pub other: BTreeSet<String>,
}

impl ZipAudit {
    pub fn new(tables: &AuditTables) -> Self {
        Self {
            counts: tables
                .expected_zip_codes
                .iter()
                .map(|code| (code.clone(), 0))
                .collect(),
            other: BTreeSet::new(),
        }
    }

    pub fn record(&mut self, code: &str) {
        match self.counts.get_mut(code) {
            Some(count) => *count += 1,
            None => {
                self.other.insert(code.to_string());
            }
        }
    }

    pub fn observe(&mut self, element: &Element) -> Result<()> {
        if !element.is_node_or_way() {
            return Ok(());
        }
        for code in element.tag_values(POSTCODE_KEY) {
            self.record(code?);
        }
        Ok(())
    }
}

pub fn audit_zip_codes(path: &Path, tables: &AuditTables) -> Result<ZipAudit> {
    let mut audit = ZipAudit::new(tables);
    for element in reader::open(path)? {
        audit.observe(&element?)?;
    }
    info!(
        expected = audit.counts.values().sum::<usize>(),
        other = audit.other.len(),
        "audited postal codes"
    );
    Ok(audit)
}
