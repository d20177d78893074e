use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use tracing::{debug, info};

use crate::error::Result;
use crate::reader::{self, Element};
use crate::tables::AuditTables;

pub const STREET_KEY: &str = "addr:street";

/// Unexpected suffix => every distinct street name that ended with it.
pub type StreetAudit = BTreeMap<String, BTreeSet<String>>;

/// Last whitespace-delimited token of `name`, trailing period included.
pub fn extract_suffix<'a>(tables: &AuditTables, name: &'a str) -> Option<&'a str> {
    tables.street_type.find(name).map(|m| m.as_str())
}

pub fn audit_street_type(tables: &AuditTables, audit: &mut StreetAudit, name: &str) {
    if let Some(suffix) = extract_suffix(tables, name) {
        if !tables.is_expected_street_type(suffix) {
            audit
                .entry(suffix.to_string())
                .or_default()
                .insert(name.to_string());
        }
    }
}

pub fn observe(tables: &AuditTables, audit: &mut StreetAudit, element: &Element) -> Result<()> {
    if !element.is_node_or_way() {
        return Ok(());
    }
    for name in element.tag_values(STREET_KEY) {
        audit_street_type(tables, audit, name?);
    }
    Ok(())
}

pub fn audit_street_names(path: &Path, tables: &AuditTables) -> Result<StreetAudit> {
    let mut audit = StreetAudit::new();
    for element in reader::open(path)? {
        observe(tables, &mut audit, &element?)?;
    }
    info!(suffixes = audit.len(), "audited street names");
    Ok(audit)
}

/// Rewrites an abbreviated suffix to its canonical form.
///
/// Names whose suffix is already expected, or that have no entry in the
/// mapping, come back unchanged. The replacement cuts the name at the first
/// occurrence of the suffix text, which is not necessarily the last word.
pub fn update_street_name(name: &str, tables: &AuditTables) -> String {
    let Some(suffix) = extract_suffix(tables, name) else {
        return name.to_string();
    };
    if tables.is_expected_street_type(suffix) {
        return name.to_string();
    }
    let Some(full) = tables.street_mapping.get(suffix) else {
        return name.to_string();
    };

    let head = name.split_once(suffix).map_or(name, |(head, _)| head);
    let updated = format!("{head}{full}");
    debug!(from = name, to = %updated, "normalized street name");
    updated
}
