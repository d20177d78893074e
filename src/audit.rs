//! All audits in a single pass over the file.
//!
//! Each audit only reads the elements it cares about and none depends on
//! another, so one pass with several accumulators gives the same results as
//! [`count_tags`](crate::keys::count_tags),
//! [`count_keys`](crate::keys::count_keys),
//! [`audit_key_types`](crate::keys::audit_key_types),
//! [`audit_street_names`](crate::street::audit_street_names) and
//! [`audit_zip_codes`](crate::postcode::audit_zip_codes) run one by one.

use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::keys::{self, Counts, KeyTypeAudit};
use crate::postcode::ZipAudit;
use crate::reader::{self, Element};
use crate::street::{self, StreetAudit};
use crate::tables::AuditTables;

#[derive(Debug, Clone, PartialEq)]
pub struct AuditReport {
    pub tag_counts: Counts,
    pub key_counts: Counts,
    pub key_types: KeyTypeAudit,
    pub street_types: StreetAudit,
    pub zip_codes: ZipAudit,
}

impl AuditReport {
    pub fn new(tables: &AuditTables, example_limit: Option<usize>) -> Self {
        Self {
            tag_counts: Counts::new(),
            key_counts: Counts::new(),
            key_types: KeyTypeAudit::new(example_limit),
            street_types: StreetAudit::new(),
            zip_codes: ZipAudit::new(tables),
        }
    }

    pub fn observe(&mut self, tables: &AuditTables, element: &Element) -> Result<()> {
        keys::observe_tag(&mut self.tag_counts, element);
        keys::observe_key(&mut self.key_counts, element)?;
        self.key_types.observe(&tables.patterns, element)?;
        street::observe(tables, &mut self.street_types, element)?;
        self.zip_codes.observe(element)?;
        Ok(())
    }
}

pub fn audit_all(
    path: &Path,
    tables: &AuditTables,
    example_limit: Option<usize>,
) -> Result<AuditReport> {
    let mut report = AuditReport::new(tables, example_limit);
    let mut elements = 0usize;
    for element in reader::open(path)? {
        report.observe(tables, &element?)?;
        elements += 1;
    }
    info!(
        elements,
        keys = report.key_counts.len(),
        street_anomalies = report.street_types.len(),
        other_zip_codes = report.zip_codes.other.len(),
        path = %path.display(),
        "audit complete"
    );
    Ok(report)
}
