//! Lookup tables and patterns driving the audit and the cleanup rules.
//!
//! The tables are maintained by hand: run the audit, read the anomalies it
//! reports, extend the tables here, then export again. Nothing mutates an
//! [`AuditTables`] once it has been built.

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use crate::error::Result;

/// Street suffixes that are already in canonical form.
pub const EXPECTED_STREET_TYPES: [&str; 19] = [
    "Street", "Avenue", "Boulevard", "Drive", "Court", "Place", "Square", "Lane", "Road", "Trail",
    "Parkway", "Commons", "Broadway", "Circle", "Alley", "Crossing", "Highway", "Pike", "Way",
];

/// Abbreviation (as written in the data) to canonical suffix.
pub const STREET_MAPPING: [(&str, &str); 15] = [
    ("St", "Street"),
    ("St.", "Street"),
    ("Ave", "Avenue"),
    ("AVE", "Avenue"),
    ("AVENUE", "Avenue"),
    ("Aveneue", "Avenue"),
    ("Blvd", "Boulevard"),
    ("Dr", "Drive"),
    ("Dr.", "Drive"),
    ("drive", "Drive"),
    ("Rd.", "Road"),
    ("RD", "Road"),
    ("Rd", "Road"),
    ("road", "Road"),
    ("pike", "Pike"),
];

/// Postal codes of Lancaster County, PA and its immediate neighbours.
pub const EXPECTED_ZIP_CODES: [&str; 36] = [
    "17547", "17552", "17545", "17543", "17522", "17501", "17508", "17601", "17505", "17540",
    "17529", "17572", "17562", "17579", "17560", "17584", "17602", "17565", "17516", "17551",
    "17582", "17603", "17512", "17554", "17604", "17022", "17317", "17356", "17368", "17406",
    "17520", "17534", "17538", "17557", "17568", "17576",
];

/// Single-value data-entry typos and their corrections.
pub const ZIP_TYPOS: [(&str, &str); 1] = [("17250", "17520")];

/// Prefix mistakenly typed in front of some postal codes.
pub const ZIP_STATE_PREFIX: &str = "PA ";

/// Attributes of `node`/`way` that describe the edit that created them.
pub const CREATED_FIELDS: [&str; 5] = ["version", "changeset", "timestamp", "user", "uid"];

// A single trailing newline is tolerated, as in the original key audit.
const LOWER: &str = r"^[a-z_]*\n?$";
const LOWER_COLON: &str = r"^[a-z_]*:[a-z_]*\n?$";
const PROBLEM_CHARS: &str = r#"[=+/&<>;'"?%#$@,. \t\r\n]"#;
// ASCII word boundary, last non-space run, optional trailing period.
const STREET_TYPE: &str = r"(?i)(?-u:\b)\S+\.?$";

#[derive(Debug, Clone)]
pub struct AuditTables {
    pub expected_street_types: BTreeSet<String>,
    pub street_mapping: BTreeMap<String, String>,
    pub expected_zip_codes: BTreeSet<String>,
    pub zip_typos: BTreeMap<String, String>,
    pub zip_state_prefix: String,
    pub patterns: KeyPatterns,
    pub street_type: Regex,
}

/// Compiled patterns for classifying and sanitizing `tag` keys.
#[derive(Debug, Clone)]
pub struct KeyPatterns {
    pub lower: Regex,
    pub lower_colon: Regex,
    pub problem_chars: Regex,
}

impl KeyPatterns {
    pub fn new() -> Result<Self> {
        Ok(Self {
            lower: Regex::new(LOWER)?,
            lower_colon: Regex::new(LOWER_COLON)?,
            problem_chars: Regex::new(PROBLEM_CHARS)?,
        })
    }
}

impl AuditTables {
    /// Tables for the Lancaster, PA extract.
    pub fn new() -> Result<Self> {
        Ok(Self {
            expected_street_types: EXPECTED_STREET_TYPES.iter().map(|s| s.to_string()).collect(),
            street_mapping: STREET_MAPPING
                .iter()
                .map(|(abbr, full)| (abbr.to_string(), full.to_string()))
                .collect(),
            expected_zip_codes: EXPECTED_ZIP_CODES.iter().map(|s| s.to_string()).collect(),
            zip_typos: ZIP_TYPOS
                .iter()
                .map(|(typo, fixed)| (typo.to_string(), fixed.to_string()))
                .collect(),
            zip_state_prefix: ZIP_STATE_PREFIX.to_string(),
            patterns: KeyPatterns::new()?,
            street_type: Regex::new(STREET_TYPE)?,
        })
    }

    pub fn is_expected_street_type(&self, suffix: &str) -> bool {
        self.expected_street_types.contains(suffix)
    }

    pub fn is_expected_zip(&self, code: &str) -> bool {
        self.expected_zip_codes.contains(code)
    }
}
