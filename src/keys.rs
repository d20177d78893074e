use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use tracing::info;

use crate::error::Result;
use crate::reader::{self, Element};
use crate::tables::KeyPatterns;

pub type Counts = BTreeMap<String, usize>;

/// Raw attributes of one `tag` element, in document order.
pub type AttrSet = Vec<(String, String)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyType {
    Lower,
    LowerColon,
    ProblemChars,
    Other,
}

impl KeyType {
    pub const ALL: [KeyType; 4] = [
        KeyType::Lower,
        KeyType::LowerColon,
        KeyType::ProblemChars,
        KeyType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::Lower => "lower",
            KeyType::LowerColon => "lower_colon",
            KeyType::ProblemChars => "problemchars",
            KeyType::Other => "other",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl KeyPatterns {
    /// Classification rules, tried in order.
    pub fn rules(&self) -> [(KeyType, &regex::Regex); 3] {
        [
            (KeyType::Lower, &self.lower),
            (KeyType::LowerColon, &self.lower_colon),
            (KeyType::ProblemChars, &self.problem_chars),
        ]
    }

    /// First matching rule wins; keys matching none are [`KeyType::Other`].
    pub fn classify_key(&self, key: &str) -> KeyType {
        self.rules()
            .into_iter()
            .find(|(_, pattern)| pattern.is_match(key))
            .map(|(key_type, _)| key_type)
            .unwrap_or(KeyType::Other)
    }

    /// Replaces every problem character in `key` with an underscore.
    pub fn sanitize_key(&self, key: &str) -> String {
        self.problem_chars.replace_all(key, "_").into_owned()
    }
}

pub fn observe_tag(counts: &mut Counts, element: &Element) {
    *counts.entry(element.tag.clone()).or_insert(0) += 1;
}

pub fn observe_key(counts: &mut Counts, element: &Element) -> Result<()> {
    if element.tag == "tag" {
        let key = element.require_attr("k")?;
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }
    Ok(())
}

/// Occurrences of every element tag name in the file.
pub fn count_tags(path: &Path) -> Result<Counts> {
    let mut counts = Counts::new();
    for element in reader::open(path)? {
        observe_tag(&mut counts, &element?);
    }
    info!(distinct = counts.len(), "counted element tags");
    Ok(counts)
}

/// Occurrences of every `k` value on `tag` elements.
pub fn count_keys(path: &Path) -> Result<Counts> {
    let mut counts = Counts::new();
    for element in reader::open(path)? {
        observe_key(&mut counts, &element?)?;
    }
    info!(distinct = counts.len(), "counted tag keys");
    Ok(counts)
}

/// `(key, count)` pairs ordered by count, ties broken by key.
pub fn sort_by_count(counts: &Counts, ascending: bool) -> Vec<(String, usize)> {
    let mut sorted: Vec<(String, usize)> = counts
        .iter()
        .map(|(key, count)| (key.clone(), *count))
        .collect();
    if ascending {
        sorted.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    } else {
        sorted.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    }
    sorted
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyBucket {
    pub count: usize,
    pub examples: Vec<AttrSet>,
}

/// Per-[`KeyType`] counts plus the attribute sets that landed in each bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyTypeAudit {
    buckets: BTreeMap<KeyType, KeyBucket>,
    example_limit: Option<usize>,
}

impl KeyTypeAudit {
    /// `example_limit` caps the examples kept per bucket; `None` keeps all.
    pub fn new(example_limit: Option<usize>) -> Self {
        Self {
            buckets: KeyType::ALL
                .into_iter()
                .map(|key_type| (key_type, KeyBucket::default()))
                .collect(),
            example_limit,
        }
    }

    pub fn observe(&mut self, patterns: &KeyPatterns, element: &Element) -> Result<()> {
        if element.tag != "tag" {
            return Ok(());
        }
        let key_type = patterns.classify_key(element.require_attr("k")?);
        let limit = self.example_limit;
        let bucket = self.buckets.entry(key_type).or_default();
        bucket.count += 1;
        if limit.map_or(true, |limit| bucket.examples.len() < limit) {
            bucket.examples.push(element.attrs.clone());
        }
        Ok(())
    }

    pub fn bucket(&self, key_type: KeyType) -> &KeyBucket {
        // every bucket is created in `new`
        &self.buckets[&key_type]
    }

    pub fn iter(&self) -> impl Iterator<Item = (KeyType, &KeyBucket)> {
        self.buckets.iter().map(|(key_type, bucket)| (*key_type, bucket))
    }
}

pub fn audit_key_types(
    path: &Path,
    patterns: &KeyPatterns,
    example_limit: Option<usize>,
) -> Result<KeyTypeAudit> {
    let mut audit = KeyTypeAudit::new(example_limit);
    for element in reader::open(path)? {
        audit.observe(patterns, &element?)?;
    }
    info!(
        lower = audit.bucket(KeyType::Lower).count,
        lower_colon = audit.bucket(KeyType::LowerColon).count,
        problemchars = audit.bucket(KeyType::ProblemChars).count,
        other = audit.bucket(KeyType::Other).count,
        "classified tag keys"
    );
    Ok(audit)
}
