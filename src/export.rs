use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::reader::{self, Element};
use crate::shape::{shape_element, Document, ElementKind};
use crate::tables::AuditTables;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum JsonFormat {
    #[default]
    Compact,
    /// Two-space indentation, one document after another.
    Pretty,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub documents: usize,
    pub nodes: usize,
    pub ways: usize,
}

impl ExportStats {
    fn count(&mut self, document: &Document) {
        self.documents += 1;
        match document.kind {
            ElementKind::Node => self.nodes += 1,
            ElementKind::Way => self.ways += 1,
        }
    }
}

/// `lancaster.osm` => `lancaster.json`.
pub fn output_path(input: &Path) -> PathBuf {
    input.with_extension("json")
}

pub fn write_document<W: Write>(
    writer: &mut W,
    document: &Document,
    format: JsonFormat,
) -> Result<()> {
    match format {
        JsonFormat::Compact => serde_json::to_writer(&mut *writer, document)?,
        JsonFormat::Pretty => serde_json::to_writer_pretty(&mut *writer, document)?,
    }
    writer.write_all(b"\n")?;
    Ok(())
}

/// Shapes and writes every qualifying element, handing each document to
/// `keep` after it has been written.
pub fn export_elements<I, W, F>(
    elements: I,
    tables: &AuditTables,
    format: JsonFormat,
    writer: &mut W,
    mut keep: F,
) -> Result<ExportStats>
where
    I: IntoIterator<Item = Result<Element>>,
    W: Write,
    F: FnMut(Document),
{
    let mut stats = ExportStats::default();
    for element in elements {
        let Some(document) = shape_element(&element?, tables)? else {
            continue;
        };
        write_document(writer, &document, format)?;
        stats.count(&document);
        keep(document);
    }
    writer.flush()?;
    Ok(stats)
}

fn export_file<F: FnMut(Document)>(
    input: &Path,
    tables: &AuditTables,
    format: JsonFormat,
    keep: F,
) -> Result<ExportStats> {
    let output = output_path(input);
    let mut writer = BufWriter::new(File::create(&output)?);
    let stats = export_elements(reader::open(input)?, tables, format, &mut writer, keep)?;
    info!(
        documents = stats.documents,
        nodes = stats.nodes,
        ways = stats.ways,
        output = %output.display(),
        "exported documents"
    );
    Ok(stats)
}

/// Exports `input` to its `.json` sibling and returns every document written.
pub fn export_to_json(
    input: &Path,
    tables: &AuditTables,
    format: JsonFormat,
) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    export_file(input, tables, format, |document| documents.push(document))?;
    Ok(documents)
}

/// Same output file as [`export_to_json`], without keeping documents in memory.
pub fn export_to_json_streaming(
    input: &Path,
    tables: &AuditTables,
    format: JsonFormat,
) -> Result<ExportStats> {
    export_file(input, tables, format, |_| {})
}
