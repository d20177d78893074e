//! Audit, clean and export an OpenStreetMap XML extract as JSON lines.
//!
//! The audits ([`audit_all`] or the per-concern passes in [`keys`],
//! [`street`] and [`postcode`]) report what needs fixing; the fixes live in
//! [`AuditTables`] and are applied by [`shape_element`] while
//! [`export_to_json`] writes one document per `node`/`way`.

pub mod audit;
pub mod error;
pub mod export;
pub mod keys;
pub mod postcode;
pub mod reader;
pub mod report;
pub mod shape;
pub mod street;
pub mod tables;

pub use audit::{audit_all, AuditReport};
pub use error::{Error, Result};
pub use export::{export_to_json, export_to_json_streaming, ExportStats, JsonFormat};
pub use keys::KeyType;
pub use reader::{Element, ElementReader};
pub use shape::{shape_element, Document, ElementKind};
pub use tables::AuditTables;
