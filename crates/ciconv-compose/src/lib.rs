//! # ciconv-compose
//!
//! Conversion engine from Compose documents to container instance payloads.
//!
//! The pipeline, each stage consuming the previous stage's output:
//! - **Parser**: restricted-schema loading and structural validation.
//! - **Graph**: dependency graph construction and Kahn sequencing.
//! - **Wait**: shell preambles that hold a container until its
//!   dependencies are reachable.
//! - **Mapper**: one service to one container descriptor.
//! - **Assembler**: containers, shared volumes and sizing into one payload.
//! - **Reverse**: payload back to a Compose document for export.
//!
//! The engine is synchronous and side-effect free. Policy fallbacks are
//! collected in a [`report::Report`] and returned next to the payload.

pub mod assembler;
pub mod convert;
pub mod graph;
pub mod mapper;
pub mod parser;
pub mod port;
pub mod report;
pub mod reverse;
pub mod volume;
pub mod wait;

pub use convert::{ConversionResponse, ExportedDocument, convert, convert_document, export};
