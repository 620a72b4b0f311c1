//! End-to-end conversion entry points.
//!
//! Runs the pipeline stages in order and gathers their warnings. Fatal
//! problems stop the pipeline; everything else ends up in
//! [`ConversionResponse::warnings`].

use ciconv_common::config::TargetConfig;
use ciconv_common::constants::EXPORT_FILE_SUFFIX;
use ciconv_common::error::Result;
use ciconv_common::types::DeploymentPayload;
use serde::Serialize;

use crate::assembler;
use crate::graph::{self, DependencyGraph};
use crate::mapper::{self, MappingContext};
use crate::parser::ast::ComposeDocument;
use crate::parser::{self, validator};
use crate::report::Report;
use crate::reverse;
use crate::volume::VolumeSet;

/// Result of a successful conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResponse {
    /// Deployment payload ready for submission.
    pub payload: DeploymentPayload,
    /// Policy fallbacks applied during conversion, in pipeline order.
    pub warnings: Vec<String>,
    /// Service boot order used to lay out the containers.
    pub order: Vec<String>,
}

/// A Compose document rendered for download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportedDocument {
    /// Suggested file name.
    pub file_name: String,
    /// YAML text.
    pub content: String,
}

/// Parses, validates and converts a Compose document.
///
/// # Errors
///
/// Returns an error if the target is incomplete, the text is not a
/// well-formed document, or the document fails validation.
pub fn convert(text: &str, target: &TargetConfig) -> Result<ConversionResponse> {
    target.validate()?;
    let document = parser::parse(text)?;
    convert_document(&document, target)
}

/// Converts an already parsed document.
///
/// # Errors
///
/// Returns an error if the target is incomplete or the document fails
/// validation.
pub fn convert_document(
    document: &ComposeDocument,
    target: &TargetConfig,
) -> Result<ConversionResponse> {
    target.validate()?;
    validator::validate(document).into_result()?;

    let services = document.services();
    let mut report = Report::new();

    let ordering = graph::order(document);
    if let Some(warning) = ordering.cycle_warning() {
        report.warn(warning);
    }

    let dependency_graph = DependencyGraph::from_document(document);
    let ctx = MappingContext {
        services,
        graph: &dependency_graph,
        architecture: target.architecture,
        delay_seconds: target.dependency_delay_seconds,
    };

    let mut containers = Vec::with_capacity(services.len());
    let mut volumes = VolumeSet::new();
    for name in &ordering.sequence {
        let Some(service) = services.get(name) else {
            continue;
        };
        let mapped = mapper::map(name, service, &ctx);
        for volume in mapped.volumes {
            let _ = volumes.insert(volume);
        }
        report.merge(mapped.report);
        containers.push(mapped.container);
    }

    let restart_policy = mapper::instance_restart_policy(services);
    let first_service = document.first_service().unwrap_or_default();
    let payload = assembler::assemble(
        containers,
        &volumes,
        restart_policy,
        target,
        first_service,
        &mut report,
    );

    tracing::info!(
        deployment = %payload.display_name,
        containers = payload.containers.len(),
        warnings = report.len(),
        "conversion complete"
    );

    Ok(ConversionResponse {
        payload,
        warnings: report.into_warnings(),
        order: ordering.sequence,
    })
}

/// Replaces path separators and whitespace so the name is usable as a
/// file name.
fn sanitize_file_stem(name: &str) -> String {
    let stem: String = name
        .trim()
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_whitespace() {
                '-'
            } else {
                c
            }
        })
        .collect();
    if stem.is_empty() {
        "deployment".to_string()
    } else {
        stem
    }
}

/// Renders a payload as a Compose document.
///
/// # Errors
///
/// Returns an error if YAML serialization fails.
pub fn export(payload: &DeploymentPayload) -> Result<ExportedDocument> {
    let document = reverse::to_document(payload);
    let content = serde_yaml::to_string(&document)?;
    Ok(ExportedDocument {
        file_name: format!(
            "{}{EXPORT_FILE_SUFFIX}",
            sanitize_file_stem(&payload.display_name)
        ),
        content,
    })
}
