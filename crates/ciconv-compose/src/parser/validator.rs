//! Structural validation of a parsed Compose document.
//!
//! Every problem is collected into one [`ValidationReport`] so a caller can
//! show the whole list at once instead of fixing errors one at a time.

use std::collections::HashMap;

use ciconv_common::error::{CiconvError, Result};

use super::ast::ComposeDocument;

/// Outcome of [`validate`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Structural errors in document order.
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Whether the document can be converted.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Converts a failed report into [`CiconvError::Validation`].
    ///
    /// # Errors
    ///
    /// Returns the collected errors when the report is not valid.
    pub fn into_result(self) -> Result<()> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(CiconvError::Validation {
                errors: self.errors,
            })
        }
    }
}

/// Validates a parsed document for conversion.
///
/// # Checks performed
///
/// 1. A top-level `services` section exists and is not empty.
/// 2. Every service declares an image; `build` without an image is named
///    as unsupported.
/// 3. No two services resolve to the same container display name.
pub fn validate(document: &ComposeDocument) -> ValidationReport {
    tracing::info!("validating compose document");
    let mut report = ValidationReport::default();

    match &document.services {
        None => report
            .errors
            .push("missing top-level \"services\" section".into()),
        Some(services) if services.is_empty() => report
            .errors
            .push("\"services\" section does not define any service".into()),
        Some(_) => {
            check_images(document, &mut report);
            check_display_names(document, &mut report);
        }
    }

    if !report.is_valid() {
        tracing::debug!(errors = report.errors.len(), "compose document rejected");
    }
    report
}

fn check_images(document: &ComposeDocument, report: &mut ValidationReport) {
    for (name, service) in document.services() {
        let has_image = service
            .image
            .as_deref()
            .is_some_and(|image| !image.trim().is_empty());
        if has_image {
            continue;
        }
        let message = if service.build.is_some() {
            format!(
                "service \"{name}\" uses \"build\", which is not supported; \
                 push the image to a registry and reference it with \"image\""
            )
        } else {
            format!("service \"{name}\" does not specify an image")
        };
        report.errors.push(message);
    }
}

fn check_display_names(document: &ComposeDocument, report: &mut ValidationReport) {
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for (name, service) in document.services() {
        let display = service.container_name.as_deref().unwrap_or(name);
        if let Some(previous) = seen.insert(display, name) {
            report.errors.push(format!(
                "services \"{previous}\" and \"{name}\" both use container name \"{display}\""
            ));
        }
    }
}
