//! `ciconv export`: Render a deployment payload as a Compose document.

use std::path::PathBuf;

use ciconv_common::types::DeploymentPayload;
use clap::Args;

use crate::output;

/// Arguments for the `export` subcommand.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Payload JSON, or a full `convert` response; `-` reads stdin.
    pub payload: PathBuf,

    /// Write the document to this file.
    #[arg(short, long, conflicts_with = "dir")]
    pub output: Option<PathBuf>,

    /// Write the document into this directory under its suggested name.
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

/// Reads a payload, accepting the `convert` response envelope as well.
fn load_payload(text: &str) -> anyhow::Result<DeploymentPayload> {
    let mut value: serde_json::Value = serde_json::from_str(text)?;
    if let Some(inner) = value.get_mut("payload") {
        value = inner.take();
    }
    serde_json::from_value(value).map_err(|e| anyhow::anyhow!("invalid deployment payload: {e}"))
}

/// Executes the `export` command.
///
/// # Errors
///
/// Returns an error if the payload cannot be read or parsed, or the
/// document cannot be written.
pub fn execute(args: ExportArgs) -> anyhow::Result<()> {
    let payload = load_payload(&output::read_input(&args.payload)?)?;
    tracing::info!(deployment = %payload.display_name, "exporting compose document");
    let exported = ciconv_compose::export(&payload)?;

    let destination = match (&args.output, &args.dir) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(dir)) => Some(dir.join(&exported.file_name)),
        (None, None) => None,
    };
    output::write_output(destination.as_deref(), &exported.content)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use std::fs;

    use ciconv_common::config::TargetConfig;

    use super::*;

    fn response_json() -> String {
        let response = ciconv_compose::convert(
            "services:\n  db:\n    image: postgres:16\n    ports: ['5432']\n",
            &TargetConfig::new("c", "s"),
        )
        .expect("convert");
        serde_json::to_string(&response).expect("json")
    }

    #[test]
    fn writes_suggested_file_name_into_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let input = dir.path().join("response.json");
        fs::write(&input, response_json()).expect("write");
        execute(ExportArgs {
            payload: input,
            output: None,
            dir: Some(dir.path().to_path_buf()),
        })
        .expect("export");
        let content =
            fs::read_to_string(dir.path().join("db-docker-compose.yaml")).expect("exported file");
        assert!(content.contains("postgres:16"), "got: {content}");
        assert!(content.contains("5432"), "got: {content}");
    }

    #[test]
    fn bare_payload_is_accepted() {
        let response: serde_json::Value =
            serde_json::from_str(&response_json()).expect("json");
        let payload = load_payload(&response["payload"].to_string()).expect("payload");
        assert_eq!(payload.display_name, "db");
    }

    #[test]
    fn garbage_is_rejected() {
        let err = load_payload(r#"{"payload": {"displayName": 3}}"#).expect_err("should fail");
        assert!(err.to_string().contains("invalid deployment payload"), "got: {err}");
    }
}
