//! `ciconv convert`: Convert a Compose document into a deployment payload.

use std::path::PathBuf;

use ciconv_common::config::{Architecture, ShapeConfig, TargetConfig};
use clap::Args;

use crate::output;

/// Target settings; flags override values loaded from `--target`.
#[derive(Args, Debug, Default, Clone)]
pub struct TargetArgs {
    /// JSON file with a target configuration, loaded before the flags.
    #[arg(long, value_name = "FILE")]
    pub target: Option<PathBuf>,

    /// Compartment that will own the deployment.
    #[arg(long, env = "CICONV_COMPARTMENT_ID")]
    pub compartment_id: Option<String>,

    /// Subnet the instance attaches to.
    #[arg(long, env = "CICONV_SUBNET_ID")]
    pub subnet_id: Option<String>,

    /// Architecture family: x86 or ARM64.
    #[arg(long, env = "CICONV_ARCH")]
    pub arch: Option<String>,

    /// Instance memory in GiB (defaults to the architecture floor).
    #[arg(long, env = "CICONV_MEMORY_GBS")]
    pub memory_gbs: Option<f64>,

    /// Instance OCPUs (defaults to the architecture floor).
    #[arg(long, env = "CICONV_OCPUS")]
    pub ocpus: Option<f64>,

    /// Minimum fixed wait for dependencies without a single port.
    #[arg(long, env = "CICONV_DEPENDENCY_DELAY")]
    pub delay: Option<u64>,

    /// Deployment display name (defaults to the first service).
    #[arg(long, env = "CICONV_DISPLAY_NAME")]
    pub display_name: Option<String>,
}

impl TargetArgs {
    /// Builds the target configuration from the file and the flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the target file cannot be read or parsed, or the
    /// architecture is unknown.
    pub fn resolve(&self) -> anyhow::Result<TargetConfig> {
        let mut target = match &self.target {
            Some(path) => serde_json::from_str(&output::read_input(path)?)
                .map_err(|e| anyhow::anyhow!("invalid target file {}: {e}", path.display()))?,
            None => TargetConfig::new("", ""),
        };

        if let Some(id) = &self.compartment_id {
            target.compartment_id.clone_from(id);
        }
        if let Some(id) = &self.subnet_id {
            target.subnet_id.clone_from(id);
        }
        if let Some(arch) = &self.arch {
            target.architecture = arch.parse::<Architecture>()?;
        }
        if self.memory_gbs.is_some() || self.ocpus.is_some() {
            let base = target
                .shape_config
                .unwrap_or_else(|| target.architecture.sizing_floor());
            target.shape_config = Some(ShapeConfig {
                memory_in_gbs: self.memory_gbs.unwrap_or(base.memory_in_gbs),
                ocpus: self.ocpus.unwrap_or(base.ocpus),
            });
        }
        if let Some(delay) = self.delay {
            target.dependency_delay_seconds = delay;
        }
        if self.display_name.is_some() {
            target.display_name.clone_from(&self.display_name);
        }
        Ok(target)
    }
}

/// Arguments for the `convert` subcommand.
#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Path to the Compose file, or `-` for stdin.
    #[arg(default_value = "docker-compose.yml")]
    pub file: PathBuf,

    /// Target settings.
    #[command(flatten)]
    pub target: TargetArgs,

    /// Write the response to a file instead of stdout.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Pretty-print the JSON response.
    #[arg(long)]
    pub pretty: bool,
}

/// Executes the `convert` command.
///
/// Prints the conversion response as JSON: the payload, the warnings and
/// the boot order.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the target is incomplete,
/// or the document is malformed or invalid. Validation failures list every
/// problem found.
pub fn execute(args: ConvertArgs) -> anyhow::Result<()> {
    tracing::info!(path = %args.file.display(), "converting compose document");
    let text = output::read_input(&args.file)?;
    let target = args.target.resolve()?;

    let response =
        ciconv_compose::convert(&text, &target).map_err(|e| super::report_failure(&e))?;

    let json = if args.pretty {
        serde_json::to_string_pretty(&response)?
    } else {
        serde_json::to_string(&response)?
    };
    output::write_output(args.output.as_deref(), &json)?;

    if !response.warnings.is_empty() {
        tracing::warn!(count = response.warnings.len(), "conversion finished with warnings");
    }
    Ok(())
}
