//! `ciconv plan`: Show the boot order and how each service waits.

use std::fmt::Write as _;
use std::path::PathBuf;

use ciconv_common::config::Architecture;
use ciconv_common::constants::DEFAULT_DEPENDENCY_DELAY_SECS;
use ciconv_compose::graph::{self, DependencyGraph};
use ciconv_compose::mapper::{self, MappingContext};
use ciconv_compose::parser::ast::ComposeDocument;
use ciconv_compose::parser::{self, validator};
use ciconv_compose::wait::WaitCommand;
use clap::Args;

use crate::output::{self, BOLD, CYAN, DIM, RESET, YELLOW};

/// Arguments for the `plan` command.
#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the Compose file, or `-` for stdin.
    #[arg(default_value = "docker-compose.yml")]
    pub file: PathBuf,

    /// Minimum fixed wait for dependencies without a single port.
    #[arg(long, env = "CICONV_DEPENDENCY_DELAY", default_value_t = DEFAULT_DEPENDENCY_DELAY_SECS)]
    pub delay: u64,
}

/// Executes the `plan` command.
///
/// Parses and validates the document, sequences the services and shows
/// each service's wait strategy and conversion warnings. No target
/// identifiers are needed.
///
/// # Errors
///
/// Returns an error if the file cannot be read, or the document is
/// malformed or invalid.
pub fn execute(args: PlanArgs) -> anyhow::Result<()> {
    let text = output::read_input(&args.file)?;
    let document = parser::parse(&text)?;
    validator::validate(&document)
        .into_result()
        .map_err(|e| super::report_failure(&e))?;

    let label = args.file.display().to_string();
    output::write_output(None, &render(&label, &document, args.delay))
}

/// Renders the plan of a validated document.
fn render(label: &str, document: &ComposeDocument, delay_seconds: u64) -> String {
    let services = document.services();
    let ordering = graph::order(document);
    let dependency_graph = DependencyGraph::from_document(document);
    let ctx = MappingContext {
        services,
        graph: &dependency_graph,
        architecture: Architecture::default(),
        delay_seconds,
    };

    let mut out = String::new();
    let _ = writeln!(out, "{BOLD}Boot plan for: {label}{RESET}");
    let _ = writeln!(out, "{}", "\u{2550}".repeat(35));
    let _ = writeln!(out);

    let mut warnings: Vec<String> = ordering.cycle_warning().into_iter().collect();
    for (position, name) in ordering.sequence.iter().enumerate() {
        let Some(service) = services.get(name) else {
            continue;
        };
        let mapped = mapper::map(name, service, &ctx);
        let _ = writeln!(out, "  {}. {CYAN}{name}{RESET}", position + 1);
        if let Some(image) = &service.image {
            let _ = writeln!(out, "      image: {image}");
        }
        if let Some(port) = mapped.port {
            let _ = writeln!(out, "      port: {port}");
        }

        match &mapped.wait {
            None => {
                let _ = writeln!(out, "      {DIM}starts immediately{RESET}");
            }
            Some(command) => {
                let plan = command.plan();
                for probe in &plan.probes {
                    let _ = writeln!(out, "      waits for {}:{}", probe.service, probe.port);
                }
                if !plan.delayed.is_empty() {
                    let _ = writeln!(
                        out,
                        "      sleeps {}s for {}",
                        plan.delay_seconds,
                        plan.delayed.join(", ")
                    );
                }
                if matches!(command, WaitCommand::PreserveImageDefault { .. }) {
                    let _ = writeln!(
                        out,
                        "      {YELLOW}image default kept, ordering not enforced{RESET}"
                    );
                }
            }
        }
        warnings.extend(mapped.report.into_warnings());
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "  {} service(s) in one instance.", ordering.sequence.len());
    if !warnings.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "  {YELLOW}Warnings:{RESET}");
        for warning in &warnings {
            let _ = writeln!(out, "    ! {warning}");
        }
    }
    out
}
