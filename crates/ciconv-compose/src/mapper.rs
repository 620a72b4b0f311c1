//! Service to container mapping.
//!
//! Converts one Compose service into one container descriptor. Anything
//! the target cannot express is reported as a warning and conversion
//! carries on.

use std::collections::BTreeMap;

use ciconv_common::config::Architecture;
use ciconv_common::types::{ContainerDescriptor, ResourceConfig, RestartPolicy, VolumeMount};
use indexmap::IndexMap;

use crate::graph::DependencyGraph;
use crate::parser::ast::ServiceSpec;
use crate::port;
use crate::report::Report;
use crate::volume::{self, VolumeOrigin, VolumeSpec};
use crate::wait::{self, WaitCommand};

/// Shared inputs for mapping the services of one document.
#[derive(Debug, Clone, Copy)]
pub struct MappingContext<'a> {
    /// Every service of the document, for dependency port lookups.
    pub services: &'a IndexMap<String, ServiceSpec>,
    /// Dependency graph of the document.
    pub graph: &'a DependencyGraph,
    /// Target architecture, selects the sizing floor.
    pub architecture: Architecture,
    /// Minimum fixed delay for dependencies without a probe port.
    pub delay_seconds: u64,
}

/// Output of [`map`] for one service.
#[derive(Debug, Clone, PartialEq)]
pub struct MappedService {
    /// Service name in the source document.
    pub service: String,
    /// Container descriptor with the service's own volume mounts.
    pub container: ContainerDescriptor,
    /// Volumes declared by the service.
    pub volumes: Vec<VolumeSpec>,
    /// First usable container port, also carried as a tag.
    pub port: Option<u16>,
    /// How the service waits for its dependencies; `None` when it has none.
    pub wait: Option<WaitCommand>,
    /// Warnings raised while mapping.
    pub report: Report,
}

/// Maps a Compose restart string to the instance restart policy.
///
/// `unless-stopped` has no counterpart and is approximated as `ALWAYS`;
/// absent or unrecognized values map to `NEVER`.
#[must_use]
pub fn restart_policy(restart: Option<&str>) -> RestartPolicy {
    match restart.map(str::trim) {
        Some("always" | "unless-stopped") => RestartPolicy::Always,
        Some(value) if value.starts_with("on-failure") => RestartPolicy::OnFailure,
        _ => RestartPolicy::Never,
    }
}

/// Restart policy of the first declared service, applied instance-wide.
#[must_use]
pub fn instance_restart_policy(services: &IndexMap<String, ServiceSpec>) -> RestartPolicy {
    services
        .values()
        .next()
        .map_or(RestartPolicy::Never, |first| {
            restart_policy(first.restart.as_deref())
        })
}

fn unsupported_features(service: &ServiceSpec) -> Vec<&'static str> {
    let mut features = Vec::new();
    if service.networks.is_some() {
        features.push("networks");
    }
    if service.build.is_some() {
        features.push("build");
    }
    if service.healthcheck.is_some() {
        features.push("healthcheck");
    }
    if service.has_resource_limits() {
        features.push("deploy resource limits");
    }
    features
}

fn map_ports(name: &str, service: &ServiceSpec, report: &mut Report) -> Option<u16> {
    let mut first = None;
    for spec in &service.ports {
        match port::container_port(spec) {
            Ok(port) => {
                if first.is_none() {
                    first = Some(port);
                }
            }
            Err(e) => report.warn(format!("service \"{name}\": ignoring port entry: {e}")),
        }
    }
    first
}

fn map_volumes(name: &str, service: &ServiceSpec, report: &mut Report) -> Vec<VolumeSpec> {
    let mut volumes: Vec<VolumeSpec> = Vec::new();
    for spec in &service.volumes {
        match volume::parse_mount(spec) {
            Ok(parsed) => {
                if let VolumeOrigin::Bind { host_path } = &parsed.origin {
                    report.warn(format!(
                        "service \"{name}\": bind mount \"{host_path}\" becomes empty volume \
                         \"{}\"; host content is not copied",
                        parsed.name
                    ));
                }
                if volumes.iter().any(|v| v.mount_path == parsed.mount_path) {
                    report.warn(format!(
                        "service \"{name}\": duplicate mount path \"{}\" ignored",
                        parsed.mount_path
                    ));
                    continue;
                }
                volumes.push(parsed);
            }
            Err(e) => report.warn(format!("service \"{name}\": ignoring volume entry: {e}")),
        }
    }
    volumes
}

/// Container command and the wait strategy behind it, if any.
fn map_command(
    name: &str,
    service: &ServiceSpec,
    ctx: &MappingContext<'_>,
    report: &mut Report,
) -> (Option<Vec<String>>, Option<WaitCommand>) {
    let dependencies: Vec<String> = ctx
        .graph
        .dependencies(name)
        .into_iter()
        .filter(|dependency| dependency != name)
        .collect();

    if dependencies.is_empty() {
        let start = service.start_command();
        return ((!start.is_empty()).then_some(start), None);
    }

    let wait = wait::synthesize(name, &dependencies, ctx.services, ctx.delay_seconds);
    let command = match &wait {
        WaitCommand::Wrapped { command, plan } => {
            if !plan.delayed.is_empty() {
                report.warn(format!(
                    "service \"{name}\": no single port known for [{}]; waiting a fixed {}s \
                     instead of probing",
                    plan.delayed.join(", "),
                    plan.delay_seconds
                ));
            }
            Some(command.clone())
        }
        WaitCommand::PreserveImageDefault { .. } => {
            report.warn(format!(
                "service \"{name}\" has no command or entrypoint; the image default is kept \
                 and dependency ordering on [{}] is not enforced",
                dependencies.join(", ")
            ));
            None
        }
    };
    (command, Some(wait))
}

/// Converts one service into a container descriptor.
pub fn map(name: &str, service: &ServiceSpec, ctx: &MappingContext<'_>) -> MappedService {
    tracing::debug!(service = name, "mapping service");
    let mut report = Report::new();
    let display_name = service
        .container_name
        .clone()
        .unwrap_or_else(|| name.to_string());

    let features = unsupported_features(service);
    if !features.is_empty() {
        report.warn(format!(
            "service \"{name}\" uses unsupported features ({}); they are ignored",
            features.join(", ")
        ));
    }

    let environment = service.environment_map();
    let port = map_ports(name, service, &mut report);
    let volumes = map_volumes(name, service, &mut report);
    let (command, wait) = map_command(name, service, ctx, &mut report);

    let mut freeform_tags = BTreeMap::new();
    if let Some(port) = port {
        let _ = freeform_tags.insert(display_name.clone(), port.to_string());
    }

    let container = ContainerDescriptor {
        display_name,
        image_url: service.image.clone().unwrap_or_default(),
        resource_config: ResourceConfig::from(ctx.architecture.sizing_floor()),
        environment_variables: (!environment.is_empty()).then_some(environment),
        command,
        volume_mounts: volumes
            .iter()
            .map(|v| VolumeMount {
                mount_path: v.mount_path.clone(),
                volume_name: v.name.clone(),
            })
            .collect(),
        freeform_tags,
    };

    MappedService {
        service: name.to_string(),
        container,
        volumes,
        port,
        wait,
        report,
    }
}
