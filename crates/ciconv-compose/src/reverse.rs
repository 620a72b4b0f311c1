//! Payload to Compose document conversion, used for export.
//!
//! The round trip is lossy. Dependencies, host port mappings, bind sources
//! and every port except the one carried in the display-name tag do not
//! survive; a wrapped command comes back as its `/bin/sh -c` form.

use ciconv_common::types::{ContainerDescriptor, DeploymentPayload, RestartPolicy};
use indexmap::IndexMap;
use serde_yaml::Mapping;

use crate::parser::ast::{
    ComposeDocument, Environment, MountSpec, PortSpec, Scalar, ServiceSpec, StringOrList,
};

/// Compose restart string for an instance restart policy.
#[must_use]
pub const fn compose_restart(policy: RestartPolicy) -> &'static str {
    match policy {
        RestartPolicy::Always => "always",
        RestartPolicy::Never => "no",
        RestartPolicy::OnFailure => "on-failure",
    }
}

/// Port carried in the tag keyed by the container's display name, looking
/// at the container's tags before the payload's.
fn tagged_port(container: &ContainerDescriptor, payload: &DeploymentPayload) -> Option<u64> {
    container
        .freeform_tags
        .get(&container.display_name)
        .or_else(|| payload.freeform_tags.get(&container.display_name))
        .and_then(|value| value.trim().parse::<u16>().ok())
        .filter(|port| *port != 0)
        .map(u64::from)
}

fn to_service(container: &ContainerDescriptor, payload: &DeploymentPayload) -> ServiceSpec {
    let environment = container.environment_variables.as_ref().map(|env| {
        Environment::Map(
            env.iter()
                .map(|(k, v)| (k.clone(), Some(Scalar::String(v.clone()))))
                .collect(),
        )
    });
    let command = container.command.as_ref().map(|tokens| {
        StringOrList::List(tokens.iter().cloned().map(Scalar::String).collect())
    });

    ServiceSpec {
        image: Some(container.image_url.clone()),
        command,
        environment,
        ports: tagged_port(container, payload)
            .map(PortSpec::Number)
            .into_iter()
            .collect(),
        volumes: container
            .volume_mounts
            .iter()
            .map(|m| MountSpec::Short(format!("{}:{}", m.volume_name, m.mount_path)))
            .collect(),
        restart: Some(compose_restart(payload.container_restart_policy).to_string()),
        ..ServiceSpec::default()
    }
}

/// Picks a service key for `display_name` that is not taken yet.
fn unique_name(display_name: &str, taken: &IndexMap<String, ServiceSpec>) -> String {
    if !taken.contains_key(display_name) {
        return display_name.to_string();
    }
    (2..)
        .map(|n| format!("{display_name}-{n}"))
        .find(|candidate| !taken.contains_key(candidate))
        .unwrap_or_else(|| display_name.to_string())
}

/// Converts a deployment payload back into a Compose document.
#[must_use]
pub fn to_document(payload: &DeploymentPayload) -> ComposeDocument {
    tracing::info!(
        deployment = %payload.display_name,
        containers = payload.containers.len(),
        "reconstructing compose document"
    );

    let mut services: IndexMap<String, ServiceSpec> = IndexMap::new();
    for container in &payload.containers {
        let name = unique_name(&container.display_name, &services);
        let _ = services.insert(name, to_service(container, payload));
    }

    let volumes: Mapping = payload
        .volumes
        .iter()
        .map(|v| {
            (
                serde_yaml::Value::String(v.name.clone()),
                serde_yaml::Value::Mapping(Mapping::new()),
            )
        })
        .collect();

    ComposeDocument {
        services: Some(services),
        volumes: (!volumes.is_empty()).then_some(volumes),
        ..ComposeDocument::default()
    }
}
