//! Deployment payload assembly.
//!
//! Sizing is decided per instance, not summed over containers: the shape
//! constrains the instance as a whole. Volumes live in one instance-wide
//! namespace, so every container gets every volume.

use std::collections::BTreeMap;

use ciconv_common::config::TargetConfig;
use ciconv_common::constants::MANAGED_TAG_KEY;
use ciconv_common::types::{ContainerDescriptor, DeploymentPayload, RestartPolicy, VolumeMount};

use crate::report::Report;
use crate::volume::VolumeSet;

/// Adds every shared volume the container does not mount yet, at the path
/// of the volume's first declaration. When that path is already taken by
/// another volume in this container, the shared volume is left out and a
/// warning is recorded.
fn attach_shared_volumes(
    container: &mut ContainerDescriptor,
    volumes: &VolumeSet,
    report: &mut Report,
) {
    for volume in volumes.iter() {
        if container
            .volume_mounts
            .iter()
            .any(|m| m.volume_name == volume.name)
        {
            continue;
        }
        let occupant = container
            .volume_mounts
            .iter()
            .find(|m| m.mount_path == volume.mount_path)
            .map(|m| m.volume_name.clone());
        match occupant {
            Some(occupant) => report.warn(format!(
                "container \"{}\": shared volume \"{}\" not mounted because \"{}\" \
                 already uses path \"{}\"",
                container.display_name, volume.name, occupant, volume.mount_path
            )),
            None => container.volume_mounts.push(VolumeMount {
                mount_path: volume.mount_path.clone(),
                volume_name: volume.name.clone(),
            }),
        }
    }
}

/// Builds the deployment payload.
///
/// `first_service` names the deployment unless the target overrides it.
/// Shared volumes that cannot be attached are reported in `report`.
pub fn assemble(
    mut containers: Vec<ContainerDescriptor>,
    volumes: &VolumeSet,
    restart_policy: RestartPolicy,
    target: &TargetConfig,
    first_service: &str,
    report: &mut Report,
) -> DeploymentPayload {
    tracing::info!(
        containers = containers.len(),
        volumes = volumes.len(),
        "assembling deployment payload"
    );

    if !volumes.is_empty() {
        for container in &mut containers {
            attach_shared_volumes(container, volumes, report);
        }
    }

    let mut freeform_tags: BTreeMap<String, String> = containers
        .iter()
        .flat_map(|c| c.freeform_tags.iter())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    let _ = freeform_tags.insert(MANAGED_TAG_KEY.to_string(), "true".to_string());

    let display_name = target
        .display_name
        .clone()
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| first_service.to_string());

    DeploymentPayload {
        display_name,
        compartment_id: target.compartment_id.clone(),
        subnet_id: target.subnet_id.clone(),
        shape: target.architecture.shape().to_string(),
        shape_config: target.effective_shape_config(),
        containers,
        volumes: volumes.descriptors(),
        container_restart_policy: restart_policy,
        freeform_tags,
    }
}
