//! Value types of the target platform's deployment model.
//!
//! Field names serialize to the platform's camelCase wire names so a
//! payload can be handed to the platform API (or read back from it)
//! without a translation layer.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::ShapeConfig;
use crate::constants;

/// Instance-wide container restart policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RestartPolicy {
    /// Restart containers whenever they exit.
    Always,
    /// Never restart containers.
    #[default]
    Never,
    /// Restart containers that exit with a non-zero status.
    OnFailure,
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "ALWAYS"),
            Self::Never => write!(f, "NEVER"),
            Self::OnFailure => write!(f, "ON_FAILURE"),
        }
    }
}

/// Per-container resource limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceConfig {
    /// Memory limit in GiB.
    #[serde(rename = "memoryLimitInGBs")]
    pub memory_limit_in_gbs: f64,
    /// vCPU limit.
    pub vcpus_limit: f64,
}

impl From<ShapeConfig> for ResourceConfig {
    fn from(shape: ShapeConfig) -> Self {
        Self {
            memory_limit_in_gbs: shape.memory_in_gbs,
            vcpus_limit: shape.ocpus,
        }
    }
}

/// Attachment of an instance volume into one container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeMount {
    /// Absolute path inside the container.
    pub mount_path: String,
    /// Name of the instance-level volume.
    pub volume_name: String,
}

/// One container of a deployment instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerDescriptor {
    /// Container display name.
    pub display_name: String,
    /// Image reference pulled by the platform.
    pub image_url: String,
    /// Per-container resource limits.
    pub resource_config: ResourceConfig,
    /// Environment variables, in declaration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_variables: Option<IndexMap<String, String>>,
    /// Command override; the image default runs when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,
    /// Volume attachments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_mounts: Vec<VolumeMount>,
    /// Opaque key/value tags.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub freeform_tags: BTreeMap<String, String>,
}

/// Instance-level volume definition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeDescriptor {
    /// Volume name, unique within the instance.
    pub name: String,
    /// Volume type.
    pub volume_type: String,
    /// Storage backing the volume.
    pub backing_store: String,
}

impl VolumeDescriptor {
    /// Creates an ephemeral empty-directory volume.
    #[must_use]
    pub fn empty_dir(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            volume_type: constants::VOLUME_TYPE_EMPTYDIR.into(),
            backing_store: constants::VOLUME_BACKING_STORE.into(),
        }
    }
}

/// Complete creation request for one container instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentPayload {
    /// Instance display name.
    pub display_name: String,
    /// Owning compartment.
    pub compartment_id: String,
    /// Subnet of the instance VNIC.
    pub subnet_id: String,
    /// Flexible shape name.
    pub shape: String,
    /// Instance sizing.
    pub shape_config: ShapeConfig,
    /// Containers, in boot order.
    pub containers: Vec<ContainerDescriptor>,
    /// Instance-wide volumes.
    #[serde(default)]
    pub volumes: Vec<VolumeDescriptor>,
    /// Restart policy applied to every container.
    #[serde(default)]
    pub container_restart_policy: RestartPolicy,
    /// Opaque key/value tags.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub freeform_tags: BTreeMap<String, String>,
}
