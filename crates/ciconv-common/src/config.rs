//! Target configuration for a conversion request.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

use crate::constants;
use crate::error::{CiconvError, Result};

/// CPU architecture family of the target deployment.
///
/// Input is read through [`FromStr`], so any casing of a known alias is
/// accepted; output always uses the canonical `x86` / `ARM64` spelling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Architecture {
    /// x86-64 (AMD / Intel) shapes.
    #[default]
    #[serde(rename = "x86")]
    X86,
    /// Ampere ARM64 shapes.
    #[serde(rename = "ARM64")]
    Arm64,
}

impl Architecture {
    /// Flexible shape name for this architecture.
    #[must_use]
    pub const fn shape(self) -> &'static str {
        match self {
            Self::X86 => constants::X86_SHAPE,
            Self::Arm64 => constants::ARM64_SHAPE,
        }
    }

    /// Fixed sizing floor applied to the instance and to every container.
    #[must_use]
    pub const fn sizing_floor(self) -> ShapeConfig {
        let memory_in_gbs = match self {
            Self::X86 => constants::X86_MEMORY_GBS,
            Self::Arm64 => constants::ARM64_MEMORY_GBS,
        };
        ShapeConfig {
            memory_in_gbs,
            ocpus: constants::DEFAULT_OCPUS,
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X86 => write!(f, "x86"),
            Self::Arm64 => write!(f, "ARM64"),
        }
    }
}

impl FromStr for Architecture {
    type Err = CiconvError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "x86" | "amd64" | "x86_64" | "x86-64" => Ok(Self::X86),
            "arm64" | "aarch64" | "arm" => Ok(Self::Arm64),
            other => Err(CiconvError::InvalidTarget {
                message: format!("unknown architecture \"{other}\" (expected x86 or ARM64)"),
            }),
        }
    }
}

impl<'de> Deserialize<'de> for Architecture {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer)?
            .parse()
            .map_err(D::Error::custom)
    }
}

/// Memory and OCPU sizing of a whole deployment instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShapeConfig {
    /// Memory in GiB.
    #[serde(rename = "memoryInGBs")]
    pub memory_in_gbs: f64,
    /// Number of OCPUs.
    pub ocpus: f64,
}

/// Where and how a converted document should be deployed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetConfig {
    /// Compartment that will own the deployment.
    #[serde(default)]
    pub compartment_id: String,
    /// Subnet the instance's VNIC attaches to.
    #[serde(default)]
    pub subnet_id: String,
    /// Architecture family, selects shape and sizing floor.
    #[serde(default)]
    pub architecture: Architecture,
    /// Explicit instance sizing, used verbatim when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_config: Option<ShapeConfig>,
    /// Minimum fixed delay for dependencies without a probe port.
    #[serde(default = "default_delay")]
    pub dependency_delay_seconds: u64,
    /// Deployment display name; the first service name when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

const fn default_delay() -> u64 {
    constants::DEFAULT_DEPENDENCY_DELAY_SECS
}

impl TargetConfig {
    /// Creates a target with the required identifiers and default settings.
    #[must_use]
    pub fn new(compartment_id: impl Into<String>, subnet_id: impl Into<String>) -> Self {
        Self {
            compartment_id: compartment_id.into(),
            subnet_id: subnet_id.into(),
            architecture: Architecture::default(),
            shape_config: None,
            dependency_delay_seconds: default_delay(),
            display_name: None,
        }
    }

    /// Checks that the required identifiers are present and the sizing is sane.
    ///
    /// # Errors
    ///
    /// Returns [`CiconvError::MissingTarget`] for an empty compartment or
    /// subnet and [`CiconvError::InvalidTarget`] for a non-positive shape.
    pub fn validate(&self) -> Result<()> {
        if self.compartment_id.trim().is_empty() {
            return Err(CiconvError::MissingTarget {
                field: "compartmentId",
            });
        }
        if self.subnet_id.trim().is_empty() {
            return Err(CiconvError::MissingTarget { field: "subnetId" });
        }
        match self.shape_config {
            Some(shape) if shape.memory_in_gbs <= 0.0 || shape.ocpus <= 0.0 => {
                Err(CiconvError::InvalidTarget {
                    message: format!(
                        "shapeConfig must be positive (memoryInGBs={}, ocpus={})",
                        shape.memory_in_gbs, shape.ocpus
                    ),
                })
            }
            _ => Ok(()),
        }
    }

    /// Instance sizing: the explicit override or the architecture floor.
    #[must_use]
    pub fn effective_shape_config(&self) -> ShapeConfig {
        self.shape_config
            .unwrap_or_else(|| self.architecture.sizing_floor())
    }
}
