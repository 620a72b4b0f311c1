//! Typed model of a Compose document.
//!
//! Loosely-typed Compose fields (string-or-list, list-or-map, short or long
//! syntax) are modelled as untagged enums with one normalization method
//! per variant, instead of inspecting raw values at each use site.

use std::fmt;
use std::sync::LazyLock;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};

static NO_SERVICES: LazyLock<IndexMap<String, ServiceSpec>> = LazyLock::new(IndexMap::new);

/// Root node of a parsed Compose document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComposeDocument {
    /// Legacy format version, kept only for round-tripping.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<Value>,
    /// Project name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Services in declaration order.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<IndexMap<String, ServiceSpec>>,
    /// Top-level named volume declarations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volumes: Option<Mapping>,
    /// Top-level network declarations (ignored by the converter).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networks: Option<Mapping>,
}

impl ComposeDocument {
    /// Returns the declared services, or an empty map when absent.
    #[must_use]
    pub fn services(&self) -> &IndexMap<String, ServiceSpec> {
        self.services.as_ref().unwrap_or(&NO_SERVICES)
    }

    /// Returns the first declared service name, if any.
    #[must_use]
    pub fn first_service(&self) -> Option<&str> {
        self.services().keys().next().map(String::as_str)
    }
}

/// A single service definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Image reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Build-from-source directive (unsupported).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<Value>,
    /// Command arguments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<StringOrList>,
    /// Entrypoint override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<StringOrList>,
    /// Environment variables.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<Environment>,
    /// Published ports.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PortSpec>,
    /// Volume mounts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<MountSpec>,
    /// Services that must be ready first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depends_on: Option<DependsOn>,
    /// Restart policy string.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<String>,
    /// Display name override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    /// Network attachments (unsupported).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub networks: Option<Value>,
    /// Healthcheck definition (unsupported).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub healthcheck: Option<Value>,
    /// Deploy section; only resource limits are inspected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy: Option<Value>,
}

impl ServiceSpec {
    /// Resolved start command: entrypoint tokens followed by command tokens.
    #[must_use]
    pub fn start_command(&self) -> Vec<String> {
        let mut tokens = self
            .entrypoint
            .as_ref()
            .map(StringOrList::to_vec)
            .unwrap_or_default();
        if let Some(command) = &self.command {
            tokens.extend(command.to_vec());
        }
        tokens
    }

    /// Names listed under `depends_on`, in declaration order.
    #[must_use]
    pub fn dependency_names(&self) -> Vec<String> {
        self.depends_on
            .as_ref()
            .map(DependsOn::names)
            .unwrap_or_default()
    }

    /// Environment normalized to an ordered mapping.
    #[must_use]
    pub fn environment_map(&self) -> IndexMap<String, String> {
        self.environment
            .as_ref()
            .map(Environment::to_map)
            .unwrap_or_default()
    }

    /// Whether the deploy section declares resource limits.
    #[must_use]
    pub fn has_resource_limits(&self) -> bool {
        self.deploy
            .as_ref()
            .and_then(|deploy| deploy.get("resources"))
            .and_then(|resources| resources.get("limits"))
            .is_some_and(|limits| !limits.is_null())
    }
}

/// A scalar YAML value that Compose accepts where a string is expected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// String value.
    String(String),
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating point value.
    Float(f64),
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => write!(f, "{s}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(n) => write!(f, "{n}"),
        }
    }
}

/// A command-like field given either as one string or as a token list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StringOrList {
    /// Shell-form string, split on whitespace.
    String(String),
    /// Exec-form token list.
    List(Vec<Scalar>),
}

impl StringOrList {
    /// Returns the tokens of this field.
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            Self::String(s) => s.split_whitespace().map(String::from).collect(),
            Self::List(items) => items.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Environment given as `KEY=value` entries or as a mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Environment {
    /// `KEY=value` list.
    List(Vec<String>),
    /// Key to scalar mapping; null values become empty strings.
    Map(IndexMap<String, Option<Scalar>>),
}

impl Environment {
    /// Normalizes either form to an ordered mapping.
    ///
    /// List entries split on the first `=` only, so values may contain `=`.
    /// Entries without `=` map to an empty value.
    #[must_use]
    pub fn to_map(&self) -> IndexMap<String, String> {
        match self {
            Self::List(entries) => entries
                .iter()
                .map(|entry| match entry.split_once('=') {
                    Some((key, value)) => (key.to_string(), value.to_string()),
                    None => (entry.clone(), String::new()),
                })
                .collect(),
            Self::Map(map) => map
                .iter()
                .map(|(key, value)| {
                    let value = value.as_ref().map(ToString::to_string).unwrap_or_default();
                    (key.clone(), value)
                })
                .collect(),
        }
    }
}

/// One entry of a service's `ports` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortSpec {
    /// Bare container port number.
    Number(u64),
    /// Short syntax string, possibly a range or host mapping.
    Text(String),
    /// Long syntax object.
    Object(PortObject),
}

/// Long-syntax port definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortObject {
    /// Container-side port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Scalar>,
    /// Host-side port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<Scalar>,
    /// Transport protocol.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

/// One entry of a service's `volumes` list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MountSpec {
    /// Short syntax: `name:/path`, `/host:/path[:mode]` or `/path`.
    Short(String),
    /// Long syntax object.
    Long(MountObject),
}

/// Long-syntax volume definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MountObject {
    /// Mount type (`volume`, `bind`, `tmpfs`).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Volume name or host path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Path inside the container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// Read-only flag (not representable on the target).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_only: Option<bool>,
}

/// `depends_on` given as a list or as the conditional mapping form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DependsOn {
    /// Plain list of service names.
    List(Vec<String>),
    /// Service name to condition settings; only the names are used.
    Map(IndexMap<String, Value>),
}

impl DependsOn {
    /// Returns the referenced service names in declaration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        match self {
            Self::List(names) => names.clone(),
            Self::Map(map) => map.keys().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;

    #[test]
    fn environment_list_splits_on_first_equals() {
        let env = Environment::List(vec!["KEY=VAL=1".into(), "EMPTY".into()]);
        let map = env.to_map();
        assert_eq!(map.get("KEY").map(String::as_str), Some("VAL=1"));
        assert_eq!(map.get("EMPTY").map(String::as_str), Some(""));
    }

    #[test]
    fn environment_map_stringifies_scalars() {
        let yaml = "A: 1\nB: true\nC: ~\nD: text\n";
        let env: Environment = serde_yaml::from_str(yaml).expect("parse");
        let map = env.to_map();
        assert_eq!(map.get("A").map(String::as_str), Some("1"));
        assert_eq!(map.get("B").map(String::as_str), Some("true"));
        assert_eq!(map.get("C").map(String::as_str), Some(""));
        assert_eq!(map.get("D").map(String::as_str), Some("text"));
        let keys: Vec<&String> = map.keys().collect();
        assert_eq!(keys, ["A", "B", "C", "D"]);
    }

    #[test]
    fn start_command_puts_entrypoint_first() {
        let service = ServiceSpec {
            entrypoint: Some(StringOrList::String("/docker-entrypoint.sh".into())),
            command: Some(StringOrList::List(vec![
                Scalar::String("nginx".into()),
                Scalar::String("-g".into()),
                Scalar::String("daemon off;".into()),
            ])),
            ..ServiceSpec::default()
        };
        assert_eq!(
            service.start_command(),
            vec!["/docker-entrypoint.sh", "nginx", "-g", "daemon off;"]
        );
    }

    #[test]
    fn command_list_accepts_numbers() {
        let command: StringOrList = serde_yaml::from_str("[sleep, 10]").expect("parse");
        assert_eq!(command.to_vec(), vec!["sleep", "10"]);
    }

    #[test]
    fn depends_on_long_form_keeps_names_in_order() {
        let yaml = "db:\n  condition: service_healthy\ncache:\n  condition: service_started\n";
        let depends: DependsOn = serde_yaml::from_str(yaml).expect("parse");
        assert_eq!(depends.names(), vec!["db", "cache"]);
    }

    #[test]
    fn resource_limits_detected_only_when_declared() {
        let with_limits: ServiceSpec =
            serde_yaml::from_str("deploy:\n  resources:\n    limits:\n      cpus: '0.5'\n")
                .expect("parse");
        assert!(with_limits.has_resource_limits());

        let replicas_only: ServiceSpec =
            serde_yaml::from_str("deploy:\n  replicas: 2\n").expect("parse");
        assert!(!replicas_only.has_resource_limits());
    }

    #[test]
    fn ports_accept_every_syntax() {
        let yaml = "- 80\n- \"8080:80\"\n- target: 443\n  published: 8443\n";
        let ports: Vec<PortSpec> = serde_yaml::from_str(yaml).expect("parse");
        assert!(matches!(ports[0], PortSpec::Number(80)));
        assert!(matches!(ports[1], PortSpec::Text(_)));
        assert!(matches!(ports[2], PortSpec::Object(_)));
    }
}
