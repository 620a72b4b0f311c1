//! Volume mount parsing, naming and cross-service unification.
//!
//! The target only offers instance-wide ephemeral volumes. Named volumes
//! keep their name; bind mounts and anonymous volumes get a name generated
//! from the path. Volumes with the same name in different services are the
//! same volume.

use ciconv_common::types::VolumeDescriptor;
use indexmap::IndexMap;
use thiserror::Error;

use crate::parser::ast::{MountObject, MountSpec};

/// Reasons a volume entry cannot be converted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MountError {
    /// The entry is empty or has too many `:` separated fields.
    #[error("invalid volume syntax \"{0}\"")]
    Syntax(String),
    /// The container path is not absolute.
    #[error("container path \"{0}\" must be absolute")]
    RelativeTarget(String),
    /// A long-syntax entry without `target`.
    #[error("volume object has no \"target\"")]
    MissingTarget,
}

/// Where a volume's content came from in the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VolumeOrigin {
    /// `name:/path`.
    Named,
    /// Host directory; its content is not carried to the target.
    Bind {
        /// Host path as written.
        host_path: String,
    },
    /// `/path` or tmpfs.
    Anonymous,
}

/// A volume mount normalized to a `(name, path)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSpec {
    /// Volume name, the unification key.
    pub name: String,
    /// Mount path inside the container.
    pub mount_path: String,
    /// Source syntax the mount came from.
    pub origin: VolumeOrigin,
}

/// Generates a volume name from a path: `/` becomes `-` and leading
/// dashes are stripped. Applying it to its own output is a no-op.
#[must_use]
pub fn derive_name(path: &str) -> String {
    let replaced = path.replace('/', "-");
    let name = replaced.trim_start_matches('-');
    if name.is_empty() {
        "root".to_string()
    } else {
        name.to_string()
    }
}

fn is_host_path(source: &str) -> bool {
    source.starts_with('/') || source.starts_with('.') || source.starts_with('~')
}

fn absolute_target(target: &str) -> Result<String, MountError> {
    if target.starts_with('/') {
        Ok(target.to_string())
    } else {
        Err(MountError::RelativeTarget(target.to_string()))
    }
}

fn from_source(source: &str, target: &str) -> Result<VolumeSpec, MountError> {
    let mount_path = absolute_target(target)?;
    if is_host_path(source) {
        Ok(VolumeSpec {
            name: derive_name(&mount_path),
            mount_path,
            origin: VolumeOrigin::Bind {
                host_path: source.to_string(),
            },
        })
    } else {
        Ok(VolumeSpec {
            name: source.to_string(),
            mount_path,
            origin: VolumeOrigin::Named,
        })
    }
}

fn anonymous(target: &str) -> Result<VolumeSpec, MountError> {
    let mount_path = absolute_target(target)?;
    Ok(VolumeSpec {
        name: derive_name(&mount_path),
        mount_path,
        origin: VolumeOrigin::Anonymous,
    })
}

fn from_short(text: &str) -> Result<VolumeSpec, MountError> {
    let fields: Vec<&str> = text.trim().split(':').collect();
    match fields.as_slice() {
        [target] if !target.is_empty() => anonymous(target),
        [source, target] | [source, target, _] if !source.is_empty() => {
            from_source(source, target)
        }
        _ => Err(MountError::Syntax(text.to_string())),
    }
}

fn from_long(object: &MountObject) -> Result<VolumeSpec, MountError> {
    let target = object.target.as_deref().ok_or(MountError::MissingTarget)?;
    match (object.kind.as_deref(), object.source.as_deref()) {
        (Some("tmpfs"), _) | (_, None | Some("")) => anonymous(target),
        (Some("bind"), Some(source)) => {
            let mount_path = absolute_target(target)?;
            Ok(VolumeSpec {
                name: derive_name(&mount_path),
                mount_path,
                origin: VolumeOrigin::Bind {
                    host_path: source.to_string(),
                },
            })
        }
        (_, Some(source)) => from_source(source, target),
    }
}

/// Normalizes one `volumes` entry.
///
/// # Errors
///
/// Returns a [`MountError`] when the entry is malformed or its container
/// path is relative.
pub fn parse_mount(spec: &MountSpec) -> Result<VolumeSpec, MountError> {
    match spec {
        MountSpec::Short(text) => from_short(text),
        MountSpec::Long(object) => from_long(object),
    }
}

/// Union of volumes across services, keyed by name.
///
/// The first declaration of a name decides its default mount path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VolumeSet {
    volumes: IndexMap<String, VolumeSpec>,
}

impl VolumeSet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a volume; returns `false` if the name was already present.
    pub fn insert(&mut self, spec: VolumeSpec) -> bool {
        if self.volumes.contains_key(&spec.name) {
            return false;
        }
        let _ = self.volumes.insert(spec.name.clone(), spec);
        true
    }

    /// Volumes in first-declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &VolumeSpec> {
        self.volumes.values()
    }

    /// Number of distinct volumes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    /// Whether no volume was declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    /// Instance-level volume definitions.
    #[must_use]
    pub fn descriptors(&self) -> Vec<VolumeDescriptor> {
        self.volumes
            .keys()
            .map(VolumeDescriptor::empty_dir)
            .collect()
    }
}

impl FromIterator<VolumeSpec> for VolumeSet {
    fn from_iter<I: IntoIterator<Item = VolumeSpec>>(iter: I) -> Self {
        let mut set = Self::new();
        for spec in iter {
            let _ = set.insert(spec);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used)]

    use super::*;

    fn short(text: &str) -> Result<VolumeSpec, MountError> {
        parse_mount(&MountSpec::Short(text.into()))
    }

    #[test]
    fn named_volume_keeps_name() {
        let spec = short("pgdata:/var/lib/postgresql/data").expect("should parse");
        assert_eq!(spec.name, "pgdata");
        assert_eq!(spec.mount_path, "/var/lib/postgresql/data");
        assert_eq!(spec.origin, VolumeOrigin::Named);
    }

    #[test]
    fn bind_mount_name_derives_from_container_path() {
        let spec = short("./config:/etc/app/config:ro").expect("should parse");
        assert_eq!(spec.name, "etc-app-config");
        assert!(matches!(spec.origin, VolumeOrigin::Bind { .. }));
    }

    #[test]
    fn anonymous_volume_name_derives_from_path() {
        let spec = short("/data").expect("should parse");
        assert_eq!(spec.name, "data");
        assert_eq!(spec.origin, VolumeOrigin::Anonymous);
    }

    #[test]
    fn derived_name_is_idempotent() {
        for path in ["/var/lib/data", "/", "cache", "//double//slash"] {
            let once = derive_name(path);
            assert_eq!(derive_name(path), once);
            assert_eq!(derive_name(&once), once, "path {path}");
        }
        assert_eq!(derive_name("/"), "root");
    }

    #[test]
    fn relative_target_is_rejected() {
        assert_eq!(
            short("data:relative"),
            Err(MountError::RelativeTarget("relative".into()))
        );
        assert!(short("").is_err());
        assert!(short("a:/b:ro:extra").is_err());
    }

    #[test]
    fn long_syntax_volume_and_bind() {
        let named = parse_mount(&MountSpec::Long(MountObject {
            kind: Some("volume".into()),
            source: Some("cache".into()),
            target: Some("/cache".into()),
            read_only: None,
        }))
        .expect("named");
        assert_eq!(named.name, "cache");

        let bind = parse_mount(&MountSpec::Long(MountObject {
            kind: Some("bind".into()),
            source: Some("/srv/www".into()),
            target: Some("/usr/share/nginx/html".into()),
            read_only: Some(true),
        }))
        .expect("bind");
        assert_eq!(bind.name, "usr-share-nginx-html");

        let missing = parse_mount(&MountSpec::Long(MountObject {
            kind: None,
            source: None,
            target: None,
            read_only: None,
        }));
        assert_eq!(missing, Err(MountError::MissingTarget));
    }

    #[test]
    fn volume_set_unifies_by_name() {
        let set: VolumeSet = [
            short("shared:/data").expect("a"),
            short("shared:/mnt/other").expect("b"),
            short("/tmp/cache").expect("c"),
        ]
        .into_iter()
        .collect();
        assert_eq!(set.len(), 2);
        let first = set.iter().next().expect("first");
        assert_eq!(first.mount_path, "/data");
        let names: Vec<String> = set.descriptors().into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec!["shared", "tmp-cache"]);
    }
}
