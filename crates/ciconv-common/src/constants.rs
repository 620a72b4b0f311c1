//! System-wide constants: target shapes, sizing floors and wait-script timings.

/// Flexible shape used for x86 deployments.
pub const X86_SHAPE: &str = "CI.Standard.E4.Flex";

/// Flexible shape used for ARM64 deployments.
pub const ARM64_SHAPE: &str = "CI.Standard.A1.Flex";

/// Memory floor in GiB for x86 deployments and their containers.
pub const X86_MEMORY_GBS: f64 = 16.0;

/// Memory floor in GiB for ARM64 deployments and their containers.
pub const ARM64_MEMORY_GBS: f64 = 6.0;

/// OCPU / vCPU floor shared by both architectures.
pub const DEFAULT_OCPUS: f64 = 1.0;

/// Default fixed delay for dependencies without a single known port.
pub const DEFAULT_DEPENDENCY_DELAY_SECS: u64 = 10;

/// Seconds added to the delay group per dependency that has no probe port.
pub const DELAY_PER_DEPENDENCY_SECS: u64 = 5;

/// Upper bound, in seconds, a port probe keeps retrying before failing.
pub const WAIT_TIMEOUT_SECS: u64 = 60;

/// Pause, in seconds, between two port probe attempts.
pub const WAIT_INTERVAL_SECS: u64 = 2;

/// Loopback address probed by the wait script; all containers of an
/// instance share one network namespace.
pub const PROBE_HOST: &str = "127.0.0.1";

/// Shell used to run synthesized wait scripts.
pub const WAIT_SHELL: &str = "/bin/sh";

/// Volume type used for every generated volume.
pub const VOLUME_TYPE_EMPTYDIR: &str = "EMPTYDIR";

/// Backing store used for every generated volume.
pub const VOLUME_BACKING_STORE: &str = "EPHEMERAL_STORAGE";

/// Payload-level tag marking deployments produced by this tool.
pub const MANAGED_TAG_KEY: &str = "ciconv-managed";

/// Suffix of the file name suggested for exported documents.
pub const EXPORT_FILE_SUFFIX: &str = "-docker-compose.yaml";
