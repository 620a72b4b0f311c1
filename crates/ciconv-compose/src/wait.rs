//! Wait-script synthesis.
//!
//! The target starts every container of an instance at the same time. A
//! dependent service therefore gets its start command wrapped in a shell
//! preamble that blocks until its dependencies answer on loopback, or, when
//! no single port is known for a dependency, sleeps for a fixed delay.

use ciconv_common::constants::{
    DELAY_PER_DEPENDENCY_SECS, PROBE_HOST, WAIT_INTERVAL_SECS, WAIT_SHELL, WAIT_TIMEOUT_SECS,
};
use indexmap::IndexMap;

use crate::parser::ast::ServiceSpec;
use crate::port;

/// Statement used when nothing has to be waited for.
pub const NO_DEPENDENCIES: &str = ": no dependencies to wait for";

/// A dependency that is probed on its single published port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Probe {
    /// Dependency service name.
    pub service: String,
    /// Container port probed on loopback.
    pub port: u16,
}

/// How a dependent service waits for its dependencies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitPlan {
    /// Dependencies with exactly one port.
    pub probes: Vec<Probe>,
    /// Dependencies without exactly one port.
    pub delayed: Vec<String>,
    /// Duration of the single fixed sleep covering `delayed`.
    pub delay_seconds: u64,
}

impl WaitPlan {
    /// Splits `dependencies` into port probes and the delay group.
    #[must_use]
    pub fn new(
        dependencies: &[String],
        services: &IndexMap<String, ServiceSpec>,
        delay_seconds: u64,
    ) -> Self {
        let mut probes = Vec::new();
        let mut delayed = Vec::new();
        for dependency in dependencies {
            match services.get(dependency).and_then(single_port) {
                Some(port) => probes.push(Probe {
                    service: dependency.clone(),
                    port,
                }),
                None => delayed.push(dependency.clone()),
            }
        }
        let group = u64::try_from(delayed.len()).unwrap_or(u64::MAX);
        let delay_seconds = delay_seconds.max(group.saturating_mul(DELAY_PER_DEPENDENCY_SECS));
        Self {
            probes,
            delayed,
            delay_seconds,
        }
    }

    /// Whether no dependency needs waiting for.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.probes.is_empty() && self.delayed.is_empty()
    }

    /// Shell statements that return once every dependency is considered up.
    #[must_use]
    pub fn preamble(&self) -> String {
        let mut segments: Vec<String> = self.probes.iter().map(probe_segment).collect();
        if !self.delayed.is_empty() {
            segments.push(delay_segment(&self.delayed, self.delay_seconds));
        }
        if segments.is_empty() {
            return NO_DEPENDENCIES.to_string();
        }
        segments.join(" && ")
    }
}

/// Result of [`synthesize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitCommand {
    /// Full container command: shell, `-c`, preamble chained to the start command.
    Wrapped {
        /// Command vector for the container.
        command: Vec<String>,
        /// Strategy used for each dependency.
        plan: WaitPlan,
    },
    /// The service has neither command nor entrypoint; overriding would
    /// replace the image's own entrypoint, so no wait is attached.
    PreserveImageDefault {
        /// Strategy that would have been used.
        plan: WaitPlan,
    },
}

impl WaitCommand {
    /// Strategy regardless of whether it was applied.
    #[must_use]
    pub const fn plan(&self) -> &WaitPlan {
        match self {
            Self::Wrapped { plan, .. } | Self::PreserveImageDefault { plan } => plan,
        }
    }
}

/// The service's port when it declares exactly one usable port.
fn single_port(service: &ServiceSpec) -> Option<u16> {
    let ports: Vec<u16> = service
        .ports
        .iter()
        .filter_map(|spec| port::container_port(spec).ok())
        .collect();
    match ports.as_slice() {
        [only] => Some(*only),
        _ => None,
    }
}

/// Wraps `text` in single quotes for use inside the generated script.
fn single_quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

fn probe_segment(probe: &Probe) -> String {
    let Probe { service, port } = probe;
    let target = format!("{PROBE_HOST} {port}");
    let up = single_quote(&format!("{service} is reachable on port {port}"));
    let waiting = single_quote(&format!("Waiting for {service} on port {port}..."));
    let timed_out = single_quote(&format!(
        "Timed out after {WAIT_TIMEOUT_SECS}s waiting for {service} on port {port}"
    ));

    format!(
        "(elapsed=0; while [ \"$elapsed\" -lt {WAIT_TIMEOUT_SECS} ]; do \
         if nc -z {target} >/dev/null 2>&1 \
         || bash -c 'echo > /dev/tcp/{PROBE_HOST}/{port}' >/dev/null 2>&1 \
         || wget -q -T 1 -O /dev/null http://{PROBE_HOST}:{port} >/dev/null 2>&1; \
         then echo {up}; exit 0; fi; \
         echo {waiting}; sleep {WAIT_INTERVAL_SECS}; elapsed=$((elapsed + {WAIT_INTERVAL_SECS})); \
         done; echo {timed_out} >&2; exit 1)"
    )
}

fn delay_segment(delayed: &[String], seconds: u64) -> String {
    let message = single_quote(&format!(
        "Waiting {seconds}s for {} (no single port to probe)",
        delayed.join(", ")
    ));
    format!("echo {message} && sleep {seconds}")
}

fn is_shell_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c)
}

/// Quotes a command token for the generated script.
///
/// Tokens with whitespace, `$`, `"` or any other shell-significant
/// character are double-quoted with `\`, `"`, `$` and backticks escaped;
/// plain tokens are left as they are.
#[must_use]
pub fn escape_token(token: &str) -> String {
    if !token.is_empty() && token.chars().all(is_shell_safe) {
        return token.to_string();
    }
    let mut quoted = String::with_capacity(token.len() + 2);
    quoted.push('"');
    for c in token.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Builds the container command for `service_name`.
///
/// The service's start command (entrypoint then command) runs through
/// `exec` after the preamble succeeds. A service without either gets
/// [`WaitCommand::PreserveImageDefault`].
#[must_use]
pub fn synthesize(
    service_name: &str,
    dependencies: &[String],
    services: &IndexMap<String, ServiceSpec>,
    delay_seconds: u64,
) -> WaitCommand {
    let plan = WaitPlan::new(dependencies, services, delay_seconds);
    let start = services
        .get(service_name)
        .map(ServiceSpec::start_command)
        .unwrap_or_default();

    if start.is_empty() {
        tracing::debug!(service = service_name, "no start command, keeping image default");
        return WaitCommand::PreserveImageDefault { plan };
    }

    let command_line: Vec<String> = start.iter().map(|token| escape_token(token)).collect();
    let script = format!("{} && exec {}", plan.preamble(), command_line.join(" "));
    tracing::debug!(
        service = service_name,
        probes = plan.probes.len(),
        delayed = plan.delayed.len(),
        "synthesized wait script"
    );
    WaitCommand::Wrapped {
        command: vec![WAIT_SHELL.to_string(), "-c".to_string(), script],
        plan,
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

    use super::*;
    use crate::parser::parse;

    fn services(input: &str) -> IndexMap<String, ServiceSpec> {
        parse(input).expect("should parse").services().clone()
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    fn script_of(command: &WaitCommand) -> &str {
        match command {
            WaitCommand::Wrapped { command, .. } => &command[2],
            WaitCommand::PreserveImageDefault { .. } => panic!("expected a wrapped command"),
        }
    }

    const WEB_DB: &str = r#"
services:
  web:
    image: web
    command: ["./server", "--port", "8080"]
  db:
    image: postgres
    ports: ["5432"]
"#;

    #[test]
    fn single_port_dependency_is_probed() {
        let all = services(WEB_DB);
        let command = synthesize("web", &names(&["db"]), &all, 10);
        let script = script_of(&command);
        assert!(script.contains("nc -z 127.0.0.1 5432"), "got: {script}");
        assert!(script.contains("/dev/tcp/127.0.0.1/5432"), "got: {script}");
        assert!(script.contains("http://127.0.0.1:5432"), "got: {script}");
        assert!(script.contains("-lt 60"), "got: {script}");
        assert!(script.contains("sleep 2"), "got: {script}");
        assert!(script.contains("exit 1"), "got: {script}");
        assert!(!script.contains("sleep 10"), "got: {script}");
        assert!(script.ends_with("&& exec ./server --port 8080"), "got: {script}");
        assert_eq!(command.plan().probes, vec![Probe {
            service: "db".into(),
            port: 5432
        }]);
    }

    #[test]
    fn wrapped_command_runs_through_shell() {
        let all = services(WEB_DB);
        let WaitCommand::Wrapped { command, .. } = synthesize("web", &names(&["db"]), &all, 10)
        else {
            panic!("expected a wrapped command");
        };
        assert_eq!(command[0], "/bin/sh");
        assert_eq!(command[1], "-c");
        assert_eq!(command.len(), 3);
    }

    #[test]
    fn dependencies_without_single_port_share_one_delay() {
        let all = services(
            r"
services:
  worker:
    image: w
    command: run
  queue:
    image: q
  cache:
    image: c
    ports: ['6379', '16379']
",
        );
        let command = synthesize("worker", &names(&["queue", "cache"]), &all, 3);
        let plan = command.plan();
        assert!(plan.probes.is_empty());
        assert_eq!(plan.delayed, vec!["queue", "cache"]);
        assert_eq!(plan.delay_seconds, 10);
        let script = script_of(&command);
        assert_eq!(script.matches("sleep ").count(), 1, "got: {script}");
        assert!(script.contains("sleep 10 && exec run"), "got: {script}");
    }

    #[test]
    fn delay_never_below_configured_minimum() {
        let all = services("services:\n  a:\n    image: a\n    command: go\n  b:\n    image: b\n");
        let plan = WaitPlan::new(&names(&["b"]), &all, 10);
        assert_eq!(plan.delay_seconds, 10);
        let plan = WaitPlan::new(&names(&["b"]), &all, 2);
        assert_eq!(plan.delay_seconds, 5);
    }

    #[test]
    fn probes_and_delay_are_chained() {
        let all = services(
            r"
services:
  api:
    image: api
    entrypoint: /entry.sh
  db:
    image: db
    ports: [5432]
  queue:
    image: q
",
        );
        let script = script_of(&synthesize("api", &names(&["db", "queue"]), &all, 10)).to_string();
        let probe_at = script.find("nc -z 127.0.0.1 5432").expect("probe");
        let delay_at = script.find("sleep 10").expect("delay");
        assert!(probe_at < delay_at);
        assert!(script.ends_with("&& exec /entry.sh"), "got: {script}");
    }

    #[test]
    fn no_dependencies_yields_noop() {
        let all = services(WEB_DB);
        let script = script_of(&synthesize("web", &[], &all, 10)).to_string();
        assert!(script.starts_with(NO_DEPENDENCIES), "got: {script}");
    }

    #[test]
    fn missing_start_command_preserves_image_default() {
        let all = services("services:\n  web:\n    image: nginx\n  db:\n    image: pg\n");
        let command = synthesize("web", &names(&["db"]), &all, 10);
        assert!(matches!(command, WaitCommand::PreserveImageDefault { .. }));
        assert_eq!(command.plan().delayed, vec!["db"]);
    }

    #[test]
    fn escape_quotes_only_when_needed() {
        assert_eq!(escape_token("--port=8080"), "--port=8080");
        assert_eq!(escape_token("daemon off;"), "\"daemon off;\"");
        assert_eq!(escape_token("$HOME"), "\"\\$HOME\"");
        assert_eq!(escape_token("say \"hi\""), "\"say \\\"hi\\\"\"");
        assert_eq!(escape_token(""), "\"\"");
    }

    #[test]
    fn command_tokens_are_escaped_in_script() {
        let all = services(
            r#"
services:
  web:
    image: nginx
    command: ["nginx", "-g", "daemon off;"]
  db:
    image: pg
    ports: [5432]
"#,
        );
        let script = script_of(&synthesize("web", &names(&["db"]), &all, 10)).to_string();
        assert!(script.ends_with("exec nginx -g \"daemon off;\""), "got: {script}");
    }

    #[test]
    fn service_names_are_single_quoted() {
        assert_eq!(single_quote("it's"), r"'it'\''s'");
    }
}
