//! End-to-end tests for the conversion pipeline.
//!
//! These tests drive the public entry points the way a caller does:
//! 1. Parse and validate Compose text
//! 2. Sequence services and synthesize wait scripts
//! 3. Map services and assemble the payload
//! 4. Export the payload back to a Compose document

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::float_cmp)]

use ciconv_common::config::{Architecture, TargetConfig};
use ciconv_common::error::CiconvError;
use ciconv_common::types::RestartPolicy;
use ciconv_compose::graph::{DependencyGraph, order};
use ciconv_compose::parser::{ast::PortSpec, parse};
use ciconv_compose::volume::derive_name;
use ciconv_compose::{convert, export};

fn target() -> TargetConfig {
    TargetConfig::new("ocid1.compartment.oc1..test", "ocid1.subnet.oc1..test")
}

fn command_of<'a>(response: &'a ciconv_compose::ConversionResponse, name: &str) -> &'a [String] {
    response
        .payload
        .containers
        .iter()
        .find(|c| c.display_name == name)
        .and_then(|c| c.command.as_deref())
        .expect("container should have a command")
}

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn web_waits_for_db_port_probe() {
    let input = r"
services:
  web:
    image: nginx
    command: [nginx, -g, 'daemon off;']
    depends_on: [db]
  db:
    image: postgres:16
    ports: ['5432']
";
    let response = convert(input, &target()).expect("should convert");
    let command = command_of(&response, "web");
    assert_eq!(command[0], "/bin/sh");
    assert_eq!(command[1], "-c");
    let script = &command[2];
    assert!(script.contains("nc -z 127.0.0.1 5432"), "got: {script}");
    assert!(script.contains("/dev/tcp/127.0.0.1/5432"), "got: {script}");
    assert!(script.contains("exit 1"), "got: {script}");
    assert!(!script.contains("sleep 10"), "got: {script}");
    assert!(
        script.ends_with("&& exec nginx -g \"daemon off;\""),
        "got: {script}"
    );
    assert!(response.warnings.is_empty(), "got: {:?}", response.warnings);
}

#[test]
fn three_service_cycle_warns_and_keeps_everyone() {
    let input = r"
services:
  a:
    image: a
    depends_on: [b]
  b:
    image: b
    depends_on: [c]
  c:
    image: c
    depends_on: [a]
";
    let doc = parse(input).expect("should parse");
    let ordering = order(&doc);
    assert!(ordering.has_cycle);
    for name in ["a", "b", "c"] {
        assert_eq!(
            ordering.sequence.iter().filter(|n| *n == name).count(),
            1,
            "{name} in {:?}",
            ordering.sequence
        );
    }

    let response = convert(input, &target()).expect("cycle is not fatal");
    assert!(
        response
            .warnings
            .iter()
            .any(|w| w.contains("circular dependencies")),
        "got: {:?}",
        response.warnings
    );
    assert_eq!(response.payload.containers.len(), 3);
}

#[test]
fn environment_list_splits_on_first_equals() {
    let input = "services:\n  app:\n    image: a\n    environment: [\"KEY=VAL=1\"]\n";
    let response = convert(input, &target()).expect("should convert");
    let env = response.payload.containers[0]
        .environment_variables
        .as_ref()
        .expect("env");
    assert_eq!(env.len(), 1);
    assert_eq!(env.get("KEY").map(String::as_str), Some("VAL=1"));
}

#[test]
fn dependent_without_command_keeps_image_default() {
    let input = r"
services:
  proxy:
    image: traefik
    depends_on: [app]
  app:
    image: app
    ports: ['8080']
";
    let response = convert(input, &target()).expect("should convert");
    let proxy = response
        .payload
        .containers
        .iter()
        .find(|c| c.display_name == "proxy")
        .expect("proxy");
    assert!(proxy.command.is_none());
    assert_eq!(response.warnings.len(), 1, "got: {:?}", response.warnings);
    let warning = &response.warnings[0];
    assert!(warning.contains("\"proxy\""), "got: {warning}");
    assert!(warning.contains("dependency ordering"), "got: {warning}");
}

// ── Properties ───────────────────────────────────────────────────────

#[test]
fn dependencies_precede_dependents_in_acyclic_graphs() {
    let input = r"
services:
  gateway:
    image: g
    depends_on: [auth, orders]
  orders:
    image: o
    depends_on: [db, queue]
  auth:
    image: a
    depends_on: [db]
  queue:
    image: q
  db:
    image: d
";
    let doc = parse(input).expect("should parse");
    let ordering = order(&doc);
    assert!(!ordering.has_cycle);
    let graph = DependencyGraph::from_document(&doc);
    let position = |name: &str| {
        ordering
            .sequence
            .iter()
            .position(|n| n == name)
            .expect(name)
    };
    for service in doc.services().keys() {
        for dependency in graph.dependencies(service) {
            assert!(
                position(&dependency) < position(service),
                "{dependency} should precede {service} in {:?}",
                ordering.sequence
            );
        }
    }
}

#[test]
fn sequence_always_covers_every_service() {
    let inputs = [
        "services:\n  a:\n    image: a\n",
        "services:\n  a:\n    image: a\n    depends_on: [a]\n  b:\n    image: b\n",
        "services:\n  a:\n    image: a\n    depends_on: [b]\n  b:\n    image: b\n    depends_on: [a]\n  c:\n    image: c\n    depends_on: [ghost]\n",
    ];
    for input in inputs {
        let doc = parse(input).expect("should parse");
        assert_eq!(order(&doc).sequence.len(), doc.services().len(), "{input}");
    }
}

#[test]
fn single_port_survives_export() {
    let cases = [
        ("'6379'", 6379),
        ("'16379:6379'", 6379),
        ("'127.0.0.1:80:8080/tcp'", 8080),
    ];
    for (spec, expected) in cases {
        let input = format!("services:\n  cache:\n    image: redis\n    ports: [{spec}]\n");
        let response = convert(&input, &target()).expect("should convert");
        let exported = export(&response.payload).expect("should export");
        let doc = parse(&exported.content).expect("exported document should parse");
        assert_eq!(
            doc.services()["cache"].ports,
            vec![PortSpec::Number(expected)],
            "spec {spec}"
        );
    }
}

#[test]
fn volume_naming_is_idempotent() {
    for path in ["/var/lib/data", "./conf", "/", "data", "//double//slash"] {
        let once = derive_name(path);
        assert_eq!(derive_name(&once), once, "path {path}");
    }
}

#[test]
fn validation_lists_every_error() {
    let input = r"
services:
  a:
    command: run
  b:
    build: .
  c:
    image: c
    container_name: shared
  d:
    image: d
    container_name: shared
";
    let err = convert(input, &target()).expect_err("should be rejected");
    assert!(matches!(err, CiconvError::Validation { .. }), "got: {err}");
    let messages = err.messages();
    assert_eq!(messages.len(), 3, "got: {messages:?}");
    assert!(messages[0].contains("\"a\""), "got: {messages:?}");
    assert!(messages[1].contains("build"), "got: {messages:?}");
    assert!(messages[2].contains("shared"), "got: {messages:?}");
}

// ── Payload ──────────────────────────────────────────────────────────

#[test]
fn full_stack_payload() {
    let input = r"
services:
  web:
    image: ghcr.io/acme/web:2
    restart: unless-stopped
    command: [serve, --port, '80']
    ports: ['80:80']
    depends_on:
      api:
        condition: service_started
    volumes: ['static:/srv/static']
  api:
    image: ghcr.io/acme/api:2
    entrypoint: /entry.sh
    environment:
      DATABASE_URL: postgres://db:5432/app
      WORKERS: 4
    ports: ['8000']
    depends_on: [db, mq]
  db:
    image: postgres:16
    ports: ['5432']
    volumes: ['pgdata:/var/lib/postgresql/data']
  mq:
    image: rabbitmq:3
    ports: ['5672', '15672']
volumes:
  static: {}
  pgdata: {}
";
    let mut target = target();
    target.architecture = Architecture::Arm64;
    let response = convert(input, &target).expect("should convert");
    let payload = &response.payload;

    assert_eq!(payload.display_name, "web");
    assert_eq!(payload.shape, "CI.Standard.A1.Flex");
    assert_eq!(payload.shape_config.memory_in_gbs, 6.0);
    assert_eq!(payload.container_restart_policy, RestartPolicy::Always);
    assert_eq!(response.order, vec!["db", "mq", "api", "web"]);
    assert_eq!(payload.volumes.len(), 2);
    for container in &payload.containers {
        assert_eq!(container.volume_mounts.len(), 2, "{}", container.display_name);
    }

    let api = command_of(&response, "api");
    assert!(api[2].contains("nc -z 127.0.0.1 5432"), "got: {}", api[2]);
    assert!(api[2].contains("sleep 10"), "got: {}", api[2]);
    assert!(api[2].ends_with("&& exec /entry.sh"), "got: {}", api[2]);

    let web = command_of(&response, "web");
    assert!(web[2].contains("127.0.0.1 8000"), "got: {}", web[2]);

    assert_eq!(payload.freeform_tags.get("db").map(String::as_str), Some("5432"));
    assert_eq!(payload.freeform_tags.get("api").map(String::as_str), Some("8000"));
    assert!(
        response.warnings.iter().any(|w| w.contains("mq")),
        "got: {:?}",
        response.warnings
    );
}

#[test]
fn tagged_yaml_is_rejected() {
    let input = "services:\n  web:\n    image: !python/object:os.system nginx\n";
    let err = convert(input, &target()).expect_err("should reject tag");
    assert!(matches!(err, CiconvError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("services.web.image"), "got: {err}");
}
