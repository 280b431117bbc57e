use super::*;
use libimageq::Config;
use libimageq::client::MemoryTransport;
use libimageq::reference::Repository;
use serde_json::json;
use std::io;
use std::sync::{Arc, Mutex};

const REPO: &str = "ghcr.io/acme/app";

fn offline_config() -> Config {
    let mut config = Config::default();
    config.endpoints.docker_hub = "http://127.0.0.1:1".to_string();
    config.endpoints.quay = "http://127.0.0.1:1".to_string();
    config.network.timeout = 1;
    config
}

fn query(transport: MemoryTransport) -> ImageQuery<MemoryTransport> {
    ImageQuery::builder()
        .with_config(offline_config())
        .build_with_transport(transport)
        .unwrap()
}

/// Collects formatted log lines in memory.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn repository() -> Repository {
    REPO.parse().unwrap()
}

fn tagged_transport() -> MemoryTransport {
    MemoryTransport::new().with_tags(&repository(), ["latest", "1.0.0", "v1.2.0", "edge", "1.1.0"])
}

fn published_transport() -> (MemoryTransport, String) {
    let mut transport = tagged_transport();
    let config = serde_json::to_vec(&json!({
        "architecture": "amd64",
        "os": "linux",
        "created": "2024-03-01T12:00:00Z",
        "config": {"Labels": {"org.opencontainers.image.description": "Demo application"}},
        "rootfs": {"type": "layers", "diff_ids": []}
    }))
    .unwrap();
    let config_len = config.len();
    let config_digest = transport.publish_blob(config);
    let manifest = serde_json::to_vec(&json!({
        "schemaVersion": 2,
        "mediaType": "application/vnd.oci.image.manifest.v1+json",
        "config": {
            "mediaType": "application/vnd.oci.image.config.v1+json",
            "digest": config_digest,
            "size": config_len
        },
        "layers": [{
            "mediaType": "application/vnd.oci.image.layer.v1.tar+gzip",
            "digest": format!("sha256:{}", "a".repeat(64)),
            "size": 1024
        }]
    }))
    .unwrap();
    let digest = transport.publish_manifest(&repository(), Some("v1.2.0"), manifest);
    (transport, digest)
}

#[test]
fn test_tags_pretty_table() {
    let output = tags(&query(tagged_transport()), REPO, false, None, OutputFormat::Pretty).unwrap();
    let lines: Vec<&str> = output.text.lines().collect();

    assert!(lines[0].contains("TAG"));
    assert!(lines[0].contains("VERSION"));
    assert!(lines[1].trim_start().starts_with("v1.2.0"));
    assert!(lines[3].trim_start().starts_with("1.0.0"));
    assert_eq!(lines.len(), 6);
    assert!(output.warnings.is_empty());
}

#[test]
fn test_tags_semver_only_with_limit_as_json() {
    let output = tags(&query(tagged_transport()), REPO, true, Some(2), OutputFormat::Json).unwrap();
    let json: serde_json::Value = serde_json::from_str(&output.text).unwrap();

    assert_eq!(json, json!([{"name": "v1.2.0"}, {"name": "1.1.0"}]));
}

#[test]
fn test_tags_empty_listing() {
    let transport = MemoryTransport::new().with_tags(&repository(), Vec::<String>::new());
    let output = tags(&query(transport), REPO, false, None, OutputFormat::Pretty).unwrap();

    assert_eq!(output.text, format!("No tags found for image '{}'.", REPO));
}

#[test]
fn test_tags_unknown_repository_is_an_error() {
    let err = tags(&query(MemoryTransport::new()), REPO, false, None, OutputFormat::Pretty)
        .unwrap_err();
    assert!(err.contains("not found"), "{}", err);
}

#[test]
fn test_latest_prints_highest_version() {
    let output = latest(&query(tagged_transport()), REPO, OutputFormat::Pretty).unwrap();
    assert_eq!(output.text, "v1.2.0");
}

#[test]
fn test_latest_without_versions_reports_message() {
    let transport = MemoryTransport::new().with_tags(&repository(), ["latest", "edge"]);
    let err = latest(&query(transport), REPO, OutputFormat::Pretty).unwrap_err();

    assert_eq!(
        err,
        format!("no semantic version tags found for image '{}'", "app")
    );
}

#[test]
fn test_browse_json() {
    let output = browse(&query(MemoryTransport::new()), REPO, OutputFormat::Json).unwrap();
    let json: serde_json::Value = serde_json::from_str(&output.text).unwrap();

    assert_eq!(json["url"], "https://github.com/acme/app/pkgs/container/app");
}

#[test]
fn test_show_renders_published_image() {
    let (transport, digest) = published_transport();
    let mut query = query(transport);

    let output = show(&mut query, "ghcr.io/acme/app:v1.2.0", OutputFormat::Pretty).unwrap();

    assert!(output.warnings.is_empty());
    assert!(output.text.contains("Description: Demo application"));
    assert!(output.text.contains(&format!("Digest:      {}", digest)));
    assert!(output.text.contains("Registry:    GitHub Container Registry"));
    assert!(output.text.contains("2024-03-01T12:00:00Z"));
}

#[test]
fn test_show_missing_tag_returns_warnings() {
    let mut query = query(MemoryTransport::new());

    let output = show(&mut query, "ghcr.io/acme/app:9.9.9", OutputFormat::Json).unwrap();
    let json: serde_json::Value = serde_json::from_str(&output.text).unwrap();

    assert_eq!(output.warnings.len(), 1);
    assert!(output.warnings[0].starts_with("failed to fetch metadata for"));
    assert!(json["manifest_digest"].is_null());
}

#[test]
fn test_show_reports_each_failure_once() {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();
    let mut query = query(MemoryTransport::new());

    let output = tracing::subscriber::with_default(subscriber, || {
        show(&mut query, "ghcr.io/acme/app:9.9.9", OutputFormat::Pretty)
    })
    .unwrap();

    let mentions = output
        .warnings
        .iter()
        .filter(|warning| warning.contains("ghcr.io/acme/app:9.9.9"))
        .count();
    assert_eq!(mentions, 1);

    let logged = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
    assert!(!logged.contains("ghcr.io/acme/app:9.9.9"), "{}", logged);
}
