use super::*;
use mockito::Matcher;

fn local_repository(server: &mockito::Server, path: &str) -> Repository {
    format!("{}/{}", server.host_with_port(), path)
        .parse()
        .unwrap()
}

#[test]
fn test_client_config_default() {
    let config = ClientConfig::default();
    assert_eq!(config.timeout_seconds, 30);
    assert_eq!(config.max_idle_per_host, 10);
    assert!(config.insecure_registries.is_empty());
    assert!(config.credentials.is_empty());
}

#[test]
fn test_client_config_builder_chaining() {
    let config = ClientConfig::new()
        .with_timeout(90)
        .with_max_idle_per_host(5)
        .with_insecure_registry("registry.internal:5000")
        .with_credentials("ghcr.io", Credentials::basic("user", "pass"));

    assert_eq!(config.timeout_seconds, 90);
    assert_eq!(config.max_idle_per_host, 5);
    assert_eq!(config.insecure_registries, ["registry.internal:5000"]);
    assert_eq!(
        config.credentials.get("ghcr.io"),
        Some(&Credentials::basic("user", "pass"))
    );
}

#[test]
fn test_base_url_docker_hub_aliases() {
    let client = Client::new().unwrap();
    assert_eq!(client.base_url("docker.io"), "https://registry-1.docker.io");
    assert_eq!(
        client.base_url("index.docker.io"),
        "https://registry-1.docker.io"
    );
    assert_eq!(
        client.base_url("registry-1.docker.io"),
        "https://registry-1.docker.io"
    );
}

#[test]
fn test_base_url_uses_https_for_remote_registries() {
    let client = Client::new().unwrap();
    assert_eq!(client.base_url("ghcr.io"), "https://ghcr.io");
    assert_eq!(
        client.base_url("myregistry.azurecr.io"),
        "https://myregistry.azurecr.io"
    );
}

#[test]
fn test_base_url_uses_http_for_local_hosts() {
    let client = Client::new().unwrap();
    assert_eq!(client.base_url("localhost:5000"), "http://localhost:5000");
    assert_eq!(client.base_url("127.0.0.1:5000"), "http://127.0.0.1:5000");
    assert_eq!(client.base_url("[::1]:5000"), "http://[::1]:5000");
    assert_eq!(client.base_url("registry.local"), "http://registry.local");
}

#[test]
fn test_base_url_uses_http_for_insecure_registries() {
    let config = ClientConfig::new().with_insecure_registry("registry.internal:5000");
    let client = Client::with_config(config).unwrap();
    assert_eq!(
        client.base_url("registry.internal:5000"),
        "http://registry.internal:5000"
    );
    assert_eq!(
        client.base_url("registry.internal:6000"),
        "https://registry.internal:6000"
    );
}

#[test]
fn test_extract_next_link_with_double_quotes() {
    let mut headers = HeaderMap::new();
    headers.insert(
        LINK,
        reqwest::header::HeaderValue::from_static(
            r#"</v2/org/app/tags/list?n=100&last=v1>; rel="next""#,
        ),
    );

    let next = Client::extract_next_link(&headers);
    assert_eq!(next, Some("/v2/org/app/tags/list?n=100&last=v1".to_string()));
}

#[test]
fn test_extract_next_link_multiple_links() {
    let mut headers = HeaderMap::new();
    headers.insert(
        LINK,
        reqwest::header::HeaderValue::from_static(
            r#"</v2/app/tags/list?last=a>; rel="prev", </v2/app/tags/list?last=z>; rel="next""#,
        ),
    );

    let next = Client::extract_next_link(&headers);
    assert_eq!(next, Some("/v2/app/tags/list?last=z".to_string()));
}

#[test]
fn test_extract_next_link_no_link_header() {
    assert_eq!(Client::extract_next_link(&HeaderMap::new()), None);
}

#[test]
fn test_list_tags_success() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/v2/org/app/tags/list")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"name":"org/app","tags":["1.0.0","latest"]}"#)
        .create();

    let client = Client::new().unwrap();
    let tags = client
        .list_tags(&local_repository(&server, "org/app"))
        .unwrap();

    mock.assert();
    assert_eq!(tags, ["1.0.0", "latest"]);
}

#[test]
fn test_list_tags_null_tags() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/v2/org/app/tags/list")
        .with_status(200)
        .with_body(r#"{"name":"org/app","tags":null}"#)
        .create();

    let client = Client::new().unwrap();
    let tags = client
        .list_tags(&local_repository(&server, "org/app"))
        .unwrap();

    mock.assert();
    assert!(tags.is_empty());
}

#[test]
fn test_list_tags_with_pagination() {
    let mut server = mockito::Server::new();

    let first = server
        .mock("GET", "/v2/org/app/tags/list")
        .with_status(200)
        .with_header("Link", r#"</v2/org/app/tags/list?last=b>; rel="next""#)
        .with_body(r#"{"name":"org/app","tags":["a","b"]}"#)
        .create();

    let second = server
        .mock("GET", "/v2/org/app/tags/list?last=b")
        .with_status(200)
        .with_body(r#"{"name":"org/app","tags":["c"]}"#)
        .create();

    let client = Client::new().unwrap();
    let tags = client
        .list_tags(&local_repository(&server, "org/app"))
        .unwrap();

    first.assert();
    second.assert();
    assert_eq!(tags, ["a", "b", "c"]);
}

#[test]
fn test_list_tags_not_found() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/v2/org/missing/tags/list")
        .with_status(404)
        .with_body(r#"{"errors":[{"code":"NAME_UNKNOWN"}]}"#)
        .create();

    let client = Client::new().unwrap();
    let result = client.list_tags(&local_repository(&server, "org/missing"));

    mock.assert();
    assert!(matches!(result.unwrap_err(), ImageqError::NotFound { .. }));
}

#[test]
fn test_list_tags_rate_limit_with_retry_after() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/v2/org/app/tags/list")
        .with_status(429)
        .with_header("Retry-After", "120")
        .with_body("too many requests")
        .create();

    let client = Client::new().unwrap();
    let result = client.list_tags(&local_repository(&server, "org/app"));

    mock.assert();
    match result.unwrap_err() {
        ImageqError::RateLimit {
            message,
            retry_after,
        } => {
            assert!(message.contains("Rate limit exceeded"));
            assert_eq!(retry_after, Some(120));
        }
        other => panic!("Expected RateLimit error, got {:?}", other),
    }
}

#[test]
fn test_list_tags_rate_limit_with_invalid_retry_after() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/v2/org/app/tags/list")
        .with_status(429)
        .with_header("Retry-After", "Sun, 06 Nov 2044 08:49:37 GMT")
        .create();

    let client = Client::new().unwrap();
    let result = client.list_tags(&local_repository(&server, "org/app"));

    assert!(matches!(
        result.unwrap_err(),
        ImageqError::RateLimit {
            retry_after: None,
            ..
        }
    ));
}

#[test]
fn test_list_tags_server_error() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/v2/org/app/tags/list")
        .with_status(503)
        .with_body("maintenance")
        .create();

    let client = Client::new().unwrap();
    let result = client.list_tags(&local_repository(&server, "org/app"));

    assert!(matches!(
        result.unwrap_err(),
        ImageqError::Server {
            status_code: 503,
            ..
        }
    ));
}

#[test]
fn test_list_tags_forbidden() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/v2/org/app/tags/list")
        .with_status(403)
        .create();

    let client = Client::new().unwrap();
    let result = client.list_tags(&local_repository(&server, "org/app"));

    assert!(matches!(
        result.unwrap_err(),
        ImageqError::Authentication {
            status_code: Some(403),
            ..
        }
    ));
}

#[test]
fn test_list_tags_unauthorized_without_challenge() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/v2/org/app/tags/list")
        .with_status(401)
        .with_body("authentication required")
        .expect(1)
        .create();

    let client = Client::new().unwrap();
    let result = client.list_tags(&local_repository(&server, "org/app"));

    mock.assert();
    assert!(matches!(
        result.unwrap_err(),
        ImageqError::Authentication {
            status_code: Some(401),
            ..
        }
    ));
}

#[test]
fn test_bearer_challenge_fetches_token_and_retries() {
    let mut server = mockito::Server::new();
    let challenge = format!(
        r#"Bearer realm="{}/token",service="test-registry""#,
        server.url()
    );

    let unauthorized = server
        .mock("GET", "/v2/org/app/tags/list")
        .match_header("authorization", Matcher::Missing)
        .with_status(401)
        .with_header("WWW-Authenticate", &challenge)
        .create();

    let token = server
        .mock("GET", "/token")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("service".into(), "test-registry".into()),
            Matcher::UrlEncoded("scope".into(), "repository:org/app:pull".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"token":"secret-token"}"#)
        .expect(1)
        .create();

    let authorized = server
        .mock("GET", "/v2/org/app/tags/list")
        .match_header("authorization", "Bearer secret-token")
        .with_status(200)
        .with_body(r#"{"name":"org/app","tags":["1.0.0"]}"#)
        .expect(2)
        .create();

    let client = Client::new().unwrap();
    let repository = local_repository(&server, "org/app");

    assert_eq!(client.list_tags(&repository).unwrap(), ["1.0.0"]);
    // The cached token is sent straight away on the next request.
    assert_eq!(client.list_tags(&repository).unwrap(), ["1.0.0"]);

    unauthorized.assert();
    token.assert();
    authorized.assert();
}

#[test]
fn test_bearer_challenge_sends_basic_credentials_to_token_service() {
    let mut server = mockito::Server::new();
    let challenge = format!(r#"Bearer realm="{}/token""#, server.url());

    let _unauthorized = server
        .mock("GET", "/v2/org/app/tags/list")
        .match_header("authorization", Matcher::Missing)
        .with_status(401)
        .with_header("WWW-Authenticate", &challenge)
        .create();

    // base64("user:pass")
    let token = server
        .mock("GET", "/token")
        .match_query(Matcher::Any)
        .match_header("authorization", "Basic dXNlcjpwYXNz")
        .with_status(200)
        .with_body(r#"{"access_token":"user-token"}"#)
        .create();

    let _authorized = server
        .mock("GET", "/v2/org/app/tags/list")
        .match_header("authorization", "Bearer user-token")
        .with_status(200)
        .with_body(r#"{"name":"org/app","tags":["2.0.0"]}"#)
        .create();

    let repository = local_repository(&server, "org/app");
    let config = ClientConfig::new()
        .with_credentials(repository.registry(), Credentials::basic("user", "pass"));
    let client = Client::with_config(config).unwrap();

    assert_eq!(client.list_tags(&repository).unwrap(), ["2.0.0"]);
    token.assert();
}

#[test]
fn test_basic_challenge_retries_with_configured_credentials() {
    let mut server = mockito::Server::new();

    let _unauthorized = server
        .mock("GET", "/v2/org/app/tags/list")
        .match_header("authorization", Matcher::Missing)
        .with_status(401)
        .with_header("WWW-Authenticate", r#"Basic realm="Registry""#)
        .create();

    let authorized = server
        .mock("GET", "/v2/org/app/tags/list")
        .match_header("authorization", "Basic dXNlcjpwYXNz")
        .with_status(200)
        .with_body(r#"{"name":"org/app","tags":["3.0.0"]}"#)
        .create();

    let repository = local_repository(&server, "org/app");
    let config = ClientConfig::new()
        .with_credentials(repository.registry(), Credentials::basic("user", "pass"));
    let client = Client::with_config(config).unwrap();

    assert_eq!(client.list_tags(&repository).unwrap(), ["3.0.0"]);
    authorized.assert();
}

#[test]
fn test_configured_bearer_token_is_sent_up_front() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/v2/org/app/tags/list")
        .match_header("authorization", "Bearer preissued")
        .with_status(200)
        .with_body(r#"{"name":"org/app","tags":["1.0"]}"#)
        .create();

    let repository = local_repository(&server, "org/app");
    let config = ClientConfig::new()
        .with_credentials(repository.registry(), Credentials::bearer("preissued"));
    let client = Client::with_config(config).unwrap();

    assert_eq!(client.list_tags(&repository).unwrap(), ["1.0"]);
    mock.assert();
}

#[test]
fn test_fetch_manifest_uses_digest_header() {
    let mut server = mockito::Server::new();
    let digest = "sha256:c5b1261d6d3e43071626931fc004f70149baeba2c8ec672bd4f27761f8e1ad6b";
    let mock = server
        .mock("GET", "/v2/org/app/manifests/latest")
        .match_header(
            "accept",
            Matcher::Regex("application/vnd.oci.image.index.v1\\+json".to_string()),
        )
        .with_status(200)
        .with_header("Docker-Content-Digest", digest)
        .with_body(r#"{"schemaVersion":2}"#)
        .create();

    let client = Client::new().unwrap();
    let (bytes, returned_digest) = client
        .fetch_manifest(&local_repository(&server, "org/app"), "latest")
        .unwrap();

    mock.assert();
    assert_eq!(bytes, br#"{"schemaVersion":2}"#);
    assert_eq!(returned_digest, digest);
}

#[test]
fn test_fetch_manifest_computes_digest_without_header() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/v2/org/app/manifests/1.0.0")
        .with_status(200)
        .with_body("hello")
        .create();

    let client = Client::new().unwrap();
    let (_, digest) = client
        .fetch_manifest(&local_repository(&server, "org/app"), "1.0.0")
        .unwrap();

    assert_eq!(
        digest,
        "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
    );
}

#[test]
fn test_fetch_blob_verifies_digest() {
    let mut server = mockito::Server::new();
    let digest = "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
    let _mock = server
        .mock("GET", format!("/v2/org/app/blobs/{}", digest).as_str())
        .with_status(200)
        .with_body("hello")
        .create();

    let client = Client::new().unwrap();
    let blob = client
        .fetch_blob(&local_repository(&server, "org/app"), digest)
        .unwrap();

    assert_eq!(blob, b"hello");
}

#[test]
fn test_fetch_blob_digest_mismatch() {
    let mut server = mockito::Server::new();
    let digest = "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
    let _mock = server
        .mock("GET", format!("/v2/org/app/blobs/{}", digest).as_str())
        .with_status(200)
        .with_body("tampered")
        .create();

    let client = Client::new().unwrap();
    let result = client.fetch_blob(&local_repository(&server, "org/app"), digest);

    match result.unwrap_err() {
        ImageqError::Validation { message, .. } => assert!(message.contains("mismatch")),
        other => panic!("Expected Validation error, got {:?}", other),
    }
}

#[test]
fn test_fetch_blob_rejects_invalid_digest() {
    let client = Client::new().unwrap();
    let repository: Repository = "localhost:5000/org/app".parse().unwrap();
    let result = client.fetch_blob(&repository, "not-a-digest");
    assert!(matches!(result.unwrap_err(), ImageqError::Validation { .. }));
}

#[test]
fn test_connection_refused_is_network_error() {
    let client = Client::with_config(ClientConfig::new().with_timeout(2)).unwrap();
    let repository: Repository = "127.0.0.1:1/org/app".parse().unwrap();
    let result = client.list_tags(&repository);
    assert!(matches!(result.unwrap_err(), ImageqError::Network { .. }));
}

#[test]
fn test_memory_transport_serves_tags_and_digests() {
    let repository: Repository = "ghcr.io/acme/app".parse().unwrap();
    let mut transport = MemoryTransport::new().with_tags(&repository, ["1.0.0"]);
    let digest = transport.publish_manifest(&repository, Some("1.0.0"), b"{}".to_vec());

    assert_eq!(transport.list_tags(&repository).unwrap(), ["1.0.0"]);
    let (by_tag, tag_digest) = transport.fetch_manifest(&repository, "1.0.0").unwrap();
    let (by_digest, _) = transport.fetch_manifest(&repository, &digest).unwrap();

    assert_eq!(by_tag, by_digest);
    assert_eq!(tag_digest, digest);
    assert_eq!(transport.manifest_requests(), 2);
    assert!(transport.fetch_blob(&repository, &digest).is_err());
}
