//! End-to-end tests: client → proxy → mock upstream.

use axum::http::StatusCode;
use serde_json::{json, Value};

use path_mask_proxy::config::RewriteConfig;
use path_mask_proxy::masking::RawPaths;
use path_mask_proxy::ProxyConfig;

mod common;
use common::{client, start_proxy, start_upstream, MockReply};

const ADMIN_KEY: &str = "test-key";

fn page() -> String {
    format!(
        concat!(
            "<!doctype html><html><head>",
            "<link rel=\"stylesheet\" href=\"http://example.com/wp-content/themes/t/style.css\">",
            "<script src=\"/wp-includes/js/jquery.js\"></script>",
            "<script>var cfg = {{\"upload\":\"http:\\/\\/example.com\\/wp-content\\/uploads\\/\"}};</script>",
            "</head><body>",
            "<img src=\"/wp-content/uploads/2024/05/a.jpg\">",
            "<form action=\"/wp-comments-post.php\" method=\"post\"></form>",
            "<p>{}</p></body></html>"
        ),
        "lorem ipsum ".repeat(30)
    )
}

fn config(upstream: std::net::SocketAddr) -> ProxyConfig {
    let mut config = ProxyConfig::default();
    config.upstream.address = upstream.to_string();
    config.site.origins = vec!["http://example.com".into()];
    config.paths = RawPaths {
        content: Some("assets".into()),
        includes: Some("core".into()),
        uploads: Some("media".into()),
        comments: Some("submit".into()),
    };
    config.admin.api_key = ADMIN_KEY.into();
    config.observability.metrics_enabled = false;
    config
}

fn wordpress(target: &str) -> MockReply {
    if target.starts_with("/wp-json/") {
        MockReply::ok(
            "application/json",
            format!(
                "{{\"source_url\":\"http:\\/\\/example.com\\/wp-content\\/uploads\\/a.jpg\",\"pad\":\"{}\"}}",
                "x".repeat(300)
            ),
        )
    } else if target == "/go" {
        MockReply::redirect("http://example.com/wp-content/uploads/a.jpg")
    } else if target.starts_with("/echo") || target.starts_with("/wp-content/") || target.starts_with("/wp-comments") {
        MockReply::ok("text/plain", target.to_string())
    } else {
        MockReply::ok("text/html; charset=UTF-8", page())
    }
}

#[tokio::test]
async fn test_document_is_masked() {
    let (upstream, _) = start_upstream(wordpress).await;
    let proxy = start_proxy(config(upstream)).await;

    let res = client().get(proxy.url("/hello-world/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let declared: usize = res.headers()["content-length"].to_str().unwrap().parse().unwrap();
    let body = res.text().await.unwrap();

    assert_eq!(body.len(), declared);
    assert!(!body.contains("wp-content"), "{}", body);
    assert!(!body.contains("wp-includes"));
    assert!(body.contains("href=\"http://example.com/assets/themes/t/style.css\""));
    assert!(body.contains("src=\"/core/js/jquery.js\""));
    assert!(body.contains("http:\\/\\/example.com\\/media\\/"));
    assert!(body.contains("src=\"/media/2024/05/a.jpg\""));
    assert!(body.contains("action=\"/submit\""));

    proxy.shutdown.trigger();
}

#[tokio::test]
async fn test_data_responses_are_byte_identical() {
    let (upstream, _) = start_upstream(wordpress).await;
    let proxy = start_proxy(config(upstream)).await;

    let body = client()
        .get(proxy.url("/wp-json/wp/v2/media/1"))
        .send()
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    assert_eq!(body, wordpress("/wp-json/wp/v2/media/1").body);
}

#[tokio::test]
async fn test_admin_pages_are_not_body_masked() {
    let (upstream, _) = start_upstream(wordpress).await;
    let proxy = start_proxy(config(upstream)).await;

    let body = client().get(proxy.url("/wp-admin/")).send().await.unwrap().text().await.unwrap();
    assert_eq!(body, page());
}

#[tokio::test]
async fn test_masked_requests_reach_real_paths() {
    let (upstream, seen) = start_upstream(wordpress).await;
    let proxy = start_proxy(config(upstream)).await;
    let client = client();

    let cases = [
        ("/media/2024/05/a.jpg?ver=2", "/wp-content/uploads/2024/05/a.jpg?ver=2"),
        ("/assets/themes/t/style.css", "/wp-content/themes/t/style.css"),
        ("/submit", "/wp-comments-post.php"),
        ("/echo/unmasked", "/echo/unmasked"),
    ];
    for (masked, real) in cases {
        let body = client.get(proxy.url(masked)).send().await.unwrap().text().await.unwrap();
        assert_eq!(body, real, "{}", masked);
    }

    let heads = seen.lock().unwrap();
    assert!(heads.iter().any(|h| h.starts_with("GET /wp-content/uploads/2024/05/a.jpg?ver=2 ")));
}

#[tokio::test]
async fn test_accept_encoding_is_not_forwarded() {
    let (upstream, seen) = start_upstream(wordpress).await;
    let proxy = start_proxy(config(upstream)).await;

    client()
        .get(proxy.url("/echo"))
        .header("accept-encoding", "gzip, br")
        .send()
        .await
        .unwrap();

    let heads = seen.lock().unwrap();
    assert_eq!(heads.len(), 1);
    assert!(!heads[0].to_ascii_lowercase().contains("accept-encoding"));
}

#[tokio::test]
async fn test_redirect_location_is_masked() {
    let (upstream, _) = start_upstream(wordpress).await;
    let proxy = start_proxy(config(upstream)).await;

    let res = client().get(proxy.url("/go")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::FOUND);
    assert_eq!(res.headers()["location"], "http://example.com/media/a.jpg");
}

#[tokio::test]
async fn test_operator_rewrites_run_after_masking_rules() {
    let (upstream, _) = start_upstream(|target: &str| MockReply::ok("text/plain", target.to_string())).await;
    let mut config = config(upstream);
    config.rewrites = vec![RewriteConfig {
        name: "catch-all".into(),
        pattern: "^(.*)$".into(),
        target: "index.php?page=$1".into(),
    }];
    let proxy = start_proxy(config).await;
    let client = client();

    let body = client.get(proxy.url("/media/a.jpg")).send().await.unwrap().text().await.unwrap();
    assert_eq!(body, "/wp-content/uploads/a.jpg");

    let body = client.get(proxy.url("/about")).send().await.unwrap().text().await.unwrap();
    assert_eq!(body, "/index.php?page=about");
}

#[tokio::test]
async fn test_admin_requires_key() {
    let (upstream, _) = start_upstream(wordpress).await;
    let proxy = start_proxy(config(upstream)).await;

    let res = client().get(proxy.admin_url("/admin/status")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client()
        .get(proxy.admin_url("/admin/status"))
        .bearer_auth("wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_save_swaps_masks() {
    let (upstream, _) = start_upstream(wordpress).await;
    let proxy = start_proxy(config(upstream)).await;
    let client = client();

    let res = client
        .put(proxy.admin_url("/admin/paths"))
        .bearer_auth(ADMIN_KEY)
        .json(&json!({ "uploads": "files", "content": "static" }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let saved: Value = res.json().await.unwrap();
    assert_eq!(saved["paths"]["uploads"], "files");
    assert_eq!(saved["generation"], 2);

    let body = client.get(proxy.url("/")).send().await.unwrap().text().await.unwrap();
    assert!(body.contains("src=\"/files/2024/05/a.jpg\""));
    assert!(body.contains("/static/themes/t/style.css"));

    let body = client.get(proxy.url("/files/a.jpg")).send().await.unwrap().text().await.unwrap();
    assert_eq!(body, "/wp-content/uploads/a.jpg");

    let rules: Value = client
        .get(proxy.admin_url("/admin/rules"))
        .bearer_auth(ADMIN_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let block = rules["block"].as_str().unwrap();
    assert!(block.starts_with("# BEGIN PATH_MASK\n"));
    assert!(block.contains("RewriteRule ^files\\/(.*)$ wp-content/uploads/$1 [L]"));
}

#[tokio::test]
async fn test_admin_save_rejects_collisions() {
    let (upstream, _) = start_upstream(wordpress).await;
    let proxy = start_proxy(config(upstream)).await;
    let client = client();

    for body in [
        json!({ "uploads": "static", "content": "static" }),
        json!({ "uploads": "wp-includes" }),
    ] {
        let res = client
            .put(proxy.admin_url("/admin/paths"))
            .bearer_auth(ADMIN_KEY)
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY, "{}", body);
        let errors: Value = res.json().await.unwrap();
        assert!(!errors["errors"].as_array().unwrap().is_empty());
    }

    let paths: Value = client
        .get(proxy.admin_url("/admin/paths"))
        .bearer_auth(ADMIN_KEY)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(paths["paths"]["uploads"], "media");
    assert_eq!(paths["generation"], 1);
}

#[tokio::test]
async fn test_subdirectory_site_round_trips() {
    let (upstream, _) = start_upstream(|target: &str| {
        if target == "/blog/" {
            MockReply::ok(
                "text/html; charset=UTF-8",
                format!(
                    "<html><body><img src=\"http://example.com/blog/wp-content/uploads/a.jpg\"><p>{}</p></body></html>",
                    "lorem ipsum ".repeat(30)
                ),
            )
        } else {
            MockReply::ok("text/plain", target.to_string())
        }
    })
    .await;
    let mut config = config(upstream);
    config.site.origins = vec!["http://example.com/blog".into()];
    let proxy = start_proxy(config).await;
    let client = client();

    let body = client.get(proxy.url("/blog/")).send().await.unwrap().text().await.unwrap();
    assert!(body.contains("src=\"http://example.com/blog/media/a.jpg\""), "{}", body);

    let body = client.get(proxy.url("/blog/media/a.jpg")).send().await.unwrap().text().await.unwrap();
    assert_eq!(body, "/blog/wp-content/uploads/a.jpg");

    let body = client.get(proxy.url("/media/a.jpg")).send().await.unwrap().text().await.unwrap();
    assert_eq!(body, "/wp-content/uploads/a.jpg");
}
