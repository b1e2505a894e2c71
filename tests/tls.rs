//! HTTPS listener with a static certificate.

use std::sync::Arc;

use hostgate::config::parse_config;
use hostgate::http::{AppState, HttpServer};
use hostgate::net::CertificateProvider;
use hostgate::observability::AccessLogger;
use hostgate::routing::RoutingTable;
use serde_json::json;

mod common;

#[tokio::test]
async fn test_static_certificate_serves_https() {
    let backend = common::start_mock_backend("secure hello").await;
    let dir = tempfile::tempdir().unwrap();

    let generated = rcgen::generate_simple_self_signed(vec![
        "app.example.com".to_string(),
        "api.example.com".to_string(),
    ])
    .unwrap();
    let cert_path = dir.path().join("cert.pem");
    let key_path = dir.path().join("key.pem");
    std::fs::write(&cert_path, generated.cert.pem()).unwrap();
    std::fs::write(&key_path, generated.key_pair.serialize_pem()).unwrap();

    let config = parse_config(
        &json!({
            "backends": { "app.": format!("http://{backend}") },
            "sslCertPath": cert_path,
            "sslKeyPath": key_path,
        })
        .to_string(),
    )
    .unwrap();

    let provider = CertificateProvider::from_config(&config).unwrap();
    assert!(matches!(provider, CertificateProvider::Static(_)));
    let tls = provider.rustls_config().unwrap();

    let routes = Arc::new(RoutingTable::from_config(dir.path().join("config.json"), config).unwrap());
    let access_log = Arc::new(AccessLogger::from_writer(std::io::sink()));
    let server = HttpServer::new(AppState::new(routes, access_log));

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = server.run_tls(listener, tls).await;
    });

    let client = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .resolve("app.example.com", addr)
        .resolve("api.example.com", addr)
        .no_proxy()
        .build()
        .unwrap();

    let res = client
        .get(format!("https://app.example.com:{}/", addr.port()))
        .send()
        .await
        .expect("TLS handshake failed");
    assert_eq!(res.status(), 200);
    assert_eq!(res.headers()["x-proxied-by"], "hostgate");
    assert_eq!(res.text().await.unwrap(), "secure hello");

    // Same certificate, but no route for this host.
    let res = client
        .get(format!("https://api.example.com:{}/", addr.port()))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}
