use super::*;
use serde_json::json;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use fenix_inject_config::DirectEntry;

use crate::model::{FIXUP_SUMMARY_SENTINEL, UNKNOWN_PERMISSIONS_SENTINEL};

fn addon(guid: &str, name: &str) -> serde_json::Value {
    json!({
        "guid": guid,
        "name": name,
        "summary": format!("{name} does things"),
        "created": "2020-01-01T00:00:00Z",
        "weekly_downloads": 100,
    })
}

fn client_for(server: &MockServer) -> CatalogClient {
    let base = Url::parse(&server.uri()).unwrap();
    CatalogClient::new().with_api_base(base)
}

#[test]
fn test_budget_spends_down() {
    let mut budget = FetchBudget::new(2);
    assert!(budget.take().is_ok());
    assert!(budget.take().is_ok());
    assert!(matches!(
        budget.take(),
        Err(CatalogError::FetchBudgetExceeded { limit: 2 })
    ));
}

#[test]
fn test_budget_negative_is_unlimited() {
    let mut budget = FetchBudget::new(-1);
    for _ in 0..1000 {
        assert!(budget.take().is_ok());
    }
}

#[test]
fn test_budget_zero_blocks_first_fetch() {
    let mut budget = FetchBudget::new(0);
    assert!(matches!(
        budget.take(),
        Err(CatalogError::FetchBudgetExceeded { limit: 0 })
    ));
}

#[tokio::test]
async fn test_collection_pagination_follows_next() {
    let server = MockServer::start().await;

    let collection_path = "/accounts/account/16201230/collections/What-I-want-on-Fenix/addons/";
    Mock::given(method("GET"))
        .and(path(collection_path))
        .and(header("user-agent", "Firefox/109.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"addon": addon("a@x", "Alpha"), "notes": null},
                {"addon": addon("b@x", "Beta"), "notes": "curator pick"},
            ],
            "next": format!("{}/page2", server.uri()),
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"addon": addon("c@x", "Gamma"), "notes": null}],
            "next": null,
        })))
        .mount(&server)
        .await;

    let descriptor = SourceDescriptor::Collection {
        owner: "16201230".to_string(),
        collection: "What-I-want-on-Fenix".to_string(),
        language: "en-US".to_string(),
        user_agent: "Firefox/109.0".to_string(),
        sort: "-popularity".to_string(),
    };

    let client = client_for(&server);
    let mut budget = FetchBudget::new(10);
    let records = client.fetch_records(&descriptor, &mut budget).await.unwrap();

    let guids: Vec<&str> = records.iter().map(|r| r.guid.as_str()).collect();
    assert_eq!(guids, vec!["a@x", "b@x", "c@x"]);
}

#[tokio::test]
async fn test_guid_search_single_page() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/addons/search/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [addon("a@x", "Alpha")],
            "next": null,
        })))
        .mount(&server)
        .await;

    let descriptor = SourceDescriptor::GuidSearch {
        guids: vec!["a@x".to_string()],
        language: String::new(),
        user_agent: "Firefox/109.0".to_string(),
    };

    let client = client_for(&server);
    let mut budget = FetchBudget::new(10);
    let records = client.fetch_records(&descriptor, &mut budget).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].guid, "a@x");
    assert_eq!(records[0].flat_name(), Some("Alpha"));
}

#[tokio::test]
async fn test_runaway_paginator_hits_budget() {
    let server = MockServer::start().await;

    // Every page claims there is another one.
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [addon("a@x", "Alpha")],
            "next": format!("{}/addons/search/", server.uri()),
        })))
        .expect(3)
        .mount(&server)
        .await;

    let descriptor = SourceDescriptor::GuidSearch {
        guids: vec!["a@x".to_string()],
        language: String::new(),
        user_agent: "Firefox/109.0".to_string(),
    };

    let client = client_for(&server);
    let mut budget = FetchBudget::new(3);
    let result = client.fetch_records(&descriptor, &mut budget).await;
    assert!(matches!(
        result,
        Err(CatalogError::FetchBudgetExceeded { limit: 3 })
    ));
}

#[tokio::test]
async fn test_http_error_is_network() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let descriptor = SourceDescriptor::GuidSearch {
        guids: vec!["a@x".to_string()],
        language: String::new(),
        user_agent: "Firefox/109.0".to_string(),
    };

    let client = client_for(&server);
    let mut budget = FetchBudget::new(10);
    let result = client.fetch_records(&descriptor, &mut budget).await;
    assert!(matches!(result, Err(CatalogError::Network(_))));
}

#[tokio::test]
async fn test_undecodable_page_is_parse() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
        .mount(&server)
        .await;

    let descriptor = SourceDescriptor::GuidSearch {
        guids: vec!["a@x".to_string()],
        language: String::new(),
        user_agent: "Firefox/109.0".to_string(),
    };

    let client = client_for(&server);
    let mut budget = FetchBudget::new(10);
    let result = client.fetch_records(&descriptor, &mut budget).await;
    assert!(matches!(result, Err(CatalogError::Parse(_))));
}

#[tokio::test]
async fn test_local_files_in_order_without_budget_cost() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.json");
    let second = dir.path().join("second.json");
    std::fs::write(&first, addon("a@x", "Alpha").to_string()).unwrap();
    std::fs::write(&second, addon("b@x", "Beta").to_string()).unwrap();

    let descriptor = SourceDescriptor::LocalFiles {
        paths: vec![first, second],
    };

    let client = CatalogClient::new();
    let mut budget = FetchBudget::new(0);
    let records = client.fetch_records(&descriptor, &mut budget).await.unwrap();
    let guids: Vec<&str> = records.iter().map(|r| r.guid.as_str()).collect();
    assert_eq!(guids, vec!["a@x", "b@x"]);
}

#[tokio::test]
async fn test_local_file_parse_error_names_path() {
    let dir = tempfile::tempdir().unwrap();
    let broken = dir.path().join("broken.json");
    std::fs::write(&broken, "{").unwrap();

    let descriptor = SourceDescriptor::LocalFiles {
        paths: vec![broken.clone()],
    };

    let client = CatalogClient::new();
    let mut budget = FetchBudget::new(0);
    match client.fetch_records(&descriptor, &mut budget).await {
        Err(CatalogError::Parse(message)) => {
            assert!(message.contains("broken.json"));
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[tokio::test]
async fn test_direct_urls_synthesize_placeholders() {
    let descriptor = SourceDescriptor::DirectUrls {
        entries: vec![DirectEntry {
            guid: "foo@example.com".to_string(),
            name: "Foo".to_string(),
            url: "https://example.com/foo.xpi".to_string(),
        }],
    };

    let client = CatalogClient::new();
    let mut budget = FetchBudget::new(0);
    let records = client.fetch_records(&descriptor, &mut budget).await.unwrap();
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.guid, "foo@example.com");
    assert_eq!(record.summary.as_str(), Some(FIXUP_SUMMARY_SENTINEL));
    let files = &record.current_version.as_ref().unwrap().files;
    assert_eq!(files[0].url, "https://example.com/foo.xpi");
    assert_eq!(files[0].permissions, vec![UNKNOWN_PERMISSIONS_SENTINEL]);
}
