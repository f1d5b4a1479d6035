mod common;

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};

use common::{metadata_details, orchestrator_with, FakeProvider, ItemBuilder};
use screenpick_api::{
    api::{create_router, AppState},
    models::{StreamingService, UserProfile},
};

async fn create_test_server() -> TestServer {
    let arrival = ItemBuilder::new("tmdb", "329865", "Arrival")
        .year(2016)
        .genres(&["Science Fiction", "Drama"])
        .rating(7.6, 18000)
        .on(&[StreamingService::Netflix])
        .build();
    let heat = ItemBuilder::new("tmdb", "949", "Heat")
        .year(1995)
        .genres(&["Crime", "Thriller"])
        .rating(7.9, 7000)
        .build();

    let tmdb = Arc::new(
        FakeProvider::primary("tmdb")
            .with_search(vec![arrival.clone(), heat.clone()])
            .with_trending(vec![heat])
            .with_details(metadata_details(arrival, &["Denis Villeneuve"])),
    );

    let profile = UserProfile {
        genres_liked: vec!["sci-fi".to_string()],
        streaming_services: vec!["Netflix".to_string()],
        ..UserProfile::new(1)
    };

    let orchestrator = orchestrator_with(vec![tmdb], vec![profile]).await;
    TestServer::new(create_router(AppState::new(orchestrator))).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server().await;
    let response = server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>(), json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let server = create_test_server().await;

    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("trace-42"),
        )
        .await;
    assert_eq!(response.header("x-request-id"), "trace-42");

    let generated = server.get("/health").await;
    let id = generated.header("x-request-id");
    assert!(uuid::Uuid::parse_str(id.to_str().unwrap()).is_ok());
}

#[tokio::test]
async fn test_search() {
    let server = create_test_server().await;

    let response = server
        .get("/api/v1/search")
        .add_query_param("q", "arrival")
        .add_query_param("media_type", "movies")
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["query"], "arrival");
    assert_eq!(body["media_type"], "movie");
    assert_eq!(body["results"].as_array().unwrap().len(), 2);
    assert_eq!(body["providers_used"], json!(["tmdb"]));
}

#[tokio::test]
async fn test_empty_search_is_rejected() {
    let server = create_test_server().await;
    let response = server.get("/api/v1/search").add_query_param("q", "  ").await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(response.json::<Value>()["error"].is_string());
}

#[tokio::test]
async fn test_trending() {
    let server = create_test_server().await;
    let response = server
        .get("/api/v1/trending")
        .add_query_param("max_results", "5")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["results"][0]["title"], "Heat");
}

#[tokio::test]
async fn test_fallback_search() {
    let server = create_test_server().await;
    let response = server
        .get("/api/v1/search/fallback")
        .add_query_param("q", "heat")
        .add_query_param("provider", "tmdb")
        .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["provider_used"], "tmdb");
    assert_eq!(body["fallback_used"], false);

    server
        .get("/api/v1/search/fallback")
        .add_query_param("q", "heat")
        .add_query_param("provider", "nope")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_recommendations() {
    let server = create_test_server().await;

    let response = server
        .get("/api/v1/recommendations/1")
        .add_query_param("n", "5")
        .add_query_param("streaming_services", "netflix")
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    let recommendations = body["recommendations"].as_array().unwrap();
    assert_eq!(recommendations.len(), 1);
    assert_eq!(recommendations[0]["item"]["title"], "Arrival");
    assert!(recommendations[0]["score"].as_f64().unwrap() > 0.0);

    server
        .get("/api/v1/recommendations/99")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_streaming_filter_is_rejected() {
    let server = create_test_server().await;
    server
        .get("/api/v1/recommendations/1")
        .add_query_param("streaming_services", "betamax")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_watch_history_update() {
    let server = create_test_server().await;

    let response = server
        .post("/api/v1/users/1/history")
        .json(&json!({ "item_id": "329865" }))
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["updated"], true);

    let again = server
        .post("/api/v1/users/1/history")
        .json(&json!({ "item_id": "329865" }))
        .await;
    assert_eq!(again.json::<Value>()["updated"], false);

    server
        .post("/api/v1/users/1/history")
        .json(&json!({ "item_id": "arrival-2016" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_title_details() {
    let server = create_test_server().await;

    let response = server.get("/api/v1/titles/movie/329865").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["details"]["kind"], "metadata");
    assert_eq!(body["details"]["directors"], json!(["Denis Villeneuve"]));

    server
        .get("/api/v1/titles/podcast/1")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    server
        .get("/api/v1/titles/movie/1")
        .await
        .assert_status(StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn test_streaming_services() {
    let server = create_test_server().await;
    let response = server.get("/api/v1/streaming-services").await;
    response.assert_status_ok();
    let services = response.json::<Value>()["services"].as_array().unwrap().clone();
    assert_eq!(services.len(), 8);
    assert!(services.contains(&json!("netflix")));
}

#[tokio::test]
async fn test_provider_status_and_cache_clear() {
    let server = create_test_server().await;

    server
        .get("/api/v1/search")
        .add_query_param("q", "heat")
        .await
        .assert_status_ok();

    let status: Value = server
        .get("/api/v1/providers/status")
        .add_query_param("refresh", "true")
        .await
        .json();
    assert_eq!(status["active"], json!(["tmdb"]));
    assert_eq!(status["total_providers"], 1);
    assert_eq!(status["cache_size"], 1);
    assert!(status["metrics"]["provider_calls"].as_u64().unwrap() >= 1);

    let cleared: Value = server.delete("/api/v1/cache").await.json();
    assert_eq!(cleared["cleared"], 1);
}
