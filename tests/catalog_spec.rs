//! Catalog cache tests.
//!
//! The HTTP source is exercised against a local axum server serving canned
//! catalog responses.

use std::collections::VecDeque;
use std::sync::Mutex;

use axum::{http::StatusCode, routing::get, Json, Router};
use catalog_shelf::catalog::{
    CatalogCache, CatalogSource, FetchError, HttpCatalogSource, CATALOG_LIMIT,
};
use catalog_shelf::models::Entity;
use serde_json::{json, Value};

/// Serve `app` on an ephemeral port and return its base URL.
async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("Server failed");
    });
    format!("http://{}", addr)
}

fn shows(count: usize) -> Value {
    Value::Array(
        (1..=count)
            .map(|i| {
                json!({
                    "id": i,
                    "name": format!("Show {}", i),
                    "genres": ["Drama"],
                    "image": {"medium": format!("https://img/{}.jpg", i), "original": null},
                    "premiered": "2014-01-01",
                    "runtime": 45,
                    "summary": "<p>Plot</p>"
                })
            })
            .collect(),
    )
}

fn catalog_app(body: Value) -> Router {
    Router::new().route(
        "/shows",
        get(move || {
            let body = body.clone();
            async move { Json(body) }
        }),
    )
}

/// Source that replays queued results, one per fetch.
struct Replay(Mutex<VecDeque<Result<Vec<Entity>, FetchError>>>);

impl Replay {
    fn new(results: Vec<Result<Vec<Entity>, FetchError>>) -> Self {
        Self(Mutex::new(results.into()))
    }
}

impl CatalogSource for Replay {
    async fn fetch(&self) -> Result<Vec<Entity>, FetchError> {
        self.0
            .lock()
            .expect("replay lock")
            .pop_front()
            .unwrap_or_else(|| Err(FetchError::Status("exhausted".to_string())))
    }
}

mod http_source {
    use super::*;

    #[tokio::test]
    async fn fetches_and_truncates_to_the_limit() {
        let base = serve(catalog_app(shows(60))).await;
        let cache = CatalogCache::new(HttpCatalogSource::new(format!("{}/shows", base)));

        let entities = cache.refresh().await.expect("Refresh failed");

        assert_eq!(entities.len(), CATALOG_LIMIT);
        assert_eq!(cache.len(), CATALOG_LIMIT);
        assert_eq!(entities[0].id, "1");
        assert_eq!(entities[49].id, "50");
        assert_eq!(entities[0].premiere_year(), Some(2014));
    }

    #[tokio::test]
    async fn keeps_short_catalogs_whole() {
        let base = serve(catalog_app(shows(3))).await;
        let cache = CatalogCache::new(HttpCatalogSource::new(format!("{}/shows", base)));

        cache.refresh().await.expect("Refresh failed");
        assert_eq!(cache.len(), 3);
    }

    #[tokio::test]
    async fn reports_error_statuses() {
        let app = Router::new().route(
            "/shows",
            get(|| async { (StatusCode::SERVICE_UNAVAILABLE, "down for maintenance") }),
        );
        let base = serve(app).await;
        let cache = CatalogCache::new(HttpCatalogSource::new(format!("{}/shows", base)));

        let result = cache.refresh().await;
        assert!(matches!(result, Err(FetchError::Status(msg)) if msg.contains("503")));
    }

    #[tokio::test]
    async fn tolerates_irregular_records() {
        let body = json!([
            {"id": 1, "name": "Under the Dome", "genres": ["Drama"], "premiered": "2013-06-24"},
            {"id": 2, "name": "Partial", "genres": null, "premiered": "2013", "runtime": 60.5},
            {"name": "No id"},
            {"id": 4, "name": "Bitten", "runtime": 60}
        ]);
        let base = serve(catalog_app(body)).await;
        let cache = CatalogCache::new(HttpCatalogSource::new(format!("{}/shows", base)));

        let entities = cache.refresh().await.expect("Refresh failed");

        let ids: Vec<&str> = entities.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "4"]);

        let partial = cache.get("2").expect("Partial record dropped");
        assert!(partial.genres.is_empty());
        assert_eq!(partial.premiere_year(), Some(2013));
        assert_eq!(partial.runtime.map(|r| r.to_string()).as_deref(), Some("60.5"));
    }

    #[tokio::test]
    async fn reports_malformed_bodies() {
        let base = serve(catalog_app(json!({"not": "a list"}))).await;
        let cache = CatalogCache::new(HttpCatalogSource::new(format!("{}/shows", base)));

        let result = cache.refresh().await;
        assert!(matches!(result, Err(FetchError::Decode(_))));
    }
}

mod cache {
    use super::*;

    #[tokio::test]
    async fn failed_refresh_keeps_the_previous_list() {
        let cache = CatalogCache::new(Replay::new(vec![
            Ok(vec![Entity::new("1", "Under the Dome")]),
            Err(FetchError::Status("500 Internal Server Error".to_string())),
        ]));

        cache.refresh().await.expect("First refresh failed");
        assert!(cache.refresh().await.is_err());

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("1").map(|e| e.name), Some("Under the Dome".to_string()));
    }

    #[tokio::test]
    async fn refresh_replaces_rather_than_merges() {
        let cache = CatalogCache::new(Replay::new(vec![
            Ok(vec![Entity::new("1", "A"), Entity::new("2", "B")]),
            Ok(vec![Entity::new("3", "C")]),
        ]));

        cache.refresh().await.expect("Refresh failed");
        cache.refresh().await.expect("Refresh failed");

        let ids: Vec<String> = cache.entities().into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["3"]);
    }

    #[tokio::test]
    async fn filter_matches_substrings_case_insensitively() {
        let cache = CatalogCache::new(Replay::new(vec![Ok(vec![
            Entity::new("1", "Under the Dome"),
            Entity::new("2", "Person of Interest"),
            Entity::new("3", "Bitten"),
        ])]));
        cache.refresh().await.expect("Refresh failed");

        let names: Vec<String> = cache.filter("tE").into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Person of Interest", "Bitten"]);

        let names: Vec<String> = cache.filter("DOME").into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Under the Dome"]);

        assert!(cache.filter("zzz").is_empty());
        assert_eq!(cache.filter("").len(), 3);
    }
}
