//! End-to-end tests for the JSON API over a seeded in-memory store.

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use genai_pulse::server;
use genai_pulse::store::{Catalog, seed_sample_data};
use serde_json::Value;
use sqlx::sqlite::SqlitePoolOptions;
use tower::util::ServiceExt;

async fn seeded_app() -> Router {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    seed_sample_data(&pool).await.unwrap();

    server::router(Catalog::new(pool))
}

async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap();

    (status, value)
}

#[tokio::test]
async fn test_stats_reflect_seeded_catalog() {
    let app = seeded_app().await;
    let (status, stats) = get_json(&app, "/api/stats").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["total_libraries"], 11);
    assert_eq!(stats["total_categories"], 10);
    assert!(stats["last_update"].is_string());
    assert_eq!(stats["ecosystems"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_libraries_filter_by_ecosystem() {
    let app = seeded_app().await;
    let (status, body) = get_json(&app, "/api/libraries?ecosystem=Python").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 4);

    for library in body["libraries"].as_array().unwrap() {
        assert_eq!(library["ecosystem"], "Python");
        assert!(library["categories"].as_array().is_some());
    }
}

#[tokio::test]
async fn test_libraries_free_text_search() {
    let app = seeded_app().await;
    let (_, body) = get_json(&app, "/api/libraries?search=tensorflow").await;

    let names: Vec<&str> = body["libraries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["name"].as_str().unwrap())
        .collect();

    assert!(names.contains(&"TensorFlow"));
    assert!(names.contains(&"TensorFlow.js"));
    assert!(names.contains(&"TensorFlow.NET"));
}

#[tokio::test]
async fn test_libraries_sorted_by_name() {
    let app = seeded_app().await;
    let (_, body) = get_json(&app, "/api/libraries?sort=name").await;

    let names: Vec<&str> = body["libraries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["name"].as_str().unwrap())
        .collect();

    let mut sorted = names.clone();
    sorted.sort_by_key(|name| name.to_lowercase());

    assert_eq!(names, sorted);
    assert_eq!(names[0], "Brain.js");
}

#[tokio::test]
async fn test_libraries_default_sort_is_popularity() {
    let app = seeded_app().await;
    let (_, body) = get_json(&app, "/api/libraries").await;

    let scores: Vec<f64> = body["libraries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["popularity_score"].as_f64().unwrap())
        .collect();

    for window in scores.windows(2) {
        assert!(window[0] >= window[1]);
    }
}

#[tokio::test]
async fn test_libraries_pagination() {
    let app = seeded_app().await;
    let (_, body) = get_json(&app, "/api/libraries?limit=3&offset=0").await;

    assert_eq!(body["total"], 11);
    assert_eq!(body["limit"], 3);
    assert_eq!(body["libraries"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_library_detail_includes_version_history() {
    let app = seeded_app().await;
    let (_, listing) = get_json(&app, "/api/libraries?search=Transformers").await;
    let id = listing["libraries"][0]["id"].as_i64().unwrap();

    let (status, detail) = get_json(&app, &format!("/api/libraries/{id}")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["name"], "Transformers");
    assert!(!detail["categories"].as_array().unwrap().is_empty());

    let versions = detail["versions"].as_array().unwrap();
    assert_eq!(versions.len(), 3);

    // Newest release first.
    let dates: Vec<&str> = versions.iter().map(|v| v["release_date"].as_str().unwrap()).collect();
    let mut sorted = dates.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(dates, sorted);
}

#[tokio::test]
async fn test_unknown_library_is_a_clean_404() {
    let app = seeded_app().await;
    let (status, body) = get_json(&app, "/api/libraries/999999").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_categories_with_counts_and_kind_filter() {
    let app = seeded_app().await;
    let (_, body) = get_json(&app, "/api/categories").await;

    let categories = body["categories"].as_array().unwrap();
    assert_eq!(categories.len(), 10);

    // Every seeded library is tagged Artificial Intelligence, so it leads.
    assert_eq!(categories[0]["name"], "Artificial Intelligence");
    assert_eq!(categories[0]["library_count"], 11);

    let (_, domain_only) = get_json(&app, "/api/categories?kind=domain").await;
    let domain_categories = domain_only["categories"].as_array().unwrap();
    assert_eq!(domain_categories.len(), 1);
    assert_eq!(domain_categories[0]["name"], "Artificial Intelligence");
}

#[tokio::test]
async fn test_trends_surface() {
    let app = seeded_app().await;
    let (status, body) = get_json(&app, "/api/trends").await;

    assert_eq!(status, StatusCode::OK);

    let trending = body["trending_libraries"].as_array().unwrap();
    assert_eq!(trending.len(), 10);
    assert!(trending[0]["popularity_score"].as_f64().unwrap() >= trending[9]["popularity_score"].as_f64().unwrap());

    assert_eq!(body["ecosystem_distribution"].as_array().unwrap().len(), 4);
    assert!(!body["category_distribution"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_latest_respects_the_day_window() {
    let app = seeded_app().await;
    let (_, body) = get_json(&app, "/api/latest?days=40").await;

    let names: Vec<&str> = body["latest_libraries"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["name"].as_str().unwrap())
        .collect();

    // Seeded update ages within 40 days: Transformers (5), LangChain (2),
    // LangChain.js (3), PyTorch (15), TensorFlow (30).
    assert_eq!(names.len(), 5);
    assert!(names.contains(&"LangChain"));
    assert!(!names.contains(&"DL4J"));

    assert_eq!(body["days"], 40);
}
