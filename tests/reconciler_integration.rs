//! End-to-end tests for the upsert engine against an in-memory store.

use chrono::{DateTime, Duration, Utc};
use genai_pulse::ingest::Reconciler;
use genai_pulse::scoring::popularity_score;
use genai_pulse::sources::{Candidate, Ecosystem, classifier, github};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};

async fn memory_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();

    sqlx::migrate!("./migrations").run(&pool).await.unwrap();

    pool
}

fn candidate(name: &str, version: Option<&str>, downloads: i64) -> Candidate {
    Candidate {
        name: name.to_string(),
        description: Some(format!("{name} description")),
        version: version.map(ToString::to_string),
        last_update: Utc::now(),
        repository_url: None,
        documentation_url: None,
        package_url: None,
        downloads,
        release_notes: None,
        categories: classifier::PYPI.classify(name, ""),
    }
}

async fn library_count(pool: &SqlitePool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM library").fetch_one(pool).await.unwrap()
}

async fn version_labels(pool: &SqlitePool, name: &str) -> Vec<String> {
    sqlx::query(
        "SELECT v.version_number FROM version v JOIN library l ON l.id = v.library_id \
         WHERE l.name = ? ORDER BY v.id",
    )
    .bind(name)
    .fetch_all(pool)
    .await
    .unwrap()
    .into_iter()
    .map(|row| row.get("version_number"))
    .collect()
}

async fn library_field<T>(pool: &SqlitePool, name: &str, column: &str) -> T
where
    T: for<'r> sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite> + Send + Unpin,
{
    let row = sqlx::query(&format!("SELECT {column} FROM library WHERE name = ?"))
        .bind(name)
        .fetch_one(pool)
        .await
        .unwrap();

    row.get(0)
}

#[tokio::test]
async fn test_upsert_creates_library_with_score_version_and_categories() {
    let pool = memory_pool().await;
    let reconciler = Reconciler::new(pool.clone());

    let batch = vec![candidate("widget-ai", Some("1.0"), 100)];
    reconciler.upsert(&batch, Ecosystem::Python).await.unwrap();

    assert_eq!(library_count(&pool).await, 1);

    let score: f64 = library_field(&pool, "widget-ai", "popularity_score").await;
    assert!((score - 0.000_07).abs() < 1e-12);

    let stars: i64 = library_field(&pool, "widget-ai", "github_stars").await;
    assert_eq!(stars, 0);

    assert_eq!(version_labels(&pool, "widget-ai").await, vec!["1.0"]);

    let categories: Vec<String> = sqlx::query(
        "SELECT c.name FROM category c JOIN library_categories lc ON lc.category_id = c.id \
         JOIN library l ON l.id = lc.library_id WHERE l.name = 'widget-ai'",
    )
    .fetch_all(&pool)
    .await
    .unwrap()
    .into_iter()
    .map(|row| row.get(0))
    .collect();

    assert_eq!(categories, vec!["Artificial Intelligence"]);
}

#[tokio::test]
async fn test_upsert_twice_is_idempotent() {
    let pool = memory_pool().await;
    let reconciler = Reconciler::new(pool.clone());

    let batch = vec![candidate("torchlike", Some("2.0.1"), 5_000)];
    reconciler.upsert(&batch, Ecosystem::Python).await.unwrap();
    reconciler.upsert(&batch, Ecosystem::Python).await.unwrap();

    assert_eq!(library_count(&pool).await, 1);
    assert_eq!(version_labels(&pool, "torchlike").await, vec!["2.0.1"]);
}

#[tokio::test]
async fn test_version_history_grows_monotonically() {
    let pool = memory_pool().await;
    let reconciler = Reconciler::new(pool.clone());

    for version in ["1.0", "1.1", "2.0"] {
        let batch = vec![candidate("evolver", Some(version), 10)];
        reconciler.upsert(&batch, Ecosystem::Python).await.unwrap();
    }

    assert_eq!(version_labels(&pool, "evolver").await, vec!["1.0", "1.1", "2.0"]);

    let current: String = library_field(&pool, "evolver", "current_version").await;
    assert_eq!(current, "2.0");
}

#[tokio::test]
async fn test_version_bump_recomputes_score() {
    let pool = memory_pool().await;
    let reconciler = Reconciler::new(pool.clone());

    reconciler
        .upsert(&[candidate("widget-ai", Some("1.0"), 100)], Ecosystem::Python)
        .await
        .unwrap();
    reconciler
        .upsert(&[candidate("widget-ai", Some("1.1"), 200)], Ecosystem::Python)
        .await
        .unwrap();

    assert_eq!(version_labels(&pool, "widget-ai").await, vec!["1.0", "1.1"]);

    let score: f64 = library_field(&pool, "widget-ai", "popularity_score").await;
    assert!((score - popularity_score(200, 0)).abs() < 1e-12);
}

#[tokio::test]
async fn test_same_name_in_different_ecosystems_stays_distinct() {
    let pool = memory_pool().await;
    let reconciler = Reconciler::new(pool.clone());

    let batch = vec![candidate("openai", Some("1.0"), 0)];
    reconciler.upsert(&batch, Ecosystem::Python).await.unwrap();
    reconciler.upsert(&batch, Ecosystem::JavaScript).await.unwrap();

    assert_eq!(library_count(&pool).await, 2);
}

#[tokio::test]
async fn test_duplicates_within_one_batch_collapse_to_one_record() {
    let pool = memory_pool().await;
    let reconciler = Reconciler::new(pool.clone());

    // The same package surfacing under two keywords in one sweep.
    let batch = vec![candidate("dupe-ai", Some("1.0"), 10), candidate("dupe-ai", Some("1.0"), 10)];
    reconciler.upsert(&batch, Ecosystem::Python).await.unwrap();

    assert_eq!(library_count(&pool).await, 1);
    assert_eq!(version_labels(&pool, "dupe-ai").await, vec!["1.0"]);
}

#[tokio::test]
async fn test_update_leaves_omitted_fields_unchanged() {
    let pool = memory_pool().await;
    let reconciler = Reconciler::new(pool.clone());

    let mut first = candidate("keeper-ai", Some("1.0"), 50);
    first.repository_url = Some("https://github.com/example/keeper".to_string());
    first.documentation_url = Some("https://keeper.example.com/docs".to_string());
    reconciler.upsert(&[first], Ecosystem::Python).await.unwrap();

    let mut second = candidate("keeper-ai", Some("1.0"), 75);
    second.description = None;
    second.repository_url = None;
    second.documentation_url = None;
    reconciler.upsert(&[second], Ecosystem::Python).await.unwrap();

    let description: String = library_field(&pool, "keeper-ai", "description").await;
    assert_eq!(description, "keeper-ai description");

    let repository: String = library_field(&pool, "keeper-ai", "repository_url").await;
    assert_eq!(repository, "https://github.com/example/keeper");

    let downloads: i64 = library_field(&pool, "keeper-ai", "monthly_downloads").await;
    assert_eq!(downloads, 75);
}

#[tokio::test]
async fn test_update_does_not_resync_categories() {
    let pool = memory_pool().await;
    let reconciler = Reconciler::new(pool.clone());

    reconciler
        .upsert(&[candidate("frozen-ai", Some("1.0"), 0)], Ecosystem::Python)
        .await
        .unwrap();

    let mut changed = candidate("frozen-ai", Some("1.1"), 0);
    changed.categories = ["Computer Vision".to_string()].into();
    reconciler.upsert(&[changed], Ecosystem::Python).await.unwrap();

    let association_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM library_categories lc JOIN library l ON l.id = lc.library_id WHERE l.name = 'frozen-ai'",
    )
    .fetch_one(&pool)
    .await
    .unwrap();

    // Associations are frozen at creation time.
    assert_eq!(association_count, 1);
}

#[tokio::test]
async fn test_candidate_without_version_creates_no_history() {
    let pool = memory_pool().await;
    let reconciler = Reconciler::new(pool.clone());

    reconciler.upsert(&[candidate("nover-ai", None, 0)], Ecosystem::Python).await.unwrap();

    assert_eq!(library_count(&pool).await, 1);
    assert!(version_labels(&pool, "nover-ai").await.is_empty());
}

#[tokio::test]
async fn test_refresh_skips_malformed_repository_urls_without_error() {
    let pool = memory_pool().await;
    let reconciler = Reconciler::new(pool.clone());

    // LIKE-matches the refresh query but has no owner/repo path, so it is
    // skipped before any outbound call happens.
    let mut broken = candidate("broken-url-ai", Some("1.0"), 10);
    broken.repository_url = Some("https://github.com/justanowner".to_string());

    // The Maven adapter's search-link placeholder, equally unusable.
    let mut search_link = candidate("search-link-ai", Some("1.0"), 10);
    search_link.repository_url = Some("https://github.com/search?q=org.example:artifact".to_string());

    reconciler.upsert(&[broken, search_link], Ecosystem::Python).await.unwrap();

    let before: f64 = library_field(&pool, "broken-url-ai", "popularity_score").await;

    let github = github::Provider::new(None).unwrap();
    reconciler.refresh_repositories(&github).await.unwrap();

    let stars: i64 = library_field(&pool, "broken-url-ai", "github_stars").await;
    assert_eq!(stars, 0);

    let after: f64 = library_field(&pool, "broken-url-ai", "popularity_score").await;
    assert!((after - before).abs() < 1e-12);
}

#[tokio::test]
async fn test_version_release_date_comes_from_candidate() {
    let pool = memory_pool().await;
    let reconciler = Reconciler::new(pool.clone());

    let mut dated = candidate("dated-ai", Some("3.2.1"), 0);
    dated.last_update = Utc::now() - Duration::days(10);
    let expected = dated.last_update;

    reconciler.upsert(&[dated], Ecosystem::Python).await.unwrap();

    let release_date: DateTime<Utc> = sqlx::query(
        "SELECT v.release_date FROM version v JOIN library l ON l.id = v.library_id WHERE l.name = 'dated-ai'",
    )
    .fetch_one(&pool)
    .await
    .unwrap()
    .get(0);

    assert_eq!(release_date, expected);
}
