use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// One mirrored library. Identity is the `(name, ecosystem)` pair.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LibraryRow {
    pub id: i64,
    pub name: String,
    pub ecosystem: String,
    pub description: Option<String>,
    pub current_version: Option<String>,
    pub last_update: DateTime<Utc>,
    pub repository_url: Option<String>,
    pub documentation_url: Option<String>,
    pub package_url: Option<String>,
    pub popularity_score: f64,
    pub monthly_downloads: i64,
    pub github_stars: i64,
}

/// A catalog category. Created lazily by the reconciler; identity is the
/// exact name.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub kind: String,
}

/// One entry in a library's append-only version history.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct VersionRow {
    pub id: i64,
    pub library_id: i64,
    pub version_number: String,
    pub release_date: DateTime<Utc>,
    pub release_notes: Option<String>,
}
