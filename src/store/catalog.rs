use crate::Result;
use crate::store::models::{CategoryRow, LibraryRow, VersionRow};
use chrono::{DateTime, Utc};
use ohno::IntoAppError;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, QueryBuilder, Row, Sqlite, SqlitePool};
use std::collections::HashMap;

/// Read-side queries backing the browsing surface.
#[derive(Debug, Clone)]
pub struct Catalog {
    pool: SqlitePool,
}

/// Sort order for library listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Popularity,
    Newest,
    Name,
}

/// Filter and pagination settings for [`Catalog::list_libraries`].
#[derive(Debug, Clone)]
pub struct LibraryFilter {
    pub ecosystem: Option<String>,
    pub category_id: Option<i64>,
    pub search: Option<String>,
    pub sort: SortOrder,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CategoryWithCount {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub kind: String,
    pub library_count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EcosystemCount {
    pub ecosystem: String,
    pub count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogStats {
    pub total_libraries: i64,
    pub total_categories: i64,
    pub ecosystems: Vec<EcosystemCount>,
    pub last_update: Option<DateTime<Utc>>,
}

impl Catalog {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List libraries matching the filter, returning the unpaginated total
    /// alongside the requested page.
    pub async fn list_libraries(&self, filter: &LibraryFilter) -> Result<(i64, Vec<LibraryRow>)> {
        let total = {
            let mut builder = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM library l");
            push_filters(&mut builder, filter);
            builder
                .build_query_scalar::<i64>()
                .fetch_one(&self.pool)
                .await
                .into_app_err("unable to count libraries")?
        };

        let mut builder = QueryBuilder::<Sqlite>::new("SELECT l.* FROM library l");
        push_filters(&mut builder, filter);

        let _ = builder.push(match filter.sort {
            SortOrder::Popularity => " ORDER BY l.popularity_score DESC",
            SortOrder::Newest => " ORDER BY l.last_update DESC",
            SortOrder::Name => " ORDER BY l.name COLLATE NOCASE",
        });
        let _ = builder.push(" LIMIT ").push_bind(filter.limit).push(" OFFSET ").push_bind(filter.offset);

        let rows = builder
            .build_query_as::<LibraryRow>()
            .fetch_all(&self.pool)
            .await
            .into_app_err("unable to list libraries")?;

        Ok((total, rows))
    }

    /// Category associations for a set of libraries, keyed by library id.
    pub async fn categories_for(&self, library_ids: &[i64]) -> Result<HashMap<i64, Vec<CategoryRow>>> {
        let mut map: HashMap<i64, Vec<CategoryRow>> = HashMap::new();
        if library_ids.is_empty() {
            return Ok(map);
        }

        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT lc.library_id AS library_id, c.id AS id, c.name AS name, c.description AS description, c.kind AS kind \
             FROM category c JOIN library_categories lc ON c.id = lc.category_id WHERE lc.library_id IN (",
        );

        {
            let mut separated = builder.separated(", ");
            for id in library_ids {
                let _ = separated.push_bind(*id);
            }
        }
        let _ = builder.push(") ORDER BY c.name");

        let rows = builder
            .build()
            .fetch_all(&self.pool)
            .await
            .into_app_err("unable to load category associations")?;

        for row in rows {
            let library_id: i64 = row.try_get("library_id").into_app_err("missing library_id column")?;
            let category = CategoryRow {
                id: row.try_get("id").into_app_err("missing id column")?,
                name: row.try_get("name").into_app_err("missing name column")?,
                description: row.try_get("description").into_app_err("missing description column")?,
                kind: row.try_get("kind").into_app_err("missing kind column")?,
            };

            map.entry(library_id).or_default().push(category);
        }

        Ok(map)
    }

    pub async fn library(&self, id: i64) -> Result<Option<LibraryRow>> {
        sqlx::query_as::<_, LibraryRow>("SELECT * FROM library WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .into_app_err_with(|| format!("unable to load library {id}"))
    }

    /// A library's version history, newest release first.
    pub async fn versions(&self, library_id: i64) -> Result<Vec<VersionRow>> {
        sqlx::query_as::<_, VersionRow>("SELECT * FROM version WHERE library_id = ? ORDER BY release_date DESC, id DESC")
            .bind(library_id)
            .fetch_all(&self.pool)
            .await
            .into_app_err_with(|| format!("unable to load versions for library {library_id}"))
    }

    /// All categories, annotated with live library counts, busiest first.
    pub async fn list_categories(&self, kind: Option<&str>) -> Result<Vec<CategoryWithCount>> {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT c.id, c.name, c.description, c.kind, COUNT(lc.library_id) AS library_count \
             FROM category c LEFT JOIN library_categories lc ON lc.category_id = c.id",
        );

        if let Some(kind) = kind {
            let _ = builder.push(" WHERE c.kind = ").push_bind(kind.to_string());
        }

        let _ = builder.push(" GROUP BY c.id ORDER BY library_count DESC, c.name");

        builder
            .build_query_as::<CategoryWithCount>()
            .fetch_all(&self.pool)
            .await
            .into_app_err("unable to list categories")
    }

    pub async fn trending(&self, limit: i64) -> Result<Vec<LibraryRow>> {
        sqlx::query_as::<_, LibraryRow>("SELECT * FROM library ORDER BY popularity_score DESC LIMIT ?")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .into_app_err("unable to load trending libraries")
    }

    pub async fn ecosystem_distribution(&self) -> Result<Vec<EcosystemCount>> {
        sqlx::query_as::<_, EcosystemCount>("SELECT ecosystem, COUNT(*) AS count FROM library GROUP BY ecosystem ORDER BY count DESC")
            .fetch_all(&self.pool)
            .await
            .into_app_err("unable to load ecosystem distribution")
    }

    pub async fn category_distribution(&self, limit: i64) -> Result<Vec<CategoryCount>> {
        sqlx::query_as::<_, CategoryCount>(
            "SELECT c.name AS category, COUNT(lc.library_id) AS count \
             FROM category c JOIN library_categories lc ON lc.category_id = c.id \
             GROUP BY c.name ORDER BY count DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .into_app_err("unable to load category distribution")
    }

    /// Libraries updated at or after the cutoff, newest first.
    pub async fn updated_since(&self, cutoff: DateTime<Utc>, limit: i64) -> Result<Vec<LibraryRow>> {
        sqlx::query_as::<_, LibraryRow>("SELECT * FROM library WHERE last_update >= ? ORDER BY last_update DESC LIMIT ?")
            .bind(cutoff)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .into_app_err("unable to load recently updated libraries")
    }

    pub async fn stats(&self) -> Result<CatalogStats> {
        let total_libraries = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM library")
            .fetch_one(&self.pool)
            .await
            .into_app_err("unable to count libraries")?;

        let total_categories = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM category")
            .fetch_one(&self.pool)
            .await
            .into_app_err("unable to count categories")?;

        let last_update = sqlx::query_scalar::<_, Option<DateTime<Utc>>>("SELECT MAX(last_update) FROM library")
            .fetch_one(&self.pool)
            .await
            .into_app_err("unable to determine most recent update")?;

        Ok(CatalogStats {
            total_libraries,
            total_categories,
            ecosystems: self.ecosystem_distribution().await?,
            last_update,
        })
    }
}

fn push_filters(builder: &mut QueryBuilder<'_, Sqlite>, filter: &LibraryFilter) {
    if filter.category_id.is_some() {
        let _ = builder.push(" JOIN library_categories lc ON lc.library_id = l.id");
    }

    let _ = builder.push(" WHERE 1 = 1");

    if let Some(ecosystem) = &filter.ecosystem {
        let _ = builder.push(" AND l.ecosystem = ").push_bind(ecosystem.clone());
    }

    if let Some(category_id) = filter.category_id {
        let _ = builder.push(" AND lc.category_id = ").push_bind(category_id);
    }

    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", search.to_lowercase());
        let _ = builder
            .push(" AND (lower(l.name) LIKE ")
            .push_bind(pattern.clone())
            .push(" OR lower(l.description) LIKE ")
            .push_bind(pattern)
            .push(")");
    }
}
