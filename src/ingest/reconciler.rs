use crate::Result;
use crate::scoring::popularity_score;
use crate::sources::repo_url::RepoSpec;
use crate::sources::{Candidate, Ecosystem, POLITE_DELAY, github};
use ohno::IntoAppError;
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

const LOG_TARGET: &str = " reconcile";

/// Merges adapter output into persistent library, version, and category
/// records.
///
/// Each public call runs as one transaction: a failing candidate is logged
/// and skipped, while a failing commit rolls back the whole batch.
#[derive(Debug, Clone)]
pub struct Reconciler {
    pool: SqlitePool,
}

impl Reconciler {
    #[must_use]
    pub const fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create-or-update every candidate in the batch, keyed by
    /// `(name, ecosystem)`.
    pub async fn upsert(&self, candidates: &[Candidate], ecosystem: Ecosystem) -> Result<()> {
        let ecosystem = ecosystem.to_string();

        let mut tx = self.pool.begin().await.into_app_err("unable to begin upsert transaction")?;

        for candidate in candidates {
            if let Err(e) = apply_candidate(&mut tx, candidate, &ecosystem).await {
                log::warn!(target: LOG_TARGET, "Skipping candidate '{}' ({ecosystem}): {e:#}", candidate.name);
            }
        }

        tx.commit().await.into_app_err("unable to commit upsert batch")?;

        Ok(())
    }

    /// Refresh star counts (and the derived popularity score) from the
    /// repository host for every library with a recognizable repository URL.
    /// Nothing else on the record is touched.
    pub async fn refresh_repositories(&self, github: &github::Provider) -> Result<()> {
        let libraries = sqlx::query("SELECT id, name, repository_url, monthly_downloads FROM library WHERE repository_url LIKE '%github.com%'")
            .fetch_all(&self.pool)
            .await
            .into_app_err("unable to load libraries for repository refresh")?;

        let total = libraries.len();
        let mut tx = self.pool.begin().await.into_app_err("unable to begin refresh transaction")?;
        let mut updated = 0_usize;

        for row in &libraries {
            let id: i64 = row.try_get("id").into_app_err("missing id column")?;
            let name: String = row.try_get("name").into_app_err("missing name column")?;
            let url: String = row.try_get("repository_url").into_app_err("missing repository_url column")?;
            let downloads: i64 = row.try_get("monthly_downloads").into_app_err("missing monthly_downloads column")?;

            // Malformed URLs are a data-quality fact, not an error.
            let spec = match RepoSpec::parse(&url) {
                Ok(spec) => spec,
                Err(e) => {
                    log::debug!(target: LOG_TARGET, "Skipping repository refresh for '{name}': {e}");
                    continue;
                }
            };

            tokio::time::sleep(POLITE_DELAY).await;

            match github.repository_detail(spec.owner(), spec.repo()).await {
                Ok(Some(detail)) => {
                    let score = popularity_score(downloads, detail.stars);

                    let result = sqlx::query("UPDATE library SET github_stars = ?, popularity_score = ? WHERE id = ?")
                        .bind(detail.stars)
                        .bind(score)
                        .bind(id)
                        .execute(&mut *tx)
                        .await;

                    match result {
                        Ok(_) => {
                            updated += 1;
                            log::debug!(target: LOG_TARGET, "Refreshed '{name}' ({spec}): {} stars, activity {}", detail.stars, detail.activity);
                        }
                        Err(e) => {
                            log::warn!(target: LOG_TARGET, "Unable to store refreshed stars for '{name}': {e}");
                        }
                    }
                }
                Ok(None) => {
                    log::debug!(target: LOG_TARGET, "No repository detail available for '{name}' ({spec})");
                }
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "Repository lookup failed for '{name}' ({spec}): {e:#}");
                }
            }
        }

        tx.commit().await.into_app_err("unable to commit repository refresh")?;

        log::info!(target: LOG_TARGET, "Refreshed repository data for {updated} of {total} libraries");

        Ok(())
    }
}

async fn apply_candidate(tx: &mut Transaction<'_, Sqlite>, candidate: &Candidate, ecosystem: &str) -> Result<()> {
    let existing = sqlx::query("SELECT id, current_version, github_stars FROM library WHERE name = ? AND ecosystem = ?")
        .bind(&candidate.name)
        .bind(ecosystem)
        .fetch_optional(&mut **tx)
        .await
        .into_app_err("library lookup failed")?;

    match existing {
        Some(row) => {
            let id: i64 = row.try_get("id").into_app_err("missing id column")?;
            let stored_version: Option<String> = row.try_get("current_version").into_app_err("missing current_version column")?;
            let stars: i64 = row.try_get("github_stars").into_app_err("missing github_stars column")?;

            update_library(tx, id, stars, stored_version.as_deref(), candidate).await
        }
        None => insert_library(tx, candidate, ecosystem).await,
    }
}

/// Overwrite mutable fields from the candidate, leaving omitted fields
/// unchanged, and append a version row when the label changed. Category
/// associations are frozen at creation time and not re-synced here.
async fn update_library(tx: &mut Transaction<'_, Sqlite>, id: i64, stars: i64, stored_version: Option<&str>, candidate: &Candidate) -> Result<()> {
    let score = popularity_score(candidate.downloads, stars);

    let _ = sqlx::query(
        "UPDATE library SET \
         description = COALESCE(?, description), \
         current_version = COALESCE(?, current_version), \
         last_update = ?, \
         repository_url = COALESCE(?, repository_url), \
         documentation_url = COALESCE(?, documentation_url), \
         package_url = COALESCE(?, package_url), \
         monthly_downloads = ?, \
         popularity_score = ? \
         WHERE id = ?",
    )
    .bind(&candidate.description)
    .bind(&candidate.version)
    .bind(candidate.last_update)
    .bind(&candidate.repository_url)
    .bind(&candidate.documentation_url)
    .bind(&candidate.package_url)
    .bind(candidate.downloads)
    .bind(score)
    .bind(id)
    .execute(&mut **tx)
    .await
    .into_app_err("library update failed")?;

    if let Some(version) = candidate.version.as_deref()
        && !version.is_empty()
        && stored_version != Some(version)
    {
        append_version(tx, id, version, candidate).await?;
    }

    Ok(())
}

async fn insert_library(tx: &mut Transaction<'_, Sqlite>, candidate: &Candidate, ecosystem: &str) -> Result<()> {
    // Stars come only from the repository-refresh path, so a new record
    // scores on downloads alone.
    let score = popularity_score(candidate.downloads, 0);

    let result = sqlx::query(
        "INSERT INTO library (name, ecosystem, description, current_version, last_update, repository_url, \
         documentation_url, package_url, popularity_score, monthly_downloads, github_stars) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0)",
    )
    .bind(&candidate.name)
    .bind(ecosystem)
    .bind(&candidate.description)
    .bind(&candidate.version)
    .bind(candidate.last_update)
    .bind(&candidate.repository_url)
    .bind(&candidate.documentation_url)
    .bind(&candidate.package_url)
    .bind(score)
    .bind(candidate.downloads)
    .execute(&mut **tx)
    .await
    .into_app_err("library insert failed")?;

    let id = result.last_insert_rowid();

    for category in &candidate.categories {
        let category_id = get_or_create_category(tx, category).await?;

        let _ = sqlx::query("INSERT OR IGNORE INTO library_categories (library_id, category_id) VALUES (?, ?)")
            .bind(id)
            .bind(category_id)
            .execute(&mut **tx)
            .await
            .into_app_err("category attach failed")?;
    }

    if let Some(version) = candidate.version.as_deref()
        && !version.is_empty()
    {
        append_version(tx, id, version, candidate).await?;
    }

    Ok(())
}

async fn append_version(tx: &mut Transaction<'_, Sqlite>, library_id: i64, version: &str, candidate: &Candidate) -> Result<()> {
    let _ = sqlx::query("INSERT INTO version (library_id, version_number, release_date, release_notes) VALUES (?, ?, ?, ?)")
        .bind(library_id)
        .bind(version)
        .bind(candidate.last_update)
        .bind(candidate.release_notes.as_deref().unwrap_or_default())
        .execute(&mut **tx)
        .await
        .into_app_err("version insert failed")?;

    Ok(())
}

/// Categories are created lazily on first sighting; identity is the exact
/// name, so differently-spelled synonyms stay distinct.
async fn get_or_create_category(tx: &mut Transaction<'_, Sqlite>, name: &str) -> Result<i64> {
    let existing = sqlx::query("SELECT id FROM category WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut **tx)
        .await
        .into_app_err("category lookup failed")?;

    if let Some(row) = existing {
        return row.try_get("id").into_app_err("missing id column");
    }

    let result = sqlx::query("INSERT INTO category (name, kind) VALUES (?, 'functionality')")
        .bind(name)
        .execute(&mut **tx)
        .await
        .into_app_err("category insert failed")?;

    Ok(result.last_insert_rowid())
}
