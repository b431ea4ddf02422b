//! Sample catalog content for an empty store.
//!
//! Mirrors what a first collection cycle would produce so the browsing
//! surface has data before the first scheduled sweep completes.

use crate::Result;
use crate::scoring::popularity_score;
use chrono::Duration;
use chrono::Utc;
use ohno::IntoAppError;
use sqlx::SqlitePool;
use std::collections::HashMap;

const LOG_TARGET: &str = "      seed";

/// Synthetic version-history entries created per sample library.
const SAMPLE_VERSION_COUNT: i64 = 3;

struct SampleLibrary {
    name: &'static str,
    description: &'static str,
    ecosystem: &'static str,
    version: &'static str,
    days_since_update: i64,
    repository_url: &'static str,
    documentation_url: &'static str,
    package_url: &'static str,
    stars: i64,
    downloads: i64,
    categories: &'static [&'static str],
}

/// key → (name, kind)
const SAMPLE_CATEGORIES: &[(&str, &str, &str)] = &[
    ("ai", "Artificial Intelligence", "domain"),
    ("ml", "Machine Learning", "functionality"),
    ("dl", "Deep Learning", "functionality"),
    ("nlp", "Natural Language Processing", "functionality"),
    ("cv", "Computer Vision", "functionality"),
    ("sp", "Speech Processing", "functionality"),
    ("rl", "Reinforcement Learning", "functionality"),
    ("gen", "Generative AI", "functionality"),
    ("llm", "Large Language Models", "application"),
    ("nn", "Neural Networks", "functionality"),
];

fn sample_libraries() -> Vec<SampleLibrary> {
    vec![
        SampleLibrary {
            name: "TensorFlow",
            description: "An open-source machine learning framework for everyone",
            ecosystem: "Python",
            version: "2.10.0",
            days_since_update: 30,
            repository_url: "https://github.com/tensorflow/tensorflow",
            documentation_url: "https://www.tensorflow.org/api_docs",
            package_url: "https://pypi.org/project/tensorflow/",
            stars: 170_000,
            downloads: 5_000_000,
            categories: &["ai", "ml", "dl", "nn"],
        },
        SampleLibrary {
            name: "PyTorch",
            description: "Tensors and Dynamic neural networks in Python with strong GPU acceleration",
            ecosystem: "Python",
            version: "1.13.0",
            days_since_update: 15,
            repository_url: "https://github.com/pytorch/pytorch",
            documentation_url: "https://pytorch.org/docs/stable/index.html",
            package_url: "https://pypi.org/project/torch/",
            stars: 62_000,
            downloads: 3_000_000,
            categories: &["ai", "ml", "dl", "nn"],
        },
        SampleLibrary {
            name: "Transformers",
            description: "State-of-the-art Machine Learning for Pytorch, TensorFlow, and JAX",
            ecosystem: "Python",
            version: "4.24.0",
            days_since_update: 5,
            repository_url: "https://github.com/huggingface/transformers",
            documentation_url: "https://huggingface.co/docs/transformers/index",
            package_url: "https://pypi.org/project/transformers/",
            stars: 75_000,
            downloads: 2_500_000,
            categories: &["ai", "ml", "nlp", "llm"],
        },
        SampleLibrary {
            name: "LangChain",
            description: "Building applications with LLMs through composability",
            ecosystem: "Python",
            version: "0.0.150",
            days_since_update: 2,
            repository_url: "https://github.com/langchain-ai/langchain",
            documentation_url: "https://python.langchain.com/docs/get_started/introduction",
            package_url: "https://pypi.org/project/langchain/",
            stars: 45_000,
            downloads: 1_500_000,
            categories: &["ai", "nlp", "llm", "gen"],
        },
        SampleLibrary {
            name: "TensorFlow.js",
            description: "A JavaScript library for training and deploying ML models in the browser and on Node.js",
            ecosystem: "JavaScript",
            version: "4.0.0",
            days_since_update: 45,
            repository_url: "https://github.com/tensorflow/tfjs",
            documentation_url: "https://www.tensorflow.org/js/guide",
            package_url: "https://www.npmjs.com/package/@tensorflow/tfjs",
            stars: 17_000,
            downloads: 500_000,
            categories: &["ai", "ml", "dl", "nn"],
        },
        SampleLibrary {
            name: "Brain.js",
            description: "Neural networks in JavaScript",
            ecosystem: "JavaScript",
            version: "2.0.0",
            days_since_update: 120,
            repository_url: "https://github.com/BrainJS/brain.js",
            documentation_url: "https://brain.js.org/",
            package_url: "https://www.npmjs.com/package/brain.js",
            stars: 13_000,
            downloads: 200_000,
            categories: &["ai", "ml", "nn"],
        },
        SampleLibrary {
            name: "LangChain.js",
            description: "JavaScript version of LangChain framework for LLM applications",
            ecosystem: "JavaScript",
            version: "0.0.52",
            days_since_update: 3,
            repository_url: "https://github.com/langchain-ai/langchainjs",
            documentation_url: "https://js.langchain.com/docs/",
            package_url: "https://www.npmjs.com/package/langchain",
            stars: 5_000,
            downloads: 300_000,
            categories: &["ai", "nlp", "llm", "gen"],
        },
        SampleLibrary {
            name: "ML.NET",
            description: "Cross-platform machine learning framework for .NET",
            ecosystem: ".NET",
            version: "1.7.1",
            days_since_update: 90,
            repository_url: "https://github.com/dotnet/machinelearning",
            documentation_url: "https://learn.microsoft.com/en-us/dotnet/machine-learning/",
            package_url: "https://www.nuget.org/packages/Microsoft.ML/",
            stars: 8_000,
            downloads: 100_000,
            categories: &["ai", "ml"],
        },
        SampleLibrary {
            name: "TensorFlow.NET",
            description: "TensorFlow binding for .NET",
            ecosystem: ".NET",
            version: "0.70.1",
            days_since_update: 60,
            repository_url: "https://github.com/SciSharp/TensorFlow.NET",
            documentation_url: "https://scisharp.github.io/TensorFlow.NET/",
            package_url: "https://www.nuget.org/packages/TensorFlow.NET/",
            stars: 3_000,
            downloads: 50_000,
            categories: &["ai", "ml", "dl", "nn"],
        },
        SampleLibrary {
            name: "DL4J",
            description: "Deep Learning for Java, scientific computing and neural networks",
            ecosystem: "Java",
            version: "1.0.0-M2.1",
            days_since_update: 180,
            repository_url: "https://github.com/deeplearning4j/deeplearning4j",
            documentation_url: "https://deeplearning4j.konduit.ai/",
            package_url: "https://search.maven.org/artifact/org.deeplearning4j/deeplearning4j-core",
            stars: 12_000,
            downloads: 80_000,
            categories: &["ai", "ml", "dl", "nn"],
        },
        SampleLibrary {
            name: "DJL",
            description: "Deep Java Library - An Engine-Agnostic Deep Learning Framework",
            ecosystem: "Java",
            version: "0.18.0",
            days_since_update: 45,
            repository_url: "https://github.com/deepjavalibrary/djl",
            documentation_url: "https://djl.ai/docs/jupyter/index.html",
            package_url: "https://search.maven.org/artifact/ai.djl/api",
            stars: 3_000,
            downloads: 40_000,
            categories: &["ai", "ml", "dl"],
        },
    ]
}

/// Populate an empty store with sample categories, libraries, and version
/// history. A store that already has categories is left untouched.
pub async fn seed_sample_data(pool: &SqlitePool) -> Result<()> {
    let category_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM category")
        .fetch_one(pool)
        .await
        .into_app_err("unable to count categories")?;

    if category_count > 0 {
        log::debug!(target: LOG_TARGET, "Store already has {category_count} categories, skipping sample data");
        return Ok(());
    }

    let mut tx = pool.begin().await.into_app_err("unable to begin seed transaction")?;

    let mut category_ids: HashMap<&str, i64> = HashMap::new();
    for (key, name, kind) in SAMPLE_CATEGORIES {
        let result = sqlx::query("INSERT INTO category (name, kind) VALUES (?, ?)")
            .bind(*name)
            .bind(*kind)
            .execute(&mut *tx)
            .await
            .into_app_err_with(|| format!("unable to insert category '{name}'"))?;

        let _ = category_ids.insert(*key, result.last_insert_rowid());
    }

    let now = Utc::now();
    for library in sample_libraries() {
        let last_update = now - Duration::days(library.days_since_update);
        let score = popularity_score(library.downloads, library.stars);

        let result = sqlx::query(
            "INSERT INTO library (name, ecosystem, description, current_version, last_update, repository_url, \
             documentation_url, package_url, popularity_score, monthly_downloads, github_stars) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(library.name)
        .bind(library.ecosystem)
        .bind(library.description)
        .bind(library.version)
        .bind(last_update)
        .bind(library.repository_url)
        .bind(library.documentation_url)
        .bind(library.package_url)
        .bind(score)
        .bind(library.downloads)
        .bind(library.stars)
        .execute(&mut *tx)
        .await
        .into_app_err_with(|| format!("unable to insert sample library '{}'", library.name))?;

        let library_id = result.last_insert_rowid();

        for key in library.categories {
            if let Some(category_id) = category_ids.get(key) {
                let _ = sqlx::query("INSERT INTO library_categories (library_id, category_id) VALUES (?, ?)")
                    .bind(library_id)
                    .bind(category_id)
                    .execute(&mut *tx)
                    .await
                    .into_app_err_with(|| format!("unable to attach category '{key}'"))?;
            }
        }

        // Synthetic history: three point releases leading up to the current
        // version, spaced a month apart.
        let prefix = library.version.split('.').take(2).collect::<Vec<_>>().join(".");
        for i in 0..SAMPLE_VERSION_COUNT {
            let version_number = format!("{prefix}.{i}");
            let release_date = last_update - Duration::days(30 * (SAMPLE_VERSION_COUNT - i));

            let _ = sqlx::query("INSERT INTO version (library_id, version_number, release_date, release_notes) VALUES (?, ?, ?, ?)")
                .bind(library_id)
                .bind(&version_number)
                .bind(release_date)
                .bind(format!("Version {version_number} release with improvements and bug fixes."))
                .execute(&mut *tx)
                .await
                .into_app_err_with(|| format!("unable to insert sample version '{version_number}'"))?;
        }
    }

    tx.commit().await.into_app_err("unable to commit sample data")?;

    log::info!(target: LOG_TARGET, "Seeded sample data into an empty store");

    Ok(())
}
