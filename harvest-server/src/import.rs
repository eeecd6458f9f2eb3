//! Product catalog import (`harvest-server import-products <file.json>`)
//!
//! The file holds one array per category (`fruits`/`legumes`/`herbes` or
//! `fruit`/`vegetable`/`herb`). Every entry is validated before anything is
//! written; the writes then run in one transaction. Entries with an `id`
//! overwrite that product, the rest are inserted. Nothing is deleted.

use serde::Deserialize;
use shared::error::AppError;
use shared::models::{Category, ProductInput};
use shared::util::now_millis;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db::DbService;
use crate::db::repository::product::{self as product_repo, CategorySummary};
use crate::error::ServiceResult;
use crate::utils::validation::normalize_product_input;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Deserialize)]
struct ImportEntry {
    #[serde(default)]
    id: Option<i64>,
    name: String,
    /// Falls back to the array the entry sits in
    #[serde(default)]
    category: Option<Category>,
    price: f64,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    stock: i64,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default, alias = "fruits")]
    fruit: Vec<ImportEntry>,
    #[serde(default, alias = "legumes", alias = "vegetables")]
    vegetable: Vec<ImportEntry>,
    #[serde(default, alias = "herbes", alias = "herbs")]
    herb: Vec<ImportEntry>,
}

/// A validated catalog entry
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub id: Option<i64>,
    pub input: ProductInput,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub inserted: usize,
    pub replaced: usize,
}

/// Parse and validate a catalog file; the first bad entry fails the whole file
pub fn parse_catalog(json: &str) -> Result<Vec<CatalogEntry>, AppError> {
    let file: CatalogFile = serde_json::from_str(json)
        .map_err(|e| AppError::validation(format!("Invalid catalog file: {e}")))?;

    let grouped = [
        (Category::Fruit, file.fruit),
        (Category::Vegetable, file.vegetable),
        (Category::Herb, file.herb),
    ];

    let mut entries = Vec::new();
    for (array_category, raw_entries) in grouped {
        for raw in raw_entries {
            if raw.id.is_some_and(|id| id < 1) {
                return Err(AppError::validation(format!(
                    "Invalid id for {}: ids start at 1",
                    raw.name
                )));
            }
            let input = ProductInput {
                category: raw.category.unwrap_or(array_category),
                name: raw.name,
                price: raw.price,
                description: raw.description,
                icon: raw.icon,
                stock: raw.stock,
            };
            let input = normalize_product_input(&input).map_err(|e| {
                AppError::validation(format!("Entry {:?}: {}", input.name, e.message))
            })?;
            entries.push(CatalogEntry { id: raw.id, input });
        }
    }
    Ok(entries)
}

/// Write validated entries in one transaction
pub async fn import_entries(pool: &SqlitePool, entries: &[CatalogEntry]) -> ServiceResult<ImportReport> {
    let now = now_millis();
    let mut report = ImportReport::default();
    let mut tx = pool.begin().await?;

    for entry in entries {
        match entry.id {
            Some(id) => {
                product_repo::upsert_with_id(&mut *tx, id, &entry.input, now).await?;
                report.replaced += 1;
            }
            None => {
                product_repo::create(&mut *tx, &entry.input, now).await?;
                report.inserted += 1;
            }
        }
    }

    tx.commit().await?;
    Ok(report)
}

fn log_summary(summary: &[CategorySummary]) {
    for row in summary {
        tracing::info!(
            category = %row.category,
            products = row.count,
            avg_price = format!("{:.2}", row.avg_price),
            total_stock = row.total_stock,
            "Catalog summary"
        );
    }
}

/// Entry point of the `import-products` subcommand
pub async fn run(config: &Config, path: &str) -> Result<(), BoxError> {
    let json = tokio::fs::read_to_string(path).await?;
    let entries = parse_catalog(&json)?;
    tracing::info!(path, entries = entries.len(), "Importing product catalog");

    let db = DbService::new(&config.database_url).await?;
    let report = import_entries(&db.pool, &entries)
        .await
        .map_err(AppError::from)?;
    tracing::info!(
        inserted = report.inserted,
        id_upserts = report.replaced,
        "Catalog import finished"
    );

    log_summary(&product_repo::category_summary(&db.pool).await.map_err(AppError::from)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_product, test_pool};
    use shared::models::Availability;

    const CATALOG: &str = r#"{
        "fruits": [
            {"id": 1, "name": "Pomme", "category": "fruits", "price": 1.5, "icon": "🍎", "stock": 800},
            {"name": "Fraise", "price": 4.25, "stock": 120}
        ],
        "legumes": [
            {"name": "Tomate", "price": 2.0, "description": "Cœur de bœuf", "stock": 0}
        ],
        "herbes": []
    }"#;

    #[test]
    fn test_parse_uses_array_category() {
        let entries = parse_catalog(CATALOG).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].id, Some(1));
        assert_eq!(entries[1].input.category, Category::Fruit);
        assert_eq!(entries[2].input.category, Category::Vegetable);
    }

    #[test]
    fn test_parse_rejects_invalid_entry() {
        let bad = r#"{"fruits": [{"name": "Pomme", "price": -2, "stock": 3}]}"#;
        let err = parse_catalog(bad).unwrap_err();
        assert!(err.message.contains("Pomme"));
        assert!(parse_catalog("not json").is_err());
    }

    #[tokio::test]
    async fn test_import_upserts_without_deleting() {
        let pool = test_pool().await;
        // id 1 exists and gets overwritten, the other existing product stays
        let existing = seed_product(&pool, "Old apple", 9.0, 5).await;
        let kept = seed_product(&pool, "Leek", 1.0, 40).await;
        assert_eq!(existing.id, 1);

        let report = import_entries(&pool, &parse_catalog(CATALOG).unwrap())
            .await
            .unwrap();
        assert_eq!(report, ImportReport { inserted: 2, replaced: 1 });

        let apple = product_repo::find_by_id(&pool, 1).await.unwrap().unwrap();
        assert_eq!(apple.name, "Pomme");
        assert_eq!(apple.category, Category::Fruit);
        assert_eq!(apple.availability, Availability::Available);
        assert!(product_repo::find_by_id(&pool, kept.id).await.unwrap().is_some());

        let summary = product_repo::category_summary(&pool).await.unwrap();
        let fruit = summary.iter().find(|s| s.category == Category::Fruit).unwrap();
        assert_eq!(fruit.count, 2);
        assert_eq!(fruit.total_stock, 920);
    }
}
