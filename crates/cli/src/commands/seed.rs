//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! settings:
//!   minimum_order_value: "20.00"
//!   pix_discount_percent: "5"
//! categories:
//!   - name: Streaming
//!     icon: Tv
//! products:
//!   - name: Netflix Premium 30 dias
//!     price: "29.90"
//!     original_price: "45.90"
//!     category: Streaming
//!     image: https://cdn.example.com/netflix.png
//!     badge: Mais vendido
//!     stock:
//!       - user1@mail.com:senha1
//!       - user2@mail.com:senha2
//! ```
//!
//! Categories and products that already exist (by name) are skipped, so
//! running the same file twice does not duplicate stock.

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{info, warn};

use pixstore_core::format_brl;
use pixstore_storefront::db::categories::CategoryInput;
use pixstore_storefront::db::products::NewProduct;
use pixstore_storefront::db::settings::save_settings;
use pixstore_storefront::db::{
    self, CategoryRepository, ProductRepository, RepositoryError, StockRepository,
};
use pixstore_storefront::models::StoreSettings;

use super::database_url;

/// Top-level seed file.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SeedFile {
    pub settings: Option<StoreSettings>,
    pub categories: Vec<SeedCategory>,
    pub products: Vec<SeedProduct>,
}

#[derive(Debug, Deserialize)]
pub struct SeedCategory {
    pub name: String,
    pub icon: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Decimal,
    pub original_price: Option<Decimal>,
    #[serde(default)]
    pub image: String,
    pub category: String,
    pub badge: Option<String>,
    pub rating: Option<Decimal>,
    pub reviews_count: Option<i32>,
    #[serde(default)]
    pub stock: Vec<String>,
}

/// What a seed run changed.
#[derive(Debug, Default)]
pub struct SeedResult {
    pub categories: usize,
    pub products: usize,
    pub credentials: u64,
    pub skipped: usize,
}

/// Problems found before touching the database.
#[must_use]
pub fn validate(seed: &SeedFile) -> Vec<String> {
    let mut errors = Vec::new();
    let mut categories: HashSet<&str> = seed.categories.iter().map(|c| c.name.trim()).collect();
    categories.retain(|c| !c.is_empty());

    for product in &seed.products {
        if product.name.trim().is_empty() {
            errors.push("product with empty name".to_string());
        }
        if product.price <= Decimal::ZERO {
            errors.push(format!("{}: price must be greater than zero", product.name));
        }
        if !categories.contains(product.category.trim()) {
            errors.push(format!(
                "{}: category {:?} is not declared in categories",
                product.name, product.category
            ));
        }
    }
    errors
}

/// Seed categories, products, stock and settings from `file_path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails
/// validation, or a database operation fails.
pub async fn catalog(file_path: &str) -> Result<SeedResult, Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading seed file");
    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;

    let errors = validate(&seed);
    if !errors.is_empty() {
        for err in &errors {
            warn!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = db::create_pool(&database_url()?).await?;
    info!("Connected to database");

    let mut result = SeedResult::default();

    if let Some(settings) = &seed.settings {
        save_settings(&pool, settings).await?;
        info!(
            minimum_order_value = %format_brl(settings.minimum_order_value),
            pix_discount_percent = %settings.pix_discount_percent,
            "Settings saved"
        );
    }

    let categories = CategoryRepository::new(&pool);
    for category in &seed.categories {
        let input = CategoryInput {
            name: category.name.trim().to_string(),
            icon: category.icon.clone(),
            is_active: Some(true),
        };
        match categories.create(&input).await {
            Ok(_) => result.categories += 1,
            Err(RepositoryError::Conflict(_)) => result.skipped += 1,
            Err(e) => return Err(e.into()),
        }
    }

    let products = ProductRepository::new(&pool);
    let stock = StockRepository::new(&pool);
    let existing: HashSet<String> = products
        .list(false, None)
        .await?
        .into_iter()
        .map(|p| p.name)
        .collect();

    for product in &seed.products {
        let name = product.name.trim();
        if existing.contains(name) {
            info!(product = name, "Already exists, skipping");
            result.skipped += 1;
            continue;
        }

        let created = products
            .create(&NewProduct {
                name: name.to_string(),
                description: product.description.clone(),
                price: product.price,
                original_price: product.original_price,
                image: product.image.clone(),
                category: product.category.trim().to_string(),
                badge: product.badge.clone(),
                rating: product.rating,
                reviews_count: product.reviews_count,
                is_active: true,
            })
            .await?;
        info!(product = name, price = %format_brl(created.price), "Product created");
        result.products += 1;

        if !product.stock.is_empty() {
            result.credentials += stock.import(created.id, &product.stock.join("\n")).await?;
        }
    }

    info!("Seeding complete!");
    info!("  Categories created: {}", result.categories);
    info!("  Products created: {}", result.products);
    info!("  Credentials imported: {}", result.credentials);
    info!("  Skipped (already exist): {}", result.skipped);

    Ok(result)
}
