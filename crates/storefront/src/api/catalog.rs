//! Product catalog endpoints with an in-memory read cache.
//!
//! Catalog reads are cached for 5 minutes; admin mutations invalidate.
//! Suggestion lookups and the live stock reads used by checkout
//! re-validation always go to the wire - a cached stock figure would
//! defeat the point of re-validating.

use std::time::Duration;

use moka::future::Cache;
use tracing::{debug, instrument};

use juniper_core::{CategoryId, ProductId};

use super::types::{Category, Product, ProductInput};
use super::{ApiClient, ApiError, Envelope};

const CACHE_CAPACITY: u64 = 1000;
const CACHE_TTL: Duration = Duration::from_secs(300); // 5 minutes

/// Cached catalog values.
#[derive(Clone)]
enum CacheValue {
    Product(Box<Product>),
    Products(Vec<Product>),
    Categories(Vec<Category>),
}

/// Client for the product catalog endpoints.
#[derive(Clone)]
pub struct CatalogService {
    api: ApiClient,
    cache: Cache<String, CacheValue>,
}

impl CatalogService {
    /// Create a new catalog service.
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(CACHE_TTL)
            .build();

        Self { api, cache }
    }

    // =========================================================================
    // Product reads
    // =========================================================================

    /// Get the full product list.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn all_products(&self) -> Result<Vec<Product>, ApiError> {
        self.product_list("products:all", "product/all").await
    }

    /// Get the shopper-visible product list.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn visible_products(&self) -> Result<Vec<Product>, ApiError> {
        self.product_list("products:visible", "product/all/visible")
            .await
    }

    async fn product_list(&self, cache_key: &str, path: &str) -> Result<Vec<Product>, ApiError> {
        if let Some(CacheValue::Products(products)) = self.cache.get(cache_key).await {
            debug!("cache hit for product list");
            return Ok(products);
        }

        let envelope: Envelope<Product> = self.api.get(path).await?;
        let products = envelope.into_data();

        self.cache
            .insert(cache_key.to_owned(), CacheValue::Products(products.clone()))
            .await;

        Ok(products)
    }

    /// Get a single product by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request
    /// fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn product(&self, id: ProductId) -> Result<Product, ApiError> {
        let cache_key = format!("product:{id}");

        if let Some(CacheValue::Product(product)) = self.cache.get(&cache_key).await {
            debug!("cache hit for product");
            return Ok(*product);
        }

        let product = self.fetch_product(id).await?;

        self.cache
            .insert(cache_key, CacheValue::Product(Box::new(product.clone())))
            .await;

        Ok(product)
    }

    /// Get a single product straight from the wire, refreshing the
    /// cache. Checkout re-validation uses this for authoritative stock.
    ///
    /// # Errors
    ///
    /// Returns an error if the product is not found or the API request
    /// fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn live_product(&self, id: ProductId) -> Result<Product, ApiError> {
        let product = self.fetch_product(id).await?;

        self.cache
            .insert(
                format!("product:{id}"),
                CacheValue::Product(Box::new(product.clone())),
            )
            .await;

        Ok(product)
    }

    async fn fetch_product(&self, id: ProductId) -> Result<Product, ApiError> {
        let envelope: Envelope<Product> =
            self.api.get(&format!("product/specified/{id}")).await?;

        envelope
            .into_first()
            .ok_or_else(|| ApiError::NotFound(format!("Product not found: {id}")))
    }

    /// Get name suggestions for a partial search query.
    ///
    /// Queries that are empty after trimming short-circuit to an empty
    /// list without touching the wire. Never cached - suggestions chase
    /// keystrokes.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn suggestions(&self, query: &str) -> Result<Vec<Product>, ApiError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let encoded: String = url::form_urlencoded::byte_serialize(query.as_bytes()).collect();
        let envelope: Envelope<Product> = self
            .api
            .get(&format!("product/suggestions?query={encoded}"))
            .await?;

        Ok(envelope.into_data())
    }

    /// Distinct category names across the catalog, sorted.
    ///
    /// Derived from the full product list (and therefore served from
    /// its cache when warm).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn category_names(&self) -> Result<Vec<String>, ApiError> {
        let products = self.all_products().await?;

        let mut names: Vec<String> = products.into_iter().map(|p| p.category).collect();
        names.sort();
        names.dedup();
        Ok(names)
    }

    // =========================================================================
    // Product administration
    // =========================================================================

    /// Create a product (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or no product is
    /// returned.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(&self, input: &ProductInput) -> Result<Product, ApiError> {
        let envelope: Envelope<Product> = self.api.post_json("product/create", input).await?;
        self.invalidate_products().await;

        envelope
            .into_first()
            .ok_or_else(|| ApiError::EmptyData("created product not returned".to_string()))
    }

    /// Update a product (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or no product is
    /// returned.
    #[instrument(skip(self, input), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: ProductId,
        input: &ProductInput,
    ) -> Result<Product, ApiError> {
        let envelope: Envelope<Product> = self
            .api
            .put_json(&format!("product/update/{id}"), input)
            .await?;
        self.invalidate_products().await;

        envelope
            .into_first()
            .ok_or_else(|| ApiError::EmptyData("updated product not returned".to_string()))
    }

    /// Delete a product (admin). Returns the backend's success flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn delete_product(&self, id: ProductId) -> Result<bool, ApiError> {
        let envelope: Envelope<serde_json::Value> =
            self.api.delete(&format!("product/{id}")).await?;
        self.invalidate_products().await;

        Ok(envelope.success)
    }

    // =========================================================================
    // Category administration
    // =========================================================================

    /// List categories (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        let cache_key = "categories:all";

        if let Some(CacheValue::Categories(categories)) = self.cache.get(cache_key).await {
            debug!("cache hit for categories");
            return Ok(categories);
        }

        let envelope: Envelope<Category> = self.api.get("product/category/all").await?;
        let categories = envelope.into_data();

        self.cache
            .insert(
                cache_key.to_owned(),
                CacheValue::Categories(categories.clone()),
            )
            .await;

        Ok(categories)
    }

    /// Create a category (admin).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or no category is
    /// returned.
    #[instrument(skip(self), fields(name = %name))]
    pub async fn create_category(&self, name: &str) -> Result<Category, ApiError> {
        let body = serde_json::json!({ "name": name });
        let envelope: Envelope<Category> =
            self.api.post_json("product/category/create", &body).await?;
        self.cache.invalidate("categories:all").await;

        envelope
            .into_first()
            .ok_or_else(|| ApiError::EmptyData("created category not returned".to_string()))
    }

    /// Activate a category (admin). Returns the backend's success flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn activate_category(&self, id: CategoryId) -> Result<bool, ApiError> {
        let envelope: Envelope<serde_json::Value> = self
            .api
            .put_json(&format!("product/category/activate/{id}"), &serde_json::json!({}))
            .await?;
        self.cache.invalidate("categories:all").await;

        Ok(envelope.success)
    }

    /// Deactivate a category (admin). Returns the backend's success flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(category_id = %id))]
    pub async fn deactivate_category(&self, id: CategoryId) -> Result<bool, ApiError> {
        let envelope: Envelope<serde_json::Value> = self
            .api
            .put_json(
                &format!("product/category/deactivate/{id}"),
                &serde_json::json!({}),
            )
            .await?;
        self.cache.invalidate("categories:all").await;

        Ok(envelope.success)
    }

    // =========================================================================
    // Cache management
    // =========================================================================

    async fn invalidate_products(&self) {
        self.cache.invalidate("products:all").await;
        self.cache.invalidate("products:visible").await;
    }

    /// Invalidate all cached catalog data.
    pub async fn invalidate_all(&self) {
        self.cache.invalidate_all();
        self.cache.run_pending_tasks().await;
    }
}
