//! Catalog endpoints: categories, sub-categories, products, search.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::api::{unwrap_data, StorefrontClient};
use crate::errors::ClientError;
use crate::transport::RequestDescriptor;

#[derive(Debug, Clone, Deserialize)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubCategory {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    /// Parent categories, populated by the backend.
    #[serde(default)]
    pub category: Vec<Category>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image: Vec<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub stock: Option<i64>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub more_details: Option<serde_json::Value>,
}

/// One page of search results. The search endpoint reports pagination
/// counters next to `data` rather than inside it.
#[derive(Debug, Clone)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub total_count: u64,
    pub total_pages: u64,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: bool,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: Vec<Product>,
    #[serde(default, rename = "totalCount")]
    total_count: u64,
    #[serde(default, rename = "totalNoPage")]
    total_pages: u64,
}

impl StorefrontClient {
    /// All product categories. Public, works unauthenticated.
    pub async fn categories(&self) -> Result<Vec<Category>, ClientError> {
        let request = RequestDescriptor::get("/api/category/get");
        unwrap_data(self.pipeline().send(request).await?)
    }

    /// All sub-categories with their parent categories populated.
    pub async fn subcategories(&self) -> Result<Vec<SubCategory>, ClientError> {
        let request = RequestDescriptor::post("/api/subcategory/get");
        unwrap_data(self.pipeline().send(request).await?)
    }

    /// Products belonging to one category.
    pub async fn products_by_category(
        &self,
        category_id: &str,
    ) -> Result<Vec<Product>, ClientError> {
        let request = RequestDescriptor::post("/api/product/get-product-by-category")
            .json(json!({"id": category_id}));
        unwrap_data(self.pipeline().send(request).await?)
    }

    /// Full details of a single product.
    pub async fn product_details(&self, product_id: &str) -> Result<Product, ClientError> {
        let request = RequestDescriptor::post("/api/product/get-product-details")
            .json(json!({"productId": product_id}));
        unwrap_data(self.pipeline().send(request).await?)
    }

    /// Text search over the catalog, paged.
    pub async fn search_products(
        &self,
        search: &str,
        page: u64,
        limit: u64,
    ) -> Result<ProductPage, ClientError> {
        debug!(search = %search, page, limit, "searching products");
        let request = RequestDescriptor::post("/api/product/search-product").json(json!({
            "search": search,
            "page": page,
            "limit": limit,
        }));
        let response = self.pipeline().send(request).await?;
        let status = response.status().as_u16();
        let decoded: SearchResponse = response.json()?;
        if !decoded.success || decoded.error {
            return Err(ClientError::RequestFailed {
                status,
                payload: decoded.message,
            });
        }
        Ok(ProductPage {
            items: decoded.data,
            total_count: decoded.total_count,
            total_pages: decoded.total_pages,
        })
    }
}
