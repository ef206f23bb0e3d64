// Typed catalog API: products, categories and users
//
// Every call goes through the authenticated gateway. Multipart bodies are
// rebuilt on each dispatch from `bytes::Bytes`, so a request replayed after a
// token refresh carries the same image.

use anyhow::Context;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::sync::Arc;

use crate::error::Result;
use crate::http_client::CatalogHttpClient;
use crate::models::{ApiMessage, Category, ListResponse, Product, User, UserListResponse, UserUpdate};
use crate::validation::{validate_category, ProductForm};

/// Image file to upload with a product or category
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Bytes,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read image {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        Ok(Self::new(file_name, bytes))
    }

    fn part(&self) -> Part {
        Part::stream(self.bytes.clone()).file_name(self.file_name.clone())
    }
}

/// Product fields sent on create and update
#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub name: String,
    pub price: f64,
    pub category_id: Option<i64>,
    pub color: String,
    pub tags: Vec<String>,
    pub image: Option<ImageUpload>,
}

impl ProductDraft {
    fn validate(&self, is_edit: bool) -> Result<()> {
        ProductForm {
            name: &self.name,
            price: self.price,
            color: &self.color,
            category_id: self.category_id,
            has_image: self.image.is_some(),
            is_edit,
        }
        .validate()
    }

    fn form(&self) -> Form {
        let tags = self
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(",");

        let mut form = Form::new()
            .text("products_name", self.name.trim().to_string())
            .text("price", self.price.to_string())
            .text("colors", self.color.trim().to_string())
            .text("tags", tags);
        if let Some(category_id) = self.category_id {
            form = form.text("category_id", category_id.to_string());
        }
        if let Some(ref image) = self.image {
            form = form.part("products_image", image.part());
        }
        form
    }
}

#[derive(Debug, Clone)]
pub struct CategoryDraft {
    pub name: String,
    pub image: Option<ImageUpload>,
}

impl CategoryDraft {
    fn validate(&self) -> Result<()> {
        validate_category(&self.name, self.image.is_some())
    }

    fn form(&self) -> Form {
        let mut form = Form::new().text("categories_name", self.name.trim().to_string());
        if let Some(ref image) = self.image {
            form = form.part("categories_image", image.part());
        }
        form
    }
}

/// Catalog endpoints behind the authenticated gateway
#[derive(Clone)]
pub struct CatalogClient {
    http: Arc<CatalogHttpClient>,
}

impl CatalogClient {
    pub fn new(http: Arc<CatalogHttpClient>) -> Self {
        Self { http }
    }

    pub async fn list_products(&self) -> Result<Vec<Product>> {
        let url = self.http.url("/products");
        let list: ListResponse<Product> = self.http.send_json(|c| c.get(&url)).await?;
        tracing::debug!(count = list.data.len(), "Fetched products");
        Ok(list.data)
    }

    pub async fn create_product(&self, draft: &ProductDraft) -> Result<ApiMessage> {
        draft.validate(false)?;
        let url = self.http.url("/products");
        self.http.send_json(|c| c.post(&url).multipart(draft.form())).await
    }

    /// Update a product; the image is only replaced when one is given
    pub async fn update_product(&self, id: i64, draft: &ProductDraft) -> Result<ApiMessage> {
        draft.validate(true)?;
        let url = self.http.url(&format!("/products/{}", id));
        self.http.send_json(|c| c.put(&url).multipart(draft.form())).await
    }

    pub async fn delete_product(&self, id: i64) -> Result<ApiMessage> {
        let url = self.http.url(&format!("/products/{}", id));
        self.http.send_json(|c| c.delete(&url)).await
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        let url = self.http.url("/categories");
        let list: ListResponse<Category> = self.http.send_json(|c| c.get(&url)).await?;
        Ok(list.data)
    }

    pub async fn create_category(&self, draft: &CategoryDraft) -> Result<ApiMessage> {
        draft.validate()?;
        let url = self.http.url("/categories");
        self.http.send_json(|c| c.post(&url).multipart(draft.form())).await
    }

    pub async fn update_category(&self, id: i64, draft: &CategoryDraft) -> Result<ApiMessage> {
        draft.validate()?;
        let url = self.http.url(&format!("/categories/{}", id));
        self.http.send_json(|c| c.put(&url).multipart(draft.form())).await
    }

    pub async fn delete_category(&self, id: i64) -> Result<ApiMessage> {
        let url = self.http.url(&format!("/categories/{}", id));
        self.http.send_json(|c| c.delete(&url)).await
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        let url = self.http.url("/users");
        let response: UserListResponse = self.http.send_json(|c| c.get(&url)).await?;
        response
            .into_users()
            .context("Failed to parse user list")
            .map_err(Into::into)
    }

    pub async fn update_user(&self, id: i64, update: &UserUpdate) -> Result<ApiMessage> {
        let url = self.http.url(&format!("/users/{}", id));
        self.http.send_json(|c| c.put(&url).json(update)).await
    }

    pub async fn delete_user(&self, id: i64) -> Result<ApiMessage> {
        let url = self.http.url(&format!("/users/{}", id));
        self.http.send_json(|c| c.delete(&url)).await
    }
}
