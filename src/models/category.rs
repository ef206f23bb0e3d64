// Category records

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Category {
    pub id: i64,

    #[serde(rename = "categories_name")]
    pub name: String,

    #[serde(rename = "categories_image", default)]
    pub image: Option<String>,
}

/// Category as embedded in a product (`categoryModel`)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CategoryRef {
    #[serde(rename = "categories_name")]
    pub name: String,
}
