// Product records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use super::category::CategoryRef;

/// Colors a product can be listed with
pub const PRODUCT_COLORS: [&str; 6] = ["Black", "White", "Yellow", "Green", "Blue", "Red"];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Product {
    pub id: i64,

    #[serde(rename = "products_name")]
    pub name: String,

    #[serde(deserialize_with = "de_price")]
    pub price: f64,

    #[serde(default)]
    pub category_id: Option<i64>,

    #[serde(default, deserialize_with = "de_string_list")]
    pub colors: Vec<String>,

    #[serde(default, deserialize_with = "de_string_list")]
    pub tags: Vec<String>,

    #[serde(rename = "products_image", default)]
    pub image: Option<String>,

    #[serde(default)]
    pub created_by: Option<i64>,

    #[serde(default)]
    pub is_deleted: bool,

    #[serde(rename = "categoryModel", default)]
    pub category: Option<CategoryRef>,

    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn category_name(&self) -> Option<&str> {
        self.category.as_ref().map(|c| c.name.as_str())
    }
}

/// Prices arrive as JSON numbers or as decimal strings ("1499.00")
fn de_price<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Price {
        Number(f64),
        Text(String),
    }

    match Price::deserialize(deserializer)? {
        Price::Number(n) => Ok(n),
        Price::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Accepts `null`, an array of strings, a JSON array encoded as a string,
/// or a comma-separated string.
fn de_string_list<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Field {
        List(Vec<String>),
        Text(String),
    }

    let field: Option<Field> = Option::deserialize(deserializer)?;
    Ok(match field {
        None => Vec::new(),
        Some(Field::List(items)) => clean(items),
        Some(Field::Text(text)) => parse_list_text(&text),
    })
}

fn parse_list_text(text: &str) -> Vec<String> {
    let text = text.trim();
    if text.starts_with('[') && text.ends_with(']') {
        // Malformed JSON arrays are treated as empty
        return serde_json::from_str::<Vec<String>>(text)
            .map(|items| clean(items.into_iter().map(|s| s.replace('"', "")).collect()))
            .unwrap_or_default();
    }
    clean(text.split(',').map(str::to_string).collect())
}

fn clean(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_parses_backend_shape() {
        let product: Product = serde_json::from_value(json!({
            "id": 4,
            "products_name": "Desk Lamp",
            "price": "1499.00",
            "category_id": 2,
            "colors": "Black",
            "tags": "[\"home\", \"light\"]",
            "products_image": "lamp.png",
            "created_by": 7,
            "is_deleted": false,
            "categoryModel": {"categories_name": "Lighting"},
            "createdAt": "2025-03-01T10:00:00.000Z"
        }))
        .unwrap();

        assert_eq!(product.name, "Desk Lamp");
        assert_eq!(product.price, 1499.0);
        assert_eq!(product.colors, vec!["Black"]);
        assert_eq!(product.tags, vec!["home", "light"]);
        assert_eq!(product.category_name(), Some("Lighting"));
        assert!(product.created_at.is_some());
    }

    #[test]
    fn test_string_list_variants() {
        assert_eq!(parse_list_text("a, b ,c"), vec!["a", "b", "c"]);
        assert_eq!(parse_list_text("[\"x\",\"y\"]"), vec!["x", "y"]);
        assert!(parse_list_text("[broken").len() == 1);
        assert!(parse_list_text("[not json]").is_empty());
        assert!(parse_list_text("").is_empty());
    }

    #[test]
    fn test_optional_fields_default() {
        let product: Product = serde_json::from_value(json!({
            "id": 1,
            "products_name": "Mug",
            "price": 250,
            "tags": null
        }))
        .unwrap();

        assert!(product.tags.is_empty());
        assert!(product.colors.is_empty());
        assert!(!product.is_deleted);
        assert_eq!(product.category_name(), None);
    }
}
