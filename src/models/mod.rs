// Data models for the catalog API

pub mod category;
pub mod product;
pub mod user;

use serde::Deserialize;

pub use category::{Category, CategoryRef};
pub use product::{Product, PRODUCT_COLORS};
pub use user::{User, UserListResponse, UserUpdate};

/// Body of mutation responses; only the message is of interest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiMessage {
    #[serde(default)]
    pub message: Option<String>,
}

/// `{data: [...]}` list response; a missing or null list is empty
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ListResponse<T> {
    #[serde(default = "Vec::new", deserialize_with = "null_as_empty")]
    pub data: Vec<T>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_response_null_data_is_empty() {
        let list: ListResponse<Category> = serde_json::from_str(r#"{"data":null}"#).unwrap();
        assert!(list.data.is_empty());

        let list: ListResponse<Category> = serde_json::from_str("{}").unwrap();
        assert!(list.data.is_empty());
    }

    #[test]
    fn test_list_response_reads_items() {
        let list: ListResponse<Category> =
            serde_json::from_str(r#"{"data":[{"id":1,"categories_name":"Lighting"}]}"#).unwrap();
        assert_eq!(list.data.len(), 1);
        assert_eq!(list.data[0].id, 1);
    }
}
