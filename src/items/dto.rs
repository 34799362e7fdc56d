use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::items::repo_types::ItemWithOwner;

#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_quantity")]
    pub quantity: i32,
    pub unit: Option<String>,
    pub expiration_date: Option<Date>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

fn default_quantity() -> i32 {
    1
}

/// Partial update: only the fields present in the request are applied.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateItemRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub quantity: Option<i32>,
    pub unit: Option<String>,
    pub expiration_date: Option<Date>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_available: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ItemFilter {
    pub name: Option<String>,
    pub is_available: Option<bool>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Serialize)]
pub struct ItemOwner {
    pub id: Uuid,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub unit: String,
    pub expiration_date: Option<Date>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_available: bool,
    pub has_image: bool,
    pub created_at: OffsetDateTime,
    pub user: ItemOwner,
}

impl From<ItemWithOwner> for ItemResponse {
    fn from(row: ItemWithOwner) -> Self {
        let item = row.item;
        Self {
            id: item.id,
            name: item.name,
            description: item.description,
            quantity: item.quantity,
            unit: item.unit,
            expiration_date: item.expiration_date,
            location: item.location,
            latitude: item.latitude,
            longitude: item.longitude,
            is_available: item.is_available,
            has_image: item.img_key.is_some(),
            created_at: item.created_at,
            user: ItemOwner {
                id: item.user_id,
                username: row.owner_username,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatedItemResponse {
    pub id: Uuid,
    pub created_at: OffsetDateTime,
}
