use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// Food listing offered for pickup.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Item {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub quantity: i32,
    pub unit: String,
    pub expiration_date: Option<Date>,
    pub location: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub is_available: bool,
    pub img_key: Option<String>,
    pub created_at: OffsetDateTime,
}

/// Item joined with its owner's display name.
#[derive(Debug, Clone, FromRow)]
pub struct ItemWithOwner {
    #[sqlx(flatten)]
    pub item: Item,
    pub owner_username: String,
}
