use sqlx::PgPool;
use uuid::Uuid;

use crate::items::dto::{CreateItemRequest, ItemFilter, UpdateItemRequest};
use crate::items::repo_types::{Item, ItemWithOwner};

pub async fn insert(db: &PgPool, user_id: Uuid, req: &CreateItemRequest) -> anyhow::Result<Item> {
    let item = sqlx::query_as::<_, Item>(
        r#"
        INSERT INTO items (user_id, name, description, quantity, unit,
                           expiration_date, location, latitude, longitude)
        VALUES ($1, $2, $3, $4, COALESCE($5, 'pcs'), $6, $7, $8, $9)
        RETURNING id, user_id, name, description, quantity, unit, expiration_date,
                  location, latitude, longitude, is_available, img_key, created_at
        "#,
    )
    .bind(user_id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.quantity)
    .bind(&req.unit)
    .bind(req.expiration_date)
    .bind(&req.location)
    .bind(req.latitude)
    .bind(req.longitude)
    .fetch_one(db)
    .await?;
    Ok(item)
}

pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<ItemWithOwner>> {
    let row = sqlx::query_as::<_, ItemWithOwner>(
        r#"
        SELECT i.id, i.user_id, i.name, i.description, i.quantity, i.unit,
               i.expiration_date, i.location, i.latitude, i.longitude,
               i.is_available, i.img_key, i.created_at,
               u.username AS owner_username
          FROM items i
          JOIN users u ON u.id = i.user_id
         WHERE i.id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn list(db: &PgPool, filter: &ItemFilter) -> anyhow::Result<Vec<ItemWithOwner>> {
    let rows = sqlx::query_as::<_, ItemWithOwner>(
        r#"
        SELECT i.id, i.user_id, i.name, i.description, i.quantity, i.unit,
               i.expiration_date, i.location, i.latitude, i.longitude,
               i.is_available, i.img_key, i.created_at,
               u.username AS owner_username
          FROM items i
          JOIN users u ON u.id = i.user_id
         WHERE ($1::text IS NULL OR i.name ILIKE '%' || $1 || '%')
           AND ($2::boolean IS NULL OR i.is_available = $2)
         ORDER BY i.created_at DESC
         LIMIT $3 OFFSET $4
        "#,
    )
    .bind(&filter.name)
    .bind(filter.is_available)
    .bind(filter.limit.clamp(1, 100))
    .bind(filter.offset.max(0))
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Apply a partial update; absent fields keep their stored value.
pub async fn update(db: &PgPool, id: Uuid, req: &UpdateItemRequest) -> anyhow::Result<Item> {
    let item = sqlx::query_as::<_, Item>(
        r#"
        UPDATE items
           SET name = COALESCE($2, name),
               description = COALESCE($3, description),
               quantity = COALESCE($4, quantity),
               unit = COALESCE($5, unit),
               expiration_date = COALESCE($6, expiration_date),
               location = COALESCE($7, location),
               latitude = COALESCE($8, latitude),
               longitude = COALESCE($9, longitude),
               is_available = COALESCE($10, is_available)
         WHERE id = $1
        RETURNING id, user_id, name, description, quantity, unit, expiration_date,
                  location, latitude, longitude, is_available, img_key, created_at
        "#,
    )
    .bind(id)
    .bind(&req.name)
    .bind(&req.description)
    .bind(req.quantity)
    .bind(&req.unit)
    .bind(req.expiration_date)
    .bind(&req.location)
    .bind(req.latitude)
    .bind(req.longitude)
    .bind(req.is_available)
    .fetch_one(db)
    .await?;
    Ok(item)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM items WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn set_img_key(db: &PgPool, id: Uuid, img_key: &str) -> anyhow::Result<()> {
    sqlx::query("UPDATE items SET img_key = $2 WHERE id = $1")
        .bind(id)
        .bind(img_key)
        .execute(db)
        .await?;
    Ok(())
}
