use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Redirect,
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::extractors::AuthUser;
use crate::error::{ApiError, FieldErrors};
use crate::items::dto::{
    CreateItemRequest, CreatedItemResponse, ItemFilter, ItemResponse, UpdateItemRequest,
};
use crate::items::{repo, services};
use crate::state::AppState;
use crate::validation;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/items", get(list_items))
        .route("/items/:id", get(get_item))
        .route("/items/:id/image", get(get_item_image))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/items", post(create_item))
        .route(
            "/items/:id",
            put(update_item).patch(update_item).delete(delete_item),
        )
        .route("/items/:id/image", post(upload_item_image))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024)) // 10MB
}

#[instrument(skip(state, filter))]
pub async fn list_items(
    State(state): State<AppState>,
    Query(filter): Query<ItemFilter>,
) -> Result<Json<Vec<ItemResponse>>, ApiError> {
    let rows = repo::list(&state.db, &filter).await?;
    Ok(Json(rows.into_iter().map(Into::into).collect()))
}

#[instrument(skip(state))]
pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ItemResponse>, ApiError> {
    let row = repo::find(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("item"))?;
    Ok(Json(row.into()))
}

#[instrument(skip(state, payload))]
pub async fn create_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateItemRequest>,
) -> Result<(StatusCode, HeaderMap, Json<CreatedItemResponse>), ApiError> {
    validation::validate_create_item(&payload).map_err(ApiError::InvalidInput)?;

    let item = repo::insert(&state.db, user_id, &payload).await?;
    info!(item_id = %item.id, user_id = %user_id, "item listed");

    let mut headers = HeaderMap::new();
    if let Ok(location) = format!("/api/v1/items/{}", item.id).parse() {
        headers.insert(axum::http::header::LOCATION, location);
    }

    Ok((
        StatusCode::CREATED,
        headers,
        Json(CreatedItemResponse {
            id: item.id,
            created_at: item.created_at,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateItemRequest>,
) -> Result<Json<ItemResponse>, ApiError> {
    validation::validate_update_item(&payload).map_err(ApiError::InvalidInput)?;

    let mut row = services::fetch_owned(&state, id, user_id).await?;
    row.item = repo::update(&state.db, id, &payload).await?;
    Ok(Json(row.into()))
}

#[instrument(skip(state))]
pub async fn delete_item(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    services::fetch_owned(&state, id, user_id).await?;
    repo::delete(&state.db, id).await?;
    info!(item_id = %id, user_id = %user_id, "item deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, multipart))]
pub async fn upload_item_image(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<StatusCode, ApiError> {
    services::fetch_owned(&state, id, user_id).await?;

    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("image") {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        let body = field
            .bytes()
            .await
            .map_err(|e| ApiError::Internal(anyhow::anyhow!(e)))?;

        services::attach_image(&state, user_id, id, body, &content_type).await?;
        info!(item_id = %id, user_id = %user_id, "item image uploaded");
        return Ok(StatusCode::CREATED);
    }

    let mut errors = FieldErrors::new();
    errors.insert("image".into(), vec!["an image file is required".into()]);
    Err(ApiError::InvalidInput(errors))
}

/// 302 to a presigned URL for the item's image.
#[instrument(skip(state))]
pub async fn get_item_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Redirect, ApiError> {
    let row = repo::find(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("item"))?;
    let key = row.item.img_key.ok_or(ApiError::NotFound("image"))?;

    let url = state
        .storage
        .presign_get(&key, services::IMAGE_URL_TTL_SECS)
        .await?;
    Ok(Redirect::temporary(&url))
}
