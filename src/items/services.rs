use anyhow::Context;
use bytes::Bytes;
use uuid::Uuid;

use crate::error::ApiError;
use crate::items::repo;
use crate::items::repo_types::ItemWithOwner;
use crate::state::AppState;

/// Load an item and check ownership. Absence is reported before the
/// ownership check so existence never leaks through the error code.
pub async fn fetch_owned(
    state: &AppState,
    item_id: Uuid,
    user_id: Uuid,
) -> Result<ItemWithOwner, ApiError> {
    let row = repo::find(&state.db, item_id)
        .await?
        .ok_or(ApiError::NotFound("item"))?;
    if row.item.user_id != user_id {
        return Err(ApiError::Forbidden);
    }
    Ok(row)
}

/// Store an uploaded image and link it to the item.
pub async fn attach_image(
    state: &AppState,
    user_id: Uuid,
    item_id: Uuid,
    body: Bytes,
    content_type: &str,
) -> anyhow::Result<String> {
    let ext = ext_from_mime(content_type).unwrap_or("bin");
    let key = format!("items/{}/{}-{}.{}", user_id, item_id, Uuid::new_v4(), ext);

    state
        .storage
        .put_object(&key, body, content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;
    repo::set_img_key(&state.db, item_id, &key).await?;

    Ok(key)
}

pub const IMAGE_URL_TTL_SECS: u64 = 600;

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/heic" => Some("heic"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ext_from_mime() {
        assert_eq!(ext_from_mime("image/jpeg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/jpg"), Some("jpg"));
        assert_eq!(ext_from_mime("image/png"), Some("png"));
        assert_eq!(ext_from_mime("image/webp"), Some("webp"));
        assert_eq!(ext_from_mime("image/heic"), Some("heic"));
        assert_eq!(ext_from_mime("application/octet-stream"), None);
    }

    #[tokio::test]
    async fn fake_storage_presigns() {
        let state = crate::state::AppState::fake();
        let url = state
            .storage
            .presign_get("items/a/b.jpg", IMAGE_URL_TTL_SECS)
            .await
            .unwrap();
        assert!(url.contains("items/a/b.jpg"));
    }
}
