use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Extension, Json,
};
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tracing::error;
use uuid::Uuid;

use naegong_types::api::{Claims, UploadResponse};

use crate::error::ApiError;
use crate::state::AppState;

/// 20 MB upload limit
const MAX_FILE_SIZE: usize = 20 * 1024 * 1024;

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(default = "default_folder")]
    pub folder: String,
    pub filename: Option<String>,
}

fn default_folder() -> String {
    "misc".into()
}

/// POST /uploads?folder=portfolio/cover&filename=site.jpg — accepts the raw
/// request body, stores it under `<upload_dir>/<folder>/<uuid>.<ext>` and
/// returns the public URL.
pub async fn upload_file(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    Extension(_claims): Extension<Claims>,
    bytes: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("file is required".into()));
    }
    if bytes.len() > MAX_FILE_SIZE {
        return Err(ApiError::PayloadTooLarge(format!(
            "file exceeds {} bytes",
            MAX_FILE_SIZE
        )));
    }

    let folder = sanitize_folder(&query.folder)
        .ok_or_else(|| ApiError::BadRequest("invalid folder".into()))?;
    let ext = extension_of(query.filename.as_deref());
    let name = format!("{}.{}", Uuid::new_v4(), ext);

    let dir = state.upload_dir.join(&folder);
    tokio::fs::create_dir_all(&dir).await.map_err(|e| {
        error!("Failed to create upload directory {}: {}", dir.display(), e);
        ApiError::Internal(e.into())
    })?;

    let path = dir.join(&name);
    let mut file = tokio::fs::File::create(&path).await.map_err(|e| {
        error!("Failed to create file {}: {}", path.display(), e);
        ApiError::Internal(e.into())
    })?;
    file.write_all(&bytes).await.map_err(|e| {
        error!("Failed to write file {}: {}", path.display(), e);
        ApiError::Internal(e.into())
    })?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            url: format!("/uploads/{}/{}", folder, name),
            name: query.filename.unwrap_or_else(|| name.clone()),
            size: bytes.len() as u64,
        }),
    ))
}

/// GET /uploads/{*path} — streams a stored file back.
pub async fn download_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    // The stored layout is <folder>/<uuid>.<ext>; anything else is not ours
    let (folder, name) = path
        .rsplit_once('/')
        .ok_or_else(|| ApiError::BadRequest("invalid file path".into()))?;
    let folder =
        sanitize_folder(folder).ok_or_else(|| ApiError::BadRequest("invalid file path".into()))?;
    if !is_safe_object_name(name) {
        return Err(ApiError::BadRequest("invalid file path".into()));
    }

    let full_path = state.upload_dir.join(folder).join(name);
    let bytes = tokio::fs::read(&full_path)
        .await
        .map_err(|_| ApiError::NotFound("file not found".into()))?;

    Ok((
        [(axum::http::header::CONTENT_TYPE, "application/octet-stream")],
        bytes,
    ))
}

/// Folders are slash-separated segments of [A-Za-z0-9_-]; anything else
/// (dots in particular) is rejected to keep reads and writes inside the
/// upload root.
fn sanitize_folder(folder: &str) -> Option<String> {
    let segments: Vec<&str> = folder.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() || segments.len() > 4 {
        return None;
    }
    for segment in &segments {
        if !segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return None;
        }
    }
    Some(segments.join("/"))
}

fn is_safe_object_name(name: &str) -> bool {
    let Some((stem, ext)) = name.rsplit_once('.') else {
        return false;
    };
    !stem.is_empty()
        && stem
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        && !ext.is_empty()
        && ext.chars().all(|c| c.is_ascii_alphanumeric())
}

/// Lowercased alphanumeric extension from the client filename, 'bin' when
/// absent or suspicious.
fn extension_of(filename: Option<&str>) -> String {
    filename
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| "bin".into())
}

#[cfg(test)]
mod tests {
    use super::{extension_of, is_safe_object_name, sanitize_folder};

    #[test]
    fn test_sanitize_folder() {
        assert_eq!(sanitize_folder("misc").as_deref(), Some("misc"));
        assert_eq!(
            sanitize_folder("portfolios/cover").as_deref(),
            Some("portfolios/cover")
        );
        // stray slashes collapse
        assert_eq!(sanitize_folder("/store//logo/").as_deref(), Some("store/logo"));

        assert_eq!(sanitize_folder(""), None);
        assert_eq!(sanitize_folder("../etc"), None);
        assert_eq!(sanitize_folder("a/../../b"), None);
        assert_eq!(sanitize_folder("space folder"), None);
        assert_eq!(sanitize_folder("a/b/c/d/e"), None);
    }

    #[test]
    fn test_object_name_guard() {
        assert!(is_safe_object_name(
            "4a3f2c1e-0000-0000-0000-000000000000.jpg"
        ));
        assert!(!is_safe_object_name("noextension"));
        assert!(!is_safe_object_name(".hidden"));
        assert!(!is_safe_object_name("x.j pg"));
        assert!(!is_safe_object_name("..%2f.png"));
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of(Some("photo.JPG")), "jpg");
        assert_eq!(extension_of(Some("archive.tar.gz")), "gz");
        assert_eq!(extension_of(Some("noext")), "bin");
        assert_eq!(extension_of(Some("weird.ex t")), "bin");
        assert_eq!(extension_of(None), "bin");
    }
}
