// Image upload endpoint
//
// Stores the first `file` part under a name derived from the original
// filename, so repeated uploads of the same name land on the same path.

use axum::extract::{multipart::MultipartRejection, Multipart, State};
use axum::response::Json;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;

use super::GatewayServer;
use crate::errors::GatewayError;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub path: String,
    pub filename: String,
}

/// `sha256(original name)` in hex plus the original extension
pub fn content_addressed_name(original: &str) -> String {
    let digest = Sha256::digest(original.as_bytes());
    let extension = Path::new(original)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));

    match extension {
        Some(ext) => format!("{:x}.{}", digest, ext),
        None => format!("{:x}", digest),
    }
}

/// Handle POST /api/upload
pub async fn upload_file(
    State(server): State<Arc<GatewayServer>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, GatewayError> {
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Rejected upload body");
        GatewayError::Upload("No file provided".to_string())
    })?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::Upload(format!("Invalid multipart body: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let original = field.file_name().unwrap_or_default().to_string();
        if original.is_empty() {
            return Err(GatewayError::Upload("Empty filename".to_string()));
        }

        let data = field
            .bytes()
            .await
            .map_err(|e| GatewayError::Upload(format!("Failed to read upload: {}", e)))?;

        let uploads_dir = &server.config().uploads_dir;
        let filename = content_addressed_name(&original);
        let path = uploads_dir.join(&filename);

        tokio::fs::create_dir_all(uploads_dir)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create {}: {}", uploads_dir.display(), e))?;
        tokio::fs::write(&path, &data)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path.display(), e))?;

        tracing::info!(
            original = %original,
            path = %path.display(),
            bytes = data.len(),
            "Stored upload"
        );

        return Ok(Json(UploadResponse {
            success: true,
            path: path.display().to_string(),
            filename,
        }));
    }

    Err(GatewayError::Upload("No file provided".to_string()))
}
