//! Subtitle upload: multipart form with `file`, `contentId`, `episodeId`.
//!
//! The raw file goes to object storage first, then the extraction pipeline
//! runs synchronously within the request. Re-uploading the same episode
//! replaces its previous occurrences.

use axum::extract::{Multipart, State};
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::auth::CurrentUser;
use crate::domain::{ProcessingStatus, SubtitleFile};
use crate::error::{AppError, AppResult};
use crate::pipeline;
use crate::state::AppState;

const ALLOWED_EXTENSIONS: &[&str] = &["vtt", "srt", "txt"];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
  pub ok: bool,
  pub key: String,
  pub sentence_count: usize,
  pub term_count: usize,
}

/// Identifiers become path segments of the storage key
fn validate_id(value: &str, field: &str) -> AppResult<()> {
  let valid = !value.is_empty()
    && value
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
  if valid {
    Ok(())
  } else {
    Err(AppError::Validation(format!("invalid {}: {:?}", field, value)))
  }
}

fn file_extension(file_name: &str) -> AppResult<String> {
  let ext = file_name
    .rsplit_once('.')
    .map(|(_, ext)| ext.to_ascii_lowercase())
    .unwrap_or_default();
  if ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
    Ok(ext)
  } else {
    Err(AppError::Validation(format!(
      "unsupported file type: {:?} (expected one of {})",
      file_name,
      ALLOWED_EXTENSIONS.join(", ")
    )))
  }
}

pub async fn upload_subtitle(
  user: CurrentUser,
  State(state): State<AppState>,
  mut multipart: Multipart,
) -> AppResult<Json<UploadResponse>> {
  user.require_admin()?;

  let mut file_bytes: Option<Vec<u8>> = None;
  let mut file_name = String::new();
  let mut file_type = String::new();
  let mut content_id = String::new();
  let mut episode_id = String::new();

  while let Some(field) = multipart
    .next_field()
    .await
    .map_err(|e| AppError::Validation(format!("malformed multipart body: {}", e)))?
  {
    let read_err = |e: axum::extract::multipart::MultipartError| {
      AppError::Validation(format!("unreadable multipart field: {}", e))
    };
    match field.name() {
      Some("file") => {
        file_name = field.file_name().unwrap_or("").to_string();
        file_type = field.content_type().unwrap_or("text/plain").to_string();
        file_bytes = Some(field.bytes().await.map_err(read_err)?.to_vec());
      }
      Some("contentId") => content_id = field.text().await.map_err(read_err)?.trim().to_string(),
      Some("episodeId") => episode_id = field.text().await.map_err(read_err)?.trim().to_string(),
      _ => {}
    }
  }

  let bytes = file_bytes.ok_or_else(|| AppError::Validation("missing file field".into()))?;
  if bytes.is_empty() {
    return Err(AppError::Validation("uploaded file is empty".into()));
  }
  validate_id(&content_id, "contentId")?;
  validate_id(&episode_id, "episodeId")?;
  let ext = file_extension(&file_name)?;

  let key = format!("subtitles/{}/{}.{}", content_id, episode_id, ext);
  state.store.put(&key, &bytes)?;

  let file = SubtitleFile {
    content_id,
    episode_id,
    storage_key: key.clone(),
    file_name,
    file_type,
    status: ProcessingStatus::Queued,
    uploaded_at: Utc::now(),
    processed_at: None,
    sentence_count: 0,
    term_count: 0,
  };

  let report = pipeline::run(
    &state.db,
    state.store.as_ref(),
    state.tokenizer.as_ref(),
    &file,
  )?;

  Ok(Json(UploadResponse {
    ok: true,
    key,
    sentence_count: report.sentence_count,
    term_count: report.term_count,
  }))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_validate_id() {
    assert!(validate_id("show-1_a", "contentId").is_ok());
    assert!(validate_id("", "contentId").is_err());
    assert!(validate_id("../etc", "contentId").is_err());
    assert!(validate_id("a/b", "contentId").is_err());
  }

  #[test]
  fn test_file_extension_allowlist() {
    assert_eq!(file_extension("ep1.vtt").unwrap(), "vtt");
    assert_eq!(file_extension("EP1.SRT").unwrap(), "srt");
    assert!(file_extension("ep1.mp4").is_err());
    assert!(file_extension("noextension").is_err());
  }
}
