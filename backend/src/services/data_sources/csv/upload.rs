use crate::error::IngestError;
use crate::services::data_sources::csv::ingest::too_large_message;
use actix_multipart::{Field, Multipart};
use futures_util::StreamExt;

const ACCEPTED_CONTENT_TYPES: [&str; 3] = ["text/csv", "application/vnd.ms-excel", "text/plain"];

pub const NO_FILE_MESSAGE: &str = "No file provided. Select a CSV file to upload.";

/// Longest `token` part accepted; real tokens are a few hundred bytes.
const MAX_TOKEN_BYTES: usize = 4 * 1024;

/// The parts of a preview or confirm upload.
#[derive(Debug)]
pub struct Upload {
    pub file_name: String,
    pub bytes: Vec<u8>,
    /// Present only on confirm requests.
    pub token: Option<String>,
}

fn unreadable(e: impl std::fmt::Display) -> IngestError {
    IngestError::Structural(format!(
        "We couldn't read the uploaded form ({}). Try uploading the file again.",
        e
    ))
}

/// Accepts a part by declared content type, or by a `.csv` file name when
/// the browser reports something generic.
fn check_file_type(field: &Field, file_name: &str) -> Result<(), IngestError> {
    let declared = field
        .content_type()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| "application/octet-stream".to_string());

    if ACCEPTED_CONTENT_TYPES.contains(&declared.as_str())
        || file_name.to_ascii_lowercase().ends_with(".csv")
    {
        Ok(())
    } else {
        Err(IngestError::Structural(format!(
            "We expected a .csv file, but received a {} file.",
            declared
        )))
    }
}

/// Reads a field into memory, giving up as soon as `limit` is crossed.
async fn read_capped(field: &mut Field, limit: usize, too_large: impl Fn() -> IngestError) -> Result<Vec<u8>, IngestError> {
    let mut buf = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(unreadable)?;
        if buf.len() + chunk.len() > limit {
            return Err(too_large());
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

/// Collects the `file` part (and `token`, if sent) from a multipart body.
/// Unknown parts are drained and ignored.
pub async fn read_upload(mut payload: Multipart, max_file_bytes: usize) -> Result<Upload, IngestError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut token: Option<String> = None;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(unreadable)?;
        let name = field
            .content_disposition()
            .and_then(|cd| cd.get_name().map(|n| n.to_string()));

        match name.as_deref() {
            Some("file") => {
                let file_name = field
                    .content_disposition()
                    .and_then(|cd| cd.get_filename().map(|f| f.to_string()))
                    .unwrap_or_default();
                check_file_type(&field, &file_name)?;
                let bytes = read_capped(&mut field, max_file_bytes, || {
                    IngestError::Structural(too_large_message(max_file_bytes))
                })
                .await?;
                file = Some((file_name, bytes));
            }

            Some("token") => {
                let bytes = read_capped(&mut field, MAX_TOKEN_BYTES, IngestError::file_changed).await?;
                let text = String::from_utf8(bytes).map_err(|_| IngestError::file_changed())?;
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    token = Some(trimmed.to_string());
                }
            }

            _ => {
                while let Some(chunk) = field.next().await {
                    chunk.map_err(unreadable)?;
                }
            }
        }
    }

    let (file_name, bytes) = file.ok_or_else(|| IngestError::Structural(NO_FILE_MESSAGE.to_string()))?;
    Ok(Upload {
        file_name,
        bytes,
        token,
    })
}
