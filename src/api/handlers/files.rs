use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{ConnectInfo, Multipart, Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;

use crate::api::response::{ApiError, AppJson, AppQuery, JSend};
use crate::storage::models::FileRecord;
use crate::AppState;

/// RFC 5987 attr-chars left unescaped in `filename*`.
const FILENAME_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

// ============================================================================
// Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub created_at: String,
    pub download_count: u64,
    pub filename: String,
    pub id: u64,
    pub protected: bool,
    pub size: u64,
    pub updated_at: String,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub filename: String,
    pub id: u64,
    pub size: u64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct RenameResponse {
    pub message: String,
    pub new_filename: String,
}

#[derive(Debug, Serialize)]
pub struct ShareResponse {
    pub share_url: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct RenameRequest {
    pub new_filename: String,
}

#[derive(Debug, Deserialize)]
pub struct DownloadParams {
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

// ============================================================================
// Handlers
// ============================================================================

pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<JSend<UploadResponse>>, ApiError> {
    let mut file_data: Option<Bytes> = None;
    let mut file_name: Option<String> = None;
    let mut password: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart data: {e}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());

                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("Failed to read file: {e}")))?;

                if data.len() as u64 > state.config.max_upload_size {
                    return Err(ApiError::payload_too_large(format!(
                        "File exceeds maximum upload size of {} bytes",
                        state.config.max_upload_size
                    )));
                }

                file_data = Some(data);
            }
            "password" => {
                password = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| ApiError::bad_request(format!("Invalid password: {e}")))?,
                );
            }
            _ => {
                // Ignore unknown fields
            }
        }
    }

    let file_data = file_data.ok_or_else(|| ApiError::bad_request("file field is required"))?;
    let file_name =
        file_name.ok_or_else(|| ApiError::bad_request("file field must carry a filename"))?;

    let origin = client_origin(&headers, connect_info.as_ref());
    let file = state
        .files
        .upload(file_data, &file_name, password.as_deref(), &origin)
        .await?;

    Ok(JSend::success(UploadResponse {
        filename: file.filename,
        id: file.id,
        size: file.byte_size,
    }))
}

pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    AppQuery(params): AppQuery<DownloadParams>,
) -> Result<Response, ApiError> {
    let id = parse_file_id(&id)?;
    let origin = client_origin(&headers, connect_info.as_ref());

    let download = state
        .files
        .download(id, params.password.as_deref(), &origin)
        .await?;
    let file = download.file;
    let size = download.size;

    let body = Body::from_stream(ReaderStream::new(download.reader));
    let mut response = (StatusCode::OK, body).into_response();
    let headers = response.headers_mut();

    let mime_type = mime_guess::from_path(&file.filename).first_or_octet_stream();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime_type.as_ref())
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));

    let disposition = HeaderValue::from_str(&content_disposition(&file.filename))
        .map_err(|e| ApiError::internal(format!("Invalid Content-Disposition header: {e}")))?;
    headers.insert(header::CONTENT_DISPOSITION, disposition);

    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("private, no-store"),
    );

    Ok(response)
}

pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<JSend<MessageResponse>>, ApiError> {
    let id = parse_file_id(&id)?;
    state.files.delete(id).await?;

    Ok(JSend::success(MessageResponse {
        message: "File deleted".to_string(),
    }))
}

pub async fn rename_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    AppJson(req): AppJson<RenameRequest>,
) -> Result<Json<JSend<RenameResponse>>, ApiError> {
    let id = parse_file_id(&id)?;
    let file = state.files.rename(id, &req.new_filename).await?;

    Ok(JSend::success(RenameResponse {
        message: "File renamed".to_string(),
        new_filename: file.filename,
    }))
}

pub async fn list_files(
    State(state): State<Arc<AppState>>,
) -> Result<Json<JSend<Vec<FileResponse>>>, ApiError> {
    let files = state.files.list()?;
    Ok(JSend::success(files.iter().map(file_to_response).collect()))
}

pub async fn search_files(
    State(state): State<Arc<AppState>>,
    AppQuery(params): AppQuery<SearchParams>,
) -> Result<Json<JSend<Vec<FileResponse>>>, ApiError> {
    let files = state.files.search(&params.q)?;
    Ok(JSend::success(files.iter().map(file_to_response).collect()))
}

pub async fn share_file(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<JSend<ShareResponse>>, ApiError> {
    let id = parse_file_id(&id)?;
    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(&state.config.server.bind_address);

    let issued = state.files.share(id, host)?;

    Ok(JSend::success(ShareResponse {
        share_url: issued.url,
    }))
}

// ============================================================================
// Helpers
// ============================================================================

fn parse_file_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request("Invalid file ID"))
}

/// First `X-Forwarded-For` hop, else the peer address.
fn client_origin(headers: &HeaderMap, connect_info: Option<&ConnectInfo<SocketAddr>>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| connect_info.map(|ConnectInfo(addr)| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

/// `attachment` disposition with a quoted ASCII fallback and an RFC 5987 UTF-8 name.
fn content_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c.is_ascii_graphic() || c == ' ' => c,
            _ => '_',
        })
        .collect();
    let encoded = utf8_percent_encode(filename, FILENAME_ENCODE_SET);

    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

fn file_to_response(file: &FileRecord) -> FileResponse {
    FileResponse {
        created_at: file.created_at.to_rfc3339(),
        download_count: file.download_count,
        filename: file.filename.clone(),
        id: file.id,
        protected: file.is_protected(),
        size: file.byte_size,
        updated_at: file.updated_at.to_rfc3339(),
    }
}
