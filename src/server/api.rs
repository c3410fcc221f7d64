use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::{Path as UrlPath, Query, State};
use axum::http::{StatusCode, header};
use axum::response::Response;
use log::info;
use tokio_util::io::ReaderStream;

use super::error::{AppError, Result};
use super::state::AppState;
use super::types::*;
use crate::cache::{CacheStats, ClearOutcome, ClearTarget, LookupError, Namespace, SliceEntry};
use crate::index::{BuildSummary, IndexError};
use crate::library::{Library, LibraryError, MediaPage, MediaQuery};
use crate::metrics;

fn check_token(state: &AppState, Bearer(token): Bearer) -> Result<()> {
    if token != state.token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

fn content_type(path: &Path) -> &'static str {
    let ext = path.extension().and_then(|s| s.to_str()).map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("webp") => "image/webp",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

async fn load_library(path: &Path) -> Result<Library> {
    match Library::load(path).await {
        Ok(library) => Ok(library),
        Err(LibraryError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {
            Err(AppError::not_found("Data is not provided"))
        }
        Err(e) => Err(e.into()),
    }
}

/// 获取与颜色最接近的照片
#[utoipa::path(
    get,
    path = "/photo/{color}",
    params(("color" = String, Path, description = "6 位十六进制颜色，不带 #")),
    responses(
        (status = 200, description = "照片文件", content_type = "image/*"),
        (status = 400, description = "颜色格式错误"),
        (status = 404, description = "没有对应的照片"),
    )
)]
pub async fn photo_handler(State(state): State<Arc<AppState>>, UrlPath(color): UrlPath<String>) -> Result<Response> {
    let uri = match state.index.lookup(&color).await {
        Ok(Some(uri)) => uri,
        Ok(None) => return Err(AppError::not_found("Photo not found")),
        Err(LookupError::InvalidColor(_)) => return Err(AppError::bad_request("Color should be hex")),
        Err(e) => return Err(e.into()),
    };

    let path = Path::new(&uri);
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::NotFound => return Err(AppError::not_found("Photo not found")),
        Err(e) => return Err(e.into()),
    };

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type(path))
        .body(Body::from_stream(ReaderStream::new(file)))?;
    Ok(response)
}

/// 重建颜色索引
///
/// 请求体为空时使用服务端的图库文件
#[utoipa::path(
    post,
    path = "/cache/verify",
    request_body(content = VerifyRequest, description = "可选，为空时使用服务端的图库文件"),
    responses(
        (status = 200, body = BuildSummary),
        (status = 401, description = "token 错误"),
        (status = 409, description = "已有索引构建正在进行"),
    ),
    security(("bearer" = []))
)]
pub async fn verify_handler(
    State(state): State<Arc<AppState>>,
    bearer: Bearer,
    body: Bytes,
) -> Result<Json<BuildSummary>> {
    check_token(&state, bearer)?;

    let Ok(_guard) = state.building.try_lock() else {
        return Err(AppError::Conflict("Index build is already running".to_string()));
    };

    let media = if body.is_empty() {
        load_library(&state.library).await?.into_media()
    } else {
        serde_json::from_slice::<VerifyRequest>(&body)
            .map_err(|e| AppError::bad_request(e.to_string()))?
            .medias
    };

    info!("开始校验缓存: {} 张照片", media.len());
    match state.index.build_index(media).await {
        Ok(summary) => Ok(Json(summary)),
        Err(IndexError::NoCandidates) => Err(AppError::bad_request(IndexError::NoCandidates.to_string())),
        Err(e) => Err(e.into()),
    }
}

/// 获取缓存统计
#[utoipa::path(get, path = "/cache/stats", responses((status = 200, body = CacheStats)))]
pub async fn stats_handler(State(state): State<Arc<AppState>>) -> Result<Json<CacheStats>> {
    Ok(Json(state.index.cache().stats().await?))
}

/// 清理缓存
#[utoipa::path(
    post,
    path = "/cache/clear",
    params(ClearQuery),
    responses(
        (status = 200, body = ClearOutcome),
        (status = 401, description = "token 错误"),
    ),
    security(("bearer" = []))
)]
pub async fn clear_handler(
    State(state): State<Arc<AppState>>,
    bearer: Bearer,
    Query(query): Query<ClearQuery>,
) -> Result<Json<ClearOutcome>> {
    check_token(&state, bearer)?;
    let target = query.target.unwrap_or(ClearTarget::All);
    Ok(Json(state.index.cache().clear(target).await?))
}

/// 查看部分缓存内容，顺序不固定，仅用于调试
#[utoipa::path(get, path = "/cache/slice", params(SliceQuery), responses((status = 200, body = Vec<SliceEntry>)))]
pub async fn slice_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SliceQuery>,
) -> Result<Json<Vec<SliceEntry>>> {
    let namespace = query.namespace.unwrap_or(Namespace::Color);
    let entries = state.index.cache().slice(namespace, query.start.unwrap_or(0), query.count.unwrap_or(10)).await?;
    Ok(Json(entries))
}

/// 分页查询图库中的照片
#[utoipa::path(get, path = "/media", params(MediaQuery), responses((status = 200, body = MediaPage)))]
pub async fn media_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MediaQuery>,
) -> Result<Json<MediaPage>> {
    let library = load_library(&state.library).await?;
    Ok(Json(library.query(&query)))
}

/// prometheus 指标
#[utoipa::path(get, path = "/metrics", responses((status = 200, body = String, content_type = "text/plain")))]
pub async fn metrics_handler() -> Result<String> {
    Ok(metrics::encode()?)
}
