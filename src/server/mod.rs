mod api;
mod error;
mod state;
mod types;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::limit::RequestBodyLimitLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

pub use self::state::*;

#[derive(OpenApi)]
#[openapi(
    paths(
        api::photo_handler,
        api::verify_handler,
        api::stats_handler,
        api::clear_handler,
        api::slice_handler,
        api::media_handler,
        api::metrics_handler,
    ),
    components(schemas(
        types::VerifyRequest,
        crate::cache::CacheStats,
        crate::cache::ClearOutcome,
        crate::cache::SliceEntry,
        crate::index::BuildSummary,
        crate::library::MediaPage,
    )),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// 构建API服务器
pub fn create_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/photo/{color}", get(api::photo_handler))
        .route("/cache/verify", post(api::verify_handler))
        .route("/cache/stats", get(api::stats_handler))
        .route("/cache/clear", post(api::clear_handler))
        .route("/cache/slice", get(api::slice_handler))
        .route("/media", get(api::media_handler))
        .route("/metrics", get(api::metrics_handler))
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::disable())
        // 请求体限制：64M，足够容纳整个图库
        .layer(RequestBodyLimitLayer::new(1024 * 1024 * 64))
        .with_state(state)
}
