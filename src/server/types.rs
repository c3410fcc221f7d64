use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum_auth::AuthBearerCustom;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::cache::{ClearTarget, Namespace};
use crate::media::MediaRecord;

/// Bearer token，缺失时返回 401
pub struct Bearer(pub String);

impl AuthBearerCustom for Bearer {
    const ERROR_CODE: StatusCode = StatusCode::UNAUTHORIZED;
    const ERROR_OVERWRITE: Option<&'static str> = None;

    fn from_header(contents: &str) -> Self {
        Self(contents.to_string())
    }
}

impl<S> FromRequestParts<S> for Bearer
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, _: &S) -> Result<Self, Self::Rejection> {
        Self::decode_request_parts(parts)
    }
}

/// 重建索引的参数，不提供时使用服务端的图库文件
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct VerifyRequest {
    /// 参与索引的照片
    #[schema(value_type = Vec<Object>)]
    #[serde(default)]
    pub medias: Vec<MediaRecord>,
}

/// 清理缓存的参数
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ClearQuery {
    /// 清理范围，默认为 all
    #[serde(rename = "type")]
    pub target: Option<ClearTarget>,
}

/// 缓存切片的参数
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SliceQuery {
    /// 缓存类型，默认为 color
    #[serde(rename = "type")]
    pub namespace: Option<Namespace>,
    /// 跳过的数量，默认为 0
    pub start: Option<usize>,
    /// 返回的数量，默认为 10
    pub count: Option<usize>,
}
