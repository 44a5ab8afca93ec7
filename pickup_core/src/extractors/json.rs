//! JSON body extractor that reports rejections in the API's error shape

use crate::error::AppError;
use axum::{
    async_trait,
    body::{Body, Bytes},
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::{header, HeaderMap},
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::error::Category;

pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                tracing::debug!("Rejected JSON body: {}", rejection.body_text());
                Err(AppError::InvalidJson(rejection_message(&rejection).to_string()))
            }
        }
    }
}

/// Like [`ApiJson`], but a request without a JSON content type or with a blank
/// body yields `T::default()`, so every field of the body is optional.
pub struct ApiJsonOrDefault<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJsonOrDefault<T>
where
    T: DeserializeOwned + Default,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request<Body>, state: &S) -> Result<Self, Self::Rejection> {
        if !has_json_content_type(req.headers()) {
            return Ok(ApiJsonOrDefault(T::default()));
        }

        let bytes = Bytes::from_request(req, state).await.map_err(|rejection| {
            tracing::debug!("Failed to read request body: {}", rejection);
            AppError::InvalidJson("Failed to read request body".to_string())
        })?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(ApiJsonOrDefault(T::default()));
        }

        serde_json::from_slice(&bytes)
            .map(ApiJsonOrDefault)
            .map_err(|e| {
                tracing::debug!("Rejected JSON body: {}", e);
                let message = match e.classify() {
                    Category::Data => "Request body has invalid field types",
                    Category::Syntax | Category::Eof => "Invalid JSON format",
                    Category::Io => "Failed to read request body",
                };
                AppError::InvalidJson(message.to_string())
            })
    }
}

fn has_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(header::CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };

    let essence = content_type.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    essence == "application/json" || (essence.starts_with("application/") && essence.ends_with("+json"))
}

fn rejection_message(rejection: &JsonRejection) -> &'static str {
    match rejection {
        JsonRejection::JsonDataError(_) => "Request body has invalid field types",
        JsonRejection::JsonSyntaxError(_) => "Invalid JSON format",
        JsonRejection::MissingJsonContentType(_) => "Expected request with `Content-Type: application/json`",
        JsonRejection::BytesRejection(_) => "Failed to read request body",
        _ => "Failed to parse JSON request",
    }
}
