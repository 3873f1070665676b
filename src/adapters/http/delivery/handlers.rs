//! HTTP handlers for delivery endpoints.
//!
//! The file itself is streamed by the fronting proxy: a granted download
//! answers with an internal redirect header pointing into the protected
//! location instead of a body.

use std::sync::Arc;

use axum::extract::{Json, Path, State};
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::application::handlers::delivery::{
    AuthorizedDownload, RequestDownloadCommand, RequestDownloadHandler, RequestDownloadResult,
};
use crate::domain::delivery::{DeliveryError, DenialReason};

use super::dto::{ErrorResponse, HealthResponse};

/// Header the fronting proxy reads to serve a protected file.
pub const ACCEL_REDIRECT: &str = "x-accel-redirect";

/// Location prefix the proxy maps to the protected file root.
pub const PROTECTED_PREFIX: &str = "/protected/";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state for delivery routes.
#[derive(Clone)]
pub struct DeliveryAppState {
    pub request_download: Arc<RequestDownloadHandler>,
}

impl DeliveryAppState {
    pub fn new(request_download: Arc<RequestDownloadHandler>) -> Self {
        Self { request_download }
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// GET /downloads/:token - Redeem a download token
pub async fn download(
    State(state): State<DeliveryAppState>,
    Path(token): Path<String>,
) -> Result<Response, DeliveryApiError> {
    let result = state
        .request_download
        .handle(RequestDownloadCommand { token })
        .await?;

    Ok(match result {
        RequestDownloadResult::Authorized(download) => authorized_response(&download)?,
        RequestDownloadResult::Denied(reason) => denied_response(reason),
    })
}

/// GET /health - Liveness
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

fn authorized_response(download: &AuthorizedDownload) -> Result<Response, DeliveryApiError> {
    let location = format!("{}{}", PROTECTED_PREFIX, download.file_path);
    let redirect = HeaderValue::from_str(&location).map_err(|_| DeliveryApiError::BadHeader)?;
    let disposition = HeaderValue::from_str(&format!(
        "attachment; filename=\"{}\"",
        download.file_name.replace(['"', '\\'], "_")
    ))
    .map_err(|_| DeliveryApiError::BadHeader)?;

    Ok((
        StatusCode::OK,
        [
            (HeaderName::from_static(ACCEL_REDIRECT), redirect),
            (header::CONTENT_DISPOSITION, disposition),
            (header::CACHE_CONTROL, HeaderValue::from_static("no-store")),
        ],
    )
        .into_response())
}

fn denied_response(reason: DenialReason) -> Response {
    let status = match reason {
        DenialReason::NotFound => StatusCode::NOT_FOUND,
        DenialReason::Expired | DenialReason::Revoked | DenialReason::Exhausted => StatusCode::GONE,
    };
    (status, Json(ErrorResponse::from(reason))).into_response()
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// Failures that are not token denials.
#[derive(Debug)]
pub enum DeliveryApiError {
    Delivery(DeliveryError),
    /// A stored file path or name cannot be expressed as a header value.
    BadHeader,
}

impl From<DeliveryError> for DeliveryApiError {
    fn from(err: DeliveryError) -> Self {
        DeliveryApiError::Delivery(err)
    }
}

impl IntoResponse for DeliveryApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            DeliveryApiError::Delivery(err) if err.is_retryable() => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "The download could not be processed, please retry",
            ),
            DeliveryApiError::Delivery(_) | DeliveryApiError::BadHeader => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "The download could not be processed",
            ),
        };
        if let DeliveryApiError::Delivery(err) = &self {
            tracing::warn!(code = %err.code(), "Download request failed");
        }
        (status, Json(ErrorResponse::new(code, message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{DomainError, OrderId, ProductId};

    fn download(file_path: &str, file_name: &str) -> AuthorizedDownload {
        AuthorizedDownload {
            order_id: OrderId::new(),
            file_path: file_path.to_string(),
            file_name: file_name.to_string(),
            remaining_downloads: 2,
        }
    }

    #[test]
    fn authorized_response_sets_redirect_and_disposition() {
        let response = authorized_response(&download("guides/a.pdf", "a.pdf")).unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(ACCEL_REDIRECT).unwrap(),
            "/protected/guides/a.pdf"
        );
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"a.pdf\""
        );
    }

    #[test]
    fn quotes_in_file_name_are_neutralized() {
        let response = authorized_response(&download("a.pdf", "a\"b.pdf")).unwrap();
        assert_eq!(
            response.headers().get(header::CONTENT_DISPOSITION).unwrap(),
            "attachment; filename=\"a_b.pdf\""
        );
    }

    #[test]
    fn control_characters_in_path_fail() {
        let result = authorized_response(&download("a\nb.pdf", "a.pdf"));
        assert!(matches!(result, Err(DeliveryApiError::BadHeader)));
    }

    #[test]
    fn denials_map_to_gone_or_not_found() {
        assert_eq!(denied_response(DenialReason::NotFound).status(), StatusCode::NOT_FOUND);
        assert_eq!(denied_response(DenialReason::Expired).status(), StatusCode::GONE);
        assert_eq!(denied_response(DenialReason::Revoked).status(), StatusCode::GONE);
        assert_eq!(denied_response(DenialReason::Exhausted).status(), StatusCode::GONE);
    }

    #[test]
    fn transient_failures_are_service_unavailable() {
        let err = DeliveryApiError::from(DeliveryError::from(DomainError::database("timeout")));
        assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn missing_product_is_internal_error() {
        let err = DeliveryApiError::from(DeliveryError::ProductUnavailable {
            order_id: OrderId::new(),
            product_id: ProductId::new("p1").unwrap(),
        });
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
