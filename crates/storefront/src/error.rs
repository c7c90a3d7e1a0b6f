//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::orders::OrderHistoryError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Order history could not be assembled.
    #[error("Order history error: {0}")]
    OrderHistory(#[from] OrderHistoryError),

    /// Product catalog could not be fetched.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::OrderHistory(err) => match err {
                OrderHistoryError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                OrderHistoryError::LineItemFetchFailed { .. } => StatusCode::BAD_GATEWAY,
                OrderHistoryError::InvalidTimestamp { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Catalog(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Message safe to show to clients.
    fn public_message(&self) -> String {
        match self {
            Self::OrderHistory(err) => match err {
                OrderHistoryError::StoreUnavailable(_) => {
                    "Order history is temporarily unavailable, please try again".to_string()
                }
                OrderHistoryError::LineItemFetchFailed { order_id, .. } => {
                    format!("Could not load the items of order {order_id}")
                }
                OrderHistoryError::InvalidTimestamp { order_id, .. } => {
                    format!("Order {order_id} could not be displayed")
                }
            },
            Self::Catalog(_) => "Product catalog is temporarily unavailable".to_string(),
            Self::NotFound(_) => self.to_string(),
        }
    }

    const fn is_server_fault(&self) -> bool {
        !matches!(self, Self::NotFound(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_fault() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        let mut body = json!({ "error": self.public_message() });
        if let Self::OrderHistory(err) = &self {
            body["retryable"] = json!(err.is_retryable());
        }

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context for the signed-in customer.
pub fn set_sentry_user(email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            email: Some(email.to_string()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for customer actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("orders", "Viewed order history", Some(&[("orders", "3")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
