//! Unified error handling with Sentry integration.
//!
//! Every user action (a click, a form submit, a page load) runs behind a
//! single error boundary, [`report`]. A failed action is logged, captured to
//! Sentry and otherwise swallowed: the page stays as it was and the user
//! retries by hand. There are no retries or offline queues.

use thiserror::Error;

use crate::api::ApiError;
use crate::storage::StorageError;

/// Page-client error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Shop API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Client-persisted store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Rendering a view failed.
    #[error("Render error: {0}")]
    Render(#[from] askama::Error),

    /// Encoding a persisted value failed.
    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// User input rejected before any request was made.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl AppError {
    /// Whether the request never got an answer from the server: the
    /// connection failed or the request could not be built.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Api(ApiError::Http(_) | ApiError::MissingCsrfToken | ApiError::Url(_))
        )
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Error boundary for one user action.
///
/// Logs and captures the error and returns `None`; passes successes
/// through. Call it once per action, at the outermost await.
pub fn report<T>(action: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(error) => {
            let event_id = sentry::capture_error(&error);
            tracing::error!(
                action,
                error = %error,
                sentry_event_id = %event_id,
                "Action failed"
            );
            None
        }
    }
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Updated quantity", Some(&[("product_id", "42")]));
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
