use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;
use validator::ValidationErrors;

/// Field name -> human readable messages, as shown next to each form input.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// AppError
///
/// The single failure type shared by handlers, extractors and repositories. Each variant
/// knows how it is presented to the client (see `IntoResponse` below).
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    /// The request needs an authenticated user. Holds the full login location,
    /// including the `next` parameter.
    #[error("Login required")]
    LoginRequired(String),

    /// A non-author tried to mutate an owned entity. `redirect` selects the deny policy:
    /// `Some` sends the client back to a safe page, `None` answers 403.
    #[error("Not permitted")]
    NotPermitted { redirect: Option<String> },

    /// A submitted form failed validation. The submitted values are echoed back so the
    /// page can be redisplayed with its errors.
    #[error("Invalid form submission")]
    InvalidForm {
        form: serde_json::Value,
        errors: FieldErrors,
    },

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

/// ErrorBody
///
/// JSON body of every non-redirect error response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub error: String,
}

/// RejectedForm
///
/// JSON body of a 422 response: what the user typed and what is wrong with it.
#[derive(Debug, Serialize, ToSchema)]
pub struct RejectedForm {
    #[schema(value_type = Object)]
    pub form: serde_json::Value,
    pub errors: FieldErrors,
}

impl AppError {
    pub fn not_found(what: impl Into<String>) -> Self {
        AppError::NotFound(what.into())
    }

    /// Builds an `InvalidForm` from a form and the errors `validator` reported for it.
    pub fn invalid_form<F: Serialize>(form: &F, errors: &ValidationErrors) -> Self {
        AppError::InvalidForm {
            form: serde_json::to_value(form).unwrap_or(serde_json::Value::Null),
            errors: field_errors(errors),
        }
    }

    /// Builds an `InvalidForm` carrying a single error on `field`.
    pub fn field_error<F: Serialize>(form: &F, field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        AppError::InvalidForm {
            form: serde_json::to_value(form).unwrap_or(serde_json::Value::Null),
            errors,
        }
    }
}

/// Flattens `validator`'s error tree into one message list per field.
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let messages = errs
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            (field.to_string(), messages)
        })
        .collect()
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
                error_body(StatusCode::INTERNAL_SERVER_ERROR, "Database error occurred")
            }
            AppError::NotFound(msg) => error_body(StatusCode::NOT_FOUND, &msg),
            AppError::LoginRequired(location) => Redirect::to(&location).into_response(),
            AppError::NotPermitted { redirect: Some(to) } => Redirect::to(&to).into_response(),
            AppError::NotPermitted { redirect: None } => {
                error_body(StatusCode::FORBIDDEN, "Only the author may do this")
            }
            AppError::InvalidForm { form, errors } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(RejectedForm { form, errors }),
            )
                .into_response(),
            AppError::BadRequest(msg) => error_body(StatusCode::BAD_REQUEST, &msg),
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {}", msg);
                error_body(StatusCode::INTERNAL_SERVER_ERROR, "Storage error occurred")
            }
        }
    }
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.to_string(),
        }),
    )
        .into_response()
}
