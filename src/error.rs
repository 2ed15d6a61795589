use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::{auth::AuthError, image_host::UploadError, routes::access_denied_location};

pub type AppResult<T> = std::result::Result<T, AppError>;

/// Everything a handler can fail with. Each variant maps to one user-facing message.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Authentication(#[from] AuthError),

    #[error("You do not have access to {attempted_path}.")]
    AccessDenied { attempted_path: String },

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("The requested record does not exist.")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("{0} is not available right now.")]
    Unavailable(&'static str),

    #[error("Something went wrong while saving. Please try again.")]
    Submission(#[source] anyhow::Error),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Authentication(error) => error.status(),
            AppError::AccessDenied { .. } => StatusCode::FORBIDDEN,
            AppError::Upload(error) => error.status(),
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Submission(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation",
            AppError::Authentication(_) => "authentication",
            AppError::AccessDenied { .. } => "access_denied",
            AppError::Upload(_) => "upload",
            AppError::NotFound => "not_found",
            AppError::Conflict(_) => "conflict",
            AppError::Unavailable(_) => "unavailable",
            AppError::Submission(_) => "submission",
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    message: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a [ValidationIssue]>,

    #[serde(skip_serializing_if = "Option::is_none")]
    redirect: Option<String>,

    #[serde(skip_serializing_if = "std::ops::Not::not")]
    sign_out: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (fields, redirect, sign_out) = match &self {
            AppError::Validation(errors) => (Some(errors.issues.as_slice()), None, false),
            AppError::AccessDenied { attempted_path } => {
                (None, Some(access_denied_location(attempted_path)), true)
            }
            _ => (None, None, false),
        };

        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
            fields,
            redirect,
            sign_out,
        };

        (self.status(), Json(body)).into_response()
    }
}

/// All issues found in one form, reported together before anything is written.
#[derive(Debug, Error, Default)]
#[error("Please correct the highlighted fields.")]
pub struct ValidationErrors {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: &str, code: &str, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            field: field.to_string(),
            code: code.to_string(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.issues.iter().any(|issue| issue.field == field)
    }

    /// `Ok(value)` when nothing was collected.
    pub fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}
