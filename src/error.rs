//! Unified application error model.
//! Every fallible operation in the document store, credential store and HTTP
//! layer returns `AppResult<T>`; the HTTP layer decides per variant whether the
//! failure becomes a flash + redirect, an inline form message, or a 500.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum AppError {
    /// Document absent on read/update/delete/edit.
    #[error("{0} does not exist")]
    NotFound(String),
    /// Gate failure on a privileged route; the message becomes the flash.
    #[error("{0}")]
    Unauthorized(String),
    /// User input rejected; the message is shown inline next to the form.
    #[error("{0}")]
    Validation(String),
    /// Credential file missing or corrupt.
    #[error("configuration error: {0}")]
    Config(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn not_found<S: Into<String>>(name: S) -> Self { AppError::NotFound(name.into()) }
    pub fn unauthorized<S: Into<String>>(msg: S) -> Self { AppError::Unauthorized(msg.into()) }
    pub fn validation<S: Into<String>>(msg: S) -> Self { AppError::Validation(msg.into()) }
    pub fn config<S: Into<String>>(msg: S) -> Self { AppError::Config(msg.into()) }
    pub fn internal<S: Into<String>>(msg: S) -> Self { AppError::Internal(msg.into()) }

    pub fn code_str(&self) -> &'static str {
        match self {
            AppError::NotFound(_) => "not_found",
            AppError::Unauthorized(_) => "unauthorized",
            AppError::Validation(_) => "validation",
            AppError::Config(_) => "config",
            AppError::Io(_) => "io",
            AppError::Template(_) => "template",
            AppError::Internal(_) => "internal",
        }
    }

    /// Map to HTTP status code.
    pub fn http_status(&self) -> u16 {
        match self {
            AppError::NotFound(_) => 404,
            AppError::Unauthorized(_) => 401,
            AppError::Validation(_) => 422,
            AppError::Config(_) | AppError::Io(_) | AppError::Template(_) | AppError::Internal(_) => 500,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            // Internal details stay in the log; the client only sees the status line.
            error!(target: "flatcms::server", code = self.code_str(), "request failed: {self}");
            return (status, "Internal Server Error").into_response();
        }
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_mapping() {
        assert_eq!(AppError::not_found("a.txt").http_status(), 404);
        assert_eq!(AppError::unauthorized("no").http_status(), 401);
        assert_eq!(AppError::validation("A name is required").http_status(), 422);
        assert_eq!(AppError::config("missing users.yaml").http_status(), 500);
        let io = AppError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.http_status(), 500);
        assert_eq!(AppError::internal("rng").http_status(), 500);
    }

    #[test]
    fn not_found_message_names_the_document() {
        assert_eq!(AppError::not_found("notafile.ext").to_string(), "notafile.ext does not exist");
        assert_eq!(AppError::validation("A name is required").to_string(), "A name is required");
    }

    #[test]
    fn server_errors_hide_details() {
        let resp = AppError::config("secret path /etc/x").into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let resp = AppError::validation("bad").into_response();
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
