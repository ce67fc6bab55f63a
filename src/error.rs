//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config load: {0}")]
    Load(String),
    #[error("database '{name}': unsupported url '{url}', expected sqlite:")]
    UnsupportedUrl { name: String, url: String },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("module not found: {0}")]
    ModuleNotFound(String),
    #[error("method not allowed: {0} modifies data")]
    MethodNotAllowed(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("parse {path}: {message}")]
    Parse { path: String, message: String },
    #[error("{0}: only one SQL statement is supported per .sql file")]
    MultipleStatements(String),
    #[error("migration {name}: {message}")]
    Migration { name: String, message: String },
    #[error("handler: {0}")]
    Handler(String),
    #[error("watch: {0}")]
    Watch(String),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            Error::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error"),
            Error::ModuleNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            Error::MethodNotAllowed(_) => (StatusCode::METHOD_NOT_ALLOWED, "method_not_allowed"),
            Error::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            Error::Parse { .. } | Error::MultipleStatements(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "parse_error")
            }
            Error::Migration { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "migration_error"),
            Error::Handler(_) => (StatusCode::INTERNAL_SERVER_ERROR, "handler_error"),
            Error::Watch(_) => (StatusCode::INTERNAL_SERVER_ERROR, "watch_error"),
            Error::Db(e) => {
                if let sqlx::Error::RowNotFound = e {
                    (StatusCode::NOT_FOUND, "not_found")
                } else {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_error")
                }
            }
            Error::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
        };
        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
