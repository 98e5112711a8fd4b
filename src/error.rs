use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::Error as JSON_ERROR;
use sqlx::error::Error as SQL_ERROR;
use std::{
    env::VarError, io::Error as IO_ERROR, num::ParseIntError,
    str::ParseBoolError as PARSE_BOOL_ERROR,
};
use thiserror::Error;
use tokio::sync::AcquireError as ACQUIRE_ERROR;
use tokio::task::JoinError;
use tokio::time::error::Elapsed as ELAPSED;
use tracing::subscriber::SetGlobalDefaultError as TRACING_GLOBAL_DEFAULT_ERROR;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] IO_ERROR),

    #[error("{0}")]
    INT(#[from] ParseIntError),

    #[error("{0}")]
    SQL(#[from] SQL_ERROR),

    #[error("{0}")]
    VAR(#[from] VarError),

    #[error("{0}")]
    TokioJoinError(#[from] JoinError),

    #[error("{0}")]
    AcquireError(#[from] ACQUIRE_ERROR),

    #[error("invalid {name} format: {value}")]
    InvalidParam { name: &'static str, value: String },

    #[error("Field not exists: {0}")]
    FieldNotExist(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("{0}")]
    JsonError(#[from] JSON_ERROR),

    #[error("Refresh timed out: {0}")]
    Timeout(#[from] ELAPSED),

    #[error("Task message error: {0}")]
    TaskError(String),

    #[error("{0}")]
    ParseBoolError(#[from] PARSE_BOOL_ERROR),

    #[error("Tracing error: {0}")]
    SetGlobalDefaultError(#[from] TRACING_GLOBAL_DEFAULT_ERROR),
}

impl Error {
    pub fn invalid_param(name: &'static str, value: &str) -> Self {
        Error::InvalidParam {
            name,
            value: value.to_owned(),
        }
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request - client sent invalid input
            Error::InvalidParam { .. } => StatusCode::BAD_REQUEST,

            // 500 Internal Server Error - everything else
            Error::Io(_)
            | Error::INT(_)
            | Error::SQL(_)
            | Error::VAR(_)
            | Error::TokioJoinError(_)
            | Error::AcquireError(_)
            | Error::FieldNotExist(_)
            | Error::ConfigurationError(_)
            | Error::JsonError(_)
            | Error::Timeout(_)
            | Error::TaskError(_)
            | Error::ParseBoolError(_)
            | Error::SetGlobalDefaultError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let message = if status.is_client_error() {
            self.to_string()
        } else {
            tracing::error!("request failed: {}", self);
            String::from("server error")
        };
        let body = serde_json::json!({
            "error": status.canonical_reason().unwrap_or("Unknown"),
            "message": message,
            "status": status.as_u16(),
        });
        HttpResponse::build(status).json(body)
    }
}
