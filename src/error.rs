//! Translation of handler failures into HTTP responses.
//!
//! Handlers return [`ApiError`]. Domain and web errors describe themselves to
//! the client; internal failures are logged against the code that raised them
//! and the client only sees a fixed message.

use crate::{response, utils};
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::Value;
use std::{fmt, panic::Location};

pub const SEVERE_MESSAGE: &str = "There was a critical internal error. Contact an administrator.";
pub const UNEXPECTED_MESSAGE: &str = "An error occurred. Please contact an administrator.";

/// Logged origin for failures whose raising site is unknown.
pub const FALLBACK_ORIGIN: &str = "origin_fallback";

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

#[derive(thiserror::Error)]
pub enum ApiError {
    /// An application error carrying its own status and payload.
    #[error("{message}")]
    Domain {
        status: StatusCode,
        message: String,
        data: Option<Value>,
    },
    #[error("{message}")]
    Web { message: String, data: Option<Value> },
    #[error("{message}")]
    Internal {
        message: String,
        source: anyhow::Error,
        origin: Option<&'static Location<'static>>,
    },
    #[error("Severe internal error")]
    SevereInternal {
        source: anyhow::Error,
        origin: Option<&'static Location<'static>>,
    },
    #[error("Unexpected error")]
    Unexpected {
        source: anyhow::Error,
        origin: Option<&'static Location<'static>>,
    },
}

impl ApiError {
    pub fn domain(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Domain {
            status,
            message: message.into(),
            data: None,
        }
    }

    pub fn web(message: impl Into<String>) -> Self {
        Self::Web {
            message: message.into(),
            data: None,
        }
    }

    #[track_caller]
    pub fn internal(message: impl Into<String>, source: impl Into<anyhow::Error>) -> Self {
        Self::Internal {
            message: message.into(),
            source: source.into(),
            origin: Some(Location::caller()),
        }
    }

    #[track_caller]
    pub fn severe(source: impl Into<anyhow::Error>) -> Self {
        Self::SevereInternal {
            source: source.into(),
            origin: Some(Location::caller()),
        }
    }

    #[track_caller]
    pub fn unexpected(source: impl Into<anyhow::Error>) -> Self {
        Self::Unexpected {
            source: source.into(),
            origin: Some(Location::caller()),
        }
    }

    /// Attach a payload. Only domain and web errors expose one to the client.
    pub fn with_data(mut self, value: Value) -> Self {
        match &mut self {
            Self::Domain { data, .. } | Self::Web { data, .. } => *data = Some(value),
            _ => {}
        }
        self
    }

    fn origin(&self) -> Origin {
        match self {
            Self::Internal { origin, .. }
            | Self::SevereInternal { origin, .. }
            | Self::Unexpected { origin, .. } => Origin(*origin),
            Self::Domain { .. } | Self::Web { .. } => Origin(None),
        }
    }

    fn log(&self) {
        match self {
            Self::Domain { .. } | Self::Web { .. } => {}
            Self::Internal { .. } | Self::Unexpected { .. } => {
                tracing::error!(origin = %self.origin(), "{:?}", self);
            }
            Self::SevereInternal { .. } => {
                tracing::error!(severity = "critical", origin = %self.origin(), "{:?}", self);
            }
        }
    }
}

/// Conversions through `?` lose the raising site.
impl From<anyhow::Error> for ApiError {
    fn from(source: anyhow::Error) -> Self {
        Self::Unexpected {
            source,
            origin: None,
        }
    }
}

impl fmt::Debug for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        utils::error_chain_fmt(self, f)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Domain { status, .. } => *status,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        self.log();
        let status = self.status_code();
        match self {
            Self::Domain { message, data, .. } | Self::Web { message, data } => {
                response::web_error(status, message, data.as_ref())
            }
            Self::Internal { message, .. } => response::web_error::<()>(status, message, None),
            Self::SevereInternal { .. } => response::web_error::<()>(status, SEVERE_MESSAGE, None),
            Self::Unexpected { .. } => response::web_error::<()>(status, UNEXPECTED_MESSAGE, None),
        }
    }
}

struct Origin(Option<&'static Location<'static>>);

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(location) => write!(f, "{}:{}", location.file(), location.line()),
            None => f.write_str(FALLBACK_ORIGIN),
        }
    }
}
