use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, EnumDiscriminants, IntoStaticStr};
use thiserror::Error;
use utoipa::ToSchema;

/// Every condition an operation can report back to its caller.
///
/// Each variant maps onto one status class; the message is meant for humans
/// and is returned verbatim alongside [`GatehouseError::code`].
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq, EnumDiscriminants)]
#[strum_discriminants(
    name(ErrorKind),
    derive(AsRefStr, IntoStaticStr),
    strum(serialize_all = "snake_case")
)]
pub enum GatehouseError {
    #[error("{0}")]
    MalformedRequest(String),

    #[error("{0}")]
    AuthenticationRequired(String),

    #[error("{0}")]
    InsufficientPermission(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Internal(String),

    #[error("invalid path pattern: {0}")]
    InvalidPattern(String),
}

impl GatehouseError {
    /// HTTP-style status code for this condition.
    pub fn status(&self) -> u16 {
        match self {
            GatehouseError::MalformedRequest(_) => 400,
            GatehouseError::AuthenticationRequired(_) => 401,
            GatehouseError::InsufficientPermission(_) => 403,
            GatehouseError::NotFound(_) => 404,
            GatehouseError::Conflict(_) => 409,
            GatehouseError::Internal(_) | GatehouseError::InvalidPattern(_) => 500,
        }
    }

    /// Stable machine-readable code, e.g. `malformed_request`.
    pub fn code(&self) -> &'static str {
        self.kind().into()
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::from(self)
    }

    /// The (code, message) pair handed back to a transport.
    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

/// Serializable error payload.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl From<&GatehouseError> for ErrorBody {
    fn from(err: &GatehouseError) -> Self {
        err.to_body()
    }
}

impl From<serde_json::Error> for GatehouseError {
    fn from(err: serde_json::Error) -> Self {
        GatehouseError::Internal(err.to_string())
    }
}

impl From<regex::Error> for GatehouseError {
    fn from(err: regex::Error) -> Self {
        GatehouseError::InvalidPattern(err.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for GatehouseError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        GatehouseError::Internal(format!("poisoned lock: {err}"))
    }
}
