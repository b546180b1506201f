//! Request and response envelopes exchanged with the transport.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::record::{Headers, QueryParams, Record};

/// An incoming request, already decoded by the transport.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Request {
    /// Resource path, e.g. `/users/42/grantRole`.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub body: Option<Record>,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub parameters: QueryParams,
}

impl Request {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_body(mut self, body: Record) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters
            .entry(name.into())
            .or_default()
            .push(value.into());
        self
    }
}

/// The outcome of a successful operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Response {
    pub status: u16,
    #[schema(value_type = Object)]
    pub body: Record,
    /// Extra state handed to whatever runs after this core in the pipeline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Object)]
    pub side_channel: Option<Record>,
}

impl Response {
    pub fn ok(body: Record) -> Self {
        Self::with_status(200, body)
    }

    pub fn created(body: Record) -> Self {
        Self::with_status(201, body)
    }

    pub fn with_status(status: u16, body: Record) -> Self {
        Self {
            status,
            body,
            side_channel: None,
        }
    }

    pub fn with_side_channel(mut self, side_channel: Option<Record>) -> Self {
        self.side_channel = side_channel;
        self
    }
}
