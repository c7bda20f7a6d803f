//! Control-channel request primitive
//!
//! Everything the runtime sends over REST goes through `Transport`, so tests
//! can swap in a recording implementation.

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{TransportError, TransportResult};

/// File uploaded alongside a request body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileAttachment {
    pub name: String,
    pub description: Option<String>,
    pub content: Vec<u8>,
}

impl FileAttachment {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            description: None,
            content: content.into(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Request handed to a `Transport`
#[derive(Debug, Clone)]
pub struct RestRequest {
    pub method: Method,
    /// Path relative to the API base url, starting with '/'
    pub path: String,
    pub body: Option<Value>,
    /// Authorization header value replacing the bot token
    pub token_override: Option<String>,
    pub files: Vec<FileAttachment>,
}

impl RestRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            token_override: None,
            files: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token_override = Some(token.into());
        self
    }

    pub fn files(mut self, files: Vec<FileAttachment>) -> Self {
        self.files = files;
        self
    }
}

/// Raw response from a `Transport`
#[derive(Debug, Clone)]
pub struct RestResponse {
    pub status: u16,
    pub body: String,
}

impl RestResponse {
    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-success status into `TransportError::Status`
    pub fn error_for_status(self) -> TransportResult<Self> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(TransportError::Status {
                status: self.status,
                body: self.body,
            })
        }
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> TransportResult<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Human readable error message from an error body
    pub fn error_message(&self) -> String {
        serde_json::from_str::<Value>(&self.body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(String::from))
            .unwrap_or_else(|| self.body.clone())
    }
}

/// Executes control-channel requests
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: RestRequest) -> TransportResult<RestResponse>;
}
