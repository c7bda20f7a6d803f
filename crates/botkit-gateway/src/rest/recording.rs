//! In-memory transport for unit tests

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{RestRequest, RestResponse, Transport};
use crate::error::TransportResult;

type Responder = Arc<dyn Fn(&RestRequest) -> RestResponse + Send + Sync>;

/// Records every request and answers with a configurable responder
pub(crate) struct RecordingTransport {
    requests: Mutex<Vec<RestRequest>>,
    responder: Responder,
}

impl RecordingTransport {
    /// Answers every request with `204`
    pub(crate) fn new() -> Self {
        Self::with_responder(|_| RestResponse {
            status: 204,
            body: String::new(),
        })
    }

    pub(crate) fn with_responder<F>(f: F) -> Self
    where
        F: Fn(&RestRequest) -> RestResponse + Send + Sync + 'static,
    {
        Self {
            requests: Mutex::new(Vec::new()),
            responder: Arc::new(f),
        }
    }

    pub(crate) fn requests(&self) -> Vec<RestRequest> {
        self.requests.lock().clone()
    }

    pub(crate) fn last(&self) -> Option<RestRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn execute(&self, request: RestRequest) -> TransportResult<RestResponse> {
        let response = (self.responder)(&request);
        self.requests.lock().push(request);
        Ok(response)
    }
}
