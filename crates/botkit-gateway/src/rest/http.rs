//! `reqwest` backed transport

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde_json::{json, Value};

use super::{RestRequest, RestResponse, Transport};
use crate::error::{TransportError, TransportResult};
use crate::protocol::LIBRARY_NAME;

/// Transport issuing requests against the REST API with a bot token
pub struct HttpTransport {
    client: Client,
    base_url: String,
    authorization: HeaderValue,
}

impl HttpTransport {
    /// Create a transport for `base_url` (e.g. `https://discord.com/api/v10`)
    pub fn new(base_url: impl Into<String>, token: &str) -> TransportResult<Self> {
        let mut authorization = HeaderValue::from_str(&format!("Bot {token}"))
            .map_err(|e| TransportError::InvalidHeader(e.to_string()))?;
        authorization.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!(
                "DiscordBot ({LIBRARY_NAME}, {})",
                env!("CARGO_PKG_VERSION")
            ))
            .map_err(|e| TransportError::InvalidHeader(e.to_string()))?,
        );

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            authorization,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Multipart form: JSON body as `payload_json`, files as `files[n]`
fn multipart_form(body: Option<Value>, files: Vec<super::FileAttachment>) -> TransportResult<Form> {
    let mut payload = body.unwrap_or_else(|| json!({}));
    if payload.get("attachments").is_none() {
        let attachments: Vec<Value> = files
            .iter()
            .enumerate()
            .map(|(id, file)| json!({"id": id, "filename": file.name, "description": file.description}))
            .collect();
        payload["attachments"] = Value::Array(attachments);
    }

    let mut form = Form::new().text("payload_json", serde_json::to_string(&payload)?);
    for (index, file) in files.into_iter().enumerate() {
        form = form.part(
            format!("files[{index}]"),
            Part::bytes(file.content).file_name(file.name),
        );
    }
    Ok(form)
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: RestRequest) -> TransportResult<RestResponse> {
        let authorization = match request.token_override {
            Some(token) => HeaderValue::from_str(&token)
                .map_err(|e| TransportError::InvalidHeader(e.to_string()))?,
            None => self.authorization.clone(),
        };

        let mut builder = self
            .client
            .request(request.method.clone(), self.url(&request.path))
            .header(AUTHORIZATION, authorization);

        if request.files.is_empty() {
            if let Some(body) = request.body {
                builder = builder.json(&body);
            }
        } else {
            builder = builder.multipart(multipart_form(request.body, request.files)?);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        tracing::trace!(
            method = %request.method,
            path = %request.path,
            status,
            "REST request completed"
        );

        Ok(RestResponse { status, body })
    }
}
