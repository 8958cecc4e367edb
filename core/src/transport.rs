//! The network seam between `Bot` and an HTTP client.

use async_trait::async_trait;
use reqwest::multipart;

use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse, RequestBody, CONTENT_TYPE};
use crate::multipart::{Form, PartValue, DEFAULT_FILE_MIME};

/// Executes one `HttpRequest`.
///
/// Implementations return non-2xx responses as data; only failures that
/// produce no response at all are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// `Transport` backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let is_multipart = request.body.is_multipart();
        let mut builder = self.client.post(&request.url);
        for (name, value) in &request.headers {
            // reqwest writes its own multipart content type and boundary.
            if is_multipart && name.eq_ignore_ascii_case(CONTENT_TYPE) {
                continue;
            }
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match request.body {
            RequestBody::Json(json) => builder.body(json),
            RequestBody::Multipart(form) => builder.multipart(to_reqwest_form(form)?),
        };

        // The request URL embeds the bot token; keep it out of error text.
        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::from(e.without_url()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| TransportError::from(e.without_url()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Hand the parts to reqwest in order. Upload buffers are passed as
/// streams, so their bytes are not copied.
fn to_reqwest_form(form: Form) -> Result<multipart::Form, TransportError> {
    let mut out = multipart::Form::new();
    for part in form.into_parts() {
        let value = match part.value {
            PartValue::Text(text) => multipart::Part::text(text),
            PartValue::File {
                file_name,
                mime,
                bytes,
            } => {
                let length = bytes.len() as u64;
                multipart::Part::stream_with_length(bytes, length)
                    .file_name(file_name)
                    .mime_str(mime.as_deref().unwrap_or(DEFAULT_FILE_MIME))?
            }
        };
        out = out.part(part.name, value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    #[test]
    fn form_with_valid_parts_converts() {
        let mut form = Form::with_boundary("b");
        form.text("chat_id", "42");
        form.file("photo", "cat.jpg", Some("image/jpeg".to_string()), Bytes::from_static(b"JPEG"));
        form.file("document", "blob", None, Bytes::from_static(b"x"));
        assert!(to_reqwest_form(form).is_ok());
    }

    #[test]
    fn malformed_mime_is_a_transport_error() {
        let mut form = Form::with_boundary("b");
        form.file("photo", "cat.jpg", Some("not a mime".to_string()), Bytes::new());
        assert!(to_reqwest_form(form).is_err());
    }
}
