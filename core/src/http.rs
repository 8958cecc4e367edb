//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! Requests and responses are plain data. `Bot::build_request` produces an
//! `HttpRequest` and `Bot::parse_response` consumes an `HttpResponse`
//! without touching the network; a `Transport` (or the embedding
//! application) performs the exchange in between. Every Bot API call is a
//! POST, so the request carries no method field.

use crate::multipart::Form;

pub const CONTENT_TYPE: &str = "content-type";
pub const APPLICATION_JSON: &str = "application/json";

/// Encoded request body.
#[derive(Debug, Clone)]
pub enum RequestBody {
    /// Parameter struct serialized as JSON.
    Json(String),
    /// Ordered named parts, rendered with the form's boundary.
    Multipart(Form),
}

impl RequestBody {
    pub fn is_multipart(&self) -> bool {
        matches!(self, RequestBody::Multipart(_))
    }

    /// The `content-type` header value matching this body.
    pub fn content_type(&self) -> String {
        match self {
            RequestBody::Json(_) => APPLICATION_JSON.to_string(),
            RequestBody::Multipart(form) => form.content_type(),
        }
    }

    /// Wire bytes of the body, for a host-executed exchange.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            RequestBody::Json(json) => json.as_bytes().to_vec(),
            RequestBody::Multipart(form) => form.to_bytes(),
        }
    }

    pub fn as_json(&self) -> Option<&str> {
        match self {
            RequestBody::Json(json) => Some(json),
            RequestBody::Multipart(_) => None,
        }
    }

    pub fn as_form(&self) -> Option<&Form> {
        match self {
            RequestBody::Json(_) => None,
            RequestBody::Multipart(form) => Some(form),
        }
    }
}

/// A POST request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: RequestBody,
}

impl HttpRequest {
    pub(crate) fn post(url: String, body: RequestBody) -> Self {
        Self {
            url,
            headers: vec![(CONTENT_TYPE.to_string(), body.content_type())],
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
///
/// Non-2xx statuses are data too; `Bot::parse_response` interprets them.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}
