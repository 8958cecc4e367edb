//! `multipart/form-data` bodies as ordered, named parts.
//!
//! A `Form` is built fresh for every call and rendered on demand. Part names
//! are unique: the first part pushed under a name wins and later pushes
//! under the same name are ignored.

use bytes::Bytes;

pub(crate) const DEFAULT_FILE_MIME: &str = "application/octet-stream";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartValue {
    Text(String),
    File {
        file_name: String,
        mime: Option<String>,
        bytes: Bytes,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub name: String,
    pub value: PartValue,
}

impl Part {
    pub fn is_file(&self) -> bool {
        matches!(self.value, PartValue::File { .. })
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            PartValue::Text(text) => Some(text),
            PartValue::File { .. } => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Form {
    boundary: String,
    parts: Vec<Part>,
}

impl Default for Form {
    fn default() -> Self {
        Self::new()
    }
}

impl Form {
    /// Empty form with a random boundary.
    pub fn new() -> Self {
        Self::with_boundary(format!("tele-sdk-{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn with_boundary(boundary: impl Into<String>) -> Self {
        Self {
            boundary: boundary.into(),
            parts: Vec::new(),
        }
    }

    /// Append a text part. Returns `false` if `name` is already taken.
    pub fn text(&mut self, name: &str, value: impl Into<String>) -> bool {
        self.push(Part {
            name: name.to_string(),
            value: PartValue::Text(value.into()),
        })
    }

    /// Append a file part. Returns `false` if `name` is already taken.
    pub fn file(
        &mut self,
        name: &str,
        file_name: impl Into<String>,
        mime: Option<String>,
        bytes: Bytes,
    ) -> bool {
        self.push(Part {
            name: name.to_string(),
            value: PartValue::File {
                file_name: file_name.into(),
                mime,
                bytes,
            },
        })
    }

    fn push(&mut self, part: Part) -> bool {
        if self.get(&part.name).is_some() {
            return false;
        }
        self.parts.push(part);
        true
    }

    pub fn get(&self, name: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.name == name)
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    pub fn into_parts(self) -> Vec<Part> {
        self.parts
    }

    pub fn names(&self) -> Vec<&str> {
        self.parts.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    /// Render the form to wire bytes under `boundary()`, for embedders that
    /// run the exchange on their own HTTP stack. Uploads are copied into the
    /// returned buffer; `ReqwestTransport` streams them instead.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for part in &self.parts {
            out.extend_from_slice(b"--");
            out.extend_from_slice(self.boundary.as_bytes());
            out.extend_from_slice(b"\r\n");
            let name = escape_quoted(&part.name);
            match &part.value {
                PartValue::Text(text) => {
                    out.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
                    );
                    out.extend_from_slice(text.as_bytes());
                }
                PartValue::File {
                    file_name,
                    mime,
                    bytes,
                } => {
                    let file_name = escape_quoted(file_name);
                    let mime = mime.as_deref().unwrap_or(DEFAULT_FILE_MIME);
                    out.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {mime}\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    out.extend_from_slice(bytes);
                }
            }
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(b"--");
        out.extend_from_slice(self.boundary.as_bytes());
        out.extend_from_slice(b"--\r\n");
        out
    }
}

/// Percent-encode the characters that would break a quoted header parameter.
fn escape_quoted(value: &str) -> String {
    value
        .replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}
