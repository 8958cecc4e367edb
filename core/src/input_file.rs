//! File values for binary-capable fields (`photo`, `voice`, `document`,
//! `thumbnail`).

use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Content for a file field.
///
/// `FileId` and `Url` are sent verbatim; the remote resolves them itself.
/// `Upload` carries the content in a reference-counted buffer, so encoding a
/// call clones the handle without copying or consuming the caller's data,
/// and `ReqwestTransport` streams that same buffer onto the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputFile {
    /// Identifier of a file already stored on the remote.
    FileId(String),
    /// HTTP URL the remote downloads the file from.
    Url(String),
    /// Content uploaded with the request.
    Upload {
        file_name: String,
        mime: Option<String>,
        bytes: Bytes,
    },
}

impl InputFile {
    pub fn file_id(id: impl Into<String>) -> Self {
        InputFile::FileId(id.into())
    }

    pub fn url(url: impl Into<String>) -> Self {
        InputFile::Url(url.into())
    }

    /// In-memory upload; the MIME type is guessed from `file_name`.
    pub fn bytes(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        let file_name = file_name.into();
        let mime = mime_guess::from_path(&file_name)
            .first()
            .map(|m| m.essence_str().to_string());
        InputFile::Upload {
            file_name,
            mime,
            bytes: bytes.into(),
        }
    }

    /// Read a local file into an upload.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let content = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());
        Ok(Self::bytes(file_name, content))
    }

    /// Override the guessed MIME type of an upload. No-op for references.
    pub fn with_mime(mut self, value: impl Into<String>) -> Self {
        if let InputFile::Upload { mime, .. } = &mut self {
            *mime = Some(value.into());
        }
        self
    }

    /// Why this value cannot be sent, if it cannot.
    pub(crate) fn unsupported_reason(&self) -> Option<&'static str> {
        match self {
            InputFile::FileId(id) if id.trim().is_empty() => Some("empty file identifier"),
            InputFile::Url(url) if url.trim().is_empty() => Some("empty URL"),
            InputFile::Upload { file_name, .. } if file_name.trim().is_empty() => {
                Some("upload without a file name")
            }
            _ => None,
        }
    }
}

/// References serialize to their string; an upload serializes to its file
/// name. The encoder never places an upload in a JSON body.
impl Serialize for InputFile {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            InputFile::FileId(s) | InputFile::Url(s) => serializer.serialize_str(s),
            InputFile::Upload { file_name, .. } => serializer.serialize_str(file_name),
        }
    }
}

/// Strings starting with `http://` or `https://` become `Url`, other
/// strings `FileId`; `{ "file_name", "mime"?, "bytes": [..] }` becomes an
/// upload.
impl<'de> Deserialize<'de> for InputFile {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Reference(String),
            Upload {
                file_name: String,
                mime: Option<String>,
                bytes: Vec<u8>,
            },
        }

        Ok(match Raw::deserialize(deserializer)? {
            Raw::Reference(s) if s.starts_with("http://") || s.starts_with("https://") => {
                InputFile::Url(s)
            }
            Raw::Reference(s) => InputFile::FileId(s),
            Raw::Upload {
                file_name,
                mime: Some(mime),
                bytes,
            } => InputFile::bytes(file_name, bytes).with_mime(mime),
            Raw::Upload {
                file_name, bytes, ..
            } => InputFile::bytes(file_name, bytes),
        })
    }
}
