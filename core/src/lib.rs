//! Typed async client for the Telegram Bot HTTP API.
//!
//! # Overview
//! Every supported method is a parameter struct implementing [`Method`].
//! [`Bot`] validates and encodes it (JSON, or `multipart/form-data` when a
//! file field is present), performs a single POST through its
//! [`Transport`], and decodes the response envelope into the method's
//! result type or a unified [`Error`].
//!
//! # Design
//! - `Bot` is immutable: a base URL built from the token plus a shared
//!   transport. Clones are cheap and calls never share mutable state.
//! - Encoding is pure and table-driven (`Method::REQUIRED`,
//!   `Method::FILE_FIELDS`); see [`encoder`].
//! - The request/response halves are exposed as plain data
//!   ([`Bot::build_request`], [`Bot::parse_response`]) for embedders that
//!   run their own HTTP stack.
//! - No retries, no rate limiting, no update receiving.
//!
//! ```rust,ignore
//! use tele_sdk::{Bot, InputFile, SendMessage, SendPhoto};
//!
//! let bot = Bot::new("123456:ABC-DEF")?;
//! bot.send_message(&SendMessage::new(42, "hello")).await?;
//!
//! let mut photo = SendPhoto::new(42, InputFile::from_path("cat.jpg").await?);
//! photo.caption = Some("a cat".into());
//! bot.send_photo(&photo).await?;
//! ```

pub mod client;
pub mod config;
pub mod encoder;
pub mod error;
pub mod http;
pub mod input_file;
pub mod methods;
pub mod multipart;
pub mod transport;
pub mod types;

pub use client::Bot;
pub use config::{BotBuilder, Token, DEFAULT_API_URL};
pub use error::{ApiError, ApiErrorKind, Error, TransportError, ValidationError};
pub use http::{HttpRequest, HttpResponse, RequestBody};
pub use input_file::InputFile;
pub use methods::{
    BanChatMember, ForwardMessage, GetMe, Method, SendContact, SendDocument, SendLocation,
    SendMessage, SendPhoto, SendPoll, SendVoice, UnbanChatMember,
};
pub use multipart::{Form, Part, PartValue};
pub use transport::{ReqwestTransport, Transport};
pub use types::{ChatId, Chat, Message, ParseMode, PollType, ReplyMarkup, ResponseParameters, User};
