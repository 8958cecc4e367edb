//! Request dispatcher for the Bot API.
//!
//! # Design
//! `Bot` holds only an immutable base URL (built from the token) and a shared
//! `Transport`; calls share no mutable state and may run concurrently from
//! clones of the same `Bot`. Each call is split the same way as the host-does-IO
//! API: `build_request` encodes the parameters into an `HttpRequest`,
//! the transport performs one POST, and `parse_response` turns the
//! `HttpResponse` into the method's result or an `ApiError`. Embedders that
//! own their HTTP stack can use the two halves directly.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, Instrument};

use crate::config::{BotBuilder, Token};
use crate::encoder;
use crate::error::{ApiError, ApiErrorKind, Error, ValidationError};
use crate::http::{HttpRequest, HttpResponse};
use crate::methods::{
    BanChatMember, ForwardMessage, GetMe, Method, SendContact, SendDocument, SendLocation,
    SendMessage, SendPhoto, SendPoll, SendVoice, UnbanChatMember,
};
use crate::transport::Transport;
use crate::types::{ApiResponse, Message, User};

#[derive(Clone)]
pub struct Bot {
    api_url: String,
    base_url: String,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for Bot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bot")
            .field("api_url", &self.api_url)
            .field("token", &"<redacted>")
            .finish_non_exhaustive()
    }
}

impl Bot {
    /// Client for `https://api.telegram.org` over a default `reqwest` transport.
    pub fn new(token: impl Into<String>) -> Result<Self, ValidationError> {
        Self::builder(token).build()
    }

    pub fn builder(token: impl Into<String>) -> BotBuilder {
        BotBuilder::new(token)
    }

    pub(crate) fn from_parts(token: Token, api_url: &str, transport: Arc<dyn Transport>) -> Self {
        let api_url = api_url.trim_end_matches('/').to_string();
        let base_url = format!("{api_url}/bot{}", token.expose());
        Self {
            api_url,
            base_url,
            transport,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Endpoint of `method` for this bot.
    pub fn method_url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    /// Validate and encode `params` into a POST to `<base>/<M::NAME>`.
    pub fn build_request<M: Method>(&self, params: &M) -> Result<HttpRequest, ValidationError> {
        let body = encoder::encode(params)?;
        Ok(HttpRequest::post(self.method_url(M::NAME), body))
    }

    /// Interpret the response to a `M` call.
    pub fn parse_response<M: Method>(&self, response: HttpResponse) -> Result<M::Output, ApiError> {
        parse_envelope(M::NAME, response)
    }

    /// Dispatch `params`: one request, one typed outcome.
    pub async fn call<M: Method>(&self, params: &M) -> Result<M::Output, Error> {
        let span = tracing::debug_span!("bot_call", method = M::NAME);
        self.dispatch(params).instrument(span).await
    }

    async fn dispatch<M: Method>(&self, params: &M) -> Result<M::Output, Error> {
        let request = self.build_request(params)?;
        debug!(multipart = request.body.is_multipart(), "sending request");

        let response = self
            .transport
            .execute(request)
            .await
            .map_err(|e| ApiError::transport(M::NAME, e.to_string()))?;
        debug!(status = response.status, "received response");

        Ok(self.parse_response::<M>(response)?)
    }

    pub async fn send_message(&self, params: &SendMessage) -> Result<Message, Error> {
        self.call(params).await
    }

    pub async fn send_photo(&self, params: &SendPhoto) -> Result<Message, Error> {
        self.call(params).await
    }

    pub async fn send_voice(&self, params: &SendVoice) -> Result<Message, Error> {
        self.call(params).await
    }

    pub async fn send_document(&self, params: &SendDocument) -> Result<Message, Error> {
        self.call(params).await
    }

    pub async fn send_location(&self, params: &SendLocation) -> Result<Message, Error> {
        self.call(params).await
    }

    pub async fn send_contact(&self, params: &SendContact) -> Result<Message, Error> {
        self.call(params).await
    }

    pub async fn send_poll(&self, params: &SendPoll) -> Result<Message, Error> {
        self.call(params).await
    }

    pub async fn forward_message(&self, params: &ForwardMessage) -> Result<Message, Error> {
        self.call(params).await
    }

    pub async fn get_me(&self) -> Result<User, Error> {
        self.call(&GetMe::default()).await
    }

    pub async fn ban_chat_member(&self, params: &BanChatMember) -> Result<bool, Error> {
        self.call(params).await
    }

    pub async fn unban_chat_member(&self, params: &UnbanChatMember) -> Result<bool, Error> {
        self.call(params).await
    }
}

/// Map a raw response onto the envelope contract: `ok: true` with a
/// decodable `result` is success, everything else is an `ApiError`.
fn parse_envelope<T: DeserializeOwned>(method: &str, response: HttpResponse) -> Result<T, ApiError> {
    let success_status = (200..300).contains(&response.status);

    let envelope: ApiResponse<Value> = match serde_json::from_str(&response.body) {
        Ok(envelope) => envelope,
        Err(e) if success_status => {
            return Err(ApiError::decode(
                method,
                response.status,
                format!("malformed response body: {e}"),
            ));
        }
        Err(_) => {
            return Err(ApiError {
                kind: ApiErrorKind::Rejected,
                method: method.to_string(),
                message: format!("HTTP {}: {}", response.status, response.body.trim()),
                http_status: Some(response.status),
                error_code: None,
                description: None,
                parameters: None,
            });
        }
    };

    if !envelope.ok || !success_status {
        let message = envelope
            .description
            .clone()
            .unwrap_or_else(|| format!("request rejected with HTTP {}", response.status));
        return Err(ApiError {
            kind: ApiErrorKind::Rejected,
            method: method.to_string(),
            message,
            http_status: Some(response.status),
            error_code: envelope.error_code,
            description: envelope.description,
            parameters: envelope.parameters,
        });
    }

    let result = envelope
        .result
        .ok_or_else(|| ApiError::decode(method, response.status, "response has no result"))?;
    serde_json::from_value(result).map_err(|e| {
        ApiError::decode(
            method,
            response.status,
            format!("result does not match the expected shape: {e}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::error::TransportError;
    use crate::input_file::InputFile;
    use crate::types::ChatId;

    const TOKEN: &str = "123:abc";

    fn bot() -> Bot {
        Bot::builder(TOKEN)
            .api_url("http://localhost:8081")
            .build()
            .unwrap()
    }

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    /// Transport double that records requests and replies with a fixed body.
    struct Canned {
        status: u16,
        body: String,
        seen: Mutex<Vec<HttpRequest>>,
    }

    impl Canned {
        fn new(status: u16, body: Value) -> Self {
            Self {
                status,
                body: body.to_string(),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for Canned {
        async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
            self.seen.lock().unwrap().push(request);
            Ok(response(self.status, &self.body))
        }
    }

    struct Unreachable;

    #[async_trait]
    impl Transport for Unreachable {
        async fn execute(&self, _request: HttpRequest) -> Result<HttpResponse, TransportError> {
            Err(TransportError("connection refused".to_string()))
        }
    }

    #[test]
    fn build_send_message_produces_json_post() {
        let req = bot().build_request(&SendMessage::new(42, "hi")).unwrap();
        assert_eq!(req.url, "http://localhost:8081/bot123:abc/sendMessage");
        assert_eq!(
            req.headers,
            vec![("content-type".to_string(), "application/json".to_string())]
        );
        let body: Value = serde_json::from_str(req.body.as_json().unwrap()).unwrap();
        assert_eq!(body, json!({"chat_id": 42, "text": "hi"}));
    }

    #[test]
    fn build_send_photo_produces_multipart_post() {
        let params = SendPhoto::new(42, InputFile::bytes("a.jpg", vec![0xffu8, 0xd8]));
        let req = bot().build_request(&params).unwrap();
        assert_eq!(req.url, "http://localhost:8081/bot123:abc/sendPhoto");
        let form = req.body.as_form().unwrap();
        assert_eq!(
            req.header("Content-Type"),
            Some(format!("multipart/form-data; boundary={}", form.boundary()).as_str())
        );
    }

    #[test]
    fn token_never_appears_in_body() {
        let mut params = SendPhoto::new(42, InputFile::file_id("AgAD"));
        params.caption = Some("caption".to_string());
        let req = bot().build_request(&params).unwrap();
        let bytes = req.body.to_bytes();
        assert!(!String::from_utf8_lossy(&bytes).contains(TOKEN));
    }

    #[test]
    fn trailing_slash_on_api_url_is_stripped() {
        let bot = Bot::builder(TOKEN).api_url("http://localhost:8081/").build().unwrap();
        assert_eq!(bot.method_url("getMe"), "http://localhost:8081/bot123:abc/getMe");
        assert_eq!(bot.api_url(), "http://localhost:8081");
    }

    #[test]
    fn default_api_url_is_telegram() {
        let bot = Bot::new(TOKEN).unwrap();
        assert_eq!(bot.method_url("getMe"), "https://api.telegram.org/bot123:abc/getMe");
    }

    #[test]
    fn debug_output_hides_token() {
        assert!(!format!("{:?}", bot()).contains("abc"));
    }

    #[test]
    fn parse_message_success() {
        let body = r#"{"ok":true,"result":{"message_id":7,"chat":{"id":42,"type":"private"}}}"#;
        let msg = bot()
            .parse_response::<SendMessage>(response(200, body))
            .unwrap();
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"message_id": 7, "chat": {"id": 42, "type": "private"}})
        );
    }

    #[test]
    fn parse_boolean_result() {
        let banned = bot()
            .parse_response::<BanChatMember>(response(200, r#"{"ok":true,"result":true}"#))
            .unwrap();
        assert!(banned);
    }

    #[test]
    fn parse_rejection_keeps_remote_fields() {
        let body = r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#;
        let err = bot()
            .parse_response::<SendMessage>(response(400, body))
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Rejected);
        assert_eq!(err.method, "sendMessage");
        assert!(err.message.contains("chat not found"));
        assert_eq!(err.status(), Some(400));
        assert_eq!(err.description.as_deref(), Some("Bad Request: chat not found"));
    }

    #[test]
    fn parse_ok_false_with_2xx_is_still_rejected() {
        let body = r#"{"ok":false,"error_code":403,"description":"Forbidden: bot was blocked by the user"}"#;
        let err = bot()
            .parse_response::<SendMessage>(response(200, body))
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Rejected);
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn parse_flood_control_exposes_retry_after() {
        let body = r#"{"ok":false,"error_code":429,"description":"Too Many Requests: retry after 5","parameters":{"retry_after":5}}"#;
        let err = bot()
            .parse_response::<SendMessage>(response(429, body))
            .unwrap_err();
        assert_eq!(err.retry_after(), Some(5));
    }

    #[test]
    fn parse_non_json_error_page() {
        let err = bot()
            .parse_response::<GetMe>(response(502, "<html>Bad Gateway</html>"))
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Rejected);
        assert_eq!(err.status(), Some(502));
        assert!(err.message.contains("Bad Gateway"));
    }

    #[test]
    fn parse_malformed_success_body() {
        let err = bot()
            .parse_response::<GetMe>(response(200, "not json"))
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Decode);
    }

    #[test]
    fn parse_missing_result_is_decode_error() {
        let err = bot()
            .parse_response::<GetMe>(response(200, r#"{"ok":true}"#))
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Decode);
    }

    #[test]
    fn parse_result_of_wrong_shape_is_decode_error() {
        let err = bot()
            .parse_response::<BanChatMember>(response(200, r#"{"ok":true,"result":{"id":1}}"#))
            .unwrap_err();
        assert_eq!(err.kind, ApiErrorKind::Decode);
        assert_eq!(err.method, "banChatMember");
    }

    #[tokio::test]
    async fn call_issues_one_request_and_decodes() {
        let transport = Arc::new(Canned::new(
            200,
            json!({"ok": true, "result": {"id": 99, "is_bot": true, "first_name": "Helper", "username": "helper_bot"}}),
        ));
        let bot = Bot::from_parts(
            Token::new(TOKEN).unwrap(),
            "http://localhost:8081",
            transport.clone(),
        );

        let me = bot.get_me().await.unwrap();
        assert_eq!(me.id, 99);
        assert_eq!(me.username.as_deref(), Some("helper_bot"));

        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].url, "http://localhost:8081/bot123:abc/getMe");
        assert_eq!(seen[0].body.as_json(), Some("{}"));
    }

    #[tokio::test]
    async fn validation_error_skips_the_network() {
        let transport = Arc::new(Canned::new(200, json!({"ok": true, "result": true})));
        let bot = Bot::from_parts(Token::new(TOKEN).unwrap(), "http://x", transport.clone());

        let err = bot
            .ban_chat_member(&BanChatMember::new(ChatId::from(" "), 1))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::MissingField { .. })));
        assert!(err.as_api().is_none());
        assert!(transport.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn transport_failure_becomes_api_error() {
        let bot = Bot::builder(TOKEN).transport(Unreachable).build().unwrap();
        let err = bot.send_message(&SendMessage::new(1, "hi")).await.unwrap_err();
        let api = err.as_api().expect("api error");
        assert_eq!(api.kind, ApiErrorKind::Transport);
        assert_eq!(api.method, "sendMessage");
        assert!(api.message.contains("connection refused"));
    }
}
