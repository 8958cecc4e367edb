//! In-process stand-in for the Telegram Bot API.
//!
//! Accepts `POST /bot<token>/<method>` with either a JSON or a
//! `multipart/form-data` body, records every request, and answers with the
//! same `{ ok, result | error_code, description }` envelope the real service
//! uses. A few ids are reserved to provoke failures:
//! `UNKNOWN_CHAT_ID` is never found, `REVOKED_TOKEN` is unauthorized, and
//! banning `BOT_USER_ID` is refused.

use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::to_bytes,
    extract::{FromRequest, Multipart, Path, Request, State},
    http::{header, StatusCode},
    routing::post,
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

pub const UNKNOWN_CHAT_ID: i64 = 404;
pub const BOT_USER_ID: i64 = 1000;
pub const REVOKED_TOKEN: &str = "000:revoked";

const MAX_BODY: usize = 50 * 1024 * 1024;

/// One named part of a multipart request.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RecordedPart {
    pub name: String,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

impl RecordedPart {
    pub fn is_file(&self) -> bool {
        self.file_name.is_some()
    }

    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.data).ok()
    }
}

/// A request as the mock received it.
#[derive(Clone, Debug, Serialize)]
pub struct RecordedRequest {
    pub token: String,
    pub method: String,
    pub content_type: String,
    /// Decoded JSON body, for JSON requests.
    pub json: Option<Map<String, Value>>,
    /// Parts in arrival order, for multipart requests.
    pub parts: Vec<RecordedPart>,
}

impl RecordedRequest {
    pub fn is_multipart(&self) -> bool {
        self.content_type.starts_with("multipart/form-data")
    }

    pub fn part_names(&self) -> Vec<&str> {
        self.parts.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn part(&self, name: &str) -> Option<&RecordedPart> {
        self.parts.iter().find(|p| p.name == name)
    }
}

#[derive(Default)]
pub struct MockState {
    requests: RwLock<Vec<RecordedRequest>>,
    sent: RwLock<HashSet<(i64, i64)>>,
    next_message_id: AtomicI64,
}

impl MockState {
    pub async fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.read().await.clone()
    }
}

pub type Db = Arc<MockState>;

pub fn app() -> Router {
    router(Db::default())
}

pub fn router(db: Db) -> Router {
    Router::new()
        .route("/{bot}/{method}", post(dispatch))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with_state(listener: TcpListener, db: Db) -> Result<(), std::io::Error> {
    axum::serve(listener, router(db)).await
}

type Reply = (StatusCode, Json<Value>);

fn ok(result: Value) -> Reply {
    (StatusCode::OK, Json(json!({ "ok": true, "result": result })))
}

fn fail(status: StatusCode, description: &str) -> Reply {
    (
        status,
        Json(json!({
            "ok": false,
            "error_code": status.as_u16(),
            "description": description,
        })),
    )
}

fn bad_request(description: &str) -> Reply {
    fail(StatusCode::BAD_REQUEST, description)
}

async fn dispatch(
    State(db): State<Db>,
    Path((bot, method)): Path<(String, String)>,
    request: Request,
) -> Reply {
    let Some(token) = bot.strip_prefix("bot").map(str::to_string) else {
        return fail(StatusCode::NOT_FOUND, "Not Found");
    };
    let content_type = request
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    let mut recorded = RecordedRequest {
        token: token.clone(),
        method: method.clone(),
        content_type: content_type.clone(),
        json: None,
        parts: Vec::new(),
    };

    let params = if content_type.starts_with("multipart/form-data") {
        match read_multipart(request, &db).await {
            Ok(parts) => {
                let params = params_from_parts(&parts);
                recorded.parts = parts;
                params
            }
            Err(reply) => return reply,
        }
    } else {
        let Ok(bytes) = to_bytes(request.into_body(), MAX_BODY).await else {
            return bad_request("Bad Request: body is too large");
        };
        match serde_json::from_slice::<Map<String, Value>>(&bytes) {
            Ok(map) => {
                recorded.json = Some(map.clone());
                map
            }
            Err(_) if bytes.is_empty() => Map::new(),
            Err(_) => return bad_request("Bad Request: can't parse JSON body"),
        }
    };
    db.requests.write().await.push(recorded);

    if token == REVOKED_TOKEN {
        return fail(StatusCode::UNAUTHORIZED, "Unauthorized");
    }

    match method.as_str() {
        "getMe" => ok(bot_user()),
        "sendMessage" | "sendPhoto" | "sendVoice" | "sendDocument" | "sendLocation"
        | "sendContact" | "sendPoll" | "forwardMessage" => send(&db, &method, &params).await,
        "banChatMember" | "unbanChatMember" => moderate(&params),
        _ => fail(StatusCode::NOT_FOUND, "Not Found: method not found"),
    }
}

async fn read_multipart(request: Request, db: &Db) -> Result<Vec<RecordedPart>, Reply> {
    let mut multipart = Multipart::from_request(request, db)
        .await
        .map_err(|_| bad_request("Bad Request: malformed multipart body"))?;
    let mut parts = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| bad_request("Bad Request: malformed multipart body"))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|_| bad_request("Bad Request: malformed multipart body"))?;
        parts.push(RecordedPart {
            name,
            file_name,
            content_type,
            data: data.to_vec(),
        });
    }
    Ok(parts)
}

/// Flatten parts into the same shape a JSON body would have. Uploaded files
/// become `{"upload": <file name>, "size": <bytes>}`.
fn params_from_parts(parts: &[RecordedPart]) -> Map<String, Value> {
    let mut params = Map::new();
    for part in parts {
        let value = match &part.file_name {
            Some(file_name) => json!({ "upload": file_name, "size": part.data.len() }),
            None => Value::String(part.text().unwrap_or_default().to_string()),
        };
        params.entry(part.name.clone()).or_insert(value);
    }
    params
}

fn int(params: &Map<String, Value>, key: &str) -> Option<i64> {
    match params.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn float(params: &Map<String, Value>, key: &str) -> Option<f64> {
    match params.get(key)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn string(params: &Map<String, Value>, key: &str) -> Option<String> {
    match params.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn flag(params: &Map<String, Value>, key: &str) -> Option<bool> {
    match params.get(key)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// A JSON value or a JSON-encoded multipart text part.
fn structured(params: &Map<String, Value>, key: &str) -> Option<Value> {
    match params.get(key)? {
        Value::String(s) => serde_json::from_str(s).ok(),
        other => Some(other.clone()),
    }
}

fn bot_user() -> Value {
    json!({
        "id": BOT_USER_ID,
        "is_bot": true,
        "first_name": "Mock Bot",
        "username": "mock_bot",
        "can_join_groups": true,
        "can_read_all_group_messages": false,
        "supports_inline_queries": false,
    })
}

/// Resolve `chat_id` (numeric or `@username`) to a chat object.
fn chat(params: &Map<String, Value>, key: &str) -> Result<Value, Reply> {
    if let Some(id) = int(params, key) {
        if id == UNKNOWN_CHAT_ID {
            return Err(bad_request("Bad Request: chat not found"));
        }
        let kind = if id > 0 { "private" } else { "supergroup" };
        return Ok(json!({ "id": id, "type": kind }));
    }
    match string(params, key) {
        Some(name) if name.starts_with('@') => Ok(json!({
            "id": -1_001_000_000_000_i64,
            "type": "channel",
            "username": name.trim_start_matches('@'),
        })),
        Some(_) => Err(bad_request("Bad Request: chat not found")),
        None => Err(bad_request(&format!("Bad Request: {key} is empty"))),
    }
}

fn file_object(params: &Map<String, Value>, key: &str) -> Option<Value> {
    let value = params.get(key)?;
    let file_id = match value {
        Value::String(s) if !s.is_empty() => s.clone(),
        Value::Object(upload) => format!("uploaded-{}", upload["upload"].as_str().unwrap_or("file")),
        _ => return None,
    };
    let mut object = json!({ "file_id": file_id, "file_unique_id": format!("u-{key}") });
    if let Some(size) = value.get("size") {
        object["file_size"] = size.clone();
    }
    if let Some(name) = value.get("upload") {
        object["file_name"] = name.clone();
    }
    Some(object)
}

async fn send(db: &Db, method: &str, params: &Map<String, Value>) -> Reply {
    let target = match chat(params, "chat_id") {
        Ok(target) => target,
        Err(reply) => return reply,
    };
    let chat_id = target["id"].as_i64().unwrap_or_default();
    let message_id = db.next_message_id.fetch_add(1, Ordering::SeqCst) + 1;
    let date = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();

    let mut message = json!({
        "message_id": message_id,
        "from": bot_user(),
        "chat": target,
        "date": date,
    });
    if let Some(caption) = string(params, "caption") {
        message["caption"] = Value::String(caption);
    }

    match method {
        "sendMessage" => match string(params, "text") {
            Some(text) => message["text"] = Value::String(text),
            None => return bad_request("Bad Request: message text is empty"),
        },
        "sendPhoto" => match file_object(params, "photo") {
            Some(photo) => message["photo"] = json!([photo]),
            None => return bad_request("Bad Request: there is no photo in the request"),
        },
        "sendVoice" => match file_object(params, "voice") {
            Some(mut voice) => {
                voice["duration"] = json!(int(params, "duration").unwrap_or(0));
                message["voice"] = voice;
            }
            None => return bad_request("Bad Request: there is no voice in the request"),
        },
        "sendDocument" => match file_object(params, "document") {
            Some(mut document) => {
                if let Some(thumbnail) = file_object(params, "thumbnail") {
                    document["thumbnail"] = thumbnail;
                }
                message["document"] = document;
            }
            None => return bad_request("Bad Request: there is no document in the request"),
        },
        "sendLocation" => match (float(params, "latitude"), float(params, "longitude")) {
            (Some(latitude), Some(longitude)) => {
                message["location"] = json!({ "latitude": latitude, "longitude": longitude });
            }
            _ => return bad_request("Bad Request: wrong latitude or longitude"),
        },
        "sendContact" => match (string(params, "phone_number"), string(params, "first_name")) {
            (Some(phone_number), Some(first_name)) => {
                let mut contact = json!({ "phone_number": phone_number, "first_name": first_name });
                if let Some(last_name) = string(params, "last_name") {
                    contact["last_name"] = Value::String(last_name);
                }
                message["contact"] = contact;
            }
            _ => return bad_request("Bad Request: phone number and first name must be non-empty"),
        },
        "sendPoll" => {
            let question = string(params, "question");
            let options = structured(params, "options").and_then(|v| v.as_array().cloned());
            match (question, options) {
                (Some(question), Some(options)) if options.len() >= 2 => {
                    let options: Vec<Value> = options
                        .into_iter()
                        .map(|text| json!({ "text": text, "voter_count": 0 }))
                        .collect();
                    message["poll"] = json!({
                        "id": format!("poll-{message_id}"),
                        "question": question,
                        "options": options,
                        "total_voter_count": 0,
                        "is_closed": flag(params, "is_closed").unwrap_or(false),
                        "is_anonymous": flag(params, "is_anonymous").unwrap_or(true),
                        "type": string(params, "type").unwrap_or_else(|| "regular".to_string()),
                        "allows_multiple_answers": flag(params, "allows_multiple_answers").unwrap_or(false),
                    });
                }
                _ => return bad_request("Bad Request: poll must have at least 2 options"),
            }
        }
        "forwardMessage" => {
            let from_chat = match chat(params, "from_chat_id") {
                Ok(chat) => chat,
                Err(reply) => return reply,
            };
            let from_id = from_chat["id"].as_i64().unwrap_or_default();
            let original = int(params, "message_id").unwrap_or_default();
            if !db.sent.read().await.contains(&(from_id, original)) {
                return bad_request("Bad Request: message to forward not found");
            }
            message["forward_from_chat"] = from_chat;
            message["forward_from_message_id"] = json!(original);
            message["forward_date"] = json!(date);
        }
        _ => return fail(StatusCode::NOT_FOUND, "Not Found: method not found"),
    }

    db.sent.write().await.insert((chat_id, message_id));
    ok(message)
}

fn moderate(params: &Map<String, Value>) -> Reply {
    if let Err(reply) = chat(params, "chat_id") {
        return reply;
    }
    match int(params, "user_id") {
        Some(BOT_USER_ID) => bad_request("Bad Request: can't restrict self"),
        Some(_) => ok(Value::Bool(true)),
        None => bad_request("Bad Request: user_id is empty"),
    }
}
