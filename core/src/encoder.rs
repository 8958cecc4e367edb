//! Payload encoder: `Method` parameters to a wire-ready `RequestBody`.
//!
//! # Design
//! Pure and table-driven. The parameter struct is serialized to an ordered
//! JSON map (declaration order), validated against `Method::REQUIRED`, then
//! classified: if any of `Method::FILE_FIELDS` is present the whole call is
//! multipart, otherwise it is a JSON body. The choice depends only on field
//! presence.

use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::http::RequestBody;
use crate::input_file::InputFile;
use crate::methods::Method;
use crate::multipart::Form;

const REPLY_MARKUP: &str = "reply_markup";

/// Validate and encode `params` for `M`.
pub fn encode<M: Method>(params: &M) -> Result<RequestBody, ValidationError> {
    let fields = to_map(params)?;
    validate(params, &fields)?;

    if wants_multipart::<M>(&fields) {
        Ok(RequestBody::Multipart(to_form(params, fields)?))
    } else {
        let json = serde_json::to_string(&fields).map_err(|e| ValidationError::Serialize {
            method: M::NAME,
            message: e.to_string(),
        })?;
        Ok(RequestBody::Json(json))
    }
}

/// Whether any declared file field is present.
pub fn wants_multipart<M: Method>(fields: &Map<String, Value>) -> bool {
    M::FILE_FIELDS.iter().any(|f| fields.contains_key(*f))
}

fn to_map<M: Method>(params: &M) -> Result<Map<String, Value>, ValidationError> {
    let serialize_err = |message: String| ValidationError::Serialize {
        method: M::NAME,
        message,
    };
    match serde_json::to_value(params).map_err(|e| serialize_err(e.to_string()))? {
        Value::Object(map) => Ok(map),
        other => Err(serialize_err(format!("expected an object, got {other}"))),
    }
}

fn validate<M: Method>(params: &M, fields: &Map<String, Value>) -> Result<(), ValidationError> {
    // File values and method checks first: an empty reference and a
    // non-finite float both serialize to a blank value.
    for field in M::FILE_FIELDS {
        if let Some(reason) = params.input_file(field).and_then(InputFile::unsupported_reason) {
            return Err(ValidationError::UnsupportedFile {
                method: M::NAME,
                field: field.to_string(),
                reason,
            });
        }
    }

    params.check()?;

    for field in M::REQUIRED {
        if fields.get(*field).map_or(true, is_blank) {
            return Err(ValidationError::MissingField {
                method: M::NAME,
                field: field.to_string(),
            });
        }
    }

    if fields.get(REPLY_MARKUP).is_some_and(|v| !v.is_object()) {
        return Err(ValidationError::InvalidField {
            method: M::NAME,
            field: REPLY_MARKUP.to_string(),
            reason: "must be a JSON object".to_string(),
        });
    }

    Ok(())
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn to_form<M: Method>(params: &M, fields: Map<String, Value>) -> Result<Form, ValidationError> {
    let mut form = Form::new();
    for (name, value) in fields {
        if M::FILE_FIELDS.iter().any(|f| *f == name) {
            let file = params
                .input_file(&name)
                .ok_or_else(|| ValidationError::UnsupportedFile {
                    method: M::NAME,
                    field: name.clone(),
                    reason: "serialized without a file value",
                })?;
            match file {
                InputFile::FileId(reference) | InputFile::Url(reference) => {
                    form.text(&name, reference.as_str());
                }
                InputFile::Upload {
                    file_name,
                    mime,
                    bytes,
                } => {
                    form.file(&name, file_name.as_str(), mime.clone(), bytes.clone());
                }
            }
            continue;
        }
        if let Some(text) = text_value(value) {
            form.text(&name, text);
        }
    }
    Ok(form)
}

/// String form of a non-file field; `None` for null.
fn text_value(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        structured @ (Value::Array(_) | Value::Object(_)) => Some(structured.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use serde_json::json;

    use super::*;
    use crate::methods::{
        BanChatMember, GetMe, SendDocument, SendLocation, SendMessage, SendPhoto, SendPoll,
        SendVoice,
    };
    use crate::multipart::PartValue;
    use crate::types::{ChatId, ParseMode, ReplyMarkup};

    fn json_body(body: &RequestBody) -> Value {
        serde_json::from_str(body.as_json().expect("json body")).unwrap()
    }

    #[test]
    fn send_message_is_json_verbatim() {
        let body = encode(&SendMessage::new(42, "hi")).unwrap();
        assert!(!body.is_multipart());
        assert_eq!(body.as_json(), Some(r#"{"chat_id":42,"text":"hi"}"#));
    }

    #[test]
    fn send_photo_with_upload_is_three_ordered_parts() {
        let mut params = SendPhoto::new(42, InputFile::bytes("cat.jpg", Bytes::from_static(b"JPEG")));
        params.caption = Some("x".to_string());
        let body = encode(&params).unwrap();
        let form = body.as_form().expect("multipart body");
        assert_eq!(form.names(), vec!["chat_id", "photo", "caption"]);
        assert!(form.get("parse_mode").is_none());
        assert_eq!(form.get("chat_id").unwrap().as_text(), Some("42"));
        assert_eq!(
            form.get("photo").unwrap().value,
            PartValue::File {
                file_name: "cat.jpg".to_string(),
                mime: Some("image/jpeg".to_string()),
                bytes: Bytes::from_static(b"JPEG"),
            }
        );
    }

    #[test]
    fn file_reference_forces_multipart_and_passes_through() {
        let params = SendPhoto::new(42, InputFile::url("https://example.com/cat.jpg"));
        let body = encode(&params).unwrap();
        let form = body.as_form().expect("multipart body");
        let photo = form.get("photo").unwrap();
        assert!(!photo.is_file());
        assert_eq!(photo.as_text(), Some("https://example.com/cat.jpg"));
    }

    #[test]
    fn scalars_are_stringified() {
        let mut params = SendPhoto::new(-100123, InputFile::file_id("AgAD"));
        params.parse_mode = Some(ParseMode::Html);
        params.disable_notification = Some(false);
        params.reply_to_message_id = Some(9);
        let body = encode(&params).unwrap();
        let form = body.as_form().unwrap();
        assert_eq!(form.get("chat_id").unwrap().as_text(), Some("-100123"));
        assert_eq!(form.get("parse_mode").unwrap().as_text(), Some("HTML"));
        assert_eq!(form.get("disable_notification").unwrap().as_text(), Some("false"));
        assert_eq!(form.get("reply_to_message_id").unwrap().as_text(), Some("9"));
    }

    #[test]
    fn reply_markup_is_one_json_part() {
        let mut params = SendPhoto::new(1, InputFile::file_id("AgAD"));
        params.reply_markup = Some(ReplyMarkup::inline_keyboard(vec![vec![("Go", "go")]]));
        let body = encode(&params).unwrap();
        let form = body.as_form().unwrap();
        let markup: Value =
            serde_json::from_str(form.get("reply_markup").unwrap().as_text().unwrap()).unwrap();
        assert_eq!(markup["inline_keyboard"][0][0]["text"], "Go");
        assert_eq!(form.names().iter().filter(|n| **n == "reply_markup").count(), 1);
    }

    #[test]
    fn optional_thumbnail_keeps_declared_position() {
        let mut params = SendDocument::new(7, InputFile::bytes("a.txt", Bytes::from_static(b"a")));
        params.caption = Some("doc".to_string());
        params.thumbnail = Some(InputFile::bytes("t.jpg", Bytes::from_static(b"t")));
        let body = encode(&params).unwrap();
        assert_eq!(
            body.as_form().unwrap().names(),
            vec!["chat_id", "document", "thumbnail", "caption"]
        );
    }

    #[test]
    fn encoding_is_stable_across_calls() {
        let mut params = SendPhoto::new(42, InputFile::bytes("p.png", vec![1u8, 2]));
        params.caption = Some("again".to_string());
        params.protect_content = Some(true);
        let first = encode(&params).unwrap();
        let second = encode(&params).unwrap();
        assert_eq!(first.as_form().unwrap().parts(), second.as_form().unwrap().parts());

        let msg = SendMessage::new("@news", "same");
        assert_eq!(encode(&msg).unwrap().as_json(), encode(&msg).unwrap().as_json());
    }

    #[test]
    fn absent_optionals_are_omitted_from_json() {
        let mut params = SendMessage::new(42, "hi");
        params.disable_notification = Some(true);
        let body = json_body(&encode(&params).unwrap());
        let keys: Vec<&String> = body.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["chat_id", "text", "disable_notification"]);
    }

    #[test]
    fn missing_required_text_is_rejected() {
        let err = encode(&SendMessage::new(42, "")).unwrap_err();
        assert_eq!(
            err,
            ValidationError::MissingField {
                method: "sendMessage",
                field: "text".to_string()
            }
        );
    }

    #[test]
    fn empty_username_counts_as_missing_chat() {
        let err = encode(&BanChatMember::new(ChatId::from(""), 5)).unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { ref field, .. } if field == "chat_id"));
    }

    #[test]
    fn empty_poll_options_are_missing() {
        let err = encode(&SendPoll::new(1, "Q?", Vec::<String>::new())).unwrap_err();
        assert!(matches!(err, ValidationError::MissingField { ref field, .. } if field == "options"));
    }

    #[test]
    fn poll_options_are_a_json_array() {
        let body = json_body(&encode(&SendPoll::new(1, "Q?", ["a", "b"])).unwrap());
        assert_eq!(body["options"], json!(["a", "b"]));
    }

    #[test]
    fn empty_file_id_is_unsupported() {
        let err = encode(&SendPhoto::new(1, InputFile::file_id(""))).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::UnsupportedFile { method: "sendPhoto", ref field, .. } if field == "photo"
        ));
    }

    #[test]
    fn empty_url_in_required_file_field_is_unsupported() {
        let err = encode(&SendVoice::new(1, InputFile::url(""))).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::UnsupportedFile { method: "sendVoice", ref field, .. } if field == "voice"
        ));
    }

    #[test]
    fn non_finite_coordinates_are_invalid() {
        let err = encode(&SendLocation::new(1, f64::NAN, 0.0)).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { ref field, .. } if field == "latitude"));
        let err = encode(&SendLocation::new(1, 0.0, f64::INFINITY)).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { ref field, .. } if field == "longitude"));
    }

    #[test]
    fn non_object_reply_markup_is_rejected() {
        let mut params = SendMessage::new(1, "hi");
        params.reply_markup = Some(ReplyMarkup::new(json!("keyboard")));
        let err = encode(&params).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField { ref field, .. } if field == "reply_markup"));
    }

    #[test]
    fn get_me_encodes_empty_object() {
        let body = encode(&GetMe::default()).unwrap();
        assert_eq!(body.as_json(), Some("{}"));
    }
}
