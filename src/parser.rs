//! Untrusted JSON to validated [`AnnouncementsData`].
//!
//! Structure is checked before fields: `blocks` must be an array and every
//! block's `messages` must be an array of 1 to 16 entries before any
//! [`Message`] is built. A single bad field rejects the whole payload.

use serde_json::{Map, Value};

use crate::model::{AnnouncementsData, Message, MessageBlock};
use crate::validation::{check_count, ValidationError, ValidationReason, BLOCK_MAX_MESSAGES};

/// Validate and sanitize a decoded announcements payload.
pub fn parse_announcements(value: &Value) -> Result<AnnouncementsData, ValidationError> {
    let root = as_object(value, "")?;

    let raw_blocks = array_field(root, "blocks")?;
    let mut blocks = Vec::with_capacity(raw_blocks.len());
    for (index, raw_block) in raw_blocks.iter().enumerate() {
        let path = format!("blocks[{index}]");
        blocks.push(parse_block(raw_block).map_err(|e| e.at(&path))?);
    }

    let popup = match root.get("popup") {
        Some(Value::Bool(popup)) => *popup,
        Some(_) => {
            return Err(ValidationError::new(
                "popup",
                ValidationReason::WrongType { expected: "boolean" },
            ));
        }
        None => return Err(ValidationError::new("popup", ValidationReason::MissingField)),
    };
    let timestamp = string_field(root, "timestamp")?;

    Ok(AnnouncementsData::new(popup, timestamp, blocks))
}

/// Decode a response body and validate it.
pub fn parse_announcements_str(body: &str) -> Result<AnnouncementsData, ValidationError> {
    let value: Value = serde_json::from_str(body).map_err(|_| {
        ValidationError::new("", ValidationReason::WrongType { expected: "JSON document" })
    })?;
    parse_announcements(&value)
}

fn parse_block(value: &Value) -> Result<MessageBlock, ValidationError> {
    let block = as_object(value, "")?;

    let raw_messages = array_field(block, "messages")?;
    check_count("messages", raw_messages.len(), 1, BLOCK_MAX_MESSAGES)?;

    let mut messages = Vec::with_capacity(raw_messages.len());
    for (index, raw_message) in raw_messages.iter().enumerate() {
        let path = format!("messages[{index}]");
        messages.push(parse_message(raw_message).map_err(|e| e.at(&path))?);
    }

    let title = string_field(block, "title")?;
    MessageBlock::new(title, messages)
}

fn parse_message(value: &Value) -> Result<Message, ValidationError> {
    let message = as_object(value, "")?;
    Message::new(
        string_field(message, "username")?,
        string_field(message, "timestamp")?,
        string_field(message, "expires")?,
        string_field(message, "level")?,
        string_field(message, "message")?,
    )
}

fn as_object<'a>(value: &'a Value, field: &str) -> Result<&'a Map<String, Value>, ValidationError> {
    value.as_object().ok_or_else(|| {
        ValidationError::new(field, ValidationReason::WrongType { expected: "object" })
    })
}

fn array_field<'a>(
    object: &'a Map<String, Value>,
    field: &str,
) -> Result<&'a Vec<Value>, ValidationError> {
    match object.get(field) {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(ValidationError::new(
            field,
            ValidationReason::WrongType { expected: "array" },
        )),
        None => Err(ValidationError::new(field, ValidationReason::MissingField)),
    }
}

fn string_field<'a>(object: &'a Map<String, Value>, field: &str) -> Result<&'a str, ValidationError> {
    match object.get(field) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(ValidationError::new(
            field,
            ValidationReason::WrongType { expected: "string" },
        )),
        None => Err(ValidationError::new(field, ValidationReason::MissingField)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(username: &str) -> Value {
        json!({
            "username": username,
            "timestamp": "2024-03-05T09:07:00",
            "expires": "2-00:00:00",
            "level": "warning",
            "message": "Scheduled <b>maintenance</b>"
        })
    }

    fn payload() -> Value {
        json!({
            "popup": true,
            "timestamp": "2024-03-05T09:00:00",
            "blocks": [
                { "title": "Operations", "messages": [message("ops"), message("admin")] },
                { "title": "Courses", "messages": [message("instructor")] }
            ]
        })
    }

    #[test]
    fn parses_valid_payload() {
        let data = parse_announcements(&payload()).unwrap();
        assert!(data.popup());
        assert_eq!(data.blocks().len(), 2);
        assert_eq!(data.blocks()[0].title(), "Operations");
        assert_eq!(data.blocks()[0].messages()[1].username(), "admin");
        assert_eq!(data.blocks()[1].messages().len(), 1);
    }

    #[test]
    fn rendering_parsed_payload_is_idempotent() {
        let first = parse_announcements(&payload()).unwrap().to_html();
        let second = parse_announcements(&payload()).unwrap().to_html();
        assert_eq!(first, second);
        assert!(first.contains("<b>maintenance</b>"));
    }

    #[test]
    fn empty_blocks_are_allowed() {
        let data = parse_announcements(&json!({
            "popup": false, "timestamp": "t", "blocks": []
        }))
        .unwrap();
        assert_eq!(data.to_html(), "");
    }

    #[test]
    fn rejects_non_object_root() {
        let err = parse_announcements(&json!([1, 2])).unwrap_err();
        assert_eq!(err.reason, ValidationReason::WrongType { expected: "object" });
    }

    #[test]
    fn missing_blocks_fails_before_messages() {
        // popup is also wrong, but the blocks check comes first
        let err = parse_announcements(&json!({ "popup": "yes", "timestamp": 1 })).unwrap_err();
        assert_eq!(err.field, "blocks");
        assert_eq!(err.reason, ValidationReason::MissingField);
    }

    #[test]
    fn non_array_blocks_fails() {
        let err = parse_announcements(&json!({
            "popup": true, "timestamp": "t", "blocks": { "title": "x" }
        }))
        .unwrap_err();
        assert_eq!(err.field, "blocks");
        assert_eq!(err.reason, ValidationReason::WrongType { expected: "array" });
    }

    #[test]
    fn message_count_checked_before_message_fields() {
        // 17 entries, all of them invalid: the count is reported, not the first bad username
        let bad: Vec<Value> = (0..17).map(|_| message("bad name")).collect();
        let err = parse_announcements(&json!({
            "popup": true, "timestamp": "t",
            "blocks": [{ "title": "x", "messages": bad }]
        }))
        .unwrap_err();
        assert_eq!(err.field, "blocks[0].messages");
        assert_eq!(
            err.reason,
            ValidationReason::Length { min: 1, max: 16, actual: 17 }
        );
    }

    #[test]
    fn empty_messages_rejected() {
        let err = parse_announcements(&json!({
            "popup": true, "timestamp": "t",
            "blocks": [{ "title": "x", "messages": [] }]
        }))
        .unwrap_err();
        assert_eq!(err.field, "blocks[0].messages");
    }

    #[test]
    fn one_bad_message_rejects_everything() {
        let mut value = payload();
        value["blocks"][1]["messages"][0]["username"] = json!("has space");
        let err = parse_announcements(&value).unwrap_err();
        assert_eq!(err.field, "blocks[1].messages[0].username");
    }

    #[test]
    fn unknown_level_is_reported_with_path() {
        let mut value = payload();
        value["blocks"][0]["messages"][1]["level"] = json!("panic");
        let err = parse_announcements(&value).unwrap_err();
        assert_eq!(err.field, "blocks[0].messages[1].level");
        assert_eq!(err.reason, ValidationReason::UnknownLevel("panic".into()));
    }

    #[test]
    fn wrong_field_types_are_reported() {
        let mut value = payload();
        value["blocks"][0]["messages"][0]["message"] = json!(42);
        let err = parse_announcements(&value).unwrap_err();
        assert_eq!(err.field, "blocks[0].messages[0].message");
        assert_eq!(err.reason, ValidationReason::WrongType { expected: "string" });

        let mut value = payload();
        value["popup"] = json!("true");
        let err = parse_announcements(&value).unwrap_err();
        assert_eq!(err.field, "popup");
    }

    #[test]
    fn long_title_rejected() {
        let mut value = payload();
        value["blocks"][0]["title"] = json!("t".repeat(129));
        let err = parse_announcements(&value).unwrap_err();
        assert_eq!(err.field, "blocks[0].title");
    }

    #[test]
    fn invalid_json_body_is_a_validation_error() {
        let err = parse_announcements_str("<html>502</html>").unwrap_err();
        assert_eq!(err.field, "");
        assert!(parse_announcements_str(&payload().to_string()).is_ok());
    }
}
