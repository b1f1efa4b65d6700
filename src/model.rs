//! Validated announcement data model.
//!
//! Values are built once per poll from untrusted input, validated eagerly and
//! sanitized before storage. They are immutable afterwards; the only thing a
//! poll cycle keeps is the rendered HTML.

use std::fmt;

use crate::sanitize::{sanitize, SanitizeMode};
use crate::validation::{
    self, TimestampParts, ValidationError, ValidationReason, BLOCK_MAX_MESSAGES,
    MESSAGE_MAX_CHARS, TITLE_MAX_CHARS,
};

/// Sanitization applied to each free-text field.
const MESSAGE_MODE: SanitizeMode = SanitizeMode::Html;
const TITLE_MODE: SanitizeMode = SanitizeMode::Html;

/// Severity of a single announcement message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
    Critical,
}

impl Level {
    pub const ALL: [Level; 6] = [
        Level::Debug,
        Level::Info,
        Level::Notice,
        Level::Warning,
        Level::Error,
        Level::Critical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Notice => "notice",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Critical => "critical",
        }
    }

    /// Parse a level name. Matching is exact (lowercase only).
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        Self::ALL
            .into_iter()
            .find(|level| level.as_str() == value)
            .ok_or_else(|| {
                ValidationError::new("level", ValidationReason::UnknownLevel(value.to_string()))
            })
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One announcement line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    username: String,
    timestamp: String,
    timestamp_parts: TimestampParts,
    expires: String,
    level: Level,
    message: String,
}

impl Message {
    /// Validate every field and sanitize it for storage.
    ///
    /// Fails on the first violated field; nothing is constructed on failure.
    pub fn new(
        username: &str,
        timestamp: &str,
        expires: &str,
        level: &str,
        message: &str,
    ) -> Result<Self, ValidationError> {
        validation::check_username(username)?;
        let timestamp_parts = validation::check_timestamp(timestamp)?;
        validation::check_expires(expires)?;
        let level = Level::parse(level)?;
        validation::check_length("message", message, 1, MESSAGE_MAX_CHARS)?;

        Ok(Self {
            username: sanitize(username, SanitizeMode::Text),
            timestamp: sanitize(timestamp, SanitizeMode::Text),
            timestamp_parts,
            expires: sanitize(expires, SanitizeMode::Text),
            level,
            message: sanitize(message, MESSAGE_MODE),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    /// Stored but not enforced client-side; expiry is the server's concern.
    pub fn expires(&self) -> &str {
        &self.expires
    }

    pub fn level(&self) -> Level {
        self.level
    }

    /// Sanitized HTML body.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Timestamp as shown in the table: date plus hours and minutes.
    pub fn display_timestamp(&self) -> String {
        let TimestampParts { date, hour, minute } = &self.timestamp_parts;
        format!("{date} {hour}:{minute}")
    }

    /// One table row: timestamp, level, spacer, message.
    pub fn to_html(&self) -> String {
        let level = self.level.as_str();
        format!(
            "<tr class=\"announcement-row\">\
             <td class=\"announcement-timestamp\">{}</td>\
             <td class=\"announcement-level announcement-level-{level}\">{level}</td>\
             <td class=\"announcement-spacer\"></td>\
             <td class=\"announcement-message\">{}</td>\
             </tr>",
            self.display_timestamp(),
            self.message
        )
    }
}

/// A titled group of messages, rendered as one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBlock {
    title: String,
    messages: Vec<Message>,
}

impl MessageBlock {
    /// The server currently sends at most 5 messages per block; anything up to 16 is accepted.
    pub fn new(title: &str, messages: Vec<Message>) -> Result<Self, ValidationError> {
        validation::check_length("title", title, 1, TITLE_MAX_CHARS)?;
        validation::check_count("messages", messages.len(), 1, BLOCK_MAX_MESSAGES)?;
        Ok(Self {
            title: sanitize(title, TITLE_MODE),
            messages,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn to_html(&self) -> String {
        if self.messages.is_empty() {
            return String::new();
        }
        let rows: String = self.messages.iter().map(Message::to_html).collect();
        format!(
            "<table class=\"announcement-block\">\
             <tr><th class=\"announcement-title\" colspan=\"4\">{}</th></tr>\
             {rows}\
             </table>",
            self.title
        )
    }
}

/// A whole announcements payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncementsData {
    popup: bool,
    timestamp: String,
    blocks: Vec<MessageBlock>,
}

impl AnnouncementsData {
    /// `timestamp` is stored escaped; it is not checked against a format.
    pub fn new(popup: bool, timestamp: &str, blocks: Vec<MessageBlock>) -> Self {
        Self {
            popup,
            timestamp: sanitize(timestamp, SanitizeMode::Text),
            blocks,
        }
    }

    /// Whether the server asks for the dialog to open as soon as new content arrives.
    pub fn popup(&self) -> bool {
        self.popup
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn blocks(&self) -> &[MessageBlock] {
        &self.blocks
    }

    /// Blocks in payload order inside one container; empty when there are no blocks.
    pub fn to_html(&self) -> String {
        if self.blocks.is_empty() {
            return String::new();
        }
        let blocks: String = self.blocks.iter().map(MessageBlock::to_html).collect();
        format!("<div class=\"announcements\">{blocks}</div>")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(level: &str, text: &str) -> Message {
        Message::new("admin", "2024-03-05T09:07:59.5", "1-00:00:00", level, text).unwrap()
    }

    #[test]
    fn message_accepts_valid_fields() {
        let m = msg("warning", "Maintenance tonight");
        assert_eq!(m.username(), "admin");
        assert_eq!(m.level(), Level::Warning);
        assert_eq!(m.expires(), "1-00:00:00");
        assert_eq!(m.message(), "Maintenance tonight");
    }

    #[test]
    fn message_rejects_each_invalid_field() {
        let ok = ("admin", "2024-03-05T09:07", "1-00:00:00", "info", "hi");

        let err = Message::new(&"u".repeat(33), ok.1, ok.2, ok.3, ok.4).unwrap_err();
        assert_eq!(err.field, "username");

        let err = Message::new("jane doe", ok.1, ok.2, ok.3, ok.4).unwrap_err();
        assert_eq!(err.field, "username");

        let err = Message::new(ok.0, "05/03/2024", ok.2, ok.3, ok.4).unwrap_err();
        assert_eq!(err.field, "timestamp");

        let err = Message::new(ok.0, ok.1, "tomorrow", ok.3, ok.4).unwrap_err();
        assert_eq!(err.field, "expires");

        let err = Message::new(ok.0, ok.1, ok.2, "fatal", ok.4).unwrap_err();
        assert_eq!(err.reason, ValidationReason::UnknownLevel("fatal".into()));

        let err = Message::new(ok.0, ok.1, ok.2, ok.3, "").unwrap_err();
        assert_eq!(err.field, "message");

        let err = Message::new(ok.0, ok.1, ok.2, ok.3, &"x".repeat(1025)).unwrap_err();
        assert_eq!(
            err.reason,
            ValidationReason::Length { min: 1, max: 1024, actual: 1025 }
        );
    }

    #[test]
    fn level_parsing_is_exact() {
        for level in Level::ALL {
            assert_eq!(Level::parse(level.as_str()).unwrap(), level);
        }
        assert!(Level::parse("WARNING").is_err());
        assert!(Level::parse("warn").is_err());
        assert!(Level::parse("").is_err());
    }

    #[test]
    fn message_body_is_sanitized() {
        let m = msg("info", "<b>Hi</b><script>alert(1)</script>");
        assert_eq!(m.message(), "<b>Hi</b>");
    }

    #[test]
    fn message_row_truncates_seconds() {
        let html = msg("critical", "Down").to_html();
        assert!(html.starts_with("<tr"));
        assert!(html.contains("<td class=\"announcement-timestamp\">2024-03-05 09:07</td>"));
        assert!(html.contains(">critical</td>"));
        assert!(html.contains("<td class=\"announcement-spacer\"></td>"));
        assert!(html.contains("<td class=\"announcement-message\">Down</td>"));
        assert!(!html.contains(":59"));
    }

    #[test]
    fn block_enforces_message_count() {
        let err = MessageBlock::new("Empty", vec![]).unwrap_err();
        assert_eq!(err.field, "messages");

        let many = vec![msg("info", "x"); 17];
        let err = MessageBlock::new("Too many", many).unwrap_err();
        assert_eq!(
            err.reason,
            ValidationReason::Length { min: 1, max: 16, actual: 17 }
        );

        assert!(MessageBlock::new("Max", vec![msg("info", "x"); 16]).is_ok());
    }

    #[test]
    fn block_enforces_title_length() {
        let one = vec![msg("info", "x")];
        assert_eq!(MessageBlock::new("", one.clone()).unwrap_err().field, "title");
        assert!(MessageBlock::new(&"t".repeat(129), one.clone()).is_err());
        assert!(MessageBlock::new(&"t".repeat(128), one).is_ok());
    }

    #[test]
    fn block_renders_messages_in_order() {
        let block = MessageBlock::new(
            "Cluster <em>status</em>",
            vec![msg("info", "first"), msg("error", "second")],
        )
        .unwrap();
        let html = block.to_html();
        assert!(html.contains("<th class=\"announcement-title\" colspan=\"4\">Cluster <em>status</em></th>"));
        let first = html.find("first").unwrap();
        let second = html.find("second").unwrap();
        assert!(first < second);
    }

    #[test]
    fn data_without_blocks_renders_nothing() {
        let data = AnnouncementsData::new(true, "now", vec![]);
        assert_eq!(data.to_html(), "");
    }

    #[test]
    fn data_escapes_timestamp() {
        let data = AnnouncementsData::new(false, "<i>now</i>", vec![]);
        assert_eq!(data.timestamp(), "&lt;i&gt;now&lt;/i&gt;");
    }

    #[test]
    fn data_rendering_is_deterministic() {
        let block = MessageBlock::new("News", vec![msg("notice", "hello")]).unwrap();
        let data = AnnouncementsData::new(false, "2024-03-05T09:07", vec![block.clone(), block]);
        let html = data.to_html();
        assert!(html.starts_with("<div class=\"announcements\"><table"));
        assert_eq!(html.matches("<table").count(), 2);
        assert_eq!(html, data.to_html());
    }
}
