//! Host UI seam: the status bar item and the modal dialog.
//!
//! Both are owned by the environment embedding the notifier. The poller only
//! talks to them through [`AnnouncementHost`].

use std::io::Write;

use crate::button::ButtonView;

/// Identifier of the status bar item registered by the poller.
pub const STATUS_ITEM_ID: &str = "new-announcement";

/// Title of the announcements dialog.
pub const DIALOG_TITLE: &str = "Announcements";

/// Label of the dialog's only button.
pub const DIALOG_ACK_LABEL: &str = "OK";

/// A modal with a rendered HTML body and a single acknowledgement button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialog {
    pub title: String,
    pub body_html: String,
    pub ack_label: String,
}

impl Dialog {
    pub fn announcements(body_html: &str) -> Self {
        Self {
            title: DIALOG_TITLE.to_string(),
            body_html: body_html.to_string(),
            ack_label: DIALOG_ACK_LABEL.to_string(),
        }
    }
}

/// UI surface provided by the embedding environment.
pub trait AnnouncementHost {
    /// Add a left-aligned item to the status bar. Called at most once per poller.
    fn register_status_item(&mut self, id: &str);

    /// Relabel the registered status item.
    fn update_status_item(&mut self, view: &ButtonView);

    /// Show a modal dialog.
    fn show_dialog(&mut self, dialog: &Dialog);
}

/// Terminal host: status changes and dialogs are written as text.
pub struct ConsoleHost<W: Write> {
    out: W,
}

impl<W: Write> ConsoleHost<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}").and_then(|_| self.out.flush()) {
            tracing::warn!("failed to write to console: {e}");
        }
    }
}

impl<W: Write> AnnouncementHost for ConsoleHost<W> {
    fn register_status_item(&mut self, id: &str) {
        tracing::debug!(id, "status item registered");
    }

    fn update_status_item(&mut self, view: &ButtonView) {
        if view.label.is_empty() {
            return;
        }
        let text = if view.tooltip.is_empty() {
            format!("[{}] {}", view.tone.as_str(), view.label)
        } else {
            format!("[{}] {} ({})", view.tone.as_str(), view.label, view.tooltip)
        };
        self.line(&text);
    }

    fn show_dialog(&mut self, dialog: &Dialog) {
        let text = format!(
            "== {} ==\n{}\n[{}]",
            dialog.title, dialog.body_html, dialog.ack_label
        );
        self.line(&text);
    }
}
