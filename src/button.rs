//! Status bar button: what it shows and when it gets registered.

use std::time::Duration;

use crate::host::{AnnouncementHost, STATUS_ITEM_ID};

/// Connectivity to the announcement service as seen by the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ServiceState {
    #[default]
    Normal,
    /// Fetches are failing; retrying with backoff
    Degraded,
    /// Backoff exhausted; retrying at the base interval
    Failed,
}

/// Colour hint for the status item; the host maps it to its palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonTone {
    Neutral,
    Attention,
    Warning,
    Error,
    Success,
}

impl ButtonTone {
    pub fn as_str(self) -> &'static str {
        match self {
            ButtonTone::Neutral => "neutral",
            ButtonTone::Attention => "attention",
            ButtonTone::Warning => "warning",
            ButtonTone::Error => "error",
            ButtonTone::Success => "success",
        }
    }
}

/// Label, tooltip and tone of the status item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonView {
    pub label: String,
    pub tooltip: String,
    pub tone: ButtonTone,
}

impl ButtonView {
    fn new(label: &str, tooltip: &str, tone: ButtonTone) -> Self {
        Self {
            label: label.to_string(),
            tooltip: tooltip.to_string(),
            tone,
        }
    }

    /// Steady-state view. `has_content` is false when there is nothing to show.
    pub fn for_state(state: ServiceState, has_unseen: bool, has_content: bool) -> Self {
        match state {
            ServiceState::Normal if !has_content => Self::blank(),
            ServiceState::Normal if has_unseen => Self::new(
                "\u{26a0} Click for Announcements",
                "New announcements are available",
                ButtonTone::Attention,
            ),
            ServiceState::Normal => {
                Self::new("Announcements", "Show announcements", ButtonTone::Neutral)
            }
            ServiceState::Degraded => Self::new(
                "\u{21bb} Announcements",
                "Announcement service unreachable, retrying",
                ButtonTone::Warning,
            ),
            ServiceState::Failed => Self::new(
                "\u{2716} Announcements unavailable",
                "Announcement service unavailable",
                ButtonTone::Error,
            ),
        }
    }

    /// Degraded view with the time left until the next attempt.
    pub fn retrying(remaining: Duration) -> Self {
        let secs = remaining.as_secs_f64().ceil() as u64;
        Self::new(
            "\u{21bb} Announcements",
            &format!("Announcement service unreachable, retrying in {secs}s"),
            ButtonTone::Warning,
        )
    }

    /// Shown for a few seconds after the service comes back.
    pub fn restored() -> Self {
        Self::new(
            "\u{2714} Announcements restored",
            "Connection to the announcement service restored",
            ButtonTone::Success,
        )
    }

    /// Registered but empty.
    pub fn blank() -> Self {
        Self::new("", "", ButtonTone::Neutral)
    }
}

/// Lazily registered status item.
///
/// Registration happens on first display and never again; afterwards only the
/// view changes. The item is never removed, only relabelled or blanked.
#[derive(Debug, Default)]
pub(crate) struct StatusButton {
    registered: bool,
    current: Option<ButtonView>,
}

impl StatusButton {
    #[cfg(test)]
    pub(crate) fn is_registered(&self) -> bool {
        self.registered
    }

    #[cfg(test)]
    pub(crate) fn current(&self) -> Option<&ButtonView> {
        self.current.as_ref()
    }

    /// Register the item if needed, then display `view`.
    pub(crate) fn show<H: AnnouncementHost + ?Sized>(&mut self, host: &mut H, view: ButtonView) {
        if !self.registered {
            host.register_status_item(STATUS_ITEM_ID);
            self.registered = true;
        }
        if self.current.as_ref() != Some(&view) {
            host.update_status_item(&view);
            self.current = Some(view);
        }
    }

    /// Blank the item if it exists; never registers one.
    pub(crate) fn clear<H: AnnouncementHost + ?Sized>(&mut self, host: &mut H) {
        if self.registered {
            self.show(host, ButtonView::blank());
        }
    }
}
