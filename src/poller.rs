//! Announcement polling loop.
//!
//! [`Poller`] owns the fetch/validate/render cycle and the status item. Each
//! cycle returns a [`Schedule`] saying when the next one should run; the
//! spawned task waits for it while handling button clicks, the degraded
//! countdown and the transient "restored" label.
//!
//! State transitions per cycle:
//! - payload accepted, or any non-retryable HTTP status: back to normal, backoff reset
//! - payload invalid: nothing changes, next poll at the base interval
//! - connectivity fault: degraded with exponential backoff; once the delay has
//!   reached its ceiling the next fault marks the service failed and polling
//!   continues at the base interval

use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::button::{ButtonView, ServiceState, StatusButton};
use crate::client::{AnnouncementClient, FetchError};
use crate::error_classification::RetryDelay;
use crate::host::{AnnouncementHost, Dialog};
use crate::model::AnnouncementsData;
use crate::parser::parse_announcements;

/// How long the "restored" label stays before the steady label returns.
pub const RESTORED_NOTICE: Duration = Duration::from_secs(3);

/// Refresh rate of the retry countdown while degraded.
const COUNTDOWN_TICK: Duration = Duration::from_secs(1);

/// When and how the next cycle runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub delay: Duration,
    /// Waiting on a retry delay rather than the base interval
    pub backing_off: bool,
    /// The service just came back and the "restored" notice started
    pub restored: bool,
}

enum Command {
    OpenAnnouncements,
    Stop,
}

/// Polls the announcement endpoint and drives the host UI.
pub struct Poller<H: AnnouncementHost> {
    client: AnnouncementClient,
    host: H,
    refresh_interval: Duration,
    retry: RetryDelay,
    state: ServiceState,
    last_rendered_html: String,
    has_unseen: bool,
    has_content: bool,
    /// End of the "restored" notice, if one is showing
    restored_until: Option<Instant>,
    button: StatusButton,
}

impl<H: AnnouncementHost> Poller<H> {
    pub fn new(client: AnnouncementClient, host: H, refresh_interval: Duration) -> Self {
        Self {
            client,
            host,
            refresh_interval,
            retry: RetryDelay::default(),
            state: ServiceState::Normal,
            last_rendered_html: String::new(),
            has_unseen: false,
            has_content: false,
            restored_until: None,
            button: StatusButton::default(),
        }
    }

    /// Replace the default 10s..600s retry bounds.
    pub fn with_retry_delay(mut self, retry: RetryDelay) -> Self {
        self.retry = retry;
        self
    }

    pub fn service_state(&self) -> ServiceState {
        self.state
    }

    pub fn has_unseen(&self) -> bool {
        self.has_unseen
    }

    pub fn last_rendered_html(&self) -> &str {
        &self.last_rendered_html
    }

    /// Delay the next connectivity fault would wait.
    pub fn retry_delay(&self) -> Duration {
        self.retry.current()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Run one fetch and apply its outcome.
    pub async fn poll_once(&mut self) -> Schedule {
        tracing::debug!(url = self.client.url(), "polling announcements");
        let result = self.client.fetch().await;
        self.apply(result)
    }

    /// Apply a fetch outcome to the state machine.
    pub fn apply(&mut self, result: Result<Value, FetchError>) -> Schedule {
        match result {
            Ok(value) => match parse_announcements(&value) {
                Ok(data) => self.on_announcements(&data),
                Err(e) => {
                    tracing::warn!("Ignoring invalid announcements: {e}");
                    self.at_interval(false)
                }
            },
            Err(FetchError::InvalidBody(msg)) => {
                tracing::warn!("Ignoring invalid announcements: {msg}");
                self.at_interval(false)
            }
            Err(FetchError::Rejected(status)) => self.on_rejected(status),
            Err(e) => self.on_unreachable(&e),
        }
    }

    /// Show the last rendered announcements and mark them seen.
    pub fn open_announcements(&mut self) {
        self.has_unseen = false;
        self.host
            .show_dialog(&Dialog::announcements(&self.last_rendered_html));
        if self.state == ServiceState::Normal {
            self.settle_button();
        } else {
            self.refresh_button();
        }
    }

    fn on_announcements(&mut self, data: &AnnouncementsData) -> Schedule {
        let html = data.to_html();
        if html != self.last_rendered_html {
            tracing::info!(
                blocks = data.blocks().len(),
                popup = data.popup(),
                "announcements changed"
            );
            self.has_unseen = true;
            self.last_rendered_html = html;
        }
        self.has_content = !self.last_rendered_html.is_empty();

        let restored = self.reset_service();
        if self.has_content && self.has_unseen && data.popup() {
            self.open_announcements();
        }
        self.settle_button();
        self.at_interval(restored)
    }

    fn on_rejected(&mut self, status: u16) -> Schedule {
        tracing::debug!("announcement endpoint answered HTTP {status}, nothing to show");
        self.has_content = false;
        let restored = self.reset_service();
        self.settle_button();
        self.at_interval(restored)
    }

    fn on_unreachable(&mut self, err: &FetchError) -> Schedule {
        self.restored_until = None;
        if self.retry.is_exhausted() {
            tracing::error!(
                "{err}; retry backoff exhausted, polling every {}s",
                self.refresh_interval.as_secs()
            );
            self.state = ServiceState::Failed;
            self.retry.reset();
            self.refresh_button();
            return self.at_interval(false);
        }

        self.state = ServiceState::Degraded;
        let delay = self.retry.advance();
        tracing::warn!("{err}; retrying in {}s", delay.as_secs());
        self.button.show(&mut self.host, ButtonView::retrying(delay));
        Schedule {
            delay,
            backing_off: true,
            restored: false,
        }
    }

    /// Back to normal. Returns true if the service was degraded or failed,
    /// in which case the "restored" notice starts.
    fn reset_service(&mut self) -> bool {
        let was_down = self.state != ServiceState::Normal;
        if was_down {
            tracing::info!("announcement service restored");
            self.restored_until = Some(Instant::now() + RESTORED_NOTICE);
        }
        self.state = ServiceState::Normal;
        self.retry.reset();
        was_down
    }

    /// Button in the normal state: restored notice while it lasts, then the
    /// steady label, or blank.
    fn settle_button(&mut self) {
        if let Some(until) = self.restored_until {
            if Instant::now() < until {
                self.button.show(&mut self.host, ButtonView::restored());
                return;
            }
            self.restored_until = None;
        }
        if self.has_content {
            self.refresh_button();
        } else {
            self.button.clear(&mut self.host);
        }
    }

    fn refresh_button(&mut self) {
        let view = ButtonView::for_state(self.state, self.has_unseen, self.has_content);
        self.button.show(&mut self.host, view);
    }

    fn at_interval(&self, restored: bool) -> Schedule {
        Schedule {
            delay: self.refresh_interval,
            backing_off: false,
            restored,
        }
    }

    /// Sleep until the next cycle is due. Returns false when asked to stop.
    async fn wait(
        &mut self,
        schedule: Schedule,
        commands: &mut mpsc::UnboundedReceiver<Command>,
    ) -> bool {
        let deadline = Instant::now() + schedule.delay;

        loop {
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            let mut wake = deadline;
            if let Some(at) = self.restored_until {
                wake = wake.min(at);
            }
            if schedule.backing_off {
                wake = wake.min(now + COUNTDOWN_TICK);
            }

            tokio::select! {
                _ = tokio::time::sleep_until(wake) => {
                    let now = Instant::now();
                    if self.restored_until.is_some_and(|at| now >= at) {
                        self.settle_button();
                    }
                    if schedule.backing_off && now < deadline {
                        self.button.show(&mut self.host, ButtonView::retrying(deadline - now));
                    }
                }
                command = commands.recv() => match command {
                    Some(Command::OpenAnnouncements) => self.open_announcements(),
                    Some(Command::Stop) | None => return false,
                },
            }
        }
    }
}

impl<H: AnnouncementHost + Send + 'static> Poller<H> {
    /// Move the poller into a background task.
    pub fn spawn(self) -> PollerHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(rx));
        PollerHandle { commands: tx, task }
    }

    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        tracing::info!(
            url = self.client.url(),
            interval_ms = self.refresh_interval.as_millis() as u64,
            "announcement poller started"
        );
        loop {
            let schedule = self.poll_once().await;
            if !self.wait(schedule, &mut commands).await {
                break;
            }
        }
        tracing::info!("announcement poller stopped");
    }
}

/// Control handle for a spawned [`Poller`]. Dropping it stops the poller.
pub struct PollerHandle {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Equivalent of clicking the status item. Returns false if the poller has stopped.
    pub fn open_announcements(&self) -> bool {
        self.commands.send(Command::OpenAnnouncements).is_ok()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop after the current cycle and wait for the task to end.
    pub async fn stop(self) {
        let _ = self.commands.send(Command::Stop);
        if let Err(e) = self.task.await {
            tracing::error!("announcement poller task failed: {e}");
        }
    }
}
