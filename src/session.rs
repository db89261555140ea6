//! Session controller: owned state, inbound event application, and input
//! routing.
//!
//! All client state lives here explicitly — connection status, the assistant
//! status line, telemetry, the transcript, command history, and speech
//! capture — and is mutated only by the session's own handlers, driven from a
//! single task. Inbound channel notices are applied strictly in arrival
//! order, which preserves the transcript ordering invariant without locks.

use crate::analysis::{AnalysisClient, AnalysisOutcome};
use crate::channel::{ChannelNotice, ConnectionStatus, EventChannel};
use crate::config::ClientConfig;
use crate::error::UiAlert;
use crate::history::HistoryBuffer;
use crate::media::MediaResolver;
use crate::protocol::{InboundEvent, OutboundEvent, SystemStats, ToggleAction, WireRole};
use crate::speech::{CaptureEvent, SpeechCapability, SpeechController, SpeechSignal};
use crate::transcript::{Role, Transcript};
use tracing::info;

/// Which main view the dashboard shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// Assistant view (default).
    Robot,
    /// Live screen view consuming the backend video feed.
    Screen,
}

/// Client-owned session state, recreated on every run.
///
/// Mutated only by inbound channel events; nothing else writes it.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Assistant status line, uppercased for display.
    pub listening_status: String,
    /// Server-side microphone indicator.
    pub mic_active: bool,
    /// Whether the assistant is currently speaking (derived from status).
    pub speaking: bool,
    /// Latest host telemetry snapshot, percentages clamped to 0–100.
    pub stats: SystemStats,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            listening_status: "INITIALIZING".to_owned(),
            mic_active: false,
            speaking: false,
            stats: SystemStats::default(),
        }
    }
}

/// The realtime session client.
pub struct Session<C: SpeechCapability> {
    state: SessionState,
    transcript: Transcript,
    history: HistoryBuffer,
    speech: SpeechController<C>,
    channel: EventChannel,
    media: MediaResolver,
    analysis: AnalysisClient,
    view_mode: ViewMode,
    /// Live video feed URL; populated only while the screen view is active.
    video_feed_url: Option<String>,
    /// Local speech-capture indicator (distinct from the server mic state).
    capture_indicator: bool,
    /// Blocking alerts awaiting display; the view drains these.
    pending_alerts: Vec<UiAlert>,
    camera_prompt: String,
    upload_prompt: String,
    video_feed_base: String,
}

impl<C: SpeechCapability> Session<C> {
    /// Build a session from config, a connected channel, and a speech
    /// capability.
    #[must_use]
    pub fn new(config: &ClientConfig, channel: EventChannel, capability: C) -> Self {
        Self {
            state: SessionState::default(),
            transcript: Transcript::new(),
            history: HistoryBuffer::new(config.history.max_entries),
            speech: SpeechController::new(capability, config.speech.clone()),
            channel,
            media: MediaResolver::new(
                config.server.base_url.clone(),
                config.media.proxy_path.clone(),
            ),
            analysis: AnalysisClient::new(config.server.http_url(&config.analysis.path)),
            view_mode: ViewMode::Robot,
            video_feed_url: None,
            capture_indicator: false,
            pending_alerts: Vec::new(),
            camera_prompt: config.analysis.camera_prompt.clone(),
            upload_prompt: config.analysis.upload_prompt.clone(),
            video_feed_base: config.server.http_url("/video_feed"),
        }
    }

    /// Current session state snapshot.
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// The conversation transcript.
    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Current view mode.
    #[must_use]
    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    /// The video feed URL, set only while the screen view is active.
    #[must_use]
    pub fn video_feed_url(&self) -> Option<&str> {
        self.video_feed_url.as_deref()
    }

    /// Whether local speech capture is showing as active.
    #[must_use]
    pub fn capture_indicator(&self) -> bool {
        self.capture_indicator
    }

    /// Speech controller mode, for display.
    #[must_use]
    pub fn speech_mode(&self) -> crate::speech::SpeechMode {
        self.speech.mode()
    }

    /// Drain pending blocking alerts for display.
    pub fn take_alerts(&mut self) -> Vec<UiAlert> {
        std::mem::take(&mut self.pending_alerts)
    }

    // ------------------------------------------------------------------
    // Channel notices
    // ------------------------------------------------------------------

    /// Apply one channel notice. Notices must be fed in arrival order.
    pub async fn handle_notice(&mut self, notice: ChannelNotice) {
        match notice {
            ChannelNotice::Status(status) => self.apply_connection_status(status),
            ChannelNotice::Event(event) => self.apply_inbound(event).await,
        }
    }

    fn apply_connection_status(&mut self, status: ConnectionStatus) {
        if status == ConnectionStatus::Connected {
            self.transcript
                .append(Role::System, "Interface connected to Mainframe.", None);
        }
    }

    async fn apply_inbound(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::StatusUpdate { status } => {
                self.state.speaking = status.contains("Speaking");
                self.state.listening_status = status.to_uppercase();
            }
            InboundEvent::MicState { active } => {
                self.state.mic_active = active;
            }
            InboundEvent::SystemStats(stats) => {
                self.state.stats = SystemStats {
                    cpu: stats.cpu.clamp(0.0, 100.0),
                    ram: stats.ram.clamp(0.0, 100.0),
                    disk: stats.disk.clamp(0.0, 100.0),
                    ..stats
                };
            }
            InboundEvent::ConversationUpdate { role, text, image } => {
                let role = match role {
                    WireRole::User => Role::User,
                    WireRole::Sami => Role::Sami,
                };
                let id = self.transcript.append(role, text, image);
                // Resolve remote media straight away; the bounded retry and
                // terminal marker live in the resolver.
                if self
                    .transcript
                    .entry(id)
                    .is_some_and(|e| e.image_ref.is_some())
                {
                    self.media.resolve_entry(&mut self.transcript, id).await;
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // User input
    // ------------------------------------------------------------------

    /// Submit a typed command: record it in history and emit it.
    ///
    /// No local echo is appended — the backend reflects the command back as a
    /// user `conversation_update`, which is the single source of transcript
    /// entries for typed commands.
    pub fn send_command(&mut self, text: &str) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        self.history.submit(text);
        self.channel.emit(&OutboundEvent::TextCommand {
            text: text.to_owned(),
        });
    }

    /// Recall the previous history entry (arrow-up).
    pub fn recall_previous(&mut self) -> Option<String> {
        self.history.recall_previous()
    }

    /// Recall the next history entry (arrow-down).
    pub fn recall_next(&mut self) -> Option<String> {
        self.history.recall_next()
    }

    /// Ask the backend to toggle its server-side microphone.
    pub fn toggle_mic(&self) {
        self.channel.emit(&OutboundEvent::ToggleListening {
            action: ToggleAction::Toggle,
        });
    }

    /// Switch the main view, tearing the video feed down when leaving the
    /// screen view so it stops consuming bandwidth.
    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
        self.video_feed_url = match mode {
            ViewMode::Screen => Some(self.video_feed_base.clone()),
            ViewMode::Robot => None,
        };
    }

    // ------------------------------------------------------------------
    // Speech capture
    // ------------------------------------------------------------------

    /// Toggle local hands-free speech capture on or off.
    pub fn toggle_speech(&mut self) {
        let signals = if self.speech.toggled_on() {
            self.speech.stop()
        } else {
            self.speech.start()
        };
        self.apply_speech_signals(signals);
    }

    /// Feed a capability event into the speech state machine.
    pub fn handle_capture_event(&mut self, event: CaptureEvent) {
        let signals = self.speech.handle_event(event);
        self.apply_speech_signals(signals);
    }

    fn apply_speech_signals(&mut self, signals: Vec<SpeechSignal>) {
        for signal in signals {
            match signal {
                SpeechSignal::Command(text) => {
                    // Spoken commands are logged locally and emitted; the
                    // backend will additionally echo a user entry (see
                    // DESIGN.md on the duplicate-echo open question).
                    self.transcript
                        .append(Role::User, format!("Voice: \"{text}\""), None);
                    self.channel.emit(&OutboundEvent::TextCommand { text });
                }
                SpeechSignal::Notice(text) => {
                    self.transcript.append(Role::System, text, None);
                }
                SpeechSignal::Alert(message) => {
                    self.pending_alerts.push(UiAlert::new(message));
                }
                SpeechSignal::IndicatorOn => self.capture_indicator = true,
                SpeechSignal::IndicatorOff => self.capture_indicator = false,
            }
        }
    }

    // ------------------------------------------------------------------
    // Image analysis
    // ------------------------------------------------------------------

    /// Analyze an already-encoded image with the camera prompt.
    pub async fn analyze_camera_frame(&mut self, data_url: String) {
        let prompt = self.camera_prompt.clone();
        self.analyze_image(data_url, &prompt).await;
    }

    /// Analyze an uploaded file's encoded image with the upload prompt.
    pub async fn analyze_upload(&mut self, data_url: String) {
        let prompt = self.upload_prompt.clone();
        self.analyze_image(data_url, &prompt).await;
    }

    /// One optimistic preview entry, one request/response exchange, one
    /// result entry. No retries and no request correlation.
    pub async fn analyze_image(&mut self, data_url: String, prompt: &str) {
        info!("sending image for analysis");
        self.transcript
            .append(Role::System, "Sending image to neural engine...", None);
        // Optimistic preview of the outbound image.
        self.transcript
            .append(Role::User, "(image attached)", Some(data_url.clone()));

        match self.analysis.analyze(&data_url, prompt).await {
            AnalysisOutcome::Answer(text) => {
                self.transcript.append(Role::Sami, text, None);
            }
            AnalysisOutcome::Rejected(error) => {
                self.transcript
                    .append(Role::System, format!("Error: {error}"), None);
            }
            AnalysisOutcome::Transport(error) => {
                self.transcript
                    .append(Role::System, format!("Network Error: {error}"), None);
            }
        }
    }

    /// Report a camera acquisition failure (capability error surface).
    pub fn report_camera_failure(&mut self, detail: &str) {
        self.transcript
            .append(Role::System, format!("Camera Error: {detail}"), None);
        self.pending_alerts
            .push(UiAlert::new("Camera access failed or denied."));
    }
}
