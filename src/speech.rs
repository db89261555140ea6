//! Continuous speech capture controller.
//!
//! Wraps a platform speech-to-text capability behind the [`SpeechCapability`]
//! trait and drives it as an explicit state machine. The platform routinely
//! ends a capability session on its own (timeouts are common), so the
//! controller's core job is restarting the session whenever the user's
//! toggled-on intent is still set — that auto-restart is what makes
//! hands-free capture continuous.

use crate::config::SpeechConfig;
use crate::error::Result;
use tracing::{debug, warn};

/// Observable state of the capture controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeechMode {
    /// No capability session active.
    Idle,
    /// A capability session is capturing.
    Listening,
    /// Transient error handling; always resolves back to `Idle` (or
    /// `Listening` when toggled on and the error was non-fatal).
    Erroring,
}

/// Events reported by a platform capability session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// The capability session is live.
    Started,
    /// A finalized transcript.
    Transcript(String),
    /// The capability session ended (explicit stop or platform timeout).
    Ended,
    /// The capability session reported an error.
    Error(CaptureErrorKind),
}

/// Classification of capability errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureErrorKind {
    /// Microphone permission denied.
    NotAllowed,
    /// Recognition service network failure.
    Network,
    /// Anything else; logged but not surfaced as an alert.
    Other(String),
}

impl CaptureErrorKind {
    fn describe(&self) -> String {
        match self {
            Self::NotAllowed => "not-allowed".to_owned(),
            Self::Network => "network".to_owned(),
            Self::Other(detail) => detail.clone(),
        }
    }
}

/// Platform speech-to-text seam.
///
/// Implementations request and end capability sessions; session lifecycle and
/// transcripts come back to the controller as [`CaptureEvent`]s through the
/// session's event queue.
pub trait SpeechCapability {
    /// Whether the platform offers speech capture at all.
    fn is_available(&self) -> bool {
        true
    }

    /// Request a new capability session with the given settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be requested.
    fn begin_session(&mut self, settings: &SpeechConfig) -> Result<()>;

    /// Request the current capability session to end.
    ///
    /// The `Ended` event follows asynchronously.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be delivered.
    fn end_session(&mut self) -> Result<()>;
}

/// A capability for platforms without speech support.
///
/// `start()`/`stop()` against this become no-ops that surface a
/// capability-unavailable notice instead of failing.
#[derive(Debug, Default)]
pub struct UnsupportedCapability;

impl SpeechCapability for UnsupportedCapability {
    fn is_available(&self) -> bool {
        false
    }

    fn begin_session(&mut self, _settings: &SpeechConfig) -> Result<()> {
        Ok(())
    }

    fn end_session(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Side effects the session applies after a controller step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechSignal {
    /// Forward a finalized transcript as a text command (and log it).
    Command(String),
    /// Append a system transcript entry.
    Notice(String),
    /// Surface a blocking alert with remediation guidance.
    Alert(String),
    /// Turn the active-capture indicator on.
    IndicatorOn,
    /// Turn the active-capture indicator off.
    IndicatorOff,
}

/// State machine wrapping one [`SpeechCapability`].
pub struct SpeechController<C: SpeechCapability> {
    capability: C,
    settings: SpeechConfig,
    mode: SpeechMode,
    /// User intent: capture should remain active across capability session
    /// lifetimes.
    toggled_on: bool,
}

impl<C: SpeechCapability> SpeechController<C> {
    /// Create a controller around a capability.
    pub fn new(capability: C, settings: SpeechConfig) -> Self {
        Self {
            capability,
            settings,
            mode: SpeechMode::Idle,
            toggled_on: false,
        }
    }

    /// Current observable mode.
    #[must_use]
    pub fn mode(&self) -> SpeechMode {
        self.mode
    }

    /// Whether the user intends capture to stay active.
    #[must_use]
    pub fn toggled_on(&self) -> bool {
        self.toggled_on
    }

    /// User toggle: begin hands-free capture.
    pub fn start(&mut self) -> Vec<SpeechSignal> {
        if !self.capability.is_available() {
            return vec![
                SpeechSignal::Notice("Voice input is not supported on this platform.".into()),
                SpeechSignal::Alert(
                    "Voice input not supported in this environment. Try a platform with speech \
                     recognition."
                        .into(),
                ),
            ];
        }
        self.toggled_on = true;
        if let Err(e) = self.capability.begin_session(&self.settings) {
            warn!("failed to request capture session: {e}");
            return vec![SpeechSignal::Notice(format!("Speech capture error: {e}"))];
        }
        Vec::new()
    }

    /// User toggle: end hands-free capture.
    ///
    /// The transition to `Idle` happens when the capability reports `Ended`.
    pub fn stop(&mut self) -> Vec<SpeechSignal> {
        if !self.capability.is_available() {
            return vec![SpeechSignal::Notice(
                "Voice input is not supported on this platform.".into(),
            )];
        }
        self.toggled_on = false;
        if let Err(e) = self.capability.end_session() {
            warn!("failed to end capture session: {e}");
        }
        Vec::new()
    }

    /// Advance the state machine on a capability event.
    pub fn handle_event(&mut self, event: CaptureEvent) -> Vec<SpeechSignal> {
        match event {
            CaptureEvent::Started => {
                self.mode = SpeechMode::Listening;
                vec![
                    SpeechSignal::IndicatorOn,
                    SpeechSignal::Notice("Microphone: listening (hands-free)...".into()),
                ]
            }
            CaptureEvent::Transcript(text) => {
                // Capture continues; no state change.
                vec![SpeechSignal::Command(text)]
            }
            CaptureEvent::Ended => {
                if self.toggled_on {
                    // Platform session ended on its own while intent is still
                    // "on": restart instantly so capture stays continuous.
                    debug!("capture session ended, restarting (toggled on)");
                    if let Err(e) = self.capability.begin_session(&self.settings) {
                        warn!("capture restart failed: {e}");
                        self.mode = SpeechMode::Idle;
                        return vec![
                            SpeechSignal::IndicatorOff,
                            SpeechSignal::Notice(format!("Speech capture error: {e}")),
                        ];
                    }
                    self.mode = SpeechMode::Listening;
                    Vec::new()
                } else {
                    self.mode = SpeechMode::Idle;
                    vec![SpeechSignal::IndicatorOff]
                }
            }
            CaptureEvent::Error(kind) => self.handle_error(kind),
        }
    }

    fn handle_error(&mut self, kind: CaptureErrorKind) -> Vec<SpeechSignal> {
        self.mode = SpeechMode::Erroring;
        let mut signals = vec![SpeechSignal::Notice(format!(
            "Speech capture error: {}",
            kind.describe()
        ))];

        let fatal = match kind {
            CaptureErrorKind::NotAllowed => {
                signals.push(SpeechSignal::Alert(
                    "Microphone access blocked. Allow microphone permissions in your settings; \
                     some environments block capture over plain HTTP."
                        .into(),
                ));
                true
            }
            CaptureErrorKind::Network => {
                signals.push(SpeechSignal::Alert(
                    "Network error during speech capture. Check your connection.".into(),
                ));
                true
            }
            CaptureErrorKind::Other(_) => false,
        };

        // The active indicator clears after any error, fatal or not.
        signals.push(SpeechSignal::IndicatorOff);

        if fatal {
            self.toggled_on = false;
            self.mode = SpeechMode::Idle;
        } else if self.toggled_on {
            // Non-fatal with intent still on: the capability's follow-up
            // `Ended` event triggers the restart; stay observably listening.
            self.mode = SpeechMode::Listening;
        } else {
            self.mode = SpeechMode::Idle;
        }

        signals
    }
}
