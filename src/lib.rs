//! SAMi console: realtime session client for the SAMi assistant dashboard.
//!
//! This crate maintains a live session against the SAMi backend over a
//! persistent bidirectional event channel and owns all client-side state
//! explicitly:
//! - **Event channel**: managed WebSocket with typed, validated payloads
//! - **Transcript**: append-only conversation log with resilient remote
//!   media resolution (direct fetch, one proxy retry, terminal marker)
//! - **Speech capture**: continuous hands-free input with auto-restart
//!   across platform session timeouts
//! - **History**: cursor-based recall of previously submitted commands
//! - **Image analysis**: single-exchange camera/upload analysis requests
//!
//! The session is single-task: inbound events, capture events, and user
//! input all feed one ordered queue, so transcript ordering needs no locks.

pub mod analysis;
pub mod channel;
pub mod config;
pub mod error;
pub mod history;
pub mod media;
pub mod protocol;
pub mod session;
pub mod speech;
pub mod transcript;

pub use channel::{ChannelNotice, ConnectionStatus, EventChannel};
pub use config::ClientConfig;
pub use error::{ClientError, Result, UiAlert};
pub use session::{Session, SessionState, ViewMode};
pub use speech::{CaptureEvent, SpeechCapability, SpeechController, SpeechMode};
pub use transcript::{LogEntry, Role, Transcript};
