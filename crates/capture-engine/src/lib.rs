//! Newscut Capture Engine
//!
//! Runs the realtime export of a composition: the compositor is driven at
//! a fixed frame cadence against a playback clock, frames stream into a
//! capture sink, and the finished container is optionally transcoded
//! before it is offered for download or publishing.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────┐
//! │                 ExportOrchestrator                    │
//! │   start / cancel / download / reset / publish         │
//! │        │                               ▲              │
//! │        ▼                               │ watch        │
//! │  ┌──────────────┐   frames   ┌────────────────────┐   │
//! │  │ CaptureDriver│───────────▶│ CaptureSink        │   │
//! │  │ PlaybackClock│            │ (ffmpeg / memory)  │   │
//! │  └──────┬───────┘            └─────────┬──────────┘   │
//! │         │ container                    │              │
//! │         ▼                              ▼              │
//! │  ┌──────────────┐            ┌────────────────────┐   │
//! │  │ Transcoder   │            │ VideoStore         │   │
//! │  └──────────────┘            └────────────────────┘   │
//! └───────────────────────────────────────────────────────┘
//! ```

pub mod cancel;
pub mod clock;
pub mod driver;
pub mod orchestrator;
pub mod progress;
pub mod sink;
pub mod store;
pub mod transcode;

pub use cancel::CancelFlag;
pub use clock::{ClockSource, PlaybackClock};
pub use driver::*;
pub use orchestrator::*;
pub use progress::ProgressPublisher;
pub use sink::*;
pub use store::*;
pub use transcode::*;
