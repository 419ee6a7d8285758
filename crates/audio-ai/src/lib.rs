//! Newscut Audio Services
//!
//! - **Narration:** Text-to-speech client producing the narration track
//! - **Transcription:** Word-timing client producing subtitle words
//! - **Subtitles:** SRT/VTT sidecars from word timings, and SRT parsing

pub mod narration;
pub mod subtitles;
pub mod transcription;

pub use narration::*;
pub use subtitles::*;
pub use transcription::*;
