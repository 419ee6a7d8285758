//! Newscut Project Model
//!
//! Defines the core data contracts for Newscut compositions:
//! - **Media:** Ordered video/image clips forming the media lane
//! - **Subtitles:** Word-level timing from the transcription step
//! - **Overlay:** Template, watermark, and caption styling
//! - **Export:** Quality/format settings and the progress value observed by the UI
//! - **Records:** Published videos and saved overlay presets
//!
//! All times are seconds relative to the start of the narration.

pub mod composition;
pub mod export;
pub mod media;
pub mod overlay;
pub mod records;
pub mod subtitle;

pub use composition::*;
pub use export::*;
pub use media::*;
pub use overlay::*;
pub use records::*;
pub use subtitle::*;
