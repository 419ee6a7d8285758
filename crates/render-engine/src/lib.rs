//! Newscut Render Engine
//!
//! Draws the output frames of a news video from a frozen composition.
//!
//! # Frame Layers
//!
//! ```text
//! background color
//!     └── active media clip (cover-fitted into the template's media slot)
//!             └── template decoration (headline bar / banner + ticker / accent line)
//!                     └── subtitle plate + caption, active word highlighted
//!                             └── watermark
//! ```
//!
//! The [`timing`] model decides which clip and which words are active at a
//! narration instant; [`compositor::FrameCompositor`] paints them.

pub mod compositor;
pub mod layout;
pub mod media;
pub mod paint;
pub mod text;
pub mod thumbnails;
pub mod timing;

pub use compositor::FrameCompositor;
pub use layout::{Rect, TemplateLayout};
pub use media::{
    clip_from_path, command_available, command_exists, cover_fit, probe_duration, FrameSource,
    MediaLibrary, StillSource, VideoSource,
};
pub use text::TextPainter;
pub use thumbnails::*;
pub use timing::*;
