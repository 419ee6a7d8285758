//! Timing model: narration time to active clip and active subtitle words.
//!
//! Pure functions, no I/O. Clip intervals are cumulative in lane order;
//! when the lane is shorter than the narration the last clip freezes, and
//! clips starting after the narration ends are simply never reached.

use newscut_project_model::{MediaLane, SubtitleTrack, SubtitleWord};

/// Half-open `[start, end)` interval a clip occupies on the narration timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipSpan {
    pub start: f64,
    pub end: f64,
}

/// The clip shown at some instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActiveClip {
    /// Index into the lane.
    pub index: usize,

    /// Seconds into the clip.
    pub offset: f64,

    /// The lane ran out and this clip is held on its final frame.
    pub frozen: bool,
}

/// Cumulative clip intervals for a media lane.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LaneTimeline {
    spans: Vec<ClipSpan>,
}

impl LaneTimeline {
    pub fn new(lane: &MediaLane) -> Self {
        let mut cursor = 0.0;
        let spans = lane
            .clips()
            .iter()
            .map(|clip| {
                let span = ClipSpan {
                    start: cursor,
                    end: cursor + clip.duration_secs,
                };
                cursor = span.end;
                span
            })
            .collect();
        Self { spans }
    }

    pub fn spans(&self) -> &[ClipSpan] {
        &self.spans
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// End of the last clip.
    pub fn duration(&self) -> f64 {
        self.spans.last().map(|span| span.end).unwrap_or(0.0)
    }

    /// Resolve the clip at narration time `t`.
    ///
    /// `t < 0` clamps to zero; `t` past the lane returns the last clip at
    /// its end offset. An empty lane yields `None`.
    pub fn active_clip_at(&self, t: f64) -> Option<ActiveClip> {
        let last = self.spans.len().checked_sub(1)?;
        let t = if t.is_finite() { t.max(0.0) } else { 0.0 };

        let index = self.spans.partition_point(|span| span.end <= t);
        if index > last {
            let span = self.spans[last];
            return Some(ActiveClip {
                index: last,
                offset: span.end - span.start,
                frozen: true,
            });
        }
        Some(ActiveClip {
            index,
            offset: t - self.spans[index].start,
            frozen: false,
        })
    }

    /// Indexes of clips that start before `total`; later clips are never shown.
    pub fn reachable_clips(&self, total: f64) -> usize {
        self.spans
            .iter()
            .take_while(|span| span.start < total)
            .count()
            .max(usize::from(!self.spans.is_empty()))
    }

    /// Resolve the clip at `t` for a run lasting `total` seconds.
    ///
    /// Same as [`active_clip_at`](Self::active_clip_at) except that it never
    /// lands past the reachable clips: when the next clip starts exactly at
    /// `total`, the frame at `total` holds the previous clip on its end.
    pub fn active_clip_within(&self, t: f64, total: f64) -> Option<ActiveClip> {
        let active = self.active_clip_at(t)?;
        let last = self.reachable_clips(total).checked_sub(1)?;
        if active.index <= last {
            return Some(active);
        }
        let span = self.spans[last];
        Some(ActiveClip {
            index: last,
            offset: span.end - span.start,
            frozen: true,
        })
    }
}

/// Words whose `[start, end)` contains `t`.
pub fn active_words_at(track: &SubtitleTrack, t: f64) -> Vec<&SubtitleWord> {
    let words = track.words();
    // Starts are sorted, so nothing at or after `upper` can contain `t`.
    let upper = words.partition_point(|w| w.start <= t);
    words[..upper].iter().filter(|w| w.contains(t)).collect()
}

/// A page of words shown together, possibly with one highlighted.
#[derive(Debug, Clone, PartialEq)]
pub struct Caption<'a> {
    /// Index of the page's first word in the track.
    pub first_index: usize,

    pub words: &'a [SubtitleWord],

    /// Position within `words` of the word being spoken.
    pub highlight: Option<usize>,
}

impl Caption<'_> {
    pub fn text(&self) -> String {
        self.words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Caption page visible at `t`.
///
/// Words are paged in groups of `words_per_caption`. The page holding the
/// active word is shown with that word highlighted. Between two words of
/// the same page the page stays up without a highlight; otherwise nothing
/// is shown.
pub fn caption_at(
    track: &SubtitleTrack,
    t: f64,
    words_per_caption: usize,
) -> Option<Caption<'_>> {
    let words = track.words();
    let per_page = words_per_caption.max(1);
    let upper = words.partition_point(|w| w.start <= t);
    if upper == 0 {
        return None;
    }

    // Latest-starting word wins when words overlap.
    if let Some(active) = (0..upper).rev().find(|&i| words[i].contains(t)) {
        return Some(page(words, active, per_page, Some(active)));
    }

    let previous = upper - 1;
    let next = upper;
    if next < words.len() && next / per_page == previous / per_page {
        return Some(page(words, previous, per_page, None));
    }
    None
}

fn page(
    words: &[SubtitleWord],
    index: usize,
    per_page: usize,
    active: Option<usize>,
) -> Caption<'_> {
    let first_index = index / per_page * per_page;
    let end = (first_index + per_page).min(words.len());
    Caption {
        first_index,
        words: &words[first_index..end],
        highlight: active.map(|i| i - first_index),
    }
}
