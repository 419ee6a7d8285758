//! Subtitle sidecars in SRT and VTT formats.
//!
//! Each word becomes one cue. Timestamps are decomposed from an integer
//! millisecond count, so a decode of an encode is exact at ms precision.

use std::path::Path;

use newscut_common::error::{NewscutError, NewscutResult};
use newscut_project_model::{SubtitleTrack, SubtitleWord};

/// Encode words as SRT cues. An empty slice encodes to an empty string.
pub fn generate_srt(words: &[SubtitleWord]) -> String {
    let mut output = String::new();

    for (i, word) in words.iter().enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(word.start),
            format_srt_time(word.end),
        ));
        output.push_str(&word.text);
        output.push_str("\n\n");
    }

    output
}

/// Encode words as a WebVTT document.
pub fn generate_vtt(words: &[SubtitleWord]) -> String {
    let mut output = String::from("WEBVTT\n\n");

    for word in words {
        output.push_str(&format!(
            "{} --> {}\n",
            format_vtt_time(word.start),
            format_vtt_time(word.end),
        ));
        output.push_str(&word.text);
        output.push_str("\n\n");
    }

    output
}

/// Parse SRT text back into a subtitle track.
///
/// Accepts CRLF line endings, a leading BOM, and trailing whitespace.
/// Multi-line cue text is joined with a single space.
pub fn parse_srt(text: &str) -> NewscutResult<SubtitleTrack> {
    let normalized = text.trim_start_matches('\u{feff}').replace("\r\n", "\n");
    let mut words = Vec::new();
    let mut block: Vec<&str> = Vec::new();
    let mut block_index = 0usize;

    for line in normalized.lines().chain(std::iter::once("")) {
        if line.trim().is_empty() {
            if !block.is_empty() {
                block_index += 1;
                words.push(parse_block(&block, block_index)?);
                block.clear();
            }
            continue;
        }
        block.push(line.trim_end());
    }

    SubtitleTrack::new(words).map_err(|e| NewscutError::subtitle(e.to_string()))
}

fn parse_block(lines: &[&str], block_index: usize) -> NewscutResult<SubtitleWord> {
    let malformed =
        |what: &str| NewscutError::subtitle(format!("Malformed SRT block {block_index}: {what}"));

    let mut iter = lines.iter();
    let index_line = iter.next().ok_or_else(|| malformed("empty block"))?;
    index_line
        .trim()
        .parse::<usize>()
        .map_err(|_| malformed("missing cue number"))?;

    let timing = iter.next().ok_or_else(|| malformed("missing timing line"))?;
    let (start, end) = timing
        .split_once("-->")
        .ok_or_else(|| malformed("timing line has no arrow"))?;
    let start = parse_srt_time(start.trim()).ok_or_else(|| malformed("bad start time"))?;
    let end = parse_srt_time(end.trim()).ok_or_else(|| malformed("bad end time"))?;

    let text = iter.map(|line| line.trim()).collect::<Vec<_>>().join(" ");
    Ok(SubtitleWord::new(text, start, end))
}

/// Format seconds as SRT timestamp: HH:MM:SS,mmm
pub fn format_srt_time(secs: f64) -> String {
    let (hours, minutes, seconds, millis) = split_ms(secs);
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

/// Format seconds as VTT timestamp: HH:MM:SS.mmm
pub fn format_vtt_time(secs: f64) -> String {
    let (hours, minutes, seconds, millis) = split_ms(secs);
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

/// Parse `HH:MM:SS,mmm` (a `.` separator is accepted too).
pub fn parse_srt_time(s: &str) -> Option<f64> {
    let (clock, millis) = s.split_once(|c: char| c == ',' || c == '.')?;
    let mut parts = clock.split(':');
    let hours: u64 = parts.next()?.trim().parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || minutes >= 60 || seconds >= 60 || millis.len() != 3 {
        return None;
    }
    let millis: u64 = millis.parse().ok()?;
    let total_ms = hours * 3_600_000 + minutes * 60_000 + seconds * 1000 + millis;
    Some(total_ms as f64 / 1000.0)
}

fn split_ms(secs: f64) -> (u64, u64, u64, u64) {
    // Epsilon absorbs representation error, e.g. 3661.234 * 1000 = 3661233.999...
    let total_ms = (secs.max(0.0) * 1000.0 + 1e-6).floor() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    (hours, minutes, seconds, millis)
}

/// Save subtitles to a file; `.vtt` selects WebVTT, anything else SRT.
pub fn save_subtitles(words: &[SubtitleWord], path: &Path) -> NewscutResult<()> {
    let content = match path.extension().and_then(|e| e.to_str()) {
        Some("vtt") => generate_vtt(words),
        _ => generate_srt(words),
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), words = words.len(), "Subtitles written");
    Ok(())
}

/// Load an SRT sidecar.
pub fn load_srt(path: &Path) -> NewscutResult<SubtitleTrack> {
    if !path.exists() {
        return Err(NewscutError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    parse_srt(&std::fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn words() -> Vec<SubtitleWord> {
        vec![
            SubtitleWord::new("Hello", 0.0, 2.5),
            SubtitleWord::new("world", 3.0, 5.0),
        ]
    }

    #[test]
    fn test_srt_generation() {
        let srt = generate_srt(&words());
        assert!(srt.contains("1\n00:00:00,000 --> 00:00:02,500\nHello"));
        assert!(srt.contains("2\n00:00:03,000 --> 00:00:05,000\nworld"));
        assert!(srt.ends_with("world\n\n"));
    }

    #[test]
    fn test_empty_encodes_to_empty_string() {
        assert_eq!(generate_srt(&[]), "");
        assert!(parse_srt("").unwrap().is_empty());
    }

    #[test]
    fn test_vtt_generation() {
        let vtt = generate_vtt(&[SubtitleWord::new("One", 61.5, 63.0)]);
        assert!(vtt.starts_with("WEBVTT\n"));
        assert!(vtt.contains("00:01:01.500 --> 00:01:03.000"));
    }

    #[test]
    fn test_time_formatting() {
        assert_eq!(format_srt_time(0.0), "00:00:00,000");
        assert_eq!(format_srt_time(3661.234), "01:01:01,234");
        assert_eq!(format_srt_time(3661.5), "01:01:01,500");
        assert_eq!(format_srt_time(-2.0), "00:00:00,000");
        assert_eq!(format_vtt_time(3661.5), "01:01:01.500");
    }

    #[test]
    fn test_time_parsing() {
        assert_eq!(parse_srt_time("01:01:01,234"), Some(3661.234));
        assert_eq!(parse_srt_time("00:00:02.500"), Some(2.5));
        assert_eq!(parse_srt_time("00:61:00,000"), None);
        assert_eq!(parse_srt_time("00:00:00,5"), None);
    }

    #[test]
    fn test_parse_tolerates_crlf_and_trailing_whitespace() {
        let text = "1\r\n00:00:00,000 --> 00:00:00,400\r\nBreaking  \r\n\r\n\
                    2\r\n00:00:00,400 --> 00:00:01,000\r\nnews\r\n\r\n\r\n  ";
        let track = parse_srt(text).unwrap();
        assert_eq!(track.len(), 2);
        assert_eq!(track.words()[0].text, "Breaking");
        assert_eq!(track.words()[1].start, 0.4);
    }

    #[test]
    fn test_parse_joins_multiline_text() {
        let text = "1\n00:00:00,000 --> 00:00:01,000\nfirst\nsecond\n";
        assert_eq!(parse_srt(text).unwrap().words()[0].text, "first second");
    }

    #[test]
    fn test_malformed_block_reports_index() {
        let text = "1\n00:00:00,000 --> 00:00:01,000\nok\n\n2\n00:00:01,000 00:00:02,000\nbad\n";
        let err = parse_srt(text).unwrap_err();
        assert!(matches!(err, NewscutError::Subtitle { .. }));
        assert!(err.to_string().contains("block 2"));
    }

    #[test]
    fn test_save_and_load_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captions.srt");
        save_subtitles(&words(), &path).unwrap();
        assert_eq!(load_srt(&path).unwrap().words(), words().as_slice());

        let vtt = dir.path().join("captions.vtt");
        save_subtitles(&words(), &vtt).unwrap();
        assert!(std::fs::read_to_string(vtt).unwrap().starts_with("WEBVTT"));
    }

    fn word_list() -> impl Strategy<Value = Vec<SubtitleWord>> {
        prop::collection::vec(("[A-Za-z']{1,12}", 0u64..5_000, 0u64..3_000), 0..40).prop_map(
            |raw| {
                let mut start_ms = 0u64;
                raw.into_iter()
                    .map(|(text, gap, len)| {
                        start_ms += gap;
                        let start = start_ms as f64 / 1000.0;
                        let end = (start_ms + len) as f64 / 1000.0;
                        SubtitleWord::new(text, start, end)
                    })
                    .collect()
            },
        )
    }

    proptest! {
        #[test]
        fn prop_srt_round_trip(words in word_list()) {
            let decoded = parse_srt(&generate_srt(&words)).unwrap();
            prop_assert_eq!(decoded.words(), words.as_slice());
        }
    }
}
