use anyhow::Result;

use crate::captions::CaptionSegment;

/// Split float seconds into (hours, minutes, seconds, milliseconds)
fn split_timestamp(seconds: f64) -> (u64, u64, u64, u64) {
    let total_ms = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    };
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    (hours, minutes, secs, millis)
}

/// WebVTT cue timestamp, `HH:MM:SS.mmm`
pub fn seconds_to_vtt(seconds: f64) -> String {
    let (h, m, s, ms) = split_timestamp(seconds);
    format!("{:02}:{:02}:{:02}.{:03}", h, m, s, ms)
}

/// SRT cue timestamp, `HH:MM:SS,mmm`
pub fn seconds_to_srt(seconds: f64) -> String {
    let (h, m, s, ms) = split_timestamp(seconds);
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}

/// Cue text on a single block: blank lines would end the cue early
fn cue_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render segments as a WebVTT document
pub fn format_as_vtt(segments: &[CaptionSegment]) -> String {
    let mut output = String::from("WEBVTT\n\n");

    for segment in segments {
        let text = cue_text(&segment.text);
        if text.is_empty() {
            continue;
        }
        output.push_str(&format!(
            "{} --> {}\n{}\n\n",
            seconds_to_vtt(segment.start_seconds),
            seconds_to_vtt(segment.end_seconds),
            text
        ));
    }

    output
}

/// Render segments as SubRip
pub fn format_as_srt(segments: &[CaptionSegment]) -> String {
    let mut output = String::new();
    let mut index = 0;

    for segment in segments {
        let text = cue_text(&segment.text);
        if text.is_empty() {
            continue;
        }
        index += 1;
        output.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index,
            seconds_to_srt(segment.start_seconds),
            seconds_to_srt(segment.end_seconds),
            text
        ));
    }

    output
}

pub fn format_as_json(segments: &[CaptionSegment]) -> Result<String> {
    Ok(serde_json::to_string_pretty(segments)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(start: f64, end: f64, text: &str) -> CaptionSegment {
        CaptionSegment {
            start_seconds: start,
            end_seconds: end,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_seconds_to_vtt() {
        assert_eq!(seconds_to_vtt(3725.250), "01:02:05.250");
        assert_eq!(seconds_to_vtt(0.0), "00:00:00.000");
        assert_eq!(seconds_to_vtt(59.9996), "00:01:00.000");
        assert_eq!(seconds_to_vtt(-1.0), "00:00:00.000");
        assert_eq!(seconds_to_vtt(360_000.5), "100:00:00.500");
    }

    #[test]
    fn test_seconds_to_srt() {
        assert_eq!(seconds_to_srt(3725.250), "01:02:05,250");
    }

    #[test]
    fn test_vtt_document() {
        let vtt = format_as_vtt(&[
            segment(0.0, 2.5, " Hello there."),
            segment(2.5, 4.0, "   "),
            segment(4.0, 6.123, "General Kenobi!"),
        ]);
        assert_eq!(
            vtt,
            "WEBVTT\n\n\
             00:00:00.000 --> 00:00:02.500\nHello there.\n\n\
             00:00:04.000 --> 00:00:06.123\nGeneral Kenobi!\n\n"
        );
    }

    #[test]
    fn test_srt_numbers_only_emitted_cues() {
        let srt = format_as_srt(&[segment(0.0, 1.0, ""), segment(1.0, 2.0, "one")]);
        assert!(srt.starts_with("1\n00:00:01,000 --> 00:00:02,000\none"));
    }

    #[test]
    fn test_blank_lines_inside_text_are_dropped() {
        let vtt = format_as_vtt(&[segment(0.0, 1.0, "a\n\nb")]);
        assert!(vtt.contains("a\nb\n\n"));
    }
}
