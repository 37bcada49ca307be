use super::CaptionSegment;
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SrtError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed timing line {line}: {content}")]
    MalformedTiming { line: usize, content: String },
}

/// Format seconds as `HH:MM:SS,mmm`, rounded to the nearest millisecond.
pub fn format_timestamp(seconds: f64) -> String {
    let seconds = if seconds.is_finite() && seconds > 0.0 {
        seconds
    } else {
        0.0
    };

    let total_ms = (seconds * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

/// Render segments as a SubRip document. Sequence numbers follow document order.
pub fn render(segments: &[CaptionSegment]) -> String {
    let mut out = String::new();

    for (position, segment) in segments.iter().enumerate() {
        out.push_str(&format!("{}\n", position + 1));
        out.push_str(&format!(
            "{} --> {}\n",
            format_timestamp(segment.start),
            format_timestamp(segment.end)
        ));

        // Blank lines inside the text would terminate the cue early
        let text = segment
            .text
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        out.push_str(&text);
        out.push_str("\n\n");
    }

    out
}

/// Parse a SubRip document. Timestamps may use `,` or `.` before the
/// milliseconds; cues without a timing line are skipped.
pub fn parse(input: &str) -> Result<Vec<CaptionSegment>, SrtError> {
    let normalized = input.replace("\r\n", "\n").replace('\r', "\n");
    let normalized = normalized.trim_start_matches('\u{feff}');

    let mut segments = Vec::new();
    let mut block: Vec<(usize, &str)> = Vec::new();

    for (line_no, line) in normalized.lines().enumerate() {
        if line.trim().is_empty() {
            if !block.is_empty() {
                if let Some(segment) = parse_block(&block, segments.len())? {
                    segments.push(segment);
                }
                block.clear();
            }
            continue;
        }
        block.push((line_no + 1, line));
    }

    if !block.is_empty() {
        if let Some(segment) = parse_block(&block, segments.len())? {
            segments.push(segment);
        }
    }

    Ok(segments)
}

/// Write segments to `path` as UTF-8 SubRip.
pub fn write_file(path: &Path, segments: &[CaptionSegment]) -> Result<(), SrtError> {
    fs::write(path, render(segments))?;
    Ok(())
}

/// Read and parse a SubRip file.
pub fn read_file(path: &Path) -> Result<Vec<CaptionSegment>, SrtError> {
    let raw = fs::read_to_string(path)?;
    parse(&raw)
}

fn parse_block(
    block: &[(usize, &str)],
    parsed_so_far: usize,
) -> Result<Option<CaptionSegment>, SrtError> {
    let timing_pos = match block.iter().position(|(_, line)| line.contains("-->")) {
        Some(pos) => pos,
        None => {
            tracing::debug!("Skipping SubRip block without timing at line {}", block[0].0);
            return Ok(None);
        }
    };

    let (line_no, timing_line) = block[timing_pos];
    let malformed = || SrtError::MalformedTiming {
        line: line_no,
        content: timing_line.to_string(),
    };

    let caps = timing_re()
        .captures(timing_line.trim())
        .ok_or_else(malformed)?;
    let start = to_seconds(&caps[1], &caps[2], &caps[3], &caps[4]).ok_or_else(malformed)?;
    let end = to_seconds(&caps[5], &caps[6], &caps[7], &caps[8]).ok_or_else(malformed)?;

    let index = timing_pos
        .checked_sub(1)
        .and_then(|pos| block[pos].1.trim().parse::<u32>().ok())
        .unwrap_or(parsed_so_far as u32 + 1);

    let text = block[timing_pos + 1..]
        .iter()
        .map(|(_, line)| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n");

    Ok(Some(CaptionSegment::new(index, start, end, text)))
}

fn to_seconds(hours: &str, minutes: &str, seconds: &str, millis: &str) -> Option<f64> {
    let hours: u64 = hours.parse().ok()?;
    let minutes: u64 = minutes.parse().ok()?;
    let seconds: u64 = seconds.parse().ok()?;
    let millis: u64 = millis.parse().ok()?;

    if minutes >= 60 || seconds >= 60 {
        return None;
    }

    let total_ms = ((hours * 60 + minutes) * 60 + seconds) * 1000 + millis;
    Some(total_ms as f64 / 1000.0)
}

fn timing_re() -> &'static Regex {
    static TIMING_RE: OnceLock<Regex> = OnceLock::new();
    TIMING_RE.get_or_init(|| {
        Regex::new(
            r"^(\d{1,}):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d{1,}):(\d{2}):(\d{2})[,.](\d{3})",
        )
        .expect("valid timing regex")
    })
}
