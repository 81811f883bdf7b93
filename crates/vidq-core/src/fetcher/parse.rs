//! Classification of yt-dlp output lines.
//!
//! Progress comes from a `--progress-template` with a fixed prefix and
//! `|`-separated fields; post-processors announce themselves with a
//! `[Name]` tag; everything else is a plain message.

use super::{DownloadProgress, MessageLevel};

pub const PROGRESS_PREFIX: &str = "vidq-progress|";

/// Post-processor tags yt-dlp prints at the start of a line.
const POST_PROCESSOR_TAGS: &[&str] = &[
    "Merger",
    "ExtractAudio",
    "VideoConvertor",
    "VideoRemuxer",
    "EmbedSubtitle",
    "EmbedThumbnail",
    "Metadata",
    "FixupM3u8",
    "FixupM4a",
    "FixupStretched",
    "FixupDuplicateMoov",
    "FixupTimestamp",
    "SponsorBlock",
    "ModifyChapters",
];

/// Template passed to `--progress-template`.
pub fn progress_template() -> String {
    format!(
        "download:{PROGRESS_PREFIX}%(progress.status)s|%(progress.downloaded_bytes)s|\
         %(progress.total_bytes)s|%(progress.total_bytes_estimate)s|\
         %(progress._percent_str)s|%(progress._speed_str)s|%(progress._eta_str)s|%(info.title)s"
    )
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputLine {
    Progress(DownloadProgress),
    DownloadFinished,
    /// A post-processor tag, e.g. `Merger`.
    PostProcessor(String),
    Message(MessageLevel, String),
    Blank,
}

pub fn parse_line(raw: &str) -> OutputLine {
    let line = strip_ansi(raw);
    let line = line.trim();
    if line.is_empty() {
        return OutputLine::Blank;
    }
    if let Some(rest) = line.strip_prefix(PROGRESS_PREFIX) {
        return parse_progress(rest);
    }
    if let Some(tag) = bracket_tag(line) {
        if POST_PROCESSOR_TAGS.contains(&tag) {
            return OutputLine::PostProcessor(tag.to_string());
        }
    }
    let level = if line.starts_with("ERROR:") {
        MessageLevel::Error
    } else if line.starts_with("WARNING:") {
        MessageLevel::Warning
    } else {
        MessageLevel::Info
    };
    OutputLine::Message(level, line.to_string())
}

fn parse_progress(rest: &str) -> OutputLine {
    let mut fields = rest.splitn(8, '|');
    let status = fields.next().unwrap_or_default().trim();
    let mut next = || field(fields.next());
    let downloaded = next();
    let total = next();
    let estimate = next();
    let percent = next();
    let speed = next();
    let eta = next();
    let title = next();

    if status == "finished" {
        return OutputLine::DownloadFinished;
    }
    OutputLine::Progress(DownloadProgress {
        downloaded_bytes: downloaded.as_deref().and_then(parse_bytes),
        total_bytes: total.as_deref().and_then(parse_bytes),
        total_bytes_estimate: estimate.as_deref().and_then(parse_bytes),
        percent,
        speed,
        eta,
        title,
    })
}

/// Trimmed field, with yt-dlp's "NA" placeholder mapped to None.
fn field(raw: Option<&str>) -> Option<String> {
    let value = raw?.trim();
    if value.is_empty() || value == "NA" || value == "None" {
        None
    } else {
        Some(value.to_string())
    }
}

/// Byte counts may be printed as floats (estimates).
fn parse_bytes(s: &str) -> Option<u64> {
    if let Ok(n) = s.parse::<u64>() {
        return Some(n);
    }
    s.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite() && *f >= 0.0)
        .map(|f| f as u64)
}

fn bracket_tag(line: &str) -> Option<&str> {
    let rest = line.strip_prefix('[')?;
    let end = rest.find(']')?;
    Some(&rest[..end])
}

/// Removes CSI escape sequences (colour codes in `_percent_str` and friends).
fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\u{1b}' {
            if chars.peek() == Some(&'[') {
                chars.next();
                for c in chars.by_ref() {
                    if c.is_ascii_alphabetic() {
                        break;
                    }
                }
            }
            continue;
        }
        out.push(c);
    }
    out
}
