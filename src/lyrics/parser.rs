//! LRC format parser
//!
//! Parses synchronized lyrics in LRC format:
//! [mm:ss.xx] Lyrics line here
//!
//! Example:
//! [00:12.34] Hello world
//! [00:15.00][01:02.50] Repeated chorus line

use crate::subsonic::models::StructuredLyrics;

/// A single line of lyrics with timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LrcLine {
    /// Milliseconds from the start of the song; 0 for unsynced lines.
    pub time_ms: u64,
    pub text: String,
}

impl LrcLine {
    pub fn new(time_ms: u64, text: impl Into<String>) -> Self {
        Self {
            time_ms,
            text: text.into(),
        }
    }
}

/// Where a set of lyrics came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LyricsSource {
    Server,
    ServerLegacy,
    Lrclib,
    Cache,
}

impl LyricsSource {
    pub fn label(self) -> &'static str {
        match self {
            LyricsSource::Server => "server",
            LyricsSource::ServerLegacy => "server (legacy)",
            LyricsSource::Lrclib => "lrclib",
            LyricsSource::Cache => "cache",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedLyrics {
    pub lines: Vec<LrcLine>,
    pub synced: bool,
    pub source: LyricsSource,
}

impl ParsedLyrics {
    /// Parse LRC or plain text. The result is synced when at least one line
    /// carries a timestamp; untimed lines are dropped from synced lyrics.
    /// An `[offset:]` tag shifts every timestamp like the server offset does.
    pub fn parse(content: &str, source: LyricsSource) -> Self {
        let mut timed = Vec::new();
        let mut plain = Vec::new();
        let mut offset = 0i64;

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if is_metadata(line) {
                if let Some(ms) = offset_tag(line) {
                    offset = ms;
                }
                continue;
            }
            if let Some(parsed) = parse_timed_line(line) {
                timed.extend(parsed);
            } else if !line.starts_with('[') {
                plain.push(LrcLine::new(0, line));
            }
        }

        if timed.is_empty() {
            return Self {
                lines: plain,
                synced: false,
                source,
            };
        }
        for line in &mut timed {
            line.time_ms = line.time_ms.saturating_add_signed(-offset);
        }
        timed.sort_by_key(|l| l.time_ms);
        Self {
            lines: timed,
            synced: true,
            source,
        }
    }

    /// Server lyrics arrive pre-split. A positive `offset` shows lines earlier.
    pub fn from_structured(lyrics: &StructuredLyrics) -> Self {
        let offset = lyrics.offset.unwrap_or(0);
        let mut lines: Vec<LrcLine> = lyrics
            .line
            .iter()
            .map(|l| {
                let start = if lyrics.synced {
                    l.start.unwrap_or(0).saturating_add_signed(-offset)
                } else {
                    0
                };
                LrcLine::new(start, l.value.trim())
            })
            .collect();
        if lyrics.synced {
            lines.sort_by_key(|l| l.time_ms);
        }
        Self {
            lines,
            synced: lyrics.synced,
            source: LyricsSource::Server,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.iter().all(|l| l.text.is_empty())
    }

    /// Index of the line being sung at `position_ms`, if any.
    pub fn current_line(&self, position_ms: u64) -> Option<usize> {
        if !self.synced {
            return None;
        }
        let upcoming = self.lines.partition_point(|l| l.time_ms <= position_ms);
        upcoming.checked_sub(1)
    }

    /// Render back to LRC (or plain text) for the local cache.
    pub fn to_lrc(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            if self.synced {
                let cs = (line.time_ms % 1000) / 10;
                let secs = (line.time_ms / 1000) % 60;
                let mins = line.time_ms / 60_000;
                out.push_str(&format!("[{:02}:{:02}.{:02}]", mins, secs, cs));
            }
            out.push_str(&line.text);
            out.push('\n');
        }
        out
    }
}

/// Tags like `[ti:Title]` or `[offset:+250]`.
fn is_metadata(line: &str) -> bool {
    let Some(rest) = line.strip_prefix('[') else {
        return false;
    };
    let Some(end) = rest.find(']') else {
        return false;
    };
    let Some((tag, _)) = rest[..end].split_once(':') else {
        return false;
    };
    !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphabetic())
}

/// Milliseconds from an `[offset:+250]` tag.
fn offset_tag(line: &str) -> Option<i64> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?;
    let (tag, value) = inner.split_once(':')?;
    if !tag.eq_ignore_ascii_case("offset") {
        return None;
    }
    value.trim().parse().ok()
}

/// `[00:12.34]Lyrics` or `[00:12.34][00:15.00]Lyrics`
fn parse_timed_line(line: &str) -> Option<Vec<LrcLine>> {
    let mut stamps = Vec::new();
    let mut rest = line;

    while let Some(inner) = rest.strip_prefix('[') {
        let Some(end) = inner.find(']') else {
            break;
        };
        let Some(ms) = parse_timestamp(&inner[..end]) else {
            break;
        };
        stamps.push(ms);
        rest = &inner[end + 1..];
    }

    if stamps.is_empty() {
        return None;
    }
    let text = rest.trim();
    Some(stamps.into_iter().map(|ms| LrcLine::new(ms, text)).collect())
}

/// `mm:ss`, `mm:ss.xx`, `mm:ss.xxx` or `mm:ss:xx` to milliseconds.
fn parse_timestamp(s: &str) -> Option<u64> {
    let parts: Vec<&str> = s.split([':', '.']).collect();
    let (min, sec, frac) = match parts.as_slice() {
        [m, s] => (m, s, None),
        [m, s, f] => (m, s, Some(*f)),
        _ => return None,
    };
    let min: u64 = min.parse().ok()?;
    let sec: u64 = sec.parse().ok()?;
    if sec >= 60 {
        return None;
    }
    let ms = match frac {
        None => 0,
        Some(f) => {
            let n: u64 = f.parse().ok()?;
            match f.len() {
                1 => n * 100,
                2 => n * 10,
                3 => n,
                _ => return None,
            }
        }
    };
    Some(min * 60_000 + sec * 1000 + ms)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsonic::models::LyricLine;

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("00:12"), Some(12000));
        assert_eq!(parse_timestamp("01:30"), Some(90000));
        assert_eq!(parse_timestamp("00:12.34"), Some(12340));
        assert_eq!(parse_timestamp("00:12.340"), Some(12340));
        assert_eq!(parse_timestamp("00:12:34"), Some(12340));
        assert_eq!(parse_timestamp("ar:Someone"), None);
        assert_eq!(parse_timestamp("00:75"), None);
    }

    #[test]
    fn test_parse_lrc() {
        let lrc = r#"
[ti:Test Song]
[ar:Test Artist]
[00:15.00]Second line
[00:12.34]First line
[00:20.00][01:00.00]Chorus
"#;
        let parsed = ParsedLyrics::parse(lrc, LyricsSource::Lrclib);
        assert!(parsed.synced);
        assert_eq!(parsed.lines.len(), 4);
        assert_eq!(parsed.lines[0], LrcLine::new(12340, "First line"));
        assert_eq!(parsed.lines[3], LrcLine::new(60000, "Chorus"));
    }

    #[test]
    fn plain_text_is_unsynced() {
        let parsed = ParsedLyrics::parse("one\n\ntwo\n", LyricsSource::ServerLegacy);
        assert!(!parsed.synced);
        assert_eq!(parsed.lines.len(), 2);
        assert_eq!(parsed.current_line(10_000), None);
    }

    #[test]
    fn current_line_follows_position() {
        let parsed = ParsedLyrics::parse(
            "[00:05.00]a\n[00:10.00]b\n[00:20.00]c",
            LyricsSource::Lrclib,
        );
        assert_eq!(parsed.current_line(0), None);
        assert_eq!(parsed.current_line(5_000), Some(0));
        assert_eq!(parsed.current_line(19_999), Some(1));
        assert_eq!(parsed.current_line(600_000), Some(2));
    }

    #[test]
    fn lrc_output_parses_back() {
        let parsed = ParsedLyrics::parse("[01:02.50]hello\n[00:01.00]hi", LyricsSource::Lrclib);
        let lrc = parsed.to_lrc();
        assert_eq!(lrc, "[00:01.00]hi\n[01:02.50]hello\n");
        let again = ParsedLyrics::parse(&lrc, LyricsSource::Cache);
        assert_eq!(again.lines, parsed.lines);
    }

    #[test]
    fn lrc_offset_tag_shifts_lines() {
        let parsed = ParsedLyrics::parse(
            "[offset:+250]\n[00:01.00]a\n[00:00.10]b",
            LyricsSource::Lrclib,
        );
        assert_eq!(parsed.lines[0], LrcLine::new(0, "b"));
        assert_eq!(parsed.lines[1], LrcLine::new(750, "a"));

        let later = ParsedLyrics::parse("[00:01.00]a\n[offset:-500]", LyricsSource::Lrclib);
        assert_eq!(later.lines[0], LrcLine::new(1_500, "a"));
    }

    #[test]
    fn structured_lyrics_apply_offset() {
        let lyrics = StructuredLyrics {
            lang: Some("eng".into()),
            synced: true,
            offset: Some(500),
            line: vec![
                LyricLine {
                    start: Some(2_000),
                    value: "second".into(),
                },
                LyricLine {
                    start: Some(300),
                    value: "first".into(),
                },
            ],
        };
        let parsed = ParsedLyrics::from_structured(&lyrics);
        assert!(parsed.synced);
        assert_eq!(parsed.lines[0], LrcLine::new(0, "first"));
        assert_eq!(parsed.lines[1], LrcLine::new(1_500, "second"));
        assert_eq!(parsed.source, LyricsSource::Server);
    }
}
