use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use encoding_rs::{Encoding, UTF_8};

use crate::parser;

/// A point in subtitle time, in milliseconds since the start of the file.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeCode(i64);

impl TimeCode {
    pub const fn from_millis(millis: i64) -> Self {
        TimeCode(millis)
    }

    pub const fn as_millis(self) -> i64 {
        self.0
    }
}

/// Renders the fixed-width `HH:MM:SS,mmm` form used on the timing line.
/// Hours widen past two digits rather than wrapping.
impl fmt::Display for TimeCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let total = self.0.unsigned_abs();
        let hours = total / 3_600_000;
        let minutes = (total % 3_600_000) / 60_000;
        let seconds = (total % 60_000) / 1000;
        let millis = total % 1000;
        write!(
            f,
            "{}{:02}:{:02}:{:02},{:03}",
            sign, hours, minutes, seconds, millis
        )
    }
}

impl FromStr for TimeCode {
    type Err = String;

    /// Parses the leading time code of `s`; anything after it is ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parser::timestamp(s.trim_start())
            .map(|(_, ts)| ts)
            .map_err(|_| s.to_string())
    }
}

/// One timed block of text.
///
/// `content` stays `None` until it is set; `Some("")` is a distinct, empty
/// body. A record whose `end` precedes its `begin` can be built and loaded,
/// it is just not [valid](Subtitle::is_valid).
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Subtitle {
    pub begin: TimeCode,
    pub end: TimeCode,
    pub content: Option<String>,
}

impl Subtitle {
    pub fn new(begin: TimeCode, end: TimeCode, content: impl Into<String>) -> Self {
        Self {
            begin,
            end,
            content: Some(content.into()),
        }
    }

    pub fn duration(&self) -> i64 {
        self.end.as_millis() - self.begin.as_millis()
    }

    pub fn is_valid(&self) -> bool {
        self.duration() > 0
    }

    /// Orders by `begin`, then by `end`. Records equal under this ordering
    /// keep their stream order when sorted with [`SubtitleFile::sort_by_timing`].
    pub fn cmp_timing(&self, other: &Subtitle) -> Ordering {
        self.begin
            .cmp(&other.begin)
            .then_with(|| self.end.cmp(&other.end))
    }
}

impl fmt::Display for Subtitle {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[{}, {}] {}",
            self.begin.as_millis(),
            self.end.as_millis(),
            self.content.as_deref().unwrap_or("null")
        )
    }
}

/// The records of one subtitle file, in stream order, plus the encoding the
/// file was read with.
#[derive(Debug, Clone)]
pub struct SubtitleFile {
    subtitles: Vec<Subtitle>,
    encoding: &'static Encoding,
}

impl SubtitleFile {
    pub fn new(encoding: &'static Encoding) -> Self {
        Self {
            subtitles: Vec::new(),
            encoding,
        }
    }

    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }

    pub fn push(&mut self, subtitle: Subtitle) {
        self.subtitles.push(subtitle);
    }

    pub fn len(&self) -> usize {
        self.subtitles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.subtitles.is_empty()
    }

    pub fn subtitles(&self) -> &[Subtitle] {
        &self.subtitles
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Subtitle> {
        self.subtitles.iter_mut()
    }

    /// Stable sort, so ties keep the order they were read in.
    pub fn sort_by_timing(&mut self) {
        self.subtitles.sort_by(Subtitle::cmp_timing);
    }

    /// Zero-based positions of the records that are not valid.
    pub fn invalid_positions(&self) -> Vec<usize> {
        self.subtitles
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.is_valid())
            .map(|(i, _)| i)
            .collect()
    }
}

impl Default for SubtitleFile {
    fn default() -> Self {
        Self::new(UTF_8)
    }
}

impl FromIterator<Subtitle> for SubtitleFile {
    fn from_iter<I: IntoIterator<Item = Subtitle>>(iter: I) -> Self {
        Self {
            subtitles: iter.into_iter().collect(),
            encoding: UTF_8,
        }
    }
}
