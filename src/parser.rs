use crate::error::{Result, SubcorrectError};
use crate::srt::{Subtitle, SubtitleFile, TimeCode};

use std::io::BufRead;
use std::path::Path;

use encoding_rs::{Encoding, REPLACEMENT, UTF_8};
use nom::bytes::complete::{tag, take_while_m_n};
use nom::character::complete::{digit1, one_of};
use nom::combinator::{all_consuming, map_res, opt, recognize};
use nom::sequence::pair;
use nom::IResult;
use tracing::{debug, trace, warn};

/// Separates the two time codes of a timing line.
pub const TIME_SEPARATOR: &str = "-->";

/// Joins the lines of a record body.
#[cfg(windows)]
pub const LINE_SEPARATOR: &str = "\r\n";
#[cfg(not(windows))]
pub const LINE_SEPARATOR: &str = "\n";

/// Streams SubRip records out of a line source, one block at a time.
///
/// The parser keeps no state across blocks besides the line counter used
/// in diagnostics. Once a block fails to parse the parser is spent: the
/// iterator yields the error and then stops.
pub struct Parser<R> {
    reader: R,
    line_number: usize,
    failed: bool,
}

impl<R: BufRead> Parser<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
            failed: false,
        }
    }

    /// Number of lines consumed so far.
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Reads the next record, or `None` once the stream only holds blank lines.
    pub fn read_subtitle(&mut self) -> Result<Option<Subtitle>> {
        let index_line = loop {
            match self.next_line()? {
                None => return Ok(None),
                Some(line) if line.is_empty() => continue,
                Some(line) => break line,
            }
        };

        let index = match subtitle_index(&index_line) {
            Ok((_, index)) => index,
            Err(_) => {
                warn!("Could not parse '{}' as a subtitle number", index_line);
                return Err(SubcorrectError::MalformedIndex {
                    line: self.line_number,
                    text: index_line,
                });
            }
        };
        debug!("Reading subtitle #{}", index);

        let timing_line = self.next_line()?.unwrap_or_default();
        let (begin, end) = self.timing(&timing_line)?;
        trace!("Begin: {}, end: {}", begin, end);

        let mut body = Vec::new();
        while let Some(line) = self.next_line()? {
            if line.is_empty() {
                break;
            }
            body.push(line);
        }

        Ok(Some(Subtitle::new(begin, end, body.join(LINE_SEPARATOR))))
    }

    fn timing(&self, line: &str) -> Result<(TimeCode, TimeCode)> {
        let mut fields: Vec<&str> = line.split(TIME_SEPARATOR).collect();
        while fields.last().map_or(false, |f| f.is_empty()) {
            fields.pop();
        }
        if fields.len() < 2 {
            return Err(SubcorrectError::MalformedTiming {
                line: self.line_number,
                text: line.to_string(),
            });
        }
        let begin = self.time_code(fields[0])?;
        let end = self.time_code(fields[1])?;
        Ok((begin, end))
    }

    fn time_code(&self, field: &str) -> Result<TimeCode> {
        field.parse().map_err(|_| {
            warn!("Could not parse '{}' as a time code", field);
            SubcorrectError::UnparsableTimeCode {
                line: self.line_number,
                field: field.to_string(),
            }
        })
    }

    /// Next line with its terminator and surrounding whitespace removed.
    fn next_line(&mut self) -> Result<Option<String>> {
        let mut buf = String::new();
        let read = self.reader.read_line(&mut buf).map_err(|e| {
            SubcorrectError::io(format!("Failed to read line {}", self.line_number + 1), e)
        })?;
        if read == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        let mut line = buf.as_str();
        if self.line_number == 1 {
            line = line.trim_start_matches('\u{FEFF}');
        }
        Ok(Some(line.trim().to_string()))
    }
}

impl<R: BufRead> Iterator for Parser<R> {
    type Item = Result<Subtitle>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let next = self.read_subtitle().transpose();
        if let Some(Err(_)) = next {
            self.failed = true;
        }
        next
    }
}

/// Resolves an encoding label such as `utf-8` or `windows-1252`.
pub fn encoding_for_label(label: &str) -> Result<&'static Encoding> {
    match Encoding::for_label(label.trim().as_bytes()) {
        Some(encoding) if encoding != REPLACEMENT => Ok(encoding),
        _ => Err(SubcorrectError::UnsupportedEncoding(label.to_string())),
    }
}

/// Parses a whole in-memory document.
pub fn parse_str(input: &str) -> Result<SubtitleFile> {
    collect(Parser::new(input.as_bytes()), UTF_8)
}

/// Reads a subtitle file in the declared encoding. The encoding is taken
/// as given; no sniffing is done. Malformed byte sequences are replaced
/// with U+FFFD and logged.
pub fn read_file<P: AsRef<Path>>(path: P, encoding: &'static Encoding) -> Result<SubtitleFile> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)
        .map_err(|e| SubcorrectError::io(format!("Failed to read '{}'", path.display()), e))?;

    let (text, had_errors) = encoding.decode_without_bom_handling(&bytes);
    if had_errors {
        warn!(
            "'{}' contains sequences that are not valid {}",
            path.display(),
            encoding.name()
        );
    }
    let subs = collect(Parser::new(text.as_bytes()), encoding)?;

    let invalid = subs.invalid_positions();
    if !invalid.is_empty() {
        warn!(
            "{} subtitle(s) in '{}' end before they begin",
            invalid.len(),
            path.display()
        );
    }
    Ok(subs)
}

fn collect<R: BufRead>(parser: Parser<R>, encoding: &'static Encoding) -> Result<SubtitleFile> {
    let mut subs = SubtitleFile::new(encoding);
    for sub in parser {
        subs.push(sub?);
    }
    Ok(subs)
}

fn subtitle_index(input: &str) -> IResult<&str, i64> {
    map_res(
        all_consuming(recognize(pair(opt(one_of("+-")), digit1))),
        |s: &str| s.parse(),
    )(input)
}

/// Parses a leading `HH:MM:SS,mmm` time code, optionally negative. Short
/// fields are accepted: hours, minutes and seconds are left-padded,
/// milliseconds right-padded.
pub(crate) fn timestamp(input: &str) -> IResult<&str, TimeCode> {
    const MILLIS_MAX: usize = 3;
    let take_millis = || {
        map_res(
            take_while_m_n(0, MILLIS_MAX, |c: char| c.is_ascii_digit()),
            |s: &str| {
                if s.len() < MILLIS_MAX {
                    // `,2` is read as `,200`.
                    format!("{:0<3}", s).parse::<i64>()
                } else {
                    s.parse()
                }
            },
        )
    };

    let take_field = |max: usize| {
        map_res(
            take_while_m_n(0, max, |c: char| c.is_ascii_digit()),
            |s: &str| {
                if s.is_empty() {
                    Ok(0)
                } else {
                    s.parse::<i64>()
                }
            },
        )
    };

    let (input, sign) = opt(tag("-"))(input)?;
    let (input, hours) = take_field(9)(input)?;
    let (input, _) = tag(":")(input)?;
    let (input, minutes) = take_field(2)(input)?;
    let (input, _) = tag(":")(input)?;
    let (input, seconds) = take_field(2)(input)?;
    let (input, _) = tag(",")(input)?;
    let (input, millis) = take_millis()(input)?;

    let total = millis + seconds * 1000 + minutes * 60 * 1000 + hours * 60 * 60 * 1000;
    let total = if sign.is_some() { -total } else { total };
    Ok((input, TimeCode::from_millis(total)))
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! test_read_ts {
        ($($name:ident: $value:expr,)*) => {
        $(
            #[test]
            fn $name() {
                let (input, expected) = $value;

                let (_, ts) = timestamp(input).unwrap();

                assert_eq!(ts.as_millis(), expected);
            }
        )*
        }
    }

    test_read_ts! {
        test_read_ts_0: ("00:00:01,200", 1200),
        test_read_ts_1: ("00:00:01,2", 1200),
        test_read_ts_2: ("00:00:01,002", 1002),
        test_read_ts_3: ("00:00:01,02", 1020),
        test_read_ts_4: ("00:00:01,", 1000),
        test_read_ts_5: ("1:1:1,200", 3661200),
        test_read_ts_6: ("01:01:01,200", 3661200),
        test_read_ts_7: ("100:00:00,001", 360_000_001),
        test_read_ts_8: ("00:00:02,500 X1:40 X2:600", 2500),
        test_read_ts_9: ("-00:00:00,500", -500),
        test_read_ts_10: ("-01:00:00,000", -3_600_000),
    }

    const SAMPLE: &str = "\u{FEFF}1\n\
        00:00:01,000 --> 00:00:02,500\n\
        Hello ther\n\
        \n\
        \n\
        2\r\n\
        00:00:03,000 --> 00:00:04,000\r\n\
        \x20 <i>First line</i>  \r\n\
        Second line\r\n\
        \r\n\
        3\n\
        00:00:05,000 --> 00:00:04,000\n";

    #[test]
    fn parses_blocks_with_variable_separators() {
        let subs = parse_str(SAMPLE).unwrap();
        let subs = subs.subtitles();
        assert_eq!(subs.len(), 3);

        assert_eq!(subs[0].begin.as_millis(), 1000);
        assert_eq!(subs[0].end.as_millis(), 2500);
        assert_eq!(subs[0].content.as_deref(), Some("Hello ther"));

        let joined = format!("<i>First line</i>{}Second line", LINE_SEPARATOR);
        assert_eq!(subs[1].content.as_deref(), Some(joined.as_str()));

        assert!(!subs[2].is_valid());
    }

    #[test]
    fn empty_body_is_empty_not_absent() {
        let subs = parse_str("1\n00:00:01,000 --> 00:00:02,000\n\n").unwrap();
        assert_eq!(subs.subtitles()[0].content.as_deref(), Some(""));
    }

    #[test]
    fn blank_input_yields_no_records() {
        assert!(parse_str("").unwrap().is_empty());
        assert!(parse_str("\n  \n\t\n").unwrap().is_empty());
    }

    #[test]
    fn non_numeric_index_is_malformed() {
        let err = parse_str("\n\nabc\n00:00:01,000 --> 00:00:02,000\nHi\n").unwrap_err();
        match err {
            SubcorrectError::MalformedIndex { line, text } => {
                assert_eq!(line, 3);
                assert_eq!(text, "abc");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn single_time_field_is_malformed_timing() {
        let err = parse_str("1\n00:00:01,000\nHi\n").unwrap_err();
        assert!(matches!(err, SubcorrectError::MalformedTiming { line: 2, .. }));

        let err = parse_str("1\n00:00:01,000 -->\nHi\n").unwrap_err();
        assert!(matches!(err, SubcorrectError::MalformedTiming { line: 2, .. }));
    }

    #[test]
    fn truncated_block_is_malformed_timing() {
        let err = parse_str("1\n").unwrap_err();
        assert!(matches!(err, SubcorrectError::MalformedTiming { line: 1, .. }));
    }

    #[test]
    fn bad_time_field_is_unparsable() {
        let err = parse_str("1\n00:00:01,000 --> later\nHi\n").unwrap_err();
        match err {
            SubcorrectError::UnparsableTimeCode { line, field } => {
                assert_eq!(line, 2);
                assert_eq!(field, " later");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn iterator_stops_after_first_error() {
        let input = "1\n00:00:01,000 --> 00:00:02,000\nA\n\nx\n\n2\n00:00:03,000 --> 00:00:04,000\nB\n";
        let mut parser = Parser::new(input.as_bytes());
        assert!(parser.next().unwrap().is_ok());
        assert!(parser.next().unwrap().is_err());
        assert!(parser.next().is_none());
    }

    #[test]
    fn reads_declared_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("latin1.srt");
        let (bytes, _, _) = encoding_rs::WINDOWS_1252
            .encode("1\n00:00:01,000 --> 00:00:02,000\nD\u{e9}j\u{e0} vu\n");
        std::fs::write(&path, &bytes).unwrap();

        let encoding = encoding_for_label("latin1").unwrap();
        let subs = read_file(&path, encoding).unwrap();
        assert_eq!(subs.encoding(), encoding_rs::WINDOWS_1252);
        assert_eq!(subs.subtitles()[0].content.as_deref(), Some("D\u{e9}j\u{e0} vu"));
    }

    #[test]
    fn invalid_bytes_are_replaced_in_every_encoding() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.srt");
        let mut bytes = b"1\n00:00:01,000 --> 00:00:02,000\nab".to_vec();
        bytes.push(0xFF);
        bytes.extend_from_slice(b"c\n");
        std::fs::write(&path, &bytes).unwrap();

        let subs = read_file(&path, UTF_8).unwrap();
        assert_eq!(subs.subtitles()[0].content.as_deref(), Some("ab\u{FFFD}c"));

        let subs = read_file(&path, encoding_rs::SHIFT_JIS).unwrap();
        assert_eq!(subs.len(), 1);
    }

    #[test]
    fn unknown_encoding_label_is_rejected() {
        assert!(matches!(
            encoding_for_label("klingon"),
            Err(SubcorrectError::UnsupportedEncoding(_))
        ));
        // Labels of the write-incapable replacement encoding.
        assert!(matches!(
            encoding_for_label("iso-2022-kr"),
            Err(SubcorrectError::UnsupportedEncoding(_))
        ));
    }
}
