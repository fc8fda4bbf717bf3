use crate::error::{Result, SubcorrectError};
use crate::parser::{LINE_SEPARATOR, TIME_SEPARATOR};
use crate::srt::{Subtitle, SubtitleFile};

use std::fs::OpenOptions;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE};
use tracing::{info, warn};

/// Writes `subs` to `output` in the file's encoding.
///
/// Without `overwrite` an existing target is left untouched and
/// [`SubcorrectError::TargetExists`] is returned. An encoding that cannot be
/// written is reported before the target is touched.
pub fn serialise<P: AsRef<Path>>(subs: &SubtitleFile, output: P, overwrite: bool) -> Result<()> {
    let output = output.as_ref();
    let bytes = encode(&render(subs.subtitles()), subs.encoding())?;

    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    let file = options.open(output).map_err(|e| {
        if e.kind() == io::ErrorKind::AlreadyExists {
            SubcorrectError::TargetExists(output.to_path_buf())
        } else {
            SubcorrectError::io(format!("Failed to create '{}'", output.display()), e)
        }
    })?;

    let mut writer = BufWriter::new(file);
    writer
        .write_all(&bytes)
        .and_then(|()| writer.flush())
        .map_err(|e| SubcorrectError::io(format!("Failed to write to '{}'", output.display()), e))?;

    info!("Wrote {} subtitle(s) to '{}'", subs.len(), output.display());
    Ok(())
}

/// Renders the records with fresh 1-based numbers.
pub fn render(subs: &[Subtitle]) -> String {
    let mut buf = Vec::new();
    // Writing into a Vec cannot fail.
    let _ = write_subs(&mut buf, subs);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Positions of the records holding text the file's encoding cannot
/// represent. Such characters are written as HTML numeric character
/// references.
pub fn unencodable_positions(subs: &SubtitleFile) -> Vec<usize> {
    let encoding = subs.encoding();
    subs.subtitles()
        .iter()
        .enumerate()
        .filter(|(_, sub)| {
            sub.content
                .as_deref()
                .map_or(false, |content| encoding.encode(content).2)
        })
        .map(|(i, _)| i)
        .collect()
}

fn encode(text: &str, encoding: &'static Encoding) -> Result<Vec<u8>> {
    // encoding_rs only decodes UTF-16.
    if encoding == UTF_16LE {
        return Ok(text.encode_utf16().flat_map(|unit| unit.to_le_bytes()).collect());
    }
    if encoding == UTF_16BE {
        return Ok(text.encode_utf16().flat_map(|unit| unit.to_be_bytes()).collect());
    }

    let (bytes, used, had_errors) = encoding.encode(text);
    if used != encoding {
        return Err(SubcorrectError::UnsupportedEncoding(encoding.name().to_string()));
    }
    if had_errors {
        warn!(
            "Some characters cannot be represented in {} and were written as character references",
            encoding.name()
        );
    }
    Ok(bytes.into_owned())
}

fn write_subs<W: Write>(buf: &mut W, subs: &[Subtitle]) -> io::Result<()> {
    for (index, sub) in subs.iter().enumerate() {
        write_sub(buf, index + 1, sub)?;
    }
    Ok(())
}

fn write_sub<W: Write>(buf: &mut W, index: usize, sub: &Subtitle) -> io::Result<()> {
    write!(buf, "{}{}", index, LINE_SEPARATOR)?;
    write!(
        buf,
        "{} {} {}{}",
        sub.begin, TIME_SEPARATOR, sub.end, LINE_SEPARATOR
    )?;
    // An absent body is written as an empty one.
    if let Some(content) = sub.content.as_deref() {
        for line in content.lines() {
            write!(buf, "{}{}", line, LINE_SEPARATOR)?;
        }
    }
    write!(buf, "{}", LINE_SEPARATOR)?;
    Ok(())
}
