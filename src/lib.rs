//! Interactive correction of OCR noise and spelling mistakes in SubRip
//! subtitles.
//!
//! Files are read into [`srt::SubtitleFile`]s by the [`parser`], a
//! [`strategy`] proposes corrections, a [`processor::CorrectionSession`]
//! has the user confirm them through a [`prompt`] surface, and the
//! [`serialiser`] writes the result back.

pub mod cache;
pub mod config;
pub mod error;
pub mod messages;
pub mod parser;
pub mod processor;
pub mod prompt;
pub mod serialiser;
pub mod srt;
pub mod strategy;
