//! Word-by-word Quran tooling.
//!
//! The crate has three layers:
//!
//! * text handling: [`decode_escapes`] turns literal `\uXXXX` sequences from
//!   the upstream API into characters and [`segment_words`] splits verses on
//!   whitespace;
//! * annotation: an [`AnnotationProvider`] supplies transliteration, meaning,
//!   and grammar notes per word ([`StaticGlossary`] is the built-in table);
//! * surfaces: the proxy service (`web` feature), the preview/export client
//!   (`cli` feature), and the [`export`] renderer.

pub mod data;
pub mod export;
pub mod gloss;
pub mod preview;
pub mod selection;
pub mod text;

#[cfg(feature = "cli")]
pub mod client;
#[cfg(feature = "web")]
pub mod upstream;
#[cfg(feature = "web")]
pub mod web;

pub use data::{Chapter, ChapterBundle, ChapterText, Envelope, Verse};
pub use export::{DocumentRenderer, ExportDocument, ExportError, ExportRow, PdfRenderer};
pub use gloss::{
    AnnotationProvider, InclusionFlags, PlaceholderAnnotations, StaticGlossary, describe_word,
};
pub use selection::{ReaderState, Selection, VerseRange};
pub use text::{Decoded, decode_escapes, decode_unicode_text, parse_verse_words, segment_words};
