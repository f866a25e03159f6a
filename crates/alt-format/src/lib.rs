//! ALT container format
//!
//! A thin, section-oriented binary layout for model files:
//!
//! ```text
//! StartMarker (24 B) | pad | Section header (16 B) | payload | pad | ... | END (4 B)
//! ```
//!
//! [`MagicFile`] owns the stream and enforces marker order, identity checks,
//! and alignment padding. The [`field`] module encodes the scalars and
//! strings that section payloads are made of.

pub mod catalog;
pub mod container;
pub mod error;
pub mod field;

pub use alt_common::constants;
pub use catalog::{Catalog, SectionEntry, scan, scan_stream};
pub use container::{MagicFile, Mode, SectionKind, SectionMarker, StartMarker, padding_for};
pub use error::{ErrorKind, FormatError, Result};
