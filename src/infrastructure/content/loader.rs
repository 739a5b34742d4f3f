//! Reading failure-inducing inputs from disk and splitting them into units.

use std::path::Path;

use crate::domain::models::{UnitKind, UnitSequence};
use crate::domain::ReductionError;

/// Input content split into the configured kind of unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadedContent {
    Bytes(UnitSequence<u8>),
    Chars(UnitSequence<char>),
    Lines(UnitSequence<String>),
    Tokens(UnitSequence<String>),
}

impl LoadedContent {
    /// Split raw bytes into units. Every kind except `Byte` requires UTF-8.
    pub fn from_bytes(bytes: Vec<u8>, kind: UnitKind) -> Result<Self, std::str::Utf8Error> {
        if kind == UnitKind::Byte {
            return Ok(Self::Bytes(UnitSequence::new(bytes)));
        }
        let text = std::str::from_utf8(&bytes)?;
        Ok(match kind {
            UnitKind::Byte | UnitKind::Char => Self::Chars(text.chars().collect()),
            UnitKind::Line => Self::Lines(
                text.split_inclusive('\n')
                    .map(str::to_string)
                    .collect(),
            ),
            UnitKind::Token => Self::Tokens(tokenize(text).map(str::to_string).collect()),
        })
    }

    pub const fn kind(&self) -> UnitKind {
        match self {
            Self::Bytes(_) => UnitKind::Byte,
            Self::Chars(_) => UnitKind::Char,
            Self::Lines(_) => UnitKind::Line,
            Self::Tokens(_) => UnitKind::Token,
        }
    }

    /// Number of units
    pub fn len(&self) -> usize {
        match self {
            Self::Bytes(seq) => seq.len(),
            Self::Chars(seq) => seq.len(),
            Self::Lines(seq) | Self::Tokens(seq) => seq.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Alternating maximal runs of whitespace and non-whitespace.
///
/// Concatenating the tokens reproduces `text` exactly.
pub fn tokenize(text: &str) -> impl Iterator<Item = &str> + '_ {
    let mut rest = text;
    std::iter::from_fn(move || {
        let first = rest.chars().next()?;
        let whitespace = first.is_whitespace();
        let end = rest
            .char_indices()
            .find(|(_, c)| c.is_whitespace() != whitespace)
            .map_or(rest.len(), |(i, _)| i);
        let (token, tail) = rest.split_at(end);
        rest = tail;
        Some(token)
    })
}

/// Loads reducible content from files
pub struct ContentLoader;

impl ContentLoader {
    /// Read `path` and split it into units of `kind`.
    ///
    /// Missing or unreadable files, and non-UTF-8 content for text unit
    /// kinds, are reported as [`ReductionError::Io`].
    pub async fn read(path: impl AsRef<Path>, kind: UnitKind) -> Result<LoadedContent, ReductionError> {
        let path = path.as_ref();
        let io_error = |source| ReductionError::Io {
            path: path.to_path_buf(),
            source,
        };

        let bytes = tokio::fs::read(path).await.map_err(io_error)?;
        let content = LoadedContent::from_bytes(bytes, kind)
            .map_err(|e| io_error(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))?;

        tracing::debug!(
            path = %path.display(),
            unit = %kind,
            units = content.len(),
            "content loaded"
        );
        Ok(content)
    }
}
