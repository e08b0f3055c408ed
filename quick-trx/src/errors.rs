// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::Utf8PathBuf;
use std::{fmt, io};
use thiserror::Error;

/// An error that occurs while serializing a [`TestRun`](crate::TestRun).
///
/// Returned by [`TestRun::serialize`](crate::TestRun::serialize) and
/// [`TestRun::to_string`](crate::TestRun::to_string).
#[derive(Debug, Error)]
#[error("error serializing TRX report")]
pub struct SerializeError {
    #[source]
    inner: io::Error,
}

impl From<io::Error> for SerializeError {
    fn from(inner: io::Error) -> Self {
        Self { inner }
    }
}

impl From<quick_xml::Error> for SerializeError {
    fn from(err: quick_xml::Error) -> Self {
        Self {
            inner: io::Error::other(err),
        }
    }
}

/// An error that occurs while reading a TRX document: the input is not well-formed XML, or
/// doesn't have the shape of a TRX report.
#[derive(Debug, Error)]
pub struct DeserializeError {
    position: Option<u64>,
    #[source]
    kind: DeserializeErrorKind,
}

impl DeserializeError {
    pub(crate) fn new(kind: DeserializeErrorKind, position: Option<u64>) -> Self {
        Self { position, kind }
    }

    pub(crate) fn io(err: io::Error) -> Self {
        Self::new(DeserializeErrorKind::Io(err), None)
    }

    /// Returns the byte offset into the document at which the error was detected, if known.
    pub fn position(&self) -> Option<u64> {
        self.position
    }

    /// Returns the kind of error that occurred.
    pub fn kind(&self) -> &DeserializeErrorKind {
        &self.kind
    }
}

impl fmt::Display for DeserializeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(position) => write!(f, "malformed TRX report at byte {position}"),
            None => write!(f, "malformed TRX report"),
        }
    }
}

/// The kind of error in a [`DeserializeError`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeserializeErrorKind {
    /// The document could not be read.
    #[error("error reading document")]
    Io(#[source] io::Error),

    /// The document is not well-formed XML.
    #[error("XML syntax error")]
    Xml(#[source] quick_xml::Error),

    /// The document ended while elements were still open.
    #[error("unexpected end of document, unclosed element `{element}`")]
    UnclosedElement { element: String },

    /// An end tag appears after the root element was closed.
    #[error("unmatched end tag `{element}`")]
    UnmatchedEndTag { element: String },

    /// The document has no root element.
    #[error("document has no root element")]
    MissingRoot,

    /// The root element is not `TestRun`.
    #[error("expected root element `TestRun`, found `{found}`")]
    UnexpectedRoot { found: String },

    /// The document has more than one root element.
    #[error("found a second root element `{found}`")]
    MultipleRoots { found: String },

    /// Non-whitespace text appears outside the root element.
    #[error("unexpected text outside the root element")]
    TextOutsideRoot,

    /// A counter attribute is not a non-negative integer.
    #[error("attribute `{attribute}` on `{element}` is not a non-negative integer: {value:?}")]
    InvalidCounter {
        element: &'static str,
        attribute: &'static str,
        value: String,
    },
}

/// An error that occurs while loading a TRX file with [`TestRun::load`](crate::TestRun::load).
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("error reading TRX file `{path}`")]
    Read {
        path: Utf8PathBuf,
        #[source]
        err: io::Error,
    },

    /// The file was read, but its contents are not a well-formed TRX report.
    #[error("TRX file `{path}` is malformed")]
    Malformed {
        path: Utf8PathBuf,
        #[source]
        err: DeserializeError,
    },
}

impl LoadError {
    /// Returns the path that failed to load.
    pub fn path(&self) -> &Utf8PathBuf {
        match self {
            Self::Read { path, .. } | Self::Malformed { path, .. } => path,
        }
    }
}

/// An error that occurs while saving a TRX file with [`TestRun::save`](crate::TestRun::save).
#[derive(Debug, Error)]
pub enum SaveError {
    /// The target path could not be written.
    #[error("error writing TRX file `{path}`")]
    Write {
        path: Utf8PathBuf,
        #[source]
        err: io::Error,
    },

    /// The report could not be serialized.
    #[error("error serializing TRX file `{path}`")]
    Serialize {
        path: Utf8PathBuf,
        #[source]
        err: SerializeError,
    },
}
