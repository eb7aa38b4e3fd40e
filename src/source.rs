//! Input a table can be read from
//!
//! All sources are materialized to one UTF-8 text buffer before parsing starts.

use std::{
    borrow::Cow,
    io::Read,
    str,
};

use crate::error::ParseError;

/// Text, bytes or a stream holding a table
pub enum Source<'a> {
    Text(Cow<'a, str>),
    Bytes(Cow<'a, [u8]>),
    Reader(Box<dyn Read + 'a>),
}

impl<'a> Source<'a> {
    /// Pre-split lines, joined with `\n`
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut text = String::new();
        for (i, line) in lines.into_iter().enumerate() {
            if i > 0 {
                text.push('\n');
            }
            text.push_str(line.as_ref());
        }
        Self::Text(Cow::Owned(text))
    }

    /// A byte stream, read to its end
    pub fn reader(reader: impl Read + 'a) -> Self {
        Self::Reader(Box::new(reader))
    }

    pub(crate) fn into_text(self) -> Result<Cow<'a, str>, ParseError> {
        match self {
            Self::Text(text) => Ok(text),
            Self::Bytes(Cow::Borrowed(bytes)) => Ok(Cow::Borrowed(str::from_utf8(bytes)?)),
            Self::Bytes(Cow::Owned(bytes)) => String::from_utf8(bytes)
                .map(Cow::Owned)
                .map_err(|e| e.utf8_error().into()),
            Self::Reader(mut reader) => {
                let mut bytes = Vec::new();
                reader.read_to_end(&mut bytes)?;
                Self::Bytes(Cow::Owned(bytes)).into_text()
            }
        }
    }
}

impl<'a> From<&'a str> for Source<'a> {
    fn from(text: &'a str) -> Self {
        Self::Text(Cow::Borrowed(text))
    }
}

impl From<String> for Source<'_> {
    fn from(text: String) -> Self {
        Self::Text(Cow::Owned(text))
    }
}

impl<'a> From<&'a String> for Source<'a> {
    fn from(text: &'a String) -> Self {
        Self::Text(Cow::Borrowed(text))
    }
}

impl<'a> From<&'a [u8]> for Source<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::Bytes(Cow::Borrowed(bytes))
    }
}

impl From<Vec<u8>> for Source<'_> {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Cow::Owned(bytes))
    }
}
