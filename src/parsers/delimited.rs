//! Splits a logical line into fields separated by a delimiter
//!
//! The field state machine here is the only place that knows how quotes open and close.
//! The line normalizer runs it without collecting fields to learn whether a physical line
//! ends inside a quoted field.

use std::fmt;

use log::trace;

use crate::config::Dialect;

use super::lines::QuoteState;

/// Whitespace skipped or trimmed by stripping dialects
pub(crate) fn is_space(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Position of the field state machine between two characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldState {
    /// Before the first character of a field
    StartField,
    /// Inside an unquoted field, or after the closing quote of a quoted one
    Field,
    /// Right after an opening quote or an embedded line break
    StartQuoted,
    Quoted,
}

impl FieldState {
    pub fn quote_state(self) -> QuoteState {
        match self {
            Self::StartQuoted | Self::Quoted => QuoteState::InsideQuote,
            Self::StartField | Self::Field => QuoteState::Normal,
        }
    }
}

/// Receives the characters and field boundaries found by [`DelimitedParser::run`]
pub trait FieldSink {
    fn push(&mut self, c: char);
    fn end_field(&mut self);
}

/// Scanning only, nothing is collected
impl FieldSink for () {
    fn push(&mut self, _c: char) {}
    fn end_field(&mut self) {}
}

/// Reusable buffer holding the fields of one row
#[derive(Default, Clone)]
pub struct Fields {
    buf: String,
    ends: Vec<usize>,
    start: usize,
    trim: bool,
}

impl Fields {
    fn reset(&mut self, trim: bool) {
        self.buf.clear();
        self.ends.clear();
        self.start = 0;
        self.trim = trim;
    }

    pub fn len(&self) -> usize {
        self.ends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        let end = *self.ends.get(index)?;
        let start = if index == 0 { 0 } else { self.ends[index - 1] };
        Some(&self.buf[start..end])
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        (0..self.len()).filter_map(|i| self.get(i))
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.iter().map(str::to_owned).collect()
    }
}

impl fmt::Debug for Fields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl FieldSink for Fields {
    fn push(&mut self, c: char) {
        self.buf.push(c);
    }

    fn end_field(&mut self) {
        if self.trim {
            let kept = self.buf[self.start..].trim_end_matches(is_space).len();
            self.buf.truncate(self.start + kept);
        }
        self.ends.push(self.buf.len());
        self.start = self.buf.len();
    }
}

/// Parser for character separated input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimitedParser {
    dialect: Dialect,
}

impl DelimitedParser {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    /// Feeds `text` through the field state machine starting from `state`.
    ///
    /// A `'\n'` in `text` only ever appears inside a quoted field, where it is dropped.
    pub fn run<S: FieldSink>(&self, text: &str, mut state: FieldState, sink: &mut S) -> FieldState {
        let Dialect {
            delimiter,
            quote,
            strip_whitespace: strip,
            ..
        } = self.dialect;
        let mut chars = text.chars().peekable();
        while let Some(c) = chars.next() {
            state = match state {
                FieldState::StartField => {
                    if strip && is_space(c) {
                        FieldState::StartField
                    } else if c == delimiter {
                        sink.end_field();
                        FieldState::StartField
                    } else if c == quote {
                        FieldState::StartQuoted
                    } else {
                        sink.push(c);
                        FieldState::Field
                    }
                }
                FieldState::Field => {
                    if c == delimiter {
                        sink.end_field();
                        FieldState::StartField
                    } else {
                        sink.push(c);
                        FieldState::Field
                    }
                }
                FieldState::StartQuoted | FieldState::Quoted => {
                    if c == quote {
                        if chars.peek() == Some(&quote) {
                            chars.next();
                            sink.push(quote);
                            FieldState::Quoted
                        } else {
                            FieldState::Field
                        }
                    } else if c == '\n' {
                        if strip {
                            FieldState::StartQuoted
                        } else {
                            FieldState::Quoted
                        }
                    } else if strip && state == FieldState::StartQuoted && is_space(c) {
                        FieldState::StartQuoted
                    } else {
                        sink.push(c);
                        FieldState::Quoted
                    }
                }
            };
        }
        state
    }

    /// Splits one logical line into `fields`, replacing their previous content
    pub fn tokenize(&self, text: &str, fields: &mut Fields) {
        fields.reset(self.dialect.strip_whitespace);
        match self.run(text, FieldState::StartField, fields) {
            FieldState::StartField => {
                // trailing delimiter
                let dropped = self.dialect.strip_whitespace && is_space(self.dialect.delimiter);
                if !fields.is_empty() && !dropped {
                    fields.end_field();
                }
            }
            FieldState::Field | FieldState::StartQuoted | FieldState::Quoted => {
                fields.end_field();
            }
        }
        trace!("Parsed row: {:?}", fields);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Flavor;

    fn split(flavor: Flavor, text: &str) -> Vec<String> {
        let parser = DelimitedParser::new(flavor.dialect());
        let mut fields = Fields::default();
        parser.tokenize(text, &mut fields);
        fields.to_vec()
    }

    fn split_with(dialect: Dialect, text: &str) -> Vec<String> {
        let mut fields = Fields::default();
        DelimitedParser::new(dialect).tokenize(text, &mut fields);
        fields.to_vec()
    }

    mod whitespace {
        use super::*;

        #[test]
        fn test_space_delimiter_collapses_runs() {
            assert_eq!(split(Flavor::Basic, "  1   2 \t 3  "), vec!["1", "2", "3"]);
        }

        #[test]
        fn test_lstrip_fields() {
            let dialect = Dialect {
                delimiter: ',',
                ..Flavor::Basic.dialect()
            };
            assert_eq!(split_with(dialect, "     1,  2,   \t3"), vec!["1", "2", "3"]);
            assert_eq!(split_with(dialect, " A,\t\t B,  C"), vec!["A", "B", "C"]);
        }

        #[test]
        fn test_rstrip_fields() {
            let dialect = Dialect {
                delimiter: ',',
                ..Flavor::Basic.dialect()
            };
            assert_eq!(split_with(dialect, "A\t,B ,C\t \t "), vec!["A", "B", "C"]);
            assert_eq!(split_with(dialect, "  \ta ,b , c "), vec!["a", "b", "c"]);
        }

        #[test]
        fn test_tab_preserves_whitespace() {
            assert_eq!(
                split(Flavor::Tab, " a \t b\t c "),
                vec![" a ", " b", " c "]
            );
        }
    }

    mod trailing_delimiter {
        use super::*;

        #[test]
        fn test_csv_trailing_comma() {
            assert_eq!(split(Flavor::Csv, "5, 5,"), vec!["5", "5", ""]);
            assert_eq!(split(Flavor::Csv, ","), vec!["", ""]);
        }

        #[test]
        fn test_tab_trailing_tab() {
            assert_eq!(split(Flavor::Tab, "1\t2\t"), vec!["1", "2", ""]);
            assert_eq!(split(Flavor::Tab, "1\t\t3"), vec!["1", "", "3"]);
        }

        #[test]
        fn test_basic_trailing_space() {
            assert_eq!(split(Flavor::Basic, "1 2 "), vec!["1", "2"]);
        }
    }

    mod quoting {
        use super::*;

        #[test]
        fn test_quoted_delimiter() {
            assert_eq!(split(Flavor::Basic, "\"A B\" C D"), vec!["A B", "C", "D"]);
            assert_eq!(split(Flavor::Csv, "\"a,b\",c"), vec!["a,b", "c"]);
        }

        #[test]
        fn test_quote_only_opens_at_field_start() {
            assert_eq!(split(Flavor::Basic, "ab\"c d"), vec!["ab\"c", "d"]);
        }

        #[test]
        fn test_doubled_quote_is_literal() {
            assert_eq!(split(Flavor::Csv, "\"say \"\"hi\"\"\",x"), vec!["say \"hi\"", "x"]);
            assert_eq!(split(Flavor::Csv, "\"\",x"), vec!["", "x"]);
        }

        #[test]
        fn test_text_after_closing_quote() {
            assert_eq!(split(Flavor::Basic, "\"a\"b c"), vec!["ab", "c"]);
        }

        #[test]
        fn test_embedded_newline_stripping() {
            assert_eq!(split(Flavor::Basic, "a b \"   c\n d\""), vec!["a", "b", "cd"]);
            assert_eq!(split(Flavor::Basic, "7 8 \"9\n \t1\""), vec!["7", "8", "91"]);
            assert_eq!(split(Flavor::Basic, "1 2 \" \n \""), vec!["1", "2", ""]);
        }

        #[test]
        fn test_embedded_newline_preserving() {
            assert_eq!(split(Flavor::Tab, "a\t\" d\n e\""), vec!["a", " d e"]);
        }

        #[test]
        fn test_unterminated_quote_closes_at_end() {
            assert_eq!(split(Flavor::Basic, "a \"b c"), vec!["a", "b c"]);
        }
    }

    mod state {
        use super::*;

        #[test]
        fn test_scan_reports_open_quote() {
            let parser = DelimitedParser::new(Flavor::Basic.dialect());
            let state = parser.run("a b \"c", FieldState::StartField, &mut ());
            assert_eq!(state.quote_state(), QuoteState::InsideQuote);
            let state = parser.run("\n d\" e", state, &mut ());
            assert_eq!(state.quote_state(), QuoteState::Normal);
        }

        #[test]
        fn test_mid_field_quote_does_not_open() {
            let parser = DelimitedParser::new(Flavor::Basic.dialect());
            let state = parser.run("a b\"c", FieldState::StartField, &mut ());
            assert_eq!(state, FieldState::Field);
        }
    }
}
