//! Reader settings and their validation
//!
//! [`ReadOptions`] collects raw settings (strings as the caller gave them) on top of a
//! [`Flavor`] preset. [`ReadOptions::validate`] turns them into an immutable [`Config`]
//! or rejects them before any input is read.

use log::debug;

use crate::{
    error::ParseError,
    fill::{FillRule, FillSpec},
};

/// Initial byte capacity of each column buffer
pub const DEFAULT_COLUMN_CAPACITY: usize = 1024;

/// Table layout presets
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Flavor {
    /// Whitespace separated, `#` comments, header on the first line
    #[default]
    Basic,
    /// Comma separated, no comments, short rows padded with empty fields
    Csv,
    /// Tab separated, whitespace inside fields is preserved
    Tab,
    /// Like [`Flavor::Basic`] but without a header; columns are named `col1`, `col2`, ...
    NoHeader,
    /// Like [`Flavor::Basic`] but the header is the last part of a comment line
    CommentedHeader,
    /// Tab separated with a second header line of column types (`N` or `S`)
    Rdb,
}

impl Flavor {
    pub fn dialect(self) -> Dialect {
        let basic = Dialect {
            delimiter: ' ',
            quote: '"',
            comment: Some('#'),
            strip_whitespace: true,
            strict_width: true,
        };
        match self {
            Self::Basic | Self::NoHeader | Self::CommentedHeader => basic,
            Self::Csv => Dialect {
                delimiter: ',',
                comment: None,
                strict_width: false,
                ..basic
            },
            Self::Tab | Self::Rdb => Dialect {
                delimiter: '\t',
                strip_whitespace: false,
                ..basic
            },
        }
    }

    fn default_header_start(self) -> Option<i64> {
        match self {
            Self::NoHeader => None,
            _ => Some(0),
        }
    }

    /// The header is read from the comment lines rather than the data lines
    pub fn header_in_comments(self) -> bool {
        matches!(self, Self::CommentedHeader)
    }

    /// A line of column types follows the header
    pub fn has_typed_header(self) -> bool {
        matches!(self, Self::Rdb)
    }
}

/// Character level rules for splitting lines into fields
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    pub delimiter: char,
    pub quote: char,
    pub comment: Option<char>,
    /// Skip leading and trim trailing spaces/tabs of every field
    pub strip_whitespace: bool,
    /// Rows with fewer fields than the header are an error instead of being padded
    pub strict_width: bool,
}

/// Tuning knobs of the parsing engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Parse the data region in chunks on a worker pool
    pub parallel: bool,
    /// Size of the worker pool, defaults to the number of CPUs
    pub workers: Option<usize>,
    /// Initial byte capacity of each column buffer
    pub column_capacity: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            parallel: false,
            workers: None,
            column_capacity: DEFAULT_COLUMN_CAPACITY,
        }
    }
}

impl EngineOptions {
    /// Builds engine options from string key/value pairs, e.g. forwarded from a command line.
    ///
    /// Recognized keys are `parallel`, `workers` and `column_capacity`.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut options = Self::default();
        for (key, value) in pairs {
            let value = value.as_ref().trim();
            match key.as_ref() {
                "parallel" => {
                    options.parallel = value.parse().map_err(|_| {
                        ParseError::config("parallel", format!("{value:?} is not a boolean"))
                    })?;
                }
                "workers" => {
                    options.workers = Some(value.parse().map_err(|_| {
                        ParseError::config("workers", format!("{value:?} is not a worker count"))
                    })?);
                }
                "column_capacity" => {
                    options.column_capacity = value.parse().map_err(|_| {
                        ParseError::config("column_capacity", format!("{value:?} is not a byte count"))
                    })?;
                }
                other => {
                    return Err(ParseError::OptionSchema {
                        key: other.to_string(),
                    });
                }
            }
        }
        Ok(options)
    }

    /// Number of workers a parallel read uses
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// Raw reader settings on top of a [`Flavor`] preset
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    flavor: Flavor,
    delimiter: Option<String>,
    quotechar: Option<String>,
    comment: Option<Option<String>>,
    header_start: Option<Option<i64>>,
    data_start: Option<i64>,
    data_end: Option<i64>,
    names: Option<Vec<String>>,
    include_names: Option<Vec<String>>,
    exclude_names: Option<Vec<String>>,
    fill: FillSpec,
    strip_whitespace: Option<bool>,
    strict_width: Option<bool>,
    engine: EngineOptions,
}

fn collect_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    names.into_iter().map(Into::into).collect()
}

impl ReadOptions {
    pub fn new(flavor: Flavor) -> Self {
        Self {
            flavor,
            ..Default::default()
        }
    }

    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    pub fn quotechar(mut self, quotechar: impl Into<String>) -> Self {
        self.quotechar = Some(quotechar.into());
        self
    }

    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(Some(comment.into()));
        self
    }

    /// Treat no line as a comment
    pub fn no_comment(mut self) -> Self {
        self.comment = Some(None);
        self
    }

    /// Index of the header line; negative values count back from the data start
    pub fn header_start(mut self, index: i64) -> Self {
        self.header_start = Some(Some(index));
        self
    }

    /// Read the input without a header line
    pub fn no_header(mut self) -> Self {
        self.header_start = Some(None);
        self
    }

    /// Index of the first data line; negative values count from the end of the input
    pub fn data_start(mut self, index: i64) -> Self {
        self.data_start = Some(index);
        self
    }

    /// Index one past the last data line; negative values count from the end of the input
    pub fn data_end(mut self, index: i64) -> Self {
        self.data_end = Some(index);
        self
    }

    /// Column names replacing the header names
    pub fn names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.names = Some(collect_names(names));
        self
    }

    pub fn include_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.include_names = Some(collect_names(names));
        self
    }

    pub fn exclude_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_names = Some(collect_names(names));
        self
    }

    /// Fill rules replacing the default `"" -> "0"` rule. An empty list disables masking.
    pub fn fill_values(mut self, rules: Vec<FillRule>) -> Self {
        self.fill.rules = Some(rules);
        self
    }

    pub fn fill_include_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fill.include_names = Some(collect_names(names));
        self
    }

    pub fn fill_exclude_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fill.exclude_names = Some(collect_names(names));
        self
    }

    pub fn strip_whitespace(mut self, strip: bool) -> Self {
        self.strip_whitespace = Some(strip);
        self
    }

    pub fn strict_width(mut self, strict: bool) -> Self {
        self.strict_width = Some(strict);
        self
    }

    pub fn parallel(mut self, parallel: bool) -> Self {
        self.engine.parallel = parallel;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.engine.workers = Some(workers);
        self
    }

    pub fn engine(mut self, engine: EngineOptions) -> Self {
        self.engine = engine;
        self
    }

    /// Checks the settings and resolves them against the flavor preset
    pub fn validate(&self) -> Result<Config, ParseError> {
        let preset = self.flavor.dialect();
        let delimiter = match &self.delimiter {
            Some(d) => single_char("delimiter", d)?,
            None => preset.delimiter,
        };
        let quote = match &self.quotechar {
            Some(q) => single_char("quotechar", q)?,
            None => preset.quote,
        };
        let comment = match &self.comment {
            Some(Some(c)) => Some(single_char("comment", c)?),
            Some(None) => None,
            None => preset.comment,
        };
        if delimiter == quote {
            return Err(ParseError::config(
                "quotechar",
                format!("{quote:?} is also the delimiter"),
            ));
        }
        if matches!(delimiter, '\n' | '\r') || matches!(quote, '\n' | '\r') {
            return Err(ParseError::config(
                "delimiter",
                "line terminators cannot separate or quote fields",
            ));
        }

        let header_start = match self.header_start {
            Some(header_start) => header_start,
            None => self.flavor.default_header_start(),
        };
        match (self.flavor, header_start) {
            (Flavor::NoHeader, Some(_)) => {
                return Err(ParseError::config(
                    "header_start",
                    "the no-header format has no header line",
                ));
            }
            (Flavor::Rdb, None) => {
                return Err(ParseError::config(
                    "header_start",
                    "the typed header format needs a header line for its column types",
                ));
            }
            (Flavor::CommentedHeader, None) => {
                return Err(ParseError::config(
                    "header_start",
                    "the commented header format needs a header line",
                ));
            }
            _ => {}
        }
        if let Some(h) = header_start {
            if h < 0 && !self.data_start.is_some_and(|d| d >= 0) {
                return Err(ParseError::config(
                    "data_start",
                    "a negative header_start needs an explicit non-negative data_start",
                ));
            }
        }

        if self.names.as_ref().is_some_and(|n| n.is_empty()) {
            return Err(ParseError::config("names", "empty list of column names"));
        }
        if self.engine.workers == Some(0) {
            return Err(ParseError::config("workers", "at least one worker is needed"));
        }

        let dialect = Dialect {
            delimiter,
            quote,
            comment,
            strip_whitespace: self.strip_whitespace.unwrap_or(preset.strip_whitespace),
            strict_width: self.strict_width.unwrap_or(preset.strict_width),
        };
        debug!("Validated {:?} reader with {:?}", self.flavor, dialect);
        Ok(Config {
            flavor: self.flavor,
            dialect,
            header_start,
            data_start: self.data_start,
            data_end: self.data_end,
            names: self.names.clone(),
            include_names: self.include_names.clone(),
            exclude_names: self.exclude_names.clone(),
            fill: self.fill.clone(),
            engine: self.engine.clone(),
        })
    }
}

fn single_char(key: &'static str, value: &str) -> Result<char, ParseError> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(ParseError::config(
            key,
            format!("{value:?} is not a single character"),
        )),
    }
}

/// Validated, immutable reader settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub(crate) flavor: Flavor,
    pub(crate) dialect: Dialect,
    pub(crate) header_start: Option<i64>,
    pub(crate) data_start: Option<i64>,
    pub(crate) data_end: Option<i64>,
    pub(crate) names: Option<Vec<String>>,
    pub(crate) include_names: Option<Vec<String>>,
    pub(crate) exclude_names: Option<Vec<String>>,
    pub(crate) fill: FillSpec,
    pub(crate) engine: EngineOptions,
}

impl Config {
    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    pub fn dialect(&self) -> &Dialect {
        &self.dialect
    }

    pub fn header_start(&self) -> Option<i64> {
        self.header_start
    }

    pub fn engine(&self) -> &EngineOptions {
        &self.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    fn config_key(result: Result<Config, ParseError>) -> &'static str {
        match result {
            Err(ParseError::Configuration { key, .. }) => key,
            other => panic!("expected configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_flavor_presets() {
        let config = ReadOptions::new(Flavor::Csv).validate().unwrap();
        assert_eq!(config.dialect.delimiter, ',');
        assert_eq!(config.dialect.comment, None);
        assert!(!config.dialect.strict_width);
        assert_eq!(config.header_start, Some(0));

        let config = ReadOptions::new(Flavor::Tab).validate().unwrap();
        assert_eq!(config.dialect.delimiter, '\t');
        assert!(!config.dialect.strip_whitespace);

        let config = ReadOptions::new(Flavor::NoHeader).validate().unwrap();
        assert_eq!(config.header_start, None);
    }

    #[test]
    fn test_overrides() {
        let config = ReadOptions::new(Flavor::Basic)
            .delimiter(",")
            .quotechar("'")
            .no_comment()
            .validate()
            .unwrap();
        assert_eq!(config.dialect.delimiter, ',');
        assert_eq!(config.dialect.quote, '\'');
        assert_eq!(config.dialect.comment, None);
        assert!(config.dialect.strip_whitespace);
    }

    mod invalid {
        use super::*;

        #[test]
        fn test_multi_char_markers() {
            assert_eq!(
                config_key(ReadOptions::default().delimiter(",,").validate()),
                "delimiter"
            );
            assert_eq!(
                config_key(ReadOptions::default().comment("##").validate()),
                "comment"
            );
            assert_eq!(
                config_key(ReadOptions::default().quotechar("##").validate()),
                "quotechar"
            );
            assert_eq!(
                config_key(ReadOptions::default().delimiter("").validate()),
                "delimiter"
            );
        }

        #[test]
        fn test_delimiter_equals_quote() {
            assert_eq!(
                config_key(ReadOptions::default().delimiter("\"").validate()),
                "quotechar"
            );
        }

        #[test]
        fn test_negative_header_needs_data_start() {
            assert_eq!(
                config_key(ReadOptions::default().header_start(-1).validate()),
                "data_start"
            );
            assert_eq!(
                config_key(
                    ReadOptions::default()
                        .header_start(-1)
                        .data_start(-2)
                        .validate()
                ),
                "data_start"
            );
            assert!(
                ReadOptions::default()
                    .header_start(-1)
                    .data_start(3)
                    .validate()
                    .is_ok()
            );
        }

        #[test]
        fn test_header_conflicts() {
            assert_eq!(
                config_key(ReadOptions::new(Flavor::Rdb).no_header().validate()),
                "header_start"
            );
            assert_eq!(
                config_key(ReadOptions::new(Flavor::NoHeader).header_start(0).validate()),
                "header_start"
            );
        }

        #[test]
        fn test_empty_names_and_zero_workers() {
            assert_eq!(
                config_key(ReadOptions::default().names(Vec::<String>::new()).validate()),
                "names"
            );
            assert_eq!(
                config_key(ReadOptions::default().workers(0).validate()),
                "workers"
            );
        }
    }

    mod engine {
        use super::*;

        #[test]
        fn test_from_pairs() {
            let options =
                EngineOptions::from_pairs([("parallel", "true"), ("workers", "4")]).unwrap();
            assert!(options.parallel);
            assert_eq!(options.workers, Some(4));
            assert_eq!(options.column_capacity, DEFAULT_COLUMN_CAPACITY);
            assert_eq!(options.worker_count(), 4);
        }

        #[test]
        fn test_unknown_key() {
            let err = EngineOptions::from_pairs([("use_fast_converter", "true")]).unwrap_err();
            assert_eq!(err.category(), ErrorCategory::OptionSchema);
            assert!(matches!(err, ParseError::OptionSchema { key } if key == "use_fast_converter"));
        }

        #[test]
        fn test_bad_value() {
            let err = EngineOptions::from_pairs([("workers", "many")]).unwrap_err();
            assert!(matches!(err, ParseError::Configuration { key: "workers", .. }));
        }
    }
}
