//! Replaces matching field values and marks them as masked
//!
//! Each column gets an ordered list of `(match, replacement)` pairs. A field equal to a
//! match string is replaced and flagged before type inference sees it.

/// Field value replaced when no fill rules are configured
pub const DEFAULT_FILL_MATCH: &str = "";
/// Replacement used by the default fill rule
pub const DEFAULT_FILL_REPLACEMENT: &str = "0";

/// Columns a [`FillRule`] applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillScope {
    /// Every column left after fill include/exclude narrowing
    All,
    /// Only the listed columns, regardless of fill include/exclude
    Columns(Vec<String>),
}

/// Replace fields equal to `matches` with `replacement` and mask them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillRule {
    pub matches: String,
    pub replacement: String,
    pub scope: FillScope,
}

impl FillRule {
    pub fn new(matches: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            matches: matches.into(),
            replacement: replacement.into(),
            scope: FillScope::All,
        }
    }

    pub fn for_columns<I, S>(
        matches: impl Into<String>,
        replacement: impl Into<String>,
        columns: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            matches: matches.into(),
            replacement: replacement.into(),
            scope: FillScope::Columns(columns.into_iter().map(Into::into).collect()),
        }
    }

    fn covers(&self, column: &str, narrowed: bool) -> bool {
        match &self.scope {
            FillScope::All => narrowed,
            FillScope::Columns(columns) => columns.iter().any(|c| c == column),
        }
    }
}

/// Fill settings of a read
///
/// `rules: None` means "use the default rule", `Some(vec![])` disables masking entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillSpec {
    pub rules: Option<Vec<FillRule>>,
    pub include_names: Option<Vec<String>>,
    pub exclude_names: Option<Vec<String>>,
}

impl FillSpec {
    /// Whether all-column rules (the default rule included) reach `column`.
    /// Include narrowing happens before exclude narrowing.
    fn narrowed(&self, column: &str) -> bool {
        let included = self
            .include_names
            .as_ref()
            .is_none_or(|names| names.iter().any(|n| n == column));
        let excluded = self
            .exclude_names
            .as_ref()
            .is_some_and(|names| names.iter().any(|n| n == column));
        included && !excluded
    }

    /// Compiles the rules that apply to `column`, in configured order
    pub fn plan_for(&self, column: &str) -> ColumnFill {
        let narrowed = self.narrowed(column);
        let default = || {
            if narrowed {
                vec![(
                    DEFAULT_FILL_MATCH.to_string(),
                    DEFAULT_FILL_REPLACEMENT.to_string(),
                )]
            } else {
                Vec::new()
            }
        };
        let rules = match &self.rules {
            None => default(),
            Some(rules) => {
                let covering: Vec<_> = rules
                    .iter()
                    .filter(|rule| rule.covers(column, narrowed))
                    .map(|rule| (rule.matches.clone(), rule.replacement.clone()))
                    .collect();
                if covering.is_empty() && !rules.is_empty() {
                    default()
                } else {
                    covering
                }
            }
        };
        ColumnFill { rules }
    }
}

/// Fill rules in force for a single column
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnFill {
    rules: Vec<(String, String)>,
}

impl ColumnFill {
    /// Replacement for `field`, if any rule matches. The first matching rule wins.
    pub fn replacement(&self, field: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|(matches, _)| matches == field)
            .map(|(_, replacement)| replacement.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(names: &[&str]) -> Option<Vec<String>> {
        Some(names.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_default_rule() {
        let spec = FillSpec::default();
        let fill = spec.plan_for("A");
        assert_eq!(fill.replacement(""), Some("0"));
        assert_eq!(fill.replacement("nan"), None);
    }

    #[test]
    fn test_empty_rules_disable_masking() {
        let spec = FillSpec {
            rules: Some(Vec::new()),
            ..Default::default()
        };
        assert!(spec.plan_for("A").is_empty());
    }

    #[test]
    fn test_all_scope_rule_replaces_default() {
        let spec = FillSpec {
            rules: Some(vec![FillRule::new("-999", "0")]),
            ..Default::default()
        };
        let fill = spec.plan_for("A");
        assert_eq!(fill.replacement("-999"), Some("0"));
        assert_eq!(fill.replacement(""), None);
        assert_eq!(fill.replacement("-9999"), None);
    }

    #[test]
    fn test_uncovered_column_keeps_default() {
        let spec = FillSpec {
            rules: Some(vec![
                FillRule::for_columns("", "0", ["A"]),
                FillRule::for_columns("nan", "999", ["A", "C"]),
            ]),
            ..Default::default()
        };
        let a = spec.plan_for("A");
        assert_eq!(a.replacement(""), Some("0"));
        assert_eq!(a.replacement("nan"), Some("999"));

        let b = spec.plan_for("B");
        assert_eq!(b.replacement(""), Some("0"));
        assert_eq!(b.replacement("nan"), None);

        let c = spec.plan_for("C");
        assert_eq!(c.replacement(""), None);
        assert_eq!(c.replacement("nan"), Some("999"));
    }

    #[test]
    fn test_first_match_wins() {
        let spec = FillSpec {
            rules: Some(vec![FillRule::new("x", "1"), FillRule::new("x", "2")]),
            ..Default::default()
        };
        assert_eq!(spec.plan_for("A").replacement("x"), Some("1"));
    }

    mod narrowing {
        use super::*;

        #[test]
        fn test_fill_include_names() {
            let spec = FillSpec {
                include_names: names(&["A", "B"]),
                ..Default::default()
            };
            assert!(!spec.plan_for("A").is_empty());
            assert!(!spec.plan_for("B").is_empty());
            assert!(spec.plan_for("C").is_empty());
        }

        #[test]
        fn test_fill_exclude_names() {
            let spec = FillSpec {
                exclude_names: names(&["A", "B"]),
                ..Default::default()
            };
            assert!(spec.plan_for("A").is_empty());
            assert!(spec.plan_for("B").is_empty());
            assert!(!spec.plan_for("C").is_empty());
        }

        #[test]
        fn test_exclude_applies_after_include() {
            let spec = FillSpec {
                include_names: names(&["A", "B"]),
                exclude_names: names(&["B"]),
                ..Default::default()
            };
            assert!(!spec.plan_for("A").is_empty());
            assert!(spec.plan_for("B").is_empty());
            assert!(spec.plan_for("C").is_empty());
        }

        #[test]
        fn test_explicit_scope_ignores_narrowing() {
            let spec = FillSpec {
                rules: Some(vec![FillRule::for_columns("-", "0", ["B"])]),
                exclude_names: names(&["B"]),
                ..Default::default()
            };
            assert_eq!(spec.plan_for("B").replacement("-"), Some("0"));
        }
    }
}
