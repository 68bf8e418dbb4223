//! # Query Compiler
//!
//! Turns what the user typed into a [`SearchSpec`] every store can run.
//!
//! The syntax is a tiny glob: `*` matches any run of characters and `?`
//! matches exactly one. Everything else is literal, including `%` and `_`,
//! which are escaped before the glob wildcards are translated to their
//! `LIKE` counterparts.
//!
//! The compiled [`Tier`] picks the store's query plan:
//!
//! | Tier      | Plan                                                  |
//! |-----------|-------------------------------------------------------|
//! | `None`    | unfiltered listing                                    |
//! | `Exact`   | full-text phrase lookup, narrowed by a `LIKE` clause  |
//! | `Partial` | plain `LIKE` scan                                     |

use crate::error::{FolioError, Result};

/// The escape character declared on every generated `LIKE` clause.
pub const LIKE_ESCAPE: char = '\\';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Blank query: match everything.
    None,
    /// Query contained a glob wildcard.
    Partial,
    /// Literal query.
    Exact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchSpec {
    text: String,
    pattern: String,
    tier: Tier,
}

impl SearchSpec {
    pub fn compile(raw: &str) -> Self {
        let text = raw.trim();
        if text.is_empty() {
            return Self::everything();
        }

        let tier = if text.contains(['*', '?']) {
            Tier::Partial
        } else {
            Tier::Exact
        };

        Self {
            text: text.to_string(),
            pattern: escape_pattern(text),
            tier,
        }
    }

    pub fn everything() -> Self {
        Self {
            text: String::new(),
            pattern: String::new(),
            tier: Tier::None,
        }
    }

    /// The trimmed, unescaped query text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The escaped `LIKE` pattern, without surrounding quotes.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn matches_all(&self) -> bool {
        self.tier == Tier::None
    }

    pub fn is_exact(&self) -> bool {
        self.tier == Tier::Exact
    }

    pub fn is_partial(&self) -> bool {
        self.tier == Tier::Partial
    }

    /// `column LIKE 'pattern' ESCAPE '\'`, or an empty clause for [`Tier::None`].
    pub fn like_clause(&self, column: &str) -> Result<String> {
        self.clause(column, false)
    }

    /// Like [`like_clause`](Self::like_clause) but matching anywhere in the column.
    pub fn contains_clause(&self, column: &str) -> Result<String> {
        self.clause(column, true)
    }

    /// FTS5 phrase query restricted to `column`.
    ///
    /// Only exact queries have a phrase, and only when they contain at least
    /// one word character the tokenizer would keep.
    pub fn phrase(&self, column: &str) -> Result<Option<String>> {
        check_column(column)?;
        if self.tier != Tier::Exact || !self.text.chars().any(char::is_alphanumeric) {
            return Ok(None);
        }
        Ok(Some(format!(
            "{} : \"{}\"",
            column,
            self.text.replace('"', "\"\"")
        )))
    }

    fn clause(&self, column: &str, anywhere: bool) -> Result<String> {
        check_column(column)?;
        if self.tier == Tier::None {
            return Ok(String::new());
        }
        let wrap = if anywhere { "%" } else { "" };
        Ok(format!(
            "{column} LIKE '{wrap}{pattern}{wrap}' ESCAPE '{LIKE_ESCAPE}'",
            pattern = self.pattern
        ))
    }
}

fn check_column(column: &str) -> Result<()> {
    if column.is_empty() || column.contains(['\'', '"', '`']) {
        return Err(FolioError::InvalidQuery(format!(
            "illegal column identifier: {column}"
        )));
    }
    Ok(())
}

fn escape_pattern(text: &str) -> String {
    // Order matters: real '%' and '_' must be escaped before the glob
    // wildcards are turned into them.
    text.replace('\\', "\\\\")
        .replace('\'', "''")
        .replace('"', "\"\"")
        .replace('%', "\\%")
        .replace('_', "\\_")
        .replace('*', "%")
        .replace('?', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_query_is_exact() {
        let spec = SearchSpec::compile("foo");
        assert_eq!(spec.tier(), Tier::Exact);
        assert_eq!(spec.pattern(), "foo");
    }

    #[test]
    fn glob_query_is_partial() {
        let spec = SearchSpec::compile("fo*");
        assert_eq!(spec.tier(), Tier::Partial);
        assert_eq!(spec.pattern(), "fo%");

        let spec = SearchSpec::compile("b?r");
        assert_eq!(spec.tier(), Tier::Partial);
        assert_eq!(spec.pattern(), "b_r");
    }

    #[test]
    fn blank_query_matches_everything() {
        for raw in ["", "   ", "\t\n"] {
            let spec = SearchSpec::compile(raw);
            assert_eq!(spec.tier(), Tier::None);
            assert_eq!(spec.pattern(), "");
            assert!(spec.matches_all());
            assert_eq!(spec.like_clause("name").unwrap(), "");
        }
    }

    #[test]
    fn query_is_trimmed() {
        let spec = SearchSpec::compile("  foo  ");
        assert_eq!(spec.text(), "foo");
        assert_eq!(spec.pattern(), "foo");
    }

    #[test]
    fn typed_percent_and_underscore_stay_literal() {
        let spec = SearchSpec::compile("100%_done*");
        assert_eq!(spec.pattern(), "100\\%\\_done%");
        assert_eq!(spec.tier(), Tier::Partial);
    }

    #[test]
    fn quotes_are_doubled() {
        let spec = SearchSpec::compile("O'Brien");
        assert_eq!(spec.pattern(), "O''Brien");
        assert_eq!(
            spec.like_clause("name").unwrap(),
            "name LIKE 'O''Brien' ESCAPE '\\'"
        );

        let spec = SearchSpec::compile("say \"hi\"");
        assert_eq!(spec.pattern(), "say \"\"hi\"\"");
    }

    #[test]
    fn backslash_is_escaped() {
        let spec = SearchSpec::compile("a\\b");
        assert_eq!(spec.pattern(), "a\\\\b");
    }

    #[test]
    fn contains_clause_wraps_pattern() {
        let spec = SearchSpec::compile("foo");
        assert_eq!(
            spec.contains_clause("body").unwrap(),
            "body LIKE '%foo%' ESCAPE '\\'"
        );
    }

    #[test]
    fn quoted_column_is_rejected() {
        let spec = SearchSpec::compile("foo");
        let err = spec.like_clause("name' OR 1=1 --").unwrap_err();
        assert!(matches!(err, FolioError::InvalidQuery(_)));
        assert!(spec.like_clause("\"name\"").is_err());
        assert!(SearchSpec::everything().like_clause("a'b").is_err());
    }

    #[test]
    fn phrase_only_for_exact_word_queries() {
        assert_eq!(
            SearchSpec::compile("hello world").phrase("body").unwrap(),
            Some("body : \"hello world\"".to_string())
        );
        assert_eq!(SearchSpec::compile("hel*").phrase("body").unwrap(), None);
        assert_eq!(SearchSpec::compile("!!").phrase("body").unwrap(), None);
        assert_eq!(SearchSpec::compile("").phrase("body").unwrap(), None);
        assert_eq!(
            SearchSpec::compile("say \"hi\"").phrase("body").unwrap(),
            Some("body : \"say \"\"hi\"\"\"".to_string())
        );
    }
}
