//! Lightweight statement handling: splitting editor text into statements,
//! classifying them and rewriting row-returning queries for pagination.
//!
//! None of this parses SQL. It only looks at the leading keyword and at
//! quoting so that semicolons inside literals or comments are not treated as
//! statement boundaries.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// What a statement does, judged by its leading keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatementKind {
    /// `USE <target>`: switches the default database/schema.
    Use(String),
    /// Produces a result set (`SELECT`, `WITH`, `DESCRIBE`, ...).
    RowReturning,
    /// `INSERT`/`UPDATE`/`DELETE` without `RETURNING`; reports an affected row count.
    Modification,
    /// Creates, drops or alters catalog objects.
    CatalogChange,
    /// Anything else (`SET`, `INSTALL`, `COPY`, transactions, ...).
    Other,
}

const ROW_RETURNING: &[&str] = &[
    "SELECT", "WITH", "FROM", "VALUES", "TABLE", "DESCRIBE", "SHOW", "SUMMARIZE", "PIVOT",
    "UNPIVOT", "EXPLAIN", "PRAGMA", "CALL", "(",
];

const MODIFICATION: &[&str] = &["INSERT", "UPDATE", "DELETE"];

const CATALOG_CHANGE: &[&str] = &["CREATE", "DROP", "ALTER", "ATTACH", "DETACH"];

const PAGEABLE: &[&str] = &["SELECT", "WITH", "FROM"];

impl StatementKind {
    /// Classify a single statement.
    pub fn classify(stmt: &str) -> Self {
        let keyword = leading_keyword(stmt);
        if keyword == "USE" {
            let target = skip_comments(stmt)[3..]
                .trim()
                .trim_end_matches(';')
                .trim()
                .to_string();
            return StatementKind::Use(target);
        }
        if ROW_RETURNING.contains(&keyword.as_str()) {
            return StatementKind::RowReturning;
        }
        if MODIFICATION.contains(&keyword.as_str()) {
            if returning_pattern().is_match(stmt) {
                return StatementKind::RowReturning;
            }
            return StatementKind::Modification;
        }
        if CATALOG_CHANGE.contains(&keyword.as_str()) {
            return StatementKind::CatalogChange;
        }
        StatementKind::Other
    }

    /// True when the statement may create, drop or rename catalog objects.
    pub fn changes_catalog(&self) -> bool {
        matches!(self, StatementKind::CatalogChange | StatementKind::Use(_))
    }
}

/// A page of a row-returning query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// Zero-based page index.
    pub page_number: usize,
    /// Rows per page. Zero disables pagination.
    pub page_size: usize,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page_number: 0,
            page_size: 1000,
        }
    }
}

impl PageRequest {
    /// First page with the given size.
    pub fn first(page_size: usize) -> Self {
        Self {
            page_number: 0,
            page_size,
        }
    }

    /// Row offset of the first row on this page.
    pub fn offset(&self) -> usize {
        self.page_number * self.page_size
    }

    /// Number of pages needed for `total` rows (at least one).
    pub fn total_pages(&self, total: usize) -> usize {
        if self.page_size == 0 || total == 0 {
            return 1;
        }
        total.div_ceil(self.page_size)
    }

    /// Same size, different page, clamped to the last page for `total` rows.
    pub fn with_page(&self, page_number: usize, total: usize) -> Self {
        let last = self.total_pages(total) - 1;
        Self {
            page_number: page_number.min(last),
            page_size: self.page_size,
        }
    }

    /// Rewrite `sql` so that it returns only this page.
    ///
    /// Queries that already carry a `LIMIT` are wrapped in a subquery so the
    /// user's limit is applied first.
    pub fn apply(&self, sql: &str) -> String {
        let sql = strip_trailing_semicolon(sql);
        if has_limit_clause(sql) {
            format!(
                "SELECT * FROM ({}) AS paginated_subquery LIMIT {} OFFSET {}",
                sql,
                self.page_size,
                self.offset()
            )
        } else {
            format!("{} LIMIT {} OFFSET {}", sql, self.page_size, self.offset())
        }
    }
}

/// Split editor text into individual statements.
///
/// Semicolons inside `'...'` literals, `"..."` identifiers, `-- line` and
/// `/* block */` comments do not terminate a statement. Blank statements are
/// dropped.
pub fn split_statements(text: &str) -> Vec<String> {
    #[derive(PartialEq)]
    enum State {
        Normal,
        Single,
        Double,
        Line,
        Block,
    }

    let mut statements = Vec::new();
    let mut current = String::new();
    let mut state = State::Normal;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Normal => match c {
                ';' => {
                    push_statement(&mut statements, &current);
                    current.clear();
                    continue;
                }
                '\'' => state = State::Single,
                '"' => state = State::Double,
                '-' if chars.peek() == Some(&'-') => state = State::Line,
                '/' if chars.peek() == Some(&'*') => {
                    current.push(c);
                    if let Some(star) = chars.next() {
                        current.push(star);
                    }
                    state = State::Block;
                    continue;
                }
                _ => {}
            },
            State::Single if c == '\'' => state = State::Normal,
            State::Double if c == '"' => state = State::Normal,
            State::Line if c == '\n' => state = State::Normal,
            State::Block if c == '*' && chars.peek() == Some(&'/') => {
                current.push(c);
                if let Some(slash) = chars.next() {
                    current.push(slash);
                }
                state = State::Normal;
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    push_statement(&mut statements, &current);
    statements
}

fn push_statement(statements: &mut Vec<String>, raw: &str) {
    let trimmed = raw.trim();
    if !skip_comments(trimmed).is_empty() {
        statements.push(trimmed.to_string());
    }
}

/// True for statements that can be wrapped with `LIMIT`/`OFFSET`.
pub fn is_pageable(stmt: &str) -> bool {
    PAGEABLE.contains(&leading_keyword(stmt).as_str())
}

/// True when the statement contains a `LIMIT` keyword anywhere.
pub fn has_limit_clause(stmt: &str) -> bool {
    limit_pattern().is_match(stmt)
}

/// Remove trailing whitespace and semicolons.
pub fn strip_trailing_semicolon(stmt: &str) -> &str {
    stmt.trim_end().trim_end_matches(';').trim_end()
}

/// Uppercased first keyword of a statement, skipping leading comments.
pub fn leading_keyword(stmt: &str) -> String {
    let body = skip_comments(stmt);
    if body.starts_with('(') {
        return "(".to_string();
    }
    body.chars()
        .take_while(|c| c.is_ascii_alphabetic() || *c == '_')
        .collect::<String>()
        .to_ascii_uppercase()
}

fn skip_comments(stmt: &str) -> &str {
    let mut rest = stmt.trim_start();
    loop {
        if let Some(after) = rest.strip_prefix("--") {
            rest = match after.find('\n') {
                Some(idx) => after[idx + 1..].trim_start(),
                None => "",
            };
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = match after.find("*/") {
                Some(idx) => after[idx + 2..].trim_start(),
                None => "",
            };
        } else {
            return rest;
        }
    }
}

fn limit_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\blimit\b").expect("static regex"))
}

fn returning_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\breturning\b").expect("static regex"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_split_simple_statements() {
        let stmts = split_statements("SELECT 1; SELECT 2;\n\n;  ");
        assert_eq!(stmts, vec!["SELECT 1", "SELECT 2"]);
    }

    #[test]
    fn test_split_ignores_semicolons_in_literals_and_comments() {
        let text = "SELECT 'a;b' AS \"x;y\"; -- trailing; comment\nSELECT /* ; */ 2";
        let stmts = split_statements(text);
        assert_eq!(stmts.len(), 2);
        assert_eq!(stmts[0], "SELECT 'a;b' AS \"x;y\"");
        assert!(stmts[1].ends_with("SELECT /* ; */ 2"));
    }

    #[test]
    fn test_split_drops_comment_only_statements() {
        let stmts = split_statements("-- nothing here\n;SELECT 1");
        assert_eq!(stmts, vec!["SELECT 1"]);
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            StatementKind::classify("use memory.main;"),
            StatementKind::Use("memory.main".to_string())
        );
        assert_eq!(
            StatementKind::classify("  -- hi\nselect 1"),
            StatementKind::RowReturning
        );
        assert_eq!(
            StatementKind::classify("FROM t SELECT a"),
            StatementKind::RowReturning
        );
        assert_eq!(
            StatementKind::classify("insert into t values (1)"),
            StatementKind::Modification
        );
        assert_eq!(
            StatementKind::classify("INSERT INTO t VALUES (1) RETURNING *"),
            StatementKind::RowReturning
        );
        assert_eq!(
            StatementKind::classify("CREATE TABLE t (a INT)"),
            StatementKind::CatalogChange
        );
        assert_eq!(StatementKind::classify("SET threads = 2"), StatementKind::Other);
    }

    #[test]
    fn test_page_apply_appends_limit() {
        let page = PageRequest {
            page_number: 2,
            page_size: 50,
        };
        assert_eq!(
            page.apply("SELECT * FROM t ORDER BY a;"),
            "SELECT * FROM t ORDER BY a LIMIT 50 OFFSET 100"
        );
    }

    #[test]
    fn test_page_apply_wraps_existing_limit() {
        let page = PageRequest::first(10);
        assert_eq!(
            page.apply("select * from t limit 500"),
            "SELECT * FROM (select * from t limit 500) AS paginated_subquery LIMIT 10 OFFSET 0"
        );
    }

    #[test]
    fn test_total_pages_and_clamping() {
        let page = PageRequest::first(100);
        assert_eq!(page.total_pages(0), 1);
        assert_eq!(page.total_pages(100), 1);
        assert_eq!(page.total_pages(101), 2);
        assert_eq!(page.with_page(9, 250).page_number, 2);
    }

    #[test]
    fn test_is_pageable() {
        assert!(is_pageable("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(!is_pageable("DESCRIBE t"));
        assert!(!is_pageable("INSERT INTO t VALUES (1)"));
    }

    proptest! {
        #[test]
        fn prop_split_never_yields_blank_statements(text in "[a-z ;'\n-]{0,64}") {
            for stmt in split_statements(&text) {
                prop_assert!(!stmt.trim().is_empty());
            }
        }

        #[test]
        fn prop_split_roundtrips_plain_statements(parts in prop::collection::vec("SELECT [0-9]{1,4}", 1..6)) {
            let joined = parts.join("; ");
            prop_assert_eq!(split_statements(&joined), parts);
        }
    }
}
