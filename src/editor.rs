//! SQL editor pane.
//!
//! Two implementations sit behind [`SqlEditor`]: a [`PlainEditor`] that only
//! edits text, and a [`HighlightingEditor`] that also colors SQL and offers
//! keyword and table-name completion. Which one is used is decided once at
//! startup by [`EditorCapability::detect`].

use crate::theme::SyntaxPalette;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use std::str::FromStr;

/// Keywords highlighted and offered for completion.
pub const SQL_KEYWORDS: &[&str] = &[
    "ALL", "ALTER", "AND", "AS", "ASC", "ATTACH", "BETWEEN", "BY", "CASE", "CAST", "COPY",
    "COUNT", "CREATE", "CROSS", "DELETE", "DESC", "DESCRIBE", "DETACH", "DISTINCT", "DROP",
    "ELSE", "END", "EXCEPT", "EXISTS", "EXPLAIN", "FALSE", "FROM", "FULL", "GROUP", "HAVING",
    "ILIKE", "IN", "INNER", "INSERT", "INTERSECT", "INTO", "IS", "JOIN", "LEFT", "LIKE", "LIMIT",
    "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER", "OUTER", "OVER", "PARTITION", "PIVOT",
    "QUALIFY", "RENAME", "REPLACE", "RIGHT", "SELECT", "SET", "SHOW", "SUMMARIZE", "TABLE",
    "TABLES", "THEN", "TO", "TRUE", "UNION", "UNPIVOT", "UPDATE", "USE", "USING", "VALUES",
    "VIEW", "WHEN", "WHERE", "WINDOW", "WITH",
];

/// Editor requested by configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditorPreference {
    #[default]
    Auto,
    Enhanced,
    Plain,
}

impl FromStr for EditorPreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(EditorPreference::Auto),
            "enhanced" | "highlight" => Ok(EditorPreference::Enhanced),
            "plain" => Ok(EditorPreference::Plain),
            other => Err(format!(
                "unknown editor '{}' (expected auto, enhanced or plain)",
                other
            )),
        }
    }
}

/// The editor implementation in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorCapability {
    Enhanced,
    Plain,
}

impl EditorCapability {
    /// Resolve the preference against the terminal. `Auto` falls back to the
    /// plain editor when `NO_COLOR` is set.
    pub fn detect(preference: EditorPreference, no_color: bool) -> Self {
        match preference {
            EditorPreference::Enhanced => EditorCapability::Enhanced,
            EditorPreference::Plain => EditorCapability::Plain,
            EditorPreference::Auto if no_color => EditorCapability::Plain,
            EditorPreference::Auto => EditorCapability::Enhanced,
        }
    }

    /// Same as [`detect`](Self::detect), reading `NO_COLOR` from the environment.
    pub fn detect_from_env(preference: EditorPreference) -> Self {
        let no_color = std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty());
        Self::detect(preference, no_color)
    }

    pub fn build(&self) -> Box<dyn SqlEditor> {
        match self {
            EditorCapability::Enhanced => Box::new(HighlightingEditor::new()),
            EditorCapability::Plain => Box::new(PlainEditor::new()),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EditorCapability::Enhanced => "enhanced",
            EditorCapability::Plain => "plain",
        }
    }
}

// ─── Text buffer ─────────────────────────────────────────────────────────────

/// Multi-line text with a cursor. Columns count characters, not bytes.
#[derive(Debug, Clone)]
pub struct TextBuffer {
    lines: Vec<String>,
    row: usize,
    col: usize,
}

impl Default for TextBuffer {
    fn default() -> Self {
        Self {
            lines: vec![String::new()],
            row: 0,
            col: 0,
        }
    }
}

impl TextBuffer {
    pub fn text(&self) -> String {
        self.lines.join("\n")
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Replace the content and put the cursor at the end.
    pub fn set_text(&mut self, text: &str) {
        self.lines = text.split('\n').map(str::to_string).collect();
        if self.lines.is_empty() {
            self.lines.push(String::new());
        }
        self.row = self.lines.len() - 1;
        self.col = char_len(&self.lines[self.row]);
    }

    /// `(row, column)` of the cursor.
    pub fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    pub fn insert_char(&mut self, c: char) {
        if c == '\n' {
            self.newline();
            return;
        }
        let idx = byte_index(&self.lines[self.row], self.col);
        self.lines[self.row].insert(idx, c);
        self.col += 1;
    }

    pub fn insert_str(&mut self, s: &str) {
        for c in s.chars() {
            self.insert_char(c);
        }
    }

    pub fn newline(&mut self) {
        let idx = byte_index(&self.lines[self.row], self.col);
        let rest = self.lines[self.row].split_off(idx);
        self.lines.insert(self.row + 1, rest);
        self.row += 1;
        self.col = 0;
    }

    pub fn backspace(&mut self) {
        if self.col > 0 {
            let idx = byte_index(&self.lines[self.row], self.col - 1);
            self.lines[self.row].remove(idx);
            self.col -= 1;
        } else if self.row > 0 {
            let line = self.lines.remove(self.row);
            self.row -= 1;
            self.col = char_len(&self.lines[self.row]);
            self.lines[self.row].push_str(&line);
        }
    }

    pub fn delete(&mut self) {
        if self.col < char_len(&self.lines[self.row]) {
            let idx = byte_index(&self.lines[self.row], self.col);
            self.lines[self.row].remove(idx);
        } else if self.row + 1 < self.lines.len() {
            let next = self.lines.remove(self.row + 1);
            self.lines[self.row].push_str(&next);
        }
    }

    pub fn move_left(&mut self) {
        if self.col > 0 {
            self.col -= 1;
        } else if self.row > 0 {
            self.row -= 1;
            self.col = char_len(&self.lines[self.row]);
        }
    }

    pub fn move_right(&mut self) {
        if self.col < char_len(&self.lines[self.row]) {
            self.col += 1;
        } else if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = 0;
        }
    }

    pub fn move_up(&mut self) {
        if self.row > 0 {
            self.row -= 1;
            self.col = self.col.min(char_len(&self.lines[self.row]));
        }
    }

    pub fn move_down(&mut self) {
        if self.row + 1 < self.lines.len() {
            self.row += 1;
            self.col = self.col.min(char_len(&self.lines[self.row]));
        }
    }

    pub fn home(&mut self) {
        self.col = 0;
    }

    pub fn end(&mut self) {
        self.col = char_len(&self.lines[self.row]);
    }

    /// Identifier characters (letters, digits, `_`, `.`) right before the cursor.
    pub fn word_before_cursor(&self) -> String {
        let line: Vec<char> = self.lines[self.row].chars().take(self.col).collect();
        let start = line
            .iter()
            .rposition(|c| !(c.is_alphanumeric() || *c == '_' || *c == '.'))
            .map_or(0, |i| i + 1);
        line[start..].iter().collect()
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices().nth(char_idx).map_or(s.len(), |(i, _)| i)
}

// ─── Editor trait ────────────────────────────────────────────────────────────

/// Text editing operations shared by both editors.
///
/// Implementors only provide access to their [`TextBuffer`] and their
/// rendering; editing defaults to the buffer.
pub trait SqlEditor: Send {
    fn buffer(&self) -> &TextBuffer;
    fn buffer_mut(&mut self) -> &mut TextBuffer;
    fn capability(&self) -> EditorCapability;

    /// Render the text, one `Line` per buffer line.
    fn styled_lines(&self, palette: &SyntaxPalette) -> Vec<Line<'static>>;

    /// Replace the table names offered for completion.
    fn update_completions(&mut self, _names: Vec<String>) {}

    /// Complete the word before the cursor.
    ///
    /// Inserts the longest unambiguous continuation and returns every
    /// matching candidate.
    fn complete(&mut self) -> Vec<String> {
        Vec::new()
    }

    fn text(&self) -> String {
        self.buffer().text()
    }

    fn set_text(&mut self, text: &str) {
        self.buffer_mut().set_text(text);
    }

    fn insert_char(&mut self, c: char) {
        self.buffer_mut().insert_char(c);
    }

    fn insert_str(&mut self, s: &str) {
        self.buffer_mut().insert_str(s);
    }

    fn newline(&mut self) {
        self.buffer_mut().newline();
    }

    fn backspace(&mut self) {
        self.buffer_mut().backspace();
    }

    fn delete(&mut self) {
        self.buffer_mut().delete();
    }

    fn cursor(&self) -> (usize, usize) {
        self.buffer().cursor()
    }
}

/// Text editing without highlighting or completion.
#[derive(Debug, Default)]
pub struct PlainEditor {
    buffer: TextBuffer,
}

impl PlainEditor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SqlEditor for PlainEditor {
    fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    fn buffer_mut(&mut self) -> &mut TextBuffer {
        &mut self.buffer
    }

    fn capability(&self) -> EditorCapability {
        EditorCapability::Plain
    }

    fn styled_lines(&self, palette: &SyntaxPalette) -> Vec<Line<'static>> {
        let style = Style::default().fg(palette.text);
        self.buffer
            .lines()
            .iter()
            .map(|l| Line::from(Span::styled(l.clone(), style)))
            .collect()
    }
}

/// SQL highlighting plus keyword and table-name completion.
#[derive(Debug, Default)]
pub struct HighlightingEditor {
    buffer: TextBuffer,
    table_names: Vec<String>,
}

impl HighlightingEditor {
    pub fn new() -> Self {
        Self::default()
    }

    fn candidates(&self, prefix: &str) -> Vec<String> {
        if prefix.is_empty() {
            return Vec::new();
        }
        let lower = prefix.to_lowercase();
        let mut out: Vec<String> = self
            .table_names
            .iter()
            .filter(|n| n.to_lowercase().starts_with(&lower))
            .cloned()
            .collect();
        out.extend(
            SQL_KEYWORDS
                .iter()
                .filter(|k| k.to_lowercase().starts_with(&lower))
                .map(|k| k.to_string()),
        );
        out.dedup();
        out
    }
}

impl SqlEditor for HighlightingEditor {
    fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    fn buffer_mut(&mut self) -> &mut TextBuffer {
        &mut self.buffer
    }

    fn capability(&self) -> EditorCapability {
        EditorCapability::Enhanced
    }

    fn styled_lines(&self, palette: &SyntaxPalette) -> Vec<Line<'static>> {
        let mut in_block_comment = false;
        self.buffer
            .lines()
            .iter()
            .map(|line| {
                let (spans, still_open) = highlight_line(line, palette, in_block_comment);
                in_block_comment = still_open;
                Line::from(spans)
            })
            .collect()
    }

    fn update_completions(&mut self, names: Vec<String>) {
        self.table_names = names;
    }

    fn complete(&mut self) -> Vec<String> {
        let prefix = self.buffer.word_before_cursor();
        let candidates = self.candidates(&prefix);
        if candidates.is_empty() {
            return candidates;
        }
        let common = common_prefix(&candidates);
        let typed = prefix.chars().count();
        if common.chars().count() > typed {
            let rest: String = common.chars().skip(typed).collect();
            self.buffer.insert_str(&rest);
        }
        candidates
    }
}

/// Longest case-insensitive common prefix, spelled as in the first candidate.
fn common_prefix(candidates: &[String]) -> String {
    let Some(first) = candidates.first() else {
        return String::new();
    };
    let mut len = first.chars().count();
    for other in &candidates[1..] {
        len = first
            .chars()
            .zip(other.chars())
            .take(len)
            .take_while(|(a, b)| a.eq_ignore_ascii_case(b))
            .count();
    }
    first.chars().take(len).collect()
}

/// Split one line into styled spans. Returns whether a `/* */` comment is
/// still open at the end of the line.
fn highlight_line(
    line: &str,
    palette: &SyntaxPalette,
    mut in_block_comment: bool,
) -> (Vec<Span<'static>>, bool) {
    let chars: Vec<char> = line.chars().collect();
    let mut spans = Vec::new();
    let mut i = 0;
    let comment = Style::default()
        .fg(palette.comment)
        .add_modifier(Modifier::ITALIC);

    while i < chars.len() {
        let start = i;
        let style;
        if in_block_comment {
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                i += 1;
            }
            if i < chars.len() {
                i += 2;
                in_block_comment = false;
            }
            style = comment;
        } else if chars[i] == '-' && chars.get(i + 1) == Some(&'-') {
            i = chars.len();
            style = comment;
        } else if chars[i] == '/' && chars.get(i + 1) == Some(&'*') {
            in_block_comment = true;
            i += 2;
            continue_block(&chars, &mut i, &mut in_block_comment);
            style = comment;
        } else if chars[i] == '\'' || chars[i] == '"' {
            let quote = chars[i];
            i += 1;
            while i < chars.len() && chars[i] != quote {
                i += 1;
            }
            i = (i + 1).min(chars.len());
            style = if quote == '\'' {
                Style::default().fg(palette.string)
            } else {
                Style::default().fg(palette.text)
            };
        } else if chars[i].is_ascii_digit() {
            while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                i += 1;
            }
            style = Style::default().fg(palette.number);
        } else if chars[i].is_alphabetic() || chars[i] == '_' {
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            style = if SQL_KEYWORDS.contains(&word.to_ascii_uppercase().as_str()) {
                Style::default()
                    .fg(palette.keyword)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(palette.text)
            };
        } else if "=<>!+-*/%|(),;".contains(chars[i]) {
            i += 1;
            style = Style::default().fg(palette.operator);
        } else {
            i += 1;
            style = Style::default().fg(palette.text);
        }
        spans.push(Span::styled(
            chars[start..i].iter().collect::<String>(),
            style,
        ));
    }
    (spans, in_block_comment)
}

fn continue_block(chars: &[char], i: &mut usize, open: &mut bool) {
    while *i < chars.len() {
        if chars[*i] == '*' && chars.get(*i + 1) == Some(&'/') {
            *i += 2;
            *open = false;
            return;
        }
        *i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::Theme;

    #[test]
    fn test_detect_capability() {
        assert_eq!(
            EditorCapability::detect(EditorPreference::Auto, false),
            EditorCapability::Enhanced
        );
        assert_eq!(
            EditorCapability::detect(EditorPreference::Auto, true),
            EditorCapability::Plain
        );
        assert_eq!(
            EditorCapability::detect(EditorPreference::Enhanced, true),
            EditorCapability::Enhanced
        );
        assert_eq!(
            EditorCapability::Plain.build().capability(),
            EditorCapability::Plain
        );
    }

    #[test]
    fn test_buffer_editing() {
        let mut buf = TextBuffer::default();
        buf.insert_str("SELECT 1\nFROM t");
        assert_eq!(buf.text(), "SELECT 1\nFROM t");
        assert_eq!(buf.cursor(), (1, 6));

        buf.home();
        buf.backspace();
        assert_eq!(buf.text(), "SELECT 1FROM t");
        buf.newline();
        buf.move_up();
        buf.end();
        buf.delete();
        assert_eq!(buf.text(), "SELECT 1FROM t");
    }

    #[test]
    fn test_multibyte_characters() {
        let mut buf = TextBuffer::default();
        buf.insert_str("'héllo'");
        buf.move_left();
        buf.move_left();
        buf.backspace();
        assert_eq!(buf.text(), "'hélo'");
    }

    #[test]
    fn test_completion_extends_table_name() {
        let mut editor = HighlightingEditor::new();
        editor.update_completions(vec!["my_data_2024".into(), "my_data_2024_1".into()]);
        editor.set_text("SELECT * FROM my_d");
        let candidates = editor.complete();
        assert_eq!(candidates.len(), 2);
        assert_eq!(editor.text(), "SELECT * FROM my_data_2024");
    }

    #[test]
    fn test_completion_of_keyword() {
        let mut editor = HighlightingEditor::new();
        editor.set_text("SELECT * FR");
        assert_eq!(editor.complete(), vec!["FROM"]);
        assert_eq!(editor.text(), "SELECT * FROM");

        let mut plain = PlainEditor::new();
        plain.set_text("SELECT * FR");
        assert!(plain.complete().is_empty());
        assert_eq!(plain.text(), "SELECT * FR");
    }

    #[test]
    fn test_highlighting_spans() {
        let palette = Theme::Light.syntax();
        let mut editor = HighlightingEditor::new();
        editor.set_text("select 'a' -- note\n/* open\nstill */ 42");
        let lines = editor.styled_lines(&palette);
        assert_eq!(lines.len(), 3);

        let first = &lines[0].spans;
        assert_eq!(first[0].content, "select");
        assert_eq!(first[0].style.fg, Some(palette.keyword));
        assert_eq!(first[2].content, "'a'");
        assert_eq!(first[2].style.fg, Some(palette.string));
        assert_eq!(first.last().unwrap().style.fg, Some(palette.comment));

        let third = &lines[2].spans;
        assert_eq!(third[0].content, "still */");
        assert_eq!(third[0].style.fg, Some(palette.comment));
        assert_eq!(third.last().unwrap().style.fg, Some(palette.number));
    }
}
