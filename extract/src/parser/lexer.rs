//! Depth- and quote-aware scanning of table bodies.
//!
//! Nested structure (type arguments such as `numeric(10,2)`, `CHECK (...)`
//! expressions, quoted literals) is handled here with a character scanner
//! instead of regular expressions.

/// Quote state for one left-to-right scan.
///
/// Backslash escapes are honoured only in `E'...'` literals; standard
/// strings end at the next quote (`''` reads as close then reopen).
#[derive(Debug, Default)]
struct QuoteState {
    open: Option<char>,
    escapes: bool,
    escaped: bool,
    last: char,
    before_last: char,
}

impl QuoteState {
    /// Feeds one character. Returns `true` while the character belongs to a
    /// quoted literal (including the delimiters themselves).
    fn feed(&mut self, ch: char) -> bool {
        match self.open {
            Some(quote) => {
                if self.escaped {
                    self.escaped = false;
                } else if self.escapes && ch == '\\' {
                    self.escaped = true;
                } else if ch == quote {
                    self.open = None;
                }
                true
            }
            None if ch == '\'' || ch == '"' => {
                self.escapes = ch == '\'' && self.follows_escape_prefix();
                self.open = Some(ch);
                self.last = ch;
                true
            }
            None => {
                self.before_last = self.last;
                self.last = ch;
                false
            }
        }
    }

    fn follows_escape_prefix(&self) -> bool {
        matches!(self.last, 'E' | 'e')
            && !(self.before_last.is_alphanumeric() || self.before_last == '_')
    }
}

/// Collapses runs of whitespace outside quoted literals to one space.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quotes = QuoteState::default();
    let mut pending_space = false;

    for ch in text.trim().chars() {
        if !quotes.feed(ch) && ch.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space {
            out.push(' ');
            pending_space = false;
        }
        out.push(ch);
    }
    out
}

/// Splits a `CREATE TABLE` body into top-level comma-separated clauses.
///
/// Commas nested in parentheses or inside single/double-quoted literals are
/// not boundaries. Clauses are returned untrimmed and none are dropped; the
/// trailing buffer is emitted only when non-empty. Unbalanced parentheses
/// and unterminated quotes are tolerated.
///
/// # Examples
///
/// ```
/// use ddl_schema_extract::parser::split_clauses;
///
/// let clauses = split_clauses("a int, b numeric(10,2), c text");
/// assert_eq!(clauses, vec!["a int", " b numeric(10,2)", " c text"]);
/// ```
pub fn split_clauses(body: &str) -> Vec<String> {
    let mut clauses = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;
    let mut quotes = QuoteState::default();

    for ch in body.chars() {
        if !quotes.feed(ch) {
            match ch {
                '(' => depth += 1,
                ')' => depth -= 1,
                ',' if depth == 0 => {
                    clauses.push(std::mem::take(&mut current));
                    continue;
                }
                _ => {}
            }
        }
        current.push(ch);
    }

    if !current.is_empty() {
        clauses.push(current);
    }

    clauses
}

/// Finds the parenthesis closing the one at byte offset `open`.
///
/// Returns `None` when `open` does not point at `(` or the parenthesis is
/// never closed.
pub fn find_closing_paren(text: &str, open: usize) -> Option<usize> {
    if text.as_bytes().get(open) != Some(&b'(') {
        return None;
    }

    let mut depth: usize = 0;
    let mut quotes = QuoteState::default();
    for (offset, ch) in text[open..].char_indices() {
        if quotes.feed(ch) {
            continue;
        }
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + offset);
                }
            }
            _ => {}
        }
    }
    None
}

/// Splits a clause into whitespace-separated words, keeping parenthesised
/// groups attached to the word they follow (`numeric (10, 2)` is one word).
pub fn split_words(clause: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;
    let mut quotes = QuoteState::default();

    for ch in clause.chars() {
        if quotes.feed(ch) {
            current.push(ch);
            continue;
        }
        match ch {
            '(' => {
                if depth == 0 && current.is_empty() {
                    if let Some(previous) = words.pop() {
                        current = previous;
                    }
                }
                depth += 1;
                current.push(ch);
            }
            ')' => {
                depth -= 1;
                current.push(ch);
            }
            c if c.is_whitespace() && depth <= 0 => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Removes `--` line comments and `/* */` block comments outside quoted
/// literals. Newlines ending line comments are kept; block comments become
/// a single space.
pub fn strip_sql_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut quotes = QuoteState::default();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if quotes.feed(ch) {
            out.push(ch);
            continue;
        }
        match (ch, chars.peek()) {
            ('-', Some('-')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut previous = '\0';
                for skipped in chars.by_ref() {
                    if previous == '*' && skipped == '/' {
                        break;
                    }
                    previous = skipped;
                }
                out.push(' ');
            }
            _ => out.push(ch),
        }
    }
    out
}

/// Strips surrounding double quotes from an identifier.
pub fn unquote_identifier(raw: &str) -> &str {
    raw.trim().trim_matches('"')
}
