use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Runs of operator glyphs, or a single structural character.
static SPECIAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\\=<>/+!*|&^-]+|[():,\r\n]").expect("valid regex")
});

/// 1-based position; columns count characters, not bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Loc {
    pub line: usize,
    pub column: usize,
}

impl Loc {
    #[must_use]
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub value: String,
    pub loc: Loc,
    pub special: bool,
    pub eof: bool,
}

impl Token {
    fn text(value: &str, loc: Loc) -> Self {
        Self {
            value: value.to_owned(),
            loc,
            special: false,
            eof: false,
        }
    }

    fn special(value: &str, loc: Loc) -> Self {
        Self {
            value: value.to_owned(),
            loc,
            special: true,
            eof: false,
        }
    }

    fn eof(loc: Loc) -> Self {
        Self {
            value: String::new(),
            loc,
            special: false,
            eof: true,
        }
    }

    /// Whether this is the special token `value`.
    #[must_use]
    pub fn is(&self, value: &str) -> bool {
        self.special && self.value == value
    }
}

/// Splits directive text into tokens.
///
/// Line breaks are consumed (they only move the location). Normal text is
/// trimmed and located at its first non-whitespace character. After the
/// input is exhausted every call returns an EOF token at the final position.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
    column: usize,
    saved: Option<Token>,
    finished: bool,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            column: 1,
            saved: None,
            finished: false,
        }
    }

    pub fn next_token(&mut self) -> Token {
        if let Some(token) = self.saved.take() {
            return token;
        }

        loop {
            let rest = &self.input[self.pos..];
            if rest.is_empty() {
                return Token::eof(self.loc());
            }

            match SPECIAL.find(rest) {
                Some(found) if found.start() == 0 => {
                    self.pos += found.end();
                    match found.as_str() {
                        "\n" => self.new_line(),
                        "\r" => {
                            // `\r\n` counts once, on the `\n`.
                            if !self.input[self.pos..].starts_with('\n') {
                                self.new_line();
                            }
                        }
                        run => return self.special_run(run),
                    }
                }
                found => {
                    let end = found.map_or(rest.len(), |m| m.start());
                    let text = &rest[..end];
                    self.pos += end;

                    let leading = text.chars().take_while(|c| c.is_whitespace()).count();
                    let loc = Loc::new(self.line, self.column + leading);
                    self.column += text.chars().count();

                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        return Token::text(trimmed, loc);
                    }
                }
            }
        }
    }

    fn special_run(&mut self, run: &str) -> Token {
        let loc = self.loc();
        let width = run.chars().count();
        self.column += width;

        // `>-1` must read as `>` then `-1`, so a trailing minus sign of a
        // longer run is handed out as its own token.
        if width > 1 && run.ends_with('-') {
            self.saved = Some(Token::special(
                "-",
                Loc::new(loc.line, loc.column + width - 1),
            ));
            return Token::special(&run[..run.len() - 1], loc);
        }

        Token::special(run, loc)
    }

    fn new_line(&mut self) {
        self.line += 1;
        self.column = 1;
    }

    fn loc(&self) -> Loc {
        Loc::new(self.line, self.column)
    }
}

/// Yields every token up to and including EOF, then stops.
impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }

        let token = self.next_token();
        self.finished = token.eof;
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::{Lexer, Loc, Token};

    fn values(input: &str) -> Vec<String> {
        Lexer::new(input).map(|token| token.value).collect()
    }

    #[test]
    fn splits_commands_and_operators() {
        assert_eq!(
            values("ma:5 >< ma:20"),
            vec!["ma", ":", "5", "><", "ma", ":", "20", ""]
        );
        assert_eq!(
            values("boll.upper:20,(ma:5)"),
            vec!["boll.upper", ":", "20", ",", "(", "ma", ":", "5", ")", ""]
        );
    }

    #[test]
    fn trailing_minus_becomes_its_own_token() {
        let tokens: Vec<Token> = Lexer::new("ma:5>-1").collect();
        let shape: Vec<(&str, bool, Loc)> = tokens
            .iter()
            .map(|t| (t.value.as_str(), t.special, t.loc))
            .collect();

        assert_eq!(
            shape,
            vec![
                ("ma", false, Loc::new(1, 1)),
                (":", true, Loc::new(1, 3)),
                ("5", false, Loc::new(1, 4)),
                (">", true, Loc::new(1, 5)),
                ("-", true, Loc::new(1, 6)),
                ("1", false, Loc::new(1, 7)),
                ("", false, Loc::new(1, 8)),
            ]
        );

        assert_eq!(values("a--1"), vec!["a", "-", "-", "1", ""]);
        assert_eq!(values("a-1"), vec!["a", "-", "1", ""]);
    }

    #[test]
    fn text_is_trimmed_and_located_at_first_visible_char() {
        let tokens: Vec<Token> = Lexer::new("  ma :  5 ").collect();
        assert_eq!(tokens[0], Token::text("ma", Loc::new(1, 3)));
        assert_eq!(tokens[1], Token::special(":", Loc::new(1, 6)));
        assert_eq!(tokens[2], Token::text("5", Loc::new(1, 9)));
        assert!(tokens[3].eof);
        assert_eq!(tokens[3].loc, Loc::new(1, 11));
    }

    #[test]
    fn line_breaks_advance_the_location() {
        let tokens: Vec<Token> = Lexer::new("ma:5\n>\r\nma:2\rx").collect();
        let located: Vec<(&str, Loc)> = tokens
            .iter()
            .map(|t| (t.value.as_str(), t.loc))
            .collect();

        assert_eq!(
            located,
            vec![
                ("ma", Loc::new(1, 1)),
                (":", Loc::new(1, 3)),
                ("5", Loc::new(1, 4)),
                (">", Loc::new(2, 1)),
                ("ma", Loc::new(3, 1)),
                (":", Loc::new(3, 3)),
                ("2", Loc::new(3, 4)),
                ("x", Loc::new(4, 1)),
                ("", Loc::new(4, 2)),
            ]
        );
    }

    #[test]
    fn columns_count_characters() {
        let tokens: Vec<Token> = Lexer::new("é:ü").collect();
        assert_eq!(tokens[1].loc, Loc::new(1, 2));
        assert_eq!(tokens[2].loc, Loc::new(1, 3));
    }

    #[test]
    fn eof_repeats_and_iteration_stops() {
        let mut lexer = Lexer::new("ma");
        assert_eq!(lexer.next_token().value, "ma");
        assert!(lexer.next_token().eof);
        assert!(lexer.next_token().eof);

        let mut iter = Lexer::new("");
        assert!(iter.next().is_some_and(|t| t.eof));
        assert!(iter.next().is_none());
    }
}
