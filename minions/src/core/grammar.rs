//! Grammar engine for recognizing command shapes in model output.
//!
//! A [`Grammar`] is an ordered token sequence whose first token is a literal
//! verb. Matching is anchored at the start of the input and atomic: either
//! every token matches and the consumed prefix is reported, or nothing is
//! consumed and the caller keeps its original input.
//!
//! Model output is sloppy, so matching tolerates a few habits:
//! a list marker (`-`, `*`, `1.`, `2)`) before the verb, a verb wrapped in
//! quotes or backticks, and quoted or bare arguments.

use std::sync::LazyLock;

use regex::Regex;

/// Quote characters accepted around verbs and arguments.
const QUOTES: [char; 3] = ['"', '\'', '`'];

static LIST_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[-*+•]|\d+[.)])[ \t]*").unwrap());

/// One element of a grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Exact, case-sensitive keyword matched as a whole word.
    Literal(String),
    /// A quoted span on the current line, or a bare whitespace-free word.
    QuotedOrWord,
    /// Everything up to the end of the current line.
    UntilEol,
    /// Everything remaining in the input.
    UntilEof,
    /// Lines up to (not including) a line consisting of the sentinel.
    UntilSentinel(String),
}

impl Token {
    /// Whether this token produces a captured field.
    pub fn is_capture(&self) -> bool {
        !matches!(self, Token::Literal(_))
    }
}

/// Ordered token sequence describing one command shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grammar {
    tokens: Vec<Token>,
}

/// Successful grammar match: captured fields in token order plus the
/// unconsumed remainder of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrammarMatch<'a> {
    pub fields: Vec<String>,
    pub rest: &'a str,
}

impl Grammar {
    /// Start a grammar with its leading verb.
    pub fn new(verb: &str) -> Self {
        Self {
            tokens: vec![Token::Literal(verb.to_string())],
        }
    }

    pub fn literal(mut self, keyword: &str) -> Self {
        self.tokens.push(Token::Literal(keyword.to_string()));
        self
    }

    pub fn quoted(mut self) -> Self {
        self.tokens.push(Token::QuotedOrWord);
        self
    }

    pub fn until_eol(mut self) -> Self {
        self.tokens.push(Token::UntilEol);
        self
    }

    pub fn until_eof(mut self) -> Self {
        self.tokens.push(Token::UntilEof);
        self
    }

    pub fn until(mut self, sentinel: &str) -> Self {
        self.tokens.push(Token::UntilSentinel(sentinel.to_string()));
        self
    }

    /// The leading literal that identifies the command.
    pub fn verb(&self) -> &str {
        match self.tokens.first() {
            Some(Token::Literal(verb)) => verb,
            _ => "",
        }
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    /// Number of captured fields a full match produces.
    pub fn capture_count(&self) -> usize {
        self.tokens.iter().filter(|token| token.is_capture()).count()
    }

    /// Try to match this grammar at the start of `input`.
    pub fn match_prefix<'a>(&self, input: &'a str) -> Option<GrammarMatch<'a>> {
        let mut rest = input;
        let mut fields = Vec::with_capacity(self.capture_count());
        for (index, token) in self.tokens.iter().enumerate() {
            rest = skip_horizontal_whitespace(rest);
            rest = match token {
                Token::Literal(keyword) => match_literal(rest, keyword, index == 0)?,
                Token::QuotedOrWord => {
                    let (field, after) = match_quoted_or_word(rest)?;
                    fields.push(field);
                    after
                }
                Token::UntilEol => {
                    let (field, after) = match_until_eol(rest);
                    fields.push(field);
                    after
                }
                Token::UntilEof => {
                    fields.push(skip_blank_line_remainder(rest).trim_end().to_string());
                    ""
                }
                Token::UntilSentinel(sentinel) => {
                    let (field, after) = match_until_sentinel(rest, sentinel);
                    fields.push(field);
                    after
                }
            };
        }
        Some(GrammarMatch { fields, rest })
    }
}

fn skip_horizontal_whitespace(input: &str) -> &str {
    input.trim_start_matches([' ', '\t'])
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn split_line(input: &str) -> (&str, &str) {
    match input.find('\n') {
        Some(end) => (&input[..end], &input[end + 1..]),
        None => (input, ""),
    }
}

fn skip_blank_line_remainder(input: &str) -> &str {
    let (line, after) = split_line(input);
    if line.trim().is_empty() { after } else { input }
}

/// Unquote `value` only when one quoted span covers all of it.
fn strip_wrapping_quotes(value: &str) -> &str {
    for quote in QUOTES {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            let inner = &value[1..value.len() - 1];
            if !inner.contains(quote) {
                return inner;
            }
        }
    }
    value
}

fn match_literal<'a>(input: &'a str, keyword: &str, leading: bool) -> Option<&'a str> {
    let mut rest = input;
    if leading && let Some(marker) = LIST_MARKER_RE.find(rest) {
        rest = &rest[marker.end()..];
    }
    let quote = if leading {
        rest.chars().next().filter(|c| QUOTES.contains(c))
    } else {
        None
    };
    if let Some(quote) = quote {
        rest = &rest[quote.len_utf8()..];
    }
    let mut after = rest.strip_prefix(keyword)?;
    if let Some(quote) = quote
        && let Some(unquoted) = after.strip_prefix(quote)
    {
        after = unquoted;
    }
    if after.chars().next().is_some_and(is_word_char) {
        return None;
    }
    Some(after)
}

fn match_quoted_or_word(input: &str) -> Option<(String, &str)> {
    let (line, _) = split_line(input);
    let first = line.chars().next()?;
    if QUOTES.contains(&first) {
        let body = &line[first.len_utf8()..];
        if let Some(close) = body.find(first) {
            let consumed = first.len_utf8() + close + first.len_utf8();
            return Some((body[..close].to_string(), &input[consumed..]));
        }
    }
    let word_len = line.find(char::is_whitespace).unwrap_or(line.len());
    let word = line[..word_len].trim_matches(&QUOTES[..]);
    if word.is_empty() {
        return None;
    }
    Some((word.to_string(), &input[word_len..]))
}

fn match_until_eol(input: &str) -> (String, &str) {
    let (line, after) = split_line(input);
    (strip_wrapping_quotes(line.trim()).to_string(), after)
}

fn match_until_sentinel<'a>(input: &'a str, sentinel: &str) -> (String, &'a str) {
    let mut rest = skip_blank_line_remainder(input);
    let mut lines = Vec::new();
    while !rest.is_empty() {
        let (line, after) = split_line(rest);
        if line.trim() == sentinel {
            return (lines.join("\n"), after);
        }
        lines.push(line.trim_end_matches('\r'));
        rest = after;
    }
    (lines.join("\n").trim_end().to_string(), "")
}
