use crate::error::Span;
use log::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Keyword,
    Identifier,
    /// Numbers and strings alike; `Token::quoted` tells them apart.
    Literal,
    Operator,
    Punctuation,
    Eof,
}

const KEYWORDS: &[&str] = &[
    "if", "else", "while", "for", "switch", "case", "default", "print", "var", "let", "func",
    "return", "true", "false", "nil", "in", "try", "as",
];

/// Primitive type names. They only matter when skipping type annotations, and
/// when written as conversion calls like `Int("4")`.
pub const TYPE_NAMES: &[&str] = &[
    "Int",
    "String",
    "Double",
    "Bool",
    "Float",
    "Character",
    "Any",
    "Void",
];

const OPERATOR_CHARS: &str = "+-*/%=<>!&|.?^~";
const PUNCTUATION_CHARS: &str = "(){}[],:;";

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub lexeme: String,
    pub span: Span,
    /// Set for string literals, whose lexeme has the quotes stripped.
    pub quoted: bool,
}

impl Token {
    pub fn new(token_type: TokenType, lexeme: String, span: Span) -> Self {
        Self {
            token_type,
            lexeme,
            span,
            quoted: false,
        }
    }

    pub fn is(&self, token_type: TokenType, lexeme: &str) -> bool {
        self.token_type == token_type && self.lexeme == lexeme
    }

    pub fn is_type_name(&self) -> bool {
        self.token_type == TokenType::Keyword && TYPE_NAMES.contains(&self.lexeme.as_str())
    }
}

pub struct Lexer {
    chars: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
        }
    }

    /// Split the whole source into tokens. Never fails: characters that fit no
    /// rule are dropped, and malformed input shows up later as parse errors.
    pub fn tokenize(mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }

        self.tokens.push(Token::new(
            TokenType::Eof,
            String::new(),
            Span::single(self.current),
        ));
        trace!("lexed {} tokens", self.tokens.len());
        self.tokens
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.chars.len()
    }

    fn scan_token(&mut self) {
        let c = self.advance();

        match c {
            c if c.is_whitespace() => {}
            '/' if self.peek() == '/' => {
                while self.peek() != '\n' && !self.is_at_end() {
                    self.advance();
                }
            }
            '/' if self.peek() == '*' => self.block_comment(),
            '"' => self.string(),
            c if c.is_ascii_digit() => self.number(),
            c if c.is_alphabetic() || c == '_' => self.identifier(),
            c if PUNCTUATION_CHARS.contains(c) => self.add_token(TokenType::Punctuation),
            c if OPERATOR_CHARS.contains(c) => self.operator(c),
            _ => trace!("skipping unrecognized character {c:?}"),
        }
    }

    fn advance(&mut self) -> char {
        let c = self.peek();
        self.current += 1;
        c
    }

    fn peek(&self) -> char {
        self.chars.get(self.current).copied().unwrap_or('\0')
    }

    fn peek_next(&self) -> char {
        self.chars.get(self.current + 1).copied().unwrap_or('\0')
    }

    fn block_comment(&mut self) {
        self.advance();
        while !self.is_at_end() && !(self.peek() == '*' && self.peek_next() == '/') {
            self.advance();
        }
        // closing */
        self.advance();
        self.advance();
    }

    fn string(&mut self) {
        // Parentheses opened by `\(` must be closed before a quote can end the
        // literal, so interpolated expressions may contain strings themselves.
        let mut interpolation_depth = 0usize;
        while !self.is_at_end() {
            match self.peek() {
                '\\' => {
                    self.advance();
                    if self.peek() == '(' {
                        interpolation_depth += 1;
                    }
                    self.advance();
                }
                '"' if interpolation_depth == 0 => break,
                '"' => {
                    // a nested literal inside an interpolation
                    self.advance();
                    while !self.is_at_end() && self.peek() != '"' {
                        if self.peek() == '\\' {
                            self.advance();
                        }
                        self.advance();
                    }
                    self.advance();
                }
                '(' if interpolation_depth > 0 => {
                    interpolation_depth += 1;
                    self.advance();
                }
                ')' if interpolation_depth > 0 => {
                    interpolation_depth -= 1;
                    self.advance();
                }
                _ => {
                    self.advance();
                }
            }
        }

        let end_content = self.current.min(self.chars.len());
        let content: String = self.chars[self.start + 1..end_content].iter().collect();
        // closing quote, if there is one
        self.advance();

        let mut token = Token::new(
            TokenType::Literal,
            content,
            Span::new(self.start, self.current.min(self.chars.len())),
        );
        token.quoted = true;
        self.tokens.push(token);
    }

    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        // `5...10` and `t.0.count` keep their dots as operators
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        self.add_token(TokenType::Literal);
    }

    fn identifier(&mut self) {
        while self.peek().is_alphanumeric() || self.peek() == '_' {
            self.advance();
        }

        let text = self.lexeme();
        let token_type = if KEYWORDS.contains(&text.as_str()) || TYPE_NAMES.contains(&text.as_str())
        {
            TokenType::Keyword
        } else {
            TokenType::Identifier
        };
        self.add_token(token_type);
    }

    fn operator(&mut self, first: char) {
        // `a!.count` and `a?.count`: a lone postfix mark ends before the dot
        let postfix_mark = first == '!' || first == '?';
        if !(postfix_mark && self.peek() == '.') {
            while OPERATOR_CHARS.contains(self.peek()) && self.peek() != '\0' {
                self.advance();
            }
        }

        // `x =-1` or `a ==!b`: a trailing prefix operator becomes its own token
        let run = self.lexeme();
        if run.chars().count() > 1 && (run.ends_with('-') || run.ends_with('!')) {
            self.current -= 1;
            self.add_token(TokenType::Operator);
            self.start = self.current;
            self.advance();
        }
        self.add_token(TokenType::Operator);
    }

    fn lexeme(&self) -> String {
        self.chars[self.start..self.current].iter().collect()
    }

    fn add_token(&mut self, token_type: TokenType) {
        let text = self.lexeme();
        self.tokens.push(Token::new(
            token_type,
            text,
            Span::new(self.start, self.current),
        ));
    }
}

/// Convenience wrapper used by the parser entry points and interpolation.
pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lexemes(source: &str) -> Vec<(TokenType, String)> {
        tokenize(source)
            .into_iter()
            .map(|t| (t.token_type, t.lexeme))
            .collect()
    }

    #[test]
    fn classifies_keywords_and_identifiers() {
        assert_eq!(
            lexemes("let total = count"),
            vec![
                (TokenType::Keyword, "let".to_string()),
                (TokenType::Identifier, "total".to_string()),
                (TokenType::Operator, "=".to_string()),
                (TokenType::Identifier, "count".to_string()),
                (TokenType::Eof, String::new()),
            ]
        );
    }

    #[test]
    fn range_operator_is_not_swallowed_by_number() {
        let tokens = lexemes("5...10");
        assert_eq!(tokens[0], (TokenType::Literal, "5".to_string()));
        assert_eq!(tokens[1], (TokenType::Operator, "...".to_string()));
        assert_eq!(tokens[2], (TokenType::Literal, "10".to_string()));

        let tokens = lexemes("0..<n");
        assert_eq!(tokens[1], (TokenType::Operator, "..<".to_string()));
    }

    #[test]
    fn decimal_numbers() {
        assert_eq!(lexemes("3.14")[0], (TokenType::Literal, "3.14".to_string()));
    }

    #[test]
    fn greedy_multi_character_operators() {
        for op in ["==", "!=", "<=", ">=", "->", "+=", "-=", "&&", "||"] {
            let tokens = lexemes(&format!("a {op} b"));
            assert_eq!(tokens[1], (TokenType::Operator, op.to_string()));
        }
    }

    #[test]
    fn trailing_prefix_operator_is_split() {
        let tokens = lexemes("x =-1");
        assert_eq!(tokens[1], (TokenType::Operator, "=".to_string()));
        assert_eq!(tokens[2], (TokenType::Operator, "-".to_string()));
    }

    #[test]
    fn force_unwrap_before_member_access() {
        let tokens = lexemes("name!.count");
        assert_eq!(tokens[1], (TokenType::Operator, "!".to_string()));
        assert_eq!(tokens[2], (TokenType::Operator, ".".to_string()));
    }

    #[test]
    fn string_keeps_raw_content() {
        let tokens = tokenize(r#"print("I am \(age) years \"old\"")"#);
        assert_eq!(tokens[2].lexeme, r#"I am \(age) years \"old\""#);
        assert!(tokens[2].quoted);
        assert_eq!(tokens[3].lexeme, ")");
    }

    #[test]
    fn interpolation_may_contain_quotes() {
        let tokens = tokenize(r#""a \(x + "b") c""#);
        assert_eq!(tokens[0].lexeme, r#"a \(x + "b") c"#);
        assert_eq!(tokens[1].token_type, TokenType::Eof);
    }

    #[test]
    fn punctuation_and_unknown_characters() {
        let tokens = lexemes("[1: 2] @ #");
        let kinds: Vec<TokenType> = tokens.iter().map(|(k, _)| *k).collect();
        assert_eq!(
            kinds,
            vec![
                TokenType::Punctuation,
                TokenType::Literal,
                TokenType::Punctuation,
                TokenType::Literal,
                TokenType::Punctuation,
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        let tokens = lexemes("a // note\n/* block\n */ b");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].1, "b");
    }

    #[test]
    fn type_names_are_keywords() {
        let tokens = tokenize("Int String x");
        assert!(tokens[0].is_type_name());
        assert!(tokens[1].is_type_name());
        assert!(!tokens[2].is_type_name());
    }
}
