use crate::ast::{AssignOp, FuncDecl, Literal, Node, SwitchCase};
use crate::error::{Span, SyntaxError};
use crate::lexer::{Token, TokenType};
use crate::stack::ensure_sufficient_stack;
use log::trace;

const SELECTOR_LABELS: &[&str] = &["contentsOf", "through"];

/// Recursive-descent parser. It never stops at the first problem: a missing
/// token is recorded and parsing carries on, so the caller always gets a tree
/// back along with every error found.
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    errors: Vec<SyntaxError>,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.last().map(|t| t.token_type) != Some(TokenType::Eof) {
            let end = tokens.last().map(|t| t.span.end).unwrap_or(0);
            tokens.push(Token::new(TokenType::Eof, String::new(), Span::single(end)));
        }
        Self {
            tokens,
            current: 0,
            errors: Vec::new(),
        }
    }

    pub fn parse(mut self) -> (Node, Vec<SyntaxError>) {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            self.statement_into(&mut statements);
        }

        trace!(
            "parsed {} top-level statements with {} errors",
            statements.len(),
            self.errors.len()
        );
        (Node::Block(statements), self.errors)
    }

    /// Parse one statement and push it, making sure at least one token is
    /// consumed so a stray token can never stall the parser.
    fn statement_into(&mut self, statements: &mut Vec<Node>) {
        let before = self.current;
        if let Some(statement) = self.statement() {
            statements.push(statement);
        }
        if self.current == before {
            trace!("skipping unexpected token '{}'", self.peek().lexeme);
            self.advance();
        }
    }

    fn statement(&mut self) -> Option<Node> {
        ensure_sufficient_stack(|| {
            let token = self.peek().clone();
            match token.token_type {
                TokenType::Keyword => match token.lexeme.as_str() {
                    "print" => Some(self.print_statement()),
                    "if" => Some(self.if_statement()),
                    "switch" => Some(self.switch_statement()),
                    "while" => Some(self.while_statement()),
                    "for" => Some(self.for_statement()),
                    "var" | "let" => Some(self.variable_declaration()),
                    "func" => Some(self.function_declaration()),
                    "return" => Some(self.return_statement()),
                    _ if self.starts_expression() => Some(self.expression_statement()),
                    _ => None,
                },
                TokenType::Identifier if token.lexeme == "break" => {
                    self.advance();
                    Some(Node::Break)
                }
                TokenType::Identifier if token.lexeme == "continue" => {
                    self.advance();
                    Some(Node::Continue)
                }
                TokenType::Punctuation if token.lexeme == "{" => Some(self.block()),
                TokenType::Punctuation if token.lexeme == ";" => {
                    self.advance();
                    None
                }
                _ if self.starts_expression() => Some(self.expression_statement()),
                _ => None,
            }
        })
    }

    /// `{ statements }`
    fn block(&mut self) -> Node {
        let mut statements = Vec::new();
        if !self.expect_with_help(
            TokenType::Punctuation,
            "{",
            "Expected '{' to open a block",
            "Bodies of if, while, for, switch and func must be wrapped in braces.",
        ) {
            return Node::Block(statements);
        }

        while !self.check(TokenType::Punctuation, "}") && !self.is_at_end() {
            self.statement_into(&mut statements);
        }

        self.expect_with_help(
            TokenType::Punctuation,
            "}",
            "Expected '}' after block",
            "Every '{' needs a matching '}'.",
        );
        Node::Block(statements)
    }

    fn print_statement(&mut self) -> Node {
        self.advance();
        let mut args = Vec::new();
        let mut separator = None;
        let mut terminator = None;

        if self.expect(TokenType::Punctuation, "(", "Expected '(' after 'print'") {
            for (label, arg) in self.arguments(")") {
                match label.as_deref() {
                    Some("separator") => separator = Some(Box::new(arg)),
                    Some("terminator") => terminator = Some(Box::new(arg)),
                    _ => args.push(arg),
                }
            }
            self.expect(TokenType::Punctuation, ")", "Expected ')' after print arguments");
        }

        Node::Print {
            args,
            separator,
            terminator,
        }
    }

    fn if_statement(&mut self) -> Node {
        self.advance();

        let mut binding = None;
        let condition = if self.check(TokenType::Keyword, "let") || self.check(TokenType::Keyword, "var")
        {
            self.advance();
            let name = self.identifier("Expected a name after 'if let'");
            self.skip_type_annotation();
            let condition = if self.match_operator("=") {
                self.expression()
            } else {
                // `if let name {` rebinds a variable of the same name
                Node::Variable(name.clone())
            };
            binding = Some(name);
            condition
        } else {
            self.expression()
        };

        let then_block = self.block();
        let else_block = if self.match_keyword("else") {
            if self.check(TokenType::Keyword, "if") {
                Some(Box::new(Node::Block(vec![self.if_statement()])))
            } else {
                Some(Box::new(self.block()))
            }
        } else {
            None
        };

        Node::If {
            condition: Box::new(condition),
            binding,
            then_block: Box::new(then_block),
            else_block,
        }
    }

    fn switch_statement(&mut self) -> Node {
        self.advance();
        let subject = self.expression();
        let mut cases = Vec::new();
        let mut default = None;

        if !self.expect(TokenType::Punctuation, "{", "Expected '{' after switch subject") {
            return Node::Switch {
                subject: Box::new(subject),
                cases,
                default,
            };
        }

        while !self.check(TokenType::Punctuation, "}") && !self.is_at_end() {
            if self.match_keyword("case") {
                let mut patterns = vec![self.expression()];
                while self.match_punctuation(",") {
                    patterns.push(self.expression());
                }
                self.expect_with_help(
                    TokenType::Punctuation,
                    ":",
                    "Expected ':' after case pattern",
                    "Write each case as `case value:` followed by its statements.",
                );
                let body = self.case_body();
                cases.push(SwitchCase { patterns, body });
            } else if self.match_keyword("default") {
                self.expect(TokenType::Punctuation, ":", "Expected ':' after 'default'");
                default = Some(Box::new(self.case_body()));
            } else {
                self.error_here(
                    "Expected 'case' or 'default' in switch",
                    Some("Switch bodies are a list of `case value:` and `default:` sections."),
                );
                self.advance();
            }
        }

        self.expect(TokenType::Punctuation, "}", "Expected '}' after switch cases");
        Node::Switch {
            subject: Box::new(subject),
            cases,
            default,
        }
    }

    fn case_body(&mut self) -> Node {
        let mut statements = Vec::new();
        while !self.check(TokenType::Keyword, "case")
            && !self.check(TokenType::Keyword, "default")
            && !self.check(TokenType::Punctuation, "}")
            && !self.is_at_end()
        {
            self.statement_into(&mut statements);
        }
        Node::Block(statements)
    }

    fn while_statement(&mut self) -> Node {
        self.advance();
        let condition = self.expression();
        let body = self.block();
        Node::While {
            condition: Box::new(condition),
            body: Box::new(body),
        }
    }

    fn for_statement(&mut self) -> Node {
        self.advance();
        let variable = self.identifier("Expected loop variable after 'for'");
        self.expect_with_help(
            TokenType::Keyword,
            "in",
            "Expected 'in' after loop variable",
            "Loops are written `for item in sequence { ... }`.",
        );
        let sequence = self.expression();
        let body = self.block();
        Node::ForIn {
            variable,
            sequence: Box::new(sequence),
            body: Box::new(body),
        }
    }

    fn variable_declaration(&mut self) -> Node {
        let mutable = self.advance().lexeme == "var";
        let name = self.identifier("Expected variable name");
        self.skip_type_annotation();

        let value = if self.match_operator("=") {
            Some(Box::new(self.expression()))
        } else {
            None
        };

        Node::VariableDecl {
            name,
            mutable,
            value,
        }
    }

    fn function_declaration(&mut self) -> Node {
        self.advance();
        let name = self.identifier("Expected function name after 'func'");
        let mut params = Vec::new();

        if self.expect(TokenType::Punctuation, "(", "Expected '(' after function name") {
            while !self.check(TokenType::Punctuation, ")") && !self.is_at_end() {
                // `label name: Type` keeps the last name before the colon
                let mut param = None;
                while self.peek().token_type == TokenType::Identifier {
                    param = Some(self.advance().lexeme.clone());
                }
                match param {
                    Some(param) => params.push(param),
                    None => {
                        self.error_here("Expected parameter name", None);
                        break;
                    }
                }
                self.skip_type_annotation();
                if self.match_operator("=") {
                    // default values are not supported; parse and drop
                    self.expression();
                }
                if !self.match_punctuation(",") {
                    break;
                }
            }
            self.expect(TokenType::Punctuation, ")", "Expected ')' after parameters");
        }

        if self.match_operator("->") {
            self.skip_type();
        }

        let body = self.block();
        Node::FuncDecl(FuncDecl {
            name,
            params,
            body: Box::new(body),
        })
    }

    fn return_statement(&mut self) -> Node {
        self.advance();
        let ends_here = self.check(TokenType::Punctuation, "}")
            || self.check(TokenType::Punctuation, ";")
            || self.is_at_end()
            || (self.peek().token_type == TokenType::Keyword && !self.starts_expression());
        if ends_here {
            Node::Return(None)
        } else {
            Node::Return(Some(Box::new(self.expression())))
        }
    }

    /// An expression, optionally turned into an assignment by a trailing
    /// `=`, `+=`, `-=`, `*=` or `/=`.
    fn expression_statement(&mut self) -> Node {
        let expr = self.expression();

        let op = match self.peek() {
            token if token.token_type == TokenType::Operator => AssignOp::from_lexeme(&token.lexeme),
            _ => None,
        };
        let Some(op) = op else {
            return expr;
        };

        self.advance();
        let value = self.expression();
        if Self::is_assignable(&expr) {
            Node::Assignment {
                target: Box::new(expr),
                op,
                value: Box::new(value),
            }
        } else {
            trace!("dropping assignment to a non-assignable target");
            expr
        }
    }

    /// Variables, and subscript chains rooted at a variable.
    fn is_assignable(node: &Node) -> bool {
        match node {
            Node::Variable(_) => true,
            Node::Subscript { receiver, .. } => Self::is_assignable(receiver),
            _ => false,
        }
    }

    fn expression(&mut self) -> Node {
        ensure_sufficient_stack(|| self.or())
    }

    fn or(&mut self) -> Node {
        let mut expr = self.and();
        while self.match_operator("||") {
            let right = self.and();
            expr = Self::binary(expr, "||", right);
        }
        expr
    }

    fn and(&mut self) -> Node {
        let mut expr = self.equality();
        while self.match_operator("&&") {
            let right = self.equality();
            expr = Self::binary(expr, "&&", right);
        }
        expr
    }

    fn equality(&mut self) -> Node {
        let mut expr = self.comparison();
        while let Some(op) = self.match_operators(&["==", "!="]) {
            let right = self.comparison();
            expr = Self::binary(expr, &op, right);
        }
        expr
    }

    fn comparison(&mut self) -> Node {
        let mut expr = self.additive();
        while let Some(op) = self.match_operators(&["<", "<=", ">", ">=", "..<", "..."]) {
            let right = self.additive();
            expr = Self::binary(expr, &op, right);
        }
        expr
    }

    fn additive(&mut self) -> Node {
        let mut expr = self.multiplicative();
        while let Some(op) = self.match_operators(&["+", "-"]) {
            let right = self.multiplicative();
            expr = Self::binary(expr, &op, right);
        }
        expr
    }

    fn multiplicative(&mut self) -> Node {
        let mut expr = self.unary();
        while let Some(op) = self.match_operators(&["*", "/", "%"]) {
            let right = self.unary();
            expr = Self::binary(expr, &op, right);
        }
        expr
    }

    fn unary(&mut self) -> Node {
        if let Some(op) = self.match_operators(&["-", "!"]) {
            let operand = ensure_sufficient_stack(|| self.unary());
            return Node::Unary {
                op,
                operand: Box::new(operand),
            };
        }
        self.postfix()
    }

    /// Calls, subscripts, member access, force-unwrap and casts, applied left
    /// to right so `a.b(1)[2]!` nests the way it reads.
    fn postfix(&mut self) -> Node {
        let mut expr = self.primary();

        loop {
            let token = self.peek().clone();
            match (token.token_type, token.lexeme.as_str()) {
                (TokenType::Punctuation, "[") => {
                    self.advance();
                    let index = self.expression();
                    let default = if self.check(TokenType::Punctuation, ",")
                        && self.peek_next().is(TokenType::Keyword, "default")
                    {
                        self.advance();
                        self.advance();
                        self.expect(TokenType::Punctuation, ":", "Expected ':' after 'default'");
                        Some(Box::new(self.expression()))
                    } else {
                        None
                    };
                    self.expect(TokenType::Punctuation, "]", "Expected ']' after subscript");
                    expr = Node::Subscript {
                        receiver: Box::new(expr),
                        index: Box::new(index),
                        default,
                    };
                }
                (TokenType::Operator, ".") => {
                    self.advance();
                    expr = self.member(expr);
                }
                (TokenType::Operator, "!") => {
                    self.advance();
                    expr = Node::ForceUnwrap(Box::new(expr));
                }
                // optional chaining; member access already sees through optionals
                (TokenType::Operator, "?")
                    if self.peek_next().is(TokenType::Operator, ".")
                        || self.peek_next().is(TokenType::Punctuation, "[") =>
                {
                    self.advance();
                }
                (TokenType::Keyword, "as") => {
                    self.advance();
                    let forced = match self.peek() {
                        t if t.is(TokenType::Operator, "!") => Some(true),
                        t if t.is(TokenType::Operator, "?") => Some(false),
                        _ => None,
                    };
                    if forced.is_some() {
                        self.advance();
                    }
                    let target = self.skip_type();
                    if let Some(forced) = forced {
                        expr = Node::Cast {
                            value: Box::new(expr),
                            target,
                            forced,
                        };
                    }
                }
                _ => break,
            }
        }

        expr
    }

    /// The part after a `.`: a property, a method call, or a tuple position.
    fn member(&mut self, receiver: Node) -> Node {
        let token = self.peek().clone();
        match token.token_type {
            TokenType::Identifier | TokenType::Keyword => {
                self.advance();
                let mut method = token.lexeme;
                let args = if self.check(TokenType::Punctuation, "(") {
                    self.advance();
                    let args = self.arguments(")");
                    self.expect(TokenType::Punctuation, ")", "Expected ')' after arguments");
                    method = Self::selector(method, &args);
                    Some(args.into_iter().map(|(_, arg)| arg).collect())
                } else {
                    None
                };
                Node::MethodCall {
                    receiver: Box::new(receiver),
                    method,
                    args,
                }
            }
            TokenType::Literal if !token.quoted => {
                self.advance();
                // `t.0.1` lexes its tail as the number `0.1`
                token
                    .lexeme
                    .split('.')
                    .fold(receiver, |receiver, position| Node::MethodCall {
                        receiver: Box::new(receiver),
                        method: position.to_string(),
                        args: None,
                    })
            }
            _ => {
                self.error_here("Expected member name after '.'", None);
                receiver
            }
        }
    }

    fn primary(&mut self) -> Node {
        let token = self.peek().clone();

        match token.token_type {
            TokenType::Literal => {
                self.advance();
                if token.quoted {
                    Node::Literal(Literal::Str(token.lexeme))
                } else if token.lexeme.contains('.') {
                    Node::Literal(Literal::Double(token.lexeme.parse().unwrap_or(0.0)))
                } else {
                    match token.lexeme.parse::<i64>() {
                        Ok(n) => Node::Literal(Literal::Int(n)),
                        Err(_) => Node::Literal(Literal::Double(token.lexeme.parse().unwrap_or(0.0))),
                    }
                }
            }
            TokenType::Keyword => match token.lexeme.as_str() {
                "true" => {
                    self.advance();
                    Node::Literal(Literal::Bool(true))
                }
                "false" => {
                    self.advance();
                    Node::Literal(Literal::Bool(false))
                }
                "nil" => {
                    self.advance();
                    Node::Literal(Literal::Nil)
                }
                "try" => {
                    self.advance();
                    if self.match_operator("!") {
                        Node::TryForce(Box::new(self.unary()))
                    } else {
                        // `try` and `try?` just evaluate their operand
                        self.match_operator("?");
                        self.unary()
                    }
                }
                _ if token.is_type_name() => self.call_or_variable(),
                _ => self.expected_expression(&token),
            },
            TokenType::Identifier => self.call_or_variable(),
            TokenType::Punctuation if token.lexeme == "(" => {
                self.advance();
                let mut elements = self.arguments(")");
                self.expect_with_help(
                    TokenType::Punctuation,
                    ")",
                    "Expected ')' after expression",
                    "Every opening parenthesis '(' must have a matching closing parenthesis ')'.",
                );
                if elements.len() == 1 && elements[0].0.is_none() {
                    elements.remove(0).1
                } else {
                    Node::Tuple(elements)
                }
            }
            TokenType::Punctuation if token.lexeme == "[" => self.collection_literal(),
            _ => self.expected_expression(&token),
        }
    }

    fn call_or_variable(&mut self) -> Node {
        let name = self.advance().lexeme.clone();
        if self.check(TokenType::Punctuation, "(") {
            self.advance();
            let args = self.arguments(")");
            self.expect_with_help(
                TokenType::Punctuation,
                ")",
                "Expected ')' after arguments",
                "Function calls must be closed with ')' after the arguments. Example: greet(name)",
            );
            Node::Call {
                callee: Self::selector(name, &args),
                args: args.into_iter().map(|(_, arg)| arg).collect(),
            }
        } else {
            Node::Variable(name)
        }
    }

    /// Argument labels are dropped, except the few that pick a different
    /// built-in: `append(contentsOf:)` and `stride(from:through:by:)` become
    /// the names `append(contentsOf:)` and `stride(through:)`.
    fn selector(name: String, args: &[(Option<String>, Node)]) -> String {
        match args
            .iter()
            .filter_map(|(label, _)| label.as_deref())
            .find(|label| SELECTOR_LABELS.contains(label))
        {
            Some(label) => format!("{name}({label}:)"),
            None => name,
        }
    }

    /// `[a, b]`, `[k: v]`, `[:]`, and the empty initializers `[Int]()` and
    /// `[String: Int]()`.
    fn collection_literal(&mut self) -> Node {
        if let Some(empty) = self.empty_collection_initializer() {
            return empty;
        }

        self.advance();
        if self.match_punctuation("]") {
            return Node::Array(Vec::new());
        }
        if self.match_punctuation(":") {
            self.expect(TokenType::Punctuation, "]", "Expected ']' after '[:'");
            return Node::Dictionary(Vec::new());
        }

        let first = self.expression();
        if self.match_punctuation(":") {
            let value = self.expression();
            let mut pairs = vec![(first, value)];
            while self.match_punctuation(",") {
                if self.check(TokenType::Punctuation, "]") {
                    break;
                }
                let key = self.expression();
                self.expect_with_help(
                    TokenType::Punctuation,
                    ":",
                    "Expected ':' after dictionary key",
                    "Dictionary entries require a colon ':' between key and value. Example: [\"key\": 1]",
                );
                let value = self.expression();
                pairs.push((key, value));
            }
            self.expect(TokenType::Punctuation, "]", "Expected ']' after dictionary pairs");
            return Node::Dictionary(pairs);
        }

        let mut elements = vec![first];
        while self.match_punctuation(",") {
            if self.check(TokenType::Punctuation, "]") {
                break;
            }
            elements.push(self.expression());
        }
        self.expect_with_help(
            TokenType::Punctuation,
            "]",
            "Expected ']' after array elements",
            "Array literals must be closed with ']' after the opening '['. Example: [1, 2, 3]",
        );
        Node::Array(elements)
    }

    fn empty_collection_initializer(&mut self) -> Option<Node> {
        let checkpoint = self.current;
        let errors = self.errors.len();
        let type_name = self.skip_type();
        let is_initializer = !type_name.is_empty()
            && self.errors.len() == errors
            && self.match_punctuation("(")
            && self.match_punctuation(")");
        if is_initializer {
            let is_dictionary = type_name.starts_with('[') && type_name.contains(':');
            Some(if is_dictionary {
                Node::Dictionary(Vec::new())
            } else {
                Node::Array(Vec::new())
            })
        } else {
            self.current = checkpoint;
            self.errors.truncate(errors);
            None
        }
    }

    /// Comma-separated expressions up to (not including) `close`, each with
    /// its `label:` if one was written.
    fn arguments(&mut self, close: &str) -> Vec<(Option<String>, Node)> {
        let mut args = Vec::new();
        while !self.check(TokenType::Punctuation, close) && !self.is_at_end() {
            let label = if matches!(
                self.peek().token_type,
                TokenType::Identifier | TokenType::Keyword
            ) && self.peek_next().is(TokenType::Punctuation, ":")
            {
                let label = self.advance().lexeme.clone();
                self.advance();
                Some(label)
            } else {
                None
            };

            let before = self.current;
            let arg = self.expression();
            args.push((label, arg));
            if self.current == before || !self.match_punctuation(",") {
                break;
            }
        }
        args
    }

    /// Skip `: Type` if present.
    fn skip_type_annotation(&mut self) {
        if self.match_punctuation(":") {
            self.skip_type();
        }
    }

    /// Skip a type such as `Int`, `String?`, `[Int]`, `[String: Int]`,
    /// `(Int, String)` or `Array<Int>`, returning the text that was skipped.
    fn skip_type(&mut self) -> String {
        let mut text = String::new();
        let token = self.peek().clone();

        match (token.token_type, token.lexeme.as_str()) {
            (TokenType::Punctuation, open @ ("[" | "(")) => {
                let close = if open == "[" { "]" } else { ")" };
                self.advance();
                text.push_str(open);
                while !self.check(TokenType::Punctuation, close) && !self.is_at_end() {
                    if self.match_punctuation(":") {
                        text.push(':');
                    } else if self.match_punctuation(",") {
                        text.push(',');
                    } else {
                        let before = self.current;
                        text.push_str(&self.skip_type());
                        if self.current == before {
                            break;
                        }
                    }
                }
                if self.expect(TokenType::Punctuation, close, "Expected closing bracket in type") {
                    text.push_str(close);
                }
            }
            (TokenType::Identifier | TokenType::Keyword, _) => {
                self.advance();
                text.push_str(&token.lexeme);
                // generic arguments: Array<Int>, Dictionary<String, Int>
                if self.check(TokenType::Operator, "<") {
                    self.advance();
                    while !self.is_at_end() && !self.peek().lexeme.starts_with('>') {
                        self.advance();
                    }
                    self.advance();
                }
            }
            _ => {
                self.error_here("Expected type name", None);
                return text;
            }
        }

        // optional markers: String?, Int!, [Int]??
        while self.peek().token_type == TokenType::Operator
            && self.peek().lexeme.chars().all(|c| c == '?' || c == '!')
        {
            text.push_str(&self.advance().lexeme.clone());
        }
        text
    }

    fn identifier(&mut self, message: &str) -> String {
        if self.peek().token_type == TokenType::Identifier {
            self.advance().lexeme.clone()
        } else {
            self.error_here(message, None);
            String::new()
        }
    }

    fn starts_expression(&self) -> bool {
        let token = self.peek();
        match token.token_type {
            TokenType::Identifier | TokenType::Literal => true,
            TokenType::Keyword => {
                matches!(token.lexeme.as_str(), "true" | "false" | "nil" | "try") || token.is_type_name()
            }
            TokenType::Punctuation => token.lexeme == "(" || token.lexeme == "[",
            TokenType::Operator => token.lexeme == "-" || token.lexeme == "!",
            TokenType::Eof => false,
        }
    }

    fn expected_expression(&mut self, token: &Token) -> Node {
        let help = match token.lexeme.as_str() {
            ")" => "Found ')' without matching '('. Check for unbalanced parentheses.",
            "}" => "Found '}' without matching '{'. Check for unbalanced braces.",
            "]" => "Found ']' without matching '['. Check for unbalanced brackets.",
            "" => "Reached end of input while expecting an expression.",
            _ => "Expected a literal value, variable, or parenthesized expression here.",
        };
        let found = if token.token_type == TokenType::Eof {
            "end of input".to_string()
        } else {
            format!("'{}'", token.lexeme)
        };
        self.errors.push(SyntaxError::with_help(
            token.span.clone(),
            format!("Expected expression, found {found}"),
            help.to_string(),
        ));
        Node::Literal(Literal::Nil)
    }

    fn binary(left: Node, op: &str, right: Node) -> Node {
        Node::BinaryOp {
            left: Box::new(left),
            op: op.to_string(),
            right: Box::new(right),
        }
    }

    fn match_operator(&mut self, lexeme: &str) -> bool {
        self.match_token(TokenType::Operator, lexeme)
    }

    fn match_operators(&mut self, lexemes: &[&str]) -> Option<String> {
        let token = self.peek();
        if token.token_type == TokenType::Operator && lexemes.contains(&token.lexeme.as_str()) {
            Some(self.advance().lexeme.clone())
        } else {
            None
        }
    }

    fn match_punctuation(&mut self, lexeme: &str) -> bool {
        self.match_token(TokenType::Punctuation, lexeme)
    }

    fn match_keyword(&mut self, lexeme: &str) -> bool {
        self.match_token(TokenType::Keyword, lexeme)
    }

    fn match_token(&mut self, token_type: TokenType, lexeme: &str) -> bool {
        if self.check(token_type, lexeme) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn check(&self, token_type: TokenType, lexeme: &str) -> bool {
        self.peek().is(token_type, lexeme)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn peek_next(&self) -> &Token {
        &self.tokens[(self.current + 1).min(self.tokens.len() - 1)]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    /// Consume the expected token, or record an error and leave the stream
    /// where it is.
    fn expect(&mut self, token_type: TokenType, lexeme: &str, message: &str) -> bool {
        if self.match_token(token_type, lexeme) {
            true
        } else {
            self.error_here(message, None);
            false
        }
    }

    fn expect_with_help(&mut self, token_type: TokenType, lexeme: &str, message: &str, help: &str) -> bool {
        if self.match_token(token_type, lexeme) {
            true
        } else {
            self.error_here(message, Some(help));
            false
        }
    }

    fn error_here(&mut self, message: &str, help: Option<&str>) {
        // At EOF, point just past the last real token
        let span = if self.is_at_end() && self.current > 0 {
            Span::single(self.previous().span.end)
        } else {
            self.peek().span.clone()
        };
        let error = match help {
            Some(help) => SyntaxError::with_help(span, message.to_string(), help.to_string()),
            None => SyntaxError::new(span, message.to_string()),
        };
        self.errors.push(error);
    }
}

/// Tokenize and parse `source` in one step.
pub fn parse_source(source: &str) -> (Node, Vec<SyntaxError>) {
    Parser::new(crate::lexer::tokenize(source)).parse()
}
