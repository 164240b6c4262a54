/// Syntax tree for a whole program. Nodes carry no behaviour and no source
/// positions; the parser's caller owns the root `Block`.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Block(Vec<Node>),
    VariableDecl {
        name: String,
        mutable: bool,
        value: Option<Box<Node>>,
    },
    Assignment {
        target: Box<Node>,
        op: AssignOp,
        value: Box<Node>,
    },
    Print {
        args: Vec<Node>,
        separator: Option<Box<Node>>,
        terminator: Option<Box<Node>>,
    },
    If {
        condition: Box<Node>,
        /// `if let name = condition`
        binding: Option<String>,
        then_block: Box<Node>,
        else_block: Option<Box<Node>>,
    },
    Switch {
        subject: Box<Node>,
        cases: Vec<SwitchCase>,
        default: Option<Box<Node>>,
    },
    While {
        condition: Box<Node>,
        body: Box<Node>,
    },
    ForIn {
        variable: String,
        sequence: Box<Node>,
        body: Box<Node>,
    },
    FuncDecl(FuncDecl),
    Return(Option<Box<Node>>),
    Break,
    Continue,
    Call {
        callee: String,
        args: Vec<Node>,
    },
    /// Method call when `args` is `Some`, property access when it is `None`.
    MethodCall {
        receiver: Box<Node>,
        method: String,
        args: Option<Vec<Node>>,
    },
    Subscript {
        receiver: Box<Node>,
        index: Box<Node>,
        /// `d[key, default: value]`
        default: Option<Box<Node>>,
    },
    Array(Vec<Node>),
    Dictionary(Vec<(Node, Node)>),
    Tuple(Vec<(Option<String>, Node)>),
    ForceUnwrap(Box<Node>),
    /// `as!` when `forced`, `as?` otherwise.
    Cast {
        value: Box<Node>,
        target: String,
        forced: bool,
    },
    TryForce(Box<Node>),
    BinaryOp {
        left: Box<Node>,
        op: String,
        right: Box<Node>,
    },
    Unary {
        op: String,
        operand: Box<Node>,
    },
    Literal(Literal),
    Variable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub patterns: Vec<Node>,
    pub body: Node,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FuncDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Box<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Set,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl AssignOp {
    pub fn from_lexeme(lexeme: &str) -> Option<Self> {
        let op = match lexeme {
            "=" => Self::Set,
            "+=" => Self::Add,
            "-=" => Self::Subtract,
            "*=" => Self::Multiply,
            "/=" => Self::Divide,
            _ => return None,
        };
        Some(op)
    }

    /// The binary operator a compound assignment applies, if any.
    pub fn binary_symbol(self) -> Option<&'static str> {
        match self {
            Self::Set => None,
            Self::Add => Some("+"),
            Self::Subtract => Some("-"),
            Self::Multiply => Some("*"),
            Self::Divide => Some("/"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Int(i64),
    Double(f64),
    Str(String),
    Nil,
}
