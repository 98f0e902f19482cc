//! Typed source tokens and the constant and function tables.

use std::fmt;
use tally_interface::Span;

/// A binary or sign operator token: `+ - * / ^`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpToken {
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Star,
    /// `/`
    Slash,
    /// `^`
    Caret,
}

impl fmt::Display for OpToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl OpToken {
    /// Returns the string representation of the operator token.
    pub const fn to_str(self) -> &'static str {
        match self {
            Self::Plus => "+",
            Self::Minus => "-",
            Self::Star => "*",
            Self::Slash => "/",
            Self::Caret => "^",
        }
    }

    /// Returns `true` if this operator can act as a sign prefix.
    pub const fn is_sign(self) -> bool {
        matches!(self, Self::Plus | Self::Minus)
    }
}

/// A named mathematical constant.
///
/// The identifier table is closed: unknown identifiers never make it past the
/// lexer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConstKind {
    /// `PI`: Archimedes' constant.
    Pi,
    /// `TAU`: the full turn, 2π.
    Tau,
    /// `PHI`: the golden ratio.
    Phi,
    /// `EN`: Euler's number e.
    EulersNumber,
    /// `EC`: Euler's constant γ.
    EulersConstant,
    /// `OC`: the omega constant, W(1).
    OmegaConstant,
    /// `GC`: Gauss's constant.
    GaussConstant,
}

impl fmt::Display for ConstKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl ConstKind {
    /// All recognized constants, in table order.
    pub const ALL: [Self; 7] = [
        Self::Pi,
        Self::Tau,
        Self::Phi,
        Self::EulersNumber,
        Self::EulersConstant,
        Self::OmegaConstant,
        Self::GaussConstant,
    ];

    /// Resolves an identifier against the constants table. Case-sensitive.
    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "PI" => Self::Pi,
            "TAU" => Self::Tau,
            "PHI" => Self::Phi,
            "EN" => Self::EulersNumber,
            "EC" => Self::EulersConstant,
            "OC" => Self::OmegaConstant,
            "GC" => Self::GaussConstant,
            _ => return None,
        })
    }

    /// Returns the identifier of the constant.
    pub const fn to_str(self) -> &'static str {
        match self {
            Self::Pi => "PI",
            Self::Tau => "TAU",
            Self::Phi => "PHI",
            Self::EulersNumber => "EN",
            Self::EulersConstant => "EC",
            Self::OmegaConstant => "OC",
            Self::GaussConstant => "GC",
        }
    }

    /// Returns the pre-computed value of the constant.
    pub const fn value(self) -> f64 {
        match self {
            Self::Pi => std::f64::consts::PI,
            Self::Tau => std::f64::consts::TAU,
            Self::Phi => 1.618033988749894848204586834365638118_f64,
            Self::EulersNumber => std::f64::consts::E,
            Self::EulersConstant => 0.577215664901532860606512090082402431_f64,
            Self::OmegaConstant => 0.567143290409783872999968662210355550_f64,
            Self::GaussConstant => 0.834626841674073186281429732799046808_f64,
        }
    }
}

/// A recognized scalar function.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FuncKind {
    Sqrt,
    Exp,

    Sin,
    Asin,
    Sinh,

    Cos,
    Acos,
    Cosh,

    Tan,
    Atan,
    Tanh,

    Ln,
    Log10,
}

impl fmt::Display for FuncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_str())
    }
}

impl FuncKind {
    /// All recognized functions, in table order.
    pub const ALL: [Self; 13] = [
        Self::Sqrt,
        Self::Exp,
        Self::Sin,
        Self::Asin,
        Self::Sinh,
        Self::Cos,
        Self::Acos,
        Self::Cosh,
        Self::Tan,
        Self::Atan,
        Self::Tanh,
        Self::Ln,
        Self::Log10,
    ];

    /// Resolves an identifier against the functions table. Case-sensitive.
    pub fn from_str(s: &str) -> Option<Self> {
        Some(match s {
            "sqrt" => Self::Sqrt,
            "exp" => Self::Exp,
            "sin" => Self::Sin,
            "asin" => Self::Asin,
            "sinh" => Self::Sinh,
            "cos" => Self::Cos,
            "acos" => Self::Acos,
            "cosh" => Self::Cosh,
            "tan" => Self::Tan,
            "atan" => Self::Atan,
            "tanh" => Self::Tanh,
            "ln" => Self::Ln,
            "log10" => Self::Log10,
            _ => return None,
        })
    }

    /// Returns the identifier of the function.
    pub const fn to_str(self) -> &'static str {
        match self {
            Self::Sqrt => "sqrt",
            Self::Exp => "exp",
            Self::Sin => "sin",
            Self::Asin => "asin",
            Self::Sinh => "sinh",
            Self::Cos => "cos",
            Self::Acos => "acos",
            Self::Cosh => "cosh",
            Self::Tan => "tan",
            Self::Atan => "atan",
            Self::Tanh => "tanh",
            Self::Ln => "ln",
            Self::Log10 => "log10",
        }
    }

    /// Returns the number of arguments the function takes.
    ///
    /// Every function in the current table is unary; the argument list
    /// grammar is variadic for forward compatibility.
    pub const fn arity(self) -> usize {
        1
    }

    /// Applies the function to a value.
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Sqrt => x.sqrt(),
            Self::Exp => x.exp(),
            Self::Sin => x.sin(),
            Self::Asin => x.asin(),
            Self::Sinh => x.sinh(),
            Self::Cos => x.cos(),
            Self::Acos => x.acos(),
            Self::Cosh => x.cosh(),
            Self::Tan => x.tan(),
            Self::Atan => x.atan(),
            Self::Tanh => x.tanh(),
            Self::Ln => x.ln(),
            Self::Log10 => x.log10(),
        }
    }
}

/// A kind of token.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TokenKind {
    /// A numeric literal, already converted to an IEEE-754 double.
    Number(f64),
    /// A named constant.
    Const(ConstKind),
    /// An operator.
    Op(OpToken),
    /// `(`
    OpenParen,
    /// `)`
    CloseParen,
    /// A function identifier.
    Func(FuncKind),
    /// `,`; reserved for multi-argument functions.
    Comma,
    /// `=`; reserved for definitions.
    Eq,
    /// End of input marker.
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => value.fmt(f),
            Self::Const(kind) => kind.fmt(f),
            Self::Op(op) => op.fmt(f),
            Self::OpenParen => f.write_str("("),
            Self::CloseParen => f.write_str(")"),
            Self::Func(kind) => kind.fmt(f),
            Self::Comma => f.write_str(","),
            Self::Eq => f.write_str("="),
            Self::Eof => f.write_str("<eof>"),
        }
    }
}

impl TokenKind {
    /// Returns a description of this kind of token for diagnostics, e.g.
    /// "number `1.5`".
    pub fn full_description(&self) -> String {
        match self {
            Self::Number(value) => format!("number `{value}`"),
            Self::Const(kind) => format!("constant `{kind}`"),
            Self::Op(op) => format!("`{op}`"),
            Self::OpenParen => "`(`".to_string(),
            Self::CloseParen => "`)`".to_string(),
            Self::Func(kind) => format!("function `{kind}`"),
            Self::Comma => "`,`".to_string(),
            Self::Eq => "`=`".to_string(),
            Self::Eof => "end of input".to_string(),
        }
    }

    /// Returns `true` if this token terminates a sub-expression: a number, a
    /// constant, or a closing parenthesis.
    pub const fn is_operand_end(&self) -> bool {
        matches!(self, Self::Number(_) | Self::Const(_) | Self::CloseParen)
    }

    /// Returns `true` if this token can begin a sub-expression: a number, a
    /// constant, a function, or an opening parenthesis.
    pub const fn is_operand_start(&self) -> bool {
        matches!(self, Self::Number(_) | Self::Const(_) | Self::Func(_) | Self::OpenParen)
    }
}

/// A single typed token.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Token {
    /// The kind of the token.
    pub kind: TokenKind,
    /// The region of the source that this token covers.
    pub span: Span,
}

impl Token {
    /// A dummy token, used as a placeholder before parsing starts.
    pub const DUMMY: Self = Self::new(TokenKind::Eof, Span::DUMMY);

    /// Creates a new token.
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns `true` if this token is the end-of-input marker.
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// Returns the operator of this token, if it is one.
    #[inline]
    pub fn as_op(&self) -> Option<OpToken> {
        match self.kind {
            TokenKind::Op(op) => Some(op),
            _ => None,
        }
    }

    /// See [`TokenKind::full_description`].
    pub fn full_description(&self) -> String {
        self.kind.full_description()
    }
}
