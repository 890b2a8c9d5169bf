//! Branch condition evaluation
//!
//! Conditions are small expressions such as `affection.Alice >= 3 && !seenPark`.
//! Every top-level key of the [`VariableStore`] is in scope as a bare
//! identifier. The grammar covers literals, dotted and bracketed member
//! access, arithmetic, comparisons and the boolean connectives; nothing in
//! it can call out of the evaluator.
//!
//! Values follow script semantics: `&&`/`||` yield one of their operands,
//! `==` coerces, `===` does not, and the result of a condition is the
//! truthiness of the final value. Any error makes [`evaluate`] return
//! `false`.

mod lexer;
mod operand;


pub use operand::Operand;

use crate::runtime::debug::{DebugCategory, DebugSink};
use crate::store::VariableStore;
use lexer::{Spanned, Token};
use serde_json::{Map, Value, json};

/// Maximum nesting of unary operators and parentheses
pub const MAX_DEPTH: usize = 64;

/// Maximum number of operators and member accesses in one condition
pub const MAX_OPERATORS: usize = 256;

/// Condition errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConditionError {
    #[error("Condition is empty")]
    Empty,

    #[error("Unexpected character '{found}' at offset {offset}")]
    UnexpectedCharacter { found: char, offset: usize },

    #[error("Unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },

    #[error("Invalid number '{literal}' at offset {offset}")]
    InvalidNumber { literal: String, offset: usize },

    #[error("Unexpected {found} at offset {offset}")]
    UnexpectedToken { found: String, offset: usize },

    #[error("Unexpected end of condition")]
    UnexpectedEnd,

    #[error("Condition nests deeper than {limit} levels")]
    TooDeep { limit: usize },

    #[error("Condition has more than {limit} operators")]
    TooLong { limit: usize },

    #[error("'{name}' is not defined")]
    UnknownIdentifier { name: String },

    #[error("Cannot read property '{property}' of {target}")]
    PropertyOfNothing { property: String, target: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Negate,
    Plus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    StrictEq,
    Ne,
    StrictNe,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

/// Parsed condition
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Operand),
    Identifier(String),
    Member {
        object: Box<Expr>,
        property: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
}

impl Expr {
    pub fn parse(source: &str) -> Result<Self, ConditionError> {
        let tokens = lexer::tokenize(source)?;
        if tokens.is_empty() {
            return Err(ConditionError::Empty);
        }

        let mut parser = Parser {
            tokens,
            pos: 0,
            operators: 0,
        };
        let expr = parser.or(0)?;
        match parser.tokens.get(parser.pos) {
            Some(extra) => Err(unexpected(extra)),
            None => Ok(expr),
        }
    }

    /// Evaluate against a set of bindings
    pub fn eval(&self, bindings: &Map<String, Value>) -> Result<Operand, ConditionError> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Identifier(name) => bindings
                .get(name)
                .map(Operand::from)
                .ok_or_else(|| ConditionError::UnknownIdentifier { name: name.clone() }),
            Expr::Member { object, property } => {
                let object = object.eval(bindings)?;
                let key = property.eval(bindings)?.to_display_string();
                object.member(&key)
            }
            Expr::Unary { op, operand } => {
                let value = operand.eval(bindings)?;
                Ok(match op {
                    UnaryOp::Not => Operand::Bool(!value.is_truthy()),
                    UnaryOp::Negate => Operand::Number(-value.to_number()),
                    UnaryOp::Plus => Operand::Number(value.to_number()),
                })
            }
            Expr::Binary { op, left, right } => {
                let left = left.eval(bindings)?;
                match op {
                    BinaryOp::And if !left.is_truthy() => Ok(left),
                    BinaryOp::Or if left.is_truthy() => Ok(left),
                    BinaryOp::And | BinaryOp::Or => right.eval(bindings),
                    _ => Ok(apply(*op, &left, &right.eval(bindings)?)),
                }
            }
        }
    }
}

fn apply(op: BinaryOp, left: &Operand, right: &Operand) -> Operand {
    match op {
        BinaryOp::Eq => Operand::Bool(left.loose_eq(right)),
        BinaryOp::Ne => Operand::Bool(!left.loose_eq(right)),
        BinaryOp::StrictEq => Operand::Bool(left.strict_eq(right)),
        BinaryOp::StrictNe => Operand::Bool(!left.strict_eq(right)),
        BinaryOp::Lt => Operand::Bool(left.compare(right).is_some_and(|o| o.is_lt())),
        BinaryOp::Le => Operand::Bool(left.compare(right).is_some_and(|o| o.is_le())),
        BinaryOp::Gt => Operand::Bool(left.compare(right).is_some_and(|o| o.is_gt())),
        BinaryOp::Ge => Operand::Bool(left.compare(right).is_some_and(|o| o.is_ge())),
        BinaryOp::Add => left.add(right),
        BinaryOp::Sub => Operand::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Operand::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Operand::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Operand::Number(left.to_number() % right.to_number()),
        // Short-circuit operators are handled by `Expr::eval`
        BinaryOp::And | BinaryOp::Or => Operand::Undefined,
    }
}

/// Parse and evaluate a condition, returning its truthiness
pub fn try_evaluate(condition: &str, bindings: &Map<String, Value>) -> Result<bool, ConditionError> {
    Ok(Expr::parse(condition)?.eval(bindings)?.is_truthy())
}

/// Evaluate a branch condition, failing closed.
///
/// Errors are logged and reported to `sink`; the branch is then treated as
/// not taken.
pub fn evaluate(condition: &str, store: &VariableStore, sink: &dyn DebugSink) -> bool {
    match try_evaluate(condition, store.bindings()) {
        Ok(result) => result,
        Err(err) => {
            log::error!("Error evaluating condition '{condition}': {err}");
            sink.record(
                DebugCategory::Conditions,
                "Condition evaluation failed",
                &json!({ "condition": condition, "error": err.to_string() }),
            );
            false
        }
    }
}

fn unexpected(spanned: &Spanned) -> ConditionError {
    ConditionError::UnexpectedToken {
        found: format!("{:?}", spanned.token),
        offset: spanned.offset,
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    operators: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn next(&mut self) -> Result<&Spanned, ConditionError> {
        let spanned = self
            .tokens
            .get(self.pos)
            .ok_or(ConditionError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(spanned)
    }

    fn expect(&mut self, expected: Token) -> Result<(), ConditionError> {
        let spanned = self.next()?;
        if spanned.token == expected {
            Ok(())
        } else {
            Err(unexpected(spanned))
        }
    }

    /// Every operator deepens the tree, so the total bounds evaluation depth
    fn count_operator(&mut self) -> Result<(), ConditionError> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err(ConditionError::TooLong {
                limit: MAX_OPERATORS,
            });
        }
        Ok(())
    }

    /// Parse one left-associative precedence level
    fn level(
        &mut self,
        depth: usize,
        operator: fn(&Token) -> Option<BinaryOp>,
        operand: fn(&mut Self, usize) -> Result<Expr, ConditionError>,
    ) -> Result<Expr, ConditionError> {
        let mut left = operand(self, depth)?;
        while let Some(op) = self.peek().and_then(operator) {
            self.count_operator()?;
            self.pos += 1;
            let right = operand(self, depth)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn or(&mut self, depth: usize) -> Result<Expr, ConditionError> {
        self.level(
            depth,
            |t| matches!(t, Token::Or).then_some(BinaryOp::Or),
            Self::and,
        )
    }

    fn and(&mut self, depth: usize) -> Result<Expr, ConditionError> {
        self.level(
            depth,
            |t| matches!(t, Token::And).then_some(BinaryOp::And),
            Self::equality,
        )
    }

    fn equality(&mut self, depth: usize) -> Result<Expr, ConditionError> {
        self.level(
            depth,
            |t| match t {
                Token::Eq => Some(BinaryOp::Eq),
                Token::StrictEq => Some(BinaryOp::StrictEq),
                Token::Ne => Some(BinaryOp::Ne),
                Token::StrictNe => Some(BinaryOp::StrictNe),
                _ => None,
            },
            Self::relational,
        )
    }

    fn relational(&mut self, depth: usize) -> Result<Expr, ConditionError> {
        self.level(
            depth,
            |t| match t {
                Token::Lt => Some(BinaryOp::Lt),
                Token::Le => Some(BinaryOp::Le),
                Token::Gt => Some(BinaryOp::Gt),
                Token::Ge => Some(BinaryOp::Ge),
                _ => None,
            },
            Self::additive,
        )
    }

    fn additive(&mut self, depth: usize) -> Result<Expr, ConditionError> {
        self.level(
            depth,
            |t| match t {
                Token::Plus => Some(BinaryOp::Add),
                Token::Minus => Some(BinaryOp::Sub),
                _ => None,
            },
            Self::multiplicative,
        )
    }

    fn multiplicative(&mut self, depth: usize) -> Result<Expr, ConditionError> {
        self.level(
            depth,
            |t| match t {
                Token::Star => Some(BinaryOp::Mul),
                Token::Slash => Some(BinaryOp::Div),
                Token::Percent => Some(BinaryOp::Rem),
                _ => None,
            },
            Self::unary,
        )
    }

    fn unary(&mut self, depth: usize) -> Result<Expr, ConditionError> {
        if depth >= MAX_DEPTH {
            return Err(ConditionError::TooDeep { limit: MAX_DEPTH });
        }

        let op = match self.peek() {
            Some(Token::Not) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Negate,
            Some(Token::Plus) => UnaryOp::Plus,
            _ => return self.postfix(depth),
        };
        self.count_operator()?;
        self.pos += 1;

        let operand = self.unary(depth + 1)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn postfix(&mut self, depth: usize) -> Result<Expr, ConditionError> {
        let mut expr = self.primary(depth)?;

        loop {
            let property = match self.peek() {
                Some(Token::Dot) => {
                    self.pos += 1;
                    let spanned = self.next()?;
                    let name = match &spanned.token {
                        Token::Ident(name) => name.to_string(),
                        Token::True => "true".to_string(),
                        Token::False => "false".to_string(),
                        Token::Null => "null".to_string(),
                        Token::Undefined => "undefined".to_string(),
                        _ => return Err(unexpected(spanned)),
                    };
                    Expr::Literal(Operand::Str(name))
                }
                Some(Token::LBracket) => {
                    self.pos += 1;
                    let index = self.or(depth + 1)?;
                    self.expect(Token::RBracket)?;
                    index
                }
                _ => return Ok(expr),
            };

            self.count_operator()?;
            expr = Expr::Member {
                object: Box::new(expr),
                property: Box::new(property),
            };
        }
    }

    fn primary(&mut self, depth: usize) -> Result<Expr, ConditionError> {
        let spanned = self.next()?.clone();
        let expr = match spanned.token {
            Token::Number(n) => Expr::Literal(Operand::Number(n)),
            Token::Str(s) => Expr::Literal(Operand::Str(s)),
            Token::True => Expr::Literal(Operand::Bool(true)),
            Token::False => Expr::Literal(Operand::Bool(false)),
            Token::Null => Expr::Literal(Operand::Null),
            Token::Undefined => Expr::Literal(Operand::Undefined),
            Token::Ident(name) => Expr::Identifier(name),
            Token::LParen => {
                let inner = self.or(depth + 1)?;
                self.expect(Token::RParen)?;
                inner
            }
            _ => return Err(unexpected(&spanned)),
        };
        Ok(expr)
    }
}
