//! Formula lexing and parsing.
//!
//! A formula body (the text after `=`) is parsed once into an [`Expr`] tree.
//! Cell references and ranges become explicit leaves, so the resolver never
//! has to rediscover them with pattern matching over text.
//!
//! Grammar:
//!
//! ```text
//! expr     --> additive
//! additive --> term (("+" | "-") term)*
//! term     --> unary (("*" | "/") unary)*
//! unary    --> ("-" | "+") unary | power
//! power    --> primary ("^" unary)?
//! primary  --> NUMBER | "(" expr ")" | "[" (expr ("," expr)*)? "]"
//!            | IDENT "(" (expr ("," expr)*)? ")"
//!            | ADDRESS (":" ADDRESS)?
//!            | IDENT
//! ```

use std::iter::Peekable;
use std::str::CharIndices;

use super::cell_ref::{CellRange, CellRef};
use super::error::{EngineError, Result};

/// Deepest allowed nesting of brackets, calls and unary or power operands.
pub const MAX_NESTING_DEPTH: usize = 64;

/// Tallest allowed expression tree. Operator chains count one level per link.
pub const MAX_TREE_DEPTH: usize = 1024;

#[derive(Clone, Debug, PartialEq)]
pub enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Eof,
}

struct Lexer<'a> {
    src: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Lexer {
            src,
            chars: src.char_indices().peekable(),
        }
    }

    /// Next token and the byte offset it starts at.
    fn next_token(&mut self) -> Result<(Token, usize)> {
        while self.chars.next_if(|(_, c)| c.is_whitespace()).is_some() {}

        let Some((start, ch)) = self.chars.next() else {
            return Ok((Token::Eof, self.src.len()));
        };

        let token = match ch {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '^' => Token::Caret,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            ',' => Token::Comma,
            ':' => Token::Colon,
            c if c.is_ascii_digit() || c == '.' => self.read_number(start)?,
            c if c.is_ascii_alphabetic() || c == '_' => self.read_ident(start),
            other => {
                return Err(EngineError::Parse {
                    offset: start,
                    message: format!("unexpected character {:?}", other),
                });
            }
        };
        Ok((token, start))
    }

    fn read_number(&mut self, start: usize) -> Result<Token> {
        let mut end = start + 1;
        let mut seen_exp = false;
        while let Some(&(idx, c)) = self.chars.peek() {
            let take = if c.is_ascii_digit() || c == '.' {
                true
            } else if (c == 'e' || c == 'E') && !seen_exp {
                seen_exp = true;
                // Allow a sign directly after the exponent marker.
                self.chars.next();
                end = idx + 1;
                if let Some(&(sign_idx, '+' | '-')) = self.chars.peek() {
                    self.chars.next();
                    end = sign_idx + 1;
                }
                continue;
            } else {
                false
            };
            if !take {
                break;
            }
            self.chars.next();
            end = idx + c.len_utf8();
        }

        let text = &self.src[start..end];
        text.parse::<f64>()
            .map(Token::Number)
            .map_err(|_| EngineError::Parse {
                offset: start,
                message: format!("malformed number {:?}", text),
            })
    }

    fn read_ident(&mut self, start: usize) -> Token {
        let mut end = start + 1;
        while let Some((idx, c)) = self
            .chars
            .next_if(|(_, c)| c.is_ascii_alphanumeric() || *c == '_')
        {
            end = idx + c.len_utf8();
        }
        Token::Ident(self.src[start..end].to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        }
    }
}

/// A parsed formula.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    Number(f64),
    Array(Vec<Expr>),
    Cell(CellRef),
    Range(CellRange),
    /// An identifier that is neither an address nor a function call.
    Name(String),
    /// Explicit parentheses, kept so resolved text mirrors the source.
    Group(Box<Expr>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    /// Every range in the tree, left to right.
    pub fn ranges(&self) -> Vec<&CellRange> {
        let mut out = Vec::new();
        self.walk(&mut |e| {
            if let Expr::Range(range) = e {
                out.push(range);
            }
        });
        out
    }

    /// Every single-cell reference in the tree, left to right. Range
    /// endpoints are not included.
    pub fn cell_refs(&self) -> Vec<&CellRef> {
        let mut out = Vec::new();
        self.walk(&mut |e| {
            if let Expr::Cell(cell) = e {
                out.push(cell);
            }
        });
        out
    }

    fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        match self {
            Expr::Array(items) | Expr::Call { args: items, .. } => {
                for item in items {
                    item.walk(f);
                }
            }
            Expr::Group(inner) | Expr::Unary { operand: inner, .. } => inner.walk(f),
            Expr::Binary { left, right, .. } => {
                left.walk(f);
                right.walk(f);
            }
            Expr::Number(_) | Expr::Cell(_) | Expr::Range(_) | Expr::Name(_) => {}
        }
    }
}

/// Parse a formula body (without the leading `=`).
pub fn parse_formula(src: &str) -> Result<Expr> {
    let mut parser = Parser::new(src)?;
    if parser.current == Token::Eof {
        return Err(EngineError::Parse {
            offset: 0,
            message: "empty formula".to_string(),
        });
    }
    let expr = parser.parse_additive()?;
    if parser.current != Token::Eof {
        return Err(parser.unexpected());
    }
    Ok(expr)
}

struct Parser<'a> {
    lexer: Lexer<'a>,
    current: Token,
    offset: usize,
    nesting: usize,
    height: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Result<Self> {
        let mut lexer = Lexer::new(src);
        let (current, offset) = lexer.next_token()?;
        Ok(Parser {
            lexer,
            current,
            offset,
            nesting: 0,
            height: 0,
        })
    }

    /// Enter a nested operand. Pair with [`Parser::ascend`].
    fn descend(&mut self) -> Result<()> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING_DEPTH {
            return Err(EngineError::Parse {
                offset: self.offset,
                message: format!("nested deeper than {} levels", MAX_NESTING_DEPTH),
            });
        }
        self.grow()
    }

    fn ascend(&mut self) {
        self.nesting -= 1;
        self.height -= 1;
    }

    fn grow(&mut self) -> Result<()> {
        self.height += 1;
        if self.height > MAX_TREE_DEPTH {
            return Err(EngineError::Parse {
                offset: self.offset,
                message: format!("expression deeper than {} levels", MAX_TREE_DEPTH),
            });
        }
        Ok(())
    }

    /// Move to the next token, returning the one just consumed.
    fn advance(&mut self) -> Result<Token> {
        let (next, offset) = self.lexer.next_token()?;
        self.offset = offset;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        if self.current == expected {
            self.advance()?;
            Ok(())
        } else {
            Err(EngineError::Parse {
                offset: self.offset,
                message: format!("expected {:?}, found {:?}", expected, self.current),
            })
        }
    }

    fn unexpected(&self) -> EngineError {
        EngineError::Parse {
            offset: self.offset,
            message: format!("unexpected {:?}", self.current),
        }
    }

    fn parse_additive(&mut self) -> Result<Expr> {
        let mut left = self.parse_term()?;
        let mut links = 0;
        loop {
            let op = match self.current {
                Token::Plus => BinaryOp::Add,
                Token::Minus => BinaryOp::Sub,
                _ => {
                    self.height -= links;
                    return Ok(left);
                }
            };
            self.advance()?;
            links += 1;
            self.grow()?;
            let right = self.parse_term()?;
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
    }

    fn parse_term(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        let mut links = 0;
        loop {
            let op = match self.current {
                Token::Star => BinaryOp::Mul,
                Token::Slash => BinaryOp::Div,
                _ => {
                    self.height -= links;
                    return Ok(left);
                }
            };
            self.advance()?;
            links += 1;
            self.grow()?;
            let right = self.parse_unary()?;
            left = Expr::Binary {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.current {
            Token::Minus => UnaryOp::Minus,
            Token::Plus => UnaryOp::Plus,
            _ => return self.parse_power(),
        };
        self.advance()?;
        self.descend()?;
        let operand = self.parse_unary()?;
        self.ascend();
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_power(&mut self) -> Result<Expr> {
        let base = self.parse_primary()?;
        if self.current != Token::Caret {
            return Ok(base);
        }
        self.advance()?;
        self.descend()?;
        let exponent = self.parse_unary()?;
        self.ascend();
        Ok(Expr::Binary {
            left: Box::new(base),
            op: BinaryOp::Pow,
            right: Box::new(exponent),
        })
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        match self.current.clone() {
            Token::Number(n) => {
                self.advance()?;
                Ok(Expr::Number(n))
            }
            Token::LParen => {
                self.advance()?;
                self.descend()?;
                let inner = self.parse_additive()?;
                self.ascend();
                self.expect(Token::RParen)?;
                Ok(Expr::Group(Box::new(inner)))
            }
            Token::LBracket => {
                self.advance()?;
                self.descend()?;
                let items = self.parse_list(Token::RBracket)?;
                self.ascend();
                Ok(Expr::Array(items))
            }
            Token::Ident(name) => {
                self.advance()?;
                self.parse_ident(name)
            }
            _ => Err(self.unexpected()),
        }
    }

    fn parse_ident(&mut self, name: String) -> Result<Expr> {
        if self.current == Token::LParen {
            self.advance()?;
            self.descend()?;
            let args = self.parse_list(Token::RParen)?;
            self.ascend();
            return Ok(Expr::Call { name, args });
        }

        let Some(start) = CellRef::from_str(&name) else {
            return Ok(Expr::Name(name));
        };

        if self.current != Token::Colon {
            return Ok(Expr::Cell(start));
        }
        self.advance()?;
        let end_offset = self.offset;
        match self.advance()? {
            Token::Ident(end) => match CellRef::from_str(&end) {
                Some(end) => Ok(Expr::Range(CellRange::new(start, end))),
                None => Err(EngineError::Parse {
                    offset: end_offset,
                    message: format!("invalid range end {:?}", end),
                }),
            },
            other => Err(EngineError::Parse {
                offset: end_offset,
                message: format!("expected range end, found {:?}", other),
            }),
        }
    }

    /// Comma-separated expressions up to (and consuming) `close`.
    fn parse_list(&mut self, close: Token) -> Result<Vec<Expr>> {
        let mut items = Vec::new();
        if self.current == close {
            self.advance()?;
            return Ok(items);
        }
        loop {
            items.push(self.parse_additive()?);
            if self.current == Token::Comma {
                self.advance()?;
                continue;
            }
            self.expect(close)?;
            return Ok(items);
        }
    }
}
