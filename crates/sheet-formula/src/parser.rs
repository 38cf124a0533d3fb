use crate::ast::Expr;
use crate::error::ParseError;
use crate::lexer::{Lexer, Token};
use crate::position::Position;

/// A precedence-climbing recursive-descent parser over a fixed token
/// stream. Grammar (loosest to tightest binding):
///
/// ```text
/// expr   := term (('+' | '-') term)*
/// term   := unary (('*' | '/') unary)*
/// unary  := '-' unary | primary
/// primary := NUMBER | REF | '(' expr ')'
/// ```
pub struct Parser {
    tokens: Vec<Token>,
    idx: usize,
}

impl Parser {
    pub fn parse(input: &str) -> Result<Expr, ParseError> {
        let tokens = Lexer::new(input).tokenize()?;
        if tokens.is_empty() {
            return Err(ParseError::UnexpectedEnd);
        }
        let mut parser = Parser { tokens, idx: 0 };
        let expr = parser.parse_expr()?;
        if parser.idx != parser.tokens.len() {
            return Err(ParseError::Unexpected {
                expected: "end of formula",
                found: format!("{:?}", parser.tokens[parser.idx]),
            });
        }
        Ok(expr)
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.idx)
    }

    fn bump(&mut self) -> Option<Token> {
        let t = self.tokens.get(self.idx).cloned();
        if t.is_some() {
            self.idx += 1;
        }
        t
    }

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.bump();
                    let rhs = self.parse_term()?;
                    lhs = Expr::Add(Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Minus) => {
                    self.bump();
                    let rhs = self.parse_term()?;
                    lhs = Expr::Sub(Box::new(lhs), Box::new(rhs));
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.bump();
                    let rhs = self.parse_unary()?;
                    lhs = Expr::Mul(Box::new(lhs), Box::new(rhs));
                }
                Some(Token::Slash) => {
                    self.bump();
                    let rhs = self.parse_unary()?;
                    lhs = Expr::Div(Box::new(lhs), Box::new(rhs));
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if let Some(Token::Minus) = self.peek() {
            self.bump();
            let inner = self.parse_unary()?;
            return Ok(Expr::Neg(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        match self.bump() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Ref(text)) => Ok(Expr::Ref(Position::parse(&text))),
            Some(Token::LParen) => {
                let inner = self.parse_expr()?;
                match self.bump() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(ParseError::Unexpected {
                        expected: "')'",
                        found: format!("{other:?}"),
                    }),
                    None => Err(ParseError::UnexpectedEnd),
                }
            }
            Some(other) => Err(ParseError::Unexpected {
                expected: "a number, cell reference, or '('",
                found: format!("{other:?}"),
            }),
            None => Err(ParseError::UnexpectedEnd),
        }
    }
}
