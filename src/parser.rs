use crate::engine::{Expr, Primitive};
use std::iter::Peekable;
use std::str::Chars;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("unexpected {0}")]
    Unexpected(String),
    #[error("empty list")]
    EmptyList,
    #[error("lambda expects a single body")]
    LambdaBody,
    #[error("bad variable index {0}")]
    BadIndex(String),
    #[error("unknown symbol {0}")]
    UnknownSymbol(String),
    #[error("trailing input after program")]
    TrailingInput,
}

#[derive(Debug, PartialEq)]
pub enum Token {
    LParen,
    RParen,
    Hash,
    Symbol(String),
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self { chars: input.chars().peekable() }
    }

    fn next_token(&mut self) -> Option<Token> {
        while let Some(&c) = self.chars.peek() {
            if c.is_whitespace() {
                self.chars.next();
                continue;
            }
            match c {
                '(' => { self.chars.next(); return Some(Token::LParen); }
                ')' => { self.chars.next(); return Some(Token::RParen); }
                '#' => { self.chars.next(); return Some(Token::Hash); }
                ';' => {
                    while let Some(&x) = self.chars.peek() {
                        if x == '\n' { break; }
                        self.chars.next();
                    }
                    continue;
                }
                _ => {
                    let mut s = String::new();
                    while let Some(&x) = self.chars.peek() {
                        if x.is_whitespace() || x == '(' || x == ')' || x == ';' { break; }
                        s.push(x);
                        self.chars.next();
                    }
                    return Some(Token::Symbol(s));
                }
            }
        }
        None
    }
}

pub struct Parser<'a> {
    undo: Option<Token>,
    lexer: Lexer<'a>,
}

impl<'a> Parser<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { undo: None, lexer: Lexer::new(input) }
    }

    fn peek(&mut self) -> Option<&Token> {
        if self.undo.is_none() {
            self.undo = self.lexer.next_token();
        }
        self.undo.as_ref()
    }

    fn consume(&mut self) -> Option<Token> {
        if let Some(t) = self.undo.take() { Some(t) } else { self.lexer.next_token() }
    }

    pub fn has_more(&mut self) -> bool {
        self.peek().is_some()
    }

    /// Parse one program term.
    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        let mut stack: Vec<Context> = Vec::new();
        let mut pending_hashes = 0usize;

        loop {
            let token = self.consume().ok_or(ParseError::UnexpectedEof)?;
            match token {
                Token::Hash => pending_hashes += 1,
                Token::LParen => {
                    stack.push(Context::new(pending_hashes));
                    pending_hashes = 0;
                }
                Token::RParen => {
                    let ctx = stack.pop().ok_or_else(|| ParseError::Unexpected(")".into()))?;
                    let wraps = ctx.wraps;
                    let term = invent(ctx.finish()?, wraps);
                    if let Some(done) = push_or_return(term, &mut stack)? {
                        return Ok(done);
                    }
                }
                Token::Symbol(s) => {
                    if s == "lambda" && pending_hashes == 0 {
                        if let Some(ctx) = stack.last_mut() {
                            if matches!(ctx.stage, ListStage::Start) {
                                ctx.stage = ListStage::LambdaBody;
                                continue;
                            }
                        }
                        return Err(ParseError::Unexpected("lambda".into()));
                    }
                    let term = invent(symbol_to_term(&s)?, pending_hashes);
                    pending_hashes = 0;
                    if let Some(done) = push_or_return(term, &mut stack)? {
                        return Ok(done);
                    }
                }
            }
        }
    }
}

/// Parse a complete program description, rejecting trailing input.
pub fn parse_program(text: &str) -> Result<Expr, ParseError> {
    let mut p = Parser::new(text);
    let expr = p.parse_expr()?;
    if p.has_more() {
        return Err(ParseError::TrailingInput);
    }
    Ok(expr)
}

#[derive(Clone, Copy, Debug)]
enum ListStage {
    Start,
    LambdaBody,
    Normal,
}

struct Context {
    elems: Vec<Expr>,
    stage: ListStage,
    wraps: usize,
}

impl Context {
    fn new(wraps: usize) -> Self {
        Self { elems: Vec::new(), stage: ListStage::Start, wraps }
    }

    fn push_elem(&mut self, term: Expr) -> Result<(), ParseError> {
        match self.stage {
            ListStage::Start => {
                self.stage = ListStage::Normal;
                self.elems.push(term);
                Ok(())
            }
            ListStage::LambdaBody => {
                if !self.elems.is_empty() {
                    return Err(ParseError::LambdaBody);
                }
                self.elems.push(term);
                Ok(())
            }
            ListStage::Normal => {
                self.elems.push(term);
                Ok(())
            }
        }
    }

    fn finish(mut self) -> Result<Expr, ParseError> {
        match self.stage {
            ListStage::Start => Err(ParseError::EmptyList),
            ListStage::LambdaBody => {
                if self.elems.len() != 1 {
                    return Err(ParseError::LambdaBody);
                }
                Ok(Expr::lambda(self.elems.remove(0)))
            }
            ListStage::Normal => {
                let mut iter = self.elems.into_iter();
                let head = iter.next().ok_or(ParseError::EmptyList)?;
                Ok(Expr::apply(head, iter))
            }
        }
    }
}

fn invent(term: Expr, wraps: usize) -> Expr {
    (0..wraps).fold(term, |acc, _| Expr::invented(acc))
}

fn push_or_return(term: Expr, stack: &mut Vec<Context>) -> Result<Option<Expr>, ParseError> {
    if let Some(parent) = stack.last_mut() {
        parent.push_elem(term)?;
        Ok(None)
    } else {
        Ok(Some(term))
    }
}

fn symbol_to_term(s: &str) -> Result<Expr, ParseError> {
    if let Some(idx) = s.strip_prefix('$') {
        return idx
            .parse::<usize>()
            .map(Expr::Index)
            .map_err(|_| ParseError::BadIndex(s.to_string()));
    }
    Primitive::from_name(s)
        .map(Expr::Primitive)
        .ok_or_else(|| ParseError::UnknownSymbol(s.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        assert_eq!(parse_program("$0").unwrap(), Expr::var(0));
        assert_eq!(parse_program("7").unwrap(), Expr::int(7));
    }

    #[test]
    fn test_parse_application_spine() {
        let e = parse_program("(lambda (lambda (+ $1 $0)))").unwrap();
        let expected = Expr::lambdas(2, Expr::apply(Expr::prim(Primitive::Add), [Expr::var(1), Expr::var(0)]));
        assert_eq!(e, expected);
        assert_eq!(e.arity(), 2);
    }

    #[test]
    fn test_parse_invented_round_trip() {
        let text = "(lambda (#(lambda (lambda (* $1 $0))) $0 2))";
        let e = parse_program(text).unwrap();
        assert!(e.uses_invented());
        assert_eq!(e.to_string(), text);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_program("(").unwrap_err(), ParseError::UnexpectedEof);
        assert_eq!(parse_program("()").unwrap_err(), ParseError::EmptyList);
        assert_eq!(parse_program("(lambda $0 $0)").unwrap_err(), ParseError::LambdaBody);
        assert_eq!(parse_program("frob").unwrap_err(), ParseError::UnknownSymbol("frob".into()));
        assert_eq!(parse_program("$x").unwrap_err(), ParseError::BadIndex("$x".into()));
        assert_eq!(parse_program("1 2").unwrap_err(), ParseError::TrailingInput);
    }
}
