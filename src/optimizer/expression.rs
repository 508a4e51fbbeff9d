//! Restricted arithmetic evaluator: numbers, `+ - * / **` and parentheses.
//!
//! Expressions are validated character by character, tokenized and evaluated by
//! a recursive-descent parser. Nothing outside that grammar is ever interpreted.

use crate::error::ArithmeticError;

/// Nesting limit for parentheses and unary/power chains
const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Number(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Power,
    LParen,
    RParen,
}

/// Validate and evaluate `expr`. Any failure, including a non-finite result, is an error.
pub fn evaluate_expression(expr: &str) -> Result<f64, ArithmeticError> {
    validate(expr)?;
    let tokens = tokenize(expr)?;
    let mut parser = Parser { tokens: &tokens, pos: 0, depth: 0 };
    let value = parser.expr()?;
    if parser.pos != tokens.len() {
        return Err(ArithmeticError::InvalidExpression);
    }
    if !value.is_finite() {
        return Err(ArithmeticError::NonFinite);
    }
    Ok(value)
}

fn validate(expr: &str) -> Result<(), ArithmeticError> {
    if expr.trim().is_empty() {
        return Err(ArithmeticError::Empty);
    }

    if !expr
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, '+' | '-' | '*' | '/' | '(' | ')' | '.' | ' '))
    {
        return Err(ArithmeticError::UnsafeExpression);
    }

    let mut open = 0usize;
    for c in expr.chars() {
        match c {
            '(' => open += 1,
            ')' => {
                open = open
                    .checked_sub(1)
                    .ok_or(ArithmeticError::UnbalancedParentheses)?;
            }
            _ => {}
        }
    }
    if open != 0 {
        return Err(ArithmeticError::UnbalancedParentheses);
    }

    Ok(())
}

fn tokenize(expr: &str) -> Result<Vec<Token>, ArithmeticError> {
    let chars: Vec<char> = expr.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' => i += 1,
            '+' | '-' | '/' | '(' | ')' => {
                tokens.push(match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '/' => Token::Slash,
                    '(' => Token::LParen,
                    _ => Token::RParen,
                });
                i += 1;
            }
            '*' => {
                if chars.get(i + 1) == Some(&'*') {
                    tokens.push(Token::Power);
                    i += 2;
                } else {
                    tokens.push(Token::Star);
                    i += 1;
                }
            }
            _ => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let literal: String = chars[start..i].iter().collect();
                if literal.matches('.').count() > 1 || literal == "." {
                    return Err(ArithmeticError::InvalidExpression);
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| ArithmeticError::InvalidExpression)?;
                tokens.push(Token::Number(value));
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn descend(&mut self) -> Result<(), ArithmeticError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ArithmeticError::InvalidExpression);
        }
        Ok(())
    }

    // expr := term (('+' | '-') term)*
    fn expr(&mut self) -> Result<f64, ArithmeticError> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == Token::Plus { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    // term := unary (('*' | '/') unary)*
    fn term(&mut self) -> Result<f64, ArithmeticError> {
        let mut value = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash)) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = if op == Token::Star { value * rhs } else { value / rhs };
        }
        Ok(value)
    }

    // unary := ('-' | '+') unary | power
    fn unary(&mut self) -> Result<f64, ArithmeticError> {
        self.descend()?;
        let value = match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                -self.unary()?
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()?
            }
            _ => self.power()?,
        };
        self.depth -= 1;
        Ok(value)
    }

    // power := primary ('**' unary)?   (right-associative)
    fn power(&mut self) -> Result<f64, ArithmeticError> {
        let base = self.primary()?;
        if self.peek() == Some(Token::Power) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    // primary := NUMBER | '(' expr ')'
    fn primary(&mut self) -> Result<f64, ArithmeticError> {
        match self.next() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::LParen) => {
                self.descend()?;
                let value = self.expr()?;
                if self.next() != Some(Token::RParen) {
                    return Err(ArithmeticError::UnbalancedParentheses);
                }
                self.depth -= 1;
                Ok(value)
            }
            _ => Err(ArithmeticError::InvalidExpression),
        }
    }
}
