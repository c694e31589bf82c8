//! Recursive-descent parser for the LaTeX expression subset cells and
//! coefficients are written in.
//!
//! Supported: integers and decimals, single-letter symbols with optional
//! subscripts (`x`, `x_1`, `x_{12}`, and nested-brace subscripts, which is
//! how placeholder tokens parse as one symbol), `+ - * / ^`, `\cdot`,
//! `\frac`, `\sqrt`, `\left(`/`\right)`, parentheses, brace groups,
//! implicit multiplication and unary signs.
//!
//! The parser returns a raw tree preserving source order; it never
//! simplifies. Order matters downstream because evaluation over matrices is
//! not commutative.

use matex_core::EngineError;

use crate::expr::Expr;
use crate::rational::Rational;

/// Nesting bound so pathological inputs fail with a parse error instead of
/// exhausting the stack.
const MAX_NESTING: usize = 128;

pub fn parse(text: &str) -> Result<Expr, EngineError> {
    let tokens = tokenize(text)?;
    let mut parser = ExprParser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expression()?;
    match parser.peek() {
        None => Ok(expr),
        Some(token) => Err(parse_error(format!("unexpected {token:?}"))),
    }
}

fn parse_error(message: impl Into<String>) -> EngineError {
    EngineError::Parse(message.into())
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(Rational),
    Symbol(String),
    Command(String),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    LParen,
    RParen,
    LBrace,
    RBrace,
}

fn tokenize(text: &str) -> Result<Vec<Token>, EngineError> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '^' => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '{' => {
                tokens.push(Token::LBrace);
                i += 1;
            }
            '}' => {
                tokens.push(Token::RBrace);
                i += 1;
            }
            '\\' => {
                let start = i;
                i += 1;
                while i < chars.len() && chars[i].is_alphabetic() {
                    i += 1;
                }
                if i == start + 1 {
                    return Err(parse_error("stray backslash"));
                }
                tokens.push(Token::Command(chars[start..i].iter().collect()));
            }
            c if c.is_ascii_digit() => {
                let (number, consumed) = scan_number(&chars[i..])?;
                tokens.push(Token::Number(number));
                i += consumed;
            }
            c if c.is_alphabetic() => {
                let (name, consumed) = scan_symbol(&chars[i..])?;
                tokens.push(Token::Symbol(name));
                i += consumed;
            }
            other => return Err(parse_error(format!("unexpected character '{other}'"))),
        }
    }
    Ok(tokens)
}

/// Digits with an optional fractional part, as an exact rational.
fn scan_number(chars: &[char]) -> Result<(Rational, usize), EngineError> {
    let mut i = 0;
    let mut numer: i128 = 0;
    let mut denom: i128 = 1;
    let overflow = || parse_error("number literal too large");
    while i < chars.len() && chars[i].is_ascii_digit() {
        let digit = chars[i] as i128 - '0' as i128;
        numer = numer
            .checked_mul(10)
            .and_then(|n| n.checked_add(digit))
            .ok_or_else(overflow)?;
        i += 1;
    }
    if i + 1 < chars.len() && chars[i] == '.' && chars[i + 1].is_ascii_digit() {
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            let digit = chars[i] as i128 - '0' as i128;
            numer = numer
                .checked_mul(10)
                .and_then(|n| n.checked_add(digit))
                .ok_or_else(overflow)?;
            denom = denom.checked_mul(10).ok_or_else(overflow)?;
            i += 1;
        }
    }
    let number = Rational::new(numer, denom).ok_or_else(overflow)?;
    Ok((number, i))
}

/// One letter plus an optional subscript, consumed atomically: `x`, `x_1`,
/// `x_{anything balanced}`. The raw text is the symbol's name, so subscripted
/// placeholders survive as single atoms.
fn scan_symbol(chars: &[char]) -> Result<(String, usize), EngineError> {
    let mut i = 1;
    if i + 1 < chars.len() && chars[i] == '_' {
        if chars[i + 1] == '{' {
            let mut depth = 0i64;
            let mut j = i + 1;
            loop {
                if j >= chars.len() {
                    return Err(parse_error("unterminated subscript"));
                }
                match chars[j] {
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
                j += 1;
            }
            i = j + 1;
        } else if chars[i + 1].is_alphanumeric() {
            i += 2;
        }
    }
    Ok((chars[..i].iter().collect(), i))
}

struct ExprParser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl ExprParser {
    fn nest<T>(
        &mut self,
        body: impl FnOnce(&mut Self) -> Result<T, EngineError>,
    ) -> Result<T, EngineError> {
        if self.depth >= MAX_NESTING {
            return Err(parse_error("expression nesting too deep"));
        }
        self.depth += 1;
        let result = body(self);
        self.depth -= 1;
        result
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), EngineError> {
        if self.eat(&token) {
            Ok(())
        } else {
            Err(parse_error(format!(
                "expected {token:?}, found {:?}",
                self.peek()
            )))
        }
    }

    fn expression(&mut self) -> Result<Expr, EngineError> {
        self.nest(|p| {
            let mut terms = vec![p.signed_term()?];
            loop {
                if p.eat(&Token::Plus) {
                    terms.push(p.term()?);
                } else if p.eat(&Token::Minus) {
                    terms.push(p.term()?.neg());
                } else {
                    break;
                }
            }
            Ok(if terms.len() == 1 {
                terms.swap_remove(0)
            } else {
                Expr::Add(terms)
            })
        })
    }

    fn signed_term(&mut self) -> Result<Expr, EngineError> {
        let mut negative = false;
        loop {
            if self.eat(&Token::Minus) {
                negative = !negative;
            } else if !self.eat(&Token::Plus) {
                break;
            }
        }
        let term = self.term()?;
        Ok(if negative { term.neg() } else { term })
    }

    fn term(&mut self) -> Result<Expr, EngineError> {
        let mut factors = vec![self.factor()?];
        loop {
            if self.eat(&Token::Star) {
                factors.push(self.factor()?);
            } else if self.eat(&Token::Slash) {
                factors.push(Expr::pow(self.factor()?, Expr::integer(-1)));
            } else if self.peek().is_some_and(Self::starts_factor) {
                // Either an explicit \cdot or plain juxtaposition.
                self.eat(&Token::Command(r"\cdot".into()));
                factors.push(self.factor()?);
            } else {
                break;
            }
        }
        Ok(if factors.len() == 1 {
            factors.swap_remove(0)
        } else {
            Expr::Mul(factors)
        })
    }

    /// Tokens that may open a factor, for implicit multiplication.
    fn starts_factor(token: &Token) -> bool {
        matches!(
            token,
            Token::Number(_) | Token::Symbol(_) | Token::LParen | Token::LBrace
        ) || matches!(
            token,
            Token::Command(name) if matches!(name.as_str(), r"\cdot" | r"\frac" | r"\sqrt" | r"\left" | r"\pi")
        )
    }

    fn factor(&mut self) -> Result<Expr, EngineError> {
        let base = self.atom()?;
        if self.eat(&Token::Caret) {
            let exp = self.exponent()?;
            return Ok(Expr::pow(base, exp));
        }
        Ok(base)
    }

    fn exponent(&mut self) -> Result<Expr, EngineError> {
        self.nest(|p| {
            if p.eat(&Token::LBrace) {
                let exp = p.expression()?;
                p.expect(Token::RBrace)?;
                return Ok(exp);
            }
            if p.eat(&Token::Minus) {
                return Ok(p.exponent()?.neg());
            }
            if p.eat(&Token::Plus) {
                return p.exponent();
            }
            p.factor()
        })
    }

    fn atom(&mut self) -> Result<Expr, EngineError> {
        match self.advance() {
            Some(Token::Number(r)) => Ok(Expr::Number(r)),
            Some(Token::Symbol(name)) => Ok(Expr::Symbol(name)),
            Some(Token::LParen) => {
                let expr = self.expression()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Some(Token::LBrace) => {
                let expr = self.expression()?;
                self.expect(Token::RBrace)?;
                Ok(expr)
            }
            Some(Token::Command(name)) => match name.as_str() {
                r"\frac" => {
                    let numerator = self.braced()?;
                    let denominator = self.braced()?;
                    Ok(numerator.div(denominator))
                }
                r"\sqrt" => {
                    let radicand = self.braced()?;
                    Ok(Expr::pow(
                        radicand,
                        Expr::Number(Rational::new(1, 2).unwrap_or(Rational::ONE)),
                    ))
                }
                r"\left" => {
                    self.expect(Token::LParen)?;
                    let expr = self.expression()?;
                    self.expect(Token::Command(r"\right".into()))?;
                    self.expect(Token::RParen)?;
                    Ok(expr)
                }
                r"\pi" => Ok(Expr::symbol(r"\pi")),
                other => Err(parse_error(format!("unknown command {other}"))),
            },
            other => Err(parse_error(format!("unexpected {other:?}"))),
        }
    }

    fn braced(&mut self) -> Result<Expr, EngineError> {
        self.expect(Token::LBrace)?;
        let expr = self.expression()?;
        self.expect(Token::RBrace)?;
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Expr {
        Expr::symbol(s)
    }

    fn int(n: i128) -> Expr {
        Expr::integer(n)
    }

    #[test]
    fn test_integer_and_decimal() {
        assert_eq!(parse("42").unwrap(), int(42));
        assert_eq!(
            parse("1.25").unwrap(),
            Expr::Number(Rational::new(5, 4).unwrap())
        );
    }

    #[test]
    fn test_sum_and_difference() {
        assert_eq!(
            parse("x + 1 - y").unwrap(),
            Expr::Add(vec![sym("x"), int(1), sym("y").neg()])
        );
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(parse("-x").unwrap(), sym("x").neg());
        assert_eq!(parse("+ 3").unwrap(), int(3));
    }

    #[test]
    fn test_explicit_and_implicit_multiplication() {
        let expected = Expr::Mul(vec![int(2), sym("x")]);
        assert_eq!(parse("2*x").unwrap(), expected);
        assert_eq!(parse(r"2 \cdot x").unwrap(), expected);
        assert_eq!(parse("2x").unwrap(), expected);
        assert_eq!(parse("xy").unwrap(), Expr::Mul(vec![sym("x"), sym("y")]));
    }

    #[test]
    fn test_division_becomes_inverse_power() {
        assert_eq!(parse("x/y").unwrap(), sym("x").div(sym("y")));
        assert_eq!(parse(r"\frac{x}{y}").unwrap(), sym("x").div(sym("y")));
    }

    #[test]
    fn test_powers() {
        assert_eq!(parse("x^2").unwrap(), Expr::pow(sym("x"), int(2)));
        assert_eq!(
            parse("x^{n+1}").unwrap(),
            Expr::pow(sym("x"), Expr::Add(vec![sym("n"), int(1)]))
        );
        assert_eq!(parse("x^-1").unwrap(), Expr::pow(sym("x"), int(1).neg()));
    }

    #[test]
    fn test_parentheses_group() {
        assert_eq!(
            parse("2(x + 1)").unwrap(),
            Expr::Mul(vec![int(2), Expr::Add(vec![sym("x"), int(1)])])
        );
        assert_eq!(parse(r"\left( x \right)").unwrap(), sym("x"));
    }

    #[test]
    fn test_subscripted_symbols_are_atoms() {
        assert_eq!(parse("x_1").unwrap(), sym("x_1"));
        assert_eq!(parse("x_{12}").unwrap(), sym("x_{12}"));
        assert_eq!(
            parse("M_{r_{e_{p_{l_{0}}}}}").unwrap(),
            sym("M_{r_{e_{p_{l_{0}}}}}")
        );
    }

    #[test]
    fn test_placeholder_in_arithmetic() {
        assert_eq!(
            parse("2M_{r_{e_{p_{l_{0}}}}}").unwrap(),
            Expr::Mul(vec![int(2), sym("M_{r_{e_{p_{l_{0}}}}}")])
        );
    }

    #[test]
    fn test_sqrt() {
        assert_eq!(
            parse(r"\sqrt{x}").unwrap(),
            Expr::pow(sym("x"), Expr::Number(Rational::new(1, 2).unwrap()))
        );
    }

    #[test]
    fn test_source_order_is_preserved() {
        assert_eq!(
            parse("AB").unwrap(),
            Expr::Mul(vec![sym("A"), sym("B")])
        );
        assert_eq!(
            parse("BA").unwrap(),
            Expr::Mul(vec![sym("B"), sym("A")])
        );
    }

    #[test]
    fn test_errors() {
        for text in ["", "(x", "x +", r"\unknown", "x^", "1 & 2", "2..5"] {
            assert!(parse(text).is_err(), "accepted {text:?}");
        }
    }

    #[test]
    fn test_brace_group() {
        assert_eq!(
            parse("a{c}").unwrap(),
            Expr::Mul(vec![sym("a"), sym("c")])
        );
    }
}
