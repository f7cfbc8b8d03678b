//! Recursive-descent parser for holding values.
//!
//! Grammar:
//! ```text
//! convert := sum ( "in" UNIT )?
//! sum     := product ( ("+" | "-") product )*
//! product := unary ( ("*" | "/") unary )*
//! unary   := "-" unary | primary
//! primary := NUMBER UNIT? | "quoted:path" | identifier | "(" convert ")"
//! ```
//! A number may carry a currency symbol (`$1,000`), an attached scale suffix
//! (`2.5k`, `1.2M`) or a percent sign (`50%`). A word directly after a number
//! is its unit; `*`, `/` and `^` written without spaces continue it, so
//! `12.50 USD/share` is one literal while `12.50 USD / share` divides.

use crate::analysis::units::{canonicalize, is_unit_char};
use crate::compute::quantity::Quantity;
use crate::store::{Expr, HoldingValue, Operation, Reference, Unit};
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} at position {position}")]
pub struct ExprError {
    pub position: usize,
    pub message: String,
}

impl ExprError {
    fn new(position: usize, message: impl Into<String>) -> Self {
        Self { position, message: message.into() }
    }
}

/// Parses a holding value and classifies it as a literal or an expression.
pub fn parse_holding_value(text: &str) -> Result<HoldingValue, ExprError> {
    Ok(classify(parse(text)?))
}

/// A value whose whole parse is a single literal is a `Literal`; anything else,
/// including a bare name reference, is an `Expression`.
pub fn classify(expr: Expr) -> HoldingValue {
    match expr {
        Expr::Literal(q) => HoldingValue::Literal(q),
        other => HoldingValue::Expression(other),
    }
}

pub fn parse(text: &str) -> Result<Expr, ExprError> {
    let tokens = Lexer::new(text).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.parse_convert()?;
    match parser.peek() {
        (Token::End, _) => Ok(expr),
        (tok, at) => Err(ExprError::new(*at, format!("unexpected {}", tok.describe()))),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// A magnitude and the unit implied by a currency symbol, if any.
    Number(Decimal, Option<&'static str>),
    Word(String),
    Quoted(String),
    Op(Operation),
    LParen,
    RParen,
    In,
    End,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n, _) => format!("number '{}'", n),
            Token::Word(w) => format!("word '{}'", w),
            Token::Quoted(q) => format!("reference \"{}\"", q),
            Token::Op(op) => format!("operator '{}'", op.symbol()),
            Token::LParen => "'('".into(),
            Token::RParen => "')'".into(),
            Token::In => "'in'".into(),
            Token::End => "end of input".into(),
        }
    }
}

const CURRENCY_SYMBOLS: &[(char, &str)] = &[('$', "USD"), ('€', "EUR"), ('£', "GBP"), ('¥', "JPY")];

const SCALE_SUFFIXES: &[(char, u64)] = &[
    ('k', 1_000),
    ('M', 1_000_000),
    ('G', 1_000_000_000),
    ('T', 1_000_000_000_000),
];

struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

impl Lexer {
    fn new(text: &str) -> Self {
        Self { chars: text.chars().collect(), pos: 0 }
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn tokenize(mut self) -> Result<Vec<(Token, usize)>, ExprError> {
        let mut tokens = Vec::new();
        while let Some(c) = self.peek_at(0) {
            let start = self.pos;
            if c.is_whitespace() {
                self.pos += 1;
                continue;
            }
            let token = match c {
                '+' => { self.pos += 1; Token::Op(Operation::Add) }
                '-' => { self.pos += 1; Token::Op(Operation::Subtract) }
                '*' => { self.pos += 1; Token::Op(Operation::Multiply) }
                '/' => { self.pos += 1; Token::Op(Operation::Divide) }
                '(' => { self.pos += 1; Token::LParen }
                ')' => { self.pos += 1; Token::RParen }
                '"' | '\'' => self.lex_quoted(c)?,
                c if c.is_ascii_digit() || c == '.' => self.lex_number(None)?,
                c if CURRENCY_SYMBOLS.iter().any(|(s, _)| *s == c) => {
                    let unit = CURRENCY_SYMBOLS.iter().find(|(s, _)| *s == c).map(|(_, u)| *u);
                    self.pos += 1;
                    match self.peek_at(0) {
                        Some(d) if d.is_ascii_digit() || d == '.' => self.lex_number(unit)?,
                        _ => return Err(ExprError::new(start, format!("expected a number after '{}'", c))),
                    }
                }
                c if c.is_alphabetic() || c == '_' => {
                    let word = self.take_while(is_unit_char);
                    let unit_position = matches!(tokens.last(), Some((Token::Number(_, None) | Token::In, _)));
                    if word == "in" {
                        Token::In
                    } else if unit_position {
                        Token::Word(self.continue_unit(word))
                    } else {
                        Token::Word(word)
                    }
                }
                other => return Err(ExprError::new(start, format!("unexpected character '{}'", other))),
            };
            tokens.push((token, start));
        }
        tokens.push((Token::End, self.pos));
        Ok(tokens)
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while self.peek_at(0).is_some_and(&pred) {
            self.pos += 1;
        }
        self.chars[start..self.pos].iter().collect()
    }

    /// Extends a unit word with attached `*word`, `/word` and `^exp` parts.
    fn continue_unit(&mut self, mut unit: String) -> String {
        loop {
            match (self.peek_at(0), self.peek_at(1)) {
                (Some(op @ ('*' | '/')), Some(next)) if next.is_alphabetic() || next == '_' => {
                    self.pos += 1;
                    unit.push(op);
                    unit.push_str(&self.take_while(is_unit_char));
                }
                (Some('^'), Some(next)) if next.is_ascii_digit() || next == '-' => {
                    self.pos += 1;
                    unit.push('^');
                    if next == '-' {
                        self.pos += 1;
                        unit.push('-');
                    }
                    unit.push_str(&self.take_while(|c| c.is_ascii_digit()));
                }
                _ => return unit,
            }
        }
    }

    fn lex_quoted(&mut self, quote: char) -> Result<Token, ExprError> {
        let start = self.pos;
        self.pos += 1;
        let body = self.take_while(|c| c != quote);
        if self.peek_at(0) != Some(quote) {
            return Err(ExprError::new(start, "unterminated quoted reference"));
        }
        self.pos += 1;
        Ok(Token::Quoted(body))
    }

    fn lex_number(&mut self, currency: Option<&'static str>) -> Result<Token, ExprError> {
        let start = self.pos;
        let mut digits = String::new();
        let mut prev_digit = false;

        // 1. Mantissa, allowing `,` and `_` between digits
        while let Some(c) = self.peek_at(0) {
            if c.is_ascii_digit() || c == '.' {
                digits.push(c);
                prev_digit = c.is_ascii_digit();
            } else if (c == ',' || c == '_') && prev_digit && self.peek_at(1).is_some_and(|n| n.is_ascii_digit()) {
                prev_digit = false;
            } else {
                break;
            }
            self.pos += 1;
        }

        // 2. Exponent, only when digits follow the `e`
        let mut scientific = false;
        if matches!(self.peek_at(0), Some('e' | 'E')) {
            let signed = matches!(self.peek_at(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek_at(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                digits.push('e');
                if signed {
                    digits.push(self.chars[self.pos + 1]);
                }
                self.pos += digit_at;
                digits.push_str(&self.take_while(|c| c.is_ascii_digit()));
                scientific = true;
            }
        }

        let parsed = if scientific { Decimal::from_scientific(&digits) } else { Decimal::from_str(&digits) };
        let mut value = parsed.map_err(|_| ExprError::new(start, format!("invalid number '{}'", digits)))?;

        // 3. Attached percent sign or scale suffix, e.g. `50%`, `2.5k`
        if self.peek_at(0) == Some('%') {
            self.pos += 1;
            value = value
                .checked_div(Decimal::ONE_HUNDRED)
                .ok_or_else(|| ExprError::new(start, "invalid percentage"))?;
        } else if let Some(c) = self.peek_at(0) {
            let standalone = !self.peek_at(1).is_some_and(is_unit_char);
            if let Some((_, factor)) = SCALE_SUFFIXES.iter().find(|(s, _)| *s == c) {
                if standalone {
                    self.pos += 1;
                    value = value
                        .checked_mul(Decimal::from(*factor))
                        .ok_or_else(|| ExprError::new(start, "number too large"))?;
                }
            }
        }

        Ok(Token::Number(value, currency))
    }
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &(Token, usize) {
        // The token list always ends with `End`.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> (Token, usize) {
        let tok = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn parse_convert(&mut self) -> Result<Expr, ExprError> {
        let expr = self.parse_sum()?;
        if self.peek().0 == Token::In {
            self.advance();
            let (tok, at) = self.advance();
            let Token::Word(unit) = tok else {
                return Err(ExprError::new(at, format!("expected a unit after 'in', found {}", tok.describe())));
            };
            let unit = canonicalize(&unit).map_err(|e| ExprError::new(at, e.to_string()))?;
            return Ok(Expr::Convert { expr: Box::new(expr), unit: Unit(unit) });
        }
        Ok(expr)
    }

    fn parse_sum(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_product()?;
        while let Token::Op(op @ (Operation::Add | Operation::Subtract)) = self.peek().0 {
            self.advance();
            let rhs = self.parse_product()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_product(&mut self) -> Result<Expr, ExprError> {
        let mut lhs = self.parse_unary()?;
        while let Token::Op(op @ (Operation::Multiply | Operation::Divide)) = self.peek().0 {
            self.advance();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ExprError> {
        if self.peek().0 == Token::Op(Operation::Subtract) {
            self.advance();
            // Fold negated literals so `-$200` stays a literal.
            return Ok(match self.parse_unary()? {
                Expr::Literal(q) => Expr::Literal(q.neg()),
                other => Expr::Negate(Box::new(other)),
            });
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, ExprError> {
        let (tok, at) = self.advance();
        match tok {
            Token::Number(magnitude, Some(currency)) => Ok(Expr::Literal(Quantity::new(magnitude, currency))),
            Token::Number(magnitude, None) => {
                let unit = match &self.peek().0 {
                    Token::Word(word) => {
                        let unit_at = self.peek().1;
                        let unit = canonicalize(word).map_err(|e| ExprError::new(unit_at, e.to_string()))?;
                        self.advance();
                        Unit(unit)
                    }
                    _ => Unit::dimensionless(),
                };
                Ok(Expr::Literal(Quantity { magnitude, unit }))
            }
            Token::Word(name) | Token::Quoted(name) => Reference::parse(&name)
                .map(Expr::Reference)
                .ok_or_else(|| ExprError::new(at, format!("invalid reference '{}'", name))),
            Token::LParen => {
                let inner = self.parse_convert()?;
                match self.advance() {
                    (Token::RParen, _) => Ok(inner),
                    (tok, at) => Err(ExprError::new(at, format!("expected ')', found {}", tok.describe()))),
                }
            }
            other => Err(ExprError::new(at, format!("unexpected {}", other.describe()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn lit(m: Decimal, unit: &str) -> HoldingValue {
        HoldingValue::Literal(Quantity::new(m, unit))
    }

    #[rstest]
    #[case("1000 USD", lit(dec!(1000), "USD"))]
    #[case("$1,250.50", lit(dec!(1250.50), "USD"))]
    #[case("-$200", lit(dec!(-200), "USD"))]
    #[case("€3_000", lit(dec!(3000), "EUR"))]
    #[case("2.5k USD", lit(dec!(2500), "USD"))]
    #[case("$1.2M", lit(dec!(1200000), "USD"))]
    #[case("0.75 BTC", lit(dec!(0.75), "BTC"))]
    #[case("1e3 EUR", lit(dec!(1000), "EUR"))]
    #[case("42", lit(dec!(42), ""))]
    #[case("(100 share)", lit(dec!(100), "share"))]
    #[case("12.50 USD/share", lit(dec!(12.50), "USD/share"))]
    #[case("9.81 m/s^2", lit(dec!(9.81), "m/s^2"))]
    #[case("3 share*USD", lit(dec!(3), "USD*share"))]
    #[case("50%", lit(dec!(0.5), ""))]
    #[case("-2.5%", lit(dec!(-0.025), ""))]
    fn test_literals(#[case] input: &str, #[case] expected: HoldingValue) {
        assert_eq!(parse_holding_value(input).unwrap(), expected, "Input: {}", input);
    }

    #[test]
    fn test_bare_name_is_an_expression() {
        let value = parse_holding_value("Checking").unwrap();
        let HoldingValue::Expression(Expr::Reference(r)) = value else {
            panic!("expected a reference, got {:?}", value);
        };
        assert_eq!(r.to_string(), "Checking");
    }

    #[test]
    fn test_precedence_and_references() {
        let expr = parse(r#""Cash" + "Brokerage:Stock" * 2 - 10 USD"#).unwrap();
        assert_eq!(expr.to_string(), r#"(("Cash" + ("Brokerage:Stock" * 2)) - 10 USD)"#);

        let refs: Vec<String> = expr.references().iter().map(|r| r.to_string()).collect();
        assert_eq!(refs, vec!["Cash", "Brokerage:Stock"]);
    }

    #[test]
    fn test_spaced_operators_after_a_unit_stay_operators() {
        let expr = parse("12.50 USD / share").unwrap();
        assert_eq!(expr.to_string(), r#"(12.5 USD / "share")"#);

        let expr = parse("50% * House").unwrap();
        assert_eq!(expr.to_string(), r#"(0.5 * "House")"#);

        // Only units continue across attached operators, not references.
        let expr = parse("Price*Shares").unwrap();
        assert_eq!(expr.to_string(), r#"("Price" * "Shares")"#);

        let expr = parse("Price in USD/share").unwrap();
        assert_eq!(expr.to_string(), r#"("Price" in USD/share)"#);
    }

    #[test]
    fn test_conversion_and_negation() {
        let expr = parse("-(Savings + 5 EUR) in USD").unwrap();
        assert_eq!(expr.to_string(), r#"(-("Savings" + 5 EUR) in USD)"#);
    }

    #[rstest]
    #[case("")]
    #[case("100 USD +")]
    #[case("\"Cash")]
    #[case("(1 USD")]
    #[case("Cash in")]
    #[case("$ 100")]
    #[case("Cash Savings")]
    #[case("1 USD # 2")]
    #[case("\"a:b:c:d\"")]
    #[case("12 USD/share/yr")]
    #[case("5 %")]
    fn test_malformed(#[case] input: &str) {
        assert!(parse(input).is_err(), "Should fail: '{}'", input);
    }
}
