//! A recursive-descent parser for Excel-style formula text, with precedence
//! (lowest to highest): comparison, concatenation, additive, multiplicative,
//! unary minus, range, primary.
//!
//! Reference tokens are interpreted by handing the raw lexeme to
//! [`xlforge_core::RefType::parse`] rather than re-implementing A1 parsing
//! and sheet-name quote-escaping here. A bare reference token always parses
//! first as [`crate::ast::Expr::PolyRef`]/[`crate::ast::Expr::SheetPolyRef`];
//! [`parse_range_level`] resolves every one of them into a `Ref`, `SheetRef`,
//! `RangeRef`, or `SheetRange` node before the parser returns, per the node
//! model in `ast.rs`.

use crate::ast::{AggregatorId, Expr, FunctionSpec, RangeLocation, Value};
use crate::error::ParseError;
use rust_decimal::Decimal;
use std::str::FromStr;
use xlforge_core::{CellRange, RefType, MAX_FORMULA_LEN};

type PResult<T> = Result<T, ParseError>;

/// Parse a formula's text (without the leading `=`) into an [`Expr`] tree
/// with no unresolved `PolyRef`/`SheetPolyRef` nodes remaining.
pub fn parse_formula(text: &str) -> PResult<Expr> {
    if text.len() > MAX_FORMULA_LEN {
        return Err(ParseError::TooLong(MAX_FORMULA_LEN));
    }
    let text = text.strip_prefix('=').unwrap_or(text);
    if text.trim().is_empty() {
        return Err(ParseError::Empty);
    }

    let mut p = Parser::new(text);
    let expr = p.parse_comparison()?;
    p.skip_ws();
    if !p.at_end() {
        return Err(ParseError::UnexpectedToken(p.rest().to_string()));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(String),
    String(String),
    Boolean(bool),
    Error(xlforge_core::CellError),
    Identifier(String),
    /// Raw lexeme of an unqualified reference candidate, e.g. `"A1"`, `"$B$2"`.
    Ref(String),
    /// Raw (possibly quoted) sheet-name lexeme preceding `!`.
    SheetPrefix(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Ampersand,
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    Colon,
    Comma,
    LParen,
    RParen,
    Eof,
}

struct Parser<'a> {
    input: &'a str,
    pos: usize,
    tok: Token,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        let mut p = Self { input, pos: 0, tok: Token::Eof };
        p.bump();
        p
    }

    fn rest(&self) -> &str {
        &self.input[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(n)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.advance();
        }
    }

    fn bump(&mut self) {
        self.skip_ws();
        self.tok = self.scan();
    }

    fn scan(&mut self) -> Token {
        let Some(c) = self.peek() else { return Token::Eof };
        match c {
            '+' => {
                self.advance();
                Token::Plus
            }
            '-' => {
                self.advance();
                Token::Minus
            }
            '*' => {
                self.advance();
                Token::Star
            }
            '/' => {
                self.advance();
                Token::Slash
            }
            '%' => {
                self.advance();
                Token::Percent
            }
            '&' => {
                self.advance();
                Token::Ampersand
            }
            ':' => {
                self.advance();
                Token::Colon
            }
            ',' => {
                self.advance();
                Token::Comma
            }
            '(' => {
                self.advance();
                Token::LParen
            }
            ')' => {
                self.advance();
                Token::RParen
            }
            '=' => {
                self.advance();
                Token::Eq
            }
            '<' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Token::Lte
                } else if self.peek() == Some('>') {
                    self.advance();
                    Token::Neq
                } else {
                    Token::Lt
                }
            }
            '>' => {
                self.advance();
                if self.peek() == Some('=') {
                    self.advance();
                    Token::Gte
                } else {
                    Token::Gt
                }
            }
            '"' => self.scan_string(),
            '\'' => self.scan_quoted_sheet_prefix(),
            c if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|d| d.is_ascii_digit())) => {
                self.scan_number()
            }
            '#' => self.scan_error_or_ident(),
            c if c.is_ascii_alphabetic() || c == '_' || c == '$' => self.scan_ident_or_ref(),
            _ => {
                self.advance();
                Token::Eof
            }
        }
    }

    fn scan_string(&mut self) -> Token {
        self.advance();
        let mut s = String::new();
        loop {
            match self.peek() {
                Some('"') if self.peek_at(1) == Some('"') => {
                    s.push('"');
                    self.advance();
                    self.advance();
                }
                Some('"') => {
                    self.advance();
                    break;
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
                None => break,
            }
        }
        Token::String(s)
    }

    /// Scans `'Sheet name with ''quotes'''` up to and consuming the `'`,
    /// requiring a following `!` (consumed too), returning the raw quoted
    /// text (quotes included, unescaped later by `RefType::parse`).
    fn scan_quoted_sheet_prefix(&mut self) -> Token {
        let start = self.pos;
        self.advance();
        loop {
            match self.peek() {
                Some('\'') if self.peek_at(1) == Some('\'') => {
                    self.advance();
                    self.advance();
                }
                Some('\'') => {
                    self.advance();
                    break;
                }
                Some(_) => self.advance(),
                None => break,
            }
        }
        let raw = self.input[start..self.pos].to_string();
        if self.peek() == Some('!') {
            self.advance();
        }
        Token::SheetPrefix(raw)
    }

    fn scan_number(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if self.peek() == Some('.') {
            self.advance();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        if self.peek().is_some_and(|c| c == 'e' || c == 'E') {
            self.advance();
            if self.peek().is_some_and(|c| c == '+' || c == '-') {
                self.advance();
            }
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.advance();
            }
        }
        Token::Number(self.input[start..self.pos].to_string())
    }

    fn scan_error_or_ident(&mut self) -> Token {
        let start = self.pos;
        self.advance();
        while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '!' || c == '/' || c == '?') {
            self.advance();
        }
        let text = &self.input[start..self.pos];
        match xlforge_core::CellError::from_str(text) {
            Some(e) => Token::Error(e),
            None => Token::Identifier(text.to_string()),
        }
    }

    fn scan_ident_or_ref(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
        {
            self.advance();
        }
        let text = self.input[start..self.pos].to_string();

        if self.peek() == Some('!') {
            self.advance();
            return Token::SheetPrefix(text);
        }

        let upper = text.to_ascii_uppercase();
        if upper == "TRUE" && self.peek() != Some('(') {
            return Token::Boolean(true);
        }
        if upper == "FALSE" && self.peek() != Some('(') {
            return Token::Boolean(false);
        }

        if looks_like_cell_ref(&text) && self.peek() != Some('(') {
            return Token::Ref(text);
        }

        Token::Identifier(text)
    }

    fn expect(&mut self, t: &Token) -> PResult<()> {
        if &self.tok == t {
            self.bump();
            Ok(())
        } else {
            Err(ParseError::UnexpectedToken(format!("{:?}", self.tok)))
        }
    }

    // --- grammar, lowest to highest precedence ---

    fn parse_comparison(&mut self) -> PResult<Expr> {
        let mut left = self.parse_concat()?;
        loop {
            let build: fn(Box<Expr>, Box<Expr>) -> Expr = match &self.tok {
                Token::Eq => Expr::Eq,
                Token::Neq => Expr::Neq,
                Token::Lt => Expr::Lt,
                Token::Lte => Expr::Lte,
                Token::Gt => Expr::Gt,
                Token::Gte => Expr::Gte,
                _ => break,
            };
            self.bump();
            let right = self.parse_concat()?;
            left = build(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_concat(&mut self) -> PResult<Expr> {
        let mut left = self.parse_additive()?;
        while self.tok == Token::Ampersand {
            self.bump();
            let right = self.parse_additive()?;
            left = Expr::Concat(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let build: fn(Box<Expr>, Box<Expr>) -> Expr = match &self.tok {
                Token::Plus => Expr::Add,
                Token::Minus => Expr::Sub,
                _ => break,
            };
            self.bump();
            let right = self.parse_multiplicative()?;
            left = build(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let build: fn(Box<Expr>, Box<Expr>) -> Expr = match &self.tok {
                Token::Star => Expr::Mul,
                Token::Slash => Expr::Div,
                _ => break,
            };
            self.bump();
            let right = self.parse_unary()?;
            left = build(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        if self.tok == Token::Minus {
            self.bump();
            let operand = self.parse_unary()?;
            return Ok(Expr::negate(operand));
        }
        if self.tok == Token::Plus {
            self.bump();
            return self.parse_unary();
        }

        let mut expr = self.parse_range_level()?;
        // Postfix percent: `50%` desugars to `50 / 100`.
        while self.tok == Token::Percent {
            self.bump();
            expr = Expr::Div(Box::new(expr), Box::new(Expr::Lit(Value::Number(Decimal::from(100)))));
        }
        Ok(expr)
    }

    /// Parses a primary, then resolves a trailing `:primary` into a range
    /// node and any standalone `PolyRef`/`SheetPolyRef` into its resolved form.
    fn parse_range_level(&mut self) -> PResult<Expr> {
        let left = self.parse_primary()?;

        if self.tok == Token::Colon {
            self.bump();
            let right = self.parse_primary()?;
            return combine_range(left, right);
        }

        Ok(resolve_single(left))
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        match self.tok.clone() {
            Token::Number(raw) => {
                self.bump();
                let n = if raw.contains(['e', 'E']) {
                    Decimal::from_scientific(&raw)
                        .map_err(|_| ParseError::UnexpectedToken(raw.clone()))?
                } else {
                    Decimal::from_str(&raw).map_err(|_| ParseError::UnexpectedToken(raw.clone()))?
                };
                Ok(Expr::Lit(Value::Number(n)))
            }
            Token::String(s) => {
                self.bump();
                Ok(Expr::Lit(Value::Text(s)))
            }
            Token::Boolean(b) => {
                self.bump();
                Ok(Expr::Lit(Value::Bool(b)))
            }
            Token::Error(e) => {
                self.bump();
                Ok(Expr::Lit(Value::Error(e)))
            }
            Token::LParen => {
                self.bump();
                let e = self.parse_comparison()?;
                self.expect(&Token::RParen)?;
                Ok(e)
            }
            Token::SheetPrefix(raw_sheet) => {
                self.bump();
                let raw_ref = match self.tok.clone() {
                    Token::Ref(r) => r,
                    other => return Err(ParseError::UnexpectedToken(format!("{other:?}"))),
                };
                self.bump();
                let combined = format!("{raw_sheet}!{raw_ref}");
                match RefType::parse(&combined).map_err(|e| ParseError::InvalidReference(e.to_string()))? {
                    RefType::QualifiedCell(name, aref) => Ok(Expr::SheetPolyRef(name, aref)),
                    _ => Err(ParseError::InvalidReference(combined)),
                }
            }
            Token::Ref(raw) => {
                self.bump();
                match RefType::parse(&raw).map_err(|e| ParseError::InvalidReference(e.to_string()))? {
                    RefType::Cell(aref) => Ok(Expr::PolyRef(aref)),
                    _ => Err(ParseError::InvalidReference(raw)),
                }
            }
            Token::Identifier(name) => {
                self.bump();
                if self.tok == Token::LParen {
                    self.parse_call(name)
                } else {
                    Err(ParseError::InvalidReference(format!(
                        "'{name}' is not a known function or reference"
                    )))
                }
            }
            other => Err(ParseError::UnexpectedToken(format!("{other:?}"))),
        }
    }

    fn parse_call(&mut self, name: String) -> PResult<Expr> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if self.tok != Token::RParen {
            args.push(self.parse_comparison()?);
            while self.tok == Token::Comma {
                self.bump();
                args.push(self.parse_comparison()?);
            }
        }
        self.expect(&Token::RParen)?;

        if let Some(agg) = AggregatorId::from_name(&name) {
            if args.len() != 1 {
                return Err(ParseError::ArgumentCount {
                    function: agg.name().to_string(),
                    expected: "1".to_string(),
                    actual: args.len(),
                });
            }
            let location = match args.into_iter().next().unwrap() {
                Expr::RangeRef(r) => RangeLocation::Local(r),
                Expr::SheetRange(s, r) => RangeLocation::CrossSheet(s, r),
                Expr::Ref(a) => RangeLocation::Local(single_cell_range(a)),
                Expr::SheetRef(s, a) => RangeLocation::CrossSheet(s, single_cell_range(a)),
                other => {
                    return Err(ParseError::InvalidReference(format!(
                        "{} requires a range argument, got {other:?}",
                        agg.name()
                    )))
                }
            };
            return Ok(Expr::Aggregate(agg, location));
        }

        if let Some(spec) = FunctionSpec::from_name(&name) {
            return Ok(Expr::Call(spec, args));
        }

        Err(ParseError::UnknownFunction(name))
    }
}

fn single_cell_range(aref: xlforge_core::ARef) -> CellRange {
    CellRange::single(aref, xlforge_core::Anchor::Relative)
}

fn looks_like_cell_ref(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    if bytes.first() == Some(&b'$') {
        i += 1;
    }
    let letter_start = i;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    if i == letter_start {
        return false;
    }
    if bytes.get(i) == Some(&b'$') {
        i += 1;
    }
    let digit_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    i != digit_start && i == bytes.len()
}

/// A lone `PolyRef`/`SheetPolyRef` (no trailing `:range`) resolves to its
/// single-cell form; anything else passes through unchanged.
fn resolve_single(e: Expr) -> Expr {
    match e {
        Expr::PolyRef(a) => Expr::Ref(a),
        Expr::SheetPolyRef(s, a) => Expr::SheetRef(s, a),
        other => other,
    }
}

fn combine_range(left: Expr, right: Expr) -> PResult<Expr> {
    match (left, right) {
        (Expr::PolyRef(a), Expr::PolyRef(b)) => {
            Ok(Expr::RangeRef(CellRange::new(a, xlforge_core::Anchor::Relative, b, xlforge_core::Anchor::Relative)))
        }
        (Expr::SheetPolyRef(name, a), Expr::PolyRef(b)) => Ok(Expr::SheetRange(
            name,
            CellRange::new(a, xlforge_core::Anchor::Relative, b, xlforge_core::Anchor::Relative),
        )),
        (Expr::SheetPolyRef(n1, a), Expr::SheetPolyRef(n2, b)) => {
            if n1 != n2 {
                return Err(ParseError::InvalidReference(
                    "range endpoints must be on the same sheet".to_string(),
                ));
            }
            Ok(Expr::SheetRange(n1, CellRange::new(a, xlforge_core::Anchor::Relative, b, xlforge_core::Anchor::Relative)))
        }
        (left, right) => Err(ParseError::InvalidReference(format!(
            "invalid range endpoints: {left:?}:{right:?}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xlforge_core::{Column, Row};

    fn aref(r: u32, c: u32) -> xlforge_core::ARef {
        xlforge_core::ARef::new(Row::new(r).unwrap(), Column::new(c).unwrap())
    }

    #[test]
    fn number_literal() {
        assert_eq!(parse_formula("42").unwrap(), Expr::Lit(Value::Number(Decimal::from(42))));
        assert_eq!(
            parse_formula("3.14").unwrap(),
            Expr::Lit(Value::Number(Decimal::from_str("3.14").unwrap()))
        );
        assert!(matches!(parse_formula("1e10").unwrap(), Expr::Lit(Value::Number(_))));
    }

    #[test]
    fn string_literal_with_escaped_quote() {
        assert_eq!(
            parse_formula("\"Hello \"\"World\"\"\"").unwrap(),
            Expr::Lit(Value::Text("Hello \"World\"".to_string()))
        );
    }

    #[test]
    fn arithmetic_precedence() {
        let e = parse_formula("1+2*3").unwrap();
        match e {
            Expr::Add(l, r) => {
                assert_eq!(*l, Expr::Lit(Value::Number(Decimal::from(1))));
                assert!(matches!(*r, Expr::Mul(..)));
            }
            _ => panic!("expected Add"),
        }
    }

    #[test]
    fn unary_minus_desugars_to_subtraction() {
        let e = parse_formula("-5").unwrap();
        assert_eq!(
            e,
            Expr::Sub(
                Box::new(Expr::Lit(Value::Number(Decimal::ZERO))),
                Box::new(Expr::Lit(Value::Number(Decimal::from(5))))
            )
        );
    }

    #[test]
    fn percent_desugars_to_division() {
        let e = parse_formula("50%").unwrap();
        assert!(matches!(e, Expr::Div(..)));
    }

    #[test]
    fn cell_reference_resolves() {
        let e = parse_formula("A1").unwrap();
        assert_eq!(e, Expr::Ref(aref(0, 0)));
    }

    #[test]
    fn range_reference_resolves() {
        let e = parse_formula("A1:B10").unwrap();
        assert_eq!(e, Expr::RangeRef(CellRange::new(aref(0, 0), xlforge_core::Anchor::Relative, aref(9, 1), xlforge_core::Anchor::Relative)));
    }

    #[test]
    fn sheet_qualified_reference() {
        let e = parse_formula("Sheet1!A1").unwrap();
        match e {
            Expr::SheetRef(name, a) => {
                assert_eq!(name.as_str(), "Sheet1");
                assert_eq!(a, aref(0, 0));
            }
            _ => panic!("expected SheetRef"),
        }
    }

    #[test]
    fn quoted_sheet_with_space_and_escaped_quote() {
        let e = parse_formula("'O''Brien''s Sheet'!A1:B2").unwrap();
        match e {
            Expr::SheetRange(name, _) => assert_eq!(name.as_str(), "O'Brien's Sheet"),
            _ => panic!("expected SheetRange"),
        }
    }

    #[test]
    fn aggregate_over_range() {
        let e = parse_formula("SUM(A1:A10)").unwrap();
        assert!(matches!(e, Expr::Aggregate(AggregatorId::Sum, RangeLocation::Local(_))));
    }

    #[test]
    fn aggregate_over_single_cell() {
        let e = parse_formula("SUM(A1)").unwrap();
        assert!(matches!(e, Expr::Aggregate(AggregatorId::Sum, RangeLocation::Local(_))));
    }

    #[test]
    fn aggregate_wrong_arity_errors() {
        assert!(parse_formula("SUM(A1,A2)").is_err());
    }

    #[test]
    fn call_with_multiple_args() {
        let e = parse_formula("IF(A1>0,\"Yes\",\"No\")").unwrap();
        match e {
            Expr::Call(FunctionSpec::If, args) => assert_eq!(args.len(), 3),
            _ => panic!("expected Call(If, ..)"),
        }
    }

    #[test]
    fn nested_calls() {
        let e = parse_formula("IF(AND(A1>0,B1<100),A1*B1,0)").unwrap();
        assert!(matches!(e, Expr::Call(FunctionSpec::If, _)));
    }

    #[test]
    fn unknown_function_errors() {
        assert!(matches!(parse_formula("NOTAFUNCTION(1)"), Err(ParseError::UnknownFunction(_))));
    }

    #[test]
    fn bare_identifier_errors() {
        assert!(parse_formula("MyNamedRange").is_err());
    }

    #[test]
    fn unbalanced_parens_errors() {
        assert!(parse_formula("(1+2").is_err());
    }

    #[test]
    fn error_literal() {
        assert_eq!(
            parse_formula("#DIV/0!").unwrap(),
            Expr::Lit(Value::Error(xlforge_core::CellError::Div0))
        );
    }

    #[test]
    fn formula_length_limit_enforced() {
        let huge = "1".repeat(MAX_FORMULA_LEN + 1);
        assert!(matches!(parse_formula(&huge), Err(ParseError::TooLong(_))));
    }
}
