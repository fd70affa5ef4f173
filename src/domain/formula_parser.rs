//! Formula parser.
//!
//! Recursive descent with precedence climbing. Converts formula text to an
//! expression tree with errors that carry a character offset.
//!
//! Precedence, loosest first: `||`, `&&`, comparisons, `+ -`, `* /`, unary
//! `- !`, primary. Comparisons do not chain: `a < b < c` is a parse error.

use crate::domain::error::ParseError;
use crate::domain::formula::{BinaryOp, Expr, UnaryOp};

struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn consume_exact(&mut self, s: &str) -> bool {
        if self.remaining().starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some(ch) if ch == expected => {
                self.advance();
                Ok(())
            }
            Some(ch) => Err(ParseError {
                message: format!("expected '{}', found '{}'", expected, ch),
                position: self.pos,
            }),
            None => Err(ParseError {
                message: format!("expected '{}', found end of input", expected),
                position: self.pos,
            }),
        }
    }

    fn peek_word(&self) -> String {
        let mut word = String::new();
        for ch in self.remaining().chars() {
            if ch.is_alphanumeric() || ch == '_' {
                word.push(ch);
            } else {
                break;
            }
        }
        if word.is_empty() {
            self.peek()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "end of input".to_string())
        } else {
            word
        }
    }

    fn parse_number(&mut self) -> Result<f64, ParseError> {
        let start = self.pos;
        let mut has_dot = false;
        let mut digits = 0;

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                digits += 1;
                self.advance();
            } else if ch == '.' && !has_dot {
                has_dot = true;
                self.advance();
            } else {
                break;
            }
        }

        if digits == 0 {
            return Err(ParseError {
                message: "expected number".to_string(),
                position: start,
            });
        }

        let num_str = &self.input[start..self.pos];
        num_str.parse::<f64>().map_err(|_| ParseError {
            message: format!("invalid number: {}", num_str),
            position: start,
        })
    }

    fn parse_text_literal(&mut self, quote: char) -> Result<Expr, ParseError> {
        let start = self.pos;
        self.advance();
        let mut text = String::new();
        loop {
            match self.advance() {
                Some(ch) if ch == quote => return Ok(Expr::Text(text)),
                Some(ch) => text.push(ch),
                None => {
                    return Err(ParseError {
                        message: "unterminated text literal".to_string(),
                        position: start,
                    });
                }
            }
        }
    }

    fn parse_path(&mut self) -> Result<Expr, ParseError> {
        let mut parts = Vec::new();
        loop {
            let word = self.peek_word();
            if word.is_empty() || !word.chars().next().is_some_and(|c| c.is_alphabetic()) {
                return Err(ParseError {
                    message: format!("expected identifier, found '{}'", word),
                    position: self.pos,
                });
            }
            self.pos += word.len();
            parts.push(word);
            if self.peek() == Some('.') {
                self.advance();
            } else {
                break;
            }
        }
        match parts[0].as_str() {
            "true" if parts.len() == 1 => Ok(Expr::Truth(true)),
            "false" if parts.len() == 1 => Ok(Expr::Truth(false)),
            _ => Ok(Expr::Path(parts)),
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        self.skip_whitespace();
        match self.peek() {
            Some('(') => {
                self.advance();
                let expr = self.parse_or()?;
                self.expect_char(')')?;
                Ok(expr)
            }
            Some(q @ ('\'' | '"')) => self.parse_text_literal(q),
            Some(ch) if ch.is_ascii_digit() || ch == '.' => {
                let num = self.parse_number()?;
                Ok(Expr::Number(num))
            }
            Some(ch) if ch.is_alphabetic() => self.parse_path(),
            _ => Err(ParseError {
                message: format!("expected operand, found '{}'", self.peek_word()),
                position: self.pos,
            }),
        }
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        self.skip_whitespace();
        if self.peek() == Some('-') {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Negate,
                operand: Box::new(operand),
            });
        }
        if self.peek() == Some('!') && !self.remaining().starts_with("!=") {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                operand: Box::new(operand),
            });
        }
        self.parse_primary()
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_unary()?;
        loop {
            self.skip_whitespace();
            let op = match self.peek() {
                Some('*') => BinaryOp::Multiply,
                Some('/') => BinaryOp::Divide,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_sum(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_term()?;
        loop {
            self.skip_whitespace();
            let op = match self.peek() {
                Some('+') => BinaryOp::Add,
                Some('-') => BinaryOp::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let left = self.parse_sum()?;
        self.skip_whitespace();
        let op = if self.consume_exact("==") {
            BinaryOp::Equal
        } else if self.consume_exact("!=") {
            BinaryOp::NotEqual
        } else if self.consume_exact("<=") {
            BinaryOp::LessEqual
        } else if self.consume_exact(">=") {
            BinaryOp::GreaterEqual
        } else if self.peek() == Some('<') {
            self.advance();
            BinaryOp::Less
        } else if self.peek() == Some('>') {
            self.advance();
            BinaryOp::Greater
        } else {
            return Ok(left);
        };
        let right = self.parse_sum()?;
        Ok(Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_comparison()?;
        loop {
            self.skip_whitespace();
            if !self.remaining().starts_with("&&") {
                break;
            }
            self.pos += 2;
            let right = self.parse_comparison()?;
            left = Expr::Binary {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;
        loop {
            self.skip_whitespace();
            if !self.remaining().starts_with("||") {
                break;
            }
            self.pos += 2;
            let right = self.parse_and()?;
            left = Expr::Binary {
                op: BinaryOp::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_or()?;
        self.skip_whitespace();
        if self.pos < self.input.len() {
            return Err(ParseError {
                message: format!("unexpected input after formula: '{}'", self.remaining()),
                position: self.pos,
            });
        }
        Ok(expr)
    }
}

pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(input);
    parser.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_number_literal() {
        let expr = parse("1.5").unwrap();
        assert!(matches!(expr, Expr::Number(n) if (n - 1.5).abs() < f64::EPSILON));
    }

    #[test]
    fn parse_simple_path() {
        let expr = parse("candle.close").unwrap();
        assert_eq!(expr, Expr::Path(vec!["candle".into(), "close".into()]));
    }

    #[test]
    fn parse_previous_path() {
        let expr = parse("candle.previous.close").unwrap();
        assert_eq!(
            expr,
            Expr::Path(vec!["candle".into(), "previous".into(), "close".into()])
        );
    }

    #[test]
    fn parse_comparison_expr() {
        let expr = parse("candle.close > candle.previous.close").unwrap();
        assert!(matches!(
            expr,
            Expr::Binary {
                op: BinaryOp::Greater,
                ..
            }
        ));
    }

    #[test]
    fn parse_text_comparison() {
        let expr = parse("channel.direction == 'up'").unwrap();
        match expr {
            Expr::Binary {
                op: BinaryOp::Equal,
                right,
                ..
            } => assert_eq!(*right, Expr::Text("up".into())),
            _ => panic!("expected equality"),
        }
    }

    #[test]
    fn parse_double_quoted_text() {
        let expr = parse("subChannel.direction != \"down\"").unwrap();
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::NotEqual, .. }));
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let expr = parse("1 + 2 * 3").unwrap();
        match expr {
            Expr::Binary {
                op: BinaryOp::Add,
                right,
                ..
            } => assert!(matches!(
                *right,
                Expr::Binary {
                    op: BinaryOp::Multiply,
                    ..
                }
            )),
            _ => panic!("expected addition at the root"),
        }
    }

    #[test]
    fn and_binds_tighter_than_or() {
        let expr = parse("a > 1 || b > 2 && c > 3").unwrap();
        match expr {
            Expr::Binary {
                op: BinaryOp::Or,
                right,
                ..
            } => assert!(matches!(
                *right,
                Expr::Binary {
                    op: BinaryOp::And,
                    ..
                }
            )),
            _ => panic!("expected or at the root"),
        }
    }

    #[test]
    fn parse_parenthesized() {
        let expr = parse("(1 + 2) * 3").unwrap();
        assert!(matches!(
            expr,
            Expr::Binary {
                op: BinaryOp::Multiply,
                ..
            }
        ));
    }

    #[test]
    fn parse_unary_negation() {
        let expr = parse("-candle.close").unwrap();
        assert!(matches!(
            expr,
            Expr::Unary {
                op: UnaryOp::Negate,
                ..
            }
        ));
    }

    #[test]
    fn parse_logical_not() {
        let expr = parse("!(candle.close > 100)").unwrap();
        assert!(matches!(
            expr,
            Expr::Unary {
                op: UnaryOp::Not,
                ..
            }
        ));
    }

    #[test]
    fn not_does_not_swallow_not_equal() {
        let expr = parse("percentageBandwidth.bandwidth != 0").unwrap();
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::NotEqual, .. }));
    }

    #[test]
    fn parse_truth_literals() {
        assert_eq!(parse("true").unwrap(), Expr::Truth(true));
        assert_eq!(parse("false").unwrap(), Expr::Truth(false));
    }

    #[test]
    fn parse_stop_loss_formula() {
        let expr = parse("positionRate - bollingerBand.deviation * 2").unwrap();
        assert!(matches!(
            expr,
            Expr::Binary {
                op: BinaryOp::Subtract,
                ..
            }
        ));
    }

    #[test]
    fn error_unterminated_text() {
        let err = parse("channel.direction == 'up").unwrap_err();
        assert!(err.message.contains("unterminated"));
    }

    #[test]
    fn error_trailing_input() {
        let err = parse("candle.close > 100 garbage").unwrap_err();
        assert!(err.message.contains("unexpected input"));
    }

    #[test]
    fn error_missing_operand() {
        let err = parse("candle.close > ").unwrap_err();
        assert!(err.message.contains("expected operand"));
        assert_eq!(err.position, 15);
    }

    #[test]
    fn error_missing_paren() {
        let err = parse("(candle.close > 100").unwrap_err();
        assert!(err.message.contains("expected ')'"));
    }

    #[test]
    fn error_chained_comparison() {
        assert!(parse("1 < 2 < 3").is_err());
    }

    #[test]
    fn error_empty_input() {
        let err = parse("").unwrap_err();
        assert_eq!(err.position, 0);
    }

    #[test]
    fn error_caret_lands_on_offence() {
        let input = "candle.close >> 100";
        let err = parse(input).unwrap_err();
        let ctx = err.display_with_context(input);
        assert!(ctx.contains('^'));
    }

    proptest! {
        #[test]
        fn numbers_round_trip(n in 0.0f64..1_000_000.0) {
            let text = format!("{}", n);
            let expr = parse(&text).unwrap();
            prop_assert!(matches!(expr, Expr::Number(parsed) if (parsed - n).abs() < 1e-9));
        }

        #[test]
        fn arbitrary_input_never_panics(s in ".{0,64}") {
            let _ = parse(&s);
        }
    }
}
