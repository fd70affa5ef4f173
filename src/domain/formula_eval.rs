//! Formula evaluation against a step context.
//!
//! Pure functions. `evaluate` reports typing and resolution problems;
//! `evaluate_condition` and `evaluate_price` are the lenient entry points the
//! engine uses, where a failed formula means "condition not met" and "keep the
//! previous value" respectively.

use crate::domain::context::StepContext;
use crate::domain::formula::{BinaryOp, Expr, UnaryOp, Value};

#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct EvalError {
    pub message: String,
}

fn eval_error(message: String) -> EvalError {
    EvalError { message }
}

fn number_operand(value: Value, op: BinaryOp) -> Result<f64, EvalError> {
    match value {
        Value::Number(n) => Ok(n),
        other => Err(eval_error(format!(
            "operator '{}' needs a number, got {}",
            op.symbol(),
            other.type_name()
        ))),
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Truth(b) => *b,
        Value::Number(n) => *n != 0.0 && !n.is_nan(),
        Value::Text(s) => !s.is_empty(),
    }
}

fn compare(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    use BinaryOp::*;
    let result = match (&left, &right) {
        (Value::Number(a), Value::Number(b)) => match op {
            Equal => a == b,
            NotEqual => a != b,
            Less => a < b,
            LessEqual => a <= b,
            Greater => a > b,
            GreaterEqual => a >= b,
            _ => unreachable!(),
        },
        (Value::Text(a), Value::Text(b)) => match op {
            Equal => a == b,
            NotEqual => a != b,
            _ => {
                return Err(eval_error(format!(
                    "operator '{}' cannot order text values",
                    op.symbol()
                )));
            }
        },
        (Value::Truth(a), Value::Truth(b)) => match op {
            Equal => a == b,
            NotEqual => a != b,
            _ => {
                return Err(eval_error(format!(
                    "operator '{}' cannot order truth values",
                    op.symbol()
                )));
            }
        },
        _ => {
            return Err(eval_error(format!(
                "operator '{}' cannot compare {} with {}",
                op.symbol(),
                left.type_name(),
                right.type_name()
            )));
        }
    };
    Ok(Value::Truth(result))
}

/// Evaluate an expression. Division follows IEEE semantics so a zero divisor
/// yields an infinity rather than an error.
pub fn evaluate(expr: &Expr, ctx: &StepContext<'_>) -> Result<Value, EvalError> {
    match expr {
        Expr::Number(n) => Ok(Value::Number(*n)),
        Expr::Text(s) => Ok(Value::Text(s.clone())),
        Expr::Truth(b) => Ok(Value::Truth(*b)),
        Expr::Path(parts) => ctx
            .resolve(parts)
            .ok_or_else(|| eval_error(format!("unresolved reference '{}'", parts.join(".")))),
        Expr::Unary { op, operand } => {
            let value = evaluate(operand, ctx)?;
            match op {
                UnaryOp::Negate => match value {
                    Value::Number(n) => Ok(Value::Number(-n)),
                    other => Err(eval_error(format!(
                        "unary '-' needs a number, got {}",
                        other.type_name()
                    ))),
                },
                UnaryOp::Not => Ok(Value::Truth(!truthy(&value))),
            }
        }
        Expr::Binary { op, left, right } => match op {
            BinaryOp::And => {
                let l = evaluate(left, ctx)?;
                if !truthy(&l) {
                    return Ok(Value::Truth(false));
                }
                let r = evaluate(right, ctx)?;
                Ok(Value::Truth(truthy(&r)))
            }
            BinaryOp::Or => {
                let l = evaluate(left, ctx)?;
                if truthy(&l) {
                    return Ok(Value::Truth(true));
                }
                let r = evaluate(right, ctx)?;
                Ok(Value::Truth(truthy(&r)))
            }
            BinaryOp::Add | BinaryOp::Subtract | BinaryOp::Multiply | BinaryOp::Divide => {
                let a = number_operand(evaluate(left, ctx)?, *op)?;
                let b = number_operand(evaluate(right, ctx)?, *op)?;
                let result = match op {
                    BinaryOp::Add => a + b,
                    BinaryOp::Subtract => a - b,
                    BinaryOp::Multiply => a * b,
                    BinaryOp::Divide => a / b,
                    _ => unreachable!(),
                };
                Ok(Value::Number(result))
            }
            _ => {
                let l = evaluate(left, ctx)?;
                let r = evaluate(right, ctx)?;
                compare(*op, l, r)
            }
        },
    }
}

/// Evaluate a condition formula. Any evaluation failure counts as false.
pub fn evaluate_condition(expr: &Expr, ctx: &StepContext<'_>) -> bool {
    match evaluate(expr, ctx) {
        Ok(value) => truthy(&value),
        Err(_) => false,
    }
}

/// Evaluate a pricing formula. `None` means the formula failed and the caller
/// keeps its previous value. A non-finite number is still returned; the
/// engine normalizes it.
pub fn evaluate_price(expr: &Expr, ctx: &StepContext<'_>) -> Option<f64> {
    match evaluate(expr, ctx) {
        Ok(Value::Number(n)) => Some(n),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candle::Candle;
    use crate::domain::context::Scalars;
    use crate::domain::formula_parser::parse;
    use crate::domain::repository::Linked;
    use approx::assert_relative_eq;

    fn candle(begin: i64, open: f64, close: f64) -> Candle {
        Candle {
            open,
            close,
            min: open.min(close),
            max: open.max(close),
            begin,
            end: begin + 59_999,
            direction: Candle::body_direction(open, close),
        }
    }

    fn context<'a>(current: &'a Candle, previous: Option<&'a Candle>) -> StepContext<'a> {
        StepContext {
            candle: Linked { current, previous },
            percentage_bandwidth: None,
            bollinger_band: None,
            lrc: None,
            channel: None,
            sub_channel: None,
            scalars: Scalars {
                position_rate: 100.0,
                stop_loss: 95.0,
                ..Scalars::default()
            },
        }
    }

    #[test]
    fn arithmetic() {
        let current = candle(0, 100.0, 105.0);
        let ctx = context(&current, None);
        let expr = parse("candle.close * 2 - 10").unwrap();
        match evaluate(&expr, &ctx).unwrap() {
            Value::Number(n) => assert_relative_eq!(n, 200.0),
            other => panic!("expected number, got {:?}", other),
        }
    }

    #[test]
    fn comparison_against_previous() {
        let prev = candle(0, 90.0, 100.0);
        let current = candle(60_000, 100.0, 105.0);
        let ctx = context(&current, Some(&prev));
        let expr = parse("candle.close > candle.previous.close").unwrap();
        assert!(evaluate_condition(&expr, &ctx));
    }

    #[test]
    fn text_equality() {
        let current = candle(0, 100.0, 105.0);
        let ctx = context(&current, None);
        assert!(evaluate_condition(
            &parse("candle.direction == 'up'").unwrap(),
            &ctx
        ));
        assert!(!evaluate_condition(
            &parse("candle.direction == 'down'").unwrap(),
            &ctx
        ));
    }

    #[test]
    fn unresolved_reference_means_false() {
        let current = candle(0, 100.0, 105.0);
        let ctx = context(&current, None);
        // No previous candle, so the reference cannot resolve.
        assert!(!evaluate_condition(
            &parse("candle.previous.close < candle.close").unwrap(),
            &ctx
        ));
    }

    #[test]
    fn type_error_means_false() {
        let current = candle(0, 100.0, 105.0);
        let ctx = context(&current, None);
        assert!(!evaluate_condition(
            &parse("candle.direction > 1").unwrap(),
            &ctx
        ));
    }

    #[test]
    fn short_circuit_skips_bad_right_side() {
        let current = candle(0, 100.0, 105.0);
        let ctx = context(&current, None);
        let expr = parse("candle.close < 0 && candle.previous.close > 0").unwrap();
        assert!(!evaluate_condition(&expr, &ctx));
        let expr = parse("candle.close > 0 || candle.previous.close > 0").unwrap();
        assert!(evaluate_condition(&expr, &ctx));
    }

    #[test]
    fn price_formula_uses_scalars() {
        let current = candle(0, 100.0, 105.0);
        let ctx = context(&current, None);
        let expr = parse("positionRate - positionRate * 0.02").unwrap();
        assert_relative_eq!(evaluate_price(&expr, &ctx).unwrap(), 98.0);
    }

    #[test]
    fn price_failure_is_none() {
        let current = candle(0, 100.0, 105.0);
        let ctx = context(&current, None);
        assert_eq!(evaluate_price(&parse("candle.volume * 2").unwrap(), &ctx), None);
        assert_eq!(
            evaluate_price(&parse("candle.close > 100").unwrap(), &ctx),
            None
        );
    }

    #[test]
    fn division_by_zero_is_infinite_not_error() {
        let current = candle(0, 100.0, 105.0);
        let ctx = context(&current, None);
        let value = evaluate_price(&parse("candle.close / 0").unwrap(), &ctx).unwrap();
        assert!(value.is_infinite());
    }

    #[test]
    fn numeric_truthiness() {
        let current = candle(0, 100.0, 105.0);
        let ctx = context(&current, None);
        assert!(evaluate_condition(&parse("candle.close").unwrap(), &ctx));
        assert!(!evaluate_condition(&parse("0").unwrap(), &ctx));
    }
}
