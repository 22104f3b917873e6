//! Arithmetic expression evaluator

use super::{AgentTool, ToolOutcome, ToolSpec};
use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalcError {
    #[error("unexpected character '{0}'")]
    UnexpectedChar(char),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),

    #[error("unknown name '{0}'")]
    UnknownName(String),

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NotFinite,

    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),
}

/// Nesting limit for parentheses, signs and exponents
pub const MAX_DEPTH: usize = 256;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Number(n) => write!(f, "{}", n),
            Token::Ident(s) => write!(f, "{}", s),
            Token::Op(c) => write!(f, "{}", c),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
        }
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, CalcError> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '0'..='9' | '.' => {
                let mut literal = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() || d == '.' {
                        literal.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let value = literal
                    .parse::<f64>()
                    .map_err(|_| CalcError::UnexpectedToken(literal.clone()))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_alphanumeric() || d == '_' {
                        ident.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident.to_lowercase()));
            }
            '+' | '-' | '*' | '/' | '%' | '^' => {
                tokens.push(Token::Op(c));
                chars.next();
            }
            '×' => {
                tokens.push(Token::Op('*'));
                chars.next();
            }
            '÷' => {
                tokens.push(Token::Op('/'));
                chars.next();
            }
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            other => return Err(CalcError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

/// Recursive descent over
/// `expr := term (('+'|'-') term)*`,
/// `term := unary (('*'|'/'|'%') unary)*`,
/// `unary := '-' unary | power`,
/// `power := atom ('^' unary)?`
struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expr(&mut self) -> Result<f64, CalcError> {
        let mut value = self.term()?;
        while let Some(Token::Op(op @ ('+' | '-'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == '+' { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> Result<f64, CalcError> {
        let mut value = self.unary()?;
        while let Some(Token::Op(op @ ('*' | '/' | '%'))) = self.peek().cloned() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                '*' => value * rhs,
                _ if rhs == 0.0 => return Err(CalcError::DivisionByZero),
                '/' => value / rhs,
                _ => value % rhs,
            };
        }
        Ok(value)
    }

    /// Depth guard: every recursive path passes through `unary`
    fn unary(&mut self) -> Result<f64, CalcError> {
        if self.depth >= MAX_DEPTH {
            return Err(CalcError::TooDeep(MAX_DEPTH));
        }
        self.depth += 1;
        let result = self.signed();
        self.depth -= 1;
        result
    }

    fn signed(&mut self) -> Result<f64, CalcError> {
        match self.peek() {
            Some(Token::Op('-')) => {
                self.pos += 1;
                Ok(-self.unary()?)
            }
            Some(Token::Op('+')) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<f64, CalcError> {
        let base = self.atom()?;
        if let Some(Token::Op('^')) = self.peek() {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<f64, CalcError> {
        match self.next() {
            Some(Token::Number(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expr()?;
                self.expect_rparen()?;
                Ok(value)
            }
            Some(Token::Ident(name)) => match name.as_str() {
                "pi" => Ok(std::f64::consts::PI),
                "e" => Ok(std::f64::consts::E),
                _ => {
                    let function = function(&name).ok_or_else(|| CalcError::UnknownName(name.clone()))?;
                    match self.next() {
                        Some(Token::LParen) => {}
                        Some(other) => return Err(CalcError::UnexpectedToken(other.to_string())),
                        None => return Err(CalcError::UnexpectedEnd),
                    }
                    let argument = self.expr()?;
                    self.expect_rparen()?;
                    Ok(function(argument))
                }
            },
            Some(other) => Err(CalcError::UnexpectedToken(other.to_string())),
            None => Err(CalcError::UnexpectedEnd),
        }
    }

    fn expect_rparen(&mut self) -> Result<(), CalcError> {
        match self.next() {
            Some(Token::RParen) => Ok(()),
            Some(other) => Err(CalcError::UnexpectedToken(other.to_string())),
            None => Err(CalcError::UnexpectedEnd),
        }
    }
}

fn function(name: &str) -> Option<fn(f64) -> f64> {
    Some(match name {
        "sqrt" => f64::sqrt,
        "abs" => f64::abs,
        "sin" => f64::sin,
        "cos" => f64::cos,
        "tan" => f64::tan,
        "ln" => f64::ln,
        "log" => f64::log10,
        _ => return None,
    })
}

/// Evaluate an arithmetic expression
pub fn evaluate(expression: &str) -> Result<f64, CalcError> {
    let mut parser = Parser {
        tokens: tokenize(expression)?,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if let Some(extra) = parser.peek() {
        return Err(CalcError::UnexpectedToken(extra.to_string()));
    }
    if !value.is_finite() {
        return Err(CalcError::NotFinite);
    }
    Ok(value)
}

/// Whole numbers print without a fractional part
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

pub struct CalculatorTool;

#[async_trait]
impl AgentTool for CalculatorTool {
    fn spec(&self) -> ToolSpec {
        ToolSpec::new(
            "calculator",
            "Evaluate an arithmetic expression. Supports + - * / % ^, parentheses, \
             sqrt, abs, sin, cos, tan, ln, log and the constants pi and e.",
            json!({
                "type": "object",
                "properties": {
                    "expression": {
                        "type": "string",
                        "description": "Expression to evaluate, e.g. \"(3 + 4) * 2\""
                    }
                },
                "required": ["expression"]
            }),
        )
    }

    async fn invoke(&self, input: Value) -> ToolOutcome {
        let Some(expression) = input.get("expression").and_then(Value::as_str) else {
            return ToolOutcome::error("missing required 'expression' string");
        };

        match evaluate(expression) {
            Ok(value) => ToolOutcome::success(format!("Result: {}", format_number(value))),
            Err(e) => ToolOutcome::error(format!("Error evaluating '{}': {}", expression, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ToolStatus;

    fn approx(expression: &str, expected: f64) {
        let value = evaluate(expression).unwrap();
        assert!((value - expected).abs() < 1e-9, "{} = {} (expected {})", expression, value, expected);
    }

    // ============== Evaluation Tests ==============

    #[test]
    fn test_precedence() {
        approx("2 + 3 * 4", 14.0);
        approx("(2 + 3) * 4", 20.0);
        approx("10 - 4 - 3", 3.0);
        approx("20 / 4 / 5", 1.0);
        approx("7 % 4", 3.0);
    }

    #[test]
    fn test_power_is_right_associative() {
        approx("2 ^ 3 ^ 2", 512.0);
        approx("-2 ^ 2", -4.0);
        approx("2 ^ -1", 0.5);
    }

    #[test]
    fn test_functions_and_constants() {
        approx("sqrt(16) + abs(-3)", 7.0);
        approx("cos(0)", 1.0);
        approx("log(1000)", 3.0);
        approx("ln(e)", 1.0);
        approx("2 * pi", std::f64::consts::TAU);
    }

    #[test]
    fn test_unicode_operators() {
        approx("6 × 7", 42.0);
        approx("9 ÷ 3", 3.0);
    }

    // ============== Error Tests ==============

    #[test]
    fn test_division_by_zero() {
        assert_eq!(evaluate("1 / 0"), Err(CalcError::DivisionByZero));
        assert_eq!(evaluate("5 % (2 - 2)"), Err(CalcError::DivisionByZero));
    }

    #[test]
    fn test_syntax_errors() {
        assert_eq!(evaluate("2 +"), Err(CalcError::UnexpectedEnd));
        assert_eq!(evaluate("(1 + 2"), Err(CalcError::UnexpectedEnd));
        assert_eq!(evaluate("1 2"), Err(CalcError::UnexpectedToken("2".into())));
        assert_eq!(evaluate("2 $ 3"), Err(CalcError::UnexpectedChar('$')));
        assert_eq!(evaluate("foo(1)"), Err(CalcError::UnknownName("foo".into())));
    }

    #[test]
    fn test_not_finite() {
        assert_eq!(evaluate("sqrt(-1)"), Err(CalcError::NotFinite));
    }

    // ============== Tool Tests ==============

    #[tokio::test]
    async fn test_tool_formats_whole_numbers() {
        let outcome = CalculatorTool.invoke(json!({"expression": "12 * 12"})).await;
        assert_eq!(outcome.status, ToolStatus::Success);
        assert_eq!(outcome.content, vec!["Result: 144"]);
    }

    #[tokio::test]
    async fn test_tool_reports_errors() {
        let outcome = CalculatorTool.invoke(json!({"expression": "1/0"})).await;
        assert_eq!(outcome.status, ToolStatus::Error);
        assert!(outcome.content[0].contains("division by zero"));

        let outcome = CalculatorTool.invoke(json!({})).await;
        assert_eq!(outcome.status, ToolStatus::Error);
    }

    mod edge_cases {
        use super::*;

        #[test]
        fn test_empty_expression() {
            assert_eq!(evaluate(""), Err(CalcError::UnexpectedEnd));
        }

        #[test]
        fn test_case_insensitive_names() {
            approx("SQRT(4) + PI - pi", 2.0);
        }

        #[test]
        fn test_fractional_result_keeps_decimals() {
            assert_eq!(format_number(2.5), "2.5");
            assert_eq!(format_number(-3.0), "-3");
        }

        #[test]
        fn test_deep_nesting_is_rejected() {
            let parens = format!("{}1{}", "(".repeat(5_000), ")".repeat(5_000));
            assert_eq!(evaluate(&parens), Err(CalcError::TooDeep(MAX_DEPTH)));

            let signs = format!("{}1", "-".repeat(5_000));
            assert_eq!(evaluate(&signs), Err(CalcError::TooDeep(MAX_DEPTH)));

            let powers = format!("1{}", "^1".repeat(5_000));
            assert_eq!(evaluate(&powers), Err(CalcError::TooDeep(MAX_DEPTH)));
        }

        #[test]
        fn test_moderate_nesting_still_evaluates() {
            approx(&format!("{}2{}", "(".repeat(100), ")".repeat(100)), 2.0);
        }

        #[test]
        fn test_malformed_number() {
            assert!(matches!(evaluate("1.2.3"), Err(CalcError::UnexpectedToken(_))));
        }
    }
}
