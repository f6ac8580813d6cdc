//! Math tools: dice, primality and arithmetic.

use super::error::{Result, ToolError};
use super::r#trait::{Tool, ToolCategory, ToolResult, optional_i64, required_i64, required_str};
use async_trait::async_trait;
use rand::Rng;
use serde_json::{Value, json};

pub const MAX_DICE: i64 = 100;

/// Largest number `is_prime` will trial-divide.
pub const MAX_PRIME_INPUT: i64 = 1_000_000_000_000;

/// Nesting limit for parentheses and unary signs in `calculate`.
pub const MAX_EXPRESSION_DEPTH: usize = 256;

pub struct RollDiceTool;

#[async_trait]
impl Tool for RollDiceTool {
    fn name(&self) -> &str {
        "roll_dice"
    }

    fn description(&self) -> &str {
        "Roll one or more dice with specified number of sides"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Math
    }

    fn examples(&self) -> Vec<String> {
        vec![
            "Roll 2 six-sided dice".to_string(),
            "Roll a 20-sided die".to_string(),
        ]
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "sides": {"type": "integer", "description": "Sides per die", "default": 6},
                "count": {"type": "integer", "description": "Number of dice", "default": 1}
            },
            "required": []
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let sides = optional_i64(&input, "sides", 6)?;
        let count = optional_i64(&input, "count", 1)?;
        if sides < 2 {
            return Err(ToolError::InvalidInput(
                "Dice must have at least 2 sides".to_string(),
            ));
        }
        if count < 1 {
            return Err(ToolError::InvalidInput("Must roll at least 1 die".to_string()));
        }
        if count > MAX_DICE {
            return Err(ToolError::InvalidInput(format!(
                "Cannot roll more than {MAX_DICE} dice at once"
            )));
        }

        let mut rng = rand::rng();
        let rolls: Vec<i64> = (0..count).map(|_| rng.random_range(1..=sides)).collect();
        let total: i64 = rolls.iter().sum();

        Ok(ToolResult::success(json!({
            "rolls": rolls,
            "total": total,
            "count": count,
            "sides": sides,
            "average": total as f64 / count as f64,
        })))
    }
}

pub struct IsPrimeTool;

/// Smallest divisor of `n` in `2..=sqrt(n)`, if any.
fn smallest_divisor(n: i64) -> Option<i64> {
    let mut i = 2i64;
    while i.checked_mul(i).is_some_and(|sq| sq <= n) {
        if n % i == 0 {
            return Some(i);
        }
        i += 1;
    }
    None
}

#[async_trait]
impl Tool for IsPrimeTool {
    fn name(&self) -> &str {
        "is_prime"
    }

    fn description(&self) -> &str {
        "Check if a number is prime"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Math
    }

    fn examples(&self) -> Vec<String> {
        vec!["Is 17 prime?".to_string(), "Check if 100 is prime".to_string()]
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "number": {"type": "integer", "description": "The number to check"}
            },
            "required": ["number"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let number = required_i64(&input, "number")?;
        if number > MAX_PRIME_INPUT {
            return Err(ToolError::InvalidInput(format!(
                "'number' must be at most {MAX_PRIME_INPUT}"
            )));
        }
        if number < 2 {
            return Ok(ToolResult::success(json!({
                "number": number,
                "is_prime": false,
                "reason": "Numbers less than 2 are not prime",
            })));
        }
        let output = match smallest_divisor(number) {
            Some(d) => json!({
                "number": number,
                "is_prime": false,
                "reason": format!("{number} is divisible by {d}"),
            }),
            None => json!({
                "number": number,
                "is_prime": true,
                "reason": format!("{number} is prime!"),
            }),
        };
        Ok(ToolResult::success(output))
    }
}

pub struct CalculateTool;

#[async_trait]
impl Tool for CalculateTool {
    fn name(&self) -> &str {
        "calculate"
    }

    fn description(&self) -> &str {
        "Evaluate a mathematical expression"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Math
    }

    fn examples(&self) -> Vec<String> {
        vec!["Calculate 25 * 4".to_string(), "What is 100 / 5?".to_string()]
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "expression": {
                    "type": "string",
                    "description": "Arithmetic expression, e.g. \"2 + 2\" or \"(3 + 4) ^ 2\""
                }
            },
            "required": ["expression"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let expression = required_str(&input, "expression")?;
        Ok(match evaluate(expression) {
            Ok(result) => ToolResult::success(json!({
                "expression": expression,
                "result": number_value(result),
                "success": true,
            })),
            Err(e) => ToolResult::failure(json!({
                "expression": expression,
                "error": e,
                "success": false,
            })),
        })
    }
}

/// Integral results render as integers.
fn number_value(x: f64) -> Value {
    if x.fract() == 0.0 && x.abs() < 1e15 {
        json!(x as i64)
    } else {
        json!(x)
    }
}

// ─── Expression Parser ───────────────────────────────────────
//
// expr    := term (('+' | '-') term)*
// term    := unary (('*' | '/' | '%') unary)*
// unary   := ('-' | '+') unary | power
// power   := primary (('^' | '**') unary)?
// primary := number | '(' expr ')'

#[derive(Debug, Clone, Copy, PartialEq)]
enum Token {
    Num(f64),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> std::result::Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = input.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' => {}
            '+' => tokens.push(Token::Plus),
            '-' => tokens.push(Token::Minus),
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Caret);
                i += 1;
            }
            '*' | 'x' | '×' => tokens.push(Token::Star),
            '/' | '÷' => tokens.push(Token::Slash),
            '%' => tokens.push(Token::Percent),
            '^' => tokens.push(Token::Caret),
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            d if d.is_ascii_digit() || d == '.' => {
                let start = i;
                while i + 1 < chars.len() && (chars[i + 1].is_ascii_digit() || chars[i + 1] == '.')
                {
                    i += 1;
                }
                let literal: String = chars[start..=i].iter().collect();
                let n = literal
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number '{literal}'"))?;
                tokens.push(Token::Num(n));
            }
            other => return Err(format!("unexpected character '{other}'")),
        }
        i += 1;
    }
    Ok(tokens)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<Token> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token> {
        let t = self.peek();
        self.pos += 1;
        t
    }

    fn expr(&mut self) -> std::result::Result<f64, String> {
        let mut value = self.term()?;
        while let Some(op @ (Token::Plus | Token::Minus)) = self.peek() {
            self.pos += 1;
            let rhs = self.term()?;
            value = if op == Token::Plus { value + rhs } else { value - rhs };
        }
        Ok(value)
    }

    fn term(&mut self) -> std::result::Result<f64, String> {
        let mut value = self.unary()?;
        while let Some(op @ (Token::Star | Token::Slash | Token::Percent)) = self.peek() {
            self.pos += 1;
            let rhs = self.unary()?;
            value = match op {
                Token::Star => value * rhs,
                _ if rhs == 0.0 => return Err("division by zero".to_string()),
                Token::Slash => value / rhs,
                _ => value.rem_euclid(rhs),
            };
        }
        Ok(value)
    }

    fn unary(&mut self) -> std::result::Result<f64, String> {
        // every recursive path passes through here
        self.depth += 1;
        if self.depth > MAX_EXPRESSION_DEPTH {
            return Err("expression nested too deeply".to_string());
        }
        let value = match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                self.unary().map(|v| -v)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.unary()
            }
            _ => self.power(),
        };
        self.depth -= 1;
        value
    }

    fn power(&mut self) -> std::result::Result<f64, String> {
        let base = self.primary()?;
        if self.peek() == Some(Token::Caret) {
            self.pos += 1;
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> std::result::Result<f64, String> {
        match self.next() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                let value = self.expr()?;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    _ => Err("missing closing parenthesis".to_string()),
                }
            }
            Some(t) => Err(format!("unexpected token {t:?}")),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}

/// Evaluate an arithmetic expression without executing any code.
pub fn evaluate(expression: &str) -> std::result::Result<f64, String> {
    let tokens = tokenize(expression)?;
    if tokens.is_empty() {
        return Err("empty expression".to_string());
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    if parser.pos < parser.tokens.len() {
        return Err(format!("unexpected token {:?}", parser.tokens[parser.pos]));
    }
    if !value.is_finite() {
        return Err("result is not a finite number".to_string());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2 + 2", 4.0)]
    #[case("10 * 5", 50.0)]
    #[case("2 + 3 * 4", 14.0)]
    #[case("(2 + 3) * 4", 20.0)]
    #[case("10 / 4", 2.5)]
    #[case("-2 ^ 2", -4.0)]
    #[case("2 ** 3 ** 2", 512.0)]
    #[case("7 % 3", 1.0)]
    #[case("25 x 4", 100.0)]
    fn test_evaluate(#[case] expression: &str, #[case] expected: f64) {
        assert_eq!(evaluate(expression).expect("value"), expected);
    }

    #[rstest]
    #[case("1 / 0")]
    #[case("2 +")]
    #[case("(1 + 2")]
    #[case("import os")]
    #[case("")]
    fn test_evaluate_rejects(#[case] expression: &str) {
        assert!(evaluate(expression).is_err());
    }

    #[rstest]
    #[case(format!("{}1{}", "(".repeat(10_000), ")".repeat(10_000)))]
    #[case(format!("{}1", "-".repeat(20_000)))]
    #[case(format!("{}1", "(".repeat(200_000)))]
    fn test_evaluate_rejects_deep_nesting(#[case] expression: String) {
        assert_eq!(
            evaluate(&expression).expect_err("too deep"),
            "expression nested too deeply"
        );
    }

    #[test]
    fn test_evaluate_allows_moderate_nesting() {
        let expression = format!("{}2{}", "(".repeat(100), ")".repeat(100));
        assert_eq!(evaluate(&expression).expect("value"), 2.0);
        assert_eq!(evaluate("- - -3").expect("value"), -3.0);
    }

    #[tokio::test]
    async fn test_calculate_reports_soft_failure() {
        let result = CalculateTool
            .execute(json!({"expression": "1 / 0"}))
            .await
            .expect("result");
        assert!(!result.success);
        assert_eq!(result.output["success"], false);
        assert_eq!(result.output["error"], "division by zero");
    }

    #[tokio::test]
    async fn test_calculate_integral_result() {
        let result = CalculateTool
            .execute(json!({"expression": "25 * 4"}))
            .await
            .expect("result");
        assert_eq!(result.output["result"], json!(100));
    }

    #[tokio::test]
    async fn test_roll_dice_within_bounds() {
        let result = RollDiceTool
            .execute(json!({"sides": 20, "count": 50}))
            .await
            .expect("result");
        let rolls = result.output["rolls"].as_array().expect("rolls");
        assert_eq!(rolls.len(), 50);
        assert!(rolls
            .iter()
            .filter_map(Value::as_i64)
            .all(|r| (1..=20).contains(&r)));
        let total: i64 = rolls.iter().filter_map(Value::as_i64).sum();
        assert_eq!(result.output["total"], json!(total));
    }

    #[rstest]
    #[case(json!({"sides": 1}))]
    #[case(json!({"count": 0}))]
    #[case(json!({"count": 101}))]
    #[tokio::test]
    async fn test_roll_dice_validation(#[case] input: Value) {
        assert!(matches!(
            RollDiceTool.execute(input).await,
            Err(ToolError::InvalidInput(_))
        ));
    }

    #[rstest]
    #[case(1, false, "Numbers less than 2 are not prime")]
    #[case(17, true, "17 is prime!")]
    #[case(100, false, "100 is divisible by 2")]
    #[case(91, false, "91 is divisible by 7")]
    #[tokio::test]
    async fn test_is_prime(#[case] number: i64, #[case] prime: bool, #[case] reason: &str) {
        let result = IsPrimeTool
            .execute(json!({"number": number}))
            .await
            .expect("result");
        assert_eq!(result.output["is_prime"], prime);
        assert_eq!(result.output["reason"], reason);
    }

    #[tokio::test]
    async fn test_is_prime_rejects_huge_numbers() {
        let err = IsPrimeTool
            .execute(json!({"number": 9_223_372_036_854_775_783i64}))
            .await
            .err()
            .expect("rejected");
        assert!(matches!(err, ToolError::InvalidInput(_)));

        let result = IsPrimeTool
            .execute(json!({"number": 999_999_999_989i64}))
            .await
            .expect("largest accepted range");
        assert_eq!(result.output["is_prime"], true);
    }
}
