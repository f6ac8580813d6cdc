//! Unit conversion tool.

use super::error::Result;
use super::r#trait::{Tool, ToolCategory, ToolResult, required_f64, required_str};
use async_trait::async_trait;
use serde_json::{Value, json};

const FEET_PER_METER: f64 = 3.28084;
const POUNDS_PER_KILOGRAM: f64 = 2.20462;

/// Convert `value` between two units, `None` for unsupported pairs.
pub fn convert(value: f64, from: &str, to: &str) -> Option<f64> {
    let result = match (from, to) {
        (a, b) if a == b => value,
        ("celsius", "fahrenheit") => value * 9.0 / 5.0 + 32.0,
        ("fahrenheit", "celsius") => (value - 32.0) * 5.0 / 9.0,
        ("meters", "feet") => value * FEET_PER_METER,
        ("feet", "meters") => value / FEET_PER_METER,
        ("kilograms", "pounds") => value * POUNDS_PER_KILOGRAM,
        ("pounds", "kilograms") => value / POUNDS_PER_KILOGRAM,
        _ => return None,
    };
    Some(result)
}

pub struct ConvertUnitsTool;

#[async_trait]
impl Tool for ConvertUnitsTool {
    fn name(&self) -> &str {
        "convert_units"
    }

    fn description(&self) -> &str {
        "Convert between temperature, length and weight units"
    }

    fn category(&self) -> ToolCategory {
        ToolCategory::Conversion
    }

    fn examples(&self) -> Vec<String> {
        vec![
            "Convert 100 celsius to fahrenheit".to_string(),
            "Convert 5 meters to feet".to_string(),
        ]
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "value": {"type": "number", "description": "Value to convert"},
                "from_unit": {"type": "string", "description": "Source unit"},
                "to_unit": {"type": "string", "description": "Target unit"}
            },
            "required": ["value", "from_unit", "to_unit"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult> {
        let value = required_f64(&input, "value")?;
        let from = required_str(&input, "from_unit")?.to_lowercase();
        let to = required_str(&input, "to_unit")?.to_lowercase();

        Ok(match convert(value, &from, &to) {
            Some(result) => ToolResult::success(json!({
                "original_value": value,
                "original_unit": from,
                "converted_value": (result * 100.0).round() / 100.0,
                "converted_unit": to,
            })),
            None => ToolResult::failure(json!({
                "error": format!("Conversion from {from} to {to} not supported"),
            })),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(100.0, "celsius", "fahrenheit", 212.0)]
    #[case(32.0, "fahrenheit", "celsius", 0.0)]
    #[case(1.0, "meters", "feet", 3.28084)]
    #[case(10.0, "kilograms", "pounds", 22.0462)]
    fn test_supported_pairs(
        #[case] value: f64,
        #[case] from: &str,
        #[case] to: &str,
        #[case] expected: f64,
    ) {
        let result = convert(value, from, to).expect("supported");
        assert!((result - expected).abs() < 1e-9, "{result} != {expected}");
    }

    #[tokio::test]
    async fn test_unsupported_pair_is_soft_failure() {
        let result = ConvertUnitsTool
            .execute(json!({"value": 1, "from_unit": "liters", "to_unit": "feet"}))
            .await
            .expect("result");
        assert!(!result.success);
        assert_eq!(
            result.output["error"],
            "Conversion from liters to feet not supported"
        );
    }

    #[tokio::test]
    async fn test_units_case_insensitive() {
        let result = ConvertUnitsTool
            .execute(json!({"value": 0, "from_unit": "Celsius", "to_unit": "FAHRENHEIT"}))
            .await
            .expect("result");
        assert!(result.success);
        assert_eq!(result.output["converted_value"], 32.0);
    }
}
