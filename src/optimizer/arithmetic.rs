//! Local arithmetic shortcut that answers math prompts without the remote model

use super::expression::evaluate_expression;
use crate::error::ArithmeticError;
use regex::{Captures, NoExpand, Regex};
use tracing::debug;

const NUMBER_WORDS: &[&str] = &[
    "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
];

/// Operator phrases, matched as whole words
const OPERATOR_WORDS: &[(&str, &str)] = &[
    ("plus", "+"),
    ("minus", "-"),
    ("times", "*"),
    ("multiplied by", "*"),
    ("x", "*"),
    ("divided by", "/"),
    ("over", "/"),
];

/// Outcome of a recognised arithmetic prompt
#[derive(Debug, Clone, PartialEq)]
pub enum ArithmeticOutcome {
    Value(f64),
    Rejected(ArithmeticError),
}

/// Recognises `<n><op><n>` and natural-language arithmetic and evaluates it locally
#[derive(Debug, Clone)]
pub struct ArithmeticShortcut {
    strict: Regex,
    courtesy: Regex,
    disallowed: Regex,
    number_words: Regex,
    operator_words: Vec<(Regex, &'static str)>,
    power_words: Regex,
    recognizer: Regex,
}

impl ArithmeticShortcut {
    pub fn new() -> Result<Self, regex::Error> {
        let operator_words = OPERATOR_WORDS
            .iter()
            .map(|(word, op)| {
                Regex::new(&format!(r"(?i)\b{}\b", regex::escape(word))).map(|re| (re, *op))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            strict: Regex::new(r"^\s*(\d+)\s*([+\-*/])\s*(\d+)\s*$")?,
            courtesy: Regex::new(r"(?i)^(?:please tell me|what is|what's|whats|please|can you)\s*")?,
            disallowed: Regex::new(r"[^A-Za-z0-9\s+\-*/^().]")?,
            number_words: Regex::new(&format!(r"(?i)\b(?:{})\b", NUMBER_WORDS.join("|")))?,
            operator_words,
            power_words: Regex::new(r"(?i)\bto the power of\b|\^")?,
            recognizer: Regex::new(r"(?:\d|\))\s*(?:\*\*|[+\-*/])\s*[\d(.\-]")?,
        })
    }

    /// Try both recognised forms. `None` means the prompt is not arithmetic and
    /// should continue down the normal pipeline.
    pub fn try_evaluate(&self, text: &str) -> Option<ArithmeticOutcome> {
        if let Some(result) = self.evaluate_strict(text) {
            return Some(into_outcome(result));
        }

        let expr = self.to_expression(text);
        if !self.recognizer.is_match(&expr) || expr.chars().any(|c| c.is_ascii_alphabetic()) {
            return None;
        }

        debug!("Recognised arithmetic expression: {}", expr);
        Some(into_outcome(evaluate_expression(&expr)))
    }

    /// Evaluate exactly `<number><operator><number>`; `None` for any other shape
    pub fn evaluate_strict(&self, text: &str) -> Option<Result<f64, ArithmeticError>> {
        let caps = self.strict.captures(text)?;
        let lhs: f64 = caps[1].parse().ok()?;
        let rhs: f64 = caps[3].parse().ok()?;
        let value = match &caps[2] {
            "+" => lhs + rhs,
            "-" => lhs - rhs,
            "*" => lhs * rhs,
            "/" => lhs / rhs,
            _ => return None,
        };

        if value.is_finite() {
            Some(Ok(value))
        } else {
            Some(Err(ArithmeticError::NonFinite))
        }
    }

    /// Solve a natural-language prompt such as "what is three plus four"
    #[cfg(test)]
    fn solve(&self, text: &str) -> Result<f64, ArithmeticError> {
        evaluate_expression(&self.to_expression(text))
    }

    /// Clean the prompt and rewrite number and operator words as symbols
    pub fn to_expression(&self, text: &str) -> String {
        let cleaned = self.courtesy.replace(text.trim(), "");
        let cleaned = self.disallowed.replace_all(&cleaned, "");
        let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

        let mut expr = self
            .number_words
            .replace_all(&cleaned, |caps: &Captures| number_value(&caps[0]))
            .into_owned();

        for (re, op) in &self.operator_words {
            expr = re.replace_all(&expr, NoExpand(*op)).into_owned();
        }

        self.power_words.replace_all(&expr, "**").into_owned()
    }
}

fn into_outcome(result: Result<f64, ArithmeticError>) -> ArithmeticOutcome {
    match result {
        Ok(value) => ArithmeticOutcome::Value(value),
        Err(e) => ArithmeticOutcome::Rejected(e),
    }
}

fn number_value(word: &str) -> String {
    NUMBER_WORDS
        .iter()
        .position(|w| w.eq_ignore_ascii_case(word))
        .map(|n| n.to_string())
        .unwrap_or_else(|| word.to_string())
}
