use regex::Regex;
use serde_json::Value;
use shared::{HealthStatus, Stage1Result};

use super::RemoteServiceError;

lazy_static::lazy_static! {
    static ref HEALTHY_RE: Regex = Regex::new(r"(?i)([\d.]+)%\s*healthy").unwrap();
    static ref UNHEALTHY_RE: Regex = Regex::new(r"(?i)([\d.]+)%\s*unhealthy").unwrap();
}

/// Text holding the percentages: the third output of a multi-output
/// response, or the whole response when it is a plain string. A third output
/// that is not text is malformed.
pub fn percentages_text(output: &Value) -> Result<Option<&str>, RemoteServiceError> {
    match output {
        Value::Array(items) if items.len() >= 3 => match &items[2] {
            Value::String(text) => Ok(Some(text.as_str())),
            other => Err(RemoteServiceError::Protocol(format!(
                "percentages output is not text: {}",
                other
            ))),
        },
        Value::String(text) => Ok(Some(text.as_str())),
        _ => Ok(None),
    }
}

fn capture(re: &Regex, text: &str) -> Result<f64, RemoteServiceError> {
    match re.captures(text) {
        Some(caps) => {
            let number = &caps[1];
            number
                .parse::<f64>()
                .map_err(|_| RemoteServiceError::Percentage(number.to_string()))
        }
        None => Ok(0.0),
    }
}

/// Extracts `(healthy, unhealthy)` from text like `"15.63% healthy, 84.37% unhealthy"`.
/// A label that does not appear counts as 0.
pub fn parse_percentages(text: &str) -> Result<(f64, f64), RemoteServiceError> {
    Ok((capture(&HEALTHY_RE, text)?, capture(&UNHEALTHY_RE, text)?))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Healthy only when strictly more confident than unhealthy.
pub fn decide(healthy: f64, unhealthy: f64) -> Stage1Result {
    let is_healthy = healthy > unhealthy;
    let (classification, confidence) = if is_healthy {
        (HealthStatus::Healthy, healthy)
    } else {
        (HealthStatus::Unhealthy, unhealthy)
    };

    Stage1Result {
        classification,
        confidence: round2(confidence),
        is_healthy,
        healthy_confidence: Some(round2(healthy)),
        unhealthy_confidence: Some(round2(unhealthy)),
        message: None,
    }
}

/// Result reported when the remote verdict is unavailable. Never healthy.
pub fn fallback(message: String) -> Stage1Result {
    Stage1Result {
        classification: HealthStatus::Unhealthy,
        confidence: 50.0,
        is_healthy: false,
        healthy_confidence: None,
        unhealthy_confidence: None,
        message: Some(message),
    }
}

pub fn interpret(output: &Value) -> Result<Stage1Result, RemoteServiceError> {
    let (healthy, unhealthy) = match percentages_text(output)? {
        Some(text) => parse_percentages(text)?,
        None => (0.0, 0.0),
    };
    Ok(decide(healthy, unhealthy))
}
