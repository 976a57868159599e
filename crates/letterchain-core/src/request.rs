//! Declarative validation of inbound request payloads.
//!
//! Malformed input is rejected before any game-rule evaluation. Instead of
//! ad-hoc per-field code, each endpoint declares a table of
//! [`FieldRule`]s — field name to type, bounds, pattern, and allowed
//! values — evaluated against the raw JSON payload by one generic
//! function. The report carries every violation plus a `should_track`
//! marker for violations that smell like probing (wrong types, pattern
//! failures, out-of-range numbers) rather than honest mistakes.
//!
//! A final sweep scans the serialized payload for script-injection
//! markers.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::leaderboard::MAX_PLAYER_NAME_CHARS;
use crate::scoring::MAX_REASONABLE_SCORE;

/// Expected JSON type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// JSON string.
    Str,
    /// JSON number.
    Number,
    /// JSON array.
    Array,
    /// JSON boolean.
    Bool,
}

impl FieldKind {
    const fn name(self) -> &'static str {
        match self {
            Self::Str => "string",
            Self::Number => "number",
            Self::Array => "array",
            Self::Bool => "boolean",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            Self::Str => value.is_string(),
            Self::Number => value.is_number(),
            Self::Array => value.is_array(),
            Self::Bool => value.is_boolean(),
        }
    }
}

/// One field's validation rule.
#[derive(Debug, Clone, Default)]
pub struct FieldRule {
    /// Reject the payload if the field is absent, null, or empty.
    pub required: bool,
    /// Expected JSON type.
    pub kind: Option<FieldKind>,
    /// Minimum length (characters for strings, elements for arrays).
    pub min_len: Option<usize>,
    /// Maximum length (characters for strings, elements for arrays).
    pub max_len: Option<usize>,
    /// Minimum numeric value.
    pub min: Option<f64>,
    /// Maximum numeric value.
    pub max: Option<f64>,
    /// Pattern a string value must match in full.
    pub pattern: Option<&'static Regex>,
    /// Closed set of allowed string values.
    pub one_of: Option<&'static [&'static str]>,
}

/// Outcome of validating one payload against a rule table.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    /// Human-readable violations, one per failed check.
    pub errors: Vec<String>,
    /// True when a violation looks like probing and belongs in the
    /// suspicious-activity log.
    pub should_track: bool,
}

impl ValidationReport {
    /// True when no rule was violated.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

fn is_absent(value: Option<&Value>) -> bool {
    match value {
        None => true,
        Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

/// Evaluates a rule table against a JSON payload.
///
/// Rules are checked in table order; each field contributes at most one
/// type error but may contribute several bound errors, mirroring how the
/// report is shown to callers.
#[must_use]
pub fn validate_payload(rules: &[(&str, FieldRule)], payload: &Value) -> ValidationReport {
    let mut report = ValidationReport::default();

    for (field, rule) in rules {
        let value = payload.get(field);

        if is_absent(value) {
            if rule.required {
                report.errors.push(format!("{field} is required"));
            }
            continue;
        }
        let Some(value) = value else { continue };

        if let Some(kind) = rule.kind {
            if !kind.matches(value) {
                report
                    .errors
                    .push(format!("{field} must be of type {}", kind.name()));
                report.should_track = true;
                continue;
            }
        }

        if let Some(s) = value.as_str() {
            let len = s.chars().count();
            if let Some(min) = rule.min_len {
                if len < min {
                    report
                        .errors
                        .push(format!("{field} must be at least {min} characters"));
                }
            }
            if let Some(max) = rule.max_len {
                if len > max {
                    report
                        .errors
                        .push(format!("{field} must be at most {max} characters"));
                }
            }
            if let Some(pattern) = rule.pattern {
                if !pattern.is_match(s) {
                    report.errors.push(format!("{field} format is invalid"));
                    report.should_track = true;
                }
            }
            if let Some(allowed) = rule.one_of {
                if !allowed.contains(&s) {
                    report
                        .errors
                        .push(format!("{field} must be one of: {}", allowed.join(", ")));
                    report.should_track = true;
                }
            }
        }

        if let Some(n) = value.as_f64() {
            if let Some(min) = rule.min {
                if n < min {
                    report.errors.push(format!("{field} must be at least {min}"));
                    report.should_track = true;
                }
            }
            if let Some(max) = rule.max {
                if n > max {
                    report.errors.push(format!("{field} must be at most {max}"));
                    report.should_track = true;
                }
            }
        }

        if let Some(items) = value.as_array() {
            if let Some(min) = rule.min_len {
                if items.len() < min {
                    report
                        .errors
                        .push(format!("{field} must have at least {min} items"));
                }
            }
            if let Some(max) = rule.max_len {
                if items.len() > max {
                    report
                        .errors
                        .push(format!("{field} must have at most {max} items"));
                }
            }
        }
    }

    if payload_looks_malicious(payload) {
        report.errors.push("invalid characters detected".to_string());
        report.should_track = true;
    }

    report
}

static SUSPICIOUS_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)<script",
        r"(?i)javascript:",
        r"(?i)on\w+\s*=",
        r"(?i)eval\s*\(",
        r"(?i)function\s*\(",
        r"(?i)document\.",
        r"(?i)window\.",
        r"(?i)global\.",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("suspicious pattern is valid"))
    .collect()
});

/// Script-injection sweep over the serialized payload.
fn payload_looks_malicious(payload: &Value) -> bool {
    let serialized = payload.to_string();
    SUSPICIOUS_PATTERNS.iter().any(|p| p.is_match(&serialized))
}

static SESSION_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-fA-F0-9]+$").expect("token regex is valid"));
static PLAYER_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9\s\-_]+$").expect("name regex is valid"));

/// Languages the dictionary oracle ships word lists for.
pub const SUPPORTED_LANGUAGES: &[&str] = &["es", "en"];

/// Minimum hex characters in a session token (a 32-byte token is 64, but
/// older clients sent 32).
pub const MIN_SESSION_TOKEN_CHARS: usize = 32;

fn session_token_rule() -> FieldRule {
    FieldRule {
        required: true,
        kind: Some(FieldKind::Str),
        min_len: Some(MIN_SESSION_TOKEN_CHARS),
        pattern: Some(&SESSION_TOKEN_RE),
        ..FieldRule::default()
    }
}

/// Rule table for the game-start payload.
#[must_use]
pub fn start_payload_rules() -> Vec<(&'static str, FieldRule)> {
    vec![
        ("sessionToken", session_token_rule()),
        (
            "language",
            FieldRule {
                required: false,
                kind: Some(FieldKind::Str),
                one_of: Some(SUPPORTED_LANGUAGES),
                ..FieldRule::default()
            },
        ),
    ]
}

/// Rule table for the score-submission payload.
#[must_use]
pub fn submit_payload_rules() -> Vec<(&'static str, FieldRule)> {
    vec![
        (
            "playerName",
            FieldRule {
                required: true,
                kind: Some(FieldKind::Str),
                min_len: Some(1),
                max_len: Some(MAX_PLAYER_NAME_CHARS),
                pattern: Some(&PLAYER_NAME_RE),
                ..FieldRule::default()
            },
        ),
        (
            "score",
            FieldRule {
                required: true,
                kind: Some(FieldKind::Number),
                min: Some(0.0),
                max: Some(f64::from(MAX_REASONABLE_SCORE)),
                ..FieldRule::default()
            },
        ),
        (
            "wordsCount",
            FieldRule {
                required: true,
                kind: Some(FieldKind::Number),
                min: Some(0.0),
                max: Some(100.0),
                ..FieldRule::default()
            },
        ),
        (
            "longestChain",
            FieldRule {
                required: true,
                kind: Some(FieldKind::Number),
                min: Some(0.0),
                max: Some(100.0),
                ..FieldRule::default()
            },
        ),
        ("sessionToken", session_token_rule()),
        (
            "words",
            FieldRule {
                required: true,
                kind: Some(FieldKind::Array),
                max_len: Some(100),
                ..FieldRule::default()
            },
        ),
        (
            "language",
            FieldRule {
                required: false,
                kind: Some(FieldKind::Str),
                one_of: Some(SUPPORTED_LANGUAGES),
                ..FieldRule::default()
            },
        ),
    ]
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn valid_submit() -> Value {
        json!({
            "playerName": "ana",
            "score": 41,
            "wordsCount": 2,
            "longestChain": 2,
            "sessionToken": "a".repeat(64),
            "words": ["casa", "saber"],
        })
    }

    #[test]
    fn valid_submit_payload_passes() {
        let report = validate_payload(&submit_payload_rules(), &valid_submit());
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert!(!report.should_track);
    }

    #[test]
    fn missing_required_field_is_reported() {
        let mut payload = valid_submit();
        payload.as_object_mut().unwrap().remove("playerName");
        let report = validate_payload(&submit_payload_rules(), &payload);
        assert_eq!(report.errors, vec!["playerName is required"]);
        // An honest omission is not probing.
        assert!(!report.should_track);
    }

    #[test]
    fn type_mismatch_marks_should_track() {
        let mut payload = valid_submit();
        payload["score"] = json!("lots");
        let report = validate_payload(&submit_payload_rules(), &payload);
        assert!(!report.is_valid());
        assert!(report.should_track);
    }

    #[test]
    fn short_session_token_rejected() {
        let mut payload = valid_submit();
        payload["sessionToken"] = json!("abc123");
        let report = validate_payload(&submit_payload_rules(), &payload);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("sessionToken")));
    }

    #[test]
    fn non_hex_session_token_rejected() {
        let mut payload = valid_submit();
        payload["sessionToken"] = json!("zz".repeat(20));
        let report = validate_payload(&submit_payload_rules(), &payload);
        assert!(!report.is_valid());
        assert!(report.should_track);
    }

    #[test]
    fn score_above_ceiling_rejected() {
        let mut payload = valid_submit();
        payload["score"] = json!(20_000);
        let report = validate_payload(&submit_payload_rules(), &payload);
        assert!(report.errors.iter().any(|e| e.contains("score")));
        assert!(report.should_track);
    }

    #[test]
    fn oversized_words_array_rejected() {
        let mut payload = valid_submit();
        payload["words"] = json!(vec!["casa"; 101]);
        let report = validate_payload(&submit_payload_rules(), &payload);
        assert!(report.errors.iter().any(|e| e.contains("words")));
    }

    #[test]
    fn unsupported_language_rejected() {
        let mut payload = valid_submit();
        payload["language"] = json!("fr");
        let report = validate_payload(&submit_payload_rules(), &payload);
        assert!(report.errors.iter().any(|e| e.contains("language")));
    }

    #[test]
    fn script_injection_sweep_fires() {
        let mut payload = valid_submit();
        payload["playerName"] = json!("<script>alert(1)</script>");
        let report = validate_payload(&submit_payload_rules(), &payload);
        assert!(report
            .errors
            .iter()
            .any(|e| e.contains("invalid characters")));
        assert!(report.should_track);
    }

    #[test]
    fn optional_language_may_be_absent() {
        let report = validate_payload(
            &start_payload_rules(),
            &json!({ "sessionToken": "b".repeat(32) }),
        );
        assert!(report.is_valid(), "errors: {:?}", report.errors);
    }
}
