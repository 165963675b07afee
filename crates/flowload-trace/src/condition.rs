//! Branch condition parsing.
//!
//! Only a conjunction of equalities is understood: `${a==1 && b==yes}`.
//! Whitespace is insignificant. Anything else (`!=`, `>`, `||`, parentheses)
//! makes the offending conjunct malformed.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use flowload_core::error::{FlowloadError, Result};

/// Variable bindings implied by a taken branch, keyed by variable name.
pub type Bindings = BTreeMap<String, String>;

fn envelope() -> &'static Regex {
    static ENVELOPE: OnceLock<Regex> = OnceLock::new();
    ENVELOPE.get_or_init(|| Regex::new(r"^\$\{(.*)\}$").expect("valid envelope regex"))
}

fn conjunct() -> &'static Regex {
    static CONJUNCT: OnceLock<Regex> = OnceLock::new();
    CONJUNCT.get_or_init(|| {
        Regex::new(r"^([^=!<>|&()]+)==([^=!<>|&()]+)$").expect("valid conjunct regex")
    })
}

/// Parse a condition expression into the bindings it requires.
///
/// Blank or absent input yields `None`. Duplicate names keep the last value,
/// since conjuncts apply left to right.
pub fn parse_condition(expression: Option<&str>) -> Result<Option<Bindings>> {
    let Some(expression) = expression.filter(|e| !e.trim().is_empty()) else {
        return Ok(None);
    };

    let compact: String = expression.chars().filter(|c| !c.is_whitespace()).collect();
    let body = envelope()
        .captures(&compact)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .ok_or_else(|| FlowloadError::MalformedExpression(expression.to_string()))?;

    let mut bindings = Bindings::new();
    for part in body.split("&&") {
        let caps = conjunct().captures(part).ok_or_else(|| {
            FlowloadError::MalformedExpression(format!("{} (at '{}')", expression, part))
        })?;
        bindings.insert(caps[1].to_string(), caps[2].to_string());
    }
    Ok(Some(bindings))
}

/// Merge `extra` into `base` without overwriting keys `base` already holds.
pub fn merge_missing(base: &mut Bindings, extra: Bindings) {
    for (key, value) in extra {
        base.entry(key).or_insert(value);
    }
}
