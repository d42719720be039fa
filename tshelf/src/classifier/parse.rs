//! Turns a decoded model response into a typed classification.
//!
//! The model output is only loosely shaped, so every field is checked
//! explicitly before a [`Classification`] is built.

use common::{level_key, CurriculumConfig};
use serde_json::{Map, Value};
use tracing::debug;

use super::{Classification, ConceptScore, Difficulty};

const MAX_CONCEPTS: usize = 7;
const MAX_PREREQUISITES: usize = 3;
const MAX_OUTCOMES: usize = 4;
const MAX_QUESTIONS: usize = 3;

/// Validate a decoded response.
///
/// `Ok(None)` is the skip signal, `Err` carries the reason the shape was rejected.
pub fn validate_classification(
    value: &Value,
    taxonomy: &CurriculumConfig,
) -> Result<Option<Classification>, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| "response is not a JSON object".to_string())?;

    match obj.get("skip") {
        Some(Value::Bool(true)) => return Ok(None),
        None | Some(Value::Null) | Some(Value::Bool(false)) => {}
        Some(other) => return Err(format!("skip is not a boolean: {}", other)),
    }

    let topic = obj
        .get("topic")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| "missing or empty topic".to_string())?
        .to_string();

    if !taxonomy.topics.iter().any(|t| t == &topic) {
        debug!("freeform topic outside configured set: {}", topic);
    }

    let difficulty = obj
        .get("difficulty")
        .and_then(Value::as_object)
        .ok_or_else(|| "missing difficulty object".to_string())?;
    let difficulty = parse_difficulty(difficulty)?;

    let concepts_taught = capped(
        scored_list(obj, "concepts_taught")?,
        MAX_CONCEPTS,
        "concepts_taught",
    );

    let prerequisites = scored_list(obj, "prerequisites")?
        .into_iter()
        .filter(|p| p.confidence >= taxonomy.prerequisite_min_confidence)
        .collect();
    let prerequisites = capped(prerequisites, MAX_PREREQUISITES, "prerequisites");

    let learning_outcomes = capped(
        string_list(obj, "learning_outcomes")?,
        MAX_OUTCOMES,
        "learning_outcomes",
    );
    let strategic_questions = capped(
        string_list(obj, "strategic_questions")?,
        MAX_QUESTIONS,
        "strategic_questions",
    );

    Ok(Some(Classification {
        topic,
        concepts_taught,
        prerequisites,
        difficulty,
        learning_outcomes,
        strategic_questions,
    }))
}

/// Bucket key for a difficulty level: [`level_key`] of the text, or the
/// decimal form of an integral number.
pub fn normalize_level(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = level_key(s);
            (!s.is_empty()).then_some(s)
        }
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else {
                n.as_f64()
                    .filter(|f| f.is_finite() && f.fract() == 0.0)
                    .map(|f| (f as i64).to_string())
            }
        }
        _ => None,
    }
}

fn parse_difficulty(obj: &Map<String, Value>) -> Result<Difficulty, String> {
    let level = obj
        .get("level")
        .and_then(normalize_level)
        .ok_or_else(|| "difficulty.level missing or not a string/integer".to_string())?;

    let technical_depth = obj
        .get("technical_depth")
        .and_then(Value::as_f64)
        .map(|d| d.round().clamp(1.0, 10.0) as u8);

    let reading_time_minutes = obj
        .get("reading_time_minutes")
        .and_then(Value::as_f64)
        .filter(|m| *m > 0.0);

    Ok(Difficulty {
        level,
        technical_depth,
        reading_time_minutes,
    })
}

fn list_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Result<&'a [Value], String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(&[]),
        Some(Value::Array(items)) => Ok(items.as_slice()),
        Some(_) => Err(format!("{} is not a list", key)),
    }
}

fn scored_list(obj: &Map<String, Value>, key: &str) -> Result<Vec<ConceptScore>, String> {
    let items = list_field(obj, key)?;
    let mut out = Vec::with_capacity(items.len());

    for item in items {
        let (name, confidence) = match item {
            Value::String(s) => (Some(s.as_str()), None),
            Value::Object(o) => (
                o.get("name")
                    .or_else(|| o.get("concept"))
                    .and_then(Value::as_str),
                o.get("confidence").and_then(Value::as_f64),
            ),
            _ => (None, None),
        };

        match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => out.push(ConceptScore {
                name: name.to_string(),
                confidence: confidence.unwrap_or(1.0).clamp(0.0, 1.0),
            }),
            None => debug!("dropping unnamed entry in {}", key),
        }
    }

    Ok(out)
}

fn string_list(obj: &Map<String, Value>, key: &str) -> Result<Vec<String>, String> {
    Ok(list_field(obj, key)?
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect())
}

fn capped<T>(mut items: Vec<T>, max: usize, key: &str) -> Vec<T> {
    if items.len() > max {
        debug!("{}: keeping {} of {} entries", key, max, items.len());
        items.truncate(max);
    }
    items
}
