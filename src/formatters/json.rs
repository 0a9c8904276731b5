//! One JSON object per line

use super::{EntryFormatter, PARENT_ID_KEY, SPAN_ID_KEY, TRACE_ID_KEY};
use crate::core::{FieldValue, JsonFormatterOptions, LogEntry, LogState, Result, ScopeProvider};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// JSON formatter
///
/// Keys, in order: `level`, `category`, `eventId`, `message`, `state`,
/// `scopes`, `exception`, `exceptionDetails`, then the activity ids.
///
/// # Example
///
/// ```
/// use rust_loki_logger::core::{JsonFormatterOptions, LogEntry, LogLevel, NullScopeProvider};
/// use rust_loki_logger::formatters::{EntryFormatter, JsonFormatter};
///
/// let formatter = JsonFormatter::new(JsonFormatterOptions::default());
/// let entry = LogEntry::new(LogLevel::Warning, "disk low").with_category("storage");
/// let line = formatter.format(&entry, &NullScopeProvider).unwrap();
/// assert_eq!(line, r#"{"level":"Warning","category":"storage","message":"disk low"}"#);
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    options: JsonFormatterOptions,
}

impl JsonFormatter {
    pub fn new(options: JsonFormatterOptions) -> Self {
        Self { options }
    }

    fn build(&self, entry: &LogEntry, scopes: &dyn ScopeProvider) -> Map<String, Value> {
        let mut object = Map::new();
        object.insert("level".into(), Value::from(entry.level.to_str()));

        if self.options.include_category {
            object.insert("category".into(), Value::from(entry.category.as_str()));
        }
        if self.options.include_event_id {
            object.insert("eventId".into(), Value::from(entry.event_id.id));
        }

        object.insert("message".into(), Value::from(entry.message.as_str()));

        if !entry.state.is_empty() {
            object.insert("state".into(), state_value(&entry.state));
        }

        if self.options.include_scopes {
            let mut chain = Vec::new();
            scopes.for_each_scope(&mut |scope| chain.push(state_value(scope)));
            if !chain.is_empty() {
                object.insert("scopes".into(), Value::Array(chain));
            }
        }

        if let Some(error) = &entry.error {
            object.insert("exception".into(), Value::from(error.type_name.as_str()));
            object.insert("exceptionDetails".into(), Value::from(error.details.as_str()));
        }

        if self.options.include_activity_tracking {
            if let Some(activity) = &entry.activity {
                insert_absent(&mut object, SPAN_ID_KEY, activity.span_id());
                insert_absent(&mut object, TRACE_ID_KEY, activity.trace_id());
                if let Some(parent) = activity.parent_id() {
                    insert_absent(&mut object, PARENT_ID_KEY, parent);
                }
            }
        }

        object
    }
}

fn insert_absent(object: &mut Map<String, Value>, key: &str, value: &str) {
    if !object.contains_key(key) {
        object.insert(key.to_string(), Value::from(value));
    }
}

/// Map-shaped state becomes an object; anything else keeps its enumerable form
fn state_value(state: &LogState) -> Value {
    match state {
        LogState::Empty => Value::Null,
        LogState::Value(value) => value.to_json_value(),
        LogState::Fields(fields) => {
            let mut seen = HashSet::with_capacity(fields.len());
            if fields.iter().all(|(key, _)| seen.insert(key.as_str())) {
                Value::Object(
                    fields
                        .iter()
                        .map(|(key, value)| (key.clone(), value.to_json_value()))
                        .collect(),
                )
            } else {
                Value::Array(fields.iter().map(pair_value).collect())
            }
        }
    }
}

fn pair_value((key, value): &(String, FieldValue)) -> Value {
    Value::Array(vec![Value::from(key.as_str()), value.to_json_value()])
}

impl EntryFormatter for JsonFormatter {
    fn format(&self, entry: &LogEntry, scopes: &dyn ScopeProvider) -> Result<String> {
        let object = self.build(entry, scopes);
        match serde_json::to_string(&object) {
            Ok(line) => Ok(line),
            // Degrade to a minimal object built by hand
            Err(_) => Ok(format!(
                "{{\"level\":\"{}\",\"message\":{:?}}}",
                entry.level.to_str(),
                entry.message
            )),
        }
    }

    fn name(&self) -> &str {
        "json"
    }
}
