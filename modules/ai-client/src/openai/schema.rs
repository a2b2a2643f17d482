use schemars::{schema_for, JsonSchema};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// A type the model can be forced to return through OpenAI strict JSON-schema mode.
///
/// Blanket-implemented for every `JsonSchema + DeserializeOwned` type.
pub trait StructuredOutput: JsonSchema + DeserializeOwned {
    /// Strict-mode schema for this type: every object closed with
    /// `additionalProperties: false`, every property required, and no `$ref`.
    fn strict_schema() -> Value {
        let mut value = serde_json::to_value(schema_for!(Self)).unwrap_or_default();

        let definitions = match &mut value {
            Value::Object(map) => {
                map.remove("$schema");
                map.remove("definitions")
            }
            _ => None,
        };

        normalize(&mut value, definitions.as_ref());
        value
    }

    /// Name sent alongside the schema so responses can be traced back to a type.
    fn response_name() -> String {
        <Self as JsonSchema>::schema_name()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect()
    }
}

impl<T: JsonSchema + DeserializeOwned> StructuredOutput for T {}

/// Resolve `$ref`s against `definitions`, unwrap single-element `allOf`, then close
/// and fully-require every object schema. One depth-first pass.
fn normalize(value: &mut Value, definitions: Option<&Value>) {
    if let Some(resolved) = resolve_reference(value, definitions) {
        *value = resolved;
        normalize(value, definitions);
        return;
    }

    match value {
        Value::Object(map) => {
            close_object(map);
            for child in map.values_mut() {
                normalize(child, definitions);
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                normalize(item, definitions);
            }
        }
        _ => {}
    }
}

fn resolve_reference(value: &Value, definitions: Option<&Value>) -> Option<Value> {
    let map = value.as_object()?;

    if let Some(Value::String(path)) = map.get("$ref") {
        let name = path.strip_prefix("#/definitions/")?;
        return definitions?.get(name).cloned();
    }

    match map.get("allOf") {
        Some(Value::Array(all_of)) if all_of.len() == 1 => all_of.first().cloned(),
        _ => None,
    }
}

fn close_object(map: &mut Map<String, Value>) {
    if map.get("type").and_then(Value::as_str) != Some("object") {
        return;
    }

    map.insert("additionalProperties".to_string(), Value::Bool(false));

    let required: Option<Vec<Value>> = map
        .get("properties")
        .and_then(Value::as_object)
        .map(|props| props.keys().cloned().map(Value::String).collect());
    if let Some(required) = required {
        map.insert("required".to_string(), Value::Array(required));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemars::JsonSchema;
    use serde::Deserialize;

    #[derive(Deserialize, JsonSchema)]
    struct Verdict {
        passed: bool,
        reason: Option<String>,
    }

    #[derive(Deserialize, JsonSchema)]
    struct TagList {
        tags: Vec<String>,
        verdict: Verdict,
    }

    #[test]
    fn strips_schema_and_definitions() {
        let schema = TagList::strict_schema();
        let obj = schema.as_object().unwrap();
        assert!(!obj.contains_key("$schema"));
        assert!(!obj.contains_key("definitions"));
    }

    #[test]
    fn optional_properties_are_still_required() {
        let schema = Verdict::strict_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(Value::as_str)
            .collect();
        assert!(required.contains(&"passed"));
        assert!(required.contains(&"reason"));
        assert_eq!(schema["additionalProperties"], Value::Bool(false));
    }

    #[test]
    fn nested_types_are_inlined_and_closed() {
        let schema = TagList::strict_schema();
        let verdict = &schema["properties"]["verdict"];
        assert!(verdict.get("$ref").is_none());
        assert_eq!(verdict["type"], Value::String("object".into()));
        assert_eq!(verdict["additionalProperties"], Value::Bool(false));
    }

    #[test]
    fn response_name_is_identifier_safe() {
        let name = <Vec<String> as StructuredOutput>::response_name();
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'));
    }
}
