use serde_json::Value as JsonValue;

use super::Value;

/// Конвертация JSON-документа в граф значений.
///
/// JSON не умеет выражать разделяемые объекты, поэтому результат всегда
/// дерево. Целые, не влезающие в `i64`, становятся `BigInt`.
impl From<&JsonValue> for Value {
    fn from(json: &JsonValue) -> Self {
        match json {
            JsonValue::Null => Value::Null,
            JsonValue::Bool(b) => Value::Bool(*b),
            JsonValue::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Value::BigInt(u as i128)
                } else {
                    Value::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            JsonValue::String(s) => Value::Str(s.clone()),
            JsonValue::Array(items) => Value::array(items.iter().map(Value::from)),
            JsonValue::Object(map) => {
                Value::object(map.iter().map(|(k, v)| (k.clone(), Value::from(v))))
            }
        }
    }
}

impl From<JsonValue> for Value {
    fn from(json: JsonValue) -> Self {
        Value::from(&json)
    }
}
