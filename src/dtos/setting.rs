use serde_json::Value;

/// Per-user settings are free-form key/value pairs. Values are stored as TEXT
/// with a type tag inferred at write time and revived on read.
#[derive(Debug, PartialEq)]
pub enum SettingValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
}

impl SettingValue {
    /// Infer the variant from an incoming JSON value. Anything without a
    /// dedicated variant (null, objects) is stored as its string form.
    pub fn classify(value: &Value) -> Self {
        match value {
            Value::Bool(b) => SettingValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    SettingValue::Int(i)
                } else {
                    SettingValue::Float(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => SettingValue::Text(s.clone()),
            Value::Array(items) => SettingValue::List(items.clone()),
            other => SettingValue::Text(other.to_string()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            SettingValue::Bool(_) => "boolean",
            SettingValue::Int(_) => "integer",
            SettingValue::Float(_) => "float",
            SettingValue::Text(_) => "string",
            SettingValue::List(_) => "array",
        }
    }

    /// TEXT form written to the value column.
    pub fn stored(&self) -> String {
        match self {
            SettingValue::Bool(b) => b.to_string(),
            SettingValue::Int(i) => i.to_string(),
            SettingValue::Float(f) => f.to_string(),
            SettingValue::Text(s) => s.clone(),
            SettingValue::List(items) => {
                serde_json::to_string(items).unwrap_or_else(|_| "[]".to_string())
            }
        }
    }

    /// Rebuild a typed JSON value from the stored TEXT + type tag. Falls back
    /// to the raw string when the stored form no longer parses as its tag.
    pub fn revive(kind: &str, raw: &str) -> Value {
        match kind {
            "boolean" => Value::Bool(raw == "true" || raw == "1"),
            "integer" => raw
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(raw.to_string())),
            "float" => raw
                .parse::<f64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::String(raw.to_string())),
            "array" => serde_json::from_str(raw)
                .unwrap_or_else(|_| Value::String(raw.to_string())),
            _ => Value::String(raw.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classification_covers_every_kind() {
        assert_eq!(SettingValue::classify(&json!(true)).kind(), "boolean");
        assert_eq!(SettingValue::classify(&json!(42)).kind(), "integer");
        assert_eq!(SettingValue::classify(&json!(2.5)).kind(), "float");
        assert_eq!(SettingValue::classify(&json!("dark")).kind(), "string");
        assert_eq!(SettingValue::classify(&json!([1, 2])).kind(), "array");
        // no dedicated variant: stored as a string
        assert_eq!(SettingValue::classify(&json!(null)).kind(), "string");
    }

    #[test]
    fn stored_and_revived_round_trip() {
        for value in [json!(true), json!(7), json!(1.25), json!("light"), json!(["a", "b"])] {
            let setting = SettingValue::classify(&value);
            let revived = SettingValue::revive(setting.kind(), &setting.stored());
            assert_eq!(revived, value);
        }
    }

    #[test]
    fn corrupt_stored_value_degrades_to_string() {
        assert_eq!(SettingValue::revive("integer", "not-a-number"), json!("not-a-number"));
        assert_eq!(SettingValue::revive("array", "{broken"), json!("{broken"));
    }
}
