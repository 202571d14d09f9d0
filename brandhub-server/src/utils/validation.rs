use std::collections::BTreeMap;

use anyhow::Result;
use brandhub_core::HubError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::{json, Value};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

fn friendly_message(code: &str) -> Option<&'static str> {
    match code {
        "required" => Some("is required"),
        "email" => Some("must be a valid email"),
        "length" => Some("has invalid length"),
        "range" => Some("is out of range"),
        _ => None,
    }
}

fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

fn collect(out: &mut BTreeMap<String, Vec<String>>, prefix: &str, errs: &ValidationErrors) {
    for (field, kind) in errs.errors() {
        let key = join_path(prefix, field);
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for e in field_errors {
                    let msg = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .or_else(|| friendly_message(&e.code).map(|m| m.to_string()))
                        .unwrap_or_else(|| e.code.to_string());
                    out.entry(key.clone()).or_default().push(msg);
                }
            }
            ValidationErrorsKind::Struct(nested) => collect(out, &key, nested),
            ValidationErrorsKind::List(items) => {
                for (idx, nested) in items {
                    collect(out, &format!("{key}[{idx}]"), nested);
                }
            }
        }
    }
}

/// `deserialize_with` helper: strip surrounding whitespace before any
/// `length` rule sees the value.
pub fn trimmed<'de, D>(de: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(de).map(|s| s.trim().to_string())
}

/// [`trimmed`] for optional fields; pair it with `#[serde(default)]`.
pub fn trimmed_opt<'de, D>(de: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(de).map(|o| o.map(|s| s.trim().to_string()))
}

/// Deserialize and validate a request body.
///
/// Both shape and rule failures become a 400 whose `errors` map field paths
/// to messages. A `null` body is treated as `{}`.
pub fn validate<T>(data: &Value, message: &str) -> Result<T>
where
    T: DeserializeOwned + Validate,
{
    let data = if data.is_null() { json!({}) } else { data.clone() };
    let parsed: T = serde_json::from_value(data).map_err(|e| {
        HubError::bad_request(message)
            .with_errors(json!({ "_schema": [e.to_string()] }))
            .into_anyhow()
    })?;

    parsed.validate().map_err(|e| {
        let mut fields = BTreeMap::new();
        collect(&mut fields, "", &e);
        HubError::bad_request(message)
            .with_errors(json!(fields))
            .into_anyhow()
    })?;

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use brandhub_core::ErrorKind;

    #[derive(Debug, Deserialize, Validate)]
    struct Signup {
        #[validate(email(message = "Enter a valid email address"))]
        email: String,
        #[validate(length(min = 1, max = 5))]
        name: Option<String>,
    }

    #[derive(Debug, Deserialize, Validate)]
    struct Titled {
        #[serde(default, deserialize_with = "trimmed")]
        #[validate(length(min = 1, max = 5))]
        title: String,
        #[serde(default, deserialize_with = "trimmed_opt")]
        #[validate(length(min = 1))]
        note: Option<String>,
    }

    #[test]
    fn rule_failures_are_keyed_by_field() {
        let err = validate::<Signup>(&json!({"email": "nope", "name": "toolong"}), "Invalid signup")
            .unwrap_err();
        let hub = HubError::from_anyhow(&err).unwrap();
        assert_eq!(hub.kind, ErrorKind::BadRequest);
        assert_eq!(hub.message, "Invalid signup");
        let errors = hub.errors.as_ref().unwrap();
        assert_eq!(errors["email"], json!(["Enter a valid email address"]));
        assert_eq!(errors["name"], json!(["has invalid length"]));
    }

    #[test]
    fn shape_failures_are_bad_requests_too() {
        let err = validate::<Signup>(&json!({"email": 5}), "Invalid signup").unwrap_err();
        assert_eq!(HubError::kind_of(&err), Some(ErrorKind::BadRequest));
        let err = validate::<Signup>(&Value::Null, "Invalid signup").unwrap_err();
        assert_eq!(HubError::kind_of(&err), Some(ErrorKind::BadRequest));
    }

    #[test]
    fn whitespace_only_text_is_empty() {
        let err = validate::<Titled>(&json!({"title": "   "}), "Invalid").unwrap_err();
        let errors = HubError::from_anyhow(&err).unwrap().errors.clone().unwrap();
        assert_eq!(errors["title"], json!(["has invalid length"]));

        let err = validate::<Titled>(&json!({"title": "ok", "note": " \t "}), "Invalid").unwrap_err();
        let errors = HubError::from_anyhow(&err).unwrap().errors.clone().unwrap();
        assert_eq!(errors["note"], json!(["has invalid length"]));

        // padding does not count toward the maximum either
        let parsed = validate::<Titled>(&json!({"title": "  abcde  "}), "Invalid").unwrap();
        assert_eq!(parsed.title, "abcde");
        assert_eq!(parsed.note, None);
    }
}
