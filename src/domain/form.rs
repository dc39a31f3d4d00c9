use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A published questionnaire: an ordered list of fields plus metadata.
///
/// `fields` order is meaningful (display and export order) and is preserved
/// verbatim across updates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Form {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub fields: Vec<Field>,
    pub created_at: DateTime<Utc>,
}

/// One typed input definition within a form.
///
/// `id` is caller-supplied (the builder UI uses a time-based token) and only
/// needs to be unique within its owning form. `options` carries the choices
/// for select/radio/checkbox fields and rides along unused for the rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub id: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    pub label: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Email,
    Textarea,
    Select,
    Radio,
    Checkbox,
    Number,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_type_serializes_lowercase() {
        for (ty, expected) in [
            (FieldType::Text, "\"text\""),
            (FieldType::Email, "\"email\""),
            (FieldType::Textarea, "\"textarea\""),
            (FieldType::Select, "\"select\""),
            (FieldType::Radio, "\"radio\""),
            (FieldType::Checkbox, "\"checkbox\""),
            (FieldType::Number, "\"number\""),
        ] {
            assert_eq!(serde_json::to_string(&ty).unwrap(), expected);
            let back: FieldType = serde_json::from_str(expected).unwrap();
            assert_eq!(back, ty);
        }
    }

    #[test]
    fn unknown_field_type_is_rejected() {
        assert!(serde_json::from_str::<FieldType>("\"file\"").is_err());
    }

    #[test]
    fn field_list_round_trips_in_order() {
        let fields = vec![
            Field {
                id: "1700000000001".into(),
                field_type: FieldType::Text,
                label: "Name".into(),
                required: true,
                placeholder: Some("Your name".into()),
                options: vec![],
            },
            Field {
                id: "1700000000002".into(),
                field_type: FieldType::Checkbox,
                label: "Toppings".into(),
                required: false,
                placeholder: None,
                options: vec!["Cheese".into(), "Olives".into()],
            },
        ];
        let json = serde_json::to_string(&fields).unwrap();
        let back: Vec<Field> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, fields);
    }

    #[test]
    fn field_defaults_apply_for_sparse_input() {
        let field: Field =
            serde_json::from_str(r#"{"id":"f1","type":"text","label":"Name"}"#).unwrap();
        assert!(!field.required);
        assert_eq!(field.placeholder, None);
        assert!(field.options.is_empty());
    }
}
