use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{self, FormRow};
use crate::domain::form::{Field, Form};
use crate::error::AppError;

/// Create/update payload. Title and fields stay optional at the type level
/// so a missing key yields a ValidationError with a usable message rather
/// than a body-level rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormInput {
    pub title: Option<String>,
    pub description: Option<String>,
    pub fields: Option<Vec<Field>>,
}

fn validated(input: FormInput) -> Result<(String, String, Vec<Field>), AppError> {
    let title = input
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::validation("title is required"))?;
    // An empty list is fine here; the builder UI is what insists on at
    // least one field.
    let fields = input
        .fields
        .ok_or_else(|| AppError::validation("fields must be a list"))?;
    Ok((title, input.description.unwrap_or_default(), fields))
}

fn form_from_row(row: FormRow) -> Result<Form, AppError> {
    let fields: Vec<Field> = serde_json::from_str(&row.fields)?;
    Ok(Form {
        id: row.id,
        title: row.title,
        description: row.description,
        fields,
        created_at: row.created_at,
    })
}

pub async fn list_forms(pool: &PgPool) -> Result<Vec<Form>, AppError> {
    db::list_forms(pool)
        .await?
        .into_iter()
        .map(form_from_row)
        .collect()
}

pub async fn get_form(pool: &PgPool, id: Uuid) -> Result<Form, AppError> {
    let row = db::find_form(pool, id)
        .await?
        .ok_or(AppError::NotFound("form"))?;
    form_from_row(row)
}

pub async fn create_form(pool: &PgPool, input: FormInput) -> Result<Form, AppError> {
    let (title, description, fields) = validated(input)?;
    let form = Form {
        id: Uuid::new_v4(),
        title,
        description,
        fields,
        created_at: Utc::now(),
    };
    let row = FormRow {
        id: form.id,
        title: form.title.clone(),
        description: form.description.clone(),
        fields: serde_json::to_string(&form.fields)?,
        created_at: form.created_at,
    };
    db::insert_form(pool, &row).await?;
    tracing::info!(form_id = %form.id, "form created");
    Ok(form)
}

pub async fn update_form(pool: &PgPool, id: Uuid, input: FormInput) -> Result<Form, AppError> {
    let (title, description, fields) = validated(input)?;
    let fields_json = serde_json::to_string(&fields)?;
    let row = db::update_form(pool, id, &title, &description, &fields_json)
        .await?
        .ok_or(AppError::NotFound("form"))?;
    tracing::info!(form_id = %id, "form updated");
    form_from_row(row)
}

pub async fn delete_form(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    let deleted = db::delete_form(pool, id).await?;
    if deleted == 0 {
        return Err(AppError::NotFound("form"));
    }
    tracing::info!(form_id = %id, "form deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::form::FieldType;

    fn input(title: Option<&str>, fields: Option<Vec<Field>>) -> FormInput {
        FormInput {
            title: title.map(String::from),
            description: None,
            fields,
        }
    }

    #[test]
    fn missing_title_is_rejected() {
        let err = validated(input(None, Some(vec![]))).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn blank_title_is_rejected() {
        let err = validated(input(Some("   "), Some(vec![]))).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn missing_fields_is_rejected_even_with_title() {
        let err = validated(input(Some("Survey"), None)).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn empty_field_list_is_accepted() {
        let (title, description, fields) =
            validated(input(Some("  Survey  "), Some(vec![]))).unwrap();
        assert_eq!(title, "Survey");
        assert_eq!(description, "");
        assert!(fields.is_empty());
    }

    #[test]
    fn fields_pass_through_unchanged() {
        let field = Field {
            id: "f1".into(),
            field_type: FieldType::Radio,
            label: "Size".into(),
            required: true,
            placeholder: None,
            options: vec!["S".into(), "M".into(), "L".into()],
        };
        let (_, _, fields) = validated(FormInput {
            title: Some("Order".into()),
            description: Some("Pick one".into()),
            fields: Some(vec![field.clone()]),
        })
        .unwrap();
        assert_eq!(fields, vec![field]);
    }

    #[test]
    fn malformed_stored_fields_surface_as_payload_error() {
        let row = FormRow {
            id: Uuid::new_v4(),
            title: "Survey".into(),
            description: String::new(),
            fields: "not json".into(),
            created_at: Utc::now(),
        };
        assert!(matches!(form_from_row(row), Err(AppError::Payload(_))));
    }
}
