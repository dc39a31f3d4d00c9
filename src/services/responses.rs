use std::collections::BTreeMap;

use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{self, JoinedResponseRow, ResponseRow};
use crate::domain::form::Form;
use crate::domain::response::{AnswerValue, DashboardStats, FormResponse, ResponseWithForm};
use crate::error::AppError;
use crate::services::forms;

const RECENT_RESPONSES: i64 = 5;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitInput {
    pub answers: Option<Value>,
    pub submitter_name: Option<String>,
    pub submitter_email: Option<String>,
}

/// Converts the raw `answers` JSON into the typed mapping. Only strings and
/// arrays of strings are accepted; anything else is rejected rather than
/// coerced. Keys are not checked against the form's field list.
fn parse_answers(value: Value) -> Result<BTreeMap<String, AnswerValue>, AppError> {
    let Value::Object(map) = value else {
        return Err(AppError::validation("answers must be an object"));
    };
    let mut answers = BTreeMap::new();
    for (key, raw) in map {
        let parsed = match raw {
            Value::String(s) => AnswerValue::Scalar(s),
            Value::Array(items) => {
                let mut strings = Vec::with_capacity(items.len());
                for item in items {
                    let Value::String(s) = item else {
                        return Err(AppError::validation(format!(
                            "answer \"{key}\" must contain only strings"
                        )));
                    };
                    strings.push(s);
                }
                AnswerValue::Multi(strings)
            }
            _ => {
                return Err(AppError::validation(format!(
                    "answer \"{key}\" must be a string or a list of strings"
                )))
            }
        };
        answers.insert(key, parsed);
    }
    Ok(answers)
}

fn response_from_row(row: ResponseRow) -> Result<FormResponse, AppError> {
    let answers: BTreeMap<String, AnswerValue> = serde_json::from_str(&row.answers)?;
    Ok(FormResponse {
        id: row.id,
        form_id: row.form_id,
        answers,
        submitter_name: row.submitter_name,
        submitter_email: row.submitter_email,
        submitted_at: row.submitted_at,
    })
}

fn joined_from_row(row: JoinedResponseRow) -> Result<ResponseWithForm, AppError> {
    let answers: BTreeMap<String, AnswerValue> = serde_json::from_str(&row.answers)?;
    Ok(ResponseWithForm {
        response: FormResponse {
            id: row.id,
            form_id: row.form_id,
            answers,
            submitter_name: row.submitter_name,
            submitter_email: row.submitter_email,
            submitted_at: row.submitted_at,
        },
        form_title: row.form_title,
    })
}

pub async fn submit_response(
    pool: &PgPool,
    form_id: Uuid,
    input: SubmitInput,
) -> Result<FormResponse, AppError> {
    let answers = input
        .answers
        .ok_or_else(|| AppError::validation("answers object is required"))?;
    let answers = parse_answers(answers)?;

    if !db::form_exists(pool, form_id).await? {
        return Err(AppError::NotFound("form"));
    }

    let response = FormResponse {
        id: Uuid::new_v4(),
        form_id,
        answers,
        submitter_name: input.submitter_name,
        submitter_email: input.submitter_email,
        submitted_at: Utc::now(),
    };
    let row = ResponseRow {
        id: response.id,
        form_id: response.form_id,
        answers: serde_json::to_string(&response.answers)?,
        submitter_name: response.submitter_name.clone(),
        submitter_email: response.submitter_email.clone(),
        submitted_at: response.submitted_at,
    };
    // The existence check above is not atomic with the insert; the FK
    // constraint catches a form deleted in between.
    db::insert_response(pool, &row).await.map_err(|err| {
        if db::is_foreign_key_violation(&err) {
            AppError::NotFound("form")
        } else {
            AppError::Store(err)
        }
    })?;
    tracing::info!(response_id = %response.id, form_id = %form_id, "response recorded");
    Ok(response)
}

pub async fn list_form_responses(
    pool: &PgPool,
    form_id: Uuid,
) -> Result<Vec<FormResponse>, AppError> {
    db::responses_for_form(pool, form_id)
        .await?
        .into_iter()
        .map(response_from_row)
        .collect()
}

pub async fn list_all_responses(pool: &PgPool) -> Result<Vec<ResponseWithForm>, AppError> {
    db::all_responses(pool)
        .await?
        .into_iter()
        .map(joined_from_row)
        .collect()
}

pub async fn dashboard_stats(pool: &PgPool) -> Result<DashboardStats, AppError> {
    let total_forms = db::count_forms(pool).await?;
    let total_responses = db::count_responses(pool).await?;
    let recent_responses = db::recent_responses(pool, RECENT_RESPONSES)
        .await?
        .into_iter()
        .map(joined_from_row)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(DashboardStats {
        total_forms,
        total_responses,
        avg_responses_per_form: format_average(total_responses, total_forms),
        recent_responses,
    })
}

/// One decimal place, `"0"` when there are no forms to divide by.
fn format_average(total_responses: i64, total_forms: i64) -> String {
    if total_forms == 0 {
        return "0".to_string();
    }
    format!("{:.1}", total_responses as f64 / total_forms as f64)
}

pub async fn export_csv(pool: &PgPool, form_id: Uuid) -> Result<(String, String), AppError> {
    let form = forms::get_form(pool, form_id).await?;
    let responses = list_form_responses(pool, form_id).await?;
    Ok((export_filename(&form.title), render_csv(&form, &responses)))
}

/// Builds the export: a header of `Submitted At`, `Name`, `Email` plus one
/// column per field label in form field order, then one row per response,
/// newest first. Cells for a field come from the answer stored under that
/// field's id; missing answers render empty.
fn render_csv(form: &Form, responses: &[FormResponse]) -> String {
    let mut header: Vec<String> = vec!["Submitted At".into(), "Name".into(), "Email".into()];
    header.extend(form.fields.iter().map(|f| f.label.clone()));

    let mut lines = Vec::with_capacity(responses.len() + 1);
    lines.push(csv_line(&header));
    for response in responses {
        let mut cells = vec![
            response.submitted_at.to_rfc3339(),
            response.submitter_name.clone().unwrap_or_default(),
            response.submitter_email.clone().unwrap_or_default(),
        ];
        for field in &form.fields {
            cells.push(
                response
                    .answers
                    .get(&field.id)
                    .map(AnswerValue::as_cell)
                    .unwrap_or_default(),
            );
        }
        lines.push(csv_line(&cells));
    }
    lines.join("\n")
}

/// Every cell is quoted; embedded quotes are doubled so a quote inside an
/// answer cannot terminate the cell.
fn csv_line(cells: &[String]) -> String {
    cells
        .iter()
        .map(|cell| format!("\"{}\"", cell.replace('"', "\"\"")))
        .collect::<Vec<_>>()
        .join(",")
}

fn export_filename(title: &str) -> String {
    let mut stem = String::new();
    let mut pending_sep = false;
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !stem.is_empty() {
                stem.push('_');
            }
            stem.push(c.to_ascii_lowercase());
            pending_sep = false;
        } else {
            pending_sep = true;
        }
    }
    if stem.is_empty() {
        "form_responses.csv".to_string()
    } else {
        format!("{stem}_responses.csv")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::form::{Field, FieldType};
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn average_is_zero_string_without_forms() {
        assert_eq!(format_average(0, 0), "0");
        assert_eq!(format_average(7, 0), "0");
    }

    #[test]
    fn average_has_one_decimal_place() {
        assert_eq!(format_average(5, 2), "2.5");
        assert_eq!(format_average(6, 3), "2.0");
        assert_eq!(format_average(1, 3), "0.3");
    }

    #[test]
    fn answers_must_be_an_object() {
        for bad in [json!("text"), json!(7), json!(["a"]), json!(null)] {
            assert!(matches!(
                parse_answers(bad),
                Err(AppError::Validation(_))
            ));
        }
    }

    #[test]
    fn answer_values_accept_strings_and_string_lists() {
        let answers = parse_answers(json!({
            "name": "Alice",
            "tags": ["a", "b"],
            "unknown_key": "tolerated",
        }))
        .unwrap();
        assert_eq!(answers["name"], AnswerValue::Scalar("Alice".into()));
        assert_eq!(
            answers["tags"],
            AnswerValue::Multi(vec!["a".into(), "b".into()])
        );
        assert!(answers.contains_key("unknown_key"));
    }

    #[test]
    fn answer_values_reject_other_shapes() {
        assert!(parse_answers(json!({ "n": 42 })).is_err());
        assert!(parse_answers(json!({ "n": { "nested": true } })).is_err());
        assert!(parse_answers(json!({ "n": ["ok", 1] })).is_err());
        assert!(parse_answers(json!({ "n": null })).is_err());
    }

    fn sample_form() -> Form {
        Form {
            id: Uuid::new_v4(),
            title: "Signup".into(),
            description: String::new(),
            fields: vec![
                Field {
                    id: "name".into(),
                    field_type: FieldType::Text,
                    label: "Name".into(),
                    required: true,
                    placeholder: None,
                    options: vec![],
                },
                Field {
                    id: "tags".into(),
                    field_type: FieldType::Checkbox,
                    label: "Tags".into(),
                    required: false,
                    placeholder: None,
                    options: vec!["a".into(), "b".into()],
                },
            ],
            created_at: Utc::now(),
        }
    }

    fn sample_response(form: &Form, answers: BTreeMap<String, AnswerValue>) -> FormResponse {
        FormResponse {
            id: Uuid::new_v4(),
            form_id: form.id,
            answers,
            submitter_name: None,
            submitter_email: None,
            submitted_at: Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn csv_header_and_row_follow_field_order() {
        let form = sample_form();
        let mut answers = BTreeMap::new();
        answers.insert("name".to_string(), AnswerValue::Scalar("Alice".into()));
        answers.insert(
            "tags".to_string(),
            AnswerValue::Multi(vec!["a".into(), "b".into()]),
        );
        let csv = render_csv(&form, &[sample_response(&form, answers)]);
        let mut lines = csv.lines();
        assert_eq!(
            lines.next().unwrap(),
            r#""Submitted At","Name","Email","Name","Tags""#
        );
        let row = lines.next().unwrap();
        assert!(row.ends_with(r#""Alice","a, b""#), "row was: {row}");
        assert!(lines.next().is_none());
    }

    #[test]
    fn csv_missing_answers_render_empty() {
        let form = sample_form();
        let csv = render_csv(&form, &[sample_response(&form, BTreeMap::new())]);
        let row = csv.lines().nth(1).unwrap();
        assert!(row.ends_with(r#"","","""#), "row was: {row}");
    }

    #[test]
    fn csv_doubles_embedded_quotes() {
        let form = sample_form();
        let mut answers = BTreeMap::new();
        answers.insert(
            "name".to_string(),
            AnswerValue::Scalar(r#"Alice "The Ace""#.into()),
        );
        let csv = render_csv(&form, &[sample_response(&form, answers)]);
        assert!(csv.contains(r#""Alice ""The Ace""""#));
    }

    #[test]
    fn export_filename_is_sanitized() {
        assert_eq!(export_filename("Customer Survey"), "customer_survey_responses.csv");
        assert_eq!(export_filename("Q3 — Feedback!"), "q3_feedback_responses.csv");
        assert_eq!(export_filename("***"), "form_responses.csv");
    }
}
