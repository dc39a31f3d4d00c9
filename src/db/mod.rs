use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// Raw `forms` row. `fields` is the JSON text of the field list; only the
/// service layer parses it, the rest of the app sees structured types.
#[derive(Debug, FromRow)]
pub struct FormRow {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub fields: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct ResponseRow {
    pub id: Uuid,
    pub form_id: Uuid,
    pub answers: String,
    pub submitter_name: Option<String>,
    pub submitter_email: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// Response row joined with its form title.
#[derive(Debug, FromRow)]
pub struct JoinedResponseRow {
    pub id: Uuid,
    pub form_id: Uuid,
    pub answers: String,
    pub submitter_name: Option<String>,
    pub submitter_email: Option<String>,
    pub submitted_at: DateTime<Utc>,
    pub form_title: String,
}

pub async fn list_forms(pool: &PgPool) -> Result<Vec<FormRow>, sqlx::Error> {
    sqlx::query_as::<_, FormRow>(
        "SELECT id, title, description, fields, created_at
         FROM forms
         ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await
}

pub async fn find_form(pool: &PgPool, id: Uuid) -> Result<Option<FormRow>, sqlx::Error> {
    sqlx::query_as::<_, FormRow>(
        "SELECT id, title, description, fields, created_at FROM forms WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn form_exists(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM forms WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await
}

pub async fn insert_form(pool: &PgPool, row: &FormRow) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO forms (id, title, description, fields, created_at)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(row.id)
    .bind(&row.title)
    .bind(&row.description)
    .bind(&row.fields)
    .bind(row.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Wholesale replacement of title/description/fields; `created_at` is never
/// touched. Returns the updated row, or None when no row matched.
pub async fn update_form(
    pool: &PgPool,
    id: Uuid,
    title: &str,
    description: &str,
    fields: &str,
) -> Result<Option<FormRow>, sqlx::Error> {
    sqlx::query_as::<_, FormRow>(
        "UPDATE forms SET title = $2, description = $3, fields = $4
         WHERE id = $1
         RETURNING id, title, description, fields, created_at",
    )
    .bind(id)
    .bind(title)
    .bind(description)
    .bind(fields)
    .fetch_optional(pool)
    .await
}

/// Returns the number of rows deleted; responses go with the form via
/// ON DELETE CASCADE.
pub async fn delete_form(pool: &PgPool, id: Uuid) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM forms WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub async fn insert_response(pool: &PgPool, row: &ResponseRow) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO responses (id, form_id, answers, submitter_name, submitter_email, submitted_at)
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(row.id)
    .bind(row.form_id)
    .bind(&row.answers)
    .bind(&row.submitter_name)
    .bind(&row.submitter_email)
    .bind(row.submitted_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn responses_for_form(
    pool: &PgPool,
    form_id: Uuid,
) -> Result<Vec<ResponseRow>, sqlx::Error> {
    sqlx::query_as::<_, ResponseRow>(
        "SELECT id, form_id, answers, submitter_name, submitter_email, submitted_at
         FROM responses
         WHERE form_id = $1
         ORDER BY submitted_at DESC",
    )
    .bind(form_id)
    .fetch_all(pool)
    .await
}

pub async fn all_responses(pool: &PgPool) -> Result<Vec<JoinedResponseRow>, sqlx::Error> {
    sqlx::query_as::<_, JoinedResponseRow>(
        "SELECT r.id, r.form_id, r.answers, r.submitter_name, r.submitter_email,
                r.submitted_at, f.title AS form_title
         FROM responses r
         JOIN forms f ON f.id = r.form_id
         ORDER BY r.submitted_at DESC",
    )
    .fetch_all(pool)
    .await
}

pub async fn recent_responses(
    pool: &PgPool,
    limit: i64,
) -> Result<Vec<JoinedResponseRow>, sqlx::Error> {
    sqlx::query_as::<_, JoinedResponseRow>(
        "SELECT r.id, r.form_id, r.answers, r.submitter_name, r.submitter_email,
                r.submitted_at, f.title AS form_title
         FROM responses r
         JOIN forms f ON f.id = r.form_id
         ORDER BY r.submitted_at DESC
         LIMIT $1",
    )
    .bind(limit)
    .fetch_all(pool)
    .await
}

pub async fn count_forms(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM forms")
        .fetch_one(pool)
        .await
}

pub async fn count_responses(pool: &PgPool) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM responses")
        .fetch_one(pool)
        .await
}

/// True when the error is a Postgres foreign-key violation (SQLSTATE 23503),
/// i.e. the referenced form disappeared between the existence check and the
/// insert.
pub fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23503"))
}
