// Database model structs

use chrono::{DateTime, Utc};
use color_eyre::{eyre::WrapErr, Result};
use sqlx::types::Json;

use crate::models::{Assessment, Question};

/// Column list shared by every assessment query.
pub(crate) const ASSESSMENT_COLUMNS: &str =
    "id, reading_level, category, questions, status, is_active, created_by, created_at, updated_at";

#[derive(sqlx::FromRow)]
pub struct AssessmentRow {
    pub id: String,
    pub reading_level: String,
    pub category: String,
    pub questions: Json<Vec<Question>>,
    pub status: String,
    pub is_active: bool,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<AssessmentRow> for Assessment {
    type Error = color_eyre::Report;

    fn try_from(row: AssessmentRow) -> Result<Self> {
        Ok(Assessment {
            reading_level: row
                .reading_level
                .parse()
                .wrap_err_with(|| format!("assessment {} has a bad reading level", row.id))?,
            category: row
                .category
                .parse()
                .wrap_err_with(|| format!("assessment {} has a bad category", row.id))?,
            status: row
                .status
                .parse()
                .wrap_err_with(|| format!("assessment {} has a bad status", row.id))?,
            questions: row.questions.0,
            is_active: row.is_active,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_at: row.updated_at,
            id: row.id,
        })
    }
}
