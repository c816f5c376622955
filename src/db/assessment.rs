use chrono::{DateTime, Utc};
use color_eyre::Result;
use sqlx::{types::Json, QueryBuilder, Sqlite};

use super::models::{AssessmentRow, ASSESSMENT_COLUMNS};
use super::Db;
use crate::models::{Assessment, AssessmentFilter, AssessmentStatus, Category, ReadingLevel};
use crate::services::assessment::AssessmentRepository;

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(e) if e.is_unique_violation())
}

fn push_filter<'a>(builder: &mut QueryBuilder<'a, Sqlite>, filter: &AssessmentFilter) {
    let mut sep = " WHERE ";
    if let Some(level) = filter.reading_level {
        builder.push(sep).push("reading_level = ").push_bind(level.as_str());
        sep = " AND ";
    }
    if let Some(category) = filter.category {
        builder.push(sep).push("category = ").push_bind(category.as_str());
        sep = " AND ";
    }
    if let Some(status) = filter.status {
        builder.push(sep).push("status = ").push_bind(status.as_str());
    }
}

impl Db {
    /// Inserts a new assessment. Returns `false` when the reading level and
    /// category pair is already taken.
    pub async fn insert_assessment(&self, assessment: &Assessment) -> Result<bool> {
        let res = sqlx::query(
            r#"
            INSERT INTO assessments
                (id, reading_level, category, questions, status, is_active, created_by, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&assessment.id)
        .bind(assessment.reading_level.as_str())
        .bind(assessment.category.as_str())
        .bind(Json(&assessment.questions))
        .bind(assessment.status.as_str())
        .bind(assessment.is_active)
        .bind(&assessment.created_by)
        .bind(assessment.created_at)
        .bind(assessment.updated_at)
        .execute(&self.pool)
        .await;

        match res {
            Ok(_) => {
                tracing::info!(
                    id = %assessment.id,
                    reading_level = %assessment.reading_level,
                    category = %assessment.category,
                    "new assessment created"
                );
                Ok(true)
            }
            Err(e) if is_unique_violation(&e) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn get_assessment(&self, id: &str) -> Result<Option<Assessment>> {
        let row = sqlx::query_as::<_, AssessmentRow>(&format!(
            "SELECT {ASSESSMENT_COLUMNS} FROM assessments WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Assessment::try_from).transpose()
    }

    pub async fn find_assessment_by_combination(
        &self,
        reading_level: ReadingLevel,
        category: Category,
    ) -> Result<Option<Assessment>> {
        let row = sqlx::query_as::<_, AssessmentRow>(&format!(
            "SELECT {ASSESSMENT_COLUMNS} FROM assessments WHERE reading_level = ? AND category = ?"
        ))
        .bind(reading_level.as_str())
        .bind(category.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Assessment::try_from).transpose()
    }

    /// Overwrites the stored document. Returns `false` if it no longer exists.
    pub async fn update_assessment(&self, assessment: &Assessment) -> Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE assessments
            SET questions = ?, status = ?, is_active = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(Json(&assessment.questions))
        .bind(assessment.status.as_str())
        .bind(assessment.is_active)
        .bind(assessment.updated_at)
        .bind(&assessment.id)
        .execute(&self.pool)
        .await?;

        tracing::info!(id = %assessment.id, "assessment updated");
        Ok(res.rows_affected() > 0)
    }

    pub async fn delete_assessment(&self, id: &str) -> Result<bool> {
        let res = sqlx::query("DELETE FROM assessments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        tracing::info!("assessment deleted with id: {id}");
        Ok(res.rows_affected() > 0)
    }

    pub async fn set_assessment_status(
        &self,
        id: &str,
        status: AssessmentStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Assessment>> {
        let row = sqlx::query_as::<_, AssessmentRow>(&format!(
            r#"
            UPDATE assessments
            SET status = ?, is_active = ?, updated_at = ?
            WHERE id = ?
            RETURNING {ASSESSMENT_COLUMNS}
            "#
        ))
        .bind(status.as_str())
        .bind(status == AssessmentStatus::Active)
        .bind(updated_at)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        if row.is_some() {
            tracing::info!(id, %status, "assessment status changed");
        }
        row.map(Assessment::try_from).transpose()
    }

    /// Newest first. `limit: None` returns every match. The second value is
    /// the total number of matches regardless of paging.
    pub async fn list_assessments(
        &self,
        filter: &AssessmentFilter,
        offset: i64,
        limit: Option<i64>,
    ) -> Result<(Vec<Assessment>, i64)> {
        let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM assessments");
        push_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;

        let mut select = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {ASSESSMENT_COLUMNS} FROM assessments"
        ));
        push_filter(&mut select, filter);
        select.push(" ORDER BY created_at DESC, rowid DESC");
        if let Some(limit) = limit {
            select.push(" LIMIT ").push_bind(limit);
            select.push(" OFFSET ").push_bind(offset);
        }

        let assessments = select
            .build_query_as::<AssessmentRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Assessment::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok((assessments, total))
    }
}

impl AssessmentRepository for Db {
    async fn find(&self, id: &str) -> Result<Option<Assessment>> {
        self.get_assessment(id).await
    }

    async fn find_by_combination(
        &self,
        reading_level: ReadingLevel,
        category: Category,
    ) -> Result<Option<Assessment>> {
        self.find_assessment_by_combination(reading_level, category)
            .await
    }

    async fn insert(&self, assessment: &Assessment) -> Result<bool> {
        self.insert_assessment(assessment).await
    }

    async fn save(&self, assessment: &Assessment) -> Result<bool> {
        self.update_assessment(assessment).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.delete_assessment(id).await
    }

    async fn set_status(
        &self,
        id: &str,
        status: AssessmentStatus,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Assessment>> {
        self.set_assessment_status(id, status, updated_at).await
    }

    async fn list(
        &self,
        filter: AssessmentFilter,
        offset: i64,
        limit: Option<i64>,
    ) -> Result<(Vec<Assessment>, i64)> {
        self.list_assessments(&filter, offset, limit).await
    }
}
