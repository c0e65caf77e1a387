use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use mealdesk_core::analytics::{AnalysisKind, AnalysisReport};

use super::{AnalysisResultRepository, RepositoryError};
use crate::DbPool;

/// One stored analysis run: its parameters, the full report, and the
/// recommendation lines joined with newlines.
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisResultRecord {
    pub id: String,
    pub analysis_type: AnalysisKind,
    pub parameters: Value,
    pub result: Value,
    pub recommendations: String,
    pub created_at: DateTime<Utc>,
}

impl AnalysisResultRecord {
    pub fn from_report<E, X>(
        report: &AnalysisReport<E, X>,
        parameters: Value,
        created_at: DateTime<Utc>,
    ) -> Result<Self, RepositoryError>
    where
        E: Serialize,
        X: Serialize,
    {
        let result = serde_json::to_value(report)
            .map_err(|error| RepositoryError::Encode(error.to_string()))?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            analysis_type: report.analysis_type,
            parameters,
            result,
            recommendations: report.recommendations.join("\n"),
            created_at,
        })
    }
}

pub struct SqlAnalysisResultRepository {
    pool: DbPool,
}

impl SqlAnalysisResultRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl AnalysisResultRepository for SqlAnalysisResultRepository {
    async fn save(&self, record: AnalysisResultRecord) -> Result<(), RepositoryError> {
        let parameters_json = serde_json::to_string(&record.parameters)
            .map_err(|error| RepositoryError::Encode(error.to_string()))?;
        let result_json = serde_json::to_string(&record.result)
            .map_err(|error| RepositoryError::Encode(error.to_string()))?;

        sqlx::query(
            "INSERT INTO ai_analysis_result
                (id, analysis_type, parameters_json, result_json, recommendations, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.id)
        .bind(record.analysis_type.as_str())
        .bind(parameters_json)
        .bind(result_json)
        .bind(&record.recommendations)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_recent(
        &self,
        kind: Option<AnalysisKind>,
        limit: u32,
    ) -> Result<Vec<AnalysisResultRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, analysis_type, parameters_json, result_json, recommendations, created_at
             FROM ai_analysis_result
             WHERE (?1 IS NULL OR analysis_type = ?1)
             ORDER BY created_at DESC, rowid DESC
             LIMIT ?2",
        )
        .bind(kind.map(|kind| kind.as_str()))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(record_from_row).collect()
    }
}

fn record_from_row(row: &SqliteRow) -> Result<AnalysisResultRecord, RepositoryError> {
    let kind_raw = row.try_get::<String, _>("analysis_type")?;
    let analysis_type = AnalysisKind::parse(&kind_raw)
        .ok_or_else(|| RepositoryError::Decode(format!("unknown analysis type `{kind_raw}`")))?;

    Ok(AnalysisResultRecord {
        id: row.try_get("id")?,
        analysis_type,
        parameters: parse_json("parameters_json", row.try_get("parameters_json")?)?,
        result: parse_json("result_json", row.try_get("result_json")?)?,
        recommendations: row.try_get("recommendations")?,
        created_at: parse_timestamp("created_at", row.try_get("created_at")?)?,
    })
}

fn parse_json(column: &str, value: String) -> Result<Value, RepositoryError> {
    serde_json::from_str(&value)
        .map_err(|error| RepositoryError::Decode(format!("invalid json in `{column}` ({error})")))
}

fn parse_timestamp(column: &str, value: String) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value).map(|timestamp| timestamp.with_timezone(&Utc)).map_err(
        |error| {
            RepositoryError::Decode(format!("invalid timestamp in `{column}`: `{value}` ({error})"))
        },
    )
}
