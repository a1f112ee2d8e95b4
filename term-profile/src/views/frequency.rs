//! Value and pattern frequency rankings.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::artifacts;
use crate::catalog::TableKey;
use crate::error::Result;
use crate::extractor::{register_parquet, SNAPSHOT_TABLE};
use crate::security::SqlSecurity;
use crate::summarizer::round2;

use super::{grouped_counts, resolve_column, ViewEngine};

const PATTERN_TABLE: &str = "patterns";

/// One group of a frequency ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueFrequency {
    /// Rendered value; `None` is the group of nulls.
    pub value: Option<String>,
    pub count: u64,
    /// Share of the returned groups' total, two decimals.
    pub percentage: f64,
}

fn with_percentages(groups: Vec<(Option<String>, u64)>) -> Vec<ValueFrequency> {
    let total: u64 = groups.iter().map(|(_, count)| count).sum();
    groups
        .into_iter()
        .map(|(value, count)| ValueFrequency {
            value,
            count,
            percentage: if total == 0 {
                0.0
            } else {
                round2(100.0 * count as f64 / total as f64)
            },
        })
        .collect()
}

fn ranking_sql(table: &str, col: &str, limit: usize) -> String {
    format!(
        "SELECT v, cnt FROM (SELECT {col} AS v, COUNT(*) AS cnt FROM {table} GROUP BY {col}) g \
         ORDER BY cnt DESC, v ASC NULLS LAST LIMIT {limit}"
    )
}

impl ViewEngine {
    /// Ranks the raw values of `column` by frequency.
    ///
    /// Nulls form a single group. Ties are broken by ascending value and at
    /// most `frequency_limit` groups are returned.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn value_frequencies(&self, key: &TableKey, column: &str) -> Result<Vec<ValueFrequency>> {
        let (ctx, resolved) = self.snapshot_session(key, column).await?;
        let col = SqlSecurity::quote_identifier(&resolved.name)?;

        let sql = ranking_sql(SNAPSHOT_TABLE, &col, self.config().frequency_limit);
        self.log_query("value_frequencies", &sql);
        Ok(with_percentages(grouped_counts(&ctx, &sql).await?))
    }

    /// Ranks the stored signatures of `column` by frequency.
    ///
    /// Returns `None` when the table has no pattern artifact or `column` was
    /// not generalized (it is not a string column).
    #[instrument(skip(self), fields(key = %key))]
    pub async fn pattern_frequencies(
        &self,
        key: &TableKey,
        column: &str,
    ) -> Result<Option<Vec<ValueFrequency>>> {
        let entry = self.entry(key)?;
        let snapshot = self.open_snapshot(&entry)?;
        resolve_column(&snapshot, key, column)?;

        let Some(pattern_path) = entry.pattern_path.as_deref() else {
            return Ok(None);
        };
        let pattern_schema = match artifacts::read_schema(pattern_path) {
            Ok((schema, _)) => schema,
            Err(e) => return Err(self.artifact_missing(key, pattern_path, e)?),
        };
        if pattern_schema.field_with_name(column).is_err() {
            return Ok(None);
        }

        let ctx = self.config().session_context();
        register_parquet(&ctx, PATTERN_TABLE, pattern_path).await?;
        let col = SqlSecurity::quote_identifier(column)?;

        let sql = ranking_sql(PATTERN_TABLE, &col, self.config().frequency_limit);
        self.log_query("pattern_frequencies", &sql);
        Ok(Some(with_percentages(grouped_counts(&ctx, &sql).await?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentages_of_visible_total() {
        let rows = with_percentages(vec![
            (Some("a".to_string()), 2),
            (Some("b".to_string()), 1),
            (None, 3),
        ]);
        assert_eq!(rows[0].percentage, 33.33);
        assert_eq!(rows[1].percentage, 16.67);
        assert_eq!(rows[2].percentage, 50.0);
        assert!(rows[2].value.is_none());
    }

    #[test]
    fn test_empty_ranking() {
        assert!(with_percentages(Vec::new()).is_empty());
    }

    #[test]
    fn test_ranking_sql_shape() {
        let sql = ranking_sql("snapshot", "\"code\"", 100);
        assert!(sql.contains("GROUP BY \"code\""));
        assert!(sql.ends_with("ORDER BY cnt DESC, v ASC NULLS LAST LIMIT 100"));
    }
}
