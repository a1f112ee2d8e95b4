//! Lookup of the raw values behind a signature.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::catalog::TableKey;
use crate::error::Result;
use crate::extractor::SNAPSHOT_TABLE;
use crate::patterns::STRICT_PATTERN_SIGNATURE_FUNCTION;
use crate::security::SqlSecurity;

use super::{grouped_counts, ViewEngine};

/// A raw value whose strict signature matched, with its number of occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternMatch {
    pub value: String,
    pub count: u64,
}

impl ViewEngine {
    /// Finds the values of `column` whose strict signature equals `pattern`.
    ///
    /// Signatures are recomputed from the snapshot with the strict variant,
    /// which drops punctuation and whitespace, so a stored pattern such as
    /// `AA-NN` has to be looked up as `AANN`. Results are ordered by count
    /// descending, then by value.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn pattern_matches(
        &self,
        key: &TableKey,
        column: &str,
        pattern: &str,
    ) -> Result<Vec<PatternMatch>> {
        SqlSecurity::validate_signature(pattern)?;
        let (ctx, resolved) = self.snapshot_session(key, column).await?;
        let col = SqlSecurity::quote_identifier(&resolved.name)?;
        let target = SqlSecurity::quote_literal(pattern)?;

        let sql = format!(
            "SELECT v, cnt FROM ( \
                SELECT {col} AS v, COUNT(*) AS cnt FROM {SNAPSHOT_TABLE} \
                WHERE {STRICT_PATTERN_SIGNATURE_FUNCTION}({col}) = {target} \
                GROUP BY {col} \
             ) m ORDER BY cnt DESC, v ASC"
        );
        self.log_query("pattern_matches", &sql);

        Ok(grouped_counts(&ctx, &sql)
            .await?
            .into_iter()
            .filter_map(|(value, count)| value.map(|value| PatternMatch { value, count }))
            .collect())
    }
}
