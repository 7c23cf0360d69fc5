//! Column value profiling.
//!
//! For columns whose declared type suggests bounded cardinality (boolean,
//! enum, short character types) the profiler issues aggregate queries to
//! collect row/null/distinct counts and either a full value-frequency
//! enumeration (low-cardinality columns) or a small sample of distinct
//! values. This is the single most expensive pass in the system, which is
//! exactly why its output is cached.
//!
//! Failures are absorbed per unit: a column or table that cannot be
//! profiled degrades to an absent profile and the pass continues.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ProfilerSettings;
use crate::engine::{DatabaseEngine, EngineResult};
use crate::schema::{ColumnDescriptor, SchemaGraph, TableDescriptor};

/// One observed value and how often it occurs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueCount {
    pub value: String,
    pub count: i64,
}

/// Either a complete enumeration with frequencies, or a bounded sample
/// without them. The two are mutually exclusive by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProfileValues {
    /// All distinct values, ordered by descending frequency.
    Enumeration(Vec<ValueCount>),
    /// A bounded sample of distinct values, no frequency data.
    Samples(Vec<String>),
}

/// Statistics for one profiled column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub total_rows: i64,
    pub null_count: i64,
    pub distinct_count: i64,
    pub values: ProfileValues,
}

impl ColumnProfile {
    /// The full enumeration, if this column has one.
    pub fn enumeration(&self) -> Option<&[ValueCount]> {
        match &self.values {
            ProfileValues::Enumeration(v) => Some(v),
            ProfileValues::Samples(_) => None,
        }
    }

    /// The bounded sample, if this column has one.
    pub fn sample_values(&self) -> Option<&[String]> {
        match &self.values {
            ProfileValues::Samples(v) => Some(v),
            ProfileValues::Enumeration(_) => None,
        }
    }
}

/// Profile of one table: row count plus per-column profiles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableProfile {
    pub row_count: i64,
    pub columns: BTreeMap<String, ColumnProfile>,
}

/// Profile of a whole database, keyed by table name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseProfile {
    pub tables: BTreeMap<String, TableProfile>,
}

impl DatabaseProfile {
    /// Profile for one table, if present.
    pub fn table(&self, name: &str) -> Option<&TableProfile> {
        self.tables.get(name)
    }
}

/// How to materialize values for a column, given its distinct count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValuePlan {
    /// No non-null values; the column is skipped.
    Skip,
    /// Fetch the full value-frequency enumeration.
    Enumerate,
    /// Fetch a bounded sample of distinct values.
    Sample,
}

/// Decide the value plan from a distinct count and enumeration threshold.
///
/// Exactly `threshold` distinct values still enumerates; `threshold + 1`
/// falls back to sampling.
pub fn value_plan(distinct_count: i64, threshold: i64) -> ValuePlan {
    if distinct_count <= 0 {
        ValuePlan::Skip
    } else if distinct_count <= threshold {
        ValuePlan::Enumerate
    } else {
        ValuePlan::Sample
    }
}

/// Column value profiler.
pub struct Profiler {
    settings: ProfilerSettings,
}

impl Profiler {
    pub fn new(settings: ProfilerSettings) -> Self {
        Self { settings }
    }

    /// Whether a column's declared type makes it worth profiling.
    ///
    /// Boolean and enum columns always qualify. Character columns qualify
    /// only when the catalog reports a maximum length at or below the
    /// configured cutoff; unbounded text is never profiled.
    pub fn is_candidate(&self, column: &ColumnDescriptor) -> bool {
        let ty = column.declared_type.to_lowercase();
        if ty.contains("bool") || ty.contains("enum") {
            return true;
        }
        if ty.contains("char") {
            return matches!(column.max_length, Some(n) if n > 0 && n <= self.settings.max_text_length);
        }
        false
    }

    /// Profile every table in the schema graph. Never fails as a whole.
    pub async fn profile_database(
        &self,
        engine: &dyn DatabaseEngine,
        graph: &SchemaGraph,
    ) -> DatabaseProfile {
        let mut profile = DatabaseProfile::default();
        for table in &graph.tables {
            debug!(table = table.name.as_str(), "profiling table");
            let table_profile = self.profile_table(engine, table).await;
            profile.tables.insert(table.name.clone(), table_profile);
        }
        debug!(tables = profile.tables.len(), "profiling complete");
        profile
    }

    /// Profile one table's candidate columns.
    pub async fn profile_table(
        &self,
        engine: &dyn DatabaseEngine,
        table: &TableDescriptor,
    ) -> TableProfile {
        let mut result = TableProfile::default();

        match engine.count_rows(&table.name).await {
            Ok(n) => result.row_count = n,
            Err(err) => {
                warn!(
                    table = table.name.as_str(),
                    error = %err,
                    "failed to count rows, continuing with 0"
                );
            }
        }

        for column in table.columns.iter().filter(|c| self.is_candidate(c)) {
            match self.profile_column(engine, &table.name, &column.name).await {
                Ok(Some(column_profile)) => {
                    result.columns.insert(column.name.clone(), column_profile);
                }
                Ok(None) => {} // no non-null values
                Err(err) => {
                    warn!(
                        table = table.name.as_str(),
                        column = column.name.as_str(),
                        error = %err,
                        "failed to profile column, skipping"
                    );
                }
            }
        }

        result
    }

    /// Profile a single column. Returns `None` when the column has no
    /// non-null values.
    pub async fn profile_column(
        &self,
        engine: &dyn DatabaseEngine,
        table: &str,
        column: &str,
    ) -> EngineResult<Option<ColumnProfile>> {
        let total_rows = engine.count_rows(table).await?;
        let null_count = engine.count_nulls(table, column).await?;
        let distinct_count = engine.count_distinct(table, column).await?;

        let values = match value_plan(distinct_count, self.settings.enumeration_threshold) {
            ValuePlan::Skip => return Ok(None),
            ValuePlan::Enumerate => {
                let frequencies = engine
                    .value_frequencies(table, column, self.settings.enumeration_threshold)
                    .await?;
                ProfileValues::Enumeration(
                    frequencies
                        .into_iter()
                        .map(|(value, count)| ValueCount { value, count })
                        .collect(),
                )
            }
            ValuePlan::Sample => {
                let samples = engine
                    .distinct_samples(table, column, self.settings.sample_size)
                    .await?;
                ProfileValues::Samples(samples)
            }
        };

        Ok(Some(ColumnProfile {
            total_rows,
            null_count,
            distinct_count,
            values,
        }))
    }
}
