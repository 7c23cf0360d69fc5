//! Question analysis: which tables matter, what shape of SQL is wanted.
//!
//! The analyzer is deliberately heuristic and deterministic. Table detection
//! runs staged strategies: exact name variants and a keyword index first,
//! fuzzy matching only when those find nothing, and finally graph
//! centrality as a fallback so downstream always has at least one table to
//! work with. The output of [`QueryAnalyzer::analyze`] plus
//! [`QueryAnalyzer::focused_context`] is everything the prompt composer
//! needs.

mod fuzzy;
mod keywords;

pub use keywords::QueryType;

use std::collections::{BTreeMap, BTreeSet, HashMap};

use inflector::Inflector;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::schema::{SchemaGraph, TableDescriptor};

/// How many tables the centrality fallback surfaces.
const CENTRALITY_LIMIT: usize = 3;

/// How many fuzzy candidates one token may contribute.
const FUZZY_PER_TOKEN: usize = 2;

/// Literal values spotted in a question, as hints for WHERE clauses.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterHints {
    /// Quoted strings, in order of appearance.
    pub exact_values: Vec<String>,
    /// Bare numbers, in order of appearance.
    pub numeric_values: Vec<f64>,
    /// Boolean-ish words with their polarity.
    pub boolean_keywords: Vec<(String, bool)>,
}

impl FilterHints {
    pub fn is_empty(&self) -> bool {
        self.exact_values.is_empty()
            && self.numeric_values.is_empty()
            && self.boolean_keywords.is_empty()
    }
}

/// Everything the analyzer concluded about one question.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryAnalysis {
    pub relevant_tables: BTreeSet<String>,
    /// Columns of relevant tables the question appears to mention.
    pub mentioned_columns: BTreeMap<String, Vec<String>>,
    pub query_type: QueryType,
    /// Difficulty band from 1 (trivial) to 5.
    pub complexity_level: u8,
    pub filter_hints: FilterHints,
}

/// One foreign-key relationship inside a focused context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Relationship {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

/// The schema slice handed to the prompt composer: relevant tables expanded
/// one foreign-key hop in both directions, plus the edges between them.
#[derive(Debug, Clone, Serialize)]
pub struct FocusedContext {
    pub tables: Vec<TableDescriptor>,
    pub relationships: Vec<Relationship>,
    pub total_tables_in_db: usize,
    pub focused_table_count: usize,
}

static QUOTED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"'([^']+)'|"([^"]+)""#).expect("quoted value pattern"));
static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d+(?:\.\d+)?\b").expect("number pattern"));

/// Boolean-ish question words and the value they imply.
static BOOLEAN_CUES: &[(&str, bool)] = &[
    ("inactive", false),
    ("active", true),
    ("disabled", false),
    ("enabled", true),
    ("false", false),
    ("true", true),
];

/// Heuristic question analyzer over one schema graph.
pub struct QueryAnalyzer<'a> {
    graph: &'a SchemaGraph,
    /// Lowercased schema word -> tables it belongs to.
    keyword_index: HashMap<String, BTreeSet<String>>,
    /// Lowercased table names, for fuzzy matching.
    table_names: Vec<String>,
}

impl<'a> QueryAnalyzer<'a> {
    pub fn new(graph: &'a SchemaGraph) -> Self {
        let mut keyword_index: HashMap<String, BTreeSet<String>> = HashMap::new();
        for table in &graph.tables {
            for word in schema_words(&table.name) {
                keyword_index
                    .entry(word)
                    .or_default()
                    .insert(table.name.clone());
            }
            for column in &table.columns {
                for word in schema_words(&column.name) {
                    keyword_index
                        .entry(word)
                        .or_default()
                        .insert(table.name.clone());
                }
            }
        }
        let table_names = graph
            .tables
            .iter()
            .map(|t| t.name.to_lowercase())
            .collect();
        Self {
            graph,
            keyword_index,
            table_names,
        }
    }

    /// Analyze one natural-language question.
    pub fn analyze(&self, question: &str) -> QueryAnalysis {
        let question_lower = question.to_lowercase();
        let words = question_tokens(&question_lower);

        let mut relevant_tables = self.exact_matches(&question_lower);
        relevant_tables.extend(self.keyword_matches(&words));

        if relevant_tables.is_empty() {
            relevant_tables = self.fuzzy_matches(&words);
        }
        if relevant_tables.is_empty() {
            relevant_tables = self.central_tables();
        }

        let mentioned_columns = self.mentioned_columns(&relevant_tables, &words);
        let query_type = keywords::classify(&question_lower);
        let filter_hints = extract_filter_hints(&question_lower, &words);
        let complexity_level =
            complexity(relevant_tables.len(), query_type, &mentioned_columns);

        QueryAnalysis {
            relevant_tables,
            mentioned_columns,
            query_type,
            complexity_level,
            filter_hints,
        }
    }

    /// Expand the analysis into the schema slice for prompt composition.
    ///
    /// Relevant tables grow by one foreign-key hop in both directions;
    /// relationships are the edges with both endpoints inside that set.
    pub fn focused_context(&self, analysis: &QueryAnalysis) -> FocusedContext {
        let mut focused: BTreeSet<String> = analysis.relevant_tables.clone();

        for name in &analysis.relevant_tables {
            if let Some(table) = self.graph.table(name) {
                for fk in &table.foreign_keys {
                    if self.graph.table(&fk.referenced_table).is_some() {
                        focused.insert(fk.referenced_table.clone());
                    }
                }
            }
            for referencing in self.graph.referencing_tables(name) {
                focused.insert(referencing.name.clone());
            }
        }

        // Schema order keeps the rendered context stable between calls
        let tables: Vec<TableDescriptor> = self
            .graph
            .tables
            .iter()
            .filter(|t| focused.contains(&t.name))
            .cloned()
            .collect();

        let mut relationships = Vec::new();
        for table in &tables {
            for fk in &table.foreign_keys {
                if focused.contains(&fk.referenced_table) {
                    relationships.push(Relationship {
                        from_table: table.name.clone(),
                        from_column: fk.local_column.clone(),
                        to_table: fk.referenced_table.clone(),
                        to_column: fk.referenced_column.clone(),
                    });
                }
            }
        }

        FocusedContext {
            focused_table_count: tables.len(),
            total_tables_in_db: self.graph.table_count(),
            tables,
            relationships,
        }
    }

    /// Tables whose name (or a spacing/plural variant of it) appears
    /// verbatim in the question.
    fn exact_matches(&self, question_lower: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        for table in &self.graph.tables {
            let name = table.name.to_lowercase();
            let mut variants = vec![
                name.clone(),
                name.replace('_', " "),
                name.replace('_', ""),
            ];
            let singular = name.to_singular();
            if singular != name {
                variants.push(singular);
            }
            if variants.iter().any(|v| question_lower.contains(v.as_str())) {
                found.insert(table.name.clone());
            }
        }
        found
    }

    /// Tables reached through the schema keyword index.
    fn keyword_matches(&self, words: &[String]) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        for word in words {
            if let Some(tables) = self.keyword_index.get(word) {
                found.extend(tables.iter().cloned());
                continue;
            }
            // Singular form only when the word itself missed
            let singular = word.to_singular();
            if singular != *word {
                if let Some(tables) = self.keyword_index.get(&singular) {
                    found.extend(tables.iter().cloned());
                }
            }
        }
        found
    }

    /// Last-resort spelling tolerance, only consulted when the exact and
    /// keyword strategies both come up empty.
    fn fuzzy_matches(&self, words: &[String]) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        for word in words {
            for matched in fuzzy::close_matches(word, &self.table_names, FUZZY_PER_TOKEN) {
                if let Some(table) = self.graph.table(matched) {
                    found.insert(table.name.clone());
                }
            }
        }
        found
    }

    /// The most-connected tables by foreign-key degree, as a final
    /// fallback so the prompt never goes out empty.
    fn central_tables(&self) -> BTreeSet<String> {
        let mut degrees: Vec<(usize, &str)> = self
            .graph
            .tables
            .iter()
            .map(|table| {
                let out = table.foreign_keys.len();
                let inbound = self.graph.referencing_tables(&table.name).len();
                (out + inbound, table.name.as_str())
            })
            .collect();
        // Highest degree first, name order on ties
        degrees.sort_by(|(da, na), (db, nb)| db.cmp(da).then_with(|| na.cmp(nb)));
        degrees
            .into_iter()
            .take(CENTRALITY_LIMIT)
            .map(|(_, name)| name.to_string())
            .collect()
    }

    /// Columns of relevant tables whose name shares a word with the
    /// question.
    fn mentioned_columns(
        &self,
        relevant_tables: &BTreeSet<String>,
        words: &[String],
    ) -> BTreeMap<String, Vec<String>> {
        let mut mentioned = BTreeMap::new();
        for name in relevant_tables {
            let Some(table) = self.graph.table(name) else {
                continue;
            };
            let mut columns = Vec::new();
            for column in &table.columns {
                let column_words = schema_words(&column.name);
                let hit = words.iter().any(|word| {
                    word.len() > 3
                        && (column.name.to_lowercase() == *word
                            || column_words.iter().any(|cw| cw == word))
                });
                if hit {
                    columns.push(column.name.clone());
                }
            }
            if !columns.is_empty() {
                mentioned.insert(name.clone(), columns);
            }
        }
        mentioned
    }
}

/// Words a schema identifier contributes to the keyword index.
fn schema_words(identifier: &str) -> Vec<String> {
    identifier
        .to_snake_case()
        .split('_')
        .filter(|w| w.len() > 2 && !keywords::is_stop_word(w))
        .map(str::to_string)
        .collect()
}

/// Candidate keyword tokens from a lowercased question.
fn question_tokens(question_lower: &str) -> Vec<String> {
    question_lower
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| w.len() > 2 && !keywords::is_stop_word(w))
        .map(str::to_string)
        .collect()
}

/// Literal values that look like filter material.
fn extract_filter_hints(question_lower: &str, words: &[String]) -> FilterHints {
    let mut hints = FilterHints::default();

    for captures in QUOTED_RE.captures_iter(question_lower) {
        if let Some(value) = captures.get(1).or_else(|| captures.get(2)) {
            hints.exact_values.push(value.as_str().to_string());
        }
    }

    for m in NUMBER_RE.find_iter(question_lower) {
        if let Ok(value) = m.as_str().parse::<f64>() {
            hints.numeric_values.push(value);
        }
    }

    for (cue, polarity) in BOOLEAN_CUES {
        if words.iter().any(|w| w == cue) {
            hints.boolean_keywords.push((cue.to_string(), *polarity));
        }
    }

    hints
}

/// Band the difficulty of a question from 1 to 5.
fn complexity(
    table_count: usize,
    query_type: QueryType,
    mentioned_columns: &BTreeMap<String, Vec<String>>,
) -> u8 {
    let mut score: u8 = 1;
    if table_count > 1 {
        score += 1;
    }
    if table_count > 3 {
        score += 1;
    }
    if table_count > 5 {
        score += 1;
    }
    if matches!(
        query_type,
        QueryType::Aggregation | QueryType::Join | QueryType::TopN
    ) {
        score += 1;
    }
    let column_total: usize = mentioned_columns.values().map(Vec::len).sum();
    if column_total > 5 {
        score += 1;
    }
    score.min(5)
}
