//! Prompt composition.
//!
//! Renders the focused schema slice, value profiles and analysis hints into
//! a single generation prompt. Rendering is deterministic: tables arrive in
//! schema order, profiled values in their stored order, so the same cached
//! context and question always produce the same prompt.

use std::fmt::Write as _;

use crate::analyzer::{FocusedContext, QueryAnalysis, QueryType, Relationship};
use crate::config::Driver;
use crate::profile::{DatabaseProfile, ProfileValues};
use crate::schema::TableDescriptor;

/// Builds generation prompts from analyzed context.
pub struct PromptComposer {
    driver: Driver,
}

impl PromptComposer {
    pub fn new(driver: Driver) -> Self {
        Self { driver }
    }

    /// Render the full prompt for one question.
    pub fn compose(
        &self,
        question: &str,
        context: &FocusedContext,
        analysis: &QueryAnalysis,
        profile: &DatabaseProfile,
    ) -> String {
        let mut out = String::with_capacity(4096);

        out.push_str("You are an expert SQL analyst. Generate a single read-only SQL query ");
        let _ = writeln!(
            out,
            "for a {} database that answers the user's question.",
            dialect_name(self.driver)
        );
        out.push('\n');

        let _ = writeln!(
            out,
            "## Schema ({} of {} tables shown)",
            context.focused_table_count, context.total_tables_in_db
        );
        for table in &context.tables {
            render_table(&mut out, table);
        }

        if !context.relationships.is_empty() {
            out.push_str("\n## Relationships\n");
            for rel in &context.relationships {
                render_relationship(&mut out, rel);
            }
        }

        render_profiles(&mut out, context, profile);
        render_guidance(&mut out, analysis);
        render_examples(&mut out, context, analysis);

        out.push_str("\n## Output format\n");
        out.push_str("Respond in exactly this format, nothing else:\n");
        out.push_str("SQL: <the query>\n");
        out.push_str("EXPLANATION: <one short sentence>\n");

        out.push_str("\n## Question\n");
        out.push_str(question.trim());
        out.push('\n');

        out
    }
}

fn dialect_name(driver: Driver) -> &'static str {
    match driver {
        Driver::Postgres => "PostgreSQL",
        Driver::MySql => "MySQL",
    }
}

fn render_table(out: &mut String, table: &TableDescriptor) {
    let _ = writeln!(out, "\nTABLE {}", table.name);
    for column in &table.columns {
        let _ = write!(out, "  {} {}", column.name, column.declared_type);
        if let Some(len) = column.max_length {
            let _ = write!(out, "({len})");
        }
        if !column.nullable {
            out.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            let _ = write!(out, " DEFAULT {default}");
        }
        if table.primary_keys.iter().any(|pk| pk == &column.name) {
            out.push_str(" [PK]");
        }
        out.push('\n');
    }
}

fn render_relationship(out: &mut String, rel: &Relationship) {
    let _ = writeln!(
        out,
        "{}.{} -> {}.{}",
        rel.from_table, rel.from_column, rel.to_table, rel.to_column
    );
}

/// Known column values, so the model filters on values that actually exist.
fn render_profiles(out: &mut String, context: &FocusedContext, profile: &DatabaseProfile) {
    let mut section = String::new();
    for table in &context.tables {
        let Some(table_profile) = profile.table(&table.name) else {
            continue;
        };
        for (column, column_profile) in &table_profile.columns {
            match &column_profile.values {
                ProfileValues::Enumeration(values) if !values.is_empty() => {
                    let rendered: Vec<String> = values
                        .iter()
                        .map(|v| format!("'{}' ({} rows)", v.value, v.count))
                        .collect();
                    let _ = writeln!(
                        section,
                        "{}.{}: {}",
                        table.name,
                        column,
                        rendered.join(", ")
                    );
                }
                ProfileValues::Samples(samples) if !samples.is_empty() => {
                    let rendered: Vec<String> =
                        samples.iter().map(|v| format!("'{v}'")).collect();
                    let _ = writeln!(
                        section,
                        "{}.{}: e.g. {} ({} distinct values)",
                        table.name,
                        column,
                        rendered.join(", "),
                        column_profile.distinct_count
                    );
                }
                _ => {}
            }
        }
    }
    if !section.is_empty() {
        out.push_str("\n## Known column values\n");
        out.push_str(&section);
    }
}

fn render_guidance(out: &mut String, analysis: &QueryAnalysis) {
    out.push_str("\n## Guidance\n");
    let guidance = match analysis.query_type {
        QueryType::Aggregation => {
            "The question asks for an aggregate. Use COUNT/SUM/AVG/MIN/MAX with GROUP BY where appropriate."
        }
        QueryType::TopN => {
            "The question asks for a ranking. Use ORDER BY with LIMIT."
        }
        QueryType::Join => {
            "The question spans related tables. JOIN along the foreign keys listed above."
        }
        QueryType::Filter => {
            "The question asks for a subset. Use a WHERE clause, preferring the known column values above."
        }
        QueryType::SimpleSelect => {
            "A plain SELECT over one table is likely enough."
        }
    };
    out.push_str(guidance);
    out.push('\n');

    if !analysis.filter_hints.is_empty() {
        let hints = &analysis.filter_hints;
        if !hints.exact_values.is_empty() {
            let _ = writeln!(
                out,
                "Quoted values in the question: {}",
                hints
                    .exact_values
                    .iter()
                    .map(|v| format!("'{v}'"))
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        if !hints.numeric_values.is_empty() {
            let _ = writeln!(
                out,
                "Numbers in the question: {}",
                hints
                    .numeric_values
                    .iter()
                    .map(f64::to_string)
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        for (word, value) in &hints.boolean_keywords {
            let _ = writeln!(out, "\"{word}\" likely means a boolean column = {value}");
        }
    }
}

/// A couple of schema-true example queries to anchor the output shape.
fn render_examples(out: &mut String, context: &FocusedContext, analysis: &QueryAnalysis) {
    let Some(first) = analysis
        .relevant_tables
        .iter()
        .next()
        .and_then(|name| context.tables.iter().find(|t| &t.name == name))
        .or_else(|| context.tables.first())
    else {
        return;
    };

    out.push_str("\n## Example queries over this schema\n");
    let _ = writeln!(out, "SELECT * FROM {} LIMIT 10;", first.name);
    let _ = writeln!(out, "SELECT COUNT(*) FROM {};", first.name);
    if let Some(rel) = context.relationships.first() {
        let _ = writeln!(
            out,
            "SELECT * FROM {} a JOIN {} b ON a.{} = b.{} LIMIT 10;",
            rel.from_table, rel.to_table, rel.from_column, rel.to_column
        );
    }
}
