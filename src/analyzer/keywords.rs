//! Question classification rule tables.
//!
//! Ordered regex cues over the lowercased question decide the query type.
//! The first matching band wins, so aggregation cues outrank ranking cues,
//! which outrank join and filter cues. A question with no cues at all is a
//! simple select.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Shape of SQL a question is asking for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    SimpleSelect,
    Filter,
    Join,
    Aggregation,
    TopN,
}

impl QueryType {
    /// Stable lowercase tag used in responses and prompts.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::SimpleSelect => "simple_select",
            QueryType::Filter => "filter",
            QueryType::Join => "join",
            QueryType::Aggregation => "aggregation",
            QueryType::TopN => "top_n",
        }
    }
}

static CUES: Lazy<Vec<(Regex, QueryType)>> = Lazy::new(|| {
    let table: &[(&str, QueryType)] = &[
        (
            r"\b(count|how many|how much|average|avg|sum|total|number of|maximum|minimum|max|min)\b",
            QueryType::Aggregation,
        ),
        (
            r"\b(best|worst|top|bottom|highest|lowest|most|least|first|last|newest|oldest)\b",
            QueryType::TopN,
        ),
        (
            r"\b(with their|and their|along with|together with|related|for each|per)\b",
            QueryType::Join,
        ),
        (
            r"\b(where|only|which|whose|greater than|less than|more than|fewer than|at least|at most|between|after|before|since)\b",
            QueryType::Filter,
        ),
    ];
    table
        .iter()
        .map(|(pattern, ty)| {
            (
                Regex::new(pattern).expect("query cue pattern"),
                *ty,
            )
        })
        .collect()
});

/// Classify a question. `question` must already be lowercased.
pub fn classify(question: &str) -> QueryType {
    for (pattern, query_type) in CUES.iter() {
        if pattern.is_match(question) {
            return *query_type;
        }
    }
    QueryType::SimpleSelect
}

/// Common English words that never identify a table or column.
pub static STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "was", "were", "has", "have", "had", "does",
    "did", "all", "any", "can", "get", "got", "his", "her", "its", "our",
    "their", "that", "this", "these", "those", "what", "when", "who", "why",
    "how", "many", "much", "show", "list", "give", "find", "with", "from",
    "into", "than", "then", "them", "they", "you", "your", "not", "but",
    "out", "per", "each", "every", "there", "about", "more", "most",
];

/// Whether a token is too generic to act as a schema keyword.
pub fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word)
}
