use std::sync::LazyLock;

use polyquery_core::QueryIntent;
use polyquery_parse::{STORE_PREFIX, Verb};
use regex::Regex;

static RELATIONAL_DENYLIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:drop|truncate|alter|grant|revoke|create|replace|exec|execute)\b")
        .expect("relational denylist pattern is valid")
});

static DOCUMENT_DENYLIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\b(?:dropDatabase|drop|eval|mapReduce|runCommand)\b|\$where\b)")
        .expect("document denylist pattern is valid")
});

const RELATIONAL_WRITE_KEYWORDS: [&str; 3] = ["insert", "update", "delete"];

/// Rules a generated query must pass before it reaches a driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyPolicy {
    Relational,
    Document,
}

impl SafetyPolicy {
    #[must_use]
    pub fn is_safe(self, query: &str) -> bool {
        match self {
            Self::Relational => relational_is_safe(query),
            Self::Document => document_is_safe(query),
        }
    }

    /// Whether the query reads or writes. Says nothing about safety.
    #[must_use]
    pub fn classify(self, query: &str) -> QueryIntent {
        let is_write = match self {
            Self::Relational => {
                let keyword = leading_keyword(query).to_ascii_lowercase();
                RELATIONAL_WRITE_KEYWORDS.contains(&keyword.as_str())
            }
            Self::Document => Verb::ALL
                .into_iter()
                .filter(|verb| verb.is_write())
                .any(|verb| query.contains(&verb.call_marker())),
        };
        if is_write {
            QueryIntent::Write
        } else {
            QueryIntent::Read
        }
    }
}

/// The first word of a statement, used to pick the execution path.
pub(crate) fn leading_keyword(query: &str) -> &str {
    query
        .trim_start()
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default()
}

fn relational_is_safe(query: &str) -> bool {
    if query.trim().is_empty() {
        return false;
    }
    if query.contains(';') || query.contains("--") || query.contains("/*") {
        return false;
    }
    !RELATIONAL_DENYLIST.is_match(query)
}

fn document_is_safe(query: &str) -> bool {
    let query = query.trim();
    if !query.starts_with(STORE_PREFIX) {
        return false;
    }
    if DOCUMENT_DENYLIST.is_match(query) {
        return false;
    }
    let calls: usize = Verb::ALL
        .into_iter()
        .map(|verb| query.matches(&verb.call_marker()).count())
        .sum();
    calls == 1
}
