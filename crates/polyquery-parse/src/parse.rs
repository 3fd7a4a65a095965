use std::fmt;

use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::normalize::{coerce_numeric_regex, normalize_regex_literals, relax_json};

/// Prefix every document query must start with.
pub const STORE_PREFIX: &str = "store.";

/// Operation named in a document query. Matching is case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Find,
    Count,
    InsertOne,
    UpdateOne,
    DeleteOne,
}

impl Verb {
    pub const ALL: [Self; 5] = [
        Self::Find,
        Self::Count,
        Self::InsertOne,
        Self::UpdateOne,
        Self::DeleteOne,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Find => "find",
            Self::Count => "count",
            Self::InsertOne => "insertOne",
            Self::UpdateOne => "updateOne",
            Self::DeleteOne => "deleteOne",
        }
    }

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|verb| verb.as_str() == name)
    }

    /// The `.<verb>(` call marker as it appears inside a query.
    #[must_use]
    pub fn call_marker(self) -> String {
        format!(".{}(", self.as_str())
    }

    #[must_use]
    pub fn is_write(self) -> bool {
        matches!(self, Self::InsertOne | Self::UpdateOne | Self::DeleteOne)
    }

    fn arity(self) -> usize {
        match self {
            Self::UpdateOne => 2,
            _ => 1,
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A document query broken into its collection, verb and JSON arguments.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedOperation {
    collection: String,
    verb: Verb,
    first: Map<String, Value>,
    second: Option<Map<String, Value>>,
}

impl ParsedOperation {
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    #[must_use]
    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// The filter (or the inserted document for `insertOne`).
    #[must_use]
    pub fn first(&self) -> &Map<String, Value> {
        &self.first
    }

    /// The update document of an `updateOne`.
    #[must_use]
    pub fn second(&self) -> Option<&Map<String, Value>> {
        self.second.as_ref()
    }
}

/// Parses `store.<collection>.<verb>(<args>)` into a [`ParsedOperation`].
///
/// The argument body is everything between the `(` following the verb and
/// the last `)` of the query, so nested parentheses inside the JSON are
/// tolerated. Regex shorthand (`/john/i`) is rewritten before the JSON is
/// parsed, and `deleteOne` filters get numeric regexes turned back into
/// integers.
///
/// # Errors
///
/// Returns a [`ParseError`] describing the first structural problem found.
pub fn parse_operation(query: &str) -> Result<ParsedOperation, ParseError> {
    let query = query.trim();
    let remainder = query
        .strip_prefix(STORE_PREFIX)
        .ok_or(ParseError::MissingPrefix)?;

    let (collection, operation) = remainder
        .split_once('.')
        .ok_or(ParseError::MissingOperation)?;
    let collection = collection.trim();
    if collection.is_empty() {
        return Err(ParseError::MissingCollection);
    }

    let open = operation.find('(');
    let name = open.map_or(operation, |open| &operation[..open]).trim();
    let verb = Verb::from_name(name).ok_or_else(|| ParseError::UnsupportedVerb(name.to_string()))?;

    let missing = ParseError::MissingParenthesis {
        verb: verb.as_str(),
    };
    let Some(open) = open else {
        return Err(missing);
    };
    let Some(close) = operation.rfind(')') else {
        return Err(missing);
    };
    if close <= open {
        return Err(missing);
    }

    let body = normalize_regex_literals(operation[open + 1..close].trim());
    let fragments = if body.is_empty() {
        Vec::new()
    } else {
        split_top_level(&body)
    };

    let expected = verb.arity();
    let found = fragments.len();
    let arguments = if found == 0 && verb != Verb::UpdateOne {
        Vec::new()
    } else if found == expected {
        fragments
            .iter()
            .map(|fragment| parse_object(fragment))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        return Err(ParseError::ArgumentCount {
            verb: verb.as_str(),
            expected,
            found,
        });
    };

    let mut arguments = arguments.into_iter();
    let mut first = arguments.next().unwrap_or_default();
    let second = arguments.next();
    if verb == Verb::DeleteOne {
        coerce_numeric_regex(&mut first);
    }

    Ok(ParsedOperation {
        collection: collection.to_string(),
        verb,
        first,
        second,
    })
}

/// Splits an argument body at commas that sit outside strings and nested
/// objects or arrays.
pub(crate) fn split_top_level(body: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut start = 0;

    for (index, c) in body.char_indices() {
        if let Some(open_quote) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == open_quote {
                quote = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => quote = Some(c),
            '{' | '[' => depth += 1,
            '}' | ']' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(body[start..index].trim());
                start = index + 1;
            }
            _ => {}
        }
    }
    parts.push(body[start..].trim());
    parts
}

fn parse_object(fragment: &str) -> Result<Map<String, Value>, ParseError> {
    let relaxed = relax_json(fragment);
    let value: Value =
        serde_json::from_str(&relaxed).map_err(|source| ParseError::InvalidJson {
            fragment: fragment.to_string(),
            source,
        })?;
    match value {
        Value::Object(map) => Ok(map),
        _ => Err(ParseError::NotAnObject {
            fragment: fragment.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn find_with_bare_keys() {
        let op = parse_operation(r#"store.users.find({city: "London"})"#).expect("should parse");

        assert_eq!(op.collection(), "users");
        assert_eq!(op.verb(), Verb::Find);
        assert_eq!(op.first(), &object(json!({"city": "London"})));
        assert!(op.second().is_none());
    }

    #[test]
    fn update_one_takes_filter_and_document() {
        let op = parse_operation(r#"store.users.updateOne({id: 9}, {name: "A"})"#)
            .expect("should parse");

        assert_eq!(op.verb(), Verb::UpdateOne);
        assert_eq!(op.first(), &object(json!({"id": 9})));
        assert_eq!(op.second(), Some(&object(json!({"name": "A"}))));
    }

    #[test]
    fn update_one_splits_at_top_level_only() {
        let op = parse_operation(
            r#"store.orders.updateOne({"items": [1, 2], "meta": {"a": 1, "b": 2}}, {"note": "x, y"})"#,
        )
        .expect("should parse");

        assert_eq!(
            op.first(),
            &object(json!({"items": [1, 2], "meta": {"a": 1, "b": 2}}))
        );
        assert_eq!(op.second(), Some(&object(json!({"note": "x, y"}))));
    }

    #[test]
    fn update_one_with_single_body_is_rejected() {
        let err = parse_operation(r#"store.users.updateOne({id: 9})"#).expect_err("should fail");

        assert!(matches!(
            err,
            ParseError::ArgumentCount {
                expected: 2,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn update_one_with_three_bodies_is_rejected() {
        let err = parse_operation(r#"store.users.updateOne({id: 9}, {a: 1}, {b: 2})"#)
            .expect_err("should fail");

        assert!(matches!(err, ParseError::ArgumentCount { found: 3, .. }));
    }

    #[test]
    fn update_one_with_empty_body_is_rejected() {
        let err = parse_operation("store.users.updateOne()").expect_err("should fail");

        assert!(matches!(err, ParseError::ArgumentCount { found: 0, .. }));
    }

    #[test]
    fn find_with_two_bodies_is_rejected() {
        let err = parse_operation("store.users.find({a: 1}, {b: 1})").expect_err("should fail");

        assert!(matches!(
            err,
            ParseError::ArgumentCount {
                expected: 1,
                found: 2,
                ..
            }
        ));
    }

    #[test]
    fn empty_find_body_means_match_all() {
        let op = parse_operation("store.users.find()").expect("should parse");

        assert!(op.first().is_empty());
    }

    #[test]
    fn nested_parentheses_use_last_closing_paren() {
        let op = parse_operation(r#"store.notes.insertOne({text: "call (555) 0100"})"#)
            .expect("should parse");

        assert_eq!(op.first(), &object(json!({"text": "call (555) 0100"})));
    }

    #[test]
    fn regex_shorthand_is_normalized_before_parsing() {
        let op = parse_operation("store.users.find({name: /john/i})").expect("should parse");

        assert_eq!(
            op.first(),
            &object(json!({"name": {"$regex": "john", "$options": "i"}}))
        );
    }

    #[test]
    fn regex_shorthand_inside_array_is_normalized() {
        let op = parse_operation("store.users.find({name: {$in: [/jo/i, /an/i]}})")
            .expect("should parse");

        assert_eq!(
            op.first(),
            &object(json!({"name": {"$in": [
                {"$regex": "jo", "$options": "i"},
                {"$regex": "an", "$options": "i"}
            ]}}))
        );
    }

    #[test]
    fn regex_lookalike_in_string_value_is_kept_verbatim() {
        let op = parse_operation(r#"store.notes.insertOne({text: "ratio: /x/i"})"#)
            .expect("should parse");

        assert_eq!(op.first(), &object(json!({"text": "ratio: /x/i"})));
    }

    #[test]
    fn delete_filter_numeric_regex_becomes_integer() {
        let op =
            parse_operation(r#"store.users.deleteOne({id: {regex: "^9$"}})"#).expect("should parse");

        assert_eq!(op.first(), &object(json!({"id": 9})));
    }

    #[test]
    fn find_filter_numeric_regex_is_left_alone() {
        let op =
            parse_operation(r#"store.users.find({id: {"$regex": "^9$"}})"#).expect("should parse");

        assert_eq!(op.first(), &object(json!({"id": {"$regex": "^9$"}})));
    }

    #[test]
    fn missing_prefix_is_rejected() {
        let err = parse_operation(r"db.users.find({})").expect_err("should fail");

        assert!(matches!(err, ParseError::MissingPrefix));
        assert!(err.to_string().contains("store.<collection>"));
    }

    #[test]
    fn unknown_verb_is_rejected() {
        let err = parse_operation("store.users.aggregate([])").expect_err("should fail");

        assert!(matches!(err, ParseError::UnsupportedVerb(ref verb) if verb == "aggregate"));
    }

    #[test]
    fn verbs_are_case_sensitive() {
        let err = parse_operation("store.users.insertone({a: 1})").expect_err("should fail");

        assert!(matches!(err, ParseError::UnsupportedVerb(_)));
    }

    #[test]
    fn missing_closing_paren_is_rejected() {
        let err = parse_operation("store.users.find({a: 1}").expect_err("should fail");

        assert!(matches!(err, ParseError::MissingParenthesis { verb: "find" }));
    }

    #[test]
    fn missing_collection_is_rejected() {
        let err = parse_operation("store..find({})").expect_err("should fail");

        assert!(matches!(err, ParseError::MissingCollection));
    }

    #[test]
    fn malformed_json_carries_fragment() {
        let err = parse_operation("store.users.find({name: })").expect_err("should fail");

        match err {
            ParseError::InvalidJson { fragment, .. } => assert_eq!(fragment, "{name: }"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn array_argument_is_rejected() {
        let err = parse_operation("store.users.insertOne([1, 2])").expect_err("should fail");

        assert!(matches!(err, ParseError::NotAnObject { .. }));
    }

    #[test]
    fn split_top_level_ignores_commas_in_strings() {
        let parts = split_top_level(r#"{a: "1,2"}, {b: '3,4'}"#);

        assert_eq!(parts, vec![r#"{a: "1,2"}"#, "{b: '3,4'}"]);
    }

    #[test]
    fn split_top_level_without_separator_yields_one_part() {
        assert_eq!(split_top_level("{id: 9}"), vec!["{id: 9}"]);
    }
}
