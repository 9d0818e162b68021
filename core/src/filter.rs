//! List-query filters and their two wire encodings.
//!
//! A filter is a clause or a (possibly nested) list of clauses. OZmap
//! accepts it either as a `filter` field in the request body or as a JSON
//! `filter` query parameter whose values are percent-encoded individually.
//! `near` clauses carry geometry and are sent as-is in both modes.

use std::fmt;
use std::str::FromStr;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Characters `encodeURIComponent` escapes: everything but
/// `A-Z a-z 0-9 - _ . ! ~ * ' ( )`.
pub(crate) const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// How list filters travel to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// `{"filter": ...}` in the request body.
    #[default]
    Body,
    /// JSON `filter` query parameter with percent-encoded values.
    Url,
}

impl FromStr for FilterMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "URL" => Ok(FilterMode::Url),
            "BODY" | "" => Ok(FilterMode::Body),
            other => Err(Error::Configuration(format!("unknown filter mode: {other}"))),
        }
    }
}

/// Comparison operator of a clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "near")]
    Near,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::In => "in",
            Operator::Near => "near",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One filter condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clause {
    pub property: String,
    pub operator: Operator,
    pub value: Value,
}

impl Clause {
    pub fn new(property: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            property: property.into(),
            operator,
            value: value.into(),
        }
    }

    /// `property = value`.
    pub fn equals(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(property, Operator::Eq, value)
    }

    /// Copy of the clause with its value percent-encoded for URL mode.
    fn url_encoded(&self) -> Clause {
        if self.operator == Operator::Near {
            return self.clone();
        }
        let value = match &self.value {
            Value::Array(items) => Value::Array(items.iter().map(encode_value).collect()),
            scalar => encode_value(scalar),
        };
        Clause {
            value,
            ..self.clone()
        }
    }
}

/// A clause or an AND-group of filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Filter {
    Clause(Clause),
    Group(Vec<Filter>),
}

impl Filter {
    /// AND-group of the given clauses.
    pub fn all(clauses: impl IntoIterator<Item = Clause>) -> Self {
        Filter::Group(clauses.into_iter().map(Filter::Clause).collect())
    }

    /// True for a group with no clauses at any depth.
    pub fn is_empty(&self) -> bool {
        match self {
            Filter::Clause(_) => false,
            Filter::Group(items) => items.iter().all(Filter::is_empty),
        }
    }

    /// Normalize to a top-level list and percent-encode every clause value
    /// except `near` geometry.
    pub fn url_encoded(&self) -> Vec<Filter> {
        match self {
            Filter::Clause(clause) => vec![Filter::Clause(clause.url_encoded())],
            Filter::Group(items) => items.iter().map(Filter::encode_nested).collect(),
        }
    }

    fn encode_nested(&self) -> Filter {
        match self {
            Filter::Clause(clause) => Filter::Clause(clause.url_encoded()),
            Filter::Group(items) => Filter::Group(items.iter().map(Filter::encode_nested).collect()),
        }
    }
}

impl From<Clause> for Filter {
    fn from(clause: Clause) -> Self {
        Filter::Clause(clause)
    }
}

impl From<Vec<Clause>> for Filter {
    fn from(clauses: Vec<Clause>) -> Self {
        Filter::all(clauses)
    }
}

/// Value of the `filter` query parameter, or `None` when there is nothing
/// to filter on.
pub fn url_parameter(filter: Option<&Filter>) -> Result<Option<String>> {
    match filter {
        Some(filter) if !filter.is_empty() => Ok(Some(serde_json::to_string(&filter.url_encoded())?)),
        _ => Ok(None),
    }
}

/// JSON request body carrying the filter unmodified.
pub fn body(filter: Option<&Filter>) -> Value {
    match filter {
        Some(filter) => serde_json::json!({ "filter": filter }),
        None => serde_json::json!({}),
    }
}

/// Percent-encode one value the way `encodeURIComponent` would see it:
/// strings by content, other scalars by their textual form.
fn encode_value(value: &Value) -> Value {
    let text = match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Value::String(utf8_percent_encode(&text, URI_COMPONENT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use percent_encoding::percent_decode_str;
    use serde_json::json;

    fn decode(value: &Value) -> String {
        percent_decode_str(value.as_str().unwrap())
            .decode_utf8()
            .unwrap()
            .into_owned()
    }

    #[test]
    fn bare_clause_is_normalized_to_a_list() {
        let filter = Filter::from(Clause::equals("name", "CTO 01"));
        let encoded = filter.url_encoded();
        assert_eq!(encoded.len(), 1);
        let json = serde_json::to_value(&encoded).unwrap();
        assert_eq!(json, json!([{"property": "name", "operator": "=", "value": "CTO%2001"}]));
    }

    #[test]
    fn list_values_are_encoded_element_wise() {
        let filter = Filter::from(Clause::new("p", Operator::Eq, json!(["a b", "c"])));
        let encoded = serde_json::to_value(filter.url_encoded()).unwrap();
        let values = encoded[0]["value"].as_array().unwrap();
        assert_eq!(values, &vec![json!("a%20b"), json!("c")]);
        let decoded: Vec<String> = values.iter().map(decode).collect();
        assert_eq!(decoded, vec!["a b".to_string(), "c".to_string()]);
    }

    #[test]
    fn near_clause_is_left_untouched_while_siblings_are_encoded() {
        let near = Clause::new(
            "coords",
            Operator::Near,
            json!({"lat": -27.5, "lng": -48.5, "distance": "10 m"}),
        );
        let filter = Filter::all(vec![near.clone(), Clause::equals("name", "a/b")]);
        let encoded = filter.url_encoded();
        assert_eq!(encoded[0], Filter::Clause(near));
        match &encoded[1] {
            Filter::Clause(clause) => assert_eq!(clause.value, json!("a%2Fb")),
            other => panic!("expected clause, got {other:?}"),
        }
    }

    #[test]
    fn nested_groups_are_walked() {
        let filter = Filter::Group(vec![
            Filter::Clause(Clause::equals("kind", "x y")),
            Filter::Group(vec![Filter::Clause(Clause::new("n", Operator::Gt, 5))]),
        ]);
        let json = serde_json::to_value(filter.url_encoded()).unwrap();
        assert_eq!(json[0]["value"], "x%20y");
        assert_eq!(json[1][0]["value"], "5");
    }

    #[test]
    fn unreserved_characters_survive_encoding() {
        let encoded = encode_value(&json!("A-z_0.9!~*'()"));
        assert_eq!(encoded, json!("A-z_0.9!~*'()"));
        let encoded = encode_value(&json!("ção&=?"));
        assert_eq!(encoded, json!("%C3%A7%C3%A3o%26%3D%3F"));
    }

    #[test]
    fn absent_or_empty_filter_adds_no_parameter() {
        assert_eq!(url_parameter(None).unwrap(), None);
        assert_eq!(url_parameter(Some(&Filter::Group(Vec::new()))).unwrap(), None);
        assert_eq!(
            url_parameter(Some(&Filter::Group(vec![Filter::Group(Vec::new())]))).unwrap(),
            None
        );
    }

    #[test]
    fn body_keeps_an_empty_filter() {
        assert_eq!(body(None), json!({}));
        assert_eq!(body(Some(&Filter::Group(Vec::new()))), json!({"filter": []}));
    }

    #[test]
    fn body_mode_keeps_filter_unmodified() {
        let filter = Filter::from(Clause::equals("name", "a b"));
        assert_eq!(
            body(Some(&filter)),
            json!({"filter": {"property": "name", "operator": "=", "value": "a b"}})
        );
        assert_eq!(body(None), json!({}));
    }

    #[test]
    fn filter_deserializes_from_wire_shape() {
        let filter: Filter = serde_json::from_value(json!([
            {"property": "a", "operator": "in", "value": [1, 2]},
            [{"property": "b", "operator": "!=", "value": null}]
        ]))
        .unwrap();
        match filter {
            Filter::Group(items) => {
                assert_eq!(items.len(), 2);
                assert!(matches!(items[1], Filter::Group(_)));
            }
            other => panic!("expected group, got {other:?}"),
        }
    }

    #[test]
    fn filter_mode_parses_env_values() {
        assert_eq!("URL".parse::<FilterMode>().unwrap(), FilterMode::Url);
        assert_eq!("url".parse::<FilterMode>().unwrap(), FilterMode::Url);
        assert_eq!("".parse::<FilterMode>().unwrap(), FilterMode::Body);
        assert!("query".parse::<FilterMode>().is_err());
    }
}
