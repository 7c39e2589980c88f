//! Path extraction over structured arguments.
//!
//! A small, root-anchored JSONPath dialect:
//!
//! | Form | Meaning |
//! |---|---|
//! | `$` | the whole value |
//! | `.name` / `['name']` / `["name"]` | object member |
//! | `[2]` / `[-1]` | array element, negative counts from the end |
//! | `.*` / `[*]` | every member or element |
//!
//! A path without wildcards addresses at most one node. A path with a
//! wildcard yields an array of every non-null match. In both cases a path that
//! resolves to nothing, or only to `null`, yields `None`.
//!
//! This differs from JSONPath readers that always return a list for
//! wildcard paths. `$.items[*]` over `{"items": []}` is `None` here, not `[]`.
//! Over `{"items": [1, null]}` it is `[1]`, not `[1, null]`. An absent value
//! and an empty selection are treated alike, so neither produces a label.

use std::fmt;

use serde_json::Value;

use super::operation::Argument;

/// Why a path expression was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid path expression `{expr}` at {pos}: {reason}")]
pub struct PathError {
    expr: String,
    pos: usize,
    reason: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Member(String),
    Index(i64),
    Wildcard,
}

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonPath {
    source: String,
    segments: Vec<Segment>,
}

impl JsonPath {
    pub fn parse(expr: &str) -> Result<Self, PathError> {
        Parser { expr, pos: 0 }.parse()
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    fn is_definite(&self) -> bool {
        !self.segments.contains(&Segment::Wildcard)
    }

    /// Evaluates the path against `root`.
    pub fn select(&self, root: &Value) -> Option<Value> {
        let mut nodes = vec![root];
        for segment in &self.segments {
            nodes = nodes.into_iter().flat_map(|node| step(segment, node)).collect();
        }

        if self.is_definite() {
            return nodes.first().filter(|v| !v.is_null()).map(|v| Value::clone(v));
        }
        let matches: Vec<Value> = nodes.into_iter()
            .filter(|v| !v.is_null())
            .cloned()
            .collect();
        (!matches.is_empty()).then_some(Value::Array(matches))
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn step<'v>(segment: &Segment, node: &'v Value) -> Vec<&'v Value> {
    match (segment, node) {
        (Segment::Member(name), Value::Object(map)) => map.get(name).into_iter().collect(),
        (Segment::Index(i), Value::Array(items)) => {
            let idx = if *i < 0 { items.len() as i64 + i } else { *i };
            usize::try_from(idx).ok().and_then(|idx| items.get(idx)).into_iter().collect()
        }
        (Segment::Wildcard, Value::Object(map)) => map.values().collect(),
        (Segment::Wildcard, Value::Array(items)) => items.iter().collect(),
        _ => Vec::new(),
    }
}

struct Parser<'a> {
    expr: &'a str,
    pos: usize,
}

impl Parser<'_> {
    fn parse(mut self) -> Result<JsonPath, PathError> {
        if !self.eat('$') {
            return Err(self.error("must start with `$`"));
        }
        let mut segments = Vec::new();
        while let Some(c) = self.peek() {
            match c {
                '.' => {
                    self.pos += 1;
                    segments.push(self.dotted()?);
                }
                '[' => {
                    self.pos += 1;
                    segments.push(self.bracketed()?);
                }
                _ => return Err(self.error("expected `.` or `[`")),
            }
        }
        Ok(JsonPath { source: self.expr.to_owned(), segments })
    }

    fn dotted(&mut self) -> Result<Segment, PathError> {
        if self.eat('*') {
            return Ok(Segment::Wildcard);
        }
        if self.peek() == Some('.') {
            return Err(self.error("recursive descent is not supported"));
        }
        let expr = self.expr;
        let rest = &expr[self.pos..];
        let len = rest.find(['.', '[', ']']).unwrap_or(rest.len());
        if len == 0 {
            return Err(self.error("expected a member name"));
        }
        self.pos += len;
        Ok(Segment::Member(rest[..len].to_owned()))
    }

    fn bracketed(&mut self) -> Result<Segment, PathError> {
        let segment = match self.peek() {
            Some('*') => {
                self.pos += 1;
                Segment::Wildcard
            }
            Some(quote @ ('\'' | '"')) => {
                self.pos += 1;
                Segment::Member(self.quoted(quote)?)
            }
            _ => {
                let expr = self.expr;
                let rest = &expr[self.pos..];
                let len = rest.find(']').ok_or_else(|| self.error("unclosed `[`"))?;
                let index = rest[..len].trim().parse::<i64>()
                    .map_err(|_| self.error("expected an index, a quoted name or `*`"))?;
                self.pos += len;
                Segment::Index(index)
            }
        };
        if !self.eat(']') {
            return Err(self.error("expected `]`"));
        }
        Ok(segment)
    }

    fn quoted(&mut self, quote: char) -> Result<String, PathError> {
        let mut name = String::new();
        let expr = self.expr;
        let mut chars = expr[self.pos..].chars();
        while let Some(c) = chars.next() {
            self.pos += c.len_utf8();
            match c {
                '\\' => {
                    let escaped = chars.next().ok_or_else(|| self.error("dangling escape"))?;
                    self.pos += escaped.len_utf8();
                    name.push(escaped);
                }
                c if c == quote => return Ok(name),
                c => name.push(c),
            }
        }
        Err(self.error("unterminated quoted name"))
    }

    fn peek(&self) -> Option<char> {
        self.expr[self.pos..].chars().next()
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn error(&self, reason: &'static str) -> PathError {
        PathError { expr: self.expr.to_owned(), pos: self.pos, reason }
    }
}

/// Resolves the value an argument contributes.
///
/// Without a path the argument is returned as-is (raw bytes as lossy UTF-8).
/// With a path, raw bytes are first parsed as JSON; bytes that are not JSON
/// fail the extraction rather than silently yielding nothing.
pub fn extract(argument: &Argument, path: Option<&JsonPath>) -> Result<Option<Value>, serde_json::Error> {
    let Some(path) = path else {
        return Ok(match argument {
            Argument::Absent | Argument::Value(Value::Null) => None,
            Argument::Value(v) => Some(v.clone()),
            Argument::Raw(bytes) => Some(Value::String(String::from_utf8_lossy(bytes).into_owned())),
        });
    };

    match argument {
        Argument::Absent => Ok(None),
        Argument::Value(v) => Ok(path.select(v)),
        Argument::Raw(bytes) => {
            let value: Value = serde_json::from_slice(bytes)?;
            Ok(path.select(&value))
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn select(expr: &str, value: &Value) -> Option<Value> {
        JsonPath::parse(expr).expect("valid path").select(value)
    }

    #[test]
    fn root_returns_whole_value() {
        let v = json!({"id": 1});
        assert_eq!(select("$", &v), Some(v.clone()));
    }

    #[test]
    fn members_and_indices() {
        let v = json!({
            "id": 1,
            "user": {"name": "pepe", "tags": ["a", "b", "c"]},
            "odd key": true
        });
        assert_eq!(select("$.id", &v), Some(json!(1)));
        assert_eq!(select("$.user.name", &v), Some(json!("pepe")));
        assert_eq!(select("$['user'][\"tags\"][1]", &v), Some(json!("b")));
        assert_eq!(select("$.user.tags[-1]", &v), Some(json!("c")));
        assert_eq!(select("$['odd key']", &v), Some(json!(true)));
    }

    #[test]
    fn unresolved_and_null_paths_yield_none() {
        let v = json!({"id": null, "content": "pepe", "items": [1]});
        assert_eq!(select("$.id", &v), None);
        assert_eq!(select("$.missing", &v), None);
        assert_eq!(select("$.content.length", &v), None);
        assert_eq!(select("$.items[5]", &v), None);
        assert_eq!(select("$.items[-2]", &v), None);
    }

    #[test]
    fn wildcards_collect_non_null_matches() {
        let v = json!({"items": [{"id": 1}, {"id": null}, {"id": 3}]});
        assert_eq!(select("$.items[*].id", &v), Some(json!([1, 3])));
        assert_eq!(select("$.items.*.missing", &v), None);
    }

    #[test]
    fn empty_wildcard_selection_is_absent() {
        assert_eq!(select("$.items[*]", &json!({"items": []})), None);
        assert_eq!(select("$.items[*]", &json!({"items": [null, null]})), None);
        assert_eq!(select("$.items[*]", &json!({"items": [1, null]})), Some(json!([1])));
    }

    #[test]
    fn rejects_malformed_expressions() {
        for expr in ["", "id", "$.", "$..id", "$[", "$[abc]", "$['open", "$.a]"] {
            assert!(JsonPath::parse(expr).is_err(), "`{expr}` should not parse");
        }
    }

    #[test]
    fn error_reports_position() {
        let err = JsonPath::parse("$.a[x]").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid path expression `$.a[x]` at 4: expected an index, a quoted name or `*`"
        );
    }

    #[test]
    fn extract_without_path_is_identity() {
        assert_eq!(extract(&Argument::Absent, None).unwrap(), None);
        assert_eq!(extract(&Argument::Value(Value::Null), None).unwrap(), None);
        assert_eq!(extract(&Argument::Value(json!("pepe")), None).unwrap(), Some(json!("pepe")));
        assert_eq!(
            extract(&Argument::Raw(Bytes::from_static(b"plain")), None).unwrap(),
            Some(json!("plain"))
        );
    }

    #[test]
    fn extract_parses_raw_bodies_on_demand() {
        let path = JsonPath::parse("$.id").unwrap();
        let body = Argument::Raw(Bytes::from_static(br#"{"id":1,"content":"pepe"}"#));
        assert_eq!(extract(&body, Some(&path)).unwrap(), Some(json!(1)));

        let broken = Argument::Raw(Bytes::from_static(b"{not json"));
        assert!(extract(&broken, Some(&path)).is_err());
    }
}
