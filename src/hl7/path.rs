//! Structural path navigation
//!
//! Paths address a segment through the message's group tree:
//! `/QUERY_RESPONSE(0)/PID`, `/MSA`, `ERR(1)`. Indices are zero-based
//! and default to 0 when omitted. A missing group, repetition, or
//! segment fails with `PathNotFound` — including when a different
//! index of the same name exists, so absence probes stay reliable.

use crate::common::{Error, Result};

use super::message::{Message, Node, Segment};

/// A parsed path expression: nested group steps, then a segment step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    groups: Vec<Step>,
    segment: Step,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    name: String,
    index: usize,
}

impl Path {
    /// Parse a path expression; malformed syntax is a `Parse` error,
    /// never a navigation miss
    pub fn parse(expr: &str) -> Result<Self> {
        let trimmed = expr.trim().trim_start_matches('/');
        if trimmed.is_empty() {
            return Err(Error::Parse(format!("empty path expression '{expr}'")));
        }

        let mut steps = Vec::new();
        for part in trimmed.split('/') {
            steps.push(parse_step(part, expr)?);
        }

        let segment = steps.pop().expect("split yields at least one part");
        Ok(Self {
            groups: steps,
            segment,
        })
    }
}

fn parse_step(part: &str, expr: &str) -> Result<Step> {
    let part = part.trim();
    let (name, index) = match part.split_once('(') {
        Some((name, rest)) => {
            let digits = rest.strip_suffix(')').ok_or_else(|| {
                Error::Parse(format!("unclosed repetition index in path '{expr}'"))
            })?;
            let index = digits.trim().parse::<usize>().map_err(|_| {
                Error::Parse(format!("invalid repetition index '{digits}' in path '{expr}'"))
            })?;
            (name, index)
        }
        None => (part, 0),
    };

    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::Parse(format!("invalid step '{part}' in path '{expr}'")));
    }

    Ok(Step {
        name: name.to_string(),
        index,
    })
}

/// Resolve a path expression against a message
///
/// Returns the addressed segment, or `PathNotFound` naming the step
/// that could not be resolved. Never returns a partial resolution.
pub fn navigate<'a>(message: &'a Message, expr: &str) -> Result<&'a Segment> {
    let path = Path::parse(expr)?;

    let mut scope: &[Node] = message.roots();
    for step in &path.groups {
        let group = scope
            .iter()
            .find_map(|node| match node {
                Node::Group(g) if g.name() == step.name => Some(g),
                _ => None,
            })
            .ok_or_else(|| {
                Error::PathNotFound(format!("no group {} in '{expr}'", step.name))
            })?;

        scope = group.repetitions().get(step.index).ok_or_else(|| {
            Error::PathNotFound(format!(
                "group {} has {} repetition(s), index {} in '{expr}' does not exist",
                step.name,
                group.repetitions().len(),
                step.index
            ))
        })?;
    }

    let mut seen = 0;
    for node in scope {
        if let Node::Segment(segment) = node {
            if segment.name() == path.segment.name {
                if seen == path.segment.index {
                    return Ok(segment);
                }
                seen += 1;
            }
        }
    }

    Err(Error::PathNotFound(format!(
        "segment {}({}) in '{expr}' does not exist ({seen} repetition(s) present)",
        path.segment.name, path.segment.index
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rsp(results: usize) -> Message {
        let mut text = String::from(
            "MSH|^~\\&|CR1|MOH_CAAT|TEST_HARNESS|TEST|20260101120000||RSP^K23^RSP_K23|77|P|2.5\rMSA|AA|9002\rQAK|Q1|OK\r",
        );
        for i in 0..results {
            text.push_str(&format!(
                "PID|1||RJ-{i}^^^TEST&2.16.840.1.113883.3.72.5.9.1&ISO^PI\r"
            ));
        }
        Message::parse(&text).unwrap()
    }

    #[test]
    fn test_parse_path_forms() {
        assert_eq!(
            Path::parse("/QUERY_RESPONSE(0)/PID").unwrap(),
            Path::parse("QUERY_RESPONSE/PID").unwrap()
        );
        assert!(Path::parse("/QUERY_RESPONSE(/PID").is_err());
        assert!(Path::parse("/QUERY_RESPONSE(x)/PID").is_err());
        assert!(Path::parse("").is_err());
        assert!(Path::parse("/").is_err());
    }

    #[test]
    fn test_navigate_root_segment() {
        let msg = rsp(1);
        assert_eq!(navigate(&msg, "/MSA").unwrap().name(), "MSA");
        assert_eq!(navigate(&msg, "MSH").unwrap().value(12), "2.5");
    }

    #[test]
    fn test_navigate_group_index() {
        let msg = rsp(2);
        let pid0 = navigate(&msg, "/QUERY_RESPONSE(0)/PID").unwrap();
        assert_eq!(pid0.component(3, 1), "RJ-0");
        let pid1 = navigate(&msg, "/QUERY_RESPONSE(1)/PID").unwrap();
        assert_eq!(pid1.component(3, 1), "RJ-1");
    }

    #[test]
    fn test_index_defaults_to_zero() {
        let msg = rsp(2);
        assert_eq!(
            navigate(&msg, "/QUERY_RESPONSE/PID").unwrap(),
            navigate(&msg, "/QUERY_RESPONSE(0)/PID").unwrap()
        );
    }

    #[test]
    fn test_absent_repetition_fails_even_when_others_exist() {
        let msg = rsp(1);
        assert!(navigate(&msg, "/QUERY_RESPONSE(0)/PID").is_ok());
        let err = navigate(&msg, "/QUERY_RESPONSE(1)/PID").unwrap_err();
        assert!(err.is_path_not_found(), "got {err:?}");
    }

    #[test]
    fn test_index_bounds_exactly_track_repetitions() {
        for count in 1..4 {
            let msg = rsp(count);
            for k in 0..count {
                assert!(navigate(&msg, &format!("/QUERY_RESPONSE({k})/PID")).is_ok());
            }
            assert!(navigate(&msg, &format!("/QUERY_RESPONSE({count})/PID"))
                .unwrap_err()
                .is_path_not_found());
        }
    }

    #[test]
    fn test_missing_group_fails() {
        let msg = rsp(0);
        let err = navigate(&msg, "/QUERY_RESPONSE(0)/PID").unwrap_err();
        assert!(err.is_path_not_found());
    }

    #[test]
    fn test_segment_repetition_index() {
        let text = "MSH|^~\\&|CR1|MOH_CAAT|TEST_HARNESS|TEST|20260101120000||ACK^A01|9|P|2.3.1\rMSA|AE|9\rERR|first\rERR|second\r";
        let msg = Message::parse(text).unwrap();
        assert_eq!(navigate(&msg, "ERR(0)").unwrap().value(1), "first");
        assert_eq!(navigate(&msg, "ERR(1)").unwrap().value(1), "second");
        assert!(navigate(&msg, "ERR(2)").unwrap_err().is_path_not_found());
    }

    #[test]
    fn test_grouped_segment_not_visible_at_root() {
        let msg = rsp(1);
        assert!(navigate(&msg, "/PID").unwrap_err().is_path_not_found());
    }
}
