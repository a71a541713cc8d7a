//! HL7v2 message model and ER7 codec
//!
//! A parsed message is an ordered tree: segments at the root, with
//! version-dependent runs of segments folded into named, repeating
//! groups (e.g. one `QUERY_RESPONSE` repetition per query match).
//! A node is either a segment leaf or a group, so "absent" stays
//! distinct from "empty" during navigation.

use crate::common::{Error, Result};

/// Encoding characters declared in MSH-1/MSH-2
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Delimiters {
    pub field: char,
    pub component: char,
    pub repetition: char,
    pub escape: char,
    pub subcomponent: char,
}

impl Default for Delimiters {
    fn default() -> Self {
        Self {
            field: '|',
            component: '^',
            repetition: '~',
            escape: '\\',
            subcomponent: '&',
        }
    }
}

/// A parsed HL7v2 message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    message_type: String,
    trigger_event: String,
    structure: Option<String>,
    version: String,
    delimiters: Delimiters,
    roots: Vec<Node>,
}

/// One node of the message tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Segment(Segment),
    Group(Group),
}

/// A named, repeating collection of nodes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    name: String,
    repetitions: Vec<Vec<Node>>,
}

impl Group {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn repetitions(&self) -> &[Vec<Node>] {
        &self.repetitions
    }
}

/// A named, ordered sequence of fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    name: String,
    fields: Vec<Field>,
}

impl Segment {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Field by HL7 number (1-based); None when the segment is too short
    pub fn field(&self, number: usize) -> Option<&Field> {
        if number == 0 {
            return None;
        }
        self.fields.get(number - 1)
    }

    /// First repetition, first component, first subcomponent of a field
    pub fn value(&self, number: usize) -> &str {
        self.field(number)
            .and_then(Field::first)
            .map(|rep| rep.value())
            .unwrap_or("")
    }

    /// Component value of a field's first repetition (1-based component number)
    pub fn component(&self, number: usize, component: usize) -> &str {
        self.field(number)
            .and_then(Field::first)
            .map(|rep| rep.component_value(component))
            .unwrap_or("")
    }
}

/// A field: one or more `~`-separated repetitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    repetitions: Vec<Repetition>,
}

impl Field {
    pub fn repetitions(&self) -> &[Repetition] {
        &self.repetitions
    }

    pub fn first(&self) -> Option<&Repetition> {
        self.repetitions.first()
    }
}

/// One field repetition: `^`-separated components
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repetition {
    components: Vec<Component>,
}

impl Repetition {
    pub fn component(&self, number: usize) -> Option<&Component> {
        if number == 0 {
            return None;
        }
        self.components.get(number - 1)
    }

    /// Component value (first subcomponent), "" when absent
    pub fn component_value(&self, number: usize) -> &str {
        self.component(number).map(Component::value).unwrap_or("")
    }

    /// First component's value, "" when absent
    pub fn value(&self) -> &str {
        self.component_value(1)
    }
}

/// One component: `&`-separated subcomponents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    subcomponents: Vec<String>,
}

impl Component {
    pub fn value(&self) -> &str {
        self.subcomponent(1)
    }

    /// Subcomponent value (1-based), "" when absent
    pub fn subcomponent(&self, number: usize) -> &str {
        if number == 0 {
            return "";
        }
        self.subcomponents
            .get(number - 1)
            .map(String::as_str)
            .unwrap_or("")
    }
}

impl Message {
    /// Parse an ER7-encoded message
    ///
    /// Segment breaks may be CR, LF, or CRLF — fixtures are checked out
    /// as plain text. The first segment must be MSH.
    pub fn parse(text: &str) -> Result<Self> {
        let lines: Vec<&str> = text
            .split(['\r', '\n'])
            .map(str::trim_end)
            .filter(|l| !l.is_empty())
            .collect();

        let first = lines
            .first()
            .ok_or_else(|| Error::Parse("empty message".to_string()))?;
        if !first.starts_with("MSH") {
            return Err(Error::Parse(format!(
                "message must start with MSH, got '{}'",
                first.chars().take(8).collect::<String>()
            )));
        }

        let delimiters = parse_delimiters(first)?;

        let mut segments = Vec::with_capacity(lines.len());
        for line in &lines {
            segments.push(parse_segment(line, &delimiters)?);
        }

        let msh = &segments[0];
        let message_type = msh.component(9, 1).to_string();
        let trigger_event = msh.component(9, 2).to_string();
        let structure = match msh.component(9, 3) {
            "" => None,
            s => Some(s.to_string()),
        };
        let version = msh.component(12, 1).to_string();
        if message_type.is_empty() {
            return Err(Error::Parse("MSH-9 has no message type".to_string()));
        }
        if version.is_empty() {
            return Err(Error::Parse("MSH-12 has no version".to_string()));
        }

        let grammar_key = structure.clone().unwrap_or_else(|| message_type.clone());
        let roots = group_segments(structure_rules(&grammar_key), segments);

        Ok(Self {
            message_type,
            trigger_event,
            structure,
            version,
            delimiters,
            roots,
        })
    }

    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    pub fn trigger_event(&self) -> &str {
        &self.trigger_event
    }

    pub fn structure(&self) -> Option<&str> {
        self.structure.as_deref()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn roots(&self) -> &[Node] {
        &self.roots
    }

    /// All segments in document order, flattening groups
    pub fn segments(&self) -> Vec<&Segment> {
        let mut out = Vec::new();
        collect_segments(&self.roots, &mut out);
        out
    }

    /// Serialize back to ER7, segments joined with CR
    pub fn to_er7(&self) -> String {
        let d = &self.delimiters;
        self.segments()
            .iter()
            .map(|s| serialize_segment(s, d))
            .collect::<Vec<_>>()
            .join("\r")
    }
}

fn collect_segments<'a>(nodes: &'a [Node], out: &mut Vec<&'a Segment>) {
    for node in nodes {
        match node {
            Node::Segment(s) => out.push(s),
            Node::Group(g) => {
                for rep in &g.repetitions {
                    collect_segments(rep, out);
                }
            }
        }
    }
}

fn parse_delimiters(msh: &str) -> Result<Delimiters> {
    let mut chars = msh.chars().skip(3);
    let field = chars
        .next()
        .ok_or_else(|| Error::Parse("MSH truncated before field separator".to_string()))?;
    let encoding: Vec<char> = chars.take_while(|c| *c != field).collect();
    if encoding.len() < 4 {
        return Err(Error::Parse(format!(
            "MSH-2 must declare four encoding characters, got '{}'",
            encoding.iter().collect::<String>()
        )));
    }
    Ok(Delimiters {
        field,
        component: encoding[0],
        repetition: encoding[1],
        escape: encoding[2],
        subcomponent: encoding[3],
    })
}

fn parse_segment(line: &str, d: &Delimiters) -> Result<Segment> {
    let mut parts = line.split(d.field);
    let name = parts
        .next()
        .unwrap_or_default()
        .to_string();
    if name.is_empty() {
        return Err(Error::Parse("segment with empty name".to_string()));
    }

    let mut fields = Vec::new();
    if name == "MSH" {
        // MSH-1 is the field separator itself; MSH-2 holds the remaining
        // delimiters and must not be split by them
        fields.push(literal_field(&d.field.to_string()));
        let encoding = parts.next().unwrap_or_default();
        fields.push(literal_field(encoding));
    }
    for raw in parts {
        fields.push(parse_field(raw, d));
    }

    Ok(Segment { name, fields })
}

/// A field holding one verbatim value, exempt from delimiter splitting
fn literal_field(value: &str) -> Field {
    Field {
        repetitions: vec![Repetition {
            components: vec![Component {
                subcomponents: vec![value.to_string()],
            }],
        }],
    }
}

fn parse_field(raw: &str, d: &Delimiters) -> Field {
    let repetitions = raw
        .split(d.repetition)
        .map(|rep| Repetition {
            components: rep
                .split(d.component)
                .map(|comp| Component {
                    subcomponents: comp.split(d.subcomponent).map(str::to_string).collect(),
                })
                .collect(),
        })
        .collect();
    Field { repetitions }
}

fn serialize_segment(segment: &Segment, d: &Delimiters) -> String {
    let mut out = segment.name.clone();
    let fields = &segment.fields;
    let start = if segment.name == "MSH" {
        // MSH-1 is the separator written after the name; MSH-2 is verbatim
        out.push(d.field);
        out.push_str(fields.get(1).map(field_literal).unwrap_or_default());
        2
    } else {
        0
    };
    for field in &fields[start.min(fields.len())..] {
        out.push(d.field);
        out.push_str(&serialize_field(field, d));
    }
    out
}

fn field_literal(field: &Field) -> &str {
    field
        .repetitions
        .first()
        .and_then(|r| r.components.first())
        .and_then(|c| c.subcomponents.first())
        .map(String::as_str)
        .unwrap_or("")
}

fn serialize_field(field: &Field, d: &Delimiters) -> String {
    field
        .repetitions
        .iter()
        .map(|rep| {
            rep.components
                .iter()
                .map(|comp| comp.subcomponents.join(&d.subcomponent.to_string()))
                .collect::<Vec<_>>()
                .join(&d.component.to_string())
        })
        .collect::<Vec<_>>()
        .join(&d.repetition.to_string())
}

// === Structure grammar ===
//
// Grouping rules keyed by the structure id from MSH-9.3 (falling back to
// the message type). Only structures whose groups the suite navigates need
// rules; anything else stays a flat segment list, where segment-name
// navigation still works and group paths fail with PathNotFound.

struct GroupRule {
    name: &'static str,
    /// Segment names that open a new repetition
    opens: &'static [&'static str],
    /// Segment names folded into the open repetition
    members: &'static [&'static str],
}

fn structure_rules(structure: &str) -> &'static [GroupRule] {
    match structure {
        // K23/K21 query responses: one QUERY_RESPONSE repetition per match
        "RSP_K23" | "RSP_K21" => &[GroupRule {
            name: "QUERY_RESPONSE",
            opens: &["PID"],
            members: &["PID", "PD1", "NK1", "QRI"],
        }],
        _ => &[],
    }
}

fn group_segments(rules: &'static [GroupRule], segments: Vec<Segment>) -> Vec<Node> {
    let mut roots: Vec<Node> = Vec::with_capacity(segments.len());

    for segment in segments {
        let opens = rules.iter().find(|r| r.opens.contains(&segment.name()));
        if let Some(rule) = opens {
            match roots.last_mut() {
                Some(Node::Group(g)) if g.name == rule.name => {
                    g.repetitions.push(vec![Node::Segment(segment)]);
                }
                _ => roots.push(Node::Group(Group {
                    name: rule.name.to_string(),
                    repetitions: vec![vec![Node::Segment(segment)]],
                })),
            }
            continue;
        }

        // a non-opening member extends the current repetition, if any
        if let Some(Node::Group(g)) = roots.last_mut() {
            let rule = rules.iter().find(|r| r.name == g.name);
            if rule.is_some_and(|r| r.members.contains(&segment.name())) {
                if let Some(rep) = g.repetitions.last_mut() {
                    rep.push(Node::Segment(segment));
                    continue;
                }
            }
        }

        roots.push(Node::Segment(segment));
    }

    roots
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACK: &str = "MSH|^~\\&|CR1|MOH_CAAT|TEST_HARNESS|TEST|20260101120000||ACK^A01|1234|P|2.3.1\rMSA|AA|9001\r";

    const RSP: &str = "MSH|^~\\&|CR1|MOH_CAAT|TEST_HARNESS|TEST|20260101120000||RSP^K23^RSP_K23|5678|P|2.5\r\
MSA|AA|9002\r\
QAK|Q0001|OK\r\
QPD|IHE PDQ Query|Q0001|RJ-438^^^TEST&2.16.840.1.113883.3.72.5.9.1&ISO^PI\r\
PID|1||RJ-438^^^TEST&2.16.840.1.113883.3.72.5.9.1&ISO^PI||JONES^ROBERT\r";

    #[test]
    fn test_parse_ack_identity() {
        let msg = Message::parse(ACK).unwrap();
        assert_eq!(msg.message_type(), "ACK");
        assert_eq!(msg.trigger_event(), "A01");
        assert_eq!(msg.structure(), None);
        assert_eq!(msg.version(), "2.3.1");
    }

    #[test]
    fn test_parse_rsp_identity_and_grouping() {
        let msg = Message::parse(RSP).unwrap();
        assert_eq!(msg.message_type(), "RSP");
        assert_eq!(msg.trigger_event(), "Q23");
        assert_eq!(msg.structure(), Some("RSP_K23"));
        assert_eq!(msg.version(), "2.5");

        // PID folded into a QUERY_RESPONSE group, rest stays at the root
        let group = msg
            .roots()
            .iter()
            .find_map(|n| match n {
                Node::Group(g) => Some(g),
                _ => None,
            })
            .expect("QUERY_RESPONSE group");
        assert_eq!(group.name(), "QUERY_RESPONSE");
        assert_eq!(group.repetitions().len(), 1);
    }

    #[test]
    fn test_repeating_group() {
        let two = format!("{RSP}PID|1||RJ-900^^^TEST&2.16.840.1.113883.3.72.5.9.1&ISO^PI\r");
        let msg = Message::parse(&two).unwrap();
        let group = msg
            .roots()
            .iter()
            .find_map(|n| match n {
                Node::Group(g) => Some(g),
                _ => None,
            })
            .unwrap();
        assert_eq!(group.repetitions().len(), 2);
    }

    #[test]
    fn test_msh_field_numbering() {
        let msg = Message::parse(ACK).unwrap();
        let msh = msg.segments()[0];
        assert_eq!(msh.value(1), "|");
        assert_eq!(msh.value(2), "^~\\&");
        assert_eq!(msh.value(3), "CR1");
        assert_eq!(msh.value(5), "TEST_HARNESS");
        assert_eq!(msh.value(6), "TEST");
        assert_eq!(msh.component(9, 1), "ACK");
        assert_eq!(msh.component(9, 2), "A01");
        assert_eq!(msh.value(12), "2.3.1");
    }

    #[test]
    fn test_cx_subcomponents() {
        let msg = Message::parse(RSP).unwrap();
        let pid = *msg.segments().last().unwrap();
        let cx = pid.field(3).and_then(Field::first).unwrap();
        assert_eq!(cx.component_value(1), "RJ-438");
        let authority = cx.component(4).unwrap();
        assert_eq!(authority.subcomponent(1), "TEST");
        assert_eq!(authority.subcomponent(2), "2.16.840.1.113883.3.72.5.9.1");
        assert_eq!(authority.subcomponent(3), "ISO");
    }

    #[test]
    fn test_field_repetitions() {
        let text = "MSH|^~\\&|A|B|C|D|20260101||ADT^A01|1|P|2.3.1\rPID|1||ID-1^^^TEST~ID-2^^^TEST_A\r";
        let msg = Message::parse(text).unwrap();
        let pid = *msg.segments().last().unwrap();
        let reps = pid.field(3).unwrap().repetitions();
        assert_eq!(reps.len(), 2);
        assert_eq!(reps[0].value(), "ID-1");
        assert_eq!(reps[1].value(), "ID-2");
    }

    #[test]
    fn test_round_trip() {
        for text in [ACK, RSP] {
            let msg = Message::parse(text).unwrap();
            let reparsed = Message::parse(&msg.to_er7()).unwrap();
            assert_eq!(msg, reparsed);
        }
    }

    #[test]
    fn test_rejects_non_msh_start() {
        let err = Message::parse("PID|1||X\r").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(Message::parse("").is_err());
        assert!(Message::parse("\r\n\r\n").is_err());
    }

    #[test]
    fn test_lf_segment_breaks() {
        let msg = Message::parse(&ACK.replace('\r', "\n")).unwrap();
        assert_eq!(msg.segments().len(), 2);
    }
}
