/// A parsed YAML document. Comments are kept as their source text,
/// starting at the `#`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub head: Vec<String>,
    pub root: Option<Node>,
    pub foot: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Comment lines directly above the node (or above its key).
    pub head: Vec<String>,
    /// Comment trailing the line the node starts on.
    pub line: Option<String>,
    /// Tag and anchor properties, verbatim.
    pub props: Option<String>,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Mapping(Mapping),
    Sequence(Sequence),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Plain or quoted scalar. `raw` is the text written back out.
    Inline { raw: String, value: String },
    /// Literal or folded block scalar; `lines` are stripped of the block's
    /// own indentation.
    Block { header: String, lines: Vec<String> },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Mapping {
    pub entries: Vec<Entry>,
    pub flow: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: Scalar,
    pub value: Node,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sequence {
    pub items: Vec<Node>,
    pub flow: bool,
}

impl Node {
    pub fn new(value: Value) -> Self {
        Self {
            head: Vec::new(),
            line: None,
            props: None,
            value,
        }
    }

    pub fn null() -> Self {
        Self::new(Value::Scalar(Scalar::null()))
    }

    pub fn string(value: &str) -> Self {
        Self::new(Value::Scalar(Scalar::string(value)))
    }

    pub fn is_null(&self) -> bool {
        self.props.is_none() && matches!(&self.value, Value::Scalar(s) if s.is_null())
    }

    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            Value::Scalar(s) => s.value(),
            _ => None,
        }
    }
}

impl Scalar {
    pub fn null() -> Self {
        Scalar::Inline {
            raw: String::new(),
            value: String::new(),
        }
    }

    /// A string scalar, plain when that reads back as the same string and
    /// double-quoted otherwise.
    pub fn string(value: &str) -> Self {
        let raw = if is_plain_safe(value) {
            value.to_string()
        } else {
            double_quote(value)
        };
        Scalar::Inline {
            raw,
            value: value.to_string(),
        }
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Scalar::Inline { value, .. } => Some(value),
            Scalar::Block { .. } => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Inline { raw, .. }
            if matches!(raw.as_str(), "" | "~" | "null" | "Null" | "NULL"))
    }
}

impl Mapping {
    pub fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.key.value() == Some(key))
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.position(key).map(|i| &self.entries[i].value)
    }

    pub fn remove(&mut self, key: &str) -> Option<Entry> {
        self.position(key).map(|i| self.entries.remove(i))
    }

    /// Replaces the value under `key`, keeping the comments around it, or
    /// appends a new entry.
    pub fn set(&mut self, key: &str, value: Node) {
        match self.position(key) {
            Some(i) => {
                let old = &mut self.entries[i].value;
                let head = std::mem::take(&mut old.head);
                let line = old.line.take();
                *old = Node { head, line, ..value };
            }
            None => self.entries.push(Entry {
                key: Scalar::string(key),
                value,
            }),
        }
    }
}

fn is_plain_safe(value: &str) -> bool {
    let Some(first) = value.chars().next() else {
        return false;
    };
    if value.trim() != value {
        return false;
    }
    if "-?:,[]{}#&*!|>'\"%@`".contains(first) {
        return false;
    }
    if value.contains(": ") || value.contains(" #") || value.ends_with(':') {
        return false;
    }
    if value.chars().any(|c| c.is_control()) {
        return false;
    }
    !resolves_to_non_string(value)
}

/// Plain scalars that a YAML reader would resolve to null, bool or number.
fn resolves_to_non_string(value: &str) -> bool {
    const RESERVED: &[&str] = &[
        "~", "null", "true", "false", "yes", "no", "on", "off", "y", "n", ".nan", ".inf",
        "-.inf", "+.inf",
    ];
    if RESERVED.contains(&value.to_ascii_lowercase().as_str()) {
        return true;
    }

    let digits = value.strip_prefix(['-', '+']).unwrap_or(value);
    if let Some(hex) = digits.strip_prefix("0x") {
        return !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit());
    }
    if let Some(oct) = digits.strip_prefix("0o") {
        return !oct.is_empty() && oct.chars().all(|c| c.is_digit(8));
    }
    value.parse::<f64>().is_ok()
}

pub(crate) fn double_quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_control() => out.push_str(&format!("\\u{:04X}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(s: &Scalar) -> &str {
        match s {
            Scalar::Inline { raw, .. } => raw,
            Scalar::Block { .. } => panic!("Expected inline scalar"),
        }
    }

    #[test]
    fn test_plain_strings_stay_plain() {
        for v in [
            "forgejo",
            "https://example.forgejo.org/",
            "refs/heads/main",
            "git@localhost:testdata/repo.git#5877",
            "v1.0",
        ] {
            assert_eq!(raw(&Scalar::string(v)), v);
        }
    }

    #[test]
    fn test_ambiguous_strings_are_quoted() {
        assert_eq!(raw(&Scalar::string("")), r#""""#);
        assert_eq!(raw(&Scalar::string("true")), r#""true""#);
        assert_eq!(raw(&Scalar::string("1.5")), r#""1.5""#);
        assert_eq!(raw(&Scalar::string("0x1F")), r#""0x1F""#);
        assert_eq!(raw(&Scalar::string("a: b")), r#""a: b""#);
        assert_eq!(raw(&Scalar::string("- item")), r#""- item""#);
        assert_eq!(raw(&Scalar::string("say \"hi\"\n")), r#""say \"hi\"\n""#);
    }

    #[test]
    fn test_set_keeps_comments() {
        let mut map = Mapping::default();
        let mut node = Node::string("old");
        node.head.push("# about the key".to_string());
        node.line = Some("# trailing".to_string());
        map.entries.push(Entry {
            key: Scalar::string("key"),
            value: node,
        });

        map.set("key", Node::string("new"));
        map.set("other", Node::string("x"));

        let node = map.get("key").unwrap();
        assert_eq!(node.as_str(), Some("new"));
        assert_eq!(node.head, vec!["# about the key".to_string()]);
        assert_eq!(node.line.as_deref(), Some("# trailing"));
        assert_eq!(map.entries.len(), 2);
    }
}
