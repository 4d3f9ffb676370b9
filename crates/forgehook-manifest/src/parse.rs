//! Indentation-driven parser for the block YAML used in build manifests.
//!
//! Supports block mappings and sequences (including compact `- key: v`
//! items and sequences indented level with their key), plain, quoted and
//! block scalars, flow collections, tags, anchors and comments. Only the
//! first document of a stream is read.

use crate::error::{ManifestError, Result};
use crate::node::{Document, Entry, Mapping, Node, Scalar, Sequence, Value, double_quote};

#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    no: usize,
    indent: usize,
    text: &'a str,
}

impl Line<'_> {
    fn is_blank(&self) -> bool {
        self.text.is_empty()
    }

    fn is_comment(&self) -> bool {
        self.text.starts_with('#')
    }

    fn is_document_marker(&self) -> bool {
        self.indent == 0 && (is_marker(self.text, "---") || is_marker(self.text, "..."))
    }
}

fn is_marker(text: &str, marker: &str) -> bool {
    text.strip_prefix(marker)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with(' '))
}

fn is_seq_item(text: &str) -> bool {
    text == "-" || text.starts_with("- ")
}

pub fn parse(src: &str) -> Result<Document> {
    let lines = src
        .lines()
        .enumerate()
        .map(|(i, raw)| {
            let trimmed = raw.trim_end();
            let text = trimmed.trim_start_matches(' ');
            Line {
                no: i + 1,
                indent: trimmed.len() - text.len(),
                text,
            }
        })
        .collect();

    Parser {
        lines,
        pos: 0,
        pending: Vec::new(),
    }
    .document()
}

struct Parser<'a> {
    lines: Vec<Line<'a>>,
    pos: usize,
    pending: Vec<String>,
}

impl<'a> Parser<'a> {
    fn document(&mut self) -> Result<Document> {
        let mut doc = Document::default();

        self.skip_trivia();
        while let Some(line) = self.current() {
            if line.indent == 0 && line.text.starts_with('%') {
                self.pos += 1;
                self.skip_trivia();
            } else {
                break;
            }
        }
        if let Some(line) = self.current()
            && line.indent == 0
            && is_marker(line.text, "---")
        {
            let rest = line.text[3..].trim_start();
            if rest.is_empty() || rest.starts_with('#') {
                self.pos += 1;
            } else {
                // `--- value`: parse the remainder as if it started the line.
                self.lines[self.pos] = Line {
                    no: line.no,
                    indent: line.text.len() - rest.len(),
                    text: rest,
                };
            }
        }

        self.skip_trivia();
        doc.head = std::mem::take(&mut self.pending);
        if self.current().is_some() {
            // Comments directly above the first key belong to that key.
            let attached = self.lines[..self.pos]
                .iter()
                .rev()
                .take_while(|line| line.is_comment())
                .count();
            self.pending = doc.head.split_off(doc.head.len().saturating_sub(attached));
        }

        if let Some(line) = self.structural()? {
            doc.root = Some(self.block(line.indent)?);
        }

        self.skip_trivia();
        if let Some(line) = self.current() {
            if is_marker(line.text, "---") && line.indent == 0 {
                return Err(ManifestError::syntax(
                    line.no,
                    "multiple documents are not supported",
                ));
            }
            if !line.is_document_marker() {
                return Err(ManifestError::syntax(line.no, "unexpected content"));
            }
        }
        doc.foot = std::mem::take(&mut self.pending);

        Ok(doc)
    }

    fn current(&self) -> Option<Line<'a>> {
        self.lines.get(self.pos).copied()
    }

    fn skip_trivia(&mut self) {
        while let Some(line) = self.current() {
            if line.is_comment() {
                self.pending.push(line.text.to_string());
            } else if !line.is_blank() {
                break;
            }
            self.pos += 1;
        }
    }

    /// Next line carrying structure, collecting comments on the way.
    fn structural(&mut self) -> Result<Option<Line<'a>>> {
        self.skip_trivia();
        match self.current() {
            Some(line) if line.is_document_marker() => Ok(None),
            Some(line) if line.text.starts_with('\t') => Err(ManifestError::syntax(
                line.no,
                "tabs are not allowed for indentation",
            )),
            other => Ok(other),
        }
    }

    fn block(&mut self, indent: usize) -> Result<Node> {
        let Some(line) = self.structural()? else {
            return Ok(Node::null());
        };

        if is_seq_item(line.text) {
            self.sequence(indent)
        } else if split_key(line.text).is_some() {
            self.mapping(indent)
        } else {
            self.pos += 1;
            self.value(line.text, line.no, indent, None)
        }
    }

    fn mapping(&mut self, indent: usize) -> Result<Node> {
        let mut map = Mapping::default();

        while let Some(line) = self.structural()? {
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(ManifestError::syntax(line.no, "unexpected indentation"));
            }
            let Some((key_raw, rest)) = split_key(line.text) else {
                return Err(ManifestError::syntax(line.no, "expected a mapping key"));
            };

            let head = std::mem::take(&mut self.pending);
            self.pos += 1;

            let key = inline_scalar(key_raw, line.no)?;
            if map.position(key.value().unwrap_or_default()).is_some() {
                return Err(ManifestError::syntax(
                    line.no,
                    format!("duplicate key `{key_raw}`"),
                ));
            }

            let mut value = self.value(rest, line.no, indent + 1, Some(indent))?;
            value.head = head;
            map.entries.push(Entry { key, value });
        }

        Ok(Node::new(Value::Mapping(map)))
    }

    fn sequence(&mut self, indent: usize) -> Result<Node> {
        let mut seq = Sequence::default();

        while let Some(line) = self.structural()? {
            if line.indent < indent {
                break;
            }
            if line.indent > indent {
                return Err(ManifestError::syntax(line.no, "unexpected indentation"));
            }
            if !is_seq_item(line.text) {
                break;
            }

            let head = std::mem::take(&mut self.pending);
            let after_dash = &line.text[1..];
            let rest = after_dash.trim_start_matches(' ');

            let mut node = if !rest.is_empty()
                && !rest.starts_with('#')
                && (is_seq_item(rest) || split_key(rest).is_some())
            {
                // Compact nested collection: re-read the remainder as a line
                // of its own at the column it starts in.
                let col = indent + 1 + (after_dash.len() - rest.len());
                self.lines[self.pos] = Line {
                    no: line.no,
                    indent: col,
                    text: rest,
                };
                self.block(col)?
            } else {
                self.pos += 1;
                self.value(rest, line.no, indent + 1, None)?
            };

            node.head = head;
            seq.items.push(node);
        }

        Ok(Node::new(Value::Sequence(seq)))
    }

    /// Parses the value following a `key:` or `-` indicator. Lines that
    /// belong to the value must be indented at least `min_indent`;
    /// `compact_parent` is the key column when a sequence may sit level
    /// with its key.
    fn value(
        &mut self,
        rest: &'a str,
        line_no: usize,
        min_indent: usize,
        compact_parent: Option<usize>,
    ) -> Result<Node> {
        let (content, comment) = split_comment(rest.trim_start());
        let (props, content) = split_props(content);

        let (mut node, trailing) = if content.is_empty() {
            (self.nested(min_indent, compact_parent)?, None)
        } else if content.starts_with('|') || content.starts_with('>') {
            let scalar = self.block_scalar(content, line_no, min_indent)?;
            (Node::new(Value::Scalar(scalar)), None)
        } else if content.starts_with('[') || content.starts_with('{') {
            self.flow(content, line_no)?
        } else if content.starts_with('"') || content.starts_with('\'') {
            let (scalar, trailing) = self.quoted(content, line_no)?;
            (Node::new(Value::Scalar(scalar)), trailing)
        } else {
            let scalar = self.plain(content, comment.is_some(), min_indent);
            (Node::new(Value::Scalar(scalar)), None)
        };

        node.props = props;
        if node.line.is_none() {
            node.line = comment.or(trailing);
        }
        Ok(node)
    }

    fn nested(&mut self, min_indent: usize, compact_parent: Option<usize>) -> Result<Node> {
        match self.structural()? {
            Some(line) if line.indent >= min_indent => self.block(line.indent),
            Some(line) if compact_parent == Some(line.indent) && is_seq_item(line.text) => {
                self.sequence(line.indent)
            }
            _ => Ok(Node::null()),
        }
    }

    fn block_scalar(&mut self, header: &str, line_no: usize, min_indent: usize) -> Result<Scalar> {
        let mut explicit = None;
        let mut chomp = None;
        for c in header[1..].chars() {
            match c {
                '+' | '-' if chomp.is_none() => chomp = Some(c),
                '1'..='9' if explicit.is_none() => explicit = c.to_digit(10),
                _ => {
                    return Err(ManifestError::syntax(
                        line_no,
                        format!("invalid block scalar header `{header}`"),
                    ));
                }
            }
        }

        let mut raw = Vec::new();
        while let Some(line) = self.current() {
            if !line.is_blank() && line.indent < min_indent {
                break;
            }
            raw.push(line);
            self.pos += 1;
        }

        let content_indent = match explicit {
            Some(d) => min_indent.saturating_sub(1) + d as usize,
            None => raw
                .iter()
                .find(|l| !l.is_blank())
                .map(|l| l.indent)
                .unwrap_or(min_indent),
        };

        let mut lines = Vec::with_capacity(raw.len());
        for line in raw {
            if line.is_blank() {
                lines.push(String::new());
            } else if line.indent < content_indent {
                return Err(ManifestError::syntax(
                    line.no,
                    "block scalar line is less indented than its first line",
                ));
            } else {
                lines.push(format!(
                    "{}{}",
                    " ".repeat(line.indent - content_indent),
                    line.text
                ));
            }
        }
        if chomp != Some('+') {
            while lines.last().is_some_and(|l| l.is_empty()) {
                lines.pop();
            }
        }

        let mut header = header[..1].to_string();
        if let Some(c) = chomp {
            header.push(c);
        }
        Ok(Scalar::Block { header, lines })
    }

    fn plain(&mut self, content: &str, had_comment: bool, min_indent: usize) -> Scalar {
        let first = content.trim_end();
        let mut value = first.to_string();
        let mut folded = false;

        if !had_comment {
            while let Some(line) = self.current() {
                if line.is_blank()
                    || line.is_comment()
                    || line.indent < min_indent
                    || line.is_document_marker()
                {
                    break;
                }
                let (text, comment) = split_comment(line.text);
                value.push(' ');
                value.push_str(text.trim_end());
                folded = true;
                self.pos += 1;
                if let Some(comment) = comment {
                    self.pending.push(comment);
                    break;
                }
            }
        }

        if folded {
            Scalar::string(&value)
        } else {
            Scalar::Inline {
                raw: first.to_string(),
                value,
            }
        }
    }

    fn quoted(&mut self, content: &str, line_no: usize) -> Result<(Scalar, Option<String>)> {
        let quote = content.chars().next().unwrap_or('"');
        let mut text = content.to_string();
        let mut multiline = false;

        loop {
            if let Some(end) = find_closing_quote(&text, quote) {
                let after = text[end + 1..].trim();
                let comment = match after {
                    "" => None,
                    c if c.starts_with('#') => Some(c.to_string()),
                    _ => {
                        return Err(ManifestError::syntax(
                            line_no,
                            "unexpected text after quoted scalar",
                        ));
                    }
                };

                let inner = &text[1..end];
                let value = if quote == '"' {
                    decode_double(inner, line_no)?
                } else {
                    inner.replace("''", "'")
                };
                let raw = if multiline {
                    double_quote(&value)
                } else {
                    text[..=end].to_string()
                };
                return Ok((Scalar::Inline { raw, value }, comment));
            }

            let Some(line) = self.current() else {
                return Err(ManifestError::syntax(line_no, "unterminated quoted scalar"));
            };
            self.pos += 1;
            multiline = true;
            if line.is_blank() {
                text.push('\n');
            } else {
                if !text.ends_with('\n') {
                    text.push(' ');
                }
                text.push_str(line.text);
            }
        }
    }

    fn flow(&mut self, content: &str, line_no: usize) -> Result<(Node, Option<String>)> {
        let mut text = content.to_string();
        let mut trailing = None;

        while flow_depth(&text) > 0 {
            let Some(line) = self.current() else {
                return Err(ManifestError::syntax(line_no, "unterminated flow collection"));
            };
            self.pos += 1;
            let (part, comment) = split_comment(line.text);
            text.push(' ');
            text.push_str(part.trim());
            trailing = comment;
        }

        let node = FlowParser {
            src: &text,
            pos: 0,
            line: line_no,
        }
        .document()?;
        Ok((node, trailing))
    }
}

fn is_blank(c: char) -> bool {
    c == ' ' || c == '\t'
}

/// Splits `key: rest` at the first mapping indicator outside quotes.
fn split_key(text: &str) -> Option<(&str, &str)> {
    if text.starts_with('"') || text.starts_with('\'') {
        let quote = text.chars().next()?;
        let end = find_closing_quote(text, quote)?;
        let after = text[end + 1..].trim_start_matches(is_blank);
        let rest = after.strip_prefix(':')?;
        return (rest.is_empty() || rest.starts_with(is_blank)).then_some((&text[..=end], rest));
    }
    if text.starts_with(['[', '{', '#', '|', '>', '?']) || is_seq_item(text) {
        return None;
    }

    let bytes = text.as_bytes();
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'#' if i > 0 && is_blank(bytes[i - 1] as char) => return None,
            b':' if i + 1 == bytes.len() || is_blank(bytes[i + 1] as char) => {
                let key = text[..i].trim_end();
                return (!key.is_empty()).then_some((key, &text[i + 1..]));
            }
            _ => {}
        }
    }
    None
}

/// Splits off a trailing `# comment`. A quote only opens a quoted span where
/// a scalar can start, so apostrophes inside plain text are left alone.
fn split_comment(text: &str) -> (&str, Option<String>) {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut prev: Option<char> = None;
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match quote {
            Some('"') if escaped => escaped = false,
            Some('"') if c == '\\' => escaped = true,
            // `''` is an escaped quote inside a single-quoted scalar.
            Some('\'') if c == '\'' && chars.peek().is_some_and(|&(_, n)| n == '\'') => {
                chars.next();
            }
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' if prev.is_none_or(|p| " \t[{,:".contains(p)) => quote = Some(c),
                '#' if prev.is_none_or(is_blank) => {
                    return (text[..i].trim_end(), Some(text[i..].to_string()));
                }
                _ => {}
            },
        }
        prev = Some(c);
    }
    (text, None)
}

fn split_props(text: &str) -> (Option<String>, &str) {
    let mut props = Vec::new();
    let mut rest = text;
    while rest.starts_with(['&', '!']) {
        let end = rest.find(' ').unwrap_or(rest.len());
        props.push(&rest[..end]);
        rest = rest[end..].trim_start();
    }
    if props.is_empty() {
        (None, text)
    } else {
        (Some(props.join(" ")), rest)
    }
}

fn flow_depth(text: &str) -> isize {
    let mut depth = 0;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for c in text.chars() {
        match quote {
            Some('"') if escaped => escaped = false,
            Some('"') if c == '\\' => escaped = true,
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '[' | '{' => depth += 1,
                ']' | '}' => depth -= 1,
                _ => {}
            },
        }
    }
    depth
}

/// Byte index of the quote closing the scalar that `text` starts with.
fn find_closing_quote(text: &str, quote: char) -> Option<usize> {
    let mut chars = text.char_indices().skip(1).peekable();
    while let Some((i, c)) = chars.next() {
        if quote == '"' && c == '\\' {
            chars.next();
        } else if c == quote {
            if quote == '\'' && chars.peek().is_some_and(|&(_, n)| n == '\'') {
                chars.next();
            } else {
                return Some(i);
            }
        }
    }
    None
}

fn decode_double(inner: &str, line_no: usize) -> Result<String> {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let escaped = match chars.next() {
            Some('0') => '\0',
            Some('a') => '\u{07}',
            Some('b') => '\u{08}',
            Some('t') | Some('\t') => '\t',
            Some('n') => '\n',
            Some('v') => '\u{0B}',
            Some('f') => '\u{0C}',
            Some('r') => '\r',
            Some('e') => '\u{1B}',
            Some(' ') => ' ',
            Some('"') => '"',
            Some('/') => '/',
            Some('\\') => '\\',
            Some('N') => '\u{85}',
            Some('_') => '\u{A0}',
            Some('L') => '\u{2028}',
            Some('P') => '\u{2029}',
            Some(kind @ ('x' | 'u' | 'U')) => {
                let width = match kind {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let hex: String = chars.by_ref().take(width).collect();
                u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == width)
                    .and_then(char::from_u32)
                    .ok_or_else(|| {
                        ManifestError::syntax(line_no, format!("invalid escape `\\{kind}{hex}`"))
                    })?
            }
            other => {
                return Err(ManifestError::syntax(
                    line_no,
                    format!("invalid escape `\\{}`", other.unwrap_or(' ')),
                ));
            }
        };
        out.push(escaped);
    }

    Ok(out)
}

fn inline_scalar(raw: &str, line_no: usize) -> Result<Scalar> {
    let value = match raw.chars().next() {
        Some(q @ ('"' | '\'')) => {
            let end = find_closing_quote(raw, q)
                .filter(|&end| end + 1 == raw.len())
                .ok_or_else(|| ManifestError::syntax(line_no, "malformed quoted scalar"))?;
            let inner = &raw[1..end];
            if q == '"' {
                decode_double(inner, line_no)?
            } else {
                inner.replace("''", "'")
            }
        }
        _ => raw.to_string(),
    };
    Ok(Scalar::Inline {
        raw: raw.to_string(),
        value,
    })
}

struct FlowParser<'s> {
    src: &'s str,
    pos: usize,
    line: usize,
}

impl FlowParser<'_> {
    fn document(mut self) -> Result<Node> {
        let node = self.node()?;
        self.skip_ws();
        if self.pos < self.src.len() {
            return Err(self.error("unexpected text after flow collection"));
        }
        Ok(node)
    }

    fn error(&self, message: &str) -> ManifestError {
        ManifestError::syntax(self.line, message)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn node(&mut self) -> Result<Node> {
        self.skip_ws();
        match self.peek() {
            Some('[') => {
                self.bump();
                self.sequence()
            }
            Some('{') => {
                self.bump();
                self.mapping()
            }
            _ => Ok(Node::new(Value::Scalar(self.scalar()?))),
        }
    }

    fn scalar(&mut self) -> Result<Scalar> {
        self.skip_ws();
        let rest = &self.src[self.pos..];

        if let Some(q @ ('"' | '\'')) = rest.chars().next() {
            let end = find_closing_quote(rest, q).ok_or_else(|| self.error("unterminated quoted scalar"))?;
            let scalar = inline_scalar(&rest[..=end], self.line)?;
            self.pos += end + 1;
            return Ok(scalar);
        }

        let bytes = rest.as_bytes();
        let mut end = bytes.len();
        for (i, &b) in bytes.iter().enumerate() {
            let at_indicator = b == b':'
                && bytes
                    .get(i + 1)
                    .is_none_or(|n| matches!(n, b' ' | b',' | b']' | b'}'));
            if matches!(b, b',' | b']' | b'}' | b'[' | b'{') || at_indicator {
                end = i;
                break;
            }
        }
        let raw = rest[..end].trim();
        self.pos += end;
        Ok(Scalar::Inline {
            raw: raw.to_string(),
            value: raw.to_string(),
        })
    }

    fn sequence(&mut self) -> Result<Node> {
        let mut seq = Sequence {
            items: Vec::new(),
            flow: true,
        };

        loop {
            self.skip_ws();
            if self.peek() == Some(']') {
                self.bump();
                break;
            }

            let mut item = self.node()?;
            self.skip_ws();
            if self.peek() == Some(':') {
                self.bump();
                let Value::Scalar(key) = item.value else {
                    return Err(self.error("flow mapping keys must be scalars"));
                };
                let value = self.pair_value()?;
                item = Node::new(Value::Mapping(Mapping {
                    entries: vec![Entry { key, value }],
                    flow: true,
                }));
            }
            seq.items.push(item);

            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some(']') => break,
                Some(_) => return Err(self.error("expected `,` or `]` in flow sequence")),
                None => return Err(self.error("unterminated flow sequence")),
            }
        }

        Ok(Node::new(Value::Sequence(seq)))
    }

    fn mapping(&mut self) -> Result<Node> {
        let mut map = Mapping {
            entries: Vec::new(),
            flow: true,
        };

        loop {
            self.skip_ws();
            if self.peek() == Some('}') {
                self.bump();
                break;
            }

            let key = self.scalar()?;
            self.skip_ws();
            let value = if self.peek() == Some(':') {
                self.bump();
                self.pair_value()?
            } else {
                Node::null()
            };
            map.entries.push(Entry { key, value });

            self.skip_ws();
            match self.bump() {
                Some(',') => continue,
                Some('}') => break,
                Some(_) => return Err(self.error("expected `,` or `}` in flow mapping")),
                None => return Err(self.error("unterminated flow mapping")),
            }
        }

        Ok(Node::new(Value::Mapping(map)))
    }

    fn pair_value(&mut self) -> Result<Node> {
        self.skip_ws();
        match self.peek() {
            Some(',' | ']' | '}') | None => Ok(Node::null()),
            _ => self.node(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_map(src: &str) -> Mapping {
        match parse(src).unwrap().root.unwrap().value {
            Value::Mapping(m) => m,
            other => panic!("Expected mapping, got {other:?}"),
        }
    }

    #[test]
    fn test_split_key() {
        assert_eq!(split_key("image: alpine/edge"), Some(("image", " alpine/edge")));
        assert_eq!(split_key("tasks:"), Some(("tasks", "")));
        assert_eq!(split_key("http://other.example.com/repo.git"), None);
        assert_eq!(split_key("git@localhost:testdata/repo.git"), None);
        assert_eq!(split_key("\"a: b\": c"), Some(("\"a: b\"", " c")));
        assert_eq!(split_key("echo # not: a key"), None);
        assert_eq!(split_key("image:\talpine"), Some(("image", "\talpine")));
        assert_eq!(split_key("'k':\tv"), Some(("'k'", "\tv")));
    }

    #[test]
    fn test_split_comment() {
        assert_eq!(split_comment("value # note"), ("value", Some("# note".to_string())));
        assert_eq!(split_comment("url#fragment"), ("url#fragment", None));
        assert_eq!(split_comment("'a # b' # c"), ("'a # b'", Some("# c".to_string())));
        assert_eq!(split_comment("it's # c"), ("it's", Some("# c".to_string())));
        assert_eq!(split_comment("'it''s # here'"), ("'it''s # here'", None));
        assert_eq!(
            split_comment("'it''s' # c"),
            ("'it''s'", Some("# c".to_string()))
        );
        assert_eq!(split_comment("x\t# c"), ("x", Some("# c".to_string())));
    }

    #[test]
    fn test_compact_sequence_under_key() {
        let map = root_map("sources:\n- a\n- b\ntasks: []\n");
        let Value::Sequence(seq) = &map.get("sources").unwrap().value else {
            panic!("Expected sequence");
        };
        let items: Vec<_> = seq.items.iter().filter_map(Node::as_str).collect();
        assert_eq!(items, vec!["a", "b"]);
        assert!(matches!(&map.get("tasks").unwrap().value, Value::Sequence(s) if s.flow && s.items.is_empty()));
    }

    #[test]
    fn test_sequence_of_mappings() {
        let map = root_map(
            "triggers:\n    - condition: failure\n      action: email\n    # status\n    - condition: always\n",
        );
        let Value::Sequence(seq) = &map.get("triggers").unwrap().value else {
            panic!("Expected sequence");
        };
        assert_eq!(seq.items.len(), 2);
        let Value::Mapping(first) = &seq.items[0].value else {
            panic!("Expected mapping item");
        };
        assert_eq!(first.get("action").unwrap().as_str(), Some("email"));
        assert_eq!(seq.items[1].head, vec!["# status".to_string()]);
    }

    #[test]
    fn test_block_scalar_lines() {
        let map = root_map("run: |-\n    make\n      indented\n\n    done\nnext: x\n");
        match &map.get("run").unwrap().value {
            Value::Scalar(Scalar::Block { header, lines }) => {
                assert_eq!(header, "|-");
                assert_eq!(lines, &["make", "  indented", "", "done"]);
            }
            other => panic!("Expected block scalar, got {other:?}"),
        }
        assert_eq!(map.get("next").unwrap().as_str(), Some("x"));
    }

    #[test]
    fn test_quoted_scalars() {
        let map = root_map("a: 'it''s'\nb: \"tab\\there\"\n'c d': plain\n");
        assert_eq!(map.get("a").unwrap().as_str(), Some("it's"));
        assert_eq!(map.get("b").unwrap().as_str(), Some("tab\there"));
        assert_eq!(map.get("c d").unwrap().as_str(), Some("plain"));
    }

    #[test]
    fn test_flow_collections() {
        let map = root_map("packages: [nodejs, 'npm', {name: rsync}]\nenv: {A: 1,\n  B: two}\n");
        let Value::Sequence(seq) = &map.get("packages").unwrap().value else {
            panic!("Expected sequence");
        };
        assert!(seq.flow);
        assert_eq!(seq.items.len(), 3);
        assert_eq!(seq.items[1].as_str(), Some("npm"));
        let Value::Mapping(env) = &map.get("env").unwrap().value else {
            panic!("Expected mapping");
        };
        assert_eq!(env.get("B").unwrap().as_str(), Some("two"));
    }

    #[test]
    fn test_comments_attach_to_following_entry() {
        let doc = parse("# manifest\n\nimage: x # distro\n# the tasks\ntasks: []\n# end\n").unwrap();
        assert_eq!(doc.head, vec!["# manifest".to_string()]);
        assert_eq!(doc.foot, vec!["# end".to_string()]);
        let Value::Mapping(map) = doc.root.unwrap().value else {
            panic!("Expected mapping");
        };
        assert_eq!(map.get("image").unwrap().line.as_deref(), Some("# distro"));
        assert_eq!(map.get("tasks").unwrap().head, vec!["# the tasks".to_string()]);
    }

    #[test]
    fn test_leading_comment_attaches_to_first_key() {
        let doc = parse("# header\n\n# the image\nimage: x\n").unwrap();
        assert_eq!(doc.head, vec!["# header".to_string()]);
        let Value::Mapping(map) = doc.root.unwrap().value else {
            panic!("Expected mapping");
        };
        assert_eq!(map.get("image").unwrap().head, vec!["# the image".to_string()]);

        let doc = parse("# only a comment\n").unwrap();
        assert!(doc.root.is_none());
    }

    #[test]
    fn test_document_marker_and_props() {
        let map = root_map("---\nbase: &base\n  a: 1\nother: !!str 12\n");
        assert_eq!(map.get("base").unwrap().props.as_deref(), Some("&base"));
        assert_eq!(map.get("other").unwrap().as_str(), Some("12"));
    }

    #[test]
    fn test_empty_document() {
        let doc = parse("# only a comment\n").unwrap();
        assert!(doc.root.is_none());
        assert_eq!(doc.head.len(), 1);
    }

    #[test]
    fn test_errors_carry_line_numbers() {
        assert_eq!(
            parse("a: 1\n   b: 2\n").unwrap_err(),
            ManifestError::syntax(2, "unexpected indentation")
        );
        assert_eq!(
            parse("a: 1\na: 2\n").unwrap_err(),
            ManifestError::syntax(2, "duplicate key `a`")
        );
        assert!(matches!(
            parse("a: \"open\n").unwrap_err(),
            ManifestError::Syntax { line: 1, .. }
        ));
        assert!(matches!(
            parse("a: 1\n---\nb: 2\n").unwrap_err(),
            ManifestError::Syntax { line: 2, .. }
        ));
    }
}
