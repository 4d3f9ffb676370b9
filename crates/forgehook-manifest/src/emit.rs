use crate::node::{Document, Mapping, Node, Scalar, Sequence, Value, double_quote};

const INDENT: usize = 4;

/// Serializes a document with four-space indentation. Sequences are indented
/// below their key, mappings inside sequence items start on the dash line,
/// and comments are written back at the column of the node they belong to.
pub fn emit(doc: &Document) -> String {
    let mut out = Emitter::default();

    out.comments(&doc.head, 0);
    if let Some(root) = &doc.root {
        out.comments(&root.head, 0);
        match &root.value {
            Value::Mapping(map) if is_block_mapping(map) => out.mapping(map, 0, 0, false),
            Value::Sequence(seq) if is_block_sequence(seq) => out.sequence(seq, 0),
            _ => {
                out.buf.push_str(&flow(root));
                out.line_comment(root);
                out.newline();
            }
        }
    }
    out.comments(&doc.foot, 0);

    out.buf
}

fn is_block_mapping(map: &Mapping) -> bool {
    !map.flow && !map.entries.is_empty()
}

fn is_block_sequence(seq: &Sequence) -> bool {
    !seq.flow && !seq.items.is_empty()
}

#[derive(Default)]
struct Emitter {
    buf: String,
}

impl Emitter {
    fn pad(&mut self, col: usize) {
        self.buf.extend(std::iter::repeat_n(' ', col));
    }

    fn newline(&mut self) {
        self.buf.push('\n');
    }

    fn comments(&mut self, comments: &[String], col: usize) {
        for comment in comments {
            self.pad(col);
            self.buf.push_str(comment);
            self.newline();
        }
    }

    fn line_comment(&mut self, node: &Node) {
        if let Some(comment) = &node.line {
            self.buf.push(' ');
            self.buf.push_str(comment);
        }
    }

    fn props(&mut self, node: &Node) {
        if let Some(props) = &node.props {
            self.buf.push(' ');
            self.buf.push_str(props);
        }
    }

    /// `key_col` is where keys are written, `level` the indentation nested
    /// collections and block scalars are measured from. With `inline_first`
    /// the first key continues the current line.
    fn mapping(&mut self, map: &Mapping, key_col: usize, level: usize, inline_first: bool) {
        for (i, entry) in map.entries.iter().enumerate() {
            if !(inline_first && i == 0) {
                self.comments(&entry.value.head, key_col);
                self.pad(key_col);
            }
            self.buf.push_str(scalar_text(&entry.key));
            self.buf.push(':');
            self.after_key(&entry.value, key_col, level);
        }
    }

    fn after_key(&mut self, node: &Node, key_col: usize, level: usize) {
        let child = level + INDENT;

        match &node.value {
            Value::Mapping(map) if is_block_mapping(map) => {
                self.props(node);
                self.line_comment(node);
                self.newline();
                self.mapping(map, child, child, false);
            }
            Value::Sequence(seq) if is_block_sequence(seq) => {
                self.props(node);
                self.line_comment(node);
                self.newline();
                self.sequence(seq, child);
            }
            Value::Scalar(Scalar::Block { header, lines }) => {
                self.props(node);
                self.block_scalar(node, header, lines, key_col, child);
            }
            Value::Scalar(Scalar::Inline { raw, .. }) if raw.is_empty() && node.props.is_none() => {
                self.line_comment(node);
                self.newline();
            }
            _ => {
                self.buf.push(' ');
                self.buf.push_str(&flow(node));
                self.line_comment(node);
                self.newline();
            }
        }
    }

    fn sequence(&mut self, seq: &Sequence, dash_col: usize) {
        for item in &seq.items {
            self.comments(&item.head, dash_col);
            match &item.value {
                Value::Mapping(map)
                    if is_block_mapping(map) && item.props.is_none() && item.line.is_none() =>
                {
                    self.comments(&map.entries[0].value.head, dash_col);
                    self.pad(dash_col);
                    self.buf.push_str("- ");
                    self.mapping(map, dash_col + 2, dash_col, true);
                }
                _ => {
                    self.pad(dash_col);
                    self.buf.push('-');
                    self.item(item, dash_col);
                }
            }
        }
    }

    fn item(&mut self, node: &Node, dash_col: usize) {
        let child = dash_col + 2;

        match &node.value {
            Value::Mapping(map) if is_block_mapping(map) => {
                self.props(node);
                self.line_comment(node);
                self.newline();
                self.mapping(map, child, child, false);
            }
            Value::Sequence(seq) if is_block_sequence(seq) => {
                self.props(node);
                self.line_comment(node);
                self.newline();
                self.sequence(seq, child);
            }
            Value::Scalar(Scalar::Block { header, lines }) => {
                self.props(node);
                self.block_scalar(node, header, lines, dash_col, child);
            }
            Value::Scalar(Scalar::Inline { raw, .. }) if raw.is_empty() && node.props.is_none() => {
                self.line_comment(node);
                self.newline();
            }
            _ => {
                self.buf.push(' ');
                self.buf.push_str(&flow(node));
                self.line_comment(node);
                self.newline();
            }
        }
    }

    fn block_scalar(
        &mut self,
        node: &Node,
        header: &str,
        lines: &[String],
        parent_col: usize,
        content_col: usize,
    ) {
        let (style, chomp) = header.split_at(header.len().min(1));
        self.buf.push(' ');
        self.buf.push_str(style);
        // Leading spaces on the first line would be taken as indentation.
        if lines
            .iter()
            .find(|l| !l.is_empty())
            .is_some_and(|l| l.starts_with(' '))
        {
            self.buf.push_str(&(content_col - parent_col).to_string());
        }
        self.buf.push_str(chomp);
        self.line_comment(node);
        self.newline();

        for line in lines {
            if !line.is_empty() {
                self.pad(content_col);
                self.buf.push_str(line);
            }
            self.newline();
        }
    }
}

fn scalar_text(scalar: &Scalar) -> &str {
    match scalar {
        Scalar::Inline { raw, .. } => raw,
        Scalar::Block { .. } => "",
    }
}

/// Single-line rendering, used for scalars and flow or empty collections.
fn flow(node: &Node) -> String {
    let body = match &node.value {
        Value::Scalar(Scalar::Inline { raw, .. }) => raw.clone(),
        Value::Scalar(Scalar::Block { lines, .. }) => double_quote(&lines.join("\n")),
        Value::Sequence(seq) => {
            let items: Vec<String> = seq.items.iter().map(flow).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Mapping(map) => {
            let entries: Vec<String> = map
                .entries
                .iter()
                .map(|e| {
                    let key = scalar_text(&e.key);
                    if e.value.is_null() {
                        key.to_string()
                    } else {
                        format!("{key}: {}", flow(&e.value))
                    }
                })
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    };

    match &node.props {
        Some(props) if body.is_empty() => props.clone(),
        Some(props) => format!("{props} {body}"),
        None => body,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse;

    fn reformat(src: &str) -> String {
        emit(&parse(src).unwrap())
    }

    #[test]
    fn test_reindents_to_four_spaces() {
        let src = "image: alpine/edge\nsources:\n- a\ntasks:\n  - hello: echo world\n";
        assert_eq!(
            reformat(src),
            "image: alpine/edge\nsources:\n    - a\ntasks:\n    - hello: echo world\n"
        );
    }

    #[test]
    fn test_item_mapping_and_block_scalar() {
        let src = "tasks:\n    - say-hello: |\n        echo hello\n    - say-world: echo world\n";
        assert_eq!(reformat(src), src);
    }

    #[test]
    fn test_nested_mapping_under_item() {
        let src = "triggers:\n  - condition: failure\n    options:\n      to: Jim\n";
        assert_eq!(
            reformat(src),
            "triggers:\n    - condition: failure\n      options:\n        to: Jim\n"
        );
    }

    #[test]
    fn test_comments_are_kept() {
        let src = "# header\nimage: x # distro\nlist:\n    - a\n    # between\n    - b\n# footer\n";
        assert_eq!(reformat(src), src);
    }

    #[test]
    fn test_flow_and_null_values() {
        let src = "tasks: []\nenv: {A: 1, B}\nempty:\nanchor: &a\n";
        assert_eq!(reformat(src), src);
    }

    #[test]
    fn test_block_scalar_with_leading_spaces_gets_indicator() {
        let src = "run: |2-\n   indented\n  plain\n";
        assert_eq!(reformat(src), "run: |4-\n     indented\n    plain\n");
    }

    #[test]
    fn test_scalar_item_block() {
        let src = "- |\n  one\n  two\n- three\n";
        assert_eq!(reformat(src), src);
    }
}
