use crate::block::{Block, BlockId, Document, DocumentBuilder};
use crate::inline;

/// Text that forces a page break when it stands alone on a line.
const PAGE_BREAK_MARKER: &str = "---pagebreak---";

/// Indentation, in columns, of one nesting level and of an indented code block.
const INDENT_STEP: usize = 4;

/// Strip YAML frontmatter from the beginning of markdown content
fn strip_frontmatter(markdown: &str) -> &str {
    let Some(rest) = markdown.strip_prefix("---\n").or_else(|| markdown.strip_prefix("---\r\n"))
    else {
        return markdown;
    };
    // Find the closing ---
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        offset += line.len();
        let trimmed = line.trim_end();
        if trimmed == "---" || trimmed == "..." {
            return rest[offset..].trim_start_matches(['\r', '\n']);
        }
    }
    markdown
}

/// Parse markdown text into a document.
///
/// Every input produces a document; lines no construct recognizes become
/// paragraph text.
pub fn parse(markdown: &str) -> Document {
    let markdown = strip_frontmatter(markdown);
    let mut parser = Parser::default();

    for line in markdown.lines() {
        parser.line(line);
    }

    let doc = parser.finish();
    log::debug!(
        "parsed {} top-level blocks ({} total)",
        doc.roots().len(),
        doc.len()
    );
    doc
}

/// A source line split into indentation and content.
#[derive(Debug, Clone, Copy)]
struct Line<'a> {
    raw: &'a str,
    /// Leading whitespace width in columns, tabs advancing to the next stop
    indent: usize,
    /// Everything after the leading whitespace
    content: &'a str,
}

impl<'a> Line<'a> {
    fn new(raw: &'a str) -> Self {
        let mut indent = 0;
        let mut start = raw.len();
        for (pos, ch) in raw.char_indices() {
            match ch {
                ' ' => indent += 1,
                '\t' => indent += INDENT_STEP - indent % INDENT_STEP,
                _ => {
                    start = pos;
                    break;
                }
            }
        }
        Self {
            raw,
            indent,
            content: &raw[start..],
        }
    }

    fn is_blank(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// The line with its first `columns` columns of indentation removed.
    fn strip_indent(&self, columns: usize) -> String {
        let mut col = 0;
        for (pos, ch) in self.raw.char_indices() {
            if col >= columns {
                return self.raw[pos..].to_string();
            }
            match ch {
                ' ' => col += 1,
                '\t' => col += INDENT_STEP - col % INDENT_STEP,
                _ => return self.raw[pos..].to_string(),
            }
        }
        if col > columns {
            " ".repeat(col - columns)
        } else {
            String::new()
        }
    }

    fn kind(&self) -> LineKind<'a> {
        let content = self.content;
        if content.trim_end() == PAGE_BREAK_MARKER {
            return LineKind::PageBreak;
        }
        if let Some((level, text)) = parse_heading(content) {
            return LineKind::Heading { level, text };
        }
        if is_rule(content) {
            return LineKind::Rule;
        }
        if let Some((marker, text, width)) = parse_item_marker(content) {
            return LineKind::Item {
                marker,
                text,
                content_col: self.indent + width,
            };
        }
        LineKind::Text
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Bullet,
    Number(u64),
}

impl Marker {
    fn is_ordered(self) -> bool {
        matches!(self, Marker::Number(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineKind<'a> {
    Heading {
        level: u8,
        text: &'a str,
    },
    Rule,
    PageBreak,
    Item {
        marker: Marker,
        text: &'a str,
        /// Column where the item text starts
        content_col: usize,
    },
    Text,
}

impl LineKind<'_> {
    /// Constructs that end an open paragraph. An ordered item only does when
    /// numbered 1, so wrapped text like `2024. was` stays in the paragraph.
    fn interrupts_paragraph(&self) -> bool {
        match self {
            LineKind::Text => false,
            LineKind::Item {
                marker: Marker::Number(n),
                ..
            } => *n == 1,
            _ => true,
        }
    }
}

/// Parse an ATX heading: 1-6 `#` followed by a space or end of line.
fn parse_heading(content: &str) -> Option<(u8, &str)> {
    let hashes = content.bytes().take_while(|&b| b == b'#').count();
    if !(1..=6).contains(&hashes) {
        return None;
    }
    let rest = &content[hashes..];
    if !(rest.is_empty() || rest.starts_with([' ', '\t'])) {
        return None;
    }

    let text = rest.trim();
    // Closing sequence: trailing #s preceded by whitespace, or nothing else
    let without_closing = text.trim_end_matches('#');
    let text = if without_closing.is_empty() {
        without_closing
    } else if without_closing.ends_with([' ', '\t']) {
        without_closing.trim_end()
    } else {
        text
    };
    Some((hashes as u8, text))
}

/// Three or more of the same `-`, `*` or `_`, optionally spaced, and nothing else.
fn is_rule(content: &str) -> bool {
    let mut chars = content.chars().filter(|c| !c.is_whitespace());
    let Some(first) = chars.next() else {
        return false;
    };
    if !matches!(first, '-' | '*' | '_') {
        return false;
    }
    let mut count = 1;
    for ch in chars {
        if ch != first {
            return false;
        }
        count += 1;
    }
    count >= 3
}

/// Recognize a list marker at the start of `content`.
///
/// Returns the marker, the item text, and the width in columns from the
/// marker to the start of the text.
fn parse_item_marker(content: &str) -> Option<(Marker, &str, usize)> {
    let bytes = content.as_bytes();
    let (marker, marker_len) = match bytes.first()? {
        b'*' | b'+' | b'-' => (Marker::Bullet, 1),
        b'0'..=b'9' => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            if digits > 9 || bytes.get(digits) != Some(&b'.') {
                return None;
            }
            let number = content[..digits].parse().ok()?;
            (Marker::Number(number), digits + 1)
        }
        _ => return None,
    };

    let rest = &content[marker_len..];
    if rest.trim().is_empty() {
        return Some((marker, "", marker_len + 1));
    }
    if !rest.starts_with([' ', '\t']) {
        return None;
    }
    let text = rest.trim_start();
    let gap = rest.len() - text.len();
    Some((marker, text.trim_end(), marker_len + gap))
}

/// Join paragraph lines, keeping hard breaks from lines ending in two spaces.
fn join_lines(lines: &[String]) -> String {
    let mut out = String::new();
    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim();
        out.push_str(trimmed);
        if i + 1 < lines.len() {
            if line.ends_with("  ") {
                out.push('\n');
            } else {
                out.push(' ');
            }
        }
    }
    out
}

/// A list that is still accepting items.
#[derive(Debug)]
struct OpenList {
    list: BlockId,
    ordered: bool,
    /// The item currently receiving text and nested blocks
    item: BlockId,
    /// Text lines of the item not yet turned into a paragraph
    text: Vec<String>,
    content_col: usize,
}

#[derive(Debug, Default)]
enum State {
    #[default]
    Blank,
    Paragraph(Vec<String>),
    Code {
        lines: Vec<String>,
        /// Blank lines seen since the last indented line
        blanks: usize,
    },
    List {
        /// Open lists from outermost to innermost; the index is the depth
        open: Vec<OpenList>,
        after_blank: bool,
    },
}

#[derive(Default)]
struct Parser {
    doc: DocumentBuilder,
    state: State,
}

impl Parser {
    fn line(&mut self, raw: &str) {
        let line = Line::new(raw);
        let state = std::mem::take(&mut self.state);
        self.state = match state {
            State::Blank => self.start(line),
            State::Paragraph(lines) => self.in_paragraph(lines, line),
            State::Code { lines, blanks } => self.in_code(lines, blanks, line),
            State::List { open, after_blank } => self.in_list(open, after_blank, line),
        };
    }

    fn finish(mut self) -> Document {
        match std::mem::take(&mut self.state) {
            State::Blank => {}
            State::Paragraph(lines) => self.flush_paragraph(&lines),
            State::Code { lines, .. } => self.flush_code(lines),
            State::List { open, .. } => self.close_lists(open),
        }
        self.doc.finish()
    }

    /// Handle a line with no block open.
    fn start(&mut self, line: Line) -> State {
        if line.is_blank() {
            return State::Blank;
        }
        if line.indent >= INDENT_STEP {
            return State::Code {
                lines: vec![line.strip_indent(INDENT_STEP)],
                blanks: 0,
            };
        }

        match line.kind() {
            LineKind::Heading { level, text } => {
                let id = self.doc.alloc(Block::Heading {
                    level,
                    content: inline::scan(text),
                });
                self.doc.push_root(id);
                State::Blank
            }
            LineKind::Rule => {
                self.push_root(Block::Rule);
                State::Blank
            }
            LineKind::PageBreak => {
                self.push_root(Block::PageBreak);
                State::Blank
            }
            LineKind::Item {
                marker,
                text,
                content_col,
            } => {
                let entry = self.open_list(None, marker, text, content_col);
                State::List {
                    open: vec![entry],
                    after_blank: false,
                }
            }
            LineKind::Text => State::Paragraph(vec![line.content.to_string()]),
        }
    }

    fn in_paragraph(&mut self, mut lines: Vec<String>, line: Line) -> State {
        if line.is_blank() {
            self.flush_paragraph(&lines);
            return State::Blank;
        }
        if line.indent < INDENT_STEP && line.kind().interrupts_paragraph() {
            self.flush_paragraph(&lines);
            return self.start(line);
        }
        lines.push(line.content.to_string());
        State::Paragraph(lines)
    }

    fn in_code(&mut self, mut lines: Vec<String>, blanks: usize, line: Line) -> State {
        if line.is_blank() {
            return State::Code {
                lines,
                blanks: blanks + 1,
            };
        }
        if line.indent >= INDENT_STEP {
            lines.extend(std::iter::repeat_n(String::new(), blanks));
            lines.push(line.strip_indent(INDENT_STEP));
            return State::Code { lines, blanks: 0 };
        }
        self.flush_code(lines);
        self.start(line)
    }

    fn in_list(&mut self, mut open: Vec<OpenList>, after_blank: bool, line: Line) -> State {
        if line.is_blank() {
            return State::List {
                open,
                after_blank: true,
            };
        }

        let kind = line.kind();
        if let LineKind::Item {
            marker,
            text,
            content_col,
        } = kind
        {
            let depth = (line.indent / INDENT_STEP).min(open.len());
            self.add_item(&mut open, depth, marker, text, content_col);
            return State::List {
                open,
                after_blank: false,
            };
        }

        if !after_blank {
            if line.indent < INDENT_STEP && kind.interrupts_paragraph() {
                self.close_lists(open);
                return self.start(line);
            }
            // Lazy continuation of the innermost item
            if let Some(innermost) = open.last_mut() {
                innermost.text.push(line.content.to_string());
            }
            return State::List {
                open,
                after_blank: false,
            };
        }

        // After a blank line only text indented under an item stays in the list
        match open.iter().rposition(|entry| line.indent >= entry.content_col) {
            Some(depth) => {
                self.close_lists_above(&mut open, depth);
                let entry = &mut open[depth];
                let text = std::mem::take(&mut entry.text);
                self.flush_item_text(entry.item, &text);
                entry.text.push(line.content.to_string());
                State::List {
                    open,
                    after_blank: false,
                }
            }
            None => {
                self.close_lists(open);
                self.start(line)
            }
        }
    }

    /// Add an item at `depth`, opening or closing nested lists as needed.
    fn add_item(
        &mut self,
        open: &mut Vec<OpenList>,
        depth: usize,
        marker: Marker,
        text: &str,
        content_col: usize,
    ) {
        if depth == open.len() {
            // One level deeper than the innermost list: nest under its item
            let parent = open.last_mut().map(|entry| {
                let pending = std::mem::take(&mut entry.text);
                self.flush_item_text(entry.item, &pending);
                entry.item
            });
            let entry = self.open_list(parent, marker, text, content_col);
            open.push(entry);
            return;
        }

        self.close_lists_above(open, depth);
        let current = &mut open[depth];
        let pending = std::mem::take(&mut current.text);
        self.flush_item_text(current.item, &pending);

        if current.ordered == marker.is_ordered() {
            let item = self.new_item(current.list, marker);
            current.item = item;
            current.text = item_text(text);
            current.content_col = content_col;
            return;
        }

        // Switching between bullets and numbers starts a sibling list
        open.truncate(depth);
        let parent = open.last().map(|entry| entry.item);
        let entry = self.open_list(parent, marker, text, content_col);
        open.push(entry);
    }

    /// Create a list with its first item, attached to `parent` or the root.
    fn open_list(
        &mut self,
        parent: Option<BlockId>,
        marker: Marker,
        text: &str,
        content_col: usize,
    ) -> OpenList {
        let list = match marker {
            Marker::Bullet => self.doc.alloc(Block::UnorderedList { items: Vec::new() }),
            Marker::Number(start) => self.doc.alloc(Block::OrderedList {
                start,
                items: Vec::new(),
            }),
        };
        match parent {
            Some(item) => self.doc.push_child(item, list),
            None => self.doc.push_root(list),
        }
        let item = self.new_item(list, marker);
        OpenList {
            list,
            ordered: marker.is_ordered(),
            item,
            text: item_text(text),
            content_col,
        }
    }

    fn new_item(&mut self, list: BlockId, marker: Marker) -> BlockId {
        let number = match marker {
            Marker::Bullet => None,
            Marker::Number(n) => Some(n),
        };
        let item = self.doc.alloc(Block::ListItem {
            number,
            children: Vec::new(),
        });
        self.doc.push_child(list, item);
        item
    }

    /// Close every list deeper than `depth`.
    fn close_lists_above(&mut self, open: &mut Vec<OpenList>, depth: usize) {
        let deeper = open.split_off(depth + 1);
        self.close_lists(deeper);
    }

    /// Close lists, flushing their pending item text.
    fn close_lists(&mut self, open: Vec<OpenList>) {
        for entry in open {
            self.flush_item_text(entry.item, &entry.text);
        }
    }

    fn flush_item_text(&mut self, item: BlockId, lines: &[String]) {
        if lines.is_empty() {
            return;
        }
        let paragraph = self.doc.alloc(Block::Paragraph {
            content: inline::scan(&join_lines(lines)),
        });
        self.doc.push_child(item, paragraph);
    }

    fn flush_paragraph(&mut self, lines: &[String]) {
        if lines.is_empty() {
            return;
        }
        self.push_root(Block::Paragraph {
            content: inline::scan(&join_lines(lines)),
        });
    }

    fn flush_code(&mut self, lines: Vec<String>) {
        self.push_root(Block::CodeBlock { lines });
    }

    fn push_root(&mut self, block: Block) {
        let id = self.doc.alloc(block);
        self.doc.push_root(id);
    }
}

fn item_text(text: &str) -> Vec<String> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![text.to_string()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Inline;

    /// Render a document as an indented outline for compact assertions.
    fn outline(doc: &Document) -> Vec<String> {
        fn walk(doc: &Document, id: BlockId, depth: usize, out: &mut Vec<String>) {
            let pad = "  ".repeat(depth);
            match doc.get(id) {
                Block::Heading { level, content } => {
                    out.push(format!("{pad}h{level} {}", text_of(content)))
                }
                Block::Paragraph { content } => out.push(format!("{pad}p {}", text_of(content))),
                Block::CodeBlock { lines } => out.push(format!("{pad}code {:?}", lines)),
                Block::UnorderedList { .. } => out.push(format!("{pad}ul")),
                Block::OrderedList { start, .. } => out.push(format!("{pad}ol {start}")),
                Block::ListItem { number, .. } => match number {
                    Some(n) => out.push(format!("{pad}li {n}")),
                    None => out.push(format!("{pad}li")),
                },
                Block::Rule => out.push(format!("{pad}rule")),
                Block::PageBreak => out.push(format!("{pad}pagebreak")),
            }
            for child in doc.get(id).children() {
                walk(doc, *child, depth + 1, out);
            }
        }

        let mut out = Vec::new();
        for id in doc.roots() {
            walk(doc, *id, 0, &mut out);
        }
        out
    }

    fn text_of(content: &[Inline]) -> String {
        content.iter().map(Inline::plain_text).collect()
    }

    #[test]
    fn heading_levels() {
        for level in 1..=6u8 {
            let md = format!("{} H{}", "#".repeat(level as usize), level);
            let doc = parse(&md);
            assert_eq!(
                doc.blocks().next(),
                Some(&Block::Heading {
                    level,
                    content: vec![Inline::Text(format!("H{level}"))],
                })
            );
        }
    }

    #[test]
    fn seven_hashes_is_paragraph() {
        assert_eq!(outline(&parse("####### X")), vec!["p ####### X"]);
    }

    #[test]
    fn heading_closing_hashes_are_stripped() {
        assert_eq!(outline(&parse("## Title ##")), vec!["h2 Title"]);
        assert_eq!(outline(&parse("# C#")), vec!["h1 C#"]);
        assert_eq!(outline(&parse("#hashtag")), vec!["p #hashtag"]);
    }

    #[test]
    fn paragraph_lines_are_joined() {
        assert_eq!(
            outline(&parse("one\ntwo\n\nthree")),
            vec!["p one two", "p three"]
        );
    }

    #[test]
    fn hard_break_from_trailing_spaces() {
        let doc = parse("line one  \nline two");
        assert_eq!(
            doc.blocks().next(),
            Some(&Block::Paragraph {
                content: vec![
                    Inline::Text("line one".into()),
                    Inline::LineBreak,
                    Inline::Text("line two".into()),
                ]
            })
        );
    }

    #[test]
    fn heading_interrupts_paragraph() {
        assert_eq!(outline(&parse("text\n# Head")), vec!["p text", "h1 Head"]);
    }

    #[test]
    fn only_first_number_interrupts_paragraph() {
        assert_eq!(
            outline(&parse("it began in\n2024. was a year")),
            vec!["p it began in 2024. was a year"]
        );
        assert_eq!(outline(&parse("intro\n1. first"))[..2], ["p intro", "ol 1"]);
        assert_eq!(outline(&parse("intro\n- bullet"))[..2], ["p intro", "ul"]);
    }

    #[test]
    fn code_block_keeps_internal_spacing() {
        let doc = parse("    line 1 of code\n    line   2\n      line 3");
        assert_eq!(
            doc.blocks().collect::<Vec<_>>(),
            vec![&Block::CodeBlock {
                lines: vec![
                    "line 1 of code".to_string(),
                    "line   2".to_string(),
                    "  line 3".to_string(),
                ]
            }]
        );
    }

    #[test]
    fn code_block_keeps_inner_blank_lines_only() {
        assert_eq!(
            outline(&parse("    a\n\n    b\n\n\ntext")),
            vec![r#"code ["a", "", "b"]"#, "p text"]
        );
    }

    #[test]
    fn code_is_not_inline_scanned() {
        let doc = parse("    **raw**");
        assert_eq!(
            doc.blocks().next(),
            Some(&Block::CodeBlock {
                lines: vec!["**raw**".to_string()]
            })
        );
    }

    #[test]
    fn tab_indents_code() {
        assert_eq!(outline(&parse("\tfn main() {}")), vec![r#"code ["fn main() {}"]"#]);
    }

    #[test]
    fn indented_line_continues_paragraph() {
        assert_eq!(outline(&parse("text\n    more")), vec!["p text more"]);
    }

    #[test]
    fn nested_bullets_with_mixed_markers() {
        let md = "* An item\n    + A subitem\n        - A sub subitem\n- Another item\n* Here's another item";
        assert_eq!(
            outline(&parse(md)),
            vec![
                "ul",
                "  li",
                "    p An item",
                "    ul",
                "      li",
                "        p A subitem",
                "        ul",
                "          li",
                "            p A sub subitem",
                "  li",
                "    p Another item",
                "  li",
                "    p Here's another item",
            ]
        );
    }

    #[test]
    fn ordered_numbers_are_kept_literally() {
        let md = "1. one\n    1. sub\n2. two\n9. nine\n5. five";
        assert_eq!(
            outline(&parse(md)),
            vec![
                "ol 1",
                "  li 1",
                "    p one",
                "    ol 1",
                "      li 1",
                "        p sub",
                "  li 2",
                "    p two",
                "  li 9",
                "    p nine",
                "  li 5",
                "    p five",
            ]
        );
    }

    #[test]
    fn over_indented_item_nests_one_level() {
        let md = "- a\n            - deep";
        assert_eq!(
            outline(&parse(md)),
            vec!["ul", "  li", "    p a", "    ul", "      li", "        p deep"]
        );
    }

    #[test]
    fn switching_list_kind_starts_sibling_list() {
        assert_eq!(
            outline(&parse("- a\n1. b")),
            vec!["ul", "  li", "    p a", "ol 1", "  li 1", "    p b"]
        );
    }

    #[test]
    fn blank_line_then_text_ends_list() {
        assert_eq!(
            outline(&parse("* item\n\nanother list\n\n1. first")),
            vec!["ul", "  li", "    p item", "p another list", "ol 1", "  li 1", "    p first"]
        );
    }

    #[test]
    fn lazy_continuation_joins_item_text() {
        assert_eq!(
            outline(&parse("- first line\ncontinued")),
            vec!["ul", "  li", "    p first line continued"]
        );
    }

    #[test]
    fn indented_paragraph_after_blank_stays_in_item() {
        assert_eq!(
            outline(&parse("- first\n\n  second para\n- next")),
            vec!["ul", "  li", "    p first", "    p second para", "  li", "    p next"]
        );
    }

    #[test]
    fn emphasis_lines_are_not_list_items() {
        assert_eq!(
            outline(&parse("*emphasis* here\n\n**strong**")),
            vec!["p emphasis here", "p strong"]
        );
    }

    #[test]
    fn rules_and_page_breaks() {
        assert_eq!(
            outline(&parse("a\n\n---\n\n* * *\n\n---pagebreak---\n\nb")),
            vec!["p a", "rule", "rule", "pagebreak", "p b"]
        );
    }

    #[test]
    fn frontmatter_is_stripped() {
        assert_eq!(
            outline(&parse("---\ntitle: x\n---\n# Body")),
            vec!["h1 Body"]
        );
        assert_eq!(strip_frontmatter("---\nno end"), "---\nno end");
    }

    #[test]
    fn crlf_input() {
        assert_eq!(outline(&parse("# A\r\n\r\ntext\r\n")), vec!["h1 A", "p text"]);
    }

    #[test]
    fn empty_input_gives_empty_document() {
        assert!(parse("").is_empty());
        assert!(parse("\n\n   \n").is_empty());
    }

    #[test]
    fn item_marker_forms() {
        assert_eq!(parse_item_marker("- x"), Some((Marker::Bullet, "x", 2)));
        assert_eq!(parse_item_marker("10.  x"), Some((Marker::Number(10), "x", 5)));
        assert_eq!(parse_item_marker("-x"), None);
        assert_eq!(parse_item_marker("1) x"), None);
        assert_eq!(parse_item_marker("-"), Some((Marker::Bullet, "", 2)));
    }
}
