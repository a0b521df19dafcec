//! Layout of a [`Document`] into positioned drawing instructions.
//!
//! Blocks are first turned into groups of line boxes, then the groups are
//! stacked onto pages. Coordinates are in points relative to the top-left
//! corner of the content area: `x` grows to the right, `y` grows downward and
//! gives the text baseline.

use crate::block::{Block, BlockId, Document, Inline};
use crate::config::Config;
use crate::fonts::{DESCENT, Face, FontSet};

/// A run of text in a single face and size.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f32,
    pub y: f32,
    pub face: Face,
    pub size: f32,
    pub text: String,
}

/// Bullet glyph of an unordered list item, chosen by nesting depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bullet {
    Disc,
    Circle,
    Square,
}

impl Bullet {
    fn for_depth(depth: usize) -> Self {
        match depth % 3 {
            0 => Bullet::Disc,
            1 => Bullet::Circle,
            _ => Bullet::Square,
        }
    }

    /// ZapfDingbats character drawing this bullet.
    pub fn glyph(self) -> char {
        match self {
            Bullet::Disc => 'l',
            Bullet::Circle => 'm',
            Bullet::Square => 'n',
        }
    }
}

/// Marker in front of a list item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Bullet(Bullet),
    /// Number as written in the source
    Number(u64),
}

impl Marker {
    pub fn face(self) -> Face {
        match self {
            Marker::Bullet(_) => Face::Dingbats,
            Marker::Number(_) => Face::Regular,
        }
    }

    /// Text drawn for the marker in its face.
    pub fn label(self) -> String {
        match self {
            Marker::Bullet(bullet) => bullet.glyph().to_string(),
            Marker::Number(n) => format!("{n}."),
        }
    }
}

/// A positioned drawing primitive.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    Text(TextRun),
    /// List marker; `x` is its left edge
    Marker {
        x: f32,
        y: f32,
        size: f32,
        marker: Marker,
    },
    /// Horizontal line starting at `x`, `y` is its vertical centre
    Rule { x: f32, y: f32, width: f32 },
    /// Everything after this goes on a new page
    PageBreak,
}

/// Split an instruction list into pages.
///
/// Always yields at least one page, possibly empty.
pub fn pages(instructions: &[Instruction]) -> Vec<&[Instruction]> {
    instructions.split(|i| matches!(i, Instruction::PageBreak)).collect()
}

// Vertical spacing, as multiples of the base font size
const BLOCK_GAP: f32 = 0.6;
const ITEM_GAP: f32 = 0.25;
const ITEM_PARAGRAPH_GAP: f32 = 0.4;
// Heading spacing, as a multiple of the heading size
const HEADING_GAP: f32 = 0.8;

// Bullets are smaller than text and lifted towards the x-height
const BULLET_SCALE: f32 = 0.45;
const BULLET_RAISE: f32 = 0.1;
// Space between a marker and the item text
const MARKER_GAP: f32 = 0.4;

#[derive(Debug, Clone, PartialEq)]
enum Item {
    Run {
        x: f32,
        face: Face,
        size: f32,
        text: String,
    },
    Marker {
        x: f32,
        size: f32,
        raise: f32,
        marker: Marker,
    },
    Rule {
        x: f32,
        width: f32,
    },
}

/// A line box. Lines without items are vertical space.
#[derive(Debug, Clone, PartialEq)]
struct Line {
    height: f32,
    /// Baseline offset from the top of the line
    baseline: f32,
    items: Vec<Item>,
}

impl Line {
    fn text(size: f32, line_height: f32) -> Self {
        let height = size * line_height;
        Self {
            height,
            baseline: (height + size) / 2.0 - size * DESCENT,
            items: Vec::new(),
        }
    }

    fn spacer(height: f32) -> Self {
        Self {
            height,
            baseline: 0.0,
            items: Vec::new(),
        }
    }

    fn is_spacer(&self) -> bool {
        self.items.is_empty()
    }

    /// Append text, extending the previous run when the style matches.
    fn push_text(&mut self, x: f32, face: Face, size: f32, text: &str) {
        if let Some(Item::Run {
            face: last_face,
            size: last_size,
            text: last_text,
            ..
        }) = self.items.last_mut()
        {
            if *last_face == face && *last_size == size {
                last_text.push_str(text);
                return;
            }
        }
        self.items.push(Item::Run {
            x,
            face,
            size,
            text: text.to_string(),
        });
    }
}

/// Lines that are placed on pages as a unit.
#[derive(Debug, Default)]
struct Group {
    lines: Vec<Line>,
    space_before: f32,
    /// Move to a fresh page rather than split, if that avoids the split
    keep_together: bool,
    /// Keep on the same page as the start of the next group
    keep_with_next: bool,
    page_break: bool,
}

impl Group {
    fn height(&self) -> f32 {
        self.lines.iter().map(|l| l.height).sum()
    }

    /// Height of the leading lines up to and including the `n`th text line.
    fn lead_height(&self, n: usize) -> f32 {
        let mut height = 0.0;
        let mut seen = 0;
        for line in &self.lines {
            if seen == n {
                break;
            }
            height += line.height;
            if !line.is_spacer() {
                seen += 1;
            }
        }
        height
    }
}

/// Word in a paragraph. Parts may differ in face, as in `**bold**text`.
#[derive(Debug, Clone, PartialEq)]
struct Word {
    parts: Vec<(Face, String)>,
    /// Face of the space in front of the word, if any
    space_before: Option<Face>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(Word),
    Break,
}

#[derive(Default)]
struct Tokenizer {
    tokens: Vec<Token>,
    word: Option<Word>,
    space: Option<Face>,
}

impl Tokenizer {
    fn spans(&mut self, spans: &[Inline], bold: bool, italic: bool) {
        for span in spans {
            match span {
                Inline::Text(text) => self.text(text, Face::styled(bold, italic)),
                Inline::Code(code) => self.code(code),
                Inline::Emphasis(inner) => self.spans(inner, bold, true),
                Inline::Strong(inner) => self.spans(inner, true, italic),
                Inline::StrongEmphasis(inner) => self.spans(inner, true, true),
                Inline::LineBreak => {
                    self.end_word();
                    self.space = None;
                    self.tokens.push(Token::Break);
                }
            }
        }
    }

    fn text(&mut self, text: &str, face: Face) {
        for ch in text.chars() {
            if ch.is_whitespace() {
                self.end_word();
                self.space.get_or_insert(face);
            } else {
                self.push_char(ch, face);
            }
        }
    }

    /// A code span never breaks and keeps every space it contains.
    fn code(&mut self, code: &str) {
        for ch in code.chars() {
            let ch = if ch.is_whitespace() { ' ' } else { ch };
            self.push_char(ch, Face::Mono);
        }
    }

    fn push_char(&mut self, ch: char, face: Face) {
        let space = &mut self.space;
        let word = self.word.get_or_insert_with(|| Word {
            parts: Vec::new(),
            space_before: space.take(),
        });
        match word.parts.last_mut() {
            Some((last, part)) if *last == face => part.push(ch),
            _ => word.parts.push((face, ch.to_string())),
        }
    }

    fn end_word(&mut self) {
        if let Some(word) = self.word.take() {
            self.tokens.push(Token::Word(word));
        }
    }

    fn finish(mut self) -> Vec<Token> {
        self.end_word();
        self.tokens
    }
}

fn tokenize(spans: &[Inline], bold: bool) -> Vec<Token> {
    let mut tokenizer = Tokenizer::default();
    tokenizer.spans(spans, bold, false);
    tokenizer.finish()
}

/// Lays out documents for one configuration.
#[derive(Debug, Clone)]
pub struct LayoutEngine {
    config: Config,
    fonts: FontSet,
}

impl LayoutEngine {
    /// Unusable settings are replaced with defaults.
    pub fn new(config: &Config) -> Self {
        let config = config.normalized();
        let fonts = FontSet::new(config.font.sans);
        Self { config, fonts }
    }

    /// The settings actually used, after normalization.
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn layout(&self, doc: &Document) -> Vec<Instruction> {
        let groups = self.groups(doc);
        let instructions = self.paginate(&groups);
        log::debug!(
            "laid out {} blocks as {} instructions on {} pages",
            doc.roots().len(),
            instructions.len(),
            pages(&instructions).len()
        );
        instructions
    }

    fn base_size(&self) -> f32 {
        self.config.font.base_size
    }

    fn indent(&self, depth: usize) -> f32 {
        self.config.layout.list_indent * depth as f32
    }

    fn groups(&self, doc: &Document) -> Vec<Group> {
        let block_gap = self.base_size() * BLOCK_GAP;
        let mut groups = Vec::new();

        for &id in doc.roots() {
            match doc.get(id) {
                Block::PageBreak => groups.push(Group {
                    page_break: true,
                    ..Group::default()
                }),
                Block::Heading { level, .. } => {
                    let size = self.heading_size(*level);
                    groups.push(Group {
                        lines: self.block_lines(doc, id, 0),
                        space_before: size * HEADING_GAP,
                        keep_with_next: true,
                        ..Group::default()
                    });
                }
                // Top-level items are placed one by one so long lists can break between them
                Block::UnorderedList { items } | Block::OrderedList { items, .. } => {
                    for (i, &item) in items.iter().enumerate() {
                        let gap = if i == 0 { BLOCK_GAP } else { ITEM_GAP };
                        groups.push(Group {
                            lines: self.item_lines(doc, item, 0),
                            space_before: self.base_size() * gap,
                            keep_together: true,
                            ..Group::default()
                        });
                    }
                }
                Block::CodeBlock { .. } => groups.push(Group {
                    lines: self.block_lines(doc, id, 0),
                    space_before: block_gap,
                    keep_together: true,
                    ..Group::default()
                }),
                Block::Paragraph { .. } | Block::Rule | Block::ListItem { .. } => {
                    groups.push(Group {
                        lines: self.block_lines(doc, id, 0),
                        space_before: block_gap,
                        ..Group::default()
                    })
                }
            }
        }
        groups
    }

    fn heading_size(&self, level: u8) -> f32 {
        self.base_size() * self.config.layout.scale_for_heading(level)
    }

    /// Lines for a block whose content starts at `list_indent * depth`.
    fn block_lines(&self, doc: &Document, id: BlockId, depth: usize) -> Vec<Line> {
        let x = self.indent(depth);
        let line_height = self.config.font.line_height;

        match doc.get(id) {
            Block::Heading { level, content } => {
                self.wrap(&tokenize(content, true), self.heading_size(*level), x)
            }
            Block::Paragraph { content } => self.wrap(&tokenize(content, false), self.base_size(), x),
            Block::CodeBlock { lines } => {
                let size = self.config.font.code_size;
                lines
                    .iter()
                    .map(|text| {
                        let mut line = Line::text(size, line_height);
                        let text = text.replace('\t', "    ");
                        if !text.is_empty() {
                            line.push_text(x, Face::Mono, size, &text);
                        }
                        line
                    })
                    .collect()
            }
            Block::UnorderedList { items } | Block::OrderedList { items, .. } => items
                .iter()
                .flat_map(|&item| self.item_lines(doc, item, depth))
                .collect(),
            Block::ListItem { .. } => self.item_lines(doc, id, depth),
            Block::Rule => {
                let mut line = Line::text(self.base_size(), line_height);
                line.items.push(Item::Rule {
                    x,
                    width: self.config.page.content_width() - x,
                });
                vec![line]
            }
            // Only meaningful at the top level
            Block::PageBreak => Vec::new(),
        }
    }

    /// Lines for a list item whose marker sits in the gutter at `depth`.
    fn item_lines(&self, doc: &Document, id: BlockId, depth: usize) -> Vec<Line> {
        let Block::ListItem { number, children } = doc.get(id) else {
            return self.block_lines(doc, id, depth + 1);
        };
        let base = self.base_size();

        let mut lines: Vec<Line> = Vec::new();
        let mut starts_with_text = false;
        for (i, &child) in children.iter().enumerate() {
            let nested = matches!(
                doc.get(child),
                Block::UnorderedList { .. } | Block::OrderedList { .. } | Block::ListItem { .. }
            );
            let child_lines = self.block_lines(doc, child, depth + 1);
            if i == 0 {
                starts_with_text = !nested && !child_lines.is_empty();
            } else if !nested && !child_lines.is_empty() {
                lines.push(Line::spacer(base * ITEM_PARAGRAPH_GAP));
            }
            lines.extend(child_lines);
        }
        if !starts_with_text {
            lines.insert(0, Line::text(base, self.config.font.line_height));
        }

        let marker = match number {
            Some(n) => Marker::Number(*n),
            None => Marker::Bullet(Bullet::for_depth(depth)),
        };
        let (size, raise) = match marker {
            Marker::Bullet(_) => (base * BULLET_SCALE, base * BULLET_RAISE),
            Marker::Number(_) => (base, 0.0),
        };
        let width = self.fonts.text_width(&marker.label(), marker.face(), size);
        let x = self.indent(depth + 1) - base * MARKER_GAP - width;
        lines[0].items.insert(
            0,
            Item::Marker {
                x,
                size,
                raise,
                marker,
            },
        );
        lines
    }

    /// Size of a face within text of the given size. Inline code is scaled
    /// like code blocks are against body text.
    fn face_size(&self, face: Face, size: f32) -> f32 {
        match face {
            Face::Mono => size * self.config.font.code_size / self.config.font.base_size,
            _ => size,
        }
    }

    /// Greedy word wrap into lines starting at `x`.
    fn wrap(&self, tokens: &[Token], size: f32, x: f32) -> Vec<Line> {
        let max_width = self.config.page.content_width() - x;
        let line_height = self.config.font.line_height;
        let mut lines = Vec::new();
        let mut line = Line::text(size, line_height);
        let mut cursor = 0.0;

        for token in tokens {
            let word = match token {
                Token::Break => {
                    lines.push(std::mem::replace(&mut line, Line::text(size, line_height)));
                    cursor = 0.0;
                    continue;
                }
                Token::Word(word) => word,
            };

            let width: f32 = word
                .parts
                .iter()
                .map(|(face, text)| self.fonts.text_width(text, *face, self.face_size(*face, size)))
                .sum();
            let mut space = match word.space_before {
                Some(face) if !line.items.is_empty() => {
                    Some((face, self.fonts.text_width(" ", face, self.face_size(face, size))))
                }
                _ => None,
            };
            let space_width = space.map_or(0.0, |(_, w)| w);

            if !line.items.is_empty() && cursor + space_width + width > max_width {
                lines.push(std::mem::replace(&mut line, Line::text(size, line_height)));
                cursor = 0.0;
                space = None;
            }
            if let Some((face, w)) = space {
                line.push_text(x + cursor, face, self.face_size(face, size), " ");
                cursor += w;
            }

            if cursor + width <= max_width {
                for (face, text) in &word.parts {
                    let face_size = self.face_size(*face, size);
                    line.push_text(x + cursor, *face, face_size, text);
                    cursor += self.fonts.text_width(text, *face, face_size);
                }
                continue;
            }

            // Wider than a whole line: break between characters
            for (face, text) in &word.parts {
                let face_size = self.face_size(*face, size);
                for ch in text.chars() {
                    let w = self.fonts.char_width(ch, *face) * face_size / 1000.0;
                    if cursor > 0.0 && cursor + w > max_width {
                        lines.push(std::mem::replace(&mut line, Line::text(size, line_height)));
                        cursor = 0.0;
                    }
                    let mut buf = [0; 4];
                    line.push_text(x + cursor, *face, face_size, ch.encode_utf8(&mut buf));
                    cursor += w;
                }
            }
        }

        if !line.items.is_empty() {
            lines.push(line);
        }
        lines
    }

    fn paginate(&self, groups: &[Group]) -> Vec<Instruction> {
        let usable = self.config.page.content_height();
        let keep_lines = self.config.layout.keep_heading_with_lines;
        let mut page = PageCursor::default();

        for (i, group) in groups.iter().enumerate() {
            if group.page_break {
                page.new_page();
                continue;
            }

            let mut needed = group.height();
            if group.keep_with_next {
                if let Some(next) = groups.get(i + 1) {
                    needed += next.space_before + next.lead_height(keep_lines);
                }
            }
            let keep = group.keep_together || group.keep_with_next;
            if keep && !page.empty && page.y + group.space_before + needed > usable && needed <= usable {
                page.new_page();
            }
            if !page.empty {
                page.y += group.space_before;
            }

            for line in &group.lines {
                if line.is_spacer() {
                    // Vertical space never starts a page
                    if !page.empty && page.y + line.height <= usable {
                        page.y += line.height;
                    }
                    continue;
                }
                if !page.empty && page.y + line.height > usable {
                    page.new_page();
                }
                page.place(line);
            }
        }
        page.out
    }
}

#[derive(Debug)]
struct PageCursor {
    out: Vec<Instruction>,
    /// Top of the next line
    y: f32,
    /// Nothing placed on the current page yet
    empty: bool,
    /// A page break is emitted only once something follows it
    break_pending: bool,
}

impl Default for PageCursor {
    fn default() -> Self {
        Self {
            out: Vec::new(),
            y: 0.0,
            empty: true,
            break_pending: false,
        }
    }
}

impl PageCursor {
    /// Start a new page unless the current one is still empty.
    fn new_page(&mut self) {
        if !self.empty {
            self.y = 0.0;
            self.empty = true;
            self.break_pending = true;
        }
    }

    fn place(&mut self, line: &Line) {
        if self.break_pending {
            self.out.push(Instruction::PageBreak);
            self.break_pending = false;
        }
        let top = self.y;
        for item in &line.items {
            let instruction = match item {
                Item::Run { x, face, size, text } => Instruction::Text(TextRun {
                    x: *x,
                    y: top + line.baseline,
                    face: *face,
                    size: *size,
                    text: text.clone(),
                }),
                Item::Marker {
                    x,
                    size,
                    raise,
                    marker,
                } => Instruction::Marker {
                    x: *x,
                    y: top + line.baseline - raise,
                    size: *size,
                    marker: *marker,
                },
                Item::Rule { x, width } => Instruction::Rule {
                    x: *x,
                    y: top + line.height / 2.0,
                    width: *width,
                },
            };
            self.out.push(instruction);
        }
        self.y += line.height;
        self.empty = false;
    }
}
