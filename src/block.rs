/// Inline text spans with formatting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Emphasis(Vec<Inline>),
    Strong(Vec<Inline>),
    StrongEmphasis(Vec<Inline>),
    /// Literal code span, never scanned for markers
    Code(String),
    LineBreak,
}

impl Inline {
    /// Visible text of this span with all formatting removed.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.push_plain_text(&mut out);
        out
    }

    fn push_plain_text(&self, out: &mut String) {
        match self {
            Inline::Text(text) | Inline::Code(text) => out.push_str(text),
            Inline::Emphasis(inner) | Inline::Strong(inner) | Inline::StrongEmphasis(inner) => {
                for span in inner {
                    span.push_plain_text(out);
                }
            }
            Inline::LineBreak => out.push('\n'),
        }
    }
}

/// Index of a block inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(usize);

impl BlockId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Block-level elements parsed from Markdown
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading {
        level: u8,
        content: Vec<Inline>,
    },
    Paragraph {
        content: Vec<Inline>,
    },
    CodeBlock {
        lines: Vec<String>,
    },
    UnorderedList {
        items: Vec<BlockId>,
    },
    OrderedList {
        /// Number written on the first item
        start: u64,
        items: Vec<BlockId>,
    },
    ListItem {
        /// Number as written in the source, for ordered lists
        number: Option<u64>,
        children: Vec<BlockId>,
    },
    Rule,
    PageBreak,
}

impl Block {
    /// Child blocks of a list or list item, empty for leaf blocks.
    pub fn children(&self) -> &[BlockId] {
        match self {
            Block::UnorderedList { items } | Block::OrderedList { items, .. } => items,
            Block::ListItem { children, .. } => children,
            _ => &[],
        }
    }
}

/// A parsed Markdown document.
///
/// Blocks live in a flat arena and refer to their children by [`BlockId`], so
/// nested lists need no boxing. A document cannot be modified once built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Block>,
    roots: Vec<BlockId>,
}

impl Document {
    /// Top-level blocks in source order.
    pub fn roots(&self) -> &[BlockId] {
        &self.roots
    }

    pub fn get(&self, id: BlockId) -> &Block {
        &self.nodes[id.0]
    }

    /// Top-level blocks in source order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> + '_ {
        self.roots.iter().map(|id| self.get(*id))
    }

    pub fn children(&self, id: BlockId) -> impl Iterator<Item = &Block> + '_ {
        self.get(id).children().iter().map(|child| self.get(*child))
    }

    /// Total number of blocks at every depth.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Incremental construction of a [`Document`], used by the parser.
#[derive(Debug, Default)]
pub(crate) struct DocumentBuilder {
    doc: Document,
}

impl DocumentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a block without attaching it anywhere.
    pub fn alloc(&mut self, block: Block) -> BlockId {
        let id = BlockId(self.doc.nodes.len());
        self.doc.nodes.push(block);
        id
    }

    pub fn push_root(&mut self, id: BlockId) {
        self.doc.roots.push(id);
    }

    /// Append `child` to a list's items or a list item's children.
    pub fn push_child(&mut self, parent: BlockId, child: BlockId) {
        match &mut self.doc.nodes[parent.0] {
            Block::UnorderedList { items } | Block::OrderedList { items, .. } => items.push(child),
            Block::ListItem { children, .. } => children.push(child),
            other => debug_assert!(false, "block {:?} cannot hold children", other),
        }
    }

    pub fn finish(self) -> Document {
        self.doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arena_links_nested_items() {
        let mut builder = DocumentBuilder::new();
        let list = builder.alloc(Block::UnorderedList { items: vec![] });
        let item = builder.alloc(Block::ListItem {
            number: None,
            children: vec![],
        });
        let text = builder.alloc(Block::Paragraph {
            content: vec![Inline::Text("one".into())],
        });
        builder.push_child(item, text);
        builder.push_child(list, item);
        builder.push_root(list);
        let doc = builder.finish();

        assert_eq!(doc.roots(), &[list]);
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.get(list).children(), &[item]);
        let first: Vec<_> = doc.children(item).collect();
        assert_eq!(
            first,
            vec![&Block::Paragraph {
                content: vec![Inline::Text("one".into())]
            }]
        );
    }

    #[test]
    fn plain_text_flattens_formatting() {
        let span = Inline::Strong(vec![
            Inline::Text("a ".into()),
            Inline::Emphasis(vec![Inline::Code("b".into())]),
        ]);
        assert_eq!(span.plain_text(), "a b");
    }

    #[test]
    fn document_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Document>();
    }
}
