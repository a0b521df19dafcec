//! Inline span scanning.
//!
//! Turns the text of one block into [`Inline`] spans. Delimiters that never
//! find a partner are kept as literal text, so scanning cannot fail.

use crate::block::Inline;

/// Scan a logical line of text into inline spans.
///
/// A `\n` in the input marks a hard line break.
pub fn scan(text: &str) -> Vec<Inline> {
    let mut scanner = Scanner::new(text);
    scanner.run();
    scanner.finish()
}

/// Output buffer that merges adjacent text.
#[derive(Default)]
struct Spans {
    spans: Vec<Inline>,
    text: String,
}

impl Spans {
    fn push_char(&mut self, ch: char) {
        self.text.push(ch);
    }

    fn push_str(&mut self, s: &str) {
        self.text.push_str(s);
    }

    fn push(&mut self, span: Inline) {
        self.flush();
        self.spans.push(span);
    }

    fn flush(&mut self) {
        if !self.text.is_empty() {
            self.spans.push(Inline::Text(std::mem::take(&mut self.text)));
        }
    }

    fn finish(mut self) -> Vec<Inline> {
        self.flush();
        self.spans
    }
}

enum Piece {
    Text(String),
    Span(Inline),
    /// Delimiter characters not used by any match
    Delimiter { ch: u8, len: usize },
    /// Matched span over the list starting at `first`
    Emphasis { strength: usize, first: Option<usize> },
}

/// Doubly linked so a match can wrap the nodes between opener and closer
/// without moving them.
struct Node {
    piece: Piece,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Delimiter run that may still open a span.
struct Opener {
    node: usize,
    ch: u8,
}

struct Scanner<'a> {
    text: &'a str,
    nodes: Vec<Node>,
    head: Option<usize>,
    tail: Option<usize>,
    pending: String,
    openers: Vec<Opener>,
    /// Per delimiter (`*`, `_`): openers below this index never match it
    bottom: [usize; 2],
    /// Backtick run lengths with no closing run left in the text
    unclosed_code: Vec<usize>,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            nodes: Vec::new(),
            head: None,
            tail: None,
            pending: String::new(),
            openers: Vec::new(),
            bottom: [0; 2],
            unclosed_code: Vec::new(),
        }
    }

    fn run(&mut self) {
        let text = self.text;
        let bytes = text.as_bytes();
        let mut i = 0;

        while i < bytes.len() {
            match bytes[i] {
                b'\\' if bytes.get(i + 1).is_some_and(|b| b.is_ascii_punctuation()) => {
                    self.pending.push(char::from(bytes[i + 1]));
                    i += 2;
                }
                b'\n' => {
                    self.push(Piece::Span(Inline::LineBreak));
                    i += 1;
                }
                b'`' => {
                    let run = run_length(bytes, i, b'`');
                    match self.code_close(i + run, run) {
                        Some(close) => {
                            let code = strip_code_padding(&text[i + run..close]);
                            self.push(Piece::Span(Inline::Code(code)));
                            i = close + run;
                        }
                        None => {
                            self.pending.push_str(&text[i..i + run]);
                            i += run;
                        }
                    }
                }
                delim @ (b'*' | b'_') => {
                    let run = run_length(bytes, i, delim);
                    self.delimiter(i, run, delim);
                    i += run;
                }
                _ => {
                    let Some(ch) = text[i..].chars().next() else {
                        break;
                    };
                    self.pending.push(ch);
                    i += ch.len_utf8();
                }
            }
        }
    }

    fn code_close(&mut self, from: usize, run: usize) -> Option<usize> {
        if self.unclosed_code.contains(&run) {
            return None;
        }
        let close = find_code_close(self.text.as_bytes(), from, run);
        if close.is_none() {
            self.unclosed_code.push(run);
        }
        close
    }

    /// Handle the delimiter run of `len` characters at byte `at`.
    fn delimiter(&mut self, at: usize, len: usize, ch: u8) {
        let before = self.text[..at].chars().next_back();
        let after = self.text[at + len..].chars().next();
        let mut can_open = after.is_some_and(|c| !c.is_whitespace());
        let mut can_close = before.is_some_and(|c| !c.is_whitespace());
        if ch == b'_' {
            can_open &= !before.is_some_and(char::is_alphanumeric);
            can_close &= !after.is_some_and(char::is_alphanumeric);
        }

        let node = self.push(Piece::Delimiter { ch, len });
        if can_close {
            self.close(node, ch);
        }
        if can_open && self.delimiters_left(node) > 0 {
            self.openers.push(Opener { node, ch });
        }
    }

    /// Match the closing run against the nearest openers until it is used up
    /// or no opener is left.
    fn close(&mut self, closer: usize, ch: u8) {
        let slot = usize::from(ch == b'_');
        while self.delimiters_left(closer) > 0 {
            let floor = self.bottom[slot].min(self.openers.len());
            let Some(k) = self.openers[floor..].iter().rposition(|o| o.ch == ch) else {
                self.bottom[slot] = self.openers.len();
                return;
            };
            let k = floor + k;
            // Openers in between can no longer match and stay literal
            self.openers.truncate(k + 1);
            let opener = self.openers[k].node;

            let strength = self
                .delimiters_left(opener)
                .min(self.delimiters_left(closer))
                .min(3);
            self.wrap(opener, closer, strength);
            if self.delimiters_left(opener) == 0 {
                self.openers.pop();
            }
        }
    }

    /// Relink the nodes between `opener` and `closer` under a new span. The
    /// opener gives up its trailing characters, the closer its leading ones.
    fn wrap(&mut self, opener: usize, closer: usize, strength: usize) {
        self.use_delimiters(opener, strength);
        self.use_delimiters(closer, strength);

        let first = self.nodes[opener].next.filter(|&id| id != closer);
        if let Some(first) = first {
            if let Some(last) = self.nodes[closer].prev {
                self.nodes[last].next = None;
            }
            self.nodes[first].prev = None;
        }

        let id = self.nodes.len();
        self.nodes.push(Node {
            piece: Piece::Emphasis { strength, first },
            prev: Some(opener),
            next: Some(closer),
        });
        self.nodes[opener].next = Some(id);
        self.nodes[closer].prev = Some(id);
    }

    fn delimiters_left(&self, node: usize) -> usize {
        match self.nodes[node].piece {
            Piece::Delimiter { len, .. } => len,
            _ => 0,
        }
    }

    fn use_delimiters(&mut self, node: usize, n: usize) {
        if let Piece::Delimiter { len, .. } = &mut self.nodes[node].piece {
            *len -= n;
        }
    }

    fn push(&mut self, piece: Piece) -> usize {
        self.flush();
        self.append(piece)
    }

    fn flush(&mut self) {
        if !self.pending.is_empty() {
            let text = std::mem::take(&mut self.pending);
            self.append(Piece::Text(text));
        }
    }

    fn append(&mut self, piece: Piece) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node {
            piece,
            prev: self.tail,
            next: None,
        });
        match self.tail {
            Some(tail) => self.nodes[tail].next = Some(id),
            None => self.head = Some(id),
        }
        self.tail = Some(id);
        id
    }

    fn finish(mut self) -> Vec<Inline> {
        self.flush();
        let head = self.head;
        let (mut pieces, next): (Vec<Option<Piece>>, Vec<Option<usize>>) = self
            .nodes
            .into_iter()
            .map(|node| (Some(node.piece), node.next))
            .unzip();
        build_spans(head, &mut pieces, &next)
    }
}

/// Turn the linked list starting at `cursor` into spans.
fn build_spans(
    mut cursor: Option<usize>,
    pieces: &mut [Option<Piece>],
    next: &[Option<usize>],
) -> Vec<Inline> {
    let mut out = Spans::default();
    while let Some(id) = cursor {
        match pieces[id].take() {
            Some(Piece::Text(text)) => out.push_str(&text),
            Some(Piece::Span(span)) => out.push(span),
            Some(Piece::Delimiter { ch, len }) => {
                for _ in 0..len {
                    out.push_char(char::from(ch));
                }
            }
            Some(Piece::Emphasis { strength, first }) => {
                let inner = build_spans(first, pieces, next);
                out.push(match strength {
                    3 => Inline::StrongEmphasis(inner),
                    2 => Inline::Strong(inner),
                    _ => Inline::Emphasis(inner),
                });
            }
            None => {}
        }
        cursor = next[id];
    }
    out.finish()
}

fn find_code_close(bytes: &[u8], from: usize, run: usize) -> Option<usize> {
    let mut j = from;
    while j < bytes.len() {
        if bytes[j] == b'`' {
            let closing = run_length(bytes, j, b'`');
            if closing == run {
                return Some(j);
            }
            j += closing;
        } else {
            j += 1;
        }
    }
    None
}

fn run_length(bytes: &[u8], start: usize, b: u8) -> usize {
    bytes[start..].iter().take_while(|&&c| c == b).count()
}

/// Drop one space on each side of a code span, as in `` ` `` `.
fn strip_code_padding(code: &str) -> String {
    let padded = code.len() >= 2 && code.starts_with(' ') && code.ends_with(' ');
    if padded && !code.bytes().all(|b| b == b' ') {
        code[1..code.len() - 1].to_string()
    } else {
        code.to_string()
    }
}
