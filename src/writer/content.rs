//! Page content stream builder.

use std::io::{self, Write};

use super::object::{format_real, write_escaped};

/// Content stream operators used for rendered pages.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentOp {
    /// Save graphics state (q)
    SaveState,
    /// Restore graphics state (Q)
    RestoreState,
    /// Begin text object (BT)
    BeginText,
    /// End text object (ET)
    EndText,
    /// Set font resource and size (Tf)
    SetFont(&'static str, f32),
    /// Position text with a translation-only matrix (Tm)
    SetTextPosition(f32, f32),
    /// Show encoded text (Tj)
    ShowText(Vec<u8>),
    /// Set stroke gray level (G)
    SetStrokeGray(f32),
    /// Set line width (w)
    SetLineWidth(f32),
    /// Move to (m)
    MoveTo(f32, f32),
    /// Line to (l)
    LineTo(f32, f32),
    /// Stroke (S)
    Stroke,
}

/// Accumulates operators for one page, opening text objects and switching
/// fonts only when needed.
#[derive(Debug, Default)]
pub struct ContentStreamBuilder {
    ops: Vec<ContentOp>,
    font: Option<(&'static str, f32)>,
    in_text: bool,
}

impl ContentStreamBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `text`, already encoded for the font, with its baseline at (x, y).
    pub fn text(&mut self, font: &'static str, size: f32, x: f32, y: f32, text: Vec<u8>) {
        if !self.in_text {
            self.ops.push(ContentOp::BeginText);
            self.in_text = true;
        }
        if self.font != Some((font, size)) {
            self.ops.push(ContentOp::SetFont(font, size));
            self.font = Some((font, size));
        }
        self.ops.push(ContentOp::SetTextPosition(x, y));
        self.ops.push(ContentOp::ShowText(text));
    }

    /// Stroke a straight line.
    pub fn line(&mut self, from: (f32, f32), to: (f32, f32), width: f32, gray: f32) {
        self.end_text();
        self.ops.extend([
            ContentOp::SaveState,
            ContentOp::SetStrokeGray(gray),
            ContentOp::SetLineWidth(width),
            ContentOp::MoveTo(from.0, from.1),
            ContentOp::LineTo(to.0, to.1),
            ContentOp::Stroke,
            ContentOp::RestoreState,
        ]);
    }

    fn end_text(&mut self) {
        if self.in_text {
            self.ops.push(ContentOp::EndText);
            self.in_text = false;
        }
    }

    pub fn build(mut self) -> io::Result<Vec<u8>> {
        self.end_text();
        let mut buf = Vec::new();
        for op in &self.ops {
            write_op(&mut buf, op)?;
            writeln!(buf)?;
        }
        Ok(buf)
    }
}

fn write_op<W: Write>(w: &mut W, op: &ContentOp) -> io::Result<()> {
    let n = |v: f32| format_real(f64::from(v));
    match op {
        ContentOp::SaveState => write!(w, "q"),
        ContentOp::RestoreState => write!(w, "Q"),
        ContentOp::BeginText => write!(w, "BT"),
        ContentOp::EndText => write!(w, "ET"),
        ContentOp::SetFont(name, size) => write!(w, "/{} {} Tf", name, n(*size)),
        ContentOp::SetTextPosition(x, y) => write!(w, "1 0 0 1 {} {} Tm", n(*x), n(*y)),
        ContentOp::ShowText(text) => {
            write!(w, "(")?;
            write_escaped(w, text)?;
            write!(w, ") Tj")
        }
        ContentOp::SetStrokeGray(g) => write!(w, "{} G", n(*g)),
        ContentOp::SetLineWidth(width) => write!(w, "{} w", n(*width)),
        ContentOp::MoveTo(x, y) => write!(w, "{} {} m", n(*x), n(*y)),
        ContentOp::LineTo(x, y) => write!(w, "{} {} l", n(*x), n(*y)),
        ContentOp::Stroke => write!(w, "S"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(builder: ContentStreamBuilder) -> String {
        String::from_utf8(builder.build().unwrap()).unwrap()
    }

    #[test]
    fn text_shares_one_text_object() {
        let mut builder = ContentStreamBuilder::new();
        builder.text("F1", 11.0, 72.0, 700.5, b"Hello".to_vec());
        builder.text("F1", 11.0, 72.0, 685.0, b"(world)".to_vec());
        builder.text("F2", 11.0, 72.0, 670.0, b"bold".to_vec());
        assert_eq!(
            build(builder),
            "BT\n/F1 11 Tf\n1 0 0 1 72 700.5 Tm\n(Hello) Tj\n1 0 0 1 72 685 Tm\n(\\(world\\)) Tj\n\
             /F2 11 Tf\n1 0 0 1 72 670 Tm\n(bold) Tj\nET\n"
        );
    }

    #[test]
    fn line_closes_text_object() {
        let mut builder = ContentStreamBuilder::new();
        builder.text("F1", 10.0, 0.0, 0.0, b"a".to_vec());
        builder.line((72.0, 400.0), (540.0, 400.0), 0.5, 0.6);
        assert_eq!(
            build(builder),
            "BT\n/F1 10 Tf\n1 0 0 1 0 0 Tm\n(a) Tj\nET\nq\n0.6 G\n0.5 w\n72 400 m\n540 400 l\nS\nQ\n"
        );
    }

    #[test]
    fn empty_page_has_empty_stream() {
        assert_eq!(build(ContentStreamBuilder::new()), "");
    }
}
