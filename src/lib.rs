mod block;
mod config;
mod error;
mod fonts;
mod inline;
mod layout;
mod parser;
mod writer;

pub use block::{Block, BlockId, Document, Inline};
pub use config::{
    Config, DocumentConfig, FontConfig, LayoutConfig, Margins, PageConfig, PaperSize,
};
pub use error::{Error, Result};
pub use fonts::Face;
pub use layout::{Bullet, Instruction, LayoutEngine, Marker, TextRun, pages};
pub use writer::PdfWriter;

use std::io::Write;
use std::path::Path;

/// Parse markdown text into a document.
pub fn parse(markdown: &str) -> Document {
    parser::parse(markdown)
}

/// Scan a single line of markdown into inline spans.
pub fn scan_inline(text: &str) -> Vec<Inline> {
    inline::scan(text)
}

/// Lay out a document into positioned drawing instructions.
pub fn layout(document: &Document, config: &Config) -> Vec<Instruction> {
    LayoutEngine::new(config).layout(document)
}

/// Render a document to PDF bytes.
pub fn render(document: &Document, config: &Config) -> Result<Vec<u8>> {
    let instructions = layout(document, config);
    PdfWriter::new(config).finish(&instructions)
}

/// Convert markdown to PDF bytes.
pub fn markdown_to_pdf(markdown: &str) -> Result<Vec<u8>> {
    markdown_to_pdf_with_config(markdown, &Config::compiled_default())
}

/// Convert markdown to PDF bytes with custom config.
pub fn markdown_to_pdf_with_config(markdown: &str, config: &Config) -> Result<Vec<u8>> {
    render(&parse(markdown), config)
}

/// Convert markdown to a PDF file, creating or overwriting `path`.
pub fn transform(markdown: &str, path: impl AsRef<Path>) -> Result<()> {
    transform_with_config(markdown, path, &Config::compiled_default())
}

/// Convert markdown to a PDF file with custom config.
pub fn transform_with_config(markdown: &str, path: impl AsRef<Path>, config: &Config) -> Result<()> {
    write_with_config(&parse(markdown), path, config)
}

/// Convert markdown to PDF and write it to `out`, which is flushed but not closed.
pub fn transform_to_writer<W: Write + ?Sized>(markdown: &str, out: &mut W) -> Result<()> {
    transform_to_writer_with_config(markdown, out, &Config::compiled_default())
}

/// Convert markdown to PDF and write it to `out` with custom config.
pub fn transform_to_writer_with_config<W: Write + ?Sized>(
    markdown: &str,
    out: &mut W,
    config: &Config,
) -> Result<()> {
    write_to_writer_with_config(&parse(markdown), out, config)
}

/// Render an already parsed document to a PDF file.
///
/// The document is left untouched and can be written again.
pub fn write(document: &Document, path: impl AsRef<Path>) -> Result<()> {
    write_with_config(document, path, &Config::compiled_default())
}

/// Render an already parsed document to a PDF file with custom config.
pub fn write_with_config(document: &Document, path: impl AsRef<Path>, config: &Config) -> Result<()> {
    let bytes = render(document, config)?;
    writer::write_file(path.as_ref(), &bytes)
}

/// Render an already parsed document to `out`, which is flushed but not closed.
pub fn write_to_writer<W: Write + ?Sized>(document: &Document, out: &mut W) -> Result<()> {
    write_to_writer_with_config(document, out, &Config::compiled_default())
}

/// Render an already parsed document to `out` with custom config.
pub fn write_to_writer_with_config<W: Write + ?Sized>(
    document: &Document,
    out: &mut W,
    config: &Config,
) -> Result<()> {
    let bytes = render(document, config)?;
    writer::write_stream(out, &bytes)
}
