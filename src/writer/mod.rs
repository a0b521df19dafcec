//! PDF emission.
//!
//! Turns laid-out instructions into a PDF 1.4 file: header, body, xref table,
//! and trailer. Only base-14 fonts are referenced and no timestamps are
//! recorded, so the same instructions always give the same bytes.

mod content;
mod object;

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::ZlibEncoder;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fonts::{self, Face, FontSet};
use crate::layout::{self, Instruction};

use content::ContentStreamBuilder;
use object::Object;

const PDF_VERSION: &str = "1.4";

// Rules are thin mid-gray lines
const RULE_WIDTH: f32 = 0.75;
const RULE_GRAY: f32 = 0.6;

// Page numbers, relative to the base font size
const PAGE_NUMBER_SCALE: f32 = 0.8;

/// Serializes laid-out pages for one configuration.
#[derive(Debug, Clone)]
pub struct PdfWriter {
    config: Config,
    fonts: FontSet,
}

impl PdfWriter {
    pub fn new(config: &Config) -> Self {
        let config = config.normalized();
        let fonts = FontSet::new(config.font.sans);
        Self { config, fonts }
    }

    /// Build the complete PDF document.
    pub fn finish(&self, instructions: &[Instruction]) -> Result<Vec<u8>> {
        let pages = layout::pages(instructions);
        let faces = self.used_faces(instructions);

        // Object ids: catalog, page tree, fonts, page/content pairs, info
        let catalog_id = 1;
        let pages_id = 2;
        let first_font_id = 3;
        let first_page_id = first_font_id + faces.len() as u32;
        let info_id = first_page_id + 2 * pages.len() as u32;

        let mut objects: Vec<Object> = Vec::new();
        objects.push(Object::dict(vec![
            ("Type", Object::name("Catalog")),
            ("Pages", Object::Reference(pages_id)),
        ]));
        let kids = (0..pages.len())
            .map(|i| Object::Reference(first_page_id + 2 * i as u32))
            .collect();
        objects.push(Object::dict(vec![
            ("Type", Object::name("Pages")),
            ("Kids", Object::Array(kids)),
            ("Count", Object::Integer(pages.len() as i64)),
        ]));

        let mut font_resources = Vec::new();
        for (i, face) in faces.iter().enumerate() {
            let id = first_font_id + i as u32;
            font_resources.push((face.resource_name().to_string(), Object::Reference(id)));
            objects.push(self.font_object(*face));
        }

        let (width, height) = self.config.page.dimensions();
        let resources = Object::dict(vec![("Font", Object::Dictionary(font_resources))]);
        for (i, page) in pages.iter().enumerate() {
            let page_id = first_page_id + 2 * i as u32;
            objects.push(Object::dict(vec![
                ("Type", Object::name("Page")),
                ("Parent", Object::Reference(pages_id)),
                (
                    "MediaBox",
                    Object::Array(vec![
                        Object::Integer(0),
                        Object::Integer(0),
                        Object::Real(f64::from(width)),
                        Object::Real(f64::from(height)),
                    ]),
                ),
                ("Resources", resources.clone()),
                ("Contents", Object::Reference(page_id + 1)),
            ]));
            objects.push(self.content_object(page, i + 1)?);
        }

        objects.push(self.info_object());
        debug_assert_eq!(objects.len() as u32, info_id);

        let mut output = Vec::new();
        writeln!(output, "%PDF-{}", PDF_VERSION)?;
        // Binary marker
        output.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");

        let mut offsets = Vec::with_capacity(objects.len());
        for (i, obj) in objects.iter().enumerate() {
            offsets.push(output.len());
            object::write_indirect(&mut output, i as u32 + 1, obj)?;
        }

        let xref_start = output.len();
        writeln!(output, "xref")?;
        writeln!(output, "0 {}", objects.len() + 1)?;
        // Object 0 is always free
        writeln!(output, "0000000000 65535 f ")?;
        for offset in &offsets {
            writeln!(output, "{:010} 00000 n ", offset)?;
        }

        let trailer = Object::dict(vec![
            ("Size", Object::Integer(objects.len() as i64 + 1)),
            ("Root", Object::Reference(catalog_id)),
            ("Info", Object::Reference(info_id)),
        ]);
        writeln!(output, "trailer")?;
        object::write_object(&mut output, &trailer)?;
        writeln!(output)?;
        writeln!(output, "startxref")?;
        writeln!(output, "{}", xref_start)?;
        write!(output, "%%EOF")?;

        log::debug!(
            "emitted {} pages, {} fonts, {} bytes",
            pages.len(),
            faces.len(),
            output.len()
        );
        Ok(output)
    }

    /// Faces referenced anywhere in the document, in resource order.
    fn used_faces(&self, instructions: &[Instruction]) -> BTreeSet<Face> {
        let mut faces: BTreeSet<Face> = instructions
            .iter()
            .filter_map(|i| match i {
                Instruction::Text(run) => Some(run.face),
                Instruction::Marker { marker, .. } => Some(marker.face()),
                Instruction::Rule { .. } | Instruction::PageBreak => None,
            })
            .collect();
        if self.config.page.numbers {
            faces.insert(Face::Regular);
        }
        faces
    }

    fn font_object(&self, face: Face) -> Object {
        let mut entries = vec![
            ("Type", Object::name("Font")),
            ("Subtype", Object::name("Type1")),
            ("BaseFont", Object::name(self.fonts.base_font(face))),
        ];
        // ZapfDingbats has its own built-in encoding
        if face != Face::Dingbats {
            entries.push(("Encoding", Object::name("WinAnsiEncoding")));
        }
        Object::dict(entries)
    }

    fn content_object(&self, page: &[Instruction], number: usize) -> Result<Object> {
        let (_, height) = self.config.page.dimensions();
        let margins = self.config.page.margins;
        // Instruction coordinates are relative to the top-left of the content area
        let to_pdf = |x: f32, y: f32| (margins.left + x, height - margins.top - y);

        let mut content = ContentStreamBuilder::new();
        for instruction in page {
            match instruction {
                Instruction::Text(run) => {
                    let (x, y) = to_pdf(run.x, run.y);
                    content.text(
                        run.face.resource_name(),
                        run.size,
                        x,
                        y,
                        fonts::encode_win_ansi(&run.text),
                    );
                }
                Instruction::Marker { x, y, size, marker } => {
                    let (x, y) = to_pdf(*x, *y);
                    let face = marker.face();
                    content.text(face.resource_name(), *size, x, y, fonts::encode_win_ansi(&marker.label()));
                }
                Instruction::Rule { x, y, width } => {
                    let from = to_pdf(*x, *y);
                    let to = to_pdf(x + width, *y);
                    content.line(from, to, RULE_WIDTH, RULE_GRAY);
                }
                Instruction::PageBreak => {}
            }
        }

        if self.config.page.numbers {
            let size = self.config.font.base_size * PAGE_NUMBER_SCALE;
            let label = number.to_string();
            let label_width = self.fonts.text_width(&label, Face::Regular, size);
            let x = margins.left + (self.config.page.content_width() - label_width) / 2.0;
            let y = margins.bottom / 2.0;
            content.text(Face::Regular.resource_name(), size, x, y, label.into_bytes());
        }

        let raw = content.build()?;
        let mut dict = Vec::new();
        let data = if self.config.document.compress {
            dict.push(("Filter".to_string(), Object::name("FlateDecode")));
            compress_data(&raw)?
        } else {
            raw
        };
        Ok(Object::Stream { dict, data })
    }

    fn info_object(&self) -> Object {
        let document = &self.config.document;
        let mut entries = Vec::new();
        if let Some(title) = &document.title {
            entries.push(("Title", Object::text(title)));
        }
        if let Some(author) = &document.author {
            entries.push(("Author", Object::text(author)));
        }
        if let Some(creator) = &document.creator {
            entries.push(("Creator", Object::text(creator)));
        }
        Object::dict(entries)
    }
}

/// Compress data for a FlateDecode stream.
fn compress_data(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Create or truncate `path` and write `bytes` to it.
///
/// The file is closed when this returns, whether or not writing succeeded.
pub fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    let file = File::create(path).map_err(|source| Error::Create {
        path: path.to_path_buf(),
        source,
    })?;
    let mut out = BufWriter::new(file);
    out.write_all(bytes)
        .and_then(|()| out.flush())
        .map_err(|source| Error::Write {
            path: path.to_path_buf(),
            source,
        })?;
    log::debug!("wrote {} bytes to {}", bytes.len(), path.display());
    Ok(())
}

/// Write `bytes` to a caller-owned stream and flush it. The stream stays open.
pub fn write_stream<W: Write + ?Sized>(w: &mut W, bytes: &[u8]) -> Result<()> {
    w.write_all(bytes)?;
    w.flush()?;
    Ok(())
}
