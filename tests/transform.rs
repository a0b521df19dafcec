//! End-to-end tests for converting Markdown to PDF files and streams.

use std::fs;
use std::io::{self, Write};

use mdpdf::{Block, Config, Error, Inline, Instruction, Marker};
use tempfile::tempdir;

const SAMPLE: &str = include_str!("data/sample.md");

/// Writer that records what it receives and how often it was flushed.
#[derive(Default)]
struct Recorder {
    data: Vec<u8>,
    flushes: usize,
}

impl Write for Recorder {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}

struct Broken;

impl Write for Broken {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed"))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn page_count(pdf: &[u8]) -> usize {
    let text = String::from_utf8_lossy(pdf);
    let count = text.split("/Count ").nth(1).expect("page tree");
    count
        .split(|c: char| !c.is_ascii_digit())
        .next()
        .and_then(|n| n.parse().ok())
        .expect("page count")
}

#[test]
fn transform_matches_write_of_parsed_document() {
    let dir = tempdir().unwrap();
    let direct = dir.path().join("direct.pdf");
    let parsed = dir.path().join("parsed.pdf");

    mdpdf::transform(SAMPLE, &direct).unwrap();
    mdpdf::write(&mdpdf::parse(SAMPLE), &parsed).unwrap();

    let direct = fs::read(&direct).unwrap();
    assert!(direct.starts_with(b"%PDF-1.4"));
    assert_eq!(direct, fs::read(&parsed).unwrap());
}

#[test]
fn file_and_stream_outputs_are_identical() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.pdf");
    mdpdf::transform(SAMPLE, &path).unwrap();

    let mut from_text = Vec::new();
    mdpdf::transform_to_writer(SAMPLE, &mut from_text).unwrap();
    let mut from_document = Vec::new();
    mdpdf::write_to_writer(&mdpdf::parse(SAMPLE), &mut from_document).unwrap();

    let file = fs::read(&path).unwrap();
    assert_eq!(file, from_text);
    assert_eq!(file, from_document);
    assert_eq!(file, mdpdf::markdown_to_pdf(SAMPLE).unwrap());
}

#[test]
fn document_can_be_written_repeatedly() {
    let dir = tempdir().unwrap();
    let document = mdpdf::parse(SAMPLE);
    let first = dir.path().join("first.pdf");
    let second = dir.path().join("second.pdf");

    mdpdf::write(&document, &first).unwrap();
    mdpdf::write(&document, &second).unwrap();

    assert_eq!(fs::read(first).unwrap(), fs::read(second).unwrap());
    assert_eq!(document, mdpdf::parse(SAMPLE));
}

#[test]
fn stream_is_flushed_and_left_open() {
    let mut out = Recorder::default();
    mdpdf::transform_to_writer(SAMPLE, &mut out).unwrap();
    let len = out.data.len();
    assert!(out.data.ends_with(b"%%EOF"));
    assert_eq!(out.flushes, 1);

    // Still usable by the caller afterwards
    out.write_all(b"\n% trailing").unwrap();
    assert_eq!(out.data.len(), len + 11);
}

#[test]
fn dyn_writer_is_accepted() {
    let mut buf = Vec::new();
    let out: &mut dyn Write = &mut buf;
    mdpdf::transform_to_writer(SAMPLE, out).unwrap();
    assert!(buf.starts_with(b"%PDF-"));
}

#[test]
fn stream_failure_is_reported() {
    let err = mdpdf::transform_to_writer(SAMPLE, &mut Broken).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert!(err.to_string().contains("pipe closed"));
}

#[test]
fn uncreatable_destination_is_reported() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing").join("out.pdf");
    let err = mdpdf::transform(SAMPLE, &path).unwrap_err();
    assert!(matches!(err, Error::Create { .. }));
    assert!(err.to_string().contains(&path.display().to_string()));
}

#[test]
fn existing_file_is_overwritten() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("out.pdf");
    fs::write(&path, vec![b'x'; 1 << 20]).unwrap();

    mdpdf::transform("# Short", &path).unwrap();
    let written = fs::read(&path).unwrap();
    assert!(written.starts_with(b"%PDF-"));
    assert!(written.ends_with(b"%%EOF"));
}

#[test]
fn sample_document_structure() {
    let doc = mdpdf::parse(SAMPLE);
    let roots: Vec<&Block> = doc.blocks().collect();

    for (level, block) in (1..=6).zip(&roots) {
        assert!(matches!(block, Block::Heading { level: l, .. } if *l == level));
    }
    assert_eq!(
        roots[8],
        &Block::Paragraph {
            content: vec![
                Inline::StrongEmphasis(vec![Inline::Text(
                    "very strong emphasis (italic and boldface)".into()
                )]),
                Inline::Text(" or ".into()),
                Inline::StrongEmphasis(vec![Inline::Text(
                    "very strong emphasis (italic and boldface)".into()
                )]),
            ]
        }
    );
    assert_eq!(
        roots[10],
        &Block::CodeBlock {
            lines: vec![
                "line 1 of code".into(),
                "line 2 of code".into(),
                "line 3 of code".into(),
            ]
        }
    );
    assert!(matches!(roots[11], Block::UnorderedList { items } if items.len() == 3));
    assert!(matches!(roots[12], Block::Paragraph { .. }));
    assert!(matches!(roots[13], Block::OrderedList { start: 1, items } if items.len() == 4));
    assert_eq!(roots.len(), 14);
}

#[test]
fn sample_markers_follow_source() {
    let instructions = mdpdf::layout(&mdpdf::parse(SAMPLE), &Config::default());
    let markers: Vec<Marker> = instructions
        .iter()
        .filter_map(|i| match i {
            Instruction::Marker { marker, .. } => Some(*marker),
            _ => None,
        })
        .collect();

    let numbers: Vec<String> = markers
        .iter()
        .filter(|m| matches!(m, Marker::Number(_)))
        .map(|m| m.label())
        .collect();
    assert_eq!(numbers, vec!["1.", "1.", "1.", "2.", "9.", "5."]);

    let bullets: Vec<char> = markers
        .iter()
        .filter_map(|m| match m {
            Marker::Bullet(b) => Some(b.glyph()),
            _ => None,
        })
        .collect();
    assert_eq!(bullets, vec!['l', 'm', 'n', 'l', 'l']);
}

#[test]
fn long_document_spans_several_pages() {
    let markdown: String = (0..300)
        .map(|i| format!("Paragraph {i} with a few words of filler text.\n\n"))
        .collect();
    let config = Config::default();

    let instructions = mdpdf::layout(&mdpdf::parse(&markdown), &config);
    let usable = config.page.content_height();
    for instruction in &instructions {
        if let Instruction::Text(run) = instruction {
            assert!(run.y <= usable);
        }
    }

    let pdf = mdpdf::markdown_to_pdf_with_config(&markdown, &config).unwrap();
    assert_eq!(page_count(&pdf), mdpdf::pages(&instructions).len());
    assert!(page_count(&pdf) > 1);
}

#[test]
fn config_file_changes_output() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("mdpdf.toml");
    fs::write(
        &config_path,
        "[page]\nsize = \"a4\"\nnumbers = true\n\n[document]\ntitle = \"Sample\"\ncompress = true\n",
    )
    .unwrap();
    let config = Config::from_file(&config_path).unwrap();

    let mut out = Vec::new();
    mdpdf::transform_to_writer_with_config(SAMPLE, &mut out, &config).unwrap();
    let text = String::from_utf8_lossy(&out);
    assert!(text.contains("/MediaBox [0 0 595 842]"));
    assert!(text.contains("/Filter /FlateDecode"));
    assert!(text.contains("/Title (Sample)"));
}

#[test]
fn invalid_config_file_is_rejected() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("bad.toml");
    fs::write(&config_path, "[page\nwidth = ").unwrap();

    let err = Config::from_file(&config_path).unwrap_err();
    assert!(matches!(err, Error::Config { .. }));
    assert_eq!(Config::load(&config_path), Config::compiled_default());
}
