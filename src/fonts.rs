//! Base-14 font selection, glyph metrics, and WinAnsi encoding.
//!
//! Only the standard PDF fonts are used, so nothing is embedded. Widths are
//! the Adobe AFM advance widths in 1/1000 em for printable ASCII; other
//! characters use approximate widths.

/// Width used for characters with no metrics entry.
const DEFAULT_WIDTH: f32 = 500.0;

/// Descender depth as a fraction of the font size, shared by all text faces.
pub const DESCENT: f32 = 0.21;

/// A styled face within the configured font family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Face {
    Regular,
    Bold,
    Italic,
    BoldItalic,
    /// Fixed-width face for code
    Mono,
    /// ZapfDingbats, for list bullets
    Dingbats,
}

impl Face {
    pub fn styled(bold: bool, italic: bool) -> Self {
        match (bold, italic) {
            (false, false) => Face::Regular,
            (true, false) => Face::Bold,
            (false, true) => Face::Italic,
            (true, true) => Face::BoldItalic,
        }
    }

    /// Resource name used in page content streams.
    pub fn resource_name(self) -> &'static str {
        match self {
            Face::Regular => "F1",
            Face::Bold => "F2",
            Face::Italic => "F3",
            Face::BoldItalic => "F4",
            Face::Mono => "F5",
            Face::Dingbats => "F6",
        }
    }
}

/// The faces of one font family with their metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontSet {
    sans: bool,
}

impl FontSet {
    /// Helvetica when `sans`, Times otherwise. Code is always Courier.
    pub fn new(sans: bool) -> Self {
        Self { sans }
    }

    /// PostScript name of the base-14 font behind a face.
    pub fn base_font(&self, face: Face) -> &'static str {
        match (face, self.sans) {
            (Face::Regular, true) => "Helvetica",
            (Face::Bold, true) => "Helvetica-Bold",
            (Face::Italic, true) => "Helvetica-Oblique",
            (Face::BoldItalic, true) => "Helvetica-BoldOblique",
            (Face::Regular, false) => "Times-Roman",
            (Face::Bold, false) => "Times-Bold",
            (Face::Italic, false) => "Times-Italic",
            (Face::BoldItalic, false) => "Times-BoldItalic",
            (Face::Mono, _) => "Courier",
            (Face::Dingbats, _) => "ZapfDingbats",
        }
    }

    /// Width of `text` in points.
    pub fn text_width(&self, text: &str, face: Face, size: f32) -> f32 {
        let units: f32 = text.chars().map(|ch| self.char_width(ch, face)).sum();
        units * size / 1000.0
    }

    /// Width of one character in 1/1000 em, as it will be encoded.
    pub fn char_width(&self, ch: char, face: Face) -> f32 {
        let table = match (face, self.sans) {
            (Face::Mono, _) => return 600.0,
            (Face::Dingbats, _) => return dingbat_width(ch),
            (Face::Regular | Face::Italic, true) => &HELVETICA,
            (Face::Bold | Face::BoldItalic, true) => &HELVETICA_BOLD,
            // Times italics are close enough to upright for line breaking
            (Face::Regular | Face::Italic, false) => &TIMES_ROMAN,
            (Face::Bold | Face::BoldItalic, false) => &TIMES_BOLD,
        };

        match win_ansi(ch) {
            Some(code @ 0x20..=0x7E) => f32::from(table[usize::from(code - 0x20)]),
            Some(code) => high_width(code, table),
            None => f32::from(table[usize::from(b'?' - 0x20)]),
        }
    }
}

fn dingbat_width(ch: char) -> f32 {
    match ch {
        'l' => 791.0,
        'm' => 873.0,
        'n' => 761.0,
        _ => DEFAULT_WIDTH,
    }
}

/// Widths for the upper half of WinAnsi.
fn high_width(code: u8, table: &[u16; 95]) -> f32 {
    match code {
        0x95 => 350.0,
        0x96 => f32::from(table[usize::from(b'-' - 0x20)]) * 1.5,
        0x97 | 0x85 | 0x89 => 1000.0,
        0x91 | 0x92 | 0x82 => 222.0,
        0x93 | 0x94 | 0x84 => 333.0,
        0xA0 => f32::from(table[0]),
        // Accented letters are about as wide as the unaccented ones
        0xC0..=0xDF => f32::from(table[usize::from(b'O' - 0x20)]),
        0xE0..=0xFF => f32::from(table[usize::from(b'o' - 0x20)]),
        _ => DEFAULT_WIDTH,
    }
}

/// WinAnsiEncoding code for a character, if it has one.
pub fn win_ansi(ch: char) -> Option<u8> {
    let code = match ch {
        '\t' => b' ',
        ' '..='~' => ch as u8,
        '\u{A0}'..='\u{FF}' => ch as u8,
        '€' => 0x80,
        '‚' => 0x82,
        'ƒ' => 0x83,
        '„' => 0x84,
        '…' => 0x85,
        '†' => 0x86,
        '‡' => 0x87,
        'ˆ' => 0x88,
        '‰' => 0x89,
        'Š' => 0x8A,
        '‹' => 0x8B,
        'Œ' => 0x8C,
        'Ž' => 0x8E,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '˜' => 0x98,
        '™' => 0x99,
        'š' => 0x9A,
        '›' => 0x9B,
        'œ' => 0x9C,
        'ž' => 0x9E,
        'Ÿ' => 0x9F,
        _ => return None,
    };
    Some(code)
}

/// Encode text for a simple font with WinAnsiEncoding.
///
/// Characters outside the encoding become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars().map(|ch| win_ansi(ch).unwrap_or(b'?')).collect()
}

// Printable ASCII (0x20..=0x7E) advance widths, from the Adobe core font AFMs.

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

#[rustfmt::skip]
const TIMES_ROMAN: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444,
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722,
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500,
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500,
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541,
];

#[rustfmt::skip]
const TIMES_BOLD: [u16; 95] = [
    250, 333, 555, 500, 500, 1000, 833, 278, 333, 333, 500, 570, 250, 333, 250, 278,
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 333, 333, 570, 570, 570, 500,
    930, 722, 667, 722, 722, 667, 611, 778, 778, 389, 500, 778, 667, 944, 722, 778,
    611, 778, 722, 556, 667, 722, 722, 1000, 722, 722, 667, 333, 278, 333, 581, 500,
    333, 500, 556, 444, 556, 444, 333, 500, 556, 278, 333, 556, 278, 833, 556, 500,
    556, 556, 444, 389, 333, 556, 500, 722, 500, 500, 444, 394, 220, 394, 520,
];
