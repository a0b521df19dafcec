//! PDF objects and their serialization.

use std::io::{self, Write};

/// The subset of PDF object types the writer produces.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Integer(i64),
    Real(f64),
    Name(String),
    String(Vec<u8>),
    Array(Vec<Object>),
    /// Entries are written in insertion order
    Dictionary(Vec<(String, Object)>),
    /// `/Length` is added when serialized
    Stream {
        dict: Vec<(String, Object)>,
        data: Vec<u8>,
    },
    /// Reference to an indirect object, generation 0
    Reference(u32),
}

impl Object {
    pub fn name(name: &str) -> Self {
        Object::Name(name.to_string())
    }

    pub fn dict(entries: Vec<(&str, Object)>) -> Self {
        Object::Dictionary(entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    /// A text string for the document information dictionary.
    ///
    /// ASCII is written as is, anything else as UTF-16BE with a byte order mark.
    pub fn text(text: &str) -> Self {
        if text.is_ascii() {
            return Object::String(text.as_bytes().to_vec());
        }
        let mut bytes = vec![0xFE, 0xFF];
        for unit in text.encode_utf16() {
            bytes.extend_from_slice(&unit.to_be_bytes());
        }
        Object::String(bytes)
    }
}

/// Write `{id} 0 obj ... endobj`.
pub fn write_indirect<W: Write>(w: &mut W, id: u32, obj: &Object) -> io::Result<()> {
    writeln!(w, "{} 0 obj", id)?;
    write_object(w, obj)?;
    write!(w, "\nendobj\n")
}

pub fn write_object<W: Write>(w: &mut W, obj: &Object) -> io::Result<()> {
    match obj {
        Object::Integer(i) => write!(w, "{}", i),
        Object::Real(r) => write!(w, "{}", format_real(*r)),
        Object::Name(name) => write_name(w, name),
        Object::String(data) => write_string(w, data),
        Object::Array(items) => {
            write!(w, "[")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(w, " ")?;
                }
                write_object(w, item)?;
            }
            write!(w, "]")
        }
        Object::Dictionary(entries) => write_dict(w, entries, None),
        Object::Stream { dict, data } => {
            write_dict(w, dict, Some(data.len()))?;
            write!(w, "\nstream\n")?;
            w.write_all(data)?;
            write!(w, "\nendstream")
        }
        Object::Reference(id) => write!(w, "{} 0 R", id),
    }
}

fn write_dict<W: Write>(w: &mut W, entries: &[(String, Object)], length: Option<usize>) -> io::Result<()> {
    write!(w, "<<")?;
    for (key, value) in entries {
        write!(w, " ")?;
        write_name(w, key)?;
        write!(w, " ")?;
        write_object(w, value)?;
    }
    if let Some(length) = length {
        write!(w, " /Length {}", length)?;
    }
    write!(w, " >>")
}

/// Format a number with at most three decimals and no trailing zeros.
pub fn format_real(value: f64) -> String {
    let formatted = format!("{:.3}", value);
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    match trimmed {
        "-0" | "" => "0".to_string(),
        _ => trimmed.to_string(),
    }
}

/// Literal string when printable, hex string otherwise.
fn write_string<W: Write>(w: &mut W, data: &[u8]) -> io::Result<()> {
    if data.iter().all(|b| (0x20..=0x7E).contains(b)) {
        write!(w, "(")?;
        write_escaped(w, data)?;
        write!(w, ")")
    } else {
        write!(w, "<")?;
        for byte in data {
            write!(w, "{:02X}", byte)?;
        }
        write!(w, ">")
    }
}

/// Escape bytes for the inside of a literal string. Bytes outside printable
/// ASCII are written as octal escapes.
pub fn write_escaped<W: Write>(w: &mut W, data: &[u8]) -> io::Result<()> {
    for &byte in data {
        match byte {
            b'(' => write!(w, "\\(")?,
            b')' => write!(w, "\\)")?,
            b'\\' => write!(w, "\\\\")?,
            0x20..=0x7E => w.write_all(&[byte])?,
            _ => write!(w, "\\{:03o}", byte)?,
        }
    }
    Ok(())
}

fn write_name<W: Write>(w: &mut W, name: &str) -> io::Result<()> {
    write!(w, "/")?;
    for byte in name.bytes() {
        match byte {
            b'!'..=b'~'
                if !matches!(
                    byte,
                    b'#' | b'/' | b'%' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}'
                ) =>
            {
                w.write_all(&[byte])?
            }
            _ => write!(w, "#{:02X}", byte)?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn serialize(obj: &Object) -> String {
        let mut buf = Vec::new();
        write_object(&mut buf, obj).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn reals_are_trimmed() {
        assert_eq!(format_real(72.0), "72");
        assert_eq!(format_real(701.6), "701.6");
        assert_eq!(format_real(0.12345), "0.123");
        assert_eq!(format_real(-0.0001), "0");
    }

    #[test]
    fn dictionary_keeps_order() {
        let obj = Object::dict(vec![
            ("Type", Object::name("Page")),
            ("Parent", Object::Reference(2)),
            ("MediaBox", Object::Array(vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Real(612.0),
                Object::Real(792.0),
            ])),
        ]);
        assert_eq!(serialize(&obj), "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>");
    }

    #[test]
    fn stream_gets_length() {
        let obj = Object::Stream {
            dict: vec![],
            data: b"BT ET".to_vec(),
        };
        assert_eq!(serialize(&obj), "<< /Length 5 >>\nstream\nBT ET\nendstream");
    }

    #[test]
    fn strings_escape_delimiters() {
        assert_eq!(serialize(&Object::text("a (b) \\c")), "(a \\(b\\) \\\\c)");
    }

    #[test]
    fn non_ascii_text_is_utf16() {
        assert_eq!(serialize(&Object::text("é")), "<FEFF00E9>");
    }

    #[test]
    fn names_escape_delimiters() {
        assert_eq!(serialize(&Object::name("A B/C")), "/A#20B#2FC");
    }

    #[test]
    fn indirect_object_framing() {
        let mut buf = Vec::new();
        write_indirect(&mut buf, 7, &Object::Integer(3)).unwrap();
        assert_eq!(buf, b"7 0 obj\n3\nendobj\n");
    }

    #[test]
    fn escaped_high_bytes_are_octal() {
        let mut buf = Vec::new();
        write_escaped(&mut buf, &[b'a', 0xE9, b')']).unwrap();
        assert_eq!(buf, b"a\\351\\)");
    }
}
