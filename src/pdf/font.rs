//! Text-layer fonts.
//!
//! The OCR text layer uses one of two fonts: outside PDF/A mode a built-in
//! Helvetica with WinAnsi encoding (nothing embedded), in PDF/A mode the
//! packaged monospace bold TrueType embedded as a CIDFontType2 with
//! Identity-H encoding, a `W` widths array, a ToUnicode CMap and the raw
//! font program in `FontFile2`.

use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};

use super::object::Object;
use super::syntax::{dict, int, name, reference, text};

/// Packaged face embedded in PDF/A mode (also used by the footer band).
pub const EMBEDDED_FONT_BYTES: &[u8] =
    include_bytes!("../../resources/DejaVuSansMono-Bold.ttf");

/// Resource name every page uses for its text font.
pub const FONT_RESOURCE: &str = "F1";

/// Text encoded for a content stream.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodedText {
    /// Literal string bytes (WinAnsi)
    Literal(Vec<u8>),
    /// Hex-encoded glyph ids (Identity-H)
    Hex(String),
}

/// The font the text layer is set in.
pub enum TextFont {
    /// Built-in Helvetica, WinAnsi, not embedded
    Builtin,
    /// Packaged TrueType, embedded
    Embedded(EmbeddedFont),
}

impl TextFont {
    /// Width of `text` in 1/1000 em units.
    pub fn width_units(&self, text: &str) -> f32 {
        match self {
            TextFont::Builtin => text.chars().map(helvetica_width).sum(),
            TextFont::Embedded(f) => text.chars().map(|c| f.char_width(c) as f32).sum(),
        }
    }

    /// Encode `text` for a `Tj` operand, recording glyph usage.
    pub fn encode(&mut self, text: &str) -> EncodedText {
        match self {
            TextFont::Builtin => EncodedText::Literal(win_ansi_bytes(text)),
            TextFont::Embedded(f) => EncodedText::Hex(f.encode_hex(text)),
        }
    }

    /// Build the font object graph; returns the id of the font dictionary.
    pub fn build_objects(&self, alloc: &mut dyn FnMut() -> u32) -> (u32, Vec<(u32, Object)>) {
        match self {
            TextFont::Builtin => {
                let id = alloc();
                let font = dict(vec![
                    ("Type", name("Font")),
                    ("Subtype", name("Type1")),
                    ("BaseFont", name("Helvetica")),
                    ("Encoding", name("WinAnsiEncoding")),
                ]);
                (id, vec![(id, font)])
            }
            TextFont::Embedded(f) => f.build_objects(alloc),
        }
    }
}

/// Parsed TrueType face with the lookups the writer needs.
pub struct EmbeddedFont {
    data: Vec<u8>,
    postscript_name: String,
    glyph_ids: HashMap<char, u16>,
    /// Glyph widths in 1/1000 em
    widths: HashMap<u16, u16>,
    /// Glyphs actually shown: gid -> unicode, kept sorted for W/ToUnicode
    used: BTreeMap<u16, u32>,
    ascent: i32,
    descent: i32,
    cap_height: i32,
    bbox: (i32, i32, i32, i32),
}

impl EmbeddedFont {
    /// Parse the packaged face.
    pub fn packaged() -> Result<Self> {
        Self::from_data(EMBEDDED_FONT_BYTES.to_vec())
    }

    /// Parse a TrueType face from raw bytes.
    pub fn from_data(data: Vec<u8>) -> Result<Self> {
        let face = ttf_parser::Face::parse(&data, 0)
            .map_err(|e| Error::Pdf(format!("unusable text-layer font: {}", e)))?;

        let upem = face.units_per_em() as f32;
        let to_pdf = |v: f32| (v * 1000.0 / upem).round() as i32;

        let mut glyph_ids = HashMap::new();
        let mut widths = HashMap::new();
        if let Some(cmap) = face.tables().cmap {
            for subtable in cmap.subtables {
                if !subtable.is_unicode() {
                    continue;
                }
                subtable.codepoints(|cp| {
                    if let (Some(ch), Some(gid)) =
                        (char::from_u32(cp), subtable.glyph_index(cp))
                    {
                        glyph_ids.entry(ch).or_insert(gid.0);
                        if let Some(advance) = face.glyph_hor_advance(gid) {
                            widths
                                .entry(gid.0)
                                .or_insert(to_pdf(advance as f32) as u16);
                        }
                    }
                });
            }
        }
        if glyph_ids.is_empty() {
            return Err(Error::Pdf(
                "text-layer font has no unicode character map".to_string(),
            ));
        }

        let bbox = face.global_bounding_box();
        let postscript_name = face
            .names()
            .into_iter()
            .find(|n| n.name_id == ttf_parser::name_id::POST_SCRIPT_NAME)
            .and_then(|n| n.to_string())
            .unwrap_or_else(|| "DejaVuSansMono-Bold".to_string());

        let ascent = to_pdf(face.ascender() as f32);
        let descent = to_pdf(face.descender() as f32);
        let cap_height = face
            .capital_height()
            .map(|c| to_pdf(c as f32))
            .unwrap_or(700);
        let bbox = (
            to_pdf(bbox.x_min as f32),
            to_pdf(bbox.y_min as f32),
            to_pdf(bbox.x_max as f32),
            to_pdf(bbox.y_max as f32),
        );

        Ok(Self {
            data,
            postscript_name,
            glyph_ids,
            widths,
            used: BTreeMap::new(),
            ascent,
            descent,
            cap_height,
            bbox,
        })
    }

    /// Width of one character in 1/1000 em; unmapped characters use the
    /// space advance of the face.
    pub fn char_width(&self, ch: char) -> u16 {
        self.glyph_ids
            .get(&ch)
            .and_then(|gid| self.widths.get(gid))
            .copied()
            .unwrap_or(600)
    }

    /// Encode a string as an Identity-H hex operand, e.g. `<00410042>`.
    pub fn encode_hex(&mut self, text: &str) -> String {
        let mut hex = String::with_capacity(text.len() * 4 + 2);
        hex.push('<');
        for ch in text.chars() {
            let gid = self.glyph_ids.get(&ch).copied().unwrap_or(0);
            if gid != 0 {
                self.used.insert(gid, ch as u32);
            }
            hex.push_str(&format!("{:04X}", gid));
        }
        hex.push('>');
        hex
    }

    /// CID widths array (`W` entry) over the glyphs in use, run-compressed.
    fn widths_array(&self) -> Object {
        let gids: Vec<u16> = self.used.keys().copied().collect();
        let mut entries: Vec<Object> = Vec::new();
        let mut i = 0;
        while i < gids.len() {
            let start = gids[i];
            let mut run = vec![self.widths.get(&start).copied().unwrap_or(600)];
            while i + 1 < gids.len() && gids[i + 1] == gids[i] + 1 {
                i += 1;
                run.push(self.widths.get(&gids[i]).copied().unwrap_or(600));
            }
            entries.push(Object::Integer(start as i64));
            entries.push(Object::Array(
                run.into_iter().map(|w| Object::Integer(w as i64)).collect(),
            ));
            i += 1;
        }
        Object::Array(entries)
    }

    /// ToUnicode CMap mapping the used glyph ids back to text.
    fn to_unicode_cmap(&self) -> Vec<u8> {
        let mut cmap = String::new();
        cmap.push_str("/CIDInit /ProcSet findresource begin\n");
        cmap.push_str("12 dict begin\n");
        cmap.push_str("begincmap\n");
        cmap.push_str("/CIDSystemInfo <<\n  /Registry (Adobe)\n  /Ordering (UCS)\n  /Supplement 0\n>> def\n");
        cmap.push_str("/CMapName /Adobe-Identity-UCS def\n");
        cmap.push_str("/CMapType 2 def\n");
        cmap.push_str("1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n");

        let mappings: Vec<(u16, u32)> = self.used.iter().map(|(&g, &u)| (g, u)).collect();
        for chunk in mappings.chunks(100) {
            cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
            for &(gid, unicode) in chunk {
                if unicode <= 0xFFFF {
                    cmap.push_str(&format!("<{:04X}> <{:04X}>\n", gid, unicode));
                } else {
                    let high = ((unicode - 0x10000) >> 10) + 0xD800;
                    let low = ((unicode - 0x10000) & 0x3FF) + 0xDC00;
                    cmap.push_str(&format!("<{:04X}> <{:04X}{:04X}>\n", gid, high, low));
                }
            }
            cmap.push_str("endbfchar\n");
        }

        cmap.push_str("endcmap\n");
        cmap.push_str("CMapName currentdict /CMap defineresource pop\n");
        cmap.push_str("end\nend\n");
        cmap.into_bytes()
    }

    /// Build the Type0 font object graph.
    fn build_objects(&self, alloc: &mut dyn FnMut() -> u32) -> (u32, Vec<(u32, Object)>) {
        let font_id = alloc();
        let descendant_id = alloc();
        let descriptor_id = alloc();
        let file_id = alloc();
        let to_unicode_id = alloc();

        let base_font = name(&self.postscript_name);

        // The font program is large; deflate it behind a FlateDecode filter.
        let (file_data, file_dict) = match compress_data(&self.data) {
            Ok(compressed) => (
                compressed,
                vec![
                    (
                        "Length1".to_string(),
                        Object::Integer(self.data.len() as i64),
                    ),
                    (
                        "Filter".to_string(),
                        Object::Name("FlateDecode".to_string()),
                    ),
                ],
            ),
            Err(_) => (
                self.data.clone(),
                vec![(
                    "Length1".to_string(),
                    Object::Integer(self.data.len() as i64),
                )],
            ),
        };
        let font_file = Object::Stream {
            dict: file_dict.into_iter().collect(),
            data: file_data,
        };

        let descriptor = dict(vec![
            ("Type", name("FontDescriptor")),
            ("FontName", base_font.clone()),
            // Fixed-pitch, nonsymbolic.
            ("Flags", int(33)),
            (
                "FontBBox",
                Object::Array(vec![
                    Object::Integer(self.bbox.0 as i64),
                    Object::Integer(self.bbox.1 as i64),
                    Object::Integer(self.bbox.2 as i64),
                    Object::Integer(self.bbox.3 as i64),
                ]),
            ),
            ("ItalicAngle", int(0)),
            ("Ascent", int(self.ascent as i64)),
            ("Descent", int(self.descent as i64)),
            ("CapHeight", int(self.cap_height as i64)),
            ("StemV", int(120)),
            ("FontFile2", reference(file_id)),
        ]);

        let descendant = dict(vec![
            ("Type", name("Font")),
            ("Subtype", name("CIDFontType2")),
            ("BaseFont", base_font.clone()),
            (
                "CIDSystemInfo",
                dict(vec![
                    ("Registry", text("Adobe")),
                    ("Ordering", text("Identity")),
                    ("Supplement", int(0)),
                ]),
            ),
            ("FontDescriptor", reference(descriptor_id)),
            ("DW", int(600)),
            ("W", self.widths_array()),
            ("CIDToGIDMap", name("Identity")),
        ]);

        let to_unicode = Object::Stream {
            dict: Default::default(),
            data: self.to_unicode_cmap(),
        };

        let font = dict(vec![
            ("Type", name("Font")),
            ("Subtype", name("Type0")),
            ("BaseFont", base_font),
            ("Encoding", name("Identity-H")),
            ("DescendantFonts", Object::Array(vec![reference(descendant_id)])),
            ("ToUnicode", reference(to_unicode_id)),
        ]);

        (
            font_id,
            vec![
                (font_id, font),
                (descendant_id, descendant),
                (descriptor_id, descriptor),
                (file_id, font_file),
                (to_unicode_id, to_unicode),
            ],
        )
    }
}

/// Compress data for a FlateDecode stream.
fn compress_data(data: &[u8]) -> std::io::Result<Vec<u8>> {
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

/// Helvetica character width in 1/1000 em (standard Type1 metrics);
/// unknown characters fall back to 500.
fn helvetica_width(ch: char) -> f32 {
    match ch {
        ' ' | '.' | ',' | ';' | ':' | '!' | '/' | '\\' | 'i' => 278.0,
        '\'' | 'j' | 'l' => 222.0,
        '"' => 355.0,
        '-' | '(' | ')' | '[' | ']' | '{' | '}' | 'f' | 't' | 'r' => 333.0,
        '*' => 389.0,
        '?' | '0'..='9' | '#' | '$' | '_' => 556.0,
        '%' => 889.0,
        '&' => 667.0,
        '+' | '=' | '<' | '>' | '~' => 584.0,
        '@' => 1015.0,
        'A' | 'B' | 'C' | 'D' | 'H' | 'K' | 'N' | 'R' | 'U' => 722.0,
        'E' | 'P' | 'S' | 'V' | 'X' | 'Y' => 667.0,
        'F' | 'L' | 'T' | 'Z' => 611.0,
        'G' | 'O' | 'Q' => 778.0,
        'I' => 278.0,
        'J' => 556.0,
        'M' => 833.0,
        'W' => 944.0,
        'a' | 'c' | 'e' | 'k' | 's' | 'v' | 'x' | 'y' | 'z' => 556.0,
        'b' | 'd' | 'g' | 'h' | 'n' | 'o' | 'p' | 'q' | 'u' => 611.0,
        'm' => 833.0,
        'w' => 778.0,
        'ä' | 'ö' | 'ü' | 'à' | 'é' | 'è' => 556.0,
        'Ä' | 'Ö' | 'Ü' => 722.0,
        'ß' => 611.0,
        _ => 500.0,
    }
}

/// Encode text as WinAnsi (cp1252) bytes; unmappable characters become `?`.
fn win_ansi_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch {
            '\u{0000}'..='\u{007E}' => ch as u8,
            '\u{00A0}'..='\u{00FF}' => ch as u8,
            '€' => 0x80,
            '‚' => 0x82,
            '„' => 0x84,
            '…' => 0x85,
            '†' => 0x86,
            '‡' => 0x87,
            '‰' => 0x89,
            'Š' => 0x8A,
            '‹' => 0x8B,
            'Œ' => 0x8C,
            'Ž' => 0x8E,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '™' => 0x99,
            'š' => 0x9A,
            '›' => 0x9B,
            'œ' => 0x9C,
            'ž' => 0x9E,
            'Ÿ' => 0x9F,
            _ => b'?',
        })
        .collect()
}
