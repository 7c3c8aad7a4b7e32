//! Watermark font embedding
//!
//! The preferred font is a TrueType/OpenType file embedded as a Type0 font with
//! Identity-H encoding, so any script the font covers can be drawn. The text is
//! shaped with rustybuzz once, up front, and only the glyphs it produces get
//! width and ToUnicode entries. When no preferred font is available the
//! standard Helvetica-Bold font is used instead; it only covers WinAnsi text.

use std::collections::BTreeMap;
use std::path::PathBuf;

use lopdf::{Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use rustybuzz::{Face, UnicodeBuffer};

use crate::error::{Error, Result};

/// Where the preferred watermark font is looked for by default
pub const DEFAULT_FONT_PATH: &str = "assets/fonts/NotoSansSC-Regular.ttf";

/// Standard font used when the preferred font is unavailable
pub const FALLBACK_FONT: &str = "Helvetica-Bold";

/// Supplies the bytes of the preferred watermark font
///
/// Any error is treated as recoverable by the caller and triggers the
/// standard-font fallback.
pub trait FontSource {
    fn load_font(&self) -> Result<Vec<u8>>;
}

/// Reads the preferred font from a fixed path on disk
#[derive(Debug, Clone)]
pub struct FileFontSource {
    path: PathBuf,
}

impl FileFontSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for FileFontSource {
    fn default() -> Self {
        Self::new(DEFAULT_FONT_PATH)
    }
}

impl FontSource for FileFontSource {
    fn load_font(&self) -> Result<Vec<u8>> {
        std::fs::read(&self.path)
            .map_err(|e| Error::FontEmbed(format!("cannot read {}: {}", self.path.display(), e)))
    }
}

/// Text already encoded for a specific font resource in the document
#[derive(Debug, Clone)]
pub struct EncodedText {
    /// The font dictionary the bytes are encoded for
    pub font_id: ObjectId,
    /// Operand bytes for the `Tj` operator
    pub bytes: Vec<u8>,
}

/// Embed a TrueType/OpenType font and encode `text` for it
///
/// Fails with [`Error::FontEmbed`] if the data is not a parseable font or if
/// the font has no glyph for any character of `text`.
pub fn embed_shaped_font(doc: &mut Document, font_data: &[u8], text: &str) -> Result<EncodedText> {
    let face = Face::from_slice(font_data, 0)
        .ok_or_else(|| Error::FontEmbed("data is not a TrueType or OpenType font".to_string()))?;
    let scale = 1000.0 / face.units_per_em().max(1) as f32;

    let mut buffer = UnicodeBuffer::new();
    buffer.push_str(text);
    let shaped = rustybuzz::shape(&face, &[], buffer);

    let mut bytes = Vec::with_capacity(shaped.len() * 2);
    let mut widths: BTreeMap<u16, i64> = BTreeMap::new();
    let mut unicode: BTreeMap<u16, char> = BTreeMap::new();
    let mut missing = 0usize;

    for (info, position) in shaped.glyph_infos().iter().zip(shaped.glyph_positions()) {
        let gid = u16::try_from(info.glyph_id)
            .map_err(|_| Error::FontEmbed(format!("glyph id {} out of range", info.glyph_id)))?;
        if gid == 0 {
            missing += 1;
        }

        bytes.extend_from_slice(&gid.to_be_bytes());
        widths
            .entry(gid)
            .or_insert_with(|| (position.x_advance as f32 * scale).round() as i64);
        if let Some(ch) = text.get(info.cluster as usize..).and_then(|s| s.chars().next()) {
            unicode.entry(gid).or_insert(ch);
        }
    }

    if missing > 0 && missing == shaped.len() {
        return Err(Error::FontEmbed("font has no glyphs for the watermark text".to_string()));
    }
    if missing > 0 {
        tracing::warn!(missing, "preferred font lacks glyphs for part of the watermark text");
    }

    let is_cff = font_data.starts_with(b"OTTO");

    // Font program
    let mut file_dict = Dictionary::new();
    if is_cff {
        file_dict.set("Subtype", Object::Name(b"OpenType".to_vec()));
    } else {
        file_dict.set("Length1", Object::Integer(font_data.len() as i64));
    }
    let font_file_id = doc.add_object(Object::Stream(Stream::new(file_dict, font_data.to_vec())));

    // Descriptor metrics come from the face, scaled to 1/1000 em
    let bbox = face.global_bounding_box();
    let scaled = |v: i16| Object::Integer((f32::from(v) * scale).round() as i64);

    let mut descriptor = Dictionary::new();
    descriptor.set("Type", Object::Name(b"FontDescriptor".to_vec()));
    descriptor.set("FontName", Object::Name(b"WatermarkFont".to_vec()));
    descriptor.set("Flags", Object::Integer(4)); // Symbolic
    descriptor.set("FontBBox", Object::Array(vec![
        scaled(bbox.x_min),
        scaled(bbox.y_min),
        scaled(bbox.x_max),
        scaled(bbox.y_max),
    ]));
    descriptor.set("ItalicAngle", Object::Integer(0));
    descriptor.set("Ascent", scaled(face.ascender()));
    descriptor.set("Descent", scaled(face.descender()));
    descriptor.set("CapHeight", scaled(face.capital_height().unwrap_or(face.ascender())));
    descriptor.set("StemV", Object::Integer(80));
    descriptor.set(
        if is_cff { "FontFile3" } else { "FontFile2" },
        Object::Reference(font_file_id),
    );
    let descriptor_id = doc.add_object(Object::Dictionary(descriptor));

    // Descendant CID font
    let mut cid_font = Dictionary::new();
    cid_font.set("Type", Object::Name(b"Font".to_vec()));
    cid_font.set(
        "Subtype",
        Object::Name(if is_cff { b"CIDFontType0".to_vec() } else { b"CIDFontType2".to_vec() }),
    );
    cid_font.set("BaseFont", Object::Name(b"WatermarkFont".to_vec()));
    cid_font.set("CIDSystemInfo", Object::Dictionary(Dictionary::from_iter(vec![
        ("Registry", Object::String(b"Adobe".to_vec(), StringFormat::Literal)),
        ("Ordering", Object::String(b"Identity".to_vec(), StringFormat::Literal)),
        ("Supplement", Object::Integer(0)),
    ])));
    cid_font.set("FontDescriptor", Object::Reference(descriptor_id));
    cid_font.set("DW", Object::Integer(1000));
    cid_font.set("W", Object::Array(glyph_widths(&widths)));
    if !is_cff {
        cid_font.set("CIDToGIDMap", Object::Name(b"Identity".to_vec()));
    }
    let cid_font_id = doc.add_object(Object::Dictionary(cid_font));

    let to_unicode_id = doc.add_object(Stream::new(
        Dictionary::new(),
        to_unicode_cmap(&unicode).into_bytes(),
    ));

    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type0".to_vec()));
    font.set("BaseFont", Object::Name(b"WatermarkFont".to_vec()));
    font.set("Encoding", Object::Name(b"Identity-H".to_vec()));
    font.set("DescendantFonts", Object::Array(vec![Object::Reference(cid_font_id)]));
    font.set("ToUnicode", Object::Reference(to_unicode_id));
    let font_id = doc.add_object(Object::Dictionary(font));

    tracing::debug!(glyphs = shaped.len(), cff = is_cff, "embedded preferred font");

    Ok(EncodedText { font_id, bytes })
}

/// Add the standard Helvetica-Bold font with WinAnsiEncoding
pub fn embed_standard_bold(doc: &mut Document) -> ObjectId {
    let mut font = Dictionary::new();
    font.set("Type", Object::Name(b"Font".to_vec()));
    font.set("Subtype", Object::Name(b"Type1".to_vec()));
    font.set("BaseFont", Object::Name(FALLBACK_FONT.as_bytes().to_vec()));
    font.set("Encoding", Object::Name(b"WinAnsiEncoding".to_vec()));

    doc.add_object(Object::Dictionary(font))
}

/// Encode text as WinAnsi bytes, or `None` if any character is outside WinAnsi
pub fn encode_win_ansi(text: &str) -> Option<Vec<u8>> {
    text.chars().map(win_ansi_byte).collect()
}

fn win_ansi_byte(ch: char) -> Option<u8> {
    let byte = match ch {
        ' '..='~' => ch as u8,
        '\u{A0}'..='\u{FF}' => ch as u32 as u8,
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
    Some(byte)
}

/// Build a CID font `W` array: `[gid [width] gid [width] ...]`
fn glyph_widths(widths: &BTreeMap<u16, i64>) -> Vec<Object> {
    widths
        .iter()
        .flat_map(|(gid, width)| {
            [
                Object::Integer(i64::from(*gid)),
                Object::Array(vec![Object::Integer(*width)]),
            ]
        })
        .collect()
}

/// Create a ToUnicode CMap for the glyphs used by the watermark text
fn to_unicode_cmap(unicode: &BTreeMap<u16, char>) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin
12 dict begin
begincmap
/CIDSystemInfo
<< /Registry (Adobe)
/Ordering (UCS)
/Supplement 0
>> def
/CMapName /Adobe-Identity-UCS def
/CMapType 2 def
1 begincodespacerange
<0000> <FFFF>
endcodespacerange
",
    );

    let entries: Vec<(&u16, &char)> = unicode.iter().collect();
    // bfchar sections are limited to 100 entries each
    for chunk in entries.chunks(100) {
        cmap.push_str(&format!("{} beginbfchar\n", chunk.len()));
        for (gid, ch) in chunk {
            let mut units = [0u16; 2];
            let utf16: String = ch
                .encode_utf16(&mut units)
                .iter()
                .map(|unit| format!("{:04X}", unit))
                .collect();
            cmap.push_str(&format!("<{:04X}> <{}>\n", gid, utf16));
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str(
        "endcmap
CMapName currentdict /CMap defineresource pop
end
end
",
    );
    cmap
}
