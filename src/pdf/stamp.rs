//! Drawing watermark stamps onto PDF pages using lopdf
//!
//! Each page gets one appended content stream holding every stamp. The page's
//! original content is wrapped in `q`/`Q` first, so a transformation matrix
//! left active by the original content cannot move or distort the stamps.

use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::color::RgbColor;
use crate::error::{Error, Result};
use crate::layout::{PageGeometry, StampPosition};

/// Resource name of the watermark font on every page
pub const FONT_RESOURCE: &str = "WmFont";
/// Resource name of the watermark opacity graphics state on every page
pub const GSTATE_RESOURCE: &str = "WmAlpha";
/// Resource name of the fallback-font diagnostic font
pub const DIAGNOSTIC_FONT_RESOURCE: &str = "WmDiag";

/// How every stamp on a page is drawn
#[derive(Debug, Clone, Copy)]
pub struct StampStyle {
    pub color: RgbColor,
    /// Counter-clockwise rotation about the stamp origin, in degrees
    pub rotation: i32,
}

/// A single fully opaque text run drawn once per page
#[derive(Debug, Clone)]
pub struct DiagnosticStamp<'a> {
    pub text: &'a [u8],
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub color: RgbColor,
}

/// Read a page's size from its (possibly inherited) MediaBox
///
/// Pages without any MediaBox are treated as US Letter.
pub fn page_geometry(doc: &Document, page_id: ObjectId) -> Result<PageGeometry> {
    let Some(media_box) = inherited_entry(doc, page_id, b"MediaBox")? else {
        tracing::warn!(?page_id, "page has no MediaBox, assuming US Letter");
        return Ok(PageGeometry::letter());
    };

    let bounds: Vec<f64> = media_box
        .as_array()?
        .iter()
        .map(|o| resolve(doc, o).and_then(|o| Ok(o.as_float()? as f64)))
        .collect::<std::result::Result<_, _>>()?;

    match bounds.as_slice() {
        [llx, lly, urx, ury] => Ok(PageGeometry::new((urx - llx).abs(), (ury - lly).abs())),
        _ => Err(Error::MalformedPage(format!(
            "MediaBox has {} entries, expected 4",
            bounds.len()
        ))),
    }
}

/// Create the shared graphics state that applies the watermark opacity
pub fn add_opacity_state(doc: &mut Document, opacity: f32) -> ObjectId {
    let mut state = Dictionary::new();
    state.set("Type", Object::Name(b"ExtGState".to_vec()));
    state.set("ca", Object::Real(opacity));
    state.set("CA", Object::Real(opacity));
    doc.add_object(Object::Dictionary(state))
}

/// Generate the content stream operators for a page's stamps
pub fn generate_stamp_content(
    text: &[u8],
    positions: &[StampPosition],
    style: &StampStyle,
    diagnostic: Option<&DiagnosticStamp<'_>>,
) -> String {
    let mut content = String::new();

    // The original content was wrapped in q ... Q, close it before drawing
    content.push_str("\nQ\n");

    let radians = (style.rotation as f64).to_radians();
    let (sin, cos) = radians.sin_cos();
    let hex_text = hex_string(text);

    content.push_str("q\n");
    content.push_str(&format!("/{} gs\n", GSTATE_RESOURCE));
    content.push_str(&format!(
        "{:.4} {:.4} {:.4} rg\n",
        style.color.r(),
        style.color.g(),
        style.color.b()
    ));
    for position in positions {
        content.push_str("BT\n");
        content.push_str(&format!("/{} {:.2} Tf\n", FONT_RESOURCE, position.size));
        content.push_str(&format!(
            "{:.6} {:.6} {:.6} {:.6} {:.2} {:.2} Tm\n",
            cos, sin, -sin, cos, position.x, position.y
        ));
        content.push_str(&format!("{} Tj\n", hex_text));
        content.push_str("ET\n");
    }
    content.push_str("Q\n");

    if let Some(stamp) = diagnostic {
        content.push_str("q\n");
        content.push_str(&format!(
            "{:.4} {:.4} {:.4} rg\n",
            stamp.color.r(),
            stamp.color.g(),
            stamp.color.b()
        ));
        content.push_str("BT\n");
        content.push_str(&format!("/{} {:.2} Tf\n", DIAGNOSTIC_FONT_RESOURCE, stamp.size));
        content.push_str(&format!("1 0 0 1 {:.2} {:.2} Tm\n", stamp.x, stamp.y));
        content.push_str(&format!("{} Tj\n", hex_string(stamp.text)));
        content.push_str("ET\n");
        content.push_str("Q\n");
    }

    content
}

/// Stamp a page: register resources, isolate the original content, append ours
pub fn stamp_page(
    doc: &mut Document,
    page_id: ObjectId,
    content: String,
    font_id: ObjectId,
    gstate_id: ObjectId,
    diagnostic_font_id: Option<ObjectId>,
) -> Result<()> {
    add_stamp_resources(doc, page_id, font_id, gstate_id, diagnostic_font_id)?;

    let open_id = doc.add_object(Stream::new(Dictionary::new(), b"q\n".to_vec()));
    prepend_content_to_page(doc, page_id, open_id)?;

    let stamp_id = doc.add_object(Stream::new(Dictionary::new(), content.into_bytes()));
    append_content_to_page(doc, page_id, stamp_id)?;

    Ok(())
}

/// Format bytes as a PDF hexadecimal string
fn hex_string(bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2 + 2);
    hex.push('<');
    for byte in bytes {
        hex.push_str(&format!("{:02X}", byte));
    }
    hex.push('>');
    hex
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> lopdf::Result<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id),
        other => Ok(other),
    }
}

/// Look up a page attribute, following the Parent chain for inheritable keys
fn inherited_entry(doc: &Document, page_id: ObjectId, key: &[u8]) -> Result<Option<Object>> {
    let mut node_id = page_id;
    // Bounded walk guards against cyclic Parent references
    for _ in 0..64 {
        let node = doc.get_dictionary(node_id)?;
        if let Ok(value) = node.get(key) {
            return Ok(Some(resolve(doc, value)?.clone()));
        }
        match node.get(b"Parent").and_then(Object::as_reference) {
            Ok(parent_id) => node_id = parent_id,
            Err(_) => return Ok(None),
        }
    }
    Ok(None)
}

/// Resolve a resource category (Font, ExtGState) into an owned dictionary
fn category_dict(doc: &Document, resources: &Dictionary, key: &[u8]) -> Dictionary {
    match resources.get(key) {
        Ok(Object::Dictionary(dict)) => dict.clone(),
        Ok(Object::Reference(id)) => match doc.get_object(*id) {
            Ok(Object::Dictionary(dict)) => dict.clone(),
            _ => Dictionary::new(),
        },
        _ => Dictionary::new(),
    }
}

/// Add the watermark font and graphics state to a page's Resources
///
/// The page ends up with its own Resources dictionary (inherited or referenced
/// resources are copied in) so other pages sharing them are not affected.
fn add_stamp_resources(
    doc: &mut Document,
    page_id: ObjectId,
    font_id: ObjectId,
    gstate_id: ObjectId,
    diagnostic_font_id: Option<ObjectId>,
) -> Result<()> {
    let mut resources = match inherited_entry(doc, page_id, b"Resources")? {
        Some(Object::Dictionary(dict)) => dict,
        _ => Dictionary::new(),
    };

    let mut fonts = category_dict(doc, &resources, b"Font");
    fonts.set(FONT_RESOURCE, Object::Reference(font_id));
    if let Some(diagnostic_id) = diagnostic_font_id {
        fonts.set(DIAGNOSTIC_FONT_RESOURCE, Object::Reference(diagnostic_id));
    }

    let mut states = category_dict(doc, &resources, b"ExtGState");
    states.set(GSTATE_RESOURCE, Object::Reference(gstate_id));

    resources.set("Font", Object::Dictionary(fonts));
    resources.set("ExtGState", Object::Dictionary(states));

    let page = doc.get_object_mut(page_id)?.as_dict_mut()?;
    page.set("Resources", Object::Dictionary(resources));

    Ok(())
}

/// Prepend a content stream to a page's Contents
fn prepend_content_to_page(doc: &mut Document, page_id: ObjectId, new_content_id: ObjectId) -> Result<()> {
    let page_dict = doc.get_object_mut(page_id)?.as_dict_mut()?;
    let existing_content = page_dict.get(b"Contents").ok().cloned();

    match existing_content {
        Some(Object::Reference(content_id)) => {
            page_dict.set("Contents", Object::Array(vec![
                Object::Reference(new_content_id),
                Object::Reference(content_id),
            ]));
        }
        Some(Object::Array(mut content_array)) => {
            content_array.insert(0, Object::Reference(new_content_id));
            page_dict.set("Contents", Object::Array(content_array));
        }
        _ => {
            page_dict.set("Contents", Object::Array(vec![Object::Reference(new_content_id)]));
        }
    }

    Ok(())
}

/// Append a content stream to a page's Contents
///
/// Appended content is drawn last, on top of any background fills.
fn append_content_to_page(doc: &mut Document, page_id: ObjectId, new_content_id: ObjectId) -> Result<()> {
    let page_dict = doc.get_object_mut(page_id)?.as_dict_mut()?;
    let existing_content = page_dict.get(b"Contents").ok().cloned();

    match existing_content {
        Some(Object::Reference(content_id)) => {
            page_dict.set("Contents", Object::Array(vec![
                Object::Reference(content_id),
                Object::Reference(new_content_id),
            ]));
        }
        Some(Object::Array(mut content_array)) => {
            content_array.push(Object::Reference(new_content_id));
            page_dict.set("Contents", Object::Array(content_array));
        }
        _ => {
            page_dict.set("Contents", Object::Array(vec![Object::Reference(new_content_id)]));
        }
    }

    Ok(())
}
