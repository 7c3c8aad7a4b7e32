//! Integration tests for PDF watermark library

use lopdf::content::Content;
use lopdf::{dictionary, Document, Object, ObjectId, Stream};
use pdf_watermark::color::parse_color;
use pdf_watermark::error::{Error, Result};
use pdf_watermark::layout::{Density, RANDOM_STAMP_COUNT};
use pdf_watermark::options::{RawOptions, WatermarkOptions};
use pdf_watermark::output::DirectorySink;
use pdf_watermark::pdf::{extract_metadata_from_bytes, FontSource};
use pdf_watermark::watermark::{
    apply_watermark, apply_watermark_with_rng, watermark_file, Diagnostic, DIAGNOSTIC_TEXT,
    PLACEHOLDER_TEXT,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tempfile::TempDir;

/// Font source that never has a font, forcing the standard-font fallback
struct NoFont;

impl FontSource for NoFont {
    fn load_font(&self) -> Result<Vec<u8>> {
        Err(Error::FontEmbed("font asset unavailable".to_string()))
    }
}

/// Font source backed by a system TrueType font, if one can be found
struct SystemFont(Vec<u8>);

impl SystemFont {
    fn find() -> Option<Self> {
        [
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/TTF/DejaVuSans.ttf",
            "/usr/share/fonts/dejavu/DejaVuSans.ttf",
            "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        ]
        .iter()
        .find_map(|path| std::fs::read(path).ok())
        .map(SystemFont)
    }
}

impl FontSource for SystemFont {
    fn load_font(&self) -> Result<Vec<u8>> {
        Ok(self.0.clone())
    }
}

/// Build an in-memory PDF with `pages` pages of the given size
fn sample_pdf(pages: usize, width: i64, height: i64) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            // Unwrapped scale transform, as some generators emit
            let content_id = doc.add_object(Stream::new(
                dictionary! {},
                b"0.5 0 0 0.5 0 0 cm\n0 0 100 100 re f".to_vec(),
            ));
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            })
            .into()
        })
        .collect();

    doc.objects.insert(pages_id, Object::Dictionary(dictionary! {
        "Type" => "Pages",
        "Count" => pages as i64,
        "Kids" => kids,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(width),
            Object::Integer(height),
        ],
    }));
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("Failed to serialize sample PDF");
    bytes
}

fn draft_options() -> WatermarkOptions {
    RawOptions {
        text: Some("DRAFT".to_string()),
        color: Some("#FF0000".to_string()),
        opacity: Some("0.5".to_string()),
        font_size: Some("40".to_string()),
        rotation: Some("30".to_string()),
        density: Some("1".to_string()),
    }
    .normalize()
}

/// Decoded content operations of every page, in page order
fn page_operations(bytes: &[u8]) -> Vec<Vec<lopdf::content::Operation>> {
    let doc = Document::load_mem(bytes).expect("Failed to reload output");
    let page_ids: Vec<ObjectId> = doc.get_pages().into_values().collect();
    page_ids
        .into_iter()
        .map(|id| {
            let content = doc.get_page_content(id).expect("Failed to read page content");
            Content::decode(&content).expect("Failed to decode page content").operations
        })
        .collect()
}

fn shown_text(op: &lopdf::content::Operation) -> Option<&[u8]> {
    match (op.operator.as_str(), op.operands.first()) {
        ("Tj", Some(Object::String(bytes, _))) => Some(bytes.as_slice()),
        _ => None,
    }
}

#[test]
fn test_fallback_font_end_to_end() {
    let input = sample_pdf(2, 600, 800);
    let output = apply_watermark(&input, &draft_options(), &NoFont).expect("Failed to watermark");

    // Same page count and geometry
    let metadata = extract_metadata_from_bytes(&output.bytes).unwrap();
    assert_eq!(metadata.page_count, 2);
    for size in &metadata.page_sizes {
        assert_eq!((size.width, size.height), (600.0, 800.0));
    }

    let report = &output.report;
    assert!(report.using_fallback_font);
    assert_eq!(report.rendered_text, "DRAFT");
    assert_eq!(report.color, parse_color("#FF0000"));
    assert!(matches!(report.diagnostics.as_slice(), [Diagnostic::FontFallback { .. }]));
    assert_eq!(report.pages.len(), 2);

    for (page, operations) in report.pages.iter().zip(page_operations(&output.bytes)) {
        assert_eq!(page.stamps, 5);
        assert!(page.diagnostic_stamp);

        let drafts = operations.iter().filter(|op| shown_text(op) == Some(b"DRAFT".as_slice())).count();
        let diagnostics = operations
            .iter()
            .filter(|op| shown_text(op) == Some(DIAGNOSTIC_TEXT.as_bytes()))
            .count();
        assert_eq!(drafts, 5);
        assert_eq!(diagnostics, 1);

        // Opacity state and red fill are applied to the watermark runs
        assert!(operations.iter().any(|op| op.operator == "gs"));
        assert!(operations.iter().any(|op| {
            op.operator == "rg"
                && op.operands.iter().map(|o| o.as_float().unwrap()).collect::<Vec<_>>() == [1.0, 0.0, 0.0]
        }));

        // Every watermark run is rotated 30°
        let rotated = operations
            .iter()
            .filter(|op| op.operator == "Tm")
            .filter(|op| {
                let sin = op.operands[1].as_float().unwrap();
                (sin - 0.5).abs() < 1e-4
            })
            .count();
        assert_eq!(rotated, 5);

        // Saves and restores balance, so the original cm cannot leak into the stamps
        let saves = operations.iter().filter(|op| op.operator == "q").count();
        let restores = operations.iter().filter(|op| op.operator == "Q").count();
        assert_eq!(saves, restores);
        assert_eq!(operations.first().map(|op| op.operator.as_str()), Some("q"));
    }
}

#[test]
fn test_opacity_is_stored_in_graphics_state() {
    let input = sample_pdf(1, 600, 800);
    let output = apply_watermark(&input, &draft_options(), &NoFont).unwrap();

    let doc = Document::load_mem(&output.bytes).unwrap();
    let found = doc.objects.values().any(|object| match object {
        Object::Dictionary(dict) => {
            dict.get(b"Type").and_then(Object::as_name).ok() == Some(b"ExtGState".as_slice())
                && dict.get(b"ca").and_then(Object::as_float).ok() == Some(0.5)
        }
        _ => false,
    });
    assert!(found, "ExtGState with ca 0.5 not found");
}

#[test]
fn test_fallback_font_substitutes_cjk_text() {
    let input = sample_pdf(1, 600, 800);
    let options = RawOptions { density: Some("1".to_string()), ..Default::default() }.normalize();
    assert_eq!(options.text, "水印文本");

    let output = apply_watermark(&input, &options, &NoFont).unwrap();
    assert_eq!(output.report.rendered_text, PLACEHOLDER_TEXT);
    assert!(output
        .report
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::TextSubstituted { .. })));

    let operations = &page_operations(&output.bytes)[0];
    let placeholders = operations
        .iter()
        .filter(|op| shown_text(op) == Some(PLACEHOLDER_TEXT.as_bytes()))
        .count();
    assert_eq!(placeholders, 5);
}

#[test]
fn test_invalid_color_is_reported_and_black() {
    let input = sample_pdf(1, 600, 800);
    let options = RawOptions {
        text: Some("DRAFT".to_string()),
        color: Some("#12".to_string()),
        ..Default::default()
    }
    .normalize();

    let output = apply_watermark(&input, &options, &NoFont).unwrap();
    assert!(output
        .report
        .diagnostics
        .contains(&Diagnostic::ColorFallback { input: "#12".to_string() }));
    assert_eq!(output.report.color, parse_color("0,0,0"));
}

#[test]
fn test_densest_layout_adds_random_stamps() {
    let input = sample_pdf(1, 600, 800);
    let mut options = draft_options();
    options.density = Density::MAX;

    let first = apply_watermark_with_rng(&input, &options, &NoFont, &mut StdRng::seed_from_u64(3)).unwrap();
    let second = apply_watermark_with_rng(&input, &options, &NoFont, &mut StdRng::seed_from_u64(4)).unwrap();

    let stamps = first.report.pages[0].stamps;
    assert_eq!(stamps, second.report.pages[0].stamps);
    assert!(stamps > RANDOM_STAMP_COUNT);

    // Draws match the report, and only the random placements differ between seeds
    let tm_operands = |bytes: &[u8]| -> Vec<Vec<f32>> {
        page_operations(bytes)[0]
            .iter()
            .filter(|op| op.operator == "Tm")
            .filter(|op| op.operands[1].as_float().unwrap() != 0.0)
            .map(|op| op.operands.iter().map(|o| o.as_float().unwrap()).collect())
            .collect()
    };
    let first_runs = tm_operands(&first.bytes);
    let second_runs = tm_operands(&second.bytes);
    assert_eq!(first_runs.len(), stamps);

    let fixed = stamps - RANDOM_STAMP_COUNT;
    assert_eq!(first_runs[..fixed], second_runs[..fixed]);
    assert_ne!(first_runs[fixed..], second_runs[fixed..]);
    for run in &first_runs[fixed..] {
        assert!((0.0..=600.0).contains(&run[4]), "x out of range: {}", run[4]);
        assert!((0.0..=800.0).contains(&run[5]), "y out of range: {}", run[5]);
    }
}

#[test]
fn test_invalid_document_is_load_error() {
    let result = apply_watermark(b"%PDF-1.5 truncated", &draft_options(), &NoFont);
    assert!(matches!(result, Err(Error::DocumentLoad(_))));
}

#[test]
fn test_watermark_file_writes_prefixed_output() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let input_path = temp_dir.path().join("report.pdf");
    std::fs::write(&input_path, sample_pdf(3, 612, 792)).unwrap();

    let out_dir = temp_dir.path().join("out");
    std::fs::create_dir(&out_dir).unwrap();

    let result = watermark_file(&input_path, &draft_options(), &NoFont, &DirectorySink::new(&out_dir))
        .expect("Failed to watermark file");

    assert_eq!(result.path, out_dir.join("watermarked_report.pdf"));
    assert!(result.path.exists());
    assert_eq!(result.report.pages.len(), 3);

    let metadata = extract_metadata_from_bytes(&std::fs::read(&result.path).unwrap()).unwrap();
    assert_eq!(metadata.page_count, 3);
}

#[test]
fn test_watermark_file_rejects_non_pdf() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let input_path = temp_dir.path().join("notes.txt");
    std::fs::write(&input_path, b"plain text").unwrap();

    let result = watermark_file(&input_path, &draft_options(), &NoFont, &DirectorySink::new(temp_dir.path()));
    assert!(matches!(result, Err(Error::InvalidFile(_))));
}

#[test]
fn test_failed_watermark_leaves_no_output() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let input_path = temp_dir.path().join("broken.pdf");
    std::fs::write(&input_path, b"this is not a pdf").unwrap();

    let result = watermark_file(&input_path, &draft_options(), &NoFont, &DirectorySink::new(temp_dir.path()));
    assert!(matches!(result, Err(Error::DocumentLoad(_))));

    let entries: Vec<_> = std::fs::read_dir(temp_dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("broken.pdf")]);
}

#[test]
fn test_preferred_font_end_to_end() {
    let Some(font) = SystemFont::find() else {
        eprintln!("Skipping preferred font test: no TrueType font found");
        return;
    };

    let input = sample_pdf(2, 600, 800);
    let output = apply_watermark(&input, &draft_options(), &font).expect("Failed to watermark");

    assert!(!output.report.using_fallback_font);
    assert!(output.report.diagnostics.is_empty());

    for (page, operations) in output.report.pages.iter().zip(page_operations(&output.bytes)) {
        assert_eq!(page.stamps, 5);
        assert!(!page.diagnostic_stamp);

        let shows = operations.iter().filter(|op| op.operator == "Tj").count();
        assert_eq!(shows, 5);
    }
}
