use crate::raster::Bitmap;
use crate::types::{Color, Mm, PageGeometry};
use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};
use std::path::Path;

const FOOTER_FONT_SIZE: f32 = 9.0;

/// Environment capability that assembles placed bitmaps into a multi-page
/// document. Assembly happens in memory; `save` is the only externally
/// observable write and is called at most once per generation.
pub trait DocumentSink {
    /// Discards any partially assembled document and starts over. Called at
    /// the top of every generation strategy so a failed primary attempt
    /// never leaks pages into the fallback's output.
    fn begin_document(&mut self);
    fn place_image(&mut self, bitmap: &Bitmap, x: Mm, y: Mm, width: Mm, height: Mm);
    /// Centered footer text at the footer baseline of the current page.
    fn footer(&mut self, text: &str);
    fn next_page(&mut self);
    fn save(&mut self, path: &Path) -> Result<(), String>;
}

struct PageDraft {
    operations: Vec<Operation>,
    xobjects: Vec<(String, ObjectId)>,
}

impl PageDraft {
    fn new() -> Self {
        Self {
            operations: Vec::new(),
            xobjects: Vec::new(),
        }
    }
}

/// Default sink writing an A4 PDF with raw-RGB image XObjects and Helvetica
/// page footers.
pub struct PdfWriter {
    geometry: PageGeometry,
    doc: Document,
    drafts: Vec<PageDraft>,
    current: PageDraft,
    image_count: usize,
}

impl PdfWriter {
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            doc: Document::with_version("1.5"),
            drafts: Vec::new(),
            current: PageDraft::new(),
            image_count: 0,
        }
    }

    fn page_height(&self) -> Mm {
        self.geometry.page.height
    }

    fn finish_assembly(&mut self) -> Result<Document, String> {
        let mut doc = std::mem::replace(&mut self.doc, Document::with_version("1.5"));
        let mut drafts = std::mem::take(&mut self.drafts);
        drafts.push(std::mem::replace(&mut self.current, PageDraft::new()));
        self.image_count = 0;

        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        let width_pt = self.geometry.page.width.to_pt();
        let height_pt = self.page_height().to_pt();
        let mut kids: Vec<Object> = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let content = Content {
                operations: draft.operations,
            };
            let encoded = content
                .encode()
                .map_err(|err| format!("encode page content: {err}"))?;
            let content_id = doc.add_object(Stream::new(dictionary! {}, encoded));

            let mut xobject_dict = lopdf::Dictionary::new();
            for (name, id) in draft.xobjects {
                xobject_dict.set(name.into_bytes(), Object::Reference(id));
            }
            let resources = dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
                "XObject" => Object::Dictionary(xobject_dict),
            };
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => Object::Reference(pages_id),
                "MediaBox" => vec![
                    Object::Real(0.0),
                    Object::Real(0.0),
                    Object::Real(width_pt),
                    Object::Real(height_pt),
                ],
                "Contents" => Object::Reference(content_id),
                "Resources" => resources,
            });
            kids.push(Object::Reference(page_id));
        }

        let kid_count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => kid_count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc.compress();
        Ok(doc)
    }

    /// In-memory serialization, exercised by tests and by shells that hand
    /// the bytes off instead of touching the filesystem.
    pub fn save_to_bytes(&mut self) -> Result<Vec<u8>, String> {
        let mut doc = self.finish_assembly()?;
        let mut out = Vec::new();
        doc.save_to(&mut out)
            .map_err(|err| format!("serialize pdf: {err}"))?;
        Ok(out)
    }
}

impl DocumentSink for PdfWriter {
    fn begin_document(&mut self) {
        self.doc = Document::with_version("1.5");
        self.drafts.clear();
        self.current = PageDraft::new();
        self.image_count = 0;
    }

    fn place_image(&mut self, bitmap: &Bitmap, x: Mm, y: Mm, width: Mm, height: Mm) {
        if bitmap.width == 0 || bitmap.height == 0 {
            return;
        }
        let stream = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => bitmap.width as i64,
                "Height" => bitmap.height as i64,
                "ColorSpace" => "DeviceRGB",
                "BitsPerComponent" => 8i64,
            },
            bitmap.pixels.clone(),
        );
        let image_id = self.doc.add_object(stream);
        self.image_count += 1;
        let name = format!("Im{}", self.image_count);
        self.current.xobjects.push((name.clone(), image_id));

        // PDF origin is bottom-left; placement coordinates are top-left.
        let x_pt = x.to_pt();
        let y_pt = (self.page_height() - y - height).to_pt();
        self.current.operations.push(Operation::new("q", vec![]));
        self.current.operations.push(Operation::new(
            "cm",
            vec![
                Object::Real(width.to_pt()),
                Object::Real(0.0),
                Object::Real(0.0),
                Object::Real(height.to_pt()),
                Object::Real(x_pt),
                Object::Real(y_pt),
            ],
        ));
        self.current
            .operations
            .push(Operation::new("Do", vec![Object::Name(name.into_bytes())]));
        self.current.operations.push(Operation::new("Q", vec![]));
    }

    fn footer(&mut self, text: &str) {
        let ink = Color::FOOTER_GRAY;
        let text_width_pt = helvetica_text_width(text, FOOTER_FONT_SIZE);
        let x_pt = (self.geometry.page.width.to_pt() - text_width_pt) / 2.0;
        let y_pt = self.geometry.footer_rise.to_pt();

        self.current.operations.push(Operation::new("BT", vec![]));
        self.current.operations.push(Operation::new(
            "Tf",
            vec![
                Object::Name(b"F1".to_vec()),
                Object::Real(FOOTER_FONT_SIZE),
            ],
        ));
        self.current.operations.push(Operation::new(
            "rg",
            vec![
                Object::Real(ink.r),
                Object::Real(ink.g),
                Object::Real(ink.b),
            ],
        ));
        self.current.operations.push(Operation::new(
            "Td",
            vec![Object::Real(x_pt), Object::Real(y_pt)],
        ));
        self.current.operations.push(Operation::new(
            "Tj",
            vec![Object::string_literal(text)],
        ));
        self.current.operations.push(Operation::new("ET", vec![]));
    }

    fn next_page(&mut self) {
        let draft = std::mem::replace(&mut self.current, PageDraft::new());
        self.drafts.push(draft);
    }

    // Serializes fully in memory before touching the path, so an assembly
    // or I/O failure never leaves a truncated file behind.
    fn save(&mut self, path: &Path) -> Result<(), String> {
        let bytes = self.save_to_bytes()?;
        std::fs::write(path, bytes).map_err(|err| format!("save pdf: {err}"))?;
        Ok(())
    }
}

/// Advance widths (per-mil) for the footer glyph repertoire. Footers only
/// carry digits, slashes and spaces.
fn helvetica_advance(ch: char) -> f32 {
    match ch {
        '0'..='9' => 556.0,
        '/' | ' ' => 278.0,
        _ => 556.0,
    }
}

fn helvetica_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(helvetica_advance).sum::<f32>() * font_size / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writer() -> PdfWriter {
        PdfWriter::new(PageGeometry::a4_portrait())
    }

    #[test]
    fn footer_width_is_symmetric_for_page_over_total() {
        let narrow = helvetica_text_width("1", FOOTER_FONT_SIZE);
        let wide = helvetica_text_width("1 / 2", FOOTER_FONT_SIZE);
        assert!(wide > narrow);
        assert!((helvetica_text_width("12", 10.0) - 11.12).abs() < 1e-3);
    }

    #[test]
    fn assembled_bytes_form_a_pdf_with_one_page_per_draft() {
        let mut writer = writer();
        writer.begin_document();
        let bitmap = Bitmap::solid(4, 4, Color::WHITE);
        writer.place_image(
            &bitmap,
            Mm::from_i32(15),
            Mm::from_i32(15),
            Mm::from_i32(180),
            Mm::from_i32(180),
        );
        writer.footer("1");
        writer.next_page();
        writer.footer("2");

        let bytes = writer.save_to_bytes().unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        let parsed = Document::load_mem(&bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), 2);
    }

    #[test]
    fn begin_document_discards_partial_assembly() {
        let mut writer = writer();
        writer.begin_document();
        let bitmap = Bitmap::solid(2, 2, Color::WHITE);
        writer.place_image(
            &bitmap,
            Mm::ZERO,
            Mm::ZERO,
            Mm::from_i32(10),
            Mm::from_i32(10),
        );
        writer.next_page();

        writer.begin_document();
        writer.footer("1");
        let bytes = writer.save_to_bytes().unwrap();
        let parsed = Document::load_mem(&bytes).unwrap();
        assert_eq!(parsed.get_pages().len(), 1);
    }

    #[test]
    fn save_is_all_or_nothing() {
        let mut writer = writer();
        writer.begin_document();
        writer.footer("1");

        let dir = std::env::temp_dir().join(format!("engross_no_such_dir_{}", std::process::id()));
        let path = dir.join("out.pdf");
        assert!(writer.save(&path).is_err());
        assert!(!path.exists());

        // The same assembled document still saves cleanly elsewhere.
        writer.begin_document();
        writer.footer("1");
        let good = std::env::temp_dir().join(format!("engross_atomic_{}.pdf", std::process::id()));
        writer.save(&good).unwrap();
        let bytes = std::fs::read(&good).unwrap();
        assert!(Document::load_mem(&bytes).is_ok());
        let _ = std::fs::remove_file(&good);
    }

    #[test]
    fn degenerate_bitmaps_are_not_embedded() {
        let mut writer = writer();
        writer.begin_document();
        let bitmap = Bitmap::solid(0, 0, Color::WHITE);
        writer.place_image(
            &bitmap,
            Mm::ZERO,
            Mm::ZERO,
            Mm::from_i32(10),
            Mm::from_i32(10),
        );
        assert_eq!(writer.image_count, 0);
    }
}
