use crate::compose::{DomTree, NodeId};
use crate::debug::EventLog;
use crate::error::{EngrossError, categorize_raster_error};
use crate::pdf::DocumentSink;
use crate::raster::{RasterOptions, Rasterizer};
use crate::types::{Mm, PageGeometry};
use std::path::Path;

/// Section-aware PDF pagination engine. Walks the composed document's
/// pagination boundaries, rasterizes each unit through the injected
/// capability, and lays the images out across A4 pages.
///
/// `generate` takes `&mut self`, so a second invocation cannot start while
/// one is in flight; the triggering shell needs no extra interlock.
pub struct PdfGenerator<R: Rasterizer, S: DocumentSink> {
    rasterizer: R,
    sink: S,
    geometry: PageGeometry,
    log: Option<EventLog>,
}

impl<R: Rasterizer, S: DocumentSink> PdfGenerator<R, S> {
    pub fn new(rasterizer: R, sink: S) -> Self {
        Self {
            rasterizer,
            sink,
            geometry: PageGeometry::a4_portrait(),
            log: None,
        }
    }

    pub fn with_geometry(mut self, geometry: PageGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Renders the subtree identified by `element_id` into a paginated PDF
    /// at `filename`.
    ///
    /// Precondition failures (`ElementNotFound`, `EmptyContent`) return
    /// immediately without touching styles or the rasterizer. After that,
    /// the primary strategy runs under the full style sanitization pass;
    /// if it fails, the simplified whole-document strategy runs under the
    /// reduced pass. Styles are restored on every exit path. When both
    /// strategies fail, the surfaced error derives from the primary
    /// attempt; the secondary error is logged only.
    pub fn generate(
        &mut self,
        tree: &mut DomTree,
        element_id: &str,
        filename: &Path,
    ) -> Result<(), EngrossError> {
        use crate::sanitize::{PropertySet, restore, sanitize};

        let root = tree
            .find_element(element_id)
            .ok_or_else(|| EngrossError::ElementNotFound(element_id.to_string()))?;
        if tree.text_content(root).trim().is_empty() {
            return Err(EngrossError::EmptyContent);
        }

        let backups = sanitize(tree, PropertySet::Full);
        let primary = self.run_primary(tree, root, filename);
        restore(tree, backups);

        let primary_err = match primary {
            Ok(()) => {
                if let Some(log) = &self.log {
                    log.summary("generate");
                }
                return Ok(());
            }
            Err(err) => err,
        };
        if let Some(log) = &self.log {
            log.escalation(&primary_err);
        }

        let backups = sanitize(tree, PropertySet::Reduced);
        let secondary = self.run_windowed(tree, root, RasterOptions::secondary(), filename);
        restore(tree, backups);

        match secondary {
            Ok(()) => {
                if let Some(log) = &self.log {
                    log.summary("generate.fallback");
                }
                Ok(())
            }
            Err(secondary_err) => {
                if let Some(log) = &self.log {
                    log.swallowed(&secondary_err);
                    log.summary("generate.failed");
                }
                Err(categorize_raster_error(&primary_err))
            }
        }
    }

    fn run_primary(
        &mut self,
        tree: &DomTree,
        root: NodeId,
        filename: &Path,
    ) -> Result<(), String> {
        let units = tree.sections(root);
        if units.is_empty() {
            // Fallback pagination mode: no tagged boundaries, window the
            // whole document instead.
            return self.run_windowed(tree, root, RasterOptions::primary(), filename);
        }
        self.run_unit_atomic(tree, &units, filename)
    }

    /// Unit-atomic placement: a unit never splits across a page boundary.
    /// A unit that exactly fills the remaining height stays on the current
    /// page; an overtall unit starts a fresh page and is allowed to
    /// overflow past the bottom margin.
    fn run_unit_atomic(
        &mut self,
        tree: &DomTree,
        units: &[NodeId],
        filename: &Path,
    ) -> Result<(), String> {
        let geometry = self.geometry;
        let content_width = geometry.content_width();
        let options = RasterOptions::primary();

        self.sink.begin_document();
        let mut cursor = geometry.margins.top;
        let mut page = 1usize;
        let mut placed_any = false;

        for (index, &unit) in units.iter().enumerate() {
            let bitmap = self.rasterizer.rasterize(tree, unit, &options)?;
            let aspect = bitmap
                .aspect()
                .ok_or_else(|| format!("raster produced an empty bitmap for unit {index}"))?;
            let height = content_width * aspect;

            if placed_any && cursor + height > geometry.content_floor() {
                self.sink.footer(&page.to_string());
                self.sink.next_page();
                if let Some(log) = &self.log {
                    log.page_break(page, page + 1, index);
                }
                page += 1;
                cursor = geometry.margins.top;
            }

            self.sink
                .place_image(&bitmap, geometry.margins.left, cursor, content_width, height);
            cursor += height + geometry.unit_gap;
            placed_any = true;
        }

        self.sink.footer(&page.to_string());
        self.sink.save(filename)
    }

    /// Windowed pagination: one full-height raster sliced into page-height
    /// windows by offsetting the same image on each page. The footer reads
    /// "page / total" to distinguish this mode for the reader.
    fn run_windowed(
        &mut self,
        tree: &DomTree,
        root: NodeId,
        options: RasterOptions,
        filename: &Path,
    ) -> Result<(), String> {
        let geometry = self.geometry;
        let content_width = geometry.content_width();
        let content_height = geometry.content_height();

        self.sink.begin_document();
        let bitmap = self.rasterizer.rasterize(tree, root, &options)?;
        let aspect = bitmap
            .aspect()
            .ok_or("raster produced an empty bitmap for the document root")?;
        let height = content_width * aspect;
        let total = window_count(height, content_height);

        for page in 1..=total {
            if page > 1 {
                self.sink.next_page();
                if let Some(log) = &self.log {
                    log.page_break(page - 1, page, 0);
                }
            }
            let offset = content_height * ((page - 1) as i32);
            self.sink.place_image(
                &bitmap,
                geometry.margins.left,
                geometry.margins.top - offset,
                content_width,
                height,
            );
            self.sink.footer(&format!("{} / {}", page, total));
        }

        self.sink.save(filename)
    }
}

fn window_count(total_height: Mm, content_height: Mm) -> usize {
    let total = total_height.to_milli_i64();
    let per_page = content_height.to_milli_i64();
    if per_page <= 0 || total <= per_page {
        return 1;
    }
    (total + per_page - 1).div_euclid(per_page).max(1) as usize
}
