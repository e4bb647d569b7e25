use crate::compose::{DomTree, NodeId};
use crate::types::Color;
use image::{DynamicImage, GenericImageView};

/// Fixed-size RGB8 raster of one pagination unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Bitmap {
    pub fn solid(width: u32, height: u32, color: Color) -> Bitmap {
        let rgb = [
            (color.r.clamp(0.0, 1.0) * 255.0).round() as u8,
            (color.g.clamp(0.0, 1.0) * 255.0).round() as u8,
            (color.b.clamp(0.0, 1.0) * 255.0).round() as u8,
        ];
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for _ in 0..width * height {
            pixels.extend_from_slice(&rgb);
        }
        Bitmap {
            width,
            height,
            pixels,
        }
    }

    /// Ingests a decoded image from the environment's capture path.
    pub fn from_image(image: &DynamicImage) -> Bitmap {
        let (width, height) = image.dimensions();
        Bitmap {
            width,
            height,
            pixels: image.to_rgb8().into_raw(),
        }
    }

    pub fn aspect(&self) -> Option<f32> {
        if self.width == 0 || self.height == 0 {
            None
        } else {
            Some(self.height as f32 / self.width as f32)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterOptions {
    /// Device-pixel multiplier applied by the capture capability.
    pub scale: f32,
    pub background: Color,
}

impl RasterOptions {
    /// Primary, per-unit capture fidelity.
    pub fn primary() -> Self {
        Self {
            scale: 1.2,
            background: Color::WHITE,
        }
    }

    /// Reduced fidelity used by the simplified fallback strategy.
    pub fn secondary() -> Self {
        Self {
            scale: 1.0,
            background: Color::WHITE,
        }
    }
}

/// Environment-supplied capability converting a document subtree into a
/// bitmap. Failures are raw backend messages; the pagination engine maps
/// them into the error taxonomy only after the fallback chain is exhausted.
pub trait Rasterizer {
    fn rasterize(
        &mut self,
        tree: &DomTree,
        node: NodeId,
        options: &RasterOptions,
    ) -> Result<Bitmap, String>;
}
