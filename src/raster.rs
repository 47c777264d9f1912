// Raster preview of a pass: every draw becomes a stroked segment on a pixmap.

use std::f64::consts::PI;

use image::codecs::bmp::BmpEncoder;
use image::{ColorType, ImageEncoder};
use tiny_skia::{LineCap, Paint, PathBuilder, Pixmap, Stroke, Transform};

use crate::error::SvgPenError;
use crate::pen::PenSink;
use crate::types::{CanvasPoint, Color, Size};

/// Share of the hue wheel walked over one pass. Stopping short of a full turn
/// keeps the last stroke distinguishable from the first.
const HUE_SWEEP: f64 = 1.99 * PI;

#[derive(Debug, Clone, PartialEq)]
pub struct RasterOptions {
    /// Output pixels per canvas unit.
    pub scale: f32,
    /// Grid spacing in canvas units; `None` disables the grid.
    pub mesh_size: Option<f64>,
    pub stroke_width: f32,
    pub background: Color,
    pub mesh_color: Color,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 2.0,
            mesh_size: Some(10.0),
            stroke_width: 1.0,
            background: Color::PLOT_BACKGROUND,
            mesh_color: Color::rgb(0.6, 0.6, 0.6),
        }
    }
}

pub struct RasterSink {
    pixmap: Pixmap,
    transform: Transform,
    stroke: Stroke,
    pen: Option<CanvasPoint>,
    hue: f64,
    hue_step: f64,
}

impl RasterSink {
    /// `expected_draws` spreads the stroke colors over the hue wheel; pass
    /// the draw count of a counting pass over the same document.
    pub fn new(canvas: Size, options: &RasterOptions, expected_draws: usize) -> Result<Self, SvgPenError> {
        if !(options.scale.is_finite() && options.scale > 0.0) {
            return Err(SvgPenError::InvalidConfiguration(format!(
                "raster scale must be positive, got {}",
                options.scale
            )));
        }
        let width = pixel_extent(canvas.width, options.scale)?;
        let height = pixel_extent(canvas.height, options.scale)?;
        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| {
            SvgPenError::InvalidConfiguration(format!("invalid raster size {width}x{height}"))
        })?;
        pixmap.fill(to_sk_color(options.background));

        let transform = Transform::from_scale(options.scale, options.scale);
        let mut stroke = Stroke::default();
        stroke.width = options.stroke_width.max(0.0);
        stroke.line_cap = LineCap::Round;

        let mut sink = Self {
            pixmap,
            transform,
            stroke,
            pen: None,
            hue: 0.0,
            hue_step: HUE_SWEEP / expected_draws.max(1) as f64,
        };
        if let Some(step) = options.mesh_size.filter(|s| *s > 0.0) {
            sink.draw_mesh(canvas, step, options.mesh_color);
        }
        Ok(sink)
    }

    fn draw_mesh(&mut self, canvas: Size, step: f64, color: Color) {
        let paint = solid_paint(color);
        let mut stroke = Stroke::default();
        stroke.width = 0.5 / self.transform.sx;

        let mut builder = PathBuilder::new();
        let mut x = 0.0;
        while x <= canvas.width {
            builder.move_to(x as f32, 0.0);
            builder.line_to(x as f32, canvas.height as f32);
            x += step;
        }
        let mut y = 0.0;
        while y <= canvas.height {
            builder.move_to(0.0, y as f32);
            builder.line_to(canvas.width as f32, y as f32);
            y += step;
        }
        if let Some(path) = builder.finish() {
            self.pixmap.stroke_path(&path, &paint, &stroke, self.transform, None);
        }
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, SvgPenError> {
        self.pixmap
            .encode_png()
            .map_err(|e| SvgPenError::Raster(format!("png encode failed: {e}")))
    }

    pub fn encode_bmp(&self) -> Result<Vec<u8>, SvgPenError> {
        let rgba: Vec<u8> = self
            .pixmap
            .pixels()
            .iter()
            .flat_map(|p| {
                let c = p.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();
        let mut bmp = Vec::new();
        BmpEncoder::new(&mut bmp)
            .write_image(&rgba, self.pixmap.width(), self.pixmap.height(), ColorType::Rgba8.into())
            .map_err(|e| SvgPenError::Raster(format!("bmp encode failed: {e}")))?;
        Ok(bmp)
    }
}

impl PenSink for RasterSink {
    fn move_to(&mut self, point: CanvasPoint) {
        self.pen = Some(point);
    }

    fn draw_to(&mut self, point: CanvasPoint) {
        let Some(from) = self.pen.replace(point) else {
            return;
        };
        let paint = solid_paint(Color::from_hsv(self.hue, 1.0, 1.0));
        self.hue += self.hue_step;

        let mut builder = PathBuilder::new();
        builder.move_to(from.x() as f32, from.y() as f32);
        builder.line_to(point.x() as f32, point.y() as f32);
        if let Some(path) = builder.finish() {
            self.pixmap.stroke_path(&path, &paint, &self.stroke, self.transform, None);
        }
    }
}

fn pixel_extent(units: f64, scale: f32) -> Result<u32, SvgPenError> {
    let px = (units * scale as f64).ceil();
    if !(px >= 1.0 && px <= u32::MAX as f64) {
        return Err(SvgPenError::InvalidConfiguration(format!(
            "pixel dimension out of range: {px} for {units} units at scale {scale}"
        )));
    }
    Ok(px as u32)
}

fn solid_paint(color: Color) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(to_sk_color(color));
    paint.anti_alias = true;
    paint
}

fn to_sk_color(color: Color) -> tiny_skia::Color {
    tiny_skia::Color::from_rgba(color.r.clamp(0.0, 1.0), color.g.clamp(0.0, 1.0), color.b.clamp(0.0, 1.0), 1.0)
        .unwrap_or_else(|| tiny_skia::Color::from_rgba8(0, 0, 0, 255))
}
