use crate::error::SvgPenError;
use crate::scan::get_attribute;
use crate::transform::AffineTransform;
use crate::types::{CanvasPoint, DocPoint, Size};
use crate::units::{parse_number_list, parse_scalar};

/// Points this close to an edge still count as inside.
const EDGE_TOLERANCE: f64 = 1e-9;

/// Declared coordinate window of a document, in document units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub min_x: f64,
    pub min_y: f64,
    pub width: f64,
    pub height: f64,
}

impl Window {
    pub fn new(min_x: f64, min_y: f64, width: f64, height: f64) -> Self {
        Self {
            min_x,
            min_y,
            width,
            height,
        }
    }

    /// Reads the window of an `<svg>` element: `viewBox` when present,
    /// otherwise `width`/`height` anchored at the origin. Missing sizes fall
    /// back to the canvas size.
    pub fn from_svg_attributes(attributes: &str, canvas: Size) -> Result<Self, SvgPenError> {
        if let Some(raw) = get_attribute(attributes, "viewBox") {
            let values = parse_number_list(raw).map_err(|e| e.locate("svg", "viewBox"))?;
            let &[min_x, min_y, width, height] = values.as_slice() else {
                return Err(SvgPenError::attribute(
                    "svg",
                    "viewBox",
                    format!("expected 4 numbers, found {}", values.len()),
                ));
            };
            return Self::checked(min_x, min_y, width, height, "viewBox");
        }

        let width = parse_scalar(get_attribute(attributes, "width").unwrap_or(""), canvas.width);
        let height = parse_scalar(get_attribute(attributes, "height").unwrap_or(""), canvas.height);
        Self::checked(0.0, 0.0, width, height, "width")
    }

    fn checked(min_x: f64, min_y: f64, width: f64, height: f64, attribute: &str) -> Result<Self, SvgPenError> {
        if !(width > 0.0 && height > 0.0 && width.is_finite() && height.is_finite()) {
            return Err(SvgPenError::attribute(
                "svg",
                attribute,
                format!("window must have a positive size, got {width} x {height}"),
            ));
        }
        Ok(Self::new(min_x, min_y, width, height))
    }

    fn aspect_ratio(&self) -> f64 {
        self.width / self.height
    }
}

/// Visible part of the canvas. Only the outermost document's window
/// constrains visibility.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewBox {
    pub min: CanvasPoint,
    pub max: CanvasPoint,
}

impl ViewBox {
    /// Inclusive: points on the boundary are inside.
    pub fn contains(&self, p: CanvasPoint) -> bool {
        p.x() >= self.min.x() - EDGE_TOLERANCE
            && p.x() <= self.max.x() + EDGE_TOLERANCE
            && p.y() >= self.min.y() - EDGE_TOLERANCE
            && p.y() <= self.max.y() + EDGE_TOLERANCE
    }

    pub fn width(&self) -> f64 {
        self.max.x() - self.min.x()
    }

    pub fn height(&self) -> f64 {
        self.max.y() - self.min.y()
    }
}

/// Fits `window` into the canvas keeping its aspect ratio ("meet"), centred
/// along the axis that has room to spare.
pub fn fit_view_box(window: Window, canvas: Size) -> (AffineTransform, ViewBox) {
    let (factor, offset) = if window.aspect_ratio() < canvas.aspect_ratio() {
        // Window is relatively taller: full height, bands left and right.
        let factor = canvas.height / window.height;
        (factor, DocPoint::new((canvas.width - window.width * factor) / 2.0, 0.0))
    } else {
        let factor = canvas.width / window.width;
        (factor, DocPoint::new(0.0, (canvas.height - window.height * factor) / 2.0))
    };

    let transform = AffineTransform::translate(offset.x, offset.y)
        .then(AffineTransform::scale(factor, factor))
        .then(AffineTransform::translate(-window.min_x, -window.min_y));
    let view_box = ViewBox {
        min: transform.apply(DocPoint::new(window.min_x, window.min_y)),
        max: transform.apply(DocPoint::new(window.min_x + window.width, window.min_y + window.height)),
    };
    (transform, view_box)
}
