use std::f64::consts::PI;
use std::fmt;

/// Coordinate as written in the document, before any transform.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DocPoint {
    pub x: f64,
    pub y: f64,
}

impl DocPoint {
    pub const ORIGIN: DocPoint = DocPoint { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// `2 * self - other`: `other` mirrored through `self`.
    pub fn reflect(self, other: DocPoint) -> DocPoint {
        DocPoint::new(2.0 * self.x - other.x, 2.0 * self.y - other.y)
    }
}

impl std::ops::Add for DocPoint {
    type Output = DocPoint;
    fn add(self, rhs: DocPoint) -> DocPoint {
        DocPoint::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for DocPoint {
    type Output = DocPoint;
    fn sub(self, rhs: DocPoint) -> DocPoint {
        DocPoint::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl std::ops::Mul<f64> for DocPoint {
    type Output = DocPoint;
    fn mul(self, rhs: f64) -> DocPoint {
        DocPoint::new(self.x * rhs, self.y * rhs)
    }
}

impl fmt::Display for DocPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Coordinate on the physical canvas. Only `AffineTransform::apply` creates
/// these, so every value handed to a sink went through the transform chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasPoint {
    x: f64,
    y: f64,
}

impl CanvasPoint {
    pub(crate) fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn x(self) -> f64 {
        self.x
    }

    pub fn y(self) -> f64 {
        self.y
    }
}

impl fmt::Display for CanvasPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Physical canvas extent, in the same units coordinates end up in after unit
/// conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn square(side: f64) -> Self {
        Self::new(side, side)
    }

    pub fn aspect_ratio(self) -> f64 {
        self.width / self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const PLOT_BACKGROUND: Color = Color {
        r: 130.0 / 255.0,
        g: 130.0 / 255.0,
        b: 130.0 / 255.0,
    };

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// `hue` in radians (wrapped into `[0, 2pi)`), `saturation` and `value`
    /// in `[0, 1]`.
    pub fn from_hsv(hue: f64, saturation: f64, value: f64) -> Self {
        let hue = hue.rem_euclid(2.0 * PI);
        let saturation = saturation.clamp(0.0, 1.0);
        let value = value.clamp(0.0, 1.0);

        let sector = hue * 3.0 / PI;
        let chroma = value * saturation;
        let rest = chroma * (1.0 - ((sector % 2.0) - 1.0).abs());
        let (r, g, b) = match sector as u32 {
            0 => (chroma, rest, 0.0),
            1 => (rest, chroma, 0.0),
            2 => (0.0, chroma, rest),
            3 => (0.0, rest, chroma),
            4 => (rest, 0.0, chroma),
            _ => (chroma, 0.0, rest),
        };
        let grey = value - chroma;
        Self {
            r: (r + grey) as f32,
            g: (g + grey) as f32,
            b: (b + grey) as f32,
        }
    }
}
