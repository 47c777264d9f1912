// Shape flattening: every supported shape is reduced to move/draw calls on a
// `PenSink`, with curves sampled at a fixed number of steps.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use crate::error::SvgPenError;
use crate::path::{EllipticalArc, PenState, Segment};
use crate::pen::PenSink;
use crate::scan::{ShapeKind, get_attribute};
use crate::transform::AffineTransform;
use crate::types::DocPoint;
use crate::units::{parse_number_list, parse_scalar};

pub fn linear_point(p0: DocPoint, p1: DocPoint, t: f64) -> DocPoint {
    p0 + (p1 - p0) * t
}

pub fn quadratic_point(p0: DocPoint, p1: DocPoint, p2: DocPoint, t: f64) -> DocPoint {
    let mt = 1.0 - t;
    p0 * (mt * mt) + p1 * (2.0 * mt * t) + p2 * (t * t)
}

pub fn cubic_point(p0: DocPoint, p1: DocPoint, p2: DocPoint, p3: DocPoint, t: f64) -> DocPoint {
    let mt = 1.0 - t;
    p0 * (mt * mt * mt) + p1 * (3.0 * mt * mt * t) + p2 * (3.0 * mt * t * t) + p3 * (t * t * t)
}

/// Center parameterization of an elliptical arc (SVG 1.1 implementation
/// notes, F.6.5 and F.6.6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcGeometry {
    pub center: DocPoint,
    /// Radii after out-of-range correction.
    pub rx: f64,
    pub ry: f64,
    pub rotation: f64,
    pub start_angle: f64,
    /// Signed; positive runs in the sweep-flag direction.
    pub delta_angle: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArcShape {
    /// Start and end coincide: nothing is drawn.
    Omitted,
    /// A zero radius: the arc is a straight segment to its end point.
    Straight,
    Elliptical(ArcGeometry),
}

impl ArcGeometry {
    pub fn from_endpoints(from: DocPoint, arc: &EllipticalArc) -> ArcShape {
        let to = arc.to;
        if from == to {
            return ArcShape::Omitted;
        }
        let mut rx = arc.rx.abs();
        let mut ry = arc.ry.abs();
        if rx == 0.0 || ry == 0.0 {
            return ArcShape::Straight;
        }

        let (sin_phi, cos_phi) = (libm::sin(arc.rotation), libm::cos(arc.rotation));
        let half = (from - to) * 0.5;
        let x1p = cos_phi * half.x + sin_phi * half.y;
        let y1p = -sin_phi * half.x + cos_phi * half.y;

        let lambda = (x1p * x1p) / (rx * rx) + (y1p * y1p) / (ry * ry);
        if lambda > 1.0 {
            let grow = libm::sqrt(lambda);
            rx *= grow;
            ry *= grow;
        }

        let rx2 = rx * rx;
        let ry2 = ry * ry;
        let numerator = rx2 * ry2 - rx2 * y1p * y1p - ry2 * x1p * x1p;
        let denominator = rx2 * y1p * y1p + ry2 * x1p * x1p;
        let mut coefficient = libm::sqrt((numerator / denominator).max(0.0));
        if arc.large_arc == arc.sweep {
            coefficient = -coefficient;
        }
        let cxp = coefficient * rx * y1p / ry;
        let cyp = -coefficient * ry * x1p / rx;

        let mid = (from + to) * 0.5;
        let center = DocPoint::new(
            cos_phi * cxp - sin_phi * cyp + mid.x,
            sin_phi * cxp + cos_phi * cyp + mid.y,
        );

        let (ux, uy) = ((x1p - cxp) / rx, (y1p - cyp) / ry);
        let (vx, vy) = ((-x1p - cxp) / rx, (-y1p - cyp) / ry);
        let start_angle = libm::atan2(uy, ux);
        let mut delta_angle = libm::atan2(ux * vy - uy * vx, ux * vx + uy * vy);
        if !arc.sweep && delta_angle > 0.0 {
            delta_angle -= TAU;
        } else if arc.sweep && delta_angle < 0.0 {
            delta_angle += TAU;
        }

        ArcShape::Elliptical(ArcGeometry {
            center,
            rx,
            ry,
            rotation: arc.rotation,
            start_angle,
            delta_angle,
        })
    }

    /// Point at `angle` on the ellipse before the x-axis rotation is applied;
    /// `frame()` carries the rotation.
    fn unrotated_point(&self, angle: f64) -> DocPoint {
        DocPoint::new(
            self.center.x + self.rx * libm::cos(angle),
            self.center.y + self.ry * libm::sin(angle),
        )
    }

    fn frame(&self) -> AffineTransform {
        AffineTransform::rotate_around(self.rotation, self.center)
    }
}

/// Samples an elliptical arc from `from` at `resolution` equal angular steps,
/// mapping each sample through `rotate(phi, center)` then `transform`.
pub fn process_arc<S: PenSink + ?Sized>(
    from: DocPoint,
    arc: &EllipticalArc,
    transform: AffineTransform,
    resolution: usize,
    sink: &mut S,
) {
    match ArcGeometry::from_endpoints(from, arc) {
        ArcShape::Omitted => {}
        ArcShape::Straight => sink.draw_to(transform.apply(arc.to)),
        ArcShape::Elliptical(geometry) => {
            let frame = transform.then(geometry.frame());
            for i in 1..=resolution {
                let t = i as f64 / resolution as f64;
                let angle = geometry.start_angle + geometry.delta_angle * t;
                sink.draw_to(frame.apply(geometry.unrotated_point(angle)));
            }
        }
    }
}

/// Emits points in document space through one transform, remembering the
/// last point for straight-line subdivision.
struct Emitter<'s, S: PenSink + ?Sized> {
    transform: AffineTransform,
    resolution: usize,
    subdivide_lines: bool,
    last: DocPoint,
    sink: &'s mut S,
}

impl<S: PenSink + ?Sized> Emitter<'_, S> {
    fn move_to(&mut self, p: DocPoint) {
        self.sink.move_to(self.transform.apply(p));
        self.last = p;
    }

    fn line_to(&mut self, p: DocPoint) {
        if self.subdivide_lines {
            let from = self.last;
            self.sample(|t| linear_point(from, p, t));
        } else {
            self.sink.draw_to(self.transform.apply(p));
        }
        self.last = p;
    }

    fn quadratic_to(&mut self, control: DocPoint, to: DocPoint) {
        let from = self.last;
        self.sample(|t| quadratic_point(from, control, to, t));
        self.last = to;
    }

    fn cubic_to(&mut self, control1: DocPoint, control2: DocPoint, to: DocPoint) {
        let from = self.last;
        self.sample(|t| cubic_point(from, control1, control2, to, t));
        self.last = to;
    }

    fn arc_to(&mut self, arc: &EllipticalArc) {
        let from = self.last;
        if matches!(ArcGeometry::from_endpoints(from, arc), ArcShape::Straight) {
            self.line_to(arc.to);
            return;
        }
        process_arc(from, arc, self.transform, self.resolution, &mut *self.sink);
        self.last = arc.to;
    }

    /// Draws to `curve(t)` for `t` in `(0, 1]`.
    fn sample(&mut self, curve: impl Fn(f64) -> DocPoint) {
        for i in 1..=self.resolution {
            let t = i as f64 / self.resolution as f64;
            self.sink.draw_to(self.transform.apply(curve(t)));
        }
    }

    /// Draws along an axis-aligned ellipse from `start` to `end` (radians,
    /// either direction) in `steps` pieces, excluding the start point.
    fn elliptical_run(&mut self, center: DocPoint, rx: f64, ry: f64, start: f64, end: f64, steps: usize) {
        for i in 1..=steps {
            let angle = start + (end - start) * (i as f64 / steps as f64);
            let p = DocPoint::new(center.x + rx * libm::cos(angle), center.y + ry * libm::sin(angle));
            self.sink.draw_to(self.transform.apply(p));
            self.last = p;
        }
    }
}

/// Shape flattening settings shared by one interpretation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flattener {
    pub resolution: usize,
    pub subdivide_lines: bool,
}

impl Default for Flattener {
    fn default() -> Self {
        Self {
            resolution: 100,
            subdivide_lines: false,
        }
    }
}

impl Flattener {
    pub fn new(resolution: usize, subdivide_lines: bool) -> Self {
        Self {
            resolution: resolution.max(1),
            subdivide_lines,
        }
    }

    /// Flattens one shape element. `transform` already includes the shape's
    /// own `transform` attribute.
    pub fn flatten_shape<S: PenSink + ?Sized>(
        &self,
        kind: ShapeKind,
        attributes: &str,
        transform: AffineTransform,
        sink: &mut S,
    ) -> Result<(), SvgPenError> {
        let mut out = Emitter {
            transform,
            resolution: self.resolution,
            subdivide_lines: self.subdivide_lines,
            last: DocPoint::ORIGIN,
            sink,
        };
        match kind {
            ShapeKind::Line => {
                out.move_to(DocPoint::new(length(attributes, "x1"), length(attributes, "y1")));
                out.line_to(DocPoint::new(length(attributes, "x2"), length(attributes, "y2")));
                Ok(())
            }
            ShapeKind::Polyline => poly(kind, attributes, false, &mut out),
            ShapeKind::Polygon => poly(kind, attributes, true, &mut out),
            ShapeKind::Rect => rect(attributes, &mut out),
            ShapeKind::Circle => {
                let r = non_negative(kind, attributes, "r")?;
                ellipse(attributes, r, r, &mut out);
                Ok(())
            }
            ShapeKind::Ellipse => {
                let rx = non_negative(kind, attributes, "rx")?;
                let ry = non_negative(kind, attributes, "ry")?;
                ellipse(attributes, rx, ry, &mut out);
                Ok(())
            }
            ShapeKind::Path => {
                let Some(d) = get_attribute(attributes, "d") else {
                    return Ok(());
                };
                let segments = PenState::new().run(d)?;
                for segment in &segments {
                    path_segment(segment, &mut out);
                }
                Ok(())
            }
        }
    }
}

fn length(attributes: &str, name: &str) -> f64 {
    parse_scalar(get_attribute(attributes, name).unwrap_or(""), 0.0)
}

fn non_negative(kind: ShapeKind, attributes: &str, name: &str) -> Result<f64, SvgPenError> {
    let value = length(attributes, name);
    if value < 0.0 {
        return Err(SvgPenError::attribute(kind.name(), name, format!("must not be negative, got {value}")));
    }
    Ok(value)
}

fn poly<S: PenSink + ?Sized>(
    kind: ShapeKind,
    attributes: &str,
    close: bool,
    out: &mut Emitter<'_, S>,
) -> Result<(), SvgPenError> {
    let raw = get_attribute(attributes, "points").unwrap_or("");
    let values = parse_number_list(raw).map_err(|e| e.locate(kind.name(), "points"))?;
    if values.len() % 2 != 0 {
        return Err(SvgPenError::attribute(
            kind.name(),
            "points",
            format!("odd coordinate count {}", values.len()),
        ));
    }
    let points: Vec<DocPoint> = values.chunks_exact(2).map(|c| DocPoint::new(c[0], c[1])).collect();
    let Some((&first, rest)) = points.split_first() else {
        return Ok(());
    };
    out.move_to(first);
    for &p in rest {
        out.line_to(p);
    }
    if close {
        out.line_to(first);
    }
    Ok(())
}

fn rect<S: PenSink + ?Sized>(attributes: &str, out: &mut Emitter<'_, S>) -> Result<(), SvgPenError> {
    let x = length(attributes, "x");
    let y = length(attributes, "y");
    let w = non_negative(ShapeKind::Rect, attributes, "width")?;
    let h = non_negative(ShapeKind::Rect, attributes, "height")?;
    if w == 0.0 || h == 0.0 {
        return Ok(());
    }

    // A single given radius applies to both axes.
    let rx_attr = get_attribute(attributes, "rx");
    let ry_attr = get_attribute(attributes, "ry");
    let (rx, ry) = match (rx_attr, ry_attr) {
        (None, None) => (0.0, 0.0),
        (Some(_), None) => {
            let r = non_negative(ShapeKind::Rect, attributes, "rx")?;
            (r, r)
        }
        (None, Some(_)) => {
            let r = non_negative(ShapeKind::Rect, attributes, "ry")?;
            (r, r)
        }
        (Some(_), Some(_)) => (
            non_negative(ShapeKind::Rect, attributes, "rx")?,
            non_negative(ShapeKind::Rect, attributes, "ry")?,
        ),
    };
    let limit = w.min(h) / 2.0;
    let rx = rx.min(limit);
    let ry = ry.min(limit);

    if rx == 0.0 || ry == 0.0 {
        out.move_to(DocPoint::new(x + w, y));
        out.line_to(DocPoint::new(x, y));
        out.line_to(DocPoint::new(x, y + h));
        out.line_to(DocPoint::new(x + w, y + h));
        out.line_to(DocPoint::new(x + w, y));
        return Ok(());
    }

    let steps = (out.resolution / 4).max(1);
    let top_left = DocPoint::new(x + rx, y + ry);
    let bottom_left = DocPoint::new(x + rx, y + h - ry);
    let bottom_right = DocPoint::new(x + w - rx, y + h - ry);
    let top_right = DocPoint::new(x + w - rx, y + ry);

    out.move_to(DocPoint::new(x + w - rx, y));
    out.line_to(DocPoint::new(x + rx, y));
    out.elliptical_run(top_left, rx, ry, 3.0 * FRAC_PI_2, PI, steps);
    out.line_to(DocPoint::new(x, y + h - ry));
    out.elliptical_run(bottom_left, rx, ry, PI, FRAC_PI_2, steps);
    out.line_to(DocPoint::new(x + w - rx, y + h));
    out.elliptical_run(bottom_right, rx, ry, FRAC_PI_2, 0.0, steps);
    out.line_to(DocPoint::new(x + w, y + ry));
    out.elliptical_run(top_right, rx, ry, 0.0, -FRAC_PI_2, steps);
    Ok(())
}

fn ellipse<S: PenSink + ?Sized>(attributes: &str, rx: f64, ry: f64, out: &mut Emitter<'_, S>) {
    if rx == 0.0 || ry == 0.0 {
        return;
    }
    let center = DocPoint::new(length(attributes, "cx"), length(attributes, "cy"));
    out.move_to(DocPoint::new(center.x + rx, center.y));
    let steps = out.resolution;
    out.elliptical_run(center, rx, ry, 0.0, -TAU, steps);
}

fn path_segment<S: PenSink + ?Sized>(segment: &Segment, out: &mut Emitter<'_, S>) {
    match *segment {
        Segment::Move { to } => out.move_to(to),
        Segment::Line { to, .. } | Segment::Close { to, .. } => out.line_to(to),
        Segment::Quadratic { control, to, .. } => out.quadratic_to(control, to),
        Segment::Cubic {
            control1,
            control2,
            to,
            ..
        } => out.cubic_to(control1, control2, to),
        Segment::Arc { ref arc, .. } => out.arc_to(arc),
    }
}
