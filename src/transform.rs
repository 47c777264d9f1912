use crate::error::SvgPenError;
use crate::types::{CanvasPoint, DocPoint};
use crate::units::parse_number_list;

// Matrix layout follows SVG 1.1 "TransformMatrixDefined":
//
//   a c e
//   b d f
//   0 0 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::identity()
    }
}

impl AffineTransform {
    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn identity() -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0)
    }

    pub fn translate(tx: f64, ty: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    pub fn scale(sx: f64, sy: f64) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    /// Counter-clockwise rotation by `angle` radians (clockwise on screen,
    /// where y grows downwards).
    pub fn rotate(angle: f64) -> Self {
        let s = libm::sin(angle);
        let c = libm::cos(angle);
        Self::new(c, s, -s, c, 0.0, 0.0)
    }

    pub fn rotate_around(angle: f64, pivot: DocPoint) -> Self {
        Self::translate(pivot.x, pivot.y)
            .then(Self::rotate(angle))
            .then(Self::translate(-pivot.x, -pivot.y))
    }

    pub fn skew_x(angle: f64) -> Self {
        Self::new(1.0, 0.0, libm::tan(angle), 1.0, 0.0, 0.0)
    }

    pub fn skew_y(angle: f64) -> Self {
        Self::new(1.0, libm::tan(angle), 0.0, 1.0, 0.0, 0.0)
    }

    /// `self * inner`: the result applies `inner` first, then `self`. Outer
    /// transforms go on the left.
    pub fn then(self, inner: Self) -> Self {
        Self {
            a: self.a * inner.a + self.c * inner.b,
            b: self.b * inner.a + self.d * inner.b,
            c: self.a * inner.c + self.c * inner.d,
            d: self.b * inner.c + self.d * inner.d,
            e: self.a * inner.e + self.c * inner.f + self.e,
            f: self.b * inner.e + self.d * inner.f + self.f,
        }
    }

    pub fn apply(self, p: DocPoint) -> CanvasPoint {
        CanvasPoint::new(
            self.a * p.x + self.c * p.y + self.e,
            self.b * p.x + self.d * p.y + self.f,
        )
    }

    pub fn determinant(self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    pub fn invert(self) -> Option<Self> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let a = self.d / det;
        let b = -self.b / det;
        let c = -self.c / det;
        let d = self.a / det;
        Some(Self {
            a,
            b,
            c,
            d,
            e: -(a * self.e + c * self.f),
            f: -(b * self.e + d * self.f),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransformFunction {
    Matrix,
    Translate,
    Scale,
    Rotate,
    SkewX,
    SkewY,
}

impl TransformFunction {
    const ALL: [TransformFunction; 6] = [
        TransformFunction::Matrix,
        TransformFunction::Translate,
        TransformFunction::Scale,
        TransformFunction::Rotate,
        TransformFunction::SkewX,
        TransformFunction::SkewY,
    ];

    fn name(self) -> &'static str {
        match self {
            TransformFunction::Matrix => "matrix",
            TransformFunction::Translate => "translate",
            TransformFunction::Scale => "scale",
            TransformFunction::Rotate => "rotate",
            TransformFunction::SkewX => "skewX",
            TransformFunction::SkewY => "skewY",
        }
    }

    fn longest_prefix_of(text: &str) -> Option<TransformFunction> {
        Self::ALL
            .into_iter()
            .filter(|f| text.starts_with(f.name()))
            .max_by_key(|f| f.name().len())
    }

    fn build(self, args: &[f64]) -> Option<AffineTransform> {
        let m = match (self, args) {
            (TransformFunction::Matrix, &[a, b, c, d, e, f]) => AffineTransform::new(a, b, c, d, e, f),
            (TransformFunction::Translate, &[tx]) => AffineTransform::translate(tx, 0.0),
            (TransformFunction::Translate, &[tx, ty]) => AffineTransform::translate(tx, ty),
            (TransformFunction::Scale, &[s]) => AffineTransform::scale(s, s),
            (TransformFunction::Scale, &[sx, sy]) => AffineTransform::scale(sx, sy),
            (TransformFunction::Rotate, &[deg]) => AffineTransform::rotate(deg.to_radians()),
            (TransformFunction::Rotate, &[deg, cx, cy]) => {
                AffineTransform::rotate_around(deg.to_radians(), DocPoint::new(cx, cy))
            }
            (TransformFunction::SkewX, &[deg]) => AffineTransform::skew_x(deg.to_radians()),
            (TransformFunction::SkewY, &[deg]) => AffineTransform::skew_y(deg.to_radians()),
            _ => return None,
        };
        Some(m)
    }
}

/// Composes a `transform` attribute value such as
/// `"translate(10,20) rotate(45 5 5)"` into one matrix. Functions apply
/// right to left, as nested coordinate systems.
pub fn parse_transform_list(raw: &str) -> Result<AffineTransform, SvgPenError> {
    let mut out = AffineTransform::identity();
    let mut rest = raw.trim_start_matches(is_list_separator);

    while !rest.is_empty() {
        let Some(function) = TransformFunction::longest_prefix_of(rest) else {
            return Err(transform_error(format!("unknown transform function at {rest:?}")));
        };
        let after_name = rest[function.name().len()..].trim_start();
        let Some(args_start) = after_name.strip_prefix('(') else {
            return Err(transform_error(format!("expected '(' after {}", function.name())));
        };
        let Some(close) = args_start.find(')') else {
            return Err(transform_error(format!("unclosed argument list for {}", function.name())));
        };
        let args = parse_number_list(&args_start[..close]).map_err(|e| e.locate("?", "transform"))?;
        let Some(m) = function.build(&args) else {
            return Err(transform_error(format!(
                "{} does not take {} argument(s)",
                function.name(),
                args.len()
            )));
        };
        out = out.then(m);
        rest = args_start[close + 1..].trim_start_matches(is_list_separator);
    }

    Ok(out)
}

fn is_list_separator(c: char) -> bool {
    c.is_whitespace() || c == ','
}

fn transform_error(message: String) -> SvgPenError {
    SvgPenError::attribute("?", "transform", message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::f64::consts::FRAC_PI_2;

    const EPS: f64 = 1e-9;

    fn close(p: CanvasPoint, x: f64, y: f64) -> bool {
        (p.x() - x).abs() < EPS && (p.y() - y).abs() < EPS
    }

    fn random_transform(rng: &mut StdRng) -> AffineTransform {
        loop {
            let m = AffineTransform::new(
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-3.0..3.0),
                rng.gen_range(-100.0..100.0),
                rng.gen_range(-100.0..100.0),
            );
            if m.determinant().abs() > 0.1 {
                return m;
            }
        }
    }

    #[test]
    fn primitives_map_points() {
        let p = DocPoint::new(1.0, 0.0);
        assert!(close(AffineTransform::translate(2.0, 3.0).apply(p), 3.0, 3.0));
        assert!(close(AffineTransform::scale(2.0, 5.0).apply(DocPoint::new(1.0, 1.0)), 2.0, 5.0));
        assert!(close(AffineTransform::rotate(FRAC_PI_2).apply(p), 0.0, 1.0));
        let pivot = DocPoint::new(1.0, 1.0);
        assert!(close(
            AffineTransform::rotate_around(FRAC_PI_2, pivot).apply(DocPoint::new(2.0, 1.0)),
            1.0,
            2.0
        ));
        assert!(close(
            AffineTransform::skew_x(std::f64::consts::FRAC_PI_4).apply(DocPoint::new(0.0, 2.0)),
            2.0,
            2.0
        ));
    }

    #[test]
    fn composition_applies_inner_first() {
        let m = AffineTransform::translate(10.0, 0.0).then(AffineTransform::scale(2.0, 2.0));
        assert!(close(m.apply(DocPoint::new(1.0, 1.0)), 12.0, 2.0));
    }

    #[test]
    fn composition_is_associative() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let a = random_transform(&mut rng);
            let b = random_transform(&mut rng);
            let c = random_transform(&mut rng);
            let p = DocPoint::new(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0));
            let left = a.then(b).then(c).apply(p);
            let right = a.then(b.then(c)).apply(p);
            let scale = 1.0 + left.x().abs().max(left.y().abs());
            assert!((left.x() - right.x()).abs() < 1e-9 * scale);
            assert!((left.y() - right.y()).abs() < 1e-9 * scale);
        }
    }

    #[test]
    fn inverse_round_trips() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let m = random_transform(&mut rng);
            let inv = m.invert().expect("invertible");
            let p = DocPoint::new(rng.gen_range(-50.0..50.0), rng.gen_range(-50.0..50.0));
            let back = inv.then(m).apply(p);
            assert!((back.x() - p.x).abs() < 1e-6, "{back} vs {p}");
            assert!((back.y() - p.y).abs() < 1e-6, "{back} vs {p}");
        }
        assert!(AffineTransform::scale(0.0, 1.0).invert().is_none());
    }

    #[test]
    fn parses_function_lists() {
        let m = parse_transform_list("translate(10,20) scale(2)").unwrap();
        assert!(close(m.apply(DocPoint::new(1.0, 1.0)), 12.0, 22.0));

        let m = parse_transform_list("matrix(1 0 0 1 5 6)").unwrap();
        assert!(close(m.apply(DocPoint::ORIGIN), 5.0, 6.0));

        let m = parse_transform_list("rotate(90 1 1)").unwrap();
        assert!(close(m.apply(DocPoint::new(2.0, 1.0)), 1.0, 2.0));

        let m = parse_transform_list("translate(5),skewY(0)").unwrap();
        assert!(close(m.apply(DocPoint::ORIGIN), 5.0, 0.0));

        assert_eq!(parse_transform_list("").unwrap(), AffineTransform::identity());
    }

    #[test]
    fn rejects_wrong_arity() {
        for bad in ["rotate(1 2)", "matrix(1 2 3)", "skewX()", "translate(1 2 3)", "scale(1,2,3)"] {
            let err = parse_transform_list(bad).unwrap_err();
            assert!(
                matches!(err, SvgPenError::MalformedAttributeValue { .. }),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_unknown_or_unclosed() {
        assert!(parse_transform_list("shear(1)").is_err());
        assert!(parse_transform_list("translate(1, 2").is_err());
    }
}
