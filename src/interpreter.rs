use std::time::Instant;

use crate::debug::DebugLogger;
use crate::error::SvgPenError;
use crate::flatten::Flattener;
use crate::metrics::PassMetrics;
use crate::pen::{PenSink, PenTracker};
use crate::scan::{ContainerKind, Element, ElementKind, ShapeKind, get_attribute, take_next_element};
use crate::transform::{AffineTransform, parse_transform_list};
use crate::types::Size;
use crate::units::parse_scalar;
use crate::view_box::{Window, fit_view_box};

/// One interpretation pass over one document. All state (view box, pen
/// visibility, counters) lives here, so separate passes share nothing.
pub struct Interpreter<'s, S: PenSink + ?Sized> {
    canvas: Size,
    flattener: Flattener,
    tracker: Option<PenTracker>,
    sink: &'s mut S,
    metrics: PassMetrics,
    /// Shared trace file and this pass's id in it.
    debug: Option<(DebugLogger, usize)>,
}

/// Position in the element tree handed down through recursion.
#[derive(Debug, Clone, Copy)]
struct Scope {
    transform: AffineTransform,
    depth: usize,
    inside_svg: bool,
}

impl<'s, S: PenSink + ?Sized> Interpreter<'s, S> {
    pub fn new(canvas: Size, flattener: Flattener, sink: &'s mut S) -> Self {
        Self {
            canvas,
            flattener,
            tracker: None,
            sink,
            metrics: PassMetrics::default(),
            debug: None,
        }
    }

    pub(crate) fn with_debug(mut self, debug: Option<DebugLogger>) -> Self {
        self.debug = debug.map(|logger| {
            let pass = logger.begin_pass();
            (logger, pass)
        });
        self
    }

    /// Interprets a preprocessed document. Fails fast: the first malformed
    /// element aborts the pass.
    pub fn run(mut self, document: &str) -> Result<PassMetrics, SvgPenError> {
        let started = Instant::now();
        let root = Scope {
            transform: AffineTransform::identity(),
            depth: 0,
            inside_svg: false,
        };
        let result = self.evaluate_fragment(document, root);

        if let Some(tracker) = &self.tracker {
            self.metrics.moves = tracker.moves;
            self.metrics.draws = tracker.draws;
            self.metrics.suppressed = tracker.suppressed;
        }
        self.metrics.interpret_ms = started.elapsed().as_secs_f64() * 1000.0;
        if let Some((debug, pass)) = &self.debug {
            if let Err(err) = &result {
                debug.log_error(*pass, &err.to_string());
            }
            debug.finish_pass(*pass, &self.metrics);
        }
        log::debug!(
            "pass finished: {} elements, {} moves, {} draws, {} suppressed",
            self.metrics.elements(),
            self.metrics.moves,
            self.metrics.draws,
            self.metrics.suppressed
        );
        result.map(|()| self.metrics)
    }

    fn evaluate_fragment(&mut self, fragment: &str, scope: Scope) -> Result<(), SvgPenError> {
        let mut rest = fragment;
        loop {
            let (element, next) = take_next_element(rest)?;
            rest = next;
            if element.kind == ElementKind::End {
                return Ok(());
            }
            *self.metrics.by_element.entry(element.kind.name()).or_default() += 1;
            if let Some((debug, pass)) = &self.debug {
                debug.log_element(*pass, scope.depth, element.kind.name(), element.attributes);
            }
            match element.kind {
                ElementKind::Container(kind) => {
                    self.metrics.containers += 1;
                    let inner = self.enter_container(kind, &element, scope)?;
                    self.evaluate_fragment(element.content, inner)?;
                }
                ElementKind::Shape(kind) => self.shape(kind, &element, scope)?,
                ElementKind::Unrecognized => self.metrics.unrecognized += 1,
                ElementKind::End => unreachable!("handled above"),
            }
        }
    }

    fn enter_container(&mut self, kind: ContainerKind, element: &Element<'_>, scope: Scope) -> Result<Scope, SvgPenError> {
        let transform = match kind {
            ContainerKind::Svg if !scope.inside_svg => {
                let window = Window::from_svg_attributes(element.attributes, self.canvas)?;
                let (fit, view_box) = fit_view_box(window, self.canvas);
                log::debug!("outermost <svg>: window {window:?}, view box {view_box:?}");
                self.tracker
                    .get_or_insert_with(|| PenTracker::new(view_box))
                    .set_view_box(view_box);
                scope.transform.then(fit)
            }
            ContainerKind::Svg => {
                if get_attribute(element.attributes, "viewBox").is_some() {
                    log::debug!("nested <svg> viewBox ignored");
                }
                let x = parse_scalar(get_attribute(element.attributes, "x").unwrap_or(""), 0.0);
                let y = parse_scalar(get_attribute(element.attributes, "y").unwrap_or(""), 0.0);
                scope.transform.then(AffineTransform::translate(x, y))
            }
            ContainerKind::Group => scope.transform.then(local_transform("g", element.attributes)?),
        };
        Ok(Scope {
            transform,
            depth: scope.depth + 1,
            inside_svg: scope.inside_svg || kind == ContainerKind::Svg,
        })
    }

    fn shape(&mut self, kind: ShapeKind, element: &Element<'_>, scope: Scope) -> Result<(), SvgPenError> {
        let Some(tracker) = self.tracker.as_mut().filter(|_| scope.inside_svg) else {
            log::warn!("<{}> outside of any <svg> skipped", kind.name());
            self.metrics.orphaned_shapes += 1;
            return Ok(());
        };
        self.metrics.shapes += 1;
        let transform = scope.transform.then(local_transform(kind.name(), element.attributes)?);
        log::trace!("flattening <{}> at depth {}", kind.name(), scope.depth);
        let mut out = tracker.filter(&mut *self.sink);
        self.flattener.flatten_shape(kind, element.attributes, transform, &mut out)
    }
}

fn local_transform(element: &str, attributes: &str) -> Result<AffineTransform, SvgPenError> {
    match get_attribute(attributes, "transform") {
        Some(raw) => parse_transform_list(raw).map_err(|e| e.locate(element, "transform")),
        None => Ok(AffineTransform::identity()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pen::{PenCommand, RecordingSink};
    use crate::types::CanvasPoint;

    const EPS: f64 = 1e-6;

    fn near(p: CanvasPoint, x: f64, y: f64) -> bool {
        (p.x() - x).abs() < EPS && (p.y() - y).abs() < EPS
    }

    fn interpret(document: &str, canvas: f64) -> Result<(Vec<PenCommand>, PassMetrics), SvgPenError> {
        let mut sink = RecordingSink::new();
        let metrics = Interpreter::new(Size::square(canvas), Flattener::new(8, false), &mut sink).run(document)?;
        Ok((sink.into_commands(), metrics))
    }

    #[test]
    fn view_box_letterboxing_maps_into_the_band() {
        let doc = r#"<svg viewBox="0 0 100 50"><line x1="0" y1="0" x2="100" y2="50"/></svg>"#;
        let (cmds, _) = interpret(doc, 200.0).unwrap();
        assert_eq!(cmds.len(), 2);
        assert!(near(cmds[0].point(), 0.0, 50.0));
        assert!(near(cmds[1].point(), 200.0, 150.0));
    }

    #[test]
    fn groups_compose_transforms_outer_first() {
        let doc = r#"<svg width="100" height="100">
            <g transform="translate(10,0)">
                <g transform="scale(2)">
                    <line x1="1" y1="1" x2="2" y2="1" transform="translate(0,5)"/>
                </g>
            </g>
        </svg>"#;
        let (cmds, metrics) = interpret(doc, 100.0).unwrap();
        assert!(near(cmds[0].point(), 12.0, 12.0));
        assert!(near(cmds[1].point(), 14.0, 12.0));
        assert_eq!(metrics.containers, 3);
        assert_eq!(metrics.shapes, 1);
    }

    #[test]
    fn nested_svg_translates_and_ignores_its_view_box() {
        let doc = r#"<svg width="100" height="100">
            <svg x="10" y="20" viewBox="0 0 1 1"><line x1="0" y1="0" x2="5" y2="0"/></svg>
        </svg>"#;
        let (cmds, _) = interpret(doc, 100.0).unwrap();
        assert!(near(cmds[0].point(), 10.0, 20.0));
        assert!(near(cmds[1].point(), 15.0, 20.0));
    }

    #[test]
    fn unknown_elements_are_skipped_but_their_content_is_read() {
        let doc = r#"<?xml version="1.0"?><svg width="10" height="10"><defs><title>x</title></defs>
            <text x="1">hi</text><rect width="2" height="2"/></svg>"#;
        let (cmds, metrics) = interpret(doc, 10.0).unwrap();
        assert_eq!(cmds.len(), 5);
        assert_eq!(metrics.shapes, 1);
        // <?xml?>, <defs>, <title>, </title>, </defs>, <text>, </text>
        assert_eq!(metrics.unrecognized, 7);
    }

    #[test]
    fn non_ascii_tags_are_skipped() {
        let doc = r#"<svg width="100" height="100"><öko/><line x1="1" y1="1" x2="5" y2="5"/></svg>"#;
        let (cmds, metrics) = interpret(doc, 100.0).unwrap();
        assert_eq!(metrics.unrecognized, 1);
        assert_eq!(cmds.len(), 2);
        assert!(near(cmds[1].point(), 5.0, 5.0));
    }

    #[test]
    fn path_without_leading_move_draws_no_stray_stroke() {
        let doc = r#"<svg width="100" height="100"><line x1="50" y1="50" x2="60" y2="60"/><path d="L 10 10"/></svg>"#;
        let mut sink = RecordingSink::new();
        let err = Interpreter::new(Size::square(100.0), Flattener::new(8, false), &mut sink)
            .run(doc)
            .unwrap_err();
        assert!(
            matches!(err, SvgPenError::MalformedAttributeValue { ref element, .. } if element == "path"),
            "{err}"
        );
        assert_eq!(sink.commands.len(), 2);
        assert!(near(sink.commands[1].point(), 60.0, 60.0));
    }

    #[test]
    fn shapes_outside_svg_are_skipped() {
        let doc = r#"<rect width="2" height="2"/><svg width="10" height="10"></svg><line x2="1"/>"#;
        let (cmds, metrics) = interpret(doc, 10.0).unwrap();
        assert!(cmds.is_empty());
        assert_eq!(metrics.orphaned_shapes, 2);
    }

    #[test]
    fn strokes_leaving_the_view_box_are_clipped() {
        let doc = r#"<svg width="10" height="10"><polyline points="1,1 5,1 20,1 5,5 5,8"/></svg>"#;
        let (cmds, metrics) = interpret(doc, 10.0).unwrap();
        assert_eq!(
            cmds.iter().map(|c| c.is_draw()).collect::<Vec<_>>(),
            vec![false, true, false, true]
        );
        assert!(near(cmds[2].point(), 5.0, 5.0));
        assert_eq!((metrics.moves, metrics.draws, metrics.suppressed), (2, 2, 1));
    }

    #[test]
    fn malformed_quote_aborts_without_partial_output() {
        let doc = r#"<svg width="10" height="10"><line x1="1 y1="1" x2="5" y2="5"/></svg>"#;
        let mut sink = RecordingSink::new();
        let err = Interpreter::new(Size::square(10.0), Flattener::default(), &mut sink)
            .run(doc)
            .unwrap_err();
        assert!(matches!(err, SvgPenError::MalformedMarkup(_)), "{err}");
        assert!(sink.commands.is_empty());
    }

    #[test]
    fn bad_transform_names_its_element() {
        let doc = r#"<svg width="10" height="10"><g transform="rotate(1 2)"><rect width="1" height="1"/></g></svg>"#;
        let err = interpret(doc, 10.0).unwrap_err();
        assert!(
            matches!(err, SvgPenError::MalformedAttributeValue { ref element, ref attribute, .. }
                if element == "g" && attribute == "transform"),
            "{err}"
        );
    }

    #[test]
    fn unclosed_container_is_malformed() {
        assert!(matches!(
            interpret(r#"<svg width="10" height="10"><g><rect width="1" height="1"/></svg>"#, 10.0),
            Err(SvgPenError::MalformedMarkup(_))
        ));
    }
}
