mod command_file;
mod debug;
mod error;
mod flatten;
mod interpreter;
mod metrics;
mod path;
mod pen;
mod raster;
mod scan;
mod transform;
mod types;
mod units;
mod view_box;

use std::io::Write;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

pub use command_file::CommandFileWriter;
use debug::DebugLogger;
pub use error::SvgPenError;
pub use flatten::{
    ArcGeometry, ArcShape, Flattener, cubic_point, linear_point, process_arc, quadratic_point,
};
pub use interpreter::Interpreter;
pub use metrics::{BatchMetrics, PassMetrics};
pub use path::{
    CoordMode, EllipticalArc, PathCommand, PathInstruction, PenState, Segment, tokenize_path,
};
pub use pen::{CallbackSink, CountingSink, PenCommand, PenSink, PenTracker, RecordingSink, Tracked};
pub use raster::{RasterOptions, RasterSink};
pub use scan::{
    ContainerKind, Element, ElementKind, ShapeKind, find_matching_close, find_unquoted,
    get_attribute, preprocess, take_next_element,
};
pub use transform::{AffineTransform, parse_transform_list};
pub use types::{CanvasPoint, Color, DocPoint, Size};
pub use units::{Unit, parse_number_list, parse_scalar};
pub use view_box::{ViewBox, Window, fit_view_box};

pub const DEFAULT_CANVAS_SIZE: f64 = 350.0;
pub const DEFAULT_RESOLUTION: usize = 100;

const ENV_CANVAS_WIDTH: &str = "SVGPEN_CANVAS_WIDTH";
const ENV_CANVAS_HEIGHT: &str = "SVGPEN_CANVAS_HEIGHT";
const ENV_RESOLUTION: &str = "SVGPEN_RESOLUTION";
const ENV_DEBUG_LOG: &str = "SVGPEN_DEBUG_LOG";

/// Configured interpreter factory. Every call runs an independent pass, so
/// one `SvgPen` can serve many threads.
#[derive(Clone)]
pub struct SvgPen {
    canvas: Size,
    flattener: Flattener,
    debug: Option<DebugLogger>,
}

#[derive(Debug, Clone)]
pub struct SvgPenBuilder {
    canvas: Size,
    resolution: usize,
    subdivide_lines: bool,
    debug_path: Option<PathBuf>,
}

impl Default for SvgPenBuilder {
    fn default() -> Self {
        Self {
            canvas: Size::square(DEFAULT_CANVAS_SIZE),
            resolution: DEFAULT_RESOLUTION,
            subdivide_lines: false,
            debug_path: None,
        }
    }
}

impl SvgPenBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the defaults and applies `SVGPEN_*` environment variables.
    pub fn from_env() -> Result<Self, SvgPenError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SvgPenError> {
        let mut builder = Self::default();
        if let Some(width) = lookup(ENV_CANVAS_WIDTH) {
            builder.canvas.width = parse_env(ENV_CANVAS_WIDTH, &width)?;
        }
        if let Some(height) = lookup(ENV_CANVAS_HEIGHT) {
            builder.canvas.height = parse_env(ENV_CANVAS_HEIGHT, &height)?;
        }
        if let Some(resolution) = lookup(ENV_RESOLUTION) {
            builder.resolution = parse_env(ENV_RESOLUTION, &resolution)?;
        }
        if let Some(path) = lookup(ENV_DEBUG_LOG).filter(|p| !p.trim().is_empty()) {
            builder.debug_path = Some(PathBuf::from(path));
        }
        Ok(builder)
    }

    pub fn canvas_size(mut self, width: f64, height: f64) -> Self {
        self.canvas = Size::new(width, height);
        self
    }

    pub fn resolution(mut self, segments: usize) -> Self {
        self.resolution = segments;
        self
    }

    pub fn subdivide_lines(mut self, enabled: bool) -> Self {
        self.subdivide_lines = enabled;
        self
    }

    pub fn debug_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.debug_path = Some(path.into());
        self
    }

    pub fn build(self) -> Result<SvgPen, SvgPenError> {
        let Size { width, height } = self.canvas;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(SvgPenError::InvalidConfiguration(format!(
                "canvas size must be positive, got {width} x {height}"
            )));
        }
        if self.resolution == 0 {
            return Err(SvgPenError::InvalidConfiguration(
                "resolution must be >= 1".to_string(),
            ));
        }
        let debug = match self.debug_path {
            Some(path) => Some(DebugLogger::new(path)?),
            None => None,
        };
        Ok(SvgPen {
            canvas: self.canvas,
            flattener: Flattener::new(self.resolution, self.subdivide_lines),
            debug,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, SvgPenError> {
    raw.trim()
        .parse()
        .map_err(|_| SvgPenError::InvalidConfiguration(format!("{key}: cannot parse {raw:?}")))
}

impl SvgPen {
    pub fn builder() -> SvgPenBuilder {
        SvgPenBuilder::new()
    }

    pub fn canvas(&self) -> Size {
        self.canvas
    }

    pub fn resolution(&self) -> usize {
        self.flattener.resolution
    }

    /// One pass over an already preprocessed document.
    pub fn interpret<S: PenSink + ?Sized>(&self, document: &str, sink: &mut S) -> Result<PassMetrics, SvgPenError> {
        Interpreter::new(self.canvas, self.flattener, sink)
            .with_debug(self.debug.clone())
            .run(document)
    }

    /// Like `interpret`, for raw file contents (comments, multi-line values).
    pub fn interpret_source<S: PenSink + ?Sized>(&self, source: &str, sink: &mut S) -> Result<PassMetrics, SvgPenError> {
        self.interpret(&preprocess(source), sink)
    }

    pub fn interpret_file<S: PenSink + ?Sized>(
        &self,
        path: impl AsRef<Path>,
        sink: &mut S,
    ) -> Result<PassMetrics, SvgPenError> {
        let source = std::fs::read_to_string(path.as_ref())?;
        log::debug!("read {} bytes from {}", source.len(), path.as_ref().display());
        self.interpret_source(&source, sink)
    }

    pub fn record(&self, document: &str) -> Result<Vec<PenCommand>, SvgPenError> {
        let mut sink = RecordingSink::new();
        self.interpret(document, &mut sink)?;
        Ok(sink.into_commands())
    }

    /// Records each document on the rayon pool, one interpreter per document.
    /// Results keep the input order.
    pub fn record_many_parallel<D: AsRef<str> + Sync>(
        &self,
        documents: &[D],
    ) -> Vec<Result<Vec<PenCommand>, SvgPenError>> {
        documents
            .par_iter()
            .map(|doc| self.record(doc.as_ref()))
            .collect()
    }

    /// Counts of every pass in `documents`, run in parallel.
    pub fn measure_many_parallel<D: AsRef<str> + Sync>(&self, documents: &[D]) -> Result<BatchMetrics, SvgPenError> {
        let passes = documents
            .par_iter()
            .map(|doc| self.interpret(doc.as_ref(), &mut CountingSink::default()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(passes.into_iter().collect())
    }

    pub fn render_png(&self, document: &str, options: &RasterOptions) -> Result<Vec<u8>, SvgPenError> {
        self.render(document, options)?.encode_png()
    }

    pub fn render_bmp(&self, document: &str, options: &RasterOptions) -> Result<Vec<u8>, SvgPenError> {
        self.render(document, options)?.encode_bmp()
    }

    /// Counting pass first, so the stroke hue can walk the whole wheel.
    fn render(&self, document: &str, options: &RasterOptions) -> Result<RasterSink, SvgPenError> {
        let mut counter = CountingSink::default();
        self.interpret(document, &mut counter)?;
        let mut raster = RasterSink::new(self.canvas, options, counter.draws)?;
        self.interpret(document, &mut raster)?;
        Ok(raster)
    }

    pub fn write_command_file<W: Write>(&self, document: &str, writer: W) -> Result<PassMetrics, SvgPenError> {
        let mut out = CommandFileWriter::new(writer);
        let metrics = self.interpret(document, &mut out)?;
        out.finish()?;
        Ok(metrics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn temp_path(tag: &str, ext: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        std::env::temp_dir().join(format!("svgpen_{tag}_{}_{}.{ext}", std::process::id(), nanos))
    }

    const SQUARE: &str = r#"<svg width="100" height="100"><rect x="10" y="10" width="20" height="20"/></svg>"#;

    fn pen() -> SvgPen {
        SvgPen::builder()
            .canvas_size(100.0, 100.0)
            .resolution(16)
            .build()
            .expect("valid configuration")
    }

    #[test]
    fn builder_defaults() {
        let pen = SvgPen::builder().build().unwrap();
        assert_eq!(pen.canvas(), Size::square(350.0));
        assert_eq!(pen.resolution(), 100);
    }

    #[test]
    fn builder_rejects_bad_settings() {
        for builder in [
            SvgPen::builder().resolution(0),
            SvgPen::builder().canvas_size(0.0, 10.0),
            SvgPen::builder().canvas_size(10.0, f64::NAN),
        ] {
            assert!(matches!(builder.build(), Err(SvgPenError::InvalidConfiguration(_))));
        }
    }

    #[test]
    fn environment_seeds_the_builder() {
        let vars: HashMap<&str, &str> = [
            (ENV_CANVAS_WIDTH, "200"),
            (ENV_CANVAS_HEIGHT, " 150.5 "),
            (ENV_RESOLUTION, "12"),
        ]
        .into_iter()
        .collect();
        let builder = SvgPenBuilder::from_vars(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        let pen = builder.build().unwrap();
        assert_eq!(pen.canvas(), Size::new(200.0, 150.5));
        assert_eq!(pen.resolution(), 12);

        let err = SvgPenBuilder::from_vars(|k| (k == ENV_RESOLUTION).then(|| "lots".to_string())).unwrap_err();
        assert!(err.to_string().contains(ENV_RESOLUTION));
    }

    #[test]
    fn records_a_square() {
        let cmds = pen().record(SQUARE).unwrap();
        assert_eq!(cmds.len(), 5);
        assert_eq!(cmds[0], PenCommand::Move(AffineTransform::identity().apply(DocPoint::new(30.0, 10.0))));
    }

    #[test]
    fn source_is_preprocessed() {
        let source = "<!-- <line x2=\"5\"/> -->\n<svg width=\"100\" height=\"100\">\n<polyline points=\"0,0\n 10,0\"/></svg>";
        let mut sink = RecordingSink::new();
        let metrics = pen().interpret_source(source, &mut sink).unwrap();
        assert_eq!(metrics.shapes, 1);
        assert_eq!(sink.commands.len(), 2);
    }

    #[test]
    fn interprets_files() {
        let path = temp_path("doc", "svg");
        std::fs::write(&path, SQUARE).unwrap();
        let mut counter = CountingSink::default();
        let metrics = pen().interpret_file(&path, &mut counter).unwrap();
        assert_eq!((counter.moves, counter.draws), (1, 4));
        assert_eq!((metrics.moves, metrics.draws), (1, 4));
        let _ = std::fs::remove_file(path);

        let missing = pen().interpret_file(temp_path("missing", "svg"), &mut CountingSink::default());
        assert!(matches!(missing, Err(SvgPenError::Io(_))));
    }

    #[test]
    fn parallel_passes_match_sequential_ones() {
        let docs = vec![
            SQUARE.to_string(),
            r#"<svg viewBox="0 0 10 10"><circle cx="5" cy="5" r="4"/></svg>"#.to_string(),
            r#"<svg width="100" height="100"><path d="M10 10 q 10 -10 20 0 t 20 0"/></svg>"#.to_string(),
            r#"<svg><line x1="1 /></svg>"#.to_string(),
        ];
        let pen = pen();
        let parallel = pen.record_many_parallel(&docs);
        assert_eq!(parallel.len(), docs.len());
        for (doc, result) in docs.iter().zip(&parallel) {
            match (pen.record(doc), result) {
                (Ok(seq), Ok(par)) => assert_eq!(&seq, par),
                (Err(_), Err(_)) => {}
                (a, b) => panic!("sequential {a:?} vs parallel {b:?}"),
            }
        }
        assert!(pen.measure_many_parallel(&docs).is_err());
        let batch = pen.measure_many_parallel(&docs[..3]).unwrap();
        assert_eq!(batch.passes.len(), 3);
        assert_eq!(batch.total.shapes, 3);
    }

    #[test]
    fn renders_previews() {
        let pen = pen();
        let png = pen.render_png(SQUARE, &RasterOptions::default()).unwrap();
        assert_eq!(&png[1..4], b"PNG");
        let bmp = pen.render_bmp(SQUARE, &RasterOptions::default()).unwrap();
        assert_eq!(&bmp[..2], b"BM");
    }

    #[test]
    fn writes_command_files() {
        let mut out = Vec::new();
        let metrics = pen().write_command_file(SQUARE, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), metrics.moves + metrics.draws);
        assert_eq!(lines[0], "M 30.000 10.000");
        assert_eq!(lines[1], "D 10.000 10.000");
    }

    #[test]
    fn debug_log_traces_elements() {
        let log_path = temp_path("trace", "jsonl");
        let pen = SvgPen::builder().debug_log(&log_path).build().unwrap();
        pen.record(SQUARE).unwrap();
        drop(pen);
        let log = std::fs::read_to_string(&log_path).expect("read debug log");
        assert!(log.contains("\"element\":\"svg\""));
        assert!(log.contains("\"element\":\"rect\""));
        assert!(log.contains("\"type\":\"svgpen.summary\""));
        let _ = std::fs::remove_file(log_path);
    }

    #[test]
    fn parallel_passes_keep_their_own_element_counts() {
        let log_path = temp_path("parallel_trace", "jsonl");
        let pen = SvgPen::builder().debug_log(&log_path).build().unwrap();
        let docs: Vec<String> = (1..=6)
            .map(|n| {
                let rects = r#"<rect width="2" height="2"/>"#.repeat(n);
                format!(r#"<svg width="10" height="10">{rects}</svg>"#)
            })
            .collect();
        let batch = pen.measure_many_parallel(&docs).unwrap();
        for (n, pass) in batch.passes.iter().enumerate() {
            assert_eq!(pass.by_element.get("rect"), Some(&(n + 1)));
        }
        drop(pen);

        let log = std::fs::read_to_string(&log_path).expect("read debug log");
        let mut rect_counts: Vec<usize> = log
            .lines()
            .filter(|line| line.contains("\"type\":\"svgpen.summary\""))
            .map(|line| {
                let (_, tail) = line.split_once("\"element.rect\":").expect("rect count in summary");
                tail.trim_end_matches('}').split(',').next().unwrap().parse().unwrap()
            })
            .collect();
        rect_counts.sort_unstable();
        assert_eq!(rect_counts, vec![1, 2, 3, 4, 5, 6]);
        let _ = std::fs::remove_file(log_path);
    }
}
