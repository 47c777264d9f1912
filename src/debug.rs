use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::metrics::PassMetrics;

/// JSON-lines trace of interpreted elements. Clones share one file; passes
/// running side by side are told apart by the `pass` id stamped on each line.
/// The logger only writes: every count in a summary comes from the pass's own
/// `PassMetrics`.
#[derive(Clone)]
pub(crate) struct DebugLogger {
    writer: Arc<Mutex<BufWriter<File>>>,
    next_pass: Arc<AtomicUsize>,
}

impl DebugLogger {
    pub fn new(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            writer: Arc::new(Mutex::new(BufWriter::new(file))),
            next_pass: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Hands out the id for a new pass.
    pub fn begin_pass(&self) -> usize {
        self.next_pass.fetch_add(1, Ordering::Relaxed)
    }

    fn write_line(&self, line: &str) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{line}");
        }
    }

    pub fn log_element(&self, pass: usize, depth: usize, element: &str, attributes: &str) {
        self.write_line(&format!(
            "{{\"type\":\"svgpen.element\",\"pass\":{pass},\"depth\":{depth},\"element\":\"{}\",\"attributes\":\"{}\"}}",
            json_escape(element),
            json_escape(attributes.trim())
        ));
    }

    pub fn log_error(&self, pass: usize, message: &str) {
        self.write_line(&format!(
            "{{\"type\":\"svgpen.error\",\"pass\":{pass},\"message\":\"{}\"}}",
            json_escape(message)
        ));
    }

    /// Closes a pass: one summary line, then a flush.
    pub fn finish_pass(&self, pass: usize, metrics: &PassMetrics) {
        let counts = metrics
            .counts()
            .into_iter()
            .map(|(key, value)| format!("\"{}\":{value}", json_escape(&key)))
            .collect::<Vec<_>>()
            .join(",");
        self.write_line(&format!(
            "{{\"type\":\"svgpen.summary\",\"pass\":{pass},\"ms\":{:.3},\"counts\":{{{counts}}}}}",
            metrics.interpret_ms
        ));
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

pub(crate) fn json_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            _ => out.push(ch),
        }
    }
    out
}
