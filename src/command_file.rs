use std::io::{self, Write};

use crate::pen::PenSink;
use crate::types::CanvasPoint;

/// Writes one line per pen command: `M x y` for moves, `D x y` for draws,
/// canvas units with three decimals.
///
/// The first write error is kept and returned by `finish`; later commands are
/// dropped.
pub struct CommandFileWriter<W: Write> {
    writer: W,
    lines: usize,
    error: Option<io::Error>,
}

impl<W: Write> CommandFileWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            lines: 0,
            error: None,
        }
    }

    pub fn lines(&self) -> usize {
        self.lines
    }

    fn write_line(&mut self, op: char, point: CanvasPoint) {
        if self.error.is_some() {
            return;
        }
        match writeln!(self.writer, "{op} {:.3} {:.3}", point.x(), point.y()) {
            Ok(()) => self.lines += 1,
            Err(err) => self.error = Some(err),
        }
    }

    /// Flushes and hands the writer back.
    pub fn finish(mut self) -> io::Result<W> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl<W: Write> PenSink for CommandFileWriter<W> {
    fn move_to(&mut self, point: CanvasPoint) {
        self.write_line('M', point);
    }

    fn draw_to(&mut self, point: CanvasPoint) {
        self.write_line('D', point);
    }
}
