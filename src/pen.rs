use crate::types::CanvasPoint;
use crate::view_box::ViewBox;

/// Receiver of pen commands in canvas coordinates.
pub trait PenSink {
    /// Pen-up relocation; no mark is made.
    fn move_to(&mut self, point: CanvasPoint);
    /// Pen-down stroke from the previous position to `point`.
    fn draw_to(&mut self, point: CanvasPoint);
}

impl<S: PenSink + ?Sized> PenSink for &mut S {
    fn move_to(&mut self, point: CanvasPoint) {
        (**self).move_to(point);
    }

    fn draw_to(&mut self, point: CanvasPoint) {
        (**self).draw_to(point);
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PenCommand {
    Move(CanvasPoint),
    Draw(CanvasPoint),
}

impl PenCommand {
    pub fn point(self) -> CanvasPoint {
        match self {
            PenCommand::Move(p) | PenCommand::Draw(p) => p,
        }
    }

    pub fn is_draw(self) -> bool {
        matches!(self, PenCommand::Draw(_))
    }
}

type PointCallback = Box<dyn FnMut(CanvasPoint) + Send>;

/// Two replaceable callback slots. Unset slots print to stderr.
pub struct CallbackSink {
    on_move: PointCallback,
    on_draw: PointCallback,
}

impl Default for CallbackSink {
    fn default() -> Self {
        Self {
            on_move: Box::new(|p| eprintln!("  ->  {p}")),
            on_draw: Box::new(|p| eprintln!("------{p}")),
        }
    }
}

impl CallbackSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_move(mut self, callback: impl FnMut(CanvasPoint) + Send + 'static) -> Self {
        self.on_move = Box::new(callback);
        self
    }

    pub fn on_draw(mut self, callback: impl FnMut(CanvasPoint) + Send + 'static) -> Self {
        self.on_draw = Box::new(callback);
        self
    }
}

impl PenSink for CallbackSink {
    fn move_to(&mut self, point: CanvasPoint) {
        (self.on_move)(point);
    }

    fn draw_to(&mut self, point: CanvasPoint) {
        (self.on_draw)(point);
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    pub commands: Vec<PenCommand>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_commands(self) -> Vec<PenCommand> {
        self.commands
    }
}

impl PenSink for RecordingSink {
    fn move_to(&mut self, point: CanvasPoint) {
        self.commands.push(PenCommand::Move(point));
    }

    fn draw_to(&mut self, point: CanvasPoint) {
        self.commands.push(PenCommand::Draw(point));
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CountingSink {
    pub moves: usize,
    pub draws: usize,
}

impl PenSink for CountingSink {
    fn move_to(&mut self, _point: CanvasPoint) {
        self.moves += 1;
    }

    fn draw_to(&mut self, _point: CanvasPoint) {
        self.draws += 1;
    }
}

/// Turns requested pen operations into sink calls, dropping everything that
/// falls outside the view box and lifting the pen when a stroke re-enters it.
///
/// | previous | current | draw request | move request |
/// |----------|---------|--------------|--------------|
/// | inside   | inside  | draw         | move         |
/// | outside  | inside  | move         | move         |
/// | any      | outside | nothing      | nothing      |
#[derive(Debug, Clone)]
pub struct PenTracker {
    view_box: ViewBox,
    previous_inside: bool,
    pub moves: usize,
    pub draws: usize,
    pub suppressed: usize,
}

impl PenTracker {
    pub fn new(view_box: ViewBox) -> Self {
        Self {
            view_box,
            previous_inside: true,
            moves: 0,
            draws: 0,
            suppressed: 0,
        }
    }

    /// Replaces the clipping rectangle; the inside flag carries over.
    pub fn set_view_box(&mut self, view_box: ViewBox) {
        self.view_box = view_box;
    }

    pub fn request_draw<S: PenSink + ?Sized>(&mut self, point: CanvasPoint, sink: &mut S) {
        let inside = self.view_box.contains(point);
        match (self.previous_inside, inside) {
            (true, true) => {
                self.draws += 1;
                sink.draw_to(point);
            }
            (false, true) => {
                self.moves += 1;
                sink.move_to(point);
            }
            (_, false) => self.suppressed += 1,
        }
        self.previous_inside = inside;
    }

    pub fn request_move<S: PenSink + ?Sized>(&mut self, point: CanvasPoint, sink: &mut S) {
        let inside = self.view_box.contains(point);
        if inside {
            self.moves += 1;
            sink.move_to(point);
        } else {
            self.suppressed += 1;
        }
        self.previous_inside = inside;
    }

    /// Adapter that routes a flattener's output through this tracker.
    pub fn filter<'a, S: PenSink + ?Sized>(&'a mut self, sink: &'a mut S) -> Tracked<'a, S> {
        Tracked { tracker: self, sink }
    }
}

pub struct Tracked<'a, S: PenSink + ?Sized> {
    tracker: &'a mut PenTracker,
    sink: &'a mut S,
}

impl<S: PenSink + ?Sized> PenSink for Tracked<'_, S> {
    fn move_to(&mut self, point: CanvasPoint) {
        self.tracker.request_move(point, &mut *self.sink);
    }

    fn draw_to(&mut self, point: CanvasPoint) {
        self.tracker.request_draw(point, &mut *self.sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::AffineTransform;
    use crate::types::DocPoint;
    use std::sync::{Arc, Mutex};

    fn at(x: f64, y: f64) -> CanvasPoint {
        AffineTransform::identity().apply(DocPoint::new(x, y))
    }

    fn unit_tracker() -> PenTracker {
        PenTracker::new(ViewBox {
            min: at(0.0, 0.0),
            max: at(10.0, 10.0),
        })
    }

    const INSIDE: (f64, f64) = (5.0, 5.0);
    const OUTSIDE: (f64, f64) = (20.0, 5.0);

    fn draw_after(previous: (f64, f64), current: (f64, f64)) -> Vec<PenCommand> {
        let mut tracker = unit_tracker();
        let mut warmup = CountingSink::default();
        tracker.request_move(at(previous.0, previous.1), &mut warmup);
        let mut sink = RecordingSink::new();
        tracker.request_draw(at(current.0, current.1), &mut sink);
        sink.into_commands()
    }

    #[test]
    fn draw_transition_table() {
        assert_eq!(draw_after(INSIDE, INSIDE), vec![PenCommand::Draw(at(5.0, 5.0))]);
        assert_eq!(draw_after(OUTSIDE, INSIDE), vec![PenCommand::Move(at(5.0, 5.0))]);
        assert_eq!(draw_after(INSIDE, OUTSIDE), vec![]);
        assert_eq!(draw_after(OUTSIDE, OUTSIDE), vec![]);
    }

    #[test]
    fn moves_only_inside() {
        let mut tracker = unit_tracker();
        let mut sink = RecordingSink::new();
        tracker.request_move(at(1.0, 1.0), &mut sink);
        tracker.request_move(at(-1.0, 1.0), &mut sink);
        assert_eq!(sink.commands, vec![PenCommand::Move(at(1.0, 1.0))]);
        assert_eq!((tracker.moves, tracker.suppressed), (1, 1));
    }

    #[test]
    fn fresh_tracker_draws_immediately() {
        let mut tracker = unit_tracker();
        let mut sink = RecordingSink::new();
        tracker.request_draw(at(2.0, 2.0), &mut sink);
        assert_eq!(sink.commands, vec![PenCommand::Draw(at(2.0, 2.0))]);
    }

    #[test]
    fn stroke_leaving_and_reentering_lifts_the_pen() {
        let mut tracker = unit_tracker();
        let mut sink = RecordingSink::new();
        {
            let mut tracked = tracker.filter(&mut sink);
            tracked.move_to(at(1.0, 1.0));
            tracked.draw_to(at(9.0, 1.0));
            tracked.draw_to(at(15.0, 1.0));
            tracked.draw_to(at(9.0, 2.0));
            tracked.draw_to(at(9.0, 9.0));
        }
        assert_eq!(
            sink.commands,
            vec![
                PenCommand::Move(at(1.0, 1.0)),
                PenCommand::Draw(at(9.0, 1.0)),
                PenCommand::Move(at(9.0, 2.0)),
                PenCommand::Draw(at(9.0, 9.0)),
            ]
        );
        assert_eq!((tracker.moves, tracker.draws, tracker.suppressed), (2, 2, 1));
    }

    #[test]
    fn callback_slots_are_replaceable() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let moves = Arc::clone(&seen);
        let draws = Arc::clone(&seen);
        let mut sink = CallbackSink::new()
            .on_move(move |p| moves.lock().unwrap().push(PenCommand::Move(p)))
            .on_draw(move |p| draws.lock().unwrap().push(PenCommand::Draw(p)));
        sink.move_to(at(1.0, 2.0));
        sink.draw_to(at(3.0, 4.0));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![PenCommand::Move(at(1.0, 2.0)), PenCommand::Draw(at(3.0, 4.0))]
        );
    }
}
