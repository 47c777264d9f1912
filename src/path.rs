// Path data ("d" attribute) interpretation.
//
// Two stages: `tokenize_path` splits the string at command letters, keeping
// each command's raw argument text; `PenState::run` walks those instructions,
// expands implicit repetitions and resolves relative coordinates and implicit
// control points into absolute `Segment`s in document space.

use crate::error::SvgPenError;
use crate::types::DocPoint;
use crate::units::NumberCursor;

const COMMAND_LETTERS: &str = "MmVvHhLlAaQqTtCcSsZz";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordMode {
    Absolute,
    Relative,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathCommand {
    MoveTo,
    LineTo,
    HorizontalLineTo,
    VerticalLineTo,
    /// `smooth` marks S/s: the first control point is implicit.
    CubicBezierTo { smooth: bool },
    /// `smooth` marks T/t: the control point is implicit.
    QuadraticBezierTo { smooth: bool },
    ArcTo,
    ClosePath,
}

impl PathCommand {
    fn from_letter(letter: char) -> Option<(PathCommand, CoordMode)> {
        let command = match letter.to_ascii_uppercase() {
            'M' => PathCommand::MoveTo,
            'L' => PathCommand::LineTo,
            'H' => PathCommand::HorizontalLineTo,
            'V' => PathCommand::VerticalLineTo,
            'C' => PathCommand::CubicBezierTo { smooth: false },
            'S' => PathCommand::CubicBezierTo { smooth: true },
            'Q' => PathCommand::QuadraticBezierTo { smooth: false },
            'T' => PathCommand::QuadraticBezierTo { smooth: true },
            'A' => PathCommand::ArcTo,
            'Z' => PathCommand::ClosePath,
            _ => return None,
        };
        let mode = if letter.is_ascii_uppercase() {
            CoordMode::Absolute
        } else {
            CoordMode::Relative
        };
        Some((command, mode))
    }

    /// Numbers consumed by one repetition of the command.
    fn arity(self) -> usize {
        match self {
            PathCommand::MoveTo | PathCommand::LineTo => 2,
            PathCommand::HorizontalLineTo | PathCommand::VerticalLineTo => 1,
            PathCommand::CubicBezierTo { smooth: false } => 6,
            PathCommand::CubicBezierTo { smooth: true } => 4,
            PathCommand::QuadraticBezierTo { smooth: false } => 4,
            PathCommand::QuadraticBezierTo { smooth: true } => 2,
            PathCommand::ArcTo => 7,
            PathCommand::ClosePath => 0,
        }
    }
}

/// One command letter with its unparsed arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathInstruction<'a> {
    pub command: PathCommand,
    pub mode: CoordMode,
    pub args: &'a str,
}

pub fn tokenize_path(d: &str) -> Result<Vec<PathInstruction<'_>>, SvgPenError> {
    let mut out = Vec::new();
    let mut rest = d.trim_start_matches(|c: char| c.is_whitespace() || c == ',');
    while let Some(letter) = rest.chars().next() {
        let Some((command, mode)) = PathCommand::from_letter(letter) else {
            return Err(path_error(format!("expected a command letter at {rest:?}")));
        };
        let body = &rest[1..];
        let end = body.find(|c: char| COMMAND_LETTERS.contains(c)).unwrap_or(body.len());
        out.push(PathInstruction {
            command,
            mode,
            args: &body[..end],
        });
        rest = &body[end..];
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EllipticalArc {
    pub rx: f64,
    pub ry: f64,
    /// x-axis rotation, radians.
    pub rotation: f64,
    pub large_arc: bool,
    pub sweep: bool,
    pub to: DocPoint,
}

/// Absolute, fully resolved piece of a path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    Move {
        to: DocPoint,
    },
    Line {
        from: DocPoint,
        to: DocPoint,
    },
    Quadratic {
        from: DocPoint,
        control: DocPoint,
        to: DocPoint,
    },
    Cubic {
        from: DocPoint,
        control1: DocPoint,
        control2: DocPoint,
        to: DocPoint,
    },
    Arc {
        from: DocPoint,
        arc: EllipticalArc,
    },
    Close {
        from: DocPoint,
        to: DocPoint,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CurveFamily {
    Quadratic,
    Cubic,
}

/// Pen position while walking one path.
#[derive(Debug, Clone, Copy, Default)]
pub struct PenState {
    pub current_position: DocPoint,
    /// Set by every move, restored by close.
    pub subpath_start: DocPoint,
    last_control_point: Option<(CurveFamily, DocPoint)>,
}

impl PenState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a whole `d` attribute into segments.
    pub fn run(&mut self, d: &str) -> Result<Vec<Segment>, SvgPenError> {
        let instructions = tokenize_path(d)?;
        if let Some(first) = instructions.first().filter(|i| i.command != PathCommand::MoveTo) {
            return Err(path_error(format!(
                "path data must begin with a moveto, found {:?}",
                first.command
            )));
        }
        let mut out = Vec::new();
        for instruction in instructions {
            self.apply(instruction, &mut out)
                .map_err(|e| e.locate("path", "d"))?;
        }
        Ok(out)
    }

    fn apply(&mut self, ins: PathInstruction<'_>, out: &mut Vec<Segment>) -> Result<(), SvgPenError> {
        if ins.command == PathCommand::ClosePath {
            if !ins.args.trim_matches(|c: char| c.is_whitespace() || c == ',').is_empty() {
                return Err(path_error(format!("close path takes no arguments: {:?}", ins.args)));
            }
            out.push(Segment::Close {
                from: self.current_position,
                to: self.subpath_start,
            });
            self.current_position = self.subpath_start;
            self.last_control_point = None;
            return Ok(());
        }

        let groups = read_groups(ins)?;
        for (index, g) in groups.iter().enumerate() {
            let segment = self.segment(ins, index, g);
            out.push(segment);
        }
        Ok(())
    }

    fn resolve(&self, mode: CoordMode, x: f64, y: f64) -> DocPoint {
        match mode {
            CoordMode::Absolute => DocPoint::new(x, y),
            CoordMode::Relative => self.current_position + DocPoint::new(x, y),
        }
    }

    fn segment(&mut self, ins: PathInstruction<'_>, index: usize, g: &[f64]) -> Segment {
        let from = self.current_position;
        let mode = ins.mode;
        let (segment, to, control) = match ins.command {
            // Pairs after the first one of a move are implicit line-tos.
            PathCommand::MoveTo if index == 0 => {
                let to = self.resolve(mode, g[0], g[1]);
                self.subpath_start = to;
                (Segment::Move { to }, to, None)
            }
            PathCommand::MoveTo | PathCommand::LineTo => {
                let to = self.resolve(mode, g[0], g[1]);
                (Segment::Line { from, to }, to, None)
            }
            PathCommand::HorizontalLineTo => {
                let x = match mode {
                    CoordMode::Absolute => g[0],
                    CoordMode::Relative => from.x + g[0],
                };
                let to = DocPoint::new(x, from.y);
                (Segment::Line { from, to }, to, None)
            }
            PathCommand::VerticalLineTo => {
                let y = match mode {
                    CoordMode::Absolute => g[0],
                    CoordMode::Relative => from.y + g[0],
                };
                let to = DocPoint::new(from.x, y);
                (Segment::Line { from, to }, to, None)
            }
            PathCommand::CubicBezierTo { smooth } => {
                let (control1, rest) = if smooth {
                    (self.implicit_control(CurveFamily::Cubic), g)
                } else {
                    (self.resolve(mode, g[0], g[1]), &g[2..])
                };
                let control2 = self.resolve(mode, rest[0], rest[1]);
                let to = self.resolve(mode, rest[2], rest[3]);
                let segment = Segment::Cubic {
                    from,
                    control1,
                    control2,
                    to,
                };
                (segment, to, Some((CurveFamily::Cubic, control2)))
            }
            PathCommand::QuadraticBezierTo { smooth } => {
                let (control, rest) = if smooth {
                    (self.implicit_control(CurveFamily::Quadratic), g)
                } else {
                    (self.resolve(mode, g[0], g[1]), &g[2..])
                };
                let to = self.resolve(mode, rest[0], rest[1]);
                let segment = Segment::Quadratic { from, control, to };
                (segment, to, Some((CurveFamily::Quadratic, control)))
            }
            PathCommand::ArcTo => {
                let to = self.resolve(mode, g[5], g[6]);
                let arc = EllipticalArc {
                    rx: g[0],
                    ry: g[1],
                    rotation: g[2].to_radians(),
                    large_arc: g[3] != 0.0,
                    sweep: g[4] != 0.0,
                    to,
                };
                (Segment::Arc { from, arc }, to, None)
            }
            PathCommand::ClosePath => unreachable!("close path has no argument groups"),
        };
        self.current_position = to;
        self.last_control_point = control;
        segment
    }

    /// Reflection of the previous curve's last control point through the
    /// current point, or the current point itself when the previous command
    /// was not a curve of the same family.
    fn implicit_control(&self, family: CurveFamily) -> DocPoint {
        match self.last_control_point {
            Some((f, control)) if f == family => self.current_position.reflect(control),
            _ => self.current_position,
        }
    }
}

/// Splits a command's arguments into groups of its arity. Arc flags are read
/// as single `0`/`1` characters and stored as 0.0/1.0.
fn read_groups(ins: PathInstruction<'_>) -> Result<Vec<Vec<f64>>, SvgPenError> {
    let arity = ins.command.arity();
    let mut cursor = NumberCursor::new(ins.args);
    let mut groups = Vec::new();
    while !cursor.is_exhausted() {
        let mut group = Vec::with_capacity(arity);
        for slot in 0..arity {
            let value = if ins.command == PathCommand::ArcTo && (slot == 3 || slot == 4) {
                cursor.next_flag()?.map(|flag| if flag { 1.0 } else { 0.0 })
            } else {
                cursor.next_number()?
            };
            match value {
                Some(v) => group.push(v),
                None => {
                    return Err(path_error(format!(
                        "command needs groups of {arity} numbers, got {:?}",
                        ins.args.trim()
                    )));
                }
            }
        }
        groups.push(group);
    }
    if groups.is_empty() {
        return Err(path_error(format!("command is missing its {arity} arguments")));
    }
    Ok(groups)
}

fn path_error(message: String) -> SvgPenError {
    SvgPenError::attribute("path", "d", message)
}
