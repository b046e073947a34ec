//! Line-oriented replay scripts.
//!
//! One plist per line; blank lines and `;` comments are skipped.
//!
//! ```text
//! (:type :surface :width 640 :height 480 :mirror t)
//! (:type :target :id "ok" :shape :rect :x 100 :y 100 :width 50 :height 50 :dwell-ms 2500 :policy :landmark :landmark 8)
//! (:type :target :id "room" :shape :circle :cx 178 :cy 386 :radius 50)
//! (:type :target :id "btn" :shape :button :left 80 :top 286 :width 100 :height 100 :canvas (0 0 640 480))
//! (:type :frame :t 0 :hands ((x0 y0 z0 x1 y1 z1 ...) ...))
//! (:type :frame :t 50 :pointer (0.2 0.7))
//! (:type :dwell :id "ok" :dwell-ms 1000)
//! (:type :unregister :id "ok")
//! (:type :reset)
//! (:type :unavailable :reason "camera permission denied")
//! ```
//!
//! `:pointer` is shorthand for a hand whose 21 landmarks all sit at one
//! normalized point.

use std::path::Path;

use lexpr::Value;
use tracing::{debug, info, warn};

use crate::error::InteractionError;
use crate::interaction::engine::{InteractionEngine, TargetId, TargetSpec};
use crate::interaction::hit_test::{HitPolicy, Shape};
use crate::interaction::landmarks::{HandLandmark, HandLandmarkSet, Landmark, LandmarkFrame};
use crate::interaction::mapper::{DisplayRect, Surface};
use crate::sexp::{
    escape_string, format_event, get_bool, get_float, get_int, get_keyword, get_string, get_value,
    list_items, number_list,
};

/// Surface used by frames that arrive before any `:surface` line.
pub const DEFAULT_SURFACE: Surface = Surface::new(640.0, 480.0, false);

// ── Commands ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Surface(Surface),
    /// Target whose dwell falls back to the config default when `None`.
    Target {
        id: String,
        shape: ShapeSpec,
        dwell_ms: Option<f64>,
        policy: HitPolicy,
    },
    Frame {
        timestamp_ms: f64,
        frame: LandmarkFrame,
    },
    SetDwell {
        id: String,
        dwell_ms: f64,
    },
    Unregister(String),
    Reset,
    Unavailable(String),
}

/// Target geometry as written in the script.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShapeSpec {
    /// Already in surface pixels.
    Surface(Shape),
    /// Round button laid out in display pixels, scaled onto the surface
    /// current at registration time.
    Display {
        element: DisplayRect,
        canvas: DisplayRect,
    },
}

impl ShapeSpec {
    pub fn resolve(&self, surface: &Surface) -> Result<Shape, String> {
        match self {
            Self::Surface(shape) => Ok(*shape),
            Self::Display { element, canvas } => surface
                .scale_display_rect(element, canvas)
                .map(|rect| Shape::inscribed_circle(&rect))
                .ok_or_else(|| "canvas has no displayed area".to_string()),
        }
    }
}

/// A parsed script: commands tagged with their 1-based source line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Script {
    commands: Vec<(usize, Command)>,
}

impl Script {
    pub fn parse(source: &str) -> Result<Self, InteractionError> {
        let mut commands = Vec::new();
        for (index, raw) in source.lines().enumerate() {
            let line = index + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with(';') {
                continue;
            }
            let command = parse_command(trimmed).map_err(|reason| InteractionError::Script {
                line,
                reason,
            })?;
            commands.push((line, command));
        }
        debug!("Parsed script: {} commands", commands.len());
        Ok(Self { commands })
    }

    pub fn load(path: &Path) -> Result<Self, InteractionError> {
        let source = std::fs::read_to_string(path).map_err(|e| InteractionError::Script {
            line: 0,
            reason: format!("cannot read {}: {e}", path.display()),
        })?;
        Self::parse(&source)
    }

    pub fn commands(&self) -> &[(usize, Command)] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

// ── Parsing ────────────────────────────────────────────────

fn parse_command(line: &str) -> Result<Command, String> {
    let value = lexpr::from_str(line).map_err(|e| format!("malformed s-expression: {e}"))?;
    let kind = get_keyword(&value, "type").ok_or("missing :type")?;

    match kind.as_str() {
        "surface" => {
            let width = require_float(&value, "width")? as f32;
            let height = require_float(&value, "height")? as f32;
            if width <= 0.0 || height <= 0.0 {
                return Err(format!("surface must have positive size, got {width}x{height}"));
            }
            let mirror = get_bool(&value, "mirror").unwrap_or(false);
            Ok(Command::Surface(Surface::new(width, height, mirror)))
        }
        "target" => Ok(Command::Target {
            id: require_string(&value, "id")?,
            shape: parse_shape(&value)?,
            dwell_ms: match get_value(&value, "dwell-ms") {
                Some(_) => Some(require_float(&value, "dwell-ms")?),
                None => None,
            },
            policy: parse_policy(&value)?,
        }),
        "frame" => {
            let timestamp_ms = require_float(&value, "t")?;
            Ok(Command::Frame {
                timestamp_ms,
                frame: parse_frame(&value)?,
            })
        }
        "dwell" => Ok(Command::SetDwell {
            id: require_string(&value, "id")?,
            dwell_ms: require_float(&value, "dwell-ms")?,
        }),
        "unregister" => Ok(Command::Unregister(require_string(&value, "id")?)),
        "reset" => Ok(Command::Reset),
        "unavailable" => Ok(Command::Unavailable(
            get_string(&value, "reason").unwrap_or_else(|| "unavailable".to_string()),
        )),
        other => Err(format!("unknown command type :{other}")),
    }
}

fn require_float(value: &Value, key: &str) -> Result<f64, String> {
    match get_float(value, key) {
        Some(v) if v.is_finite() => Ok(v),
        Some(_) | None if get_value(value, key).is_some() => {
            Err(format!(":{key} must be a finite number"))
        }
        _ => Err(format!("missing :{key}")),
    }
}

fn require_string(value: &Value, key: &str) -> Result<String, String> {
    get_string(value, key).ok_or_else(|| format!("missing :{key}"))
}

fn parse_shape(value: &Value) -> Result<ShapeSpec, String> {
    let kind = get_keyword(value, "shape").ok_or("missing :shape")?;
    match kind.as_str() {
        "circle" => Ok(ShapeSpec::Surface(Shape::circle(
            require_float(value, "cx")? as f32,
            require_float(value, "cy")? as f32,
            require_float(value, "radius")? as f32,
        ))),
        "rect" => Ok(ShapeSpec::Surface(Shape::rect(
            require_float(value, "x")? as f32,
            require_float(value, "y")? as f32,
            require_float(value, "width")? as f32,
            require_float(value, "height")? as f32,
        ))),
        "button" => {
            let element = DisplayRect::new(
                require_float(value, "left")? as f32,
                require_float(value, "top")? as f32,
                require_float(value, "width")? as f32,
                require_float(value, "height")? as f32,
            );
            match get_value(value, "canvas") {
                Some(canvas) => match number_list(canvas).as_slice() {
                    [left, top, width, height] => Ok(ShapeSpec::Display {
                        element,
                        canvas: DisplayRect::new(
                            *left as f32,
                            *top as f32,
                            *width as f32,
                            *height as f32,
                        ),
                    }),
                    _ => Err(":canvas must be (left top width height)".to_string()),
                },
                None => Ok(ShapeSpec::Surface(Shape::inscribed_circle(&element))),
            }
        }
        other => Err(format!("unknown shape :{other}")),
    }
}

fn parse_policy(value: &Value) -> Result<HitPolicy, String> {
    let kind = get_keyword(value, "policy").unwrap_or_else(|| "any".to_string());
    match kind.as_str() {
        "any" => Ok(HitPolicy::AnyLandmark),
        "fingertip" => Ok(HitPolicy::fingertip()),
        "landmark" => {
            if let Some(index) = get_int(value, "landmark") {
                return usize::try_from(index)
                    .map(HitPolicy::DesignatedLandmark)
                    .map_err(|_| format!("landmark index {index} out of range"));
            }
            let name = get_keyword(value, "landmark").ok_or("missing :landmark")?;
            HandLandmark::from_str(&name)
                .map(|lm| HitPolicy::DesignatedLandmark(lm.index()))
                .ok_or_else(|| format!("unknown landmark {name}"))
        }
        other => Err(format!("unknown policy :{other}")),
    }
}

fn parse_frame(value: &Value) -> Result<LandmarkFrame, String> {
    if let Some(pointer) = get_value(value, "pointer") {
        return match number_list(pointer).as_slice() {
            [x, y] | [x, y, _] => Ok(LandmarkFrame::new(vec![HandLandmarkSet::uniform(
                Landmark::new(*x as f32, *y as f32, 0.0),
            )])),
            _ => Err(":pointer must be (x y)".to_string()),
        };
    }

    let Some(hands) = get_value(value, "hands") else {
        return Ok(LandmarkFrame::empty());
    };
    let mut raw_hands = Vec::new();
    for hand in list_items(hands) {
        let coords = number_list(hand);
        if coords.len() % 3 != 0 {
            return Err(format!(
                "hand coordinates must come in (x y z) triples, got {} numbers",
                coords.len()
            ));
        }
        raw_hands.push(
            coords
                .chunks_exact(3)
                .map(|c| Landmark::new(c[0] as f32, c[1] as f32, c[2] as f32))
                .collect(),
        );
    }
    Ok(LandmarkFrame::from_raw(raw_hands))
}

// ── Running ────────────────────────────────────────────────

/// Tracks the surface and source state across a script run.
#[derive(Debug, Clone)]
pub struct Replay {
    surface: Surface,
    unavailable: bool,
    last_timestamp_ms: Option<f64>,
}

impl Default for Replay {
    fn default() -> Self {
        Self {
            surface: DEFAULT_SURFACE,
            unavailable: false,
            last_timestamp_ms: None,
        }
    }
}

impl Replay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn surface(&self) -> Surface {
        self.surface
    }

    /// Execute every command, returning one output line per emitted event.
    pub fn run(
        &mut self,
        script: &Script,
        engine: &mut InteractionEngine,
    ) -> Result<Vec<String>, InteractionError> {
        let mut output = Vec::new();
        for (line, command) in script.commands() {
            self.step(*line, command, engine, &mut output)?;
        }
        info!(
            "Replay finished: {} commands, {} output lines",
            script.len(),
            output.len()
        );
        Ok(output)
    }

    fn step(
        &mut self,
        line: usize,
        command: &Command,
        engine: &mut InteractionEngine,
        output: &mut Vec<String>,
    ) -> Result<(), InteractionError> {
        let at_line = |err: InteractionError| InteractionError::Script {
            line,
            reason: err.to_string(),
        };

        match command {
            Command::Surface(surface) => {
                debug!(
                    "Surface {}x{} mirror={}",
                    surface.width, surface.height, surface.mirror
                );
                self.surface = *surface;
            }
            Command::Target {
                id,
                shape,
                dwell_ms,
                policy,
            } => {
                let shape = shape.resolve(&self.surface).map_err(|reason| {
                    at_line(InteractionError::InvalidTarget {
                        id: id.clone(),
                        reason,
                    })
                })?;
                let dwell_ms = dwell_ms.unwrap_or(engine.config().default_dwell_ms);
                engine
                    .register_target(TargetSpec::new(id.clone(), shape, dwell_ms, *policy))
                    .map_err(at_line)?;
            }
            Command::Frame {
                timestamp_ms,
                frame,
            } => {
                if self.unavailable {
                    debug!("Skipping frame at {:.0}ms: source unavailable", timestamp_ms);
                    return Ok(());
                }
                if let Some(last) = self.last_timestamp_ms {
                    if *timestamp_ms < last {
                        warn!(
                            "Dropping frame at {:.0}ms (line {}): timestamp went backwards (last {:.0}ms)",
                            timestamp_ms, line, last
                        );
                        return Ok(());
                    }
                }
                self.last_timestamp_ms = Some(*timestamp_ms);
                let mut frame = frame.clone();
                frame.truncate(engine.config().source.max_num_hands);
                for event in engine.process_frame(&frame, *timestamp_ms, self.surface) {
                    output.push(event.to_sexp());
                }
            }
            Command::SetDwell { id, dwell_ms } => {
                engine
                    .set_required_dwell(&TargetId::new(id.as_str()), *dwell_ms)
                    .map_err(at_line)?;
            }
            Command::Unregister(id) => {
                engine.unregister_target(&TargetId::new(id.as_str()));
            }
            Command::Reset => engine.reset(),
            Command::Unavailable(reason) => {
                if !self.unavailable {
                    warn!("Landmark source unavailable: {}", reason);
                    self.unavailable = true;
                    let reason = format!("\"{}\"", escape_string(reason));
                    output.push(format_event("source-unavailable", &[("reason", &reason)]));
                }
            }
        }
        Ok(())
    }
}

/// Parse and run `source` against `engine` in one go.
pub fn run_script(
    source: &str,
    engine: &mut InteractionEngine,
) -> Result<Vec<String>, InteractionError> {
    let script = Script::parse(source)?;
    Replay::new().run(&script, engine)
}
