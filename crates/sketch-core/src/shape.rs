//! Canvas shape model: the output of compile and the input of decompile.
//!
//! A `Shape` carries an absolute position, a rotation, stroke/fill styling,
//! and a closed set of kinds. Point lists on lines, arrows, and freehand
//! strokes are relative to the shape's own `x`/`y`.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use uuid::Uuid;

/// Unique identifier for a shape on the canvas.
pub type ShapeId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// 0 when `p` is inside (or on) the box, else the distance to the
    /// nearest edge. Negative sizes are normalized first.
    pub fn distance_to(&self, p: Point) -> f64 {
        let (x0, x1) = ordered(self.x, self.x + self.width);
        let (y0, y1) = ordered(self.y, self.y + self.height);
        let dx = (x0 - p.x).max(0.0).max(p.x - x1);
        let dy = (y0 - p.y).max(0.0).max(p.y - y1);
        dx.hypot(dy)
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Stroke and fill shared by every kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ShapeStyle {
    pub stroke: String,
    pub fill: String,
    pub stroke_width: f64,
    pub opacity: f64,
    pub dashed: bool,
}

pub const DEFAULT_STROKE: &str = "#000000";
pub const DEFAULT_FILL: &str = "transparent";
pub const DEFAULT_STROKE_WIDTH: f64 = 2.0;

impl Default for ShapeStyle {
    fn default() -> Self {
        Self {
            stroke: DEFAULT_STROKE.to_string(),
            fill: DEFAULT_FILL.to_string(),
            stroke_width: DEFAULT_STROKE_WIDTH,
            opacity: 1.0,
            dashed: false,
        }
    }
}

pub type Points = SmallVec<[Point; 4]>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum ShapeKind {
    Rectangle {
        width: f64,
        height: f64,
        #[serde(default)]
        corner_radius: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    Ellipse {
        width: f64,
        height: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    Line {
        points: Points,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_connection: Option<ShapeId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_connection: Option<ShapeId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    Arrow {
        points: Points,
        #[serde(default)]
        start_arrow: bool,
        #[serde(default = "default_true")]
        end_arrow: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        start_connection: Option<ShapeId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end_connection: Option<ShapeId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    Freehand {
        points: Vec<Point>,
    },
    Text {
        text: String,
        #[serde(default = "default_font_size")]
        font_size: f64,
    },
}

fn default_true() -> bool {
    true
}

fn default_font_size() -> f64 {
    16.0
}

/// One object on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub id: ShapeId,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default)]
    pub style: ShapeStyle,
    #[serde(flatten)]
    pub kind: ShapeKind,
}

impl Shape {
    /// A new shape with a fresh id and default style.
    pub fn new(x: f64, y: f64, kind: ShapeKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            x,
            y,
            rotation: 0.0,
            style: ShapeStyle::default(),
            kind,
        }
    }

    /// A line or arrow through absolute `points`. The shape is positioned
    /// at the first point; stored points are relative to it.
    pub fn connector(absolute: &[Point], arrow: Option<(bool, bool)>) -> Self {
        let origin = absolute.first().copied().unwrap_or_default();
        let points: Points = absolute
            .iter()
            .map(|p| Point::new(p.x - origin.x, p.y - origin.y))
            .collect();
        let kind = match arrow {
            Some((start_arrow, end_arrow)) => ShapeKind::Arrow {
                points,
                start_arrow,
                end_arrow,
                start_connection: None,
                end_connection: None,
                label: None,
            },
            None => ShapeKind::Line {
                points,
                start_connection: None,
                end_connection: None,
                label: None,
            },
        };
        Self::new(origin.x, origin.y, kind)
    }

    /// Rectangles and ellipses can stand for graph nodes.
    pub fn is_node_capable(&self) -> bool {
        matches!(self.kind, ShapeKind::Rectangle { .. } | ShapeKind::Ellipse { .. })
    }

    pub fn is_connector(&self) -> bool {
        matches!(self.kind, ShapeKind::Line { .. } | ShapeKind::Arrow { .. })
    }

    /// Bounding box of a rectangle or ellipse.
    pub fn bounds(&self) -> Option<Bounds> {
        match self.kind {
            ShapeKind::Rectangle { width, height, .. } | ShapeKind::Ellipse { width, height, .. } => {
                Some(Bounds {
                    x: self.x,
                    y: self.y,
                    width,
                    height,
                })
            }
            _ => None,
        }
    }

    /// Absolute first and last point of a line or arrow. `None` for other
    /// kinds and for connectors with fewer than two points.
    pub fn endpoints(&self) -> Option<(Point, Point)> {
        let points = match &self.kind {
            ShapeKind::Line { points, .. } | ShapeKind::Arrow { points, .. } => points,
            _ => return None,
        };
        if points.len() < 2 {
            return None;
        }
        let first = points.first()?;
        let last = points.last()?;
        Some((
            Point::new(self.x + first.x, self.y + first.y),
            Point::new(self.x + last.x, self.y + last.y),
        ))
    }

    /// Absolute point list of a line, arrow, or freehand stroke.
    pub fn absolute_points(&self) -> Vec<Point> {
        let points: &[Point] = match &self.kind {
            ShapeKind::Line { points, .. } | ShapeKind::Arrow { points, .. } => points.as_slice(),
            ShapeKind::Freehand { points } => points.as_slice(),
            _ => &[],
        };
        points
            .iter()
            .map(|p| Point::new(self.x + p.x, self.y + p.y))
            .collect()
    }

    pub fn label(&self) -> Option<&str> {
        match &self.kind {
            ShapeKind::Rectangle { label, .. }
            | ShapeKind::Ellipse { label, .. }
            | ShapeKind::Line { label, .. }
            | ShapeKind::Arrow { label, .. } => label.as_deref(),
            ShapeKind::Text { text, .. } => Some(text.as_str()),
            ShapeKind::Freehand { .. } => None,
        }
    }

    pub fn set_label(&mut self, text: Option<String>) {
        match &mut self.kind {
            ShapeKind::Rectangle { label, .. }
            | ShapeKind::Ellipse { label, .. }
            | ShapeKind::Line { label, .. }
            | ShapeKind::Arrow { label, .. } => *label = text,
            ShapeKind::Text { .. } | ShapeKind::Freehand { .. } => {}
        }
    }

    /// Record which shapes a connector is attached to.
    pub fn connect(&mut self, start: ShapeId, end: ShapeId) {
        if let ShapeKind::Line {
            start_connection,
            end_connection,
            ..
        }
        | ShapeKind::Arrow {
            start_connection,
            end_connection,
            ..
        } = &mut self.kind
        {
            *start_connection = Some(start);
            *end_connection = Some(end);
        }
    }
}
