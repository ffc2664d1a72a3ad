//! Document AST: the flat statement list produced by the semantic pass.
//!
//! Nodes are keyed by id and merged across repeated references, edges
//! point at node ids, and groups nest statements without affecting
//! layout. Every type here is plain data with a camelCase serde shape so
//! it can cross a JSON boundary unchanged.

use crate::id::NodeId;
use crate::span::Span;
use serde::{Deserialize, Serialize};

// ─── Shapes & arrows ─────────────────────────────────────────────────────

/// Logical node shape, after keyword aliases are folded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShapeType {
    Rect,
    Circle,
    Diamond,
    Cylinder,
}

impl ShapeType {
    /// Map a shape keyword (`box`, `oval`, `db`, …) to its shape.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "rect" | "box" | "rectangle" => Some(Self::Rect),
            "circle" | "oval" | "ellipse" => Some(Self::Circle),
            "diamond" => Some(Self::Diamond),
            "cylinder" | "database" | "db" => Some(Self::Cylinder),
            _ => None,
        }
    }

    /// Canonical keyword used when emitting DSL text.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Rect => "rect",
            Self::Circle => "circle",
            Self::Diamond => "diamond",
            Self::Cylinder => "cylinder",
        }
    }

    /// Default `(width, height)` when the node declares no size.
    pub fn default_size(self) -> (f64, f64) {
        match self {
            Self::Rect => (120.0, 60.0),
            Self::Circle => (80.0, 80.0),
            Self::Diamond => (100.0, 100.0),
            Self::Cylinder => (80.0, 100.0),
        }
    }
}

/// Every shape keyword the lexer recognizes.
pub const SHAPE_KEYWORDS: [&str; 10] = [
    "rect",
    "box",
    "rectangle",
    "circle",
    "oval",
    "ellipse",
    "diamond",
    "cylinder",
    "database",
    "db",
];

/// Edge operator kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrowType {
    /// `->`
    Right,
    /// `<-`
    Left,
    /// `<->`
    Both,
    /// `-->`
    Dotted,
    /// `==>`
    Thick,
    /// `--`
    Line,
}

impl ArrowType {
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Right => "->",
            Self::Left => "<-",
            Self::Both => "<->",
            Self::Dotted => "-->",
            Self::Thick => "==>",
            Self::Line => "--",
        }
    }

    /// Arrowhead at the `from` end.
    pub fn has_start_head(self) -> bool {
        matches!(self, Self::Left | Self::Both)
    }

    /// Arrowhead at the `to` end.
    pub fn has_end_head(self) -> bool {
        !matches!(self, Self::Left | Self::Line)
    }
}

// ─── Style ───────────────────────────────────────────────────────────────

/// Sparse property bag. `None` means "unset", never a forced default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleProps {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y1: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x2: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y2: Option<f64>,
}

/// Keys accepted inside a style list, in canonical emit order.
pub const STYLE_KEYS: [&str; 11] = [
    "x",
    "y",
    "width",
    "height",
    "x1",
    "y1",
    "x2",
    "y2",
    "fill",
    "stroke",
    "strokeWidth",
];

/// Whether a style key takes a number (`true`) or a color/name (`false`).
pub fn is_numeric_key(key: &str) -> Option<bool> {
    match key {
        "fill" | "stroke" => Some(false),
        "strokeWidth" | "x" | "y" | "width" | "height" | "x1" | "y1" | "x2" | "y2" => Some(true),
        _ => None,
    }
}

impl StyleProps {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge `src` into `self`, overwriting only the keys `src` sets.
    pub fn merge(&mut self, src: &StyleProps) {
        if src.fill.is_some() {
            self.fill.clone_from(&src.fill);
        }
        if src.stroke.is_some() {
            self.stroke.clone_from(&src.stroke);
        }
        macro_rules! take_numbers {
            ($($field:ident),*) => {
                $(if src.$field.is_some() { self.$field = src.$field; })*
            };
        }
        take_numbers!(stroke_width, x, y, width, height, x1, y1, x2, y2);
    }

    /// Set a numeric key. Returns `false` for keys that are not numeric.
    pub fn set_number(&mut self, key: &str, value: f64) -> bool {
        let slot = match key {
            "strokeWidth" => &mut self.stroke_width,
            "x" => &mut self.x,
            "y" => &mut self.y,
            "width" => &mut self.width,
            "height" => &mut self.height,
            "x1" => &mut self.x1,
            "y1" => &mut self.y1,
            "x2" => &mut self.x2,
            "y2" => &mut self.y2,
            _ => return false,
        };
        *slot = Some(value);
        true
    }

    /// Set a color/name key. Returns `false` for keys that are not colors.
    pub fn set_text(&mut self, key: &str, value: &str) -> bool {
        let slot = match key {
            "fill" => &mut self.fill,
            "stroke" => &mut self.stroke,
            _ => return false,
        };
        *slot = Some(value.to_string());
        true
    }

    /// Present keys and their DSL-ready values, in canonical order.
    pub fn entries(&self) -> Vec<(&'static str, String)> {
        let mut out = Vec::new();
        let numbers = [
            ("x", self.x),
            ("y", self.y),
            ("width", self.width),
            ("height", self.height),
            ("x1", self.x1),
            ("y1", self.y1),
            ("x2", self.x2),
            ("y2", self.y2),
        ];
        for (key, value) in numbers {
            if let Some(v) = value {
                out.push((key, format_num(v)));
            }
        }
        if let Some(fill) = &self.fill {
            out.push(("fill", fill.clone()));
        }
        if let Some(stroke) = &self.stroke {
            out.push(("stroke", stroke.clone()));
        }
        if let Some(w) = self.stroke_width {
            out.push(("strokeWidth", format_num(w)));
        }
        out
    }

    /// Explicit top-left position, when both coordinates are set.
    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.x?, self.y?))
    }
}

/// Integers only: the lexer has no float literals.
pub(crate) fn format_num(n: f64) -> String {
    format!("{}", n.round() as i64)
}

// ─── Statements ──────────────────────────────────────────────────────────

/// A graph node. Ids are unique within a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<ShapeType>,
    #[serde(default, skip_serializing_if = "StyleProps::is_empty")]
    pub style: StyleProps,
}

impl Node {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            label: None,
            shape: None,
            style: StyleProps::default(),
        }
    }

    /// Merge a later occurrence: label and shape only when supplied,
    /// style key by key.
    pub fn merge(&mut self, later: &Node) {
        if later.label.is_some() {
            self.label.clone_from(&later.label);
        }
        if later.shape.is_some() {
            self.shape = later.shape;
        }
        self.style.merge(&later.style);
    }

    /// Shape to draw, defaulting to `rect`.
    pub fn shape_or_default(&self) -> ShapeType {
        self.shape.unwrap_or(ShapeType::Rect)
    }

    /// Width/height from style, falling back to the shape's default size.
    pub fn size(&self) -> (f64, f64) {
        let (w, h) = self.shape_or_default().default_size();
        (self.style.width.unwrap_or(w), self.style.height.unwrap_or(h))
    }
}

/// A directed connection between two node ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub arrow_type: ArrowType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Anchor overrides (`x1,y1,x2,y2`) plus any stroke styling from the
    /// anchor list.
    #[serde(default, skip_serializing_if = "StyleProps::is_empty")]
    pub style: StyleProps,
}

/// A named statement container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub id: NodeId,
    #[serde(default, skip_serializing_if = "StyleProps::is_empty")]
    pub style: StyleProps,
    pub children: Vec<Statement>,
}

/// `@layout: <algorithm>` directive, kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Layout {
    pub algorithm: String,
}

/// `arrow(x1: …, y1: …, x2: …, y2: …)` — an arrow not bound to nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeArrow {
    pub style: StyleProps,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Statement {
    Node(Node),
    Edge(Edge),
    Group(Group),
    Layout(Layout),
    FreeArrow(FreeArrow),
}

impl Statement {
    /// Short kind name, used for grouping in emitted text.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::Node(_) => "node",
            Statement::Edge(_) => "edge",
            Statement::Group(_) => "group",
            Statement::Layout(_) => "layout",
            Statement::FreeArrow(_) => "arrow",
        }
    }
}

// ─── Diagnostics ─────────────────────────────────────────────────────────

/// 1-based, inclusive source range of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorLocation {
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl From<Span> for ErrorLocation {
    fn from(span: Span) -> Self {
        Self {
            start_line: span.start_pos.line,
            start_column: span.start_pos.column,
            end_line: span.end_pos.line,
            end_column: span.end_pos.column,
        }
    }
}

/// A lexical or syntax diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<ErrorLocation>,
}

// ─── Document ────────────────────────────────────────────────────────────

/// Result of one parse call. `errors` non-empty implies `statements` empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub statements: Vec<Statement>,
    pub errors: Vec<ParseError>,
}

impl Document {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    /// All node statements, descending into groups, in document order.
    pub fn nodes(&self) -> Vec<&Node> {
        let mut out = Vec::new();
        walk(&self.statements, &mut |s| {
            if let Statement::Node(n) = s {
                out.push(n);
            }
        });
        out
    }

    /// All edge statements, descending into groups, in document order.
    pub fn edges(&self) -> Vec<&Edge> {
        let mut out = Vec::new();
        walk(&self.statements, &mut |s| {
            if let Statement::Edge(e) = s {
                out.push(e);
            }
        });
        out
    }

    /// All free arrows, descending into groups.
    pub fn free_arrows(&self) -> Vec<&FreeArrow> {
        let mut out = Vec::new();
        walk(&self.statements, &mut |s| {
            if let Statement::FreeArrow(a) = s {
                out.push(a);
            }
        });
        out
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes().into_iter().find(|n| n.id == id)
    }

    /// The last `@layout` directive in the document, if any.
    pub fn layout_directive(&self) -> Option<&str> {
        let mut found = None;
        walk(&self.statements, &mut |s| {
            if let Statement::Layout(l) = s {
                found = Some(l.algorithm.as_str());
            }
        });
        found
    }
}

/// Pre-order walk over statements, descending into group children.
pub fn walk<'a>(statements: &'a [Statement], f: &mut impl FnMut(&'a Statement)) {
    for statement in statements {
        f(statement);
        if let Statement::Group(g) = statement {
            walk(&g.children, f);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn shape_aliases_fold() {
        assert_eq!(ShapeType::from_keyword("box"), Some(ShapeType::Rect));
        assert_eq!(ShapeType::from_keyword("oval"), Some(ShapeType::Circle));
        assert_eq!(ShapeType::from_keyword("db"), Some(ShapeType::Cylinder));
        assert_eq!(ShapeType::from_keyword("hexagon"), None);
        for keyword in SHAPE_KEYWORDS {
            assert!(ShapeType::from_keyword(keyword).is_some(), "{keyword}");
        }
    }

    #[test]
    fn arrow_heads() {
        assert!(ArrowType::Right.has_end_head() && !ArrowType::Right.has_start_head());
        assert!(ArrowType::Left.has_start_head() && !ArrowType::Left.has_end_head());
        assert!(ArrowType::Both.has_start_head() && ArrowType::Both.has_end_head());
        assert!(ArrowType::Dotted.has_end_head());
        assert!(ArrowType::Thick.has_end_head());
    }

    #[test]
    fn style_merge_is_per_key() {
        let mut base = StyleProps {
            fill: Some("#fff".into()),
            x: Some(10.0),
            ..Default::default()
        };
        let later = StyleProps {
            fill: Some("#f00".into()),
            y: Some(20.0),
            ..Default::default()
        };
        base.merge(&later);
        assert_eq!(base.fill.as_deref(), Some("#f00"));
        assert_eq!(base.x, Some(10.0));
        assert_eq!(base.y, Some(20.0));
    }

    #[test]
    fn node_merge_keeps_unsupplied_fields() {
        let mut first = Node::new(NodeId::intern("m1"));
        first.label = Some("First".into());
        first.shape = Some(ShapeType::Circle);
        let mut later = Node::new(NodeId::intern("m1"));
        later.style.width = Some(200.0);
        first.merge(&later);
        assert_eq!(first.label.as_deref(), Some("First"));
        assert_eq!(first.shape, Some(ShapeType::Circle));
        assert_eq!(first.size(), (200.0, 80.0));
    }

    #[test]
    fn document_wire_shape_is_camel_case() {
        let doc = Document {
            statements: vec![Statement::Edge(Edge {
                from: NodeId::intern("a"),
                to: NodeId::intern("b"),
                arrow_type: ArrowType::Right,
                label: None,
                style: StyleProps::default(),
            })],
            errors: vec![ParseError {
                message: "boom".into(),
                location: Some(ErrorLocation {
                    start_line: 1,
                    start_column: 2,
                    end_line: 1,
                    end_column: 3,
                }),
            }],
        };
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "statements": [{ "type": "edge", "from": "a", "to": "b", "arrowType": "right" }],
                "errors": [{
                    "message": "boom",
                    "location": { "startLine": 1, "startColumn": 2, "endLine": 1, "endColumn": 3 }
                }]
            })
        );
    }
}
