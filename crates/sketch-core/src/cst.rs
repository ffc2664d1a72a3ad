//! Concrete syntax tree: the shape of the parse before semantic merging.
//!
//! One type per grammar production. Every node keeps the span it was
//! parsed from so the language server can map symbols back to source.

use crate::ast::{ArrowType, ShapeType};
use crate::span::Span;

#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub value: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(value: T, span: Span) -> Self {
        Self { value, span }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Group(GroupDef),
    Layout(LayoutDef),
    FreeArrow(FreeArrowDef),
    EdgeOrNode(EdgeOrNode),
}

/// `group id (style)? { statements }`
#[derive(Debug, Clone, PartialEq)]
pub struct GroupDef {
    pub id: Spanned<String>,
    pub style: Option<Vec<StyleProp>>,
    pub body: Vec<Statement>,
    pub span: Span,
}

/// `@layout: algorithm`
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutDef {
    pub algorithm: Spanned<String>,
    pub span: Span,
}

/// `arrow(props)`
#[derive(Debug, Clone, PartialEq)]
pub struct FreeArrowDef {
    pub props: Vec<StyleProp>,
    pub span: Span,
}

/// `node (arrow node anchor? label?)*`
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeOrNode {
    pub head: NodeRef,
    pub links: Vec<Link>,
    pub span: Span,
}

/// One `arrow target anchor? label?` step of an edge chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub arrow: Spanned<ArrowType>,
    pub target: NodeRef,
    pub anchor: Option<Vec<StyleProp>>,
    pub label: Option<Spanned<String>>,
}

/// `id ('.' id)? shapeSpec? labelSpec?`
#[derive(Debug, Clone, PartialEq)]
pub struct NodeRef {
    /// Compound id, dotted parts joined (`api.db`).
    pub id: Spanned<String>,
    pub shape: Option<ShapeSpec>,
    pub label: Option<Spanned<String>>,
}

/// `(shapeType (',' props)?)`
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeSpec {
    pub shape: Spanned<ShapeType>,
    /// The keyword as written (`db`, `oval`, …).
    pub keyword: String,
    pub props: Vec<StyleProp>,
}

/// `key: value`
#[derive(Debug, Clone, PartialEq)]
pub struct StyleProp {
    pub key: Spanned<String>,
    pub value: Spanned<StyleValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StyleValue {
    Color(String),
    Number(f64),
    Ident(String),
}

impl StyleValue {
    pub fn kind_name(&self) -> &'static str {
        match self {
            StyleValue::Color(_) => "color",
            StyleValue::Number(_) => "number",
            StyleValue::Ident(_) => "name",
        }
    }
}

impl Statement {
    pub fn span(&self) -> Span {
        match self {
            Statement::Group(g) => g.span,
            Statement::Layout(l) => l.span,
            Statement::FreeArrow(a) => a.span,
            Statement::EdgeOrNode(e) => e.span,
        }
    }
}

impl EdgeOrNode {
    /// Every node reference in the chain, head first.
    pub fn node_refs(&self) -> impl Iterator<Item = &NodeRef> {
        std::iter::once(&self.head).chain(self.links.iter().map(|l| &l.target))
    }
}

/// Visit every statement, descending into group bodies.
pub fn walk<'a>(statements: &'a [Statement], f: &mut impl FnMut(&'a Statement)) {
    for statement in statements {
        f(statement);
        if let Statement::Group(g) = statement {
            walk(&g.body, f);
        }
    }
}
