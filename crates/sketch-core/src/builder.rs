//! Semantic pass: CST → flat Document statements.
//!
//! Node references are merged into a per-call registry keyed by id. Edge
//! chains emit only edges; standalone references emit a node statement at
//! their first declaration. Nodes seen only through edges are synthesized
//! and inserted at the front of the top-level list, each at position 0.

use crate::ast::{Edge, FreeArrow, Group, Layout, Node, Statement, StyleProps};
use crate::cst::{self, NodeRef, StyleProp, StyleValue};
use crate::id::NodeId;
use std::collections::{HashMap, HashSet};

/// Build AST statements from a parsed CST.
pub fn build_statements(doc: &cst::Document) -> Vec<Statement> {
    let mut builder = AstBuilder::default();
    let mut statements = builder.collect(&doc.statements);
    builder.finish(&mut statements);
    statements
}

/// Convert a CST style list into a property bag. Unknown keys and
/// values of the wrong kind are dropped.
pub fn style_from_props(props: &[StyleProp]) -> StyleProps {
    let mut style = StyleProps::default();
    for prop in props {
        let key = prop.key.value.as_str();
        let accepted = match &prop.value.value {
            StyleValue::Number(n) => style.set_number(key, *n),
            StyleValue::Color(text) | StyleValue::Ident(text) => style.set_text(key, text),
        };
        if !accepted {
            log::debug!("ignoring style property `{key}`");
        }
    }
    style
}

#[derive(Default)]
struct AstBuilder {
    /// Registry in first-reference order.
    nodes: Vec<Node>,
    slots: HashMap<NodeId, usize>,
    /// Ids that already have a Node statement somewhere in the tree.
    declared: HashSet<NodeId>,
}

impl AstBuilder {
    fn collect(&mut self, statements: &[cst::Statement]) -> Vec<Statement> {
        let mut out = Vec::new();
        for statement in statements {
            match statement {
                cst::Statement::Group(g) => {
                    let children = self.collect(&g.body);
                    out.push(Statement::Group(Group {
                        id: NodeId::intern(&g.id.value),
                        style: g.style.as_deref().map(style_from_props).unwrap_or_default(),
                        children,
                    }));
                }
                cst::Statement::Layout(l) => out.push(Statement::Layout(Layout {
                    algorithm: l.algorithm.value.clone(),
                })),
                cst::Statement::FreeArrow(a) => out.push(Statement::FreeArrow(FreeArrow {
                    style: style_from_props(&a.props),
                })),
                cst::Statement::EdgeOrNode(chain) => self.edge_or_node(chain, &mut out),
            }
        }
        out
    }

    fn edge_or_node(&mut self, chain: &cst::EdgeOrNode, out: &mut Vec<Statement>) {
        let mut previous = self.register(&chain.head);

        if chain.links.is_empty() {
            if self.declared.insert(previous) {
                // Placeholder; filled with the merged record in `finish`.
                out.push(Statement::Node(Node::new(previous)));
            }
            return;
        }

        for link in &chain.links {
            let current = self.register(&link.target);
            out.push(Statement::Edge(Edge {
                from: previous,
                to: current,
                arrow_type: link.arrow.value,
                label: link.label.as_ref().map(|l| l.value.clone()),
                style: link.anchor.as_deref().map(style_from_props).unwrap_or_default(),
            }));
            previous = current;
        }
    }

    fn register(&mut self, node_ref: &NodeRef) -> NodeId {
        let id = NodeId::intern(&node_ref.id.value);
        let mut occurrence = Node::new(id);
        occurrence.label = node_ref.label.as_ref().map(|l| l.value.clone());
        if let Some(spec) = &node_ref.shape {
            occurrence.shape = Some(spec.shape.value);
            occurrence.style = style_from_props(&spec.props);
        }

        match self.slots.get(&id) {
            Some(&slot) => self.nodes[slot].merge(&occurrence),
            None => {
                self.slots.insert(id, self.nodes.len());
                self.nodes.push(occurrence);
            }
        }
        id
    }

    fn finish(&self, statements: &mut Vec<Statement>) {
        self.fill_declared(statements);
        for node in &self.nodes {
            if !self.declared.contains(&node.id) {
                statements.insert(0, Statement::Node(node.clone()));
            }
        }
    }

    fn fill_declared(&self, statements: &mut [Statement]) {
        for statement in statements {
            match statement {
                Statement::Node(node) => {
                    if let Some(&slot) = self.slots.get(&node.id) {
                        *node = self.nodes[slot].clone();
                    }
                }
                Statement::Group(group) => self.fill_declared(&mut group.children),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::{ArrowType, ShapeType, Statement};
    use crate::id::NodeId;
    use crate::parser::parse_document;
    use pretty_assertions::assert_eq;

    fn ids(statements: &[Statement]) -> Vec<String> {
        statements
            .iter()
            .map(|s| match s {
                Statement::Node(n) => format!("node {}", n.id),
                Statement::Edge(e) => format!("edge {}->{}", e.from, e.to),
                Statement::Group(g) => format!("group {}", g.id),
                Statement::Layout(l) => format!("layout {}", l.algorithm),
                Statement::FreeArrow(_) => "arrow".to_string(),
            })
            .collect()
    }

    #[test]
    fn single_edge_synthesizes_nodes_in_front() {
        let doc = parse_document("a -> b");
        assert_eq!(ids(&doc.statements), vec!["node b", "node a", "edge a->b"]);
        let edge = doc.edges()[0];
        assert_eq!(edge.arrow_type, ArrowType::Right);
        assert!(doc.nodes().iter().all(|n| n.label.is_none() && n.shape.is_none()));
    }

    #[test]
    fn chain_desugars_into_pairwise_edges() {
        let doc = parse_document("a -> b <-> c");
        assert_eq!(
            ids(&doc.statements),
            vec!["node c", "node b", "node a", "edge a->b", "edge b->c"]
        );
        assert_eq!(doc.edges()[1].arrow_type, ArrowType::Both);
    }

    #[test]
    fn label_attaches_to_specific_edge() {
        let doc = parse_document(r#"a -> b: "one" -> c: "two""#);
        let labels: Vec<_> = doc.edges().iter().map(|e| e.label.clone()).collect();
        assert_eq!(labels, vec![Some("one".into()), Some("two".into())]);
        assert!(doc.node(NodeId::intern("b")).unwrap().label.is_none());
    }

    #[test]
    fn repeated_reference_merges_by_key() {
        let doc = parse_document(
            "api(rect, fill: red, width: 200): \"API\"\napi(circle, stroke: blue)\napi -> store",
        );
        let api = doc.node(NodeId::intern("api")).unwrap();
        assert_eq!(api.shape, Some(ShapeType::Circle));
        assert_eq!(api.label.as_deref(), Some("API"));
        assert_eq!(api.style.fill.as_deref(), Some("red"));
        assert_eq!(api.style.stroke.as_deref(), Some("blue"));
        assert_eq!(api.style.width, Some(200.0));
        // api declared once; store synthesized in front.
        assert_eq!(ids(&doc.statements), vec!["node store", "node api", "edge api->store"]);
    }

    #[test]
    fn later_edge_reference_updates_declared_node() {
        let doc = parse_document("a\nx -> a(db): \"Store\"");
        let a = doc.node(NodeId::intern("a")).unwrap();
        assert_eq!(a.shape, Some(ShapeType::Cylinder));
        assert_eq!(a.label.as_deref(), Some("Store"));
        assert_eq!(ids(&doc.statements), vec!["node x", "node a", "edge x->a"]);
    }

    #[test]
    fn groups_nest_and_share_registry() {
        let doc = parse_document("group g(fill: #eee) {\n  a(rect)\n  a -> b\n}\nb -> a");
        assert_eq!(ids(&doc.statements), vec!["node b", "group g", "edge b->a"]);
        let Statement::Group(g) = &doc.statements[1] else {
            panic!("expected group");
        };
        assert_eq!(g.style.fill.as_deref(), Some("#eee"));
        assert_eq!(ids(&g.children), vec!["node a", "edge a->b"]);
    }

    #[test]
    fn anchors_unknown_keys_and_mistyped_values() {
        let doc = parse_document("a -> b(x1: 1, y1: 2, bogus: 3, fill: 4)");
        let style = &doc.edges()[0].style;
        assert_eq!((style.x1, style.y1), (Some(1.0), Some(2.0)));
        assert!(style.fill.is_none());
    }

    #[test]
    fn free_arrow_and_layout() {
        let doc = parse_document("@layout: box\narrow(x1: 0, y1: 0, x2: 10, y2: 20, stroke: red)");
        assert_eq!(doc.layout_directive(), Some("box"));
        let arrow = doc.free_arrows()[0];
        assert_eq!(arrow.style.y2, Some(20.0));
        assert_eq!(arrow.style.stroke.as_deref(), Some("red"));
    }

    #[test]
    fn fresh_registry_per_parse() {
        let first = parse_document("a(circle)");
        let second = parse_document("a");
        assert_eq!(first.nodes()[0].shape, Some(ShapeType::Circle));
        assert_eq!(second.nodes()[0].shape, None);
    }
}
