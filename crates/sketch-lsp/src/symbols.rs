//! Document symbols: outline / go-to-symbol for Sketch documents.

use crate::text::SourceMap;
use sketch_core::cst::{self, Statement};
use sketch_core::parser::parse_cst;
use sketch_core::span::Span;
use std::collections::HashSet;
use tower_lsp::lsp_types::*;

/// Compute a nested outline from the CST.
///
/// Each node id appears once, at its first mention; groups nest their
/// children. Works on partially broken documents: whatever parsed shows up.
pub fn compute_symbols(text: &str) -> Vec<DocumentSymbol> {
    let (doc, _) = parse_cst(text);
    let mut outline = Outline {
        map: SourceMap::new(text),
        seen: HashSet::new(),
    };
    outline.statements(&doc.statements)
}

struct Outline {
    map: SourceMap,
    seen: HashSet<String>,
}

impl Outline {
    fn statements(&mut self, statements: &[Statement]) -> Vec<DocumentSymbol> {
        let mut out = Vec::new();
        for statement in statements {
            match statement {
                Statement::Group(group) => {
                    let children = self.statements(&group.body);
                    let mut symbol = self.symbol(
                        format!("group {}", group.id.value),
                        SymbolKind::NAMESPACE,
                        None,
                        group.span,
                        group.id.span,
                    );
                    symbol.children = Some(children);
                    out.push(symbol);
                }
                Statement::Layout(layout) => out.push(self.symbol(
                    "@layout".to_string(),
                    SymbolKind::PROPERTY,
                    Some(layout.algorithm.value.clone()),
                    layout.span,
                    layout.algorithm.span,
                )),
                Statement::FreeArrow(arrow) => out.push(self.symbol(
                    "arrow".to_string(),
                    SymbolKind::OPERATOR,
                    None,
                    arrow.span,
                    arrow.span,
                )),
                Statement::EdgeOrNode(chain) => self.chain(chain, &mut out),
            }
        }
        out
    }

    fn chain(&mut self, chain: &cst::EdgeOrNode, out: &mut Vec<DocumentSymbol>) {
        for node in chain.node_refs() {
            if self.seen.insert(node.id.value.clone()) {
                let detail = node.shape.as_ref().map(|s| s.shape.value.keyword().to_string());
                out.push(self.symbol(
                    node.id.value.clone(),
                    SymbolKind::OBJECT,
                    detail,
                    node.id.span,
                    node.id.span,
                ));
            }
        }

        let mut previous = &chain.head;
        for link in &chain.links {
            let name = format!(
                "{} {} {}",
                previous.id.value,
                link.arrow.value.symbol(),
                link.target.id.value
            );
            let detail = link.label.as_ref().map(|l| l.value.clone());
            let span = previous.id.span.merge(link.target.id.span);
            out.push(self.symbol(name, SymbolKind::OPERATOR, detail, span, link.arrow.span));
            previous = &link.target;
        }
    }

    #[allow(deprecated)] // DocumentSymbol::deprecated is deprecated but required
    fn symbol(
        &self,
        name: String,
        kind: SymbolKind,
        detail: Option<String>,
        span: Span,
        selection: Span,
    ) -> DocumentSymbol {
        DocumentSymbol {
            name,
            detail,
            kind,
            tags: None,
            deprecated: None,
            range: self.map.range(span),
            selection_range: self.map.range(selection),
            children: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn names(symbols: &[DocumentSymbol]) -> Vec<&str> {
        symbols.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn outline_lists_nodes_once_and_edges() {
        let text = "@layout: radial\napi(rect): \"API\"\napi -> store: \"reads\"\nstore(cylinder)";
        let symbols = compute_symbols(text);
        assert_eq!(
            names(&symbols),
            vec!["@layout", "api", "store", "api -> store"]
        );
        assert_eq!(symbols[0].detail.as_deref(), Some("radial"));
        assert_eq!(symbols[1].detail.as_deref(), Some("rect"));
        assert_eq!(symbols[2].detail, None);
        assert_eq!(symbols[3].detail.as_deref(), Some("reads"));
        assert_eq!(symbols[3].range.start, Position::new(2, 0));
        assert_eq!(symbols[3].range.end, Position::new(2, 12));
    }

    #[test]
    fn groups_nest_children() {
        let text = "group backend {\n  a -> b\n}\narrow(x1: 0, y1: 0, x2: 1, y2: 1)";
        let symbols = compute_symbols(text);
        assert_eq!(names(&symbols), vec!["group backend", "arrow"]);
        assert_eq!(symbols[0].kind, SymbolKind::NAMESPACE);
        let children = symbols[0].children.as_deref().unwrap_or_default();
        assert_eq!(names(children), vec!["a", "b", "a -> b"]);
        assert_eq!(symbols[0].range.end, Position::new(2, 1));
    }

    #[test]
    fn broken_lines_do_not_hide_the_rest() {
        let symbols = compute_symbols("a -> b\nc -> ->\nd(rect)");
        assert!(names(&symbols).contains(&"d"));
        assert!(names(&symbols).contains(&"a -> b"));
    }
}
