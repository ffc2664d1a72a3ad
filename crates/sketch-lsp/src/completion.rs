//! Completions: context-aware Sketch completions.

use crate::text::SourceMap;
use sketch_core::ast::{SHAPE_KEYWORDS, STYLE_KEYS, ShapeType};
use sketch_core::cst;
use sketch_core::layout::Algorithm;
use sketch_core::parser::parse_cst;
use std::collections::BTreeSet;
use tower_lsp::lsp_types::*;

/// What the text before the cursor is waiting for.
#[derive(Debug, PartialEq, Eq)]
enum Context<'a> {
    /// Start of a statement or an edge target.
    Statement,
    /// After `@layout:`.
    Algorithm,
    /// Right after `name(`: a shape keyword comes first.
    ShapeKeyword,
    /// Inside a property list, before a key.
    StyleKey,
    /// After `key:` inside a property list.
    StyleValue(&'a str),
}

/// Compute completions at the given cursor position.
///
/// Context comes from the current line up to the cursor: open parentheses,
/// the last comma or colon, and the `@layout` directive.
pub fn compute_completions(text: &str, pos: Position) -> Vec<CompletionItem> {
    let prefix = SourceMap::new(text).line_prefix(pos);
    match classify(&prefix) {
        Context::Algorithm => algorithm_completions(),
        Context::ShapeKeyword => shape_completions(),
        Context::StyleKey => style_key_completions(),
        Context::StyleValue(key) => value_completions(key),
        Context::Statement => {
            let mut items = top_level_completions();
            items.extend(node_id_completions(text));
            items
        }
    }
}

fn classify(prefix: &str) -> Context<'_> {
    let trimmed = prefix.trim_start();
    if let Some(rest) = trimmed.strip_prefix("@layout")
        && rest.trim_start().starts_with(':')
    {
        return Context::Algorithm;
    }

    // Innermost unclosed `(` on this line.
    let mut open = None;
    for (i, ch) in prefix.char_indices() {
        match ch {
            '(' => open = Some(i),
            ')' => open = None,
            _ => {}
        }
    }
    let Some(open) = open else {
        return Context::Statement;
    };

    let inside = &prefix[open + 1..];
    let segment = inside.rsplit(',').next().unwrap_or(inside);
    if let Some((key, _)) = segment.split_once(':') {
        return Context::StyleValue(key.trim());
    }
    let owner = prefix[..open].trim_end();
    let is_free_arrow = owner.ends_with("arrow")
        && !owner[..owner.len() - "arrow".len()]
            .ends_with(|c: char| c.is_alphanumeric() || c == '_');
    if !inside.contains(',') && !is_free_arrow {
        Context::ShapeKeyword
    } else {
        Context::StyleKey
    }
}

/// Completions at the start of a statement.
fn top_level_completions() -> Vec<CompletionItem> {
    let keywords = [
        (
            "group",
            "Named container for statements",
            "group ${1:name} {\n  $0\n}",
        ),
        (
            "arrow",
            "Free arrow at fixed coordinates",
            "arrow(x1: ${1:0}, y1: ${2:0}, x2: ${3:100}, y2: ${4:0})",
        ),
        (
            "@layout",
            "Layout algorithm for the document",
            "@layout: ${1|layered,force,stress,radial,box|}",
        ),
    ];

    keywords
        .into_iter()
        .map(|(label, detail, snippet)| CompletionItem {
            label: label.to_string(),
            kind: Some(CompletionItemKind::KEYWORD),
            detail: Some(detail.to_string()),
            insert_text: Some(snippet.to_string()),
            insert_text_format: Some(InsertTextFormat::SNIPPET),
            ..Default::default()
        })
        .collect()
}

/// Every node id the document mentions, from whatever parsed.
fn node_id_completions(text: &str) -> Vec<CompletionItem> {
    let (doc, _) = parse_cst(text);
    let mut ids = BTreeSet::new();
    cst::walk(&doc.statements, &mut |statement| {
        if let cst::Statement::EdgeOrNode(chain) = statement {
            ids.extend(chain.node_refs().map(|n| n.id.value.clone()));
        }
    });
    ids.into_iter()
        .map(|id| CompletionItem {
            label: id,
            kind: Some(CompletionItemKind::VARIABLE),
            detail: Some("node".to_string()),
            ..Default::default()
        })
        .collect()
}

fn shape_completions() -> Vec<CompletionItem> {
    SHAPE_KEYWORDS
        .iter()
        .filter_map(|&keyword| {
            let shape = ShapeType::from_keyword(keyword)?;
            let (w, h) = shape.default_size();
            let detail = if shape.keyword() == keyword {
                format!("{keyword} ({w}×{h})")
            } else {
                format!("alias of {}", shape.keyword())
            };
            Some(CompletionItem {
                label: keyword.to_string(),
                kind: Some(CompletionItemKind::ENUM_MEMBER),
                detail: Some(detail),
                ..Default::default()
            })
        })
        .collect()
}

fn style_key_completions() -> Vec<CompletionItem> {
    STYLE_KEYS
        .iter()
        .map(|&key| CompletionItem {
            label: key.to_string(),
            kind: Some(CompletionItemKind::PROPERTY),
            detail: Some(style_key_detail(key).to_string()),
            insert_text: Some(format!("{key}: ")),
            ..Default::default()
        })
        .collect()
}

pub(crate) fn style_key_detail(key: &str) -> &'static str {
    match key {
        "x" | "y" => "Top-left position; set on every node to skip automatic layout",
        "width" | "height" => "Size in canvas units",
        "x1" | "y1" => "Start point override",
        "x2" | "y2" => "End point override",
        "fill" => "Fill color",
        "stroke" => "Stroke color",
        "strokeWidth" => "Stroke width",
        _ => "",
    }
}

fn algorithm_completions() -> Vec<CompletionItem> {
    Algorithm::ALL
        .iter()
        .map(|algorithm| CompletionItem {
            label: algorithm.name().to_string(),
            kind: Some(CompletionItemKind::ENUM_MEMBER),
            detail: Some(algorithm.description().to_string()),
            ..Default::default()
        })
        .collect()
}

/// Value completions after a property colon.
fn value_completions(key: &str) -> Vec<CompletionItem> {
    let values: &[(&str, &str)] = match key {
        "fill" | "stroke" => &[
            ("#6C5CE7", "Purple"),
            ("#3B82F6", "Blue"),
            ("#22C55E", "Green"),
            ("#F59E0B", "Amber"),
            ("#FF6B6B", "Red-ish"),
            ("#333333", "Dark gray"),
            ("#FFFFFF", "White"),
            ("red", "Named: red"),
            ("blue", "Named: blue"),
            ("green", "Named: green"),
            ("black", "Named: black"),
            ("white", "Named: white"),
            ("transparent", "No paint"),
        ],
        _ => return Vec::new(),
    };

    values
        .iter()
        .map(|(label, detail)| CompletionItem {
            label: label.to_string(),
            kind: Some(CompletionItemKind::COLOR),
            detail: Some(detail.to_string()),
            ..Default::default()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn labels(text: &str, line: u32, character: u32) -> Vec<String> {
        compute_completions(text, Position::new(line, character))
            .into_iter()
            .map(|i| i.label)
            .collect()
    }

    #[test]
    fn contexts() {
        assert_eq!(classify(""), Context::Statement);
        assert_eq!(classify("a -> "), Context::Statement);
        assert_eq!(classify("@layout: "), Context::Algorithm);
        assert_eq!(classify("  @layout:ra"), Context::Algorithm);
        assert_eq!(classify("api("), Context::ShapeKeyword);
        assert_eq!(classify("api(ci"), Context::ShapeKeyword);
        assert_eq!(classify("api(rect, "), Context::StyleKey);
        assert_eq!(classify("api(rect, fill: "), Context::StyleValue("fill"));
        assert_eq!(classify("arrow("), Context::StyleKey);
        assert_eq!(classify("myarrow("), Context::ShapeKeyword);
        assert_eq!(classify("a -> b("), Context::ShapeKeyword);
        assert_eq!(classify("a(rect) -> b"), Context::Statement);
    }

    #[test]
    fn top_level_returns_keywords_and_ids() {
        let text = "api -> store\n";
        let items = labels(text, 1, 0);
        assert!(items.contains(&"group".to_string()));
        assert!(items.contains(&"@layout".to_string()));
        assert!(items.contains(&"api".to_string()));
        assert!(items.contains(&"store".to_string()));
    }

    #[test]
    fn ids_survive_a_broken_line() {
        let text = "api -> store\ncache ->\n";
        let items = labels(text, 1, 9);
        assert!(items.contains(&"api".to_string()));
        assert!(items.contains(&"store".to_string()));
    }

    #[test]
    fn shape_keywords_after_paren() {
        let items = labels("api(", 0, 4);
        assert_eq!(items.len(), SHAPE_KEYWORDS.len());
        assert!(items.contains(&"cylinder".to_string()));
        assert!(items.contains(&"db".to_string()));
    }

    #[test]
    fn style_keys_after_comma() {
        let items = labels("api(rect, ", 0, 10);
        assert_eq!(items, STYLE_KEYS.map(String::from).to_vec());
    }

    #[test]
    fn colors_after_fill() {
        let items = labels("api(rect, fill: ", 0, 16);
        assert!(items.contains(&"#6C5CE7".to_string()));
        assert!(items.contains(&"transparent".to_string()));
        assert!(labels("api(rect, width: ", 0, 17).is_empty());
    }

    #[test]
    fn algorithms_after_layout() {
        let items = labels("@layout: ", 0, 9);
        assert_eq!(items, vec!["layered", "force", "stress", "radial", "box"]);
    }
}
