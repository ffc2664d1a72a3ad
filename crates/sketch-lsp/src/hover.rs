//! Hover: show contextual information on hover.

use crate::completion::style_key_detail;
use crate::text::SourceMap;
use sketch_core::ast::{Document, STYLE_KEYS, ShapeType};
use sketch_core::compile::{CompileOptions, compile};
use sketch_core::layout::Algorithm;
use tower_lsp::lsp_types::*;

/// Compute hover information at the given position.
///
/// - Hovering a node id → shape, label, style, degree, and where the
///   configured layout puts it.
/// - Hovering a keyword, algorithm, or style key → a short description.
pub fn compute_hover(
    text: &str,
    pos: Position,
    doc: Option<&Document>,
    options: &CompileOptions,
) -> Option<Hover> {
    let offset = SourceMap::new(text).byte_offset(pos);
    let word = extract_word_at(text, offset);

    if word.is_empty() {
        return None;
    }

    if let Some(doc) = doc
        && let Some(hover) = hover_node_id(word, doc, options)
    {
        return Some(hover);
    }

    hover_keyword(word)
}

/// Extract the word around a byte offset.
fn extract_word_at(text: &str, offset: usize) -> &str {
    let offset = offset.min(text.len());
    let start = text[..offset]
        .char_indices()
        .rev()
        .find(|&(_, c)| !is_word_char(c))
        .map_or(0, |(i, c)| i + c.len_utf8());
    let end = text[offset..]
        .char_indices()
        .find(|&(_, c)| !is_word_char(c))
        .map_or(text.len(), |(i, _)| offset + i);
    &text[start..end]
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.' || c == '@'
}

/// Hover info for a node id.
fn hover_node_id(id: &str, doc: &Document, options: &CompileOptions) -> Option<Hover> {
    let nodes = doc.nodes();
    let index = nodes.iter().position(|n| n.id.as_str() == id)?;
    let node = nodes[index];
    let node_id = node.id;

    let (width, height) = node.size();
    let mut lines = vec![format!(
        "**{}** `{id}` — {width}×{height}",
        node.shape_or_default().keyword()
    )];
    if let Some(label) = &node.label {
        lines.push(format!("Label: \"{label}\""));
    }
    let style = node.style.entries();
    if !style.is_empty() {
        let props: Vec<String> = style.iter().map(|(k, v)| format!("`{k}: {v}`")).collect();
        lines.push(format!("Style: {}", props.join(" ")));
    }

    let edges = doc.edges();
    let outgoing = edges.iter().filter(|e| e.from == node_id).count();
    let incoming = edges.iter().filter(|e| e.to == node_id).count();
    lines.push(format!("Edges: {outgoing} out, {incoming} in"));

    match compile(doc, options) {
        Ok(shapes) => {
            if let Some(shape) = shapes.get(index) {
                lines.push(format!("Position: ({:.0}, {:.0})", shape.x, shape.y));
            }
        }
        Err(err) => log::debug!("no layout preview for `{id}`: {err}"),
    }

    Some(make_hover(&lines.join("\n\n")))
}

/// Hover info for keywords, algorithms, and style keys.
fn hover_keyword(word: &str) -> Option<Hover> {
    if let Some(shape) = ShapeType::from_keyword(word) {
        let (w, h) = shape.default_size();
        let drawn = match shape {
            ShapeType::Rect => "a rectangle with rounded corners",
            ShapeType::Circle => "an ellipse",
            ShapeType::Diamond => "a square-cornered rectangle",
            ShapeType::Cylinder => "a rectangle with large rounded corners",
        };
        return Some(make_hover(&format!(
            "**{}** — node shape, default size {w}×{h}.\n\nDrawn as {drawn}.",
            shape.keyword()
        )));
    }
    if let Ok(algorithm) = word.parse::<Algorithm>() {
        return Some(make_hover(&format!(
            "**{}** — layout algorithm.\n\n{}",
            algorithm.name(),
            algorithm.description()
        )));
    }
    if STYLE_KEYS.contains(&word) {
        return Some(make_hover(&format!("**{word}:** — {}", style_key_detail(word))));
    }

    let info = match word {
        "group" => {
            "**group** — Named container for statements.\n\nFormat: `group name(style) { ... }`"
        }
        "arrow" => {
            "**arrow** — Free arrow at fixed coordinates.\n\nFormat: `arrow(x1: 0, y1: 0, x2: 100, y2: 0)`"
        }
        "@layout" => {
            "**@layout** — Layout algorithm for automatic positioning.\n\nValues: `layered`, `force`, `stress`, `radial`, `box`"
        }
        _ => return None,
    };

    Some(make_hover(info))
}

fn make_hover(content: &str) -> Hover {
    Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: content.to_string(),
        }),
        range: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sketch_core::parser::parse_document;

    fn markdown(hover: Option<Hover>) -> String {
        match hover {
            Some(Hover {
                contents: HoverContents::Markup(m),
                ..
            }) => m.value,
            other => panic!("expected markdown hover, got {other:?}"),
        }
    }

    #[test]
    fn extract_word_from_text() {
        let text = "api.v2(rect, fill: #FF0000)";
        assert_eq!(extract_word_at(text, 1), "api.v2");
        assert_eq!(extract_word_at(text, 9), "rect");
        assert_eq!(extract_word_at("@layout: box", 3), "@layout");
    }

    #[test]
    fn hover_on_keyword() {
        assert!(markdown(hover_keyword("db")).starts_with("**cylinder**"));
        assert!(markdown(hover_keyword("radial")).contains("Rings"));
        assert!(markdown(hover_keyword("strokeWidth")).contains("Stroke width"));
        assert!(hover_keyword("group").is_some());
    }

    #[test]
    fn hover_on_unknown_returns_none() {
        assert!(hover_keyword("foobar").is_none());
    }

    #[test]
    fn hover_on_node_id_with_document() {
        let text = "api(rect, fill: red): \"API\"\napi -> store\ncache -> api";
        let doc = parse_document(text);
        let value = markdown(compute_hover(
            text,
            Position::new(0, 1),
            Some(&doc),
            &CompileOptions::default(),
        ));
        assert!(value.starts_with("**rect** `api` — 120×60"), "{value}");
        assert!(value.contains("Label: \"API\""));
        assert!(value.contains("`fill: red`"));
        assert!(value.contains("Edges: 1 out, 1 in"));
        assert!(value.contains("Position: ("));
    }

    #[test]
    fn node_ids_win_over_algorithm_names() {
        let text = "web -> radial";
        let doc = parse_document(text);
        let value = markdown(compute_hover(
            text,
            Position::new(0, 8),
            Some(&doc),
            &CompileOptions::default(),
        ));
        assert!(value.starts_with("**rect** `radial`"), "{value}");
    }
}
