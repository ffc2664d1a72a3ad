pub mod ast;
pub mod builder;
pub mod compile;
pub mod cst;
pub mod decompile;
pub mod emitter;
pub mod format;
pub mod id;
pub mod layout;
pub mod lexer;
pub mod lint;
pub mod parser;
pub mod shape;
pub mod span;

pub use ast::{ArrowType, Document, ErrorLocation, ParseError, ShapeType, Statement, StyleProps};
pub use compile::{CompileError, CompileOptions, compile, compile_with};
pub use decompile::{DecompileOptions, decompile, decompile_with};
pub use emitter::emit_document;
pub use format::format_document;
pub use id::NodeId;
pub use layout::{Algorithm, BuiltinLayout, Direction, LayoutEngine, LayoutError};
pub use lint::{LintDiagnostic, LintSeverity, lint_document};
pub use parser::{parse_cst, parse_document};
pub use shape::{Shape, ShapeKind, ShapeStyle};
pub use span::{Position, Span};
