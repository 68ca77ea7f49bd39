//! SPARQL translation of a substructure graph.
//!
//! The compiler walks the class nodes depth-first, pre-order, in stored order,
//! with an explicit visited set keyed by class IRI:
//!
//! ```text
//! for each class C (stored order):
//!     if C not visited: visit(C)
//!
//! visit(C):
//!     mark C visited
//!     "# <label>"                           (class comment)
//!     "?<var(C)> a <C.iri> ."               (type triple, exactly once per class)
//!     for each object property P of C:
//!         "?<var(C)> <P.iri> ?<var(P.range_label)> ."
//!         if P.range not visited: visit(P.range)     -- before C's next property
//!     for each datatype property P of C:
//!         "?<var(C)> <P.iri> ?<var(P.label)> ."
//! ```
//!
//! A back-edge to an already visited class still emits its triple (closing the
//! cycle in the pattern) but never re-emits the class block. Disjoint
//! components come out as consecutive blocks in stored order.
//!
//! The walk uses an explicit frame stack rather than recursion, so long chains
//! of classes cannot exhaust the call stack; the emitted order is the same as
//! the recursive formulation above.
//!
//! Query-shaping flags on property records extend the base grammar:
//! `is_optional` wraps the edge (and the range class block it discovers) in
//! `OPTIONAL { ... }`, and `filter_expression` adds a `FILTER(...)` line after
//! the edge with `{?var}` replaced by the edge's object variable. A graph with
//! no flags set compiles to exactly the base grammar.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use substructure_model::{
    SubstructureClass, SubstructureDatatypeProperty, SubstructureGraph,
    SubstructureObjectProperty,
};

/// Placeholder substituted in filter expressions.
pub const FILTER_VARIABLE_PLACEHOLDER: &str = "{?var}";

// ============================================================================
// Configuration & errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    /// Emit `SELECT DISTINCT *` rather than `SELECT *`.
    pub distinct: bool,
    /// Indentation unit for pattern lines.
    pub indent: String,
    /// Emit a `# <label>` comment before each class block.
    pub class_comments: bool,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            distinct: true,
            indent: "  ".to_string(),
            class_comments: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    /// The graph broke the range-completeness invariant. The merger never
    /// produces such graphs; this only fires on hand-built input.
    #[error("object property {property} of class {class} points at {range}, which has no class node")]
    DanglingRange {
        class: String,
        property: String,
        range: String,
    },
}

// ============================================================================
// Compiler
// ============================================================================

/// Stateless SPARQL compiler; safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct SparqlCompiler {
    config: CompileConfig,
}

impl SparqlCompiler {
    pub fn new(config: CompileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompileConfig {
        &self.config
    }

    /// Render the whole graph as one query. Either the complete query text is
    /// returned or an error; never a truncated pattern.
    pub fn compile(&self, graph: &SubstructureGraph) -> Result<String, CompileError> {
        let mut walk = Walk::new(graph, self.config.class_comments);
        for class in graph.classes() {
            if !walk.visited.contains(class.iri.as_str()) {
                walk.run_from(class)?;
            }
        }

        let query = self.render(&walk.lines);
        tracing::debug!(
            classes = graph.len(),
            lines = walk.lines.len(),
            "compiled substructure to SPARQL"
        );
        Ok(query)
    }

    fn render(&self, lines: &[Line]) -> String {
        let mut out = String::new();
        if self.config.distinct {
            out.push_str("SELECT DISTINCT *\n");
        } else {
            out.push_str("SELECT *\n");
        }
        out.push_str("WHERE {\n");
        for line in lines {
            for _ in 0..=line.depth {
                out.push_str(&self.config.indent);
            }
            out.push_str(&line.text);
            out.push('\n');
        }
        out.push_str("}\n");
        out
    }
}

/// Compile with the default configuration.
pub fn compile(graph: &SubstructureGraph) -> Result<String, CompileError> {
    SparqlCompiler::default().compile(graph)
}

/// Pattern variable name for a label: every space becomes `_`.
pub fn variable_name(label: &str) -> String {
    label.replace(' ', "_")
}

/// Substitute the placeholder in a filter template with `?<variable>`.
pub fn render_filter(expression: &str, variable: &str) -> String {
    let expression = expression.replace(FILTER_VARIABLE_PLACEHOLDER, &format!("?{variable}"));
    format!("FILTER({})", expression.trim())
}

// ============================================================================
// Traversal
// ============================================================================

struct Line {
    depth: usize,
    text: String,
}

enum Frame<'g> {
    /// A class whose object properties are processed from `next` onward.
    Class {
        class: &'g SubstructureClass,
        next: usize,
        depth: usize,
    },
    /// Closing brace of an `OPTIONAL` block opened at `depth`.
    Close { depth: usize },
}

struct Walk<'g> {
    graph: &'g SubstructureGraph,
    class_comments: bool,
    visited: HashSet<&'g str>,
    stack: Vec<Frame<'g>>,
    lines: Vec<Line>,
}

impl<'g> Walk<'g> {
    fn new(graph: &'g SubstructureGraph, class_comments: bool) -> Self {
        Self {
            graph,
            class_comments,
            visited: HashSet::with_capacity(graph.len()),
            stack: Vec::new(),
            lines: Vec::new(),
        }
    }

    fn emit(&mut self, depth: usize, text: String) {
        self.lines.push(Line { depth, text });
    }

    fn run_from(&mut self, root: &'g SubstructureClass) -> Result<(), CompileError> {
        self.enter(root, 0);
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Close { depth } => self.emit(depth, "}".to_string()),
                Frame::Class { class, next, depth } => {
                    if let Some(property) = class.object_properties.get(next) {
                        self.stack.push(Frame::Class {
                            class,
                            next: next + 1,
                            depth,
                        });
                        self.object_property(class, property, depth)?;
                    } else {
                        for property in &class.datatype_properties {
                            self.datatype_property(class, property, depth);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// First visit of a class: header lines now, properties via its frame.
    fn enter(&mut self, class: &'g SubstructureClass, depth: usize) {
        self.visited.insert(class.iri.as_str());
        if self.class_comments {
            self.emit(depth, format!("# {}", class.label));
        }
        self.emit(
            depth,
            format!("?{} a <{}> .", variable_name(&class.label), class.iri),
        );
        self.stack.push(Frame::Class {
            class,
            next: 0,
            depth,
        });
    }

    fn object_property(
        &mut self,
        class: &'g SubstructureClass,
        property: &'g SubstructureObjectProperty,
        depth: usize,
    ) -> Result<(), CompileError> {
        let object = variable_name(&property.range_label);
        let triple = format!(
            "?{} <{}> ?{} .",
            variable_name(&class.label),
            property.iri,
            object
        );

        let unvisited_range = if self.visited.contains(property.range.as_str()) {
            None
        } else {
            let range = self
                .graph
                .class(&property.range)
                .ok_or_else(|| CompileError::DanglingRange {
                    class: class.iri.clone(),
                    property: property.iri.clone(),
                    range: property.range.clone(),
                })?;
            Some(range)
        };

        let inner = if property.is_optional {
            self.emit(depth, "OPTIONAL {".to_string());
            depth + 1
        } else {
            depth
        };
        self.emit(inner, triple);
        if let Some(expression) = &property.filter_expression {
            self.emit(inner, render_filter(expression, &object));
        }

        match (unvisited_range, property.is_optional) {
            (Some(range), true) => {
                // The brace must close after the range block, so it sits
                // beneath the range's frame.
                self.stack.push(Frame::Close { depth });
                self.enter(range, inner);
            }
            (Some(range), false) => self.enter(range, inner),
            (None, true) => self.emit(depth, "}".to_string()),
            (None, false) => {}
        }
        Ok(())
    }

    fn datatype_property(
        &mut self,
        class: &SubstructureClass,
        property: &SubstructureDatatypeProperty,
        depth: usize,
    ) {
        let object = variable_name(&property.label);
        let triple = format!(
            "?{} <{}> ?{} .",
            variable_name(&class.label),
            property.iri,
            object
        );
        let inner = if property.is_optional {
            self.emit(depth, "OPTIONAL {".to_string());
            depth + 1
        } else {
            depth
        };
        self.emit(inner, triple);
        if let Some(expression) = &property.filter_expression {
            self.emit(inner, render_filter(expression, &object));
        }
        if property.is_optional {
            self.emit(depth, "}".to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variable_name_replaces_spaces() {
        assert_eq!(variable_name("Class A"), "Class_A");
        assert_eq!(variable_name("has  two"), "has__two");
        assert_eq!(variable_name("plain"), "plain");
    }

    #[test]
    fn filter_substitutes_every_placeholder() {
        assert_eq!(
            render_filter("{?var} > 100 && {?var} < 200", "price"),
            "FILTER(?price > 100 && ?price < 200)"
        );
        assert_eq!(render_filter(" {?var} = 0 ", "x"), "FILTER(?x = 0)");
    }

    #[test]
    fn empty_graph_compiles_to_empty_pattern() {
        let query = compile(&SubstructureGraph::new()).unwrap();
        assert_eq!(query, "SELECT DISTINCT *\nWHERE {\n}\n");
    }

    #[test]
    fn config_controls_envelope() {
        let mut graph = SubstructureGraph::new();
        graph.ensure_class("http://example.com/ClassA", "Class A");

        let compiler = SparqlCompiler::new(CompileConfig {
            distinct: false,
            indent: "\t".to_string(),
            class_comments: false,
        });
        assert_eq!(
            compiler.compile(&graph).unwrap(),
            "SELECT *\nWHERE {\n\t?Class_A a <http://example.com/ClassA> .\n}\n"
        );
    }

    #[test]
    fn config_json_fills_defaults() {
        let config: CompileConfig = serde_json::from_str(r#"{"distinct":false}"#).unwrap();
        assert!(!config.distinct);
        assert_eq!(config.indent, "  ");
        assert!(config.class_comments);
    }
}
