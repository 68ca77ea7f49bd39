//! Minimal RDF statement model over Sophia's parsers.
//!
//! Terms are read back from their N-Triples display form, which is all the
//! OWL extraction needs (IRIs, blank nodes, and literals with language tags).

use anyhow::{anyhow, Result};
use sophia::api::prelude::*;
use std::io::BufRead;

// ============================================================================
// Term model
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum RdfNode {
    Iri(String),
    BlankNode(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RdfLiteral {
    pub lexical: String,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum RdfObject {
    Node(RdfNode),
    Literal(RdfLiteral),
}

impl RdfObject {
    pub fn as_iri(&self) -> Option<&str> {
        match self {
            RdfObject::Node(RdfNode::Iri(iri)) => Some(iri),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RdfStatement {
    pub subject: RdfNode,
    pub predicate_iri: String,
    pub object: RdfObject,
}

/// Serializations accepted for a data specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RdfFormat {
    NTriples,
    Turtle,
    RdfXml,
}

impl RdfFormat {
    /// Pick a format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "nt" | "ntriples" => Some(RdfFormat::NTriples),
            "ttl" | "turtle" => Some(RdfFormat::Turtle),
            "rdf" | "owl" | "xml" => Some(RdfFormat::RdfXml),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RdfFormat::NTriples => "N-Triples",
            RdfFormat::Turtle => "Turtle",
            RdfFormat::RdfXml => "RDF/XML",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
struct StatementSinkError {
    message: String,
}

impl From<anyhow::Error> for StatementSinkError {
    fn from(value: anyhow::Error) -> Self {
        Self {
            message: value.to_string(),
        }
    }
}

// ============================================================================
// Term parsing (display form)
// ============================================================================

fn unescape_rdf_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

pub(crate) fn parse_term_display(term: &str) -> Result<RdfObject> {
    let s = term.trim();

    if let Some(rest) = s.strip_prefix('<').and_then(|t| t.strip_suffix('>')) {
        return Ok(RdfObject::Node(RdfNode::Iri(rest.to_string())));
    }
    if let Some(rest) = s.strip_prefix("_:") {
        return Ok(RdfObject::Node(RdfNode::BlankNode(rest.to_string())));
    }
    if !s.starts_with('"') {
        return Err(anyhow!("unsupported RDF term form: {s}"));
    }

    let mut end_quote = None;
    let mut escaped = false;
    for (i, ch) in s.char_indices().skip(1) {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' => escaped = true,
            '"' => {
                end_quote = Some(i);
                break;
            }
            _ => {}
        }
    }
    let Some(end) = end_quote else {
        return Err(anyhow!("invalid literal term (missing closing quote): {s}"));
    };

    // Datatype suffixes (`^^<...>`) carry nothing the catalog uses.
    let language = s[end + 1..]
        .trim()
        .strip_prefix('@')
        .map(|lang| lang.to_string());
    Ok(RdfObject::Literal(RdfLiteral {
        lexical: unescape_rdf_string(&s[1..end]),
        language,
    }))
}

fn parse_node_term_display(term: &str) -> Result<RdfNode> {
    match parse_term_display(term)? {
        RdfObject::Node(node) => Ok(node),
        RdfObject::Literal(_) => Err(anyhow!("expected IRI/blank node, got literal: {term}")),
    }
}

// ============================================================================
// Parsing
// ============================================================================

#[derive(Default)]
struct StatementSink {
    out: Vec<RdfStatement>,
}

impl StatementSink {
    fn push(&mut self, s: &str, p: &str, o: &str) -> std::result::Result<(), StatementSinkError> {
        let subject = parse_node_term_display(s)?;
        let RdfNode::Iri(predicate_iri) = parse_node_term_display(p)? else {
            return Ok(());
        };
        let object = parse_term_display(o)?;
        self.out.push(RdfStatement {
            subject,
            predicate_iri,
            object,
        });
        Ok(())
    }
}

/// Parse every triple of `reader`, in document order.
pub(crate) fn parse_statements<R: BufRead>(reader: R, format: RdfFormat) -> Result<Vec<RdfStatement>> {
    let mut sink = StatementSink::default();
    match format {
        RdfFormat::NTriples => {
            let mut parser = sophia::turtle::parser::nt::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| {
                    sink.push(&t.s().to_string(), &t.p().to_string(), &t.o().to_string())
                })
                .map_err(|e| anyhow!("failed to parse {}: {e}", format.name()))?;
        }
        RdfFormat::Turtle => {
            let mut parser = sophia::turtle::parser::turtle::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| {
                    sink.push(&t.s().to_string(), &t.p().to_string(), &t.o().to_string())
                })
                .map_err(|e| anyhow!("failed to parse {}: {e}", format.name()))?;
        }
        RdfFormat::RdfXml => {
            let mut parser = sophia::xml::parser::parse_bufread(reader);
            parser
                .try_for_each_triple(|t| {
                    sink.push(&t.s().to_string(), &t.p().to_string(), &t.o().to_string())
                })
                .map_err(|e| anyhow!("failed to parse {}: {e}", format.name()))?;
        }
    }
    Ok(sink.out)
}
