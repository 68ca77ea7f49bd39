//! Property-based tests for the SPARQL compiler
//!
//! 1. Compilation is deterministic
//! 2. Every class gets exactly one comment and one type triple
//! 3. Every edge gets exactly one triple
//! 4. Braces always balance

use proptest::prelude::*;
use substructure_model::{
    SubstructureClass, SubstructureDatatypeProperty, SubstructureGraph,
    SubstructureObjectProperty,
};
use substructure_sparql::compile;

// ============================================================================
// Strategies
// ============================================================================

/// Arbitrary (possibly cyclic) graph: class count, object edges, datatype
/// edges, and which edges are optional.
fn graph_strategy() -> impl Strategy<Value = SubstructureGraph> {
    (1usize..10).prop_flat_map(|n| {
        (
            Just(n),
            prop::collection::vec((0..n, 0..n, any::<bool>()), 0..25),
            prop::collection::vec((0..n, any::<bool>()), 0..10),
        )
            .prop_map(|(n, edges, attrs)| build_graph(n, &edges, &attrs))
    })
}

fn class_iri(i: usize) -> String {
    format!("http://example.com/Class{i}")
}

fn build_graph(
    n: usize,
    edges: &[(usize, usize, bool)],
    attrs: &[(usize, bool)],
) -> SubstructureGraph {
    let mut classes: Vec<SubstructureClass> = (0..n)
        .map(|i| SubstructureClass::new(class_iri(i), format!("Class {i}")))
        .collect();
    for (k, &(from, to, optional)) in edges.iter().enumerate() {
        classes[from].object_properties.push(SubstructureObjectProperty {
            iri: format!("http://example.com/edge{k}"),
            label: format!("edge {k}"),
            domain: class_iri(from),
            domain_label: format!("Class {from}"),
            range: class_iri(to),
            range_label: format!("Class {to}"),
            is_optional: optional,
            filter_expression: None,
        });
    }
    for (k, &(owner, optional)) in attrs.iter().enumerate() {
        classes[owner]
            .datatype_properties
            .push(SubstructureDatatypeProperty {
                iri: format!("http://example.com/attr{k}"),
                label: format!("attr {k}"),
                domain: class_iri(owner),
                domain_label: format!("Class {owner}"),
                range_datatype_iri: "http://www.w3.org/2001/XMLSchema#string".to_string(),
                is_optional: optional,
                filter_expression: Some("{?var} != \"\"".to_string()),
            });
    }
    SubstructureGraph::from_classes(classes).expect("unique iris")
}

fn count_lines(query: &str, line: &str) -> usize {
    query.lines().filter(|l| l.trim() == line).count()
}

// ============================================================================
// Invariants
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(300))]

    #[test]
    fn compile_is_deterministic(graph in graph_strategy()) {
        let first = compile(&graph).unwrap();
        let second = compile(&graph).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn every_class_has_one_header(graph in graph_strategy()) {
        let query = compile(&graph).unwrap();
        for class in graph.classes() {
            let var = class.label.replace(' ', "_");
            prop_assert_eq!(count_lines(&query, &format!("# {}", class.label)), 1);
            prop_assert_eq!(
                count_lines(&query, &format!("?{} a <{}> .", var, class.iri)),
                1
            );
        }
    }

    #[test]
    fn every_edge_has_one_triple(graph in graph_strategy()) {
        let query = compile(&graph).unwrap();
        for class in graph.classes() {
            for property in &class.object_properties {
                let needle = format!("<{}> ", property.iri);
                prop_assert_eq!(query.matches(&needle).count(), 1);
            }
            for property in &class.datatype_properties {
                let needle = format!("<{}> ", property.iri);
                prop_assert_eq!(query.matches(&needle).count(), 1);
            }
        }
    }

    #[test]
    fn braces_balance(graph in graph_strategy()) {
        let query = compile(&graph).unwrap();
        let opens = query.matches('{').count();
        let closes = query.matches('}').count();
        prop_assert_eq!(opens, closes);
        prop_assert!(
            query.starts_with("SELECT DISTINCT *\nWHERE {\n"),
            "query does not open with the SELECT envelope: {}",
            query
        );
        prop_assert!(query.ends_with("}\n"), "query is not closed: {}", query);
    }
}
