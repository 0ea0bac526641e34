//! Renders a compiled graph as Graphviz DOT or a plain-text step list.

use std::fmt::Debug;

use crate::graph::compiled::CompiledStateGraph;
use crate::graph::conditional::NextEntry;
use crate::graph::END;

/// Renders `graph` as a Graphviz `digraph`. Conditional edges are dashed.
pub fn generate_dot<S>(graph: &CompiledStateGraph<S>) -> String
where
    S: Clone + Send + Sync + Debug + 'static,
{
    let mut out = String::from("digraph {\n");
    out.push_str("    __start__ [shape=Mdiamond];\n");
    out.push_str("    __end__ [shape=Mdiamond];\n");
    out.push_str(&format!("    __start__ -> \"{}\";\n", graph.first_node_id));

    for id in graph.nodes.keys() {
        out.push_str(&format!("    \"{id}\" [shape=box];\n"));
    }

    for (from, entry) in &graph.next_map {
        match entry {
            NextEntry::Unconditional(to) => {
                let target = if to == END { "__end__".to_string() } else { format!("\"{to}\"") };
                out.push_str(&format!("    \"{from}\" -> {target};\n"));
            }
            NextEntry::Conditional(router) => {
                if let Some(path_map) = &router.path_map {
                    for target in path_map.values() {
                        let t = if target == END { "__end__".to_string() } else { format!("\"{target}\"") };
                        out.push_str(&format!("    \"{from}\" -> {t} [style=dashed];\n"));
                    }
                } else {
                    out.push_str(&format!("    \"{from}\" -> __end__ [style=dashed, label=\"conditional\"];\n"));
                }
            }
        }
    }

    out.push_str("}\n");
    out
}

/// Renders `graph` as a human-readable linear step list, following
/// `edge_order` (the chain as declared; conditional branches render as a
/// single `*conditional*` marker rather than every possible path).
pub fn generate_text<S>(graph: &CompiledStateGraph<S>) -> String
where
    S: Clone + Send + Sync + Debug + 'static,
{
    let mut lines = vec!["START".to_string()];
    for id in &graph.edge_order {
        lines.push(id.clone());
        if matches!(graph.next_map.get(id), Some(NextEntry::Conditional(_))) {
            lines.push("*conditional*".to_string());
        }
    }
    lines.push("END".to_string());
    lines.join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use crate::graph::node::Node;
    use crate::graph::{Next, StateGraph};
    use async_trait::async_trait;
    use std::sync::Arc;

    #[derive(Clone, Debug)]
    struct DummyState;

    struct DummyNode(&'static str);

    #[async_trait]
    impl Node<DummyState> for DummyNode {
        fn id(&self) -> &str {
            self.0
        }
        async fn run(&self, state: DummyState) -> Result<(DummyState, Next), AgentError> {
            Ok((state, Next::Continue))
        }
    }

    #[test]
    fn generate_text_follows_linear_chain() {
        let mut graph = StateGraph::<DummyState>::new();
        graph.add_node("a", Arc::new(DummyNode("a")));
        graph.add_node("b", Arc::new(DummyNode("b")));
        graph.add_edge(crate::graph::START, "a");
        graph.add_edge("a", "b");
        graph.add_edge("b", END);
        let compiled = graph.compile().unwrap();

        assert_eq!(generate_text(&compiled), "START -> a -> b -> END");
    }

    #[test]
    fn generate_dot_contains_all_node_ids() {
        let mut graph = StateGraph::<DummyState>::new();
        graph.add_node("a", Arc::new(DummyNode("a")));
        graph.add_edge(crate::graph::START, "a");
        graph.add_edge("a", END);
        let compiled = graph.compile().unwrap();

        let dot = generate_dot(&compiled);
        assert!(dot.starts_with("digraph {"));
        assert!(dot.contains("\"a\""));
    }
}
