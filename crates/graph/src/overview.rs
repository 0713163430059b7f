use crate::analyzer::AnalysisReport;
use crate::graph::DependencyGraph;
use std::fmt::Write;

/// Hubs listed in the overview
const OVERVIEW_HUBS: usize = 5;

/// Short text summary of a graph, used as the structural section of an
/// assembled context
pub struct StructuralOverview;

impl StructuralOverview {
    pub fn render(graph: &DependencyGraph, report: Option<&AnalysisReport>) -> String {
        let stats = graph.stats();
        let mut out = String::new();

        let _ = writeln!(
            out,
            "Codebase: {} units, {} dependencies",
            stats.node_count, stats.edge_count
        );

        if !stats.types.is_empty() {
            let mut types: Vec<(&String, &usize)> = stats.types.iter().collect();
            types.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
            let listed: Vec<String> = types
                .iter()
                .map(|(name, count)| format!("{name} ({count})"))
                .collect();
            let _ = writeln!(out, "Types: {}", listed.join(", "));
        }

        if let Some(report) = report {
            if !report.hubs.is_empty() {
                let hubs: Vec<String> = report
                    .hubs
                    .iter()
                    .take(OVERVIEW_HUBS)
                    .map(|hub| format!("{} ({} dependents)", hub.identifier, hub.dependent_count))
                    .collect();
                let _ = writeln!(out, "Hubs: {}", hubs.join(", "));
            }
            let _ = writeln!(out, "Cycles: {}", report.cycles.len());
        }

        out.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::GraphAnalyzer;
    use codectx_units::{Unit, UnitType};
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_counts_hubs_and_cycles() {
        let graph = DependencyGraph::from_units(&[
            Unit::new("User", UnitType::Model),
            Unit::new("Order", UnitType::Model).depends_on("User"),
            Unit::new("OrdersController", UnitType::Controller).depends_on("Order"),
        ]);
        let report = GraphAnalyzer::new(&graph).analyze();
        let text = StructuralOverview::render(&graph, Some(&report));

        assert_eq!(
            text,
            "Codebase: 3 units, 2 dependencies\n\
             Types: model (2), controller (1)\n\
             Hubs: Order (1 dependents), User (1 dependents)\n\
             Cycles: 0"
        );
    }

    #[test]
    fn renders_without_report() {
        let text = StructuralOverview::render(&DependencyGraph::new(), None);
        assert_eq!(text, "Codebase: 0 units, 0 dependencies");
    }
}
