use crate::output::UserOutput;
use service_graph::{Config, Graph, Status};

pub fn run_check(config: &Config, out: &dyn UserOutput) -> anyhow::Result<()> {
    let graph = Graph::from_config(config, Status::Stopped)?;

    if graph.is_empty() {
        out.status("No services defined.");
        return Ok(());
    }

    out.status("Dependencies:");
    for line in graph.to_string().lines() {
        out.status(&format!("  {}", line));
    }
    out.status(&format!("Roots:  {}", graph.roots().join(", ")));
    out.status(&format!("Leaves: {}", graph.leaves().join(", ")));
    out.success(&format!(
        "Dependency graph is valid ({} services)",
        graph.len()
    ));
    Ok(())
}
