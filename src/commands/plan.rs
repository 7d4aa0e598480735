use crate::output::UserOutput;
use parking_lot::Mutex;
use service_graph::{limit_concurrency, Config, Direction, Graph, Service, Status, Traversal};
use std::collections::{BTreeMap, HashMap};
use std::convert::Infallible;
use tokio_util::sync::CancellationToken;

/// Which lifecycle operation to plan.
#[derive(Debug, Clone)]
pub enum PlanMode {
    Up,
    Down,
    Restart(Vec<String>),
}

impl PlanMode {
    fn traversal(&self) -> Traversal {
        match self {
            PlanMode::Up => Traversal::forward(),
            PlanMode::Down => Traversal::reverse(),
            PlanMode::Restart(services) => Traversal::reverse().with_roots(services.clone()),
        }
    }

    fn initial_status(&self) -> Status {
        match self {
            PlanMode::Up => Status::Stopped,
            PlanMode::Down | PlanMode::Restart(_) => Status::Started,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            PlanMode::Up => "Bring-up order:",
            PlanMode::Down => "Tear-down order:",
            PlanMode::Restart(_) => "Restart order:",
        }
    }
}

/// Services grouped by the wave in which they become eligible.
///
/// Wave 1 has no prerequisites; wave N waits on something in wave N-1.
#[derive(Debug, Default)]
pub struct Plan {
    pub waves: BTreeMap<usize, Vec<String>>,
}

impl Plan {
    pub fn service_count(&self) -> usize {
        self.waves.values().map(Vec::len).sum()
    }
}

/// Walk the graph with a recording visitor and return the resulting waves.
pub async fn build_plan<'a>(
    graph: &Graph<'a, Service>,
    traversal: &Traversal,
    parallel: Option<usize>,
    ctx: &CancellationToken,
) -> service_graph::Result<Plan> {
    let assigned: Mutex<HashMap<String, usize>> = Mutex::new(HashMap::new());
    let direction = traversal.direction();

    let visitor = |_ctx: CancellationToken, name: String, _service: &'a Service| {
        let wave = {
            let mut assigned = assigned.lock();
            let prerequisites = match direction {
                Direction::Forward => graph.children_of(&name),
                Direction::Reverse => graph.parents_of(&name),
            }
            .unwrap_or_default();
            let wave = prerequisites
                .iter()
                .filter_map(|p| assigned.get(*p))
                .max()
                .map_or(1, |w| w + 1);
            assigned.insert(name.clone(), wave);
            wave
        };
        tracing::info!("Visiting '{}' (wave {})", name, wave);

        async move {
            tokio::task::yield_now().await;
            Ok::<(), Infallible>(())
        }
    };

    match parallel {
        Some(limit) => {
            traversal
                .run(ctx, graph, limit_concurrency(visitor, limit))
                .await?
        }
        None => traversal.run(ctx, graph, visitor).await?,
    }

    let mut plan = Plan::default();
    for (name, wave) in assigned.into_inner() {
        plan.waves.entry(wave).or_default().push(name);
    }
    for names in plan.waves.values_mut() {
        names.sort();
    }
    Ok(plan)
}

pub async fn run_plan(
    config: &Config,
    mode: PlanMode,
    parallel: Option<usize>,
    ctx: &CancellationToken,
    out: &dyn UserOutput,
) -> anyhow::Result<()> {
    let graph = Graph::from_config(config, mode.initial_status())?;
    let plan = build_plan(&graph, &mode.traversal(), parallel, ctx).await?;

    out.status(mode.title());
    for (wave, names) in &plan.waves {
        out.status(&format!("  {}. {}", wave, names.join(", ")));
    }
    out.success(&format!(
        "{} service(s) in {} wave(s)",
        plan.service_count(),
        plan.waves.len()
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::testing::RecordingOutput;
    use service_graph::Parser;

    const CONFIG: &str = r#"
services:
  web:
    depends_on: [api]
  api:
    depends_on: [db, cache]
  worker:
    depends_on: [db]
  db:
    image: postgres:16
  cache:
    image: redis:7
"#;

    fn config() -> Config {
        Parser::new().parse_config(CONFIG).unwrap()
    }

    fn wave(plan: &Plan, n: usize) -> Vec<&str> {
        plan.waves[&n].iter().map(String::as_str).collect()
    }

    #[tokio::test]
    async fn test_up_plan_waves() {
        let config = config();
        let graph = Graph::from_config(&config, Status::Stopped).unwrap();
        let plan = build_plan(&graph, &Traversal::forward(), None, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(wave(&plan, 1), vec!["cache", "db"]);
        assert_eq!(wave(&plan, 2), vec!["api", "worker"]);
        assert_eq!(wave(&plan, 3), vec!["web"]);
        assert_eq!(graph.status("web"), Some(Status::Started));
    }

    #[tokio::test]
    async fn test_down_plan_waves() {
        let config = config();
        let graph = Graph::from_config(&config, Status::Started).unwrap();
        let plan = build_plan(&graph, &Traversal::reverse(), Some(1), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(wave(&plan, 1), vec!["web", "worker"]);
        assert_eq!(wave(&plan, 2), vec!["api"]);
        assert_eq!(wave(&plan, 3), vec!["cache", "db"]);
        assert_eq!(plan.service_count(), 5);
    }

    #[tokio::test]
    async fn test_restart_plan_output() {
        let out = RecordingOutput::default();
        run_plan(
            &config(),
            PlanMode::Restart(vec!["cache".to_string()]),
            None,
            &CancellationToken::new(),
            &out,
        )
        .await
        .unwrap();

        let text = out.text();
        assert!(text.starts_with("Restart order:"));
        assert!(text.contains("  1. web"));
        assert!(text.contains("  2. api"));
        assert!(text.contains("  3. cache"));
        assert!(!text.contains("worker"));
        assert!(!text.contains("db"));
    }

    #[tokio::test]
    async fn test_cancelled_plan() {
        let ctx = CancellationToken::new();
        ctx.cancel();

        let result = run_plan(&config(), PlanMode::Up, None, &ctx, &RecordingOutput::default()).await;
        let err = result.unwrap_err();
        assert!(err
            .downcast_ref::<service_graph::Error>()
            .is_some_and(service_graph::Error::is_cancelled));
    }
}
