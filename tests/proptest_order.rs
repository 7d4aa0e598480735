/// Property-based tests for traversal ordering
///
/// Random DAGs are generated by letting service `i` depend only on services
/// with a smaller index, then walked in every mode. Invariants checked:
/// - Every in-scope service is visited exactly once
/// - No service starts before all of its prerequisites have finished
/// - Restricted walks visit exactly the downstream closure of their roots
use parking_lot::Mutex;
use proptest::prelude::*;
use proptest::sample::Index;
use service_graph::{Graph, Status, Traversal};
use std::collections::{BTreeSet, HashMap};
use std::convert::Infallible;
use tokio_util::sync::CancellationToken;

/// Dependency lists for `n` services; entry `i` names only lower indices.
fn dag_strategy() -> impl Strategy<Value = Vec<Vec<usize>>> {
    prop::collection::vec(prop::collection::vec(any::<Index>(), 0..4), 1..24).prop_map(|raw| {
        raw.into_iter()
            .enumerate()
            .map(|(i, picks)| {
                if i == 0 {
                    return Vec::new();
                }
                let deps: BTreeSet<usize> = picks.iter().map(|p| p.index(i)).collect();
                deps.into_iter().collect()
            })
            .collect()
    })
}

fn names(dag: &[Vec<usize>]) -> Vec<String> {
    (0..dag.len()).map(|i| format!("svc-{:02}", i)).collect()
}

fn definitions<'n>(names: &'n [String], dag: &[Vec<usize>]) -> Vec<(&'n str, Vec<&'n str>)> {
    dag.iter()
        .enumerate()
        .map(|(i, deps)| {
            (
                names[i].as_str(),
                deps.iter().map(|&d| names[d].as_str()).collect(),
            )
        })
        .collect()
}

/// A visit boundary: `(true, name)` when a visit starts, `(false, name)` when it ends.
type Event = (bool, String);

/// Walk the graph and return every visit event in the order it happened.
fn walk(defs: &[(&str, Vec<&str>)], traversal: &Traversal) -> Vec<Event> {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(async {
        let graph = Graph::new(defs.iter().map(|(k, s)| (*k, s)), Status::Stopped).unwrap();
        let events: Mutex<Vec<Event>> = Mutex::new(Vec::new());
        let log = &events;

        traversal
            .run(&CancellationToken::new(), &graph, move |_ctx, name, _service| async move {
                log.lock().push((true, name.clone()));
                tokio::task::yield_now().await;
                log.lock().push((false, name));
                Ok::<(), Infallible>(())
            })
            .await
            .unwrap();

        events.into_inner()
    })
}

fn position(events: &[Event], is_start: bool, name: &str) -> usize {
    events
        .iter()
        .position(|(s, n)| *s == is_start && n == name)
        .unwrap_or_else(|| panic!("no {} event for {}", if is_start { "start" } else { "end" }, name))
}

/// Names visited, sorted, asserting none was visited twice.
fn visited_once(events: &[Event]) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for (is_start, name) in events {
        if *is_start {
            *counts.entry(name.as_str()).or_default() += 1;
        }
    }
    assert!(counts.values().all(|&n| n == 1), "a service was visited twice: {:?}", counts);
    let mut names: Vec<String> = counts.keys().map(|n| n.to_string()).collect();
    names.sort();
    names
}

proptest! {
    /// Every dependency finishes before its dependent starts.
    #[test]
    fn test_forward_respects_dependencies(dag in dag_strategy()) {
        let names = names(&dag);
        let defs = definitions(&names, &dag);
        let events = walk(&defs, &Traversal::forward());

        prop_assert_eq!(visited_once(&events), names.clone());
        for (i, deps) in dag.iter().enumerate() {
            for &d in deps {
                prop_assert!(
                    position(&events, false, &names[d]) < position(&events, true, &names[i]),
                    "{} started before its dependency {} finished", names[i], names[d]
                );
            }
        }
    }

    /// Every dependent finishes before its dependency starts.
    #[test]
    fn test_reverse_respects_dependents(dag in dag_strategy()) {
        let names = names(&dag);
        let defs = definitions(&names, &dag);
        let events = walk(&defs, &Traversal::reverse());

        prop_assert_eq!(visited_once(&events), names.clone());
        for (i, deps) in dag.iter().enumerate() {
            for &d in deps {
                prop_assert!(
                    position(&events, false, &names[i]) < position(&events, true, &names[d]),
                    "{} started before its dependent {} finished", names[d], names[i]
                );
            }
        }
    }

    /// A rooted walk visits exactly the root plus everything depending on it.
    #[test]
    fn test_rooted_walk_matches_closure(dag in dag_strategy(), root in any::<Index>()) {
        let names = names(&dag);
        let defs = definitions(&names, &dag);
        let root = root.index(dag.len());

        // Services only depend on lower indices, so one ascending pass
        // computes the closure.
        let mut expected = BTreeSet::from([root]);
        for (i, deps) in dag.iter().enumerate() {
            if deps.iter().any(|d| expected.contains(d)) {
                expected.insert(i);
            }
        }
        let expected: Vec<String> = expected.into_iter().map(|i| names[i].clone()).collect();

        let traversal = Traversal::reverse().with_roots([names[root].clone()]);
        let events = walk(&defs, &traversal);

        prop_assert_eq!(visited_once(&events), expected);
        // Everything in scope depends on the root, so it is visited last
        let last_start = events.iter().rev().find(|(s, _)| *s).map(|(_, n)| n.as_str());
        prop_assert_eq!(last_start, Some(names[root].as_str()));
    }
}
