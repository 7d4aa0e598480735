//! Concurrent, dependency-ordered traversal of a [`Graph`].
//!
//! A traversal walks the graph in one [`Direction`]. Each vertex waits on a
//! set of prerequisites (its children going forward, its parents in reverse)
//! and is dispatched the moment the last of them completes. All eligible
//! visits run concurrently inside the traversal's own future, so dropping the
//! future drops every in-flight visit with it.
//!
//! # Dispatch
//!
//! Each in-scope vertex carries a counter of unresolved prerequisites.
//! Completing a visit decrements the counter of each successor; the
//! decrement that takes a counter from one to zero is the only one that
//! dispatches that successor. A vertex is therefore never dispatched twice,
//! however many prerequisites finish together.
//!
//! # Failure and cancellation
//!
//! The first failing visit, or the caller's token firing, stops all further
//! dispatch. Visits already running are not interrupted: the traversal waits
//! for them to finish and then returns a single error. A callback failure
//! outranks cancellation. Vertices downstream of a failure are never visited.

use super::{Graph, Vertex};
use crate::error::{BoxError, Error, Result};
use crate::service::Status;
use futures::stream::{FuturesUnordered, StreamExt};
use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Which way prerequisites point during a traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Dependencies first: a service waits for everything it depends on.
    Forward,
    /// Dependents first: a service waits for everything that depends on it.
    Reverse,
}

impl Direction {
    /// Vertices that must complete before `vertex` may be visited.
    fn prerequisites<'g, S>(self, vertex: &'g Vertex<'_, S>) -> &'g BTreeSet<String> {
        match self {
            Direction::Forward => vertex.children(),
            Direction::Reverse => vertex.parents(),
        }
    }

    /// Vertices that may become eligible once `vertex` completes.
    fn successors<'g, S>(self, vertex: &'g Vertex<'_, S>) -> &'g BTreeSet<String> {
        match self {
            Direction::Forward => vertex.parents(),
            Direction::Reverse => vertex.children(),
        }
    }

    /// Status recorded for a vertex after a successful visit.
    pub fn default_target_status(self) -> Status {
        match self {
            Direction::Forward => Status::Started,
            Direction::Reverse => Status::Stopped,
        }
    }
}

/// Configuration for one walk over a graph.
///
/// ```no_run
/// use service_graph::{Graph, Status, Traversal};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example(graph: Graph<'_, Vec<String>>) -> Result<(), service_graph::Error> {
/// let ctx = CancellationToken::new();
/// Traversal::reverse()
///     .with_roots(["db"])
///     .run(&ctx, &graph, |_ctx, name, _service| async move {
///         println!("restarting {}", name);
///         Ok::<(), std::io::Error>(())
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Traversal {
    direction: Direction,
    roots: Option<Vec<String>>,
    target_status: Option<Status>,
}

impl Traversal {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            roots: None,
            target_status: Some(direction.default_target_status()),
        }
    }

    /// Dependencies before dependents.
    pub fn forward() -> Self {
        Self::new(Direction::Forward)
    }

    /// Dependents before dependencies.
    pub fn reverse() -> Self {
        Self::new(Direction::Reverse)
    }

    /// Restrict the walk to `roots` and everything that transitively depends on them.
    ///
    /// An empty root list selects the whole graph.
    pub fn with_roots<I, K>(mut self, roots: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        let roots: Vec<String> = roots.into_iter().map(Into::into).collect();
        self.roots = if roots.is_empty() { None } else { Some(roots) };
        self
    }

    /// Status recorded after each successful visit; `None` leaves status to the callback.
    pub fn with_target_status(mut self, status: Option<Status>) -> Self {
        self.target_status = status;
        self
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn roots(&self) -> Option<&[String]> {
        self.roots.as_deref()
    }

    /// Walk `graph`, calling `visitor` once per in-scope vertex.
    ///
    /// The visitor receives a token that is cancelled when `ctx` is, or when
    /// any visit fails, plus the service's name and definition. Returning
    /// [`Error::Cancelled`] from a visitor reports that it gave up because of
    /// cancellation rather than failing.
    ///
    /// # Errors
    ///
    /// - [`Error::ServiceNotFound`] if a root is not in the graph (nothing is visited)
    /// - [`Error::VisitFailed`] wrapping the first visitor error
    /// - [`Error::Cancelled`] if `ctx` fired before every vertex was visited
    pub async fn run<'a, S, F, Fut, E>(
        &self,
        ctx: &CancellationToken,
        graph: &Graph<'a, S>,
        visitor: F,
    ) -> Result<()>
    where
        F: Fn(CancellationToken, String, &'a S) -> Fut,
        Fut: Future<Output = std::result::Result<(), E>>,
        E: Into<BoxError>,
    {
        let schedule = self.schedule(graph)?;
        let token = ctx.child_token();

        let mut ready = schedule.seeds();
        let mut in_flight = FuturesUnordered::new();
        let mut failure: Option<Error> = None;
        let mut visited = 0usize;

        tracing::debug!(
            direction = ?self.direction,
            services = schedule.len(),
            "Starting traversal"
        );

        loop {
            if failure.is_none() && ctx.is_cancelled() {
                failure = Some(Error::Cancelled);
            }

            if failure.is_none() {
                for vertex in ready.drain(..) {
                    tracing::trace!("Dispatching '{}'", vertex.key());
                    in_flight.push(visit(&token, vertex, &visitor));
                }
            } else {
                ready.clear();
            }

            if in_flight.is_empty() {
                break;
            }

            tokio::select! {
                biased;

                _ = ctx.cancelled(), if failure.is_none() => {
                    tracing::debug!(
                        "Traversal cancelled, waiting for {} in-flight visit(s)",
                        in_flight.len()
                    );
                    failure = Some(Error::Cancelled);
                }

                Some((vertex, result)) = in_flight.next() => {
                    match result {
                        Ok(()) => {
                            visited += 1;
                            if let Some(status) = self.target_status {
                                graph.set_status(vertex.key(), status)?;
                            }
                            if failure.is_none() {
                                ready.extend(schedule.complete(vertex));
                            }
                        }
                        Err(source) => {
                            let error = classify(vertex.key(), source.into());
                            tracing::debug!("Visit of '{}' did not complete", vertex.key());
                            token.cancel();
                            record(&mut failure, error);
                        }
                    }
                }

                else => break,
            }
        }

        if let Some(error) = failure {
            return Err(error);
        }

        debug_assert_eq!(visited, schedule.len(), "every in-scope vertex is visited");
        tracing::debug!("Traversal complete, {} service(s) visited", visited);
        Ok(())
    }

    fn schedule<'g, 'a, S>(&self, graph: &'g Graph<'a, S>) -> Result<Schedule<'g, 'a, S>> {
        let scope = match &self.roots {
            Some(roots) => Some(graph.downstream_closure(roots)?),
            None => None,
        };

        let in_scope = |key: &str| scope.as_ref().map_or(true, |s| s.contains(key));

        let slots = graph
            .vertices()
            .filter(|vertex| in_scope(vertex.key()))
            .map(|vertex| {
                let unresolved = self
                    .direction
                    .prerequisites(vertex)
                    .iter()
                    .filter(|key| in_scope(key.as_str()))
                    .count();
                (
                    vertex.key(),
                    Slot {
                        vertex,
                        unresolved: AtomicUsize::new(unresolved),
                    },
                )
            })
            .collect();

        Ok(Schedule {
            direction: self.direction,
            slots,
        })
    }
}

/// Run one visitor call, pairing the outcome with its vertex.
async fn visit<'g, 'a, S, F, Fut, E>(
    token: &CancellationToken,
    vertex: &'g Vertex<'a, S>,
    visitor: &F,
) -> (&'g Vertex<'a, S>, std::result::Result<(), E>)
where
    F: Fn(CancellationToken, String, &'a S) -> Fut,
    Fut: Future<Output = std::result::Result<(), E>>,
{
    let result = visitor(token.clone(), vertex.key().to_string(), vertex.service())
        .instrument(tracing::debug_span!("visit", service.name = %vertex.key()))
        .await;
    (vertex, result)
}

/// Turn a visitor error into the traversal's error.
///
/// A visitor returning [`Error::Cancelled`] is reporting cancellation, not a failure.
fn classify(service: &str, source: BoxError) -> Error {
    match source.downcast::<Error>() {
        Ok(error) if error.is_cancelled() => Error::Cancelled,
        Ok(error) => Error::VisitFailed {
            service: service.to_string(),
            source: error,
        },
        Err(source) => Error::VisitFailed {
            service: service.to_string(),
            source,
        },
    }
}

/// Keep the first failure; a visit failure replaces an earlier cancellation.
fn record(failure: &mut Option<Error>, error: Error) {
    let replace = match failure {
        None => true,
        Some(current) => current.is_cancelled() && !error.is_cancelled(),
    };
    if replace {
        *failure = Some(error);
    }
}

struct Slot<'g, 'a, S> {
    vertex: &'g Vertex<'a, S>,
    unresolved: AtomicUsize,
}

/// Per-traversal prerequisite counters. Never outlives one `run` call.
struct Schedule<'g, 'a, S> {
    direction: Direction,
    slots: HashMap<&'g str, Slot<'g, 'a, S>>,
}

impl<'g, 'a, S> Schedule<'g, 'a, S> {
    fn len(&self) -> usize {
        self.slots.len()
    }

    /// Vertices with no unresolved prerequisites, sorted by name.
    fn seeds(&self) -> Vec<&'g Vertex<'a, S>> {
        let mut seeds: Vec<_> = self
            .slots
            .values()
            .filter(|slot| slot.unresolved.load(Ordering::Acquire) == 0)
            .map(|slot| slot.vertex)
            .collect();
        seeds.sort_by(|a, b| a.key().cmp(b.key()));
        seeds
    }

    /// Record that `vertex` completed and return the successors it made eligible.
    fn complete(&self, vertex: &'g Vertex<'a, S>) -> Vec<&'g Vertex<'a, S>> {
        self.direction
            .successors(vertex)
            .iter()
            .filter_map(|key| self.slots.get(key.as_str()))
            .filter(|slot| slot.resolve_one())
            .map(|slot| slot.vertex)
            .collect()
    }
}

impl<S> Slot<'_, '_, S> {
    /// Atomically resolve one prerequisite.
    ///
    /// Returns true for exactly one caller: the one that resolved the last prerequisite.
    fn resolve_one(&self) -> bool {
        self.unresolved
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            == Ok(1)
    }
}
