//! Ordering entry points used by the lifecycle commands.
//!
//! - [`visit_in_dependency_order`] - bring-up and builds
//! - [`visit_in_reverse_dependency_order`] - tear-down
//! - [`visit_downstream_from_roots`] - restart or recreate what a change affects

use super::{Graph, Traversal};
use crate::error::{BoxError, Error, Result};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

/// Visit every service after all of its dependencies.
pub async fn visit_in_dependency_order<'a, S, F, Fut, E>(
    ctx: &CancellationToken,
    graph: &Graph<'a, S>,
    visitor: F,
) -> Result<()>
where
    F: Fn(CancellationToken, String, &'a S) -> Fut,
    Fut: Future<Output = std::result::Result<(), E>>,
    E: Into<BoxError>,
{
    Traversal::forward().run(ctx, graph, visitor).await
}

/// Visit every service after everything that depends on it.
pub async fn visit_in_reverse_dependency_order<'a, S, F, Fut, E>(
    ctx: &CancellationToken,
    graph: &Graph<'a, S>,
    visitor: F,
) -> Result<()>
where
    F: Fn(CancellationToken, String, &'a S) -> Fut,
    Fut: Future<Output = std::result::Result<(), E>>,
    E: Into<BoxError>,
{
    Traversal::reverse().run(ctx, graph, visitor).await
}

/// Visit `roots` and their transitive dependents, dependents first.
///
/// Services outside that closure are never visited. No roots means every service.
pub async fn visit_downstream_from_roots<'a, S, F, Fut, E, K>(
    ctx: &CancellationToken,
    graph: &Graph<'a, S>,
    roots: &[K],
    visitor: F,
) -> Result<()>
where
    F: Fn(CancellationToken, String, &'a S) -> Fut,
    Fut: Future<Output = std::result::Result<(), E>>,
    E: Into<BoxError>,
    K: AsRef<str>,
{
    Traversal::reverse()
        .with_roots(roots.iter().map(|r| r.as_ref().to_string()))
        .run(ctx, graph, visitor)
        .await
}

/// Wrap a visitor so that at most `max_concurrency` calls run at once.
///
/// A call still waiting for a slot when its token is cancelled never runs
/// and reports [`Error::Cancelled`]. A limit of zero is treated as one.
pub fn limit_concurrency<'a, S, F, Fut, E>(
    visitor: F,
    max_concurrency: usize,
) -> impl Fn(CancellationToken, String, &'a S) -> BoxFuture<'a, std::result::Result<(), BoxError>>
where
    S: 'a,
    F: Fn(CancellationToken, String, &'a S) -> Fut,
    Fut: Future<Output = std::result::Result<(), E>> + Send + 'a,
    E: Into<BoxError>,
{
    let semaphore = Arc::new(Semaphore::new(max_concurrency.max(1)));

    move |token: CancellationToken, name: String, service: &'a S| {
        let semaphore = Arc::clone(&semaphore);
        let call = visitor(token.clone(), name, service);

        async move {
            let _permit = tokio::select! {
                biased;

                _ = token.cancelled() => {
                    return Err(Box::new(Error::Cancelled) as BoxError);
                }

                permit = semaphore.acquire_owned() => permit.ok(),
            };

            call.await.map_err(Into::into)
        }
        .boxed()
    }
}
