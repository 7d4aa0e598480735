//! # Service Graph
//!
//! Dependency-ordered execution for multi-service deployments.
//!
//! Services declared in a federation config form a dependency graph. This
//! crate builds that graph, rejects unknown references and cycles up front,
//! and walks it concurrently: every service whose prerequisites are done is
//! visited at once, and each service is visited exactly once.
//!
//! ## Quick Start
//!
//! ```no_run
//! use service_graph::{visit_in_dependency_order, Graph, Parser, Status};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), service_graph::Error> {
//! let config = Parser::new().load_config("service-federation.yaml")?;
//! let graph = Graph::from_config(&config, Status::Stopped)?;
//!
//! let ctx = CancellationToken::new();
//! visit_in_dependency_order(&ctx, &graph, |_ctx, name, _service| async move {
//!     println!("starting {}", name);
//!     Ok::<(), std::io::Error>(())
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency Model
//!
//! - Visits run concurrently inside the traversal future; there is no cap
//!   unless the visitor is wrapped with [`limit_concurrency`]
//! - Cancellation is cooperative via `CancellationToken`: running visits finish,
//!   no new ones start
//! - The first failure wins and stops the rest of the walk
//! - Service status is the only shared mutable state, behind one lock

pub mod config;
pub mod dependency;
pub mod error;
pub mod service;

pub use config::{Config, DependsOn, Parser, Service};
pub use dependency::{
    limit_concurrency, visit_downstream_from_roots, visit_in_dependency_order,
    visit_in_reverse_dependency_order, Direction, Graph, ServiceDefinition, Traversal, Vertex,
};
pub use error::{BoxError, Error, Result};
pub use service::Status;
