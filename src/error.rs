// Allow unused_assignments at module level because thiserror's generated code
// for struct variants triggers false positive warnings - the fields ARE used
// in the Display impl but rustc's lint pass doesn't see this.
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::io;
use thiserror::Error;

/// Boxed error returned by a visit callback.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    #[error("Service '{service}' depends on undefined service '{dependency}'")]
    #[diagnostic(
        code(fed::dependency::unknown),
        help("Declare '{dependency}' under services: or remove it from the depends_on of '{service}'")
    )]
    UnknownDependency { service: String, dependency: String },

    #[error("Circular dependency detected: {}", .0.join(" -> "))]
    #[diagnostic(
        code(fed::dependency::circular),
        help("Services cannot depend on each other in a cycle. Review the depends_on fields")
    )]
    CyclicDependency(Vec<String>),

    #[error("Service '{service}' failed: {source}")]
    #[diagnostic(code(fed::service::visit_failed))]
    VisitFailed {
        service: String,
        #[source]
        source: BoxError,
    },

    #[error("Operation cancelled")]
    #[diagnostic(code(fed::operation::cancelled))]
    Cancelled,

    #[error("Service not found: {0}")]
    #[diagnostic(
        code(fed::service::not_found),
        help("Check the service names declared in your service-federation.yaml")
    )]
    ServiceNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this error reports cancellation rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Name of the service whose visit failed, if this is a visit failure.
    pub fn failed_service(&self) -> Option<&str> {
        match self {
            Error::VisitFailed { service, .. } => Some(service),
            _ => None,
        }
    }

    /// Returns a helpful suggestion for resolving this error, if available.
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Error::UnknownDependency {
                service,
                dependency,
            } => Some(format!(
                "Service '{}' lists '{}' in depends_on, but no such service is declared. Check for typos or a missing profile.",
                service, dependency
            )),
            Error::CyclicDependency(path) => Some(format!(
                "Services cannot depend on each other in a cycle. Review the depends_on fields for: {}",
                path.join(", ")
            )),
            Error::VisitFailed { service, .. } => Some(format!(
                "Services depending on '{}' were not processed. Fix the failure and re-run.",
                service
            )),
            Error::ServiceNotFound(_) => Some(
                "Run `fed-order check` to list the services in your config.".to_string(),
            ),
            Error::Config(msg) if msg.contains("Could not find") => None,
            Error::Config(_) | Error::Parse(_) => {
                Some("Validate your config with: fed-order check".to_string())
            }
            _ => None,
        }
    }

    /// Formats the error with its suggestion (if any) for user-friendly display.
    pub fn with_suggestion(&self) -> String {
        match self.suggestion() {
            Some(suggestion) => format!("{}\n\nHint: {}", self, suggestion),
            None => self.to_string(),
        }
    }
}
