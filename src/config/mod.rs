//! Configuration parsing and types.
//!
//! - `types` - Root config structure (`Config`)
//! - `service` - Service configuration (`Service`)
//! - `dependency` - Dependency declarations (`DependsOn`, `DependencyCondition`)
//! - `parser` - YAML config parsing

mod dependency;
mod parser;
mod service;
mod types;

pub use dependency::*;
pub use parser::*;
pub use service::*;
pub use types::*;
