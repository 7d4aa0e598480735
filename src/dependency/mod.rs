mod graph;
mod order;
mod traversal;

pub use graph::*;
pub use order::*;
pub use traversal::*;
