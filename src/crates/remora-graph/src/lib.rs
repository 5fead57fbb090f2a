mod builder;
mod edges;
mod error;
mod graph;

pub use builder::{build, BundleMapping};
pub use edges::{EdgeRule, IntraFileEdgeRule};
pub use error::{GraphError, Result};
pub use graph::Graph;
