pub mod status;
pub mod tree;

pub use status::{ServiceKind, ServiceStatus};
pub use tree::{CatalogNode, CatalogTree, NodeKind};
