pub mod excerpt;
pub mod markdown;
pub mod marker;
pub mod sanitize;
pub mod schema;
pub mod tree;

pub use markdown::to_html;
pub use schema::{Attrs, NodeGroup, NodeSpec, Schema};
pub use tree::{Block, ContentTree};
