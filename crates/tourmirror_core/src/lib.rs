pub mod chunk;
pub mod graph_ops;
pub mod layout;
pub mod page_id;
pub mod prefetch;
pub mod task;
