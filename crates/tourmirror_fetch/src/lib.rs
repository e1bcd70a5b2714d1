pub mod catalog;
pub mod credentials;
pub mod model;
pub mod orchestrator;
pub mod page;
pub mod passes;
pub mod transport;
