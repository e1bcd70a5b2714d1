pub mod logging;
pub mod mirror;
