pub mod bundle;
pub mod captured;
pub mod html;
