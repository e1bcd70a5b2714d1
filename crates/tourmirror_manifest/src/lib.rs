mod css;
mod js;
mod object_literal;
mod strategy;

pub use css::parse_css;
pub use js::parse_js;
