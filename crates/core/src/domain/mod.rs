pub mod context;
pub mod product;
pub mod recommendation;
pub mod rule;
