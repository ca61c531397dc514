pub mod inference;
pub mod prediction;
pub mod risk;
