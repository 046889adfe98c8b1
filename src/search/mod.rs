pub mod filter;
pub mod rank;
