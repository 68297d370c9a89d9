pub mod health;
pub mod portfolios;
pub mod positions;
pub mod risk;
pub mod transactions;
