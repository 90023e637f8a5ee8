pub mod audit;
pub mod expense;
pub mod user;
