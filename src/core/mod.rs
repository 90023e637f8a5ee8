pub mod errors;
pub mod feed;
pub mod gateway;
pub mod models;
pub mod session;
pub mod shell;
pub mod summary;
