pub mod operations;
pub mod session;
pub mod upload;
