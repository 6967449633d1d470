pub mod classify;
pub mod manager;
pub mod store;
