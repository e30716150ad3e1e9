pub mod account;
pub mod order;
pub mod service;
