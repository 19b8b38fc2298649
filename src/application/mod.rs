pub mod traversal_service;

pub use traversal_service::*;
