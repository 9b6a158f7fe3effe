//! Documents exchanged over HTTP, shared by the API handlers and their tests.

pub mod api;
pub mod models;
