//! HTTP layer of Yatube: handlers, session handling, forms, media and the
//! page cache, assembled by [`router::build_router`].

pub mod auth;
pub mod cache;
pub mod comments;
pub mod error;
pub mod follow;
pub mod forms;
pub mod media;
pub mod middleware;
pub mod pages;
pub mod pagination;
pub mod posts;
pub mod router;
pub mod state;
pub mod views;

pub use router::build_router;
pub use state::{AppState, AppStateInner};
