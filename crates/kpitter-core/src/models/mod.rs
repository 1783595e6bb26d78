//! Data models for KPI-tter entities.
//!
//! The client only ever reads whole snapshots of these; they are created and
//! mutated server-side.

pub mod post;
pub mod user;

pub use post::{NewPost, Post};
pub use user::{LoginRequest, RegisterRequest, UserProfile};
