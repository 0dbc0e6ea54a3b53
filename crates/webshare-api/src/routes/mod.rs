//! Route modules. Each exposes a `router()` merged by [`crate::build_router`].

pub mod health;
pub mod turn;
