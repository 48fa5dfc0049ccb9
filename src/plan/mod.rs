//! Plan-state tracking: storage, threshold evaluation and the HTTP surface.

pub mod evaluator;
pub mod routes;
pub mod state;
pub mod storage;
