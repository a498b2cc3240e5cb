//! Halo exchange: boundary-box construction and the send/recv engine.

pub mod boxes;
pub mod engine;

pub use boxes::{HaloShape, recv_box, send_box};
pub use engine::HaloExchange;
