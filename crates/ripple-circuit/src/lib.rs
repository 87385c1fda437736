//! Application-level container around `ripple-core` signals: a factory that
//! stamps registered extensions onto every signal it creates, a value-diffing
//! middleware for change-gated propagation, and the render-support surface a
//! render-cycle adapter consumes.

pub mod circuit;
pub mod distinct;
pub mod render;

pub use circuit::Circuit;
pub use render::RenderGate;
