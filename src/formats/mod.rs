//! Per-format brush parsers.

pub mod abr;
pub mod brushset;
pub mod gbr;
pub mod sut;

pub use abr::AbrParser;
pub use brushset::BrushsetParser;
pub use gbr::GbrParser;
pub use sut::SutParser;
