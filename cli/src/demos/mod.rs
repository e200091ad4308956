pub mod sequences;
pub mod tables;

pub use sequences::*;
pub use tables::*;
