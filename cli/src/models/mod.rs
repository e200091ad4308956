pub mod matrix;
pub mod presence;

pub use matrix::*;
pub use presence::*;
