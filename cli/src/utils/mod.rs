pub mod logger;
pub mod moving_average;

pub use logger::*;
pub use moving_average::*;
