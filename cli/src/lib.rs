//! # tickerkit - sequence and table demos with shared analysis helpers
//!
//! A small library backing the `tickerkit` CLI and the `tickerview` chart tool:
//! - Simple moving averages over closing prices
//! - Fixed-input sequence transformations
//! - Per-column max/min ratios over integer matrices
//! - City × company presence (cross-tabulation) matrices
//!
//! ## Quick Start
//!
//! ```rust
//! use tickerkit::prelude::*;
//!
//! let ratios = max_by_min(&sample_matrix()).unwrap();
//! assert_eq!(ratios, vec![5.0, 4.0]);
//!
//! let presence = presence_matrix(&CityCompanyTable::sample());
//! assert_eq!(presence.total(), 5);
//! ```

pub mod demos;
pub mod error;
pub mod models;
pub mod utils;

pub mod prelude {
    //! Commonly used types and functions.
    //!
    //! ```rust
    //! use tickerkit::prelude::*;
    //! ```

    pub use crate::demos::{
        apply_along_columns, max_by_min, max_by_min_apply, presence_matrix, sample_matrix,
        SequenceReport,
    };
    pub use crate::error::{DemoError, DemoResult};
    pub use crate::models::{random_matrix, CityCompanyTable, Matrix, PresenceMatrix};
    pub use crate::utils::{moving_averages, simple_moving_average, MovingAverageSeries};
}

pub use error::{DemoError, DemoResult};
pub use utils::{init_logger, Logger, Timer};
