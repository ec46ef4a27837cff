//! Common types used across the application.

pub mod id;
pub mod money;
pub mod pagination;

pub use id::*;
pub use money::{TOLERANCE, exceeds_ceiling, is_negligible, round_currency};
pub use pagination::{PageRequest, PageResponse};
