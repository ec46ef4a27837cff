//! Payment allocation engine.
//!
//! Decides how a payment is split between open invoices, the client's
//! legacy debt and unassigned credit. Two modes:
//! - FIFO: oldest open invoice first, see [`FifoAllocator`]
//! - Explicit: caller supplied targets, see [`ExplicitRequest`]
//!
//! Both planners are pure. The storage layer locks each invoice before
//! offering it to a planner and persists the resulting [`AllocationPlan`].

pub mod error;
pub mod plan;
pub mod target;

#[cfg(test)]
mod plan_props;

pub use error::AllocationError;
pub use plan::{AllocationPlan, ExplicitRequest, FifoAllocator, PlannedAllocation, check_prior_balance};
pub use target::{AllocationLine, AllocationTarget, AppliesTo, RawAllocation};
