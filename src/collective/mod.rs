//! The collective algorithm engines.
//!
//! Every rank of a communicator must invoke the same operation with the
//! same tag and compatible arguments; the algorithms execute a
//! deterministic partner schedule and divergence between ranks deadlocks
//! rather than erroring. Each invocation is self-contained: no state
//! persists across calls, and distinct tags isolate concurrent
//! collectives on the same communicator.

pub(crate) mod helpers;

mod alltoallw;
mod barrier;
mod broadcast;
mod reduce;
mod reduce_scatter;
mod scan;

pub use alltoallw::pairwise_alltoallw;
pub use barrier::{barrier, dissemination_barrier, radix_barrier};
pub use broadcast::{binomial_broadcast, scatter_for_broadcast};
pub use reduce::binomial_reduce;
pub use reduce_scatter::butterfly_reduce_scatter;
pub use scan::{flat_scan, hierarchical_scan, scan};

use crate::types::Tag;

/// Default tags, one per collective kind. Callers running several
/// concurrent collectives on one communicator must supply distinct tags.
pub const BARRIER_TAG: Tag = 1;
pub const BROADCAST_TAG: Tag = 2;
pub const REDUCE_TAG: Tag = 3;
pub const REDUCE_SCATTER_TAG: Tag = 4;
pub const SCAN_TAG: Tag = 5;
pub const ALLTOALLW_TAG: Tag = 6;
