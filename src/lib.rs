//! Collective communication algorithms over pluggable point-to-point
//! transports.
//!
//! A [`Communicator`] names an ordered, fixed group of ranks over any
//! [`PointToPoint`] transport; the engines in [`collective`] run
//! deterministic schedules over it: dissemination barriers, binomial
//! broadcast and reduce, the scatter half of a long-message broadcast,
//! butterfly reduce-scatter, flat and hierarchical prefix scan, and
//! in-place pairwise alltoallw. [`LocalMesh`] provides an in-process
//! transport for tests and co-located workers.

pub mod collective;
pub mod comm;
pub mod config;
pub mod error;
pub mod mesh;
pub mod p2p;
pub mod reduce;
pub mod types;

pub use collective::{
    barrier, binomial_broadcast, binomial_reduce, butterfly_reduce_scatter, dissemination_barrier,
    flat_scan, hierarchical_scan, pairwise_alltoallw, radix_barrier, scan, scatter_for_broadcast,
};
pub use comm::Communicator;
pub use config::CohortConfig;
pub use error::{CohortError, Result};
pub use mesh::LocalMesh;
pub use p2p::{wait_all, PointToPoint, Request, WireTag};
pub use reduce::{ElementwiseOp, ReduceOp, ReduceOperator};
pub use types::{CollAttr, DataType, Layout, Rank, Tag};
