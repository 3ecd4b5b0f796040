//! Shared harness: spawns one task per rank over an in-process mesh and
//! runs the same collective closure on each, mirroring how a launcher
//! drives the algorithms in production.

use std::future::Future;
use std::sync::Arc;

use cohort::{Communicator, LocalMesh, Rank, ReduceOperator, Result};

/// Run `f` once per rank over a flat communicator of `world` ranks and
/// collect the per-rank outcomes in rank order.
pub async fn run_collective<R, Fut>(
    world: u32,
    f: impl Fn(Communicator<LocalMesh>) -> Fut,
) -> Vec<R>
where
    Fut: Future<Output = Result<R>> + Send + 'static,
    R: Send + 'static,
{
    let nodes: Vec<Arc<LocalMesh>> = LocalMesh::bootstrap(world)
        .into_iter()
        .map(Arc::new)
        .collect();
    let mut handles = Vec::new();
    for (rank, node) in nodes.into_iter().enumerate() {
        let comm = Communicator::new(node, world, rank as Rank);
        handles.push(tokio::spawn(f(comm)));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.expect("rank task panicked").expect("collective failed"));
    }
    results
}

/// Like [`run_collective`], but the communicator carries the given
/// local-group hierarchy.
pub async fn run_hierarchical<R, Fut>(
    groups: Vec<Vec<Rank>>,
    f: impl Fn(Communicator<LocalMesh>) -> Fut,
) -> Vec<R>
where
    Fut: Future<Output = Result<R>> + Send + 'static,
    R: Send + 'static,
{
    let world = groups.iter().map(Vec::len).sum::<usize>() as u32;
    let nodes: Vec<Arc<LocalMesh>> = LocalMesh::bootstrap(world)
        .into_iter()
        .map(Arc::new)
        .collect();
    let mut handles = Vec::new();
    for (rank, node) in nodes.into_iter().enumerate() {
        let comm = Communicator::with_hierarchy(node, world, rank as Rank, &groups)
            .expect("valid hierarchy");
        handles.push(tokio::spawn(f(comm)));
    }

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.expect("rank task panicked").expect("collective failed"));
    }
    results
}

pub fn i32_bytes(vals: &[i32]) -> Vec<u8> {
    vals.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn i32_from(bytes: &[u8]) -> Vec<i32> {
    bytes
        .chunks_exact(4)
        .map(|c| i32::from_le_bytes(c.try_into().unwrap()))
        .collect()
}

/// Non-commutative test operator: elements are affine maps `x -> a*x + b`
/// as an `(a, b)` pair of f64, and combine composes them left-first:
/// `combine((a1,b1), (a2,b2)) = (a2*a1, a2*b1 + b2)`. Associative but not
/// commutative, and exact in f64 when the test sticks to power-of-two
/// scale factors and small integer offsets.
pub struct AffineOp;

impl ReduceOperator for AffineOp {
    fn is_commutative(&self) -> bool {
        false
    }

    fn reduce_local(&self, left: &[u8], inout: &mut [u8], count: usize) -> Result<()> {
        for i in 0..count {
            let off = i * 16;
            let (a1, b1) = decode_affine(&left[off..off + 16]);
            let (a2, b2) = decode_affine(&inout[off..off + 16]);
            inout[off..off + 16].copy_from_slice(&encode_affine((a2 * a1, a2 * b1 + b2)));
        }
        Ok(())
    }
}

pub fn encode_affine((a, b): (f64, f64)) -> Vec<u8> {
    let mut bytes = a.to_le_bytes().to_vec();
    bytes.extend_from_slice(&b.to_le_bytes());
    bytes
}

pub fn decode_affine(bytes: &[u8]) -> (f64, f64) {
    (
        f64::from_le_bytes(bytes[..8].try_into().unwrap()),
        f64::from_le_bytes(bytes[8..16].try_into().unwrap()),
    )
}

/// The affine map contributed by `rank`: alternating power-of-two scale
/// so composition order is observable and exact.
pub fn affine_input(rank: Rank) -> (f64, f64) {
    let a = if rank % 2 == 0 { 2.0 } else { 0.5 };
    (a, (rank + 1) as f64)
}

/// Fold in strict ascending order, left-first.
pub fn fold_affine(vals: impl IntoIterator<Item = (f64, f64)>) -> (f64, f64) {
    vals.into_iter()
        .reduce(|(a1, b1), (a2, b2)| (a2 * a1, a2 * b1 + b2))
        .expect("at least one input")
}

#[test]
fn affine_op_is_noncommutative() {
    let x = affine_input(0);
    let y = affine_input(1);
    assert_ne!(fold_affine([x, y]), fold_affine([y, x]));
}
