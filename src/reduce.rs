//! Local reduction: the operator interface the collective engines combine
//! buffers with, plus built-in element-wise arithmetic operators.

use crate::error::{CohortError, Result};
use crate::types::DataType;

/// A reduction operator as consumed by the collective engines.
///
/// `reduce_local` computes `inout = combine(left, inout)` element-wise
/// over `count` packed elements. The engines rely on this argument order
/// to keep non-commutative reductions in strict ascending-rank order, so
/// implementations must honor it even when `is_commutative` is true.
/// `combine` must be associative.
pub trait ReduceOperator: Send + Sync {
    fn is_commutative(&self) -> bool;

    /// `inout[i] = combine(left[i], inout[i])` for each of `count` elements.
    fn reduce_local(&self, left: &[u8], inout: &mut [u8], count: usize) -> Result<()>;
}

/// Element-wise arithmetic reductions. All four are commutative and
/// associative (integer Sum/Prod wrap on overflow).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReduceOp {
    /// Element-wise sum across ranks.
    Sum,
    /// Element-wise product across ranks.
    Prod,
    /// Element-wise minimum across ranks.
    Min,
    /// Element-wise maximum across ranks.
    Max,
}

impl std::fmt::Display for ReduceOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReduceOp::Sum => f.write_str("sum"),
            ReduceOp::Prod => f.write_str("prod"),
            ReduceOp::Min => f.write_str("min"),
            ReduceOp::Max => f.write_str("max"),
        }
    }
}

/// Built-in operator: `op` applied element-wise over packed `dtype` elements.
#[derive(Debug, Clone, Copy)]
pub struct ElementwiseOp {
    pub dtype: DataType,
    pub op: ReduceOp,
}

impl ElementwiseOp {
    pub const fn new(dtype: DataType, op: ReduceOp) -> Self {
        Self { dtype, op }
    }
}

impl ReduceOperator for ElementwiseOp {
    fn is_commutative(&self) -> bool {
        true
    }

    fn reduce_local(&self, left: &[u8], inout: &mut [u8], count: usize) -> Result<()> {
        let nbytes = count * self.dtype.size_in_bytes();
        if left.len() < nbytes || inout.len() < nbytes {
            return Err(CohortError::BufferSizeMismatch {
                expected: nbytes,
                actual: left.len().min(inout.len()),
            });
        }
        reduce_slice(left, inout, count, self.dtype, self.op)
    }
}

/// Trait for types that support the four reduction operations.
trait Reducible: Copy + 'static {
    fn reduce(a: Self, b: Self, op: ReduceOp) -> Self;
}

macro_rules! impl_reducible {
    (int: $($ty:ty),*) => {
        $(
            impl Reducible for $ty {
                #[inline]
                fn reduce(a: Self, b: Self, op: ReduceOp) -> Self {
                    match op {
                        ReduceOp::Sum => a.wrapping_add(b),
                        ReduceOp::Prod => a.wrapping_mul(b),
                        ReduceOp::Min => a.min(b),
                        ReduceOp::Max => a.max(b),
                    }
                }
            }
        )*
    };
    (float: $($ty:ty),*) => {
        $(
            impl Reducible for $ty {
                #[inline]
                fn reduce(a: Self, b: Self, op: ReduceOp) -> Self {
                    match op {
                        ReduceOp::Sum => a + b,
                        ReduceOp::Prod => a * b,
                        ReduceOp::Min => a.min(b),
                        ReduceOp::Max => a.max(b),
                    }
                }
            }
        )*
    };
}

impl_reducible!(int: i8, i32, i64, u8, u32, u64);
impl_reducible!(float: f32, f64);

/// Read/write a value from a little-endian byte slice (alignment-safe).
trait LeBytes: Sized {
    fn read_le(bytes: &[u8]) -> Self;
    fn write_le(self, bytes: &mut [u8]);
}

macro_rules! impl_le_bytes {
    ($($ty:ty),*) => {
        $(
            impl LeBytes for $ty {
                #[inline]
                fn read_le(bytes: &[u8]) -> Self {
                    Self::from_le_bytes(
                        bytes.try_into().expect("slice length matches type size"),
                    )
                }
                #[inline]
                fn write_le(self, bytes: &mut [u8]) {
                    bytes.copy_from_slice(&self.to_le_bytes());
                }
            }
        )*
    };
}

impl_le_bytes!(i8, i32, i64, u8, u32, u64, f32, f64);

/// `inout[i] = op(left[i], inout[i])` on byte slices interpreted as
/// `dtype` elements.
fn reduce_slice(left: &[u8], inout: &mut [u8], count: usize, dtype: DataType, op: ReduceOp) -> Result<()> {
    match dtype {
        DataType::F32 => reduce_slice_typed::<f32>(left, inout, count, op),
        DataType::F64 => reduce_slice_typed::<f64>(left, inout, count, op),
        DataType::I32 => reduce_slice_typed::<i32>(left, inout, count, op),
        DataType::I64 => reduce_slice_typed::<i64>(left, inout, count, op),
        DataType::U32 => reduce_slice_typed::<u32>(left, inout, count, op),
        DataType::U64 => reduce_slice_typed::<u64>(left, inout, count, op),
        DataType::I8 => reduce_slice_typed::<i8>(left, inout, count, op),
        DataType::U8 => reduce_slice_typed::<u8>(left, inout, count, op),
        _ => {
            return Err(CohortError::UnsupportedDType { dtype, op: "reduce" });
        }
    }
    Ok(())
}

fn reduce_slice_typed<T: Reducible + LeBytes>(left: &[u8], inout: &mut [u8], count: usize, op: ReduceOp) {
    let t_size = std::mem::size_of::<T>();
    for i in 0..count {
        let off = i * t_size;
        let a = T::read_le(&left[off..off + t_size]);
        let b = T::read_le(&inout[off..off + t_size]);
        let r = T::reduce(a, b, op);
        r.write_le(&mut inout[off..off + t_size]);
    }
}
