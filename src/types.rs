/// Rank of a participant in a communicator group (0-indexed).
pub type Rank = u32;

/// Tag scoping messages to one logical collective, so traffic from two
/// collectives between the same pair of ranks cannot be mismatched.
pub type Tag = u16;

/// Opaque attribute bitmask forwarded to the point-to-point layer.
///
/// Reserved for transport- or correctness-related flags; the algorithms
/// never inspect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollAttr(pub u32);

impl CollAttr {
    pub const NONE: CollAttr = CollAttr(0);
}

/// Element types supported by the built-in reduction operators.
///
/// cohort defines its own type enum so it remains a standalone library
/// usable by any Rust project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    F32 = 0,
    F64 = 1,
    F16 = 2,
    BF16 = 3,
    I8 = 4,
    I32 = 5,
    I64 = 6,
    U8 = 7,
    U32 = 8,
    U64 = 9,
}

impl DataType {
    /// Size of one element in bytes.
    pub const fn size_in_bytes(self) -> usize {
        match self {
            DataType::F32 | DataType::I32 | DataType::U32 => 4,
            DataType::F64 | DataType::I64 | DataType::U64 => 8,
            DataType::F16 | DataType::BF16 => 2,
            DataType::I8 | DataType::U8 => 1,
        }
    }

    /// Human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            DataType::F32 => "f32",
            DataType::F64 => "f64",
            DataType::F16 => "f16",
            DataType::BF16 => "bf16",
            DataType::I8 => "i8",
            DataType::I32 => "i32",
            DataType::I64 => "i64",
            DataType::U8 => "u8",
            DataType::U32 => "u32",
            DataType::U64 => "u64",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Layout descriptor for one element of a typed buffer, as reported by the
/// external datatype subsystem.
///
/// `size` is the packed (wire) byte count. `extent` is the stride between
/// consecutive elements in memory. `true_lb` is the offset of the first
/// actually-occupied byte relative to the nominal element start; it may be
/// negative, in which case scratch allocations must cover the span before
/// the nominal base as well. Non-contiguous layouts reach this layer
/// already flattened to packed bytes; the descriptor still drives scratch
/// sizing and per-peer offset arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Packed bytes per element (what travels on the wire).
    pub size: usize,
    /// In-memory stride between consecutive elements.
    pub extent: usize,
    /// Offset of the first occupied byte; negative when an element's span
    /// begins before its nominal start address.
    pub true_lb: i64,
    /// In-memory span of one element's occupied bytes.
    pub true_extent: usize,
    /// Whether the buffer is addressable as a flat byte range.
    pub contiguous: bool,
}

impl Layout {
    /// A contiguous layout of `size`-byte elements.
    pub const fn contiguous(size: usize) -> Self {
        Layout {
            size,
            extent: size,
            true_lb: 0,
            true_extent: size,
            contiguous: true,
        }
    }

    /// The contiguous layout of one `dtype` element.
    pub const fn of(dtype: DataType) -> Self {
        Layout::contiguous(dtype.size_in_bytes())
    }

    /// Wire bytes for `count` packed elements.
    pub const fn packed_len(&self, count: usize) -> usize {
        count * self.size
    }

    /// Allocation size for a scratch buffer holding `count` elements.
    ///
    /// Covers the larger of extent and true extent per element, so an
    /// element whose occupied span begins before its nominal start
    /// (negative `true_lb`) still fits.
    pub fn scratch_len(&self, count: usize) -> usize {
        count * self.extent.max(self.true_extent)
    }
}
