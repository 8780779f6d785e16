//! Non-owning scatter/gather byte views.

/// A borrowed contiguous byte range.
pub type ByteSlice<'a> = &'a [u8];

/// An ordered, non-owning sequence of byte slices.
///
/// Flattening is concatenation; the total length is the sum of the slice
/// lengths. The backing storage stays with whoever produced the slices, and
/// a producer invalidates them on its next mutating call (each `scan`, each
/// transform).
#[derive(Clone, Copy, Debug, Default)]
pub struct IoVec<'a> {
    slices: &'a [ByteSlice<'a>],
}

impl<'a> IoVec<'a> {
    pub fn new(slices: &'a [ByteSlice<'a>]) -> Self {
        Self { slices }
    }

    /// View a single slice as a one-element vector.
    pub fn single(slice: &'a ByteSlice<'a>) -> Self {
        Self {
            slices: std::slice::from_ref(slice),
        }
    }

    /// Total byte length across all slices.
    pub fn len(&self) -> usize {
        self.slices.iter().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn slices(&self) -> &'a [ByteSlice<'a>] {
        self.slices
    }

    pub fn iter(&self) -> impl Iterator<Item = ByteSlice<'a>> + '_ {
        self.slices.iter().copied()
    }

    /// Concatenate every slice into one owned buffer.
    pub fn flatten(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.len());
        for s in self.slices {
            buf.extend_from_slice(s);
        }
        buf
    }
}
