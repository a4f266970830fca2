//! Hamming-distance-to-weight lookup table.
//!
//! Matching a query signature against a posting signature yields a Hamming
//! distance `d`; the vote that match contributes is `w(d)`. The mapping is
//! precomputed once per signature width and shared read-only by every
//! inverted file, so scoring is a single table lookup per posting.
//!
//! Required properties of any kernel:
//!
//! - `w` is monotonically non-increasing in `d`
//! - `w(d) = 0` for all `d` above a cutoff (matches at large Hamming
//!   distance carry no evidence)
//! - the table depends only on the signature width, never on IDF or on
//!   which word produced the match

/// Precomputed voting weights for Hamming distances `0..=num_bits`.
///
/// Build one per signature width at startup and pass it by reference into
/// scoring. The table is immutable after construction and safe to share
/// across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct HammingWeights {
    table: Vec<f32>,
}

impl HammingWeights {
    /// Gaussian kernel with the standard cutoff at a quarter of the bits.
    ///
    /// `w(d) = exp(-d² / (2σ²))` for `d ≤ num_bits / 4` and zero beyond,
    /// with `σ = num_bits / 8`. Deterministic: two tables built for the same
    /// width are identical.
    pub fn gaussian(num_bits: usize) -> Self {
        assert!(num_bits > 0, "signature width must be positive");

        let cutoff = (num_bits / 4) as u32;
        let sigma = (num_bits as f32 / 8.0).max(1.0);
        Self::from_kernel(num_bits, |d| {
            if d > cutoff {
                0.0
            } else {
                let d = d as f32;
                (-(d * d) / (2.0 * sigma * sigma)).exp()
            }
        })
    }

    /// Build a table from an arbitrary kernel.
    ///
    /// The kernel is evaluated once per distance in `0..=num_bits`. It must
    /// be non-negative and monotonically non-increasing; both are checked in
    /// debug builds.
    pub fn from_kernel<F: Fn(u32) -> f32>(num_bits: usize, kernel: F) -> Self {
        assert!(num_bits > 0, "signature width must be positive");

        let table: Vec<f32> = (0..=num_bits as u32).map(kernel).collect();

        debug_assert!(table.iter().all(|&w| w >= 0.0), "kernel must be non-negative");
        debug_assert!(
            table.windows(2).all(|w| w[0] >= w[1]),
            "kernel must be non-increasing in distance"
        );

        Self { table }
    }

    /// Voting weight for Hamming distance `d`.
    #[inline]
    pub fn weight(&self, d: u32) -> f32 {
        debug_assert!((d as usize) < self.table.len());
        self.table[d as usize]
    }

    /// Signature width the table was built for, in bits.
    pub fn num_bits(&self) -> usize {
        self.table.len() - 1
    }
}
