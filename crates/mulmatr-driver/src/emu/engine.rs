//! Matrix-vector multiply
//!
//! `result[r] = Σ matrix[r·n + c] · vector[c]` over `c ∈ [0, n)`, with
//! 32-bit two's-complement wraparound. Matrix A is packed with stride `n`,
//! not with the buffer's row capacity.

/// Fixed-function multiply unit
#[derive(Debug, Default, Clone, Copy)]
pub struct MultiplyEngine;

impl MultiplyEngine {
    /// Multiply the leading `n × n` block of `matrix` by the first `n` cells of `vector`.
    ///
    /// `n = 0` yields an empty result.
    ///
    /// # Panics
    ///
    /// Panics if `matrix` holds fewer than `n²` cells or `vector` fewer
    /// than `n`. The register file buffers always satisfy this for
    /// `n ≤ MAX_SIZE`.
    pub fn run(matrix: &[i32], vector: &[i32], n: usize) -> Vec<i32> {
        if n == 0 {
            return Vec::new();
        }
        let vector = &vector[..n];
        matrix[..n * n]
            .chunks_exact(n)
            .map(|row| {
                row.iter()
                    .zip(vector)
                    .fold(0i32, |acc, (&a, &b)| acc.wrapping_add(a.wrapping_mul(b)))
            })
            .collect()
    }
}
