//! Max-product decoding.

use crate::anchoring::{Anchoring, Augment};
use crate::errors::{Result, TrellisError};

const INVALID_TAG: u32 = u32::MAX;

/// Best tag sequence of one anchored sentence with its linear score.
pub struct ViterbiPath {
    tags: Vec<u32>,
    score: f64,
}

impl ViterbiPath {
    /// Returns the decoded tag ids.
    #[inline(always)]
    pub fn tags(&self) -> &[u32] {
        &self.tags
    }

    /// Returns the linear log-score of the path.
    #[inline(always)]
    pub const fn score(&self) -> f64 {
        self.score
    }

    /// Consumes the path, returning the decoded tag ids.
    pub fn into_tags(self) -> Vec<u32> {
        self.tags
    }
}

impl<A> Anchoring<A>
where
    A: Augment,
{
    /// Decodes the highest-scoring tag sequence.
    ///
    /// Ties break toward the lowest departing tag id, which makes the result
    /// deterministic.
    ///
    /// # Errors
    ///
    /// [`TrellisError::Infeasible`] is returned when some trellis column has
    /// no reachable tag.
    pub fn viterbi(&self) -> Result<ViterbiPath> {
        let n = self.num_positions();
        let k = self.num_tags();
        if n == 0 {
            return Ok(ViterbiPath {
                tags: vec![],
                score: 0.0,
            });
        }

        let mut best = vec![f64::NEG_INFINITY; (n + 1) * k];
        best[self.start_id() as usize] = 0.0;
        let mut back = vec![INVALID_TAG; n * k];
        for i in 0..n {
            let mut reachable = false;
            for &cur in self.allowed_tags(i) {
                let mut cell = f64::NEG_INFINITY;
                let mut arg = INVALID_TAG;
                for &prev in self.previous_tags(i) {
                    let cand =
                        best[i * k + prev as usize] + self.score_transition(i, prev, cur);
                    debug_assert!(!cand.is_nan());
                    if cand > cell {
                        cell = cand;
                        arg = prev;
                    }
                }
                if cell != f64::NEG_INFINITY {
                    best[(i + 1) * k + cur as usize] = cell;
                    back[i * k + cur as usize] = arg;
                    reachable = true;
                }
            }
            if !reachable {
                return Err(TrellisError::infeasible(i));
            }
        }

        let mut last = INVALID_TAG;
        let mut score = f64::NEG_INFINITY;
        for &cur in self.allowed_tags(n - 1) {
            let cand = best[n * k + cur as usize];
            if cand > score {
                score = cand;
                last = cur;
            }
        }
        debug_assert_ne!(last, INVALID_TAG);

        let mut tags = vec![INVALID_TAG; n];
        tags[n - 1] = last;
        for pos in (1..n).rev() {
            let prev = back[pos * k + tags[pos] as usize];
            debug_assert_ne!(prev, INVALID_TAG);
            tags[pos - 1] = prev;
        }
        Ok(ViterbiPath { tags, score })
    }
}
