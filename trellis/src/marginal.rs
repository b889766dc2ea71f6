//! Forward–backward inference and posterior marginals.

use crate::anchoring::{Anchoring, Augment, NoAugment};
use crate::errors::{Result, TrellisError};
use crate::num::log_sum_exp;

/// Callable invoked once per non-zero posterior transition.
pub trait TransitionVisitor {
    /// Receives one `(pos, prev, cur)` triple with its posterior mass.
    ///
    /// # Errors
    ///
    /// Errors abort the traversal and propagate to the caller.
    fn visit(&mut self, pos: usize, prev: u32, cur: u32, weight: f64) -> Result<()>;
}

/// Posterior over tag configurations of one anchored sentence.
///
/// Either the CRF distribution obtained by forward–backward, or its Dirac
/// counterpart concentrated on a gold tag sequence. Both expose the same
/// marginal accessors and visitor so that expected-counts accumulation is a
/// single code path.
pub struct Marginal<'a, A = NoAugment> {
    anchoring: &'a Anchoring<A>,
    pub(crate) kind: Kind,
}

pub(crate) enum Kind {
    Dense {
        /// `forward[i][t]`: log-score of reaching fencepost `i` with tag `t`.
        forward: Vec<f64>,
        /// `backward[i][t]`: log-score of finishing from fencepost `i`.
        backward: Vec<f64>,
        log_partition: f64,
    },
    Gold {
        tags: Vec<u32>,
        score: f64,
    },
}

impl<A> Anchoring<A>
where
    A: Augment,
{
    /// Runs forward–backward over the anchored sentence.
    ///
    /// Both tables live in log-space; unreachable cells stay `-inf` and all
    /// reductions treat `-inf` as the additive identity.
    ///
    /// # Errors
    ///
    /// [`TrellisError::Infeasible`] is returned when some trellis column has
    /// no reachable tag.
    pub fn marginal(&self) -> Result<Marginal<'_, A>> {
        let n = self.num_positions();
        let k = self.num_tags();

        let mut forward = vec![f64::NEG_INFINITY; (n + 1) * k];
        forward[self.start_id() as usize] = 0.0;
        let mut terms = Vec::with_capacity(k);
        for i in 0..n {
            let mut reachable = false;
            for &cur in self.allowed_tags(i) {
                terms.clear();
                for &prev in self.previous_tags(i) {
                    terms.push(forward[i * k + prev as usize] + self.score_transition(i, prev, cur));
                }
                let score = log_sum_exp(&terms);
                forward[(i + 1) * k + cur as usize] = score;
                reachable |= score != f64::NEG_INFINITY;
            }
            if !reachable {
                return Err(TrellisError::infeasible(i));
            }
        }
        let log_partition = log_sum_exp(&forward[n * k..]);

        let mut backward = vec![f64::NEG_INFINITY; (n + 1) * k];
        for cell in &mut backward[n * k..] {
            *cell = 0.0;
        }
        for i in (1..n).rev() {
            for &cur in self.allowed_tags(i - 1) {
                terms.clear();
                for &next in self.allowed_tags(i) {
                    terms.push(
                        self.score_transition(i, cur, next) + backward[(i + 1) * k + next as usize],
                    );
                }
                backward[i * k + cur as usize] = log_sum_exp(&terms);
            }
        }

        Ok(Marginal {
            anchoring: self,
            kind: Kind::Dense {
                forward,
                backward,
                log_partition,
            },
        })
    }

    /// Builds the Dirac posterior concentrated on the given tag sequence.
    ///
    /// Its log-partition is the linear score of the path, which may be
    /// `-inf` when the path walks a forbidden transition.
    ///
    /// # Errors
    ///
    /// [`TrellisError::InvalidArgument`] is returned when the sequence
    /// length does not match the sentence.
    pub fn gold_marginal(&self, tags: &[u32]) -> Result<Marginal<'_, A>> {
        if tags.len() != self.num_positions() {
            return Err(TrellisError::invalid_argument(
                "tags",
                format!(
                    "expected {} tags, got {}",
                    self.num_positions(),
                    tags.len()
                ),
            ));
        }
        let mut score = 0.0;
        let mut prev = self.start_id();
        for (p, &cur) in tags.iter().enumerate() {
            debug_assert!((cur as usize) < self.num_tags());
            score += self.score_transition(p, prev, cur);
            prev = cur;
        }
        Ok(Marginal {
            anchoring: self,
            kind: Kind::Gold {
                tags: tags.to_vec(),
                score,
            },
        })
    }
}

impl<'a, A> Marginal<'a, A>
where
    A: Augment,
{
    /// Returns the anchoring this posterior was computed over.
    #[inline(always)]
    pub fn anchoring(&self) -> &'a Anchoring<A> {
        self.anchoring
    }

    /// Returns the log-partition: the log-normalizer of the dense posterior,
    /// or the linear path score of a gold posterior.
    pub fn log_partition(&self) -> f64 {
        match &self.kind {
            Kind::Dense { log_partition, .. } => *log_partition,
            Kind::Gold { score, .. } => *score,
        }
    }

    /// Returns the posterior mass of the transition into `cur` at `pos`,
    /// departing from `prev`. Forbidden or unreachable transitions have mass
    /// `0.0` exactly.
    pub fn transition_marginal(&self, pos: usize, prev: u32, cur: u32) -> f64 {
        match &self.kind {
            Kind::Dense {
                forward,
                backward,
                log_partition,
            } => {
                let k = self.anchoring.num_tags();
                let score = forward[pos * k + prev as usize]
                    + self.anchoring.score_transition(pos, prev, cur)
                    + backward[(pos + 1) * k + cur as usize];
                if score == f64::NEG_INFINITY {
                    0.0
                } else {
                    (score - log_partition).exp()
                }
            }
            Kind::Gold { tags, .. } => {
                let want_prev = if pos == 0 {
                    self.anchoring.start_id()
                } else {
                    tags[pos - 1]
                };
                if prev == want_prev && cur == tags[pos] {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Returns the posterior mass of emitting `cur` at `pos`, summed over
    /// the departing tag.
    pub fn position_marginal(&self, pos: usize, cur: u32) -> f64 {
        match &self.kind {
            Kind::Dense {
                forward,
                backward,
                log_partition,
            } => {
                let k = self.anchoring.num_tags();
                let score =
                    forward[(pos + 1) * k + cur as usize] + backward[(pos + 1) * k + cur as usize];
                if score == f64::NEG_INFINITY {
                    0.0
                } else {
                    (score - log_partition).exp()
                }
            }
            Kind::Gold { tags, .. } => {
                if cur == tags[pos] {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }

    /// Streams every non-zero posterior transition into the visitor.
    ///
    /// The traversal is restricted to the allowed tag sets; forbidden
    /// transitions carry no mass and are never reported.
    ///
    /// # Errors
    ///
    /// Errors returned by the visitor propagate unchanged.
    pub fn visit_transitions<V>(&self, visitor: &mut V) -> Result<()>
    where
        V: TransitionVisitor,
    {
        match &self.kind {
            Kind::Dense { backward, .. } => {
                let k = self.anchoring.num_tags();
                for pos in 0..self.anchoring.num_positions() {
                    for &cur in self.anchoring.allowed_tags(pos) {
                        if backward[(pos + 1) * k + cur as usize] == f64::NEG_INFINITY {
                            continue;
                        }
                        for &prev in self.anchoring.previous_tags(pos) {
                            let weight = self.transition_marginal(pos, prev, cur);
                            if weight != 0.0 {
                                visitor.visit(pos, prev, cur, weight)?;
                            }
                        }
                    }
                }
            }
            Kind::Gold { tags, .. } => {
                let mut prev = self.anchoring.start_id();
                for (pos, &cur) in tags.iter().enumerate() {
                    visitor.visit(pos, prev, cur, 1.0)?;
                    prev = cur;
                }
            }
        }
        Ok(())
    }
}
