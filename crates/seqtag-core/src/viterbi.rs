//! # Viterbi decoding
//!
//! Finds the most likely tag sequence given per-token emission scores, a
//! transition matrix, and a hard constraint mask (forbidden transitions are
//! never taken, whatever their score).

use crate::error::{Result, SeqtagError};

/// Viterbi decoder over a fixed-size tag inventory.
#[derive(Debug, Clone)]
pub struct ViterbiDecoder {
    num_tags: usize,
}

impl ViterbiDecoder {
    /// Create a decoder for `num_tags` distinct tags.
    pub fn new(num_tags: usize) -> Self {
        Self { num_tags }
    }

    /// Decode the optimal tag sequence.
    ///
    /// # Arguments
    /// * `emissions` - `[seq_len][num_tags]` emission scores
    /// * `transitions` - `[num_tags][num_tags]` transition scores
    /// * `valid` - `[prev][next]` constraint mask
    pub fn decode(
        &self,
        emissions: &[Vec<f32>],
        transitions: &[Vec<f32>],
        valid: &[Vec<bool>],
    ) -> Result<Vec<usize>> {
        let seq_len = emissions.len();
        if seq_len == 0 {
            return Ok(Vec::new());
        }
        if emissions[0].len() != self.num_tags {
            return Err(SeqtagError::Decode(format!(
                "emission score dimension mismatch: expected {}, got {}",
                self.num_tags,
                emissions[0].len()
            )));
        }

        // DP table and backpointers
        let mut dp: Vec<Vec<f32>> = vec![vec![f32::NEG_INFINITY; self.num_tags]; seq_len];
        let mut backptr: Vec<Vec<Option<usize>>> = vec![vec![None; self.num_tags]; seq_len];

        for tag in 0..self.num_tags {
            dp[0][tag] = emissions[0][tag];
        }

        for pos in 1..seq_len {
            for curr in 0..self.num_tags {
                let mut best_score = f32::NEG_INFINITY;
                let mut best_prev = None;

                for prev in 0..self.num_tags {
                    if !valid[prev][curr] {
                        continue;
                    }
                    let score =
                        dp[pos - 1][prev] + transitions[prev][curr] + emissions[pos][curr];
                    if score > best_score {
                        best_score = score;
                        best_prev = Some(prev);
                    }
                }

                dp[pos][curr] = best_score;
                backptr[pos][curr] = best_prev;
            }
        }

        // Best final tag, then backtrack.
        let mut best_final = 0;
        let mut best_score = f32::NEG_INFINITY;
        for tag in 0..self.num_tags {
            if dp[seq_len - 1][tag] > best_score {
                best_score = dp[seq_len - 1][tag];
                best_final = tag;
            }
        }

        let mut path = vec![best_final];
        let mut curr = best_final;
        for pos in (1..seq_len).rev() {
            curr = backptr[pos][curr].unwrap_or(0);
            path.push(curr);
        }

        path.reverse();
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::TagSet;

    fn tags() -> TagSet {
        TagSet::new(vec!["O".into(), "B-PER".into(), "I-PER".into()]).unwrap()
    }

    fn flat_transitions(n: usize) -> Vec<Vec<f32>> {
        vec![vec![0.0; n]; n]
    }

    #[test]
    fn follows_dominant_emissions() {
        let tags = tags();
        let decoder = ViterbiDecoder::new(tags.len());
        let emissions = vec![
            vec![0.1, 2.0, 0.1], // B-PER
            vec![0.1, 0.1, 2.0], // I-PER
            vec![2.0, 0.1, 0.1], // O
        ];

        let path = decoder
            .decode(&emissions, &flat_transitions(3), &tags.transition_mask())
            .unwrap();
        assert_eq!(path, vec![1, 2, 0]);
    }

    #[test]
    fn forbidden_transitions_are_never_taken() {
        let tags = tags();
        let decoder = ViterbiDecoder::new(tags.len());
        // I-PER dominates everywhere after an O, but O -> I-PER is invalid.
        let emissions = vec![vec![2.0, 0.1, 0.1], vec![0.1, 0.1, 2.0]];

        let path = decoder
            .decode(&emissions, &flat_transitions(3), &tags.transition_mask())
            .unwrap();
        assert_eq!(path[0], 0);
        assert_ne!(path[1], 2);
    }

    #[test]
    fn empty_sequence_decodes_to_empty_path() {
        let tags = tags();
        let decoder = ViterbiDecoder::new(tags.len());
        let path = decoder
            .decode(&[], &flat_transitions(3), &tags.transition_mask())
            .unwrap();
        assert!(path.is_empty());
    }

    #[test]
    fn dimension_mismatch_is_an_error() {
        let decoder = ViterbiDecoder::new(3);
        let err = decoder
            .decode(
                &[vec![0.0, 1.0]],
                &flat_transitions(3),
                &tags().transition_mask(),
            )
            .unwrap_err();
        assert!(matches!(err, SeqtagError::Decode(_)));
    }
}
