//! Query-time score accumulation.

use crate::invfile::ImageScore;

/// Accumulates per-word score contributions into one score per corpus image
/// and applies the image-level L2 normalization.
///
/// Scores are accumulated in a dense table indexed by image id; the caller
/// sizes it so every indexed image id is in bounds, the same contract as
/// [`InvertedFile::add_self_similarities`](crate::invfile::InvertedFile::add_self_similarities).
#[derive(Debug, Clone)]
pub struct ScoreAccumulator {
    scores: Vec<f32>,
}

impl ScoreAccumulator {
    /// Create an accumulator for image ids `0..num_images`.
    pub fn new(num_images: usize) -> Self {
        Self {
            scores: vec![0.0; num_images],
        }
    }

    /// Add one feature's contributions, as emitted by
    /// [`InvertedFile::score_feature`](crate::invfile::InvertedFile::score_feature).
    pub fn merge(&mut self, contributions: &[ImageScore]) {
        for contribution in contributions {
            self.scores[contribution.image_id as usize] += contribution.score;
        }
    }

    /// Normalize accumulated scores by `√(self_q · self_db)`.
    ///
    /// `query_self_similarity` is the query image's own self-similarity
    /// (sum of squared IDF weights over its features' words);
    /// `self_similarities` the per-corpus-image factors. Images with a zero
    /// factor keep a zero score. A no-op if the query self-similarity is
    /// not positive (a query touching only untrained words).
    pub fn normalize(&mut self, query_self_similarity: f64, self_similarities: &[f64]) {
        debug_assert!(self_similarities.len() >= self.scores.len());

        if query_self_similarity <= 0.0 {
            return;
        }

        for (score, &self_similarity) in self.scores.iter_mut().zip(self_similarities) {
            if self_similarity > 0.0 {
                *score /= (query_self_similarity * self_similarity).sqrt() as f32;
            } else {
                *score = 0.0;
            }
        }
    }

    /// Consume the accumulator, returning up to `max_results` images with
    /// positive scores, descending by score (ties broken by ascending id).
    pub fn into_ranked(self, max_results: usize) -> Vec<ImageScore> {
        let mut ranked: Vec<ImageScore> = self
            .scores
            .into_iter()
            .enumerate()
            .filter(|(_, score)| *score > 0.0)
            .map(|(image_id, score)| ImageScore {
                image_id: image_id as u32,
                score,
            })
            .collect();

        ranked.sort_unstable_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.image_id.cmp(&b.image_id))
        });
        ranked.truncate(max_results);
        ranked
    }
}
