//! Inverted file implementation.

use std::collections::HashSet;
use std::io::{Read, Write};

use crate::error::Result;
use crate::invfile::{median, ImageScore, PostingEntry};
use crate::signature::BinarySignature;
use crate::weights::HammingWeights;

/// Thresholds have been learned from a descriptor sample.
const HAS_EMBEDDING: u8 = 0x01;
/// Entries are sorted by ascending image id.
const SORTED: u8 = 0x02;

/// Inverted file for one visual word.
///
/// Holds the postings indexed under the word, the per-dimension thresholds
/// of the Hamming embedding and the word's IDF weight. The const parameter
/// `B` is the signature width in bytes (`8 * B` bits).
///
/// See the [module docs](crate::invfile) for the build/query lifecycle.
#[derive(Debug, Clone, PartialEq)]
pub struct InvertedFile<const B: usize> {
    status: u8,
    idf_weight: f32,
    entries: Vec<PostingEntry<B>>,
    thresholds: Vec<f32>,
}

impl<const B: usize> Default for InvertedFile<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const B: usize> InvertedFile<B> {
    /// Signature width in bits.
    pub const BITS: usize = B * 8;

    /// Create an empty file: no postings, zero thresholds, zero IDF.
    pub fn new() -> Self {
        Self {
            status: 0,
            idf_weight: 0.0,
            entries: Vec::new(),
            thresholds: vec![0.0; Self::BITS],
        }
    }

    /// Number of postings.
    pub fn num_entries(&self) -> usize {
        self.entries.len()
    }

    /// Whether the file holds no postings.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether thresholds have been learned.
    pub fn has_embedding(&self) -> bool {
        self.status & HAS_EMBEDDING != 0
    }

    /// Whether the postings are sorted by image id.
    pub fn entries_sorted(&self) -> bool {
        self.status & SORTED != 0
    }

    /// Whether the file is ready for scoring: thresholds learned and
    /// postings sorted.
    pub fn is_usable(&self) -> bool {
        self.has_embedding() && self.entries_sorted()
    }

    /// IDF weight of this word; zero until computed.
    pub fn idf_weight(&self) -> f32 {
        self.idf_weight
    }

    /// Learned per-dimension thresholds; all zero until learned.
    pub fn thresholds(&self) -> &[f32] {
        &self.thresholds
    }

    /// Threshold a projected descriptor against the current thresholds.
    pub fn quantize(&self, descriptor: &[f32]) -> BinarySignature<B> {
        BinarySignature::quantize(descriptor, &self.thresholds)
    }

    /// Append a posting for `image_id`.
    ///
    /// The signature is computed against the *current* thresholds, so the
    /// intended pipeline is learn thresholds first, then add postings.
    /// Adding earlier is permitted (the signature is then the sign bits of
    /// the descriptor) but such postings are only meaningful if the file is
    /// rebuilt once thresholds are known.
    ///
    /// Clears the sorted bit.
    pub fn add_entry(&mut self, image_id: u32, descriptor: &[f32]) {
        let signature = self.quantize(descriptor);
        self.entries.push(PostingEntry {
            image_id,
            signature,
        });
        self.status &= !SORTED;
    }

    /// Sort postings by ascending image id and set the sorted bit.
    ///
    /// Required before [`Self::score_feature`]. The relative order of
    /// postings with equal image id is irrelevant to scoring.
    pub fn sort_entries(&mut self) {
        self.entries.sort_unstable_by_key(|entry| entry.image_id);
        self.status |= SORTED;
    }

    /// Remove all postings, keeping thresholds and IDF.
    pub fn clear_entries(&mut self) {
        self.entries.clear();
        self.status &= !SORTED;
    }

    /// Return the file to its freshly-created state.
    pub fn reset(&mut self) {
        self.status = 0;
        self.idf_weight = 0.0;
        self.entries.clear();
        self.thresholds.fill(0.0);
    }

    /// Learn the Hamming-embedding thresholds from a descriptor sample.
    ///
    /// Each row of `descriptors` is one projected descriptor of length
    /// [`Self::BITS`]; the threshold of dimension `n` becomes the median of
    /// column `n` (lower middle for an even number of rows). With fewer than
    /// two rows there is nothing to learn and the call is a no-op.
    pub fn compute_hamming_embedding<D: AsRef<[f32]>>(&mut self, descriptors: &[D]) {
        let num_descriptors = descriptors.len();
        if num_descriptors < 2 {
            return;
        }

        let mut column = vec![0.0f32; num_descriptors];
        for n in 0..Self::BITS {
            for (i, descriptor) in descriptors.iter().enumerate() {
                let row = descriptor.as_ref();
                debug_assert_eq!(row.len(), Self::BITS);
                column[i] = row[n];
            }
            self.thresholds[n] = median(&mut column);
        }

        self.status |= HAS_EMBEDDING;
    }

    /// Compute the IDF weight: `ln(1 + num_total_images / U)` where `U` is
    /// the number of distinct image ids among the postings.
    ///
    /// No change if the file is empty.
    pub fn compute_idf_weight(&mut self, num_total_images: u32) {
        if self.entries.is_empty() {
            return;
        }

        let mut image_ids = HashSet::new();
        self.collect_image_ids(&mut image_ids);

        self.idf_weight =
            (1.0 + f64::from(num_total_images) / image_ids.len() as f64).ln() as f32;
    }

    /// Score a query feature against every posting, emitting one
    /// `(image_id, score)` pair per distinct image in ascending image-id
    /// order.
    ///
    /// `scores` is cleared first. If the file is not usable or holds no
    /// postings the result is empty. For an image with `k` postings at
    /// Hamming distances `d₁..d_k` from the query signature the emitted
    /// score is `(Σⱼ w(dⱼ) / √k) · idf²`.
    ///
    /// Single ordered sweep; no posting is visited twice and nothing is
    /// allocated beyond `scores`.
    pub fn score_feature(
        &self,
        descriptor: &[f32],
        weights: &HammingWeights,
        scores: &mut Vec<ImageScore>,
    ) {
        scores.clear();

        if !self.is_usable() || self.entries.is_empty() {
            return;
        }
        debug_assert_eq!(weights.num_bits(), Self::BITS);

        let squared_idf = self.idf_weight * self.idf_weight;
        let query = self.quantize(descriptor);

        let mut current = ImageScore {
            image_id: self.entries[0].image_id,
            score: 0.0,
        };
        let mut num_votes = 0u32;

        for entry in &self.entries {
            if current.image_id < entry.image_id {
                if num_votes > 0 {
                    current.score /= (num_votes as f32).sqrt();
                    current.score *= squared_idf;
                    scores.push(current);
                }
                current = ImageScore {
                    image_id: entry.image_id,
                    score: 0.0,
                };
                num_votes = 0;
            }

            let dist = query.hamming_distance(&entry.signature);
            current.score += weights.weight(dist);
            num_votes += 1;
        }

        // The run with the largest image id.
        if num_votes > 0 {
            current.score /= (num_votes as f32).sqrt();
            current.score *= squared_idf;
            scores.push(current);
        }
    }

    /// Insert every distinct image id present in the postings into `ids`.
    pub fn collect_image_ids(&self, ids: &mut HashSet<u32>) {
        for entry in &self.entries {
            ids.insert(entry.image_id);
        }
    }

    /// For each posting, add `idf²` to `self_similarities[image_id]`.
    ///
    /// This is the per-word share of each image's self-similarity, used by
    /// the caller for L2 normalization of accumulated query scores. The
    /// caller must size the slice so every image id indexes in bounds.
    pub fn add_self_similarities(&self, self_similarities: &mut [f64]) {
        let squared_idf = f64::from(self.idf_weight) * f64::from(self.idf_weight);
        for entry in &self.entries {
            self_similarities[entry.image_id as usize] += squared_idf;
        }
    }

    /// Read a file from the current stream position.
    ///
    /// Layout as written by [`Self::write_to`]. The declared entry count is
    /// trusted; a truncated stream surfaces as an I/O error and the partial
    /// result is discarded.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut status = [0u8; 1];
        reader.read_exact(&mut status)?;

        let mut f32_bytes = [0u8; 4];
        reader.read_exact(&mut f32_bytes)?;
        let idf_weight = f32::from_le_bytes(f32_bytes);

        let mut thresholds = vec![0.0f32; Self::BITS];
        for threshold in thresholds.iter_mut() {
            reader.read_exact(&mut f32_bytes)?;
            *threshold = f32::from_le_bytes(f32_bytes);
        }

        let mut count_bytes = [0u8; 4];
        reader.read_exact(&mut count_bytes)?;
        let num_entries = u32::from_le_bytes(count_bytes);

        let mut entries = Vec::with_capacity(num_entries as usize);
        for _ in 0..num_entries {
            entries.push(PostingEntry::read_from(reader)?);
        }

        Ok(Self {
            status: status[0],
            idf_weight,
            entries,
            thresholds,
        })
    }

    /// Write the file at the current stream position.
    ///
    /// Layout, all little-endian: status byte, IDF weight (`f32`),
    /// `8 * B` threshold floats, entry count (`u32`), then the entries.
    /// No framing, no checksum, no version byte.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&[self.status])?;
        writer.write_all(&self.idf_weight.to_le_bytes())?;

        for threshold in &self.thresholds {
            writer.write_all(&threshold.to_le_bytes())?;
        }

        writer.write_all(&(self.entries.len() as u32).to_le_bytes())?;
        for entry in &self.entries {
            entry.write_to(writer)?;
        }

        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn entries(&self) -> &[PostingEntry<B>] {
        &self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(value: f32) -> Vec<f32> {
        vec![value; 8]
    }

    #[test]
    fn new_file_is_unusable() {
        let file = InvertedFile::<1>::new();
        assert!(!file.has_embedding());
        assert!(!file.entries_sorted());
        assert!(!file.is_usable());
        assert_eq!(file.idf_weight(), 0.0);
        assert_eq!(file.num_entries(), 0);
        assert!(file.thresholds().iter().all(|&t| t == 0.0));
    }

    #[test]
    fn add_entry_clears_sorted() {
        let mut file = InvertedFile::<1>::new();
        file.sort_entries();
        assert!(file.entries_sorted());

        file.add_entry(3, &descriptor(1.0));
        assert!(!file.entries_sorted());
        assert_eq!(file.num_entries(), 1);
    }

    #[test]
    fn sort_orders_by_image_id() {
        let mut file = InvertedFile::<1>::new();
        for id in [5u32, 1, 9, 1, 3] {
            file.add_entry(id, &descriptor(1.0));
        }
        file.sort_entries();

        assert!(file.entries_sorted());
        let ids: Vec<u32> = file.entries().iter().map(|e| e.image_id).collect();
        assert_eq!(ids, vec![1, 1, 3, 5, 9]);
    }

    #[test]
    fn embedding_needs_two_descriptors() {
        let mut file = InvertedFile::<1>::new();
        file.compute_hamming_embedding(&[descriptor(4.0)]);
        assert!(!file.has_embedding());
        assert!(file.thresholds().iter().all(|&t| t == 0.0));

        file.compute_hamming_embedding(&[descriptor(2.0), descriptor(4.0)]);
        assert!(file.has_embedding());
        // Lower middle of {2, 4} per column.
        assert!(file.thresholds().iter().all(|&t| t == 2.0));
    }

    #[test]
    fn embedding_takes_column_medians() {
        let mut file = InvertedFile::<1>::new();
        let mut rows = vec![vec![0.0f32; 8]; 4];
        for (i, value) in [-1.0f32, 0.0, 2.0, 3.0].iter().enumerate() {
            rows[i][0] = *value;
        }
        file.compute_hamming_embedding(&rows);
        assert_eq!(file.thresholds()[0], 0.0);
    }

    #[test]
    fn idf_weight_counts_unique_images() {
        let mut file = InvertedFile::<1>::new();
        for id in [1u32, 2, 3, 4, 5, 3, 3] {
            file.add_entry(id, &descriptor(1.0));
        }
        file.compute_idf_weight(1000);
        assert!((file.idf_weight() - (1.0f32 + 200.0).ln()).abs() < 1e-5);
    }

    #[test]
    fn idf_weight_noop_on_empty_file() {
        let mut file = InvertedFile::<1>::new();
        file.compute_idf_weight(1000);
        assert_eq!(file.idf_weight(), 0.0);
    }

    #[test]
    fn scoring_unusable_file_is_empty() {
        let mut file = InvertedFile::<1>::new();
        file.add_entry(1, &descriptor(1.0));
        file.sort_entries();
        // Sorted but no embedding: not usable.
        assert!(!file.is_usable());

        let weights = HammingWeights::gaussian(8);
        let mut scores = vec![ImageScore {
            image_id: 0,
            score: 1.0,
        }];
        file.score_feature(&descriptor(1.0), &weights, &mut scores);
        assert!(scores.is_empty());
    }

    #[test]
    fn reset_returns_to_initial_state() {
        let mut file = InvertedFile::<1>::new();
        file.compute_hamming_embedding(&[descriptor(-1.0), descriptor(1.0)]);
        file.add_entry(2, &descriptor(1.0));
        file.compute_idf_weight(10);
        file.sort_entries();
        assert!(file.is_usable());

        file.reset();
        assert_eq!(file, InvertedFile::<1>::new());
    }

    #[test]
    fn clear_entries_keeps_embedding() {
        let mut file = InvertedFile::<1>::new();
        file.compute_hamming_embedding(&[descriptor(-1.0), descriptor(1.0)]);
        file.add_entry(2, &descriptor(1.0));
        file.sort_entries();

        file.clear_entries();
        assert!(file.is_empty());
        assert!(file.has_embedding());
        assert!(!file.entries_sorted());
    }
}
