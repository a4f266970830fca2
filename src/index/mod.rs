//! Vocabulary-level index: one inverted file per visual word.
//!
//! [`VocabularyIndex`] owns the `V` inverted files of a vocabulary together
//! with the shared Hamming-weight table, and concatenates them behind a
//! small header for persistence.
//!
//! # Build pipeline
//!
//! ```rust,ignore
//! let mut index = VocabularyIndex::<8>::new(num_words, HammingWeights::gaussian(64))?;
//!
//! // 1. Learn thresholds per word from a descriptor sample.
//! for (word_id, sample) in samples {
//!     index.train_word(word_id, &sample)?;
//! }
//! // 2. Index every feature of every corpus image.
//! for (word_id, image_id, descriptor) in features {
//!     index.add_feature(word_id, image_id, &descriptor)?;
//! }
//! // 3. Freeze: IDF weights + sorted postings.
//! index.finalize(num_images);
//!
//! index.save("corpus.loci")?;
//! ```
//!
//! # Query pipeline
//!
//! Per query feature, resolve its word externally and call
//! [`VocabularyIndex::query_feature`]; merge the emitted contributions in a
//! [`ScoreAccumulator`]. [`VocabularyIndex::query`] bundles those steps and
//! returns a ranked, L2-normalized result list.

mod aggregate;

pub use aggregate::ScoreAccumulator;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RetrievalError};
use crate::invfile::{ImageScore, InvertedFile};
use crate::weights::HammingWeights;

/// Magic bytes of the on-disk index format.
pub const INDEX_MAGIC: [u8; 4] = *b"LIVF";

/// Current on-disk format version.
pub const FORMAT_VERSION: u32 = 1;

/// Summary statistics of an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of visual words (inverted files).
    pub num_words: usize,
    /// Signature width in bits.
    pub signature_bits: usize,
    /// Total postings across all words.
    pub num_entries: u64,
    /// Words that are trained, sorted and ready for scoring.
    pub num_usable_words: usize,
}

/// All inverted files of one vocabulary plus the shared weight table.
///
/// `B` is the signature width in bytes; it must match the width of the
/// supplied [`HammingWeights`].
#[derive(Debug, Clone)]
pub struct VocabularyIndex<const B: usize> {
    files: Vec<InvertedFile<B>>,
    weights: HammingWeights,
}

impl<const B: usize> VocabularyIndex<B> {
    /// Signature width in bits.
    pub const BITS: usize = B * 8;

    /// Create an index of `num_words` empty inverted files.
    pub fn new(num_words: usize, weights: HammingWeights) -> Result<Self> {
        if weights.num_bits() != Self::BITS {
            return Err(RetrievalError::InvalidParameter(format!(
                "weight table built for {} bits, index uses {}",
                weights.num_bits(),
                Self::BITS
            )));
        }

        Ok(Self {
            files: vec![InvertedFile::new(); num_words],
            weights,
        })
    }

    /// Number of visual words.
    pub fn num_words(&self) -> usize {
        self.files.len()
    }

    /// The shared Hamming-weight table.
    pub fn weights(&self) -> &HammingWeights {
        &self.weights
    }

    /// The inverted file of one word.
    pub fn word(&self, word_id: u32) -> Result<&InvertedFile<B>> {
        self.files
            .get(word_id as usize)
            .ok_or_else(|| Self::unknown_word(word_id))
    }

    fn word_mut(&mut self, word_id: u32) -> Result<&mut InvertedFile<B>> {
        self.files
            .get_mut(word_id as usize)
            .ok_or_else(|| Self::unknown_word(word_id))
    }

    fn unknown_word(word_id: u32) -> RetrievalError {
        RetrievalError::InvalidParameter(format!("word id {} out of range", word_id))
    }

    /// Learn the Hamming-embedding thresholds of one word from a sample of
    /// projected descriptors assigned to it.
    pub fn train_word<D: AsRef<[f32]>>(&mut self, word_id: u32, descriptors: &[D]) -> Result<()> {
        self.word_mut(word_id)?.compute_hamming_embedding(descriptors);
        Ok(())
    }

    /// Index one feature of a corpus image under its word.
    pub fn add_feature(&mut self, word_id: u32, image_id: u32, descriptor: &[f32]) -> Result<()> {
        self.word_mut(word_id)?.add_entry(image_id, descriptor);
        Ok(())
    }

    /// Freeze the index for querying: compute every word's IDF weight from
    /// the total corpus size, then sort its postings.
    ///
    /// After this call every trained, non-empty word is usable.
    pub fn finalize(&mut self, num_total_images: u32) {
        for file in &mut self.files {
            file.compute_idf_weight(num_total_images);
            file.sort_entries();
        }
    }

    /// Score one query feature against the postings of its word.
    ///
    /// `scores` receives one `(image_id, score)` pair per matching image in
    /// ascending image-id order; empty if the word is not usable.
    pub fn query_feature(
        &self,
        word_id: u32,
        descriptor: &[f32],
        scores: &mut Vec<ImageScore>,
    ) -> Result<()> {
        self.word(word_id)?
            .score_feature(descriptor, &self.weights, scores);
        Ok(())
    }

    /// Self-similarity of a query image whose features resolved to
    /// `word_ids` (one entry per feature): the sum of squared IDF weights.
    pub fn query_self_similarity(&self, word_ids: &[u32]) -> Result<f64> {
        let mut total = 0.0f64;
        for &word_id in word_ids {
            let idf = f64::from(self.word(word_id)?.idf_weight());
            total += idf * idf;
        }
        Ok(total)
    }

    /// Per-image self-similarities over the whole corpus, the normalization
    /// factors for [`ScoreAccumulator::normalize`].
    ///
    /// `num_images` must exceed every indexed image id.
    pub fn self_similarities(&self, num_images: usize) -> Vec<f64> {
        let mut self_similarities = vec![0.0f64; num_images];
        for file in &self.files {
            file.add_self_similarities(&mut self_similarities);
        }
        self_similarities
    }

    /// Run a full query: score every feature, merge the contributions and
    /// return up to `max_results` images ranked by normalized similarity.
    ///
    /// Each feature is a `(word_id, projected descriptor)` pair.
    /// `num_images` must exceed every indexed image id.
    pub fn query<D: AsRef<[f32]>>(
        &self,
        features: &[(u32, D)],
        num_images: usize,
        max_results: usize,
    ) -> Result<Vec<ImageScore>> {
        let mut accumulator = ScoreAccumulator::new(num_images);
        let mut scores = Vec::new();
        let mut word_ids = Vec::with_capacity(features.len());

        for (word_id, descriptor) in features {
            self.query_feature(*word_id, descriptor.as_ref(), &mut scores)?;
            accumulator.merge(&scores);
            word_ids.push(*word_id);
        }

        let query_self = self.query_self_similarity(&word_ids)?;
        accumulator.normalize(query_self, &self.self_similarities(num_images));
        Ok(accumulator.into_ranked(max_results))
    }

    /// Summary statistics.
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            num_words: self.files.len(),
            signature_bits: Self::BITS,
            num_entries: self.files.iter().map(|f| f.num_entries() as u64).sum(),
            num_usable_words: self.files.iter().filter(|f| f.is_usable()).count(),
        }
    }

    /// Write the index at the current stream position: header, then the
    /// per-word files concatenated in word order.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&INDEX_MAGIC)?;
        writer.write_all(&FORMAT_VERSION.to_le_bytes())?;
        writer.write_all(&(self.files.len() as u32).to_le_bytes())?;
        writer.write_all(&(B as u32).to_le_bytes())?;

        for file in &self.files {
            file.write_to(writer)?;
        }
        Ok(())
    }

    /// Read an index from the current stream position.
    ///
    /// `weights` is the process-wide weight table for this signature width;
    /// it is not part of the on-disk format. Rejects unknown magic bytes,
    /// an unsupported version and a signature width other than `B`.
    pub fn read_from<R: Read>(reader: &mut R, weights: HammingWeights) -> Result<Self> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if magic != INDEX_MAGIC {
            return Err(RetrievalError::Format(format!(
                "bad magic bytes {:?}, not a loci index",
                magic
            )));
        }

        let mut u32_bytes = [0u8; 4];
        reader.read_exact(&mut u32_bytes)?;
        let version = u32::from_le_bytes(u32_bytes);
        if version != FORMAT_VERSION {
            return Err(RetrievalError::Format(format!(
                "unsupported format version {}",
                version
            )));
        }

        reader.read_exact(&mut u32_bytes)?;
        let num_words = u32::from_le_bytes(u32_bytes);

        reader.read_exact(&mut u32_bytes)?;
        let signature_bytes = u32::from_le_bytes(u32_bytes);
        if signature_bytes as usize != B {
            return Err(RetrievalError::Format(format!(
                "index stores {}-byte signatures, expected {}",
                signature_bytes, B
            )));
        }

        if weights.num_bits() != Self::BITS {
            return Err(RetrievalError::InvalidParameter(format!(
                "weight table built for {} bits, index uses {}",
                weights.num_bits(),
                Self::BITS
            )));
        }

        let mut files = Vec::with_capacity(num_words as usize);
        for _ in 0..num_words {
            files.push(InvertedFile::read_from(reader)?);
        }

        Ok(Self { files, weights })
    }

    /// Save the index to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;
        writer.flush()?;
        Ok(())
    }

    /// Load an index from a file.
    pub fn load<P: AsRef<Path>>(path: P, weights: HammingWeights) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        Self::read_from(&mut reader, weights)
    }
}
