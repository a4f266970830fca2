//! loci: inverted-file image retrieval primitives.
//!
//! Given a visual vocabulary of `V` words and a corpus of images represented
//! as bags of local features, loci indexes each feature under its assigned
//! word and answers "which corpus images most resemble this query image?".
//! It combines three classical ideas into one engine:
//!
//! 1. **Inverted indexing**: one posting list per word ([`invfile`])
//! 2. **Hamming embedding**: per-posting binary signatures refine matches
//!    beyond word assignment alone ([`signature`])
//! 3. **Weighted voting**: TF-IDF weights, per-image burstiness
//!    normalization and a Hamming-distance-to-weight kernel ([`weights`])
//!
//! Vocabulary construction and descriptor-to-word assignment are external:
//! loci starts where a feature already carries its word id and its
//! projected descriptor.
//!
//! # Pipeline
//!
//! ```text
//! build:  descriptors ─► train_word (median thresholds)
//!                     ─► add_feature (postings)
//!                     ─► finalize (IDF + sort)          ─► save
//!
//! query:  descriptor  ─► score_feature per word ─► merge ─► L2-normalize
//!                                                         ─► ranked images
//! ```
//!
//! # Which signature width?
//!
//! | Bits | Type | Trade-off |
//! |------|------|-----------|
//! | 32 | `InvertedFile<4>` | smallest postings, coarsest refinement |
//! | 64 | `InvertedFile<8>` | the usual sweet spot |
//! | 128 | `InvertedFile<16>` | finest refinement, 2x posting size |
//!
//! The width is a const generic byte count, so distances stay a handful of
//! XOR/POPCNT instructions at every width.
//!
//! # Example
//!
//! ```rust
//! use loci::{HammingWeights, VocabularyIndex};
//!
//! # fn main() -> loci::Result<()> {
//! let mut index = VocabularyIndex::<1>::new(2, HammingWeights::gaussian(8))?;
//!
//! // Learn per-word thresholds, then index two images.
//! index.train_word(0, &[vec![-1.0f32; 8], vec![1.0f32; 8]])?;
//! index.add_feature(0, 0, &[2.0; 8])?;
//! index.add_feature(0, 1, &[-2.0; 8])?;
//! index.finalize(2);
//!
//! // A query feature near image 0's descriptor ranks image 0 first.
//! let ranked = index.query(&[(0u32, vec![1.5f32; 8])], 2, 10)?;
//! assert_eq!(ranked[0].image_id, 0);
//! # Ok(())
//! # }
//! ```
//!
//! # References
//!
//! - Jégou, Douze, Schmid (2008). "Hamming embedding and weak geometric
//!   consistency for large scale image search."
//! - Arandjelović, Zisserman (2014). "DisLocation: Scalable descriptor
//!   distinctiveness for location recognition." (burstiness correction)
//! - Sivic, Zisserman (2003). "Video Google: A text retrieval approach to
//!   object matching in videos." (TF-IDF voting)

pub mod error;
pub mod index;
pub mod invfile;
pub mod signature;
pub mod weights;

pub use error::{Result, RetrievalError};
pub use index::{IndexStats, ScoreAccumulator, VocabularyIndex};
pub use invfile::{ImageScore, InvertedFile, PostingEntry};
pub use signature::BinarySignature;
pub use weights::HammingWeights;
