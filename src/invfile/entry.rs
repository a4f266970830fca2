//! Posting entries.

use std::io::{Read, Write};

use crate::error::Result;
use crate::signature::BinarySignature;

/// One posting: an image identifier and the binary signature of the feature
/// that was indexed under this word.
///
/// The on-disk layout matches the in-memory layout byte for byte: a
/// little-endian `u32` image id followed by `B` signature bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostingEntry<const B: usize> {
    pub image_id: u32,
    pub signature: BinarySignature<B>,
}

impl<const B: usize> PostingEntry<B> {
    /// Read one entry from the current stream position.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut id_bytes = [0u8; 4];
        reader.read_exact(&mut id_bytes)?;

        let mut sig_bytes = [0u8; B];
        reader.read_exact(&mut sig_bytes)?;

        Ok(Self {
            image_id: u32::from_le_bytes(id_bytes),
            signature: BinarySignature::from_bytes(sig_bytes),
        })
    }

    /// Write one entry at the current stream position.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.image_id.to_le_bytes())?;
        writer.write_all(self.signature.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_round_trip() {
        let entry = PostingEntry::<4> {
            image_id: 0xDEAD_BEEF,
            signature: BinarySignature::from_bytes([0x01, 0x80, 0xFF, 0x00]),
        };

        let mut buf = Vec::new();
        entry.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), 4 + 4);
        // Little-endian image id, then raw signature bytes.
        assert_eq!(&buf[..4], &[0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(&buf[4..], &[0x01, 0x80, 0xFF, 0x00]);

        let parsed = PostingEntry::<4>::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn truncated_entry_is_an_error() {
        let entry = PostingEntry::<8> {
            image_id: 1,
            signature: BinarySignature::zero(),
        };
        let mut buf = Vec::new();
        entry.write_to(&mut buf).unwrap();
        buf.truncate(buf.len() - 1);

        assert!(PostingEntry::<8>::read_from(&mut buf.as_slice()).is_err());
    }
}
