//! Outbound wire frame: JSON header, one newline, little-endian PCM.

use voice_relay_domain::{AudioMetadata, PcmBuffer};

const SEPARATOR: u8 = b'\n';

/// One complete outbound binary message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireFrame {
    bytes: Vec<u8>,
    header_len: usize,
}

impl WireFrame {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// The JSON header, without the separator.
    pub fn header(&self) -> &[u8] {
        &self.bytes[..self.header_len]
    }

    /// The PCM payload following the separator.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[self.header_len + 1..]
    }
}

/// Assemble a frame from a metadata snapshot and encoded audio.
pub fn build_frame(metadata: &AudioMetadata, pcm: &PcmBuffer) -> WireFrame {
    // Serializing a struct of enum tags and static codes cannot fail, and JSON
    // string escaping guarantees the header holds no raw newline.
    let header = serde_json::to_vec(metadata).unwrap_or_default();
    let header_len = header.len();
    let mut bytes = Vec::with_capacity(header_len + 1 + pcm.byte_len());
    bytes.extend_from_slice(&header);
    bytes.push(SEPARATOR);
    pcm.write_le_bytes(&mut bytes);
    WireFrame { bytes, header_len }
}
