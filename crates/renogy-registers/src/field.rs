use crate::ByteOrder;

/// Compose the unsigned integer stored in `buffer[offset..offset + length]`.
///
/// The caller checks that the range is inside `buffer`. Ranges wider than
/// eight bytes keep only the least-significant 64 bits.
pub fn decode_field(buffer: &[u8], offset: usize, length: usize, order: ByteOrder) -> u64 {
    let bytes = &buffer[offset..offset + length];
    match order {
        ByteOrder::Big => bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)),
        ByteOrder::Little => bytes
            .iter()
            .rev()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b)),
    }
}

/// Split a payload into big-endian 16-bit words, dropping a trailing odd byte.
pub fn raw_words(payload: &[u8]) -> Vec<u16> {
    payload
        .chunks_exact(2)
        .map(|w| u16::from_be_bytes([w[0], w[1]]))
        .collect()
}
