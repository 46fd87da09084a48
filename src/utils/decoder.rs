//! Create-instruction decoder
//!
//! Parses the borsh-style layout of pump.fun `create` payloads:
//! 8-byte discriminator, three u32-LE length-prefixed UTF-8 strings
//! (name, symbol, uri) and three 32-byte public keys (mint, bonding curve,
//! user). Any short read or bad UTF-8 is a typed decode error; a partially
//! filled record is never returned.

use serde::Serialize;

use crate::models::errors::{AppError, AppResult};
use crate::utils::constants::{DISCRIMINATOR_LEN, PROGRAM_DATA_PREFIX, PUBKEY_LEN};

/// Decoded fields of a create instruction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreateInstructionFields {
    pub name: String,
    pub symbol: String,
    pub uri: String,
    /// Base58 text
    pub mint: String,
    /// Base58 text
    pub bonding_curve: String,
    /// Base58 text
    pub user: String,
}

/// Bounds-checked forward reader over a payload
struct Cursor<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    fn new(buf: &'a [u8], offset: usize) -> Self {
        Self { buf, offset }
    }

    fn take(&mut self, field: &str, n: usize) -> AppResult<&'a [u8]> {
        let end = self
            .offset
            .checked_add(n)
            .filter(|end| *end <= self.buf.len())
            .ok_or_else(|| AppError::truncated(field, self.offset, n, self.buf.len()))?;
        let bytes = &self.buf[self.offset..end];
        self.offset = end;
        Ok(bytes)
    }

    fn read_u32_le(&mut self, field: &str) -> AppResult<u32> {
        let bytes = self.take(field, 4)?;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(bytes);
        Ok(u32::from_le_bytes(raw))
    }

    fn read_string(&mut self, field: &str) -> AppResult<String> {
        let len = self.read_u32_le(field)? as usize;
        let bytes = self.take(field, len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|e| AppError::invalid_utf8(field, e))
    }

    fn read_pubkey(&mut self, field: &str) -> AppResult<String> {
        let bytes = self.take(field, PUBKEY_LEN)?;
        Ok(bs58::encode(bytes).into_string())
    }
}

/// Decoder for pump.fun create payloads
pub struct CreateDecoder;

impl CreateDecoder {
    /// Decode a create payload. The discriminator is skipped, not checked.
    pub fn decode(buf: &[u8]) -> AppResult<CreateInstructionFields> {
        if buf.len() < DISCRIMINATOR_LEN {
            return Err(AppError::missing_discriminator(buf.len()));
        }

        let mut cursor = Cursor::new(buf, DISCRIMINATOR_LEN);
        let name = cursor.read_string("name")?;
        let symbol = cursor.read_string("symbol")?;
        let uri = cursor.read_string("uri")?;
        let mint = cursor.read_pubkey("mint")?;
        let bonding_curve = cursor.read_pubkey("bonding_curve")?;
        let user = cursor.read_pubkey("user")?;

        Ok(CreateInstructionFields {
            name,
            symbol,
            uri,
            mint,
            bonding_curve,
            user,
        })
    }

    /// Extract and base58-decode the payload of a `Program data:` log line.
    ///
    /// Returns `None` when the line carries no program data.
    pub fn decode_program_data_line(line: &str) -> Option<AppResult<Vec<u8>>> {
        let encoded = line.strip_prefix(PROGRAM_DATA_PREFIX)?;
        Some(
            bs58::decode(encoded.trim())
                .into_vec()
                .map_err(AppError::invalid_base58),
        )
    }

    /// Render a program data payload as text for display
    pub fn payload_as_text(bytes: &[u8]) -> AppResult<&str> {
        std::str::from_utf8(bytes).map_err(|e| AppError::invalid_utf8("program_data", e))
    }

    /// Inverse of [`CreateDecoder::decode`], used to build fixtures
    #[cfg(test)]
    pub(crate) fn encode(
        discriminator: [u8; DISCRIMINATOR_LEN],
        name: &str,
        symbol: &str,
        uri: &str,
        keys: [[u8; PUBKEY_LEN]; 3],
    ) -> Vec<u8> {
        let mut out = discriminator.to_vec();
        for s in [name, symbol, uri] {
            out.extend_from_slice(&(s.len() as u32).to_le_bytes());
            out.extend_from_slice(s.as_bytes());
        }
        for key in keys {
            out.extend_from_slice(&key);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::errors::ErrorCode;

    const DISC: [u8; 8] = [0x18, 0x1e, 0xc8, 0x28, 0x05, 0x1c, 0x07, 0x77];

    fn keys() -> [[u8; 32]; 3] {
        [[1u8; 32], [2u8; 32], [3u8; 32]]
    }

    #[test]
    fn test_decode_full_payload() {
        let buf = CreateDecoder::encode(DISC, "Doge Moon", "DGM", "https://x.io/m.json", keys());
        let fields = CreateDecoder::decode(&buf).unwrap();

        assert_eq!(fields.name, "Doge Moon");
        assert_eq!(fields.symbol, "DGM");
        assert_eq!(fields.uri, "https://x.io/m.json");
        assert_eq!(bs58::decode(&fields.mint).into_vec().unwrap(), vec![1u8; 32]);
        assert_eq!(bs58::decode(&fields.bonding_curve).into_vec().unwrap(), vec![2u8; 32]);
        assert_eq!(bs58::decode(&fields.user).into_vec().unwrap(), vec![3u8; 32]);
    }

    #[test]
    fn test_discriminator_is_not_validated() {
        let buf = CreateDecoder::encode([0u8; 8], "a", "b", "c", keys());
        assert!(CreateDecoder::decode(&buf).is_ok());
    }

    #[test]
    fn test_short_buffer_missing_discriminator() {
        let err = CreateDecoder::decode(&[0u8; 7]).unwrap_err();
        assert_eq!(err.code, ErrorCode::DecodeMissingDiscriminator);
    }

    #[test]
    fn test_every_truncation_fails() {
        let buf = CreateDecoder::encode(DISC, "name", "SYM", "uri://", keys());
        for cut in DISCRIMINATOR_LEN..buf.len() {
            let err = CreateDecoder::decode(&buf[..cut]).unwrap_err();
            assert_eq!(err.code, ErrorCode::DecodeTruncated, "cut at {}", cut);
        }
    }

    #[test]
    fn test_length_prefix_past_end() {
        let mut buf = DISC.to_vec();
        buf.extend_from_slice(&u32::MAX.to_le_bytes());
        buf.extend_from_slice(b"abc");
        let err = CreateDecoder::decode(&buf).unwrap_err();
        assert_eq!(err.code, ErrorCode::DecodeTruncated);
    }

    #[test]
    fn test_invalid_utf8() {
        let mut buf = DISC.to_vec();
        buf.extend_from_slice(&2u32.to_le_bytes());
        buf.extend_from_slice(&[0xff, 0xfe]);
        let err = CreateDecoder::decode(&buf).unwrap_err();
        assert_eq!(err.code, ErrorCode::DecodeInvalidUtf8);
    }

    #[test]
    fn test_program_data_line() {
        let encoded = bs58::encode(b"hello").into_string();
        let line = format!("Program data: {}", encoded);
        let bytes = CreateDecoder::decode_program_data_line(&line).unwrap().unwrap();
        assert_eq!(CreateDecoder::payload_as_text(&bytes).unwrap(), "hello");

        assert!(CreateDecoder::decode_program_data_line("Program log: Instruction: Create").is_none());

        let err = CreateDecoder::decode_program_data_line("Program data: 0OIl").unwrap().unwrap_err();
        assert_eq!(err.code, ErrorCode::DecodeInvalidBase58);
    }
}
