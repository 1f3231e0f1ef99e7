//! Report descrambling for the CO2 monitor.
//!
//! Raw input reports are 8 bytes long and scrambled with the key the host
//! wrote to the device at start-up. Decoding runs four steps:
//!
//! 1. undo the byte shuffle (`plain[SHUFFLE[i]] = raw[i]`)
//! 2. XOR with the device key
//! 3. rotate the whole 64-bit block right by three bits
//! 4. subtract the nibble-swapped magic string `"Htemp99e"`
//!
//! [`ReportCodec::scramble`] applies the exact inverse and is used by the
//! simulated device and the test suite.

use crate::protocol::{DeviceKey, REPORT_LEN};

const SHUFFLE: [usize; REPORT_LEN] = [2, 4, 0, 7, 1, 6, 5, 3];
const MAGIC: &[u8; REPORT_LEN] = b"Htemp99e";

/// Keyed, reversible report transform.
#[derive(Debug, Clone, Copy)]
pub struct ReportCodec {
    key: DeviceKey,
}

impl ReportCodec {
    /// Create a codec bound to `key`.
    pub fn new(key: DeviceKey) -> Self {
        Self { key }
    }

    /// Convert a raw report into plaintext.
    ///
    /// Returns an empty vector when `raw` is not exactly one report long;
    /// callers treat that as "nothing to parse this cycle".
    pub fn descramble(&self, raw: &[u8]) -> Vec<u8> {
        let Ok(raw) = <&[u8; REPORT_LEN]>::try_from(raw) else {
            return Vec::new();
        };
        let key = self.key.as_bytes();

        let mut mixed = [0u8; REPORT_LEN];
        for (i, &target) in SHUFFLE.iter().enumerate() {
            mixed[target] = raw[i] ^ key[target];
        }

        let rotated = u64::from_be_bytes(mixed).rotate_right(3).to_be_bytes();

        rotated
            .iter()
            .zip(MAGIC.iter())
            .map(|(&byte, &magic)| byte.wrapping_sub(magic.rotate_left(4)))
            .collect()
    }

    /// Inverse of [`descramble`](Self::descramble).
    pub fn scramble(&self, plain: &[u8]) -> Vec<u8> {
        let Ok(plain) = <&[u8; REPORT_LEN]>::try_from(plain) else {
            return Vec::new();
        };
        let key = self.key.as_bytes();

        let mut shifted = [0u8; REPORT_LEN];
        for (i, byte) in shifted.iter_mut().enumerate() {
            *byte = plain[i].wrapping_add(MAGIC[i].rotate_left(4));
        }

        let mixed = u64::from_be_bytes(shifted).rotate_left(3).to_be_bytes();

        SHUFFLE
            .iter()
            .map(|&target| mixed[target] ^ key[target])
            .collect()
    }
}
