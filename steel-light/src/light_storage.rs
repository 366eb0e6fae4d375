//! Light storage for chunk sections.
//!
//! Light values are stored as 4-bit values (0-15), packed as two values per byte.
//! For a 16x16x16 section, this requires 2048 bytes (4096 blocks / 2).

use steel_utils::BlockPos;

use crate::error::LightError;

/// The number of bytes needed to store light data for a 16x16x16 section.
/// 16*16*16 blocks = 4096 blocks, at 4 bits per block = 2048 bytes
pub const LIGHT_ARRAY_SIZE: usize = 2048;

/// Bytes covering one horizontal 16x16 layer.
const LAYER_SIZE: usize = 128;

/// Storage for light data in a chunk section.
/// Light values range from 0-15 (4 bits per block).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LightStorage {
    /// All blocks in the section have the same light level (0-15).
    Homogeneous(u8),
    /// Blocks have different light levels, stored as packed nibbles.
    /// Each byte contains two 4-bit light values.
    Heterogeneous(Box<[u8; LIGHT_ARRAY_SIZE]>),
}

#[inline]
const fn nibble_index(x: usize, y: usize, z: usize) -> usize {
    y << 8 | z << 4 | x
}

#[inline]
const fn pack(level: u8) -> u8 {
    (level & 0x0F) | ((level & 0x0F) << 4)
}

impl LightStorage {
    /// Creates a new homogeneous light storage with all blocks at the given light level.
    #[must_use]
    pub fn new_filled(light_level: u8) -> Self {
        debug_assert!(light_level <= 15, "Light level must be 0-15");
        Self::Homogeneous(light_level)
    }

    /// Creates a new empty (dark) light storage.
    #[must_use]
    pub const fn new_empty() -> Self {
        Self::Homogeneous(0)
    }

    /// Reads a persisted or received section.
    ///
    /// Any length other than [`LIGHT_ARRAY_SIZE`] is rejected; the caller is
    /// expected to discard the data and relight the chunk.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, LightError> {
        let data: [u8; LIGHT_ARRAY_SIZE] =
            bytes
                .try_into()
                .map_err(|_| LightError::InvalidLayerLength {
                    expected: LIGHT_ARRAY_SIZE,
                    actual: bytes.len(),
                })?;

        let first = data[0];
        if (first & 0x0F) == (first >> 4) && data.iter().all(|&b| b == first) {
            return Ok(Self::Homogeneous(first & 0x0F));
        }
        Ok(Self::Heterogeneous(Box::new(data)))
    }

    /// Gets the light level at the given position.
    ///
    /// # Arguments
    /// * `x` - X coordinate (0-15)
    /// * `y` - Y coordinate (0-15)
    /// * `z` - Z coordinate (0-15)
    #[must_use]
    #[inline]
    pub fn get(&self, x: usize, y: usize, z: usize) -> u8 {
        debug_assert!(x < 16 && y < 16 && z < 16, "Coordinates must be 0-15");

        match self {
            Self::Homogeneous(level) => *level,
            Self::Heterogeneous(data) => {
                let index = nibble_index(x, y, z);
                (data[index >> 1] >> ((index & 1) << 2)) & 0x0F
            }
        }
    }

    /// Gets the light level of a block inside this section.
    #[must_use]
    #[inline]
    pub fn get_at(&self, pos: BlockPos) -> u8 {
        let (x, y, z) = pos.section_relative();
        self.get(x, y, z)
    }

    /// Sets the light level at the given position.
    ///
    /// If currently homogeneous and setting a different value, upgrades to heterogeneous.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, z: usize, light_level: u8) {
        debug_assert!(x < 16 && y < 16 && z < 16, "Coordinates must be 0-15");
        debug_assert!(light_level <= 15, "Light level must be 0-15");

        if let Self::Homogeneous(current_level) = *self {
            if light_level == current_level {
                return;
            }
            *self = Self::Heterogeneous(Box::new([pack(current_level); LIGHT_ARRAY_SIZE]));
        }

        if let Self::Heterogeneous(data) = self {
            let index = nibble_index(x, y, z);
            let shift = (index & 1) << 2;
            let byte = &mut data[index >> 1];
            *byte = (*byte & !(0x0F << shift)) | ((light_level & 0x0F) << shift);
        }
    }

    /// Sets the light level of a block inside this section.
    #[inline]
    pub fn set_at(&mut self, pos: BlockPos, light_level: u8) {
        let (x, y, z) = pos.section_relative();
        self.set(x, y, z, light_level);
    }

    /// Whether every block in the section is dark.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Homogeneous(level) => *level == 0,
            Self::Heterogeneous(data) => data.iter().all(|&b| b == 0),
        }
    }

    /// Returns a section whose 16 layers all copy the bottom layer of this one.
    ///
    /// Used to seed a new section below a lit one.
    #[must_use]
    pub fn repeat_first_layer(&self) -> Self {
        match self {
            Self::Homogeneous(level) => Self::Homogeneous(*level),
            Self::Heterogeneous(data) => {
                let mut repeated = Box::new([0u8; LIGHT_ARRAY_SIZE]);
                for layer in repeated.chunks_exact_mut(LAYER_SIZE) {
                    layer.copy_from_slice(&data[..LAYER_SIZE]);
                }
                Self::Heterogeneous(repeated)
            }
        }
    }

    /// Returns the raw data for sending to the client.
    ///
    /// For homogeneous storage, creates a filled array.
    /// For heterogeneous storage, returns a clone of the data.
    #[must_use]
    pub fn to_packet_data(&self) -> Vec<u8> {
        match self {
            Self::Homogeneous(level) => vec![pack(*level); LIGHT_ARRAY_SIZE],
            Self::Heterogeneous(data) => data.to_vec(),
        }
    }

    /// Renders one horizontal layer as rows of hex digits, z major.
    #[must_use]
    pub fn layer_to_string(&self, y: usize) -> String {
        let mut out = String::with_capacity(16 * 17);
        for z in 0..16 {
            for x in 0..16 {
                let level = self.get(x, y, z);
                out.push(char::from_digit(u32::from(level), 16).unwrap_or('?'));
            }
            out.push('\n');
        }
        out
    }
}

impl Default for LightStorage {
    fn default() -> Self {
        Self::new_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Tests are allowed to panic
mod tests {
    use super::*;

    #[test]
    fn test_homogeneous_get() {
        let storage = LightStorage::new_filled(15);
        assert_eq!(storage.get(0, 0, 0), 15);
        assert_eq!(storage.get(15, 15, 15), 15);
    }

    #[test]
    fn test_set_upgrades_to_heterogeneous() {
        let mut storage = LightStorage::new_empty();
        storage.set(5, 5, 5, 14);

        assert_eq!(storage.get(5, 5, 5), 14);
        assert_eq!(storage.get(0, 0, 0), 0);

        assert!(matches!(storage, LightStorage::Heterogeneous(_)));
    }

    #[test]
    fn test_upgrade_keeps_previous_level() {
        let mut storage = LightStorage::new_filled(9);
        storage.set(3, 0, 0, 2);

        assert_eq!(storage.get(3, 0, 0), 2);
        assert_eq!(storage.get(2, 0, 0), 9);
        assert_eq!(storage.get(15, 15, 15), 9);
    }

    #[test]
    fn test_packed_nibbles() {
        let mut storage = LightStorage::new_empty();

        // Set two adjacent blocks (they share a byte)
        storage.set(0, 0, 0, 5);
        storage.set(1, 0, 0, 10);

        assert_eq!(storage.get(0, 0, 0), 5);
        assert_eq!(storage.get(1, 0, 0), 10);

        let bytes = storage.to_packet_data();
        assert_eq!(bytes[0], 0xA5);
    }

    #[test]
    fn test_index_layout() {
        let mut storage = LightStorage::new_empty();
        storage.set(0, 1, 0, 3);
        storage.set(0, 0, 1, 4);

        let bytes = storage.to_packet_data();
        assert_eq!(bytes[128] & 0x0F, 3);
        assert_eq!(bytes[8] & 0x0F, 4);
    }

    #[test]
    fn test_from_bytes_rejects_bad_length() {
        let err = LightStorage::from_bytes(&[0u8; 100]).unwrap_err();
        assert!(matches!(
            err,
            LightError::InvalidLayerLength {
                expected: LIGHT_ARRAY_SIZE,
                actual: 100
            }
        ));
    }

    #[test]
    fn test_from_bytes_detects_uniform() {
        let storage = LightStorage::from_bytes(&[0xFF; LIGHT_ARRAY_SIZE]).unwrap();
        assert_eq!(storage, LightStorage::Homogeneous(15));

        let mut bytes = [0u8; LIGHT_ARRAY_SIZE];
        bytes[2047] = 0x70;
        let storage = LightStorage::from_bytes(&bytes).unwrap();
        assert_eq!(storage.get(15, 15, 15), 7);
        assert_eq!(storage.get(14, 15, 15), 0);
    }

    #[test]
    fn test_repeat_first_layer() {
        let mut storage = LightStorage::new_empty();
        storage.set(4, 0, 9, 12);
        storage.set(4, 5, 9, 1);

        let repeated = storage.repeat_first_layer();
        for y in 0..16 {
            assert_eq!(repeated.get(4, y, 9), 12);
            assert_eq!(repeated.get(5, y, 9), 0);
        }
    }
}
