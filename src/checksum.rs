//! Hash functions used to key archive resources and HSL identifiers.
//!
//! The two families never share key space: archives are addressed by CRC-32,
//! bytecode functions, classes and names by the 32-bit mixing hash.

/// Initial register for [`crc32`] when keying paths and resource sizes.
pub const CRC32_SEED: u32 = 0xFFFF_FFFF;
/// Seed for [`mix32`] when hashing HSL identifiers.
pub const MIX32_SEED: u32 = 0xDEAD_BEEF;

const CRC32_POLY: u32 = 0xEDB8_8320;
const MIX32_M: u32 = 0x5bd1_e995;
const MIX32_R: u32 = 24;

/// Reflected CRC-32, one bit at a time. Returns the complemented register.
pub fn crc32(data: &[u8], seed: u32) -> u32 {
	let mut crc = seed;
	for &byte in data {
		crc ^= byte as u32;
		for _ in 0..8 {
			let mask = (crc & 1).wrapping_neg();
			crc = (crc >> 1) ^ (CRC32_POLY & mask);
		}
	}
	!crc
}

/// 32-bit multiply/xor mixer over 4-byte little-endian blocks.
pub fn mix32(data: &[u8], seed: u32) -> u32 {
	let mut h = seed ^ data.len() as u32;

	let mut blocks = data.chunks_exact(4);
	for block in &mut blocks {
		let mut k = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
		k = k.wrapping_mul(MIX32_M);
		k ^= k >> MIX32_R;
		k = k.wrapping_mul(MIX32_M);

		h = h.wrapping_mul(MIX32_M);
		h ^= k;
	}

	// the tail cases fall through into each other
	let tail = blocks.remainder();
	if tail.len() >= 3 {
		h ^= (tail[2] as u32) << 16;
	}
	if tail.len() >= 2 {
		h ^= (tail[1] as u32) << 8;
	}
	if !tail.is_empty() {
		h ^= tail[0] as u32;
		h = h.wrapping_mul(MIX32_M);
	}

	h ^= h >> 13;
	h = h.wrapping_mul(MIX32_M);
	h ^= h >> 15;
	h
}

/// Bytes the engine feeds to a hash for a string key: ASCII with `?`
/// substituted for anything else, cut at the first NUL.
pub fn ascii_key(s: &str) -> Vec<u8> {
	s.chars()
		.map(|c| if c.is_ascii() { c as u8 } else { b'?' })
		.take_while(|&b| b != 0)
		.collect()
}

/// Content hash of a resource path.
pub fn crc32_str(path: &str) -> u32 {
	crc32(&ascii_key(path), CRC32_SEED)
}

/// Identifier hash of an HSL function, class or token name.
pub fn mix32_str(name: &str) -> u32 {
	mix32(&ascii_key(name), MIX32_SEED)
}
