//! Position-dependent XOR/nibble-swap scrambler applied to obfuscated
//! archive resources.
//!
//! Not cryptography. The keys derive from the resource's content hash and
//! size, and the counter state is a pure function of the byte offset inside
//! the resource, so any offset can be reached by replaying the schedule.

use crate::checksum::{crc32, CRC32_SEED};

/// Counter state of the scrambler at one byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherState {
	pub swap_nibbles: bool,
	pub index_a: u8,
	pub index_b: u8,
	pub xor_value: u8,
}

impl CipherState {
	/// State for offset 0 of a resource of `raw_size` bytes.
	pub fn new(raw_size: u64) -> Self {
		CipherState {
			swap_nibbles: false,
			index_a: 0,
			index_b: 8,
			xor_value: ((raw_size >> 2) & 0x7F) as u8,
		}
	}

	/// State for byte `offset`, by replaying the schedule from offset 0.
	pub fn at(raw_size: u64, offset: u64) -> Self {
		let mut state = CipherState::new(raw_size);
		state.skip(offset);
		state
	}

	/// Run the schedule `count` times without touching any data.
	pub fn skip(&mut self, count: u64) {
		for _ in 0..count {
			self.advance();
		}
	}

	/// Step to the next byte.
	pub fn advance(&mut self) {
		self.index_a += 1;
		self.index_b += 1;

		if self.index_a <= 15 {
			if self.index_b > 12 {
				self.index_b = 0;
				self.swap_nibbles = !self.swap_nibbles;
			}
		} else if self.index_b <= 8 {
			self.index_a = 0;
			self.swap_nibbles = !self.swap_nibbles;
		} else {
			self.xor_value = (self.xor_value + 2) & 0x7F;
			if self.swap_nibbles {
				self.swap_nibbles = false;
				self.index_a = self.xor_value % 7;
				self.index_b = (self.xor_value % 12) + 2;
			} else {
				self.swap_nibbles = true;
				self.index_a = (self.xor_value % 12) + 3;
				self.index_b = self.xor_value % 7;
			}
		}
	}
}

/// Keys for one resource.
#[derive(Debug, Clone)]
pub struct ResourceCipher {
	key_a: [u8; 16],
	key_b: [u8; 16],
	raw_size: u64,
}

fn swap_nibbles(byte: u8) -> u8 {
	byte.rotate_left(4)
}

fn replicate(word: u32) -> [u8; 16] {
	let bytes = word.to_le_bytes();
	let mut key = [0u8; 16];
	for chunk in key.chunks_exact_mut(4) {
		chunk.copy_from_slice(&bytes);
	}
	key
}

impl ResourceCipher {
	pub fn new(content_hash: u32, raw_size: u64) -> Self {
		let size_hash = crc32(&raw_size.to_le_bytes(), CRC32_SEED);
		ResourceCipher {
			key_a: replicate(content_hash),
			key_b: replicate(size_hash),
			raw_size,
		}
	}

	pub fn raw_size(&self) -> u64 {
		self.raw_size
	}

	pub fn state_at(&self, offset: u64) -> CipherState {
		CipherState::at(self.raw_size, offset)
	}

	/// Recover stored bytes, continuing from `state`.
	pub fn decrypt(&self, state: &mut CipherState, buf: &mut [u8]) {
		for byte in buf.iter_mut() {
			let mut temp = *byte ^ state.xor_value ^ self.key_b[state.index_b as usize];
			if state.swap_nibbles {
				temp = swap_nibbles(temp);
			}
			*byte = temp ^ self.key_a[state.index_a as usize];
			state.advance();
		}
	}

	/// Inverse of [`decrypt`](Self::decrypt) under the same schedule.
	pub fn encrypt(&self, state: &mut CipherState, buf: &mut [u8]) {
		for byte in buf.iter_mut() {
			let mut temp = *byte ^ self.key_a[state.index_a as usize];
			if state.swap_nibbles {
				temp = swap_nibbles(temp);
			}
			*byte = temp ^ state.xor_value ^ self.key_b[state.index_b as usize];
			state.advance();
		}
	}

	/// Decrypt `buf`, which starts at byte `offset` of the resource.
	pub fn decrypt_at(&self, offset: u64, buf: &mut [u8]) {
		let mut state = self.state_at(offset);
		self.decrypt(&mut state, buf);
	}

	pub fn encrypt_at(&self, offset: u64, buf: &mut [u8]) {
		let mut state = self.state_at(offset);
		self.encrypt(&mut state, buf);
	}
}

/// Decrypt a whole resource in place.
pub fn decrypt(content_hash: u32, raw_size: u64, buf: &mut [u8]) {
	ResourceCipher::new(content_hash, raw_size).decrypt_at(0, buf);
}

/// Obfuscate a whole resource in place.
pub fn encrypt(content_hash: u32, raw_size: u64, buf: &mut [u8]) {
	ResourceCipher::new(content_hash, raw_size).encrypt_at(0, buf);
}
