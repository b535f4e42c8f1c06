use std::fmt::Debug;
use std::io::{self, prelude::*};

use libflate::{deflate, zlib};

use crate::error::{HatchError, HatchResult};

/// Inflates a compressed payload into exactly `raw_size` bytes.
///
/// Implementations fail with [`HatchError::CorruptData`] on malformed input or
/// when the output length differs from `raw_size`.
pub trait Decompressor: Debug + Send + Sync {
	fn decompress(&self, stored: &[u8], raw_size: u64) -> HatchResult<Vec<u8>>;
}

/// zlib-wrapped DEFLATE streams. Used by [`HatchArchive::open`](super::HatchArchive::open).
#[derive(Debug, Default, Clone, Copy)]
pub struct ZlibDecompressor;

/// Raw DEFLATE streams, without the zlib header and checksum.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeflateDecompressor;

impl Decompressor for ZlibDecompressor {
	fn decompress(&self, stored: &[u8], raw_size: u64) -> HatchResult<Vec<u8>> {
		let decoder = zlib::Decoder::new(stored).map_err(corrupt)?;
		inflate_exact(decoder, raw_size)
	}
}

impl Decompressor for DeflateDecompressor {
	fn decompress(&self, stored: &[u8], raw_size: u64) -> HatchResult<Vec<u8>> {
		inflate_exact(deflate::Decoder::new(stored), raw_size)
	}
}

fn corrupt(e: io::Error) -> HatchError {
	HatchError::CorruptData(format!("inflate failed: {}", e))
}

fn inflate_exact<R: Read>(decoder: R, raw_size: u64) -> HatchResult<Vec<u8>> {
	let mut data = Vec::new();
	// one byte of slack so an oversized stream is noticed
	decoder
		.take(raw_size.saturating_add(1))
		.read_to_end(&mut data)
		.map_err(corrupt)?;

	if data.len() as u64 != raw_size {
		return Err(HatchError::CorruptData(format!(
			"stream inflated to {}{} bytes, expected {}",
			if data.len() as u64 > raw_size { "more than " } else { "" },
			raw_size.min(data.len() as u64),
			raw_size
		)));
	}

	Ok(data)
}
