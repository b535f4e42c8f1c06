mod archive;
mod reader;

pub use self::archive::*;
pub use self::reader::*;

// =^w^= =^w^= =^w^= =^w^= =^w^=
// ~* archive on-disk layout *~
// =^w^= =^w^= =^w^= =^w^= =^w^=

use binrw::BinRead;

use crate::cipher::ResourceCipher;

pub const HATCH_MAGIC: &[u8] = b"HATCH";
/// Archive opened by [`HatchArchive::open_path`] when no path is given.
pub const DEFAULT_ARCHIVE_NAME: &str = "Data.hatch";
/// Registry flag marking a scrambled payload.
pub const RESOURCE_FLAG_OBFUSCATED: u32 = 1 << 1;

/// Size of the fixed part of the header, before the registry.
pub const HATCH_HEADER_SIZE: u64 = 5 + 3 + 2;
/// Size of one registry record.
pub const RESOURCE_ENTRY_SIZE: u64 = 4 + 8 + 8 + 4 + 8;

// Header: magic, three version bytes (not checked), then the registry
#[derive(Debug, BinRead, Clone)]
#[br(little, magic = b"HATCH")]
pub(crate) struct HatchHeader {
	pub version: [u8; 3],
	pub resource_count: u16,
	#[br(count = resource_count)]
	pub registry: Vec<ResourceEntry>,
}

/// One record of the resource registry.
#[derive(Debug, BinRead, Clone, Copy, PartialEq, Eq)]
#[br(little)]
pub struct ResourceEntry {
	/// CRC-32 of the resource path.
	pub content_hash: u32,
	/// Where the payload starts within the archive.
	pub offset: u64,
	/// Size of the payload once inflated.
	pub raw_size: u64,
	pub flags: u32,
	/// Size of the payload as stored. Differs from `raw_size` when compressed.
	pub stored_size: u64,
}

impl ResourceEntry {
	pub fn is_obfuscated(&self) -> bool {
		self.flags & RESOURCE_FLAG_OBFUSCATED != 0
	}

	pub fn is_compressed(&self) -> bool {
		self.stored_size != self.raw_size
	}

	/// Keys for this entry, if its payload is scrambled.
	pub fn cipher(&self) -> Option<ResourceCipher> {
		if self.is_obfuscated() {
			Some(ResourceCipher::new(self.content_hash, self.raw_size))
		} else {
			None
		}
	}
}
