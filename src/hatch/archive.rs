mod decompress;

pub use self::decompress::*;

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{self, prelude::*, BufReader, SeekFrom};
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use binrw::BinRead;
use log::{debug, trace, warn};

use super::*;
use crate::checksum::crc32_str;
use crate::error::{HatchError, HatchResult};

/// How a resource is addressed: by its path, or by the path's CRC-32.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKey<'a> {
	Name(&'a str),
	Hash(u32),
}

impl ResourceKey<'_> {
	pub fn hash(&self) -> u32 {
		match *self {
			ResourceKey::Name(name) => crc32_str(name),
			ResourceKey::Hash(hash) => hash,
		}
	}
}

impl<'a> From<&'a str> for ResourceKey<'a> {
	fn from(name: &'a str) -> Self {
		ResourceKey::Name(name)
	}
}

impl<'a> From<&'a String> for ResourceKey<'a> {
	fn from(name: &'a String) -> Self {
		ResourceKey::Name(name)
	}
}

impl From<u32> for ResourceKey<'_> {
	fn from(hash: u32) -> Self {
		ResourceKey::Hash(hash)
	}
}

impl fmt::Display for ResourceKey<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ResourceKey::Name(name) => write!(f, "\"{}\"", name),
			ResourceKey::Hash(hash) => write!(f, "{:#010x}", hash),
		}
	}
}

/// An opened Hatch archive. The registry is read once at open time; payloads
/// are read from `R` on demand.
#[derive(Debug)]
pub struct HatchArchive<R: Read + Seek> {
	reader: Mutex<R>,
	version: [u8; 3],
	registry: Vec<ResourceEntry>,
	lookup: HashMap<u32, usize>,
	decompressor: Box<dyn Decompressor>,
}

impl HatchArchive<BufReader<File>> {
	/// Opens an archive file, or [`DEFAULT_ARCHIVE_NAME`] if no path is given.
	pub fn open_path(path: Option<&Path>) -> HatchResult<Self> {
		let path = path.unwrap_or_else(|| Path::new(DEFAULT_ARCHIVE_NAME));
		let file = File::open(path)?;
		HatchArchive::open(BufReader::new(file))
	}
}

impl<R> HatchArchive<R>
where
	R: Read + Seek,
{
	pub fn open(stream: R) -> HatchResult<HatchArchive<R>> {
		HatchArchive::open_with(stream, Box::new(ZlibDecompressor))
	}

	/// Opens an archive whose compressed payloads are inflated by `decompressor`.
	pub fn open_with(
		mut stream: R,
		decompressor: Box<dyn Decompressor>,
	) -> HatchResult<HatchArchive<R>> {
		let header = HatchHeader::read(&mut stream)?;

		let mut lookup = HashMap::with_capacity(header.registry.len());
		for (index, entry) in header.registry.iter().enumerate() {
			if let Some(previous) = lookup.insert(entry.content_hash, index) {
				warn!(
					"resource {:#010x} is registered at both {} and {}; using {}",
					entry.content_hash, previous, index, index
				);
			}
		}

		debug!(
			"opened hatch archive v{}.{}.{} with {} resources",
			header.version[0],
			header.version[1],
			header.version[2],
			header.registry.len()
		);

		Ok(HatchArchive {
			reader: Mutex::new(stream),
			version: header.version,
			registry: header.registry,
			lookup,
			decompressor,
		})
	}

	/// The three version bytes from the header.
	pub fn version(&self) -> [u8; 3] {
		self.version
	}

	pub fn file_count(&self) -> usize {
		self.registry.len()
	}

	/// Registry records in archive order.
	pub fn entries(&self) -> &[ResourceEntry] {
		&self.registry
	}

	pub fn entry_at(&self, index: usize) -> HatchResult<&ResourceEntry> {
		self.registry.get(index).ok_or(HatchError::OutOfRange {
			index,
			count: self.registry.len(),
		})
	}

	pub fn has<'k>(&self, key: impl Into<ResourceKey<'k>>) -> bool {
		self.lookup.contains_key(&key.into().hash())
	}

	pub fn describe<'k>(&self, key: impl Into<ResourceKey<'k>>) -> HatchResult<&ResourceEntry> {
		let key = key.into();
		self.lookup
			.get(&key.hash())
			.map(|&index| &self.registry[index])
			.ok_or_else(|| HatchError::NotFound(format!("resource {}", key)))
	}

	/// Reads a resource fully, inflating and unscrambling it as needed.
	pub fn load<'k>(&self, key: impl Into<ResourceKey<'k>>) -> HatchResult<Vec<u8>> {
		let entry = *self.describe(key)?;
		self.load_entry(&entry)
	}

	pub fn load_entry(&self, entry: &ResourceEntry) -> HatchResult<Vec<u8>> {
		trace!(
			"loading {:#010x}: {} bytes at {:#x} (stored {}, flags {:#x})",
			entry.content_hash,
			entry.raw_size,
			entry.offset,
			entry.stored_size,
			entry.flags
		);

		let mut data = self.read_stored(entry)?;

		if entry.is_compressed() {
			data = self.decompressor.decompress(&data, entry.raw_size)?;
			if data.len() as u64 != entry.raw_size {
				return Err(HatchError::CorruptData(format!(
					"resource {:#010x} inflated to {} bytes, expected {}",
					entry.content_hash,
					data.len(),
					entry.raw_size
				)));
			}
		}

		if let Some(cipher) = entry.cipher() {
			cipher.decrypt_at(0, &mut data);
		}

		Ok(data)
	}

	/// A seekable stream over one resource's plain bytes.
	///
	/// Stored payloads are read straight from the archive; compressed ones are
	/// inflated up front.
	pub fn open_resource<'k>(
		&self,
		key: impl Into<ResourceKey<'k>>,
	) -> HatchResult<HatchResourceReader<'_, R>> {
		let entry = *self.describe(key)?;
		if entry.is_compressed() {
			Ok(HatchResourceReader::buffered(self.load_entry(&entry)?))
		} else {
			Ok(HatchResourceReader::stored(&self.reader, &entry))
		}
	}

	pub fn into_inner(self) -> R {
		self.reader.into_inner().unwrap_or_else(PoisonError::into_inner)
	}

	fn source(&self) -> MutexGuard<'_, R> {
		self.reader.lock().unwrap_or_else(PoisonError::into_inner)
	}

	fn read_stored(&self, entry: &ResourceEntry) -> HatchResult<Vec<u8>> {
		let mut reader = self.source();
		reader.seek(SeekFrom::Start(entry.offset))?;

		let mut data = Vec::new();
		reader
			.by_ref()
			.take(entry.stored_size)
			.read_to_end(&mut data)
			.map_err(|e| match e.kind() {
				io::ErrorKind::UnexpectedEof => HatchError::CorruptFormat(e.to_string()),
				_ => HatchError::Io(e),
			})?;

		if (data.len() as u64) < entry.stored_size {
			return Err(HatchError::CorruptFormat(format!(
				"payload of {:#010x} ends {} bytes short",
				entry.content_hash,
				entry.stored_size - data.len() as u64
			)));
		}

		Ok(data)
	}
}
