use std::io::{self, prelude::*, ErrorKind, SeekFrom};
use std::sync::{Mutex, PoisonError};

use super::ResourceEntry;
use crate::cipher::{CipherState, ResourceCipher};

#[derive(Debug)]
enum ResourceSource<'a, R> {
	// payload read in place from the archive stream
	Stored { stream: &'a Mutex<R>, offset: u64 },
	// already inflated and unscrambled
	Buffered(Vec<u8>),
}

/// `Read + Seek` view of a single resource, as plain bytes.
///
/// Every seek recomputes the cipher state for the new offset, so reads at
/// any position match a full [`load`](super::HatchArchive::load).
#[derive(Debug)]
pub struct HatchResourceReader<'a, R> {
	source: ResourceSource<'a, R>,
	cipher: Option<ResourceCipher>,
	// cipher state for min(pos, len)
	state: CipherState,
	pos: u64,
	len: u64,
}

impl<'a, R> HatchResourceReader<'a, R>
where
	R: Read + Seek,
{
	pub(crate) fn stored(stream: &'a Mutex<R>, entry: &ResourceEntry) -> Self {
		HatchResourceReader {
			source: ResourceSource::Stored {
				stream,
				offset: entry.offset,
			},
			cipher: entry.cipher(),
			state: CipherState::new(entry.raw_size),
			pos: 0,
			len: entry.raw_size,
		}
	}

	pub(crate) fn buffered(data: Vec<u8>) -> Self {
		let len = data.len() as u64;
		HatchResourceReader {
			source: ResourceSource::Buffered(data),
			cipher: None,
			state: CipherState::new(len),
			pos: 0,
			len,
		}
	}

	pub fn len(&self) -> u64 {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}
}

// Trait impls

impl<R> Read for HatchResourceReader<'_, R>
where
	R: Read + Seek,
{
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		if self.pos >= self.len {
			return Ok(0);
		}

		let want = (self.len - self.pos).min(buf.len() as u64) as usize;
		let buf = &mut buf[..want];

		let bytes_count = match &self.source {
			ResourceSource::Stored { stream, offset } => {
				let start = offset.checked_add(self.pos).ok_or_else(|| {
					io::Error::new(ErrorKind::InvalidData, "resource extends past the addressable range")
				})?;
				let mut inner = stream.lock().unwrap_or_else(PoisonError::into_inner);
				inner.seek(SeekFrom::Start(start))?;
				inner.read(buf)?
			}
			ResourceSource::Buffered(data) => {
				let start = self.pos as usize;
				let src = data.get(start..start + want).ok_or_else(|| {
					io::Error::new(ErrorKind::UnexpectedEof, "resource buffer shorter than declared")
				})?;
				buf.copy_from_slice(src);
				want
			}
		};

		// Decipher if the entry is scrambled
		if let Some(cipher) = &self.cipher {
			cipher.decrypt(&mut self.state, &mut buf[..bytes_count]);
		}

		self.pos += bytes_count as u64;
		Ok(bytes_count)
	}
}

impl<R> Seek for HatchResourceReader<'_, R>
where
	R: Read + Seek,
{
	fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
		let target = match pos {
			SeekFrom::Start(n) => Some(n),
			SeekFrom::End(delta) => self.len.checked_add_signed(delta),
			SeekFrom::Current(delta) => self.pos.checked_add_signed(delta),
		}
		.ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "invalid seek to a negative position"))?;

		if let Some(cipher) = &self.cipher {
			let from = self.pos.min(self.len);
			let to = target.min(self.len);
			if to >= from {
				self.state.skip(to - from);
			} else {
				self.state = cipher.state_at(to);
			}
		}

		self.pos = target;
		Ok(target)
	}
}
