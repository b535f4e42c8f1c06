use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use hatch::checksum::crc32_str;
use hatch::prelude::*;
use hatch::{cipher, DeflateDecompressor, HATCH_MAGIC, RESOURCE_FLAG_OBFUSCATED};
use libflate::zlib;
use pretty_assertions::assert_eq;

struct Resource {
	name: &'static str,
	flags: u32,
	raw_size: u64,
	stored: Vec<u8>,
}

impl Resource {
	fn plain(name: &'static str, data: &[u8]) -> Self {
		Resource {
			name,
			flags: 0,
			raw_size: data.len() as u64,
			stored: data.to_vec(),
		}
	}

	fn obfuscated(name: &'static str, data: &[u8]) -> Self {
		let mut stored = data.to_vec();
		cipher::encrypt(crc32_str(name), data.len() as u64, &mut stored);
		Resource {
			name,
			flags: RESOURCE_FLAG_OBFUSCATED,
			raw_size: data.len() as u64,
			stored,
		}
	}

	fn compressed(name: &'static str, data: &[u8]) -> Self {
		let mut encoder = zlib::Encoder::new(Vec::new()).unwrap();
		encoder.write_all(data).unwrap();
		Resource {
			name,
			flags: 0,
			raw_size: data.len() as u64,
			stored: encoder.finish().into_result().unwrap(),
		}
	}
}

fn build_archive(resources: &[Resource]) -> Vec<u8> {
	let mut out = Vec::new();
	out.extend_from_slice(HATCH_MAGIC);
	out.extend_from_slice(&[0, 0, 1]);
	out.extend_from_slice(&(resources.len() as u16).to_le_bytes());

	let mut offset = (10 + 32 * resources.len()) as u64;
	for res in resources {
		out.extend_from_slice(&crc32_str(res.name).to_le_bytes());
		out.extend_from_slice(&offset.to_le_bytes());
		out.extend_from_slice(&res.raw_size.to_le_bytes());
		out.extend_from_slice(&res.flags.to_le_bytes());
		out.extend_from_slice(&(res.stored.len() as u64).to_le_bytes());
		offset += res.stored.len() as u64;
	}
	for res in resources {
		out.extend_from_slice(&res.stored);
	}
	out
}

fn open(resources: &[Resource]) -> HatchArchive<Cursor<Vec<u8>>> {
	HatchArchive::open(Cursor::new(build_archive(resources))).unwrap()
}

#[test]
fn loads_plain_resource_by_name() {
	let archive = open(&[Resource::plain("Data/Ten.bin", b"0123456789")]);

	assert_eq!(archive.version(), [0, 0, 1]);
	assert_eq!(archive.file_count(), 1);
	assert!(archive.has("Data/Ten.bin"));
	assert!(!archive.has("missing"));
	assert_eq!(archive.load("Data/Ten.bin").unwrap(), b"0123456789");
}

#[test]
fn name_and_hash_address_the_same_entry() {
	let archive = open(&[
		Resource::plain("A.txt", b"alpha"),
		Resource::plain("B.txt", b"beta"),
	]);

	let hash = crc32_str("B.txt");
	assert_eq!(archive.describe("B.txt").unwrap(), archive.describe(hash).unwrap());
	assert_eq!(archive.entry_at(1).unwrap().content_hash, hash);
	assert_eq!(archive.load(hash).unwrap(), b"beta");
}

#[test]
fn missing_resource_is_not_found() {
	let archive = open(&[Resource::plain("A.txt", b"alpha")]);
	assert!(matches!(archive.describe("Nope.txt"), Err(HatchError::NotFound(_))));
	assert!(matches!(archive.load(0xDEAD_BEEFu32), Err(HatchError::NotFound(_))));
}

#[test]
fn obfuscated_resource_loads_as_plaintext() {
	let plain = b"Sprites/Player.bin holds a few hundred bytes of sprite data".repeat(5);
	let archive = open(&[Resource::obfuscated("Sprites/Player.bin", &plain)]);

	let entry = archive.describe("Sprites/Player.bin").unwrap();
	assert!(entry.is_obfuscated());
	assert_eq!(archive.load("Sprites/Player.bin").unwrap(), plain);
}

#[test]
fn compressed_resource_inflates() {
	let plain = b"tile tile tile tile tile tile tile".repeat(16);
	let archive = open(&[Resource::compressed("Tiles.bin", &plain)]);

	assert!(archive.describe("Tiles.bin").unwrap().is_compressed());
	assert_eq!(archive.load("Tiles.bin").unwrap(), plain);
}

#[test]
fn wrong_codec_is_corrupt_data() {
	let plain = b"zlib header present".repeat(4);
	let bytes = build_archive(&[Resource::compressed("Z.bin", &plain)]);
	let archive = HatchArchive::open_with(Cursor::new(bytes), Box::new(DeflateDecompressor)).unwrap();
	assert!(matches!(archive.load("Z.bin"), Err(HatchError::CorruptData(_))));
}

#[test]
fn seeking_matches_full_load() {
	let plain: Vec<u8> = (0..=255u8).cycle().take(700).collect();
	let archive = open(&[
		Resource::plain("Pad.bin", b"padding"),
		Resource::obfuscated("Music/Theme.ogg", &plain),
	]);
	let full = archive.load("Music/Theme.ogg").unwrap();
	assert_eq!(full, plain);

	let mut stream = archive.open_resource("Music/Theme.ogg").unwrap();
	assert_eq!(stream.len(), 700);

	for (k, m) in [(0usize, 16usize), (1, 1), (37, 90), (450, 250), (699, 1)] {
		stream.seek(SeekFrom::Start(k as u64)).unwrap();
		let mut buf = vec![0u8; m];
		stream.read_exact(&mut buf).unwrap();
		assert_eq!(buf, &full[k..k + m], "offset {}", k);
	}

	// backwards relative seek replays the schedule
	stream.seek(SeekFrom::Start(300)).unwrap();
	stream.seek(SeekFrom::Current(-200)).unwrap();
	let mut buf = [0u8; 8];
	stream.read_exact(&mut buf).unwrap();
	assert_eq!(&buf, &full[100..108]);

	stream.seek(SeekFrom::End(0)).unwrap();
	assert_eq!(stream.read(&mut buf).unwrap(), 0);
}

#[test]
fn compressed_stream_reads_whole() {
	let plain = b"stream me ".repeat(30);
	let archive = open(&[Resource::compressed("S.bin", &plain)]);

	let mut stream = archive.open_resource("S.bin").unwrap();
	let mut out = Vec::new();
	stream.read_to_end(&mut out).unwrap();
	assert_eq!(out, plain);
}

#[test]
fn bad_magic_is_corrupt_format() {
	let mut bytes = build_archive(&[Resource::plain("A.txt", b"alpha")]);
	bytes[..5].copy_from_slice(b"HETCH");
	assert!(matches!(
		HatchArchive::open(Cursor::new(bytes)),
		Err(HatchError::CorruptFormat(_))
	));
}

#[test]
fn truncated_registry_is_corrupt_format() {
	let bytes = build_archive(&[Resource::plain("A.txt", b"alpha")]);
	assert!(matches!(
		HatchArchive::open(Cursor::new(bytes[..20].to_vec())),
		Err(HatchError::CorruptFormat(_))
	));
}

#[test]
fn archive_is_shareable_across_threads() {
	let archive = open(&[
		Resource::plain("One.bin", b"1111"),
		Resource::obfuscated("Two.bin", b"2222222222222222222222"),
	]);

	std::thread::scope(|s| {
		for _ in 0..4 {
			s.spawn(|| {
				assert_eq!(archive.load("One.bin").unwrap(), b"1111");
				assert_eq!(archive.load("Two.bin").unwrap(), b"2222222222222222222222");
			});
		}
	});
}
