use std::collections::HashMap;
use std::io::Cursor;

use binrw::BinRead;
use log::debug;

use super::*;
use crate::error::HatchResult;

/// A script class and the methods known to belong to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClassInfo {
	pub hash: u32,
	pub name: Option<String>,
	pub methods: HashMap<u32, HslFunction>,
}

impl ClassInfo {
	pub fn new(hash: u32) -> Self {
		ClassInfo {
			hash,
			..Default::default()
		}
	}

	pub fn method(&self, hash: u32) -> Option<&HslFunction> {
		self.methods.get(&hash)
	}

	pub fn has_method(&self, hash: u32) -> bool {
		self.methods.contains_key(&hash)
	}

	/// Folds `other` into this class. Known names are kept, and methods
	/// already present are left as they are.
	pub fn merge(&mut self, other: ClassInfo) {
		if self.name.is_none() {
			self.name = other.name;
		}
		for (hash, method) in other.methods {
			self.methods.entry(hash).or_insert(method);
		}
	}
}

/// A parsed class-map container. Carries hashes only; names are attached
/// when it is merged into an [`HslModule`].
#[derive(Debug, Clone, Default)]
pub struct ClassMap {
	classes: Vec<ClassInfo>,
}

impl ClassMap {
	pub fn parse(buffer: &[u8]) -> HatchResult<ClassMap> {
		let file = HslClassMapFile::read(&mut Cursor::new(buffer))?;

		let classes = file
			.classes
			.into_iter()
			.map(|record| ClassInfo {
				hash: record.hash,
				name: None,
				methods: record
					.methods
					.into_iter()
					.map(|hash| (hash, HslFunction::stub(hash, None)))
					.collect(),
			})
			.collect::<Vec<_>>();

		debug!("parsed class map with {} classes", classes.len());
		Ok(ClassMap { classes })
	}

	pub fn classes(&self) -> &[ClassInfo] {
		&self.classes
	}

	pub fn len(&self) -> usize {
		self.classes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.classes.is_empty()
	}

	pub fn into_classes(self) -> Vec<ClassInfo> {
		self.classes
	}
}
