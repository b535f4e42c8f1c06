use std::collections::HashMap;
use std::io::Cursor;

use binrw::{BinRead, BinResult};
use log::{debug, warn};

use super::*;
use crate::checksum::{mix32, mix32_str, MIX32_SEED};
use crate::error::{HatchError, HatchResult};
use crate::util::read_c_string;

/// Function and class table built from HSL bytecode and class-map containers.
///
/// Containers are merged into the table by hash as they are loaded. A load
/// that fails leaves the table as it was.
#[derive(Debug, Clone, Default)]
pub struct HslModule {
	version: u8,
	options: u8,
	functions: HashMap<u32, HslFunction>,
	// hashes in chunk order, for positional lookup
	order: Vec<u32>,
	// one constant pool per loaded container; indices are local to it
	pools: Vec<Vec<HslConstant>>,
	function_pool: HashMap<u32, usize>,
	// debug-name table, kept for classes merged later
	names: HashMap<u32, String>,
	classes: HashMap<u32, ClassInfo>,
	class_order: Vec<u32>,
	source_path: Option<String>,
}

// One bytecode container, parsed but not yet merged
#[derive(Debug, Default)]
struct Bytecode {
	version: u8,
	options: u8,
	functions: Vec<HslFunction>,
	constants: Vec<HslConstant>,
	names: Vec<(u32, String)>,
	source_path: Option<String>,
}

impl HslModule {
	pub fn new() -> Self {
		HslModule::default()
	}

	pub fn from_bytecode(buffer: &[u8]) -> HatchResult<Self> {
		let mut module = HslModule::new();
		module.load_bytecode(buffer)?;
		Ok(module)
	}

	/// Parses a bytecode container and merges its functions, constants and
	/// debug names into this table.
	pub fn load_bytecode(&mut self, buffer: &[u8]) -> HatchResult<()> {
		let bytecode = parse_bytecode(buffer)?;
		debug!(
			"loaded HSL bytecode v{}: {} functions, {} constants, {} names",
			bytecode.version,
			bytecode.functions.len(),
			bytecode.constants.len(),
			bytecode.names.len()
		);
		self.absorb(bytecode);
		Ok(())
	}

	/// Parses a class-map container and merges it into this table.
	pub fn load_class_map(&mut self, buffer: &[u8]) -> HatchResult<()> {
		let map = ClassMap::parse(buffer)?;
		self.merge_class_map(map);
		Ok(())
	}

	pub fn merge_class_map(&mut self, map: ClassMap) {
		let count = map.len();
		for mut class in map.into_classes() {
			if class.name.is_none() {
				class.name = self.names.get(&class.hash).cloned();
			}
			for method in class.methods.values_mut() {
				if method.name.is_none() {
					method.name = self.names.get(&method.hash).cloned();
				}
			}

			match self.classes.get_mut(&class.hash) {
				Some(existing) => existing.merge(class),
				None => {
					self.class_order.push(class.hash);
					self.classes.insert(class.hash, class);
				}
			}
		}
		debug!("merged {} classes, {} known", count, self.classes.len());
	}

	pub fn version(&self) -> u8 {
		self.version
	}

	pub fn options(&self) -> u8 {
		self.options
	}

	pub fn has_debug_info(&self) -> bool {
		self.options & HSL_HAS_DEBUG_INFO != 0
	}

	pub fn has_source_path(&self) -> bool {
		self.options & HSL_HAS_SOURCE_PATH != 0
	}

	pub fn source_path(&self) -> Option<&str> {
		self.source_path.as_deref()
	}

	pub fn function_count(&self) -> usize {
		self.functions.len()
	}

	/// Functions in the order their chunks were loaded.
	pub fn functions(&self) -> impl Iterator<Item = &HslFunction> + '_ {
		self.order.iter().filter_map(move |hash| self.functions.get(hash))
	}

	pub fn function_by_name(&self, name: &str) -> HatchResult<&HslFunction> {
		self.functions
			.get(&mix32_str(name))
			.ok_or_else(|| HatchError::NotFound(format!("function \"{}\"", name)))
	}

	pub fn function_by_index(&self, index: usize) -> HatchResult<&HslFunction> {
		let hash = self.order.get(index).ok_or(HatchError::OutOfRange {
			index,
			count: self.order.len(),
		})?;
		self.function_by_hash(*hash)
	}

	pub fn function_by_hash(&self, hash: u32) -> HatchResult<&HslFunction> {
		self.functions
			.get(&hash)
			.ok_or_else(|| HatchError::NotFound(format!("function {:#010x}", hash)))
	}

	/// Constant pools in load order, one per bytecode container.
	pub fn pools(&self) -> &[Vec<HslConstant>] {
		&self.pools
	}

	/// The constant pool of the container a function was loaded from.
	/// `Constant` operands in its bytecode index into this slice.
	pub fn constants_for(&self, hash: u32) -> HatchResult<&[HslConstant]> {
		let pool = self
			.function_pool
			.get(&hash)
			.ok_or_else(|| HatchError::NotFound(format!("function {:#010x}", hash)))?;
		Ok(self.pools.get(*pool).map(Vec::as_slice).unwrap_or(&[]))
	}

	/// Classes in the order they were first merged.
	pub fn classes(&self) -> impl Iterator<Item = &ClassInfo> + '_ {
		self.class_order.iter().filter_map(move |hash| self.classes.get(hash))
	}

	pub fn class_by_hash(&self, hash: u32) -> HatchResult<&ClassInfo> {
		self.classes
			.get(&hash)
			.ok_or_else(|| HatchError::NotFound(format!("class {:#010x}", hash)))
	}

	pub fn class_by_name(&self, name: &str) -> HatchResult<&ClassInfo> {
		self.classes
			.get(&mix32_str(name))
			.ok_or_else(|| HatchError::NotFound(format!("class \"{}\"", name)))
	}

	/// Best known name for an identifier hash.
	pub fn name_of(&self, hash: u32) -> Option<&str> {
		self.names
			.get(&hash)
			.map(String::as_str)
			.or_else(|| self.functions.get(&hash).and_then(|f| f.name.as_deref()))
			.or_else(|| self.classes.get(&hash).and_then(|c| c.name.as_deref()))
	}

	/// Partial pseudo-source for one function.
	pub fn decompile_function(&self, hash: u32) -> HatchResult<String> {
		let function = self.function_by_hash(hash)?;
		Ok(Disassembler::new(self).disassemble(function))
	}

	fn absorb(&mut self, bytecode: Bytecode) {
		self.version = bytecode.version;
		self.options = bytecode.options;

		let pool = self.pools.len();
		self.pools.push(bytecode.constants);

		for mut function in bytecode.functions {
			let hash = function.hash;
			self.function_pool.insert(hash, pool);
			if function.name.is_none() {
				function.name = self.names.get(&hash).cloned();
			}
			if self.functions.insert(hash, function).is_some() {
				warn!("function {:#010x} loaded twice; keeping the newer one", hash);
			} else {
				self.order.push(hash);
			}
		}

		for (hash, name) in bytecode.names {
			self.attach_name(hash, name);
		}

		if bytecode.source_path.is_some() {
			self.source_path = bytecode.source_path;
		}
	}

	fn attach_name(&mut self, hash: u32, name: String) {
		if let Some(function) = self.functions.get_mut(&hash) {
			function.name = Some(name.clone());
		}
		if let Some(class) = self.classes.get_mut(&hash) {
			class.name.get_or_insert_with(|| name.clone());
		}
		for class in self.classes.values_mut() {
			if let Some(method) = class.methods.get_mut(&hash) {
				method.name.get_or_insert_with(|| name.clone());
			}
		}
		self.names.insert(hash, name);
	}
}

fn parse_bytecode(buffer: &[u8]) -> HatchResult<Bytecode> {
	let mut cur = Cursor::new(buffer);
	let header = HslHeader::read(&mut cur)?;

	let mut bytecode = Bytecode {
		version: header.version,
		options: header.options,
		..Default::default()
	};

	if header.chunk_count == 0 {
		return Ok(bytecode);
	}

	let has_debug_info = header.options & HSL_HAS_DEBUG_INFO != 0;

	for _ in 0..header.chunk_count {
		let chunk = HslChunk::read_args(&mut cur, (header.version,))?;
		let (arg_count, min_arg_count) = chunk.arity.counts().map_err(|_| {
			HatchError::CorruptFormat(format!("function {:#010x} has an oversized arity", chunk.hash))
		})?;

		let mut function = HslFunction {
			hash: chunk.hash,
			name: None,
			arg_count,
			min_arg_count,
			bytecode: chunk.bytecode,
			lines: Vec::new(),
		};

		if has_debug_info {
			let needed = chunk.length as u64 * 4;
			let available = (buffer.len() as u64).saturating_sub(cur.position());
			if available >= needed {
				function.lines = (0..chunk.length)
					.map(|_| u32::read_le(&mut cur))
					.collect::<BinResult<Vec<u32>>>()?;
			} else {
				let err = HatchError::InconsistentDebugData {
					hash: chunk.hash,
					needed,
					available,
				};
				warn!("{}; dropping its line table", err);
			}
		}

		let const_count = u32::read_le(&mut cur)?;
		for _ in 0..const_count {
			bytecode.constants.push(read_constant(&mut cur)?);
		}

		bytecode.functions.push(function);
	}

	if has_debug_info {
		match u32::read_le(&mut cur) {
			Ok(token_count) => {
				for _ in 0..token_count {
					match read_c_string(&mut cur) {
						Ok((raw, name)) => bytecode.names.push((token_hash(&raw), name)),
						Err(_) => {
							warn!("debug-name table ends early");
							break;
						}
					}
				}
			}
			Err(_) => warn!("debug info flagged but the debug-name table is missing"),
		}
	}

	if header.options & HSL_HAS_SOURCE_PATH != 0 {
		match read_c_string(&mut cur) {
			Ok((_, path)) => bytecode.source_path = Some(path),
			Err(_) => warn!("source path flagged but missing"),
		}
	}

	Ok(bytecode)
}

fn read_constant(cur: &mut Cursor<&[u8]>) -> HatchResult<HslConstant> {
	let tag = u8::read_le(cur)?;
	match tag {
		HSL_CONSTANT_INT | HSL_CONSTANT_FLOAT | HSL_CONSTANT_STRING => {
			Ok(HslConstant::read_args(cur, (tag,))?)
		}
		other => Err(HatchError::UnsupportedEncoding(format!(
			"constant tag {} at {:#x}",
			other,
			cur.position() - 1
		))),
	}
}

// Token bytes are hashed the way string keys are: non-ASCII becomes '?'
fn token_hash(raw: &[u8]) -> u32 {
	let key: Vec<u8> = raw
		.iter()
		.map(|&b| if b.is_ascii() { b } else { b'?' })
		.collect();
	mix32(&key, MIX32_SEED)
}
