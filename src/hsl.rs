mod class_map;
mod module;
mod opcode;
mod walker;

pub use self::class_map::*;
pub use self::module::*;
pub use self::opcode::*;
pub use self::walker::*;

// =^w^= =^w^= =^w^= =^w^= =^w^=
// ~* HSL container layouts *~
// =^w^= =^w^= =^w^= =^w^= =^w^=

use std::fmt;

use binrw::{BinRead, NullString};

pub const HSL_BYTECODE_MAGIC: &[u8] = b"HTVM";
pub const HSL_CLASS_MAP_MAGIC: &[u8] = b"HMAP";

/// Options bit: line tables and the debug-name table are present.
pub const HSL_HAS_DEBUG_INFO: u8 = 1 << 0;
/// Options bit: a source path trails the container.
pub const HSL_HAS_SOURCE_PATH: u8 = 1 << 1;

/// First version whose chunks store arities as single bytes.
pub const HSL_COMPACT_ARITY_VERSION: u8 = 1;

// Bytecode header: 12 bytes (including magic)
#[derive(Debug, BinRead, Clone, Copy)]
#[br(little, magic = b"HTVM")]
pub(crate) struct HslHeader {
	pub version: u8,
	pub options: u8,
	_reserved: u16,
	pub chunk_count: u32,
}

// Arity encoding depends on the container version
#[derive(Debug, BinRead, Clone, Copy)]
#[br(little, import(version: u8))]
pub(crate) enum HslArity {
	#[br(pre_assert(version < HSL_COMPACT_ARITY_VERSION))]
	Wide { arg_count: u32, min_arg_count: u32 },
	#[br(pre_assert(version >= HSL_COMPACT_ARITY_VERSION))]
	Compact { arg_count: u8, min_arg_count: u8 },
}

// Chunk: everything before the optional line table
#[derive(Debug, BinRead, Clone)]
#[br(little, import(version: u8))]
pub(crate) struct HslChunk {
	pub length: u32,
	#[br(args(version))]
	pub arity: HslArity,
	pub hash: u32,
	#[br(count = length)]
	pub bytecode: Vec<u8>,
}

/// A compiled HSL function.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HslFunction {
	pub hash: u32,
	/// Attached from the debug-name table, when there is one.
	pub name: Option<String>,
	pub arg_count: u16,
	pub min_arg_count: u16,
	pub bytecode: Vec<u8>,
	/// Source line per bytecode byte; empty without debug info.
	pub lines: Vec<u32>,
}

impl HslFunction {
	/// A placeholder carrying only an identity, as created by class maps.
	pub fn stub(hash: u32, name: Option<String>) -> Self {
		HslFunction {
			hash,
			name,
			..Default::default()
		}
	}

	pub fn has_lines(&self) -> bool {
		!self.lines.is_empty()
	}

	/// Source line of the instruction at `offset`, if line data exists.
	pub fn line_at(&self, offset: usize) -> Option<u32> {
		self.lines.get(offset).copied()
	}
}

/// An entry of a bytecode container's constant pool.
#[derive(Debug, BinRead, Clone, PartialEq)]
#[br(little, import(tag: u8))]
pub enum HslConstant {
	#[br(pre_assert(tag == HSL_CONSTANT_INT))]
	Int(i32),
	// stored as an integer and converted by value
	#[br(pre_assert(tag == HSL_CONSTANT_FLOAT))]
	Float(#[br(map = |raw: i32| raw as f32)] f32),
	#[br(pre_assert(tag == HSL_CONSTANT_STRING))]
	Str(#[br(map = |s: NullString| String::from_utf8_lossy(&s.0).into_owned())] String),
}

pub const HSL_CONSTANT_INT: u8 = 1;
pub const HSL_CONSTANT_FLOAT: u8 = 2;
pub const HSL_CONSTANT_STRING: u8 = 3;

impl fmt::Display for HslConstant {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			HslConstant::Int(v) => write!(f, "{}", v),
			HslConstant::Float(v) => write!(f, "{:?}", v),
			HslConstant::Str(s) => write!(f, "{:?}", s),
		}
	}
}

// Class map: magic, four unused bytes, then the classes
#[derive(Debug, BinRead, Clone)]
#[br(little, magic = b"HMAP")]
pub(crate) struct HslClassMapFile {
	_reserved: u32,
	pub class_count: u32,
	#[br(count = class_count)]
	pub classes: Vec<HslClassRecord>,
}

#[derive(Debug, BinRead, Clone)]
#[br(little)]
pub(crate) struct HslClassRecord {
	pub hash: u32,
	pub method_count: u32,
	#[br(count = method_count)]
	pub methods: Vec<u32>,
}

impl HslArity {
	/// `(arg_count, min_arg_count)`.
	pub(crate) fn counts(self) -> Result<(u16, u16), std::num::TryFromIntError> {
		match self {
			HslArity::Wide {
				arg_count,
				min_arg_count,
			} => Ok((u16::try_from(arg_count)?, u16::try_from(min_arg_count)?)),
			HslArity::Compact {
				arg_count,
				min_arg_count,
			} => Ok((arg_count as u16, min_arg_count as u16)),
		}
	}
}
