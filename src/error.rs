use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HatchError {
	#[error("io: {0}")]
	Io(#[from] io::Error),

	#[error("corrupt format: {0}")]
	CorruptFormat(String),

	#[error("corrupt data: {0}")]
	CorruptData(String),

	#[error("not found: {0}")]
	NotFound(String),

	#[error("index {index} out of range ({count} available)")]
	OutOfRange { index: usize, count: usize },

	#[error(
		"function {hash:#010x} declares {needed} bytes of line data but only {available} remain"
	)]
	InconsistentDebugData { hash: u32, needed: u64, available: u64 },

	#[error("unsupported encoding: {0}")]
	UnsupportedEncoding(String),
}

pub type HatchResult<T> = Result<T, HatchError>;

impl From<binrw::Error> for HatchError {
	fn from(err: binrw::Error) -> Self {
		if err.is_eof() {
			return HatchError::CorruptFormat("truncated input".to_string());
		}

		// binrw wraps field errors in backtraces; report only the cause
		match err.root_cause() {
			binrw::Error::BadMagic { pos, .. } => {
				HatchError::CorruptFormat(format!("bad magic at {:#x}", pos))
			}
			binrw::Error::Io(e) => HatchError::Io(io::Error::new(e.kind(), e.to_string())),
			binrw::Error::AssertFail { pos, message } => {
				HatchError::CorruptFormat(format!("{} at {:#x}", message, pos))
			}
			binrw::Error::NoVariantMatch { pos } | binrw::Error::EnumErrors { pos, .. } => {
				HatchError::CorruptFormat(format!("unrecognised value at {:#x}", pos))
			}
			binrw::Error::Custom { pos, .. } => {
				HatchError::CorruptFormat(format!("invalid value at {:#x}", pos))
			}
			_ => HatchError::CorruptFormat("malformed input".to_string()),
		}
	}
}
