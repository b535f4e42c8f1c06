#![allow(clippy::tabs_in_doc_comments)] // really?

pub mod checksum;
pub mod cipher;
mod error;
mod hatch;
mod hsl;
mod util;

pub use error::*;
pub use hatch::*;
pub use hsl::*;

pub mod prelude {
	#[doc(no_inline)]
	pub use crate::{
		ClassInfo, ClassMap, HatchArchive, HatchError, HatchResult, HslConstant, HslFunction, HslModule,
		ResourceEntry, ResourceKey,
	};
}
