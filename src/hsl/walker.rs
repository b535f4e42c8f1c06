use std::fmt;

use log::warn;

use super::*;

/// One decoded instruction.
///
/// `operands` holds the fixed fields in encoded order. For a switch table
/// that is the case count, the default jump, then a constant index and a
/// jump per case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
	pub offset: usize,
	pub opcode: Opcode,
	pub operands: Vec<u32>,
	/// Encoded length including the tag byte.
	pub len: usize,
}

impl Instruction {
	pub fn operand(&self, index: usize) -> u32 {
		self.operands.get(index).copied().unwrap_or(0)
	}

	/// Offset of the byte following this instruction.
	pub fn next_offset(&self) -> usize {
		self.offset + self.len
	}
}

/// Why a walk ended before the end of the blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkStop {
	UnknownOpcode { offset: usize, tag: u8 },
	Truncated { offset: usize, opcode: Opcode },
}

impl fmt::Display for WalkStop {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			WalkStop::UnknownOpcode { offset, tag } => {
				write!(f, "unknown opcode {:#04x} at {:#06x}", tag, offset)
			}
			WalkStop::Truncated { offset, opcode } => {
				write!(f, "{} at {:#06x} has truncated operands", opcode.mnemonic(), offset)
			}
		}
	}
}

/// Decodes the instruction starting at `offset`. Never reads past the end
/// of `code`.
pub fn decode_at(code: &[u8], offset: usize) -> Result<Instruction, WalkStop> {
	let tag = *code
		.get(offset)
		.ok_or(WalkStop::Truncated { offset, opcode: Opcode::Error })?;
	let opcode = Opcode::try_from(tag).map_err(|tag| WalkStop::UnknownOpcode { offset, tag })?;
	let truncated = WalkStop::Truncated { offset, opcode };

	let mut pos = offset + 1;
	let mut operands = Vec::new();

	let mut take = |widths: &[Width], operands: &mut Vec<u32>| -> Result<(), WalkStop> {
		for &width in widths {
			operands.push(read_operand(code, pos, width).ok_or(truncated)?);
			pos += width.size();
		}
		Ok(())
	};

	match opcode.layout() {
		OperandLayout::Fixed(widths) => take(widths, &mut operands)?,
		OperandLayout::SwitchTable => {
			take(SWITCH_TABLE_HEADER, &mut operands)?;
			for _ in 0..operands[0] {
				take(SWITCH_TABLE_CASE, &mut operands)?;
			}
		}
	}

	Ok(Instruction {
		offset,
		opcode,
		operands,
		len: pos - offset,
	})
}

fn read_operand(code: &[u8], pos: usize, width: Width) -> Option<u32> {
	let bytes = code.get(pos..pos.checked_add(width.size())?)?;
	Some(match width {
		Width::U8 => bytes[0] as u32,
		Width::U16 => u16::from_le_bytes([bytes[0], bytes[1]]) as u32,
		Width::U32 => u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
	})
}

/// Iterator over the instructions of one bytecode blob.
///
/// Yields at most one `Err`, after which it is exhausted.
#[derive(Debug, Clone)]
pub struct Instructions<'a> {
	code: &'a [u8],
	pos: usize,
	stopped: bool,
}

impl<'a> Instructions<'a> {
	pub fn new(code: &'a [u8]) -> Self {
		Instructions {
			code,
			pos: 0,
			stopped: false,
		}
	}
}

impl Iterator for Instructions<'_> {
	type Item = Result<Instruction, WalkStop>;

	fn next(&mut self) -> Option<Self::Item> {
		if self.stopped || self.pos >= self.code.len() {
			return None;
		}

		match decode_at(self.code, self.pos) {
			Ok(insn) => {
				self.pos = insn.next_offset();
				Some(Ok(insn))
			}
			Err(stop) => {
				self.stopped = true;
				Some(Err(stop))
			}
		}
	}
}

impl std::iter::FusedIterator for Instructions<'_> {}

/// Best-effort pseudo-source for functions of one module.
///
/// Opcodes without a rendering are still decoded so the walk stays aligned.
#[derive(Debug, Clone, Copy)]
pub struct Disassembler<'a> {
	module: &'a HslModule,
}

impl<'a> Disassembler<'a> {
	pub fn new(module: &'a HslModule) -> Self {
		Disassembler { module }
	}

	/// Renders `function`, resolving `Constant` operands against the pool
	/// of the container it was loaded from.
	pub fn disassemble(&self, function: &HslFunction) -> String {
		let pool = self.module.constants_for(function.hash).unwrap_or(&[]);
		let name = match &function.name {
			Some(name) => name.clone(),
			None => self.name(function.hash),
		};

		let mut out = format!(
			"function {}({} args, {} required)\n",
			name, function.arg_count, function.min_arg_count
		);

		for step in Instructions::new(&function.bytecode) {
			match step {
				Ok(insn) => {
					if let Some(text) = self.render(&insn, pool) {
						out.push_str(&format!("{:04x}  {}\n", insn.offset, text));
					}
				}
				Err(stop) => {
					warn!("stopped walking {}: {}", name, stop);
					out.push_str(&format!("// {}, stopping\n", stop));
				}
			}
		}

		out
	}

	fn name(&self, hash: u32) -> String {
		match self.module.name_of(hash) {
			Some(name) => name.to_string(),
			None => format!("hash_{:08x}", hash),
		}
	}

	fn constant(pool: &[HslConstant], index: u32) -> String {
		match pool.get(index as usize) {
			Some(constant) => constant.to_string(),
			None => format!("const[{}]", index),
		}
	}

	fn render(&self, insn: &Instruction, pool: &[HslConstant]) -> Option<String> {
		use Opcode::*;

		let op = |i| insn.operand(i);
		let forward = |i| insn.next_offset() + op(i) as usize;

		let text = match insn.opcode {
			Constant => format!("push {}", Self::constant(pool, op(0))),
			Null => "push null".to_string(),
			True => "push true".to_string(),
			False => "push false".to_string(),

			DefineGlobal => format!("var {}", self.name(op(0))),
			GetGlobal => format!("get {}", self.name(op(0))),
			SetGlobal => format!("set {}", self.name(op(0))),
			GetLocal => format!("get local{}", op(0)),
			SetLocal => format!("set local{}", op(0)),
			GetProperty => format!("get .{}", self.name(op(0))),
			SetProperty => format!("set .{}", self.name(op(0))),
			HasProperty => format!("has .{}", self.name(op(0))),

			Jump => format!("jump {:04x}", forward(0)),
			JumpIfFalse => format!("jump_if_false {:04x}", forward(0)),
			JumpBack => format!(
				"jump {:04x}",
				insn.next_offset().saturating_sub(op(0) as usize)
			),

			Call => format!("call({})", op(0)),
			Invoke => {
				let receiver = if op(2) != 0 { "super." } else { "" };
				format!("invoke {}{}({})", receiver, self.name(op(1)), op(0))
			}
			Return => "return".to_string(),

			Add => "op +".to_string(),
			Subtract => "op -".to_string(),
			Multiply => "op *".to_string(),
			Divide => "op /".to_string(),
			Modulo => "op %".to_string(),
			Negate => "op neg".to_string(),
			BitshiftLeft => "op <<".to_string(),
			BitshiftRight => "op >>".to_string(),
			BitwiseNot => "op ~".to_string(),
			BitwiseAnd => "op &".to_string(),
			BitwiseOr => "op |".to_string(),
			BitwiseXor => "op ^".to_string(),
			LogicalNot => "op !".to_string(),
			LogicalAnd => "op &&".to_string(),
			LogicalOr => "op ||".to_string(),
			Equal => "op ==".to_string(),
			NotEqual => "op !=".to_string(),
			Greater => "op >".to_string(),
			GreaterEqual => "op >=".to_string(),
			Less => "op <".to_string(),
			LessEqual => "op <=".to_string(),

			Class => format!("class {}", self.name(op(0))),
			Method => format!("method {}", self.name(op(1))),
			Inherit => "inherit".to_string(),
			NewArray => format!("new_array [{}]", op(0)),
			NewMap => format!("new_map {{{}}}", op(0)),
			Import => format!("import {}", self.name(op(0))),
			ImportModule => format!("import module {}", self.name(op(0))),

			_ => return None,
		};

		Some(text)
	}
}
