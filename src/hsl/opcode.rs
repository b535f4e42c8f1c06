//! The closed HSL instruction set.
//!
//! Every opcode declares its operand layout, including the ones the walker
//! has no text for, so a walk always advances by the true encoded length.

/// Width of one fixed operand field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
	U8,
	U16,
	U32,
}

impl Width {
	pub const fn size(self) -> usize {
		match self {
			Width::U8 => 1,
			Width::U16 => 2,
			Width::U32 => 4,
		}
	}
}

/// How the operand bytes after an opcode tag are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandLayout {
	Fixed(&'static [Width]),
	/// `u16 case_count, u16 default_jump`, then `case_count` pairs of
	/// `u32 constant index, u16 jump`.
	SwitchTable,
}

pub const SWITCH_TABLE_HEADER: &[Width] = &[Width::U16, Width::U16];
pub const SWITCH_TABLE_CASE: &[Width] = &[Width::U32, Width::U16];

const NONE: OperandLayout = OperandLayout::Fixed(&[]);
const BYTE: OperandLayout = OperandLayout::Fixed(&[Width::U8]);
const SHORT: OperandLayout = OperandLayout::Fixed(&[Width::U16]);
const WORD: OperandLayout = OperandLayout::Fixed(&[Width::U32]);

impl OperandLayout {
	/// Encoded size of the operands, when it does not depend on their values.
	pub fn fixed_size(self) -> Option<usize> {
		match self {
			OperandLayout::Fixed(widths) => Some(widths.iter().map(|w| w.size()).sum()),
			OperandLayout::SwitchTable => None,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Opcode {
	Error = 0,
	Constant,
	DefineGlobal,
	GetProperty,
	SetProperty,
	GetGlobal,
	SetGlobal,
	GetLocal,
	SetLocal,
	PrintStack,
	Inherit,
	Return,
	Method,
	Class,
	Call,
	Breakpoint,
	Invoke,
	Jump,
	JumpIfFalse,
	JumpBack,
	Pop,
	Copy,
	Add,
	Subtract,
	Multiply,
	Divide,
	Modulo,
	Negate,
	Increment,
	Decrement,
	BitshiftLeft,
	BitshiftRight,
	Null,
	True,
	False,
	BitwiseNot,
	BitwiseAnd,
	BitwiseOr,
	BitwiseXor,
	LogicalNot,
	LogicalAnd,
	LogicalOr,
	Equal,
	NotEqual,
	Greater,
	GreaterEqual,
	Less,
	LessEqual,
	Print,
	EnumNext,
	SaveValue,
	LoadValue,
	With,
	GetElement,
	SetElement,
	NewArray,
	NewMap,
	SwitchTable,
	Failsafe,
	Event,
	TypeOf,
	New,
	Import,
	Switch,
	PopN,
	HasProperty,
	ImportModule,
	AddEnum,
	NewEnum,
	GetSuperclass,
	GetModuleLocal,
	SetModuleLocal,
	DefineModuleLocal,
	UseNamespace,
}

/// All opcodes, indexed by tag byte.
pub const OPCODES: [Opcode; 74] = [
	Opcode::Error,
	Opcode::Constant,
	Opcode::DefineGlobal,
	Opcode::GetProperty,
	Opcode::SetProperty,
	Opcode::GetGlobal,
	Opcode::SetGlobal,
	Opcode::GetLocal,
	Opcode::SetLocal,
	Opcode::PrintStack,
	Opcode::Inherit,
	Opcode::Return,
	Opcode::Method,
	Opcode::Class,
	Opcode::Call,
	Opcode::Breakpoint,
	Opcode::Invoke,
	Opcode::Jump,
	Opcode::JumpIfFalse,
	Opcode::JumpBack,
	Opcode::Pop,
	Opcode::Copy,
	Opcode::Add,
	Opcode::Subtract,
	Opcode::Multiply,
	Opcode::Divide,
	Opcode::Modulo,
	Opcode::Negate,
	Opcode::Increment,
	Opcode::Decrement,
	Opcode::BitshiftLeft,
	Opcode::BitshiftRight,
	Opcode::Null,
	Opcode::True,
	Opcode::False,
	Opcode::BitwiseNot,
	Opcode::BitwiseAnd,
	Opcode::BitwiseOr,
	Opcode::BitwiseXor,
	Opcode::LogicalNot,
	Opcode::LogicalAnd,
	Opcode::LogicalOr,
	Opcode::Equal,
	Opcode::NotEqual,
	Opcode::Greater,
	Opcode::GreaterEqual,
	Opcode::Less,
	Opcode::LessEqual,
	Opcode::Print,
	Opcode::EnumNext,
	Opcode::SaveValue,
	Opcode::LoadValue,
	Opcode::With,
	Opcode::GetElement,
	Opcode::SetElement,
	Opcode::NewArray,
	Opcode::NewMap,
	Opcode::SwitchTable,
	Opcode::Failsafe,
	Opcode::Event,
	Opcode::TypeOf,
	Opcode::New,
	Opcode::Import,
	Opcode::Switch,
	Opcode::PopN,
	Opcode::HasProperty,
	Opcode::ImportModule,
	Opcode::AddEnum,
	Opcode::NewEnum,
	Opcode::GetSuperclass,
	Opcode::GetModuleLocal,
	Opcode::SetModuleLocal,
	Opcode::DefineModuleLocal,
	Opcode::UseNamespace,
];

impl TryFrom<u8> for Opcode {
	type Error = u8;

	fn try_from(tag: u8) -> Result<Self, u8> {
		OPCODES.get(tag as usize).copied().ok_or(tag)
	}
}

impl Opcode {
	pub fn layout(self) -> OperandLayout {
		use Opcode::*;

		match self {
			Error | PrintStack | Inherit | Return | Breakpoint | Pop => NONE,
			Add | Subtract | Multiply | Divide | Modulo | Negate | Increment | Decrement => NONE,
			BitshiftLeft | BitshiftRight | BitwiseNot | BitwiseAnd | BitwiseOr | BitwiseXor => NONE,
			LogicalNot | LogicalAnd | LogicalOr => NONE,
			Equal | NotEqual | Greater | GreaterEqual | Less | LessEqual => NONE,
			Null | True | False => NONE,
			Print | EnumNext | SaveValue | LoadValue | GetElement | SetElement => NONE,
			TypeOf | GetSuperclass => NONE,

			GetLocal | SetLocal | Call | Copy | Event | New | PopN => BYTE,

			Jump | JumpIfFalse | JumpBack | Failsafe | Switch => SHORT,
			GetModuleLocal | SetModuleLocal | DefineModuleLocal => SHORT,

			Constant | DefineGlobal | GetGlobal | SetGlobal => WORD,
			GetProperty | SetProperty | HasProperty => WORD,
			NewArray | NewMap => WORD,
			Import | ImportModule | AddEnum | NewEnum | UseNamespace => WORD,

			Method => OperandLayout::Fixed(&[Width::U8, Width::U32]),
			Class => OperandLayout::Fixed(&[Width::U32, Width::U8]),
			Invoke => OperandLayout::Fixed(&[Width::U8, Width::U32, Width::U8]),
			With => OperandLayout::Fixed(&[Width::U8, Width::U8, Width::U16]),

			SwitchTable => OperandLayout::SwitchTable,
		}
	}

	pub fn mnemonic(self) -> &'static str {
		use Opcode::*;

		match self {
			Error => "error",
			Constant => "constant",
			DefineGlobal => "define_global",
			GetProperty => "get_property",
			SetProperty => "set_property",
			GetGlobal => "get_global",
			SetGlobal => "set_global",
			GetLocal => "get_local",
			SetLocal => "set_local",
			PrintStack => "print_stack",
			Inherit => "inherit",
			Return => "return",
			Method => "method",
			Class => "class",
			Call => "call",
			Breakpoint => "breakpoint",
			Invoke => "invoke",
			Jump => "jump",
			JumpIfFalse => "jump_if_false",
			JumpBack => "jump_back",
			Pop => "pop",
			Copy => "copy",
			Add => "add",
			Subtract => "subtract",
			Multiply => "multiply",
			Divide => "divide",
			Modulo => "modulo",
			Negate => "negate",
			Increment => "increment",
			Decrement => "decrement",
			BitshiftLeft => "bitshift_left",
			BitshiftRight => "bitshift_right",
			Null => "null",
			True => "true",
			False => "false",
			BitwiseNot => "bw_not",
			BitwiseAnd => "bw_and",
			BitwiseOr => "bw_or",
			BitwiseXor => "bw_xor",
			LogicalNot => "lg_not",
			LogicalAnd => "lg_and",
			LogicalOr => "lg_or",
			Equal => "equal",
			NotEqual => "equal_not",
			Greater => "greater",
			GreaterEqual => "greater_equal",
			Less => "less",
			LessEqual => "less_equal",
			Print => "print",
			EnumNext => "enum_next",
			SaveValue => "save_value",
			LoadValue => "load_value",
			With => "with",
			GetElement => "get_element",
			SetElement => "set_element",
			NewArray => "new_array",
			NewMap => "new_map",
			SwitchTable => "switch_table",
			Failsafe => "failsafe",
			Event => "event",
			TypeOf => "typeof",
			New => "new",
			Import => "import",
			Switch => "switch",
			PopN => "popn",
			HasProperty => "has_property",
			ImportModule => "import_module",
			AddEnum => "add_enum",
			NewEnum => "new_enum",
			GetSuperclass => "get_superclass",
			GetModuleLocal => "get_module_local",
			SetModuleLocal => "set_module_local",
			DefineModuleLocal => "define_module_local",
			UseNamespace => "use_namespace",
		}
	}
}
