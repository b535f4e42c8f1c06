use hatch::checksum::mix32_str;
use hatch::prelude::*;
use hatch::{Opcode, HSL_BYTECODE_MAGIC, HSL_CLASS_MAP_MAGIC, HSL_HAS_DEBUG_INFO, HSL_HAS_SOURCE_PATH};
use pretty_assertions::assert_eq;

#[derive(Default)]
struct Chunk {
	hash: u32,
	arg_count: u8,
	min_arg_count: u8,
	code: Vec<u8>,
	lines: Option<Vec<u32>>,
	constants: Vec<u8>,
	const_count: u32,
}

impl Chunk {
	fn new(hash: u32, code: &[u8]) -> Self {
		Chunk {
			hash,
			code: code.to_vec(),
			..Default::default()
		}
	}

	fn int(mut self, value: i32) -> Self {
		self.constants.push(1);
		self.constants.extend_from_slice(&value.to_le_bytes());
		self.const_count += 1;
		self
	}

	fn string(mut self, value: &str) -> Self {
		self.constants.push(3);
		self.constants.extend_from_slice(value.as_bytes());
		self.constants.push(0);
		self.const_count += 1;
		self
	}
}

fn container(options: u8, chunks: &[Chunk], tokens: &[&str], source: Option<&str>) -> Vec<u8> {
	let mut out = Vec::new();
	out.extend_from_slice(HSL_BYTECODE_MAGIC);
	out.push(1);
	out.push(options);
	out.extend_from_slice(&[0, 0]);
	out.extend_from_slice(&(chunks.len() as u32).to_le_bytes());

	for chunk in chunks {
		out.extend_from_slice(&(chunk.code.len() as u32).to_le_bytes());
		out.push(chunk.arg_count);
		out.push(chunk.min_arg_count);
		out.extend_from_slice(&chunk.hash.to_le_bytes());
		out.extend_from_slice(&chunk.code);
		if let Some(lines) = &chunk.lines {
			for line in lines {
				out.extend_from_slice(&line.to_le_bytes());
			}
		}
		out.extend_from_slice(&chunk.const_count.to_le_bytes());
		out.extend_from_slice(&chunk.constants);
	}

	if options & HSL_HAS_DEBUG_INFO != 0 {
		out.extend_from_slice(&(tokens.len() as u32).to_le_bytes());
		for token in tokens {
			out.extend_from_slice(token.as_bytes());
			out.push(0);
		}
	}
	if let Some(path) = source {
		out.extend_from_slice(path.as_bytes());
		out.push(0);
	}
	out
}

fn class_map(classes: &[(u32, Vec<u32>)]) -> Vec<u8> {
	let mut out = Vec::new();
	out.extend_from_slice(HSL_CLASS_MAP_MAGIC);
	out.extend_from_slice(&0u32.to_le_bytes());
	out.extend_from_slice(&(classes.len() as u32).to_le_bytes());
	for (hash, methods) in classes {
		out.extend_from_slice(&hash.to_le_bytes());
		out.extend_from_slice(&(methods.len() as u32).to_le_bytes());
		for method in methods.iter() {
			out.extend_from_slice(&method.to_le_bytes());
		}
	}
	out
}

#[test]
fn single_empty_function() {
	let chunk = Chunk {
		hash: 0x1111,
		arg_count: 2,
		min_arg_count: 1,
		..Default::default()
	};
	let module = HslModule::from_bytecode(&container(0, &[chunk], &[], None)).unwrap();

	assert_eq!(module.function_count(), 1);
	let function = module.function_by_index(0).unwrap();
	assert_eq!(function.hash, 0x1111);
	assert_eq!((function.arg_count, function.min_arg_count), (2, 1));
	assert!(function.bytecode.is_empty());
	assert!(!module.has_debug_info());
}

#[test]
fn zero_chunks_is_an_empty_table() {
	let module = HslModule::from_bytecode(&container(0, &[], &[], None)).unwrap();
	assert_eq!(module.function_count(), 0);
	assert!(matches!(
		module.function_by_index(0),
		Err(HatchError::OutOfRange { index: 0, count: 0 })
	));
}

#[test]
fn bad_magic_is_corrupt_format() {
	let mut bytes = container(0, &[], &[], None);
	bytes[..4].copy_from_slice(b"HVTM");
	assert!(matches!(HslModule::from_bytecode(&bytes), Err(HatchError::CorruptFormat(_))));
}

#[test]
fn functions_keep_positional_order() {
	let chunks = [
		Chunk::new(30, &[]),
		Chunk::new(10, &[]),
		Chunk::new(20, &[]),
	];
	let module = HslModule::from_bytecode(&container(0, &chunks, &[], None)).unwrap();
	let order: Vec<u32> = module.functions().map(|f| f.hash).collect();
	assert_eq!(order, vec![30, 10, 20]);
	assert_eq!(module.function_by_index(2).unwrap().hash, 20);
	assert!(matches!(module.function_by_hash(40), Err(HatchError::NotFound(_))));
}

#[test]
fn debug_names_attach_to_matching_functions() {
	let update = mix32_str("Update");
	let mut chunk = Chunk::new(update, &[Opcode::Return as u8]);
	chunk.lines = Some(vec![12]);
	let bytes = container(
		HSL_HAS_DEBUG_INFO | HSL_HAS_SOURCE_PATH,
		&[chunk, Chunk::new(0x5555, &[])],
		&["Update", "Unrelated"],
		Some("Scripts/Player.hsl"),
	);

	let module = HslModule::from_bytecode(&bytes).unwrap();
	assert!(module.has_debug_info());
	assert!(module.has_source_path());
	assert_eq!(module.source_path(), Some("Scripts/Player.hsl"));

	let function = module.function_by_name("Update").unwrap();
	assert_eq!(function.name.as_deref(), Some("Update"));
	assert_eq!(function.lines, vec![12]);
	assert_eq!(function.line_at(0), Some(12));

	// the unmatched token names nothing
	assert_eq!(module.function_by_hash(0x5555).unwrap().name, None);
	assert_eq!(module.function_count(), 2);
}

#[test]
fn missing_line_table_is_dropped_without_failing() {
	let code = [Opcode::Null as u8, Opcode::Return as u8, Opcode::Pop as u8, Opcode::Pop as u8];
	let chunk = Chunk::new(0x77, &code);
	let mut bytes = container(HSL_HAS_DEBUG_INFO, &[chunk], &[], None);
	// drop the const count and token count so fewer than 16 bytes follow the code
	bytes.truncate(bytes.len() - 8);
	bytes.extend_from_slice(&0u32.to_le_bytes());

	let module = HslModule::from_bytecode(&bytes).unwrap();
	let function = module.function_by_hash(0x77).unwrap();
	assert_eq!(function.bytecode, code);
	assert!(!function.has_lines());
}

#[test]
fn constant_pool_is_shared_and_ordered() {
	let chunks = [
		Chunk::new(1, &[]).int(-5).string("hello"),
		Chunk::new(2, &[]).int(42),
	];
	let module = HslModule::from_bytecode(&container(0, &chunks, &[], None)).unwrap();
	let pool = [
		HslConstant::Int(-5),
		HslConstant::Str("hello".to_string()),
		HslConstant::Int(42),
	];
	assert_eq!(module.constants_for(1).unwrap(), &pool);
	assert_eq!(module.constants_for(2).unwrap(), &pool);
	assert_eq!(module.pools().len(), 1);
	assert!(matches!(module.constants_for(3), Err(HatchError::NotFound(_))));
}

#[test]
fn constant_indices_resolve_within_their_container() {
	let first = mix32_str("First");
	let second = mix32_str("Second");
	let mut code = vec![Opcode::Constant as u8];
	code.extend_from_slice(&0u32.to_le_bytes());

	let mut module = HslModule::new();
	let a = container(HSL_HAS_DEBUG_INFO, &[Chunk::new(first, &code).int(111)], &["First"], None);
	let b = container(HSL_HAS_DEBUG_INFO, &[Chunk::new(second, &code).int(222)], &["Second"], None);
	module.load_bytecode(&a).unwrap();
	module.load_bytecode(&b).unwrap();

	assert_eq!(module.pools().len(), 2);
	assert_eq!(module.constants_for(second).unwrap(), &[HslConstant::Int(222)]);
	assert_eq!(
		module.decompile_function(first).unwrap(),
		"function First(0 args, 0 required)\n0000  push 111\n"
	);
	assert_eq!(
		module.decompile_function(second).unwrap(),
		"function Second(0 args, 0 required)\n0000  push 222\n"
	);
}

#[test]
fn class_map_merge_is_additive() {
	let player = mix32_str("Player");
	let jump = mix32_str("Jump");
	let bytes = container(
		HSL_HAS_DEBUG_INFO,
		&[Chunk::new(jump, &[])],
		&["Jump", "Player", "Run"],
		None,
	);
	let mut module = HslModule::from_bytecode(&bytes).unwrap();

	module.load_class_map(&class_map(&[(player, vec![jump])])).unwrap();
	{
		let class = module.class_by_name("Player").unwrap();
		assert_eq!(class.name.as_deref(), Some("Player"));
		assert_eq!(class.method(jump).unwrap().name.as_deref(), Some("Jump"));
	}

	let run = mix32_str("Run");
	let other = 0xC1A5;
	module
		.load_class_map(&class_map(&[(player, vec![jump, run]), (other, vec![])]))
		.unwrap();

	let class = module.class_by_hash(player).unwrap();
	assert_eq!(class.name.as_deref(), Some("Player"));
	assert_eq!(class.methods.len(), 2);
	assert_eq!(class.method(run).unwrap().name.as_deref(), Some("Run"));
	assert_eq!(module.class_by_hash(other).unwrap().name, None);

	let order: Vec<u32> = module.classes().map(|c| c.hash).collect();
	assert_eq!(order, vec![player, other]);
}

#[test]
fn later_bytecode_names_earlier_classes() {
	let enemy = mix32_str("Enemy");
	let mut module = HslModule::new();
	module.load_class_map(&class_map(&[(enemy, vec![])])).unwrap();
	assert_eq!(module.class_by_hash(enemy).unwrap().name, None);

	let bytes = container(HSL_HAS_DEBUG_INFO, &[Chunk::new(7, &[])], &["Enemy"], None);
	module.load_bytecode(&bytes).unwrap();
	assert_eq!(module.class_by_hash(enemy).unwrap().name.as_deref(), Some("Enemy"));
	assert_eq!(module.name_of(enemy), Some("Enemy"));
}

#[test]
fn decompiles_with_resolved_names() {
	let draw = mix32_str("Draw");
	let x = mix32_str("x");
	let mut code = vec![Opcode::GetLocal as u8, 0, Opcode::GetProperty as u8];
	code.extend_from_slice(&x.to_le_bytes());
	code.push(Opcode::Constant as u8);
	code.extend_from_slice(&0u32.to_le_bytes());
	code.push(Opcode::Add as u8);
	code.push(Opcode::Return as u8);

	let mut chunk = Chunk::new(draw, &code).int(3);
	chunk.arg_count = 1;
	chunk.min_arg_count = 1;
	let bytes = container(HSL_HAS_DEBUG_INFO, &[chunk], &["Draw", "x"], None);
	let module = HslModule::from_bytecode(&bytes).unwrap();

	let text = module.decompile_function(draw).unwrap();
	assert_eq!(
		text,
		"function Draw(1 args, 1 required)\n\
		 0000  get local0\n\
		 0002  get .x\n\
		 0007  push 3\n\
		 000c  op +\n\
		 000d  return\n"
	);
	assert!(matches!(module.decompile_function(1), Err(HatchError::NotFound(_))));
}
