use std::io::{self, Read};

/// Reads a NUL-terminated string. Running out of input ends the string
/// instead of failing; only a read with no bytes at all is an error.
///
/// Returns the raw bytes (for hashing) alongside the lossy text.
pub fn read_c_string<R: Read>(reader: &mut R) -> io::Result<(Vec<u8>, String)> {
	let mut raw = Vec::new();
	let mut byte = [0u8; 1];
	let mut any = false;

	loop {
		if reader.read(&mut byte)? == 0 {
			break;
		}
		any = true;
		if byte[0] == 0 {
			break;
		}
		raw.push(byte[0]);
	}

	if !any {
		return Err(io::Error::new(
			io::ErrorKind::UnexpectedEof,
			"string starts past end of buffer",
		));
	}

	let text = String::from_utf8_lossy(&raw).into_owned();
	Ok((raw, text))
}
