// container.rs - .v4b bytecode container
//
// Thin framing around a compiled main stream:
//   magic "V4BC" | ver_major u8 | ver_minor u8 | flags u16 |
//   code_size u32 | reserved u32 | code bytes
// All multi-byte fields little-endian. Word entries are not serialized.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

pub const V4B_MAGIC: [u8; 4] = *b"V4BC";
pub const V4B_VERSION_MAJOR: u8 = 0;
pub const V4B_VERSION_MINOR: u8 = 1;

/// Header size on disk.
pub const V4B_HEADER_LEN: usize = 16;

/// Write a main bytecode stream to a `.v4b` file. Empty streams are
/// rejected; a compiled stream always holds at least a RET.
pub fn save_bytecode<P: AsRef<Path>>(path: P, code: &[u8]) -> io::Result<()> {
    if code.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "empty bytecode buffer",
        ));
    }

    let mut header = [0u8; V4B_HEADER_LEN];
    header[0..4].copy_from_slice(&V4B_MAGIC);
    header[4] = V4B_VERSION_MAJOR;
    header[5] = V4B_VERSION_MINOR;
    // bytes 6..8: flags, 12..16: reserved, both zero
    header[8..12].copy_from_slice(&(code.len() as u32).to_le_bytes());

    let mut file = File::create(path)?;
    file.write_all(&header)?;
    file.write_all(code)
}

/// Load the main bytecode stream from a `.v4b` file, validating the
/// magic and reading exactly the declared code size.
pub fn load_bytecode<P: AsRef<Path>>(path: P) -> io::Result<Vec<u8>> {
    let mut file = File::open(path)?;

    let mut header = [0u8; V4B_HEADER_LEN];
    file.read_exact(&mut header)?;

    if header[0..4] != V4B_MAGIC {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "not a .v4b file (bad magic)",
        ));
    }

    let code_size = u32::from_le_bytes([header[8], header[9], header[10], header[11]]) as usize;
    let mut code = vec![0u8; code_size];
    file.read_exact(&mut code)?;
    Ok(code)
}
