//! Disk workload: write, seek and read back on a temporary file.

use crate::error::BoxError;
use std::fs::File;
use std::hint::black_box;
use std::io::{Read, Seek, SeekFrom, Write};

/// Bytes written per invocation.
pub const WRITE_LEN: usize = 1024 * 1024;

/// Offset the read starts at, and the number of bytes read back.
pub const READ_OFFSET: u64 = 1024;
pub const READ_LEN: usize = 1024;

const FILLER: u8 = b'Z';

/// Exercise the write/seek/read path on an anonymous temp file.
///
/// The file is unlinked when dropped. No fsync is issued.
pub fn run_once() -> Result<(), BoxError> {
    let mut file = tempfile::tempfile()?;
    let buf = exercise(&mut file)?;
    black_box(&buf);
    Ok(())
}

fn exercise(file: &mut File) -> std::io::Result<Vec<u8>> {
    file.write_all(&vec![FILLER; WRITE_LEN])?;
    file.seek(SeekFrom::Start(READ_OFFSET))?;
    let mut buf = vec![0u8; READ_LEN];
    file.read_exact(&mut buf)?;
    Ok(buf)
}
