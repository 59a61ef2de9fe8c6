//! Reading input files and recognizing their containers.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use crate::error::{TypedigError, TypedigResult};

/// MSF 7.00 superblock signature.
pub const PDB7_MAGIC: &[u8] = b"Microsoft C/C++ MSF 7.00\r\n\x1aDS\0\0\0";

/// Signature of the older 2.00 program database layout.
pub const PDB2_MAGIC: &[u8] = b"Microsoft C/C++ program database 2.00\r\n\x1aJG\0\0";

pub const ELF_MAGIC: &[u8] = b"\x7fELF";

/// Read a whole file, mapping a missing or unreadable path to `FileNotFound`.
pub fn read_file(path: &Path) -> TypedigResult<Arc<[u8]>>
{
    match fs::read(path) {
        Ok(bytes) => Ok(Arc::<[u8]>::from(bytes)),
        Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
            Err(TypedigError::FileNotFound(path.to_path_buf()))
        }
        Err(_) if path.is_dir() => Err(TypedigError::FileNotFound(path.to_path_buf())),
        Err(err) => Err(TypedigError::Io(err)),
    }
}

pub fn is_elf(data: &[u8]) -> bool
{
    data.starts_with(ELF_MAGIC)
}
