use std::fs::File;
use std::path::Path;
use std::io::{Read, Write};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use super::types::{MetaValue, PackError};
use std::error::Error;

/// The magic number that identifies MLPK files
pub const PACK_MAGIC: u32 = 0x4B504C4D; // "MLPK" in ASCII

/// Current version of the MLPK format
pub const PACK_VERSION: u32 = 1;

/// Read a length-prefixed UTF-8 string
pub fn read_string<R: Read>(reader: &mut R) -> Result<String, Box<dyn Error + Send + Sync>> {
    let str_len = reader.read_u64::<LittleEndian>()?;

    let mut buffer = vec![0u8; str_len as usize];
    reader.read_exact(&mut buffer)?;

    let string = String::from_utf8(buffer)
        .map_err(|e| Box::new(PackError::InvalidFormat(format!("Invalid UTF-8 in string: {}", e))))?;

    Ok(string)
}

/// Write a length-prefixed UTF-8 string
pub fn write_string<W: Write>(writer: &mut W, s: &str) -> Result<(), Box<dyn Error + Send + Sync>> {
    writer.write_u64::<LittleEndian>(s.len() as u64)?;
    writer.write_all(s.as_bytes())?;
    Ok(())
}

/// Read a metadata value of the specified type code
pub fn read_meta_value<R: Read>(reader: &mut R, value_type: u32) -> Result<MetaValue, Box<dyn Error + Send + Sync>> {
    match value_type {
        0 => { // STRING
            let s = read_string(reader)?;
            Ok(MetaValue::String(s))
        },
        1 => { // INT
            let val = reader.read_i64::<LittleEndian>()?;
            Ok(MetaValue::Int(val))
        },
        2 => { // FLOAT
            let val = reader.read_f32::<LittleEndian>()?;
            Ok(MetaValue::Float(val))
        },
        3 => { // BOOL
            let val = reader.read_u8()? != 0;
            Ok(MetaValue::Bool(val))
        },
        _ => {
            Err(Box::new(PackError::InvalidFormat(
                format!("Unknown metadata value type: {}", value_type)
            )))
        }
    }
}

/// Write a metadata value preceded by its type code
pub fn write_meta_value<W: Write>(writer: &mut W, value: &MetaValue) -> Result<(), Box<dyn Error + Send + Sync>> {
    writer.write_u32::<LittleEndian>(value.code())?;
    match value {
        MetaValue::String(s) => write_string(writer, s)?,
        MetaValue::Int(i) => writer.write_i64::<LittleEndian>(*i)?,
        MetaValue::Float(f) => writer.write_f32::<LittleEndian>(*f)?,
        MetaValue::Bool(b) => writer.write_u8(*b as u8)?,
    }
    Ok(())
}

/// Checks if a file at the given path is an MLPK format file by verifying its magic number.
///
/// # Arguments
///
/// * `path` - Path to the file to check
///
/// # Returns
///
/// `true` if the file exists and has a valid MLPK magic number, `false` otherwise
pub fn is_pack_file<P: AsRef<Path>>(path: P) -> bool {
    if let Ok(mut file) = File::open(path) {
        if let Ok(magic) = file.read_u32::<LittleEndian>() {
            return magic == PACK_MAGIC;
        }
    }
    false
}
