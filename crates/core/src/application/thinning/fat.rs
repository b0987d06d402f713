// Universal (fat) Mach-O container: header parsing and layout planning
//
// All header fields are big-endian. A fat header is followed by `nfat_arch`
// entries (20 bytes each, 32 bytes for the 64-bit variant); slices follow at
// offsets aligned to `2^align`.

use std::io::{self, Read, Write};
use thiserror::Error;

pub const FAT_MAGIC: u32 = 0xcafe_babe;
pub const FAT_MAGIC_64: u32 = 0xcafe_babf;

const FAT_HEADER_SIZE: u64 = 8;
const FAT_ARCH_SIZE: u64 = 20;
const FAT_ARCH_64_SIZE: u64 = 32;

/// Java class files share FAT_MAGIC; their version field reads as a large arch count
pub const MAX_FAT_ARCHES: u32 = 30;

/// Largest slice alignment accepted (2^15), same limit as lipo
pub const MAX_ALIGN: u32 = 15;

#[derive(Error, Debug)]
pub enum FatError {
    #[error("malformed fat header: {0}")]
    Malformed(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// One architecture slice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FatSlice {
    pub cpu_type: i32,
    pub cpu_subtype: i32,
    pub offset: u64,
    pub size: u64,
    pub align: u32,
}

/// Parsed container header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FatHeader {
    pub is_64: bool,
    pub slices: Vec<FatSlice>,
}

impl FatHeader {
    /// Size of the header plus arch table for `count` slices
    pub fn header_len(is_64: bool, count: usize) -> u64 {
        let entry = if is_64 { FAT_ARCH_64_SIZE } else { FAT_ARCH_SIZE };
        FAT_HEADER_SIZE + entry * count as u64
    }
}

/// Read a fat header from the start of a file.
///
/// Returns `Ok(None)` when the data is not a universal binary (wrong magic,
/// too short, or a Java class file).
///
/// # Errors
/// - `FatError::Malformed` if a slice is out of bounds, overlaps another
///   slice or the header, or has an impossible alignment
pub fn read_header<R: Read>(reader: &mut R, file_len: u64) -> Result<Option<FatHeader>, FatError> {
    let mut head = [0u8; 8];
    if !read_full(reader, &mut head)? {
        return Ok(None);
    }

    let magic = u32::from_be_bytes([head[0], head[1], head[2], head[3]]);
    let nfat = u32::from_be_bytes([head[4], head[5], head[6], head[7]]);
    let is_64 = match magic {
        FAT_MAGIC => false,
        FAT_MAGIC_64 => true,
        _ => return Ok(None),
    };
    if nfat == 0 || nfat > MAX_FAT_ARCHES {
        return Ok(None);
    }

    let header_len = FatHeader::header_len(is_64, nfat as usize);
    if header_len > file_len {
        return Err(FatError::Malformed(format!(
            "{} arch entries do not fit in {} bytes",
            nfat, file_len
        )));
    }

    let mut slices = Vec::with_capacity(nfat as usize);
    for _ in 0..nfat {
        slices.push(read_arch(reader, is_64)?);
    }
    check_slices(&slices, header_len, file_len)?;

    Ok(Some(FatHeader { is_64, slices }))
}

fn read_arch<R: Read>(reader: &mut R, is_64: bool) -> Result<FatSlice, FatError> {
    let cpu_type = read_u32(reader)? as i32;
    let cpu_subtype = read_u32(reader)? as i32;
    let (offset, size) = if is_64 {
        (read_u64(reader)?, read_u64(reader)?)
    } else {
        (read_u32(reader)? as u64, read_u32(reader)? as u64)
    };
    let align = read_u32(reader)?;
    if is_64 {
        let _reserved = read_u32(reader)?;
    }
    Ok(FatSlice {
        cpu_type,
        cpu_subtype,
        offset,
        size,
        align,
    })
}

fn check_slices(slices: &[FatSlice], header_len: u64, file_len: u64) -> Result<(), FatError> {
    for s in slices {
        if s.align > MAX_ALIGN {
            return Err(FatError::Malformed(format!(
                "slice alignment 2^{} exceeds 2^{}",
                s.align, MAX_ALIGN
            )));
        }
        let end = s
            .offset
            .checked_add(s.size)
            .ok_or_else(|| FatError::Malformed("slice size overflows".to_string()))?;
        if s.offset < header_len || end > file_len {
            return Err(FatError::Malformed(format!(
                "slice at {}..{} outside {}..{}",
                s.offset, end, header_len, file_len
            )));
        }
    }

    let mut sorted: Vec<&FatSlice> = slices.iter().collect();
    sorted.sort_by_key(|s| s.offset);
    for pair in sorted.windows(2) {
        if pair[0].offset + pair[0].size > pair[1].offset {
            return Err(FatError::Malformed("overlapping slices".to_string()));
        }
    }
    Ok(())
}

/// Where each kept slice lands in the rewritten container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    pub is_64: bool,
    /// (source slice, new offset)
    pub placements: Vec<(FatSlice, u64)>,
    pub total_len: u64,
}

/// Plan a container holding exactly `keep`, in the given order. Every slice
/// starts at the next multiple of its own `2^align` after the previous data.
pub fn plan_layout(is_64: bool, keep: &[FatSlice]) -> Layout {
    let mut cursor = FatHeader::header_len(is_64, keep.len());
    let mut placements = Vec::with_capacity(keep.len());
    for slice in keep {
        let offset = align_up(cursor, 1u64 << slice.align);
        placements.push((*slice, offset));
        cursor = offset + slice.size;
    }
    Layout {
        is_64,
        placements,
        total_len: cursor,
    }
}

/// Write the header and arch table for `layout`
pub fn write_header<W: Write>(writer: &mut W, layout: &Layout) -> io::Result<()> {
    let magic = if layout.is_64 { FAT_MAGIC_64 } else { FAT_MAGIC };
    writer.write_all(&magic.to_be_bytes())?;
    writer.write_all(&(layout.placements.len() as u32).to_be_bytes())?;

    for (slice, offset) in &layout.placements {
        writer.write_all(&(slice.cpu_type as u32).to_be_bytes())?;
        writer.write_all(&(slice.cpu_subtype as u32).to_be_bytes())?;
        if layout.is_64 {
            writer.write_all(&offset.to_be_bytes())?;
            writer.write_all(&slice.size.to_be_bytes())?;
            writer.write_all(&slice.align.to_be_bytes())?;
            writer.write_all(&0u32.to_be_bytes())?;
        } else {
            writer.write_all(&(*offset as u32).to_be_bytes())?;
            writer.write_all(&(slice.size as u32).to_be_bytes())?;
            writer.write_all(&slice.align.to_be_bytes())?;
        }
    }
    Ok(())
}

fn align_up(value: u64, alignment: u64) -> u64 {
    value.div_ceil(alignment) * alignment
}

fn read_u32<R: Read>(reader: &mut R) -> io::Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_be_bytes(buf))
}

fn read_u64<R: Read>(reader: &mut R) -> io::Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_be_bytes(buf))
}

/// Fill `buf` completely; false on clean EOF before it is full
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}
