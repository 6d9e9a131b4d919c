use crate::boxes::{BoxHeader, BoxRef, FourCC, NodeKind};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Read, Seek, SeekFrom};

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid box size")]
    InvalidSize,
    #[error("box '{typ}' at offset {start} runs past its parent (ends at {end}, parent ends at {parent_end})")]
    BoxOverrun { typ: FourCC, start: u64, end: u64, parent_end: u64 },
}

pub type Result<T> = std::result::Result<T, ParseError>;

pub fn read_box_header<R: Read + Seek>(r: &mut R) -> Result<BoxHeader> {
    let start = r.stream_position()?;
    let size32 = r.read_u32::<BigEndian>()?;
    let mut typ = [0u8; 4];
    r.read_exact(&mut typ)?;

    let large = size32 == 1;
    let size = if large { r.read_u64::<BigEndian>()? } else { size32 as u64 };

    let uuid = if &typ == b"uuid" {
        let mut u = [0u8; 16];
        r.read_exact(&mut u)?;
        Some(u)
    } else {
        None
    };

    let mut header_size: u64 = 8;
    if large {
        header_size += 8;
    }
    if uuid.is_some() {
        header_size += 16;
    }
    if size != 0 && (size < header_size || start.checked_add(size).is_none()) {
        return Err(ParseError::InvalidSize);
    }

    Ok(BoxHeader { size, typ: FourCC(typ), uuid, header_size, start })
}

/// Parse sibling boxes from the current position up to `parent_end`.
pub fn parse_children<R: Read + Seek>(r: &mut R, parent_end: u64) -> Result<Vec<BoxRef>> {
    let mut kids = Vec::new();
    // A trailing gap smaller than a box header is padding.
    while r.stream_position()? + 8 <= parent_end {
        let h = read_box_header(r)?;
        let box_end = h.end(parent_end);
        if box_end > parent_end {
            return Err(ParseError::BoxOverrun {
                typ: h.typ,
                start: h.start,
                end: box_end,
                parent_end,
            });
        }
        let content_start = h.start + h.header_size;

        let kind = if is_container(&h.typ) {
            r.seek(SeekFrom::Start(content_start))?;
            NodeKind::Container(parse_children(r, box_end)?)
        } else if is_full_box(&h.typ) {
            r.seek(SeekFrom::Start(content_start))?;
            let version = r.read_u8()?;
            let flags = r.read_u24::<BigEndian>()?;
            let data_offset = content_start + 4;
            NodeKind::FullBox {
                version,
                flags,
                data_offset,
                data_len: box_end.saturating_sub(data_offset),
            }
        } else {
            NodeKind::Leaf {
                data_offset: content_start,
                data_len: box_end.saturating_sub(content_start),
            }
        };

        r.seek(SeekFrom::Start(box_end))?;
        kids.push(BoxRef { hdr: h, kind });
    }
    Ok(kids)
}

// Containers on the path from the file root to the sample descriptions.
fn is_container(typ: &FourCC) -> bool {
    matches!(
        &typ.0,
        b"moov" | b"trak" | b"mdia" | b"minf" | b"stbl" | b"dinf" | b"edts" | b"mvex" | b"udta"
    )
}

fn is_full_box(typ: &FourCC) -> bool {
    matches!(
        &typ.0,
        b"mvhd" | b"tkhd" | b"mdhd" | b"hdlr" | b"vmhd" | b"smhd" | b"nmhd" | b"dref"
            | b"stsd" | b"stts" | b"ctts" | b"stsc" | b"stsz" | b"stco" | b"co64" | b"stss"
            | b"elst" | b"esds" | b"mehd" | b"trex"
    )
}
