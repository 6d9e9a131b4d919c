//! MPEG-4 elementary stream descriptor (`esds`) parsing.

use crate::format::{
    MIMETYPE_AUDIO_AAC, MIMETYPE_AUDIO_AC3, MIMETYPE_AUDIO_EAC3, MIMETYPE_AUDIO_MPEG,
    MIMETYPE_AUDIO_VORBIS,
};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read};

const TAG_ES_DESCRIPTOR: u8 = 0x03;
const TAG_DECODER_CONFIG: u8 = 0x04;
const TAG_DECODER_SPECIFIC_INFO: u8 = 0x05;

#[derive(thiserror::Error, Debug)]
pub enum EsdsError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("unexpected descriptor tag 0x{found:02x}, wanted 0x{wanted:02x}")]
    UnexpectedTag { wanted: u8, found: u8 },
    #[error("descriptor declares {declared} bytes, only {available} left")]
    Truncated { declared: u32, available: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EsDescriptor {
    pub es_id: u16,
    pub object_type_indication: u8,
    pub stream_type: u8,
    pub max_bitrate: u32,
    pub avg_bitrate: u32,
    /// AudioSpecificConfig for AAC.
    pub decoder_specific_info: Option<Vec<u8>>,
}

impl EsDescriptor {
    /// Parse the payload of an `esds` box, after its version and flags.
    pub fn parse(data: &[u8]) -> Result<Self, EsdsError> {
        let mut r = Cursor::new(data);

        expect_tag(&mut r, TAG_ES_DESCRIPTOR)?;
        let _len = read_descriptor_len(&mut r)?;
        let es_id = r.read_u16::<BigEndian>()?;
        let flags = r.read_u8()?;
        if flags & 0x80 != 0 {
            // dependsOn_ES_ID
            r.read_u16::<BigEndian>()?;
        }
        if flags & 0x40 != 0 {
            let url_len = r.read_u8()?;
            skip(&mut r, url_len as u64)?;
        }
        if flags & 0x20 != 0 {
            // OCR_ES_Id
            r.read_u16::<BigEndian>()?;
        }

        expect_tag(&mut r, TAG_DECODER_CONFIG)?;
        let config_len = read_descriptor_len(&mut r)?;
        let config_start = r.position();
        let object_type_indication = r.read_u8()?;
        let stream_type = r.read_u8()? >> 2;
        let _buffer_size_db = r.read_u24::<BigEndian>()?;
        let max_bitrate = r.read_u32::<BigEndian>()?;
        let avg_bitrate = r.read_u32::<BigEndian>()?;

        let mut decoder_specific_info = None;
        let config_end = config_start + config_len as u64;
        if r.position() < config_end && r.read_u8()? == TAG_DECODER_SPECIFIC_INFO {
            let len = read_descriptor_len(&mut r)?;
            let available = data.len() as u64 - r.position();
            if len as u64 > available {
                return Err(EsdsError::Truncated { declared: len, available });
            }
            let mut dsi = vec![0u8; len as usize];
            r.read_exact(&mut dsi)?;
            decoder_specific_info = Some(dsi);
        }

        Ok(EsDescriptor {
            es_id,
            object_type_indication,
            stream_type,
            max_bitrate,
            avg_bitrate,
            decoder_specific_info,
        })
    }

    pub fn mime(&self) -> Option<&'static str> {
        mime_for_object_type(self.object_type_indication)
    }
}

pub fn mime_for_object_type(oti: u8) -> Option<&'static str> {
    match oti {
        // MPEG-4 AAC and the three MPEG-2 AAC profiles.
        0x40 | 0x66 | 0x67 | 0x68 => Some(MIMETYPE_AUDIO_AAC),
        0x69 | 0x6B => Some(MIMETYPE_AUDIO_MPEG),
        0xA5 => Some(MIMETYPE_AUDIO_AC3),
        0xA6 => Some(MIMETYPE_AUDIO_EAC3),
        0xDD => Some(MIMETYPE_AUDIO_VORBIS),
        _ => None,
    }
}

fn expect_tag(r: &mut Cursor<&[u8]>, wanted: u8) -> Result<(), EsdsError> {
    let found = r.read_u8()?;
    if found != wanted {
        return Err(EsdsError::UnexpectedTag { wanted, found });
    }
    Ok(())
}

// Expandable size: up to four bytes, 7 bits each, high bit means "more".
fn read_descriptor_len(r: &mut Cursor<&[u8]>) -> Result<u32, EsdsError> {
    let mut len = 0u32;
    for _ in 0..4 {
        let b = r.read_u8()?;
        len = (len << 7) | (b & 0x7F) as u32;
        if b & 0x80 == 0 {
            break;
        }
    }
    Ok(len)
}

fn skip(r: &mut Cursor<&[u8]>, n: u64) -> Result<(), EsdsError> {
    std::io::copy(&mut r.by_ref().take(n), &mut std::io::sink())?;
    Ok(())
}
