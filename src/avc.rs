//! H.264 codec specific data helpers.
//!
//! Encoders hand out the SPS as `csd-0` and the PPS as `csd-1`, each framed
//! with an Annex B start code. MP4 files carry the same parameter sets inside
//! an `avcC` record instead; [`AvcDecoderConfig`] converts between the two.

use crate::format::{KEY_CSD_0, MediaFormat};
use byteorder::{BigEndian, ReadBytesExt};
use std::io::{Cursor, Read};

pub const PROFILE_IDC_BASELINE: u8 = 66;
pub const PROFILE_IDC_MAIN: u8 = 77;
pub const PROFILE_IDC_EXTENDED: u8 = 88;
pub const PROFILE_IDC_HIGH: u8 = 100;
pub const PROFILE_IDC_HIGH_10: u8 = 110;
pub const PROFILE_IDC_HIGH_422: u8 = 122;
pub const PROFILE_IDC_HIGH_444: u8 = 244;
pub const PROFILE_IDC_CAVLC_444: u8 = 44;

pub const NAL_TYPE_SPS: u8 = 7;
pub const NAL_TYPE_PPS: u8 = 8;

const START_CODE: [u8; 4] = [0, 0, 0, 1];

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CsdError {
    #[error("format has no csd-0 buffer")]
    MissingCsd,
    #[error("AVC NAL start code not found in csd")]
    MissingStartCode,
    #[error("got non SPS NAL data (nal_unit_type={0})")]
    NotSps(u8),
    #[error("SPS is truncated ({0} bytes)")]
    TruncatedSps(usize),
    #[error("invalid avcC record: {0}")]
    InvalidConfigRecord(&'static str),
}

/// Strip a 4 or 3 byte Annex B start code.
pub fn strip_start_code(buf: &[u8]) -> Option<&[u8]> {
    buf.strip_prefix(&START_CODE[..])
        .or_else(|| buf.strip_prefix(&START_CODE[1..]))
}

/// Return the SPS payload (everything after the NAL header byte) out of a
/// format's `csd-0` buffer.
pub fn sps_buffer(format: &MediaFormat) -> Result<&[u8], CsdError> {
    let csd = format.get_bytes(KEY_CSD_0).ok_or(CsdError::MissingCsd)?;
    let nal = strip_start_code(csd).ok_or(CsdError::MissingStartCode)?;
    let (&header, payload) = nal.split_first().ok_or(CsdError::TruncatedSps(0))?;
    let nal_type = header & 0x1F;
    if nal_type != NAL_TYPE_SPS {
        return Err(CsdError::NotSps(nal_type));
    }
    Ok(payload)
}

/// `profile_idc` is the first byte of the SPS payload.
pub fn profile_idc(sps: &[u8]) -> Result<u8, CsdError> {
    sps.first().copied().ok_or(CsdError::TruncatedSps(sps.len()))
}

pub fn profile_name(profile_idc: u8) -> String {
    match profile_idc {
        PROFILE_IDC_BASELINE => "Baseline".to_string(),
        PROFILE_IDC_MAIN => "Main".to_string(),
        PROFILE_IDC_EXTENDED => "Extended".to_string(),
        PROFILE_IDC_HIGH => "High".to_string(),
        PROFILE_IDC_HIGH_10 => "High 10".to_string(),
        PROFILE_IDC_HIGH_422 => "High 4:2:2".to_string(),
        PROFILE_IDC_HIGH_444 => "High 4:4:4 Predictive".to_string(),
        PROFILE_IDC_CAVLC_444 => "CAVLC 4:4:4 Intra".to_string(),
        other => format!("Unknown ({other})"),
    }
}

/// The three fixed-position bytes at the start of an SPS payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpsHeader {
    pub profile_idc: u8,
    /// constraint_set0..5 flags in the top six bits.
    pub constraint_flags: u8,
    pub level_idc: u8,
}

impl SpsHeader {
    pub fn parse(sps: &[u8]) -> Result<Self, CsdError> {
        match sps {
            [profile_idc, constraint_flags, level_idc, ..] => Ok(SpsHeader {
                profile_idc: *profile_idc,
                constraint_flags: *constraint_flags,
                level_idc: *level_idc,
            }),
            _ => Err(CsdError::TruncatedSps(sps.len())),
        }
    }

    pub fn constraint_set(&self, n: u8) -> bool {
        n < 6 && self.constraint_flags & (0x80 >> n) != 0
    }

    pub fn is_constrained_baseline(&self) -> bool {
        self.profile_idc == PROFILE_IDC_BASELINE && self.constraint_set(1)
    }

    pub fn level_name(&self) -> String {
        // Level 1b is signalled as 11 + constraint_set3 below High profile.
        let below_high = matches!(
            self.profile_idc,
            PROFILE_IDC_BASELINE | PROFILE_IDC_MAIN | PROFILE_IDC_EXTENDED
        );
        if self.level_idc == 11 && below_high && self.constraint_set(3) {
            return "1b".to_string();
        }
        format!("{}.{}", self.level_idc / 10, self.level_idc % 10)
    }
}

/// AVCDecoderConfigurationRecord (`avcC` payload).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvcDecoderConfig {
    pub configuration_version: u8,
    pub profile_indication: u8,
    pub profile_compatibility: u8,
    pub level_indication: u8,
    pub nal_length_size: u8,
    pub sps: Vec<Vec<u8>>,
    pub pps: Vec<Vec<u8>>,
}

impl AvcDecoderConfig {
    pub fn parse(data: &[u8]) -> Result<Self, CsdError> {
        let mut r = Cursor::new(data);
        let truncated = |_| CsdError::InvalidConfigRecord("truncated");

        let configuration_version = r.read_u8().map_err(truncated)?;
        if configuration_version != 1 {
            return Err(CsdError::InvalidConfigRecord("unsupported configurationVersion"));
        }
        let profile_indication = r.read_u8().map_err(truncated)?;
        let profile_compatibility = r.read_u8().map_err(truncated)?;
        let level_indication = r.read_u8().map_err(truncated)?;
        let nal_length_size = (r.read_u8().map_err(truncated)? & 0x03) + 1;

        let num_sps = r.read_u8().map_err(truncated)? & 0x1F;
        let sps = read_parameter_sets(&mut r, num_sps)?;
        let num_pps = r.read_u8().map_err(truncated)?;
        let pps = read_parameter_sets(&mut r, num_pps)?;

        if sps.is_empty() {
            return Err(CsdError::InvalidConfigRecord("no SPS"));
        }

        Ok(AvcDecoderConfig {
            configuration_version,
            profile_indication,
            profile_compatibility,
            level_indication,
            nal_length_size,
            sps,
            pps,
        })
    }

    /// First SPS with an Annex B start code, as stored under `csd-0`.
    pub fn csd0(&self) -> Option<Vec<u8>> {
        self.sps.first().map(|nal| annex_b(nal))
    }

    /// First PPS with an Annex B start code, as stored under `csd-1`.
    pub fn csd1(&self) -> Option<Vec<u8>> {
        self.pps.first().map(|nal| annex_b(nal))
    }
}

fn read_parameter_sets(r: &mut Cursor<&[u8]>, count: u8) -> Result<Vec<Vec<u8>>, CsdError> {
    let mut sets = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let len = r
            .read_u16::<BigEndian>()
            .map_err(|_| CsdError::InvalidConfigRecord("truncated parameter set length"))?;
        let mut nal = vec![0u8; len as usize];
        r.read_exact(&mut nal)
            .map_err(|_| CsdError::InvalidConfigRecord("truncated parameter set"))?;
        sets.push(nal);
    }
    Ok(sets)
}

fn annex_b(nal: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(START_CODE.len() + nal.len());
    out.extend_from_slice(&START_CODE);
    out.extend_from_slice(nal);
    out
}
