//! Rebuild per-track [`MediaFormat`]s from a finished MP4 file.

use crate::avc::AvcDecoderConfig;
use crate::boxes::{BoxRef, FourCC};
use crate::esds::EsDescriptor;
use crate::format::*;
use crate::parser::{ParseError, parse_children, read_box_header};
use crate::util::{lang_from_u16, read_slice};
use anyhow::{Context, bail};
use byteorder::{BigEndian, ReadBytesExt};
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

// Bytes between the sample entry header and its child boxes:
// SampleEntry (8) + VisualSampleEntry fields (70).
const VISUAL_SAMPLE_ENTRY_LEN: u64 = 78;
// SampleEntry (8) + AudioSampleEntry fields (20).
const AUDIO_SAMPLE_ENTRY_LEN: u64 = 28;

#[derive(Debug, Clone, Serialize)]
pub struct TrackFormat {
    /// 1-based position of the `trak` box inside `moov`.
    pub index: usize,
    pub track_id: Option<u32>,
    pub handler_type: String,
    /// `None` for tracks that are neither video nor audio.
    pub track_type: Option<TrackType>,
    /// Four-cc of the first sample entry, e.g. `avc1` or `mp4a`.
    pub sample_entry: Option<String>,
    pub format: MediaFormat,
}

pub fn read_track_formats_from_path(path: impl AsRef<Path>) -> anyhow::Result<Vec<TrackFormat>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    read_track_formats(BufReader::new(file))
        .with_context(|| format!("reading tracks of {}", path.display()))
}

pub fn read_track_formats<R: Read + Seek>(mut reader: R) -> anyhow::Result<Vec<TrackFormat>> {
    let file_size = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(0))?;

    let boxes = parse_children(&mut reader, file_size).context("parsing top-level boxes")?;
    let Some(moov) = boxes.iter().find(|b| b.is(b"moov")) else {
        bail!("no moov box found");
    };

    moov.children()
        .iter()
        .filter(|b| b.is(b"trak"))
        .enumerate()
        .map(|(i, trak)| {
            read_track_format(&mut reader, trak, i + 1)
                .with_context(|| format!("track {}", i + 1))
        })
        .collect()
}

fn read_track_format<R: Read + Seek>(
    r: &mut R,
    trak: &BoxRef,
    index: usize,
) -> anyhow::Result<TrackFormat> {
    let mut format = MediaFormat::new();

    let track_id = match trak.child(b"tkhd") {
        Some(tkhd) => Some(read_track_id(r, tkhd)?),
        None => None,
    };

    let mut handler = *b"\0\0\0\0";
    if let Some(mdia) = trak.child(b"mdia") {
        if let Some(mdhd) = mdia.child(b"mdhd") {
            read_media_header(r, mdhd, &mut format)?;
        }
        if let Some(hdlr) = mdia.child(b"hdlr") {
            handler = read_handler_type(r, hdlr)?;
        }
    }
    let track_type = TrackType::from_handler(&handler);

    let mut sample_entry = None;
    if let Some(stsd) = trak.descend(&[b"mdia", b"minf", b"stbl", b"stsd"]) {
        sample_entry = read_sample_description(r, stsd, track_type, &mut format)?;
    }

    tracing::debug!(
        index,
        handler = %FourCC(handler),
        mime = format.mime().unwrap_or("-"),
        "extracted track format"
    );

    Ok(TrackFormat {
        index,
        track_id,
        handler_type: FourCC(handler).to_string(),
        track_type,
        sample_entry: sample_entry.map(|cc| cc.to_string()),
        format,
    })
}

fn payload<R: Read + Seek>(r: &mut R, b: &BoxRef) -> anyhow::Result<Vec<u8>> {
    let (off, len) = b
        .payload()
        .with_context(|| format!("'{}' has no payload", b.hdr.typ))?;
    Ok(read_slice(r, off, len)?)
}

fn read_track_id<R: Read + Seek>(r: &mut R, tkhd: &BoxRef) -> anyhow::Result<u32> {
    let data = payload(r, tkhd)?;
    let mut c = Cursor::new(data);
    // creation_time + modification_time
    let skip = if tkhd.version() == Some(1) { 16 } else { 8 };
    c.seek(SeekFrom::Current(skip))?;
    Ok(c.read_u32::<BigEndian>()?)
}

fn read_media_header<R: Read + Seek>(
    r: &mut R,
    mdhd: &BoxRef,
    format: &mut MediaFormat,
) -> anyhow::Result<()> {
    let data = payload(r, mdhd)?;
    let mut c = Cursor::new(data);
    let (timescale, duration) = if mdhd.version() == Some(1) {
        c.seek(SeekFrom::Current(16))?;
        (c.read_u32::<BigEndian>()?, c.read_u64::<BigEndian>()?)
    } else {
        c.seek(SeekFrom::Current(8))?;
        (c.read_u32::<BigEndian>()?, c.read_u32::<BigEndian>()? as u64)
    };
    let language = c.read_u16::<BigEndian>()?;

    if timescale > 0 && duration != u64::MAX && duration != u32::MAX as u64 {
        let micros = duration as u128 * 1_000_000 / timescale as u128;
        format.set_long(KEY_DURATION, i64::try_from(micros).unwrap_or(i64::MAX));
    }
    format.set_string(KEY_LANGUAGE, lang_from_u16(language));
    Ok(())
}

fn read_handler_type<R: Read + Seek>(r: &mut R, hdlr: &BoxRef) -> anyhow::Result<[u8; 4]> {
    let data = payload(r, hdlr)?;
    // pre_defined, then handler_type
    match data.get(4..8) {
        Some(h) => Ok([h[0], h[1], h[2], h[3]]),
        None => bail!("hdlr payload too short ({} bytes)", data.len()),
    }
}

/// Fill `format` from the first sample entry of an `stsd` box.
fn read_sample_description<R: Read + Seek>(
    r: &mut R,
    stsd: &BoxRef,
    track_type: Option<TrackType>,
    format: &mut MediaFormat,
) -> anyhow::Result<Option<FourCC>> {
    let (off, len) = stsd.payload().context("stsd has no payload")?;
    let stsd_end = off + len;
    r.seek(SeekFrom::Start(off))?;
    let entry_count = r.read_u32::<BigEndian>()?;
    if entry_count == 0 {
        return Ok(None);
    }
    if entry_count > 1 {
        tracing::debug!(entry_count, "stsd has several sample entries, using the first");
    }

    let entry = read_box_header(r)?;
    let entry_end = entry.end(stsd_end);
    if entry_end > stsd_end {
        return Err(ParseError::BoxOverrun {
            typ: entry.typ,
            start: entry.start,
            end: entry_end,
            parent_end: stsd_end,
        }
        .into());
    }
    let content = entry.start + entry.header_size;
    let cc = entry.typ;

    let is_video = video_mime(&cc).is_some() || track_type == Some(TrackType::Video);
    if is_video {
        require_fixed_fields(cc, content + VISUAL_SAMPLE_ENTRY_LEN, entry_end)?;
        r.seek(SeekFrom::Start(content + 24))?;
        let width = r.read_u16::<BigEndian>()?;
        let height = r.read_u16::<BigEndian>()?;
        format.set_integer(KEY_WIDTH, width as i32);
        format.set_integer(KEY_HEIGHT, height as i32);
        if let Some(mime) = video_mime(&cc) {
            format.set_string(KEY_MIME, mime);
        }

        r.seek(SeekFrom::Start(content + VISUAL_SAMPLE_ENTRY_LEN))?;
        let children = parse_children(r, entry_end)?;
        if let Some(avcc) = children.iter().find(|b| b.is(b"avcC")) {
            let config = AvcDecoderConfig::parse(&payload(r, avcc)?).context("parsing avcC")?;
            if let Some(csd0) = config.csd0() {
                format.set_bytes(KEY_CSD_0, csd0);
            }
            if let Some(csd1) = config.csd1() {
                format.set_bytes(KEY_CSD_1, csd1);
            }
        }
    } else if &cc.0 == b"mp4a"
        || audio_mime(&cc).is_some()
        || track_type == Some(TrackType::Audio)
    {
        require_fixed_fields(cc, content + AUDIO_SAMPLE_ENTRY_LEN, entry_end)?;
        r.seek(SeekFrom::Start(content + 16))?;
        let channel_count = r.read_u16::<BigEndian>()?;
        let _sample_size = r.read_u16::<BigEndian>()?;
        r.seek(SeekFrom::Current(4))?;
        // 16.16 fixed point
        let sample_rate = r.read_u32::<BigEndian>()? >> 16;
        format.set_integer(KEY_CHANNEL_COUNT, channel_count as i32);
        format.set_integer(KEY_SAMPLE_RATE, sample_rate as i32);
        if let Some(mime) = audio_mime(&cc) {
            format.set_string(KEY_MIME, mime);
        }

        if &cc.0 == b"mp4a" {
            r.seek(SeekFrom::Start(content + AUDIO_SAMPLE_ENTRY_LEN))?;
            let children = parse_children(r, entry_end)?;
            if let Some(esds) = children.iter().find(|b| b.is(b"esds")) {
                let es = EsDescriptor::parse(&payload(r, esds)?).context("parsing esds")?;
                match es.mime() {
                    Some(mime) => format.set_string(KEY_MIME, mime),
                    None => tracing::debug!(
                        oti = es.object_type_indication,
                        "unknown mp4a object type"
                    ),
                }
                if es.avg_bitrate > 0 {
                    format.set_integer(KEY_BIT_RATE, i32::try_from(es.avg_bitrate).unwrap_or(i32::MAX));
                }
                if let Some(dsi) = es.decoder_specific_info {
                    format.set_bytes(KEY_CSD_0, dsi);
                }
            }
        }
    }

    Ok(Some(cc))
}

fn require_fixed_fields(cc: FourCC, fields_end: u64, entry_end: u64) -> anyhow::Result<()> {
    if fields_end > entry_end {
        return Err(anyhow::Error::new(ParseError::InvalidSize).context(format!(
            "sample entry '{cc}' ends at {entry_end}, before its fixed fields end at {fields_end}"
        )));
    }
    Ok(())
}

pub fn video_mime(cc: &FourCC) -> Option<&'static str> {
    match &cc.0 {
        b"avc1" | b"avc3" => Some(MIMETYPE_VIDEO_AVC),
        b"hvc1" | b"hev1" => Some(MIMETYPE_VIDEO_HEVC),
        b"vp08" => Some(MIMETYPE_VIDEO_VP8),
        b"vp09" => Some(MIMETYPE_VIDEO_VP9),
        b"av01" => Some(MIMETYPE_VIDEO_AV1),
        b"mp4v" => Some(MIMETYPE_VIDEO_MPEG4),
        b"s263" => Some(MIMETYPE_VIDEO_H263),
        _ => None,
    }
}

/// `mp4a` is resolved through its `esds` descriptor instead.
pub fn audio_mime(cc: &FourCC) -> Option<&'static str> {
    match &cc.0 {
        b"Opus" => Some(MIMETYPE_AUDIO_OPUS),
        b"ac-3" => Some(MIMETYPE_AUDIO_AC3),
        b"ec-3" => Some(MIMETYPE_AUDIO_EAC3),
        b"fLaC" => Some(MIMETYPE_AUDIO_FLAC),
        b"samr" => Some(MIMETYPE_AUDIO_AMR_NB),
        b"sawb" => Some(MIMETYPE_AUDIO_AMR_WB),
        b".mp3" => Some(MIMETYPE_AUDIO_MPEG),
        _ => None,
    }
}
