use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

pub const KEY_MIME: &str = "mime";
pub const KEY_WIDTH: &str = "width";
pub const KEY_HEIGHT: &str = "height";
pub const KEY_SAMPLE_RATE: &str = "sample-rate";
pub const KEY_CHANNEL_COUNT: &str = "channel-count";
pub const KEY_BIT_RATE: &str = "bitrate";
pub const KEY_DURATION: &str = "durationUs";
pub const KEY_LANGUAGE: &str = "language";
/// Codec specific data. For AVC this is the SPS in Annex B framing.
pub const KEY_CSD_0: &str = "csd-0";
/// Second codec specific buffer. For AVC this is the PPS.
pub const KEY_CSD_1: &str = "csd-1";

pub const MIMETYPE_VIDEO_AVC: &str = "video/avc";
pub const MIMETYPE_VIDEO_HEVC: &str = "video/hevc";
pub const MIMETYPE_VIDEO_VP8: &str = "video/x-vnd.on2.vp8";
pub const MIMETYPE_VIDEO_VP9: &str = "video/x-vnd.on2.vp9";
pub const MIMETYPE_VIDEO_AV1: &str = "video/av01";
pub const MIMETYPE_VIDEO_MPEG4: &str = "video/mp4v-es";
pub const MIMETYPE_VIDEO_H263: &str = "video/3gpp";

pub const MIMETYPE_AUDIO_AAC: &str = "audio/mp4a-latm";
pub const MIMETYPE_AUDIO_MPEG: &str = "audio/mpeg";
pub const MIMETYPE_AUDIO_OPUS: &str = "audio/opus";
pub const MIMETYPE_AUDIO_AC3: &str = "audio/ac3";
pub const MIMETYPE_AUDIO_EAC3: &str = "audio/eac3";
pub const MIMETYPE_AUDIO_FLAC: &str = "audio/flac";
pub const MIMETYPE_AUDIO_VORBIS: &str = "audio/vorbis";
pub const MIMETYPE_AUDIO_AMR_NB: &str = "audio/3gpp";
pub const MIMETYPE_AUDIO_AMR_WB: &str = "audio/amr-wb";

/// Which validation branch a track goes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackType {
    Video,
    Audio,
}

impl TrackType {
    /// Map an `hdlr` handler type to a track type. Text, hint and metadata
    /// handlers have none.
    pub fn from_handler(handler: &[u8; 4]) -> Option<Self> {
        match handler {
            b"vide" => Some(TrackType::Video),
            b"soun" => Some(TrackType::Audio),
            _ => None,
        }
    }
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackType::Video => f.write_str("video"),
            TrackType::Audio => f.write_str("audio"),
        }
    }
}

/// A single value stored in a [`MediaFormat`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FormatValue {
    Int(i32),
    Long(i64),
    Str(String),
    #[serde(serialize_with = "serialize_hex")]
    Bytes(Vec<u8>),
}

fn serialize_hex<T: AsRef<[u8]>, S: serde::Serializer>(bytes: &T, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&hex::encode(bytes.as_ref()))
}

/// Key/value description of a track's format, as handed over by the encoder
/// once the output configuration is final.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct MediaFormat {
    entries: BTreeMap<String, FormatValue>,
}

impl MediaFormat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn video(mime: &str, width: i32, height: i32) -> Self {
        let mut f = Self::new();
        f.set_string(KEY_MIME, mime);
        f.set_integer(KEY_WIDTH, width);
        f.set_integer(KEY_HEIGHT, height);
        f
    }

    pub fn audio(mime: &str, sample_rate: i32, channel_count: i32) -> Self {
        let mut f = Self::new();
        f.set_string(KEY_MIME, mime);
        f.set_integer(KEY_SAMPLE_RATE, sample_rate);
        f.set_integer(KEY_CHANNEL_COUNT, channel_count);
        f
    }

    /// Builder-style variant of [`MediaFormat::set`].
    pub fn with(mut self, key: &str, value: FormatValue) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: FormatValue) {
        self.entries.insert(key.to_string(), value);
    }

    pub fn set_string(&mut self, key: &str, value: impl Into<String>) {
        self.set(key, FormatValue::Str(value.into()));
    }

    pub fn set_integer(&mut self, key: &str, value: i32) {
        self.set(key, FormatValue::Int(value));
    }

    pub fn set_long(&mut self, key: &str, value: i64) {
        self.set(key, FormatValue::Long(value));
    }

    pub fn set_bytes(&mut self, key: &str, value: impl Into<Vec<u8>>) {
        self.set(key, FormatValue::Bytes(value.into()));
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&FormatValue> {
        self.entries.get(key)
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(FormatValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_integer(&self, key: &str) -> Option<i32> {
        match self.entries.get(key) {
            Some(FormatValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    /// Reads a long, widening an int stored under the same key.
    pub fn get_long(&self, key: &str) -> Option<i64> {
        match self.entries.get(key) {
            Some(FormatValue::Long(v)) => Some(*v),
            Some(FormatValue::Int(v)) => Some(i64::from(*v)),
            _ => None,
        }
    }

    pub fn get_bytes(&self, key: &str) -> Option<&[u8]> {
        match self.entries.get(key) {
            Some(FormatValue::Bytes(b)) => Some(b),
            _ => None,
        }
    }

    pub fn mime(&self) -> Option<&str> {
        self.get_string(KEY_MIME)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}
