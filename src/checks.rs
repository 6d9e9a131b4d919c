//! Output format checks run once the encoder has settled on a track format.
//!
//! Only AVC video and AAC audio are accepted. Non-Baseline H.264 profiles are
//! accepted too, with a warning; they must never be turned into rejections.

use crate::avc::{self, CsdError};
use crate::format::{MIMETYPE_AUDIO_AAC, MIMETYPE_VIDEO_AVC, MediaFormat, TrackType};
use serde::Serialize;
use std::fmt;

/// A rejected output format. Terminal for the job that produced it.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidOutputFormat {
    #[error("Video codecs other than AVC is not supported, actual mime type: {}", MimeDisplay(.mime.as_deref()))]
    UnsupportedVideoCodec { mime: Option<String> },
    #[error("Audio codecs other than AAC is not supported, actual mime type: {}", MimeDisplay(.mime.as_deref()))]
    UnsupportedAudioCodec { mime: Option<String> },
    #[error("invalid AVC codec config: {0}")]
    InvalidCodecConfig(#[from] CsdError),
}

struct MimeDisplay<'a>(Option<&'a str>);

impl fmt::Display for MimeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.unwrap_or("null"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvisoryLevel {
    Info,
    Warn,
}

/// Non-fatal note attached to an accepted format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advisory {
    pub level: AdvisoryLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Accepted(Option<Advisory>),
    Rejected(InvalidOutputFormat),
}

impl ValidationOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ValidationOutcome::Accepted(_))
    }

    pub fn advisory(&self) -> Option<&Advisory> {
        match self {
            ValidationOutcome::Accepted(advisory) => advisory.as_ref(),
            ValidationOutcome::Rejected(_) => None,
        }
    }

    pub fn into_result(self) -> Result<Option<Advisory>, InvalidOutputFormat> {
        match self {
            ValidationOutcome::Accepted(advisory) => Ok(advisory),
            ValidationOutcome::Rejected(err) => Err(err),
        }
    }
}

impl From<Result<Option<Advisory>, InvalidOutputFormat>> for ValidationOutcome {
    fn from(res: Result<Option<Advisory>, InvalidOutputFormat>) -> Self {
        match res {
            Ok(advisory) => ValidationOutcome::Accepted(advisory),
            Err(err) => ValidationOutcome::Rejected(err),
        }
    }
}

/// Policy hook for output format validation.
pub trait SinkChecks: Send + Sync {
    fn check_output_format(&self, track: TrackType, format: &MediaFormat) -> ValidationOutcome;
}

/// The stock policy: AVC video, AAC audio.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultSinkChecks;

impl SinkChecks for DefaultSinkChecks {
    fn check_output_format(&self, track: TrackType, format: &MediaFormat) -> ValidationOutcome {
        check_output_format(track, format)
    }
}

pub fn check_output_format(track: TrackType, format: &MediaFormat) -> ValidationOutcome {
    let res = match track {
        TrackType::Video => check_video_output_format(format),
        TrackType::Audio => check_audio_output_format(format),
    };
    res.into()
}

fn check_video_output_format(
    format: &MediaFormat,
) -> Result<Option<Advisory>, InvalidOutputFormat> {
    let mime = format.mime();
    if mime != Some(MIMETYPE_VIDEO_AVC) {
        return Err(InvalidOutputFormat::UnsupportedVideoCodec {
            mime: mime.map(str::to_string),
        });
    }

    let sps = avc::sps_buffer(format)?;
    let profile_idc = avc::profile_idc(sps)?;
    let profile_name = avc::profile_name(profile_idc);

    let advisory = if profile_idc == avc::PROFILE_IDC_BASELINE {
        let message = format!("Output H.264 profile: {profile_name}");
        tracing::info!("{message}");
        Advisory { level: AdvisoryLevel::Info, message }
    } else {
        let message = format!("Output H.264 profile: {profile_name}. This might not be supported.");
        tracing::warn!("{message}");
        Advisory { level: AdvisoryLevel::Warn, message }
    };
    Ok(Some(advisory))
}

fn check_audio_output_format(
    format: &MediaFormat,
) -> Result<Option<Advisory>, InvalidOutputFormat> {
    let mime = format.mime();
    if mime != Some(MIMETYPE_AUDIO_AAC) {
        return Err(InvalidOutputFormat::UnsupportedAudioCodec {
            mime: mime.map(str::to_string),
        });
    }
    Ok(None)
}
