use crate::avc::{self, SpsHeader};
use crate::checks::{AdvisoryLevel, SinkChecks, ValidationOutcome};
use crate::format::{MIMETYPE_VIDEO_AVC, TrackType};
use crate::tracks::TrackFormat;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackStatus {
    Accepted,
    Rejected,
    /// Neither video nor audio; not subject to output checks.
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvcProfile {
    pub profile_idc: u8,
    pub profile: String,
    pub level: String,
    pub constrained_baseline: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct TrackReport {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_id: Option<u32>,
    pub handler_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_type: Option<TrackType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    pub status: TrackStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<AdvisoryLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avc: Option<AvcProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sps: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: String,
    pub tracks: Vec<TrackReport>,
}

impl FileReport {
    /// False when any track was rejected.
    pub fn is_playable(&self) -> bool {
        self.tracks.iter().all(|t| t.status != TrackStatus::Rejected)
    }
}

pub fn check_tracks<C: SinkChecks + ?Sized>(
    file: impl Into<String>,
    tracks: &[TrackFormat],
    checks: &C,
) -> FileReport {
    FileReport {
        file: file.into(),
        tracks: tracks.iter().map(|t| check_track(t, checks)).collect(),
    }
}

fn check_track<C: SinkChecks + ?Sized>(track: &TrackFormat, checks: &C) -> TrackReport {
    let mut report = TrackReport {
        index: track.index,
        track_id: track.track_id,
        handler_type: track.handler_type.clone(),
        track_type: track.track_type,
        mime: track.format.mime().map(str::to_string),
        status: TrackStatus::Skipped,
        level: None,
        message: None,
        avc: None,
        sps: None,
    };

    let Some(track_type) = track.track_type else {
        return report;
    };

    if report.mime.as_deref() == Some(MIMETYPE_VIDEO_AVC)
        && let Ok(sps) = avc::sps_buffer(&track.format)
    {
        report.sps = Some(hex::encode(sps));
        if let Ok(h) = SpsHeader::parse(sps) {
            report.avc = Some(AvcProfile {
                profile_idc: h.profile_idc,
                profile: avc::profile_name(h.profile_idc),
                level: h.level_name(),
                constrained_baseline: h.is_constrained_baseline(),
            });
        }
    }

    match checks.check_output_format(track_type, &track.format) {
        ValidationOutcome::Accepted(advisory) => {
            report.status = TrackStatus::Accepted;
            if let Some(a) = advisory {
                report.level = Some(a.level);
                report.message = Some(a.message);
            }
        }
        ValidationOutcome::Rejected(err) => {
            report.status = TrackStatus::Rejected;
            report.message = Some(err.to_string());
        }
    }
    report
}
