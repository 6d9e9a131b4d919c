use mp4sink::avc::{CsdError, PROFILE_IDC_BASELINE, PROFILE_IDC_HIGH, PROFILE_IDC_MAIN};
use mp4sink::format::{KEY_CSD_0, KEY_MIME, MIMETYPE_AUDIO_AAC, MIMETYPE_VIDEO_AVC};
use mp4sink::{
    AdvisoryLevel, DefaultSinkChecks, InvalidOutputFormat, MediaFormat, SinkChecks, TrackType,
    ValidationOutcome, check_output_format,
};

fn avc_format(profile_idc: u8) -> MediaFormat {
    let mut f = MediaFormat::video(MIMETYPE_VIDEO_AVC, 640, 360);
    f.set_bytes(KEY_CSD_0, vec![0, 0, 0, 1, 0x67, profile_idc, 0xC0, 0x1E, 0xD9, 0x00]);
    f
}

fn with_mime(mime: &str) -> MediaFormat {
    let mut f = MediaFormat::new();
    f.set_string(KEY_MIME, mime);
    f
}

#[test]
fn baseline_avc_is_accepted_with_info() {
    let outcome = check_output_format(TrackType::Video, &avc_format(PROFILE_IDC_BASELINE));
    assert!(outcome.is_accepted());
    let advisory = outcome.advisory().expect("advisory");
    assert_eq!(advisory.level, AdvisoryLevel::Info);
    assert_eq!(advisory.message, "Output H.264 profile: Baseline");
}

#[test]
fn main_profile_avc_is_accepted_with_warning() {
    let outcome = check_output_format(TrackType::Video, &avc_format(PROFILE_IDC_MAIN));
    assert!(outcome.is_accepted());
    let advisory = outcome.advisory().expect("advisory");
    assert_eq!(advisory.level, AdvisoryLevel::Warn);
    assert!(advisory.message.contains("might not be supported"));
    assert_eq!(advisory.message, "Output H.264 profile: Main. This might not be supported.");
}

#[test]
fn any_profile_idc_is_accepted() {
    for idc in 0..=u8::MAX {
        let outcome = check_output_format(TrackType::Video, &avc_format(idc));
        assert!(outcome.is_accepted(), "profile_idc {idc} rejected");
    }
}

#[test]
fn hevc_video_is_rejected() {
    let outcome = check_output_format(TrackType::Video, &with_mime("video/hevc"));
    let err = outcome.into_result().unwrap_err();
    assert_eq!(
        err.to_string(),
        "Video codecs other than AVC is not supported, actual mime type: video/hevc"
    );
    assert!(matches!(err, InvalidOutputFormat::UnsupportedVideoCodec { .. }));
}

#[test]
fn rejection_message_carries_exact_mime() {
    for mime in ["video/x-vnd.on2.vp9", "video/av01", "VIDEO/AVC", "audio/mp4a-latm"] {
        let err = check_output_format(TrackType::Video, &with_mime(mime))
            .into_result()
            .unwrap_err();
        assert!(err.to_string().ends_with(&format!("actual mime type: {mime}")));
    }
}

#[test]
fn aac_audio_is_accepted_without_message() {
    let f = MediaFormat::audio(MIMETYPE_AUDIO_AAC, 44_100, 2);
    assert_eq!(check_output_format(TrackType::Audio, &f), ValidationOutcome::Accepted(None));
}

#[test]
fn vorbis_audio_is_rejected() {
    let err = check_output_format(TrackType::Audio, &with_mime("audio/vorbis"))
        .into_result()
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Audio codecs other than AAC is not supported, actual mime type: audio/vorbis"
    );
    assert!(matches!(err, InvalidOutputFormat::UnsupportedAudioCodec { .. }));
}

#[test]
fn avc_mime_on_audio_track_is_rejected() {
    let outcome = check_output_format(TrackType::Audio, &avc_format(PROFILE_IDC_BASELINE));
    assert!(!outcome.is_accepted());
}

#[test]
fn missing_mime_is_rejected() {
    let err = check_output_format(TrackType::Audio, &MediaFormat::new())
        .into_result()
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Audio codecs other than AAC is not supported, actual mime type: null"
    );
}

#[test]
fn avc_without_sps_is_rejected() {
    let f = MediaFormat::video(MIMETYPE_VIDEO_AVC, 640, 360);
    assert_eq!(
        check_output_format(TrackType::Video, &f),
        ValidationOutcome::Rejected(InvalidOutputFormat::InvalidCodecConfig(CsdError::MissingCsd))
    );

    let mut pps_first = MediaFormat::video(MIMETYPE_VIDEO_AVC, 640, 360);
    pps_first.set_bytes(KEY_CSD_0, vec![0, 0, 0, 1, 0x68, 0xCE, 0x3C, 0x80]);
    assert_eq!(
        check_output_format(TrackType::Video, &pps_first),
        ValidationOutcome::Rejected(InvalidOutputFormat::InvalidCodecConfig(CsdError::NotSps(8)))
    );
}

#[test]
fn checks_are_idempotent() {
    let formats = [
        (TrackType::Video, avc_format(PROFILE_IDC_HIGH)),
        (TrackType::Video, with_mime("video/hevc")),
        (TrackType::Audio, with_mime("audio/opus")),
    ];
    for (track, format) in &formats {
        assert_eq!(check_output_format(*track, format), check_output_format(*track, format));
    }
}

#[test]
fn default_checks_match_free_function() {
    let checks: &dyn SinkChecks = &DefaultSinkChecks;
    let f = avc_format(PROFILE_IDC_MAIN);
    assert_eq!(
        checks.check_output_format(TrackType::Video, &f),
        check_output_format(TrackType::Video, &f)
    );
}

#[test]
fn rejection_propagates_with_question_mark() {
    fn finalize(format: &MediaFormat) -> Result<(), InvalidOutputFormat> {
        check_output_format(TrackType::Audio, format).into_result()?;
        Ok(())
    }
    assert!(finalize(&with_mime(MIMETYPE_AUDIO_AAC)).is_ok());
    assert!(finalize(&with_mime("audio/flac")).is_err());
}
