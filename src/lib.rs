pub mod avc;
pub mod boxes;
pub mod checks;
pub mod esds;
pub mod format;
pub mod parser;
pub mod report;
pub mod tracks;
pub mod util;

pub use boxes::{BoxHeader, BoxRef, FourCC, NodeKind};
pub use checks::{
    Advisory, AdvisoryLevel, DefaultSinkChecks, InvalidOutputFormat, SinkChecks,
    ValidationOutcome, check_output_format,
};
pub use format::{FormatValue, MediaFormat, TrackType};
pub use parser::{parse_children, read_box_header};
pub use report::{FileReport, TrackReport, TrackStatus, check_tracks};
pub use tracks::{TrackFormat, read_track_formats, read_track_formats_from_path};
