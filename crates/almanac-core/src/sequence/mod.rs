//! Sequence detection
//!
//! Groups a unit's exposures into contiguous observing blocks.

mod detector;

pub use detector::{
    detect_sequences, BoundaryRule, Detection, DetectorPolicy, GapEvent, GapKind, Sequence,
};
