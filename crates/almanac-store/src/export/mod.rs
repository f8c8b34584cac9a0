//! Flat-file export of catalog contents

pub mod atomic;
pub mod dump;

pub use atomic::atomic_write;
pub use dump::{export_exposures, export_fibers, ExportReport};
