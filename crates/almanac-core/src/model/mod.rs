pub mod exposure;
pub mod fiber;
pub mod outcome;
pub(crate) mod serde_nan;
pub mod site;

pub use exposure::{ExposureRecord, ImageType, LampState, Pointing, RawExposure};
pub use fiber::{CrossMatchKey, FiberMap, FiberRow, FiberScheme};
pub use outcome::{CollectOutcome, UnitCollection};
pub use site::{Site, SiteSelector, Unit};
