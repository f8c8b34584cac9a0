pub mod quality;
pub mod validation;

pub use quality::{BadExposureList, BadExposureNote};
pub use validation::{FieldIssue, FieldOutcome, RecordValidator, ValidationOutcome};
