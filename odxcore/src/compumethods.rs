//! Conversion between internal (coded) values and physical values

mod compu_default_value;
mod compu_internal_to_phys;
mod compu_method;
mod compu_scale;
mod limit;

pub use compu_default_value::CompuDefaultValue;
pub use compu_internal_to_phys::CompuInternalToPhys;
pub use compu_method::{CompuCategory, CompuMethod};
pub use compu_scale::{CompuConst, CompuInverseValue, CompuRationalCoeffs, CompuScale};
pub use limit::{IntervalType, Limit};
