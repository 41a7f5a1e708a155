//! Shared OpenType layout structures
//!
//! Coverage and class definition tables, value records, anchors, lookup
//! flags and the script/feature lists common to GPOS and GSUB.

mod class_def;
mod coverage;
mod features;
mod value;

pub use class_def::{ClassDef, ClassRange};
pub use coverage::{Coverage, RangeRecord};
pub use features::{FeatureList, FeatureRecord, LangSys, Script, ScriptList};
pub use value::{Anchor, LookupFlags, ValueFormat, ValueRecord};
