pub mod manifest;
pub mod package;
pub mod styles;
pub mod xml;

pub use manifest::{ResourceEntry, ResourceIndex};
pub use package::{HwpxPackage, PartData, PartMap};
pub use styles::{CharStyle, ParaStyle, ScriptOffset, StyleTable};
