mod builder;
mod bundle;
mod diagnostics;
mod document;
mod html;
mod output_map;
mod parse;
mod paths;
pub mod pipeline;
mod registry;
mod render;
mod source;
mod transform;
mod tree;

pub use builder::{BuildError, BuildOverrides, BuildResult, Builder};
