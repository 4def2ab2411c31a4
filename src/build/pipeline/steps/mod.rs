//! Default pipeline steps.
//!
//! 1. **ResetDirectories** - Empty the output directory
//! 2. **DiscoverEntries** - Find every content document
//! 3. **ScanComponents** - Build the component registry
//! 4. **CompileContent** - Transform and compile documents, map entries to modules
//! 5. **GenerateStyles** - Write the hashed site stylesheet
//! 6. **CopyStatic** - Copy the public directory
//! 7. **Prerender** - Render page HTML ahead of time
//! 8. **WriteShells** - Write one HTML shell per entry
//! 9. **InjectHead** - Add page metadata to each shell's head

mod compile;
mod components;
mod copy_static;
mod discover;
mod head;
mod prerender;
mod reset;
mod shells;
mod styles;

pub use compile::CompileContent;
pub use components::ScanComponents;
pub use copy_static::CopyStatic;
pub use discover::DiscoverEntries;
pub use head::InjectHead;
pub use prerender::Prerender;
pub use reset::ResetDirectories;
pub use shells::WriteShells;
pub use styles::GenerateStyles;
