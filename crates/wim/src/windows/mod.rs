//! Windows-specific metadata harvesting.
//!
//! After an image's tree is loaded, the engine can inspect well-known
//! files inside it (the PE header of `kernel32.dll`, the SOFTWARE and
//! SYSTEM registry hives) to populate the Windows-oriented properties of
//! the image XML document.

pub mod harvest;
pub mod languages;
pub mod pe;

pub use harvest::set_windows_specific_info;
