//! binrw helper types used by the on-disk record definitions.

pub mod file_time;
pub mod pos_marker;
pub mod sized_wide_string;

pub mod prelude {
    pub use super::file_time::FileTime;
    pub use super::pos_marker::PosMarker;
    pub use super::sized_wide_string::SizedWideString;
}
