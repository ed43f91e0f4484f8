//! Size-terminated UTF-16LE strings.
//!
//! Dentry long and short names are stored as counted UTF-16 strings: the
//! record header carries the name length in bytes (excluding the trailing
//! NUL the on-disk format appends). Based on binrw::strings::NullWideString,
//! but terminated by a provided size rather than a null char.

use binrw::io::Write;
use binrw::{Endian, prelude::*};
use core::fmt::{self, Write as _};
use std::{io::prelude::*, string::FromUtf16Error};

#[derive(Clone, Eq, PartialEq, Default, Hash, PartialOrd, Ord)]
pub struct SizedWideString {
    /// The raw wide byte string.
    data: Vec<u16>,
}

impl SizedWideString {
    const CHAR_WIDTH: u64 = std::mem::size_of::<u16>() as u64;

    /// Size of the string's data, in bytes (no NUL terminator).
    pub fn size(&self) -> u64 {
        self.data.len() as u64 * Self::CHAR_WIDTH
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_units(&self) -> &[u16] {
        &self.data
    }
}

impl BinRead for SizedWideString {
    type Args<'a> = (u64,);

    fn read_options<R: Read + Seek>(
        reader: &mut R,
        endian: Endian,
        size_bytes: Self::Args<'_>,
    ) -> BinResult<Self> {
        // Size is in bytes, but we need to read in chars.
        if size_bytes.0 % Self::CHAR_WIDTH != 0 {
            return Err(binrw::Error::AssertFail {
                pos: reader.stream_position()?,
                message: "Wide string size must be a multiple of 2".to_string(),
            });
        }
        let size_chars = size_bytes.0 / Self::CHAR_WIDTH;

        let mut values = Vec::with_capacity(size_chars as usize);
        for _ in 0..size_chars {
            let val = u16::read_options(reader, endian, ())?;
            values.push(val);
        }
        Ok(Self { data: values })
    }
}

impl BinWrite for SizedWideString {
    type Args<'a> = ();

    fn write_options<W: Write + Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        args: Self::Args<'_>,
    ) -> BinResult<()> {
        self.data.write_options(writer, endian, args)?;
        Ok(())
    }
}

impl From<&str> for SizedWideString {
    fn from(s: &str) -> Self {
        Self {
            data: s.encode_utf16().collect(),
        }
    }
}

impl From<String> for SizedWideString {
    fn from(s: String) -> Self {
        Self {
            data: s.encode_utf16().collect(),
        }
    }
}

impl From<Vec<u16>> for SizedWideString {
    fn from(data: Vec<u16>) -> Self {
        Self { data }
    }
}

impl FromIterator<u16> for SizedWideString {
    fn from_iter<T: IntoIterator<Item = u16>>(iter: T) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}

impl TryFrom<&SizedWideString> for String {
    type Error = FromUtf16Error;

    fn try_from(value: &SizedWideString) -> Result<Self, Self::Error> {
        String::from_utf16(&value.data)
    }
}

impl PartialEq<&str> for SizedWideString {
    fn eq(&self, other: &&str) -> bool {
        other.encode_utf16().eq(self.data.iter().copied())
    }
}

impl fmt::Display for SizedWideString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        display_utf16(&self.data, f, core::iter::once)
    }
}

impl fmt::Debug for SizedWideString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SizedWideString(\"")?;
        display_utf16(&self.data, f, char::escape_debug)?;
        write!(f, "\")")
    }
}

#[inline]
fn display_utf16<Transformer: Fn(char) -> O, O: Iterator<Item = char>>(
    input: &[u16],
    f: &mut fmt::Formatter<'_>,
    t: Transformer,
) -> fmt::Result {
    char::decode_utf16(input.iter().copied())
        .flat_map(|r| t(r.unwrap_or(char::REPLACEMENT_CHARACTER)))
        .try_for_each(|c| f.write_char(c))
}

#[cfg(test)]
mod tests {
    use super::*;
    use binrw::io::Cursor;

    #[test]
    fn test_wide_string_eq() {
        let a = SizedWideString::from("kernel32.dll");
        assert_eq!(a, "kernel32.dll");
        assert_ne!(a, "kernel32.dl");
        assert_ne!(a, "kernel32.dll\0");
        assert_eq!(a.size(), 24);
    }

    #[test]
    fn test_wide_string_read_sized() {
        let bytes: &[u8] = &[b'a', 0, b'b', 0, b'c', 0, b'd', 0];
        let mut reader = Cursor::new(bytes);
        let s = SizedWideString::read_le_args(&mut reader, (6,)).unwrap();
        assert_eq!(s, "abc");
        // The remaining unit is left for the caller.
        assert_eq!(reader.position(), 6);
    }

    #[test]
    fn test_wide_string_read_odd_size_fails() {
        let bytes: &[u8] = &[b'a', 0, b'b'];
        let mut reader = Cursor::new(bytes);
        assert!(SizedWideString::read_le_args(&mut reader, (3,)).is_err());
    }
}
