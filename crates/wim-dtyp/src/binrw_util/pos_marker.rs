//! Write-position marker for back-patching length fields.
//!
//! Dentry records carry their total length in the first field, but the
//! length is only known once the variable tail (names, padding, tagged
//! items) has been written. A `PosMarker` is written as a placeholder and
//! patched afterwards.
//!
//! Source: <https://github.com/jam1garner/binrw/discussions/229>

use binrw::{BinRead, BinResult, BinWrite, Endian};
use std::cell::OnceCell;
use std::{fmt::Debug, io::SeekFrom};

#[derive(Default, PartialEq, Eq)]
pub struct PosMarker<T> {
    pub pos: OnceCell<u64>,
    pub value: T,
}

impl<T> PosMarker<T> {
    pub fn new(value: T) -> Self {
        Self {
            pos: OnceCell::new(),
            value,
        }
    }

    fn get_pos(&self) -> BinResult<u64> {
        let value = self.pos.get().ok_or(binrw::error::Error::Custom {
            pos: 0,
            err: Box::new("PosMarker has not been written to yet"),
        })?;
        Ok(*value)
    }
}

impl<T> BinRead for PosMarker<T>
where
    T: BinRead,
{
    type Args<'a> = T::Args<'a>;

    fn read_options<R: binrw::io::Read + binrw::io::Seek>(
        reader: &mut R,
        endian: Endian,
        args: Self::Args<'_>,
    ) -> BinResult<Self> {
        let pos = reader.stream_position()?;
        T::read_options(reader, endian, args).map(|value| Self {
            pos: OnceCell::from(pos),
            value,
        })
    }
}

impl<T> BinWrite for PosMarker<T>
where
    T: BinWrite<Args<'static> = ()> + Default,
{
    type Args<'a> = ();

    fn write_options<W: binrw::io::Write + binrw::io::Seek>(
        &self,
        writer: &mut W,
        endian: Endian,
        args: Self::Args<'_>,
    ) -> BinResult<()> {
        self.pos
            .set(writer.stream_position()?)
            .map_err(|_| binrw::error::Error::Custom {
                pos: writer.stream_position().unwrap_or_default(),
                err: Box::new("PosMarker has already been written to"),
            })?;
        T::default().write_options(writer, endian, args)
    }
}

impl<T> PosMarker<T>
where
    T: BinWrite<Args<'static> = ()> + TryFrom<u64>,
    T::Error: binrw::error::CustomError + 'static,
{
    /// Seek back to the marker, write `value` over the placeholder and
    /// return to the end of the stream.
    pub fn write_back<V, W>(&self, value: V, writer: &mut W, endian: Endian) -> BinResult<()>
    where
        V: TryInto<T>,
        W: binrw::io::Write + binrw::io::Seek,
    {
        let return_to = writer.stream_position()?;
        writer.seek(SeekFrom::Start(self.get_pos()?))?;
        value
            .try_into()
            .map_err(|_| binrw::error::Error::Custom {
                pos: self.get_pos().unwrap_or_default(),
                err: Box::new("Error converting value for PosMarker write-back"),
            })?
            .write_options(writer, endian, ())?;
        writer.seek(SeekFrom::Start(return_to))?;
        Ok(())
    }

    /// Patch the marker with the number of bytes written between the marker
    /// position and the current stream position.
    pub fn write_size<W>(&self, writer: &mut W, endian: Endian) -> BinResult<u64>
    where
        W: binrw::io::Write + binrw::io::Seek,
    {
        let total = writer.stream_position()? - self.get_pos()?;
        self.write_back(total, writer, endian)?;
        Ok(total)
    }
}

impl<T> Debug for PosMarker<T>
where
    T: Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PosMarker")
            .field("pos", &self.pos)
            .field("value", &self.value)
            .finish()
    }
}
