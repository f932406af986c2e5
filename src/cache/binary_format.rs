use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::Result;

/// Utility trait for serializing snippet buffers
///
/// Like class files, snippet buffers are big-endian, and their lengths are usually `u16`.
pub trait Serialize: Sized {
    /// Serialize construct into a binary output stream
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()>;

    /// Deserialize construct from a binary input stream
    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self>;

    /// Number of bytes taken up by the serialized form
    const WIDTH: usize;
}

impl Serialize for u8 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u8(*self)
    }

    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self> {
        reader.read_u8()
    }

    const WIDTH: usize = 1;
}

impl Serialize for u16 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u16::<BigEndian>(*self)
    }

    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self> {
        reader.read_u16::<BigEndian>()
    }

    const WIDTH: usize = 2;
}

impl Serialize for u32 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_u32::<BigEndian>(*self)
    }

    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self> {
        reader.read_u32::<BigEndian>()
    }

    const WIDTH: usize = 4;
}

impl Serialize for i32 {
    fn serialize<W: WriteBytesExt>(&self, writer: &mut W) -> Result<()> {
        writer.write_i32::<BigEndian>(*self)
    }

    fn deserialize<R: ReadBytesExt>(reader: &mut R) -> Result<Self> {
        reader.read_i32::<BigEndian>()
    }

    const WIDTH: usize = 4;
}

#[cfg(test)]
mod test {
    use super::Serialize;
    use std::io::Cursor;

    #[test]
    fn big_endian() {
        let mut buffer = vec![];
        0x0102u16.serialize(&mut buffer).unwrap();
        (-2i32).serialize(&mut buffer).unwrap();
        assert_eq!(buffer, vec![0x01, 0x02, 0xff, 0xff, 0xff, 0xfe]);

        let mut reader = Cursor::new(&buffer);
        assert_eq!(u16::deserialize(&mut reader).unwrap(), 0x0102);
        assert_eq!(i32::deserialize(&mut reader).unwrap(), -2);
    }
}
