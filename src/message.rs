//! Key/value dictionaries exchanged with the phone.
//!
//! Wire format (all integers little-endian):
//!
//! ```text
//! count: u8
//! count x { key: u32, type: u8, length: u16, value: [u8; length] }
//! ```
//!
//! Integer values are 1, 2 or 4 bytes wide. C strings may carry a trailing NUL.

use crate::Error;

/// Keys understood by the watchface and its companion app.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum MessageKey {
    /// Inbound temperature in degrees (signed integer). Outbound, the same key
    /// carries the weather request.
    Temperature = 0,
    /// Reserved for a conditions string; not read by this watchface.
    Conditions = 1,
}

impl MessageKey {
    pub const fn key(self) -> u32 {
        self as u32
    }

    pub fn from_key(key: u32) -> Option<Self> {
        match key {
            0 => Some(Self::Temperature),
            1 => Some(Self::Conditions),
            _ => None,
        }
    }
}

/// Status reported by the message transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum AppMessageResult {
    Ok = 0,
    SendTimeout = 2,
    SendRejected = 4,
    NotConnected = 8,
    NotRunning = 16,
    InvalidArgs = 32,
    Busy = 64,
    BufferOverflow = 128,
    AlreadyReleased = 512,
    OutOfMemory = 4096,
    Closed = 8192,
    InternalError = 16384,
}

const TYPE_BYTE_ARRAY: u8 = 0;
const TYPE_CSTRING: u8 = 1;
const TYPE_UINT: u8 = 2;
const TYPE_INT: u8 = 3;

const HEADER_LEN: usize = 7;

/// Value carried by a tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TupleValue<'a> {
    Bytes(&'a [u8]),
    CString(&'a str),
    Uint(u32),
    Int(i32),
}

impl TupleValue<'_> {
    /// Integer value as `i32`, whatever width it was sent with.
    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            TupleValue::Int(v) => Some(v),
            TupleValue::Uint(v) => i32::try_from(v).ok(),
            _ => None,
        }
    }
}

/// A single key/value entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tuple<'a> {
    pub key: u32,
    pub value: TupleValue<'a>,
}

/// Iterates the tuples of an encoded dictionary.
///
/// A malformed tuple is yielded once as an error and ends the iteration.
pub struct DictionaryIter<'a> {
    data: &'a [u8],
    remaining: u8,
}

impl<'a> DictionaryIter<'a> {
    pub fn new(data: &'a [u8]) -> Result<Self, Error> {
        let (&count, data) = data.split_first().ok_or(Error::Malformed)?;
        Ok(Self {
            data,
            remaining: count,
        })
    }

    /// Number of tuples the header announces.
    pub fn len_hint(&self) -> usize {
        self.remaining as usize
    }

    fn read_tuple(&mut self) -> Result<Tuple<'a>, Error> {
        if self.data.len() < HEADER_LEN {
            return Err(Error::Malformed);
        }
        let key = u32::from_le_bytes([self.data[0], self.data[1], self.data[2], self.data[3]]);
        let ty = self.data[4];
        let len = u16::from_le_bytes([self.data[5], self.data[6]]) as usize;
        let rest = &self.data[HEADER_LEN..];
        if rest.len() < len {
            return Err(Error::Malformed);
        }
        let (raw, rest) = rest.split_at(len);

        let value = match ty {
            TYPE_BYTE_ARRAY => TupleValue::Bytes(raw),
            TYPE_CSTRING => {
                let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
                let s = core::str::from_utf8(&raw[..end]).map_err(|_| Error::Malformed)?;
                TupleValue::CString(s)
            }
            TYPE_UINT => TupleValue::Uint(match *raw {
                [a] => a as u32,
                [a, b] => u16::from_le_bytes([a, b]) as u32,
                [a, b, c, d] => u32::from_le_bytes([a, b, c, d]),
                _ => return Err(Error::Malformed),
            }),
            TYPE_INT => TupleValue::Int(match *raw {
                [a] => a as i8 as i32,
                [a, b] => i16::from_le_bytes([a, b]) as i32,
                [a, b, c, d] => i32::from_le_bytes([a, b, c, d]),
                _ => return Err(Error::Malformed),
            }),
            other => return Err(Error::UnsupportedValueType(other)),
        };

        self.data = rest;
        Ok(Tuple { key, value })
    }
}

impl<'a> Iterator for DictionaryIter<'a> {
    type Item = Result<Tuple<'a>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        match self.read_tuple() {
            Ok(tuple) => {
                self.remaining -= 1;
                Some(Ok(tuple))
            }
            Err(e) => {
                self.remaining = 0;
                Some(Err(e))
            }
        }
    }
}

/// Builds an encoded dictionary in a caller-provided buffer.
pub struct DictionaryWriter<'a> {
    buf: &'a mut [u8],
    len: usize,
    count: u8,
}

impl<'a> DictionaryWriter<'a> {
    pub fn new(buf: &'a mut [u8]) -> Result<Self, Error> {
        if buf.is_empty() {
            return Err(Error::BufferOverflow);
        }
        Ok(Self {
            buf,
            len: 1,
            count: 0,
        })
    }

    pub fn write_u8(&mut self, key: u32, value: u8) -> Result<(), Error> {
        self.write_tuple(key, TYPE_UINT, &[value])
    }

    pub fn write_u16(&mut self, key: u32, value: u16) -> Result<(), Error> {
        self.write_tuple(key, TYPE_UINT, &value.to_le_bytes())
    }

    pub fn write_u32(&mut self, key: u32, value: u32) -> Result<(), Error> {
        self.write_tuple(key, TYPE_UINT, &value.to_le_bytes())
    }

    pub fn write_i32(&mut self, key: u32, value: i32) -> Result<(), Error> {
        self.write_tuple(key, TYPE_INT, &value.to_le_bytes())
    }

    /// Write a string, NUL-terminated on the wire.
    pub fn write_cstring(&mut self, key: u32, value: &str) -> Result<(), Error> {
        let len = value.len() + 1;
        self.write_header(key, TYPE_CSTRING, len)?;
        let start = self.len + HEADER_LEN;
        self.buf[start..start + value.len()].copy_from_slice(value.as_bytes());
        self.buf[start + value.len()] = 0;
        self.commit(len);
        Ok(())
    }

    pub fn write_data(&mut self, key: u32, value: &[u8]) -> Result<(), Error> {
        self.write_tuple(key, TYPE_BYTE_ARRAY, value)
    }

    /// Number of tuples written so far.
    pub fn count(&self) -> u8 {
        self.count
    }

    /// Seal the dictionary and return its encoded bytes.
    pub fn finish(self) -> &'a [u8] {
        let Self { buf, len, count } = self;
        buf[0] = count;
        &buf[..len]
    }

    fn write_tuple(&mut self, key: u32, ty: u8, value: &[u8]) -> Result<(), Error> {
        self.write_header(key, ty, value.len())?;
        let start = self.len + HEADER_LEN;
        self.buf[start..start + value.len()].copy_from_slice(value);
        self.commit(value.len());
        Ok(())
    }

    /// Check room for a tuple with a `len`-byte value and write its header.
    fn write_header(&mut self, key: u32, ty: u8, len: usize) -> Result<(), Error> {
        let wire_len = u16::try_from(len).map_err(|_| Error::BufferOverflow)?;
        if self.count == u8::MAX || self.len + HEADER_LEN + len > self.buf.len() {
            return Err(Error::BufferOverflow);
        }
        let header = &mut self.buf[self.len..self.len + HEADER_LEN];
        header[..4].copy_from_slice(&key.to_le_bytes());
        header[4] = ty;
        header[5..].copy_from_slice(&wire_len.to_le_bytes());
        Ok(())
    }

    fn commit(&mut self, value_len: usize) {
        self.len += HEADER_LEN + value_len;
        self.count += 1;
    }
}

/// Encode the "please send weather" request: one `u8` tuple, key 0, value 0.
pub fn encode_weather_request(buf: &mut [u8]) -> Result<&[u8], Error> {
    let mut writer = DictionaryWriter::new(buf)?;
    writer.write_u8(MessageKey::Temperature.key(), 0)?;
    Ok(writer.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weather_request_bytes() {
        let mut buf = [0u8; 16];
        let encoded = encode_weather_request(&mut buf).unwrap();
        assert_eq!(encoded, &[1, 0, 0, 0, 0, TYPE_UINT, 1, 0, 0]);
    }

    #[test]
    fn weather_request_needs_room() {
        let mut buf = [0u8; 8];
        assert_eq!(
            encode_weather_request(&mut buf).err(),
            Some(Error::BufferOverflow)
        );
    }

    #[test]
    fn writer_rejects_empty_buffer() {
        let mut buf = [0u8; 0];
        assert!(DictionaryWriter::new(&mut buf).is_err());
    }

    #[test]
    fn decode_mixed_dictionary() {
        let mut buf = [0u8; 64];
        let mut writer = DictionaryWriter::new(&mut buf).unwrap();
        writer.write_i32(0, -5).unwrap();
        writer.write_cstring(1, "Rain").unwrap();
        writer.write_data(7, &[1, 2, 3]).unwrap();
        writer.write_u16(8, 700).unwrap();
        assert_eq!(writer.count(), 4);
        let encoded = writer.finish();

        let mut iter = DictionaryIter::new(encoded).unwrap();
        assert_eq!(iter.len_hint(), 4);
        assert_eq!(
            iter.next(),
            Some(Ok(Tuple { key: 0, value: TupleValue::Int(-5) }))
        );
        assert_eq!(
            iter.next(),
            Some(Ok(Tuple { key: 1, value: TupleValue::CString("Rain") }))
        );
        assert_eq!(
            iter.next(),
            Some(Ok(Tuple { key: 7, value: TupleValue::Bytes(&[1, 2, 3]) }))
        );
        assert_eq!(
            iter.next(),
            Some(Ok(Tuple { key: 8, value: TupleValue::Uint(700) }))
        );
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn narrow_signed_values_are_sign_extended() {
        let data = [1, 0, 0, 0, 0, TYPE_INT, 1, 0, 0xFB];
        let tuple = DictionaryIter::new(&data).unwrap().next().unwrap().unwrap();
        assert_eq!(tuple.value.as_i32(), Some(-5));

        let data = [1, 0, 0, 0, 0, TYPE_INT, 2, 0, 0x18, 0xFC];
        let tuple = DictionaryIter::new(&data).unwrap().next().unwrap().unwrap();
        assert_eq!(tuple.value.as_i32(), Some(-1000));
    }

    #[test]
    fn large_unsigned_is_not_an_i32() {
        assert_eq!(TupleValue::Uint(u32::MAX).as_i32(), None);
        assert_eq!(TupleValue::CString("12").as_i32(), None);
    }

    #[test]
    fn truncated_tuple_ends_iteration() {
        // Announces two tuples, second header is cut short.
        let data = [2, 0, 0, 0, 0, TYPE_INT, 1, 0, 0x05, 1, 0, 0];
        let mut iter = DictionaryIter::new(&data).unwrap();
        assert_eq!(
            iter.next(),
            Some(Ok(Tuple { key: 0, value: TupleValue::Int(5) }))
        );
        assert_eq!(iter.next(), Some(Err(Error::Malformed)));
        assert_eq!(iter.next(), None);
    }

    #[test]
    fn value_shorter_than_length_is_malformed() {
        let data = [1, 0, 0, 0, 0, TYPE_INT, 4, 0, 0x05];
        let mut iter = DictionaryIter::new(&data).unwrap();
        assert_eq!(iter.next(), Some(Err(Error::Malformed)));
    }

    #[test]
    fn odd_integer_width_is_malformed() {
        let data = [1, 0, 0, 0, 0, TYPE_UINT, 3, 0, 1, 2, 3];
        let mut iter = DictionaryIter::new(&data).unwrap();
        assert_eq!(iter.next(), Some(Err(Error::Malformed)));
    }

    #[test]
    fn unknown_type_tag() {
        let data = [1, 0, 0, 0, 0, 9, 0, 0];
        let mut iter = DictionaryIter::new(&data).unwrap();
        assert_eq!(iter.next(), Some(Err(Error::UnsupportedValueType(9))));
    }

    #[test]
    fn empty_input_has_no_header() {
        assert!(DictionaryIter::new(&[]).is_err());
        assert_eq!(DictionaryIter::new(&[0]).unwrap().next(), None);
    }

    #[test]
    fn message_keys() {
        assert_eq!(MessageKey::from_key(0), Some(MessageKey::Temperature));
        assert_eq!(MessageKey::from_key(1), Some(MessageKey::Conditions));
        assert_eq!(MessageKey::from_key(99), None);
    }
}
