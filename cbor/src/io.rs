/*!
Byte sinks for encoded output, and the bounds-checked cursor the decoder
reads through.
*/

use super::error::{EncodeError, ErrorKind};

/// Somewhere to put a complete encoding.
///
/// `write_all` is called once per encode with the whole encoded item, so a
/// fixed-capacity sink can refuse an encoding it cannot hold without writing
/// any of it.
pub trait Sink {
    fn write_all(&mut self, data: &[u8]) -> Result<(), EncodeError>;
}

impl Sink for Vec<u8> {
    fn write_all(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        self.extend_from_slice(data);
        Ok(())
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn write_all(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        (**self).write_all(data)
    }
}

/// A fixed-capacity output buffer.
pub struct SliceSink<'a> {
    buffer: &'a mut [u8],
    written: usize,
}

impl<'a> SliceSink<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, written: 0 }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.written
    }

    pub fn as_written(&self) -> &[u8] {
        &self.buffer[..self.written]
    }
}

impl Sink for SliceSink<'_> {
    fn write_all(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        if data.len() > self.remaining() {
            return Err(EncodeError::BufferTooSmall {
                needed: data.len(),
                available: self.remaining(),
            });
        }
        self.buffer[self.written..self.written + data.len()].copy_from_slice(data);
        self.written += data.len();
        Ok(())
    }
}

/// Adapts any `embedded_io::Write` into a sink.
pub struct IoSink<W>(pub W);

impl<W> IoSink<W> {
    pub fn into_inner(self) -> W {
        self.0
    }
}

impl<W: embedded_io::Write> Sink for IoSink<W> {
    fn write_all(&mut self, data: &[u8]) -> Result<(), EncodeError> {
        use embedded_io::Error as _;

        self.0
            .write_all(data)
            .and_then(|_| self.0.flush())
            .map_err(|e| EncodeError::Io(format!("{:?}", e.kind())))
    }
}

/// Read position into an immutable byte slice.
///
/// Every read checks the remaining length first; the position never moves
/// past the end of the slice.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn peek(&self) -> Option<u8> {
        self.data.get(self.offset).copied()
    }

    pub fn read_u8(&mut self) -> Result<u8, ErrorKind> {
        let b = self.peek().ok_or(ErrorKind::TruncatedInput)?;
        self.offset += 1;
        Ok(b)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], ErrorKind> {
        let bytes = self.read_slice(N as u64)?;
        let mut r = [0u8; N];
        r.copy_from_slice(bytes);
        Ok(r)
    }

    pub fn read_slice(&mut self, len: u64) -> Result<&'a [u8], ErrorKind> {
        if len > self.remaining() as u64 {
            return Err(ErrorKind::TruncatedInput);
        }
        let start = self.offset;
        self.offset += len as usize;
        Ok(&self.data[start..self.offset])
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cursor_bounds() {
        let mut c = Cursor::new(&[1, 2, 3]);
        assert_eq!(c.read_u8(), Ok(1));
        assert_eq!(c.read_array::<2>(), Ok([2, 3]));
        assert_eq!(c.read_u8(), Err(ErrorKind::TruncatedInput));
        assert_eq!(c.offset(), 3);

        let mut c = Cursor::new(&[1, 2, 3]);
        assert_eq!(c.read_slice(4), Err(ErrorKind::TruncatedInput));
        assert_eq!(c.read_slice(u64::MAX), Err(ErrorKind::TruncatedInput));
        assert_eq!(c.offset(), 0);
    }

    #[test]
    fn slice_sink_refuses_partial_writes() {
        let mut buf = [0u8; 4];
        let mut sink = SliceSink::new(&mut buf);
        sink.write_all(&[1, 2, 3]).unwrap();
        assert_eq!(
            sink.write_all(&[4, 5]),
            Err(EncodeError::BufferTooSmall {
                needed: 2,
                available: 1
            })
        );
        assert_eq!(sink.as_written(), &[1, 2, 3]);
        sink.write_all(&[4]).unwrap();
        assert_eq!(sink.remaining(), 0);
    }

    #[test]
    fn io_sink() {
        let mut buf = [0u8; 2];
        let mut sink = IoSink(&mut buf[..]);
        sink.write_all(&[0xa0]).unwrap();
        assert!(sink.write_all(&[1, 2, 3]).is_err());
    }
}
