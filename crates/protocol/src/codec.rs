//! Typed reads and writes of the little-endian wire primitives.
//!
//! Four shapes cover the whole protocol: `int` (signed 32-bit), `long`
//! (signed 64-bit, sent in the short 32-bit form when the value fits in 31
//! bits), `size` (an `int` that must decode non-negative) and counted byte
//! buffers. Lines are newline-terminated and only appear outside the
//! binary phases.

use std::io::{Read, Write};

use crate::error::ProtocolError;

/// Marker value announcing the 64-bit form of a `long`.
const LONG_MARKER: i32 = -1;

/// Sanity bound on protocol lines; anything longer is a wire fault.
const MAX_LINE: usize = 4096;

/// Typed decoding over any [`Read`].
pub trait WireRead: Read {
    /// Reads a single byte.
    fn read_byte(&mut self) -> Result<u8, ProtocolError> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf).map_err(ProtocolError::from_read)?;
        Ok(buf[0])
    }

    /// Reads a little-endian signed 32-bit integer.
    fn read_int(&mut self) -> Result<i32, ProtocolError> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf).map_err(ProtocolError::from_read)?;
        Ok(i32::from_le_bytes(buf))
    }

    /// Reads a `long`: the 32-bit short form, or the marker followed by a
    /// little-endian 64-bit value.
    fn read_long(&mut self) -> Result<i64, ProtocolError> {
        let short = self.read_int()?;
        if short != LONG_MARKER {
            return Ok(i64::from(short));
        }
        let mut buf = [0u8; 8];
        self.read_exact(&mut buf).map_err(ProtocolError::from_read)?;
        Ok(i64::from_le_bytes(buf))
    }

    /// Reads a non-negative `int` as a length.
    fn read_size(&mut self) -> Result<usize, ProtocolError> {
        let value = self.read_int()?;
        if value < 0 {
            return Err(ProtocolError::NegativeSize(i64::from(value)));
        }
        Ok(value as usize)
    }

    /// Fills `buf` completely from the stream.
    fn read_buf(&mut self, buf: &mut [u8]) -> Result<(), ProtocolError> {
        self.read_exact(buf).map_err(ProtocolError::from_read)
    }

    /// Reads a newline-terminated line, newline stripped.
    fn read_line(&mut self) -> Result<String, ProtocolError> {
        let mut line = Vec::new();
        loop {
            let byte = self.read_byte()?;
            if byte == b'\n' {
                break;
            }
            if line.len() >= MAX_LINE {
                return Err(ProtocolError::LineTooLong(MAX_LINE));
            }
            line.push(byte);
        }
        Ok(String::from_utf8_lossy(&line).into_owned())
    }
}

impl<R: Read + ?Sized> WireRead for R {}

/// Typed encoding over any [`Write`].
pub trait WireWrite: Write {
    /// Writes a single byte.
    fn write_byte(&mut self, value: u8) -> Result<(), ProtocolError> {
        self.write_all(&[value])?;
        Ok(())
    }

    /// Writes a little-endian signed 32-bit integer.
    fn write_int(&mut self, value: i32) -> Result<(), ProtocolError> {
        self.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    /// Writes a `long`, using the short form for values that fit in 31 bits.
    fn write_long(&mut self, value: i64) -> Result<(), ProtocolError> {
        if (0..=i64::from(i32::MAX)).contains(&value) {
            return self.write_int(value as i32);
        }
        self.write_int(LONG_MARKER)?;
        self.write_all(&value.to_le_bytes())?;
        Ok(())
    }

    /// Writes a length as an `int`.
    fn write_size(&mut self, value: usize) -> Result<(), ProtocolError> {
        let value = i32::try_from(value)
            .map_err(|_| ProtocolError::NegativeSize(value as i64))?;
        self.write_int(value)
    }

    /// Writes a byte buffer verbatim.
    fn write_buf(&mut self, buf: &[u8]) -> Result<(), ProtocolError> {
        self.write_all(buf)?;
        Ok(())
    }

    /// Writes a line followed by a newline terminator.
    fn write_line(&mut self, line: &str) -> Result<(), ProtocolError> {
        self.write_all(line.as_bytes())?;
        self.write_all(b"\n")?;
        Ok(())
    }
}

impl<W: Write + ?Sized> WireWrite for W {}
