//! Growable binary buffer for tablet and record payloads.
//!
//! [`ByteBuffer`] backs the row encoding used by bulk-insert operations. It
//! supports mixed sequential reads and appends over a single backing store
//! with independent cursors: appends grow the store and move the write end,
//! reads advance a separate read cursor and never past the written length.
//!
//! All primitive encodings are fixed-width and big-endian, matching the
//! network byte order the server decodes. Strings are written as a 4-byte
//! length prefix (count of UTF-8 bytes) followed by the raw bytes.
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BufferError {
    #[error("buffer underflow: wanted {wanted} bytes, {remaining} remaining")]
    Underflow { wanted: usize, remaining: usize },

    #[error("negative string length prefix '{0}'")]
    InvalidLength(i32),

    #[error("unknown data type marker '{0}'")]
    Marker(u8),

    #[error("string bytes are not valid UTF-8")]
    Utf8,
}

/// Sequential binary reader/writer over one growable backing store.
///
/// The write cursor is the store length; `get_*` calls advance the read
/// cursor by exactly the width they decode and leave it untouched on
/// failure.
#[derive(Debug, Default, Clone)]
pub struct ByteBuffer {
    store: Vec<u8>,
    read_pos: usize,
}

impl ByteBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap a received payload for reading.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            store: bytes,
            read_pos: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn has_remaining(&self) -> bool {
        self.read_pos < self.store.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.store
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.store
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], BufferError> {
        let remaining = self.store.len() - self.read_pos;
        if N > remaining {
            return Err(BufferError::Underflow {
                wanted: N,
                remaining,
            });
        }

        let mut out = [0; N];
        out.copy_from_slice(&self.store[self.read_pos..self.read_pos + N]);
        self.read_pos += N;
        Ok(out)
    }

    pub fn get_byte(&mut self) -> Result<u8, BufferError> {
        Ok(self.take::<1>()?[0])
    }

    pub fn get_bool(&mut self) -> Result<bool, BufferError> {
        Ok(self.take::<1>()?[0] != 0)
    }

    pub fn get_i32(&mut self) -> Result<i32, BufferError> {
        Ok(i32::from_be_bytes(self.take()?))
    }

    pub fn get_i64(&mut self) -> Result<i64, BufferError> {
        Ok(i64::from_be_bytes(self.take()?))
    }

    pub fn get_f32(&mut self) -> Result<f32, BufferError> {
        Ok(f32::from_be_bytes(self.take()?))
    }

    pub fn get_f64(&mut self) -> Result<f64, BufferError> {
        Ok(f64::from_be_bytes(self.take()?))
    }

    /// Read a length-prefixed string, advancing the cursor by `4 + N`.
    ///
    /// The cursor does not move when the prefix or the body cannot be
    /// fully read.
    pub fn get_str(&mut self) -> Result<String, BufferError> {
        let start = self.read_pos;
        let prefix = self.get_i32()?;

        let length = match usize::try_from(prefix) {
            Ok(length) => length,
            Err(_) => {
                self.read_pos = start;
                return Err(BufferError::InvalidLength(prefix));
            }
        };

        let remaining = self.store.len() - self.read_pos;
        if length > remaining {
            self.read_pos = start;
            return Err(BufferError::Underflow {
                wanted: length,
                remaining,
            });
        }

        let bytes = self.store[self.read_pos..self.read_pos + length].to_vec();
        match String::from_utf8(bytes) {
            Ok(s) => {
                self.read_pos += length;
                Ok(s)
            }
            Err(_) => {
                self.read_pos = start;
                Err(BufferError::Utf8)
            }
        }
    }

    pub fn add_byte(&mut self, value: u8) {
        self.store.push(value);
    }

    pub fn add_bool(&mut self, value: bool) {
        self.store.push(value as u8);
    }

    pub fn add_i32(&mut self, value: i32) {
        self.store.extend_from_slice(&value.to_be_bytes());
    }

    pub fn add_i64(&mut self, value: i64) {
        self.store.extend_from_slice(&value.to_be_bytes());
    }

    pub fn add_f32(&mut self, value: f32) {
        self.store.extend_from_slice(&value.to_be_bytes());
    }

    pub fn add_f64(&mut self, value: f64) {
        self.store.extend_from_slice(&value.to_be_bytes());
    }

    pub fn add_str(&mut self, value: &str) {
        self.add_i32(value.len() as i32);
        self.store.extend_from_slice(value.as_bytes());
    }
}
