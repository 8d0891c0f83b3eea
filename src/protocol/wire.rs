//! Binary value codec for scene mutation payloads
//!
//! All values are little-endian and fixed-layout. Variable-length payloads
//! (strings, vector arrays, index arrays) carry a 4-byte count prefix.
//! Strings are length-prefixed UTF-8; a decoded path is never recovered by
//! delimiter scanning, so `/` inside legitimate content stays unambiguous.
//!
//! Decoding is bounds-checked: a short or malformed buffer yields a typed
//! error instead of a panic, leaving the caller free to drop the single
//! offending message.

use super::{Error, Result};

/// 3-component vector (12 bytes on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec3 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
}

impl Vec3 {
    /// Create a vector from components
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Vector of all ones
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);
    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
}

/// 2-component vector (8 bytes on the wire)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Vec2 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
}

impl Vec2 {
    /// Create a vector from components
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Rotation quaternion (16 bytes on the wire, x/y/z/w order)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Quat {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
    /// Z component
    pub z: f32,
    /// W component
    pub w: f32,
}

impl Quat {
    /// Create a quaternion from components
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Identity rotation
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Payload writer
///
/// Building a payload is the ordered concatenation of independently encoded
/// segments; no padding or alignment is introduced between them.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    /// Create an empty writer
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a writer with a capacity hint
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Finish and take the payload bytes
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    /// Write a 4-byte unsigned count
    pub fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a 4-byte signed integer
    pub fn put_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write an IEEE-754 single
    pub fn put_f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a length-prefixed UTF-8 string
    pub fn put_string(&mut self, value: &str) {
        self.put_u32(value.len() as u32);
        self.buf.extend_from_slice(value.as_bytes());
    }

    /// Write a vec3 (no prefix)
    pub fn put_vec3(&mut self, value: Vec3) {
        self.put_f32(value.x);
        self.put_f32(value.y);
        self.put_f32(value.z);
    }

    /// Write a vec2 (no prefix)
    pub fn put_vec2(&mut self, value: Vec2) {
        self.put_f32(value.x);
        self.put_f32(value.y);
    }

    /// Write a quaternion (no prefix)
    pub fn put_quat(&mut self, value: Quat) {
        self.put_f32(value.x);
        self.put_f32(value.y);
        self.put_f32(value.z);
        self.put_f32(value.w);
    }

    /// Write a count-prefixed vec3 array
    pub fn put_vec3_array(&mut self, values: &[Vec3]) {
        self.put_u32(values.len() as u32);
        for v in values {
            self.put_vec3(*v);
        }
    }

    /// Write a count-prefixed vec2 array
    pub fn put_vec2_array(&mut self, values: &[Vec2]) {
        self.put_u32(values.len() as u32);
        for v in values {
            self.put_vec2(*v);
        }
    }

    /// Write a count-prefixed i32 array
    pub fn put_i32_array(&mut self, values: &[i32]) {
        self.put_u32(values.len() as u32);
        for v in values {
            self.put_i32(*v);
        }
    }

    /// Write a count-prefixed array of length-prefixed strings
    pub fn put_string_array(&mut self, values: &[String]) {
        self.put_u32(values.len() as u32);
        for v in values {
            self.put_string(v);
        }
    }
}

/// Bounds-checked payload reader
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    /// Create a reader over a payload
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes not yet consumed
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Fail if any bytes are left unconsumed
    pub fn expect_end(&self) -> Result<()> {
        if self.remaining() != 0 {
            return Err(Error::TrailingBytes {
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(Error::BufferTooSmall {
                needed: len,
                got: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    /// Read a 4-byte unsigned count
    pub fn get_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    /// Read a 4-byte signed integer
    pub fn get_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    /// Read an IEEE-754 single
    pub fn get_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.take(4)?.try_into().unwrap()))
    }

    /// Read a length-prefixed UTF-8 string
    pub fn get_string(&mut self) -> Result<String> {
        let len = self.get_u32()? as usize;
        let bytes = self.take(len)?;
        Ok(String::from_utf8(bytes.to_vec())?)
    }

    /// Read a vec3
    pub fn get_vec3(&mut self) -> Result<Vec3> {
        Ok(Vec3::new(self.get_f32()?, self.get_f32()?, self.get_f32()?))
    }

    /// Read a vec2
    pub fn get_vec2(&mut self) -> Result<Vec2> {
        Ok(Vec2::new(self.get_f32()?, self.get_f32()?))
    }

    /// Read a quaternion
    pub fn get_quat(&mut self) -> Result<Quat> {
        Ok(Quat::new(
            self.get_f32()?,
            self.get_f32()?,
            self.get_f32()?,
            self.get_f32()?,
        ))
    }

    /// Read a count-prefixed vec3 array
    pub fn get_vec3_array(&mut self) -> Result<Vec<Vec3>> {
        let count = self.checked_count(12)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.get_vec3()?);
        }
        Ok(values)
    }

    /// Read a count-prefixed vec2 array
    pub fn get_vec2_array(&mut self) -> Result<Vec<Vec2>> {
        let count = self.checked_count(8)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.get_vec2()?);
        }
        Ok(values)
    }

    /// Read a count-prefixed i32 array
    pub fn get_i32_array(&mut self) -> Result<Vec<i32>> {
        let count = self.checked_count(4)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.get_i32()?);
        }
        Ok(values)
    }

    /// Read a count-prefixed array of length-prefixed strings
    pub fn get_string_array(&mut self) -> Result<Vec<String>> {
        let count = self.checked_count(4)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.get_string()?);
        }
        Ok(values)
    }

    /// Read an array count and verify the declared elements can fit in the
    /// remaining bytes, so a hostile count cannot trigger a huge allocation.
    fn checked_count(&mut self, min_element_size: usize) -> Result<usize> {
        let count = self.get_u32()? as usize;
        let needed = count.saturating_mul(min_element_size);
        if needed > self.remaining() {
            return Err(Error::BufferTooSmall {
                needed,
                got: self.remaining(),
            });
        }
        Ok(count)
    }
}
