//! String strategies - text, byte strings and characters
//!
//! Every strategy here copies exactly the bytes it is given; embedded NULs
//! survive. Only NUL-terminated inputs infer their length by scanning.

use core::ffi::{c_char, CStr};
use std::borrow::Cow;
use std::ffi::CString;

use super::Push;
use crate::runtime::State;

/// Owned byte string that is not required to be UTF-8
///
/// `Vec<u8>` pushes as a table of integers; wrap it in `Bytes` to push a
/// string instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    #[inline]
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Bytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

/// Push the first `len` bytes of `bytes` (clamped to its length)
#[inline]
pub fn push_sized(state: &mut State, bytes: &[u8], len: usize) -> i32 {
    state.push_bytes(&bytes[..len.min(bytes.len())]);
    1
}

/// Push a NUL-terminated C string; null pushes nil
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated buffer valid for reads.
/// The string ends at the first NUL, so data with embedded NULs is cut short.
pub unsafe fn push_cstr_ptr(state: &mut State, ptr: *const c_char) -> i32 {
    if ptr.is_null() {
        state.push_nil();
        return 1;
    }
    state.push_bytes(CStr::from_ptr(ptr).to_bytes());
    1
}

impl Push for &str {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        state.push_bytes(self.as_bytes());
        1
    }
}

impl Push for &&str {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        (*self).push(state)
    }
}

impl Push for String {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        self.as_str().push(state)
    }
}

impl Push for &String {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        self.as_str().push(state)
    }
}

impl Push for Cow<'_, str> {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        let text: &str = &self;
        text.push(state)
    }
}

impl Push for Cow<'_, [u8]> {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        state.push_bytes(&self);
        1
    }
}

impl Push for &[u8] {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        state.push_bytes(self);
        1
    }
}

/// Fixed-size character array; one trailing NUL terminator is dropped
impl<const N: usize> Push for &[u8; N] {
    fn push(self, state: &mut State) -> i32 {
        let bytes = match self.split_last() {
            Some((0, rest)) => rest,
            _ => &self[..],
        };
        state.push_bytes(bytes);
        1
    }
}

impl Push for &CStr {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        state.push_bytes(self.to_bytes());
        1
    }
}

impl Push for CString {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        self.as_c_str().push(state)
    }
}

impl Push for &CString {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        self.as_c_str().push(state)
    }
}

/// One-character string
impl Push for char {
    fn push(self, state: &mut State) -> i32 {
        let mut buf = [0u8; 4];
        state.push_bytes(self.encode_utf8(&mut buf).as_bytes());
        1
    }
}

impl Push for &char {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        (*self).push(state)
    }
}

impl Push for Bytes {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        state.push_bytes(&self.0);
        1
    }
}

impl Push for &Bytes {
    #[inline]
    fn push(self, state: &mut State) -> i32 {
        state.push_bytes(&self.0);
        1
    }
}
