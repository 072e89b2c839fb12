//! Conversion between typed vectors and the raw blobs sqlite-vec consumes.
//!
//! Float vectors are stored as packed IEEE-754 values in host byte order with
//! no header. Nothing here normalizes endianness, so buffers are only
//! portable between hosts of the same byte order.

use crate::types::{Result, VecError};

pub const F32_SIZE: usize = std::mem::size_of::<f32>();

/// Borrow a float vector as its raw bytes without copying.
pub fn f32_as_bytes(v: &[f32]) -> &[u8] {
    // SAFETY: f32 is 4 bytes with no padding and no invalid bit patterns,
    // and u8 has no alignment requirement. The slice borrows from `v`.
    unsafe { std::slice::from_raw_parts(v.as_ptr() as *const u8, v.len() * F32_SIZE) }
}

pub fn serialize_f32(v: &[f32]) -> Vec<u8> {
    f32_as_bytes(v).to_vec()
}

/// Narrow each element to f32, then serialize.
pub fn serialize_f64(v: &[f64]) -> Vec<u8> {
    let narrowed: Vec<f32> = v.iter().map(|&x| x as f32).collect();
    serialize_f32(&narrowed)
}

/// Decode a float32 blob. Lengths that are not a multiple of 4 are rejected
/// outright rather than truncated.
pub fn deserialize_f32(b: &[u8]) -> Result<Vec<f32>> {
    if b.len() % F32_SIZE != 0 {
        return Err(VecError::InvalidVector(format!(
            "float32 blob length {} is not a multiple of {}",
            b.len(),
            F32_SIZE
        )));
    }
    let mut v = vec![0.0f32; b.len() / F32_SIZE];
    // SAFETY: the length is a multiple of 4 and `v` is freshly allocated
    // with exactly `b.len()` bytes, so the regions are valid and disjoint.
    unsafe {
        std::ptr::copy_nonoverlapping(b.as_ptr(), v.as_mut_ptr() as *mut u8, b.len());
    }
    Ok(v)
}

pub fn serialize_i8(v: &[i8]) -> Vec<u8> {
    v.iter().map(|&x| x as u8).collect()
}

pub fn deserialize_i8(b: &[u8]) -> Vec<i8> {
    b.iter().map(|&x| x as i8).collect()
}
