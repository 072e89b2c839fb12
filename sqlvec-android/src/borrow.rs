//! Scoped access to Java primitive arrays.
//!
//! An [`ArrayScope`] pins (or copies) the elements of a Java array for as
//! long as it lives and releases them when dropped, on every exit path. The
//! [`Release`] flag chooses whether changes are written back to the Java
//! array or discarded.

use jni::objects::{AutoElements, JPrimitiveArray, ReleaseMode, TypeArray};
use jni::sys::jbyte;
use jni::JNIEnv;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Release {
    /// Drop any changes; the Java array is left untouched.
    Discard,
    /// Write changes back into the Java array on release.
    Commit,
}

impl From<Release> for ReleaseMode {
    fn from(release: Release) -> Self {
        match release {
            Release::Discard => ReleaseMode::NoCopyBack,
            Release::Commit => ReleaseMode::CopyBack,
        }
    }
}

pub struct ArrayScope<'local, 'other, 'array, T: TypeArray> {
    elements: AutoElements<'local, 'other, 'array, T>,
}

impl<'local, 'other, 'array, T: TypeArray> ArrayScope<'local, 'other, 'array, T> {
    /// Borrow the elements of `array`. A null array is an error rather than
    /// an empty slice.
    pub fn open(
        env: &mut JNIEnv<'local>,
        array: &'array JPrimitiveArray<'other, T>,
        release: Release,
    ) -> jni::errors::Result<Self> {
        if array.is_null() {
            return Err(jni::errors::Error::NullPtr("array argument"));
        }
        // SAFETY: callers only read through the scope and do not hand the
        // same Java array to another JNI call while it is open.
        let elements = unsafe { env.get_array_elements(array, release.into())? };
        Ok(Self { elements })
    }

    pub fn as_slice(&self) -> &[T] {
        &self.elements
    }
}

impl ArrayScope<'_, '_, '_, jbyte> {
    pub fn as_bytes(&self) -> &[u8] {
        let elements = self.as_slice();
        // SAFETY: i8 and u8 share size, alignment and have no invalid values.
        unsafe { std::slice::from_raw_parts(elements.as_ptr() as *const u8, elements.len()) }
    }
}
