//! JNI entry points for `com.sqlite.vec.SQLiteVec`.
//!
//! Every native method takes the raw `sqlite3*` as a `long` and reports
//! failure through sentinels: `-1.0` for distances, `-1` for lengths, `null`
//! for arrays and strings, and the SQLite status code for initialization.
//! No entry point lets a Rust panic unwind into the JVM; a panic throws
//! `java.lang.RuntimeException` and returns the sentinel.

pub mod borrow;
pub mod logging;

use std::ffi::c_void;
use std::panic::{self, AssertUnwindSafe};

use jni::objects::{JByteArray, JClass, JFloatArray, JObject, JString};
use jni::sys::{jboolean, jbyte, jdouble, jint, jlong, JNI_FALSE, JNI_TRUE, JNI_VERSION_1_6};
use jni::{JNIEnv, JavaVM};
use sqlvec_core::{extension, ffi, marshal, DistanceMetric, VecDb, VecError};
use thiserror::Error;

use borrow::{ArrayScope, Release};

pub const DISTANCE_FAILED: jdouble = -1.0;
pub const LENGTH_FAILED: jint = -1;

#[derive(Error, Debug)]
enum BindError {
    #[error("jni error: {0}")]
    Jni(#[from] jni::errors::Error),

    #[error(transparent)]
    Vec(#[from] VecError),

    #[error("vector length {0} does not fit in a Java int")]
    Overflow(usize),
}

type BindResult<T> = std::result::Result<T, BindError>;

/// Panic guard for entry points: a panic in `body` becomes a Java
/// `RuntimeException` carrying the panic message, and `default` is returned.
fn guarded<'local, R>(
    env: &mut JNIEnv<'local>,
    default: R,
    body: impl FnOnce(&mut JNIEnv<'local>) -> R,
) -> R {
    match panic::catch_unwind(AssertUnwindSafe(|| body(env))) {
        Ok(v) => v,
        Err(payload) => {
            let msg = if let Some(s) = payload.downcast_ref::<&str>() {
                s.to_string()
            } else if let Some(s) = payload.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown Rust panic in sqlite-vec JNI".to_string()
            };
            let _ = env.throw_new("java/lang/RuntimeException", msg);
            default
        }
    }
}

fn or_sentinel<T>(op: &'static str, result: BindResult<T>, sentinel: T) -> T {
    match result {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(op, "{}", e);
            sentinel
        }
    }
}

/// Borrow the connection behind a Java `long`. The handle stays owned by
/// the Java side and is never closed here.
fn borrow_db(db: jlong) -> BindResult<VecDb> {
    // SAFETY: a non-null handle comes from the Java database object that
    // owns it, and the caller keeps it open for the duration of the call.
    Ok(unsafe { VecDb::from_raw_handle(db as *mut ffi::sqlite3) }?)
}

fn read_metric(env: &mut JNIEnv, metric: &JString) -> BindResult<DistanceMetric> {
    if metric.is_null() {
        return Ok(DistanceMetric::from_selector(None));
    }
    let name: String = env.get_string(metric)?.into();
    Ok(DistanceMetric::from_selector(Some(&name)))
}

fn byte_array<'local>(env: &mut JNIEnv<'local>, bytes: &[u8]) -> BindResult<JObject<'local>> {
    Ok(env.byte_array_from_slice(bytes)?.into())
}

fn jbyte_array<'local>(env: &mut JNIEnv<'local>, values: &[jbyte]) -> BindResult<JObject<'local>> {
    let array = env.new_byte_array(values.len() as i32)?;
    env.set_byte_array_region(&array, 0, values)?;
    Ok(array.into())
}

fn float_array<'local>(env: &mut JNIEnv<'local>, values: &[f32]) -> BindResult<JObject<'local>> {
    let array = env.new_float_array(values.len() as i32)?;
    env.set_float_array_region(&array, 0, values)?;
    Ok(array.into())
}

#[no_mangle]
pub extern "system" fn JNI_OnLoad(_vm: JavaVM, _reserved: *mut c_void) -> jint {
    logging::init();
    tracing::debug!("sqlvec native library loaded");
    JNI_VERSION_1_6
}

#[no_mangle]
pub extern "system" fn Java_com_sqlite_vec_SQLiteVec_nativeInit<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    db: jlong,
) -> jint {
    guarded(&mut env, ffi::SQLITE_ERROR, |_| {
        // SAFETY: see `borrow_db`; a null handle is rejected inside.
        let outcome = unsafe { extension::init_raw(db as *mut ffi::sqlite3) };
        outcome.code
    })
}

#[no_mangle]
pub extern "system" fn Java_com_sqlite_vec_SQLiteVec_nativeGetVersion<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> JObject<'local> {
    guarded(&mut env, JObject::null(), |env| {
        let result = extension::version()
            .map_err(BindError::from)
            .and_then(|v| Ok(JObject::from(env.new_string(v)?)));
        or_sentinel("get_version", result, JObject::null())
    })
}

#[no_mangle]
pub extern "system" fn Java_com_sqlite_vec_SQLiteVec_nativeSerializeFloat32<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    vector: JFloatArray<'local>,
) -> JObject<'local> {
    guarded(&mut env, JObject::null(), |env| {
        let result = (|| -> BindResult<_> {
            let bytes = {
                let scope = ArrayScope::open(env, &vector, Release::Discard)?;
                marshal::serialize_f32(scope.as_slice())
            };
            byte_array(env, &bytes)
        })();
        or_sentinel("serialize_f32", result, JObject::null())
    })
}

#[no_mangle]
pub extern "system" fn Java_com_sqlite_vec_SQLiteVec_nativeDeserializeFloat32<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    data: JByteArray<'local>,
) -> JObject<'local> {
    guarded(&mut env, JObject::null(), |env| {
        let result = (|| -> BindResult<_> {
            let floats = {
                let scope = ArrayScope::open(env, &data, Release::Discard)?;
                marshal::deserialize_f32(scope.as_bytes())?
            };
            float_array(env, &floats)
        })();
        or_sentinel("deserialize_f32", result, JObject::null())
    })
}

#[no_mangle]
pub extern "system" fn Java_com_sqlite_vec_SQLiteVec_nativeSerializeInt8<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    vector: JByteArray<'local>,
) -> JObject<'local> {
    guarded(&mut env, JObject::null(), |env| {
        let result = (|| -> BindResult<_> {
            let bytes = {
                let scope = ArrayScope::open(env, &vector, Release::Discard)?;
                marshal::serialize_i8(scope.as_slice())
            };
            byte_array(env, &bytes)
        })();
        or_sentinel("serialize_i8", result, JObject::null())
    })
}

#[no_mangle]
pub extern "system" fn Java_com_sqlite_vec_SQLiteVec_nativeDeserializeInt8<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    data: JByteArray<'local>,
) -> JObject<'local> {
    guarded(&mut env, JObject::null(), |env| {
        let result = (|| -> BindResult<_> {
            let values = {
                let scope = ArrayScope::open(env, &data, Release::Discard)?;
                marshal::deserialize_i8(scope.as_bytes())
            };
            jbyte_array(env, &values)
        })();
        or_sentinel("deserialize_i8", result, JObject::null())
    })
}

#[no_mangle]
pub extern "system" fn Java_com_sqlite_vec_SQLiteVec_nativeIsLoaded<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    db: jlong,
) -> jboolean {
    guarded(&mut env, JNI_FALSE, |_| match borrow_db(db) {
        Ok(conn) if conn.is_loaded() => JNI_TRUE,
        _ => JNI_FALSE,
    })
}

#[no_mangle]
pub extern "system" fn Java_com_sqlite_vec_SQLiteVec_nativeDistance<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    db: jlong,
    vector1: JByteArray<'local>,
    vector2: JByteArray<'local>,
    metric: JString<'local>,
) -> jdouble {
    guarded(&mut env, DISTANCE_FAILED, |env| {
        let result = (|| -> BindResult<_> {
            let conn = borrow_db(db)?;
            let metric = read_metric(env, &metric)?;
            let a = ArrayScope::open(env, &vector1, Release::Discard)?;
            let b = ArrayScope::open(env, &vector2, Release::Discard)?;
            Ok(conn.distance(a.as_bytes(), b.as_bytes(), metric)?)
        })();
        or_sentinel("distance", result, DISTANCE_FAILED)
    })
}

#[no_mangle]
pub extern "system" fn Java_com_sqlite_vec_SQLiteVec_nativeVectorLength<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    db: jlong,
    vector: JByteArray<'local>,
) -> jint {
    guarded(&mut env, LENGTH_FAILED, |env| {
        let result = (|| -> BindResult<_> {
            let conn = borrow_db(db)?;
            let scope = ArrayScope::open(env, &vector, Release::Discard)?;
            let len = conn.vector_length(scope.as_bytes())?;
            jint::try_from(len).map_err(|_| BindError::Overflow(len))
        })();
        or_sentinel("vector_length", result, LENGTH_FAILED)
    })
}

#[no_mangle]
pub extern "system" fn Java_com_sqlite_vec_SQLiteVec_nativeNormalize<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    db: jlong,
    vector: JByteArray<'local>,
) -> JObject<'local> {
    guarded(&mut env, JObject::null(), |env| {
        let result = (|| -> BindResult<_> {
            let conn = borrow_db(db)?;
            let normalized = {
                let scope = ArrayScope::open(env, &vector, Release::Discard)?;
                conn.normalize(scope.as_bytes())?
            };
            byte_array(env, &normalized)
        })();
        or_sentinel("normalize", result, JObject::null())
    })
}

#[no_mangle]
pub extern "system" fn Java_com_sqlite_vec_SQLiteVec_nativeAdd<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    db: jlong,
    vector1: JByteArray<'local>,
    vector2: JByteArray<'local>,
) -> JObject<'local> {
    guarded(&mut env, JObject::null(), |env| {
        let result = (|| -> BindResult<_> {
            let conn = borrow_db(db)?;
            let sum = {
                let a = ArrayScope::open(env, &vector1, Release::Discard)?;
                let b = ArrayScope::open(env, &vector2, Release::Discard)?;
                conn.add(a.as_bytes(), b.as_bytes())?
            };
            byte_array(env, &sum)
        })();
        or_sentinel("add", result, JObject::null())
    })
}

#[no_mangle]
pub extern "system" fn Java_com_sqlite_vec_SQLiteVec_nativeSubtract<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    db: jlong,
    vector1: JByteArray<'local>,
    vector2: JByteArray<'local>,
) -> JObject<'local> {
    guarded(&mut env, JObject::null(), |env| {
        let result = (|| -> BindResult<_> {
            let conn = borrow_db(db)?;
            let difference = {
                let a = ArrayScope::open(env, &vector1, Release::Discard)?;
                let b = ArrayScope::open(env, &vector2, Release::Discard)?;
                conn.subtract(a.as_bytes(), b.as_bytes())?
            };
            byte_array(env, &difference)
        })();
        or_sentinel("subtract", result, JObject::null())
    })
}

#[no_mangle]
pub extern "system" fn Java_com_sqlite_vec_SQLiteVec_nativeToJson<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    db: jlong,
    vector: JByteArray<'local>,
) -> JObject<'local> {
    guarded(&mut env, JObject::null(), |env| {
        let result = (|| -> BindResult<_> {
            let conn = borrow_db(db)?;
            let json = {
                let scope = ArrayScope::open(env, &vector, Release::Discard)?;
                conn.to_json(scope.as_bytes())?
            };
            Ok(JObject::from(env.new_string(json)?))
        })();
        or_sentinel("to_json", result, JObject::null())
    })
}

#[no_mangle]
pub extern "system" fn Java_com_sqlite_vec_SQLiteVec_nativeAutoLoad<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jint {
    guarded(&mut env, ffi::SQLITE_ERROR, |_| match extension::auto_load() {
        Ok(()) => ffi::SQLITE_OK,
        Err(VecError::Extension { code, .. }) => code,
        Err(e) => {
            tracing::warn!("auto_load: {}", e);
            ffi::SQLITE_ERROR
        }
    })
}

#[no_mangle]
pub extern "system" fn Java_com_sqlite_vec_SQLiteVec_nativeCancelAutoLoad<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
) -> jboolean {
    guarded(&mut env, JNI_FALSE, |_| {
        if extension::cancel_auto_load() {
            JNI_TRUE
        } else {
            JNI_FALSE
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_sentinel_passes_values_through() {
        assert_eq!(or_sentinel("distance", Ok(0.25), DISTANCE_FAILED), 0.25);
    }

    #[test]
    fn test_or_sentinel_maps_errors() {
        let err: BindResult<f64> = Err(BindError::Vec(VecError::NoResult));
        assert_eq!(or_sentinel("distance", err, DISTANCE_FAILED), -1.0);

        let err: BindResult<jint> = Err(BindError::Overflow(usize::MAX));
        assert_eq!(or_sentinel("vector_length", err, LENGTH_FAILED), -1);
    }

    #[test]
    fn test_null_handle_is_rejected() {
        assert!(matches!(
            borrow_db(0),
            Err(BindError::Vec(VecError::NullHandle))
        ));
    }

    #[test]
    fn test_borrowed_handle_reaches_connection() {
        let owner = VecDb::open_in_memory().unwrap();
        let handle = unsafe { owner.connection().handle() } as jlong;
        let conn = borrow_db(handle).unwrap();
        assert!(conn.is_loaded());
        assert_eq!(conn.length_f32(&[1.0, 2.0, 3.0, 4.0]).unwrap(), 4);
    }
}
