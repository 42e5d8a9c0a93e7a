//! C ABI shared between the server and service packages.
//!
//! A service package is a dynamic library that exports a
//! [`ServiceDescriptor`] under the symbol named by [`DESCRIPTOR_SYMBOL`].
//! The descriptor names the entry-point symbol: an exported
//! [`ServiceConstructorFn`] that builds a [`RawService`] vtable. The server
//! resolves the vtable once at load time; no per-call symbol lookup happens
//! afterwards.
//!
//! All strings crossing the boundary are UTF-8 `ptr + len` pairs. Buffers
//! returned by a service are allocated by the service and must be released
//! through its own `free_buf` function, never by the host allocator.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::service::Service;

/// Current service ABI version. The server refuses descriptors that do not
/// match.
pub const SERVICE_ABI_VERSION: u32 = 1;

/// Symbol under which every service package exports its descriptor.
pub const DESCRIPTOR_SYMBOL: &[u8] = b"servicehub_service_descriptor";

/// Descriptor exported by a service package.
///
/// Read once at load time and discarded; only the resolved constructor
/// survives.
#[repr(C)]
pub struct ServiceDescriptor {
    /// ABI version - must match [`SERVICE_ABI_VERSION`].
    pub abi_version: u32,

    /// Name of the exported constructor symbol.
    pub entry_point: *const u8,
    pub entry_point_len: usize,

    /// Package version string (informational).
    pub package_version: *const u8,
    pub package_version_len: usize,
}

// SAFETY: The pointers reference 'static string data baked into the
// exporting library; the descriptor itself is immutable after export.
unsafe impl Sync for ServiceDescriptor {}

/// Constructor signature named by the descriptor's entry point.
///
/// Returns a heap-allocated vtable, or null when construction fails.
pub type ServiceConstructorFn = unsafe extern "C" fn() -> *mut RawService;

/// A heap buffer handed from a service to the host.
///
/// A null `ptr` signals that the operation failed (or panicked) inside the
/// service. Non-null buffers must be returned to the service through
/// [`RawService::free_buf`].
#[repr(C)]
#[derive(Clone, Copy)]
pub struct RawBuf {
    pub ptr: *mut u8,
    pub len: usize,
    pub cap: usize,
}

impl RawBuf {
    /// The failure sentinel.
    pub const fn null() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            len: 0,
            cap: 0,
        }
    }

    /// Whether this buffer is the failure sentinel.
    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// Move a `String` into a raw buffer, transferring ownership to the
    /// caller of the shim that produced it.
    pub fn from_string(s: String) -> Self {
        let mut bytes = s.into_bytes();
        let buf = Self {
            ptr: bytes.as_mut_ptr(),
            len: bytes.len(),
            cap: bytes.capacity(),
        };
        std::mem::forget(bytes);
        buf
    }
}

/// Vtable for a loaded service instance.
///
/// Produced by the package's constructor; every function pointer is bound to
/// this one instance. `instance` is opaque to the host.
#[repr(C)]
pub struct RawService {
    pub instance: *mut (),

    /// Returns the service name, or a null buffer on failure.
    pub name: unsafe extern "C" fn(instance: *mut ()) -> RawBuf,

    /// Returns the help text, or a null buffer on failure.
    pub help: unsafe extern "C" fn(instance: *mut ()) -> RawBuf,

    /// Executes the service with a UTF-8 input. A null buffer signals an
    /// execution failure.
    pub execute:
        unsafe extern "C" fn(instance: *mut (), input: *const u8, input_len: usize) -> RawBuf,

    /// Releases a buffer previously returned by this vtable.
    pub free_buf: unsafe extern "C" fn(buf: RawBuf),

    /// Destroys the instance and the vtable itself.
    pub destroy: unsafe extern "C" fn(raw: *mut RawService),
}

/// Descriptor contents copied onto the host heap.
#[derive(Debug, Clone)]
pub struct ParsedDescriptor {
    /// Entry-point symbol name, if the descriptor names one.
    pub entry_point: Option<String>,

    /// Package version string, if present.
    pub package_version: Option<String>,
}

impl ParsedDescriptor {
    /// Parse a raw descriptor.
    ///
    /// # Safety
    /// The descriptor's pointers must be valid for their declared lengths.
    pub unsafe fn from_raw(raw: &ServiceDescriptor) -> Result<Self, DescriptorError> {
        if raw.abi_version != SERVICE_ABI_VERSION {
            return Err(DescriptorError::AbiMismatch {
                expected: SERVICE_ABI_VERSION,
                found: raw.abi_version,
            });
        }

        let extract = |ptr: *const u8, len: usize, field: &str| -> Result<Option<String>, DescriptorError> {
            if ptr.is_null() || len == 0 {
                return Ok(None);
            }
            let slice = std::slice::from_raw_parts(ptr, len);
            std::str::from_utf8(slice)
                .map(|s| Some(s.to_string()))
                .map_err(|e| DescriptorError::InvalidUtf8(field.to_string(), e))
        };

        Ok(Self {
            entry_point: extract(raw.entry_point, raw.entry_point_len, "entry_point")?,
            package_version: extract(raw.package_version, raw.package_version_len, "package_version")?,
        })
    }
}

/// Descriptor parsing errors.
#[derive(Debug, thiserror::Error)]
pub enum DescriptorError {
    #[error("ABI version mismatch: expected {expected}, found {found}")]
    AbiMismatch { expected: u32, found: u32 },

    #[error("invalid UTF-8 in descriptor field '{0}'")]
    InvalidUtf8(String, #[source] std::str::Utf8Error),
}

/// Build a [`RawService`] for a [`Service`] type with a zero-argument
/// constructor.
///
/// This is what [`export_service!`](crate::export_service) calls from the
/// generated entry point. Returns null when construction panics, which the
/// loader reports as an instantiation failure.
pub fn construct_raw_service<S: Service + Default + 'static>() -> *mut RawService {
    let instance = match catch_unwind(AssertUnwindSafe(S::default)) {
        Ok(s) => s,
        Err(_) => return std::ptr::null_mut(),
    };

    let raw = RawService {
        instance: Box::into_raw(Box::new(instance)) as *mut (),
        name: name_shim::<S>,
        help: help_shim::<S>,
        execute: execute_shim::<S>,
        free_buf: free_buf_shim,
        destroy: destroy_shim::<S>,
    };
    Box::into_raw(Box::new(raw))
}

unsafe extern "C" fn name_shim<S: Service>(instance: *mut ()) -> RawBuf {
    let service = &*(instance as *const S);
    match catch_unwind(AssertUnwindSafe(|| service.name())) {
        Ok(s) => RawBuf::from_string(s),
        Err(_) => RawBuf::null(),
    }
}

unsafe extern "C" fn help_shim<S: Service>(instance: *mut ()) -> RawBuf {
    let service = &*(instance as *const S);
    match catch_unwind(AssertUnwindSafe(|| service.help())) {
        Ok(s) => RawBuf::from_string(s),
        Err(_) => RawBuf::null(),
    }
}

unsafe extern "C" fn execute_shim<S: Service>(
    instance: *mut (),
    input: *const u8,
    input_len: usize,
) -> RawBuf {
    let service = &*(instance as *const S);

    let input = if input.is_null() {
        ""
    } else {
        let slice = std::slice::from_raw_parts(input, input_len);
        match std::str::from_utf8(slice) {
            Ok(s) => s,
            Err(_) => return RawBuf::null(),
        }
    };

    match catch_unwind(AssertUnwindSafe(|| service.execute(input))) {
        Ok(Ok(result)) => RawBuf::from_string(result),
        Ok(Err(_)) | Err(_) => RawBuf::null(),
    }
}

unsafe extern "C" fn free_buf_shim(buf: RawBuf) {
    if !buf.ptr.is_null() {
        drop(Vec::from_raw_parts(buf.ptr, buf.len, buf.cap));
    }
}

unsafe extern "C" fn destroy_shim<S: Service>(raw: *mut RawService) {
    if raw.is_null() {
        return;
    }
    let raw = Box::from_raw(raw);
    drop(Box::from_raw(raw.instance as *mut S));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;

    #[derive(Default)]
    struct UpperService;

    impl Service for UpperService {
        fn name(&self) -> String {
            "Upper Service".to_string()
        }

        fn help(&self) -> String {
            "Uppercases the input.".to_string()
        }

        fn execute(&self, input: &str) -> Result<String, ServiceError> {
            if input.is_empty() {
                return Err(ServiceError::InvalidInput("empty input".to_string()));
            }
            Ok(input.to_uppercase())
        }
    }

    unsafe fn read_buf(raw: &RawService, buf: RawBuf) -> Option<String> {
        if buf.is_null() {
            return None;
        }
        let s = std::str::from_utf8(std::slice::from_raw_parts(buf.ptr, buf.len))
            .ok()
            .map(|s| s.to_string());
        (raw.free_buf)(buf);
        s
    }

    #[test]
    fn raw_service_round_trip() {
        let raw_ptr = construct_raw_service::<UpperService>();
        assert!(!raw_ptr.is_null());

        unsafe {
            let raw = &*raw_ptr;

            let name = read_buf(raw, (raw.name)(raw.instance));
            assert_eq!(name.as_deref(), Some("Upper Service"));

            let input = "ana";
            let result = read_buf(raw, (raw.execute)(raw.instance, input.as_ptr(), input.len()));
            assert_eq!(result.as_deref(), Some("ANA"));

            // Execution error surfaces as the null buffer.
            let failed = (raw.execute)(raw.instance, "".as_ptr(), 0);
            assert!(failed.is_null());

            (raw.destroy)(raw_ptr);
        }
    }

    #[test]
    fn descriptor_parses_entry_point() {
        let entry = b"my_service_entry";
        let descriptor = ServiceDescriptor {
            abi_version: SERVICE_ABI_VERSION,
            entry_point: entry.as_ptr(),
            entry_point_len: entry.len(),
            package_version: std::ptr::null(),
            package_version_len: 0,
        };

        let parsed = unsafe { ParsedDescriptor::from_raw(&descriptor) }.unwrap();
        assert_eq!(parsed.entry_point.as_deref(), Some("my_service_entry"));
        assert!(parsed.package_version.is_none());
    }

    #[test]
    fn descriptor_rejects_abi_mismatch() {
        let descriptor = ServiceDescriptor {
            abi_version: SERVICE_ABI_VERSION + 1,
            entry_point: std::ptr::null(),
            entry_point_len: 0,
            package_version: std::ptr::null(),
            package_version_len: 0,
        };

        let err = unsafe { ParsedDescriptor::from_raw(&descriptor) }.unwrap_err();
        assert!(matches!(err, DescriptorError::AbiMismatch { .. }));
    }

    #[test]
    fn descriptor_without_entry_point_parses_to_none() {
        let descriptor = ServiceDescriptor {
            abi_version: SERVICE_ABI_VERSION,
            entry_point: std::ptr::null(),
            entry_point_len: 0,
            package_version: std::ptr::null(),
            package_version_len: 0,
        };

        let parsed = unsafe { ParsedDescriptor::from_raw(&descriptor) }.unwrap();
        assert!(parsed.entry_point.is_none());
    }
}
