//! Adapter from a loaded package instance to the [`Service`] trait.

use libloading::Library;
use servicehub_sdk::{RawBuf, RawService, Service, ServiceError};

/// Wraps a dynamically loaded service instance.
///
/// The vtable was resolved once at load time; each call goes straight
/// through a function pointer. The adapter owns the library handle, so the
/// package's code stays mapped for as long as the service is alive, and is
/// released when the registry drops the service.
pub struct ServiceAdapter {
    raw: *mut RawService,

    /// Loading scope for the package. Dropped last.
    _library: Library,
}

// SAFETY: The instance pointer is only touched through the vtable, and the
// SDK's Service trait requires exported implementations to be Send + Sync.
// Thread safety of the loaded code is part of the package contract.
unsafe impl Send for ServiceAdapter {}
unsafe impl Sync for ServiceAdapter {}

impl ServiceAdapter {
    /// Build an adapter over a constructed instance.
    ///
    /// # Safety
    /// `raw` must be a non-null vtable produced by `library`'s entry-point
    /// constructor, and must not be destroyed by anyone else.
    pub(crate) unsafe fn new(raw: *mut RawService, library: Library) -> Self {
        Self {
            raw,
            _library: library,
        }
    }

    /// Copy a service-owned buffer onto the host heap and release it.
    fn take_buf(&self, buf: RawBuf) -> Option<String> {
        if buf.is_null() {
            return None;
        }
        // SAFETY: A non-null buffer from the vtable is valid for `len` bytes
        // and must be released through the vtable's free function.
        unsafe {
            let bytes = std::slice::from_raw_parts(buf.ptr, buf.len);
            let text = String::from_utf8_lossy(bytes).into_owned();
            ((*self.raw).free_buf)(buf);
            Some(text)
        }
    }
}

impl Service for ServiceAdapter {
    fn name(&self) -> String {
        // SAFETY: `raw` is valid for the adapter's lifetime.
        let buf = unsafe { ((*self.raw).name)((*self.raw).instance) };
        self.take_buf(buf).unwrap_or_default()
    }

    fn help(&self) -> String {
        // SAFETY: `raw` is valid for the adapter's lifetime.
        let buf = unsafe { ((*self.raw).help)((*self.raw).instance) };
        self.take_buf(buf).unwrap_or_default()
    }

    fn execute(&self, input: &str) -> Result<String, ServiceError> {
        // SAFETY: `raw` is valid for the adapter's lifetime; the input
        // pointer is valid for the duration of the call.
        let buf = unsafe {
            ((*self.raw).execute)((*self.raw).instance, input.as_ptr(), input.len())
        };
        self.take_buf(buf).ok_or_else(|| {
            ServiceError::ExecutionFailed("service reported a failure".to_string())
        })
    }
}

impl Drop for ServiceAdapter {
    fn drop(&mut self) {
        // SAFETY: `raw` was produced by the package's constructor and is
        // destroyed exactly once, before the library is unmapped.
        unsafe {
            ((*self.raw).destroy)(self.raw);
        }
    }
}
