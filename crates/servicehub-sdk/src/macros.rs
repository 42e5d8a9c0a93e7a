//! Export macro for service packages.

/// Export a [`Service`](crate::Service) type from a `cdylib` crate.
///
/// Generates the descriptor export and the entry-point constructor the
/// server resolves at load time. The service type needs a zero-argument
/// constructor (`Default`).
///
/// # Example
///
/// ```rust,ignore
/// use servicehub_sdk::prelude::*;
///
/// #[derive(Default)]
/// struct MyService;
///
/// impl Service for MyService { /* ... */ }
///
/// export_service!(MyService);
/// ```
///
/// The entry-point symbol defaults to `servicehub_service_entry`; a custom
/// name can be given with `export_service!(MyService, entry = my_entry)`.
#[macro_export]
macro_rules! export_service {
    ($ty:ty) => {
        $crate::export_service!($ty, entry = servicehub_service_entry);
    };
    ($ty:ty, entry = $entry:ident) => {
        #[no_mangle]
        pub static servicehub_service_descriptor: $crate::abi::ServiceDescriptor =
            $crate::abi::ServiceDescriptor {
                abi_version: $crate::abi::SERVICE_ABI_VERSION,
                entry_point: stringify!($entry).as_ptr(),
                entry_point_len: stringify!($entry).len(),
                package_version: env!("CARGO_PKG_VERSION").as_ptr(),
                package_version_len: env!("CARGO_PKG_VERSION").len(),
            };

        #[no_mangle]
        pub extern "C" fn $entry() -> *mut $crate::abi::RawService {
            $crate::abi::construct_raw_service::<$ty>()
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[derive(Default)]
    struct NoopService;

    impl Service for NoopService {
        fn name(&self) -> String {
            "Noop".to_string()
        }

        fn help(&self) -> String {
            "Does nothing.".to_string()
        }

        fn execute(&self, _input: &str) -> Result<String, ServiceError> {
            Ok(String::new())
        }
    }

    // The macro must expand in a plain rlib build too.
    export_service!(NoopService, entry = noop_service_entry);

    #[test]
    fn exported_descriptor_names_the_entry_point() {
        let parsed = unsafe {
            crate::abi::ParsedDescriptor::from_raw(&servicehub_service_descriptor)
        }
        .unwrap();
        assert_eq!(parsed.entry_point.as_deref(), Some("noop_service_entry"));
    }

    #[test]
    fn exported_entry_point_constructs_a_service() {
        let raw_ptr = noop_service_entry();
        assert!(!raw_ptr.is_null());
        unsafe {
            let raw = &*raw_ptr;
            let buf = (raw.name)(raw.instance);
            assert!(!buf.is_null());
            (raw.free_buf)(buf);
            (raw.destroy)(raw_ptr);
        }
    }
}
