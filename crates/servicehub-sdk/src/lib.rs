//! ServiceHub Service SDK
//!
//! This SDK provides the types and macros needed to build a service package:
//! a dynamic library (`.so`/`.dylib`/`.dll`) that the ServiceHub server can
//! load at runtime.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use servicehub_sdk::prelude::*;
//!
//! #[derive(Default)]
//! struct EchoService;
//!
//! impl Service for EchoService {
//!     fn name(&self) -> String {
//!         "Echo Service".to_string()
//!     }
//!
//!     fn help(&self) -> String {
//!         "Echoes the input back.".to_string()
//!     }
//!
//!     fn execute(&self, input: &str) -> Result<String, ServiceError> {
//!         Ok(input.to_string())
//!     }
//! }
//!
//! export_service!(EchoService);
//! ```
//!
//! Build the crate with `crate-type = ["cdylib"]` and drop the resulting
//! library into the server's services directory (or upload it over the wire).

pub mod abi;
pub mod error;
#[macro_use]
pub mod macros;
pub mod service;

pub use abi::{
    DescriptorError, ParsedDescriptor, RawBuf, RawService, ServiceConstructorFn,
    ServiceDescriptor, DESCRIPTOR_SYMBOL, SERVICE_ABI_VERSION,
};
pub use error::{ServiceError, ServiceResult};
pub use service::Service;

/// Prelude module with the common imports for service authors.
pub mod prelude {
    pub use crate::error::{ServiceError, ServiceResult};
    pub use crate::service::Service;
    // export_service! is available at crate root via #[macro_export].
}
