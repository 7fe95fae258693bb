//! Retouch image engine
//!
//! Sans-IO building blocks of the session engine: the [`codec`] turning upload
//! bytes into a [`PixelBuffer`] and back, the declarative operation [`catalog`]
//! that validates raw client parameters, and the pure [`transforms`] library.

pub mod buffer;
pub mod catalog;
pub mod codec;
pub mod histogram;
pub mod transforms;
pub mod validator;

pub use buffer::{BufferError, PixelBuffer};
pub use catalog::{Catalog, Operation, OperationSpec, ResolvedParams};
pub use codec::{decode, encode, encode_png, CodecError, OutputFormat};
pub use histogram::compute_histogram;
pub use validator::{UploadValidator, ValidationError};
