//! Wire encodings for API responses beyond JSON.

pub mod binary;

pub use binary::{encode_delta_summary, CodecError, BINARY_CONTENT_TYPE, BINARY_VERSION};
