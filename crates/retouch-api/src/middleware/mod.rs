pub mod layer_errors;
pub mod request_id;

pub use layer_errors::{layer_error_middleware, LayerLimits};
pub use request_id::{get_request_id, request_id_middleware, RequestId};
