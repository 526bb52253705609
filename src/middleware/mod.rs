pub mod error_handler;
pub mod request_id;
pub mod scope;

pub use error_handler::{error_response, json_error_handler, path_error_handler};
pub use request_id::{RequestId, RequestIdValue, REQUEST_ID_HEADER};
pub use scope::RequestContext;
