use coinlink::LinkError;

use crate::error::FrontendError;

/// Convert a failed node query into an engine error
pub fn link_error_from_frontend_error(method: &str, e: FrontendError) -> LinkError {
    match e {
        FrontendError::RPCError { code, message } => LinkError::node_error(message, code),
        other => LinkError::node_error(format!("{} failed", method), -1).with_source(other),
    }
}
