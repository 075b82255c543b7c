//! Exit status for fieldpulsectl

use fieldpulse_shared::MetricsError;

/// Exit code for success
pub const EXIT_SUCCESS: u8 = 0;

/// Exit code for general errors (I/O, config, storage)
pub const EXIT_GENERAL_ERROR: u8 = 1;

/// Exit code when the engine rejected the request (bad input, duplicate,
/// quota reached, unknown id)
pub const EXIT_REJECTED: u8 = 2;

/// The engine error carried by `err`, if any, whatever context was added on top.
pub fn engine_error(err: &anyhow::Error) -> Option<&MetricsError> {
    err.chain().find_map(|cause| cause.downcast_ref::<MetricsError>())
}

pub fn exit_code(err: &anyhow::Error) -> u8 {
    match engine_error(err) {
        Some(e) if e.is_recoverable() => EXIT_REJECTED,
        _ => EXIT_GENERAL_ERROR,
    }
}
