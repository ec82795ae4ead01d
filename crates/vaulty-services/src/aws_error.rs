//! Classification of AWS SDK failures into item-level errors.

use aws_sdk_glacier::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use vaulty_core::ItemError;

/// Map an SDK error onto [`ItemError`].
///
/// Connection failures and timeouts never reached the service and are transient. Service
/// errors are classified by their error code; `not_found_means_gone` turns a missing
/// resource into [`ItemError::AlreadyGone`] for delete calls.
pub fn classify_sdk_error<E, R>(err: &SdkError<E, R>, not_found_means_gone: bool) -> ItemError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = DisplayErrorContext(err).to_string();
    match err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            ItemError::Transient(message)
        }
        _ => ItemError::from_service_code(err.code(), message, not_found_means_gone),
    }
}
