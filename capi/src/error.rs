//! Public error codes and their translation from native stack statuses.

use bt_topshim::btif::BtStatus;
use num_derive::{FromPrimitive, ToPrimitive};
use thiserror::Error;

const TIZEN_ERROR_MIN_PLATFORM_ERROR: i32 = -1073741824;
const TIZEN_ERROR_BLUETOOTH: i32 = -0x01C00000;

/// Errors returned by every public operation and passed to asynchronous callbacks.
///
/// The discriminants are the numeric codes of the platform C API.
#[derive(Clone, Copy, Debug, Error, FromPrimitive, ToPrimitive, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum BtError {
    #[error("Operation cancelled")]
    Cancelled = -125,
    #[error("Invalid parameter")]
    InvalidParameter = -22,
    #[error("Out of memory")]
    OutOfMemory = -12,
    #[error("Device or resource busy")]
    ResourceBusy = -16,
    #[error("Timeout error")]
    TimedOut = TIZEN_ERROR_MIN_PLATFORM_ERROR + 1,
    #[error("Operation now in progress")]
    NowInProgress = -115,
    #[error("Not supported")]
    NotSupported = TIZEN_ERROR_MIN_PLATFORM_ERROR + 2,
    #[error("Permission denied")]
    PermissionDenied = -13,
    #[error("Quota exceeded")]
    QuotaExceeded = -122,
    #[error("No data available")]
    NoData = -61,
    #[error("Local adapter not initialized")]
    NotInitialized = TIZEN_ERROR_BLUETOOTH | 0x0101,
    #[error("Local adapter not enabled")]
    NotEnabled = TIZEN_ERROR_BLUETOOTH | 0x0102,
    #[error("Operation already done")]
    AlreadyDone = TIZEN_ERROR_BLUETOOTH | 0x0103,
    #[error("Operation failed")]
    OperationFailed = TIZEN_ERROR_BLUETOOTH | 0x0104,
    #[error("Operation not in progress")]
    NotInProgress = TIZEN_ERROR_BLUETOOTH | 0x0105,
    #[error("Remote device not bonded")]
    RemoteDeviceNotBonded = TIZEN_ERROR_BLUETOOTH | 0x0106,
    #[error("Authentication rejected")]
    AuthRejected = TIZEN_ERROR_BLUETOOTH | 0x0107,
    #[error("Authentication failed")]
    AuthFailed = TIZEN_ERROR_BLUETOOTH | 0x0108,
    #[error("Remote device not found")]
    RemoteDeviceNotFound = TIZEN_ERROR_BLUETOOTH | 0x0109,
    #[error("Service search failed")]
    ServiceSearchFailed = TIZEN_ERROR_BLUETOOTH | 0x010A,
    #[error("Remote device is not connected")]
    RemoteDeviceNotConnected = TIZEN_ERROR_BLUETOOTH | 0x010B,
    #[error("Resource temporarily unavailable")]
    Again = TIZEN_ERROR_BLUETOOTH | 0x010C,
    #[error("Service not found")]
    ServiceNotFound = TIZEN_ERROR_BLUETOOTH | 0x010D,
}

impl BtError {
    /// Numeric code of the platform C API.
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// Numeric code of a result, 0 for success.
pub fn result_code(result: &Result<(), BtError>) -> i32 {
    match result {
        Ok(()) => 0,
        Err(e) => e.code(),
    }
}

/// Translates a native stack status into the public result.
///
/// Statuses without a dedicated public error map to `BtError::OperationFailed`.
pub fn get_error_code(status: BtStatus) -> Result<(), BtError> {
    let err = match status {
        BtStatus::Success => return Ok(()),
        BtStatus::Cancel | BtStatus::CancelByUser => BtError::Cancelled,
        BtStatus::InvalidParam | BtStatus::InvalidData | BtStatus::InvalidCallback => {
            BtError::InvalidParameter
        }
        BtStatus::MemoryAllocation | BtStatus::OutOfMemory => BtError::OutOfMemory,
        BtStatus::Timeout => BtError::TimedOut,
        BtStatus::DeviceNotEnabled => BtError::NotEnabled,
        BtStatus::DeviceAlreadyEnabled
        | BtStatus::AlreadyInitialized
        | BtStatus::AgentDoesNotExist
        | BtStatus::AlreadyDeactivated
        | BtStatus::AlreadyConnect => BtError::AlreadyDone,
        BtStatus::NotPaired => BtError::RemoteDeviceNotBonded,
        BtStatus::NotInOperation => BtError::NotInProgress,
        BtStatus::InProgress => BtError::NowInProgress,
        BtStatus::DeviceBusy => BtError::ResourceBusy,
        BtStatus::AuthenticationFailed | BtStatus::AuthorizationRejected => BtError::AuthFailed,
        BtStatus::AuthenticationRejected => BtError::AuthRejected,
        BtStatus::HostDown | BtStatus::ServiceSearchError => BtError::ServiceSearchFailed,
        BtStatus::PermissionDenied | BtStatus::AccessDenied => BtError::PermissionDenied,
        BtStatus::ServiceNotFound => BtError::ServiceNotFound,
        BtStatus::NotInitialized => BtError::NotInitialized,
        BtStatus::NoData => BtError::NoData,
        BtStatus::NotConnected => BtError::RemoteDeviceNotConnected,
        BtStatus::NotFound => BtError::RemoteDeviceNotFound,
        BtStatus::NotSupport => BtError::NotSupported,
        BtStatus::Again => BtError::Again,
        _ => BtError::OperationFailed,
    };

    Err(err)
}

/// Same as `get_error_code`, logging the failure against the operation name.
pub(crate) fn check_status(op: &str, status: BtStatus) -> Result<(), BtError> {
    get_error_code(status).map_err(|e| {
        log::error!("{} failed: {} ({:?}, 0x{:08x})", op, e, status, e.code());
        e
    })
}

/// Translates the failure of a native getter, logging it against the operation name.
pub(crate) fn check_result<T>(op: &str, result: Result<T, BtStatus>) -> Result<T, BtError> {
    result.or_else(|status| match check_status(op, status) {
        Err(e) => Err(e),
        Ok(()) => {
            log::error!("{} failed without a reason", op);
            Err(BtError::OperationFailed)
        }
    })
}
