//! Diameter result codes used by the Cx application.

/// 3GPP vendor id qualifying experimental result codes.
pub const VENDOR_ID_3GPP: u32 = 10415;

// Base protocol result codes.
pub const DIAMETER_SUCCESS: i32 = 2001;
pub const DIAMETER_UNABLE_TO_DELIVER: i32 = 3002;
pub const DIAMETER_TOO_BUSY: i32 = 3004;
pub const DIAMETER_AUTHORIZATION_REJECTED: i32 = 5003;
pub const DIAMETER_UNABLE_TO_COMPLY: i32 = 5012;

// 3GPP experimental result codes (TS 29.229).
pub const DIAMETER_FIRST_REGISTRATION: i32 = 2001;
pub const DIAMETER_SUBSEQUENT_REGISTRATION: i32 = 2002;
pub const DIAMETER_UNREGISTERED_SERVICE: i32 = 2003;
pub const DIAMETER_ERROR_USER_UNKNOWN: i32 = 5001;
pub const DIAMETER_ERROR_IDENTITIES_DONT_MATCH: i32 = 5002;
pub const DIAMETER_ERROR_IDENTITY_NOT_REGISTERED: i32 = 5003;
pub const DIAMETER_ERROR_ROAMING_NOT_ALLOWED: i32 = 5004;
pub const DIAMETER_ERROR_IN_ASSIGNMENT_TYPE: i32 = 5005;
