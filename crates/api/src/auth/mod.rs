//! Bearer-token verification.
//!
//! Users and token issuance live outside this service; the API only checks
//! HS256 access tokens signed with the shared secret.
//!
//! - [`jwt`] -- access-token generation and validation.

pub mod jwt;
