//! API endpoint implementations.

pub mod coins;
pub mod orders;
pub mod otp;
pub mod profile;
