//! Bearer token verification. Tokens are issued by the identity provider;
//! this service only checks them.

pub mod claims;
pub mod decoder;

pub use claims::Claims;
pub use decoder::TokenDecoder;
