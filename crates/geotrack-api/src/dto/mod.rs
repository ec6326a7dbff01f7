//! Request and response DTOs.
//!
//! Bodies use snake_case keys. The one exception is the decoded QR payload
//! (approval outcome `qr_payload` and the credential validate body), which
//! is serialized with the camelCase keys of the document printed in the QR
//! code. Location reports also accept the camelCase aliases devices send.

pub mod request;
pub mod response;
