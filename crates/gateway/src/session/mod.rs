//! Session token transport: request/response headers, cookies and the
//! per-request user extension.

pub mod extract;
pub mod helper;

pub use extract::CurrentUser;
pub use helper::{CookieOptions, NotLoggedIn, SessionError, SessionHelper};
