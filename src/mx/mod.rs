//! DNS MX resolution.
//!
//! The public entry point is [`resolve_mx`], which performs a synchronous
//! lookup using the system resolver and returns the exchangers ordered by
//! preference, or an [`Error`] describing why the domain cannot receive mail.

mod error;
mod resolver;
mod types;

pub use error::MxError as Error;
pub use resolver::{DEFAULT_DNS_TIMEOUT, LookupMx, resolve_mx, system_resolver};
pub use types::MxRecord;

pub(crate) use resolver::{normalize_domain, resolve_with};
