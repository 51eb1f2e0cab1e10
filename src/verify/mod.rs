mod types;

pub use types::{Verification, VerifyOptions};

use tracing::{debug, info};
use trust_dns_resolver::Resolver;

use crate::mx::{self, LookupMx};
use crate::probe::probe_recipient;
use crate::validator::{ValidationMode, split_address, validate_email};

/// Anything that turns an address into a [`Verification`]. The batch runner
/// only needs this.
pub trait Verify {
    fn verify(&self, address: &str) -> Verification;
}

/// Composes syntax validation, MX resolution and the SMTP probe for one
/// address at a time. Holds no state between calls.
pub struct Verifier<R = Resolver> {
    resolver: R,
    options: VerifyOptions,
}

impl Verifier<Resolver> {
    /// Uses the system DNS configuration, bounded by `options.dns_timeout`.
    pub fn from_system_conf(options: VerifyOptions) -> Result<Self, mx::Error> {
        let resolver = mx::system_resolver(options.dns_timeout)?;
        Ok(Self { resolver, options })
    }
}

impl<R: LookupMx> Verifier<R> {
    pub fn with_resolver(resolver: R, options: VerifyOptions) -> Self {
        Self { resolver, options }
    }

    pub fn options(&self) -> &VerifyOptions {
        &self.options
    }

    /// Syntax, then MX, then a probe of the most preferred exchanger only.
    /// Every failure ends up as a verdict; nothing here panics or errors.
    pub fn verify(&self, address: &str) -> Verification {
        let address = address.trim();

        let report = validate_email(address, ValidationMode::Relaxed);
        if !report.ok {
            debug!(address, reasons = ?report.reasons, "syntax check failed");
            return Verification::syntax_invalid(address, &report.reasons);
        }
        let Some((local, domain)) = split_address(address) else {
            return Verification::syntax_invalid(address, &["missing '@'".to_string()]);
        };

        let ascii_domain = match mx::normalize_domain(domain) {
            Ok(ascii) => ascii,
            Err(err) => {
                return Verification::domain_unresolvable(address, domain, err.to_string());
            }
        };

        let records = match mx::resolve_with(&self.resolver, &ascii_domain) {
            Ok(records) => records,
            Err(err) => {
                info!(address, domain = %ascii_domain, error = %err, "no usable MX");
                return Verification::domain_unresolvable(address, &ascii_domain, err.to_string());
            }
        };

        let host = &records[0].exchange;
        let recipient = format!("{local}@{ascii_domain}");
        debug!(address, host = %host, "probing primary exchanger");
        let probe = probe_recipient(&recipient, host, &self.options.probe);
        Verification::from_probe(address, &ascii_domain, probe)
    }
}

impl<R: LookupMx> Verify for Verifier<R> {
    fn verify(&self, address: &str) -> Verification {
        Verifier::verify(self, address)
    }
}
