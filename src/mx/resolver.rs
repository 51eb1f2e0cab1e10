use std::time::Duration;

use tracing::debug;
use trust_dns_resolver::{Resolver, error::ResolveError, system_conf};

use super::{Error, MxRecord};

/// Default bound on a single MX lookup.
pub const DEFAULT_DNS_TIMEOUT: Duration = Duration::from_secs(5);

/// Lookup MX records for `domain` using the system resolver.
///
/// The domain is normalized via IDNA before querying DNS. On success the
/// records are sorted by ascending preference and at least one is present;
/// an empty answer is reported as [`Error::NoRecords`].
pub fn resolve_mx(domain: &str) -> Result<Vec<MxRecord>, Error> {
    let ascii = normalize_domain(domain)?;
    let resolver = system_resolver(DEFAULT_DNS_TIMEOUT)?;
    resolve_with(&resolver, &ascii)
}

/// Builds a blocking resolver from the system configuration, with every
/// query bounded by `timeout`.
pub fn system_resolver(timeout: Duration) -> Result<Resolver, Error> {
    let (config, mut opts) = system_conf::read_system_conf().map_err(Error::resolver_init)?;
    opts.timeout = timeout;
    opts.attempts = 1;
    Resolver::new(config, opts).map_err(Error::resolver_init)
}

pub(crate) fn resolve_with<R>(resolver: &R, ascii_domain: &str) -> Result<Vec<MxRecord>, Error>
where
    R: LookupMx + ?Sized,
{
    let mut records = resolver
        .lookup_mx(ascii_domain)
        .map_err(|err| Error::lookup(ascii_domain, err))?;

    records.retain(|record| !record.is_null());
    records.sort();
    records.dedup();

    if records.is_empty() {
        return Err(Error::no_records(ascii_domain));
    }
    debug!(
        domain = ascii_domain,
        count = records.len(),
        primary = %records[0].exchange,
        "MX records resolved"
    );
    Ok(records)
}

pub(crate) fn normalize_domain(domain: &str) -> Result<String, Error> {
    let trimmed = domain.trim();
    if trimmed.is_empty() {
        return Err(Error::EmptyDomain);
    }
    idna::domain_to_ascii(trimmed).map_err(Error::idna)
}

pub(crate) fn normalize_exchange(exchange: String) -> String {
    let trimmed = exchange.trim_end_matches('.');
    trimmed.to_ascii_lowercase()
}

/// Source of MX answers. Implemented for the trust-dns blocking resolver;
/// tests and embedders can plug their own.
pub trait LookupMx {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError>;
}

impl LookupMx for Resolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError> {
        let lookup = Resolver::mx_lookup(self, domain)?;
        let mut records = Vec::new();
        for mx in lookup.iter() {
            let exchange = normalize_exchange(mx.exchange().to_utf8());
            records.push(MxRecord::new(mx.preference(), exchange));
        }
        Ok(records)
    }
}

#[cfg(test)]
impl LookupMx for crate::mx::tests::StubResolver {
    fn lookup_mx(&self, domain: &str) -> Result<Vec<MxRecord>, ResolveError> {
        (self.on_lookup)(domain)
    }
}
