use thiserror::Error;

#[derive(Debug, Error)]
pub enum MxError {
    #[error("domain is empty")]
    EmptyDomain,
    #[error("domain IDNA conversion failed")]
    IdnaConversion {
        #[source]
        source: idna::Errors,
    },
    #[error("resolver initialization failed: {source}")]
    ResolverInit {
        #[source]
        source: std::io::Error,
    },
    #[error("domain {domain} does not exist")]
    NonexistentDomain { domain: String },
    #[error("no mail exchanger published for {domain}")]
    NoRecords { domain: String },
    #[error("MX lookup for {domain} timed out")]
    Timeout { domain: String },
    #[error("MX lookup failed: {source}")]
    Lookup {
        #[source]
        source: trust_dns_resolver::error::ResolveError,
    },
}

impl MxError {
    pub(crate) fn idna(source: idna::Errors) -> Self {
        Self::IdnaConversion { source }
    }

    pub(crate) fn resolver_init(source: std::io::Error) -> Self {
        Self::ResolverInit { source }
    }

    pub(crate) fn no_records(domain: &str) -> Self {
        Self::NoRecords {
            domain: domain.to_string(),
        }
    }

    pub(crate) fn lookup(domain: &str, source: trust_dns_resolver::error::ResolveError) -> Self {
        use trust_dns_resolver::error::ResolveErrorKind;
        use trust_dns_resolver::proto::op::ResponseCode;

        let classified = match source.kind() {
            ResolveErrorKind::NoRecordsFound { response_code, .. }
                if *response_code == ResponseCode::NXDomain =>
            {
                Some(Self::NonexistentDomain {
                    domain: domain.to_string(),
                })
            }
            ResolveErrorKind::NoRecordsFound { .. } => Some(Self::no_records(domain)),
            ResolveErrorKind::Timeout => Some(Self::Timeout {
                domain: domain.to_string(),
            }),
            _ => None,
        };
        classified.unwrap_or_else(|| Self::Lookup { source })
    }
}
