/// One mail exchanger. Ordering is by `preference` first (lower is tried
/// first, RFC 5321 §5.1), then by name.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: String,
}

impl MxRecord {
    pub fn new(preference: u16, exchange: impl Into<String>) -> Self {
        Self {
            preference,
            exchange: exchange.into(),
        }
    }

    /// RFC 7505 null MX: the domain explicitly accepts no mail.
    pub fn is_null(&self) -> bool {
        self.exchange.is_empty()
    }
}
