mod domain;
mod local;
mod types;

pub use types::{ValidationMode, ValidationReport};

use domain::check_domain;
use local::{is_local_relaxed, is_local_strict};

/// Fast-fail gate used before any network work: `true` when `address` is a
/// structurally valid `local-part@domain` mailbox (RFC 5322 addr-spec,
/// quoted local parts allowed, dotted domain required).
pub fn is_valid_address(address: &str) -> bool {
    validate_email(address, ValidationMode::Relaxed).ok
}

pub fn validate_email(email: &str, mode: ValidationMode) -> ValidationReport {
    let input = email.trim();

    let mut reasons = Vec::new();

    if input.is_empty() {
        reasons.push("address is empty".to_string());
        return ValidationReport { ok: false, reasons };
    }

    if input.len() > 254 {
        reasons.push(format!("total length {} > 254", input.len()));
    }

    let Some((local, domain)) = split_address(input) else {
        reasons.push("must contain exactly one '@'".to_string());
        return ValidationReport { ok: false, reasons };
    };

    if local.is_empty() || local.len() > 64 {
        reasons.push(format!(
            "local part length {} invalid (1..=64)",
            local.len()
        ));
    }

    check_domain(domain, &mut reasons);

    let local_ok = match mode {
        ValidationMode::Strict => is_local_strict(local),
        ValidationMode::Relaxed => is_local_relaxed(local),
    };
    if !local_ok && !local.is_empty() {
        reasons.push(match mode {
            ValidationMode::Strict => "invalid local part (strict rules)".into(),
            ValidationMode::Relaxed => "invalid local part (relaxed rules)".into(),
        });
    }

    let ok = reasons.is_empty();
    ValidationReport { ok, reasons }
}

/// Splits `address` at its last `@`. An unquoted local part containing
/// another `@` is refused, so `a@@b.com` yields `None`.
pub fn split_address(address: &str) -> Option<(&str, &str)> {
    let (local, domain) = address.rsplit_once('@')?;
    let quoted = local.len() >= 2 && local.starts_with('"') && local.ends_with('"');
    if local.contains('@') && !quoted {
        return None;
    }
    Some((local, domain))
}
