const MAX_DOMAIN_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Checks the domain after IDNA conversion and appends one reason per
/// broken rule. The domain must have at least two labels.
pub(crate) fn check_domain(domain: &str, reasons: &mut Vec<String>) {
    if domain.is_empty() {
        reasons.push("domain missing".into());
        return;
    }

    let Ok(ascii) = idna::domain_to_ascii(domain) else {
        reasons.push(format!("domain '{domain}' is not valid IDNA"));
        return;
    };
    if ascii.is_empty() {
        reasons.push("domain empty after IDNA conversion".into());
        return;
    }

    if ascii.len() > MAX_DOMAIN_LEN {
        reasons.push(format!("domain length {} > {MAX_DOMAIN_LEN}", ascii.len()));
    }
    if !ascii.contains('.') {
        reasons.push("domain must contain at least one dot".into());
    }
    reasons.extend(ascii.split('.').filter_map(label_problem));
}

fn label_problem(label: &str) -> Option<String> {
    if label.is_empty() {
        return Some("empty domain label".into());
    }
    if label.len() > MAX_LABEL_LEN {
        return Some(format!("label '{label}' longer than {MAX_LABEL_LEN}"));
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Some(format!("label '{label}' starts or ends with '-'"));
    }
    label
        .bytes()
        .any(|b| !(b.is_ascii_alphanumeric() || b == b'-'))
        .then(|| format!("label '{label}' has characters outside [a-z0-9-]"))
}
