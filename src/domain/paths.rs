//! Name scrubbing, department-path normalisation and rewrite rules.

use regex::Regex;
use tracing::error;

// The group/user endpoints reject these glyphs outright.
const REJECTED_CHARS: [char; 9] = ['(', ')', '{', '}', '`', '_', '\u{00B4}', '\u{201C}', '\u{201D}'];

/// Strip characters the API refuses and trim surrounding whitespace.
pub fn clean_name(name: &str) -> String {
    name.chars().filter(|ch| !REJECTED_CHARS.contains(ch)).collect::<String>().trim().to_string()
}

/// Normalise a slash-separated path and strip configured prefixes.
///
/// Each comma-separated entry in `skip_departments` names a prefix; a match
/// requires exact equality on whole leading components, so `Company` strips
/// `Company/X` but never `CompanyOps`. The first matching prefix wins, and a
/// path equal to a prefix collapses to the empty string.
pub fn clean_department_path(path: &str, skip_departments: &str) -> String {
    let parts: Vec<&str> =
        path.split('/').map(str::trim).filter(|part| !part.is_empty()).collect();
    let normalized = parts.join("/");

    let skip = skip_departments.trim();
    if skip.is_empty() {
        return normalized;
    }

    for prefix in skip.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        if normalized == prefix {
            return String::new();
        }
        let skip_parts: Vec<&str> = prefix.split('/').collect();
        if parts.len() >= skip_parts.len()
            && parts.iter().zip(&skip_parts).all(|(a, b)| a == b)
        {
            return parts[skip_parts.len()..].join("/");
        }
    }

    normalized
}

/// Replace the domain portion of an email (everything after the final `@`).
///
/// The new domain may be given with or without a leading `@`. Strings
/// without exactly one `@` are returned unchanged.
pub fn replace_email_domain(email: &str, new_domain: &str) -> String {
    if new_domain.is_empty() || email.is_empty() {
        return email.to_string();
    }

    let domain = new_domain.strip_prefix('@').unwrap_or(new_domain);
    match email.split_once('@') {
        Some((local, rest)) if !rest.contains('@') => format!("{local}@{domain}"),
        _ => email.to_string(),
    }
}

/// Compiled `pattern|||replacement` rules, applied sequentially to every
/// group breadcrumb.
#[derive(Debug, Default)]
pub struct GroupRenameRules {
    rules: Vec<(Regex, String)>,
}

impl GroupRenameRules {
    /// Parse rules separated by `;;;`. Invalid patterns are logged and
    /// skipped so one bad rule never sinks the run.
    pub fn parse(raw: &str) -> Self {
        let mut rules = Vec::new();
        for rule in raw.split(";;;") {
            let rule = rule.trim();
            if rule.is_empty() {
                continue;
            }
            let Some((pattern, replacement)) = rule.split_once("|||") else {
                error!("Invalid group rename rule '{rule}': missing '|||' separator");
                continue;
            };
            match Regex::new(pattern) {
                Ok(regex) => rules.push((regex, replacement.to_string())),
                Err(err) => error!("Invalid regex in group rename rule '{rule}': {err}"),
            }
        }
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn apply(&self, breadcrumb: &str) -> String {
        let mut current = breadcrumb.to_string();
        for (regex, replacement) in &self.rules {
            current = regex.replace_all(&current, replacement.as_str()).into_owned();
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_name_strips_rejected_glyphs() {
        assert_eq!(clean_name("Ann (Ops) {x}_`team´"), "Ann Ops xteam");
        assert_eq!(clean_name("  plain  "), "plain");
        assert_eq!(clean_name(""), "");
    }

    #[test]
    fn department_path_normalises_segments() {
        assert_eq!(clean_department_path(" A / B //C ", ""), "A/B/C");
        assert_eq!(clean_department_path("", ""), "");
    }

    #[test]
    fn department_path_cleaning_is_idempotent() {
        let once = clean_department_path("Company/ X /Y", "Company");
        let twice = clean_department_path(&once, "Company");
        assert_eq!(once, twice);
    }

    #[test]
    fn skip_prefix_matches_whole_components_only() {
        assert_eq!(clean_department_path("Company/X", "Company"), "X");
        assert_eq!(clean_department_path("CompanyOps/X", "Company"), "CompanyOps/X");
        assert_eq!(clean_department_path("Company", "Company"), "");
        assert_eq!(clean_department_path("B/X/Y", "A,B"), "X/Y");
        assert_eq!(clean_department_path("Bar/X", "A,B"), "Bar/X");
    }

    #[test]
    fn multi_component_prefix_strips_in_order() {
        assert_eq!(clean_department_path("Corp/EU/Sales", "Corp/EU"), "Sales");
        assert_eq!(clean_department_path("Corp/US/Sales", "Corp/EU,Corp"), "US/Sales");
    }

    #[test]
    fn email_domain_replacement() {
        assert_eq!(replace_email_domain("a@old.com", "new.com"), "a@new.com");
        assert_eq!(replace_email_domain("a@old.com", "@new.com"), "a@new.com");
        assert_eq!(replace_email_domain("not-an-email", "new.com"), "not-an-email");
        assert_eq!(replace_email_domain("", "new.com"), "");
        let once = replace_email_domain("a@old.com", "new.com");
        assert_eq!(replace_email_domain(&once, "new.com"), once);
    }

    #[test]
    fn rename_rules_apply_sequentially() {
        let rules = GroupRenameRules::parse("Engineering|||Eng;;;Eng/Web|||Web");
        assert_eq!(rules.apply("Engineering/Web/Alice"), "Web/Alice");
    }

    #[test]
    fn invalid_rule_is_skipped() {
        let rules = GroupRenameRules::parse("[invalid|||x;;;Sales|||Revenue");
        assert_eq!(rules.apply("Sales/EMEA"), "Revenue/EMEA");
    }

    #[test]
    fn empty_replacement_may_collapse_segments() {
        let rules = GroupRenameRules::parse("Engineering/|||");
        assert_eq!(rules.apply("Engineering/Web"), "Web");
    }
}
