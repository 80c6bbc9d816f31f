//! Search filter construction
//!
//! Patterns supplied by callers are escaped before they are spliced into a
//! filter, with the `*` wildcard left usable so glob-style lookups still work.

use dirq_core::{Error, Result, IS_MEMBER_OF_ATTR, MEMBER_OF_ATTR};
use ldap3::ldap_escape;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static ATTR_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+=)").expect("valid regex"));

/// Escape filter metacharacters in a caller-supplied pattern.
///
/// `\ * ( ) NUL` become `\5c \2a \28 \29 \00`. The wildcard is then restored
/// and an escaped comma (`\,`, which escaping turns into `\5c,`) is rewritten
/// as `\2c`.
pub fn sanitize_pattern(pattern: &str) -> String {
    ldap_escape(pattern)
        .replace(r"\2a", "*")
        .replace(r"\5c,", r"\2c")
}

/// Wrap a filter in parentheses unless it already starts with one
pub fn wrap_filter(filter: &str) -> String {
    if filter.starts_with('(') {
        filter.to_string()
    } else {
        format!("({})", filter)
    }
}

/// Resolve the search base and the name filter fragment.
///
/// With `find_by_dn` the identifier itself becomes the base: every `attr=`
/// token is uppercased and the result must sit under `base_dn`. Otherwise the
/// configured base is used with an `(attr=identifier)` fragment.
pub fn resolve_search_scope(
    base_dn: &str,
    identifier: &str,
    attribute: &str,
    find_by_dn: bool,
) -> Result<(String, String)> {
    if find_by_dn {
        let search_dn = ATTR_TOKEN
            .replace_all(identifier, |caps: &Captures| caps[0].to_uppercase())
            .into_owned();

        if !search_dn
            .to_uppercase()
            .ends_with(&base_dn.to_uppercase())
        {
            return Err(Error::ConfigMismatch {
                base_dn: base_dn.to_string(),
                dn: search_dn,
            });
        }

        Ok((search_dn, String::new()))
    } else {
        Ok((base_dn.to_string(), format!("({}={})", attribute, identifier)))
    }
}

/// `(&<entity_filter><name_filter>)`
pub fn and_filter(entity_filter: &str, name_filter: &str) -> String {
    format!("(&{}{})", entity_filter, name_filter)
}

/// Match entries that list `group_dn` in either membership attribute
pub fn member_of_filter(filter: &str, group_dn: &str) -> String {
    format!(
        "(&{filter}(|({is_member_of}={dn})({member_of}={dn})))",
        filter = filter,
        is_member_of = IS_MEMBER_OF_ATTR,
        member_of = MEMBER_OF_ATTR,
        dn = group_dn
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metacharacters_escaped_wildcard_kept() {
        assert_eq!(sanitize_pattern("al*"), "al*");
        assert_eq!(sanitize_pattern("a(b)c"), r"a\28b\29c");
        assert_eq!(sanitize_pattern(r"back\slash"), r"back\5cslash");
        assert_eq!(sanitize_pattern("nul\0"), r"nul\00");
        assert_eq!(sanitize_pattern("*)(uid=*"), r"*\29\28uid=*");
    }

    #[test]
    fn test_escaped_comma_normalized() {
        assert_eq!(
            sanitize_pattern(r"cn=Doe\, John,ou=people"),
            r"cn=Doe\2c John,ou=people"
        );
        // A plain comma is not touched
        assert_eq!(sanitize_pattern("a,b"), "a,b");
    }

    #[test]
    fn test_wrap_filter() {
        assert_eq!(wrap_filter("objectclass=*"), "(objectclass=*)");
        assert_eq!(wrap_filter("(objectClass=person)"), "(objectClass=person)");
    }

    #[test]
    fn test_resolve_by_attribute() {
        let (base, fragment) =
            resolve_search_scope("dc=example,dc=com", "al*", "uid", false).unwrap();
        assert_eq!(base, "dc=example,dc=com");
        assert_eq!(fragment, "(uid=al*)");
    }

    #[test]
    fn test_resolve_by_dn_uppercases_attribute_tokens() {
        let (base, fragment) = resolve_search_scope(
            "dc=example,dc=com",
            "uid=alice,ou=People,dc=Example,dc=com",
            "uid",
            true,
        )
        .unwrap();
        assert_eq!(base, "UID=alice,OU=People,DC=Example,DC=com");
        assert_eq!(fragment, "");
    }

    #[test]
    fn test_resolve_by_dn_outside_base_fails() {
        let err = resolve_search_scope(
            "dc=example,dc=com",
            "uid=mallory,dc=evil,dc=org",
            "uid",
            true,
        )
        .unwrap_err();

        match err {
            Error::ConfigMismatch { base_dn, dn } => {
                assert_eq!(base_dn, "dc=example,dc=com");
                assert_eq!(dn, "UID=mallory,DC=evil,DC=org");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_base_dn_check_is_a_plain_suffix_match() {
        // Existing behavior: the check compares uppercased strings, not RDN
        // boundaries, so any DN whose text ends in the base DN is accepted.
        let (base, _) = resolve_search_scope(
            "dc=example,dc=com",
            "cn=x,ou=corpdc=example,dc=com",
            "uid",
            true,
        )
        .unwrap();
        assert_eq!(base, "CN=x,OU=CORPDC=example,DC=com");

        // A differing RDN value does not end in the base text
        assert!(resolve_search_scope(
            "dc=example,dc=com",
            "uid=x,dc=notexample,dc=com",
            "uid",
            true
        )
        .is_err());
    }

    #[test]
    fn test_member_of_filter() {
        assert_eq!(
            member_of_filter("(objectclass=*)", "cn=admins,dc=example,dc=com"),
            "(&(objectclass=*)(|(isMemberOf=cn=admins,dc=example,dc=com)(memberOf=cn=admins,dc=example,dc=com)))"
        );
    }
}
