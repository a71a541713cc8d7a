//! Assigning-authority domains
//!
//! An identifier is only meaningful inside an identity domain, named by
//! a namespace code and/or a universal id (OID). Fixtures may carry
//! either half; both sides of a comparison are normalized to one
//! canonical key before being matched.

use serde::Deserialize;

/// OID of the primary OHIE test domain (namespace TEST)
pub const TEST_DOMAIN_OID: &str = "2.16.840.1.113883.3.72.5.9.1";
/// OID of the first sub-authority domain (namespace TEST_A)
pub const TEST_A_DOMAIN_OID: &str = "2.16.840.1.113883.3.72.5.9.2";
/// OID of the second sub-authority domain (namespace TEST_B)
pub const TEST_B_DOMAIN_OID: &str = "2.16.840.1.113883.3.72.5.9.3";
/// OID of the national-identifier domain (namespace NID)
pub const NID_DOMAIN_OID: &str = "2.16.840.1.113883.3.72.5.9.9";

/// An identity domain: (namespace, universal id) pair
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Domain {
    pub namespace: String,
    pub universal_id: String,
}

impl Domain {
    pub fn new(namespace: &str, universal_id: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            universal_id: universal_id.to_string(),
        }
    }
}

/// The set of domains the harness can resolve partial designators against
#[derive(Debug, Clone)]
pub struct DomainTable {
    domains: Vec<Domain>,
}

impl Default for DomainTable {
    fn default() -> Self {
        Self {
            domains: vec![
                Domain::new("TEST", TEST_DOMAIN_OID),
                Domain::new("TEST_A", TEST_A_DOMAIN_OID),
                Domain::new("TEST_B", TEST_B_DOMAIN_OID),
                Domain::new("NID", NID_DOMAIN_OID),
            ],
        }
    }
}

impl DomainTable {
    pub fn push(&mut self, domain: Domain) {
        self.domains.push(domain);
    }

    pub fn domains(&self) -> &[Domain] {
        &self.domains
    }

    pub fn by_namespace(&self, namespace: &str) -> Option<&Domain> {
        self.domains.iter().find(|d| d.namespace == namespace)
    }

    pub fn by_universal_id(&self, universal_id: &str) -> Option<&Domain> {
        self.domains.iter().find(|d| d.universal_id == universal_id)
    }

    /// Canonical key for a possibly-partial authority designator
    ///
    /// A designator resolves through the table by universal id first,
    /// then by namespace; either half alone identifies the domain. A
    /// designator naming no known domain still keys on its raw values
    /// (a bare namespace is prefixed so it can never alias an OID).
    /// Returns None when both halves are absent — an identifier without
    /// any authority is not in any domain.
    pub fn key(&self, namespace: &str, universal_id: &str) -> Option<String> {
        if !universal_id.is_empty() {
            if let Some(domain) = self.by_universal_id(universal_id) {
                return Some(domain.universal_id.clone());
            }
        }
        if !namespace.is_empty() {
            if let Some(domain) = self.by_namespace(namespace) {
                return Some(domain.universal_id.clone());
            }
        }
        if !universal_id.is_empty() {
            return Some(universal_id.to_string());
        }
        if !namespace.is_empty() {
            return Some(format!("ns:{namespace}"));
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_designators_resolve_to_same_key() {
        let table = DomainTable::default();
        let by_ns = table.key("TEST", "");
        let by_oid = table.key("", TEST_DOMAIN_OID);
        let by_both = table.key("TEST", TEST_DOMAIN_OID);
        assert_eq!(by_ns, Some(TEST_DOMAIN_OID.to_string()));
        assert_eq!(by_ns, by_oid);
        assert_eq!(by_ns, by_both);
    }

    #[test]
    fn test_distinct_domains_never_collide() {
        let table = DomainTable::default();
        assert_ne!(table.key("TEST", ""), table.key("TEST_A", ""));
        assert_ne!(
            table.key("", TEST_DOMAIN_OID),
            table.key("", TEST_A_DOMAIN_OID)
        );
    }

    #[test]
    fn test_absent_designator_is_no_domain() {
        let table = DomainTable::default();
        assert_eq!(table.key("", ""), None);
    }

    #[test]
    fn test_unknown_designator_keys_on_raw_value() {
        let table = DomainTable::default();
        assert_eq!(table.key("", "2.999.1"), Some("2.999.1".to_string()));
        assert_eq!(table.key("FOOBAR", ""), Some("ns:FOOBAR".to_string()));
        // an unknown namespace cannot alias an OID value
        assert_ne!(table.key("2.999.1", ""), table.key("", "2.999.1"));
    }

    #[test]
    fn test_config_extension() {
        let mut table = DomainTable::default();
        table.push(Domain::new("LOCAL", "2.16.840.1.113883.3.72.5.9.100"));
        assert_eq!(
            table.key("LOCAL", ""),
            Some("2.16.840.1.113883.3.72.5.9.100".to_string())
        );
    }
}
