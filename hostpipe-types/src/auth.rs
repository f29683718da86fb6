use std::collections::{BTreeMap, HashMap};

use base64::prelude::{Engine as _, BASE64_STANDARD};

/// Header selecting the logical database that receives the metrics.
pub const DATABASE_HEADER: &str = "x-greptime-db-name";

/// Standard HTTP authorization header.
pub const AUTHORIZATION_HEADER: &str = "Authorization";

/// Controls when the `Authorization` header is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AuthPolicy {
    /// Emit basic auth only when both username and password are non-empty.
    #[default]
    RequireBothCredentials,
    /// Always emit basic auth with whatever values are present, including
    /// both empty (which encodes `":"`).
    AlwaysEmit,
}

/// The static header set sent with every export request.
///
/// Always contains the database selector; contains basic auth per the
/// configured [`AuthPolicy`]. Ordered internally so that building the same
/// inputs twice yields identical sets.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HeaderSet {
    headers: BTreeMap<String, String>,
}

impl HeaderSet {
    /// Builds the header set for the given database and credentials.
    ///
    /// The database value is passed through verbatim; an empty string is
    /// accepted.
    pub fn build(db: &str, username: &str, password: &str, policy: AuthPolicy) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert(DATABASE_HEADER.to_owned(), db.to_owned());

        let emit_auth = match policy {
            AuthPolicy::RequireBothCredentials => !username.is_empty() && !password.is_empty(),
            AuthPolicy::AlwaysEmit => true,
        };
        if emit_auth {
            headers.insert(
                AUTHORIZATION_HEADER.to_owned(),
                basic_auth(username, password),
            );
        }

        HeaderSet { headers }
    }

    /// Returns the value for a header, if set.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|value| value.as_str())
    }

    /// Iterates over the headers in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Number of headers in the set.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Copies the headers into the unordered map shape the exporter wants.
    pub fn to_map(&self) -> HashMap<String, String> {
        self.headers
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }
}

fn basic_auth(username: &str, password: &str) -> String {
    format!(
        "Basic {}",
        BASE64_STANDARD.encode(format!("{username}:{password}"))
    )
}

#[cfg(test)]
mod test {
    use super::*;

    fn decoded_auth(headers: &HeaderSet) -> String {
        let value = headers.get(AUTHORIZATION_HEADER).unwrap();
        let encoded = value.strip_prefix("Basic ").unwrap();
        String::from_utf8(BASE64_STANDARD.decode(encoded).unwrap()).unwrap()
    }

    #[test]
    fn test_database_header_always_present() {
        let headers = HeaderSet::build("public", "", "", AuthPolicy::default());
        assert_eq!(headers.get(DATABASE_HEADER), Some("public"));

        // Empty database names pass through unvalidated.
        let headers = HeaderSet::build("", "", "", AuthPolicy::default());
        assert_eq!(headers.get(DATABASE_HEADER), Some(""));
    }

    #[test]
    fn test_strict_policy_omits_partial_credentials() {
        for (user, pass) in [("", ""), ("u", ""), ("", "p")] {
            let headers = HeaderSet::build("public", user, pass, AuthPolicy::RequireBothCredentials);
            assert_eq!(headers.get(AUTHORIZATION_HEADER), None);
            assert_eq!(headers.len(), 1);
        }
    }

    #[test]
    fn test_strict_policy_encodes_full_credentials() {
        let headers = HeaderSet::build("t", "u", "p", AuthPolicy::RequireBothCredentials);
        assert_eq!(decoded_auth(&headers), "u:p");
    }

    #[test]
    fn test_permissive_policy_always_emits() {
        let headers = HeaderSet::build("public", "", "", AuthPolicy::AlwaysEmit);
        assert_eq!(decoded_auth(&headers), ":");

        let headers = HeaderSet::build("public", "a", "b", AuthPolicy::AlwaysEmit);
        assert_eq!(decoded_auth(&headers), "a:b");
    }

    #[test]
    fn test_building_is_idempotent() {
        let first = HeaderSet::build("public", "a", "b", AuthPolicy::default());
        let second = HeaderSet::build("public", "a", "b", AuthPolicy::default());
        assert_eq!(first, second);
        assert_eq!(first.to_map(), second.to_map());
    }
}
