//! Static-list credential source
//!
//! Parses the USER_LIST configuration string once at startup into an
//! immutable list of records. Entry forms:
//! - `username:password`                     (role defaults)
//! - `username:password:role`
//! - `username:password:displayName:role`

use async_trait::async_trait;

use super::{CredentialSource, UserRecord, DEFAULT_ROLE};
use crate::types::GatewayError;

pub struct StaticListSource {
    users: Vec<UserRecord>,
}

impl StaticListSource {
    /// Parse a comma-separated USER_LIST string
    ///
    /// Empty entries are skipped; an entry with a missing username or
    /// password, or with more than four fields, is a configuration error.
    pub fn parse(list: &str) -> Result<Self, GatewayError> {
        let mut users = Vec::new();

        for entry in list.split(',') {
            let entry = entry.trim();
            if entry.is_empty() {
                continue;
            }

            let fields: Vec<&str> = entry.split(':').collect();
            let record = match fields.as_slice() {
                &[username, password] => make_record(username, password, None, None),
                &[username, password, role] => make_record(username, password, None, Some(role)),
                &[username, password, display, role] => {
                    make_record(username, password, Some(display), Some(role))
                }
                _ => None,
            };

            match record {
                Some(r) => users.push(r),
                None => {
                    return Err(GatewayError::Config(format!(
                        "Invalid USER_LIST entry: {entry:?} (expected user:pass[:displayName]:role)"
                    )))
                }
            }
        }

        Ok(Self { users })
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

fn make_record(
    username: &str,
    password: &str,
    display: Option<&str>,
    role: Option<&str>,
) -> Option<UserRecord> {
    if username.is_empty() || password.is_empty() {
        return None;
    }

    Some(UserRecord {
        username: username.to_string(),
        password: password.to_string(),
        display_name: display
            .filter(|d| !d.is_empty())
            .unwrap_or(username)
            .to_string(),
        role: role
            .filter(|r| !r.is_empty())
            .unwrap_or(DEFAULT_ROLE)
            .to_string(),
    })
}

#[async_trait]
impl CredentialSource for StaticListSource {
    async fn lookup(&self, username: &str) -> Result<Option<UserRecord>, GatewayError> {
        Ok(self
            .users
            .iter()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<UserRecord>, GatewayError> {
        Ok(self.users.clone())
    }

    fn name(&self) -> &'static str {
        "static-list"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entry_forms() {
        let src =
            StaticListSource::parse("a:pw,b:pw:admin,c:pw:Charlie Day:security").unwrap();
        assert_eq!(src.len(), 3);

        assert_eq!(src.users[0].role, DEFAULT_ROLE);
        assert_eq!(src.users[0].display_name, "a");

        assert_eq!(src.users[1].role, "admin");
        assert_eq!(src.users[1].display_name, "b");

        assert_eq!(src.users[2].role, "security");
        assert_eq!(src.users[2].display_name, "Charlie Day");
    }

    #[test]
    fn test_parse_skips_empty_entries() {
        let src = StaticListSource::parse("a:pw:admin,, ,b:pw:security,").unwrap();
        assert_eq!(src.len(), 2);
    }

    #[test]
    fn test_parse_rejects_malformed_entries() {
        assert!(StaticListSource::parse("justausername").is_err());
        assert!(StaticListSource::parse(":pw:admin").is_err());
        assert!(StaticListSource::parse("a:b:c:d:e").is_err());
    }

    #[test]
    fn test_lookup_case_insensitive() {
        let src = StaticListSource::parse("admin:admin123:admin").unwrap();

        tokio_test::block_on(async {
            let found = src.lookup("ADMIN").await.unwrap();
            assert_eq!(found.unwrap().username, "admin");

            let missing = src.lookup("other").await.unwrap();
            assert!(missing.is_none());
        });
    }

    #[test]
    fn test_list_returns_all_users() {
        let src =
            StaticListSource::parse("admin:admin123:admin,security:pass123:security").unwrap();

        tokio_test::block_on(async {
            let all = src.list().await.unwrap();
            assert_eq!(all.len(), 2);
            assert_eq!(all[1].username, "security");
        });
    }
}
