//! Account queries and the SQLite credential store

use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use super::Database;
use crate::auth::{CredentialRecord, CredentialStore, NewAccount};
use crate::types::{StoreError, UserResponse};

const USER_COLUMNS: &str = "id, first_name, last_name, email, is_2fa";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserResponse> {
    Ok(UserResponse {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        second_factor: row.get(4)?,
    })
}

impl Database {
    /// All accounts, oldest first
    pub fn list_users(&self) -> Result<Vec<UserResponse>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM users ORDER BY created, email",
                USER_COLUMNS
            ))?;
            let users = stmt
                .query_map([], user_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(users)
        })
    }

    pub fn find_user_by_id(&self, id: &Uuid) -> Result<Option<UserResponse>, StoreError> {
        debug!(user_id = %id, "Finding user");
        self.with_conn(|conn| {
            let user = conn
                .query_row(
                    &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                    params![id.to_string()],
                    user_from_row,
                )
                .optional()?;
            Ok(user)
        })
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<UserResponse>, StoreError> {
        debug!(email = %email, "Finding user");
        self.with_conn(|conn| {
            let user = conn
                .query_row(
                    &format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS),
                    params![email],
                    user_from_row,
                )
                .optional()?;
            Ok(user)
        })
    }

    /// Delete an account; `NotFound` if no row matched
    pub fn delete_user(&self, id: &Uuid) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let deleted = conn.execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
            if deleted == 0 {
                return Err(StoreError::NotFound(format!("user {}", id)));
            }
            Ok(())
        })
    }
}

impl CredentialStore for Database {
    fn find_by_identity(&self, identity: &str) -> Result<Option<CredentialRecord>, StoreError> {
        self.with_conn(|conn| {
            let record = conn
                .query_row(
                    "SELECT id, email, password, is_2fa FROM users WHERE email = ?1",
                    params![identity],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, bool>(3)?,
                        ))
                    },
                )
                .optional()?;

            record
                .map(|(id, identity, password_hash, second_factor)| {
                    let id = Uuid::parse_str(&id)
                        .map_err(|e| StoreError::Storage(format!("Corrupt user id: {}", e)))?;
                    Ok(CredentialRecord {
                        id,
                        identity,
                        password_hash,
                        second_factor,
                    })
                })
                .transpose()
        })
    }

    fn insert(&self, account: NewAccount) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, first_name, last_name, email, password, is_2fa, created)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    id.to_string(),
                    account.first_name,
                    account.last_name,
                    account.email,
                    account.password_hash,
                    account.second_factor,
                    Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(id)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(email: &str) -> NewAccount {
        NewAccount {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: email.into(),
            password_hash: "$argon2id$v=19$stub".into(),
            second_factor: true,
        }
    }

    #[test]
    fn test_insert_and_lookup() {
        let db = Database::open_in_memory().unwrap();
        let id = db.insert(account("a@x.com")).unwrap();

        let record = db.find_by_identity("a@x.com").unwrap().unwrap();
        assert_eq!(record.id, id);
        assert_eq!(record.password_hash, "$argon2id$v=19$stub");
        assert!(record.second_factor);

        let user = db.find_user_by_id(&id).unwrap().unwrap();
        assert_eq!(user.email, "a@x.com");
        assert_eq!(db.find_user_by_email("a@x.com").unwrap(), Some(user));

        assert!(db.find_by_identity("nobody@x.com").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_email() {
        let db = Database::open_in_memory().unwrap();
        db.insert(account("a@x.com")).unwrap();
        assert!(matches!(
            db.insert(account("a@x.com")),
            Err(StoreError::Duplicate(_))
        ));
    }

    #[test]
    fn test_list_and_delete() {
        let db = Database::open_in_memory().unwrap();
        let a = db.insert(account("a@x.com")).unwrap();
        db.insert(account("b@x.com")).unwrap();
        assert_eq!(db.list_users().unwrap().len(), 2);

        db.delete_user(&a).unwrap();
        assert_eq!(db.list_users().unwrap().len(), 1);
        assert!(matches!(db.delete_user(&a), Err(StoreError::NotFound(_))));
    }
}
