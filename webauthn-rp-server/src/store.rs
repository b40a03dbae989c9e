//! Where users, their registered devices and their outstanding challenges live.
//!
//! In production this would be a database. The in memory store is lost on restart.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;
use webauthn_rp_core::proto::{Base64UrlSafeData, Credential, CredentialID};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user {0} does not exist")]
    UnknownUser(String),
    #[error("credential is not registered to user {0}")]
    UnknownCredential(String),
}

/// A user and everything the ceremonies need to know about them.
#[derive(Debug, Clone, Serialize)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub devices: Vec<Credential>,
    pub current_challenge: Option<Base64UrlSafeData>,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get_user(&self, user_name: &str) -> Option<UserRecord>;

    /// Fetch a user, creating them with a fresh random id if they don't exist yet.
    async fn get_or_create_user(&self, user_name: &str) -> UserRecord;

    async fn add_device(&self, user_name: &str, credential: Credential) -> Result<(), StoreError>;

    /// Record a new signature counter. The stored counter only ever moves forward, so
    /// a stale or replayed value is ignored. Returns whether the counter changed.
    async fn update_counter(
        &self,
        user_name: &str,
        cred_id: &CredentialID,
        counter: u32,
    ) -> Result<bool, StoreError>;

    async fn set_challenge(
        &self,
        user_name: &str,
        challenge: Option<Base64UrlSafeData>,
    ) -> Result<(), StoreError>;

    /// Remove and return the outstanding challenge. A challenge is handed out at most once.
    async fn take_challenge(
        &self,
        user_name: &str,
    ) -> Result<Option<Base64UrlSafeData>, StoreError>;

    async fn users(&self) -> Vec<UserRecord>;
}

#[derive(Debug, Default)]
pub struct InMemoryStore {
    users: Mutex<BTreeMap<String, UserRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryStore {
    async fn get_user(&self, user_name: &str) -> Option<UserRecord> {
        self.users.lock().await.get(user_name).cloned()
    }

    async fn get_or_create_user(&self, user_name: &str) -> UserRecord {
        let mut users = self.users.lock().await;
        users
            .entry(user_name.to_string())
            .or_insert_with(|| {
                debug!(%user_name, "creating user");
                UserRecord {
                    id: Uuid::new_v4(),
                    name: user_name.to_string(),
                    devices: Vec::new(),
                    current_challenge: None,
                }
            })
            .clone()
    }

    async fn add_device(&self, user_name: &str, credential: Credential) -> Result<(), StoreError> {
        let mut users = self.users.lock().await;
        let user = users
            .get_mut(user_name)
            .ok_or_else(|| StoreError::UnknownUser(user_name.to_string()))?;

        // Re-registering the same credential replaces it.
        user.devices.retain(|d| d.cred_id != credential.cred_id);
        user.devices.push(credential);
        Ok(())
    }

    async fn update_counter(
        &self,
        user_name: &str,
        cred_id: &CredentialID,
        counter: u32,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.lock().await;
        let device = users
            .get_mut(user_name)
            .ok_or_else(|| StoreError::UnknownUser(user_name.to_string()))?
            .devices
            .iter_mut()
            .find(|d| &d.cred_id == cred_id)
            .ok_or_else(|| StoreError::UnknownCredential(user_name.to_string()))?;

        if counter > device.counter {
            device.counter = counter;
            Ok(true)
        } else {
            debug!(%user_name, stored = device.counter, counter, "ignoring stale counter");
            Ok(false)
        }
    }

    async fn set_challenge(
        &self,
        user_name: &str,
        challenge: Option<Base64UrlSafeData>,
    ) -> Result<(), StoreError> {
        let mut users = self.users.lock().await;
        let user = users
            .get_mut(user_name)
            .ok_or_else(|| StoreError::UnknownUser(user_name.to_string()))?;
        user.current_challenge = challenge;
        Ok(())
    }

    async fn take_challenge(
        &self,
        user_name: &str,
    ) -> Result<Option<Base64UrlSafeData>, StoreError> {
        let mut users = self.users.lock().await;
        let user = users
            .get_mut(user_name)
            .ok_or_else(|| StoreError::UnknownUser(user_name.to_string()))?;
        Ok(user.current_challenge.take())
    }

    async fn users(&self) -> Vec<UserRecord> {
        self.users.lock().await.values().cloned().collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use webauthn_rp_core::proto::{COSEAlgorithm, COSEEC2Key, COSEKey, COSEKeyType, ECDSACurve};
    use webauthn_rp_core::AttestationFormat;

    fn credential(id: &[u8]) -> Credential {
        Credential {
            cred_id: id.into(),
            cred: COSEKey {
                type_: COSEAlgorithm::ES256,
                key: COSEKeyType::EC_EC2(COSEEC2Key {
                    curve: ECDSACurve::SECP256R1,
                    x: vec![1; 32].into(),
                    y: vec![2; 32].into(),
                }),
            },
            counter: 0,
            transports: None,
            user_verified: false,
            aaguid: Uuid::nil(),
            attestation_format: AttestationFormat::None,
        }
    }

    #[tokio::test]
    async fn user_lifecycle() {
        let store = InMemoryStore::new();
        assert!(store.get_user("alice").await.is_none());

        let created = store.get_or_create_user("alice").await;
        let again = store.get_or_create_user("alice").await;
        assert_eq!(created.id, again.id);

        store
            .set_challenge("alice", Some(vec![1; 32].into()))
            .await
            .unwrap();
        assert!(store
            .get_user("alice")
            .await
            .unwrap()
            .current_challenge
            .is_some());

        store.set_challenge("alice", None).await.unwrap();
        assert!(store
            .get_user("alice")
            .await
            .unwrap()
            .current_challenge
            .is_none());

        assert!(matches!(
            store.take_challenge("mallory").await,
            Err(StoreError::UnknownUser(_))
        ));
    }

    #[tokio::test]
    async fn challenge_is_taken_once() {
        let store = std::sync::Arc::new(InMemoryStore::new());
        store.get_or_create_user("carol").await;
        store
            .set_challenge("carol", Some(vec![3; 32].into()))
            .await
            .unwrap();

        let (a, b) = tokio::join!(store.take_challenge("carol"), store.take_challenge("carol"));
        let taken: Vec<_> = [a.unwrap(), b.unwrap()].into_iter().flatten().collect();
        assert_eq!(taken, vec![Base64UrlSafeData::from(vec![3; 32])]);

        assert!(store.take_challenge("carol").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn devices_and_counters() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.add_device("bob", credential(&[1])).await,
            Err(StoreError::UnknownUser(_))
        ));

        store.get_or_create_user("bob").await;
        store.add_device("bob", credential(&[1])).await.unwrap();
        store.add_device("bob", credential(&[2])).await.unwrap();
        store.add_device("bob", credential(&[1])).await.unwrap();
        assert_eq!(store.get_user("bob").await.unwrap().devices.len(), 2);

        assert!(store.update_counter("bob", &vec![2u8].into(), 7).await.unwrap());
        // An assertion verified against an older snapshot must not move the counter back.
        assert!(!store.update_counter("bob", &vec![2u8].into(), 6).await.unwrap());
        assert!(!store.update_counter("bob", &vec![2u8].into(), 7).await.unwrap());
        let bob = store.get_user("bob").await.unwrap();
        let device = bob.devices.iter().find(|d| d.cred_id.as_ref() == &[2u8]).unwrap();
        assert_eq!(device.counter, 7);

        assert!(matches!(
            store.update_counter("bob", &vec![9u8].into(), 1).await,
            Err(StoreError::UnknownCredential(_))
        ));
        assert_eq!(store.users().await.len(), 1);
    }
}
