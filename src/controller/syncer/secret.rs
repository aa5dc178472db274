use super::{merge_labels, Syncer};
use crate::constants::{SALT_KEYS, SALT_LENGTH};
use crate::controller::error::SyncError;
use crate::controller::identity::{Component, ObjectKey};
use crate::controller::resolver::EffectiveSpec;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::ByteString;
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Site secret with the WordPress salts
///
/// Missing salts are generated; present ones are never rotated.
#[derive(Debug)]
pub struct SecretSyncer {
    spec: Arc<EffectiveSpec>,
}

impl SecretSyncer {
    pub fn new(spec: Arc<EffectiveSpec>) -> Self {
        Self { spec }
    }
}

fn random_salt() -> ByteString {
    let salt: String = thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SALT_LENGTH)
        .map(char::from)
        .collect();
    ByteString(salt.into_bytes())
}

impl Syncer for SecretSyncer {
    type Object = Secret;

    fn key(&self) -> ObjectKey {
        self.spec.component_key(Component::Secret)
    }

    fn transform(&self, mut existing: Secret) -> Result<Secret, SyncError> {
        merge_labels(
            &mut existing.metadata,
            self.spec.component_labels(Component::Secret),
        );
        let data = existing.data.get_or_insert_with(BTreeMap::new);
        for key in SALT_KEYS {
            data.entry(key.to_string()).or_insert_with(random_salt);
        }
        Ok(existing)
    }
}
