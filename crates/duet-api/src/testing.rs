use std::sync::Arc;

use duet_crypto::{CredentialHasher, DEFAULT_TOKEN_TTL_SECS, TokenIssuer};
use duet_db::{Collection, Filter, MemoryStore, SharedStore, Store};

use crate::auth::{AppState, AppStateInner};
use crate::directory::UserDirectory;

pub const SECRET: &str = "test-secret";

pub fn count(store: &MemoryStore, collection: Collection) -> usize {
    store.find_many(collection, &Filter::All).unwrap().len()
}

pub fn directory() -> (UserDirectory, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let hasher = Arc::new(CredentialHasher::new().unwrap());
    (UserDirectory::new(store.clone(), hasher), store)
}

pub fn state() -> (AppState, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (state_with(store.clone()), store)
}

pub fn state_with<S: Store + 'static>(store: Arc<S>) -> AppState {
    let shared: SharedStore = store;
    let tokens = TokenIssuer::new(SECRET, DEFAULT_TOKEN_TTL_SECS);
    Arc::new(AppStateInner::new(shared, tokens).unwrap())
}
