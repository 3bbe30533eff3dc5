//! In-memory reference backend. Stands in for the hosted SDK in tests and
//! in shells running without a live service, with the same observable
//! semantics: listeners get one snapshot on subscribe and a full snapshot
//! after every write, and server timestamps are strictly monotonic.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use uuid::Uuid;

use super::{
    AuthError, AuthHandler, AuthProvider, AuthUser, Document, DocumentStore, Fields, Query,
    SnapshotHandler, StoreError, StoreErrorHandler, Subscription, SERVER_TIMESTAMP,
};

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern"));

/// Wrong-password attempts tolerated per account before sign-in is
/// refused with `TooManyAttempts`.
const MAX_FAILED_ATTEMPTS: u32 = 5;

struct Account {
    uid: String,
    password: String,
    display_name: Option<String>,
    failed_attempts: u32,
}

struct AuthInner {
    accounts: HashMap<String, Account>,
    current: Option<AuthUser>,
    listeners: HashMap<u64, AuthHandler>,
    next_listener: u64,
}

/// Clonable handle to an in-memory auth backend; clones share state.
#[derive(Clone)]
pub struct MemoryAuth {
    inner: Rc<RefCell<AuthInner>>,
}

impl Default for MemoryAuth {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(AuthInner {
                accounts: HashMap::new(),
                current: None,
                listeners: HashMap::new(),
                next_listener: 0,
            })),
        }
    }

    /// Seed an account without signing it in. Returns the new uid.
    pub fn register(&self, email: &str, password: &str, display_name: Option<&str>) -> String {
        let uid = Uuid::new_v4().to_string();
        self.inner.borrow_mut().accounts.insert(
            email.to_string(),
            Account {
                uid: uid.clone(),
                password: password.to_string(),
                display_name: display_name.map(str::to_string),
                failed_attempts: 0,
            },
        );
        uid
    }

    /// Listeners are snapshotted before invocation, so a handler may call
    /// back into the provider or drop its own subscription.
    fn notify(&self) {
        let (handlers, state) = {
            let inner = self.inner.borrow();
            let handlers: Vec<AuthHandler> = inner.listeners.values().cloned().collect();
            (handlers, inner.current.clone())
        };
        for handler in handlers {
            handler(state.clone());
        }
    }
}

impl AuthProvider for MemoryAuth {
    fn current_user(&self) -> Option<AuthUser> {
        self.inner.borrow().current.clone()
    }

    fn on_state_changed(&self, handler: AuthHandler) -> Subscription {
        let id = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_listener;
            inner.next_listener += 1;
            inner.listeners.insert(id, handler.clone());
            id
        };
        // Initial notification with the current state, borrow released.
        let current = self.inner.borrow().current.clone();
        handler(current);

        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().listeners.remove(&id);
            }
        })
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        if !EMAIL_RE.is_match(email) {
            return Err(AuthError::InvalidEmail);
        }
        let user = {
            let mut inner = self.inner.borrow_mut();
            let account = inner
                .accounts
                .get_mut(email)
                .ok_or(AuthError::UserNotFound)?;
            if account.failed_attempts >= MAX_FAILED_ATTEMPTS {
                return Err(AuthError::TooManyAttempts);
            }
            if account.password != password {
                account.failed_attempts += 1;
                return Err(AuthError::WrongPassword);
            }
            account.failed_attempts = 0;
            let user = AuthUser {
                uid: account.uid.clone(),
                email: email.to_string(),
                display_name: account.display_name.clone(),
            };
            inner.current = Some(user.clone());
            user
        };
        self.notify();
        Ok(user)
    }

    fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError> {
        if !EMAIL_RE.is_match(email) {
            return Err(AuthError::InvalidEmail);
        }
        if password.len() < 6 {
            return Err(AuthError::WeakPassword);
        }
        let user = {
            let mut inner = self.inner.borrow_mut();
            if inner.accounts.contains_key(email) {
                return Err(AuthError::EmailInUse);
            }
            let uid = Uuid::new_v4().to_string();
            inner.accounts.insert(
                email.to_string(),
                Account {
                    uid: uid.clone(),
                    password: password.to_string(),
                    display_name: None,
                    failed_attempts: 0,
                },
            );
            let user = AuthUser {
                uid,
                email: email.to_string(),
                display_name: None,
            };
            inner.current = Some(user.clone());
            user
        };
        self.notify();
        Ok(user)
    }

    fn sign_out(&self) {
        let was_signed_in = self.inner.borrow_mut().current.take().is_some();
        if was_signed_in {
            self.notify();
        }
    }

    fn update_profile(&self, display_name: &str) -> Result<(), AuthError> {
        {
            let mut inner = self.inner.borrow_mut();
            let email = match inner.current.as_ref() {
                Some(user) => user.email.clone(),
                None => return Err(AuthError::NotSignedIn),
            };
            if let Some(account) = inner.accounts.get_mut(&email) {
                account.display_name = Some(display_name.to_string());
            }
            if let Some(user) = inner.current.as_mut() {
                user.display_name = Some(display_name.to_string());
            }
        }
        self.notify();
        Ok(())
    }
}

struct StoreInner {
    collections: HashMap<String, Vec<Document>>,
    listeners: HashMap<u64, (Query, SnapshotHandler)>,
    next_listener: u64,
    /// Monotonic stand-in for server-assigned timestamps.
    clock: i64,
}

/// Clonable handle to an in-memory document store; clones share state.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Rc<RefCell<StoreInner>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(StoreInner {
                collections: HashMap::new(),
                listeners: HashMap::new(),
                next_listener: 0,
                clock: 0,
            })),
        }
    }

    /// All documents in a collection, in insertion order.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        self.inner
            .borrow()
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }

    fn stamp(inner: &mut StoreInner, fields: &mut Fields) {
        for value in fields.values_mut() {
            if value.as_str() == Some(SERVER_TIMESTAMP) {
                inner.clock += 1;
                *value = Value::from(inner.clock);
            }
        }
    }

    fn snapshot(inner: &StoreInner, query: &Query) -> Vec<Document> {
        let mut docs: Vec<Document> = inner
            .collections
            .get(&query.collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| doc.fields.get(&query.filter_field) == Some(&query.filter_value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        docs.sort_by_key(|doc| {
            doc.fields
                .get(&query.order_by)
                .and_then(Value::as_i64)
                .unwrap_or(i64::MIN)
        });
        if query.descending {
            docs.reverse();
        }
        docs
    }

    /// Deliver a fresh full snapshot to every listener on `collection`.
    /// Handler list and snapshots are collected before any handler runs.
    fn notify(&self, collection: &str) {
        let batches: Vec<(SnapshotHandler, Vec<Document>)> = {
            let inner = self.inner.borrow();
            inner
                .listeners
                .values()
                .filter(|(query, _)| query.collection == collection)
                .map(|(query, handler)| (handler.clone(), Self::snapshot(&inner, query)))
                .collect()
        };
        for (handler, docs) in batches {
            handler(&docs);
        }
    }
}

impl DocumentStore for MemoryStore {
    fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self
            .inner
            .borrow()
            .collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| doc.id == id))
            .cloned())
    }

    fn add_document(&self, collection: &str, mut fields: Fields) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        {
            let mut inner = self.inner.borrow_mut();
            Self::stamp(&mut inner, &mut fields);
            inner
                .collections
                .entry(collection.to_string())
                .or_default()
                .push(Document {
                    id: id.clone(),
                    fields,
                });
        }
        self.notify(collection);
        Ok(id)
    }

    fn set_document(&self, collection: &str, id: &str, mut fields: Fields) -> Result<(), StoreError> {
        {
            let mut inner = self.inner.borrow_mut();
            Self::stamp(&mut inner, &mut fields);
            let docs = inner.collections.entry(collection.to_string()).or_default();
            match docs.iter_mut().find(|doc| doc.id == id) {
                Some(doc) => doc.fields = fields,
                None => docs.push(Document {
                    id: id.to_string(),
                    fields,
                }),
            }
        }
        self.notify(collection);
        Ok(())
    }

    fn subscribe(
        &self,
        query: Query,
        on_update: SnapshotHandler,
        _on_error: StoreErrorHandler,
    ) -> Subscription {
        let (id, initial) = {
            let mut inner = self.inner.borrow_mut();
            let id = inner.next_listener;
            inner.next_listener += 1;
            let initial = Self::snapshot(&inner, &query);
            inner.listeners.insert(id, (query, on_update.clone()));
            (id, initial)
        };
        on_update(&initial);

        let weak = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().listeners.remove(&id);
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::RefCell as StdRefCell;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn sign_in_requires_known_account_and_password() {
        let auth = MemoryAuth::new();
        auth.register("a@x.com", "secret1", Some("Ana"));

        assert_eq!(
            auth.sign_in("not-an-email", "x"),
            Err(AuthError::InvalidEmail)
        );
        assert_eq!(
            auth.sign_in("b@x.com", "secret1"),
            Err(AuthError::UserNotFound)
        );
        assert_eq!(
            auth.sign_in("a@x.com", "wrong"),
            Err(AuthError::WrongPassword)
        );

        let user = auth.sign_in("a@x.com", "secret1").unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Ana"));
        assert_eq!(auth.current_user(), Some(user));
    }

    #[test]
    fn repeated_wrong_passwords_lock_the_account() {
        let auth = MemoryAuth::new();
        auth.register("a@x.com", "secret1", None);
        for _ in 0..MAX_FAILED_ATTEMPTS {
            assert_eq!(
                auth.sign_in("a@x.com", "wrong"),
                Err(AuthError::WrongPassword)
            );
        }
        assert_eq!(
            auth.sign_in("a@x.com", "secret1"),
            Err(AuthError::TooManyAttempts)
        );
    }

    #[test]
    fn sign_up_rejects_duplicates_and_weak_passwords() {
        let auth = MemoryAuth::new();
        auth.register("a@x.com", "secret1", None);
        assert_eq!(
            auth.sign_up("a@x.com", "secret2"),
            Err(AuthError::EmailInUse)
        );
        assert_eq!(auth.sign_up("b@x.com", "12345"), Err(AuthError::WeakPassword));
        let user = auth.sign_up("b@x.com", "123456").unwrap();
        assert_eq!(auth.current_user(), Some(user));
    }

    #[test]
    fn state_listener_fires_immediately_and_on_changes() {
        let auth = MemoryAuth::new();
        auth.register("a@x.com", "secret1", None);
        let seen: Rc<StdRefCell<Vec<bool>>> = Rc::new(StdRefCell::new(Vec::new()));
        let sub = auth.on_state_changed({
            let seen = seen.clone();
            Rc::new(move |user| seen.borrow_mut().push(user.is_some()))
        });

        auth.sign_in("a@x.com", "secret1").unwrap();
        auth.sign_out();
        assert_eq!(*seen.borrow(), vec![false, true, false]);

        drop(sub);
        auth.sign_in("a@x.com", "secret1").unwrap();
        assert_eq!(seen.borrow().len(), 3);
    }

    #[test]
    fn update_profile_updates_current_user_and_account() {
        let auth = MemoryAuth::new();
        assert_eq!(auth.update_profile("Ana"), Err(AuthError::NotSignedIn));
        auth.register("a@x.com", "secret1", None);
        auth.sign_in("a@x.com", "secret1").unwrap();
        auth.update_profile("Ana").unwrap();
        assert_eq!(
            auth.current_user().unwrap().display_name.as_deref(),
            Some("Ana")
        );
        auth.sign_out();
        let user = auth.sign_in("a@x.com", "secret1").unwrap();
        assert_eq!(user.display_name.as_deref(), Some("Ana"));
    }

    #[test]
    fn server_timestamps_are_monotonic() {
        let store = MemoryStore::new();
        store
            .add_document("c", fields(json!({"n": "a", "timestamp": SERVER_TIMESTAMP})))
            .unwrap();
        store
            .add_document("c", fields(json!({"n": "b", "timestamp": SERVER_TIMESTAMP})))
            .unwrap();
        let docs = store.documents("c");
        let t0 = docs[0].fields["timestamp"].as_i64().unwrap();
        let t1 = docs[1].fields["timestamp"].as_i64().unwrap();
        assert!(t1 > t0);
    }

    #[test]
    fn get_and_set_document_round_trip() {
        let store = MemoryStore::new();
        assert_eq!(store.get_document("users", "u1"), Ok(None));
        store
            .set_document("users", "u1", fields(json!({"fullName": "Ana"})))
            .unwrap();
        let doc = store.get_document("users", "u1").unwrap().unwrap();
        assert_eq!(doc.fields["fullName"], "Ana");

        store
            .set_document("users", "u1", fields(json!({"fullName": "Ana B"})))
            .unwrap();
        assert_eq!(store.documents("users").len(), 1);
    }

    #[test]
    fn subscription_filters_orders_and_detaches() {
        let store = MemoryStore::new();
        let query = Query {
            collection: "c".into(),
            filter_field: "userId".into(),
            filter_value: json!("u1"),
            order_by: "timestamp".into(),
            descending: true,
        };
        let snapshots: Rc<StdRefCell<Vec<Vec<String>>>> = Rc::new(StdRefCell::new(Vec::new()));
        let sub = store.subscribe(
            query,
            {
                let snapshots = snapshots.clone();
                Rc::new(move |docs: &[Document]| {
                    let names = docs
                        .iter()
                        .map(|d| d.fields["n"].as_str().unwrap().to_string())
                        .collect();
                    snapshots.borrow_mut().push(names);
                })
            },
            Rc::new(|_| {}),
        );
        // Initial snapshot is empty.
        assert_eq!(*snapshots.borrow(), vec![Vec::<String>::new()]);

        store
            .add_document(
                "c",
                fields(json!({"userId": "u1", "n": "first", "timestamp": SERVER_TIMESTAMP})),
            )
            .unwrap();
        store
            .add_document(
                "c",
                fields(json!({"userId": "u2", "n": "other", "timestamp": SERVER_TIMESTAMP})),
            )
            .unwrap();
        store
            .add_document(
                "c",
                fields(json!({"userId": "u1", "n": "second", "timestamp": SERVER_TIMESTAMP})),
            )
            .unwrap();

        let last = snapshots.borrow().last().unwrap().clone();
        // Only u1's documents, newest first.
        assert_eq!(last, vec!["second".to_string(), "first".to_string()]);

        let count = snapshots.borrow().len();
        drop(sub);
        store
            .add_document(
                "c",
                fields(json!({"userId": "u1", "n": "third", "timestamp": SERVER_TIMESTAMP})),
            )
            .unwrap();
        assert_eq!(snapshots.borrow().len(), count);
    }
}
