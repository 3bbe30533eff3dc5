pub mod feed;
pub mod memory;

use std::rc::Rc;

use serde_json::{Map, Value};
use thiserror::Error;

/// Sentinel field value the store replaces with a server-assigned
/// timestamp at write time.
pub const SERVER_TIMESTAMP: &str = "__server_timestamp__";

pub fn server_timestamp() -> Value {
    Value::String(SERVER_TIMESTAMP.to_string())
}

/// Document payload: a JSON object, field name to value.
pub type Fields = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Opaque identifier assigned by the store.
    pub id: String,
    pub fields: Fields,
}

/// The one query shape the client needs: a single-field equality filter
/// plus ordering on one field.
#[derive(Debug, Clone)]
pub struct Query {
    pub collection: String,
    pub filter_field: String,
    pub filter_value: Value,
    pub order_by: String,
    pub descending: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error("no account for this email")]
    UserNotFound,
    #[error("wrong password")]
    WrongPassword,
    #[error("too many failed sign-in attempts")]
    TooManyAttempts,
    #[error("email already in use")]
    EmailInUse,
    #[error("password too weak")]
    WeakPassword,
    #[error("network failure")]
    Network,
    #[error("no signed-in user")]
    NotSignedIn,
    #[error("auth provider error: {0}")]
    Provider(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("malformed document fields: {0}")]
    Malformed(String),
}

/// The authenticated user as reported by the auth provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
    pub display_name: Option<String>,
}

pub type AuthHandler = Rc<dyn Fn(Option<AuthUser>)>;
pub type SnapshotHandler = Rc<dyn Fn(&[Document])>;
pub type StoreErrorHandler = Rc<dyn Fn(&StoreError)>;

/// RAII listener handle: dropping it detaches the listener, so any struct
/// owning one releases its remote resource on every exit path.
pub struct Subscription {
    detach: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(detach: impl FnOnce() + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.detach.is_some())
            .finish()
    }
}

/// Managed authentication backend. Notifications drive the session gate;
/// every handler fires immediately with the current state, then again on
/// each sign-in or sign-out, in arrival order.
pub trait AuthProvider {
    fn current_user(&self) -> Option<AuthUser>;
    fn on_state_changed(&self, handler: AuthHandler) -> Subscription;
    fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;
    fn sign_up(&self, email: &str, password: &str) -> Result<AuthUser, AuthError>;
    fn sign_out(&self);
    fn update_profile(&self, display_name: &str) -> Result<(), AuthError>;
}

/// Managed document database. Subscriptions deliver the full matching
/// snapshot on open and after every write; each snapshot fully replaces
/// the previous one.
pub trait DocumentStore {
    fn get_document(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;
    /// Store a new document under a store-assigned id.
    fn add_document(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;
    /// Create or replace the document with the given id.
    fn set_document(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;
    fn subscribe(
        &self,
        query: Query,
        on_update: SnapshotHandler,
        on_error: StoreErrorHandler,
    ) -> Subscription;
}
