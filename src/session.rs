use std::cell::{Ref, RefCell, RefMut};
use std::rc::Rc;

use chrono::NaiveDate;
use serde_json::Value;

use crate::config::AppConfig;
use crate::core::board::TaskBoard;
use crate::remote::feed::CompletedFeed;
use crate::remote::{AuthProvider, AuthUser, DocumentStore, Fields, Subscription, server_timestamp};

/// Which top-level tree is active. Exactly one state holds at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Before the first auth notification arrives.
    Loading,
    Anonymous,
    Authenticated,
}

/// Everything mounted while a user is signed in: the dashboard board and
/// the completed-task feed. Dropping the workspace releases the feed
/// subscription, which is how sign-out detaches it on every path.
pub struct Workspace {
    pub board: TaskBoard,
    pub feed: CompletedFeed,
    user: AuthUser,
    store: Rc<dyn DocumentStore>,
    completed_collection: String,
}

impl Workspace {
    fn mount(
        user: AuthUser,
        store: Rc<dyn DocumentStore>,
        config: &AppConfig,
        today: NaiveDate,
    ) -> Self {
        let board = TaskBoard::new(today, config.week_start.weekday());
        let feed = CompletedFeed::open(store.as_ref(), &config.completed_collection, &user, today);
        Self {
            board,
            feed,
            user,
            store,
            completed_collection: config.completed_collection.clone(),
        }
    }

    pub fn user(&self) -> &AuthUser {
        &self.user
    }

    /// Header greeting name, falling back to "User".
    pub fn display_name(&self) -> &str {
        self.user.display_name.as_deref().unwrap_or("User")
    }

    /// Complete the task and persist one completed record. The local flip
    /// is optimistic: a failed write is logged and never rolled back.
    pub fn complete_task(&mut self, day_key: &str, index: usize) {
        let Some(write) = self.board.complete_task(day_key, index) else {
            return;
        };
        let mut fields = Fields::new();
        fields.insert("userId".to_string(), Value::String(self.user.uid.clone()));
        fields.insert("date".to_string(), Value::String(write.day_key.clone()));
        fields.insert("name".to_string(), Value::String(write.name.clone()));
        fields.insert("timestamp".to_string(), server_timestamp());
        match self.store.add_document(&self.completed_collection, fields) {
            Ok(id) => log::debug!("completed task saved as {}", id),
            Err(err) => log::error!("failed to save completed task '{}': {}", write.name, err),
        }
    }
}

struct GateShared {
    session: SessionState,
    workspace: Option<Workspace>,
}

/// Routes between the unauthenticated and authenticated trees, driven
/// exclusively by auth-provider notifications. Runs for the life of the
/// process; dropping it stops observing.
pub struct SessionGate {
    shared: Rc<RefCell<GateShared>>,
    _watch: Subscription,
}

impl SessionGate {
    pub fn new(
        auth: Rc<dyn AuthProvider>,
        store: Rc<dyn DocumentStore>,
        config: AppConfig,
    ) -> Self {
        let shared = Rc::new(RefCell::new(GateShared {
            session: SessionState::Loading,
            workspace: None,
        }));

        let handler = {
            let shared = shared.clone();
            Rc::new(move |user: Option<AuthUser>| {
                let mut state = shared.borrow_mut();
                // Tear the previous tree down before mounting the next;
                // this drop is what closes a signed-out user's feed.
                state.workspace = None;
                match user {
                    Some(user) => {
                        log::info!("session: {} signed in", user.uid);
                        let today = chrono::Local::now().date_naive();
                        state.workspace =
                            Some(Workspace::mount(user, store.clone(), &config, today));
                        state.session = SessionState::Authenticated;
                    }
                    None => {
                        log::info!("session: signed out");
                        state.session = SessionState::Anonymous;
                    }
                }
            })
        };
        let watch = auth.on_state_changed(handler);

        Self {
            shared,
            _watch: watch,
        }
    }

    pub fn session(&self) -> SessionState {
        self.shared.borrow().session
    }

    pub fn workspace(&self) -> Option<Ref<'_, Workspace>> {
        Ref::filter_map(self.shared.borrow(), |state| state.workspace.as_ref()).ok()
    }

    pub fn workspace_mut(&self) -> Option<RefMut<'_, Workspace>> {
        RefMut::filter_map(self.shared.borrow_mut(), |state| state.workspace.as_mut()).ok()
    }
}
