use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;

use crate::core::date;
use super::{AuthUser, Document, DocumentStore, Query, Subscription};

/// A completed-task record as delivered by the remote feed. Read-only
/// here: records are written once at completion time and never mutated.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CompletedRecord {
    /// Store-assigned document id; not part of the field payload.
    #[serde(skip)]
    pub id: String,
    pub name: String,
    #[serde(rename = "date")]
    pub day_key: String,
    #[serde(rename = "userId")]
    pub owner_id: String,
    /// Server-assigned ordering timestamp; sorted on, never displayed.
    #[serde(rename = "timestamp", default)]
    pub completed_at: i64,
}

type Grouping = BTreeMap<String, Vec<CompletedRecord>>;

struct FeedInner {
    /// `None` until the first snapshot arrives, so an empty day can be
    /// told apart from "still loading".
    grouped: Option<Grouping>,
}

/// Subscription-driven view of the signed-in user's completion history,
/// grouped by day key, with its own day cursor independent of the
/// dashboard's week cursor. Dropping the feed releases the subscription.
pub struct CompletedFeed {
    inner: Rc<RefCell<FeedInner>>,
    selected: NaiveDate,
    _watch: Subscription,
}

impl CompletedFeed {
    /// Open the single owner-scoped subscription, newest records first.
    pub fn open(
        store: &dyn DocumentStore,
        collection: &str,
        owner: &AuthUser,
        today: NaiveDate,
    ) -> Self {
        let inner = Rc::new(RefCell::new(FeedInner { grouped: None }));
        let owner_id = owner.uid.clone();

        let on_update = {
            let inner = inner.clone();
            Rc::new(move |docs: &[Document]| {
                // Full-snapshot replace: each update rebuilds the whole
                // grouping, last snapshot wins.
                let grouped = group_records(docs, &owner_id);
                inner.borrow_mut().grouped = Some(grouped);
            })
        };
        let on_error = Rc::new(|err: &crate::remote::StoreError| {
            // Keep the last good grouping; retry is the store client's job.
            log::error!("completed-task feed update failed: {}", err);
        });

        let query = Query {
            collection: collection.to_string(),
            filter_field: "userId".to_string(),
            filter_value: Value::String(owner.uid.clone()),
            order_by: "timestamp".to_string(),
            descending: true,
        };
        let watch = store.subscribe(query, on_update, on_error);

        Self {
            inner,
            selected: today,
            _watch: watch,
        }
    }

    /// True until the first snapshot has been delivered.
    pub fn is_loading(&self) -> bool {
        self.inner.borrow().grouped.is_none()
    }

    pub fn selected_day(&self) -> NaiveDate {
        self.selected
    }

    pub fn previous_day(&mut self) {
        self.selected = date::add_days(self.selected, -1);
    }

    pub fn next_day(&mut self) {
        self.selected = date::add_days(self.selected, 1);
    }

    /// Records for the cursor day; empty when the day has none.
    pub fn records_for_selected(&self) -> Vec<CompletedRecord> {
        self.records_for(&date::day_key(self.selected))
    }

    pub fn records_for(&self, day_key: &str) -> Vec<CompletedRecord> {
        self.inner
            .borrow()
            .grouped
            .as_ref()
            .and_then(|grouped| grouped.get(day_key))
            .cloned()
            .unwrap_or_default()
    }
}

fn group_records(docs: &[Document], owner_id: &str) -> Grouping {
    let mut grouped = Grouping::new();
    for doc in docs {
        let mut record: CompletedRecord =
            match serde_json::from_value(Value::Object(doc.fields.clone())) {
                Ok(record) => record,
                Err(err) => {
                    log::debug!("skipping malformed completed record {}: {}", doc.id, err);
                    continue;
                }
            };
        // The query is already owner-scoped; never surface a foreign
        // record even if the backend filter misbehaves.
        if record.owner_id != owner_id {
            log::debug!("skipping foreign completed record {}", doc.id);
            continue;
        }
        record.id = doc.id.clone();
        grouped
            .entry(record.day_key.clone())
            .or_default()
            .push(record);
    }
    grouped
}
