use crate::state::{Field, FieldValue, ResolvedState};
use parking_lot::Mutex;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error};

/// What a subscription listens to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Field(Field),
    /// Every cycle with at least one change.
    Any,
}

impl From<Field> for Topic {
    fn from(field: Field) -> Self {
        Topic::Field(field)
    }
}

/// Delivered to callbacks. Field subscribers get `Field`; wildcard
/// subscribers get `Changed` once per cycle.
#[derive(Debug)]
pub enum Notification<'a> {
    Field {
        field: Field,
        value: FieldValue,
        state: &'a ResolvedState,
    },
    Changed {
        fields: &'a [Field],
        state: &'a ResolvedState,
    },
}

impl Notification<'_> {
    pub fn state(&self) -> &ResolvedState {
        match self {
            Notification::Field { state, .. } | Notification::Changed { state, .. } => state,
        }
    }
}

pub(crate) type Callback = Arc<dyn Fn(&Notification<'_>) + Send + Sync>;

struct Registration {
    id: u64,
    topic: Topic,
    callback: Callback,
}

#[derive(Default)]
pub(crate) struct Registry {
    next_id: AtomicU64,
    entries: Mutex<Vec<Registration>>,
}

impl Registry {
    pub(crate) fn add<F>(self: &Arc<Self>, topic: Topic, callback: F) -> Unsubscribe
    where
        F: Fn(&Notification<'_>) + Send + Sync + 'static,
    {
        let callback: Callback = Arc::new(callback);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.lock().push(Registration {
            id,
            topic,
            callback,
        });
        debug!(id, ?topic, "subscriber registered");
        Unsubscribe {
            registry: Arc::downgrade(self),
            id,
        }
    }

    fn remove(&self, id: u64) -> bool {
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|r| r.id != id);
        entries.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Run every matching callback for one cycle. Callbacks run without the
    /// registry lock held, so they may subscribe or unsubscribe.
    pub(crate) fn dispatch(&self, changed: &[Field], state: &ResolvedState) {
        if changed.is_empty() {
            return;
        }
        let snapshot: Vec<(Topic, Callback)> = self
            .entries
            .lock()
            .iter()
            .map(|r| (r.topic, Arc::clone(&r.callback)))
            .collect();

        for (topic, callback) in snapshot {
            match topic {
                Topic::Field(field) if changed.contains(&field) => {
                    let note = Notification::Field {
                        field,
                        value: state.get(field),
                        state,
                    };
                    invoke(topic, &callback, &note);
                }
                Topic::Field(_) => {}
                Topic::Any => {
                    let note = Notification::Changed {
                        fields: changed,
                        state,
                    };
                    invoke(topic, &callback, &note);
                }
            }
        }
    }
}

fn invoke(topic: Topic, callback: &Callback, note: &Notification<'_>) {
    if catch_unwind(AssertUnwindSafe(|| callback(note))).is_err() {
        error!(?topic, "subscriber panicked");
    }
}

/// Removes one registration. Dropping the handle leaves the registration in
/// place.
#[derive(Debug)]
pub struct Unsubscribe {
    registry: Weak<Registry>,
    id: u64,
}

impl Unsubscribe {
    /// Returns `false` if the registration was already gone.
    pub fn unsubscribe(self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.remove(self.id))
    }
}
