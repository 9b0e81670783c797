use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;

/// Type-erased activity body. `FnOnce` because an activity runs at most once.
type ActivityFn = Box<dyn FnOnce() -> Pin<Box<dyn Future<Output = Result<()>> + Send>> + Send>;

/// Lifecycle state of a coordinated activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityState {
    Pending,
    Executing,
    Complete,
}

const STATE_PENDING: u8 = 0;
const STATE_EXECUTING: u8 = 1;
const STATE_COMPLETE: u8 = 2;

fn state_from_u8(raw: u8) -> ActivityState {
    match raw {
        STATE_EXECUTING => ActivityState::Executing,
        STATE_COMPLETE => ActivityState::Complete,
        _ => ActivityState::Pending,
    }
}

struct RegisteredActivity {
    name: String,
    state: Arc<AtomicU8>,
    run: ActivityFn,
}

/// Caller-side view of a registered activity. Querying it is idempotent and
/// side-effect-free.
#[derive(Clone)]
pub struct ActivityHandle {
    name: String,
    state: Arc<AtomicU8>,
}

impl ActivityHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> ActivityState {
        state_from_u8(self.state.load(Ordering::SeqCst))
    }

    pub fn is_execution_complete(&self) -> bool {
        self.state() == ActivityState::Complete
    }
}

pub struct CoordinationBarrier {
    activities: Mutex<Vec<RegisteredActivity>>,
    fired: AtomicBool,
}

impl CoordinationBarrier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            activities: Mutex::new(Vec::new()),
            fired: AtomicBool::new(false),
        })
    }

    /// Registers an activity. Registrations are accepted at any time, but only
    /// activities registered before the barrier fires ever execute.
    pub fn add_activity<F, Fut>(&self, name: &str, activity: F) -> ActivityHandle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let state = Arc::new(AtomicU8::new(STATE_PENDING));
        let run: ActivityFn = Box::new(move || Box::pin(activity()));

        self.activities.lock().unwrap().push(RegisteredActivity {
            name: name.to_string(),
            state: state.clone(),
            run,
        });

        if self.has_fired() {
            tracing::warn!(
                "Coordinated activity '{}' registered after the barrier fired; it will never run",
                name
            );
        } else {
            tracing::debug!("Registered coordinated activity '{}'", name);
        }

        ActivityHandle {
            name: name.to_string(),
            state,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Runs every currently-registered pending activity, in registration
    /// order, on the calling task. Invoked once when the membership view
    /// stabilizes; any later call is a no-op.
    pub(crate) async fn fire_once(&self) {
        if self.fired.swap(true, Ordering::SeqCst) {
            tracing::debug!("Coordination barrier already fired; ignoring");
            return;
        }

        let activities: Vec<RegisteredActivity> =
            self.activities.lock().unwrap().drain(..).collect();
        tracing::info!(
            "Firing coordination barrier: {} activity(ies)",
            activities.len()
        );

        for activity in activities {
            activity.state.store(STATE_EXECUTING, Ordering::SeqCst);
            tracing::debug!("Executing coordinated activity '{}'", activity.name);

            if let Err(e) = (activity.run)().await {
                // Execution happened; the activity is complete even if it
                // reported an error.
                tracing::warn!("Coordinated activity '{}' failed: {}", activity.name, e);
            }

            activity.state.store(STATE_COMPLETE, Ordering::SeqCst);
        }
    }
}
