//! Request sequencing for the palette input.
//!
//! One query in flight at a time. Keystrokes arm a debounce deadline;
//! dispatch happens on `tick` once the deadline passes. Every dispatched
//! request gets a monotonically increasing id, and an outcome is applied
//! only if its id still matches the latest dispatched request, so a slow
//! early response can never overwrite a newer one.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use crate::client::direct::MenuSnapshot;
use crate::client::router::route;
use crate::client::transport::{SearchTransport, TransportError};
use crate::model::permission::Requester;
use crate::model::types::{DomainId, PanelEntry, SearchResponse, SessionBootstrap};
use crate::server::{aggregate, rank};

static DEBOUNCE_MS: once_cell::sync::Lazy<u64> = once_cell::sync::Lazy::new(|| {
    dotenvy::var("QPAL_DEBOUNCE_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(300)
});

static CALL_TIMEOUT_MS: once_cell::sync::Lazy<u64> = once_cell::sync::Lazy::new(|| {
    dotenvy::var("QPAL_CALL_TIMEOUT_MS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10_000)
});

/// Pause after the last keystroke before a query is dispatched.
pub fn default_debounce() -> Duration {
    Duration::from_millis(*DEBOUNCE_MS)
}

/// Hard cap on a single query call.
pub fn default_call_timeout() -> Duration {
    Duration::from_millis(*CALL_TIMEOUT_MS)
}

const HINT_MIN_CHARS: &str = "Keep typing: searches need at least 2 characters.";
const MSG_TIMEOUT: &str = "The search timed out. Try again.";
const MSG_UNAVAILABLE: &str = "Search is unavailable right now.";

/// What the palette should render.
#[derive(Debug, Clone)]
pub enum RenderState {
    /// No active query; show the favorites and recents panels.
    Idle,
    Hint(String),
    Loading,
    Results(SearchResponse),
    Failed {
        kind: SearchErrorKind,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchErrorKind {
    Network,
    Timeout,
    ServerRejected,
}

/// Terminal outcome of one dispatched query task.
#[derive(Debug)]
enum TaskOutcome {
    Completed(SearchResponse),
    Failed {
        kind: SearchErrorKind,
        message: String,
    },
    Cancelled,
}

#[derive(Debug, Clone)]
struct Pending {
    deadline: Instant,
    term: String,
    domain: DomainId,
}

/// Owns the palette's query lifecycle for one session.
pub struct Sequencer {
    transport: Arc<dyn SearchTransport>,
    requester: Requester,
    context: String,
    snapshot: MenuSnapshot,
    pub favorites: Vec<PanelEntry>,
    pub recents: Vec<PanelEntry>,
    debounce: Duration,
    call_timeout: Duration,
    current_domain: DomainId,
    next_request_id: u64,
    latest_request: u64,
    inflight_cancel: Option<oneshot::Sender<()>>,
    pending: Option<Pending>,
    state: RenderState,
    outcome_tx: mpsc::UnboundedSender<(u64, TaskOutcome)>,
    outcome_rx: mpsc::UnboundedReceiver<(u64, TaskOutcome)>,
}

impl Sequencer {
    pub fn new(transport: Arc<dyn SearchTransport>, requester: Requester) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            transport,
            requester,
            context: "palette".to_string(),
            snapshot: MenuSnapshot::default(),
            favorites: Vec::new(),
            recents: Vec::new(),
            debounce: default_debounce(),
            call_timeout: default_call_timeout(),
            current_domain: DomainId::Documents,
            next_request_id: 0,
            latest_request: 0,
            inflight_cancel: None,
            pending: None,
            state: RenderState::Idle,
            outcome_tx,
            outcome_rx,
        }
    }

    pub fn with_timing(mut self, debounce: Duration, call_timeout: Duration) -> Self {
        self.debounce = debounce;
        self.call_timeout = call_timeout;
        self
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn current_domain(&self) -> DomainId {
        self.current_domain
    }

    /// Install the session bootstrap: menu snapshot plus idle panels.
    pub fn apply_bootstrap(&mut self, boot: SessionBootstrap) {
        self.snapshot = MenuSnapshot::new(boot.pages);
        self.favorites = boot.favorites;
        self.recents = boot.recents;
    }

    /// React to the raw input buffer changing.
    pub fn on_input_changed(&mut self, raw_input: &str, now: Instant) {
        let routed = route(raw_input, self.current_domain);

        // A typed prefix switches the sticky domain, so deleting the prefix
        // afterwards keeps searching where the prefix pointed. The sigils
        // stay transient: direct lookup is not a tab the palette can rest on.
        if routed.override_detected
            && routed.domain != DomainId::DirectLookup
            && routed.domain != self.current_domain
        {
            debug!(from = %self.current_domain, to = %routed.domain, "prefix switched domain");
            self.current_domain = routed.domain;
        }

        if routed.cleaned_term.is_empty() {
            self.abandon_inflight();
            self.pending = None;
            self.state = RenderState::Idle;
            return;
        }

        // Direct lookup never leaves the client and never waits.
        if routed.domain == DomainId::DirectLookup {
            self.abandon_inflight();
            self.pending = None;
            let hits = self.snapshot.lookup(&routed.cleaned_term);
            let ranked = rank::rank(&routed.cleaned_term, hits);
            let mut per_domain = std::collections::BTreeMap::new();
            per_domain.insert(DomainId::DirectLookup, ranked);
            self.state = RenderState::Results(aggregate::aggregate(
                per_domain,
                &routed.cleaned_term,
                DomainId::DirectLookup,
                &self.context,
            ));
            return;
        }

        if routed.cleaned_term.chars().count() < routed.domain.min_term_len() {
            self.abandon_inflight();
            self.pending = None;
            self.state = RenderState::Hint(HINT_MIN_CHARS.to_string());
            return;
        }

        self.pending = Some(Pending {
            deadline: now + self.debounce,
            term: routed.cleaned_term,
            domain: routed.domain,
        });
    }

    /// Switch the sticky domain. Re-arms the debounce on the current input
    /// rather than firing immediately.
    pub fn switch_domain(&mut self, domain: DomainId, raw_input: &str, now: Instant) {
        self.current_domain = domain;
        self.on_input_changed(raw_input, now);
    }

    /// Cancel whatever is pending or in flight and return to idle.
    pub fn cancel_current(&mut self) {
        self.abandon_inflight();
        self.pending = None;
        self.state = RenderState::Idle;
    }

    /// Drive the sequencer: apply finished outcomes, then dispatch a
    /// pending query whose debounce deadline has passed.
    ///
    /// Must run inside a tokio runtime.
    pub fn tick(&mut self, now: Instant) {
        while let Ok((id, outcome)) = self.outcome_rx.try_recv() {
            if id != self.latest_request {
                debug!(id = id, latest = self.latest_request, "dropping stale outcome");
                continue;
            }
            match outcome {
                TaskOutcome::Completed(resp) => self.state = RenderState::Results(resp),
                TaskOutcome::Failed { kind, message } => {
                    self.state = RenderState::Failed { kind, message };
                }
                TaskOutcome::Cancelled => {}
            }
        }

        if let Some(pending) = self.pending.take_if(|p| now >= p.deadline) {
            self.dispatch(pending.term, pending.domain);
        }
    }

    fn dispatch(&mut self, term: String, domain: DomainId) {
        self.abandon_inflight();

        self.next_request_id += 1;
        let id = self.next_request_id;
        self.latest_request = id;

        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.inflight_cancel = Some(cancel_tx);

        debug!(id = id, domain = %domain, term = %term, "dispatching query");

        let fut = self
            .transport
            .search(term, domain, self.context.clone(), self.requester);
        let outcome_tx = self.outcome_tx.clone();
        let call_timeout = self.call_timeout;
        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = cancel_rx => TaskOutcome::Cancelled,
                res = tokio::time::timeout(call_timeout, fut) => match res {
                    Err(_) => TaskOutcome::Failed {
                        kind: SearchErrorKind::Timeout,
                        message: MSG_TIMEOUT.to_string(),
                    },
                    Ok(Ok(resp)) => TaskOutcome::Completed(resp),
                    Ok(Err(e)) => failed_outcome(e),
                },
            };
            let _ = outcome_tx.send((id, outcome));
        });

        self.state = RenderState::Loading;
    }

    fn abandon_inflight(&mut self) {
        // Dropping the sender resolves the task's cancel branch.
        self.inflight_cancel = None;
    }
}

fn failed_outcome(err: TransportError) -> TaskOutcome {
    match err {
        TransportError::Rejected { message, .. } => TaskOutcome::Failed {
            kind: SearchErrorKind::ServerRejected,
            message,
        },
        TransportError::Unavailable(_) | TransportError::Protocol(_) => TaskOutcome::Failed {
            kind: SearchErrorKind::Network,
            message: MSG_UNAVAILABLE.to_string(),
        },
    }
}
