//! Request dispatcher.
//!
//! Entry point for inbound chat requests. A request passes the allow-list and
//! the rate limiter, then either claims its channel's run slot or waits in
//! the channel queue. Each serviced request runs on its own tokio task; when
//! it finishes, the next queued request for that channel is spawned on a
//! fresh task.

use std::sync::Arc;
use std::time::Duration;

use palaver_types::config::{PalaverConfig, TimeoutConfig};
use palaver_types::error::{AgentError, DispatchError};
use palaver_types::message::{Message, MessageRole};
use palaver_types::request::{InboundRequest, TurnReply};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::admission::{AccessList, RateLimiter, DENIAL_MESSAGE};
use super::queue::Admission;
use crate::agent::AgentFactory;
use crate::session::compactor::{CompactionOutcome, CompactionPolicy, Compactor};
use crate::session::registry::{ChannelRegistry, ChannelSession};
use crate::session::store::SessionStore;

type ReplySender = oneshot::Sender<Result<TurnReply, DispatchError>>;

/// A request waiting for, or holding, its channel's run slot.
pub struct PendingRequest {
    request: InboundRequest,
    reply: ReplySender,
}

impl PendingRequest {
    fn new(request: InboundRequest) -> (Self, Ticket) {
        let (reply, rx) = oneshot::channel();
        let ticket = Ticket {
            request_id: request.id,
            rx,
        };
        (Self { request, reply }, ticket)
    }

    pub fn request(&self) -> &InboundRequest {
        &self.request
    }

    pub(crate) fn fail(self, err: DispatchError) {
        let _ = self.reply.send(Err(err));
    }

    fn finish(self, result: Result<TurnReply, DispatchError>) {
        if self.reply.send(result).is_err() {
            debug!(request_id = %self.request.id, "caller stopped waiting for reply");
        }
    }
}

impl std::fmt::Debug for PendingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRequest")
            .field("id", &self.request.id)
            .field("user_id", &self.request.user_id)
            .finish()
    }
}

/// Handle for the eventual result of an admitted request.
#[derive(Debug)]
pub struct Ticket {
    request_id: Uuid,
    rx: oneshot::Receiver<Result<TurnReply, DispatchError>>,
}

impl Ticket {
    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    /// Wait for the turn to finish. A request dropped without a reply
    /// reports `ChannelReset`.
    pub async fn wait(self) -> Result<TurnReply, DispatchError> {
        self.rx.await.unwrap_or(Err(DispatchError::ChannelReset))
    }
}

/// What happened to a dispatched request.
#[derive(Debug)]
pub enum DispatchOutcome {
    /// Sender is not on the allow-list.
    Denied { message: String },
    /// Sender exceeded the rate limit.
    RateLimited {
        retry_after: Duration,
        message: String,
    },
    /// The channel was idle; the request is running.
    Started(Ticket),
    /// The channel is busy; the request waits at 1-based `position`.
    Queued { position: usize, ticket: Ticket },
    /// No session could be created for the channel.
    Unavailable(DispatchError),
}

impl DispatchOutcome {
    /// Ticket of an admitted request.
    pub fn into_ticket(self) -> Option<Ticket> {
        match self {
            DispatchOutcome::Started(ticket) | DispatchOutcome::Queued { ticket, .. } => {
                Some(ticket)
            }
            _ => None,
        }
    }
}

struct DispatcherInner<S, F> {
    registry: ChannelRegistry<S, F>,
    compactor: Compactor<S>,
    access: AccessList,
    limiter: RateLimiter,
    timeouts: TimeoutConfig,
}

/// Cheaply clonable request dispatcher.
pub struct Dispatcher<S, F> {
    inner: Arc<DispatcherInner<S, F>>,
}

impl<S, F> Clone for Dispatcher<S, F> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S, F> Dispatcher<S, F>
where
    S: SessionStore + 'static,
    F: AgentFactory + 'static,
{
    pub fn new(registry: ChannelRegistry<S, F>, config: &PalaverConfig) -> Self {
        let compactor = Compactor::new(
            Arc::clone(registry.store()),
            CompactionPolicy::from(&config.session),
        );
        Self {
            inner: Arc::new(DispatcherInner {
                registry,
                compactor,
                access: AccessList::from_config(&config.access),
                limiter: RateLimiter::from_config(&config.rate_limit),
                timeouts: config.timeouts.clone(),
            }),
        }
    }

    pub fn registry(&self) -> &ChannelRegistry<S, F> {
        &self.inner.registry
    }

    pub fn compactor(&self) -> &Compactor<S> {
        &self.inner.compactor
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.inner.limiter
    }

    /// Admit a request and start or queue it.
    #[tracing::instrument(
        name = "dispatch",
        skip_all,
        fields(channel_id = %request.channel_id, user_id = %request.user_id, request_id = %request.id)
    )]
    pub async fn dispatch(&self, request: InboundRequest) -> DispatchOutcome {
        if !self.inner.access.allows(&request.user_id) {
            warn!(user_name = %request.user_name, "request from user outside allow-list");
            return DispatchOutcome::Denied {
                message: DENIAL_MESSAGE.to_string(),
            };
        }

        let pruned = self.inner.limiter.prune_if_due();
        if pruned > 0 {
            debug!(pruned, "dropped expired rate limit windows");
        }

        if let Err(retry_after) = self.inner.limiter.check(&request.user_id) {
            info!(retry_after_ms = retry_after.as_millis() as u64, "request rate limited");
            return DispatchOutcome::RateLimited {
                retry_after,
                message: RateLimiter::retry_message(retry_after),
            };
        }

        let session = match self
            .inner
            .registry
            .get_or_create(&request.channel_id, &request.working_dir, &request.channel_name)
            .await
        {
            Ok(session) => session,
            Err(err) => {
                warn!(error = %err, "failed to create channel session");
                return DispatchOutcome::Unavailable(err.into());
            }
        };

        let (pending, ticket) = PendingRequest::new(request);
        match session.admit(pending) {
            Admission::RunNow(pending) => {
                self.spawn_turn(session, pending);
                DispatchOutcome::Started(ticket)
            }
            Admission::Queued { position, evicted } => {
                if let Some(evicted) = evicted {
                    warn!(
                        evicted_request = %evicted.request.id,
                        evicted_user = %evicted.request.user_name,
                        "channel queue full, dropped oldest queued request"
                    );
                    evicted.fail(DispatchError::Evicted);
                }
                debug!(position, "request queued");
                DispatchOutcome::Queued { position, ticket }
            }
        }
    }

    /// Service `pending` on a new task, then hand the run slot on.
    ///
    /// The turn itself runs on an inner task so a panicking agent still
    /// releases the channel.
    fn spawn_turn(&self, session: Arc<ChannelSession>, pending: PendingRequest) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            let turn = {
                let dispatcher = dispatcher.clone();
                let session = Arc::clone(&session);
                let request = pending.request.clone();
                tokio::spawn(async move { dispatcher.run_turn(&session, &request).await })
            };
            let result = match turn.await {
                Ok(result) => result,
                Err(err) => {
                    session.agent().abort();
                    warn!(
                        channel_id = %session.channel_id(),
                        request_id = %pending.request.id,
                        panicked = err.is_panic(),
                        error = %err,
                        "channel turn did not finish"
                    );
                    Err(DispatchError::Agent(AgentError::Other(format!(
                        "agent turn did not finish: {err}"
                    ))))
                }
            };
            let next = session.complete();
            pending.finish(result);
            if let Some(next) = next {
                dispatcher.spawn_turn(session, next);
            }
        });
    }

    #[tracing::instrument(
        name = "channel_turn",
        skip_all,
        fields(channel_id = %session.channel_id(), request_id = %request.id)
    )]
    async fn run_turn(
        &self,
        session: &ChannelSession,
        request: &InboundRequest,
    ) -> Result<TurnReply, DispatchError> {
        let agent = session.agent();
        let tools = self
            .inner
            .registry
            .filter()
            .filter(&request.text, session.tools());
        agent.set_tools(tools);

        let before = agent.messages().len();
        let limit = self.inner.timeouts.for_model(session.model());

        let failure = match tokio::time::timeout(limit, agent.prompt(&request.text)).await {
            Ok(Ok(())) => None,
            Ok(Err(err)) => {
                warn!(error = %err, "agent turn failed");
                Some(DispatchError::Agent(err))
            }
            Err(_) => {
                agent.abort();
                warn!(timeout_secs = limit.as_secs(), model = %session.model(), "agent turn timed out");
                Some(DispatchError::Timeout {
                    model: session.model().to_string(),
                    secs: limit.as_secs(),
                })
            }
        };

        // Whatever the agent produced is kept, even for a failed turn.
        let produced: Vec<Message> = agent.messages().into_iter().skip(before).collect();
        let persisted = self.persist(session, &produced).await;

        if let Some(err) = failure {
            return Err(err);
        }

        let compacted = self.compact(session).await;

        let text = produced
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant)
            .map(Message::text)
            .unwrap_or_default();

        Ok(TurnReply {
            request_id: request.id,
            text,
            model: agent.model(),
            persisted,
            compacted,
        })
    }

    async fn persist(&self, session: &ChannelSession, produced: &[Message]) -> usize {
        if produced.is_empty() || session.is_closed() {
            return 0;
        }
        match self
            .inner
            .registry
            .store()
            .append_batch(session.channel_id(), produced)
            .await
        {
            Ok(()) => {
                let total = session.add_cached_messages(produced.len());
                debug!(appended = produced.len(), total, "persisted turn messages");
                produced.len()
            }
            Err(err) => {
                warn!(error = %err, "failed to persist turn messages");
                0
            }
        }
    }

    async fn compact(&self, session: &ChannelSession) -> bool {
        let compactor = &self.inner.compactor;
        if session.is_closed() || session.cached_message_count() <= compactor.policy().threshold {
            return false;
        }
        match compactor
            .compact_if_needed(session.channel_id(), session.agent())
            .await
        {
            CompactionOutcome::Compacted { after, .. } => {
                session.set_cached_message_count(after);
                true
            }
            CompactionOutcome::Skipped { count } => {
                session.set_cached_message_count(count);
                false
            }
            CompactionOutcome::Failed => false,
        }
    }
}
