use crate::config::types::{ClusterConfiguration, MembershipScheme, MulticastConfig};
use crate::coordination::barrier::{ActivityHandle, CoordinationBarrier};
use crate::error::ClusterError;
use crate::membership::discovery::{bind_group_socket, MulticastDiscovery};
use crate::membership::registry::MemberRegistry;
use crate::membership::types::{ClusterMember, MemberId};
use crate::messaging::registry::MessageHandlerRegistry;
use crate::messaging::transport::MessageTransport;
use crate::messaging::types::ClusterMessage;
use anyhow::Result;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, UdpSocket};
use tokio::sync::mpsc;

/// The passed-down context owning the pieces every subsystem reads: the
/// configuration, the member registry, and the coordination barrier.
pub struct ClusterContext {
    pub config: ClusterConfiguration,
    pub registry: Arc<MemberRegistry>,
    pub barrier: Arc<CoordinationBarrier>,
}

pub struct Cluster {
    ctx: Arc<ClusterContext>,
    local: MemberId,
    discovery: Arc<MulticastDiscovery>,
    transport: Arc<MessageTransport>,
    handlers: Arc<MessageHandlerRegistry>,
    initialized: AtomicBool,
}

impl Cluster {
    /// Builds a node from its configuration: validates the scheme, acquires
    /// the multicast socket and the direct-channel listener, and wires the
    /// context. Fails fast — a cluster that cannot bind its sockets is never
    /// partially usable.
    pub async fn new(config: ClusterConfiguration) -> Result<Arc<Self>, ClusterError> {
        let multicast = match &config.scheme {
            MembershipScheme::Multicast(multicast) => multicast.clone(),
            other => {
                return Err(ClusterError::Configuration(format!(
                    "membership scheme '{}' is not supported",
                    other.name()
                )));
            }
        };
        multicast.validate()?;

        let socket = Arc::new(
            UdpSocket::from_std(bind_group_socket(&multicast)?).map_err(|e| {
                ClusterError::Initialization(format!("cannot register multicast socket: {}", e))
            })?,
        );

        let handlers = MessageHandlerRegistry::new();

        // The direct-channel listener is bound first so the advertised
        // identity carries the actual port (relevant when configured with 0).
        let listener = TcpListener::bind((config.local.host, config.local.port))
            .await
            .map_err(|e| {
                ClusterError::Initialization(format!(
                    "cannot bind channel listener on {}: {}",
                    config.local, e
                ))
            })?;
        let bound_port = listener
            .local_addr()
            .map_err(|e| {
                ClusterError::Initialization(format!("cannot read listener address: {}", e))
            })?
            .port();
        let local = MemberId::new(config.local.host, bound_port);

        let registry = MemberRegistry::new(local.clone());
        let transport = MessageTransport::new(
            local.clone(),
            listener,
            socket.clone(),
            multicast.group_addr(),
            registry.clone(),
            handlers.clone(),
        );

        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let discovery = MulticastDiscovery::new(
            multicast,
            local.clone(),
            registry.clone(),
            socket,
            inbound_tx,
        );

        let barrier = CoordinationBarrier::new();

        // First coordinated activity: bring up the message transport the
        // moment the membership view stabilizes.
        let transport_ = transport.clone();
        barrier.add_activity("message-transport", move || async move {
            transport_.start(inbound_rx);
            Ok(())
        });

        tracing::info!("Cluster node {} configured (scheme: multicast)", local);

        Ok(Arc::new(Self {
            ctx: Arc::new(ClusterContext {
                config,
                registry,
                barrier,
            }),
            local,
            discovery,
            transport,
            handlers,
            initialized: AtomicBool::new(false),
        }))
    }

    /// Runs multicast discovery and blocks until the initial membership view
    /// is stable and every registered coordinated activity has executed.
    /// Idempotent: a second call returns without doing anything. A failed
    /// attempt releases the guard, so the node stays retryable.
    pub async fn initialize(&self) -> Result<(), ClusterError> {
        if self
            .initialized
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Cluster {} already initialized", self.local);
            return Ok(());
        }

        if let Err(e) = self.discovery.initialize().await {
            self.initialized.store(false, Ordering::SeqCst);
            return Err(e);
        }
        self.ctx.barrier.fire_once().await;

        tracing::info!(
            "Cluster node {} initialized with {} remote member(s)",
            self.local,
            self.ctx.registry.count()
        );
        Ok(())
    }

    /// Registers an activity to run exactly once when membership stabilizes.
    /// Registrations after `initialize` are accepted but never executed.
    pub fn add_coordinated_activity<F, Fut>(&self, name: &str, activity: F) -> ActivityHandle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.ctx.barrier.add_activity(name, activity)
    }

    /// Registers the code executed when a message naming `handler_name`
    /// arrives at this node.
    pub fn register_handler<F, Fut>(&self, handler_name: &str, handler: F)
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<serde_json::Value>> + Send + 'static,
    {
        self.handlers.register(handler_name, handler);
    }

    /// Current remote members, ordered by identity.
    pub fn members(&self) -> Vec<ClusterMember> {
        self.ctx.registry.snapshot()
    }

    pub fn local_member(&self) -> &MemberId {
        &self.local
    }

    pub fn context(&self) -> &Arc<ClusterContext> {
        &self.ctx
    }

    pub fn configuration(&self) -> &ClusterConfiguration {
        &self.ctx.config
    }

    /// The multicast parameters discovery runs with, exactly as configured.
    pub fn multicast_config(&self) -> &MulticastConfig {
        self.discovery.config()
    }

    /// Broadcasts `message` to the whole group.
    pub async fn send_message(&self, message: &ClusterMessage) -> Result<(), ClusterError> {
        self.transport.send(message).await
    }

    /// Sends `message` only to `targets`; members outside the set never
    /// observe it.
    pub async fn send_message_to(
        &self,
        message: &ClusterMessage,
        targets: &[ClusterMember],
    ) -> Result<(), ClusterError> {
        self.transport.send_to(message, targets).await
    }

    /// Announces a graceful departure and stops all background duties.
    pub async fn shutdown(&self) {
        self.discovery.announce_leave().await;
        self.discovery.abort_tasks();
        self.transport.abort_tasks();
        tracing::info!("Cluster node {} shut down", self.local);
    }
}
