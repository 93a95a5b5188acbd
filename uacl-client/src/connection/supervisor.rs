//! Connection supervisor
//!
//! Owns one [`SessionHandle`] and keeps it connected:
//!
//! - A background establishment loop lazily creates the handle through the
//!   [`SessionFactory`] and connects it, retrying with a fixed back-off until
//!   connected. At most one loop runs per supervisor.
//! - Status changes reported by the session are classified into
//!   [`StatusBucket`]s and dispatched to the connected/disconnected sinks.
//! - Every protocol operation runs through [`ConnectionSupervisor::execute`],
//!   which holds the session lock for its whole duration.
//!
//! The loop and the status listener only hold weak references, so dropping
//! the last supervisor clone stops reconnection and disposes the session.

use super::session::{SessionFactory, SessionHandle, StatusListener, UaSession};
use super::state::SupervisorState;
use crate::config::{ConnectionInfo, SupervisorConfig};
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError, RwLock, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{watch, Mutex};
use tokio::time::Instant;
use uacl_core::{ConnectionStatus, StatusBucket, UaclError, UaclResult};

pub(crate) type EventSink = Arc<dyn Fn() + Send + Sync>;
pub(crate) type StatusSink = Arc<dyn Fn(ConnectionStatus) + Send + Sync>;

/// Optional callbacks notified on connection events
///
/// Sinks run synchronously on the thread that observed the status change and
/// must not block.
#[derive(Default)]
pub(crate) struct EventSinks {
    connected: RwLock<Option<EventSink>>,
    disconnected: RwLock<Option<EventSink>>,
    status: RwLock<Option<StatusSink>>,
}

impl EventSinks {
    pub(crate) fn new(
        connected: Option<EventSink>,
        disconnected: Option<EventSink>,
        status: Option<StatusSink>,
    ) -> Self {
        Self {
            connected: RwLock::new(connected),
            disconnected: RwLock::new(disconnected),
            status: RwLock::new(status),
        }
    }
}

fn load_sink<T: Clone>(slot: &RwLock<Option<T>>) -> Option<T> {
    slot.read().unwrap_or_else(PoisonError::into_inner).clone()
}

fn store_sink<T>(slot: &RwLock<Option<T>>, sink: T) {
    *slot.write().unwrap_or_else(PoisonError::into_inner) = Some(sink);
}

struct SupervisorInner {
    info: ConnectionInfo,
    config: SupervisorConfig,
    factory: Arc<dyn SessionFactory>,
    session: Mutex<Option<SessionHandle>>,
    handle_ready: watch::Sender<bool>,
    establishing: StdMutex<bool>,
    stopped: AtomicBool,
    state: StdMutex<SupervisorState>,
    sinks: EventSinks,
    runtime: Handle,
}

impl Drop for SupervisorInner {
    fn drop(&mut self) {
        if let Some(handle) = self.session.get_mut().take() {
            log::debug!(
                "Supervisor for {} dropped, disposing session",
                self.info.endpoint_url()
            );
            let session = handle.session();
            self.runtime.spawn(async move { session.disconnect().await });
        }
    }
}

/// Keeps one protocol session connected and serializes access to it
///
/// Cloning is cheap; all clones share the same session.
#[derive(Clone)]
pub struct ConnectionSupervisor {
    inner: Arc<SupervisorInner>,
}

impl ConnectionSupervisor {
    /// Create a supervisor and start connection establishment
    ///
    /// The establishment loop is spawned on the current tokio runtime.
    ///
    /// # Errors
    /// Returns [`UaclError::Connection`] when called outside a tokio runtime
    pub fn new(
        info: ConnectionInfo,
        factory: Arc<dyn SessionFactory>,
        config: SupervisorConfig,
    ) -> UaclResult<Self> {
        Self::with_sinks(info, factory, config, EventSinks::default())
    }

    pub(crate) fn with_sinks(
        info: ConnectionInfo,
        factory: Arc<dyn SessionFactory>,
        config: SupervisorConfig,
        sinks: EventSinks,
    ) -> UaclResult<Self> {
        let runtime = Handle::try_current().map_err(|e| {
            UaclError::Connection(format!("Connection supervisor requires a tokio runtime: {}", e))
        })?;
        let (handle_ready, _) = watch::channel(false);

        let supervisor = Self {
            inner: Arc::new(SupervisorInner {
                info,
                config,
                factory,
                session: Mutex::new(None),
                handle_ready,
                establishing: StdMutex::new(false),
                stopped: AtomicBool::new(false),
                state: StdMutex::new(SupervisorState::Uninitialized),
                sinks,
                runtime,
            }),
        };
        supervisor.start_connection_establishment();
        Ok(supervisor)
    }

    pub fn info(&self) -> &ConnectionInfo {
        &self.inner.info
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.inner.config
    }

    pub fn state(&self) -> SupervisorState {
        *self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether an establishment loop is currently running
    pub fn is_establishing(&self) -> bool {
        *self
            .inner
            .establishing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn on_connected(&self, sink: impl Fn() + Send + Sync + 'static) {
        store_sink(&self.inner.sinks.connected, Arc::new(sink) as EventSink);
    }

    pub fn on_disconnected(&self, sink: impl Fn() + Send + Sync + 'static) {
        store_sink(&self.inner.sinks.disconnected, Arc::new(sink) as EventSink);
    }

    pub fn on_status(&self, sink: impl Fn(ConnectionStatus) + Send + Sync + 'static) {
        store_sink(&self.inner.sinks.status, Arc::new(sink) as StatusSink);
    }

    /// Start the background establishment loop
    ///
    /// # Returns
    /// `false` without side effects if a loop is already running
    pub fn start_connection_establishment(&self) -> bool {
        {
            let mut establishing = self
                .inner
                .establishing
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if *establishing {
                log::debug!(
                    "Connection establishment for {} already running",
                    self.inner.info.endpoint_url()
                );
                return false;
            }
            *establishing = true;
        }

        self.inner.stopped.store(false, Ordering::SeqCst);
        let weak = Arc::downgrade(&self.inner);
        self.inner.runtime.spawn(establishment_loop(weak));
        true
    }

    /// One iteration of the establishment loop
    ///
    /// Discards a timed-out handle, creates a handle if there is none, signals
    /// readiness and connects.
    async fn establish_once(&self) -> UaclResult<bool> {
        self.transition(SupervisorState::Connecting);
        {
            let mut guard = self.inner.session.lock().await;
            if guard.as_ref().is_some_and(SessionHandle::is_timed_out) {
                log::debug!(
                    "Discarding timed out session for {}",
                    self.inner.info.endpoint_url()
                );
                self.inner.handle_ready.send_replace(false);
                if let Some(stale) = guard.take() {
                    stale.session().disconnect().await;
                }
            }
            if guard.is_none() {
                let session = self.inner.factory.create_session(&self.inner.info).await?;
                *guard = Some(SessionHandle::new(session));
                log::debug!("Created session for {}", self.inner.info.endpoint_url());
            }
            self.inner.handle_ready.send_replace(true);
        }
        Ok(self.connect().await)
    }

    /// Connect the current session handle
    ///
    /// Waits until the establishment loop has created a handle, then retries
    /// the protocol connect until it succeeds or the connect deadline
    /// elapses. On expiry the handle is marked timed out.
    ///
    /// # Returns
    /// `true` if the session is connected afterwards
    pub async fn connect(&self) -> bool {
        let mut ready = self.inner.handle_ready.subscribe();
        let ready_result = ready.wait_for(|ready| *ready).await.map(|_| ());
        if ready_result.is_err() {
            return false;
        }

        let url = self.inner.info.endpoint_url();
        let mut guard = self.inner.session.lock().await;
        if Self::connected_locked(&guard) {
            return true;
        }
        let session = match guard.as_mut() {
            Some(handle) if !handle.is_timed_out() => {
                handle.register_listener(self.status_listener());
                handle.session()
            }
            _ => return false,
        };

        let deadline = Instant::now() + self.inner.config.connect_deadline;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            match tokio::time::timeout(
                remaining,
                session.connect(&url, self.inner.config.security_mode),
            )
            .await
            {
                Ok(Ok(())) => {
                    let connected = Self::connected_locked(&guard);
                    if connected {
                        self.transition(SupervisorState::Connected);
                        log::info!("Connected to {}", url);
                    }
                    return connected;
                }
                Ok(Err(e)) => log::warn!("Connecting to {} failed: {}", url, e),
                Err(_) => break,
            }
            let pause = self
                .inner
                .config
                .connect_retry_interval
                .min(deadline.saturating_duration_since(Instant::now()));
            tokio::time::sleep(pause).await;
        }

        log::warn!(
            "Connecting to {} timed out after {:?}",
            url,
            self.inner.config.connect_deadline
        );
        if let Some(handle) = guard.as_mut() {
            handle.mark_timed_out();
        }
        self.transition(SupervisorState::Failed);
        false
    }

    pub async fn connected(&self) -> bool {
        let guard = self.inner.session.lock().await;
        Self::connected_locked(&guard)
    }

    /// Connected check for callers already holding the session lock
    pub fn connected_locked(handle: &Option<SessionHandle>) -> bool {
        handle.as_ref().is_some_and(SessionHandle::is_connected)
    }

    /// Dispose the session and stop reconnecting
    ///
    /// No-op when not connected.
    pub async fn disconnect(&self) {
        let mut guard = self.inner.session.lock().await;
        if !Self::connected_locked(&guard) {
            log::debug!(
                "Disconnect from {} ignored, not connected",
                self.inner.info.endpoint_url()
            );
            return;
        }

        self.inner.stopped.store(true, Ordering::SeqCst);
        if let Some(handle) = guard.take() {
            handle.session().disconnect().await;
        }
        self.inner.handle_ready.send_replace(false);
        self.transition(SupervisorState::Disconnected);
        log::info!("Disconnected from {}", self.inner.info.endpoint_url());
    }

    /// Run `action` against the connected session under the session lock
    ///
    /// # Errors
    /// [`UaclError::NotConnected`] if the session is not connected, in which
    /// case `action` is never invoked; otherwise the action's own error.
    pub async fn execute<T, F, Fut>(&self, action: F) -> UaclResult<T>
    where
        F: FnOnce(Arc<dyn UaSession>) -> Fut,
        Fut: Future<Output = UaclResult<T>>,
    {
        let guard = self.inner.session.lock().await;
        let session = match guard.as_ref() {
            Some(handle) if handle.is_connected() => handle.session(),
            _ => {
                log::debug!(
                    "Operation on {} rejected, not connected",
                    self.inner.info.endpoint_url()
                );
                return Err(UaclError::NotConnected);
            }
        };

        let result = action(session).await;
        drop(guard);
        if let Err(e) = &result {
            log::warn!(
                "Operation on {} failed: {}",
                self.inner.info.endpoint_url(),
                e
            );
        }
        result
    }

    fn status_listener(&self) -> StatusListener {
        let weak = Arc::downgrade(&self.inner);
        Arc::new(move |status| {
            if let Some(inner) = weak.upgrade() {
                ConnectionSupervisor { inner }.handle_status(status);
            }
        })
    }

    fn handle_status(&self, status: ConnectionStatus) {
        log::debug!(
            "Session status for {}: {:?}",
            self.inner.info.endpoint_url(),
            status
        );
        if let Some(sink) = load_sink(&self.inner.sinks.status) {
            sink(status);
        }

        match status.bucket() {
            StatusBucket::Lost => {
                self.transition(SupervisorState::Disconnected);
                if let Some(sink) = load_sink(&self.inner.sinks.disconnected) {
                    sink();
                }
                if self.inner.config.auto_reconnect && !self.inner.stopped.load(Ordering::SeqCst)
                {
                    self.start_connection_establishment();
                }
            }
            StatusBucket::Live => {
                self.transition(SupervisorState::Connected);
                if let Some(sink) = load_sink(&self.inner.sinks.connected) {
                    sink();
                }
            }
            StatusBucket::Transient => {}
        }
    }

    fn transition(&self, next: SupervisorState) {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match state.validate_transition(next) {
            Ok(()) => {
                if *state != next {
                    log::debug!(
                        "Supervisor for {}: {} -> {}",
                        self.inner.info.endpoint_url(),
                        state.as_str(),
                        next.as_str()
                    );
                }
                *state = next;
            }
            Err(e) => log::debug!("{}", e),
        }
    }
}

fn finish_establishment(inner: &SupervisorInner) {
    *inner
        .establishing
        .lock()
        .unwrap_or_else(PoisonError::into_inner) = false;
}

async fn establishment_loop(weak: Weak<SupervisorInner>) {
    loop {
        let Some(inner) = weak.upgrade() else {
            log::debug!("Supervisor dropped, stopping connection establishment");
            return;
        };
        if inner.stopped.load(Ordering::SeqCst) {
            finish_establishment(&inner);
            return;
        }

        let supervisor = ConnectionSupervisor { inner };
        let retry_delay: Duration = supervisor.inner.config.retry_delay;
        match supervisor.establish_once().await {
            Ok(true) => {
                finish_establishment(&supervisor.inner);
                return;
            }
            Ok(false) => log::debug!(
                "Not connected to {}, retrying in {:?}",
                supervisor.inner.info.endpoint_url(),
                retry_delay
            ),
            Err(e) => log::warn!(
                "Connection attempt to {} failed: {}, retrying in {:?}",
                supervisor.inner.info.endpoint_url(),
                e,
                retry_delay
            ),
        }
        drop(supervisor);
        tokio::time::sleep(retry_delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityMode;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use uacl_core::{NodeId, Variant};

    #[derive(Default)]
    struct FakeSession {
        status: StdMutex<ConnectionStatus>,
        listener: StdMutex<Option<StatusListener>>,
        connect_failures: AtomicUsize,
        connect_calls: AtomicUsize,
        disconnect_calls: AtomicUsize,
        hang: bool,
    }

    impl FakeSession {
        fn emit(&self, status: ConnectionStatus) {
            *self.status.lock().unwrap() = status;
            let listener = self.listener.lock().unwrap().clone();
            if let Some(listener) = listener {
                listener(status);
            }
        }
    }

    #[async_trait]
    impl UaSession for FakeSession {
        async fn connect(&self, _url: &str, _mode: SecurityMode) -> UaclResult<()> {
            self.connect_calls.fetch_add(1, Ordering::SeqCst);
            if self.hang {
                std::future::pending::<()>().await;
            }
            if self.connect_failures.load(Ordering::SeqCst) > 0 {
                self.connect_failures.fetch_sub(1, Ordering::SeqCst);
                return Err(UaclError::Connection("connection refused".into()));
            }
            self.emit(ConnectionStatus::Connected);
            Ok(())
        }

        fn status(&self) -> ConnectionStatus {
            *self.status.lock().unwrap()
        }

        fn set_status_listener(&self, listener: StatusListener) {
            *self.listener.lock().unwrap() = Some(listener);
        }

        async fn translate_browse_path(&self, path: &[String]) -> UaclResult<NodeId> {
            Ok(NodeId::string(1, path.join(".")))
        }

        async fn read_value(&self, _node_id: &NodeId) -> UaclResult<Variant> {
            Ok(Variant::Int32(7))
        }

        async fn write_value(&self, _node_id: &NodeId, _value: Variant) -> UaclResult<()> {
            Ok(())
        }

        async fn call_method(
            &self,
            _object_id: &NodeId,
            _method_id: &NodeId,
            _arguments: Vec<Variant>,
        ) -> UaclResult<Vec<Variant>> {
            Ok(vec![])
        }

        async fn create_monitored_item(
            &self,
            _node_id: &NodeId,
            _callback: crate::connection::DataChangeCallback,
        ) -> UaclResult<u32> {
            Ok(1)
        }

        async fn disconnect(&self) {
            self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
            self.emit(ConnectionStatus::Disconnected);
        }
    }

    #[derive(Default)]
    struct FakeFactory {
        create_failures: AtomicUsize,
        create_calls: AtomicUsize,
        connect_failures: usize,
        hang: bool,
        sessions: StdMutex<Vec<Arc<FakeSession>>>,
    }

    impl FakeFactory {
        fn session(&self, index: usize) -> Arc<FakeSession> {
            Arc::clone(&self.sessions.lock().unwrap()[index])
        }
    }

    #[async_trait]
    impl SessionFactory for FakeFactory {
        async fn create_session(&self, _info: &ConnectionInfo) -> UaclResult<Arc<dyn UaSession>> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if self.create_failures.load(Ordering::SeqCst) > 0 {
                self.create_failures.fetch_sub(1, Ordering::SeqCst);
                return Err(UaclError::Connection("endpoint unreachable".into()));
            }
            let session = Arc::new(FakeSession {
                connect_failures: AtomicUsize::new(self.connect_failures),
                hang: self.hang,
                ..FakeSession::default()
            });
            self.sessions.lock().unwrap().push(Arc::clone(&session));
            Ok(session)
        }
    }

    fn fast_config() -> SupervisorConfig {
        SupervisorConfig {
            retry_delay: Duration::from_millis(10),
            connect_deadline: Duration::from_millis(500),
            connect_retry_interval: Duration::from_millis(5),
            auto_reconnect: false,
            ..SupervisorConfig::default()
        }
    }

    fn supervisor(factory: &Arc<FakeFactory>, config: SupervisorConfig) -> ConnectionSupervisor {
        ConnectionSupervisor::new(
            ConnectionInfo::new("localhost", 4840, "test"),
            Arc::clone(factory) as Arc<dyn SessionFactory>,
            config,
        )
        .unwrap()
    }

    async fn eventually<F: Fn() -> bool>(condition: F) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn test_transient_failures_then_connected() {
        let factory = Arc::new(FakeFactory {
            create_failures: AtomicUsize::new(2),
            connect_failures: 3,
            ..FakeFactory::default()
        });
        let sup = supervisor(&factory, fast_config());

        eventually(|| sup.state() == SupervisorState::Connected).await;
        assert!(sup.connected().await);
        assert_eq!(factory.create_calls.load(Ordering::SeqCst), 3);
        assert_eq!(factory.session(0).connect_calls.load(Ordering::SeqCst), 4);

        eventually(|| !sup.is_establishing()).await;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(factory.create_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_concurrent_start_is_noop() {
        let factory = Arc::new(FakeFactory {
            hang: true,
            ..FakeFactory::default()
        });
        let sup = supervisor(&factory, fast_config());

        assert!(sup.is_establishing());
        assert!(!sup.start_connection_establishment());
    }

    #[tokio::test]
    async fn test_connect_waits_for_handle() {
        let factory = Arc::new(FakeFactory {
            create_failures: AtomicUsize::new(usize::MAX),
            ..FakeFactory::default()
        });
        let sup = supervisor(&factory, fast_config());

        let attempt = tokio::time::timeout(Duration::from_millis(100), sup.connect()).await;
        assert!(attempt.is_err());
        assert!(!sup.connected().await);
    }

    #[tokio::test]
    async fn test_connect_deadline_times_out_handle() {
        let factory = Arc::new(FakeFactory {
            hang: true,
            ..FakeFactory::default()
        });
        let config = SupervisorConfig {
            retry_delay: Duration::from_secs(30),
            connect_deadline: Duration::from_millis(30),
            ..fast_config()
        };
        let sup = supervisor(&factory, config);

        eventually(|| sup.state() == SupervisorState::Failed).await;
        {
            let guard = sup.inner.session.lock().await;
            assert!(guard.as_ref().unwrap().is_timed_out());
        }
        assert!(!sup.connect().await);
        assert!(!sup.connected().await);
    }

    #[tokio::test]
    async fn test_late_live_status_after_deadline() {
        let factory = Arc::new(FakeFactory {
            hang: true,
            ..FakeFactory::default()
        });
        let config = SupervisorConfig {
            retry_delay: Duration::from_secs(30),
            connect_deadline: Duration::from_millis(30),
            ..fast_config()
        };
        let sup = supervisor(&factory, config);
        eventually(|| sup.state() == SupervisorState::Failed).await;

        factory.session(0).emit(ConnectionStatus::Connected);
        assert_eq!(sup.state(), SupervisorState::Connected);
        assert!(sup.connected().await);
    }

    #[tokio::test]
    async fn test_timed_out_handle_is_replaced() {
        let factory = Arc::new(FakeFactory {
            hang: true,
            ..FakeFactory::default()
        });
        let config = SupervisorConfig {
            connect_deadline: Duration::from_millis(20),
            ..fast_config()
        };
        let _sup = supervisor(&factory, config);

        eventually(|| factory.create_calls.load(Ordering::SeqCst) >= 2).await;
        eventually(|| factory.session(0).disconnect_calls.load(Ordering::SeqCst) == 1).await;
    }

    #[tokio::test]
    async fn test_execute_when_disconnected() {
        let factory = Arc::new(FakeFactory {
            create_failures: AtomicUsize::new(usize::MAX),
            ..FakeFactory::default()
        });
        let sup = supervisor(&factory, fast_config());
        let invoked = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&invoked);
        let result = sup
            .execute(move |_session| async move {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .await;

        assert_eq!(result, Err(UaclError::NotConnected));
        assert!(!invoked.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_execute_when_connected() {
        let factory = Arc::new(FakeFactory::default());
        let sup = supervisor(&factory, fast_config());
        eventually(|| sup.state() == SupervisorState::Connected).await;

        let value = sup
            .execute(|session| async move {
                let node = NodeId::string(1, "application.Pump_1.Speed");
                session.read_value(&node).await
            })
            .await;
        assert_eq!(tokio_test::assert_ok!(value), Variant::Int32(7));
    }

    #[tokio::test]
    async fn test_status_buckets_reach_sinks() {
        let factory = Arc::new(FakeFactory::default());
        let sup = supervisor(&factory, fast_config());

        let connected = Arc::new(AtomicUsize::new(0));
        let disconnected = Arc::new(AtomicUsize::new(0));
        let statuses = Arc::new(AtomicUsize::new(0));
        let (c, d, s) = (
            Arc::clone(&connected),
            Arc::clone(&disconnected),
            Arc::clone(&statuses),
        );
        sup.on_connected(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        sup.on_disconnected(move || {
            d.fetch_add(1, Ordering::SeqCst);
        });
        sup.on_status(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });

        eventually(|| sup.state() == SupervisorState::Connected).await;
        eventually(|| !sup.is_establishing()).await;
        let session = factory.session(0);
        let baseline = connected.load(Ordering::SeqCst);

        session.emit(ConnectionStatus::ServerShutdown);
        assert_eq!(disconnected.load(Ordering::SeqCst), 1);
        assert_eq!(sup.state(), SupervisorState::Disconnected);

        session.emit(ConnectionStatus::ConnectionWarningWatchdogTimeout);
        assert_eq!(sup.state(), SupervisorState::Disconnected);

        session.emit(ConnectionStatus::SessionAutomaticallyRecreated);
        assert_eq!(connected.load(Ordering::SeqCst), baseline + 1);
        assert_eq!(sup.state(), SupervisorState::Connected);
        assert_eq!(disconnected.load(Ordering::SeqCst), 1);
        assert!(statuses.load(Ordering::SeqCst) >= 3);
    }

    #[tokio::test]
    async fn test_lost_connection_restarts_establishment() {
        let factory = Arc::new(FakeFactory::default());
        let config = SupervisorConfig {
            auto_reconnect: true,
            ..fast_config()
        };
        let sup = supervisor(&factory, config);
        eventually(|| sup.state() == SupervisorState::Connected).await;
        eventually(|| !sup.is_establishing()).await;

        let session = factory.session(0);
        session.emit(ConnectionStatus::ConnectionErrorClientReconnect);

        eventually(|| session.connect_calls.load(Ordering::SeqCst) == 2).await;
        eventually(|| sup.state() == SupervisorState::Connected).await;
        assert!(sup.connected().await);
        assert_eq!(factory.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disconnect() {
        let factory = Arc::new(FakeFactory::default());
        let config = SupervisorConfig {
            auto_reconnect: true,
            ..fast_config()
        };
        let sup = supervisor(&factory, config);
        eventually(|| sup.state() == SupervisorState::Connected).await;
        eventually(|| !sup.is_establishing()).await;

        sup.disconnect().await;
        assert!(!sup.connected().await);
        assert_eq!(sup.state(), SupervisorState::Disconnected);
        assert_eq!(factory.session(0).disconnect_calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!sup.is_establishing());
        assert_eq!(factory.create_calls.load(Ordering::SeqCst), 1);

        // second disconnect is a no-op
        sup.disconnect().await;
        assert_eq!(factory.session(0).disconnect_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_new_requires_runtime() {
        let factory: Arc<dyn SessionFactory> = Arc::new(FakeFactory::default());
        let result = ConnectionSupervisor::new(
            ConnectionInfo::new("localhost", 4840, "test"),
            factory,
            SupervisorConfig::default(),
        );
        assert!(matches!(result, Err(UaclError::Connection(_))));
    }
}
