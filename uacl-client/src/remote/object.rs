//! Remote object proxy
//!
//! A [`RemoteObject`] addresses one object of the server's address space by
//! its browse path below the objects folder, e.g. `["application", "Pump_1"]`.
//! Members are addressed by name; their node ids are resolved through the
//! session on first use and cached for the lifetime of the proxy.
//!
//! All typed accessors are best effort: failures are logged and turned into a
//! default value (or `false`). Use [`RemoteObject::try_read`] or
//! [`RemoteObject::execute`] to see the underlying error.

use super::accessors::{ReadOutcome, RemoteDataMonitor, RemoteMethod, RemoteVariable};
use crate::connection::{ConnectionSupervisor, DataChangeCallback, UaSession};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use uacl_core::{AsVariant, NodeId, UaValue, UaclResult, Variant};

type NodeIdCache = Arc<Mutex<HashMap<String, NodeId>>>;

/// Proxy for one object of a remote address space
#[derive(Clone)]
pub struct RemoteObject {
    supervisor: ConnectionSupervisor,
    object_path: Vec<String>,
    object_id: Arc<Mutex<Option<NodeId>>>,
    node_ids: NodeIdCache,
}

impl RemoteObject {
    pub fn new<I, S>(supervisor: ConnectionSupervisor, object_path: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            supervisor,
            object_path: object_path.into_iter().map(Into::into).collect(),
            object_id: Arc::new(Mutex::new(None)),
            node_ids: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn supervisor(&self) -> &ConnectionSupervisor {
        &self.supervisor
    }

    pub fn object_path(&self) -> &[String] {
        &self.object_path
    }

    fn display_path(&self, member: &str) -> String {
        let mut path = self.object_path.join(".");
        if !member.is_empty() {
            path.push('.');
            path.push_str(member);
        }
        path
    }

    async fn translate(&self, path: Vec<String>) -> UaclResult<NodeId> {
        self.supervisor
            .execute(move |session| async move { session.translate_browse_path(&path).await })
            .await
    }

    async fn object_node(&self) -> UaclResult<NodeId> {
        let cached = self
            .object_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(id) = cached {
            return Ok(id);
        }
        let id = self.translate(self.object_path.clone()).await?;
        *self.object_id.lock().unwrap_or_else(PoisonError::into_inner) = Some(id.clone());
        Ok(id)
    }

    async fn member_node(&self, name: &str) -> UaclResult<NodeId> {
        let cached = self
            .node_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();
        if let Some(id) = cached {
            return Ok(id);
        }

        let mut path = self.object_path.clone();
        path.push(name.to_string());
        let id = self.translate(path).await?;
        log::debug!("Resolved {} to {}", self.display_path(name), id);
        self.node_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), id.clone());
        Ok(id)
    }

    /// Write a variable
    ///
    /// # Returns
    /// `true` if the server accepted the value; failures are logged
    pub async fn write<T: UaValue>(&self, name: &str, value: T) -> bool {
        let variant = value.to_variant();
        let result = async {
            let node_id = self.member_node(name).await?;
            RemoteVariable::new(&self.supervisor, node_id)
                .write(variant)
                .await
        }
        .await;

        match result {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Writing {} failed: {}", self.display_path(name), e);
                false
            }
        }
    }

    /// Read a variable, reporting why the value is unavailable
    pub async fn try_read<T: UaValue>(&self, name: &str) -> ReadOutcome<T> {
        let result = async {
            let node_id = self.member_node(name).await?;
            RemoteVariable::new(&self.supervisor, node_id).read().await
        }
        .await;

        let variant = match result {
            Ok(variant) => variant,
            Err(e) => {
                log::warn!("Reading {} failed: {}", self.display_path(name), e);
                return ReadOutcome::Unavailable(e);
            }
        };

        match T::from_variant(&variant) {
            Ok(value) => ReadOutcome::Value(value),
            Err(e) => {
                log::error!("Value of {} has unexpected type: {}", self.display_path(name), e);
                ReadOutcome::Unavailable(e)
            }
        }
    }

    /// Read a variable, falling back to `T::default()` if it is unavailable
    pub async fn read<T: UaValue + Default>(&self, name: &str) -> T {
        self.try_read(name).await.or_default()
    }

    /// Call a method and map its single output
    pub async fn try_invoke<T: UaValue>(
        &self,
        name: &str,
        args: &[&(dyn AsVariant + Sync)],
    ) -> UaclResult<T> {
        let arguments: Vec<Variant> = args.iter().map(|arg| arg.as_variant()).collect();
        let object_id = self.object_node().await?;
        let method_id = self.member_node(name).await?;

        let outputs = RemoteMethod::new(&self.supervisor, object_id, method_id)
            .call(arguments)
            .await?;
        match outputs.first() {
            Some(output) => T::from_variant(output),
            None => T::from_variant(&Variant::Empty),
        }
    }

    /// Call a method, falling back to `T::default()` on failure
    pub async fn invoke<T: UaValue + Default>(
        &self,
        name: &str,
        args: &[&(dyn AsVariant + Sync)],
    ) -> T {
        match self.try_invoke(name, args).await {
            Ok(value) => value,
            Err(e) => {
                log::warn!("Calling {} failed: {}", self.display_path(name), e);
                T::default()
            }
        }
    }

    /// Call a method without output
    ///
    /// # Returns
    /// `true` if the server accepted the call
    pub async fn invoke_void(&self, name: &str, args: &[&(dyn AsVariant + Sync)]) -> bool {
        match self.try_invoke::<()>(name, args).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Calling {} failed: {}", self.display_path(name), e);
                false
            }
        }
    }

    /// Subscribe to value changes of a variable
    pub async fn monitor<F>(&self, name: &str, callback: F) -> bool
    where
        F: Fn(&Variant) + Send + Sync + 'static,
    {
        self.register_monitor(name, Arc::new(callback)).await
    }

    /// Subscribe to several variables at once
    ///
    /// Each registration is independent; failures are logged per variable.
    ///
    /// # Returns
    /// The number of monitors registered
    pub async fn monitor_all(&self, monitors: HashMap<String, DataChangeCallback>) -> usize {
        let mut registered = 0;
        for (name, callback) in monitors {
            if self.register_monitor(&name, callback).await {
                registered += 1;
            }
        }
        registered
    }

    async fn register_monitor(&self, name: &str, callback: DataChangeCallback) -> bool {
        let result = async {
            let node_id = self.member_node(name).await?;
            RemoteDataMonitor::new(&self.supervisor, node_id, callback)
                .register()
                .await
        }
        .await;

        match result {
            Ok(item_id) => {
                log::debug!("Monitoring {} as item {}", self.display_path(name), item_id);
                true
            }
            Err(e) => {
                log::warn!("Monitoring {} failed: {}", self.display_path(name), e);
                false
            }
        }
    }

    /// Run an arbitrary session operation, exposing the raw result
    ///
    /// # Errors
    /// [`UaclError::NotConnected`](uacl_core::UaclError::NotConnected) if the session is not connected
    pub async fn execute<T, F, Fut>(&self, action: F) -> UaclResult<T>
    where
        F: FnOnce(Arc<dyn UaSession>) -> Fut,
        Fut: Future<Output = UaclResult<T>>,
    {
        self.supervisor.execute(action).await
    }

    /// Drop all cached node ids
    ///
    /// Needed only when the server rebuilt its address space.
    pub fn clear_node_cache(&self) {
        self.node_ids
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        *self.object_id.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl std::fmt::Debug for RemoteObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteObject")
            .field("endpoint", &self.supervisor.info().endpoint_url())
            .field("object_path", &self.object_path)
            .finish()
    }
}
