//! Per-call command objects
//!
//! Each accessor is built for one protocol operation against an already
//! resolved node and runs it through [`ConnectionSupervisor::execute`].

use crate::connection::{ConnectionSupervisor, DataChangeCallback};
use uacl_core::{NodeId, UaclError, UaclResult, Variant};

/// Result of a read that may fall back to a default value
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome<T> {
    Value(T),
    /// The value could not be read or mapped
    Unavailable(UaclError),
}

impl<T> ReadOutcome<T> {
    pub fn is_value(&self) -> bool {
        matches!(self, ReadOutcome::Value(_))
    }

    pub fn value(self) -> Option<T> {
        match self {
            ReadOutcome::Value(v) => Some(v),
            ReadOutcome::Unavailable(_) => None,
        }
    }

    pub fn into_result(self) -> UaclResult<T> {
        match self {
            ReadOutcome::Value(v) => Ok(v),
            ReadOutcome::Unavailable(e) => Err(e),
        }
    }
}

impl<T: Default> ReadOutcome<T> {
    /// The read value, or `T::default()` if it was unavailable
    pub fn or_default(self) -> T {
        self.value().unwrap_or_default()
    }
}

/// A variable node to read or write once
pub struct RemoteVariable<'a> {
    supervisor: &'a ConnectionSupervisor,
    node_id: NodeId,
}

impl<'a> RemoteVariable<'a> {
    pub fn new(supervisor: &'a ConnectionSupervisor, node_id: NodeId) -> Self {
        Self {
            supervisor,
            node_id,
        }
    }

    pub async fn read(&self) -> UaclResult<Variant> {
        let node_id = self.node_id.clone();
        self.supervisor
            .execute(move |session| async move { session.read_value(&node_id).await })
            .await
    }

    pub async fn write(&self, value: Variant) -> UaclResult<()> {
        let node_id = self.node_id.clone();
        self.supervisor
            .execute(move |session| async move { session.write_value(&node_id, value).await })
            .await
    }
}

/// A method node to call once
pub struct RemoteMethod<'a> {
    supervisor: &'a ConnectionSupervisor,
    object_id: NodeId,
    method_id: NodeId,
}

impl<'a> RemoteMethod<'a> {
    pub fn new(supervisor: &'a ConnectionSupervisor, object_id: NodeId, method_id: NodeId) -> Self {
        Self {
            supervisor,
            object_id,
            method_id,
        }
    }

    pub async fn call(&self, arguments: Vec<Variant>) -> UaclResult<Vec<Variant>> {
        let object_id = self.object_id.clone();
        let method_id = self.method_id.clone();
        self.supervisor
            .execute(move |session| async move {
                session.call_method(&object_id, &method_id, arguments).await
            })
            .await
    }
}

/// A data-change subscription to register once
pub struct RemoteDataMonitor<'a> {
    supervisor: &'a ConnectionSupervisor,
    node_id: NodeId,
    callback: DataChangeCallback,
}

impl<'a> RemoteDataMonitor<'a> {
    pub fn new(
        supervisor: &'a ConnectionSupervisor,
        node_id: NodeId,
        callback: DataChangeCallback,
    ) -> Self {
        Self {
            supervisor,
            node_id,
            callback,
        }
    }

    /// Create the monitored item, returning its id
    pub async fn register(self) -> UaclResult<u32> {
        let node_id = self.node_id;
        let callback = self.callback;
        self.supervisor
            .execute(move |session| async move {
                session.create_monitored_item(&node_id, callback).await
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_outcome_fallback() {
        let value: ReadOutcome<i32> = ReadOutcome::Value(42);
        assert!(value.is_value());
        assert_eq!(value.or_default(), 42);

        let missing: ReadOutcome<String> = ReadOutcome::Unavailable(UaclError::NotConnected);
        assert!(!missing.is_value());
        assert_eq!(missing.clone().into_result(), Err(UaclError::NotConnected));
        assert_eq!(missing.or_default(), String::new());
    }
}
