//! Dispatch engine
//!
//! Routes reads, writes and method calls that target materialized nodes to
//! the live business object members behind them. Nodes without user data
//! fall back to the address space's own storage.
//!
//! Method calls:
//! - void methods run on tokio's blocking pool and report `Good` as soon as
//!   they are scheduled; their failures are only logged
//! - value-returning methods run on the calling thread; failures and panics
//!   become `BadUnexpectedError`

use crate::address_space::{AddressSpace, AttributeId, DataValue, NodeUserData};
use crate::context::{SessionContexts, SessionId};
use crate::model::{BoundMethod, MethodCall};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tokio::runtime::Handle;
use uacl_core::{NodeId, StatusCode, UaclError, UaclResult, Variant};

/// Outcome of one method call
#[derive(Debug, Clone, PartialEq)]
pub struct CallMethodResult {
    pub status: StatusCode,
    pub outputs: Vec<Variant>,
}

impl CallMethodResult {
    pub fn bad(status: StatusCode) -> Self {
        Self {
            status,
            outputs: Vec::new(),
        }
    }
}

pub struct DispatchEngine {
    space: Arc<AddressSpace>,
    contexts: Arc<SessionContexts>,
}

impl DispatchEngine {
    pub fn new(space: Arc<AddressSpace>, contexts: Arc<SessionContexts>) -> Self {
        Self { space, contexts }
    }

    /// Invoke the method behind `method_id` on the object `object_id`
    ///
    /// `requested_outputs` is the number of output slots the caller expects.
    pub fn call_method(
        &self,
        session: Option<SessionId>,
        object_id: &NodeId,
        method_id: &NodeId,
        inputs: &[Variant],
        requested_outputs: usize,
    ) -> CallMethodResult {
        let record = match self.space.user_data(method_id) {
            Some(NodeUserData::Method(record)) if record.object_id == *object_id => record,
            Some(NodeUserData::Method(_)) => {
                log::debug!("Method {} is not a member of {}", method_id, object_id);
                return CallMethodResult::bad(StatusCode::BAD_METHOD_INVALID);
            }
            _ => {
                log::debug!("No method bound to {}", method_id);
                return CallMethodResult::bad(StatusCode::BAD_METHOD_INVALID);
            }
        };
        let method = Arc::clone(&record.method);

        if let Err(e) = validate_arguments(&method, inputs, requested_outputs) {
            log::warn!("Rejected call of {}: {}", method_id, e);
            return CallMethodResult::bad(StatusCode::from(&e));
        }

        let context = if method.takes_session_context() {
            session.and_then(|id| self.contexts.get(id))
        } else {
            None
        };
        let call = MethodCall::new(context, inputs.to_vec());

        if method.is_void() {
            schedule_void(method, call, method_id.clone());
            return CallMethodResult {
                status: StatusCode::GOOD,
                outputs: Vec::new(),
            };
        }

        // Output slot placeholder, overwritten by the mapped result
        let mut outputs = vec![placeholder(&method)];
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| method.invoke(&call)));
        let status = match outcome {
            Ok(Ok(value)) => match method.output() {
                Some(output) if output.descriptor.accepts(&value) => {
                    outputs[0] = value;
                    StatusCode::GOOD
                }
                Some(output) => {
                    log::error!(
                        "Method {} returned {} instead of {}",
                        method_id,
                        value.type_name(),
                        output.descriptor
                    );
                    StatusCode::BAD_UNEXPECTED_ERROR
                }
                None => StatusCode::GOOD,
            },
            Ok(Err(e)) => {
                log::error!("Method {} failed: {:#}", method_id, e);
                StatusCode::BAD_UNEXPECTED_ERROR
            }
            Err(payload) => {
                log::error!("Method {} panicked: {}", method_id, panic_message(payload.as_ref()));
                StatusCode::BAD_UNEXPECTED_ERROR
            }
        };

        CallMethodResult { status, outputs }
    }

    /// Read an attribute
    ///
    /// The value of a variable bound to a business object is read live and
    /// cached in node storage.
    pub fn read_attribute(&self, node_id: &NodeId, attribute: AttributeId) -> DataValue {
        if attribute == AttributeId::Value {
            if let Some(NodeUserData::Variable(variable)) = self.space.user_data(node_id) {
                let value = variable.read();
                self.space.refresh_value(node_id, value.clone());
                return DataValue::good(value);
            }
        }
        self.space.read_attribute(node_id, attribute)
    }

    /// Write an attribute
    ///
    /// # Returns
    /// `Good` only if node storage and the bound member both accepted the value
    pub fn write_attribute(
        &self,
        node_id: &NodeId,
        attribute: AttributeId,
        value: Variant,
    ) -> StatusCode {
        let variable = match self.space.user_data(node_id) {
            Some(NodeUserData::Variable(variable)) if attribute == AttributeId::Value => variable,
            _ => return self.space.write_attribute(node_id, attribute, value),
        };
        if !variable.is_writable() {
            return StatusCode::BAD_NOT_WRITABLE;
        }

        // The member must accept the value before storage and monitors see it
        let status = self.space.check_value(node_id, &value);
        if status.is_bad() {
            return status;
        }
        if let Err(e) = variable.write(&value) {
            log::warn!("{} rejected {}: {}", node_id, value, e);
            return StatusCode::from(&e);
        }
        self.space.write_value(node_id, value)
    }

    /// Delete a node and its subtree
    pub fn delete_node(&self, node_id: &NodeId) -> bool {
        self.space.delete_subtree(node_id).is_good()
    }
}

fn validate_arguments(
    method: &BoundMethod,
    inputs: &[Variant],
    requested_outputs: usize,
) -> UaclResult<()> {
    if requested_outputs > 1 {
        return Err(UaclError::InvalidArguments(format!(
            "{} output slots requested, at most one supported",
            requested_outputs
        )));
    }
    if inputs.len() != method.inputs().len() {
        return Err(UaclError::InvalidArguments(format!(
            "{} expects {} arguments, got {}",
            method.name(),
            method.inputs().len(),
            inputs.len()
        )));
    }
    for (index, (input, declared)) in inputs.iter().zip(method.inputs()).enumerate() {
        if !declared.descriptor.accepts(input) {
            return Err(UaclError::type_mapping(
                declared.descriptor.to_string(),
                format!("{} at argument {}", input.type_name(), index),
            ));
        }
    }
    Ok(())
}

fn placeholder(method: &BoundMethod) -> Variant {
    match method.output() {
        Some(output) if output.descriptor.is_array() => Variant::ByteString(Vec::new()),
        _ => Variant::Empty,
    }
}

fn schedule_void(method: Arc<BoundMethod>, call: MethodCall, method_id: NodeId) {
    let job = move || {
        match panic::catch_unwind(AssertUnwindSafe(|| method.invoke(&call))) {
            Ok(Ok(_)) => log::debug!("Method {} completed", method_id),
            Ok(Err(e)) => log::error!("Method {} failed: {:#}", method_id, e),
            Err(payload) => {
                log::error!("Method {} panicked: {}", method_id, panic_message(payload.as_ref()))
            }
        }
    };

    match Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn_blocking(job);
        }
        Err(_) => {
            std::thread::spawn(job);
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::AddressSpaceBuilder;
    use crate::config::ServerConfig;
    use crate::model::{MethodBinding, ObjectCapsule, ObjectDescriptor, UaObject};
    use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Pump {
        speed: AtomicI32,
        started: AtomicBool,
        attempts: AtomicI32,
        operator: Mutex<Option<String>>,
    }

    impl UaObject for Pump {
        fn describe() -> ObjectDescriptor<Self> {
            ObjectDescriptor::new()
                .variable_rw(
                    "Speed",
                    |p: &Pump| p.speed.load(Ordering::SeqCst),
                    |p: &Pump, v: i32| p.speed.store(v, Ordering::SeqCst),
                )
                .variable("Running", |p: &Pump| p.started.load(Ordering::SeqCst))
                .method(MethodBinding::new("Start", |p: &Pump, _call| {
                    p.started.store(true, Ordering::SeqCst);
                    Ok(Variant::Empty)
                }))
                .method(MethodBinding::new("Jam", |p: &Pump, _call| {
                    p.attempts.fetch_add(1, Ordering::SeqCst);
                    anyhow::bail!("pump jammed")
                }))
                .method(MethodBinding::new("Crash", |p: &Pump, _call| -> anyhow::Result<Variant> {
                    p.attempts.fetch_add(1, Ordering::SeqCst);
                    panic!("motor burnt out")
                }))
                .method(
                    MethodBinding::new("Scale", |p: &Pump, call| {
                        let factor = call.arg::<f64>(0)?;
                        Ok(Variant::Double(p.speed.load(Ordering::SeqCst) as f64 * factor))
                    })
                    .input::<f64>("factor")
                    .output::<f64>(),
                )
                .method(
                    MethodBinding::new("Fail", |_: &Pump, _call| {
                        anyhow::bail!("pump jammed")
                    })
                    .output::<i32>(),
                )
                .method(
                    MethodBinding::new("Explode", |_: &Pump, _call| -> anyhow::Result<Variant> {
                        panic!("boom")
                    })
                    .output::<Vec<i32>>(),
                )
                .method(
                    MethodBinding::new("WhoAmI", |p: &Pump, call| {
                        let operator = call.context_as::<String>().cloned();
                        *p.operator.lock().unwrap() = operator.clone();
                        Ok(Variant::String(operator.unwrap_or_default()))
                    })
                    .with_session_context()
                    .output::<String>(),
                )
        }
    }

    struct Fixture {
        engine: DispatchEngine,
        contexts: Arc<SessionContexts>,
        pump: Arc<Pump>,
    }

    fn fixture() -> Fixture {
        let space = Arc::new(AddressSpace::new());
        let contexts = Arc::new(SessionContexts::new());
        let builder = AddressSpaceBuilder::new(Arc::clone(&space), &ServerConfig::default()).unwrap();
        let pump = Arc::new(Pump::default());
        builder
            .materialize(&ObjectCapsule::new(Arc::clone(&pump)))
            .unwrap();
        Fixture {
            engine: DispatchEngine::new(space, Arc::clone(&contexts)),
            contexts,
            pump,
        }
    }

    fn id(name: &str) -> NodeId {
        NodeId::string(1, name)
    }

    #[test]
    fn test_read_write_bound_variable() {
        let f = fixture();
        let speed = id("Pump_1.Speed");

        assert_eq!(
            f.engine.write_attribute(&speed, AttributeId::Value, Variant::Int32(42)),
            StatusCode::GOOD
        );
        assert_eq!(f.pump.speed.load(Ordering::SeqCst), 42);
        assert_eq!(
            f.engine.read_attribute(&speed, AttributeId::Value),
            DataValue::good(Variant::Int32(42))
        );

        f.pump.speed.store(7, Ordering::SeqCst);
        assert_eq!(
            f.engine.read_attribute(&speed, AttributeId::Value).value,
            Variant::Int32(7)
        );
    }

    #[test]
    fn test_write_rejections() {
        let f = fixture();
        assert_eq!(
            f.engine
                .write_attribute(&id("Pump_1.Speed"), AttributeId::Value, Variant::Double(1.0)),
            StatusCode::BAD_TYPE_MISMATCH
        );
        assert_eq!(f.pump.speed.load(Ordering::SeqCst), 0);
        assert_eq!(
            f.engine
                .write_attribute(&id("Pump_1.Running"), AttributeId::Value, Variant::Boolean(true)),
            StatusCode::BAD_NOT_WRITABLE
        );
        assert_eq!(
            f.engine
                .write_attribute(&id("Pump_1.Nothing"), AttributeId::Value, Variant::Int32(1)),
            StatusCode::BAD_NODE_ID_UNKNOWN
        );
    }

    #[test]
    fn test_rejected_write_leaves_storage_and_monitors_untouched() {
        let f = fixture();
        let speed = id("Pump_1.Speed");
        assert_eq!(
            f.engine.write_attribute(&speed, AttributeId::Value, Variant::Int32(5)),
            StatusCode::GOOD
        );

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        f.engine
            .space
            .add_value_observer(
                &speed,
                Arc::new(move |value: &Variant| sink.lock().unwrap().push(value.clone())),
            )
            .unwrap();

        // Empty passes the storage type check but not the i32 setter
        assert_eq!(
            f.engine.write_attribute(&speed, AttributeId::Value, Variant::Empty),
            StatusCode::BAD_TYPE_MISMATCH
        );
        assert_eq!(f.pump.speed.load(Ordering::SeqCst), 5);
        assert_eq!(
            f.engine.space.node(&speed).unwrap().value,
            Variant::Int32(5)
        );
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_value_method() {
        let f = fixture();
        f.pump.speed.store(10, Ordering::SeqCst);

        let result = f.engine.call_method(
            None,
            &id("Pump_1"),
            &id("Pump_1.Scale"),
            &[Variant::Double(1.5)],
            1,
        );
        assert_eq!(result.status, StatusCode::GOOD);
        assert_eq!(result.outputs, vec![Variant::Double(15.0)]);
    }

    #[test]
    fn test_argument_validation() {
        let f = fixture();
        let call = |inputs: &[Variant], outputs| {
            f.engine
                .call_method(None, &id("Pump_1"), &id("Pump_1.Scale"), inputs, outputs)
                .status
        };

        assert_eq!(call(&[], 1), StatusCode::BAD_INVALID_ARGUMENT);
        assert_eq!(call(&[Variant::Double(1.0)], 2), StatusCode::BAD_INVALID_ARGUMENT);
        assert_eq!(call(&[Variant::Int32(1)], 1), StatusCode::BAD_TYPE_MISMATCH);
        assert_eq!(
            f.engine
                .call_method(None, &id("application"), &id("Pump_1.Scale"), &[Variant::Double(1.0)], 1)
                .status,
            StatusCode::BAD_METHOD_INVALID
        );
        assert_eq!(
            f.engine
                .call_method(None, &id("Pump_1"), &id("Pump_1.Speed"), &[], 0)
                .status,
            StatusCode::BAD_METHOD_INVALID
        );
    }

    #[test]
    fn test_failing_methods_report_unexpected_error() {
        let f = fixture();

        let failed = f
            .engine
            .call_method(None, &id("Pump_1"), &id("Pump_1.Fail"), &[], 1);
        assert_eq!(failed.status, StatusCode::BAD_UNEXPECTED_ERROR);
        assert_eq!(failed.outputs, vec![Variant::Empty]);

        let exploded = f
            .engine
            .call_method(None, &id("Pump_1"), &id("Pump_1.Explode"), &[], 1);
        assert_eq!(exploded.status, StatusCode::BAD_UNEXPECTED_ERROR);
        assert_eq!(exploded.outputs, vec![Variant::ByteString(vec![])]);
    }

    #[test]
    fn test_session_context_slot() {
        let f = fixture();
        let operator = f.contexts.open(Some(Arc::new("alice".to_string())));
        let anonymous = f.contexts.open(None);

        let result = f.engine.call_method(
            Some(operator),
            &id("Pump_1"),
            &id("Pump_1.WhoAmI"),
            &[],
            1,
        );
        assert_eq!(result.outputs, vec![Variant::String("alice".into())]);

        let result = f.engine.call_method(
            Some(anonymous),
            &id("Pump_1"),
            &id("Pump_1.WhoAmI"),
            &[],
            1,
        );
        assert_eq!(result.status, StatusCode::GOOD);
        assert!(f.pump.operator.lock().unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_void_method_runs_in_background() {
        let f = fixture();

        let result = f
            .engine
            .call_method(None, &id("Pump_1"), &id("Pump_1.Start"), &[], 0);
        assert_eq!(result.status, StatusCode::GOOD);
        assert!(result.outputs.is_empty());

        tokio::time::timeout(Duration::from_secs(5), async {
            while !f.pump.started.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failing_void_methods_answer_good() {
        let f = fixture();

        for method in ["Pump_1.Jam", "Pump_1.Crash"] {
            let result = f.engine.call_method(None, &id("Pump_1"), &id(method), &[], 0);
            assert_eq!(result.status, StatusCode::GOOD);
            assert!(result.outputs.is_empty());
        }

        // Later void calls still run after an error and a panic
        let result = f
            .engine
            .call_method(None, &id("Pump_1"), &id("Pump_1.Start"), &[], 0);
        assert_eq!(result.status, StatusCode::GOOD);

        tokio::time::timeout(Duration::from_secs(5), async {
            while !f.pump.started.load(Ordering::SeqCst)
                || f.pump.attempts.load(Ordering::SeqCst) < 2
            {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[test]
    fn test_void_method_without_runtime() {
        let f = fixture();
        let result = f
            .engine
            .call_method(None, &id("Pump_1"), &id("Pump_1.Start"), &[], 0);
        assert_eq!(result.status, StatusCode::GOOD);

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !f.pump.started.load(Ordering::SeqCst) {
            assert!(std::time::Instant::now() < deadline);
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn test_delete_node() {
        let f = fixture();
        assert!(f.engine.delete_node(&id("Pump_1")));
        assert!(!f.engine.delete_node(&id("Pump_1")));
        assert_eq!(
            f.engine
                .read_attribute(&id("Pump_1.Speed"), AttributeId::Value)
                .status,
            StatusCode::BAD_NODE_ID_UNKNOWN
        );
    }
}
