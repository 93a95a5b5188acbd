//! Members bound to one object instance
//!
//! Binding erases the object type: each bound member closes over the
//! instance and is used through `dyn` closures only.

use crate::model::capsule::ObjectCapsule;
use crate::model::descriptor::{
    Argument, CollectionBinding, MethodBinding, MethodCall, VariableBinding,
};
use std::fmt;
use std::sync::Arc;
use uacl_core::{NodeId, StatusCode, TypeDescriptor, UaclError, UaclResult, Variant};

type ReadFn = Box<dyn Fn() -> Variant + Send + Sync>;
type WriteFn = Box<dyn Fn(&Variant) -> UaclResult<()> + Send + Sync>;
type InvokeFn = Box<dyn Fn(&MethodCall) -> anyhow::Result<Variant> + Send + Sync>;
type ElementsFn = Box<dyn Fn() -> Vec<ObjectCapsule> + Send + Sync>;

/// A variable of a live object
pub struct BoundVariable {
    name: String,
    descriptor: TypeDescriptor,
    read: ReadFn,
    write: Option<WriteFn>,
}

impl BoundVariable {
    pub(crate) fn bind<T: Send + Sync + 'static>(
        binding: &VariableBinding<T>,
        object: &Arc<T>,
    ) -> Self {
        let getter = Arc::clone(&binding.getter);
        let target = Arc::clone(object);
        let write = binding.setter.as_ref().map(|setter| {
            let setter = Arc::clone(setter);
            let target = Arc::clone(object);
            Box::new(move |value: &Variant| setter(&target, value)) as WriteFn
        });

        Self {
            name: binding.name.clone(),
            descriptor: binding.descriptor,
            read: Box::new(move || getter(&target)),
            write,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> TypeDescriptor {
        self.descriptor
    }

    /// Current value of the member
    pub fn read(&self) -> Variant {
        (self.read)()
    }

    pub fn is_writable(&self) -> bool {
        self.write.is_some()
    }

    /// Push a value into the member
    ///
    /// # Errors
    /// `BadStatus(BAD_NOT_WRITABLE)` for read-only members, a mapping error if
    /// the value has the wrong type
    pub fn write(&self, value: &Variant) -> UaclResult<()> {
        match &self.write {
            Some(write) => write(value),
            None => Err(UaclError::BadStatus(StatusCode::BAD_NOT_WRITABLE)),
        }
    }
}

impl fmt::Debug for BoundVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundVariable")
            .field("name", &self.name)
            .field("descriptor", &self.descriptor)
            .field("writable", &self.is_writable())
            .finish()
    }
}

/// A method of a live object
pub struct BoundMethod {
    name: String,
    inputs: Vec<Argument>,
    output: Option<Argument>,
    with_context: bool,
    invoke: InvokeFn,
}

impl BoundMethod {
    pub(crate) fn bind<T: Send + Sync + 'static>(binding: &MethodBinding<T>, object: &Arc<T>) -> Self {
        let handler = Arc::clone(&binding.handler);
        let target = Arc::clone(object);

        Self {
            name: binding.name.clone(),
            inputs: binding.inputs.clone(),
            output: binding
                .output
                .map(|descriptor| Argument::new("Result", descriptor)),
            with_context: binding.with_context,
            invoke: Box::new(move |call: &MethodCall| handler(&target, call)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared inputs, without the session context slot
    pub fn inputs(&self) -> &[Argument] {
        &self.inputs
    }

    pub fn output(&self) -> Option<&Argument> {
        self.output.as_ref()
    }

    pub fn is_void(&self) -> bool {
        self.output.is_none()
    }

    pub fn takes_session_context(&self) -> bool {
        self.with_context
    }

    /// Number of native parameters: the inputs plus the context slot
    pub fn native_arity(&self) -> usize {
        self.inputs.len() + usize::from(self.with_context)
    }

    pub fn invoke(&self, call: &MethodCall) -> anyhow::Result<Variant> {
        (self.invoke)(call)
    }
}

impl fmt::Debug for BoundMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundMethod")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("output", &self.output)
            .field("with_context", &self.with_context)
            .finish()
    }
}

/// A collection of a live object
pub struct BoundCollection {
    name: String,
    elements: ElementsFn,
}

impl BoundCollection {
    pub(crate) fn bind<T: Send + Sync + 'static>(
        binding: &CollectionBinding<T>,
        object: &Arc<T>,
    ) -> Self {
        let elements = Arc::clone(&binding.elements);
        let target = Arc::clone(object);

        Self {
            name: binding.name.clone(),
            elements: Box::new(move || elements(&target)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn elements(&self) -> Vec<ObjectCapsule> {
        (self.elements)()
    }
}

/// Target of a method node: the owning object node and the bound method
#[derive(Debug, Clone)]
pub struct MethodDispatchRecord {
    pub object_id: NodeId,
    pub method: Arc<BoundMethod>,
}
