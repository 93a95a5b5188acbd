//! Declarative object descriptions
//!
//! A type exposes members by returning an [`ObjectDescriptor`] from
//! [`UaObject::describe`]:
//!
//! ```rust
//! use std::sync::atomic::{AtomicI32, Ordering};
//! use uacl_core::UaValue;
//! use uacl_server::model::{MethodBinding, ObjectDescriptor, UaObject};
//!
//! #[derive(Default)]
//! struct Pump {
//!     speed: AtomicI32,
//! }
//!
//! impl UaObject for Pump {
//!     fn describe() -> ObjectDescriptor<Self> {
//!         ObjectDescriptor::new()
//!             .variable_rw(
//!                 "Speed",
//!                 |p: &Pump| p.speed.load(Ordering::SeqCst),
//!                 |p: &Pump, v: i32| p.speed.store(v, Ordering::SeqCst),
//!             )
//!             .method(
//!                 MethodBinding::new("Double", |p: &Pump, _call| {
//!                     Ok((p.speed.load(Ordering::SeqCst) * 2).to_variant())
//!                 })
//!                 .output::<i32>(),
//!             )
//!     }
//! }
//! ```
//!
//! Business objects are shared between the server and the application, so
//! accessors take `&self` and mutate through interior mutability.

use crate::model::capsule::ObjectCapsule;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use uacl_core::{TypeDescriptor, UaValue, UaclError, UaclResult, Variant};

/// Per-session value handed to methods declared with a session context
pub type SessionContext = Arc<dyn Any + Send + Sync>;

pub(crate) type Getter<T> = Arc<dyn Fn(&T) -> Variant + Send + Sync>;
pub(crate) type Setter<T> = Arc<dyn Fn(&T, &Variant) -> UaclResult<()> + Send + Sync>;
pub(crate) type Handler<T> = Arc<dyn Fn(&T, &MethodCall) -> anyhow::Result<Variant> + Send + Sync>;
pub(crate) type Elements<T> = Arc<dyn Fn(&T) -> Vec<ObjectCapsule> + Send + Sync>;

/// A type whose instances can be placed in the address space
pub trait UaObject: Sized + Send + Sync + 'static {
    fn describe() -> ObjectDescriptor<Self>;
}

/// Name and protocol type of a method argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Argument {
    pub name: String,
    pub descriptor: TypeDescriptor,
}

impl Argument {
    pub fn new(name: &str, descriptor: TypeDescriptor) -> Self {
        Self {
            name: name.to_string(),
            descriptor,
        }
    }
}

/// Arguments of one method invocation
pub struct MethodCall {
    context: Option<SessionContext>,
    arguments: Vec<Variant>,
}

impl MethodCall {
    pub fn new(context: Option<SessionContext>, arguments: Vec<Variant>) -> Self {
        Self { context, arguments }
    }

    pub fn arguments(&self) -> &[Variant] {
        &self.arguments
    }

    /// Input argument `index` converted to a native value
    pub fn arg<V: UaValue>(&self, index: usize) -> UaclResult<V> {
        let value = self.arguments.get(index).ok_or_else(|| {
            UaclError::InvalidArguments(format!("Missing argument {}", index))
        })?;
        V::from_variant(value)
    }

    /// Context of the calling session
    ///
    /// Always `None` for methods not declared with
    /// [`MethodBinding::with_session_context`].
    pub fn context(&self) -> Option<&SessionContext> {
        self.context.as_ref()
    }

    pub fn context_as<C: Any>(&self) -> Option<&C> {
        self.context.as_ref()?.downcast_ref::<C>()
    }
}

impl fmt::Debug for MethodCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodCall")
            .field("context", &self.context.is_some())
            .field("arguments", &self.arguments)
            .finish()
    }
}

/// A variable member
pub struct VariableBinding<T> {
    pub(crate) name: String,
    pub(crate) descriptor: TypeDescriptor,
    pub(crate) getter: Getter<T>,
    pub(crate) setter: Option<Setter<T>>,
}

/// A method member
pub struct MethodBinding<T> {
    pub(crate) name: String,
    pub(crate) inputs: Vec<Argument>,
    pub(crate) output: Option<TypeDescriptor>,
    pub(crate) with_context: bool,
    pub(crate) handler: Handler<T>,
}

impl<T> MethodBinding<T> {
    /// Create a method without inputs or output
    ///
    /// The handler's returned variant is the method output; void methods
    /// return [`Variant::Empty`]. Errors are reported to the caller as a bad
    /// status.
    pub fn new<F>(name: &str, handler: F) -> Self
    where
        F: Fn(&T, &MethodCall) -> anyhow::Result<Variant> + Send + Sync + 'static,
    {
        Self {
            name: name.to_string(),
            inputs: Vec::new(),
            output: None,
            with_context: false,
            handler: Arc::new(handler),
        }
    }

    /// Append an input argument
    pub fn input<V: UaValue>(mut self, name: &str) -> Self {
        self.inputs.push(Argument::new(name, V::type_descriptor()));
        self
    }

    /// Declare the single output
    pub fn output<V: UaValue>(mut self) -> Self {
        self.output = Some(V::type_descriptor());
        self
    }

    /// Pass the calling session's context in [`MethodCall::context`]
    ///
    /// The context slot is not part of the method's declared inputs.
    pub fn with_session_context(mut self) -> Self {
        self.with_context = true;
        self
    }
}

/// A collection member whose elements become child objects
pub struct CollectionBinding<T> {
    pub(crate) name: String,
    pub(crate) elements: Elements<T>,
}

/// Static description of a [`UaObject`] type
pub struct ObjectDescriptor<T> {
    pub(crate) type_name: String,
    pub(crate) variables: Vec<VariableBinding<T>>,
    pub(crate) methods: Vec<MethodBinding<T>>,
    pub(crate) collections: Vec<CollectionBinding<T>>,
}

impl<T: UaObject> ObjectDescriptor<T> {
    /// Describe `T` under its unqualified Rust type name
    pub fn new() -> Self {
        let full = std::any::type_name::<T>();
        let short = full.rsplit("::").next().unwrap_or(full);
        Self::named(short)
    }

    /// Describe `T` under a custom type name
    pub fn named(type_name: &str) -> Self {
        Self {
            type_name: type_name.to_string(),
            variables: Vec::new(),
            methods: Vec::new(),
            collections: Vec::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Whether `name` is still free among all member kinds
    ///
    /// Member names become node ids, so a duplicate is dropped and the first
    /// declaration wins.
    fn accepts_member(&self, name: &str) -> bool {
        let taken = self.variables.iter().any(|v| v.name == name)
            || self.methods.iter().any(|m| m.name == name)
            || self.collections.iter().any(|c| c.name == name);
        if taken {
            log::warn!("{} declares member {} twice, ignoring the duplicate", self.type_name, name);
        }
        !taken
    }

    /// Add a read-only variable
    pub fn variable<V, G>(mut self, name: &str, getter: G) -> Self
    where
        V: UaValue,
        G: Fn(&T) -> V + Send + Sync + 'static,
    {
        if !self.accepts_member(name) {
            return self;
        }
        self.variables.push(VariableBinding {
            name: name.to_string(),
            descriptor: V::type_descriptor(),
            getter: Arc::new(move |object: &T| getter(object).to_variant()),
            setter: None,
        });
        self
    }

    /// Add a writable variable
    ///
    /// Written values are converted with the mapper first; a value of the
    /// wrong type never reaches `setter`.
    pub fn variable_rw<V, G, S>(mut self, name: &str, getter: G, setter: S) -> Self
    where
        V: UaValue,
        G: Fn(&T) -> V + Send + Sync + 'static,
        S: Fn(&T, V) + Send + Sync + 'static,
    {
        if !self.accepts_member(name) {
            return self;
        }
        self.variables.push(VariableBinding {
            name: name.to_string(),
            descriptor: V::type_descriptor(),
            getter: Arc::new(move |object: &T| getter(object).to_variant()),
            setter: Some(Arc::new(move |object: &T, value: &Variant| {
                setter(object, V::from_variant(value)?);
                Ok(())
            })),
        });
        self
    }

    pub fn method(mut self, binding: MethodBinding<T>) -> Self {
        if self.accepts_member(&binding.name) {
            self.methods.push(binding);
        }
        self
    }

    /// Add a collection of child objects
    ///
    /// `elements` should hand out the same capsules on every call; a capsule
    /// is materialized only once no matter how often it is returned.
    pub fn collection<F>(mut self, name: &str, elements: F) -> Self
    where
        F: Fn(&T) -> Vec<ObjectCapsule> + Send + Sync + 'static,
    {
        if !self.accepts_member(name) {
            return self;
        }
        self.collections.push(CollectionBinding {
            name: name.to_string(),
            elements: Arc::new(elements),
        });
        self
    }
}

impl<T: UaObject> Default for ObjectDescriptor<T> {
    fn default() -> Self {
        Self::new()
    }
}
