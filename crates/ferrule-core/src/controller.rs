// crates/ferrule-core/src/controller.rs
//
// The controller surface: how live service objects expose their members to
// the router compiler.
//
// A controller records its declarations once (`declare`), lists the members
// it can serve together with their positional arity (`members`), and runs a
// member given the arguments reconstructed from its parameter bindings
// (`invoke`).

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::RpcError;
use crate::store::{ClassKey, DeclarationStore};
use crate::types::{ParamSource, Reply, RpcResult};

/// A member a controller can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Member {
    /// Member identifier, used as the default endpoint name.
    pub name: &'static str,
    /// Number of positional arguments the member receives.
    pub arity: usize,
}

impl Member {
    pub const fn new(name: &'static str, arity: usize) -> Self {
        Self { name, arity }
    }
}

/// A service object whose members become endpoints.
#[async_trait]
pub trait Controller<C>: Send + Sync + 'static {
    /// Record this type's declarations.
    fn declare(store: &mut DeclarationStore<C>)
    where
        Self: Sized;

    /// Every member this controller can serve, in a stable order.
    fn members(&self) -> Vec<Member>;

    /// Run `member` with its reconstructed positional arguments.
    async fn invoke(&self, member: &str, args: Arguments<C>) -> RpcResult<Reply>;
}

/// One reconstructed positional argument.
pub enum Argument<C> {
    Context(Arc<C>),
    Input(Value),
}

impl<C> fmt::Debug for Argument<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Context(_) => f.write_str("Context(..)"),
            Argument::Input(value) => f.debug_tuple("Input").field(value).finish(),
        }
    }
}

/// The positional argument list handed to [`Controller::invoke`].
pub struct Arguments<C> {
    values: Vec<Argument<C>>,
}

impl<C> fmt::Debug for Arguments<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.values).finish()
    }
}

impl<C> Arguments<C> {
    /// Build the argument list from a plan ordered by position.
    pub fn from_plan(plan: &[ParamSource], ctx: &Arc<C>, input: &Value) -> Self {
        let values = plan
            .iter()
            .map(|source| match source {
                ParamSource::Context => Argument::Context(ctx.clone()),
                ParamSource::Input => Argument::Input(input.clone()),
            })
            .collect();
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The context bound at `index`.
    pub fn context(&self, index: usize) -> RpcResult<Arc<C>> {
        match self.values.get(index) {
            Some(Argument::Context(ctx)) => Ok(ctx.clone()),
            Some(Argument::Input(_)) => Err(RpcError::internal(format!(
                "argument {} is bound to the input, not the context",
                index
            ))),
            None => Err(missing(index)),
        }
    }

    /// The raw input bound at `index`.
    pub fn raw_input(&self, index: usize) -> RpcResult<&Value> {
        match self.values.get(index) {
            Some(Argument::Input(value)) => Ok(value),
            Some(Argument::Context(_)) => Err(RpcError::internal(format!(
                "argument {} is bound to the context, not the input",
                index
            ))),
            None => Err(missing(index)),
        }
    }

    /// The input bound at `index`, decoded into `T`.
    pub fn input<T: DeserializeOwned>(&self, index: usize) -> RpcResult<T> {
        let value = self.raw_input(index)?;
        Ok(T::deserialize(value)?)
    }
}

fn missing(index: usize) -> RpcError {
    RpcError::internal(format!("argument {} was not supplied", index))
}

/// A live controller together with its type identity.
pub struct ControllerInstance<C> {
    class: ClassKey,
    controller: Arc<dyn Controller<C>>,
}

impl<C> Clone for ControllerInstance<C> {
    fn clone(&self) -> Self {
        Self {
            class: self.class,
            controller: self.controller.clone(),
        }
    }
}

impl<C> fmt::Debug for ControllerInstance<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerInstance")
            .field("class", &self.class)
            .finish()
    }
}

impl<C: Send + Sync + 'static> ControllerInstance<C> {
    pub fn new<T: Controller<C>>(controller: T) -> Self {
        Self::from_arc(Arc::new(controller))
    }

    /// Use an already shared controller.
    pub fn from_arc<T: Controller<C>>(controller: Arc<T>) -> Self {
        Self {
            class: ClassKey::of::<T>(),
            controller,
        }
    }

    pub fn class(&self) -> ClassKey {
        self.class
    }

    pub fn controller(&self) -> &Arc<dyn Controller<C>> {
        &self.controller
    }
}
