// crates/ferrule-core/src/schema.rs
//
// Schema validation capability.
//
// The compiler treats schemas as opaque: `validate(value)` either returns the
// (possibly normalized) value or a `ValidationError`. Two adapters ship with
// the crate: `SerdeSchema<T>`, which validates by round-tripping the value
// through a serde type, and `FnSchema`, which wraps a closure.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ValidationError;

/// An opaque validation capability used for endpoint inputs and outputs.
#[async_trait]
pub trait Schema: Send + Sync {
    /// Validate `value`, returning the value the handler (or caller) sees.
    async fn validate(&self, value: Value) -> Result<Value, ValidationError>;
}

/// Shared handle to a schema.
pub type SchemaRef = Arc<dyn Schema>;

type Refinement<T> = Arc<dyn Fn(&T) -> Result<(), String> + Send + Sync>;

/// Validates by deserializing into `T` and serializing back.
///
/// Unknown fields are dropped unless `T` rejects them. Extra constraints
/// that the type system cannot express go through [`SerdeSchema::refine`].
pub struct SerdeSchema<T> {
    refinements: Vec<Refinement<T>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> SerdeSchema<T>
where
    T: DeserializeOwned + Serialize + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            refinements: Vec::new(),
            _marker: PhantomData,
        }
    }

    /// Add a predicate that must hold on the decoded value.
    pub fn refine<F>(mut self, check: F) -> Self
    where
        F: Fn(&T) -> Result<(), String> + Send + Sync + 'static,
    {
        self.refinements.push(Arc::new(check));
        self
    }

    /// Finish building and share the schema.
    pub fn shared(self) -> SchemaRef {
        Arc::new(self)
    }
}

impl<T> Default for SerdeSchema<T>
where
    T: DeserializeOwned + Serialize + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for SerdeSchema<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerdeSchema")
            .field("type", &std::any::type_name::<T>())
            .field("refinements", &self.refinements.len())
            .finish()
    }
}

#[async_trait]
impl<T> Schema for SerdeSchema<T>
where
    T: DeserializeOwned + Serialize + Send + Sync + 'static,
{
    async fn validate(&self, value: Value) -> Result<Value, ValidationError> {
        let decoded: T =
            serde_json::from_value(value).map_err(|e| ValidationError::new(e.to_string()))?;

        let issues: Vec<String> = self
            .refinements
            .iter()
            .filter_map(|check| check(&decoded).err())
            .collect();
        if !issues.is_empty() {
            return Err(ValidationError::with_issues(issues));
        }

        serde_json::to_value(&decoded).map_err(|e| ValidationError::new(e.to_string()))
    }
}

/// Wraps a synchronous validation closure.
pub struct FnSchema<F> {
    check: F,
}

impl<F> FnSchema<F>
where
    F: Fn(Value) -> Result<Value, ValidationError> + Send + Sync + 'static,
{
    pub fn new(check: F) -> Self {
        Self { check }
    }

    pub fn shared(self) -> SchemaRef {
        Arc::new(self)
    }
}

#[async_trait]
impl<F> Schema for FnSchema<F>
where
    F: Fn(Value) -> Result<Value, ValidationError> + Send + Sync + 'static,
{
    async fn validate(&self, value: Value) -> Result<Value, ValidationError> {
        (self.check)(value)
    }
}
