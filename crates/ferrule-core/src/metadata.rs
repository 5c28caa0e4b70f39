// crates/ferrule-core/src/metadata.rs
//
// Declarative metadata recorded per controller type and per member.
//
// Merge rules:
//   - list fields (middlewares, auth guards) concatenate in declaration order
//   - `meta` maps merge by shallow overwrite per key
//   - scalar fields (base name, schemas, rate limit, base procedure, ...)
//     are overwritten only when a new value is supplied

use std::fmt;

use serde_json::Value;

use crate::guard::AuthGuard;
use crate::middleware::Middleware;
use crate::schema::SchemaRef;
use crate::types::{Deprecation, EndpointKind, Meta, RateLimitPolicy};

/// Append `incoming` to `list`, preserving order.
pub fn merge_list<T>(list: &mut Vec<T>, incoming: impl IntoIterator<Item = T>) {
    list.extend(incoming);
}

/// Shallow-merge `incoming` into `meta`; incoming keys win.
pub fn merge_meta(meta: &mut Meta, incoming: Meta) {
    meta.extend(incoming);
}

/// Overwrite `slot` only when `value` is present.
pub fn overwrite<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

// ---------------------------------------------------------------------------
// ClassMetadata
// ---------------------------------------------------------------------------

/// Metadata accumulated for one controller type.
pub struct ClassMetadata<C> {
    /// Routing-group name. Defaults to the lower-camel type identifier.
    pub base: Option<String>,
    pub middlewares: Vec<Middleware<C>>,
    pub meta: Meta,
    pub auth_guards: Vec<AuthGuard<C>>,
    pub rate_limit: Option<RateLimitPolicy>,
    /// Name of the base procedure template every member starts from.
    pub base_procedure: Option<String>,
}

impl<C> Default for ClassMetadata<C> {
    fn default() -> Self {
        Self {
            base: None,
            middlewares: Vec::new(),
            meta: Meta::new(),
            auth_guards: Vec::new(),
            rate_limit: None,
            base_procedure: None,
        }
    }
}

impl<C> Clone for ClassMetadata<C> {
    fn clone(&self) -> Self {
        Self {
            base: self.base.clone(),
            middlewares: self.middlewares.clone(),
            meta: self.meta.clone(),
            auth_guards: self.auth_guards.clone(),
            rate_limit: self.rate_limit.clone(),
            base_procedure: self.base_procedure.clone(),
        }
    }
}

impl<C> fmt::Debug for ClassMetadata<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassMetadata")
            .field("base", &self.base)
            .field("middlewares", &self.middlewares)
            .field("meta", &self.meta)
            .field("auth_guards", &self.auth_guards)
            .field("rate_limit", &self.rate_limit)
            .field("base_procedure", &self.base_procedure)
            .finish()
    }
}

impl<C> ClassMetadata<C> {
    /// Apply a routing-group declaration.
    pub fn apply_router(&mut self, base: Option<String>, options: RouterOptions<C>) {
        overwrite(&mut self.base, base);
        merge_list(&mut self.middlewares, options.middlewares);
        merge_meta(&mut self.meta, options.meta);
        merge_list(&mut self.auth_guards, options.auth_guards);
        overwrite(&mut self.rate_limit, options.rate_limit);
    }
}

/// Options accepted by a routing-group declaration.
pub struct RouterOptions<C> {
    pub middlewares: Vec<Middleware<C>>,
    pub meta: Meta,
    pub auth_guards: Vec<AuthGuard<C>>,
    pub rate_limit: Option<RateLimitPolicy>,
}

impl<C> Default for RouterOptions<C> {
    fn default() -> Self {
        Self {
            middlewares: Vec::new(),
            meta: Meta::new(),
            auth_guards: Vec::new(),
            rate_limit: None,
        }
    }
}

impl<C> RouterOptions<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn middleware(mut self, middleware: Middleware<C>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    pub fn auth(mut self, guard: AuthGuard<C>) -> Self {
        self.auth_guards.push(guard);
        self
    }

    pub fn rate_limit(mut self, policy: RateLimitPolicy) -> Self {
        self.rate_limit = Some(policy);
        self
    }
}

// ---------------------------------------------------------------------------
// MethodMetadata
// ---------------------------------------------------------------------------

/// Metadata accumulated for one controller member.
pub struct MethodMetadata<C> {
    pub kind: EndpointKind,
    /// Exposed endpoint name. Defaults to the member identifier.
    pub exposed_name: Option<String>,
    pub input_schema: Option<SchemaRef>,
    pub output_schema: Option<SchemaRef>,
    pub middlewares: Vec<Middleware<C>>,
    pub meta: Meta,
    pub deprecated: Option<Deprecation>,
    pub rate_limit: Option<RateLimitPolicy>,
    pub auth_guards: Vec<AuthGuard<C>>,
    pub base_procedure: Option<String>,
}

impl<C> Default for MethodMetadata<C> {
    /// A member first touched by any declaration is a query.
    fn default() -> Self {
        Self {
            kind: EndpointKind::Query,
            exposed_name: None,
            input_schema: None,
            output_schema: None,
            middlewares: Vec::new(),
            meta: Meta::new(),
            deprecated: None,
            rate_limit: None,
            auth_guards: Vec::new(),
            base_procedure: None,
        }
    }
}

impl<C> Clone for MethodMetadata<C> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            exposed_name: self.exposed_name.clone(),
            input_schema: self.input_schema.clone(),
            output_schema: self.output_schema.clone(),
            middlewares: self.middlewares.clone(),
            meta: self.meta.clone(),
            deprecated: self.deprecated.clone(),
            rate_limit: self.rate_limit.clone(),
            auth_guards: self.auth_guards.clone(),
            base_procedure: self.base_procedure.clone(),
        }
    }
}

impl<C> fmt::Debug for MethodMetadata<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodMetadata")
            .field("kind", &self.kind)
            .field("exposed_name", &self.exposed_name)
            .field("input_schema", &self.input_schema.is_some())
            .field("output_schema", &self.output_schema.is_some())
            .field("middlewares", &self.middlewares)
            .field("meta", &self.meta)
            .field("deprecated", &self.deprecated)
            .field("rate_limit", &self.rate_limit)
            .field("auth_guards", &self.auth_guards)
            .field("base_procedure", &self.base_procedure)
            .finish()
    }
}

impl<C> MethodMetadata<C> {
    /// Apply an endpoint-kind declaration (query, mutation, subscription).
    pub fn apply_procedure(
        &mut self,
        kind: EndpointKind,
        name: Option<String>,
        options: ProcedureOptions<C>,
    ) {
        self.kind = kind;
        overwrite(&mut self.exposed_name, name);
        overwrite(&mut self.input_schema, options.input);
        overwrite(&mut self.output_schema, options.output);
        merge_list(&mut self.middlewares, options.middlewares);
        merge_meta(&mut self.meta, options.meta);
        overwrite(&mut self.deprecated, options.deprecated);
        overwrite(&mut self.rate_limit, options.rate_limit);
        merge_list(&mut self.auth_guards, options.auth_guards);
    }

    /// Attach schemas without touching the kind.
    pub fn apply_schema(&mut self, input: Option<SchemaRef>, output: Option<SchemaRef>) {
        overwrite(&mut self.input_schema, input);
        overwrite(&mut self.output_schema, output);
    }
}

/// Options accepted by an endpoint-kind declaration.
pub struct ProcedureOptions<C> {
    pub input: Option<SchemaRef>,
    pub output: Option<SchemaRef>,
    pub middlewares: Vec<Middleware<C>>,
    pub meta: Meta,
    pub deprecated: Option<Deprecation>,
    pub rate_limit: Option<RateLimitPolicy>,
    pub auth_guards: Vec<AuthGuard<C>>,
}

impl<C> Default for ProcedureOptions<C> {
    fn default() -> Self {
        Self {
            input: None,
            output: None,
            middlewares: Vec::new(),
            meta: Meta::new(),
            deprecated: None,
            rate_limit: None,
            auth_guards: Vec::new(),
        }
    }
}

impl<C> ProcedureOptions<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn input(mut self, schema: SchemaRef) -> Self {
        self.input = Some(schema);
        self
    }

    pub fn output(mut self, schema: SchemaRef) -> Self {
        self.output = Some(schema);
        self
    }

    pub fn middleware(mut self, middleware: Middleware<C>) -> Self {
        self.middlewares.push(middleware);
        self
    }

    pub fn meta(mut self, key: impl Into<String>, value: Value) -> Self {
        self.meta.insert(key.into(), value);
        self
    }

    pub fn deprecated(mut self, deprecation: Deprecation) -> Self {
        self.deprecated = Some(deprecation);
        self
    }

    pub fn rate_limit(mut self, policy: RateLimitPolicy) -> Self {
        self.rate_limit = Some(policy);
        self
    }

    pub fn auth(mut self, guard: AuthGuard<C>) -> Self {
        self.auth_guards.push(guard);
        self
    }
}
