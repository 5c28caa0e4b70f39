// crates/ferrule-rpc/src/compiler.rs
//
// Router compiler: turns declarations plus live controller instances into a
// RoutingTable.
//
// For each controller the compiler resolves the routing-group name, walks
// the member surface, and freezes one middleware chain per declared member:
//
//   base procedure template -> global -> class -> method
//     -> class auth -> method auth -> class rate limit -> method rate limit
//     -> terminal (input validation, handler, output validation)
//
// All definition problems (unbound arguments, unknown members, name
// collisions) are reported here, before any request is served.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use ferrule_core::{
    Arguments, BoxFuture, ClassKey, ClassMetadata, Controller, ControllerInstance,
    DeclarationStore, DefinitionError, Member, Meta, MethodMetadata, Middleware, ParamBinding,
    ParamSource, Reply, Request, RpcError, RpcResult, SchemaRef, Terminal,
};

use crate::auth::auth_middleware;
use crate::rate_limit::RateLimiter;
use crate::table::{CompiledEndpoint, RoutingTable};

/// Default routing-group name for a type: the identifier with its first
/// character lowercased.
pub fn lower_camel(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ---------------------------------------------------------------------------
// ProcedureTemplate
// ---------------------------------------------------------------------------

/// A named starting point for endpoint chains: middlewares that run before
/// everything else and meta merged underneath class and method meta.
pub struct ProcedureTemplate<C> {
    pub middlewares: Vec<Middleware<C>>,
    pub meta: Meta,
}

impl<C> Default for ProcedureTemplate<C> {
    fn default() -> Self {
        Self {
            middlewares: Vec::new(),
            meta: Meta::new(),
        }
    }
}

impl<C> Clone for ProcedureTemplate<C> {
    fn clone(&self) -> Self {
        Self {
            middlewares: self.middlewares.clone(),
            meta: self.meta.clone(),
        }
    }
}

impl<C> fmt::Debug for ProcedureTemplate<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcedureTemplate")
            .field("middlewares", &self.middlewares)
            .field("meta", &self.meta)
            .finish()
    }
}

impl<C> ProcedureTemplate<C> {
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
}

// ---------------------------------------------------------------------------
// RouterCompiler
// ---------------------------------------------------------------------------

/// Builds a [`RoutingTable`] from a declaration store.
pub struct RouterCompiler<'a, C> {
    store: &'a DeclarationStore<C>,
    global: Vec<Middleware<C>>,
    templates: HashMap<String, ProcedureTemplate<C>>,
    limiter: RateLimiter,
}

impl<'a, C: Send + Sync + 'static> RouterCompiler<'a, C> {
    pub fn new(store: &'a DeclarationStore<C>) -> Self {
        Self {
            store,
            global: Vec::new(),
            templates: HashMap::new(),
            limiter: RateLimiter::new(),
        }
    }

    /// Append a global middleware, run after the base procedure template
    /// and before class middlewares.
    pub fn middleware(mut self, middleware: Middleware<C>) -> Self {
        self.global.push(middleware);
        self
    }

    /// Register a named base procedure template.
    pub fn base_procedure(mut self, name: impl Into<String>, template: ProcedureTemplate<C>) -> Self {
        self.templates.insert(name.into(), template);
        self
    }

    /// Use `limiter` for every rate-limited endpoint of this compilation.
    pub fn rate_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    /// Compile every controller into one routing table.
    ///
    /// Controllers sharing a routing-group name are merged into one group.
    ///
    /// # Errors
    /// Returns the first `DefinitionError` found; nothing is served from a
    /// partially compiled table.
    pub fn compile(
        &self,
        controllers: impl IntoIterator<Item = ControllerInstance<C>>,
    ) -> Result<RoutingTable<C>, DefinitionError> {
        let mut table = RoutingTable::default();

        for instance in controllers {
            let class = instance.class();
            let class_meta = self.store.class_meta(class);
            let base = class_meta
                .base
                .clone()
                .unwrap_or_else(|| lower_camel(class.name()));
            let surface = instance.controller().members();

            self.check_declared_members(class, &surface)?;

            let mut seen = BTreeSet::new();
            for member in &surface {
                let Some(method_meta) = self.store.method_meta(class, member.name) else {
                    continue;
                };
                let name = method_meta
                    .exposed_name
                    .clone()
                    .unwrap_or_else(|| member.name.to_string());

                if !seen.insert(name.clone()) {
                    return Err(DefinitionError::EndpointCollision {
                        group: base,
                        endpoint: name,
                    });
                }

                let endpoint = self.compile_endpoint(
                    &instance,
                    &class_meta,
                    method_meta,
                    *member,
                    format!("{}.{}", base, name),
                )?;
                tracing::debug!(
                    "Compiled {} endpoint {} ({} middlewares)",
                    endpoint.kind(),
                    endpoint.path(),
                    endpoint.chain_names().len()
                );

                if table.group_mut(&base).insert(name.clone(), endpoint).is_err() {
                    return Err(DefinitionError::EndpointCollision {
                        group: base,
                        endpoint: name,
                    });
                }
            }
        }

        tracing::info!(
            "Compiled routing table: {} groups, {} endpoints",
            table.group_names().count(),
            table.len()
        );
        Ok(table)
    }

    /// Every member with method metadata or parameter bindings must exist
    /// on the controller.
    fn check_declared_members(
        &self,
        class: ClassKey,
        surface: &[Member],
    ) -> Result<(), DefinitionError> {
        let declared = self.store.declared_members(class);
        let bound = self.store.bound_members(class);
        for declared in declared.into_iter().chain(bound) {
            if !surface.iter().any(|member| member.name == declared) {
                return Err(DefinitionError::UnknownMember {
                    class: class.name().to_string(),
                    member: declared.to_string(),
                });
            }
        }
        Ok(())
    }

    fn template_for(
        &self,
        class_meta: &ClassMetadata<C>,
        method_meta: &MethodMetadata<C>,
    ) -> ProcedureTemplate<C> {
        let name = method_meta
            .base_procedure
            .as_ref()
            .or(class_meta.base_procedure.as_ref());
        match name {
            None => ProcedureTemplate::new(),
            Some(name) => match self.templates.get(name) {
                Some(template) => template.clone(),
                None => {
                    tracing::warn!(
                        "Unknown base procedure '{}', using the bare template",
                        name
                    );
                    ProcedureTemplate::new()
                }
            },
        }
    }

    fn compile_endpoint(
        &self,
        instance: &ControllerInstance<C>,
        class_meta: &ClassMetadata<C>,
        method_meta: MethodMetadata<C>,
        member: Member,
        path: String,
    ) -> Result<CompiledEndpoint<C>, DefinitionError> {
        let class = instance.class();
        let template = self.template_for(class_meta, &method_meta);

        let mut chain = template.middlewares;
        chain.extend(self.global.iter().cloned());
        chain.extend(class_meta.middlewares.iter().cloned());
        chain.extend(method_meta.middlewares.iter().cloned());
        if !class_meta.auth_guards.is_empty() {
            chain.push(auth_middleware(class_meta.auth_guards.clone()));
        }
        if !method_meta.auth_guards.is_empty() {
            chain.push(auth_middleware(method_meta.auth_guards.clone()));
        }
        if let Some(policy) = &class_meta.rate_limit {
            chain.push(self.limiter.middleware(policy.clone()));
        }
        if let Some(policy) = &method_meta.rate_limit {
            chain.push(self.limiter.middleware(policy.clone()));
        }

        let mut meta = template.meta;
        meta.extend(class_meta.meta.clone());
        meta.extend(method_meta.meta.clone());
        if let Some(deprecation) = &method_meta.deprecated {
            meta.insert("deprecated".to_string(), deprecation.to_tag());
        }

        let plan = argument_plan(class, member, self.store.param_bindings(class, member.name))?;
        let terminal = terminal(
            instance.controller().clone(),
            member.name,
            plan,
            method_meta.input_schema.clone(),
            method_meta.output_schema.clone(),
        );

        Ok(CompiledEndpoint::new(
            method_meta.kind,
            path,
            meta,
            chain,
            terminal,
        ))
    }
}

/// Order bindings by position and check that every position is bound once.
fn argument_plan(
    class: ClassKey,
    member: Member,
    bindings: &[ParamBinding],
) -> Result<Arc<[ParamSource]>, DefinitionError> {
    let mut slots: Vec<Option<ParamSource>> = vec![None; member.arity];

    for binding in bindings {
        let slot = slots
            .get_mut(binding.index)
            .ok_or_else(|| DefinitionError::BindingOutOfRange {
                class: class.name().to_string(),
                member: member.name.to_string(),
                index: binding.index,
                arity: member.arity,
            })?;
        if slot.is_some() {
            return Err(DefinitionError::DuplicateBinding {
                class: class.name().to_string(),
                member: member.name.to_string(),
                index: binding.index,
            });
        }
        *slot = Some(binding.source);
    }

    slots
        .into_iter()
        .enumerate()
        .map(|(index, slot)| {
            slot.ok_or_else(|| DefinitionError::UnboundArgument {
                class: class.name().to_string(),
                member: member.name.to_string(),
                index,
            })
        })
        .collect()
}

/// The last chain stage: validate input, run the member, validate output.
fn terminal<C: Send + Sync + 'static>(
    controller: Arc<dyn Controller<C>>,
    member: &'static str,
    plan: Arc<[ParamSource]>,
    input_schema: Option<SchemaRef>,
    output_schema: Option<SchemaRef>,
) -> Terminal<C> {
    Arc::new(move |req: Request<C>| -> BoxFuture<'static, RpcResult<Reply>> {
        let controller = controller.clone();
        let plan = plan.clone();
        let input_schema = input_schema.clone();
        let output_schema = output_schema.clone();
        Box::pin(async move {
            let input = match &input_schema {
                Some(schema) => schema
                    .validate(req.input)
                    .await
                    .map_err(RpcError::invalid_input)?,
                None => req.input,
            };

            let args = Arguments::from_plan(&plan, &req.ctx, &input);
            let reply = controller.invoke(member, args).await?;

            match (reply, &output_schema) {
                (Reply::Value(value), Some(schema)) => {
                    let value = schema
                        .validate(value)
                        .await
                        .map_err(RpcError::invalid_output)?;
                    Ok(Reply::Value(value))
                }
                (reply, _) => Ok(reply),
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe;

    #[test]
    fn test_lower_camel() {
        assert_eq!(lower_camel("UsersController"), "usersController");
        assert_eq!(lower_camel("HTTPThing"), "hTTPThing");
        assert_eq!(lower_camel("math"), "math");
        assert_eq!(lower_camel(""), "");
    }

    #[test]
    fn test_argument_plan_orders_by_index() {
        let class = ClassKey::of::<Probe>();
        let plan = argument_plan(
            class,
            Member::new("create", 2),
            &[ParamBinding::input(1), ParamBinding::context(0)],
        )
        .unwrap();
        assert_eq!(&*plan, &[ParamSource::Context, ParamSource::Input]);
    }

    #[test]
    fn test_argument_plan_errors() {
        let class = ClassKey::of::<Probe>();
        let member = Member::new("create", 2);

        assert!(matches!(
            argument_plan(class, member, &[ParamBinding::input(0)]),
            Err(DefinitionError::UnboundArgument { index: 1, .. })
        ));
        assert!(matches!(
            argument_plan(
                class,
                member,
                &[ParamBinding::input(0), ParamBinding::context(0)]
            ),
            Err(DefinitionError::DuplicateBinding { index: 0, .. })
        ));
        assert!(matches!(
            argument_plan(class, member, &[ParamBinding::input(2)]),
            Err(DefinitionError::BindingOutOfRange {
                index: 2,
                arity: 2,
                ..
            })
        ));
    }

    #[test]
    fn test_zero_arity_member_needs_no_bindings() {
        let plan = argument_plan(ClassKey::of::<Probe>(), Member::new("ping", 0), &[]).unwrap();
        assert!(plan.is_empty());
    }
}
