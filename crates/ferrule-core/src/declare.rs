// crates/ferrule-core/src/declare.rs
//
// Declaration API: fluent builders that write into a DeclarationStore.
//
// Every operation reads the current metadata for its target, applies one
// merge step, and writes the result back.

use crate::guard::AuthGuard;
use crate::metadata::{
    merge_list, merge_meta, ClassMetadata, MethodMetadata, ProcedureOptions, RouterOptions,
};
use crate::middleware::Middleware;
use crate::schema::SchemaRef;
use crate::store::{ClassKey, DeclarationStore};
use crate::types::{Deprecation, EndpointKind, Meta, ParamBinding, RateLimitPolicy};

/// Declarations targeting a controller type.
pub struct ClassDeclaration<'a, C> {
    store: &'a mut DeclarationStore<C>,
    class: ClassKey,
}

impl<'a, C> ClassDeclaration<'a, C> {
    pub(crate) fn new(store: &'a mut DeclarationStore<C>, class: ClassKey) -> Self {
        Self { store, class }
    }

    fn update(self, apply: impl FnOnce(&mut ClassMetadata<C>)) -> Self {
        let mut meta = self.store.class_meta(self.class);
        apply(&mut meta);
        self.store.set_class_meta(self.class, meta);
        self
    }

    /// Declare the routing group. `base` overrides the default group name.
    pub fn router(self, base: Option<&str>, options: RouterOptions<C>) -> Self {
        let base = base.map(str::to_string);
        self.update(move |meta| meta.apply_router(base, options))
    }

    /// Append class-level middlewares, run for every member.
    pub fn use_middlewares(self, middlewares: impl IntoIterator<Item = Middleware<C>>) -> Self {
        let middlewares: Vec<_> = middlewares.into_iter().collect();
        self.update(move |meta| merge_list(&mut meta.middlewares, middlewares))
    }

    /// Append a class-level guard, evaluated before any member guard.
    pub fn auth(self, guard: AuthGuard<C>) -> Self {
        self.update(move |meta| meta.auth_guards.push(guard))
    }

    pub fn meta(self, tags: Meta) -> Self {
        self.update(move |meta| merge_meta(&mut meta.meta, tags))
    }

    pub fn rate_limit(self, policy: RateLimitPolicy) -> Self {
        self.update(move |meta| meta.rate_limit = Some(policy))
    }

    /// Start every member from the named base procedure template.
    pub fn use_base(self, name: &str) -> Self {
        let name = name.to_string();
        self.update(move |meta| meta.base_procedure = Some(name))
    }
}

/// Declarations targeting one member of a controller type.
pub struct MethodDeclaration<'a, C> {
    store: &'a mut DeclarationStore<C>,
    class: ClassKey,
    member: String,
}

impl<'a, C> MethodDeclaration<'a, C> {
    pub(crate) fn new(store: &'a mut DeclarationStore<C>, class: ClassKey, member: &str) -> Self {
        Self {
            store,
            class,
            member: member.to_string(),
        }
    }

    fn update(self, apply: impl FnOnce(&mut MethodMetadata<C>)) -> Self {
        let mut meta = self
            .store
            .method_meta(self.class, &self.member)
            .unwrap_or_default();
        apply(&mut meta);
        self.store.set_method_meta(self.class, &self.member, meta);
        self
    }

    fn procedure(self, kind: EndpointKind, name: Option<&str>, options: ProcedureOptions<C>) -> Self {
        let name = name.map(str::to_string);
        self.update(move |meta| meta.apply_procedure(kind, name, options))
    }

    /// Expose the member as a query. `name` overrides the member identifier.
    pub fn query(self, name: Option<&str>, options: ProcedureOptions<C>) -> Self {
        self.procedure(EndpointKind::Query, name, options)
    }

    pub fn mutation(self, name: Option<&str>, options: ProcedureOptions<C>) -> Self {
        self.procedure(EndpointKind::Mutation, name, options)
    }

    pub fn subscription(self, name: Option<&str>, options: ProcedureOptions<C>) -> Self {
        self.procedure(EndpointKind::Subscription, name, options)
    }

    /// Attach input and/or output schemas.
    pub fn schema(self, input: Option<SchemaRef>, output: Option<SchemaRef>) -> Self {
        self.update(move |meta| meta.apply_schema(input, output))
    }

    pub fn use_middlewares(self, middlewares: impl IntoIterator<Item = Middleware<C>>) -> Self {
        let middlewares: Vec<_> = middlewares.into_iter().collect();
        self.update(move |meta| merge_list(&mut meta.middlewares, middlewares))
    }

    pub fn auth(self, guard: AuthGuard<C>) -> Self {
        self.update(move |meta| meta.auth_guards.push(guard))
    }

    pub fn meta(self, tags: Meta) -> Self {
        self.update(move |meta| merge_meta(&mut meta.meta, tags))
    }

    /// Mark the endpoint deprecated, optionally with a message.
    pub fn deprecated(self, message: Option<&str>) -> Self {
        let deprecation = match message {
            Some(message) if !message.is_empty() => Deprecation::Message(message.to_string()),
            _ => Deprecation::Flag,
        };
        self.update(move |meta| meta.deprecated = Some(deprecation))
    }

    pub fn rate_limit(self, policy: RateLimitPolicy) -> Self {
        self.update(move |meta| meta.rate_limit = Some(policy))
    }

    pub fn use_base(self, name: &str) -> Self {
        let name = name.to_string();
        self.update(move |meta| meta.base_procedure = Some(name))
    }

    /// Pass the request context as positional argument `index`.
    pub fn bind_context(self, index: usize) -> Self {
        self.store
            .add_param_binding(self.class, &self.member, ParamBinding::context(index));
        self
    }

    /// Pass the validated input as positional argument `index`.
    pub fn bind_input(self, index: usize) -> Self {
        self.store
            .add_param_binding(self.class, &self.member, ParamBinding::input(index));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Next;
    use crate::schema::SerdeSchema;
    use crate::types::Request;
    use serde_json::json;

    struct Greeter;

    fn passthrough(name: &'static str) -> Middleware<()> {
        Middleware::new(|req: Request<()>, next: Next<()>| next.run(req)).named(name)
    }

    #[test]
    fn test_middleware_declarations_append_in_order() {
        let mut store: DeclarationStore<()> = DeclarationStore::new();
        store.class::<Greeter>().use_middlewares([passthrough("a")]);
        store.class::<Greeter>().use_middlewares([passthrough("b")]);

        let names: Vec<_> = store
            .class_meta(ClassKey::of::<Greeter>())
            .middlewares
            .iter()
            .map(Middleware::name)
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_method_and_class_middleware_targets_are_separate() {
        let mut store: DeclarationStore<()> = DeclarationStore::new();
        store
            .method::<Greeter>("hello")
            .use_middlewares([passthrough("m")]);
        let class = ClassKey::of::<Greeter>();

        assert!(store.class_meta(class).middlewares.is_empty());
        assert_eq!(
            store.method_meta(class, "hello").unwrap().middlewares.len(),
            1
        );
    }

    #[test]
    fn test_schema_declaration_defaults_kind_to_query() {
        let mut store: DeclarationStore<()> = DeclarationStore::new();
        store
            .method::<Greeter>("hello")
            .schema(Some(SerdeSchema::<String>::new().shared()), None);
        let meta = store
            .method_meta(ClassKey::of::<Greeter>(), "hello")
            .unwrap();
        assert_eq!(meta.kind, EndpointKind::Query);
        assert!(meta.input_schema.is_some());
        assert!(meta.output_schema.is_none());
    }

    #[test]
    fn test_kind_declaration_after_schema_keeps_schema() {
        let mut store: DeclarationStore<()> = DeclarationStore::new();
        store
            .method::<Greeter>("add")
            .schema(Some(SerdeSchema::<String>::new().shared()), None)
            .mutation(Some("addGreeting"), ProcedureOptions::new());
        let meta = store.method_meta(ClassKey::of::<Greeter>(), "add").unwrap();
        assert_eq!(meta.kind, EndpointKind::Mutation);
        assert_eq!(meta.exposed_name.as_deref(), Some("addGreeting"));
        assert!(meta.input_schema.is_some());
    }

    #[test]
    fn test_deprecated_marker() {
        let mut store: DeclarationStore<()> = DeclarationStore::new();
        store.method::<Greeter>("old").deprecated(None);
        store.method::<Greeter>("older").deprecated(Some("use hello"));
        let class = ClassKey::of::<Greeter>();
        assert_eq!(
            store.method_meta(class, "old").unwrap().deprecated,
            Some(Deprecation::Flag)
        );
        assert_eq!(
            store.method_meta(class, "older").unwrap().deprecated,
            Some(Deprecation::Message("use hello".to_string()))
        );
    }

    #[test]
    fn test_rate_limit_overwrites() {
        let mut store: DeclarationStore<()> = DeclarationStore::new();
        store
            .class::<Greeter>()
            .rate_limit(RateLimitPolicy::new(1, 1))
            .rate_limit(RateLimitPolicy::new(5, 10));
        assert_eq!(
            store.class_meta(ClassKey::of::<Greeter>()).rate_limit,
            Some(RateLimitPolicy::new(5, 10))
        );
    }

    #[test]
    fn test_meta_merges_shallowly() {
        let mut store: DeclarationStore<()> = DeclarationStore::new();
        store
            .method::<Greeter>("hello")
            .meta(Meta::from([("a".to_string(), json!(1))]))
            .meta(Meta::from([
                ("a".to_string(), json!(2)),
                ("b".to_string(), json!(3)),
            ]));
        let meta = store
            .method_meta(ClassKey::of::<Greeter>(), "hello")
            .unwrap()
            .meta;
        assert_eq!(meta.get("a"), Some(&json!(2)));
        assert_eq!(meta.get("b"), Some(&json!(3)));
    }

    #[test]
    fn test_param_bindings_recorded_without_method_meta() {
        let mut store: DeclarationStore<()> = DeclarationStore::new();
        store.method::<Greeter>("hello").bind_context(0).bind_input(1);
        let class = ClassKey::of::<Greeter>();
        assert_eq!(store.param_bindings(class, "hello").len(), 2);
        assert!(store.method_meta(class, "hello").is_none());
    }
}
