// crates/ferrule-core/src/store.rs
//
// DeclarationStore: keyed storage of declarative metadata.
//
// Keys are a controller type (`ClassKey`) and, for member-level entries, the
// member name. The store performs no validation; the router compiler checks
// the recorded metadata when it builds the routing table.

use std::any::TypeId;
use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::controller::Controller;
use crate::declare::{ClassDeclaration, MethodDeclaration};
use crate::metadata::{ClassMetadata, MethodMetadata};
use crate::types::ParamBinding;

/// Identity of a controller type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassKey {
    id: TypeId,
    name: &'static str,
}

impl ClassKey {
    pub fn of<T: 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: short_type_name(std::any::type_name::<T>()),
        }
    }

    /// The type identifier without module path or generic arguments.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl fmt::Display for ClassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

fn short_type_name(full: &'static str) -> &'static str {
    let without_generics = full.split('<').next().unwrap_or(full);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}

type MemberKey = (ClassKey, String);

/// Registry of all declarations, shared by one or more compilations.
pub struct DeclarationStore<C> {
    classes: HashMap<ClassKey, ClassMetadata<C>>,
    methods: HashMap<MemberKey, MethodMetadata<C>>,
    params: HashMap<MemberKey, Vec<ParamBinding>>,
    registered: HashSet<ClassKey>,
}

impl<C> Default for DeclarationStore<C> {
    fn default() -> Self {
        Self {
            classes: HashMap::new(),
            methods: HashMap::new(),
            params: HashMap::new(),
            registered: HashSet::new(),
        }
    }
}

impl<C> fmt::Debug for DeclarationStore<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeclarationStore")
            .field("classes", &self.classes.len())
            .field("methods", &self.methods.len())
            .field("params", &self.params.len())
            .finish()
    }
}

impl<C> DeclarationStore<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Class metadata, or empty defaults when nothing was declared.
    pub fn class_meta(&self, class: ClassKey) -> ClassMetadata<C> {
        self.classes.get(&class).cloned().unwrap_or_default()
    }

    pub fn set_class_meta(&mut self, class: ClassKey, meta: ClassMetadata<C>) {
        self.classes.insert(class, meta);
    }

    pub fn method_meta(&self, class: ClassKey, member: &str) -> Option<MethodMetadata<C>> {
        self.methods.get(&(class, member.to_string())).cloned()
    }

    pub fn set_method_meta(&mut self, class: ClassKey, member: &str, meta: MethodMetadata<C>) {
        self.methods.insert((class, member.to_string()), meta);
    }

    /// Bindings in the order they were added. Empty when none exist.
    pub fn param_bindings(&self, class: ClassKey, member: &str) -> &[ParamBinding] {
        self.params
            .get(&(class, member.to_string()))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn add_param_binding(&mut self, class: ClassKey, member: &str, binding: ParamBinding) {
        self.params
            .entry((class, member.to_string()))
            .or_default()
            .push(binding);
    }

    /// Members of `class` that carry method metadata, sorted by name.
    pub fn declared_members(&self, class: ClassKey) -> Vec<&str> {
        let mut members: Vec<&str> = self
            .methods
            .keys()
            .filter(|(owner, _)| *owner == class)
            .map(|(_, member)| member.as_str())
            .collect();
        members.sort_unstable();
        members
    }

    /// Members of `class` that carry parameter bindings, sorted by name.
    pub fn bound_members(&self, class: ClassKey) -> Vec<&str> {
        let mut members: Vec<&str> = self
            .params
            .keys()
            .filter(|(owner, _)| *owner == class)
            .map(|(_, member)| member.as_str())
            .collect();
        members.sort_unstable();
        members
    }

    /// Declaration builder targeting a controller type.
    pub fn class<T: 'static>(&mut self) -> ClassDeclaration<'_, C> {
        ClassDeclaration::new(self, ClassKey::of::<T>())
    }

    /// Declaration builder targeting one member of a controller type.
    pub fn method<T: 'static>(&mut self, member: &str) -> MethodDeclaration<'_, C> {
        MethodDeclaration::new(self, ClassKey::of::<T>(), member)
    }
}

impl<C: Send + Sync + 'static> DeclarationStore<C> {
    /// Record the declarations of controller type `T`.
    ///
    /// Runs `T::declare` the first time only; later calls are no-ops so a
    /// type's lists are never duplicated.
    pub fn register<T: Controller<C>>(&mut self) -> &mut Self {
        let class = ClassKey::of::<T>();
        if self.registered.insert(class) {
            T::declare(self);
            tracing::debug!("Registered declarations for {}", class);
        }
        self
    }

    /// Whether `register::<T>()` has already run.
    pub fn is_registered<T: 'static>(&self) -> bool {
        self.registered.contains(&ClassKey::of::<T>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::RouterOptions;

    struct UsersController;
    struct Wrapper<T>(T);

    #[test]
    fn test_short_type_name() {
        assert_eq!(ClassKey::of::<UsersController>().name(), "UsersController");
        assert_eq!(ClassKey::of::<Wrapper<u8>>().name(), "Wrapper");
    }

    #[test]
    fn test_class_meta_defaults_when_absent() {
        let store: DeclarationStore<()> = DeclarationStore::new();
        let meta = store.class_meta(ClassKey::of::<UsersController>());
        assert!(meta.base.is_none());
        assert!(meta.middlewares.is_empty());
    }

    #[test]
    fn test_set_and_get_class_meta() {
        let mut store: DeclarationStore<()> = DeclarationStore::new();
        let class = ClassKey::of::<UsersController>();
        let mut meta = store.class_meta(class);
        meta.apply_router(Some("users".to_string()), RouterOptions::new());
        store.set_class_meta(class, meta);
        assert_eq!(store.class_meta(class).base.as_deref(), Some("users"));
    }

    #[test]
    fn test_method_meta_absent_until_set() {
        let mut store: DeclarationStore<()> = DeclarationStore::new();
        let class = ClassKey::of::<UsersController>();
        assert!(store.method_meta(class, "get_by_id").is_none());
        store.set_method_meta(class, "get_by_id", MethodMetadata::default());
        assert!(store.method_meta(class, "get_by_id").is_some());
        assert_eq!(store.declared_members(class), vec!["get_by_id"]);
    }

    #[test]
    fn test_param_bindings_keep_insertion_order() {
        let mut store: DeclarationStore<()> = DeclarationStore::new();
        let class = ClassKey::of::<UsersController>();
        assert!(store.param_bindings(class, "create").is_empty());
        store.add_param_binding(class, "create", ParamBinding::input(1));
        store.add_param_binding(class, "create", ParamBinding::context(0));
        assert_eq!(
            store.param_bindings(class, "create"),
            &[ParamBinding::input(1), ParamBinding::context(0)]
        );
    }

    #[test]
    fn test_bound_members_lists_binding_keys() {
        let mut store: DeclarationStore<()> = DeclarationStore::new();
        let class = ClassKey::of::<UsersController>();
        store.add_param_binding(class, "update", ParamBinding::input(0));
        store.add_param_binding(class, "create", ParamBinding::input(0));
        store.add_param_binding(ClassKey::of::<Wrapper<u8>>(), "other", ParamBinding::input(0));
        assert_eq!(store.bound_members(class), vec!["create", "update"]);
        assert!(store.declared_members(class).is_empty());
    }
}
