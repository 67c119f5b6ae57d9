//! Class registry: name → constructor plus per-class flags.
//!
//! Rust has no class inheritance, so a class declares its parent by name
//! (`extends`). At registration the registry flattens the ancestry chain
//! into a tag list and merges declared event maps along it, so lookups at
//! runtime never walk a chain.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, warn};

use crate::component::Component;

/// Index of a registered class. Stable for the lifetime of the registry,
/// including across re-registration under the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClassId(pub(crate) u32);

impl ClassId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Type-erased component constructor.
pub type Constructor = Rc<dyn Fn() -> Box<dyn Component>>;

/// Options given at registration.
#[derive(Debug, Clone, Default)]
pub struct ClassOptions {
    /// Allow more than one instance per entity.
    pub multiple: bool,
    /// Classes added automatically before this one when missing.
    pub requires: Vec<String>,
    /// Parent class; instances match lookups and systems targeting it.
    pub extends: Option<String>,
    /// `(event name, handler key)` pairs wired to entity listeners.
    pub events: Vec<(String, &'static str)>,
}

impl ClassOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    pub fn requires(mut self, class: impl Into<String>) -> Self {
        self.requires.push(class.into());
        self
    }

    pub fn extends(mut self, class: impl Into<String>) -> Self {
        self.extends = Some(class.into());
        self
    }

    /// Route entity event `name` to `Component::on_event` with `handler`.
    pub fn event(mut self, name: impl Into<String>, handler: &'static str) -> Self {
        self.events.push((name.into(), handler));
        self
    }
}

/// A registered class.
pub struct ClassInfo {
    id: ClassId,
    name: String,
    type_id: TypeId,
    type_name: &'static str,
    ctor: Constructor,
    options: ClassOptions,
    ancestry: Vec<ClassId>,
    events: Vec<(String, &'static str)>,
}

impl ClassInfo {
    pub fn id(&self) -> ClassId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the Rust type behind this class.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is_multiple(&self) -> bool {
        self.options.multiple
    }

    pub fn requires(&self) -> &[String] {
        &self.options.requires
    }

    /// Direct parent, if `extends` resolved.
    pub fn parent(&self) -> Option<ClassId> {
        self.ancestry.get(1).copied()
    }

    /// This class followed by its ancestors, nearest first.
    pub fn ancestry(&self) -> &[ClassId] {
        &self.ancestry
    }

    /// Flattened event table: own declarations first, then each ancestor's.
    pub fn events(&self) -> &[(String, &'static str)] {
        &self.events
    }

    pub fn construct(&self) -> Box<dyn Component> {
        (self.ctor)()
    }
}

impl fmt::Debug for ClassInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassInfo")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("options", &self.options)
            .field("ancestry", &self.ancestry)
            .finish()
    }
}

#[derive(Default)]
pub struct ClassRegistry {
    classes: Vec<ClassInfo>,
    by_name: HashMap<String, ClassId>,
    by_type: HashMap<TypeId, ClassId>,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `C` under `name`, constructed with `C::default()`.
    pub fn register<C: Component + Default>(
        &mut self,
        name: impl Into<String>,
        options: ClassOptions,
    ) -> ClassId {
        self.register_with(name, C::default, options)
    }

    /// Register `C` under `name` with an explicit constructor.
    ///
    /// Re-registering a name replaces the class in place (last write wins)
    /// and keeps its `ClassId`, so systems already targeting it keep
    /// matching.
    pub fn register_with<C, F>(
        &mut self,
        name: impl Into<String>,
        ctor: F,
        mut options: ClassOptions,
    ) -> ClassId
    where
        C: Component,
        F: Fn() -> C + 'static,
    {
        let name = name.into();
        let ctor: Constructor = Rc::new(move || Box::new(ctor()) as Box<dyn Component>);
        let existing = self.by_name.get(&name).copied();

        if let Some(parent_name) = options.extends.clone() {
            match self.by_name.get(&parent_name).copied() {
                None => {
                    warn!(class = %name, parent = %parent_name, "parent class is not registered, ignoring extends");
                    options.extends = None;
                }
                Some(parent) => {
                    let cyclic = parent_name == name
                        || existing.is_some_and(|id| self.classes[parent.index()].ancestry.contains(&id));
                    if cyclic {
                        warn!(class = %name, parent = %parent_name, "extends would create a cycle, ignoring it");
                        options.extends = None;
                    }
                }
            }
        }

        let id = match existing {
            Some(id) => {
                warn!(class = %name, "class registered twice, replacing previous registration");
                let old_type = self.classes[id.index()].type_id;
                if self.by_type.get(&old_type) == Some(&id) {
                    self.by_type.remove(&old_type);
                }
                let info = &mut self.classes[id.index()];
                info.type_id = TypeId::of::<C>();
                info.type_name = std::any::type_name::<C>();
                info.ctor = ctor;
                info.options = options;
                id
            }
            None => {
                let id = ClassId(self.classes.len() as u32);
                self.classes.push(ClassInfo {
                    id,
                    name: name.clone(),
                    type_id: TypeId::of::<C>(),
                    type_name: std::any::type_name::<C>(),
                    ctor,
                    options,
                    ancestry: Vec::new(),
                    events: Vec::new(),
                });
                self.by_name.insert(name.clone(), id);
                id
            }
        };
        self.by_type.insert(TypeId::of::<C>(), id);
        self.rebuild_derived();

        debug!(class = %name, id = id.0, "registered class");
        id
    }

    /// Recompute every class's ancestry and merged event table.
    fn rebuild_derived(&mut self) {
        let parents: Vec<Option<ClassId>> = self
            .classes
            .iter()
            .map(|c| {
                c.options
                    .extends
                    .as_deref()
                    .and_then(|p| self.by_name.get(p).copied())
                    .filter(|p| *p != c.id)
            })
            .collect();

        let derived: Vec<(Vec<ClassId>, Vec<(String, &'static str)>)> = (0..self.classes.len())
            .map(|i| {
                let mut ancestry = vec![ClassId(i as u32)];
                let mut current = parents[i];
                while let Some(p) = current {
                    if ancestry.contains(&p) {
                        break;
                    }
                    ancestry.push(p);
                    current = parents[p.index()];
                }
                let events = ancestry
                    .iter()
                    .flat_map(|a| self.classes[a.index()].options.events.iter().cloned())
                    .collect();
                (ancestry, events)
            })
            .collect();

        for (info, (ancestry, events)) in self.classes.iter_mut().zip(derived) {
            info.ancestry = ancestry;
            info.events = events;
        }
    }

    pub fn resolve(&self, name: &str) -> Option<&ClassInfo> {
        self.class_id(name).and_then(|id| self.get(id))
    }

    pub fn class_id(&self, name: &str) -> Option<ClassId> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, id: ClassId) -> Option<&ClassInfo> {
        self.classes.get(id.index())
    }

    pub fn name_of(&self, id: ClassId) -> Option<&str> {
        self.get(id).map(ClassInfo::name)
    }

    /// Class name registered for the Rust type `C`.
    pub fn name_of_type<C: Component>(&self) -> Option<&str> {
        self.by_type
            .get(&TypeId::of::<C>())
            .and_then(|id| self.name_of(*id))
    }

    /// Whether `class` is `ancestor` or derives from it.
    pub fn is_a(&self, class: ClassId, ancestor: ClassId) -> bool {
        self.get(class)
            .is_some_and(|c| c.ancestry.contains(&ancestor))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Foo;
    impl Component for Foo {}

    #[derive(Default)]
    struct Bar;
    impl Component for Bar {}

    #[derive(Default)]
    struct Baz;
    impl Component for Baz {}

    #[test]
    fn resolve_and_name_lookup() {
        let mut registry = ClassRegistry::new();
        let foo = registry.register::<Foo>("Foo", ClassOptions::new());
        let bar = registry.register::<Bar>("Bar", ClassOptions::new().extends("Foo"));

        assert_eq!(registry.class_id("Foo"), Some(foo));
        assert_eq!(registry.name_of(bar), Some("Bar"));
        assert_eq!(registry.name_of_type::<Foo>(), Some("Foo"));
        assert_eq!(registry.name_of_type::<Bar>(), Some("Bar"));
        assert!(registry.resolve("Nope").is_none());
        assert!(registry.name_of_type::<Baz>().is_none());
    }

    #[test]
    fn ancestry_is_flattened() {
        let mut registry = ClassRegistry::new();
        let foo = registry.register::<Foo>("Foo", ClassOptions::new());
        let bar = registry.register::<Bar>("Bar", ClassOptions::new().extends("Foo"));
        let baz = registry.register::<Baz>("Baz", ClassOptions::new().extends("Bar"));

        assert_eq!(registry.get(baz).unwrap().ancestry(), &[baz, bar, foo]);
        assert_eq!(registry.get(baz).unwrap().parent(), Some(bar));
        assert!(registry.is_a(baz, foo));
        assert!(registry.is_a(bar, foo));
        assert!(!registry.is_a(foo, bar));
    }

    #[test]
    fn events_merge_along_ancestry() {
        let mut registry = ClassRegistry::new();
        registry.register::<Foo>("Foo", ClassOptions::new().event("foo", "on_foo"));
        let bar = registry.register::<Bar>(
            "Bar",
            ClassOptions::new().extends("Foo").event("bar", "on_bar"),
        );

        let events = registry.get(bar).unwrap().events();
        assert_eq!(
            events,
            &[("bar".to_string(), "on_bar"), ("foo".to_string(), "on_foo")]
        );
    }

    #[test]
    fn reregistration_keeps_id_and_overwrites() {
        let mut registry = ClassRegistry::new();
        let first = registry.register::<Foo>("Foo", ClassOptions::new());
        let second = registry.register::<Bar>("Foo", ClassOptions::new().multiple());

        assert_eq!(first, second);
        assert_eq!(registry.len(), 1);
        assert!(registry.get(first).unwrap().is_multiple());
        assert_eq!(registry.name_of_type::<Bar>(), Some("Foo"));
        assert!(registry.name_of_type::<Foo>().is_none());
    }

    #[test]
    fn bad_extends_is_ignored() {
        let mut registry = ClassRegistry::new();
        let foo = registry.register::<Foo>("Foo", ClassOptions::new().extends("Missing"));
        assert_eq!(registry.get(foo).unwrap().ancestry(), &[foo]);

        let bar = registry.register::<Bar>("Bar", ClassOptions::new().extends("Foo"));
        // Foo -> Bar would close the loop Bar -> Foo -> Bar.
        registry.register::<Foo>("Foo", ClassOptions::new().extends("Bar"));
        assert_eq!(registry.get(foo).unwrap().ancestry(), &[foo]);
        assert_eq!(registry.get(bar).unwrap().ancestry(), &[bar, foo]);
    }
}
