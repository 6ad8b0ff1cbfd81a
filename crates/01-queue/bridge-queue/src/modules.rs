//! Named script-side modules that inbound calls dispatch to.
//!
//! Modules are either registered eagerly or through a factory that runs on
//! first use. A factory runs at most once; after it produces the module the
//! factory (and anything it captured) is dropped.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::value::Value;

/// An object whose methods can be invoked by name from the host side.
pub trait CallableModule {
    fn has_method(&self, method: &str) -> bool;

    fn invoke(&self, method: &str, args: Vec<Value>) -> anyhow::Result<Value>;
}

pub type ModuleFactory = Box<dyn FnOnce() -> Rc<dyn CallableModule>>;

type Method = Box<dyn Fn(Vec<Value>) -> anyhow::Result<Value>>;

/// [`CallableModule`] assembled from named closures.
///
/// ```
/// use bridge_queue::{CallableModule, MethodTable, Value};
///
/// let module = MethodTable::new()
///     .method("double", |args| {
///         let n = args.first().and_then(Value::as_f64).unwrap_or(0.0);
///         Ok(Value::from(n * 2.0))
///     });
/// assert!(module.has_method("double"));
/// ```
#[derive(Default)]
pub struct MethodTable {
    methods: HashMap<String, Method>,
}

impl MethodTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(Vec<Value>) -> anyhow::Result<Value> + 'static,
    {
        self.methods.insert(name.into(), Box::new(f));
        self
    }

    pub fn into_module(self) -> Rc<dyn CallableModule> {
        Rc::new(self)
    }
}

impl CallableModule for MethodTable {
    fn has_method(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    fn invoke(&self, method: &str, args: Vec<Value>) -> anyhow::Result<Value> {
        match self.methods.get(method) {
            Some(f) => f(args),
            None => anyhow::bail!("no method named {method}"),
        }
    }
}

impl fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.methods.keys().collect();
        names.sort();
        f.debug_struct("MethodTable").field("methods", &names).finish()
    }
}

pub enum ModuleEntry {
    Unresolved(ModuleFactory),
    Resolved(Rc<dyn CallableModule>),
}

impl fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleEntry::Unresolved(_) => f.write_str("Unresolved"),
            ModuleEntry::Resolved(_) => f.write_str("Resolved"),
        }
    }
}

/// First half of a two-phase lookup.
pub enum Resolution {
    Ready(Rc<dyn CallableModule>),
    /// The factory was taken out of the registry and must be run by the caller,
    /// then handed back through [`ModuleRegistry::finish_resolve`].
    Pending(ModuleFactory),
    Missing,
}

#[derive(Debug, Default)]
pub struct ModuleRegistry {
    entries: HashMap<String, ModuleEntry>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, module: Rc<dyn CallableModule>) {
        self.entries
            .insert(name.into(), ModuleEntry::Resolved(module));
    }

    pub fn register_lazy<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: FnOnce() -> Rc<dyn CallableModule> + 'static,
    {
        self.entries
            .insert(name.into(), ModuleEntry::Unresolved(Box::new(factory)));
    }

    /// Resolves `name`, running its factory if this is the first lookup.
    pub fn resolve(&mut self, name: &str) -> Option<Rc<dyn CallableModule>> {
        match self.begin_resolve(name) {
            Resolution::Ready(module) => Some(module),
            Resolution::Pending(factory) => Some(self.finish_resolve(name, factory())),
            Resolution::Missing => None,
        }
    }

    /// Looks up `name` without running any user code.
    ///
    /// An unresolved entry is removed and its factory returned so the caller
    /// can run it with no borrow of the registry outstanding.
    pub fn begin_resolve(&mut self, name: &str) -> Resolution {
        match self.entries.get(name) {
            None => Resolution::Missing,
            Some(ModuleEntry::Resolved(module)) => Resolution::Ready(Rc::clone(module)),
            Some(ModuleEntry::Unresolved(_)) => match self.entries.remove(name) {
                Some(ModuleEntry::Unresolved(factory)) => Resolution::Pending(factory),
                _ => Resolution::Missing,
            },
        }
    }

    /// Stores the module produced by a factory taken in [`begin_resolve`].
    ///
    /// If `name` was registered again while the factory ran, the newer
    /// registration stays in place. An eager re-registration is returned
    /// instead of `module`; a lazy one is left for the next lookup.
    ///
    /// [`begin_resolve`]: ModuleRegistry::begin_resolve
    pub fn finish_resolve(
        &mut self,
        name: &str,
        module: Rc<dyn CallableModule>,
    ) -> Rc<dyn CallableModule> {
        match self.entries.get(name) {
            Some(ModuleEntry::Resolved(newer)) => Rc::clone(newer),
            Some(ModuleEntry::Unresolved(_)) => module,
            None => {
                self.entries
                    .insert(name.to_owned(), ModuleEntry::Resolved(Rc::clone(&module)));
                module
            }
        }
    }

    pub fn is_resolved(&self, name: &str) -> bool {
        matches!(self.entries.get(name), Some(ModuleEntry::Resolved(_)))
    }
}
