//! Component lifecycle hooks.
//!
//! At most one hook is registered per (component, kind). Hooks on a pair's
//! relation also fire for every pair with that relation unless the exact pair
//! has its own hook.

use std::collections::HashMap;
use std::fmt;

use stratum_foundation::builtin::{ON_ADD, ON_REMOVE, ON_SET};
use stratum_foundation::{Id, Value};
use tracing::trace;

/// When a hook fires.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// After a component is added to an entity.
    OnAdd,
    /// Before a component is removed from an entity (or the entity deleted).
    OnRemove,
    /// After a component value is written.
    OnSet,
}

impl HookKind {
    /// Returns the well-known id naming this hook kind.
    #[must_use]
    pub const fn id(self) -> Id {
        match self {
            Self::OnAdd => ON_ADD,
            Self::OnRemove => ON_REMOVE,
            Self::OnSet => ON_SET,
        }
    }

    /// Maps a well-known hook id back to its kind.
    #[must_use]
    pub fn from_id(id: Id) -> Option<Self> {
        match id {
            ON_ADD => Some(Self::OnAdd),
            ON_REMOVE => Some(Self::OnRemove),
            ON_SET => Some(Self::OnSet),
            _ => None,
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::OnAdd => "on_add",
            Self::OnRemove => "on_remove",
            Self::OnSet => "on_set",
        };
        f.write_str(name)
    }
}

type StatefulFn = dyn Fn(Id, Id, &Value) + Send + Sync;
type StatelessFn = dyn Fn(Id, Id) + Send + Sync;

/// A lifecycle callback.
///
/// Callbacks receive `(entity, component)` and, for stateful hooks, the
/// component's current value. They run while the world is borrowed, so they
/// cannot mutate it. To react structurally, record the work in shared state
/// and apply it once the triggering call returns. Callbacks must be
/// `Send + Sync`, so use `Arc<Mutex<_>>` or a channel rather than
/// `Rc<RefCell<_>>`.
///
/// ```
/// use std::sync::{Arc, Mutex};
///
/// use stratum_storage::{Hook, HookKind, World};
///
/// let mut world = World::new();
/// let burning = world.component().unwrap();
/// let smoke = world.tag().unwrap();
///
/// let pending = Arc::new(Mutex::new(Vec::new()));
/// let queue = Arc::clone(&pending);
/// world
///     .set_hook(
///         burning,
///         HookKind::OnAdd,
///         Hook::stateless(move |entity, _| queue.lock().unwrap().push(entity)),
///     )
///     .unwrap();
///
/// let log = world.entity();
/// world.set(log, burning, 3).unwrap();
///
/// let queued: Vec<_> = pending.lock().unwrap().drain(..).collect();
/// for entity in queued {
///     world.add(entity, smoke).unwrap();
/// }
/// assert!(world.has(log, &[smoke]).unwrap());
/// ```
pub enum Hook {
    /// Receives the value. Tags pass [`Value::Nil`].
    Stateful(Box<StatefulFn>),
    /// Receives only the entity and component.
    Stateless(Box<StatelessFn>),
}

impl Hook {
    /// Wraps a callback that receives the component value.
    pub fn stateful(f: impl Fn(Id, Id, &Value) + Send + Sync + 'static) -> Self {
        Self::Stateful(Box::new(f))
    }

    /// Wraps a callback that ignores the component value.
    pub fn stateless(f: impl Fn(Id, Id) + Send + Sync + 'static) -> Self {
        Self::Stateless(Box::new(f))
    }

    fn call(&self, entity: Id, component: Id, value: &Value) {
        match self {
            Self::Stateful(f) => f(entity, component, value),
            Self::Stateless(f) => f(entity, component),
        }
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stateful(_) => f.write_str("Hook::Stateful"),
            Self::Stateless(_) => f.write_str("Hook::Stateless"),
        }
    }
}

/// Registered hooks, keyed by component and kind.
#[derive(Debug, Default)]
pub struct HookDispatcher {
    hooks: HashMap<(Id, HookKind), Hook>,
}

impl HookDispatcher {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a hook, returning the one it replaced.
    pub fn register(&mut self, component: Id, kind: HookKind, hook: Hook) -> Option<Hook> {
        self.hooks.insert((component.without_generation(), kind), hook)
    }

    /// Removes a hook.
    pub fn unregister(&mut self, component: Id, kind: HookKind) -> Option<Hook> {
        self.hooks.remove(&(component.without_generation(), kind))
    }

    /// Checks if a hook is registered for exactly this component.
    #[must_use]
    pub fn contains(&self, component: Id, kind: HookKind) -> bool {
        self.hooks
            .contains_key(&(component.without_generation(), kind))
    }

    /// Returns the number of registered hooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    /// Returns true if no hooks are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Runs the hook for `component`, falling back to the pair's relation.
    ///
    /// Returns true if a hook ran.
    pub fn dispatch(&self, kind: HookKind, entity: Id, component: Id, value: &Value) -> bool {
        if self.hooks.is_empty() {
            return false;
        }
        let hook = self
            .hooks
            .get(&(component.without_generation(), kind))
            .or_else(|| {
                component
                    .is_pair()
                    .then(|| component.pair_relation())
                    .and_then(|relation| self.hooks.get(&(relation, kind)))
            });

        match hook {
            Some(hook) => {
                trace!(%kind, ?entity, ?component, "dispatching hook");
                hook.call(entity, component, value);
                true
            }
            None => false,
        }
    }

    /// Drops every hook registered on a deleted component.
    pub(crate) fn forget(&mut self, component: Id) {
        let key = component.without_generation();
        self.hooks.retain(|(id, _), _| *id != key);
    }
}
