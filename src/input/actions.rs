//! Action binding sets and per-user cloning

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::users::UserId;

/// Stable action identity, preserved across clones
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActionId(pub Uuid);

impl ActionId {
    /// Generates a new random id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ActionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Control path an action listens to, e.g. `<Mouse>/leftButton`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub path: String,
}

impl Binding {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

/// A named input action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    id: ActionId,
    name: String,
    bindings: Vec<Binding>,
    #[serde(skip)]
    enabled: bool,
}

impl Action {
    /// Creates a disabled action with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_id(ActionId::new(), name)
    }

    pub fn with_id(id: ActionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            bindings: Vec::new(),
            enabled: false,
        }
    }

    /// Builder: add a binding
    pub fn bind(mut self, path: impl Into<String>) -> Self {
        self.bindings.push(Binding::new(path));
        self
    }

    pub fn id(&self) -> ActionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    pub fn enable(&mut self) {
        self.enabled = true;
    }

    pub fn disable(&mut self) {
        self.enabled = false;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// A named group of actions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionMap {
    name: String,
    actions: Vec<Action>,
}

impl ActionMap {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            actions: Vec::new(),
        }
    }

    /// Builder: add an action
    pub fn with_action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }
}

/// A named collection of action maps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionBindingSet {
    name: String,
    maps: Vec<ActionMap>,
}

impl ActionBindingSet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            maps: Vec::new(),
        }
    }

    /// Builder: add a map
    pub fn with_map(mut self, map: ActionMap) -> Self {
        self.maps.push(map);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn maps(&self) -> &[ActionMap] {
        &self.maps
    }

    /// Iterate every action across all maps
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.maps.iter().flat_map(|map| map.actions.iter())
    }

    fn actions_mut(&mut self) -> impl Iterator<Item = &mut Action> {
        self.maps.iter_mut().flat_map(|map| map.actions.iter_mut())
    }

    pub fn find_by_id(&self, id: ActionId) -> Option<&Action> {
        self.actions().find(|action| action.id == id)
    }

    pub fn find_by_id_mut(&mut self, id: ActionId) -> Option<&mut Action> {
        self.actions_mut().find(|action| action.id == id)
    }

    /// Case-insensitive lookup by action name
    ///
    /// Accepts convention-named fields (a leading `m_` is ignored) and
    /// map-qualified names such as `Gameplay/Fire`.
    pub fn find_by_name(&self, name: &str) -> Option<&Action> {
        let name = name.strip_prefix("m_").unwrap_or(name);
        if let Some((map_name, action_name)) = name.split_once('/') {
            return self
                .maps
                .iter()
                .filter(|map| map.name.eq_ignore_ascii_case(map_name))
                .flat_map(|map| map.actions.iter())
                .find(|action| action.name.eq_ignore_ascii_case(action_name));
        }
        self.actions()
            .find(|action| action.name.eq_ignore_ascii_case(name))
    }

    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut Action> {
        let id = self.find_by_name(name)?.id;
        self.find_by_id_mut(id)
    }

    pub fn enable_all(&mut self) {
        self.actions_mut().for_each(Action::enable);
    }

    pub fn disable_all(&mut self) {
        self.actions_mut().for_each(Action::disable);
    }
}

/// Deep-copies `template` for one user
///
/// Structure and action ids are preserved; runtime state starts disabled
/// and the clone is named after the user.
pub fn clone_for_user(template: &ActionBindingSet, user: UserId) -> ActionBindingSet {
    let mut clone = template.clone();
    clone.name = format!("{} for Player {}", template.name, user.index());
    clone.disable_all();
    clone
}

/// Reference to an action by stable id, resolvable against any clone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionReference {
    pub action: ActionId,
}

impl ActionReference {
    pub fn new(action: ActionId) -> Self {
        Self { action }
    }

    /// Creates a reference to the action named `name` in `set`
    pub fn find(set: &ActionBindingSet, name: &str) -> Option<Self> {
        set.find_by_name(name).map(|action| Self::new(action.id()))
    }

    pub fn resolve<'a>(&self, set: &'a ActionBindingSet) -> Option<&'a Action> {
        set.find_by_id(self.action)
    }
}
