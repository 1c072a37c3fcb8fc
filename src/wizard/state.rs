//! Wizard identifiers
//!
//! States, composite (main, sub) positions and the action names that trigger
//! transitions. Every identifier is a cheap string newtype: the engines never
//! hold references into live state objects, only these keys.

use std::borrow::{Borrow, Cow};
use std::fmt;
use std::str::FromStr;

use crate::wizard::error::WizardError;

/// Identifier of one flow step (e.g. `welcome`, `license`).
///
/// Unique within a single engine instance and used as a map key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct State(Cow<'static, str>);

/// Sub-states share the same identifier type as main states.
pub type SubState = State;

impl State {
    /// Create a state identifier from any string.
    pub fn new(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    /// Create a state identifier usable in `const` position.
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for State {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for State {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for State {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<&State> for State {
    fn from(state: &State) -> Self {
        state.clone()
    }
}

/// Exact position inside a hierarchical wizard: a main state plus an optional
/// sub-state.
///
/// The canonical string form is `main` when there is no sub-state and
/// `main.sub` otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeState {
    pub main: State,
    pub sub: Option<SubState>,
}

impl CompositeState {
    /// Position at a main state with no sub-structure.
    pub fn new(main: impl Into<State>) -> Self {
        Self {
            main: main.into(),
            sub: None,
        }
    }

    /// Position at a specific sub-state of `main`.
    pub fn with_sub(main: impl Into<State>, sub: impl Into<SubState>) -> Self {
        Self {
            main: main.into(),
            sub: Some(sub.into()),
        }
    }

    /// Returns true if this position names a sub-state
    #[inline]
    pub fn has_sub(&self) -> bool {
        self.sub.is_some()
    }
}

impl fmt::Display for CompositeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sub {
            Some(sub) => write!(f, "{}.{}", self.main, sub),
            None => write!(f, "{}", self.main),
        }
    }
}

impl FromStr for CompositeState {
    type Err = WizardError;

    /// Parse `main` or `main.sub`, splitting on the first `.`.
    ///
    /// An empty sub part (`"license."`) is treated as no sub-state.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (main, sub) = match s.split_once('.') {
            Some((main, sub)) => (main, sub),
            None => (s, ""),
        };

        if main.is_empty() {
            return Err(WizardError::InvalidIdentifier(s.to_string()));
        }

        Ok(Self {
            main: State::new(main),
            sub: (!sub.is_empty()).then(|| State::new(sub)),
        })
    }
}

/// Name of a main-level transition trigger.
///
/// The four canonical actions have associated constants; anything else is a
/// custom action resolved only through a state's transition map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Action(Cow<'static, str>);

impl Action {
    pub const NEXT: Action = Action(Cow::Borrowed("next"));
    pub const BACK: Action = Action(Cow::Borrowed("back"));
    pub const SKIP: Action = Action(Cow::Borrowed("skip"));
    pub const CANCEL: Action = Action(Cow::Borrowed("cancel"));

    /// Create a custom action.
    pub fn custom(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for `next`, `back`, `skip` and `cancel`
    pub fn is_canonical(&self) -> bool {
        matches!(self.as_str(), "next" | "back" | "skip" | "cancel")
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Action {
    fn from(name: &str) -> Self {
        Self::custom(name)
    }
}

impl From<String> for Action {
    fn from(name: String) -> Self {
        Self::custom(name)
    }
}

/// Trigger scoped to sub-state interaction (`scroll`, `select`, `input`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubAction(Cow<'static, str>);

impl SubAction {
    pub const SCROLL: SubAction = SubAction(Cow::Borrowed("scroll"));
    pub const SELECT: SubAction = SubAction(Cow::Borrowed("select"));
    pub const DESELECT: SubAction = SubAction(Cow::Borrowed("deselect"));
    pub const INPUT: SubAction = SubAction(Cow::Borrowed("input"));

    pub fn custom(name: impl Into<String>) -> Self {
        Self(Cow::Owned(name.into()))
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubAction {
    fn from(name: &str) -> Self {
        Self::custom(name)
    }
}
