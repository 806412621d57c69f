//! Rules: callbacks keyed by a set of required component types.
//!
//! A rule fires for an entity once every one of its inputs is present. The
//! callback receives the world, the entity and the current value of each
//! input in declared order, and may write further components or run
//! lifecycle transitions; those nested firings finish before the outer write
//! returns.
//!
//! ```ignore
//! world.configure(Rule::of2(
//!     "announce-realized",
//!     |world, entity, _: &IsAtLeastRealized, name: &ElementNameComponent| {
//!         tracing::info!(%entity, name = name.as_str(), "realized");
//!         Ok(())
//!     },
//! ))?;
//! ```

use crate::{
    try_component_type, Component, ComponentType, ComponentValue, Entity, ModelError,
    ModelResult, RuleHandle, World,
};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

pub(crate) type RuleAction =
    Arc<dyn Fn(&mut World, Entity, &[ComponentValue]) -> ModelResult<()> + Send + Sync>;

/// When a satisfied rule fires again.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
pub enum Trigger {
    /// Once per entity; removing one of the inputs re-arms the rule.
    #[default]
    Once,
    /// Every time one of the inputs is written while all are present.
    OnChange,
}

pub struct Rule {
    name: String,
    inputs: Vec<ComponentType>,
    trigger: Trigger,
    action: RuleAction,
    invalid: Option<ModelError>,
}

pub(crate) struct RuleParts {
    pub name: String,
    pub inputs: Vec<ComponentType>,
    pub trigger: Trigger,
    pub action: RuleAction,
}

macro_rules! rule_constructor {
    ($(#[$doc:meta])* $fn_name:ident, $($input:ident => $slot:tt),+) => {
        $(#[$doc])*
        pub fn $fn_name<$($input: Component,)+ F>(name: impl Into<String>, callback: F) -> Self
        where
            F: Fn(&mut World, Entity, $(&$input),+) -> ModelResult<()> + Send + Sync + 'static,
        {
            let name = name.into();
            let mut inputs = Vec::new();
            $(
                match try_component_type::<$input>() {
                    Ok(ty) => inputs.push(ty),
                    Err(error) => return Self::rejected(name, error),
                }
            )+
            let action: RuleAction = Arc::new(move |world: &mut World, entity: Entity, values: &[ComponentValue]| {
                callback(world, entity, $(downcast::<$input>(&values[$slot])?),+)
            });
            Self::from_parts(name, inputs, action)
        }
    };
}

impl Rule {
    rule_constructor!(
        /// Rule on a single component type.
        of1, A => 0
    );
    rule_constructor!(
        /// Rule on two component types, values passed in declared order.
        of2, A => 0, B => 1
    );
    rule_constructor!(of3, A => 0, B => 1, C => 2);
    rule_constructor!(of4, A => 0, B => 1, C => 2, D => 3);

    /// Fire on every write of an input instead of once per entity.
    pub fn on_change(mut self) -> Self {
        self.trigger = Trigger::OnChange;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[ComponentType] {
        &self.inputs
    }

    pub fn trigger(&self) -> Trigger {
        self.trigger
    }

    fn from_parts(name: String, inputs: Vec<ComponentType>, action: RuleAction) -> Self {
        Self {
            name,
            inputs,
            trigger: Trigger::Once,
            action,
            invalid: None,
        }
    }

    // The catalog error surfaces from `World::configure`.
    fn rejected(name: String, error: ModelError) -> Self {
        let noop: RuleAction =
            Arc::new(|_: &mut World, _: Entity, _: &[ComponentValue]| -> ModelResult<()> { Ok(()) });
        let mut rule = Self::from_parts(name, Vec::new(), noop);
        rule.invalid = Some(error);
        rule
    }

    pub(crate) fn into_parts(self) -> ModelResult<RuleParts> {
        if let Some(error) = self.invalid {
            return Err(error);
        }
        Ok(RuleParts {
            name: self.name,
            inputs: self.inputs,
            trigger: self.trigger,
            action: self.action,
        })
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("trigger", &self.trigger)
            .finish_non_exhaustive()
    }
}

fn downcast<T: Component>(value: &ComponentValue) -> ModelResult<&T> {
    value
        .downcast_ref::<T>()
        .ok_or(ModelError::ComponentTypeMismatch {
            component: T::type_name(),
            expected: std::any::type_name::<T>(),
        })
}

/// Diagnostic view of a configured rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleInfo {
    pub handle: RuleHandle,
    pub name: String,
    pub inputs: Vec<&'static str>,
    pub trigger: Trigger,
}
