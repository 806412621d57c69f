use crate::{Entity, RuleRegistrationError};
use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised by the model graph.
///
/// A missing component is never an error; lookups return `None` instead.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("entity {0} does not belong to this world")]
    UnknownEntity(Entity),

    #[error("entity {entity} has no '{component}' component to replace")]
    MissingComponent {
        entity: Entity,
        component: &'static str,
    },

    #[error("value for component '{component}' is not a {expected}")]
    ComponentTypeMismatch {
        component: &'static str,
        expected: &'static str,
    },

    #[error("component name '{name}' is already used by {existing}, cannot register {requested}")]
    ComponentNameCollision {
        name: &'static str,
        existing: &'static str,
        requested: &'static str,
    },

    #[error("parent chain of entity {entity} loops back through {repeated}")]
    AncestryCycle { entity: Entity, repeated: Entity },

    #[error("rule '{rule}' on entity {entity} exceeded the dispatch depth limit of {limit}")]
    DispatchDepthExceeded {
        rule: String,
        entity: Entity,
        limit: usize,
    },

    #[error(transparent)]
    RuleRegistration(#[from] RuleRegistrationError),

    #[error("rule '{rule}' failed on entity {entity}")]
    RuleFailed {
        rule: String,
        entity: Entity,
        #[source]
        source: Box<ModelError>,
    },

    #[error("{0}")]
    Custom(String),
}

impl ModelError {
    /// Error for rule authors to return from a callback.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }

    /// Strip every `RuleFailed` layer added by nested rule dispatch.
    pub fn root_cause(&self) -> &ModelError {
        let mut error = self;
        while let ModelError::RuleFailed { source, .. } = error {
            error = source.as_ref();
        }
        error
    }

    /// Names of the rules the error passed through, outermost first.
    pub fn rule_trail(&self) -> Vec<&str> {
        let mut trail = Vec::new();
        let mut error = self;
        while let ModelError::RuleFailed { rule, source, .. } = error {
            trail.push(rule.as_str());
            error = source.as_ref();
        }
        trail
    }
}
