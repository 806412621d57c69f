use thiserror::Error;

/// Errors that can occur while configuring a rule on the world.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RuleRegistrationError {
    #[error("rule '{name}' is already configured")]
    DuplicateName { name: String },

    #[error("rule '{name}' does not require any components")]
    EmptyInputs { name: String },

    #[error("rule '{name}' requires component '{component}' more than once")]
    DuplicateInput {
        name: String,
        component: &'static str,
    },
}
