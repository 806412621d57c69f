use crate::rule::{RuleAction, RuleParts};
use crate::{Bits, ComponentType, RuleHandle, RuleInfo, RuleRegistrationError, Trigger};
use std::collections::HashMap;

pub(crate) struct RuleRegistry {
    rules: Vec<RegisteredRule>,
    name_lookup: HashMap<String, RuleHandle>,
    by_component: HashMap<ComponentType, Vec<RuleHandle>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self {
            rules: Vec::new(),
            name_lookup: HashMap::new(),
            by_component: HashMap::new(),
        }
    }

    pub fn register(&mut self, parts: RuleParts) -> Result<RuleHandle, RuleRegistrationError> {
        let RuleParts {
            name,
            inputs,
            trigger,
            action,
        } = parts;

        if inputs.is_empty() {
            return Err(RuleRegistrationError::EmptyInputs { name });
        }

        if self.name_lookup.contains_key(&name) {
            return Err(RuleRegistrationError::DuplicateName { name });
        }

        let mut mask = Bits::new();
        for input in &inputs {
            if mask.contains(input.index()) {
                return Err(RuleRegistrationError::DuplicateInput {
                    name,
                    component: input.name(),
                });
            }
            mask.set(input.index());
        }

        let handle = RuleHandle::new(self.rules.len() as u32);
        for input in &inputs {
            self.by_component.entry(*input).or_default().push(handle);
        }

        self.name_lookup.insert(name.clone(), handle);
        self.rules.push(RegisteredRule {
            handle,
            name,
            inputs,
            mask,
            trigger,
            action,
        });

        Ok(handle)
    }

    pub fn get(&self, handle: RuleHandle) -> Option<&RegisteredRule> {
        self.rules.get(handle.index() as usize)
    }

    pub fn lookup(&self, name: &str) -> Option<RuleHandle> {
        self.name_lookup.get(name).copied()
    }

    /// Rules that list `component` as an input, in registration order.
    pub fn triggered_by(&self, component: ComponentType) -> &[RuleHandle] {
        self.by_component
            .get(&component)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredRule> {
        self.rules.iter()
    }
}

pub(crate) struct RegisteredRule {
    pub handle: RuleHandle,
    pub name: String,
    pub inputs: Vec<ComponentType>,
    pub mask: Bits,
    pub trigger: Trigger,
    pub action: RuleAction,
}

impl RegisteredRule {
    pub fn info(&self) -> RuleInfo {
        RuleInfo {
            handle: self.handle,
            name: self.name.clone(),
            inputs: self.inputs.iter().map(|input| input.name()).collect(),
            trigger: self.trigger,
        }
    }
}
