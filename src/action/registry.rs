//! Action registry: maps payload type tags to variant decoders.
//!
//! Persisted payloads carry no static type information, only the
//! `"type"` discriminator string. The registry is an explicit object
//! passed to every payload-parsing call site; there is no process-global
//! state and no import-order sensitivity. Registrations happen up front
//! (normally via [`ActionRegistry::with_builtins`]) and a duplicate type
//! tag is rejected rather than silently overwriting a decoder.

use std::collections::HashMap;

use super::payload::{self, Payload, TYPE_KEY};
use super::{code_writing, function_call, search, Action};
use crate::error::ActionError;

/// Decoder for one action variant.
pub type DecodeFn = fn(&Payload, &ActionRegistry) -> Result<Action, ActionError>;

/// Registry of action variant decoders, keyed by payload type tag.
#[derive(Debug, Clone)]
pub struct ActionRegistry {
    decoders: HashMap<String, DecodeFn>,
}

impl ActionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Creates a registry with all built-in variants registered.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        // Built-in tags are distinct, so these registrations cannot fail.
        let _ = registry.register(function_call::TYPE_TAG, function_call::FunctionCallAction::from_payload);
        let _ = registry.register(code_writing::TYPE_TAG, code_writing::CodeWritingAction::from_payload);
        let _ = registry.register(search::TYPE_TAG, search::SearchAction::from_payload);
        registry
    }

    /// Registers a decoder for a type tag. Fails if the tag is taken.
    pub fn register(&mut self, type_tag: impl Into<String>, decode: DecodeFn) -> Result<(), ActionError> {
        let type_tag = type_tag.into();
        if self.decoders.contains_key(&type_tag) {
            return Err(ActionError::DuplicateRegistration(type_tag));
        }
        self.decoders.insert(type_tag, decode);
        Ok(())
    }

    /// Returns true if a decoder is registered for the tag.
    pub fn contains(&self, type_tag: &str) -> bool {
        self.decoders.contains_key(type_tag)
    }

    /// Parses an action from its payload form, dispatching on the
    /// `"type"` discriminator.
    pub fn parse_action_from_payload(&self, p: &Payload) -> Result<Action, ActionError> {
        let type_tag = payload::get_str(p, TYPE_KEY)?;
        let decode = self
            .decoders
            .get(type_tag)
            .ok_or_else(|| ActionError::UnknownActionType(type_tag.to_string()))?;
        decode(p, self)
    }
}

impl Default for ActionRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
