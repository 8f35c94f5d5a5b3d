//! Reducer registry: the statically registered handler map.
//!
//! The registry maps (document type, scope, action kind) to a schema
//! check plus a pure state-transition function. Registration is typed:
//! callers hand in a reducer over their concrete state and input types,
//! and the registry stores an erased closure that round-trips the draft
//! scope state and the action input through serde. Unknown document
//! types and unknown action kinds are rejected here, at the boundary,
//! instead of falling through a string switch.
//!
//! Reducers reject by returning a [`DomainError`] instead of throwing.
//! The error carries a stable PascalCase `kind` naming the exact
//! rejection site (for example `UpdateRequirementNotFound` vs
//! `DuplicateRequirementId`), so callers can tell which referenced id
//! was missing without parsing messages.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::dispatch::Emitter;
use crate::model::document::Document;
use crate::model::types::Scope;

// ---------------------------------------------------------------------------
// Schema checks
// ---------------------------------------------------------------------------

/// An action input failed its registered shape predicate.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaViolation {
    /// Human-readable explanation of the mismatch.
    pub detail: String,
}

impl SchemaViolation {
    /// Build a violation with the given detail.
    #[must_use]
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "schema validation failed: {}", self.detail)
    }
}

impl std::error::Error for SchemaViolation {}

/// Opaque input predicates, supplied by the caller at registration time.
pub mod schema {
    use serde::de::DeserializeOwned;
    use serde_json::Value;

    use super::SchemaViolation;

    /// The default schema check for a typed registration: the input must
    /// deserialize into `I`.
    pub fn deserializes_into<I: DeserializeOwned>(
    ) -> impl Fn(&Value) -> Result<(), SchemaViolation> + Send + Sync {
        |input: &Value| {
            serde_json::from_value::<I>(input.clone())
                .map(|_| ())
                .map_err(|e| SchemaViolation::new(e.to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// Domain errors
// ---------------------------------------------------------------------------

/// Broad classification of a reducer rejection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DomainErrorClass {
    /// A referenced id does not exist in the target collection.
    NotFound,
    /// The requested transition violates a state invariant.
    Invariant,
}

impl fmt::Display for DomainErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "not found"),
            Self::Invariant => write!(f, "invariant violation"),
        }
    }
}

/// A reducer rejection. Dispatch discards the draft and leaves the
/// document untouched.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DomainError {
    class: DomainErrorClass,
    kind: String,
    message: String,
}

impl DomainError {
    /// A missing-reference rejection; `kind` names the exact site.
    #[must_use]
    pub fn not_found(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: DomainErrorClass::NotFound,
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// An invariant-violation rejection (duplicate id, invalid
    /// transition, cleared required field).
    #[must_use]
    pub fn invariant(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: DomainErrorClass::Invariant,
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// The broad classification.
    #[must_use]
    pub const fn class(&self) -> DomainErrorClass {
        self.class
    }

    /// The stable PascalCase discriminator, for example
    /// `DuplicateNodeId`.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.kind, self.class, self.message)
    }
}

impl std::error::Error for DomainError {}

// ---------------------------------------------------------------------------
// Erased reducer plumbing
// ---------------------------------------------------------------------------

/// Why an erased reducer invocation failed.
#[derive(Debug)]
pub enum ReduceFailure {
    /// The reducer rejected the transition.
    Domain(DomainError),
    /// The draft state or action input did not round-trip through the
    /// registered types. Points at state-cache corruption or a schema
    /// predicate that is looser than the reducer's input type.
    Codec {
        /// What failed to encode or decode.
        detail: String,
    },
}

impl fmt::Display for ReduceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain(e) => write!(f, "{e}"),
            Self::Codec { detail } => write!(f, "reducer codec failure: {detail}"),
        }
    }
}

impl std::error::Error for ReduceFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Domain(e) => Some(e),
            Self::Codec { .. } => None,
        }
    }
}

type SchemaCheckFn = dyn Fn(&Value) -> Result<(), SchemaViolation> + Send + Sync;
type ReduceFn =
    dyn Fn(&mut Value, &Value, &mut Emitter) -> Result<(), ReduceFailure> + Send + Sync;

/// A registered (schema check, reducer) pair for one action kind.
pub struct RegisteredAction {
    pub(crate) schema: Box<SchemaCheckFn>,
    pub(crate) reduce: Box<ReduceFn>,
}

impl RegisteredAction {
    /// Run the registered schema check against an action input.
    ///
    /// # Errors
    /// Returns the violation reported by the predicate.
    pub fn check_schema(&self, input: &Value) -> Result<(), SchemaViolation> {
        (self.schema)(input)
    }

    /// Apply the registered reducer to a draft scope state.
    ///
    /// On success the draft is replaced with the reduced state; on any
    /// failure the draft is left exactly as passed in.
    ///
    /// # Errors
    /// Returns the reducer's rejection or a codec failure.
    pub fn apply(
        &self,
        draft: &mut Value,
        input: &Value,
        emitter: &mut Emitter,
    ) -> Result<(), ReduceFailure> {
        (self.reduce)(draft, input, emitter)
    }
}

impl fmt::Debug for RegisteredAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RegisteredAction")
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

struct TypeEntry {
    initial_global: Value,
    initial_local: Value,
    actions: BTreeMap<(Scope, String), RegisteredAction>,
}

/// Errors raised at the registry boundary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RegistryError {
    /// The document type was registered twice.
    DuplicateDocumentType {
        /// The offending type name.
        document_type: String,
    },

    /// An action kind was registered twice for the same (type, scope).
    DuplicateActionKind {
        /// The document type.
        document_type: String,
        /// The scope.
        scope: Scope,
        /// The offending action kind.
        kind: String,
    },

    /// The document type is not registered.
    UnknownDocumentType {
        /// The unknown type name.
        document_type: String,
    },

    /// The initial state could not be serialized.
    InitialState {
        /// The document type being registered.
        document_type: String,
        /// Serde error detail.
        detail: String,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateDocumentType { document_type } => {
                write!(f, "document type '{document_type}' is already registered")
            }
            Self::DuplicateActionKind {
                document_type,
                scope,
                kind,
            } => write!(
                f,
                "action kind '{kind}' is already registered for '{document_type}' ({scope} scope)"
            ),
            Self::UnknownDocumentType { document_type } => {
                write!(f, "document type '{document_type}' is not registered")
            }
            Self::InitialState {
                document_type,
                detail,
            } => write!(
                f,
                "failed to serialize initial state for '{document_type}': {detail}"
            ),
        }
    }
}

impl std::error::Error for RegistryError {}

/// The handler map: (document type, scope, action kind) to reducer.
#[derive(Default)]
pub struct Registry {
    types: BTreeMap<String, TypeEntry>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document type with typed initial scope states.
    ///
    /// # Errors
    /// Returns an error if the type is already registered or an initial
    /// state cannot be serialized.
    pub fn register_document_type<G, L>(&mut self, document_type: &str) -> Result<(), RegistryError>
    where
        G: Default + Serialize,
        L: Default + Serialize,
    {
        let initial_global =
            serde_json::to_value(G::default()).map_err(|e| RegistryError::InitialState {
                document_type: document_type.to_owned(),
                detail: e.to_string(),
            })?;
        let initial_local =
            serde_json::to_value(L::default()).map_err(|e| RegistryError::InitialState {
                document_type: document_type.to_owned(),
                detail: e.to_string(),
            })?;
        self.register_document_type_raw(document_type, initial_global, initial_local)
    }

    /// Register a document type with explicit initial scope state values.
    ///
    /// # Errors
    /// Returns an error if the type is already registered.
    pub fn register_document_type_raw(
        &mut self,
        document_type: &str,
        initial_global: Value,
        initial_local: Value,
    ) -> Result<(), RegistryError> {
        if self.types.contains_key(document_type) {
            return Err(RegistryError::DuplicateDocumentType {
                document_type: document_type.to_owned(),
            });
        }
        self.types.insert(
            document_type.to_owned(),
            TypeEntry {
                initial_global,
                initial_local,
                actions: BTreeMap::new(),
            },
        );
        Ok(())
    }

    /// Register a typed reducer for (document type, scope, kind), using
    /// the default schema check (input must deserialize into `I`).
    ///
    /// # Errors
    /// Returns an error if the document type is unknown or the kind is
    /// already registered for this scope.
    pub fn register_action<S, I, F>(
        &mut self,
        document_type: &str,
        scope: Scope,
        kind: &str,
        reducer: F,
    ) -> Result<(), RegistryError>
    where
        S: DeserializeOwned + Serialize + 'static,
        I: DeserializeOwned + 'static,
        F: Fn(&mut S, I, &mut Emitter) -> Result<(), DomainError> + Send + Sync + 'static,
    {
        self.register_action_with_schema::<S, I, _, _>(
            document_type,
            scope,
            kind,
            schema::deserializes_into::<I>(),
            reducer,
        )
    }

    /// Register a typed reducer with a caller-supplied schema predicate.
    ///
    /// The predicate runs strictly before the reducer on every dispatch;
    /// the reducer only ever sees inputs the predicate accepted.
    ///
    /// # Errors
    /// Returns an error if the document type is unknown or the kind is
    /// already registered for this scope.
    pub fn register_action_with_schema<S, I, C, F>(
        &mut self,
        document_type: &str,
        scope: Scope,
        kind: &str,
        check: C,
        reducer: F,
    ) -> Result<(), RegistryError>
    where
        S: DeserializeOwned + Serialize + 'static,
        I: DeserializeOwned + 'static,
        C: Fn(&Value) -> Result<(), SchemaViolation> + Send + Sync + 'static,
        F: Fn(&mut S, I, &mut Emitter) -> Result<(), DomainError> + Send + Sync + 'static,
    {
        let entry =
            self.types
                .get_mut(document_type)
                .ok_or_else(|| RegistryError::UnknownDocumentType {
                    document_type: document_type.to_owned(),
                })?;
        let key = (scope, kind.to_owned());
        if entry.actions.contains_key(&key) {
            return Err(RegistryError::DuplicateActionKind {
                document_type: document_type.to_owned(),
                scope,
                kind: kind.to_owned(),
            });
        }

        let reduce = move |state: &mut Value,
                           input: &Value,
                           emitter: &mut Emitter|
              -> Result<(), ReduceFailure> {
            let mut draft: S =
                serde_json::from_value(state.clone()).map_err(|e| ReduceFailure::Codec {
                    detail: format!("scope state does not decode: {e}"),
                })?;
            let input: I =
                serde_json::from_value(input.clone()).map_err(|e| ReduceFailure::Codec {
                    detail: format!("action input does not decode: {e}"),
                })?;
            reducer(&mut draft, input, emitter).map_err(ReduceFailure::Domain)?;
            *state = serde_json::to_value(&draft).map_err(|e| ReduceFailure::Codec {
                detail: format!("scope state does not encode: {e}"),
            })?;
            Ok(())
        };

        entry.actions.insert(
            key,
            RegisteredAction {
                schema: Box::new(check),
                reduce: Box::new(reduce),
            },
        );
        Ok(())
    }

    /// Returns `true` if the document type is registered.
    #[must_use]
    pub fn has_document_type(&self, document_type: &str) -> bool {
        self.types.contains_key(document_type)
    }

    /// Look up the registered handler for (document type, scope, kind).
    #[must_use]
    pub fn action(
        &self,
        document_type: &str,
        scope: Scope,
        kind: &str,
    ) -> Option<&RegisteredAction> {
        self.types
            .get(document_type)?
            .actions
            .get(&(scope, kind.to_owned()))
    }

    /// The initial state of one scope for a registered document type.
    #[must_use]
    pub fn initial_state(&self, document_type: &str, scope: Scope) -> Option<&Value> {
        let entry = self.types.get(document_type)?;
        Some(match scope {
            Scope::Global => &entry.initial_global,
            Scope::Local => &entry.initial_local,
        })
    }

    /// Registered document type names, in sorted order.
    pub fn document_types(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Build a fresh document of a registered type, seeded with the
    /// type's initial scope states and empty operation logs.
    ///
    /// # Errors
    /// Returns an error if the document type is not registered.
    pub fn create_document(&self, document_type: &str) -> Result<Document, RegistryError> {
        let entry =
            self.types
                .get(document_type)
                .ok_or_else(|| RegistryError::UnknownDocumentType {
                    document_type: document_type.to_owned(),
                })?;
        Ok(Document::create(
            document_type,
            entry.initial_global.clone(),
            entry.initial_local.clone(),
        ))
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("types", &self.types.keys().collect::<Vec<_>>())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Counter {
        value: i64,
    }

    #[derive(Debug, Deserialize)]
    struct AddInput {
        amount: i64,
    }

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry
            .register_document_type::<Counter, Counter>("test/counter")
            .unwrap();
        registry
            .register_action::<Counter, AddInput, _>(
                "test/counter",
                Scope::Global,
                "ADD",
                |state, input, _emitter| {
                    if input.amount < 0 {
                        return Err(DomainError::invariant(
                            "NegativeAmount",
                            "amount must be non-negative",
                        ));
                    }
                    state.value += input.amount;
                    Ok(())
                },
            )
            .unwrap();
        registry
    }

    #[test]
    fn register_and_resolve() {
        let registry = registry();
        assert!(registry.has_document_type("test/counter"));
        assert!(registry.action("test/counter", Scope::Global, "ADD").is_some());
    }

    #[test]
    fn unknown_kind_is_not_resolved() {
        let registry = registry();
        assert!(registry.action("test/counter", Scope::Global, "NOPE").is_none());
        assert!(registry.action("test/counter", Scope::Local, "ADD").is_none());
        assert!(registry.action("test/other", Scope::Global, "ADD").is_none());
    }

    #[test]
    fn duplicate_document_type_rejected() {
        let mut registry = registry();
        let err = registry
            .register_document_type::<Counter, Counter>("test/counter")
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateDocumentType { .. }));
    }

    #[test]
    fn duplicate_action_kind_rejected() {
        let mut registry = registry();
        let err = registry
            .register_action::<Counter, AddInput, _>(
                "test/counter",
                Scope::Global,
                "ADD",
                |_, _, _| Ok(()),
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateActionKind { .. }));
    }

    #[test]
    fn register_action_for_unknown_type_rejected() {
        let mut registry = Registry::new();
        let err = registry
            .register_action::<Counter, AddInput, _>("nope", Scope::Global, "ADD", |_, _, _| Ok(()))
            .unwrap_err();
        assert!(matches!(err, RegistryError::UnknownDocumentType { .. }));
    }

    #[test]
    fn initial_state_per_scope() {
        let registry = registry();
        assert_eq!(
            registry.initial_state("test/counter", Scope::Global),
            Some(&json!({"value": 0}))
        );
        assert_eq!(
            registry.initial_state("test/counter", Scope::Local),
            Some(&json!({"value": 0}))
        );
        assert_eq!(registry.initial_state("nope", Scope::Global), None);
    }

    #[test]
    fn create_document_seeds_initial_states() {
        let registry = registry();
        let doc = registry.create_document("test/counter").unwrap();
        assert_eq!(doc.state.global, json!({"value": 0}));
        assert_eq!(doc.state.local, json!({"value": 0}));
        assert_eq!(doc.header.document_type, "test/counter");
    }

    #[test]
    fn create_document_unknown_type() {
        let registry = registry();
        let err = registry.create_document("nope").unwrap_err();
        assert!(matches!(err, RegistryError::UnknownDocumentType { .. }));
    }

    #[test]
    fn default_schema_check_rejects_bad_input() {
        let registry = registry();
        let action = registry.action("test/counter", Scope::Global, "ADD").unwrap();
        assert!(action.check_schema(&json!({"amount": 3})).is_ok());
        assert!(action.check_schema(&json!({"amount": "three"})).is_err());
        assert!(action.check_schema(&json!({})).is_err());
    }

    #[test]
    fn erased_reducer_applies_typed_mutation() {
        let registry = registry();
        let action = registry.action("test/counter", Scope::Global, "ADD").unwrap();
        let mut state = json!({"value": 5});
        let mut emitter = Emitter::new();
        action
            .apply(&mut state, &json!({"amount": 3}), &mut emitter)
            .unwrap();
        assert_eq!(state, json!({"value": 8}));
    }

    #[test]
    fn erased_reducer_leaves_state_on_domain_error() {
        let registry = registry();
        let action = registry.action("test/counter", Scope::Global, "ADD").unwrap();
        let mut state = json!({"value": 5});
        let mut emitter = Emitter::new();
        let err = action
            .apply(&mut state, &json!({"amount": -1}), &mut emitter)
            .unwrap_err();
        assert!(matches!(err, ReduceFailure::Domain(ref e) if e.kind() == "NegativeAmount"));
        assert_eq!(state, json!({"value": 5}), "draft must be untouched");
    }

    #[test]
    fn erased_reducer_codec_failure_on_corrupt_state() {
        let registry = registry();
        let action = registry.action("test/counter", Scope::Global, "ADD").unwrap();
        let mut state = json!({"value": "corrupt"});
        let mut emitter = Emitter::new();
        let err = action
            .apply(&mut state, &json!({"amount": 1}), &mut emitter)
            .unwrap_err();
        assert!(matches!(err, ReduceFailure::Codec { .. }));
    }

    #[test]
    fn domain_error_accessors() {
        let err = DomainError::not_found("UpdateRequirementNotFound", "no requirement 'r9'");
        assert_eq!(err.class(), DomainErrorClass::NotFound);
        assert_eq!(err.kind(), "UpdateRequirementNotFound");
        let msg = format!("{err}");
        assert!(msg.contains("UpdateRequirementNotFound"));
        assert!(msg.contains("r9"));
    }
}
