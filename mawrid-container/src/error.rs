//! Error types for Mawrid resolution.
//!
//! Callers see one outward failure, "dependency not found", carrying the
//! requested type, key and prototype flag. A [`NotFoundReason`] says which
//! step gave up, and cycles get their own variant so they can be told
//! apart from plain misses.

use std::fmt;

use mawrid_support::rendering::{render_chain, shorten_type_name};

use crate::identity::AnyIdentity;

/// Main error type for all Mawrid operations.
#[derive(Debug, thiserror::Error)]
pub enum MawridError {
    /// The identity could not be resolved.
    #[error("{}", .0)]
    DependencyNotFound(DependencyNotFoundError),

    /// Resolution re-entered an identity that is still being produced.
    #[error("{}", .0)]
    CircularDependency(CircularDependencyError),
}

impl MawridError {
    /// Shorthand for a not-found error about `identity`.
    pub fn not_found(identity: &AnyIdentity, reason: NotFoundReason) -> Self {
        MawridError::DependencyNotFound(DependencyNotFoundError::new(identity, reason))
    }

    /// For producers that fail for their own reasons, such as bad input.
    ///
    /// ```rust,ignore
    /// injector.register(&Identity::<u16>::named("port"), |r| {
    ///     let raw = r.resolve(&Identity::<String>::named("raw_port"))?;
    ///     raw.parse().map(Arc::new).map_err(|err| {
    ///         MawridError::producer_failed(Identity::<u16>::named("port").erased(), err)
    ///     })
    /// });
    /// ```
    pub fn producer_failed(
        identity: &AnyIdentity,
        cause: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        DependencyNotFoundError::new(identity, NotFoundReason::ProducerFailed)
            .with_cause(cause)
            .into()
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            MawridError::DependencyNotFound(_) => "dependencyNotFound",
            MawridError::CircularDependency(_) => "circularDependency",
        }
    }

    /// The message meant for people, without the cause.
    pub fn user_message(&self) -> String {
        match self {
            MawridError::DependencyNotFound(err) => err.user_message(),
            MawridError::CircularDependency(err) => err.to_string(),
        }
    }

    pub fn reason(&self) -> Option<NotFoundReason> {
        match self {
            MawridError::DependencyNotFound(err) => Some(err.reason),
            MawridError::CircularDependency(_) => None,
        }
    }

    pub fn is_circular(&self) -> bool {
        matches!(self, MawridError::CircularDependency(_))
    }
}

impl From<DependencyNotFoundError> for MawridError {
    fn from(err: DependencyNotFoundError) -> Self {
        MawridError::DependencyNotFound(err)
    }
}

/// Which step of resolution gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    /// No cached value, alias, producer or constructor.
    NoProvider,
    /// The identity names a type, but no constructor is known for it.
    TypeNotConstructible,
    /// A constructor entry exists but offers no usable constructor.
    ConstructorMismatch,
    /// A producer ran but yielded a value of another type.
    TypeMismatch,
    /// A lazy injector was used without a container.
    ContainerMissing,
    /// A producer reported its own failure.
    ProducerFailed,
}

/// What was being resolved, as far as it is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityInfo {
    pub type_name: Option<&'static str>,
    pub key: Option<String>,
    pub is_prototype: bool,
}

impl IdentityInfo {
    pub fn from_identity(identity: &AnyIdentity) -> Self {
        Self {
            type_name: identity.type_ref().map(|t| t.name()),
            key: identity.key().map(str::to_owned),
            is_prototype: identity.is_prototype(),
        }
    }
}

/// Error when an identity could not be resolved.
#[derive(Debug)]
pub struct DependencyNotFoundError {
    /// The identity that was requested
    pub identity: IdentityInfo,
    pub reason: NotFoundReason,
    /// Replaces the synthesized message when present
    pub friendly_message: Option<String>,
    /// Underlying failure, if any
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DependencyNotFoundError {
    pub fn new(identity: &AnyIdentity, reason: NotFoundReason) -> Self {
        Self {
            identity: IdentityInfo::from_identity(identity),
            reason,
            friendly_message: None,
            cause: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.friendly_message = Some(message.into());
        self
    }

    pub fn with_cause(mut self, cause: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// The friendly message verbatim, or one built from the identity.
    pub fn user_message(&self) -> String {
        if let Some(message) = &self.friendly_message {
            return message.clone();
        }
        let mut message = String::from("Could not find dependency for ");
        if let Some(type_name) = self.identity.type_name {
            message.push_str(&format!("type: {} ", shorten_type_name(type_name)));
        }
        if let Some(key) = &self.identity.key {
            message.push_str(&format!("key: {key} "));
        }
        message.push_str(&format!("recreating: {}", self.identity.is_prototype));
        message
    }
}

impl fmt::Display for DependencyNotFoundError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.user_message())?;
        if let Some(cause) = &self.cause {
            write!(f, ": {cause}")?;
        }
        Ok(())
    }
}

/// Error when a dependency cycle is detected during resolve.
///
/// Shows the chain of identities so you can see where the cycle closes.
#[derive(Debug)]
pub struct CircularDependencyError {
    /// Example: ["A", "B", "A"]
    pub chain: Vec<String>,
}

impl fmt::Display for CircularDependencyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Circular dependency detected:\n  {}", render_chain(&self.chain))?;
        write!(
            f,
            "\n  Hint: resolve one side lazily with Inject, or restructure the producers"
        )
    }
}

/// Convenient Result type for Mawrid operations.
pub type Result<T> = std::result::Result<T, MawridError>;
