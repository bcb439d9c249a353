// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rule bindings.

use std::fmt;
use std::sync::Arc;

use understory_schema::{PropertyType, UntypedProperty, ValueType, eq_ignore_case};

/// What a [`Rule`] is bound to.
#[derive(Clone, Debug)]
pub enum RuleTarget {
    /// A concrete property; matches under the provider's property comparer.
    Property(UntypedProperty),
    /// An exact declared type.
    Type(ValueType),
    /// Nothing; used only as a provider-wide last resort.
    Untargeted,
}

impl RuleTarget {
    /// Ordering used to break ties between rules of equal position: a
    /// property binding is more specific than a type binding, which is more
    /// specific than none.
    #[must_use]
    pub fn specificity(&self) -> u8 {
        match self {
            Self::Property(_) => 2,
            Self::Type(_) => 1,
            Self::Untargeted => 0,
        }
    }
}

/// A handler bound to a type, a property, or nothing.
///
/// Rules are immutable and cheap to clone; the handler is shared.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use understory_rules::{Rule, RuleTarget};
/// use understory_schema::Property;
///
/// let age = Property::<i32>::new("Age");
/// let by_type = Rule::for_type::<i32>(Arc::new("any int"));
/// let by_property = Rule::for_property(age.untyped(), Arc::new("age only"))
///     .with_source_name("form");
///
/// assert!(by_property.target().specificity() > by_type.target().specificity());
/// assert_eq!(by_property.source_name(), Some("form"));
/// assert!(matches!(by_type.target(), RuleTarget::Type(_)));
/// ```
pub struct Rule<H: ?Sized> {
    handler: Arc<H>,
    target: RuleTarget,
    source_name: Option<String>,
}

impl<H: ?Sized> Rule<H> {
    /// Binds `handler` to values of type `T`.
    pub fn for_type<T: PropertyType>(handler: Arc<H>) -> Self {
        Self::for_value_type(T::value_type(), handler)
    }

    /// Binds `handler` to values of a runtime type.
    pub fn for_value_type(value_type: ValueType, handler: Arc<H>) -> Self {
        Self {
            handler,
            target: RuleTarget::Type(value_type),
            source_name: None,
        }
    }

    /// Binds `handler` to one property.
    pub fn for_property(property: impl AsRef<UntypedProperty>, handler: Arc<H>) -> Self {
        Self {
            handler,
            target: RuleTarget::Property(property.as_ref().clone()),
            source_name: None,
        }
    }

    /// Creates a rule bound to nothing.
    pub fn untargeted(handler: Arc<H>) -> Self {
        Self {
            handler,
            target: RuleTarget::Untargeted,
            source_name: None,
        }
    }

    /// Restricts the rule to input coming from the named source.
    #[must_use]
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    /// Returns the handler.
    #[must_use]
    #[inline]
    pub fn handler(&self) -> &Arc<H> {
        &self.handler
    }

    /// Returns the binding.
    #[must_use]
    #[inline]
    pub fn target(&self) -> &RuleTarget {
        &self.target
    }

    /// Returns the source-name hint.
    #[must_use]
    #[inline]
    pub fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    /// Returns `true` if the rule applies to input from `source`.
    ///
    /// Rules without a hint apply to every source; hints compare ignoring case.
    #[must_use]
    pub fn applies_to_source(&self, source: &str) -> bool {
        self.source_name
            .as_deref()
            .is_none_or(|name| eq_ignore_case(name, source))
    }
}

impl<H: ?Sized> Clone for Rule<H> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
            target: self.target.clone(),
            source_name: self.source_name.clone(),
        }
    }
}

impl<H: ?Sized> fmt::Debug for Rule<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("target", &self.target)
            .field("source_name", &self.source_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use understory_schema::Property;

    #[test]
    fn source_hint_filtering() {
        let plain: Rule<str> = Rule::untargeted(Arc::from("x"));
        let hinted = plain.clone().with_source_name("CSV");
        assert!(plain.applies_to_source("json"));
        assert!(hinted.applies_to_source("csv"));
        assert!(!hinted.applies_to_source("json"));
    }

    #[test]
    fn clone_shares_handler() {
        let age = Property::<i32>::new("Age");
        let rule: Rule<str> = Rule::for_property(&age, Arc::from("h"));
        let copy = rule.clone();
        assert!(Arc::ptr_eq(rule.handler(), copy.handler()));
    }
}
