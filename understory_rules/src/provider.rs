// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Priority-ordered rule matching.
//!
//! A [`RuleProvider`] answers "which handler applies to this property (or
//! type)?" from an ordered list of [`Rule`]s. Matching is strictly ordered and
//! the first success wins:
//!
//! 1. a rule bound to a property equal to the query under the configured
//!    [`PropertyComparer`] and declared with the same value type
//! 2. a rule bound to the exact declared type
//! 3. an enum handler synthesized by the [`Fallbacks`]
//! 4. a nullable-enum handler (null accepted), then a generic nullable
//!    wrapper around the inner type's rule
//! 5. a collection handler built around the element type's rule, resolved
//!    recursively through the same provider
//! 6. the first untargeted rule, if enabled
//!
//! Within each step, rules are tried in declaration order. No match is `None`,
//! which callers treat as "no handler", not as an error.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};
use understory_schema::{PropertyComparer, UntypedProperty, ValueKind, ValueType};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::fallback::{Fallbacks, NoFallbacks};
use crate::rule::{Rule, RuleTarget};

/// Lookup of handlers by type or property.
///
/// Implemented by [`RuleProvider`] and by [`RuleCache`](crate::RuleCache), so
/// callers are transparent to caching.
pub trait RuleResolver<H: ?Sized> {
    /// Returns the handler for values of `value_type`.
    fn rule_for_type(&self, value_type: ValueType) -> Option<Arc<H>>;

    /// Returns the handler for `property`.
    fn rule_for_property(&self, property: &UntypedProperty) -> Option<Arc<H>>;

    /// Returns the comparer used to match property-bound rules.
    fn property_comparer(&self) -> PropertyComparer;
}

impl<H: ?Sized, R: RuleResolver<H> + ?Sized> RuleResolver<H> for Arc<R> {
    fn rule_for_type(&self, value_type: ValueType) -> Option<Arc<H>> {
        (**self).rule_for_type(value_type)
    }

    fn rule_for_property(&self, property: &UntypedProperty) -> Option<Arc<H>> {
        (**self).rule_for_property(property)
    }

    fn property_comparer(&self) -> PropertyComparer {
        (**self).property_comparer()
    }
}

/// How collection input text is delimited.
///
/// The default accepts `[1, 2, 3]`, `1,2,3` and `1 2 3`.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CollectionFormat {
    /// Optional opening bracket stripped from the input.
    pub open: Option<char>,
    /// Optional closing bracket stripped from the input.
    pub close: Option<char>,
    /// Element separators.
    pub separators: Vec<char>,
    /// Whether whitespace also separates elements.
    pub split_on_whitespace: bool,
}

impl Default for CollectionFormat {
    fn default() -> Self {
        Self {
            open: Some('['),
            close: Some(']'),
            separators: vec![','],
            split_on_whitespace: true,
        }
    }
}

impl CollectionFormat {
    /// Removes surrounding whitespace and the configured brackets.
    ///
    /// When both brackets are configured they are removed only as a pair; a
    /// lone bracket is left in place and reaches the element parser.
    #[must_use]
    pub fn strip<'a>(&self, text: &'a str) -> &'a str {
        let body = text.trim();
        let bracketed = match (self.open, self.close) {
            (Some(open), Some(close)) => body
                .strip_prefix(open)
                .and_then(|rest| rest.strip_suffix(close)),
            (Some(open), None) => body.strip_prefix(open),
            (None, Some(close)) => body.strip_suffix(close),
            (None, None) => None,
        };
        bracketed.unwrap_or(body).trim()
    }

    /// Splits a stripped body into trimmed, non-empty element texts.
    pub fn split<'a>(&'a self, body: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        body.split(move |c: char| {
            self.separators.contains(&c) || (self.split_on_whitespace && c.is_whitespace())
        })
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
    }
}

/// Which matching steps a [`RuleProvider`] performs, and how.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ProviderConfig {
    /// Matches property-bound rules.
    pub property_comparer: PropertyComparer,
    /// Enables enum and nullable-enum synthesis.
    pub enum_fallback: bool,
    /// Enables generic nullable wrapping.
    pub nullable_fallback: bool,
    /// Enables collection synthesis.
    pub collection_fallback: bool,
    /// Enables untargeted rules as last resort.
    pub untargeted_fallback: bool,
    /// Delimiters for collection input.
    pub collection_format: CollectionFormat,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            property_comparer: PropertyComparer::ByReference,
            enum_fallback: true,
            nullable_fallback: true,
            collection_fallback: true,
            untargeted_fallback: true,
            collection_format: CollectionFormat::default(),
        }
    }
}

impl ProviderConfig {
    /// Sets [`property_comparer`](Self::property_comparer).
    #[must_use]
    pub fn with_property_comparer(mut self, comparer: PropertyComparer) -> Self {
        self.property_comparer = comparer;
        self
    }

    /// Sets [`enum_fallback`](Self::enum_fallback).
    #[must_use]
    pub fn with_enum_fallback(mut self, enabled: bool) -> Self {
        self.enum_fallback = enabled;
        self
    }

    /// Sets [`nullable_fallback`](Self::nullable_fallback).
    #[must_use]
    pub fn with_nullable_fallback(mut self, enabled: bool) -> Self {
        self.nullable_fallback = enabled;
        self
    }

    /// Sets [`collection_fallback`](Self::collection_fallback).
    #[must_use]
    pub fn with_collection_fallback(mut self, enabled: bool) -> Self {
        self.collection_fallback = enabled;
        self
    }

    /// Sets [`untargeted_fallback`](Self::untargeted_fallback).
    #[must_use]
    pub fn with_untargeted_fallback(mut self, enabled: bool) -> Self {
        self.untargeted_fallback = enabled;
        self
    }

    /// Sets [`collection_format`](Self::collection_format).
    #[must_use]
    pub fn with_collection_format(mut self, format: CollectionFormat) -> Self {
        self.collection_format = format;
        self
    }
}

/// An immutable, ordered set of rules with fallback synthesis.
///
/// Use [`RuleProvider::builder`] to construct instances.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use understory_rules::{Rule, RuleProvider, RuleResolver};
/// use understory_schema::{Property, PropertyType};
///
/// let age = Property::<i32>::new("Age");
/// let provider = RuleProvider::<str>::builder()
///     .rule(Rule::for_type::<i32>(Arc::from("int")))
///     .rule(Rule::for_property(&age, Arc::from("age")))
///     .build();
///
/// // The property rule wins even though the type rule was declared first.
/// assert_eq!(provider.rule_for_property(age.untyped()).as_deref(), Some("age"));
/// assert_eq!(provider.rule_for_type(i32::value_type()).as_deref(), Some("int"));
/// assert!(provider.rule_for_type(String::value_type()).is_none());
/// ```
pub struct RuleProvider<H: ?Sized, F = NoFallbacks> {
    rules: Vec<Rule<H>>,
    fallbacks: F,
    config: ProviderConfig,
}

impl<H: ?Sized> RuleProvider<H> {
    /// Starts building a provider without fallbacks.
    #[must_use]
    pub fn builder() -> RuleProviderBuilder<H> {
        RuleProviderBuilder {
            rules: Vec::new(),
            fallbacks: NoFallbacks,
            config: ProviderConfig::default(),
        }
    }
}

impl<H: ?Sized, F: Fallbacks<H>> RuleProvider<H, F> {
    /// Returns the rules in declaration order.
    pub fn rules(&self) -> impl Iterator<Item = &Rule<H>> + '_ {
        self.rules.iter()
    }

    /// Returns the number of declared rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if no rules are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Returns the fallbacks.
    #[must_use]
    pub fn fallbacks(&self) -> &F {
        &self.fallbacks
    }

    /// Returns a provider restricted to rules that apply to input from `source`.
    ///
    /// Rules without a source-name hint are kept; hinted rules are kept only
    /// when the hint matches, ignoring case. Declaration order is preserved.
    #[must_use]
    pub fn rules_for_source(&self, source: &str) -> Self
    where
        F: Clone,
    {
        Self {
            rules: self
                .rules
                .iter()
                .filter(|rule| rule.applies_to_source(source))
                .cloned()
                .collect(),
            fallbacks: self.fallbacks.clone(),
            config: self.config.clone(),
        }
    }

    fn property_rule(&self, property: &UntypedProperty) -> Option<Arc<H>> {
        let comparer = self.config.property_comparer;
        self.rules.iter().find_map(|rule| match rule.target() {
            RuleTarget::Property(bound)
                if bound.value_type() == property.value_type() && comparer.eq(bound, property) =>
            {
                Some(Arc::clone(rule.handler()))
            }
            _ => None,
        })
    }

    fn type_rule(&self, value_type: ValueType) -> Option<Arc<H>> {
        self.rules.iter().find_map(|rule| match rule.target() {
            RuleTarget::Type(bound) if *bound == value_type => Some(Arc::clone(rule.handler())),
            _ => None,
        })
    }

    fn untargeted_rule(&self) -> Option<Arc<H>> {
        self.rules
            .iter()
            .find(|rule| matches!(rule.target(), RuleTarget::Untargeted))
            .map(|rule| Arc::clone(rule.handler()))
    }

    /// Steps 2 to 5.
    fn typed_rule(&self, value_type: ValueType) -> Option<Arc<H>> {
        if let Some(found) = self.type_rule(value_type) {
            trace!(value_type = value_type.name(), "matched type rule");
            return Some(found);
        }

        let config = &self.config;
        match value_type.kind() {
            ValueKind::Enum(kind) if config.enum_fallback => {
                let synthesized = self.fallbacks.enumeration(value_type, kind);
                if synthesized.is_some() {
                    debug!(value_type = value_type.name(), "synthesized enum rule");
                }
                synthesized
            }
            ValueKind::Nullable(nullable) => {
                let inner = nullable.inner();
                if config.enum_fallback
                    && let ValueKind::Enum(kind) = inner.kind()
                    && let Some(synthesized) =
                        self.fallbacks.nullable_enumeration(value_type, nullable, kind)
                {
                    debug!(value_type = value_type.name(), "synthesized nullable enum rule");
                    return Some(synthesized);
                }
                if !config.nullable_fallback {
                    return None;
                }
                let inner_rule = self.rule_for_type(inner)?;
                let synthesized = self.fallbacks.nullable(value_type, nullable, inner_rule);
                if synthesized.is_some() {
                    debug!(value_type = value_type.name(), "synthesized nullable rule");
                }
                synthesized
            }
            ValueKind::Collection(kind) if config.collection_fallback => {
                let element_rule = self.rule_for_type(kind.element())?;
                let synthesized = self.fallbacks.collection(
                    value_type,
                    kind,
                    element_rule,
                    &config.collection_format,
                );
                if synthesized.is_some() {
                    debug!(value_type = value_type.name(), "synthesized collection rule");
                }
                synthesized
            }
            _ => None,
        }
    }
}

impl<H: ?Sized, F: Fallbacks<H>> RuleResolver<H> for RuleProvider<H, F> {
    fn rule_for_type(&self, value_type: ValueType) -> Option<Arc<H>> {
        self.typed_rule(value_type).or_else(|| {
            if !self.config.untargeted_fallback {
                return None;
            }
            let found = self.untargeted_rule();
            if found.is_some() {
                trace!(value_type = value_type.name(), "matched untargeted rule");
            }
            found
        })
    }

    fn rule_for_property(&self, property: &UntypedProperty) -> Option<Arc<H>> {
        if let Some(found) = self.property_rule(property) {
            trace!(property = property.name(), "matched property rule");
            return Some(found);
        }
        self.rule_for_type(property.value_type())
    }

    fn property_comparer(&self) -> PropertyComparer {
        self.config.property_comparer
    }
}

impl<H: ?Sized, F: fmt::Debug> fmt::Debug for RuleProvider<H, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleProvider")
            .field("rules", &self.rules)
            .field("fallbacks", &self.fallbacks)
            .field("config", &self.config)
            .finish()
    }
}

/// Builder for a [`RuleProvider`].
///
/// Rules keep the order in which they are added.
#[must_use = "call `build` to produce a provider"]
pub struct RuleProviderBuilder<H: ?Sized, F = NoFallbacks> {
    rules: Vec<Rule<H>>,
    fallbacks: F,
    config: ProviderConfig,
}

impl<H: ?Sized, F> RuleProviderBuilder<H, F> {
    /// Appends a rule.
    pub fn rule(mut self, rule: Rule<H>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Appends several rules in order.
    pub fn rules(mut self, rules: impl IntoIterator<Item = Rule<H>>) -> Self {
        self.rules.extend(rules);
        self
    }

    /// Replaces the fallbacks.
    pub fn fallbacks<G: Fallbacks<H>>(self, fallbacks: G) -> RuleProviderBuilder<H, G> {
        RuleProviderBuilder {
            rules: self.rules,
            fallbacks,
            config: self.config,
        }
    }

    /// Replaces the configuration.
    pub fn config(mut self, config: ProviderConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the comparer used to match property-bound rules.
    pub fn property_comparer(mut self, comparer: PropertyComparer) -> Self {
        self.config.property_comparer = comparer;
        self
    }

    /// Produces the provider.
    #[must_use]
    pub fn build(self) -> RuleProvider<H, F> {
        RuleProvider {
            rules: self.rules,
            fallbacks: self.fallbacks,
            config: self.config,
        }
    }
}

impl<H: ?Sized, F: fmt::Debug> fmt::Debug for RuleProviderBuilder<H, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RuleProviderBuilder")
            .field("rules", &self.rules.len())
            .field("fallbacks", &self.fallbacks)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use understory_schema::{Property, PropertyType};

    fn provider(rules: Vec<Rule<str>>) -> RuleProvider<str> {
        RuleProvider::builder().rules(rules).build()
    }

    #[test]
    fn first_declared_type_rule_wins() {
        let p = provider(vec![
            Rule::for_type::<i32>(Arc::from("a")),
            Rule::for_type::<i32>(Arc::from("b")),
        ]);
        assert_eq!(p.rule_for_type(i32::value_type()).as_deref(), Some("a"));
    }

    #[test]
    fn property_rule_beats_earlier_type_rule() {
        let age = Property::<i32>::new("Age");
        let other = Property::<i32>::new("Other");
        let p = provider(vec![
            Rule::for_type::<i32>(Arc::from("type")),
            Rule::for_property(&age, Arc::from("property")),
        ]);
        assert_eq!(p.rule_for_property(age.untyped()).as_deref(), Some("property"));
        assert_eq!(p.rule_for_property(other.untyped()).as_deref(), Some("type"));
    }

    #[test]
    fn property_rule_uses_configured_comparer() {
        let declared = Property::<i32>::new("Age");
        let query = Property::<i32>::new("age");
        let by_ref = provider(vec![Rule::for_property(&declared, Arc::from("p"))]);
        assert!(by_ref.rule_for_property(query.untyped()).is_none());

        let by_name = RuleProvider::builder()
            .rule(Rule::for_property(&declared, Arc::<str>::from("p")))
            .property_comparer(PropertyComparer::ByNameOrAliasIgnoreCase)
            .build();
        assert_eq!(by_name.rule_for_property(query.untyped()).as_deref(), Some("p"));
    }

    #[test]
    fn property_rule_requires_same_value_type() {
        let declared = Property::<i32>::new("Age");
        let text = Property::<String>::new("age");
        let p = RuleProvider::builder()
            .rule(Rule::for_property(&declared, Arc::<str>::from("int age")))
            .rule(Rule::for_type::<String>(Arc::from("text")))
            .property_comparer(PropertyComparer::ByNameOrAliasIgnoreCase)
            .build();
        assert_eq!(p.rule_for_property(text.untyped()).as_deref(), Some("text"));
    }

    #[test]
    fn untargeted_is_last_and_optional() {
        let rules = vec![
            Rule::untargeted(Arc::from("any")),
            Rule::for_type::<bool>(Arc::from("bool")),
        ];
        let p = provider(rules.clone());
        assert_eq!(p.rule_for_type(bool::value_type()).as_deref(), Some("bool"));
        assert_eq!(p.rule_for_type(u8::value_type()).as_deref(), Some("any"));

        let strict = RuleProvider::builder()
            .rules(rules)
            .config(ProviderConfig::default().with_untargeted_fallback(false))
            .build();
        assert!(strict.rule_for_type(u8::value_type()).is_none());
    }

    #[test]
    fn no_fallbacks_means_no_synthesis() {
        let p = provider(vec![Rule::for_type::<i32>(Arc::from("int"))]);
        assert!(p.rule_for_type(Vec::<i32>::value_type()).is_none());
        assert!(p.rule_for_type(Option::<i32>::value_type()).is_none());
    }

    #[test]
    fn rules_for_source_filters_hints() {
        let p = provider(vec![
            Rule::for_type::<i32>(Arc::from("csv")).with_source_name("csv"),
            Rule::for_type::<i32>(Arc::from("plain")),
        ]);
        assert_eq!(p.rule_for_type(i32::value_type()).as_deref(), Some("csv"));
        let json = p.rules_for_source("json");
        assert_eq!(json.len(), 1);
        assert_eq!(json.rule_for_type(i32::value_type()).as_deref(), Some("plain"));
        assert_eq!(
            p.rules_for_source("CSV").rule_for_type(i32::value_type()).as_deref(),
            Some("csv")
        );
    }

    #[test]
    fn collection_format_strip_and_split() {
        let format = CollectionFormat::default();
        let body = format.strip("  [1, 2 ,3]  ");
        assert_eq!(body, "1, 2 ,3");
        let parts: Vec<_> = format.split(body).collect();
        assert_eq!(parts, vec!["1", "2", "3"]);
        let parts: Vec<_> = format.split("a b,,c").collect();
        assert_eq!(parts, vec!["a", "b", "c"]);
    }

    #[test]
    fn collection_format_strips_brackets_only_in_pairs() {
        let format = CollectionFormat::default();
        assert_eq!(format.strip("[1, 2"), "[1, 2");
        assert_eq!(format.strip("1, 2]"), "1, 2]");
        assert_eq!(format.strip(" [ ] "), "");

        let open_only = CollectionFormat {
            close: None,
            ..CollectionFormat::default()
        };
        assert_eq!(open_only.strip("(1 2"), "(1 2");
        assert_eq!(open_only.strip("[1 2"), "1 2");
    }
}
