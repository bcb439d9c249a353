// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Rules: priority-ordered handler lookup for typed properties.
//!
//! A *rule* binds a handler (a parser, a formatter, a validator, or anything
//! else) to a property, to a declared type, or to nothing at all. A
//! [`RuleProvider`] picks the handler for a query in a fixed order:
//!
//! **Property → Exact type → Enum → Nullable → Collection → Untargeted**
//!
//! Enum, nullable, and collection handlers are synthesized on demand by a
//! [`Fallbacks`] implementation, so a provider that knows how to parse `i32`
//! also parses `Option<i32>` and `Vec<i32>` without declaring them.
//! [`RuleCache`] memoizes any [`RuleResolver`] and is safe to share between
//! threads.
//!
//! ## Parsing
//!
//! [`ValueParser`] is the handler type used for text input, and
//! [`ParserProvider::standard`] covers the primitives, `String`, enums,
//! nullables, and lists.
//!
//! ```rust
//! use understory_rules::{ParseError, ParserProvider, RuleCache, parse_property};
//! use understory_schema::Property;
//!
//! let scores = Property::<Vec<i32>>::new("Scores");
//! let parsers = RuleCache::new(ParserProvider::standard());
//!
//! let value = parse_property(&parsers, scores.untyped(), Some("[1, 2, 3]"))
//!     .unwrap()
//!     .unwrap();
//! assert_eq!(value.downcast_ref::<Vec<i32>>(), Some(&vec![1, 2, 3]));
//!
//! let err = parse_property(&parsers, scores.untyped(), Some("[1, x, 3]")).unwrap_err();
//! assert_eq!(err, ParseError::Invalid { input: "x".into(), type_name: "i32".into() });
//! ```
//!
//! ## Features
//!
//! - `serde`: `Serialize`/`Deserialize` for [`ProviderConfig`] and
//!   [`CollectionFormat`].

mod cache;
mod fallback;
mod parser;
mod provider;
mod rule;

pub use cache::RuleCache;
pub use fallback::{Fallbacks, NoFallbacks};
pub use parser::{
    CollectionParser, EnumParser, FromStrParser, NullableParser, ParserFallbacks,
    ParserProvider, ValueParser, parse_property, standard_rules,
};
pub use provider::{
    CollectionFormat, ProviderConfig, RuleProvider, RuleProviderBuilder, RuleResolver,
};
pub use rule::{Rule, RuleTarget};

pub use understory_schema::ParseError;
