// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Understory Validation: rules over property containers.
//!
//! This crate validates [`PropertyContainer`](understory_schema::PropertyContainer)s
//! built with `understory_schema`.
//!
//! ## Core Concepts
//!
//! ### Rules and Messages
//!
//! A [`ValidationRule`] checks one property and reports zero or more
//! [`Message`]s. Messages carry a [`Severity`], a template with `{name}`
//! placeholders, and the named arguments to fill them (`{propertyName}`,
//! `{value}`, `{minLength}`, ...). Validation never fails; a container is
//! simply reported with messages.
//!
//! Rules are written fluently from typed properties via [`PropertyRules`] and
//! combined with [`RuleExt`]:
//!
//! - [`and`](RuleExt::and) runs both rules on the same property, optionally
//!   stopping at the first message ([`and_break`](RuleExt::and_break)).
//! - [`or`](RuleExt::or) passes when either side passes and otherwise reports
//!   one combined `[..] or [..]` message.
//!
//! ### Synthesis
//!
//! [`ValidationSynthesizer`] derives rules from the constraint metadata on a
//! property ([`Nullability`](understory_schema::Nullability),
//! [`StringLength`](understory_schema::StringLength),
//! [`AllowedValues`](understory_schema::AllowedValues),
//! [`NumericInterval`](understory_schema::NumericInterval) and explicit
//! [`ValidationRules`]), so a schema declared with constraints validates
//! without writing rules by hand.
//!
//! ## Example
//!
//! ```rust
//! use understory_schema::{Property, PropertyContainer};
//! use understory_validation::{PropertyRules, RuleExt, Validator};
//!
//! let sex = Property::<String>::new("Sex");
//! let rule = sex
//!     .should_be(|s| s == "Male")
//!     .or(sex.should_be(|s| s == "Female"));
//!
//! let record = PropertyContainer::builder()
//!     .set(&sex, "Other".to_owned())
//!     .build();
//! let result = Validator::new().validate_rule(&record, &rule);
//!
//! assert_eq!(result.len(), 1);
//! assert_eq!(
//!     result.messages()[0].formatted(),
//!     "[Other is not valid for Sex] or [Other is not valid for Sex]"
//! );
//! ```
//!
//! ## Features
//!
//! - `serde`: `Serialize`/`Deserialize` for [`Severity`].

mod composite;
mod message;
mod rule;
mod rules;
mod synthesizer;
mod validator;

pub use composite::{And, Or};
pub use message::{Message, Severity, arg};
pub use rule::{Customized, RuleExt, SharedRule, ValidationContext, ValidationRule};
pub use rules::{
    AllowedValuesRule, LengthRule, NotDefault, NotNull, Predicate, PropertyRules, RangeRule,
};
pub use synthesizer::{Constraint, ValidationRules, ValidationSynthesizer};
pub use validator::{ValidationResult, Validator};
