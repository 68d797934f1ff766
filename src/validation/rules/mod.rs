//! Built-in validation rules.

mod connections;
mod indexes;
mod migration;
mod modules;
mod naming;
mod permissions;
mod types;

pub use connections::{
    ConnectionHandlerSupported, ConnectionNames, ConnectionNodeImplementsNode,
    EdgeFieldTypesMatch,
};
pub use indexes::{ValidAutoCompleteFields, ValidIndexFields};
pub use migration::{FieldTypeUnchanged, TypeKindUnchanged};
pub use modules::{NoModuleRuntime, RequiredModules, UniqueModuleIds, REQUIRED_MODULES};
pub use naming::{FieldNames, ReservedFieldNames, TypeNames, RESERVED_FIELD_NAMES};
pub use permissions::PermissionQueries;
pub use types::{
    MaxFieldCount, SupportedFieldTypes, TimeStampedLastUpdatedAt, TypeExtensionTargets,
    UniqueTypeNames, MAX_FIELD_COUNT,
};

use super::{rule, RuleFactory};

/// Every built-in rule, in reporting order.
pub fn default_rules() -> Vec<RuleFactory> {
    vec![
        rule::<UniqueModuleIds> as RuleFactory,
        rule::<RequiredModules>,
        rule::<NoModuleRuntime>,
        rule::<TypeNames>,
        rule::<UniqueTypeNames>,
        rule::<TypeKindUnchanged>,
        rule::<MaxFieldCount>,
        rule::<FieldNames>,
        rule::<ReservedFieldNames>,
        rule::<FieldTypeUnchanged>,
        rule::<SupportedFieldTypes>,
        rule::<TimeStampedLastUpdatedAt>,
        rule::<ValidIndexFields>,
        rule::<ValidAutoCompleteFields>,
        rule::<TypeExtensionTargets>,
        rule::<EdgeFieldTypesMatch>,
        rule::<ConnectionHandlerSupported>,
        rule::<ConnectionNodeImplementsNode>,
        rule::<ConnectionNames>,
        rule::<PermissionQueries>,
    ]
}
