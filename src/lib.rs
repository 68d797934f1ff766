//! modgraph
//!
//! Compiles declarative module configurations into one executable GraphQL
//! schema.
//!
//! A project is a list of modules. Each module contributes types, fields on
//! other modules' types, connections between types, mutations and
//! permissions. Building a schema runs three passes:
//!
//! 1. **Enhancement**: remote modules are replaced by the types and root
//!    fields of the GraphQL API they proxy, then each module's
//!    `enhance` hook runs.
//! 2. **Validation**: every rule visits every module, type, field,
//!    connection and type extension. All problems are collected.
//! 3. **Build**: declarations are merged into an `async-graphql` dynamic
//!    schema whose resolvers call a [`Handler`].
//!
//! # Example
//!
//! ```
//! use modgraph::{build_schema, native_modules, ModuleConfig, ObjectTypeConfig, FieldConfig,
//!     ProjectConfig, QUERY_TYPE};
//!
//! let mut modules = native_modules();
//! modules.push(
//!     ModuleConfig::new("blog")
//!         .with_namespace("Blog")
//!         .with_type(
//!             ObjectTypeConfig::new("Blog_Post")
//!                 .implements("Node")
//!                 .field("id", FieldConfig::new("ID").required())
//!                 .field("title", FieldConfig::new("String").required()),
//!         )
//!         .with_type_extension(QUERY_TYPE, "blog_latestPost", FieldConfig::new("Blog_Post")),
//! );
//!
//! let builder = build_schema(modules, &[], &ProjectConfig::default()).unwrap();
//! let schema = builder.get_schema().unwrap();
//! assert!(schema.sdl().contains("type Blog_Post implements Node"));
//! ```
//!
//! # Error codes
//!
//! | Code | Raised by |
//! |------|-----------|
//! | `INTERNAL_SERVER_ERROR` | internal failures, message hidden in production |
//! | `INPUT_VALIDATION_FAILED` | invalid arguments |
//! | `ACCESS_DENIED` | authenticated caller without a matching permission |
//! | `LOGIN_REQUIRED` | anonymous caller without a matching permission |
//! | `REMOTE_API_ERROR` | failed calls to a remote module |

mod config;
mod enhance;
mod error;
mod format;
mod hooks;
mod loader;
mod native;
mod remote;
mod schema;
mod shape;
mod types;
mod utils;
pub mod validation;

pub use config::{Environment, ProjectConfig, RemoteConfig, ENVIRONMENT_VAR};
pub use enhance::{enhance_module, enhance_modules};
pub use error::{
    ArgumentError, ArgumentErrors, BuildError, EnhanceError, ErrorCode, InternalError, LoadError,
    PackageError, RemoteModuleError, UserError,
};
pub use format::{format_error, format_errors, FormattedError, Location, INTERNAL_ERROR_MESSAGE};
pub use hooks::{BoxError, EnhanceModule, FieldResolver, ModuleEnhancer, Resolve, TypeResolver};
pub use loader::{
    is_url, load_json, load_modules, load_modules_auto, load_modules_str, load_project_config,
    load_raw_schema, parse_modules,
};
pub use native::{auth_module, core_module, native_modules, relay_module, NATIVE_VERSION};
pub use remote::{
    build_remote_module, convert_schema, error_envelope, localize_typenames, print_operation,
    FieldSelection, InlineFragment, RemoteFetcher, RemoteRequest, RemoteSchema, RewriteContext,
    RootField, Selection,
};
pub use schema::{
    auth_context, build_schema, check_permissions, connection_type_name, edge_type_name, handler,
    input_type_name, payload_type_name, AuthContext, ConnectionPage, ConnectionRegistry,
    ConnectionRequest, Edge, Handler, MutationRequest, NodeRequest, PageArguments, PageInfo,
    ProjectSettings, RequestInfo, SchemaBuilder,
};
pub use shape::TypeShape;
pub use types::*;
pub use utils::{
    camel_to_snake_case_object, deep_replace_variables, replace_variables,
    snake_to_camel_case_object,
};
pub use validation::{default_rules, validate_modules, ValidationReport};

#[cfg(feature = "remote")]
pub use loader::load_modules_url;
