//! Persistence boundary of the built schema.
//!
//! The schema never talks to storage directly. Node lookups, connection
//! pages and mutations are delegated to a [`Handler`] registered as schema
//! data.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::UserError;
use crate::types::ConnectionConfig;

use super::context::AuthContext;

/// Load one node by global id.
#[derive(Debug, Clone)]
pub struct NodeRequest {
    /// Expected type, `None` when any Node type may match.
    pub type_name: Option<String>,
    pub id: String,
    pub auth: AuthContext,
    /// Permission queries that apply to the request, to be enforced as row
    /// filters.
    pub filters: Vec<String>,
}

/// Relay pagination arguments of a connection field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageArguments {
    pub first: Option<i64>,
    pub last: Option<i64>,
    pub before: Option<String>,
    pub after: Option<String>,
}

/// Load one page of a connection.
#[derive(Debug, Clone)]
pub struct ConnectionRequest {
    pub connection: ConnectionConfig,
    /// Value of the source key field on the parent object.
    pub source_key: Value,
    pub page: PageArguments,
    pub auth: AuthContext,
    pub filters: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub cursor: String,
    pub node: Value,
}

/// A page of connection results.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionPage {
    pub edges: Vec<Edge>,
    pub page_info: PageInfo,
    pub total_count: Option<u64>,
}

/// Run a declared mutation.
#[derive(Debug, Clone)]
pub struct MutationRequest {
    pub name: String,
    pub input: Value,
    pub auth: AuthContext,
}

#[async_trait]
pub trait Handler: Send + Sync {
    async fn load_node(&self, request: NodeRequest) -> Result<Option<Value>, UserError>;

    async fn load_connection(&self, request: ConnectionRequest) -> Result<ConnectionPage, UserError>;

    /// Returns the mutation payload.
    async fn mutate(&self, request: MutationRequest) -> Result<Value, UserError>;
}
