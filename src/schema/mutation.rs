//! Root mutation fields generated from [`MutationConfig`]s.

use async_graphql::dynamic::{Field, FieldFuture, InputObject, InputValue, Object, TypeRef};
use async_graphql::Value as ConstValue;
use convert_case::{Case, Casing};
use indexmap::IndexMap;
use serde_json::Value;

use crate::error::UserError;
use crate::hooks::FieldResolver;
use crate::shape::TypeShape;
use crate::types::{MutationConfig, TypeConfig};

use super::handler::MutationRequest;
use super::value::{to_field_value, OutputKind};
use super::{auth_context, guarded, handler, input_value, output_field};

/// Field plus the input/payload types a relay-style mutation needs.
pub(crate) struct MutationParts {
    pub field: Field,
    pub input: Option<InputObject>,
    pub payload: Option<Object>,
}

pub fn input_type_name(mutation: &MutationConfig) -> String {
    format!("{}Input", mutation.name.to_case(Case::Pascal))
}

pub fn payload_type_name(mutation: &MutationConfig) -> String {
    format!("{}Payload", mutation.name.to_case(Case::Pascal))
}

fn json_or_null(value: ConstValue) -> Value {
    value.into_json().unwrap_or(Value::Null)
}

/// Default resolver: hand the input to the handler and convert its payload.
fn handler_resolver(name: String, relay: bool, shape: TypeShape, kind: OutputKind) -> FieldResolver {
    FieldResolver::from_fn(move |ctx| {
        let name = name.clone();
        let dims = shape.list.clone();
        let kind = kind.clone();
        FieldFuture::new(async move {
            let handler = handler(&ctx)?;
            let input = if relay {
                ctx.args
                    .get("input")
                    .map(|input| json_or_null(input.as_value().clone()))
                    .unwrap_or(Value::Null)
            } else {
                json_or_null(ConstValue::Object(ctx.args.as_index_map().clone()))
            };
            let payload = handler
                .mutate(MutationRequest {
                    name,
                    input,
                    auth: auth_context(&ctx),
                })
                .await
                .map_err(UserError::into_graphql_error)?;
            Ok(to_field_value(payload, &dims, &kind))
        })
    })
}

pub(crate) fn mutation_parts(
    mutation: &MutationConfig,
    types: &IndexMap<String, TypeConfig>,
) -> MutationParts {
    let permissions = mutation.permissions.clone().unwrap_or_default();

    if let Some(output) = &mutation.output {
        let shape = TypeShape::from(output);
        let kind = OutputKind::of(&shape.type_name, types);
        let resolver = mutation
            .resolve
            .clone()
            .unwrap_or_else(|| handler_resolver(mutation.name.clone(), false, shape, kind));

        let mut output = output.clone();
        output.resolve = Some(guarded(resolver, permissions, None));
        if output.description.is_none() {
            output.description = mutation.description.clone();
        }
        let mut field = output_field(&mutation.name, &output, types, &[]);
        for (name, input) in &mutation.input_fields {
            field = field.argument(input_value(
                name,
                &TypeShape::from(input),
                input.default_value.as_ref(),
                input.description.as_deref(),
            ));
        }
        return MutationParts {
            field,
            input: None,
            payload: None,
        };
    }

    let input_name = input_type_name(mutation);
    let payload_name = payload_type_name(mutation);

    let mut input = InputObject::new(input_name.as_str());
    for (name, field) in &mutation.input_fields {
        input = input.field(input_value(
            name,
            &TypeShape::from(field),
            field.default_value.as_ref(),
            field.description.as_deref(),
        ));
    }

    let mut payload = Object::new(payload_name.as_str());
    for (name, field) in &mutation.fields {
        payload = payload.field(output_field(name, field, types, &[]));
    }

    let shape = TypeShape::named(payload_name.as_str());
    let resolver = mutation
        .resolve
        .clone()
        .unwrap_or_else(|| handler_resolver(mutation.name.clone(), true, shape, OutputKind::Object));
    let resolver = guarded(resolver, permissions, None);

    let mut field = Field::new(
        mutation.name.as_str(),
        TypeRef::named(payload_name.as_str()),
        move |ctx| resolver.resolve(ctx),
    )
    .argument(InputValue::new("input", TypeRef::named_nn(input_name.as_str())));
    if let Some(description) = &mutation.description {
        field = field.description(description.as_str());
    }

    MutationParts {
        field,
        input: Some(input),
        payload: Some(payload),
    }
}
