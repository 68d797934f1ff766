//! Integration tests for the module validation rule set.

use modgraph::validation::rules::{
    EdgeFieldTypesMatch, FieldTypeUnchanged, ReservedFieldNames, TypeNames, RESERVED_FIELD_NAMES,
};
use modgraph::validation::{rule, RuleFactory};
use modgraph::{
    default_rules, native_modules, validate_modules, ConnectionConfig, FieldConfig, HandlerConfig,
    HandlerKind, ModuleConfig, ObjectTypeConfig, PackageError, Permission, ProjectConfig, Role,
    ValidationReport, QUERY_TYPE,
};

fn validate(modules: &[ModuleConfig], current: &[ModuleConfig]) -> Vec<PackageError> {
    validate_modules(modules, current, &default_rules(), &ProjectConfig::default())
}

fn with_natives(module: ModuleConfig) -> Vec<ModuleConfig> {
    let mut modules = native_modules();
    modules.push(module);
    modules
}

fn postgres() -> HandlerConfig {
    HandlerConfig {
        kind: HandlerKind::Postgres,
    }
}

fn post() -> ObjectTypeConfig {
    let mut post = ObjectTypeConfig::new("Blog_Post")
        .implements("Node")
        .field("id", FieldConfig::new("ID").required())
        .field("title", FieldConfig::new("String").required());
    post.handler = Some(postgres());
    post
}

fn blog() -> ModuleConfig {
    ModuleConfig::new("blog")
        .with_namespace("Blog")
        .with_version("1.0.0")
        .with_type(post())
}

mod complete_rule_set {
    use super::*;

    #[test]
    fn valid_project() {
        let module = blog().with_type_extension(
            QUERY_TYPE,
            "blog_latestPost",
            FieldConfig::new("Blog_Post"),
        );
        assert_eq!(validate(&with_natives(module), &[]), Vec::new());
    }

    #[test]
    fn field_type_change_against_current() {
        let current = with_natives(blog());
        let changed = ModuleConfig::new("blog")
            .with_namespace("Blog")
            .with_version("1.1.0")
            .with_type(post().field("title", FieldConfig::new("Int").required()));
        let errors = validate(&with_natives(changed), &current);
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert_eq!(errors[0].path, ["types", "Blog_Post", "title"]);
    }

    #[test]
    fn independent_problems_are_all_reported() {
        let errors = validate_modules(
            &[ModuleConfig::new("blog").with_namespace("Blog").with_type(
                ObjectTypeConfig::new("Blog_post_x").field("title", FieldConfig::new("Int")),
            )],
            &[ModuleConfig::new("blog").with_namespace("Blog").with_type(
                ObjectTypeConfig::new("Blog_post_x").field("title", FieldConfig::new("String")),
            )],
            &[rule::<TypeNames> as RuleFactory, rule::<FieldTypeUnchanged>],
            &ProjectConfig::default(),
        );
        assert_eq!(errors.len(), 2, "{:?}", errors);
        assert!(errors[0].message.starts_with("Invalid type name"));
        assert!(errors[1].message.starts_with("Cannot change type"));
    }

    #[test]
    fn missing_native_modules() {
        let errors = validate(&[blog()], &[]);
        let missing: Vec<_> = errors
            .iter()
            .filter(|e| e.message.starts_with("Required module"))
            .map(|e| e.path.join("."))
            .collect();
        assert_eq!(missing, ["modules.core", "modules.auth", "modules.relay"]);
    }

    #[test]
    fn errors_carry_module_and_path() {
        let module = blog().with_type(
            ObjectTypeConfig::new("Blog_Comment").field("Body", FieldConfig::new("String")),
        );
        let errors = validate(&with_natives(module), &[]);
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert_eq!(errors[0].module.as_deref(), Some("blog"));
        assert_eq!(errors[0].path, ["types", "Blog_Comment", "Body"]);
        assert_eq!(errors[0].location(), "blog: types.Blog_Comment.Body");
    }

    #[test]
    fn report_groups_by_module() {
        let modules = with_natives(
            blog().with_type(ObjectTypeConfig::new("Comment")),
        );
        let report = ValidationReport::new(&modules, validate(&modules, &[]));
        assert!(!report.is_ok());
        assert_eq!(report.modules_checked, 4);
        assert_eq!(report.failed, 1);
        assert_eq!(report.results[3].module, "blog");
        assert_eq!(report.results[3].errors.len(), 1);
    }
}

mod reserved_names {
    use super::*;

    #[test]
    fn every_reserved_name_is_rejected_on_node_types() {
        for name in RESERVED_FIELD_NAMES {
            let module = ModuleConfig::new("blog")
                .with_type(post().field(*name, FieldConfig::new("String")));
            let errors = validate_modules(
                &[module],
                &[],
                &[rule::<ReservedFieldNames> as RuleFactory],
                &ProjectConfig::default(),
            );
            assert_eq!(errors.len(), 1, "{}", name);
            assert!(errors[0].message.contains(name));
        }
    }

    #[test]
    fn allowed_on_other_types() {
        for name in RESERVED_FIELD_NAMES {
            let module = ModuleConfig::new("blog").with_type(
                ObjectTypeConfig::new("Blog_Settings").field(*name, FieldConfig::new("String")),
            );
            let errors = validate_modules(
                &[module],
                &[],
                &[rule::<ReservedFieldNames> as RuleFactory],
                &ProjectConfig::default(),
            );
            assert!(errors.is_empty(), "{}", name);
        }
    }
}

mod connections {
    use super::*;

    fn tagging(source_field_type: &str) -> ModuleConfig {
        let mut tag = ObjectTypeConfig::new("Blog_Tag")
            .implements("Node")
            .field("id", FieldConfig::new("ID").required())
            .field("post", FieldConfig::new(source_field_type));
        tag.handler = Some(postgres());
        blog()
            .with_type(tag)
            .with_connection(ConnectionConfig::inline(
                "tags",
                "Blog_Post",
                "Blog_Tag",
                "post",
            ))
    }

    fn check(module: ModuleConfig) -> Vec<PackageError> {
        validate_modules(
            &with_natives(module),
            &[],
            &[rule::<EdgeFieldTypesMatch> as RuleFactory],
            &ProjectConfig::default(),
        )
    }

    #[test]
    fn matching_field_types() {
        assert!(check(tagging("Blog_Post")).is_empty());
    }

    #[test]
    fn mismatched_field_type() {
        let errors = check(tagging("Int"));
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.starts_with("Connection \"tags\""));
        assert_eq!(errors[0].path, ["connections", "tags"]);
    }

    #[test]
    fn full_rule_set_accepts_connection() {
        assert_eq!(validate(&with_natives(tagging("Blog_Post")), &[]), Vec::new());
    }
}

mod permissions {
    use super::*;

    #[test]
    fn permission_queries_are_checked() {
        let mut post = post();
        post.permissions = vec![
            Permission::new(Role::Anonymous).query("query { node(filter: {title: {eq: \"x\"}}) }"),
            Permission::new(Role::Authenticated).query("query { node(filter: {missing: {eq: 1}}) }"),
        ];
        let module = ModuleConfig::new("blog").with_namespace("Blog").with_type(post);
        let errors = validate(&with_natives(module), &[]);
        assert_eq!(errors.len(), 1, "{:?}", errors);
        assert_eq!(errors[0].path, ["types", "Blog_Post", "permissions", "1"]);
        assert!(errors[0].message.starts_with("Invalid permission query for type \"Blog_Post\""));
    }
}
