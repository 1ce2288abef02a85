mod common;

use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::{json, Value};
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::tempdir;

use common::{capture_sink, MemoryClient, TestDefinition};
use model_loader::schema::{FieldDefinition, RelationKind, Schema};
use model_loader::{initialize, Config, DefinitionCatalog, Error, Loader, RawConfig};

#[allow(dead_code)]
#[derive(model_loader::ModelSchema)]
#[model(table_name = "accounts")]
struct Account {
    #[field(primary_key)]
    id: i64,
    email: String,
}

#[allow(dead_code)]
#[derive(model_loader::ModelSchema)]
struct Session {
    token: String,
}

fn user_schema() -> Schema {
    Schema::new().field(FieldDefinition::new("name", "String"))
}

fn keys(loader: &Loader<MemoryClient>) -> Vec<String> {
    loader.models().keys().cloned().collect()
}

#[tokio::test]
async fn registers_a_table_without_logging_by_default() {
    let (sink, lines) = capture_sink();
    let catalog = DefinitionCatalog::<MemoryClient>::new().with("user", |_, _| {
        Ok(TestDefinition {
            schema: user_schema(),
            ..TestDefinition::table("users")
        })
    });

    let raw = RawConfig {
        log: Some(sink),
        ..Default::default()
    };
    let loader = initialize(raw, Some(MemoryClient::ready()), &catalog).await.unwrap();

    let users = loader.model("users").expect("users model registered");
    assert_eq!(users.0.schema, user_schema());
    assert!(lines.lock().unwrap().is_empty());
}

#[rstest]
#[case::by_model_id("users")]
#[case::by_definition_key("user")]
#[tokio::test]
async fn ignored_models_are_not_registered(#[case] ignored: &str) {
    let catalog = DefinitionCatalog::<MemoryClient>::new()
        .with("user", |_, _| Ok(TestDefinition::table("users")))
        .with("post", |_, _| Ok(TestDefinition::table("posts")));

    let raw = RawConfig {
        ignore_models: Some(vec![ignored.to_string()]),
        ..Default::default()
    };
    let loader = initialize(raw, Some(MemoryClient::ready()), &catalog).await.unwrap();

    assert!(loader.model("users").is_none());
    assert_eq!(keys(&loader), vec!["posts".to_string()]);
}

#[rstest]
#[case(vec![], vec!["users", "posts", "tags"])]
#[case(vec!["posts"], vec!["users", "tags"])]
#[case(vec!["users", "tags", "unknown"], vec!["posts"])]
#[tokio::test]
async fn registry_keys_are_resolved_ids_minus_ignored(#[case] ignored: Vec<&str>, #[case] expected: Vec<&str>) {
    let catalog = DefinitionCatalog::<MemoryClient>::new()
        .with("user", |_, _| Ok(TestDefinition::table("users")))
        .with("post", |_, _| Ok(TestDefinition::global("posts")))
        .with("tag", |_, _| Ok(TestDefinition::table("tags")));

    let raw = RawConfig {
        ignore_models: Some(ignored.into_iter().map(String::from).collect()),
        ..Default::default()
    };
    let loader = initialize(raw, Some(MemoryClient::ready()), &catalog).await.unwrap();

    assert_eq!(keys(&loader), expected.into_iter().map(String::from).collect::<Vec<_>>());
}

#[tokio::test]
async fn hooks_see_models_registered_after_their_own() {
    // post comes first, so users only exists because pass one finished
    let catalog = DefinitionCatalog::<MemoryClient>::new()
        .with("post", |_, _| {
            Ok(TestDefinition::table("posts").on_initialize(|loader, _, _| {
                loader.require_model("users")?.touch();
                Ok(())
            }))
        })
        .with("user", |_, _| Ok(TestDefinition::global("users")));

    let loader = initialize(RawConfig::default(), Some(MemoryClient::ready()), &catalog)
        .await
        .unwrap();

    assert_eq!(loader.model("users").unwrap().touches(), 1);
}

#[tokio::test]
async fn readiness_failure_propagates_and_leaves_registry_empty() {
    let catalog = DefinitionCatalog::<MemoryClient>::new().with("user", |_, _| Ok(TestDefinition::table("users")));
    let mut loader = Loader::new(MemoryClient::failing("connection refused"));

    let err = loader.load(&Config::default(), &catalog).await.unwrap_err();

    match err {
        Error::DatabaseError(message) => assert_eq!(message, "connection refused"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(loader.models().is_empty());
    assert!(loader.client().created().is_empty());
}

#[tokio::test]
async fn reloading_replaces_instead_of_merging() {
    let first = DefinitionCatalog::<MemoryClient>::new()
        .with("user", |_, _| Ok(TestDefinition::table("users")))
        .with("post", |_, _| Ok(TestDefinition::table("posts")));
    let second = DefinitionCatalog::<MemoryClient>::new().with("tag", |_, _| Ok(TestDefinition::table("tags")));

    let config = Config::default();
    let mut loader = Loader::new(MemoryClient::ready());

    loader.load(&config, &first).await.unwrap();
    assert_eq!(keys(&loader), vec!["users".to_string(), "posts".to_string()]);

    loader.load(&config, &second).await.unwrap();
    assert_eq!(keys(&loader), vec!["tags".to_string()]);
}

#[tokio::test]
async fn debug_logs_every_creation_before_any_initialization() {
    let (sink, lines) = capture_sink();
    let catalog = DefinitionCatalog::<MemoryClient>::new()
        .with("user", |_, _| Ok(TestDefinition::table("users")))
        .with("post", |_, _| Ok(TestDefinition::global("posts")));

    let raw = RawConfig {
        debug: Some(true),
        log: Some(sink),
        ..Default::default()
    };
    initialize(raw, Some(MemoryClient::ready()), &catalog).await.unwrap();

    assert_eq!(
        *lines.lock().unwrap(),
        vec![
            "DB Ready",
            "Creating model id: users",
            "Creating model id: posts",
            "Initializing model id: users",
            "Initializing model id: posts",
        ]
    );
}

#[tokio::test]
async fn missing_identifier_fails_before_any_model_is_created() {
    let catalog = DefinitionCatalog::<MemoryClient>::new()
        .with("user", |_, _| Ok(TestDefinition::table("users")))
        .with("anonymous", |_, _| Ok(TestDefinition::default()));
    let mut loader = Loader::new(MemoryClient::ready());

    let err = loader.load(&Config::default(), &catalog).await.unwrap_err();

    assert!(matches!(err, Error::MissingIdentifier(ref key) if key == "anonymous"));
    assert!(loader.models().is_empty());
}

#[tokio::test]
async fn empty_table_name_falls_back_to_global_id() {
    let catalog = DefinitionCatalog::<MemoryClient>::new()
        .with("user", |_, _| {
            Ok(TestDefinition {
                table_name: Some(String::new()),
                ..TestDefinition::global("User")
            })
        })
        .with("post", |_, _| {
            Ok(TestDefinition {
                global_id: Some("Post".to_string()),
                ..TestDefinition::table("posts")
            })
        });

    let loader = initialize(RawConfig::default(), Some(MemoryClient::ready()), &catalog)
        .await
        .unwrap();

    assert_eq!(keys(&loader), vec!["User".to_string(), "posts".to_string()]);
}

#[tokio::test]
async fn registration_failure_keeps_earlier_models() {
    let initialized = Arc::new(Mutex::new(0));
    let counter = initialized.clone();
    let catalog = DefinitionCatalog::<MemoryClient>::new()
        .with("user", move |_, _| {
            let counter = counter.clone();
            Ok(TestDefinition::table("users").on_initialize(move |_, _, _| {
                *counter.lock().unwrap() += 1;
                Ok(())
            }))
        })
        .with("post", |_, _| Ok(TestDefinition::table("posts")))
        .with("tag", |_, _| Ok(TestDefinition::table("tags")));
    let mut loader = Loader::new(MemoryClient::rejecting("posts"));

    let err = loader.load(&Config::default(), &catalog).await.unwrap_err();

    assert!(matches!(err, Error::ModelRegistrationError(_)));
    assert_eq!(keys(&loader), vec!["users".to_string()]);
    assert_eq!(*initialized.lock().unwrap(), 0);
}

#[tokio::test]
async fn hook_failure_keeps_every_model() {
    let catalog = DefinitionCatalog::<MemoryClient>::new()
        .with("user", |_, _| {
            Ok(TestDefinition::table("users")
                .on_initialize(|_, _, _| Err(Error::InitializationError("boom".to_string()))))
        })
        .with("post", |_, _| {
            Ok(TestDefinition::table("posts").on_initialize(|_, model, _| {
                model.touch();
                Ok(())
            }))
        });
    let mut loader = Loader::new(MemoryClient::ready());

    let err = loader.load(&Config::default(), &catalog).await.unwrap_err();

    assert!(matches!(err, Error::InitializationError(_)));
    assert_eq!(keys(&loader), vec!["users".to_string(), "posts".to_string()]);
    assert_eq!(loader.model("posts").unwrap().touches(), 0);
}

#[tokio::test]
async fn constructor_and_initialize_arguments_are_forwarded() {
    let constructed = Arc::new(Mutex::new(Vec::<Value>::new()));
    let seen = Arc::new(Mutex::new(Vec::<Value>::new()));
    let ctor_sink = constructed.clone();
    let sink = seen.clone();
    let catalog = DefinitionCatalog::<MemoryClient>::new().with("user", move |loader, args| {
        assert!(loader.models().is_empty());
        ctor_sink.lock().unwrap().extend(args.iter().cloned());
        let sink = sink.clone();
        Ok(TestDefinition::table("users").on_initialize(move |_, model, args| {
            assert_eq!(model.id(), "users");
            sink.lock().unwrap().extend(args.iter().cloned());
            Ok(())
        }))
    });

    let raw = RawConfig {
        model_constructor_args: Some(vec![json!("ctor")]),
        model_initialize_args: Some(vec![json!(1), json!({"mode": "init"})]),
        ..Default::default()
    };
    let loader = initialize(raw, Some(MemoryClient::ready()), &catalog).await.unwrap();

    assert!(loader.model("users").is_some());
    assert_eq!(*constructed.lock().unwrap(), vec![json!("ctor")]);
    assert_eq!(*seen.lock().unwrap(), vec![json!(1), json!({"mode": "init"})]);
}

#[tokio::test]
async fn factories_receive_constructor_arguments() {
    let seen = Arc::new(Mutex::new(Vec::<Value>::new()));
    let sink = seen.clone();
    let catalog = DefinitionCatalog::<MemoryClient>::new().with("user", move |_, args| {
        sink.lock().unwrap().extend(args.iter().cloned());
        Ok(TestDefinition::table("users"))
    });

    let raw = RawConfig {
        model_constructor_args: Some(vec![json!("a"), json!(2)]),
        ..Default::default()
    };
    initialize(raw, Some(MemoryClient::ready()), &catalog).await.unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![json!("a"), json!(2)]);
}

#[tokio::test]
async fn duplicate_ids_keep_the_later_model() {
    let catalog = DefinitionCatalog::<MemoryClient>::new()
        .with("user", |_, _| {
            Ok(TestDefinition {
                schema: user_schema(),
                ..TestDefinition::table("users")
            })
        })
        .with("legacy_user", |_, _| Ok(TestDefinition::global("users")));

    let loader = initialize(RawConfig::default(), Some(MemoryClient::ready()), &catalog)
        .await
        .unwrap();

    assert_eq!(loader.models().len(), 1);
    assert!(loader.model("users").unwrap().0.schema.is_empty());
    assert_eq!(loader.client().created(), vec!["users".to_string(), "users".to_string()]);
}

#[tokio::test]
async fn missing_client_is_built_from_config() {
    let catalog = DefinitionCatalog::<MemoryClient>::new().with("user", |_, _| Ok(TestDefinition::table("users")));

    let loader = initialize(RawConfig::default(), None::<MemoryClient>, &catalog)
        .await
        .unwrap();

    assert!(loader.model("users").is_some());
}

#[tokio::test]
async fn declared_files_are_loaded_and_wired() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("user.toml"),
        r#"
        table_name = "users"

        [[schema]]
        name = "id"
        type = "integer"
        primary_key = true
        "#,
    )
    .unwrap();
    fs::write(
        dir.path().join("post.yaml"),
        r#"
globalId: posts
schema:
  - name: author_id
    type: integer
relations:
  - kind: belongs_to
    model: users
    field_name: author
    left_key: author_id
    right_key: id
"#,
    )
    .unwrap();
    fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

    let (sink, lines) = capture_sink();
    let raw = RawConfig {
        debug: Some(true),
        log: Some(sink),
        models_path: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    let loader = initialize(raw, Some(MemoryClient::ready()), &DefinitionCatalog::<MemoryClient>::new())
        .await
        .unwrap();

    assert_eq!(keys(&loader), vec!["posts".to_string(), "users".to_string()]);

    let relations = loader.model("posts").unwrap().relations();
    assert_eq!(relations.len(), 1);
    assert_eq!(relations[0].0.kind, RelationKind::BelongsTo);
    assert_eq!(relations[0].1, "users");

    let logged = lines.lock().unwrap();
    assert_eq!(logged[1], format!("Loading models from path: {}", dir.path().display()));
}

#[tokio::test]
async fn declared_relation_to_unknown_model_fails_in_pass_two() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("post.json"),
        r#"{
            "table_name": "posts",
            "relations": [
                {"kind": "belongs_to", "model": "users", "field_name": "author", "left_key": "author_id", "right_key": "id"}
            ]
        }"#,
    )
    .unwrap();

    let config = Config::from(RawConfig {
        models_path: Some(dir.path().to_path_buf()),
        ..Default::default()
    });
    let mut loader = Loader::new(MemoryClient::ready());

    let err = loader.load(&config, &DefinitionCatalog::<MemoryClient>::new()).await.unwrap_err();

    assert!(matches!(err, Error::InitializationError(_)));
    assert!(loader.model("posts").is_some());
}

#[tokio::test]
async fn unreadable_models_path_fails_the_load() {
    let config = Config::from(RawConfig {
        models_path: Some("/no/such/models".into()),
        ..Default::default()
    });
    let mut loader = Loader::new(MemoryClient::ready());

    let err = loader.load(&config, &DefinitionCatalog::<MemoryClient>::new()).await.unwrap_err();
    assert!(matches!(err, Error::DiscoveryError(_)));
}

#[tokio::test]
async fn derived_models_load_through_the_catalog() {
    let catalog = DefinitionCatalog::<MemoryClient>::new()
        .with_model::<Account>("account")
        .with_model::<Session>("session");

    let loader = initialize(RawConfig::default(), Some(MemoryClient::ready()), &catalog)
        .await
        .unwrap();

    assert_eq!(keys(&loader), vec!["accounts".to_string(), "Session".to_string()]);
    let accounts = loader.model("accounts").unwrap();
    assert!(accounts.0.schema.get("id").unwrap().primary_key);
    assert_eq!(accounts.0.schema.get("email").unwrap().field_type, "String");
    assert_eq!(loader.model("Session").unwrap().0.schema.fields.len(), 1);
}
