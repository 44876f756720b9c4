use cms_api::domain::ports::ResourceAdapter;
use cms_api::utils::error::ErrorSeverity;
use cms_api::{
    ApiConfig, ApiError, ApiManagerFactory, InMemoryStore, ServiceContainer, ServiceFactory,
};
use std::io::Write;
use std::sync::Arc;
use tempfile::NamedTempFile;

fn container(config: ApiConfig) -> Arc<ServiceContainer> {
    Arc::new(ServiceContainer::in_memory(InMemoryStore::new()).with_config(config))
}

#[test]
fn test_factory_from_config_file() -> anyhow::Result<()> {
    let mut file = NamedTempFile::new()?;
    writeln!(
        file,
        r#"
[api]
base_url = "https://cms.example.org/api"

[api_resources]
items = "item"
item_sets = "item_set"
media = "media"
"#
    )?;

    let config = ApiConfig::from_file(file.path())?;
    let manager = ApiManagerFactory.create_service(container(config))?;

    let mut names: Vec<_> = manager.registry().names().collect();
    names.sort();
    assert_eq!(names, ["item_sets", "items", "media"]);
    assert_eq!(manager.adapter("items")?.representation_class(), "o:Item");
    Ok(())
}

#[test]
fn test_factory_requires_config_service() {
    let container = Arc::new(ServiceContainer::in_memory(InMemoryStore::new()));
    let err = ApiManagerFactory.create_service(container).unwrap_err();

    assert!(matches!(err, ApiError::ServiceNotFound { ref name } if name == "Config"));
    assert_eq!(err.severity(), ErrorSeverity::Critical);
}

#[test]
fn test_factory_requires_api_resources() {
    let config = ApiConfig::from_toml_str("[api]\nper_page = 5\n").unwrap();
    let err = ApiManagerFactory.create_service(container(config)).unwrap_err();

    assert!(matches!(err, ApiError::ConfigError { .. }));
    assert!(err
        .to_string()
        .contains("The configuration has no registered API resources."));
}

#[test]
fn test_factory_rejects_unknown_or_misnamed_classes() {
    let config = ApiConfig::from_toml_str("[api_resources]\nsites = \"site\"\n").unwrap();
    let err = ApiManagerFactory.create_service(container(config)).unwrap_err();
    assert!(matches!(err, ApiError::ConfigError { .. }));

    let config = ApiConfig::from_toml_str("[api_resources]\nitems = \"media\"\n").unwrap();
    let err = ApiManagerFactory.create_service(container(config)).unwrap_err();
    assert!(err.to_string().contains("'items'"));
}

#[test]
fn test_factory_is_repeatable() -> anyhow::Result<()> {
    let config = ApiConfig::from_toml_str("[api_resources]\nitems = \"item\"\n")?;
    let container = container(config);

    let first = ApiManagerFactory.create_service(container.clone())?;
    let second = ApiManagerFactory.create_service(container)?;

    assert_eq!(
        first.registry().names().collect::<Vec<_>>(),
        second.registry().names().collect::<Vec<_>>()
    );
    assert!(!second.is_registered("media"));
    Ok(())
}
