use shelfwatch::config::{load_config, load_config_with_hash};
use shelfwatch::{ConfigError, EgressScheme};
use std::io::Write;
use tempfile::NamedTempFile;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn test_defaults_applied() {
    let file = write_config(
        r#"
[dataset]
path = "./prices.db"

[[site]]
name = "Komputronik"
price-selector = "span.price"
"#,
    );

    let config = load_config(file.path()).unwrap();

    assert_eq!(config.egress.preferred_address, "192.168.101.27:8080");
    assert_eq!(config.egress.preferred_scheme, EgressScheme::Http);
    assert_eq!(config.egress.max_candidates, 100);
    assert_eq!(config.egress.min_viable, 5);
    assert_eq!(config.egress.max_global_refreshes, 4);
    assert_eq!(config.egress.degraded_batch, 5);
    assert_eq!(config.dataset.save_attempts, 5);
    assert_eq!(config.supervisor.max_concurrent_sites, 20);

    let site = config.site("Komputronik").unwrap();
    assert!(site.enabled);
    assert!(site.use_egress_pool);
    assert!(!site.human_delay);
    assert_eq!(site.rate_limit_retries, 3);
}

#[test]
fn test_hash_follows_content() {
    let base = r#"
[dataset]
path = "./prices.db"
"#;
    let a = write_config(base);
    let b = write_config(&format!("{}\n[supervisor]\nmax-concurrent-sites = 4\n", base));

    let (_, hash_a) = load_config_with_hash(a.path()).unwrap();
    let (_, hash_a2) = load_config_with_hash(a.path()).unwrap();
    let (config_b, hash_b) = load_config_with_hash(b.path()).unwrap();

    assert_eq!(hash_a, hash_a2);
    assert_ne!(hash_a, hash_b);
    assert_eq!(hash_a.len(), 64);
    assert_eq!(config_b.supervisor.max_concurrent_sites, 4);
}

#[test]
fn test_enabled_sites_only() {
    let file = write_config(
        r#"
[dataset]
path = "./prices.db"

[[site]]
name = "Euro"
price-selector = ".price"

[[site]]
name = "Neonet"
enabled = false
price-selector = ".price"
"#,
    );

    let config = load_config(file.path()).unwrap();
    let enabled: Vec<&str> = config.enabled_sites().map(|s| s.name.as_str()).collect();
    assert_eq!(enabled, vec!["Euro"]);
}

#[test]
fn test_invalid_selector_rejected() {
    let file = write_config(
        r#"
[dataset]
path = "./prices.db"

[[site]]
name = "Euro"
price-selector = "span[["
"#,
    );

    assert!(matches!(
        load_config(file.path()),
        Err(ConfigError::InvalidSelector(_))
    ));
}

#[test]
fn test_missing_file() {
    let result = load_config(std::path::Path::new("/nonexistent/shelfwatch.toml"));
    assert!(matches!(result, Err(ConfigError::Io(_))));
}
