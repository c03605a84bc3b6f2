use super::*;
use std::fs;
use tempfile::TempDir;

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn config_file_persistence() {
        let temp_dir = TempDir::new().expect("should create TempDir successfully");
        let config_path = temp_dir.path().join("config.toml");

        let original_config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                endpoint_path: "/rpc".to_string(),
                name: "Persistence Test".to_string(),
                instructions: "Nothing to see here".to_string(),
                session_idle_timeout_secs: 120,
            },
        };

        let toml_content = toml::to_string_pretty(&original_config)
            .expect("config should convert to toml string successfully");
        fs::write(&config_path, toml_content).expect("should write to config_path successfully");

        let loaded_config = Config::load_from(&config_path).expect("should load config");
        assert_eq!(original_config, loaded_config);
    }

    #[test]
    fn invalid_toml_handling() {
        let temp_dir = TempDir::new().expect("should create TempDir successfully");
        let config_path = temp_dir.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
            [server
            port = "invalid_port"
        "#,
        )
        .expect("should write to config_path successfully");

        let error = Config::load_from(&config_path).expect_err("broken toml should fail");
        assert!(matches!(
            error.downcast_ref::<ConfigError>(),
            Some(ConfigError::TomlParse(_))
        ));
    }

    #[test]
    fn partial_config_with_defaults() {
        let partial_toml = r#"
            [server]
            host = "custom-host"
        "#;

        let config: Config = toml::from_str(partial_toml).expect("should parse toml correctly");
        assert_eq!(config.server.host, "custom-host");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.server.endpoint_path, "/mcp");
        assert_eq!(config.server.name, "Railway MCP Server");
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let config: Config = toml::from_str("").expect("should parse empty toml");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn invalid_values_fail_validation_on_load() {
        let temp_dir = TempDir::new().expect("should create TempDir successfully");
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[server]\nendpoint_path = \"/health\"\n")
            .expect("should write to config_path successfully");

        let error = Config::load_from(&config_path).expect_err("reserved path should fail");
        assert!(matches!(
            error.downcast_ref::<ConfigError>(),
            Some(ConfigError::InvalidEndpointPath(_))
        ));
    }

    #[test]
    fn complete_valid_config() {
        let valid_toml = r#"
            [server]
            host = "0.0.0.0"
            port = 8000
            endpoint_path = "/mcp"
            name = "Railway MCP Server"
            instructions = "A demo MCP server with HTTP streaming deployed on Railway"
        "#;

        let config: Config = toml::from_str(valid_toml).expect("should parse toml successfully");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn port_boundary_validation() {
        let mut config = ServerConfig::default();

        assert!(config.set_port(1).is_ok());
        assert!(config.set_port(65535).is_ok());
        assert!(config.set_port(0).is_err());
    }

    #[test]
    fn endpoint_url_with_different_hosts() {
        let configs = vec![
            ("localhost", 8000, "/mcp", "http://localhost:8000/mcp"),
            ("127.0.0.1", 8080, "/mcp", "http://127.0.0.1:8080/mcp"),
            ("example.com", 3000, "/api/mcp", "http://example.com:3000/api/mcp"),
            ("example.com", 80, "/mcp", "http://example.com/mcp"),
        ];

        for (host, port, endpoint_path, expected_url) in configs {
            let config = ServerConfig {
                host: host.to_string(),
                port,
                endpoint_path: endpoint_path.to_string(),
                ..ServerConfig::default()
            };

            let url = config.endpoint_url().expect("endpoint_url is ok");
            assert_eq!(url.as_str(), expected_url);
        }
    }

    #[test]
    fn error_display_messages() {
        let errors = vec![
            ConfigError::InvalidHost(String::new()),
            ConfigError::InvalidPort(0),
            ConfigError::InvalidEndpointPath("mcp".to_string()),
            ConfigError::InvalidName(String::new()),
            ConfigError::InvalidUrl("invalid-url".to_string()),
        ];

        for error in errors {
            let message = format!("{error}");
            assert!(!message.is_empty());
            assert!(message.len() > 10);
        }
    }
}
