//! shieldpost.toml 통합 설정 테스트
//!
//! - shieldpost.toml.example 파싱 테스트
//! - 부분 설정 (일부 섹션만) 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 빈 파일 / 잘못된 형식 에러 테스트

use shieldpost_core::config::{DEFAULT_DSHIELD_RECIPIENT, ShieldpostConfig};
use shieldpost_core::error::{ConfigError, ShieldpostError};
use shieldpost_core::types::UtcOffset;

const EXAMPLE: &str = include_str!("../../../shieldpost.toml.example");

/// 환경변수를 설정한 채로 클로저를 실행하고 원래 값을 복원합니다.
fn with_env<T>(key: &str, value: &str, f: impl FnOnce() -> T) -> T {
    let original = std::env::var(key).ok();
    // SAFETY: serial 테스트에서만 환경변수를 조작합니다.
    unsafe {
        std::env::set_var(key, value);
    }

    let result = f();

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var(key, val),
            None => std::env::remove_var(key),
        }
    }
    result
}

// =============================================================================
// shieldpost.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let config = ShieldpostConfig::parse(EXAMPLE).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "pretty");
    assert_eq!(config.report.user_id, "123456");
    assert_eq!(config.report.ports, "!25,!80,445");
    assert!(config.report.drop_private_sources);
}

#[test]
fn example_config_passes_validation() {
    let config = ShieldpostConfig::parse(EXAMPLE).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_matches_code_defaults() {
    let from_file = ShieldpostConfig::parse(EXAMPLE).expect("should parse");
    let from_code = ShieldpostConfig::default();

    // 계정 정보와 필터를 제외한 값은 코드 Default 구현과 같아야 한다
    assert_eq!(from_file.general.log_level, from_code.general.log_level);
    assert_eq!(from_file.general.log_format, from_code.general.log_format);

    assert_eq!(from_file.input.log_path, from_code.input.log_path);
    assert_eq!(from_file.input.state_path, from_code.input.state_path);
    assert_eq!(
        from_file.input.max_line_length,
        from_code.input.max_line_length
    );

    assert_eq!(from_file.report.to, from_code.report.to);
    assert_eq!(from_file.report.obfuscate, from_code.report.obfuscate);
    assert_eq!(from_file.report.timezone, from_code.report.timezone);
    assert_eq!(from_file.report.dry_run, from_code.report.dry_run);

    assert_eq!(from_file.relay.host, from_code.relay.host);
    assert_eq!(from_file.relay.port, from_code.relay.port);
    assert_eq!(from_file.relay.timeout_secs, from_code.relay.timeout_secs);
}

// =============================================================================
// 부분 설정 테스트
// =============================================================================

#[test]
fn partial_config_report_only() {
    let toml = r#"
[report]
user_id = "42"
from = "fw@example.org"
"#;
    let config = ShieldpostConfig::parse(toml).expect("should parse");

    assert_eq!(config.report.user_id, "42");
    assert_eq!(config.report.to, DEFAULT_DSHIELD_RECIPIENT);
    assert_eq!(config.relay.port, 25);
    assert_eq!(config.general.log_level, "info");
    config.validate().expect("report section alone is enough");
}

#[test]
fn partial_config_relay_only_fails_validation_without_identity() {
    let toml = r#"
[relay]
host = "mail.example.net"
port = 587
"#;
    let config = ShieldpostConfig::parse(toml).expect("should parse");
    assert_eq!(config.relay.host, "mail.example.net");
    assert_eq!(config.relay.port, 587);

    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("report.user_id"));
}

#[test]
fn partial_config_two_sections() {
    let toml = r#"
[input]
log_path = "/tmp/firewall.log"

[report]
user_id = "42"
from = "fw@example.org"
timezone = "-05:00"
"#;
    let config = ShieldpostConfig::parse(toml).expect("should parse");

    assert_eq!(config.input.log_path, "/tmp/firewall.log");
    assert_eq!(
        config.input.state_path,
        ShieldpostConfig::default().input.state_path
    );
    assert_eq!(
        config.utc_offset().expect("valid offset"),
        UtcOffset::from_minutes(-300).expect("in range")
    );
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let mut config = ShieldpostConfig::parse(EXAMPLE).expect("should parse");
    with_env("SHIELDPOST_REPORT_USER_ID", "999", || {
        config.apply_env_overrides();
    });
    assert_eq!(config.report.user_id, "999");
}

#[test]
#[serial_test::serial]
fn env_override_bool_field() {
    let mut config = ShieldpostConfig::default();
    with_env("SHIELDPOST_REPORT_OBFUSCATE", "true", || {
        config.apply_env_overrides();
    });
    assert!(config.report.obfuscate);
}

#[test]
#[serial_test::serial]
fn env_override_numeric_field() {
    let mut config = ShieldpostConfig::default();
    with_env("SHIELDPOST_RELAY_PORT", "2525", || {
        config.apply_env_overrides();
    });
    assert_eq!(config.relay.port, 2525);
}

#[test]
#[serial_test::serial]
fn env_override_invalid_number_keeps_toml_value() {
    let mut config = ShieldpostConfig::parse(EXAMPLE).expect("should parse");
    with_env("SHIELDPOST_RELAY_TIMEOUT_SECS", "soon", || {
        config.apply_env_overrides();
    });
    assert_eq!(config.relay.timeout_secs, 30);
}

// =============================================================================
// 빈 파일 / 잘못된 형식
// =============================================================================

#[test]
fn empty_string_parses_with_defaults() {
    let config = ShieldpostConfig::parse("").expect("empty should parse");
    assert_eq!(config.general.log_level, "info");
    assert!(config.report.user_id.is_empty());
}

#[test]
fn comments_only_parses_with_defaults() {
    let config = ShieldpostConfig::parse("# nothing here\n# [report]\n").expect("should parse");
    assert_eq!(config.report.to, DEFAULT_DSHIELD_RECIPIENT);
}

#[test]
fn malformed_toml_returns_parse_error() {
    let err = ShieldpostConfig::parse("[report\nuser_id = 1").unwrap_err();
    assert!(matches!(
        err,
        ShieldpostError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn wrong_type_for_numeric_field() {
    let err = ShieldpostConfig::parse("[relay]\nport = \"smtp\"").unwrap_err();
    assert!(matches!(
        err,
        ShieldpostError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn unknown_section_is_ignored() {
    let toml = r#"
[report]
user_id = "42"

[legacy]
mode = "ossec"
"#;
    let config = ShieldpostConfig::parse(toml).expect("unknown sections are ignored");
    assert_eq!(config.report.user_id, "42");
}

#[tokio::test]
async fn from_file_nonexistent_returns_file_not_found() {
    let dir = tempfile::tempdir().expect("tempdir");
    let result = ShieldpostConfig::from_file(dir.path().join("missing.toml")).await;
    assert!(matches!(
        result.unwrap_err(),
        ShieldpostError::Config(ConfigError::FileNotFound { .. })
    ));
}

#[tokio::test]
#[serial_test::serial]
async fn load_example_config_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("shieldpost.toml");
    tokio::fs::write(&path, EXAMPLE).await.expect("write");

    let config = ShieldpostConfig::load(&path)
        .await
        .expect("loaded example should validate");
    assert_eq!(config.relay.host, "localhost");
}

// =============================================================================
// 직렬화 라운드트립 테스트
// =============================================================================

#[test]
fn example_config_serialize_roundtrip() {
    let config = ShieldpostConfig::parse(EXAMPLE).expect("should parse");
    let serialized = toml::to_string_pretty(&config).expect("should serialize");
    let reparsed = ShieldpostConfig::parse(&serialized).expect("should reparse");
    reparsed.validate().expect("should validate");

    assert_eq!(config.report.ports, reparsed.report.ports);
    assert_eq!(config.input.log_path, reparsed.input.log_path);
}
