//! 설정 관리 — shieldpost.toml 파싱 및 런타임 설정
//!
//! [`ShieldpostConfig`]는 리포터 실행에 필요한 모든 값을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`SHIELDPOST_REPORT_USER_ID=12345` 형식)
//! 3. 설정 파일 (`shieldpost.toml`)
//! 4. 기본값 (`Default` 구현)
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), shieldpost_core::error::ShieldpostError> {
//! use shieldpost_core::config::ShieldpostConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드 + 검증
//! let config = ShieldpostConfig::load("shieldpost.toml").await?;
//!
//! // TOML 문자열에서 직접 파싱
//! let config = ShieldpostConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{ConfigError, ShieldpostError};
use crate::types::UtcOffset;

/// DShield 리포트 수신 주소 기본값
pub const DEFAULT_DSHIELD_RECIPIENT: &str = "reports@dshield.org";

/// shieldpost 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShieldpostConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 입력 로그 / 상태 파일 설정
    #[serde(default)]
    pub input: InputConfig,
    /// 리포트 내용 설정
    #[serde(default)]
    pub report: ReportConfig,
    /// 메일 릴레이 설정
    #[serde(default)]
    pub relay: RelayConfig,
}

impl ShieldpostConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드와 검증을 적용합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ShieldpostError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 읽습니다 (환경변수 오버라이드, 검증 없음).
    ///
    /// CLI 인자를 덮어쓴 뒤 검증해야 하는 호출자를 위한 단계입니다.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ShieldpostError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ShieldpostError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ShieldpostError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// 파일이 없으면 기본값을 사용합니다.
    ///
    /// `submit`처럼 필수 값을 모두 CLI로 받을 수 있는 명령에서 사용합니다.
    pub async fn from_file_or_default(path: impl AsRef<Path>) -> Result<Self, ShieldpostError> {
        match Self::from_file(path.as_ref()).await {
            Err(ShieldpostError::Config(ConfigError::FileNotFound { path })) => {
                debug!(path = %path, "config file not found, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, ShieldpostError> {
        toml::from_str(toml_str).map_err(|e| {
            ShieldpostError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `SHIELDPOST_{SECTION}_{FIELD}`
    /// 예: `SHIELDPOST_RELAY_HOST=mail.example.net`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "SHIELDPOST_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "SHIELDPOST_GENERAL_LOG_FORMAT");

        // Input
        override_string(&mut self.input.log_path, "SHIELDPOST_INPUT_LOG_PATH");
        override_string(&mut self.input.state_path, "SHIELDPOST_INPUT_STATE_PATH");
        override_usize(
            &mut self.input.max_line_length,
            "SHIELDPOST_INPUT_MAX_LINE_LENGTH",
        );

        // Report
        override_string(&mut self.report.user_id, "SHIELDPOST_REPORT_USER_ID");
        override_string(&mut self.report.from, "SHIELDPOST_REPORT_FROM");
        override_string(&mut self.report.to, "SHIELDPOST_REPORT_TO");
        override_string(&mut self.report.ports, "SHIELDPOST_REPORT_PORTS");
        override_bool(&mut self.report.obfuscate, "SHIELDPOST_REPORT_OBFUSCATE");
        override_bool(
            &mut self.report.drop_private_sources,
            "SHIELDPOST_REPORT_DROP_PRIVATE_SOURCES",
        );
        override_string(&mut self.report.timezone, "SHIELDPOST_REPORT_TIMEZONE");
        override_bool(&mut self.report.dry_run, "SHIELDPOST_REPORT_DRY_RUN");

        // Relay
        override_string(&mut self.relay.host, "SHIELDPOST_RELAY_HOST");
        override_u16(&mut self.relay.port, "SHIELDPOST_RELAY_PORT");
        override_u64(&mut self.relay.timeout_secs, "SHIELDPOST_RELAY_TIMEOUT_SECS");
    }

    /// 설정값의 유효성을 검증합니다.
    ///
    /// 포트 필터 표현식은 파이프라인 설정에서 컴파일하면서 검증합니다.
    pub fn validate(&self) -> Result<(), ShieldpostError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.input.log_path.is_empty() {
            return Err(invalid("input.log_path", "must not be empty"));
        }
        if self.input.state_path.is_empty() {
            return Err(invalid("input.state_path", "must not be empty"));
        }
        if self.input.max_line_length == 0 {
            return Err(invalid("input.max_line_length", "must be greater than 0"));
        }

        if self.report.user_id.trim().is_empty() {
            return Err(invalid("report.user_id", "must not be empty"));
        }
        if self.report.user_id.chars().any(char::is_whitespace) {
            return Err(invalid("report.user_id", "must not contain whitespace"));
        }
        if !is_valid_mailbox(&self.report.from) {
            return Err(invalid(
                "report.from",
                format!("'{}' is not a valid local@domain.tld address", self.report.from),
            ));
        }
        if !is_valid_mailbox(&self.report.to) {
            return Err(invalid(
                "report.to",
                format!("'{}' is not a valid local@domain.tld address", self.report.to),
            ));
        }
        if !self.report.timezone.is_empty()
            && self.report.timezone.parse::<UtcOffset>().is_err()
        {
            return Err(invalid("report.timezone", "must be formatted as +HH:MM or -HH:MM"));
        }

        if self.relay.host.trim().is_empty() {
            return Err(invalid("relay.host", "must not be empty"));
        }
        if self.relay.port == 0 {
            return Err(invalid("relay.port", "must be 1-65535"));
        }
        if self.relay.timeout_secs == 0 {
            return Err(invalid("relay.timeout_secs", "must be greater than 0"));
        }

        Ok(())
    }

    /// 리포트에 기록할 UTC 오프셋을 결정합니다.
    ///
    /// `report.timezone`이 비어 있으면 호스트의 로컬 오프셋을 사용합니다.
    pub fn utc_offset(&self) -> Result<UtcOffset, ShieldpostError> {
        if self.report.timezone.is_empty() {
            return Ok(UtcOffset::local());
        }
        self.report
            .timezone
            .parse()
            .map_err(|_| invalid("report.timezone", "must be formatted as +HH:MM or -HH:MM"))
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> ShieldpostError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// `local@domain.tld` 형태인지 확인합니다.
///
/// RFC 5322 전체를 검증하지 않으며, 공백과 중복 `@`를 거부하고
/// 도메인에 알파벳 TLD가 있는지만 봅니다.
pub fn is_valid_mailbox(addr: &str) -> bool {
    let Some((local, domain)) = addr.split_once('@') else {
        return false;
    };
    if local.is_empty() || local.contains(char::is_whitespace) || domain.contains('@') {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty()
        && !host.split('.').any(|label| label.is_empty())
        && !host.contains(char::is_whitespace)
        && tld.len() >= 2
        && tld.chars().all(|c| c.is_ascii_alphabetic())
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// 입력 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// OSSEC 방화벽 로그 경로
    pub log_path: String,
    /// 컷오프 타임스탬프 상태 파일 경로
    pub state_path: String,
    /// 최대 라인 길이 (바이트)
    pub max_line_length: usize,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            log_path: "/var/ossec/logs/firewall/firewall.log".to_owned(),
            state_path: "/var/ossec/logs/firewall/shieldpost.state".to_owned(),
            max_line_length: 64 * 1024, // 64KB
        }
    }
}

/// 리포트 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// DShield 사용자 ID
    pub user_id: String,
    /// 발신 주소
    pub from: String,
    /// 수신 주소
    pub to: String,
    /// 목적지 포트 필터 표현식 (예: `"!25,!80,445"`), 비어 있으면 전체 허용
    pub ports: String,
    /// 목적지 IP 첫 옥텟 난독화
    pub obfuscate: bool,
    /// 사설/루프백 출발지 제외
    pub drop_private_sources: bool,
    /// UTC 오프셋 오버라이드 (`+HH:MM`), 비어 있으면 호스트 값
    pub timezone: String,
    /// 테스트 모드: 전송 대신 표준 출력으로 리포트 출력
    pub dry_run: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            from: String::new(),
            to: DEFAULT_DSHIELD_RECIPIENT.to_owned(),
            ports: String::new(),
            obfuscate: false,
            drop_private_sources: false,
            timezone: String::new(),
            dry_run: false,
        }
    }
}

/// 메일 릴레이 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// 릴레이 호스트명
    pub host: String,
    /// SMTP 포트
    pub port: u16,
    /// SMTP 대화 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_owned(),
            port: 25,
            timeout_secs: 30,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
