//! 리포트 파이프라인 설정
//!
//! [`PipelineConfig`]는 core의 [`ShieldpostConfig`]를 실행 가능한 형태로 변환한 설정입니다.
//! 포트 필터 표현식은 이 단계에서 컴파일되므로, 잘못된 표현식은 로그를 한 줄도 읽기 전에
//! 설정 에러로 드러납니다.
//!
//! # 사용 예시
//! ```ignore
//! use shieldpost_core::config::ShieldpostConfig;
//! use shieldpost_log_pipeline::config::PipelineConfig;
//!
//! let core_config = ShieldpostConfig::load("shieldpost.toml").await?;
//! let config = PipelineConfig::from_core(&core_config)?;
//! ```

use std::path::PathBuf;
use std::time::Duration;

use shieldpost_core::config::{ShieldpostConfig, is_valid_mailbox};
use shieldpost_core::types::UtcOffset;

use crate::error::LogPipelineError;
use crate::filter::{EventFilter, PortFilter, SourceFilter};

/// 리포트 파이프라인 설정
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// OSSEC 방화벽 로그 경로
    pub log_path: PathBuf,
    /// 컷오프 상태 파일 경로
    pub state_path: PathBuf,
    /// 최대 라인 길이 (바이트)
    pub max_line_length: usize,
    /// DShield 사용자 ID
    pub user_id: String,
    /// 발신 주소
    pub from: String,
    /// 수신 주소
    pub to: String,
    /// 컴파일된 목적지 포트 필터
    pub port_filter: PortFilter,
    /// 사설/루프백 출발지 제외
    pub drop_private_sources: bool,
    /// 목적지 첫 옥텟 난독화
    pub obfuscate: bool,
    /// 리포트 타임스탬프 오프셋
    pub offset: UtcOffset,
    /// 테스트 모드 (전송 대신 출력)
    pub dry_run: bool,
    /// 메일 릴레이 호스트
    pub relay_host: String,
    /// 메일 릴레이 포트
    pub relay_port: u16,
    /// SMTP 타임아웃
    pub relay_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let core = ShieldpostConfig::default();
        Self {
            log_path: PathBuf::from(&core.input.log_path),
            state_path: PathBuf::from(&core.input.state_path),
            max_line_length: core.input.max_line_length,
            user_id: core.report.user_id,
            from: core.report.from,
            to: core.report.to,
            port_filter: PortFilter::allow_all(),
            drop_private_sources: core.report.drop_private_sources,
            obfuscate: core.report.obfuscate,
            offset: UtcOffset::local(),
            dry_run: core.report.dry_run,
            relay_host: core.relay.host,
            relay_port: core.relay.port,
            relay_timeout: Duration::from_secs(core.relay.timeout_secs),
        }
    }
}

impl PipelineConfig {
    /// core 설정에서 파이프라인 설정을 생성합니다.
    ///
    /// 포트 필터 컴파일과 타임존 해석에 실패하면 설정 에러를 반환합니다.
    pub fn from_core(core: &ShieldpostConfig) -> Result<Self, LogPipelineError> {
        let port_filter = PortFilter::parse(&core.report.ports)?;
        let offset = core.utc_offset().map_err(|_| LogPipelineError::Config {
            field: "report.timezone".to_owned(),
            reason: format!(
                "'{}' must be formatted as +HH:MM or -HH:MM",
                core.report.timezone
            ),
        })?;

        Ok(Self {
            log_path: PathBuf::from(&core.input.log_path),
            state_path: PathBuf::from(&core.input.state_path),
            max_line_length: core.input.max_line_length,
            user_id: core.report.user_id.clone(),
            from: core.report.from.clone(),
            to: core.report.to.clone(),
            port_filter,
            drop_private_sources: core.report.drop_private_sources,
            obfuscate: core.report.obfuscate,
            offset,
            dry_run: core.report.dry_run,
            relay_host: core.relay.host.clone(),
            relay_port: core.relay.port,
            relay_timeout: Duration::from_secs(core.relay.timeout_secs),
        })
    }

    /// 포트 필터와 출발지 필터를 묶은 이벤트 필터
    pub fn event_filter(&self) -> EventFilter {
        EventFilter::new(
            self.port_filter.clone(),
            SourceFilter::new(self.drop_private_sources),
        )
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), LogPipelineError> {
        if self.log_path.as_os_str().is_empty() {
            return Err(config_error("input.log_path", "must not be empty"));
        }

        if self.state_path.as_os_str().is_empty() {
            return Err(config_error("input.state_path", "must not be empty"));
        }

        if self.max_line_length == 0 {
            return Err(config_error("input.max_line_length", "must be greater than 0"));
        }

        if self.user_id.is_empty() {
            return Err(config_error("report.user_id", "must not be empty"));
        }

        if self.user_id.contains(char::is_whitespace) {
            return Err(config_error(
                "report.user_id",
                format!("'{}' must not contain whitespace", self.user_id),
            ));
        }

        if !is_valid_mailbox(&self.from) {
            return Err(config_error(
                "report.from",
                format!("'{}' is not a valid email address", self.from),
            ));
        }

        if !is_valid_mailbox(&self.to) {
            return Err(config_error(
                "report.to",
                format!("'{}' is not a valid email address", self.to),
            ));
        }

        if self.relay_host.is_empty() {
            return Err(config_error("relay.host", "must not be empty"));
        }

        if self.relay_port == 0 {
            return Err(config_error("relay.port", "must be greater than 0"));
        }

        if self.relay_timeout.is_zero() {
            return Err(config_error("relay.timeout_secs", "must be greater than 0"));
        }

        Ok(())
    }
}

fn config_error(field: &str, reason: impl Into<String>) -> LogPipelineError {
    LogPipelineError::Config {
        field: field.to_owned(),
        reason: reason.into(),
    }
}

/// 파이프라인 설정 빌더
#[derive(Default)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.log_path = path.into();
        self
    }

    pub fn state_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.state_path = path.into();
        self
    }

    pub fn max_line_length(mut self, size: usize) -> Self {
        self.config.max_line_length = size;
        self
    }

    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.config.user_id = user_id.into();
        self
    }

    pub fn from_address(mut self, from: impl Into<String>) -> Self {
        self.config.from = from.into();
        self
    }

    pub fn to_address(mut self, to: impl Into<String>) -> Self {
        self.config.to = to.into();
        self
    }

    /// 컴파일된 포트 필터를 설정합니다.
    pub fn port_filter(mut self, filter: PortFilter) -> Self {
        self.config.port_filter = filter;
        self
    }

    pub fn drop_private_sources(mut self, drop: bool) -> Self {
        self.config.drop_private_sources = drop;
        self
    }

    pub fn obfuscate(mut self, obfuscate: bool) -> Self {
        self.config.obfuscate = obfuscate;
        self
    }

    pub fn offset(mut self, offset: UtcOffset) -> Self {
        self.config.offset = offset;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.config.dry_run = dry_run;
        self
    }

    /// 메일 릴레이 주소를 설정합니다.
    pub fn relay(mut self, host: impl Into<String>, port: u16) -> Self {
        self.config.relay_host = host.into();
        self.config.relay_port = port;
        self
    }

    pub fn relay_timeout(mut self, timeout: Duration) -> Self {
        self.config.relay_timeout = timeout;
        self
    }

    /// 설정을 검증하고 `PipelineConfig`를 생성합니다.
    pub fn build(self) -> Result<PipelineConfig, LogPipelineError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
