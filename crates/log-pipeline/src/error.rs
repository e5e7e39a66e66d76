//! 로그 파이프라인 에러 타입
//!
//! [`LogPipelineError`]는 파이프라인 내부에서 발생하는 모든 에러를 표현합니다.
//! `From<LogPipelineError> for ShieldpostError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.
//!
//! # 치명도
//! - 라인 단위 에러 (`NotAnEvent`, `Parse`): 해당 라인만 건너뜀
//! - 설정/입력 에러 (`Config`, `Input`): 라인 처리 전 중단, 상태 변경 없음
//! - 상태 저장/전송 에러 (`State`, `Relay`): 실행 실패, 컷오프 미갱신

use shieldpost_core::error::{ConfigError, ShieldpostError};

/// 로그 파이프라인 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum LogPipelineError {
    /// DROP/BLOCK 이벤트가 아닌 라인
    #[error("not a drop/block event")]
    NotAnEvent,

    /// 방화벽 로그 라인 파싱 실패
    #[error("parse error: {reason}")]
    Parse {
        /// 실패 사유
        reason: String,
    },

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 입력 로그 파일 에러
    #[error("input error: {path}: {reason}")]
    Input {
        /// 입력 파일 경로
        path: String,
        /// 에러 사유
        reason: String,
    },

    /// 상태 파일 저장 실패
    #[error("state error: {path}: {reason}")]
    State {
        /// 상태 파일 경로
        path: String,
        /// 에러 사유
        reason: String,
    },

    /// 리포트 전송 실패
    #[error("relay error: {0}")]
    Relay(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// 정규식 컴파일 에러
    #[error("regex error: {0}")]
    Regex(#[from] regex::Error),
}

impl From<LogPipelineError> for ShieldpostError {
    fn from(err: LogPipelineError) -> Self {
        match err {
            LogPipelineError::Config { field, reason } => {
                ShieldpostError::Config(ConfigError::InvalidValue { field, reason })
            }
            LogPipelineError::State { path, reason } => {
                ShieldpostError::State(format!("{path}: {reason}"))
            }
            LogPipelineError::Input { path, reason } => {
                ShieldpostError::Io(std::io::Error::other(format!("{path}: {reason}")))
            }
            LogPipelineError::Relay(reason) => ShieldpostError::Relay(reason),
            LogPipelineError::Io(e) => ShieldpostError::Io(e),
            other => ShieldpostError::Parse(shieldpost_core::error::ParseError::Malformed {
                what: "firewall log",
                value: other.to_string(),
            }),
        }
    }
}
