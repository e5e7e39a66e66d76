//! 에러 타입 — 도메인별 에러 정의

/// shieldpost 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum ShieldpostError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파싱 에러
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// 상태 파일 에러
    #[error("state error: {0}")]
    State(String),

    /// 리포트 전송 에러
    #[error("relay error: {0}")]
    Relay(String),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파싱 에러
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// 형식이 맞지 않음
    #[error("malformed {what}: '{value}'")]
    Malformed { what: &'static str, value: String },

    /// 입력 데이터 초과
    #[error("input too large: {size} bytes (max: {max})")]
    TooLarge { size: usize, max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display_names_field() {
        let err = ConfigError::InvalidValue {
            field: "report.user_id".to_owned(),
            reason: "must not be empty".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("report.user_id"));
        assert!(msg.contains("must not be empty"));
    }

    #[test]
    fn config_error_converts_to_top_level() {
        let err: ShieldpostError = ConfigError::FileNotFound {
            path: "/etc/shieldpost.toml".to_owned(),
        }
        .into();
        assert!(matches!(err, ShieldpostError::Config(_)));
        assert!(err.to_string().contains("/etc/shieldpost.toml"));
    }

    #[test]
    fn parse_error_display() {
        let err = ParseError::Malformed {
            what: "timestamp key",
            value: "2024".to_owned(),
        };
        assert_eq!(err.to_string(), "malformed timestamp key: '2024'");
    }
}
