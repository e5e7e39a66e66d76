//! 목적지 포트 필터
//!
//! 쉼표로 구분된 토큰 목록을 왼쪽부터 순서대로 평가합니다.
//! 불리언 식이 아니라 상태를 가진 순차 평가이므로 토큰 순서가 결과에 영향을 줍니다.
//!
//! | 토큰 | 포트와 같을 때 | 포트와 다를 때 |
//! |------|----------------|----------------|
//! | `445` | 즉시 허용 | 계속 |
//! | `!25` | 즉시 거부 | 잠정 허용 후 계속 |
//!
//! 목록을 끝까지 본 경우 마지막 잠정 판정을 따르며, 기본값은 거부입니다.
//! 빈 표현식은 모든 포트를 허용합니다.
//!
//! ```ignore
//! let filter = PortFilter::parse("!25,!80,445")?;
//! assert!(filter.admits(445));
//! assert!(filter.admits(22));
//! assert!(!filter.admits(25));
//! ```

use std::fmt;

use crate::error::LogPipelineError;

/// 필터 토큰
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortToken {
    /// 포함 (`445`)
    Include(u16),
    /// 제외 (`!25`)
    Exclude(u16),
}

impl fmt::Display for PortToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Include(port) => write!(f, "{port}"),
            Self::Exclude(port) => write!(f, "!{port}"),
        }
    }
}

/// 컴파일된 포트 필터
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortFilter {
    tokens: Vec<PortToken>,
}

impl PortFilter {
    /// 모든 포트를 허용하는 필터
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// 필터 표현식을 파싱합니다.
    ///
    /// 각 토큰은 1-65535 범위의 10진수 포트여야 하며, 그렇지 않으면
    /// 설정 에러입니다 (실행을 중단해야 합니다).
    pub fn parse(expr: &str) -> Result<Self, LogPipelineError> {
        let expr = expr.trim();
        if expr.is_empty() {
            return Ok(Self::allow_all());
        }

        let tokens = expr
            .split(',')
            .map(|raw| Self::parse_token(raw.trim()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { tokens })
    }

    fn parse_token(token: &str) -> Result<PortToken, LogPipelineError> {
        let (negated, digits) = match token.strip_prefix('!') {
            Some(rest) => (true, rest.trim_start()),
            None => (false, token),
        };

        let invalid = |reason: String| LogPipelineError::Config {
            field: "report.ports".to_owned(),
            reason,
        };

        if digits.is_empty() {
            return Err(invalid(format!("empty port token '{token}'")));
        }
        if !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid(format!("port token '{token}' is not a number")));
        }

        let port = digits
            .parse::<u32>()
            .ok()
            .and_then(|p| u16::try_from(p).ok())
            .filter(|p| *p >= 1)
            .ok_or_else(|| invalid(format!("port '{digits}' out of range (1-65535)")))?;

        Ok(if negated {
            PortToken::Exclude(port)
        } else {
            PortToken::Include(port)
        })
    }

    /// 포트가 필터를 통과하는지 평가합니다.
    pub fn admits(&self, port: u16) -> bool {
        if self.tokens.is_empty() {
            return true;
        }

        let mut verdict = false;
        for token in &self.tokens {
            match *token {
                PortToken::Include(p) if p == port => return true,
                PortToken::Include(_) => {}
                PortToken::Exclude(p) if p == port => return false,
                PortToken::Exclude(_) => verdict = true,
            }
        }
        verdict
    }

    /// 필터가 비어 있는지 (모든 포트 허용) 여부
    pub fn is_allow_all(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl fmt::Display for PortFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, token) in self.tokens.iter().enumerate() {
            if idx > 0 {
                f.write_str(",")?;
            }
            write!(f, "{token}")?;
        }
        Ok(())
    }
}
