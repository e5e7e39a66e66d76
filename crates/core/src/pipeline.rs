//! 파이프라인 trait — 모듈 확장 포인트 정의

use crate::error::ShieldpostError;
use crate::types::ParsedEvent;

/// 로그 라인 파서 trait
///
/// 새로운 방화벽 로그 형식을 지원하려면 이 trait을 구현합니다.
/// 이벤트가 아닌 라인이나 형식이 맞지 않는 라인은 `Err`를 반환하며,
/// 호출자는 해당 라인을 건너뜁니다.
pub trait LineParser: Send + Sync {
    /// 지원하는 로그 형식 이름
    fn format_name(&self) -> &str;

    /// 한 줄을 이벤트로 파싱
    fn parse(&self, line: &str) -> Result<ParsedEvent, ShieldpostError>;
}
