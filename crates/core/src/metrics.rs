//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 파이프라인은 이 상수로 `metrics::counter!()`, `metrics::gauge!()` 매크로를 호출합니다.
//! 레코더가 설치되지 않으면 모든 호출은 아무 일도 하지 않습니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `shieldpost_`
//! - 접미어: `_total` (counter), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(shieldpost_core::metrics::LINES_READ_TOTAL).increment(1);
//! ```

use metrics::{describe_counter, describe_gauge};

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 필터 사유 레이블 키 (port, source, stale)
pub const LABEL_REASON: &str = "reason";

/// 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── 파이프라인 메트릭 ─────────────────────────────────────────────

/// 읽은 로그 라인 수 (counter)
pub const LINES_READ_TOTAL: &str = "shieldpost_lines_read_total";

/// 이벤트로 파싱된 라인 수 (counter)
pub const EVENTS_PARSED_TOTAL: &str = "shieldpost_events_parsed_total";

/// 필터/컷오프로 버려진 이벤트 수 (counter, label: reason)
pub const EVENTS_FILTERED_TOTAL: &str = "shieldpost_events_filtered_total";

/// 집계된 이벤트 수 (counter)
pub const EVENTS_AGGREGATED_TOTAL: &str = "shieldpost_events_aggregated_total";

/// 마지막 실행의 리포트 레코드 수 (gauge)
pub const REPORT_RECORDS: &str = "shieldpost_report_records";

/// 리포트 전송 시도 수 (counter, label: result)
pub const REPORTS_SENT_TOTAL: &str = "shieldpost_reports_sent_total";

/// 모든 메트릭의 설명을 등록합니다.
pub fn describe_all() {
    describe_counter!(LINES_READ_TOTAL, "Total number of firewall log lines read");
    describe_counter!(
        EVENTS_PARSED_TOTAL,
        "Total number of DROP/BLOCK lines parsed into events"
    );
    describe_counter!(
        EVENTS_FILTERED_TOTAL,
        "Total number of events dropped by port filter, source filter or cutoff"
    );
    describe_counter!(
        EVENTS_AGGREGATED_TOTAL,
        "Total number of events merged into report records"
    );
    describe_gauge!(REPORT_RECORDS, "Number of records in the last built report");
    describe_counter!(REPORTS_SENT_TOTAL, "Total number of report submissions");
}
