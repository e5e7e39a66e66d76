//! DShield 리포트 포매터
//!
//! 집계 레코드를 DShield 제출 형식의 메일(제목 + 본문)로 만듭니다.
//!
//! # 본문 형식
//! 레코드마다 한 줄이며, 필드는 탭으로 구분됩니다.
//! ```text
//! 2024-01-15 12:00:05 +09:00	12345	2	198.51.100.4	51234	203.0.113.7	22	TCP
//! ```

use shieldpost_core::types::{AggregateRecord, UtcOffset, human_timestamp};

/// 리포트를 만든 제품 이름
pub const PRODUCT_NAME: &str = "shieldpost";

/// 리포트 헤더 정보
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportHeader {
    /// 수신 주소
    pub to: String,
    /// 발신 주소
    pub from: String,
    /// DShield 사용자 ID
    pub user_id: String,
    /// 타임스탬프에 붙일 UTC 오프셋
    pub offset: UtcOffset,
    /// 제품 이름
    pub product: String,
    /// 제품 버전
    pub version: String,
}

impl ReportHeader {
    /// 이 크레이트의 제품 이름과 버전을 사용하는 헤더를 만듭니다.
    pub fn new(
        to: impl Into<String>,
        from: impl Into<String>,
        user_id: impl Into<String>,
        offset: UtcOffset,
    ) -> Self {
        Self {
            to: to.into(),
            from: from.into(),
            user_id: user_id.into(),
            offset,
            product: PRODUCT_NAME.to_owned(),
            version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

/// 완성된 DShield 리포트
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DShieldReport {
    header: ReportHeader,
    subject: String,
    body: String,
    record_count: usize,
}

impl DShieldReport {
    /// 레코드 목록과 헤더로 리포트를 만듭니다. 레코드 순서는 그대로 유지됩니다.
    pub fn build(records: &[AggregateRecord], header: &ReportHeader) -> Self {
        let subject = format!(
            "FORMAT DSHIELD USERID {} TZ {} {} {}",
            header.user_id, header.offset, header.product, header.version
        );

        let mut body = String::with_capacity(records.len() * 96);
        for record in records {
            body.push_str(&format_line(record, &header.user_id, header.offset));
            body.push('\n');
        }

        Self {
            header: header.clone(),
            subject,
            body,
            record_count: records.len(),
        }
    }

    pub fn to(&self) -> &str {
        &self.header.to
    }

    pub fn from(&self) -> &str {
        &self.header.from
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// 레코드 수
    pub fn len(&self) -> usize {
        self.record_count
    }

    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    /// 테스트 모드 출력용 메일 형태 (`To:`, `Subject:`, 빈 줄, 본문)
    pub fn envelope(&self) -> String {
        format!(
            "To: {}\nSubject: {}\n\n{}",
            self.header.to, self.subject, self.body
        )
    }
}

/// 레코드 한 줄을 포맷합니다 (줄바꿈 제외).
pub fn format_line(record: &AggregateRecord, user_id: &str, offset: UtcOffset) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        human_timestamp(&record.latest, offset),
        user_id,
        record.occurrences,
        record.src_ip,
        record.src_port,
        record.dst_ip,
        record.dst_port,
        record.protocol,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shieldpost_core::types::Protocol;
    use std::net::Ipv4Addr;

    fn record(second: u32, occurrences: u64, protocol: Protocol) -> AggregateRecord {
        AggregateRecord {
            latest: NaiveDate::from_ymd_opt(2024, 1, 15)
                .and_then(|d| d.and_hms_opt(12, 0, second))
                .unwrap(),
            occurrences,
            src_ip: Ipv4Addr::new(198, 51, 100, 4),
            src_port: 51234,
            dst_ip: Ipv4Addr::new(203, 0, 113, 7),
            dst_port: 22,
            protocol,
        }
    }

    fn header() -> ReportHeader {
        ReportHeader {
            to: "reports@dshield.org".to_owned(),
            from: "ossec@example.com".to_owned(),
            user_id: "12345".to_owned(),
            offset: UtcOffset::from_minutes(9 * 60).unwrap(),
            product: "shieldpost".to_owned(),
            version: "0.1.0".to_owned(),
        }
    }

    #[test]
    fn subject_contains_user_offset_and_product() {
        let report = DShieldReport::build(&[record(5, 1, Protocol::Tcp)], &header());
        assert_eq!(
            report.subject(),
            "FORMAT DSHIELD USERID 12345 TZ +09:00 shieldpost 0.1.0"
        );
    }

    #[test]
    fn body_is_tab_separated_line_per_record() {
        let records = [record(5, 2, Protocol::Tcp), record(7, 1, Protocol::Udp)];
        let report = DShieldReport::build(&records, &header());
        assert_eq!(
            report.body(),
            "2024-01-15 12:00:05 +09:00\t12345\t2\t198.51.100.4\t51234\t203.0.113.7\t22\tTCP\n\
             2024-01-15 12:00:07 +09:00\t12345\t1\t198.51.100.4\t51234\t203.0.113.7\t22\tUDP\n"
        );
        assert_eq!(report.len(), 2);
    }

    #[test]
    fn unknown_protocol_is_rendered_as_placeholder() {
        let line = format_line(&record(0, 1, Protocol::Unknown), "1", UtcOffset::from_minutes(0).unwrap());
        assert!(line.ends_with("\t???"));
    }

    #[test]
    fn negative_offset_is_rendered_with_sign() {
        let mut h = header();
        h.offset = UtcOffset::from_minutes(-(5 * 60 + 30)).unwrap();
        let report = DShieldReport::build(&[record(0, 1, Protocol::Tcp)], &h);
        assert!(report.subject().contains("TZ -05:30"));
        assert!(report.body().starts_with("2024-01-15 12:00:00 -05:30\t"));
    }

    #[test]
    fn envelope_has_headers_blank_line_then_body() {
        let report = DShieldReport::build(&[record(5, 1, Protocol::Tcp)], &header());
        let envelope = report.envelope();
        let (head, body) = envelope.split_once("\n\n").unwrap();
        assert_eq!(
            head,
            "To: reports@dshield.org\nSubject: FORMAT DSHIELD USERID 12345 TZ +09:00 shieldpost 0.1.0"
        );
        assert_eq!(body, report.body());
    }

    #[test]
    fn header_new_uses_crate_version() {
        let h = ReportHeader::new("a@b.org", "c@d.org", "1", UtcOffset::from_minutes(0).unwrap());
        assert_eq!(h.product, PRODUCT_NAME);
        assert_eq!(h.version, env!("CARGO_PKG_VERSION"));
    }
}
