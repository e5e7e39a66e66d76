//! OSSEC 방화벽 로그 파서
//!
//! OSSEC HIDS가 `firewall.log`에 기록하는 차단 이벤트 한 줄을 [`ParsedEvent`]로 변환합니다.
//!
//! # 라인 형식
//! ```text
//! <YEAR> <Mon> <DD> <HH>:<MM>:<SS> <agent>-><location> <ACTION> <PROTO> <SRC>:<SPORT>-><DST>:<DPORT>
//! 2024 Jan 15 12:00:00 web01->/var/log/messages DROP TCP 198.51.100.4:51234->203.0.113.7:22
//! ```
//!
//! `DROP` 또는 `BLOCK` 문자열이 없는 라인은 정규식 평가 없이 바로 거부됩니다.
//!
//! # 사용 예시
//! ```ignore
//! use shieldpost_log_pipeline::parser::FirewallLogParser;
//!
//! let parser = FirewallLogParser::new()?;
//! let event = parser.parse_line(
//!     "2024 Jan 15 12:00:00 web01->/var/log/messages DROP TCP 198.51.100.4:51234->203.0.113.7:22",
//! )?;
//! assert_eq!(event.dst_port, 22);
//! ```

use std::net::Ipv4Addr;

use chrono::{NaiveDate, NaiveDateTime};
use regex::{Captures, Regex};
use shieldpost_core::error::ShieldpostError;
use shieldpost_core::pipeline::LineParser;
use shieldpost_core::types::{ParsedEvent, Protocol};

use crate::error::LogPipelineError;

/// 영문 월 약어 테이블 (대소문자 구분)
const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// 이벤트 라인이 반드시 포함해야 하는 액션 문자열
const EVENT_MARKERS: [&str; 2] = ["DROP", "BLOCK"];

/// 라인 문법. agent 부분은 원격 에이전트(`(name) 10.0.0.1`)처럼 공백을 포함할 수 있습니다.
const LINE_PATTERN: &str = concat!(
    r"^(?P<year>\d{4})\s+(?P<month>\S+)\s+(?P<day>\d{1,2})\s+",
    r"(?P<hour>\d{2}):(?P<minute>\d{2}):(?P<second>\d{2})\s+",
    r"(?P<agent>[^>]+?)->(?P<location>\S+)\s+",
    r"(?P<action>\S+)\s+(?P<proto>\S+)\s+",
    r"(?P<src_ip>[^\s:]+):(?P<src_port>\d+)->(?P<dst_ip>[^\s:]+):(?P<dst_port>\d+)",
);

/// OSSEC 방화벽 로그 파서
///
/// core의 [`LineParser`] trait을 구현합니다.
pub struct FirewallLogParser {
    /// 컴파일된 라인 문법
    pattern: Regex,
    /// 최대 허용 라인 길이 (바이트)
    max_line_length: usize,
}

impl FirewallLogParser {
    /// 기본 설정으로 새 파서를 생성합니다.
    pub fn new() -> Result<Self, LogPipelineError> {
        Ok(Self {
            pattern: Regex::new(LINE_PATTERN)?,
            max_line_length: 64 * 1024, // 64KB
        })
    }

    /// 최대 라인 길이를 설정합니다.
    pub fn with_max_line_length(mut self, size: usize) -> Self {
        self.max_line_length = size;
        self
    }

    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }

    /// 한 줄을 파싱합니다.
    ///
    /// 이벤트가 아니면 [`LogPipelineError::NotAnEvent`], 형식이 맞지 않으면
    /// [`LogPipelineError::Parse`]를 반환합니다. 둘 다 해당 라인만 건너뛰는 에러입니다.
    pub fn parse_line(&self, line: &str) -> Result<ParsedEvent, LogPipelineError> {
        if line.len() > self.max_line_length {
            return Err(parse_failure(format!(
                "line too long: {} bytes (max: {})",
                line.len(),
                self.max_line_length
            )));
        }

        if !EVENT_MARKERS.iter().any(|marker| line.contains(marker)) {
            return Err(LogPipelineError::NotAnEvent);
        }

        let caps = self
            .pattern
            .captures(line.trim_end())
            .ok_or_else(|| parse_failure("line does not match firewall event grammar"))?;

        let timestamp = Self::timestamp(&caps)?;
        let src_ip = parse_ipv4_shape(&caps["src_ip"])?;
        let dst_ip = parse_ipv4_shape(&caps["dst_ip"])?;
        let src_port = parse_port(&caps["src_port"])?;
        let dst_port = parse_port(&caps["dst_port"])?;

        Ok(ParsedEvent {
            timestamp,
            protocol: Protocol::from_token(&caps["proto"]),
            src_ip,
            src_port,
            dst_ip,
            dst_port,
        })
    }

    /// 캡처된 날짜/시각 필드를 검증된 시각으로 조립합니다.
    fn timestamp(caps: &Captures<'_>) -> Result<NaiveDateTime, LogPipelineError> {
        let month_token = &caps["month"];
        let month = month_number(month_token)
            .ok_or_else(|| parse_failure(format!("unknown month '{month_token}'")))?;

        let year: i32 = parse_number(&caps["year"], "year")?;
        let day: u32 = parse_number(&caps["day"], "day")?;
        let hour: u32 = parse_number(&caps["hour"], "hour")?;
        let minute: u32 = parse_number(&caps["minute"], "minute")?;
        let second: u32 = parse_number(&caps["second"], "second")?;

        NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|date| date.and_hms_opt(hour, minute, second))
            .ok_or_else(|| {
                parse_failure(format!(
                    "invalid calendar time {year}-{month:02}-{day:02} {hour:02}:{minute:02}:{second:02}"
                ))
            })
    }
}

impl LineParser for FirewallLogParser {
    fn format_name(&self) -> &str {
        "ossec-firewall"
    }

    fn parse(&self, line: &str) -> Result<ParsedEvent, ShieldpostError> {
        self.parse_line(line).map_err(ShieldpostError::from)
    }
}

/// 월 약어를 1..=12로 변환합니다.
fn month_number(token: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|m| *m == token)
        .and_then(|idx| u32::try_from(idx + 1).ok())
}

/// 점으로 구분된 숫자 그룹 4개인지 확인하고 IPv4 주소로 변환합니다.
///
/// 각 그룹은 1~3자리 숫자이며 옥텟 범위(0-255)를 넘으면 거부합니다.
/// 앞자리 0(`010`)은 10진수로 해석합니다.
pub fn parse_ipv4_shape(value: &str) -> Result<Ipv4Addr, LogPipelineError> {
    let malformed = || parse_failure(format!("malformed IPv4 address '{value}'"));

    let mut octets = [0u8; 4];
    let mut groups = value.split('.');
    for octet in &mut octets {
        let group = groups.next().ok_or_else(malformed)?;
        if group.is_empty() || group.len() > 3 || !group.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        *octet = group.parse().map_err(|_| malformed())?;
    }
    if groups.next().is_some() {
        return Err(malformed());
    }
    Ok(Ipv4Addr::from(octets))
}

fn parse_port(value: &str) -> Result<u16, LogPipelineError> {
    value
        .parse()
        .map_err(|_| parse_failure(format!("port '{value}' out of range")))
}

fn parse_number<T: std::str::FromStr>(value: &str, field: &str) -> Result<T, LogPipelineError> {
    value
        .parse()
        .map_err(|_| parse_failure(format!("invalid {field} '{value}'")))
}

fn parse_failure(reason: impl Into<String>) -> LogPipelineError {
    LogPipelineError::Parse {
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str =
        "2024 Jan 15 12:00:00 web01->/var/log/messages DROP TCP 198.51.100.4:51234->203.0.113.7:22";

    fn parser() -> FirewallLogParser {
        FirewallLogParser::new().unwrap()
    }

    #[test]
    fn format_name_is_ossec_firewall() {
        assert_eq!(parser().format_name(), "ossec-firewall");
    }

    #[test]
    fn parses_drop_event() {
        let event = parser().parse_line(SAMPLE).unwrap();
        assert_eq!(event.protocol, Protocol::Tcp);
        assert_eq!(event.src_ip, Ipv4Addr::new(198, 51, 100, 4));
        assert_eq!(event.src_port, 51234);
        assert_eq!(event.dst_ip, Ipv4Addr::new(203, 0, 113, 7));
        assert_eq!(event.dst_port, 22);
        assert_eq!(event.timestamp_key().as_str(), "20240115120000");
    }

    #[test]
    fn parses_block_event_with_udp() {
        let line =
            "2023 Dec 31 23:59:59 fw->pf BLOCK UDP 192.0.2.10:5353->198.51.100.1:53";
        let event = parser().parse_line(line).unwrap();
        assert_eq!(event.protocol, Protocol::Udp);
        assert_eq!(event.timestamp_key().as_str(), "20231231235959");
    }

    #[test]
    fn parses_remote_agent_location() {
        let line = "2024 Feb  3 07:08:09 (dbserver) 10.1.1.5->/var/log/kern.log DROP TCP 198.51.100.4:4444->10.1.1.5:3306";
        let event = parser().parse_line(line).unwrap();
        assert_eq!(event.dst_port, 3306);
        assert_eq!(event.timestamp_key().as_str(), "20240203070809");
    }

    #[test]
    fn protocol_is_case_insensitive() {
        let line = SAMPLE.replace(" TCP ", " tcp ");
        assert_eq!(parser().parse_line(&line).unwrap().protocol, Protocol::Tcp);
    }

    #[test]
    fn unknown_protocol_becomes_marker() {
        let line = SAMPLE.replace(" TCP ", " ICMP ");
        let event = parser().parse_line(&line).unwrap();
        assert_eq!(event.protocol, Protocol::Unknown);
        assert_eq!(event.protocol.to_string(), "???");
    }

    #[test]
    fn lines_without_marker_are_not_events() {
        let line = SAMPLE.replace("DROP", "ALLOW");
        assert!(matches!(
            parser().parse_line(&line),
            Err(LogPipelineError::NotAnEvent)
        ));
        assert!(matches!(
            parser().parse_line("ossec: agent started"),
            Err(LogPipelineError::NotAnEvent)
        ));
    }

    #[test]
    fn marker_is_case_sensitive() {
        let line = SAMPLE.replace("DROP", "drop");
        assert!(matches!(
            parser().parse_line(&line),
            Err(LogPipelineError::NotAnEvent)
        ));
    }

    #[test]
    fn marker_without_grammar_is_parse_failure() {
        let err = parser().parse_line("DROP everything now").unwrap_err();
        assert!(matches!(err, LogPipelineError::Parse { .. }));
    }

    #[test]
    fn unknown_month_is_rejected() {
        let line = SAMPLE.replace("Jan", "Foo");
        let err = parser().parse_line(&line).unwrap_err();
        assert!(err.to_string().contains("Foo"));
    }

    #[test]
    fn month_lookup_is_case_sensitive() {
        let line = SAMPLE.replace("Jan", "JAN");
        assert!(parser().parse_line(&line).is_err());
    }

    #[test]
    fn impossible_date_is_rejected() {
        let line = SAMPLE.replace("Jan 15", "Feb 30");
        assert!(parser().parse_line(&line).is_err());
        let line = SAMPLE.replace("12:00:00", "25:00:00");
        assert!(parser().parse_line(&line).is_err());
    }

    #[test]
    fn malformed_ip_discards_event() {
        for bad in ["198.51.100", "198.51.100.4.5", "198.51.x.4", "198..100.4", "1988.51.100.4"] {
            let line = SAMPLE.replace("198.51.100.4", bad);
            assert!(parser().parse_line(&line).is_err(), "accepted {bad}");
        }
    }

    #[test]
    fn octet_above_255_is_rejected() {
        let line = SAMPLE.replace("203.0.113.7", "203.0.113.256");
        assert!(parser().parse_line(&line).is_err());
    }

    #[test]
    fn leading_zero_octets_are_decimal() {
        assert_eq!(
            parse_ipv4_shape("010.001.000.099").unwrap(),
            Ipv4Addr::new(10, 1, 0, 99)
        );
    }

    #[test]
    fn port_out_of_range_is_rejected() {
        let line = SAMPLE.replace(":22", ":70000");
        assert!(parser().parse_line(&line).is_err());
    }

    #[test]
    fn trailing_whitespace_is_tolerated() {
        let line = format!("{SAMPLE}  \r");
        assert!(parser().parse_line(&line).is_ok());
    }

    #[test]
    fn oversized_line_is_rejected() {
        let parser = parser().with_max_line_length(32);
        let err = parser.parse_line(SAMPLE).unwrap_err();
        assert!(err.to_string().contains("too long"));
    }

    #[test]
    fn line_parser_trait_maps_errors() {
        let parser = parser();
        let as_trait: &dyn LineParser = &parser;
        assert!(as_trait.parse(SAMPLE).is_ok());
        assert!(as_trait.parse("garbage").is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn arbitrary_input_does_not_panic(line in ".{0,300}") {
                let _ = parser().parse_line(&line);
            }

            #[test]
            fn valid_fields_round_trip(
                month_idx in 0usize..12,
                day in 1u32..=28,
                hour in 0u32..24,
                minute in 0u32..60,
                sport in 1u16..=65535,
                dport in 1u16..=65535,
                a in 0u8..=255, b in 0u8..=255,
            ) {
                let line = format!(
                    "2024 {} {} {:02}:{:02}:00 host->/var/log/messages DROP TCP {}.{}.1.1:{}->192.0.2.1:{}",
                    MONTHS[month_idx], day, hour, minute, a, b, sport, dport
                );
                let event = parser().parse_line(&line).unwrap();
                prop_assert_eq!(event.src_ip, Ipv4Addr::new(a, b, 1, 1));
                prop_assert_eq!(event.src_port, sport);
                prop_assert_eq!(event.dst_port, dport);
                let expected_key = format!("2024{:02}{:02}{:02}{:02}00", month_idx + 1, day, hour, minute);
                let key = event.timestamp_key();
                prop_assert_eq!(key.as_str(), expected_key.as_str());
            }
        }
    }
}
