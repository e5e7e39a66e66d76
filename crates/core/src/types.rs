//! 도메인 타입 — 파서, 집계기, 리포트 포매터가 공유하는 타입
//!
//! 방화벽 로그 한 줄에서 추출한 [`ParsedEvent`]와, 같은 연결 4-튜플+프로토콜을
//! 묶은 [`AggregateRecord`]가 중심 타입입니다.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// 전송 계층 프로토콜
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Protocol {
    Tcp,
    Udp,
    /// TCP/UDP 외의 토큰 (리포트에는 `???`로 기록)
    Unknown,
}

impl Protocol {
    /// 로그의 프로토콜 토큰을 정규화합니다 (대소문자 무시).
    pub fn from_token(token: &str) -> Self {
        if token.eq_ignore_ascii_case("tcp") {
            Self::Tcp
        } else if token.eq_ignore_ascii_case("udp") {
            Self::Udp
        } else {
            Self::Unknown
        }
    }

    /// 리포트에 기록되는 문자열
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
            Self::Unknown => "???",
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 정렬 가능한 14자리 타임스탬프 키 (`YYYYMMDDHHMMSS`)
///
/// 고정 폭 숫자 문자열이므로 사전순 비교가 곧 시간순 비교입니다.
/// 상태 파일에 저장되는 컷오프 값도 이 형식입니다.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimestampKey(String);

impl TimestampKey {
    /// 아무 상태도 없을 때 사용하는 하한값
    pub const EPOCH_FLOOR: &'static str = "19700101000000";

    /// 에포크 하한 키를 반환합니다.
    pub fn epoch_floor() -> Self {
        Self(Self::EPOCH_FLOOR.to_owned())
    }

    /// 시각에서 키를 만듭니다.
    pub fn from_datetime(dt: &NaiveDateTime) -> Self {
        Self(dt.format("%Y%m%d%H%M%S").to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for TimestampKey {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 14 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ParseError::Malformed {
                what: "timestamp key",
                value: s.to_owned(),
            });
        }
        Ok(Self(s.to_owned()))
    }
}

impl TryFrom<String> for TimestampKey {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimestampKey> for String {
    fn from(key: TimestampKey) -> Self {
        key.0
    }
}

impl fmt::Display for TimestampKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 리포터의 UTC 오프셋 (`+HH:MM` / `-HH:MM`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UtcOffset {
    /// UTC 기준 분 단위 오프셋
    minutes: i32,
}

impl UtcOffset {
    /// 분 단위 오프셋으로 생성합니다. 범위는 ±23:59.
    pub fn from_minutes(minutes: i32) -> Option<Self> {
        (minutes.abs() < 24 * 60).then_some(Self { minutes })
    }

    /// 호스트의 현재 로컬 오프셋
    pub fn local() -> Self {
        let seconds = Local::now().offset().local_minus_utc();
        Self {
            minutes: seconds / 60,
        }
    }

    pub fn minutes(&self) -> i32 {
        self.minutes
    }
}

impl FromStr for UtcOffset {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ParseError::Malformed {
            what: "utc offset",
            value: s.to_owned(),
        };

        let bytes = s.as_bytes();
        if bytes.len() != 6 || bytes[3] != b':' {
            return Err(malformed());
        }
        let sign = match bytes[0] {
            b'+' => 1,
            b'-' => -1,
            _ => return Err(malformed()),
        };
        let hours: i32 = s[1..3].parse().map_err(|_| malformed())?;
        let mins: i32 = s[4..6].parse().map_err(|_| malformed())?;
        if hours > 23 || mins > 59 {
            return Err(malformed());
        }
        Ok(Self {
            minutes: sign * (hours * 60 + mins),
        })
    }
}

impl TryFrom<String> for UtcOffset {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UtcOffset> for String {
    fn from(offset: UtcOffset) -> Self {
        offset.to_string()
    }
}

impl fmt::Display for UtcOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.minutes < 0 { '-' } else { '+' };
        let abs = self.minutes.abs();
        write!(f, "{sign}{:02}:{:02}", abs / 60, abs % 60)
    }
}

/// 방화벽 로그 한 줄에서 추출한 차단 이벤트
///
/// 파서가 생성하며 이후 변경되지 않습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedEvent {
    /// 로그에 기록된 시각 (로컬 시간, 오프셋 없음)
    pub timestamp: NaiveDateTime,
    /// 프로토콜
    pub protocol: Protocol,
    /// 출발지 IP
    pub src_ip: Ipv4Addr,
    /// 출발지 포트
    pub src_port: u16,
    /// 목적지 IP
    pub dst_ip: Ipv4Addr,
    /// 목적지 포트
    pub dst_port: u16,
}

impl ParsedEvent {
    /// 컷오프 비교에 쓰이는 정렬 키
    pub fn timestamp_key(&self) -> TimestampKey {
        TimestampKey::from_datetime(&self.timestamp)
    }

    /// 사람이 읽는 타임스탬프 (`YYYY-MM-DD HH:MM:SS ±HH:MM`)
    pub fn human_timestamp(&self, offset: UtcOffset) -> String {
        human_timestamp(&self.timestamp, offset)
    }
}

impl fmt::Display for ParsedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {}:{} -> {}:{}",
            self.timestamp, self.protocol, self.src_ip, self.src_port, self.dst_ip, self.dst_port,
        )
    }
}

/// DShield 리포트 형식의 타임스탬프 문자열을 만듭니다.
pub fn human_timestamp(ts: &NaiveDateTime, offset: UtcOffset) -> String {
    format!("{} {offset}", ts.format("%Y-%m-%d %H:%M:%S"))
}

/// 중복 제거 키 — 4-튜플 + 프로토콜
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AggregateKey {
    pub src_ip: Ipv4Addr,
    pub src_port: u16,
    pub dst_ip: Ipv4Addr,
    pub dst_port: u16,
    pub protocol: Protocol,
}

/// 같은 키로 묶인 이벤트의 집계 레코드
///
/// 실행 중 첫 발생 시 생성되고, 이후 발생마다 횟수와 최신 시각이 갱신됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRecord {
    /// 가장 최근 발생 시각
    pub latest: NaiveDateTime,
    /// 발생 횟수
    pub occurrences: u64,
    pub src_ip: Ipv4Addr,
    pub src_port: u16,
    /// 목적지 IP (난독화가 켜져 있으면 첫 옥텟이 10)
    pub dst_ip: Ipv4Addr,
    pub dst_port: u16,
    pub protocol: Protocol,
}

impl AggregateRecord {
    /// 첫 발생 이벤트에서 레코드를 만듭니다.
    pub fn first(event: &ParsedEvent) -> Self {
        Self {
            latest: event.timestamp,
            occurrences: 1,
            src_ip: event.src_ip,
            src_port: event.src_port,
            dst_ip: event.dst_ip,
            dst_port: event.dst_port,
            protocol: event.protocol,
        }
    }

    pub fn key(&self) -> AggregateKey {
        AggregateKey {
            src_ip: self.src_ip,
            src_port: self.src_port,
            dst_ip: self.dst_ip,
            dst_port: self.dst_port,
            protocol: self.protocol,
        }
    }
}
