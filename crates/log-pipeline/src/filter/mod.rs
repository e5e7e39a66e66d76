//! 이벤트 필터 -- 목적지 포트 필터와 출발지 주소 필터
//!
//! [`EventFilter`]는 두 필터를 묶어 파서와 집계기 사이에서 이벤트를 거릅니다.

pub mod port;
pub mod source;

pub use port::{PortFilter, PortToken};
pub use source::{SourceFilter, is_reserved_source};

use shieldpost_core::types::ParsedEvent;

/// 필터 판정
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    /// 통과
    Admit,
    /// 목적지 포트 필터에 의해 제외
    PortRejected,
    /// 출발지 필터에 의해 제외
    SourceRejected,
}

impl FilterVerdict {
    /// 메트릭 레이블 값
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Admit => "admit",
            Self::PortRejected => "port",
            Self::SourceRejected => "source",
        }
    }
}

/// 포트 + 출발지 복합 필터
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    port: PortFilter,
    source: SourceFilter,
}

impl EventFilter {
    pub fn new(port: PortFilter, source: SourceFilter) -> Self {
        Self { port, source }
    }

    /// 이벤트를 평가합니다. 포트 필터를 먼저 적용합니다.
    pub fn evaluate(&self, event: &ParsedEvent) -> FilterVerdict {
        if !self.port.admits(event.dst_port) {
            FilterVerdict::PortRejected
        } else if !self.source.admits(event.src_ip) {
            FilterVerdict::SourceRejected
        } else {
            FilterVerdict::Admit
        }
    }

    pub fn port(&self) -> &PortFilter {
        &self.port
    }

    pub fn source(&self) -> &SourceFilter {
        &self.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shieldpost_core::types::Protocol;
    use std::net::Ipv4Addr;

    fn event(src: Ipv4Addr, dst_port: u16) -> ParsedEvent {
        ParsedEvent {
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 15)
                .and_then(|d| d.and_hms_opt(12, 0, 0))
                .unwrap(),
            protocol: Protocol::Tcp,
            src_ip: src,
            src_port: 40000,
            dst_ip: Ipv4Addr::new(203, 0, 113, 7),
            dst_port,
        }
    }

    #[test]
    fn default_filter_admits_everything() {
        let filter = EventFilter::default();
        assert_eq!(
            filter.evaluate(&event(Ipv4Addr::new(10, 0, 0, 1), 25)),
            FilterVerdict::Admit
        );
    }

    #[test]
    fn port_rejection_reported_first() {
        let filter = EventFilter::new(PortFilter::parse("!25").unwrap(), SourceFilter::new(true));
        assert_eq!(
            filter.evaluate(&event(Ipv4Addr::new(10, 0, 0, 1), 25)),
            FilterVerdict::PortRejected
        );
        assert_eq!(
            filter.evaluate(&event(Ipv4Addr::new(10, 0, 0, 1), 22)),
            FilterVerdict::SourceRejected
        );
        assert_eq!(
            filter.evaluate(&event(Ipv4Addr::new(198, 51, 100, 4), 22)),
            FilterVerdict::Admit
        );
    }
}
