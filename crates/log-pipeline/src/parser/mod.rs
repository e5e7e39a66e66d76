//! 로그 파싱 모듈 -- OSSEC 방화벽 로그 파서
//!
//! 각 파서는 core의 [`LineParser`](shieldpost_core::pipeline::LineParser) trait을 구현합니다.
//!
//! # 지원 형식
//! - OSSEC `firewall.log` DROP/BLOCK 이벤트 ([`FirewallLogParser`])

pub mod firewall;

pub use firewall::{FirewallLogParser, parse_ipv4_shape};
