#![doc = include_str!("../README.md")]
//!
//! # 모듈 구성
//!
//! - [`parser`]: OSSEC 방화벽 로그 라인 파서
//! - [`filter`]: 목적지 포트 필터, 사설 출발지 필터
//! - [`aggregator`]: 컷오프 적용, 목적지 난독화, 중복 제거 집계
//! - [`state`]: 컷오프 상태 파일 저장소
//! - [`report`]: DShield 리포트 포매터
//! - [`relay`]: SMTP 릴레이 / 표준 출력 전송기
//! - [`pipeline`]: 한 번의 실행 오케스트레이션
//! - [`config`]: 파이프라인 설정 (core 설정 변환)
//! - [`error`]: 도메인 에러 타입

pub mod aggregator;
pub mod config;
pub mod error;
pub mod filter;
pub mod parser;
pub mod pipeline;
pub mod relay;
pub mod report;
pub mod state;

// --- 주요 타입 re-export ---

// 파이프라인
pub use pipeline::{
    ReportPipeline, ReportPipelineBuilder, RunSummary, ScanStats, scan_log, stream_lines,
};

// 설정
pub use config::{PipelineConfig, PipelineConfigBuilder};

// 에러
pub use error::LogPipelineError;

// 파서
pub use parser::FirewallLogParser;

// 필터
pub use filter::{EventFilter, FilterVerdict, PortFilter, SourceFilter};

// 집계
pub use aggregator::{AggregationOutcome, EventAggregator, Observation};

// 상태
pub use state::StateStore;

// 리포트/전송
pub use relay::{RelayTransport, ReportSender, SmtpRelaySender, StdoutSender, resolve_relay};
pub use report::{DShieldReport, ReportHeader};
