#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, ParseError, ShieldpostError};

// 설정
pub use config::ShieldpostConfig;

// 파이프라인 trait
pub use pipeline::LineParser;

// 도메인 타입
pub use types::{
    AggregateKey, AggregateRecord, ParsedEvent, Protocol, TimestampKey, UtcOffset,
};
