//! 이벤트 집계기 -- 컷오프 적용, 난독화, 중복 제거
//!
//! 필터를 통과한 이벤트를 `(출발지 IP, 출발지 포트, 목적지 IP, 목적지 포트, 프로토콜)`
//! 키로 묶고, 키마다 발생 횟수와 가장 최근 시각을 유지합니다.
//!
//! # 컷오프
//! 이전 실행에서 저장된 컷오프 이하의 타임스탬프를 가진 이벤트는 이미 보고된 것으로 보고 버립니다.
//! 살아남은 모든 이벤트의 타임스탬프 최댓값이 다음 실행의 컷오프 후보가 됩니다.
//!
//! # 순서
//! 레코드는 처음 삽입된 순서대로 유지됩니다.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use shieldpost_core::types::{AggregateKey, AggregateRecord, ParsedEvent, TimestampKey};

/// 이벤트 하나를 관찰한 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// 컷오프 이하라서 버림
    Discarded,
    /// 새 레코드 생성
    Inserted,
    /// 기존 레코드 갱신
    Updated,
}

/// 집계 완료 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationOutcome {
    /// 삽입 순서대로 정렬된 레코드
    pub records: Vec<AggregateRecord>,
    /// 살아남은 이벤트 중 최대 타임스탬프 키 (이벤트가 없으면 `None`)
    pub new_cutoff: Option<TimestampKey>,
    /// 컷오프로 버려진 이벤트 수
    pub discarded: u64,
}

/// 이벤트 집계기
#[derive(Debug)]
pub struct EventAggregator {
    cutoff: TimestampKey,
    obfuscate: bool,
    records: Vec<AggregateRecord>,
    index: HashMap<AggregateKey, usize>,
    max_key: Option<TimestampKey>,
    discarded: u64,
}

impl EventAggregator {
    /// 새 집계기를 생성합니다.
    ///
    /// `obfuscate`가 켜져 있으면 목적지 IP의 첫 옥텟을 `10`으로 바꾼 뒤 키를 만듭니다.
    pub fn new(cutoff: TimestampKey, obfuscate: bool) -> Self {
        Self {
            cutoff,
            obfuscate,
            records: Vec::new(),
            index: HashMap::new(),
            max_key: None,
            discarded: 0,
        }
    }

    /// 이벤트 하나를 집계에 반영합니다.
    pub fn observe(&mut self, event: &ParsedEvent) -> Observation {
        let key = event.timestamp_key();
        if key <= self.cutoff {
            self.discarded += 1;
            return Observation::Discarded;
        }

        let mut record = AggregateRecord::first(event);
        if self.obfuscate {
            record.dst_ip = obfuscate_destination(record.dst_ip);
        }

        if self.max_key.as_ref().is_none_or(|max| key > *max) {
            self.max_key = Some(key);
        }

        match self.index.get(&record.key()) {
            Some(&idx) => {
                let existing = &mut self.records[idx];
                existing.occurrences += 1;
                existing.latest = event.timestamp;
                Observation::Updated
            }
            None => {
                self.index.insert(record.key(), self.records.len());
                self.records.push(record);
                Observation::Inserted
            }
        }
    }

    /// 서로 다른 키의 수
    pub fn distinct_count(&self) -> usize {
        self.records.len()
    }

    /// 집계를 마치고 결과를 돌려줍니다.
    pub fn finish(self) -> AggregationOutcome {
        AggregationOutcome {
            records: self.records,
            new_cutoff: self.max_key,
            discarded: self.discarded,
        }
    }
}

/// 목적지 IP의 첫 옥텟을 `10`으로 바꿉니다.
pub fn obfuscate_destination(ip: Ipv4Addr) -> Ipv4Addr {
    let [_, b, c, d] = ip.octets();
    Ipv4Addr::new(10, b, c, d)
}
