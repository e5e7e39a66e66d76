#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use shieldpost_core::types::TimestampKey;
use shieldpost_log_pipeline::aggregator::{EventAggregator, Observation};
use shieldpost_log_pipeline::parser::FirewallLogParser;

/// 퍼저용 구조적 입력
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    obfuscate: bool,
    /// 컷오프 초 (2024-01-01 00:00:SS)
    cutoff_second: u8,
    /// 방화벽 로그 라인 (최대 128개로 제한)
    lines: Vec<FuzzLine>,
}

#[derive(Arbitrary, Debug)]
struct FuzzLine {
    second: u8,
    proto: u8,
    src: [u8; 4],
    src_port: u16,
    dst: [u8; 4],
    dst_port: u16,
}

impl FuzzLine {
    fn render(&self) -> String {
        let proto = ["TCP", "UDP", "ICMP", "tcp"][usize::from(self.proto % 4)];
        format!(
            "2024 Jan 01 00:{:02}:{:02} host->/var/log/messages DROP {proto} {}.{}.{}.{}:{}->{}.{}.{}.{}:{}",
            self.second / 60 % 60,
            self.second % 60,
            self.src[0], self.src[1], self.src[2], self.src[3], self.src_port,
            self.dst[0], self.dst[1], self.dst[2], self.dst[3], self.dst_port,
        )
    }
}

fuzz_target!(|input: FuzzInput| {
    let Ok(parser) = FirewallLogParser::new() else {
        return;
    };
    let cutoff_second = input.cutoff_second % 60;
    let Ok(cutoff) = format!("202401010000{cutoff_second:02}").parse::<TimestampKey>()
    else {
        return;
    };

    let mut aggregator = EventAggregator::new(cutoff.clone(), input.obfuscate);
    let mut accepted = 0u64;
    let mut discarded = 0u64;

    for line in input.lines.iter().take(128) {
        let Ok(event) = parser.parse_line(&line.render()) else {
            continue;
        };
        match aggregator.observe(&event) {
            Observation::Discarded => discarded += 1,
            Observation::Inserted | Observation::Updated => accepted += 1,
        }
    }

    let outcome = aggregator.finish();

    // 집계 횟수 합은 수용된 이벤트 수와 같아야 한다
    let total: u64 = outcome.records.iter().map(|r| r.occurrences).sum();
    assert_eq!(total, accepted);
    assert_eq!(outcome.discarded, discarded);

    // 새 컷오프는 이전 컷오프보다 항상 커야 한다
    if let Some(new_cutoff) = &outcome.new_cutoff {
        assert!(*new_cutoff > cutoff);
    } else {
        assert!(outcome.records.is_empty());
    }

    if input.obfuscate {
        assert!(outcome.records.iter().all(|r| r.dst_ip.octets()[0] == 10));
    }
});
