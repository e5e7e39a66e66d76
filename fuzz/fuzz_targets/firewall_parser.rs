#![no_main]

use libfuzzer_sys::fuzz_target;
use shieldpost_core::pipeline::LineParser;
use shieldpost_log_pipeline::parser::FirewallLogParser;

fuzz_target!(|data: &[u8]| {
    let Ok(parser) = FirewallLogParser::new() else {
        return;
    };
    let line = String::from_utf8_lossy(data);

    // 크래시나 패닉 없이 Ok 또는 Err을 반환해야 한다
    if let Ok(event) = parser.parse(&line) {
        // 파싱된 이벤트는 항상 14자리 정렬 키를 가져야 한다
        assert_eq!(event.timestamp_key().as_str().len(), 14);
    }
});
