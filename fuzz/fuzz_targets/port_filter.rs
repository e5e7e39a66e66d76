#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use shieldpost_log_pipeline::filter::PortFilter;

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    expr: String,
    ports: Vec<u16>,
}

fuzz_target!(|input: FuzzInput| {
    let Ok(filter) = PortFilter::parse(&input.expr) else {
        return;
    };

    // 표시 형식을 다시 파싱해도 같은 판정을 내려야 한다
    let reparsed = match PortFilter::parse(&filter.to_string()) {
        Ok(f) => f,
        Err(e) => panic!("display form '{filter}' failed to parse: {e}"),
    };

    for port in input.ports.iter().take(64) {
        assert_eq!(filter.admits(*port), reparsed.admits(*port));
    }
});
