//! 실행 오케스트레이션 -- 로그 읽기부터 리포트 전송, 컷오프 저장까지 한 번의 실행을 관리합니다.
//!
//! # 흐름
//! ```text
//! StateStore::load -> firewall.log -> Parser -> EventFilter -> EventAggregator
//!                                                                   |
//!                      StateStore::save <- ReportSender <- DShieldReport
//! ```
//!
//! # 상태 갱신 규칙
//! - 레코드가 하나도 없으면 아무것도 보내지 않고 컷오프도 그대로 둡니다.
//! - 전송(또는 테스트 모드 출력)이 성공한 경우에만 새 컷오프를 저장합니다.
//! - 입력 파일을 열 수 없거나 전송이 실패하면 상태 파일을 건드리지 않고 에러를 반환합니다.

use std::path::Path;

use metrics::{counter, gauge};
use serde::Serialize;
use shieldpost_core::metrics as m;
use shieldpost_core::pipeline::LineParser;
use shieldpost_core::types::TimestampKey;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tracing::{error, info, trace, warn};

use crate::aggregator::{EventAggregator, Observation};
use crate::config::PipelineConfig;
use crate::error::LogPipelineError;
use crate::filter::{EventFilter, FilterVerdict};
use crate::parser::FirewallLogParser;
use crate::relay::ReportSender;
use crate::report::{DShieldReport, ReportHeader};
use crate::state::StateStore;

/// 한 번의 실행 결과
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// 읽은 라인 수
    pub lines_read: u64,
    /// 이벤트로 파싱된 라인 수
    pub events_parsed: u64,
    /// DROP/BLOCK 라인이지만 형식이 맞지 않아 건너뛴 수
    pub parse_errors: u64,
    /// 포트 필터로 제외된 이벤트 수
    pub filtered_port: u64,
    /// 출발지 필터로 제외된 이벤트 수
    pub filtered_source: u64,
    /// 컷오프 이하라서 버려진 이벤트 수
    pub discarded_stale: u64,
    /// 리포트 레코드 수
    pub records: usize,
    /// 리포트를 전송(또는 출력)했는지 여부
    pub submitted: bool,
    /// 테스트 모드 여부
    pub dry_run: bool,
    /// 실행 시작 시점의 컷오프
    pub previous_cutoff: TimestampKey,
    /// 새로 저장된 컷오프 (저장하지 않았으면 `None`)
    pub new_cutoff: Option<TimestampKey>,
}

/// 로그 스캔 통계
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    /// 읽은 라인 수
    pub lines_read: u64,
    /// 이벤트로 파싱된 라인 수
    pub events_parsed: u64,
    /// 형식이 맞지 않아 건너뛴 이벤트 라인 수
    pub parse_errors: u64,
    /// 포트 필터로 제외된 수
    pub filtered_port: u64,
    /// 출발지 필터로 제외된 수
    pub filtered_source: u64,
    /// 집계기에 반영된 수 (컷오프로 버려진 이벤트 제외)
    pub aggregated: u64,
}

/// 입력 파일을 한 줄씩 읽어 콜백에 전달합니다.
///
/// UTF-8이 아닌 바이트는 대체 문자로 바꾸며, 줄 끝의 `\n`/`\r\n`은 제거합니다.
/// 한 줄은 최대 `max_line_length + 2` 바이트까지만 메모리에 읽고, 나머지는 다음
/// 줄바꿈까지 버립니다. 잘린 줄은 `max_line_length`보다 길게 전달되므로 파서가 거부합니다.
/// 파일을 열거나 읽지 못하면 `LogPipelineError::Input`을 반환합니다.
pub async fn stream_lines<F>(
    path: &Path,
    max_line_length: usize,
    mut on_line: F,
) -> Result<u64, LogPipelineError>
where
    F: FnMut(&str),
{
    let input_error = |e: std::io::Error| LogPipelineError::Input {
        path: path.display().to_string(),
        reason: e.to_string(),
    };

    // 내용 + `\r\n`
    let limit = u64::try_from(max_line_length)
        .unwrap_or(u64::MAX)
        .saturating_add(2);

    let file = tokio::fs::File::open(path).await.map_err(input_error)?;
    let mut reader = BufReader::new(file);
    let mut buf = Vec::with_capacity(512);
    let mut count = 0u64;

    loop {
        buf.clear();
        let read = (&mut reader)
            .take(limit)
            .read_until(b'\n', &mut buf)
            .await
            .map_err(input_error)?;
        if read == 0 {
            break;
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        } else if read as u64 == limit {
            skip_past_newline(&mut reader).await.map_err(input_error)?;
            trace!(limit, "truncated oversized line");
        }
        count += 1;
        on_line(&String::from_utf8_lossy(&buf));
    }

    Ok(count)
}

/// 다음 줄바꿈(포함)까지 버퍼에 쌓지 않고 건너뜁니다.
async fn skip_past_newline<R>(reader: &mut R) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let available = reader.fill_buf().await?;
        if available.is_empty() {
            return Ok(());
        }
        match available.iter().position(|b| *b == b'\n') {
            Some(pos) => {
                reader.consume(pos + 1);
                return Ok(());
            }
            None => {
                let len = available.len();
                reader.consume(len);
            }
        }
    }
}

/// 로그 파일을 읽어 파싱, 필터링한 이벤트를 집계기에 넣습니다.
///
/// 이벤트가 아닌 라인은 조용히 건너뛰고, 형식이 맞지 않는 이벤트 라인은 세기만 합니다.
pub async fn scan_log(
    path: &Path,
    parser: &FirewallLogParser,
    filter: &EventFilter,
    aggregator: &mut EventAggregator,
) -> Result<ScanStats, LogPipelineError> {
    let mut stats = ScanStats::default();

    let lines_read = stream_lines(path, parser.max_line_length(), |line| {
        let event = match parser.parse_line(line) {
            Ok(event) => event,
            Err(LogPipelineError::NotAnEvent) => return,
            Err(e) => {
                stats.parse_errors += 1;
                trace!(error = %e, "skipping firewall line");
                return;
            }
        };
        stats.events_parsed += 1;

        match filter.evaluate(&event) {
            FilterVerdict::Admit => {}
            FilterVerdict::PortRejected => {
                stats.filtered_port += 1;
                return;
            }
            FilterVerdict::SourceRejected => {
                stats.filtered_source += 1;
                return;
            }
        }

        if aggregator.observe(&event) != Observation::Discarded {
            stats.aggregated += 1;
            trace!(event = %event, "event aggregated");
        }
    })
    .await?;
    stats.lines_read = lines_read;

    counter!(m::LINES_READ_TOTAL).increment(stats.lines_read);
    counter!(m::EVENTS_PARSED_TOTAL).increment(stats.events_parsed);
    counter!(m::EVENTS_FILTERED_TOTAL, m::LABEL_REASON => FilterVerdict::PortRejected.reason())
        .increment(stats.filtered_port);
    counter!(m::EVENTS_FILTERED_TOTAL, m::LABEL_REASON => FilterVerdict::SourceRejected.reason())
        .increment(stats.filtered_source);
    counter!(m::EVENTS_AGGREGATED_TOTAL).increment(stats.aggregated);

    Ok(stats)
}

/// DShield 리포트 파이프라인
///
/// # 사용 예시
/// ```ignore
/// use shieldpost_log_pipeline::{ReportPipelineBuilder, RelayTransport};
///
/// let transport = RelayTransport::from_config(&config).await?;
/// let pipeline = ReportPipelineBuilder::new()
///     .config(config)
///     .sender(transport)
///     .build()?;
///
/// let summary = pipeline.run().await?;
/// ```
pub struct ReportPipeline<S: ReportSender> {
    config: PipelineConfig,
    parser: FirewallLogParser,
    filter: EventFilter,
    state: StateStore,
    sender: S,
}

impl<S: ReportSender> ReportPipeline<S> {
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn state_store(&self) -> &StateStore {
        &self.state
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    /// 한 번의 리포트 실행을 수행합니다.
    pub async fn run(&self) -> Result<RunSummary, LogPipelineError> {
        let previous_cutoff = self.state.load().await;
        let port_filter = self.filter.port();
        let ports = if port_filter.is_allow_all() {
            "any".to_owned()
        } else {
            port_filter.to_string()
        };
        info!(
            log = %self.config.log_path.display(),
            format = self.parser.format_name(),
            cutoff = %previous_cutoff,
            ports = %ports,
            drop_private = self.filter.source().drops_private(),
            dry_run = self.config.dry_run,
            "starting report run"
        );

        let mut aggregator = EventAggregator::new(previous_cutoff.clone(), self.config.obfuscate);
        let stats = scan_log(
            &self.config.log_path,
            &self.parser,
            &self.filter,
            &mut aggregator,
        )
        .await?;
        let distinct = aggregator.distinct_count();
        let outcome = aggregator.finish();

        counter!(m::EVENTS_FILTERED_TOTAL, m::LABEL_REASON => "stale").increment(outcome.discarded);
        gauge!(m::REPORT_RECORDS).set(outcome.records.len() as f64);

        let mut summary = RunSummary {
            lines_read: stats.lines_read,
            events_parsed: stats.events_parsed,
            parse_errors: stats.parse_errors,
            filtered_port: stats.filtered_port,
            filtered_source: stats.filtered_source,
            discarded_stale: outcome.discarded,
            records: outcome.records.len(),
            submitted: false,
            dry_run: self.config.dry_run,
            previous_cutoff,
            new_cutoff: None,
        };

        if stats.parse_errors > 0 {
            warn!(count = stats.parse_errors, "skipped malformed firewall lines");
        }

        if distinct == 0 {
            info!(lines = summary.lines_read, "no new events to report");
            return Ok(summary);
        }

        let header = ReportHeader::new(
            self.config.to.clone(),
            self.config.from.clone(),
            self.config.user_id.clone(),
            self.config.offset,
        );
        let report = DShieldReport::build(&outcome.records, &header);

        if let Err(e) = self.sender.send(&report).await {
            counter!(m::REPORTS_SENT_TOTAL, m::LABEL_RESULT => "failure").increment(1);
            error!(sender = self.sender.name(), error = %e, "report submission failed, cutoff not advanced");
            return Err(e);
        }
        counter!(m::REPORTS_SENT_TOTAL, m::LABEL_RESULT => "success").increment(1);
        summary.submitted = true;

        if let Some(cutoff) = outcome.new_cutoff {
            if let Err(e) = self.state.save(&cutoff).await {
                error!(error = %e, "failed to persist cutoff, next run will report these events again");
                return Err(e);
            }
            summary.new_cutoff = Some(cutoff);
        }

        info!(
            sender = self.sender.name(),
            records = summary.records,
            new_cutoff = ?summary.new_cutoff.as_ref().map(TimestampKey::as_str),
            "report run complete"
        );
        Ok(summary)
    }
}

/// 리포트 파이프라인 빌더
pub struct ReportPipelineBuilder<S: ReportSender> {
    config: Option<PipelineConfig>,
    sender: Option<S>,
}

impl<S: ReportSender> ReportPipelineBuilder<S> {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: None,
            sender: None,
        }
    }

    /// 파이프라인 설정을 지정합니다.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// 리포트 전송기를 지정합니다.
    pub fn sender(mut self, sender: S) -> Self {
        self.sender = Some(sender);
        self
    }

    /// 설정을 검증하고 파이프라인을 생성합니다.
    pub fn build(self) -> Result<ReportPipeline<S>, LogPipelineError> {
        let config = self.config.ok_or_else(|| LogPipelineError::Config {
            field: "pipeline".to_owned(),
            reason: "pipeline config is required".to_owned(),
        })?;
        let sender = self.sender.ok_or_else(|| LogPipelineError::Config {
            field: "pipeline".to_owned(),
            reason: "report sender is required".to_owned(),
        })?;

        config.validate()?;

        let parser = FirewallLogParser::new()?.with_max_line_length(config.max_line_length);
        let filter = config.event_filter();
        let state = StateStore::new(&config.state_path);

        Ok(ReportPipeline {
            config,
            parser,
            filter,
            state,
            sender,
        })
    }
}

impl<S: ReportSender> Default for ReportPipelineBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}
