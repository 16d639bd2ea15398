/*!
 * thermstats_grab: Log Parser
 * ---------------------------
 * Copyright (C) 2025 Laurence Oberman <loberman@redhat.com>
 * License: GPL v3+
 *
 * Turns a daily log file back into aligned columns for graphing.
 *
 * Each line is classified into exactly one token. CPU lines carry their
 * own label, but GPU values are generic `Temperature:` / `Load:` lines that
 * only mean something after a `GPU <id> - <name>:` header, so a small state
 * machine tracks whether a GPU header is waiting for its values:
 *
 *   Scanning --GPU header--> AwaitingGpuValue --temp+load consumed--> Scanning
 *
 * A new GPU header re-arms the machine; a Timestamp or separator line forces
 * it back to Scanning. Any slot a header never received is filled with the
 * missing marker so GPU temperature and load stay aligned per device block.
 * The CPU lines of a record are tracked the same way: a record cut short
 * (sampler killed mid-write) still contributes one row to every CPU column.
 */

use std::fs::File;
use std::borrow::Cow;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::*;

use crate::error::ParseError;
use crate::record::SEPARATOR;

static TIMESTAMP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Timestamp: (.*)").unwrap());
static CPU_USAGE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"CPU Usage: (\S*)%").unwrap());
static CPU_TEMP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"CPU Temperature: (\S*)°C").unwrap());
static GPU_TEMP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Temperature: (\S*)°C").unwrap());
static GPU_LOAD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"Load: (\S*)%").unwrap());

const NOT_AVAILABLE: &str = "N/A";

/// Columnar view of one log file. `None` marks a missing value; every
/// column has the same length after parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedSeries {
    /// Kept as text; padded rows are empty strings
    pub timestamp: Vec<String>,
    pub cpu_usage: Vec<Option<f64>>,
    pub cpu_temp: Vec<Option<f64>>,
    /// GPU columns are aligned by position, not by timestamp
    pub gpu_temp: Vec<Option<f64>>,
    pub gpu_load: Vec<Option<f64>>,
}

impl ParsedSeries {
    pub fn len(&self) -> usize {
        self.timestamp.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamp.is_empty()
    }

    /// Right-pad every column to the longest one.
    fn pad(&mut self) {
        let rows = [
            self.timestamp.len(),
            self.cpu_usage.len(),
            self.cpu_temp.len(),
            self.gpu_temp.len(),
            self.gpu_load.len(),
        ]
        .into_iter()
        .max()
        .unwrap_or(0);

        self.timestamp.resize(rows, String::new());
        self.cpu_usage.resize(rows, None);
        self.cpu_temp.resize(rows, None);
        self.gpu_temp.resize(rows, None);
        self.gpu_load.resize(rows, None);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Timestamp(&'a str),
    CpuUsage(&'a str),
    CpuTemperature(&'a str),
    GpuHeader,
    Temperature(&'a str),
    Load(&'a str),
    Separator,
    Other,
}

fn capture<'a>(re: &Regex, line: &'a str) -> Option<&'a str> {
    re.captures(line).and_then(|c| c.get(1)).map(|m| m.as_str())
}

fn tokenize(line: &str) -> Token<'_> {
    if let Some(ts) = capture(&TIMESTAMP_RE, line) {
        return Token::Timestamp(ts.trim());
    }
    if let Some(v) = capture(&CPU_USAGE_RE, line) {
        return Token::CpuUsage(v);
    }
    if let Some(v) = capture(&CPU_TEMP_RE, line) {
        return Token::CpuTemperature(v);
    }
    if line.contains("GPU") {
        return Token::GpuHeader;
    }
    if let Some(v) = capture(&GPU_TEMP_RE, line) {
        return Token::Temperature(v);
    }
    if let Some(v) = capture(&GPU_LOAD_RE, line) {
        return Token::Load(v);
    }
    if line.trim_end() == SEPARATOR {
        return Token::Separator;
    }
    Token::Other
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GpuState {
    Scanning,
    /// Armed by a GPU header; flags are the values still expected
    AwaitingGpuValue { temperature: bool, load: bool },
}

/// CPU lines still expected by the record opened by the last Timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingCpu {
    usage: bool,
    temperature: bool,
}

struct LogParser<'a> {
    origin: &'a str,
    state: GpuState,
    cpu: Option<PendingCpu>,
    series: ParsedSeries,
}

impl<'a> LogParser<'a> {
    fn new(origin: &'a str) -> Self {
        Self {
            origin,
            state: GpuState::Scanning,
            cpu: None,
            series: ParsedSeries::default(),
        }
    }

    fn number(&self, lineno: usize, field: &str, text: &str) -> Option<f64> {
        match text.parse::<f64>() {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(
                    "{}:{}: malformed {} value {:?} ({}), recording as missing",
                    self.origin, lineno, field, text, e
                );
                None
            }
        }
    }

    /// Fill any value the current GPU header never received.
    fn disarm(&mut self) {
        if let GpuState::AwaitingGpuValue { temperature, load } = self.state {
            if temperature {
                self.series.gpu_temp.push(None);
            }
            if load {
                self.series.gpu_load.push(None);
            }
        }
        self.state = GpuState::Scanning;
    }

    /// Close the current record, filling CPU slots it never received.
    fn close_record(&mut self) {
        self.disarm();
        if let Some(pending) = self.cpu.take() {
            if pending.usage {
                self.series.cpu_usage.push(None);
            }
            if pending.temperature {
                self.series.cpu_temp.push(None);
            }
        }
    }

    fn feed(&mut self, lineno: usize, line: &str) {
        match tokenize(line) {
            Token::Timestamp(ts) => {
                self.close_record();
                self.series.timestamp.push(ts.to_string());
                self.cpu = Some(PendingCpu {
                    usage: true,
                    temperature: true,
                });
            }
            Token::Separator => self.close_record(),
            Token::CpuUsage(v) => {
                let usage = self.number(lineno, "CPU usage", v);
                self.series.cpu_usage.push(usage);
                if let Some(pending) = self.cpu.as_mut() {
                    pending.usage = false;
                }
            }
            Token::CpuTemperature(v) => {
                let temp = if v == NOT_AVAILABLE {
                    None
                } else {
                    self.number(lineno, "CPU temperature", v)
                };
                self.series.cpu_temp.push(temp);
                if let Some(pending) = self.cpu.as_mut() {
                    pending.temperature = false;
                }
            }
            Token::GpuHeader => {
                self.disarm();
                self.state = GpuState::AwaitingGpuValue {
                    temperature: true,
                    load: true,
                };
            }
            Token::Temperature(v) => {
                if let GpuState::AwaitingGpuValue { temperature: true, load } = self.state {
                    let temp = self.number(lineno, "GPU temperature", v);
                    self.series.gpu_temp.push(temp);
                    self.state = if load {
                        GpuState::AwaitingGpuValue { temperature: false, load }
                    } else {
                        GpuState::Scanning
                    };
                }
            }
            Token::Load(v) => {
                if let GpuState::AwaitingGpuValue { temperature, load: true } = self.state {
                    let load = self.number(lineno, "GPU load", v);
                    self.series.gpu_load.push(load);
                    self.state = if temperature {
                        GpuState::AwaitingGpuValue { temperature, load: false }
                    } else {
                        GpuState::Scanning
                    };
                }
            }
            Token::Other => {}
        }
    }

    fn finish(mut self) -> ParsedSeries {
        self.close_record();
        self.series.pad();
        self.series
    }
}

/// Parse log text from any buffered reader. `origin` names the source in
/// diagnostics. Bytes that are not UTF-8 (a write cut inside `°`) are
/// replaced and the line parsed as far as it goes.
pub fn parse_reader<R: BufRead>(mut reader: R, origin: &str) -> std::io::Result<ParsedSeries> {
    let mut parser = LogParser::new(origin);
    let mut buf = Vec::new();
    let mut lineno = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        lineno += 1;
        let raw = buf.strip_suffix(b"\n").unwrap_or(&buf);
        let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
        let line = String::from_utf8_lossy(raw);
        if let Cow::Owned(_) = line {
            warn!("{origin}:{lineno}: invalid UTF-8, damaged bytes replaced");
        }
        parser.feed(lineno, &line);
    }
    Ok(parser.finish())
}

/// Parse one daily log file into aligned columns.
pub fn parse_log_file(path: &Path) -> Result<ParsedSeries, ParseError> {
    let to_err = |source| ParseError::Io {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(to_err)?;
    let origin = path.display().to_string();
    let series = parse_reader(BufReader::new(file), &origin).map_err(to_err)?;
    debug!("Parsed {} rows from {}", series.len(), origin);
    Ok(series)
}
