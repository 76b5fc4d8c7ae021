// Join Statistics

use std::fmt;

use crate::executor::operators::join::probe_table::ProbeStats;

/// Counters accumulated by one join instance, reported at close when
/// explain is enabled. Advisory only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JoinStats {
    /// Rows drained from the probe (materialized) side
    pub probe_rows: u64,
    /// Rows pulled from the stream side
    pub stream_rows: u64,
    /// Rows returned to the consumer, trailer rows included
    pub results: u64,
    /// Stream rows whose lookup found no candidate
    pub misses: u64,
    /// Largest bucket seen in the probe table
    pub max_bucket: usize,
    /// Probe rows that could not be keyed
    pub no_key_rows: u64,
}

impl JoinStats {
    /// Fold in the counters kept by a probe table
    pub(crate) fn with_probe(self, probe: ProbeStats) -> Self {
        JoinStats {
            probe_rows: probe.rows,
            misses: probe.misses,
            max_bucket: probe.max_bucket,
            no_key_rows: probe.no_key_rows,
            ..self
        }
    }
}

impl fmt::Display for JoinStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "probe={} stream={} results={} misses={} max_bucket={} no_key={}",
            self.probe_rows,
            self.stream_rows,
            self.results,
            self.misses,
            self.max_bucket,
            self.no_key_rows
        )
    }
}
