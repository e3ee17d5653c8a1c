use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use raid_rs::metrics::{DiskOp, IoOpType, MetricsSink, RaidOp};

#[derive(Default)]
struct OpCounters {
    reads: AtomicU64,
    writes: AtomicU64,
    errors: AtomicU64,
    bytes: AtomicU64,
    latency_micros: AtomicU64,
}

impl OpCounters {
    fn record(&self, op: IoOpType, bytes: u64, latency_seconds: f64, error: bool) {
        match op {
            IoOpType::Read => self.reads.fetch_add(1, Ordering::Relaxed),
            IoOpType::Write => self.writes.fetch_add(1, Ordering::Relaxed),
        };
        if error {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
        self.bytes.fetch_add(bytes, Ordering::Relaxed);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let micros = (latency_seconds * 1e6) as u64;
        self.latency_micros.fetch_add(micros, Ordering::Relaxed);
    }

    fn snapshot(&self) -> OpTotals {
        OpTotals {
            reads: self.reads.load(Ordering::Relaxed),
            writes: self.writes.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
            latency_micros: self.latency_micros.load(Ordering::Relaxed),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct OpTotals {
    pub reads: u64,
    pub writes: u64,
    pub errors: u64,
    pub bytes: u64,
    pub latency_micros: u64,
}

impl fmt::Display for OpTotals {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "reads={} writes={} errors={} bytes={} latency_us={}",
            self.reads, self.writes, self.errors, self.bytes, self.latency_micros
        )
    }
}

/// CountingSink totals every disk and array operation of one CLI invocation.
#[derive(Default)]
pub struct CountingSink {
    disk: OpCounters,
    raid: OpCounters,
}

impl CountingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn disk_totals(&self) -> OpTotals {
        self.disk.snapshot()
    }

    pub fn raid_totals(&self) -> OpTotals {
        self.raid.snapshot()
    }
}

impl MetricsSink for CountingSink {
    fn record_disk_op(&self, op: DiskOp) {
        self.disk
            .record(op.op, op.bytes, op.latency_seconds, op.error);
    }

    fn record_raid_op(&self, op: RaidOp) {
        self.raid
            .record(op.op, op.bytes, op.latency_seconds, op.error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raid_rs::Scheme;

    #[test]
    fn counts_ops_by_kind() {
        let sink = CountingSink::default();
        sink.record_disk_op(DiskOp {
            disk_id: 1,
            op: IoOpType::Read,
            block: 0,
            bytes: 1024,
            latency_seconds: 0.25,
            error: false,
        });
        sink.record_disk_op(DiskOp {
            disk_id: 2,
            op: IoOpType::Write,
            block: 3,
            bytes: 1024,
            latency_seconds: 0.0,
            error: true,
        });
        sink.record_raid_op(RaidOp {
            scheme: Scheme::Raid1,
            op: IoOpType::Write,
            block: 3,
            bytes: 1024,
            latency_seconds: 0.0,
            error: false,
        });

        let disk = sink.disk_totals();
        assert_eq!((disk.reads, disk.writes, disk.errors), (1, 1, 1));
        assert_eq!(disk.bytes, 2048);
        assert_eq!(disk.latency_micros, 250_000);

        let raid = sink.raid_totals();
        assert_eq!((raid.reads, raid.writes, raid.errors), (0, 1, 0));
        assert_eq!(
            raid.to_string(),
            "reads=0 writes=1 errors=0 bytes=1024 latency_us=0"
        );
    }
}
