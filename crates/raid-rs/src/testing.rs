//! Test-only block devices and helpers.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::retention::array::Array;
use crate::retention::disk::{BlockDevice, MemDisk};

/// Gate blocks device I/O while closed and counts operations that reached the device.
#[derive(Default)]
pub struct Gate {
    closed: Mutex<bool>,
    cond: Condvar,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
}

impl Gate {
    pub fn close(&self) {
        *self.closed.lock() = true;
    }

    pub fn open(&self) {
        *self.closed.lock() = false;
        self.cond.notify_all();
    }

    fn pass(&self) {
        let mut closed = self.closed.lock();
        while *closed {
            self.cond.wait(&mut closed);
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

/// GatedDisk is a `MemDisk` whose I/O waits on a shared gate.
pub struct GatedDisk {
    inner: MemDisk,
    gate: Arc<Gate>,
}

impl BlockDevice for GatedDisk {
    fn block_size(&self) -> usize {
        self.inner.block_size()
    }

    fn block_count(&self) -> u64 {
        self.inner.block_count()
    }

    fn read_block(&mut self, block: u64, buf: &mut [u8]) -> io::Result<()> {
        self.gate.reads.fetch_add(1, Ordering::SeqCst);
        self.gate.pass();
        self.inner.read_block(block, buf)
    }

    fn write_block(&mut self, block: u64, buf: &[u8]) -> io::Result<()> {
        self.gate.writes.fetch_add(1, Ordering::SeqCst);
        self.gate.pass();
        self.inner.write_block(block, buf)
    }
}

/// SharedDisk lets several arrays in one test see the same `MemDisk`, so an
/// engine can be booted again over the devices of a dropped one.
#[derive(Clone)]
pub struct SharedDisk(Arc<Mutex<MemDisk>>);

impl SharedDisk {
    pub fn new(block_size: usize, blocks: u64) -> Self {
        Self(Arc::new(Mutex::new(MemDisk::new(block_size, blocks))))
    }
}

impl BlockDevice for SharedDisk {
    fn block_size(&self) -> usize {
        self.0.lock().block_size()
    }

    fn block_count(&self) -> u64 {
        self.0.lock().block_count()
    }

    fn read_block(&mut self, block: u64, buf: &mut [u8]) -> io::Result<()> {
        self.0.lock().read_block(block, buf)
    }

    fn write_block(&mut self, block: u64, buf: &[u8]) -> io::Result<()> {
        self.0.lock().write_block(block, buf)
    }
}

pub fn shared_disks(disks: usize, block_size: usize, blocks: u64) -> Vec<SharedDisk> {
    (0..disks).map(|_| SharedDisk::new(block_size, blocks)).collect()
}

pub fn shared_array<const N: usize>(disks: &[SharedDisk]) -> Array<N> {
    let devices = disks
        .iter()
        .map(|d| Box::new(d.clone()) as Box<dyn BlockDevice>)
        .collect();
    Array::new(devices).expect("shared array")
}

pub fn mem_array<const N: usize>(disks: usize, device_blocks: u64) -> Array<N> {
    let devices = (0..disks)
        .map(|_| Box::new(MemDisk::new(N, device_blocks)) as Box<dyn BlockDevice>)
        .collect();
    Array::new(devices).expect("mem array")
}

pub fn gated_array<const N: usize>(disks: usize, device_blocks: u64) -> (Array<N>, Arc<Gate>) {
    let gate = Arc::new(Gate::default());
    let devices = (0..disks)
        .map(|_| {
            Box::new(GatedDisk {
                inner: MemDisk::new(N, device_blocks),
                gate: gate.clone(),
            }) as Box<dyn BlockDevice>
        })
        .collect();
    (Array::new(devices).expect("gated array"), gate)
}

/// Polls `pred` until it holds, panicking after a generous timeout.
pub fn wait_until(what: &str, pred: impl Fn() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(5);
    while !pred() {
        assert!(Instant::now() < deadline, "timed out waiting for {what}");
        std::thread::sleep(Duration::from_millis(2));
    }
}

/// Short pause used to give a blocked thread the chance to misbehave.
pub fn settle() {
    std::thread::sleep(Duration::from_millis(50));
}
