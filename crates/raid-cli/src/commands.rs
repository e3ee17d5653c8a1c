use std::io::Write;

use anyhow::{Context, Result, bail};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use raid_rs::layout::bits::Bits;
use raid_rs::retention::volume::Volume;
use raid_rs::{RaidEngine, Scheme};
use tracing::{info, warn};

use crate::BLOCK_SIZE;
use crate::cli::Command;

type Block = Bits<BLOCK_SIZE>;

/// Pattern produces the content `fill` writes and `verify` expects.
struct Pattern {
    rng: Option<StdRng>,
}

impl Pattern {
    fn new(seed: Option<u64>) -> Self {
        Self {
            rng: seed.map(StdRng::seed_from_u64),
        }
    }

    fn block(&mut self, index: u64) -> Block {
        let mut b = Block::zero();
        match &mut self.rng {
            Some(rng) => rng.fill_bytes(b.as_bytes_mut()),
            None => {
                for (j, byte) in b.as_bytes_mut().iter_mut().enumerate() {
                    *byte = (index.wrapping_add(j as u64) % 256) as u8;
                }
            }
        }
        b
    }
}

fn block_count(engine: &RaidEngine<BLOCK_SIZE>, blocks: Option<u64>) -> Result<u64> {
    let capacity = engine.capacity();
    if capacity == 0 {
        bail!("no RAID scheme selected; run `init` first");
    }
    let blocks = blocks.unwrap_or(capacity);
    if blocks > capacity {
        bail!("{blocks} blocks requested, capacity is {capacity}");
    }
    Ok(blocks)
}

/// `run` executes one subcommand against a booted engine, printing to `out`.
pub fn run(engine: &RaidEngine<BLOCK_SIZE>, command: &Command, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Init { scheme } => {
            let scheme = Scheme::from(*scheme);
            engine
                .select_scheme(scheme)
                .with_context(|| format!("failed to select {scheme}"))?;
            writeln!(out, "{scheme} selected, {} blocks", engine.capacity())?;
        }
        Command::Info => {
            let info = engine.info();
            writeln!(out, "block_count: {}", info.block_count)?;
            writeln!(out, "block_size: {}", info.block_size)?;
            writeln!(out, "disk_count: {}", info.disk_count)?;
        }
        Command::Status => {
            write!(out, "{}", engine.status())?;
        }
        Command::WriteBytes { offset, data } => {
            Volume::new(engine)
                .write_bytes(*offset, data.as_bytes())
                .with_context(|| format!("failed to write {} bytes at {offset}", data.len()))?;
            writeln!(out, "wrote {} bytes at {offset}", data.len())?;
        }
        Command::ReadBytes { offset, len } => {
            let mut buf = vec![0u8; *len];
            Volume::new(engine)
                .read_bytes(*offset, &mut buf)
                .with_context(|| format!("failed to read {len} bytes at {offset}"))?;
            writeln!(out, "{}", String::from_utf8_lossy(&buf))?;
        }
        Command::Fill { blocks, seed } => {
            let blocks = block_count(engine, *blocks)?;
            let mut pattern = Pattern::new(*seed);
            for vblk in 0..blocks {
                engine
                    .write(vblk, &pattern.block(vblk))
                    .with_context(|| format!("failed to write block {vblk}"))?;
            }
            info!(blocks, seed = ?seed, "fill complete");
            writeln!(out, "filled {blocks} blocks")?;
        }
        Command::Verify { blocks, seed } => {
            let blocks = block_count(engine, *blocks)?;
            let mut pattern = Pattern::new(*seed);
            let mut mismatched = 0u64;
            let mut unreadable = 0u64;
            let mut buf = Block::zero();
            for vblk in 0..blocks {
                let expected = pattern.block(vblk);
                match engine.read(vblk, &mut buf) {
                    Ok(()) if buf == expected => {}
                    Ok(()) => {
                        warn!(vblk, "block content differs");
                        mismatched += 1;
                    }
                    Err(e) => {
                        warn!(vblk, error = %e, "block unreadable");
                        unreadable += 1;
                    }
                }
            }
            writeln!(
                out,
                "verified {blocks} blocks: {mismatched} mismatched, {unreadable} unreadable"
            )?;
            if mismatched + unreadable > 0 {
                bail!("verification failed");
            }
        }
        Command::Fail { disk } => {
            engine
                .fail_disk(*disk)
                .with_context(|| format!("failed to fail disk {disk}"))?;
            writeln!(out, "disk {disk} marked failed")?;
        }
        Command::Repair { disk } => {
            engine
                .repair_disk(*disk)
                .with_context(|| format!("failed to repair disk {disk}"))?;
            writeln!(out, "disk {disk} repaired")?;
        }
        Command::Destroy => {
            engine.destroy().context("failed to destroy array")?;
            writeln!(out, "array destroyed")?;
        }
    }
    Ok(())
}
