use std::thread;

use super::*;
use crate::testing::{gated_array, mem_array, settle, wait_until};

const N: usize = 32;

#[test]
fn write_mirrors_to_both_members_and_read_returns_it() {
    let array = mem_array::<N>(2, 8);
    let pair = MirrorPair::new(0, [Some(0), Some(1)]);

    pair.write(&array, 3, &Bits::filled(0x42)).expect("write");

    for disk in 0..2 {
        let mut raw = Bits::zero();
        array.read_block(disk, 3, &mut raw).expect("raw read");
        assert_eq!(raw, Bits::filled(0x42), "disk {disk}");
    }

    let mut out = Bits::zero();
    pair.read(&array, 3, &mut out).expect("read");
    assert_eq!(out, Bits::filled(0x42));
    assert_eq!(pair.flags(), (false, [false, false]), "flags cleared");
}

#[test]
fn degraded_pair_serves_from_survivor() {
    let array = mem_array::<N>(2, 8);
    let pair = MirrorPair::new(0, [Some(0), Some(1)]);
    array.set_valid(0, false);

    pair.write(&array, 1, &Bits::filled(9)).expect("degraded write");
    let mut raw = Bits::zero();
    array.read_block(0, 1, &mut raw).expect("raw read");
    assert!(raw.is_zero(), "failed member is skipped");

    let mut out = Bits::zero();
    pair.read(&array, 1, &mut out).expect("degraded read");
    assert_eq!(out, Bits::filled(9));
}

#[test]
fn both_members_invalid_is_pair_unavailable() {
    let array = mem_array::<N>(2, 8);
    let pair = MirrorPair::new(4, [Some(0), Some(1)]);
    array.set_valid(0, false);
    array.set_valid(1, false);

    let mut out = Bits::zero();
    assert!(matches!(
        pair.read(&array, 0, &mut out),
        Err(RaidError::PairUnavailable { pair: 4 })
    ));
    assert!(matches!(
        pair.write(&array, 0, &out),
        Err(RaidError::PairUnavailable { pair: 4 })
    ));
}

#[test]
fn missing_member_counts_as_invalid() {
    let array = mem_array::<N>(3, 8);
    let pair = MirrorPair::new(1, [Some(2), None]);

    pair.write(&array, 0, &Bits::filled(1)).expect("single member write");
    let mut out = Bits::zero();
    pair.read(&array, 0, &mut out).expect("single member read");
    assert_eq!(out, Bits::filled(1));

    array.set_valid(2, false);
    assert!(pair.read(&array, 0, &mut out).is_err());
}

#[test]
fn resync_copies_every_block_and_marks_valid() {
    let array = mem_array::<N>(2, 6);
    let pair = MirrorPair::new(0, [Some(0), Some(1)]);
    for block in 0..array.disk_blocks() {
        let byte = u8::try_from(block + 1).expect("fits");
        pair.write(&array, block, &Bits::filled(byte)).expect("write");
    }

    array.set_valid(1, false);
    pair.write(&array, 2, &Bits::filled(0xEE)).expect("degraded write");
    array.write_block(1, 4, &Bits::filled(0xBA)).expect("scribble");

    pair.resync(&array, 1).expect("resync");
    assert!(array.is_valid(1));

    for block in 0..array.disk_blocks() {
        let mut a = Bits::zero();
        let mut b = Bits::zero();
        array.read_block(0, block, &mut a).expect("read source");
        array.read_block(1, block, &mut b).expect("read target");
        assert_eq!(a, b, "block {block} must match after resync");
    }
}

#[test]
fn resync_without_valid_partner_fails() {
    let array = mem_array::<N>(2, 6);
    let pair = MirrorPair::new(0, [Some(0), Some(1)]);
    array.set_valid(0, false);
    array.set_valid(1, false);
    assert!(matches!(
        pair.resync(&array, 1),
        Err(RaidError::PairUnavailable { .. })
    ));
    assert!(!array.is_valid(1));
}

#[test]
fn readers_on_distinct_members_run_in_parallel() {
    let (array, gate) = gated_array::<N>(2, 8);
    let pair = MirrorPair::new(0, [Some(0), Some(1)]);
    gate.close();

    thread::scope(|s| {
        for _ in 0..2 {
            s.spawn(|| {
                let mut out = Bits::zero();
                pair.read(&array, 0, &mut out).expect("read");
            });
        }
        wait_until("both readers inside the device", || gate.reads() == 2);
        assert_eq!(pair.flags(), (false, [true, true]));
        gate.open();
    });

    assert_eq!(pair.flags(), (false, [false, false]));
}

#[test]
fn writer_waits_for_active_readers() {
    let (array, gate) = gated_array::<N>(2, 8);
    let pair = MirrorPair::new(0, [Some(0), Some(1)]);
    gate.close();

    thread::scope(|s| {
        s.spawn(|| {
            let mut out = Bits::zero();
            pair.read(&array, 0, &mut out).expect("read");
        });
        wait_until("reader inside the device", || gate.reads() == 1);

        s.spawn(|| {
            pair.write(&array, 0, &Bits::filled(5)).expect("write");
        });
        settle();
        assert_eq!(gate.writes(), 0, "writer must not start while a reader is active");
        assert!(!pair.flags().0, "writer not yet marked active");

        gate.open();
    });

    assert_eq!(gate.writes(), 2, "writer reached both members once readers left");
}

#[test]
fn no_reader_starts_while_writer_is_active() {
    let (array, gate) = gated_array::<N>(2, 8);
    let pair = MirrorPair::new(0, [Some(0), Some(1)]);
    gate.close();

    thread::scope(|s| {
        s.spawn(|| {
            pair.write(&array, 0, &Bits::filled(5)).expect("write");
        });
        wait_until("writer inside the device", || gate.writes() == 1);
        assert!(pair.flags().0);

        s.spawn(|| {
            let mut out = Bits::zero();
            pair.read(&array, 0, &mut out).expect("read");
            assert_eq!(out, Bits::filled(5), "reader sees the completed write");
        });
        settle();
        assert_eq!(gate.reads(), 0, "reader must wait for the writer");

        gate.open();
    });

    assert_eq!(gate.reads(), 1);
}
