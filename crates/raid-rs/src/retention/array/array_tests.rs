use super::*;
use crate::retention::disk::MemDisk;

const N: usize = 16;

fn mem_devices(count: usize, blocks: u64) -> Vec<Box<dyn BlockDevice>> {
    (0..count)
        .map(|_| Box::new(MemDisk::new(N, blocks)) as Box<dyn BlockDevice>)
        .collect()
}

#[test]
fn new_numbers_disks_from_one_and_marks_them_valid() {
    let array = Array::<N>::new(mem_devices(4, 8)).expect("array");
    assert_eq!(array.disk_count(), 4);
    let ids: Vec<u32> = array.slots().map(DiskSlot::id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    assert!(array.validity().iter().all(|&v| v));
    assert!(array.invalid_disks().is_empty());
}

#[test]
fn last_block_is_reserved_for_metadata() {
    let array = Array::<N>::new(mem_devices(2, 8)).expect("array");
    assert_eq!(array.disk_blocks(), 7);
    assert_eq!(array.meta_block(), 7);
}

#[test]
fn mismatched_devices_are_rejected() {
    let mut devices = mem_devices(2, 8);
    devices.push(Box::new(MemDisk::new(N, 9)));
    assert!(matches!(Array::<N>::new(devices), Err(RaidError::Config(_))));

    let wrong_block: Vec<Box<dyn BlockDevice>> = vec![Box::new(MemDisk::new(N * 2, 8))];
    assert!(matches!(
        Array::<N>::new(wrong_block),
        Err(RaidError::Config(_))
    ));

    assert!(matches!(
        Array::<N>::new(mem_devices(2, 1)),
        Err(RaidError::Config(_))
    ));
    assert!(matches!(
        Array::<N>::new(Vec::new()),
        Err(RaidError::Config(_))
    ));
}

#[test]
fn index_of_accepts_only_one_based_ids() {
    let array = Array::<N>::new(mem_devices(3, 4)).expect("array");
    assert_eq!(array.index_of(1).expect("disk 1"), 0);
    assert_eq!(array.index_of(3).expect("disk 3"), 2);
    assert!(matches!(array.index_of(0), Err(RaidError::InvalidDiskId(0))));
    assert!(matches!(array.index_of(4), Err(RaidError::InvalidDiskId(4))));
}

#[test]
fn set_valid_toggles_state() {
    let array = Array::<N>::new(mem_devices(3, 4)).expect("array");
    array.set_valid(1, false);
    assert!(!array.is_valid(1));
    assert_eq!(array.invalid_disks(), vec![1]);
    array.set_valid(1, true);
    assert!(array.is_valid(1));
    assert!(!array.is_valid(99), "unknown index is never valid");
}

#[test]
fn blocks_roundtrip_through_handles() {
    let array = Array::<N>::new(mem_devices(2, 4)).expect("array");
    array
        .write_block(1, 2, &Bits::filled(0x33))
        .expect("write");

    let mut back = Bits::<N>::zero();
    array.read_block(1, 2, &mut back).expect("read");
    assert_eq!(back, Bits::filled(0x33));

    array.read_block(0, 2, &mut back).expect("read other disk");
    assert!(back.is_zero());
}

#[test]
fn lock_many_orders_and_dedups() {
    let array = Array::<N>::new(mem_devices(4, 4)).expect("array");
    let mut set = array.lock_many(&[3, 1, 3]);
    assert_eq!(set.indices(), vec![1, 3]);

    set.write(3, 0, &Bits::filled(7)).expect("write held disk");
    let mut buf = Bits::zero();
    set.read(3, 0, &mut buf).expect("read held disk");
    assert_eq!(buf, Bits::filled(7));

    assert!(matches!(
        set.read(2, 0, &mut buf),
        Err(RaidError::Config(_))
    ));
}

#[test]
fn lock_all_holds_every_disk() {
    let array = Array::<N>::new(mem_devices(3, 4)).expect("array");
    let set = array.lock_all();
    assert_eq!(set.indices(), vec![0, 1, 2]);
}
