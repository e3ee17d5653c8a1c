use crate::retention::disk::{BlockDevice, Disk, MemDisk};
use rand::RngCore;
use tempfile::NamedTempFile;

const BLOCK: usize = 512;
const BLOCKS: u64 = 64;

#[test]
fn open_prealloc_creates_and_sizes_file() {
    let tf = NamedTempFile::new().expect("tmp file");

    let d = Disk::open_prealloc(tf.path(), BLOCK, BLOCKS).expect("open_prealloc");
    assert_eq!(d.len(), BLOCK as u64 * BLOCKS, "disk length must match requested");
    assert_eq!(d.block_count(), BLOCKS);
    assert_eq!(d.block_size(), BLOCK);
    let meta = std::fs::metadata(tf.path()).expect("metadata");
    assert_eq!(meta.len(), BLOCK as u64 * BLOCKS, "backing file must be pre-sized");
    assert!(d.created, "empty temp file counts as freshly created");
}

#[test]
fn initial_reads_are_zero_filled() {
    let tf = NamedTempFile::new().expect("tmp file");
    let mut d = Disk::open_prealloc(tf.path(), BLOCK, BLOCKS).expect("open_prealloc");

    let mut buf = vec![0xAAu8; BLOCK];
    d.read_block(BLOCKS - 1, &mut buf).expect("read last block");
    assert!(
        buf.iter().all(|&b| b == 0),
        "newly allocated space should read as zeros"
    );
}

#[test]
fn write_then_read_roundtrip_same_session() {
    let tf = NamedTempFile::new().expect("tmp file");
    let mut d = Disk::open_prealloc(tf.path(), BLOCK, BLOCKS).expect("open_prealloc");

    let mut data = vec![0u8; BLOCK];
    rand::rng().fill_bytes(&mut data);
    d.write_block(17, &data).expect("write");

    let mut back = vec![0u8; BLOCK];
    d.read_block(17, &mut back).expect("read");
    assert_eq!(back, data, "roundtrip must match");

    d.read_block(16, &mut back).expect("read neighbour");
    assert!(back.iter().all(|&b| b == 0), "neighbour block untouched");
}

#[test]
fn durability_reopen_and_read_back() {
    let tf = NamedTempFile::new().expect("tmp file");

    {
        let mut d = Disk::open_prealloc(tf.path(), BLOCK, BLOCKS).expect("open_prealloc");
        let mut payload = vec![0u8; BLOCK];
        payload[..16].copy_from_slice(b"hello-from-mmap!");
        d.write_block(BLOCKS / 2, &payload).expect("write");
        d.flush().expect("flush");
    }

    {
        let mut d2 = Disk::open_prealloc(tf.path(), BLOCK, BLOCKS).expect("reopen");
        assert!(!d2.created, "reopened image is not new");
        let mut buf = vec![0u8; BLOCK];
        d2.read_block(BLOCKS / 2, &mut buf).expect("read");
        assert_eq!(&buf[..16], b"hello-from-mmap!");
    }
}

#[test]
fn out_of_range_block_is_rejected() {
    let tf = NamedTempFile::new().expect("tmp file");
    let mut d = Disk::open_prealloc(tf.path(), BLOCK, BLOCKS).expect("open_prealloc");

    let mut buf = vec![0u8; BLOCK];
    let err = d.read_block(BLOCKS, &mut buf).expect_err("past the end");
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
    assert!(d.write_block(BLOCKS + 3, &buf).is_err());
}

#[test]
fn short_buffer_is_rejected() {
    let mut d = MemDisk::new(BLOCK, BLOCKS);
    let mut small = vec![0u8; BLOCK - 1];
    assert!(d.read_block(0, &mut small).is_err());
    assert!(d.write_block(0, &small).is_err());
}

#[test]
fn mem_disk_roundtrips_blocks() {
    let mut d = MemDisk::new(BLOCK, BLOCKS);
    let data = vec![0x5Au8; BLOCK];
    d.write_block(3, &data).expect("write");

    let mut back = vec![0u8; BLOCK];
    d.read_block(3, &mut back).expect("read");
    assert_eq!(back, data);
    d.read_block(4, &mut back).expect("read");
    assert!(back.iter().all(|&b| b == 0));
}
