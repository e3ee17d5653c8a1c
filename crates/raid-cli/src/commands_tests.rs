use clap::Parser;
use raid_rs::Scheme;
use tempfile::TempDir;

use crate::cli::{ArrayArgs, Cli, Command, RaidMode};
use crate::commands::run;
use crate::disks::{disk_paths, open_engine};

fn array_args(dir: &TempDir) -> ArrayArgs {
    ArrayArgs {
        disk_dir: dir.path().join("disks"),
        disks: 4,
        disk_blocks: 33,
        cluster_size: 4,
    }
}

/// Boots a fresh engine over the images, runs one command and returns its output.
fn exec(args: &ArrayArgs, command: Command) -> anyhow::Result<String> {
    let engine = open_engine(args)?;
    let mut out = Vec::new();
    run(&engine, &command, &mut out)?;
    Ok(String::from_utf8(out).expect("utf-8 output"))
}

#[test]
fn parses_scheme_names_and_env_defaults() {
    let cli = Cli::try_parse_from(["raid-cli", "--disks", "6", "init", "raid0-1"]).expect("parse");
    assert_eq!(cli.array.disks, 6);
    assert!(matches!(cli.command, Command::Init { scheme: RaidMode::Raid01 }));
    assert_eq!(Scheme::from(RaidMode::Raid01), Scheme::Raid01);

    let cli = Cli::try_parse_from(["raid-cli", "fail", "--disk", "2"]).expect("parse");
    assert!(matches!(cli.command, Command::Fail { disk: 2 }));
    assert!(Cli::try_parse_from(["raid-cli", "init", "raid3"]).is_err());
}

#[test]
fn images_are_created_and_named_from_one() {
    let dir = TempDir::new().expect("tempdir");
    let args = array_args(&dir);
    exec(&args, Command::Info).expect("info");

    let paths = disk_paths(&args.disk_dir, 4).expect("paths");
    for (i, path) in paths.iter().enumerate() {
        assert!(path.ends_with(format!("disk-{}.img", i + 1)));
        let len = std::fs::metadata(path).expect("image exists").len();
        assert_eq!(len, 33 * crate::BLOCK_SIZE as u64);
    }
}

#[test]
fn bytes_survive_between_invocations() {
    let dir = TempDir::new().expect("tempdir");
    let args = array_args(&dir);

    let out = exec(&args, Command::Init { scheme: RaidMode::Raid5 }).expect("init");
    assert!(out.contains("RAID5 selected, 96 blocks"));

    exec(
        &args,
        Command::WriteBytes {
            offset: 1020,
            data: "hello, parity".into(),
        },
    )
    .expect("write");
    let out = exec(&args, Command::ReadBytes { offset: 1020, len: 13 }).expect("read");
    assert_eq!(out.trim_end(), "hello, parity");

    let out = exec(&args, Command::Status).expect("status");
    assert!(out.contains("scheme: RAID5"));
    assert!(out.contains("parity clusters loaded: 1/8"));
}

#[test]
fn fill_fail_repair_verify_cycle() {
    for seed in [None, Some(7)] {
        let dir = TempDir::new().expect("tempdir");
        let args = array_args(&dir);
        exec(&args, Command::Init { scheme: RaidMode::Raid4 }).expect("init");
        exec(&args, Command::Fill { blocks: None, seed }).expect("fill");

        exec(&args, Command::Fail { disk: 2 }).expect("fail");
        let out = exec(&args, Command::Verify { blocks: None, seed }).expect("degraded verify");
        assert!(out.contains("verified 96 blocks: 0 mismatched, 0 unreadable"));

        exec(&args, Command::Repair { disk: 2 }).expect("repair");
        exec(&args, Command::Fail { disk: 1 }).expect("fail another");
        exec(&args, Command::Verify { blocks: None, seed }).expect("verify after repair");
    }
}

#[test]
fn verify_reports_wrong_content() {
    let dir = TempDir::new().expect("tempdir");
    let args = array_args(&dir);
    exec(&args, Command::Init { scheme: RaidMode::Raid1 }).expect("init");
    exec(&args, Command::Fill { blocks: Some(4), seed: Some(1) }).expect("fill");

    assert!(exec(&args, Command::Verify { blocks: Some(4), seed: Some(2) }).is_err());
    assert!(exec(&args, Command::Fill { blocks: Some(1_000), seed: None }).is_err());
}

#[test]
fn fill_needs_a_scheme() {
    let dir = TempDir::new().expect("tempdir");
    let args = array_args(&dir);
    assert!(exec(&args, Command::Fill { blocks: None, seed: None }).is_err());
}

#[test]
fn destroyed_array_refuses_to_boot() {
    let dir = TempDir::new().expect("tempdir");
    let args = array_args(&dir);
    exec(&args, Command::Init { scheme: RaidMode::Raid0 }).expect("init");
    let out = exec(&args, Command::Destroy).expect("destroy");
    assert!(out.contains("array destroyed"));

    let err = exec(&args, Command::Status).expect_err("boot after destroy");
    assert!(format!("{err:#}").contains("destroyed"));
}
