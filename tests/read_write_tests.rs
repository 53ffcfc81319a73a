// tests/read_write_tests.rs
//
// Round-trip and failure-path tests for the reader and both writer
// variants, including retry behavior under injected transient faults.

mod common;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use bytes::Bytes;
use common::{FaultInjector, memory_fs, memory_fs_with, patterned_bytes};
use objectfs::{
    ExponentialBackoff, FsConfig, MemoryObjectClient, ObjectClient, ObjectFs, StoreError,
};
use rand::RngCore;

const MIB: usize = 1024 * 1024;

fn random_bytes(len: usize) -> Vec<u8> {
    let mut data = vec![0u8; len];
    rand::rng().fill_bytes(&mut data);
    data
}

#[tokio::test]
async fn single_shot_round_trip() -> Result<()> {
    let (_client, fs) = memory_fs();
    let payload = patterned_bytes(64 * 1024);

    let mut writer = fs.create_object("/blob.bin").await?;
    for chunk in payload.chunks(7000) {
        writer.write(chunk).await?;
    }
    assert_eq!(writer.bytes_written(), payload.len() as u64);
    writer.close().await?;

    let mut reader = fs.open_object("/blob.bin", 0);
    let read_back = reader.read_exact(payload.len()).await?;
    assert_eq!(read_back.as_ref(), payload.as_slice());
    Ok(())
}

#[tokio::test]
async fn single_shot_writer_spills_to_disk() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let config = FsConfig {
        tmp_dirs: vec![tmp.path().to_path_buf()],
        spill_threshold: 1024,
        ..FsConfig::default()
    };
    let (client, fs) = memory_fs_with(config);
    let payload = patterned_bytes(10_000);

    let mut writer = fs.create_object("/spilled.bin").await?;
    for chunk in payload.chunks(999) {
        writer.write(chunk).await?;
    }
    writer.close().await?;

    let stat = client.get_object_metadata("spilled.bin").await?.unwrap();
    assert_eq!(stat.size, payload.len() as u64);
    let mut reader = fs.open_object("/spilled.bin", 0);
    assert_eq!(reader.read_exact(payload.len()).await?.as_ref(), payload.as_slice());
    Ok(())
}

#[tokio::test]
async fn spill_skips_unusable_directories() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let config = FsConfig {
        tmp_dirs: vec![
            PathBuf::from("/nonexistent/spill/dir"),
            tmp.path().to_path_buf(),
        ],
        spill_threshold: 1024,
        ..FsConfig::default()
    };
    let (client, fs) = memory_fs_with(config);
    let payload = patterned_bytes(10_000);

    let mut writer = fs.create_object("/fallback.bin").await?;
    for chunk in payload.chunks(999) {
        writer.write(chunk).await?;
    }
    writer.close().await?;

    let stat = client.get_object_metadata("fallback.bin").await?.unwrap();
    assert_eq!(stat.size, payload.len() as u64);
    Ok(())
}

#[tokio::test]
async fn empty_object_from_writer_with_no_writes() -> Result<()> {
    let (_client, fs) = memory_fs();
    let writer = fs.create_object("/empty").await?;
    writer.close().await?;
    let stat = fs.object_status("/empty").await?.unwrap();
    assert_eq!(stat.size, 0);

    // Multipart sessions cannot complete with zero parts; a byteless close
    // must land as a plain PUT and leave no session behind.
    let config = FsConfig {
        multipart_enabled: true,
        part_size: 5 * MIB,
        ..FsConfig::default()
    };
    let (client, fs) = memory_fs_with(config);
    let writer = fs.create_object("/empty-mp").await?;
    writer.close().await?;
    assert_eq!(client.active_upload_count(), 0);
    let stat = fs.object_status("/empty-mp").await?.unwrap();
    assert_eq!(stat.size, 0);
    Ok(())
}

#[tokio::test]
async fn multipart_round_trip_across_part_boundaries() -> Result<()> {
    let config = FsConfig {
        multipart_enabled: true,
        part_size: 5 * MIB,
        ..FsConfig::default()
    };
    let (client, fs) = memory_fs_with(config);
    // 12 MiB over 5 MiB parts: two full parts plus a 2 MiB tail.
    let payload = random_bytes(12 * MIB);

    let mut writer = fs.create_object("/big.bin").await?;
    for chunk in payload.chunks(3 * MIB + 17) {
        writer.write(chunk).await?;
    }
    writer.close().await?;

    assert_eq!(client.active_upload_count(), 0);
    let stat = fs.object_status("/big.bin").await?.unwrap();
    assert_eq!(stat.size, payload.len() as u64);

    let reader = fs.open_position_read("/big.bin", stat.size);
    let read_back = reader.read_at(0, payload.len()).await?;
    assert_eq!(read_back.as_ref(), payload.as_slice());
    Ok(())
}

#[tokio::test]
async fn multipart_rejects_undersized_parts() -> Result<()> {
    let config = FsConfig {
        multipart_enabled: true,
        part_size: 1024,
        ..FsConfig::default()
    };
    let (_client, fs) = memory_fs_with(config);
    let err = fs.create_object("/tiny-parts").await.unwrap_err();
    assert!(matches!(err, StoreError::Permanent { .. }));
    Ok(())
}

#[tokio::test]
async fn multipart_failure_aborts_the_session() -> Result<()> {
    common::init_logging();
    let inner = Arc::new(MemoryObjectClient::new());
    let injector = Arc::new(FaultInjector::new(inner.clone()));
    injector.fail_part_uploads(u32::MAX);

    let config = FsConfig {
        multipart_enabled: true,
        part_size: 5 * MIB,
        ..FsConfig::default()
    };
    let fs = ObjectFs::new(injector.clone(), config)
        .with_retry_policy(Arc::new(ExponentialBackoff::new(2, Duration::from_millis(1))));

    let mut writer = fs.create_object("/doomed.bin").await?;
    writer.write(&random_bytes(5 * MIB + 1)).await?;
    let err = writer.close().await.unwrap_err();
    assert!(err.is_transient());

    // The session was aborted and nothing became addressable.
    assert_eq!(inner.active_upload_count(), 0);
    assert!(!inner.contains("doomed.bin"));
    Ok(())
}

#[tokio::test]
async fn multipart_abort_discards_buffered_data() -> Result<()> {
    let config = FsConfig {
        multipart_enabled: true,
        part_size: 5 * MIB,
        ..FsConfig::default()
    };
    let (client, fs) = memory_fs_with(config);

    let mut writer = fs.create_object("/scratch.bin").await?;
    writer.write(&random_bytes(MIB)).await?;
    writer.abort().await?;

    assert_eq!(client.active_upload_count(), 0);
    assert!(!client.contains("scratch.bin"));
    Ok(())
}

#[tokio::test]
async fn dropping_unfinished_multipart_writer_aborts() -> Result<()> {
    let config = FsConfig {
        multipart_enabled: true,
        part_size: 5 * MIB,
        ..FsConfig::default()
    };
    let (client, fs) = memory_fs_with(config);

    let mut writer = fs.create_object("/leaked.bin").await?;
    writer.write(b"pending").await?;
    assert_eq!(client.active_upload_count(), 1);
    drop(writer);

    // The abort is handed to the runtime; give it a moment to run.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(client.active_upload_count(), 0);
    Ok(())
}

#[tokio::test]
async fn reader_retries_transient_failures_without_refetching() -> Result<()> {
    common::init_logging();
    let inner = Arc::new(MemoryObjectClient::new());
    let payload = b"0123456789ab".to_vec();
    inner.put_object("flaky", Bytes::from(payload.clone())).await?;

    let injector = Arc::new(FaultInjector::new(inner));
    let config = FsConfig {
        read_chunk_size: 4,
        ..FsConfig::default()
    };
    let fs = ObjectFs::new(injector.clone(), config)
        .with_retry_policy(Arc::new(ExponentialBackoff::new(3, Duration::from_millis(1))));

    let mut reader = fs.open_object("/flaky", 0);
    // First chunk lands, then two consecutive transient failures.
    let first = reader.read_exact(4).await?;
    injector.fail_range_reads(2);
    let rest = reader.read_exact(8).await?;

    assert_eq!(first.as_ref(), &payload[..4]);
    assert_eq!(rest.as_ref(), &payload[4..]);

    // Bytes 0-3 were fetched exactly once; the retries resumed at offset 4.
    let ranges = injector.ranges();
    assert_eq!(ranges, vec![(0, 3), (4, 7), (4, 7), (4, 7), (8, 11)]);
    Ok(())
}

#[tokio::test]
async fn reader_surfaces_failure_once_retries_are_exhausted() -> Result<()> {
    let inner = Arc::new(MemoryObjectClient::new());
    inner.put_object("flaky", Bytes::from_static(b"data")).await?;

    let injector = Arc::new(FaultInjector::new(inner));
    injector.fail_range_reads(10);
    let fs = ObjectFs::new(injector.clone(), FsConfig::default())
        .with_retry_policy(Arc::new(ExponentialBackoff::new(3, Duration::from_millis(1))));

    let mut reader = fs.open_object("/flaky", 0);
    let err = reader.read_exact(4).await.unwrap_err();
    assert!(err.is_transient());
    assert_eq!(injector.ranges().len(), 3);
    Ok(())
}

#[tokio::test]
async fn missing_object_is_not_retried() -> Result<()> {
    let injector = Arc::new(FaultInjector::new(Arc::new(MemoryObjectClient::new())));
    let fs = ObjectFs::new(injector.clone(), FsConfig::default());

    let mut reader = fs.open_object("/ghost", 0);
    let err = reader.read_exact(1).await.unwrap_err();
    assert!(err.is_not_found());
    // Permanent failures surface immediately: exactly one request went out.
    assert_eq!(injector.ranges().len(), 1);
    Ok(())
}

#[tokio::test]
async fn reader_seek_and_offset_open() -> Result<()> {
    let (client, fs) = memory_fs();
    let payload = patterned_bytes(256);
    client.put_object("seekable", Bytes::from(payload.clone())).await?;

    let mut reader = fs.open_object("/seekable", 16);
    assert_eq!(reader.read_exact(8).await?.as_ref(), &payload[16..24]);
    assert_eq!(reader.position(), 24);

    reader.seek(0);
    assert_eq!(reader.read_exact(4).await?.as_ref(), &payload[..4]);

    // Reading past the end yields what remains, then EOF.
    reader.seek(250);
    assert_eq!(reader.read(100).await?.as_ref(), &payload[250..]);
    assert!(reader.read(100).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn position_reader_supports_concurrent_reads() -> Result<()> {
    let (client, fs) = memory_fs();
    let payload = patterned_bytes(8192);
    client.put_object("shared", Bytes::from(payload.clone())).await?;

    let reader = fs.open_position_read("/shared", payload.len() as u64);
    let (a, b) = tokio::join!(reader.read_at(0, 4096), reader.read_at(4096, 4096));
    assert_eq!(a?.as_ref(), &payload[..4096]);
    assert_eq!(b?.as_ref(), &payload[4096..]);

    // Reads are clamped to the declared length.
    assert_eq!(reader.read_at(8000, 1000).await?.len(), 192);
    assert!(reader.read_at(9000, 10).await?.is_empty());
    Ok(())
}
