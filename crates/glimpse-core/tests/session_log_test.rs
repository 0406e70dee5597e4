//! Integration test: session logger
//!
//! Runs real capture sessions against files in the temp directory and
//! checks the header, the environment row and sample accounting across
//! buffer rotations.
//!
//! Run with: cargo test --test session_log_test -- --nocapture

use glimpse_core::session_log::{LogSample, SessionLogger, LOG_BUF_SIZE};
use glimpse_core::telemetry::SystemInfo;

fn test_info() -> SystemInfo {
    SystemInfo {
        os: "TestOS".to_string(),
        cpu: "TestCPU".to_string(),
        gpu: "TestGPU".to_string(),
        ram: "16 GiB".to_string(),
        kernel: "6.1.0".to_string(),
        driver: "1.2.3".to_string(),
    }
}

fn unique_base(tag: &str) -> String {
    format!(
        "{}/glimpse-session-{}-{}",
        std::env::temp_dir().display(),
        std::process::id(),
        tag
    )
}

/// The one file the session wrote (base + timestamp suffix).
fn session_file(base: &str) -> std::path::PathBuf {
    let base_path = std::path::Path::new(base);
    let dir = base_path.parent().unwrap();
    let prefix = base_path.file_name().unwrap().to_str().unwrap();
    let mut matches: Vec<_> = std::fs::read_dir(dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix))
        })
        .collect();
    match matches.len() {
        1 => matches.remove(0),
        n => panic!("expected exactly one session file for {}, got {}", base, n),
    }
}

fn sample(frametime_us: u64) -> LogSample {
    LogSample {
        fps: 60.0,
        frametime_us,
        cpu_load: 25,
        gpu_load: 80,
        elapsed_us: 0,
    }
}

#[test]
fn test_header_and_environment_rows() {
    let base = unique_base("header");
    let mut logger = SessionLogger::new(base.clone(), test_info());

    logger.start(1_000, 0);
    logger.push(17_000, sample(16_000));
    logger.stop();

    let path = session_file(&base);
    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    if lines.len() != 3 {
        panic!("expected 3 lines, got {}: {:?}", lines.len(), lines);
    }
    if lines[0] != "os,cpu,gpu,ram,kernel,driver" {
        panic!("expected the header row, got {:?}", lines[0]);
    }
    if lines[1] != "TestOS,TestCPU,TestGPU,16 GiB,6.1.0,1.2.3" {
        panic!("expected the environment row, got {:?}", lines[1]);
    }
    // frametime_us,fps,cpu_load,gpu_load,elapsed_us
    if lines[2] != "16000,60,25,80,16000" {
        panic!("expected the sample row, got {:?}", lines[2]);
    }

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_rotation_loses_nothing() {
    let base = unique_base("rotate");
    let mut logger = SessionLogger::new(base.clone(), test_info());

    let total = LOG_BUF_SIZE + 5;
    logger.start(0, 0);
    for i in 0..total {
        // One rotation fires when the write buffer fills at LOG_BUF_SIZE.
        logger.push((i as u64 + 1) * 16_000, sample(16_000));
    }
    logger.stop();

    if logger.dropped_samples() != 0 {
        panic!("expected no drops, got {}", logger.dropped_samples());
    }

    let path = session_file(&base);
    let content = std::fs::read_to_string(&path).unwrap();
    let rows = content.lines().count();
    if rows != 2 + total {
        panic!("expected {} lines, got {}", 2 + total, rows);
    }
    // Elapsed must be monotonic across the rotation boundary.
    let elapsed: Vec<u64> = content
        .lines()
        .skip(2)
        .map(|l| l.rsplit(',').next().unwrap().parse().unwrap())
        .collect();
    for pair in elapsed.windows(2) {
        if pair[1] <= pair[0] {
            panic!("expected monotonic elapsed, got {:?}", pair);
        }
    }

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_duration_limit_stops_the_session() {
    let base = unique_base("duration");
    let mut logger = SessionLogger::new(base.clone(), test_info());

    logger.start(0, 1);
    logger.push(500_000, sample(16_000));
    // Past the 1 s limit: the push stops the session instead of logging.
    logger.push(1_500_000, sample(16_000));

    if logger.is_active() {
        panic!("expected the session to stop at the duration limit");
    }

    let path = session_file(&base);
    let rows = std::fs::read_to_string(&path).unwrap().lines().count();
    if rows != 3 {
        panic!("expected 3 lines (one sample), got {}", rows);
    }

    let _ = std::fs::remove_file(&path);
}

#[test]
fn test_stop_without_start_is_a_noop() {
    let base = unique_base("noop");
    let mut logger = SessionLogger::new(base.clone(), test_info());
    logger.stop();
    logger.push(1_000, sample(16_000));

    let dir = std::env::temp_dir();
    let leaked = std::fs::read_dir(&dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .any(|e| {
            e.file_name()
                .to_str()
                .is_some_and(|n| format!("{}/{}", dir.display(), n).starts_with(&base))
        });
    if leaked {
        panic!("expected no file without an active session");
    }
}

#[test]
fn test_sessions_get_distinct_files() {
    let base = unique_base("multi");
    let mut logger = SessionLogger::new(base.clone(), test_info());

    logger.start(0, 0);
    logger.push(16_000, sample(16_000));
    logger.stop();

    // Same second means the same timestamp suffix; appending is acceptable
    // there, so force a distinct suffix.
    std::thread::sleep(std::time::Duration::from_millis(1100));

    logger.start(0, 0);
    logger.push(16_000, sample(16_000));
    logger.stop();

    let base_path = std::path::Path::new(&base);
    let prefix = base_path.file_name().unwrap().to_str().unwrap();
    let files: Vec<_> = std::fs::read_dir(base_path.parent().unwrap())
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(prefix))
        })
        .collect();
    if files.len() != 2 {
        panic!("expected 2 session files, got {}: {:?}", files.len(), files);
    }
    for f in files {
        let _ = std::fs::remove_file(f);
    }
}
