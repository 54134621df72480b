use std::fs;
use std::io::Read;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use flate2::read::GzDecoder;
use vehgen_core::config::{Compression, GeneratorConfig};
use vehgen_core::day::TIMESTAMP_FORMAT;
use vehgen_exec::{DayOutcome, MemoryLog, Pipeline, RunLog};
use vehgen_io::{BlobSink, FsSink, MemorySink, UploadReceipt};

const COLUMNS: &str = "vin|VARCHAR,ts|TIMESTAMP,backend_ts|TIMESTAMP,traceId|VARCHAR,\
                       gps_lon|DECIMAL,gps_lat|DECIMAL,speed|DECIMAL,ignition|BOOLEAN";

fn config(output: &Path, days: u32, parallel: usize, rows: usize) -> GeneratorConfig {
    GeneratorConfig {
        end_date: NaiveDate::from_ymd_opt(2021, 6, 30).unwrap(),
        count_of_days: days,
        count_of_cars: 10,
        rows_per_batch: rows,
        parallel_task_count: parallel,
        to_be_generated: COLUMNS.into(),
        vin_prefix: "WVW".into(),
        output_dir: output.to_string_lossy().into_owned(),
        seed: Some(42),
        ..GeneratorConfig::default()
    }
}

fn gunzip(bytes: &[u8]) -> String {
    let mut text = String::new();
    GzDecoder::new(bytes).read_to_string(&mut text).unwrap();
    text
}

fn files_under(dir: &Path) -> usize {
    if !dir.is_dir() {
        return 0;
    }
    fs::read_dir(dir).unwrap().count()
}

/// Rejects every upload, like an unreachable storage account.
struct UnreachableSink;

impl BlobSink for UnreachableSink {
    fn upload(
        &self,
        _blob_name: &str,
        _content: &mut dyn Read,
        _overwrite: bool,
    ) -> vehgen_io::Result<UploadReceipt> {
        Err(vehgen_io::Error::Storage("connection refused".into()))
    }

    fn exists(&self, _blob_name: &str) -> vehgen_io::Result<bool> {
        Ok(false)
    }

    fn list(&self, _prefix: &str) -> vehgen_io::Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Sink and log in one: records a single ordered timeline of chain events
/// and the peak number of uploads in flight.
#[derive(Default)]
struct Timeline {
    events: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl Timeline {
    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    fn position(&self, needle: &str) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .position(|e| e == needle)
            .unwrap_or_else(|| panic!("missing event {needle}"))
    }
}

impl BlobSink for Timeline {
    fn upload(
        &self,
        blob_name: &str,
        content: &mut dyn Read,
        _overwrite: bool,
    ) -> vehgen_io::Result<UploadReceipt> {
        let day = blob_name.split('/').next().unwrap_or_default().to_string();
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.push(format!("upload {day}"));

        let mut buf = Vec::new();
        content.read_to_end(&mut buf)?;
        thread::sleep(Duration::from_millis(60));

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(UploadReceipt {
            blob_name: blob_name.to_string(),
            bytes: buf.len() as u64,
            etag: None,
        })
    }

    fn exists(&self, _blob_name: &str) -> vehgen_io::Result<bool> {
        Ok(false)
    }

    fn list(&self, _prefix: &str) -> vehgen_io::Result<Vec<String>> {
        Ok(Vec::new())
    }
}

impl RunLog for Timeline {
    fn info(&self, msg: &str) {
        if let Some(day) = msg.strip_prefix("Finished CLEANUP day ") {
            self.push(format!("cleaned {day}"));
        }
    }

    fn error(&self, msg: &str) {
        self.push(format!("error {msg}"));
    }
}

#[test]
fn windows_bound_concurrency_and_run_back_to_back() {
    let out = tempfile::tempdir().unwrap();
    let timeline = Arc::new(Timeline::default());
    let pipeline = Pipeline::new(
        config(out.path(), 7, 3, 5),
        timeline.clone(),
        timeline.clone(),
    )
    .unwrap();

    let report = pipeline.run().unwrap();
    assert_eq!(report.windows, vec![3, 3, 1]);
    assert_eq!(report.count(DayOutcome::Uploaded), 7);

    let peak = timeline.peak.load(Ordering::SeqCst);
    assert!(peak <= 3, "peak {peak}");
    assert!(peak >= 2, "chains of a window did not overlap (peak {peak})");

    let windows: [&[&str]; 3] = [
        &["20210630", "20210629", "20210628"],
        &["20210627", "20210626", "20210625"],
        &["20210624"],
    ];
    for pair in windows.windows(2) {
        let last_cleanup = pair[0]
            .iter()
            .map(|day| timeline.position(&format!("cleaned {day}")))
            .max()
            .unwrap();
        for day in pair[1] {
            assert!(
                timeline.position(&format!("upload {day}")) > last_cleanup,
                "day {day} started before the previous window finished"
            );
        }
    }
}

#[test]
fn uploaded_batches_have_header_and_rows() {
    let out = tempfile::tempdir().unwrap();
    let sink = MemorySink::new();
    let pipeline = Pipeline::new(
        config(out.path(), 1, 1, 200),
        Arc::new(sink.clone()),
        Arc::new(MemoryLog::new()),
    )
    .unwrap();

    pipeline.run().unwrap();

    let blobs = sink.list("20210630/").unwrap();
    assert_eq!(blobs.len(), 1);
    assert!(blobs[0].ends_with(".csv.gz"));
    let text = gunzip(&sink.get(&blobs[0]).unwrap());

    let mut reader = csv::ReaderBuilder::new().from_reader(text.as_bytes());
    let headers = reader.headers().unwrap().clone();
    assert_eq!(headers.len(), 8);
    assert_eq!(&headers[0], "vin");

    let day = NaiveDate::from_ymd_opt(2021, 6, 30).unwrap();
    let mut rows = 0;
    for record in reader.records() {
        let record = record.unwrap();
        assert_eq!(record.len(), 8);
        assert!(record[0].starts_with("WVW"));
        let ts = NaiveDateTime::parse_from_str(&record[1], TIMESTAMP_FORMAT).unwrap();
        assert_eq!(ts.date(), day);
        rows += 1;
    }
    assert_eq!(rows, 200);
    assert_eq!(files_under(&out.path().join("20210630")), 0);
}

#[test]
fn days_count_back_from_end_date_across_month_boundary() {
    let out = tempfile::tempdir().unwrap();
    let sink = MemorySink::new();
    let mut cfg = config(out.path(), 3, 3, 5);
    cfg.end_date = NaiveDate::from_ymd_opt(2021, 3, 1).unwrap();
    let pipeline = Pipeline::new(cfg, Arc::new(sink.clone()), Arc::new(MemoryLog::new())).unwrap();

    let report = pipeline.run().unwrap();
    let mut days: Vec<_> = report.days.iter().map(|d| (d.offset, d.day.clone())).collect();
    days.sort();
    assert_eq!(
        days,
        vec![
            (0, "20210301".to_string()),
            (1, "20210228".to_string()),
            (2, "20210227".to_string()),
        ]
    );
    for day in ["20210301", "20210228", "20210227"] {
        assert_eq!(sink.list(&format!("{day}/")).unwrap().len(), 1);
    }
}

#[test]
fn blocked_day_fails_alone_and_windows_keep_going() {
    let out = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    // A regular file where the day directory should go.
    fs::write(out.path().join("20210629"), b"blocker").unwrap();

    let sink = FsSink::new(store.path());
    let log = Arc::new(MemoryLog::new());
    let pipeline =
        Pipeline::new(config(out.path(), 5, 2, 20), Arc::new(sink.clone()), log.clone()).unwrap();

    let report = pipeline.run().unwrap();

    assert_eq!(report.windows, vec![2, 2, 1]);
    assert_eq!(report.outcome_of("20210629"), Some(DayOutcome::GenerateFailed));
    assert_eq!(report.count(DayOutcome::Uploaded), 4);
    for day in ["20210630", "20210628", "20210627", "20210626"] {
        let blobs = sink.list(&format!("{day}/")).unwrap();
        assert_eq!(blobs.len(), 1, "day {day}");
        let raw = fs::read(store.path().join(&blobs[0])).unwrap();
        assert_eq!(gunzip(&raw).lines().count(), 21);
        assert_eq!(files_under(&out.path().join(day)), 0);
    }
    assert!(sink.list("20210629/").unwrap().is_empty());

    let errors = log.errors();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("20210629"));
    assert!(!log.contains("Started uploading day 20210629"));
}

#[test]
fn failed_upload_still_removes_local_file() {
    let out = tempfile::tempdir().unwrap();
    let log = Arc::new(MemoryLog::new());
    let pipeline =
        Pipeline::new(config(out.path(), 1, 1, 10), Arc::new(UnreachableSink), log.clone()).unwrap();

    let report = pipeline.run().unwrap();

    assert_eq!(report.outcome_of("20210630"), Some(DayOutcome::UploadFailed));
    assert_eq!(files_under(&out.path().join("20210630")), 0);
    assert!(log.contains("Deleting 20210630"));
    assert!(log.contains("Finished CLEANUP day 20210630"));
    assert!(log.errors().iter().any(|e| e.contains("connection refused")));
}

#[test]
fn chain_logs_follow_stage_order() {
    let out = tempfile::tempdir().unwrap();
    let log = Arc::new(MemoryLog::new());
    let pipeline =
        Pipeline::new(config(out.path(), 1, 1, 3), Arc::new(MemorySink::new()), log.clone()).unwrap();
    pipeline.run().unwrap();

    let messages: Vec<String> = log.lines().into_iter().map(|l| l.message).collect();
    let expected = [
        "Started GENERATING day 20210630",
        "Finished GENERATING day 20210630",
        "Started uploading day 20210630",
        "Finished UPLOAD of day 20210630",
        "Deleting 20210630",
        "Finished CLEANUP day 20210630",
    ];
    let positions: Vec<usize> = expected
        .iter()
        .map(|needle| messages.iter().position(|m| m.contains(needle)).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{messages:?}");
}

#[test]
fn file_uri_sink_from_config() {
    let out = tempfile::tempdir().unwrap();
    let store = tempfile::tempdir().unwrap();
    let mut cfg = config(out.path(), 2, 2, 4);
    cfg.storage_uri = Some(format!("file://{}", store.path().display()));
    cfg.container_name = "vehicle-data".into();
    cfg.compression = Compression::None;

    let pipeline = Pipeline::from_config(cfg).unwrap();
    let report = pipeline.run().unwrap();
    assert_eq!(report.count(DayOutcome::Uploaded), 2);

    let day_dir = store.path().join("vehicle-data").join("20210629");
    let entries: Vec<_> = fs::read_dir(&day_dir).unwrap().map(|e| e.unwrap().path()).collect();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].to_string_lossy().ends_with(".csv"));
    assert_eq!(fs::read_to_string(&entries[0]).unwrap().lines().count(), 5);
}

#[test]
fn seeded_runs_produce_identical_rows() {
    let render = || {
        let out = tempfile::tempdir().unwrap();
        let sink = MemorySink::new();
        let mut cfg = config(out.path(), 1, 1, 50);
        // traceId is always random; leave it out.
        cfg.to_be_generated = "vin|VARCHAR,ts|TIMESTAMP,gps_lat|DECIMAL,rpm|SMALLINT".into();
        Pipeline::new(cfg, Arc::new(sink.clone()), Arc::new(MemoryLog::new()))
            .unwrap()
            .run()
            .unwrap();
        let blob = sink.list("").unwrap().remove(0);
        gunzip(&sink.get(&blob).unwrap())
    };
    assert_eq!(render(), render());
}
