//! Live output of a run in progress.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use e2e_monitor::services::Runner;

use super::test_helpers::*;

#[actix_rt::test]
async fn test_log_without_run_is_not_found() {
    let runner = create_runner();
    let app = create_test_app(&runner).await;

    let (status, _, _) = get_text(&app, "/log/TestAlwaysPasses").await;
    assert_eq!(status, 404);

    runner.run_job("TestAlwaysPasses").await.unwrap();
    let (status, _, _) = get_text(&app, "/log/TestAlwaysPasses").await;
    assert_eq!(status, 404);
}

#[actix_rt::test]
async fn test_log_unknown_job_is_not_found() {
    let runner = create_runner();
    let app = create_test_app(&runner).await;

    let (status, _, body) = get_text(&app, "/api/log/Nope").await;
    assert_eq!(status, 404);
    assert!(body.contains("Job Nope not found"));
}

#[actix_rt::test]
async fn test_log_streams_running_output() {
    let (started_tx, started_rx) = mpsc::channel::<()>();
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let started_tx = Mutex::new(started_tx);
    let release_rx = Arc::new(Mutex::new(release_rx));

    let runner = Runner::new();
    runner.register("TestSlow", move |t| {
        t.log("waiting for release");
        let _ = started_tx.lock().unwrap().send(());
        let _ = release_rx.lock().unwrap().recv();
        t.log("released");
        Ok(())
    });
    let app = create_test_app(&runner).await;

    let (status, _) = get_json(&app, "/force/TestSlow").await;
    assert_eq!(status, 200);

    // The forced run is spawned on this thread's runtime; yield until it starts
    let mut started = false;
    for _ in 0..500 {
        if started_rx.try_recv().is_ok() {
            started = true;
            break;
        }
        actix_rt::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(started, "job never started");

    assert_eq!(runner.status()["TestSlow"].state.as_str(), "RUNNING");

    let (status, content_type, body) = get_text(&app, "/log/TestSlow").await;
    assert_eq!(status, 200);
    assert!(content_type.starts_with("text/plain"));
    assert!(body.contains("waiting for release"));
    assert!(!body.contains("released\n"));

    release_tx.send(()).unwrap();
    wait_for(&runner, "TestSlow", |s| s.successes == 1).await;

    let (status, _, _) = get_text(&app, "/log/TestSlow").await;
    assert_eq!(status, 404);
}
