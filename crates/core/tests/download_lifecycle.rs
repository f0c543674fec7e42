//! Download lifecycle integration tests.
//!
//! These tests run the download manager's background worker against a mock
//! torrent daemon and a real `FileOrganizer` on a temporary library:
//! queued -> downloading -> organizing -> completed

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use niluflix_core::{
    searcher::{RawTorrentResult, SearchProvider},
    testing::{fixtures, MockProvider, MockTorrentClient},
    ContentDescriptor, DownloadEvent, DownloadManager, FileOrganizer, JobStatus, LibraryLayout,
    ManagerConfig, Organizer, OrganizerConfig, SearchConfig, TorrentClient, TorrentSearchEngine,
};

/// Test helper wiring a manager to a temporary library.
struct TestHarness {
    manager: Arc<DownloadManager>,
    torrent_client: Arc<MockTorrentClient>,
    layout: LibraryLayout,
    _temp_dir: TempDir,
}

impl TestHarness {
    async fn new(max_concurrent: usize, results: Vec<RawTorrentResult>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let layout = LibraryLayout::new(temp_dir.path().join("NiluFlix"));
        layout
            .ensure_directories()
            .await
            .expect("Failed to create library");

        let torrent_client = Arc::new(MockTorrentClient::new());
        let provider = Arc::new(MockProvider::new("mock").with_results(results));
        let search = Arc::new(TorrentSearchEngine::new(
            SearchConfig {
                timeout_secs: 1,
                ..Default::default()
            },
            vec![provider as Arc<dyn SearchProvider>],
        ));
        let organizer = Arc::new(FileOrganizer::new(layout.clone(), OrganizerConfig::default()));

        let config = ManagerConfig {
            max_concurrent_downloads: max_concurrent,
            progress_poll_interval_ms: 50,
            event_buffer: 256,
        };
        let manager = Arc::new(DownloadManager::new(
            config,
            Arc::clone(&torrent_client) as Arc<dyn TorrentClient>,
            search,
            organizer as Arc<dyn Organizer>,
            layout.downloads_dir(),
        ));

        Self {
            manager,
            torrent_client,
            layout,
            _temp_dir: temp_dir,
        }
    }

    /// Writes the payload the daemon "downloaded" and names the torrent after it.
    async fn finish_download(&self, torrent_id: &str, name: &str, files: &[(&str, usize)]) {
        let root = self.layout.downloads_dir().join(name);
        for (file, size) in files {
            let path = root.join(file);
            tokio::fs::create_dir_all(path.parent().unwrap())
                .await
                .unwrap();
            tokio::fs::write(&path, vec![0u8; *size]).await.unwrap();
        }
        self.torrent_client.set_name(torrent_id, name).await;
        self.torrent_client.set_progress(torrent_id, 1.0).await;
    }

    /// Waits for a job to reach a status. Bails out early on a different
    /// terminal status.
    async fn wait_for_status(&self, job_id: &str, expected: JobStatus, timeout: Duration) -> bool {
        let start = std::time::Instant::now();
        while start.elapsed() < timeout {
            if let Some(job) = self.manager.get_job(job_id).await {
                if job.status == expected {
                    return true;
                }
                if job.status.is_terminal() {
                    eprintln!(
                        "Job {} reached {} while waiting for {} ({:?})",
                        job_id, job.status, expected, job.error_message
                    );
                    return false;
                }
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        false
    }
}

fn torrent_id(job: &niluflix_core::DownloadJob) -> String {
    job.torrent_id.clone().expect("job should have a torrent")
}

#[tokio::test]
async fn test_movie_download_from_search_to_library() {
    let harness = TestHarness::new(
        3,
        vec![
            fixtures::raw_result("The Matrix 1999 720p WEB", 20, Some("magnet:?xt=urn:btih:weak")),
            fixtures::raw_result(
                "The Matrix 1999 1080p BluRay x264",
                120,
                Some("magnet:?xt=urn:btih:matrix"),
            ),
        ],
    )
    .await;
    harness.manager.start();

    let job_id = harness
        .manager
        .add_download(ContentDescriptor::movie("The Matrix", Some(1999)), None)
        .await
        .expect("Failed to add download");

    let job = harness.manager.get_job(&job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Downloading);
    assert_eq!(torrent_id(&job), "matrix");

    let started = harness.torrent_client.started_torrents().await;
    assert_eq!(started.len(), 1);
    assert_eq!(
        started[0].download_path,
        Some(harness.layout.downloads_dir())
    );

    harness
        .finish_download(
            "matrix",
            "The.Matrix.1999.1080p.BluRay.x264",
            &[("The.Matrix.1999.1080p.BluRay.x264.mkv", 4096), ("sample.txt", 16)],
        )
        .await;

    assert!(
        harness
            .wait_for_status(&job_id, JobStatus::Completed, Duration::from_secs(5))
            .await,
        "download should complete"
    );

    let expected = harness
        .layout
        .movies_dir()
        .join("The Matrix (1999)")
        .join("The Matrix (1999).mkv");
    let job = harness.manager.get_job(&job_id).await.unwrap();
    assert_eq!(job.progress, 1.0);
    assert_eq!(job.organized_files, vec![expected.clone()]);
    assert!(expected.exists());
    assert!(expected
        .with_file_name("The Matrix (1999).metadata.json")
        .exists());

    // Seeding stops but the payload stays on disk.
    assert_eq!(
        harness.torrent_client.removed_torrents().await,
        vec![("matrix".to_string(), false)]
    );

    harness.manager.stop();
}

#[tokio::test]
async fn test_episode_download_lands_in_season_folder() {
    let harness = TestHarness::new(3, Vec::new()).await;
    harness.manager.start();

    let content = ContentDescriptor::episode("Breaking Bad", 1, 1).with_tmdb_id(1396);
    let job_id = harness
        .manager
        .add_download(
            content,
            Some(vec![fixtures::candidate(
                "Breaking.Bad.S01E01.720p.HDTV",
                "bb0101",
            )]),
        )
        .await
        .unwrap();

    harness
        .finish_download(
            "bb0101",
            "Breaking.Bad.S01E01.720p.HDTV",
            &[("Breaking.Bad.S01E01.720p.HDTV.mkv", 2048)],
        )
        .await;

    assert!(
        harness
            .wait_for_status(&job_id, JobStatus::Completed, Duration::from_secs(5))
            .await
    );

    let season = harness.layout.tv_dir().join("Breaking Bad").join("Season 01");
    let video = season.join("Breaking Bad S01E01.mkv");
    assert!(video.exists());

    let sidecar = tokio::fs::read_to_string(season.join("Breaking Bad S01E01.metadata.json"))
        .await
        .unwrap();
    let sidecar: serde_json::Value = serde_json::from_str(&sidecar).unwrap();
    assert_eq!(sidecar["tmdbId"], 1396);
    assert_eq!(sidecar["type"], "episode");
    assert_eq!(sidecar["seasonNumber"], 1);
    assert_eq!(sidecar["episodeNumber"], 1);
    assert_eq!(sidecar["originalTorrentName"], "Breaking.Bad.S01E01.720p.HDTV");

    // The emptied torrent folder is gone, the downloads root stays.
    assert!(!harness
        .layout
        .downloads_dir()
        .join("Breaking.Bad.S01E01.720p.HDTV")
        .exists());
    assert!(harness.layout.downloads_dir().exists());

    harness.manager.stop();
}

#[tokio::test]
async fn test_queue_advances_when_download_finishes() {
    let harness = TestHarness::new(1, Vec::new()).await;
    harness.manager.start();

    let first = harness
        .manager
        .add_download(
            ContentDescriptor::movie("Heat", Some(1995)),
            Some(vec![fixtures::movie_candidate("Heat", 1995, "heat")]),
        )
        .await
        .unwrap();
    let second = harness
        .manager
        .add_download(
            ContentDescriptor::movie("Ronin", Some(1998)),
            Some(vec![fixtures::movie_candidate("Ronin", 1998, "ronin")]),
        )
        .await
        .unwrap();

    let queued = harness.manager.get_job(&second).await.unwrap();
    assert_eq!(queued.status, JobStatus::Queued);
    assert_eq!(harness.torrent_client.started_torrents().await.len(), 1);

    harness
        .finish_download("heat", "Heat.1995.1080p", &[("Heat.1995.1080p.mkv", 1024)])
        .await;

    assert!(
        harness
            .wait_for_status(&first, JobStatus::Completed, Duration::from_secs(5))
            .await
    );
    assert!(
        harness
            .wait_for_status(&second, JobStatus::Downloading, Duration::from_secs(5))
            .await
    );

    let started = harness.torrent_client.started_torrents().await;
    assert_eq!(started.len(), 2);
    assert_eq!(started[1].torrent_id, "ronin");

    harness.manager.stop();
}

#[tokio::test]
async fn test_download_without_video_fails_and_keeps_payload() {
    let harness = TestHarness::new(3, Vec::new()).await;
    harness.manager.start();

    let job_id = harness
        .manager
        .add_download(
            ContentDescriptor::movie("Alien", Some(1979)),
            Some(vec![fixtures::movie_candidate("Alien", 1979, "alien")]),
        )
        .await
        .unwrap();

    harness
        .finish_download("alien", "Alien.1979.Extras", &[("readme.txt", 32)])
        .await;

    assert!(
        harness
            .wait_for_status(&job_id, JobStatus::Failed, Duration::from_secs(5))
            .await
    );

    let job = harness.manager.get_job(&job_id).await.unwrap();
    assert!(job.error_message.unwrap().contains("No video files"));
    assert!(job.organized_files.is_empty());

    // Nothing removed, nothing moved.
    assert!(harness.torrent_client.removed_torrents().await.is_empty());
    assert!(harness
        .layout
        .downloads_dir()
        .join("Alien.1979.Extras")
        .join("readme.txt")
        .exists());

    harness.manager.stop();
}

#[tokio::test]
async fn test_event_stream_follows_job_lifecycle() {
    let harness = TestHarness::new(3, Vec::new()).await;
    let mut events = harness.manager.subscribe();
    harness.manager.start();

    let job_id = harness
        .manager
        .add_download(
            ContentDescriptor::movie("Arrival", Some(2016)),
            Some(vec![fixtures::movie_candidate("Arrival", 2016, "arrival")]),
        )
        .await
        .unwrap();
    harness
        .finish_download("arrival", "Arrival.2016", &[("Arrival.2016.mkv", 512)])
        .await;

    let mut kinds = Vec::new();
    let collected = tokio::time::timeout(Duration::from_secs(5), async {
        while let Ok(event) = events.recv().await {
            if matches!(event, DownloadEvent::JobProgress { .. }) {
                continue;
            }
            kinds.push(event.kind());
            if let DownloadEvent::JobCompleted {
                job_id: id,
                organized_files,
            } = &event
            {
                assert_eq!(id, &job_id);
                assert_eq!(organized_files.len(), 1);
                break;
            }
        }
    })
    .await;

    assert!(collected.is_ok(), "timed out, saw {:?}", kinds);
    assert_eq!(
        kinds,
        vec!["JobAdded", "JobStarted", "JobOrganizing", "JobCompleted"]
    );

    harness.manager.stop();
}

#[tokio::test]
async fn test_stop_halts_polling() {
    let harness = TestHarness::new(3, Vec::new()).await;
    harness.manager.start();
    assert!(harness.manager.is_running());

    let job_id = harness
        .manager
        .add_download(
            ContentDescriptor::movie("Sicario", Some(2015)),
            Some(vec![fixtures::movie_candidate("Sicario", 2015, "sicario")]),
        )
        .await
        .unwrap();

    harness.manager.stop();
    assert!(!harness.manager.is_running());
    tokio::time::sleep(Duration::from_millis(100)).await;

    harness
        .finish_download("sicario", "Sicario.2015", &[("Sicario.2015.mkv", 512)])
        .await;
    tokio::time::sleep(Duration::from_millis(200)).await;

    let job = harness.manager.get_job(&job_id).await.unwrap();
    assert_eq!(job.status, JobStatus::Downloading);
    assert!(!harness
        .layout
        .movies_dir()
        .join("Sicario (2015)")
        .exists());
}
