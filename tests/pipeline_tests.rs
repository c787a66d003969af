//! Integration tests for the crawl-and-download pipeline
//!
//! These tests drive the coordinator end-to-end against a scripted page
//! driver and a wiremock media server, then assert the cache and the
//! filesystem ended up in the state the pipeline guarantees: idempotent
//! re-runs, canonical-URL dedupe, oldest-first processing, locked-post
//! handling, and per-post failure isolation.

use feedvault::config::{AuthorEntry, Config, CrawlerConfig, CredentialsConfig, OutputConfig, SiteConfig};
use feedvault::crawler::{establish_session, Coordinator, CrawlPhase};
use feedvault::driver::{DriverError, DriverResult, PageDriver, WaitUntil};
use feedvault::extractor::selectors;
use feedvault::storage::{open_store, SqliteStore, Store};
use feedvault::walker;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BASE_URL: &str = "https://fans.example";
const AUTHOR_ID: &str = "painter";

/// One scripted post view
#[derive(Clone)]
struct PostFixture {
    remote_id: &'static str,
    description: &'static str,
    timestamp: &'static str,
    locked: bool,
    /// Image sources; one renders as a single image, several as slides
    sources: Vec<String>,
    /// When set, the post view never renders
    load_fails: bool,
}

impl PostFixture {
    fn new(remote_id: &'static str, description: &'static str, sources: Vec<String>) -> Self {
        Self {
            remote_id,
            description,
            timestamp: "May 3",
            locked: false,
            sources,
            load_fails: false,
        }
    }

    fn url(&self) -> String {
        format!("{}/{}/{}", BASE_URL, self.remote_id, AUTHOR_ID)
    }
}

/// Which page the scripted browser is currently showing
enum View {
    Nowhere,
    Feed,
    Post(usize),
}

/// Scripted browser: a feed of post fixtures plus their post views
struct FakePage {
    /// Feed order: newest first, as the site renders it
    posts: Vec<PostFixture>,
    view: View,
}

impl FakePage {
    fn new(posts: Vec<PostFixture>) -> Self {
        Self {
            posts,
            view: View::Nowhere,
        }
    }

    fn current_post(&self) -> Option<&PostFixture> {
        match self.view {
            View::Post(index) => self.posts.get(index),
            _ => None,
        }
    }
}

impl PageDriver for FakePage {
    async fn navigate(
        &mut self,
        url: &str,
        _wait: WaitUntil,
        _timeout: Duration,
    ) -> DriverResult<()> {
        if url.contains("/media?") {
            self.view = View::Feed;
            return Ok(());
        }

        for (index, post) in self.posts.iter().enumerate() {
            if post.url() == url {
                self.view = View::Post(index);
                return Ok(());
            }
        }

        self.view = View::Nowhere;
        Ok(())
    }

    async fn wait_for_selector(&mut self, selector: &str, _timeout: Duration) -> DriverResult<bool> {
        match &self.view {
            View::Feed => Ok(selector == walker::FEED_CONTAINER),
            View::Post(_) => {
                let post = self.current_post().unwrap();
                if post.load_fails {
                    return Ok(false);
                }
                let present = match selector {
                    s if s == selectors::POST_WRAPPER => true,
                    s if s == selectors::LOCKED_MARKER => post.locked,
                    s if s == selectors::SLIDES_CONTAINER => post.sources.len() > 1,
                    _ => false,
                };
                Ok(present)
            }
            View::Nowhere => Ok(false),
        }
    }

    async fn evaluate(&mut self, script: &str) -> DriverResult<Value> {
        if !matches!(self.view, View::Feed) {
            return Ok(Value::Null);
        }

        if script == walker::REMAINING_SCROLL_SCRIPT {
            return Ok(json!(0.0));
        }
        if script == walker::VISIBLE_POST_IDS_SCRIPT {
            let ids: Vec<String> = self
                .posts
                .iter()
                .map(|post| format!("{}{}", walker::POST_ID_PREFIX, post.remote_id))
                .collect();
            return Ok(json!(ids));
        }
        if script.starts_with("window.scrollBy") {
            return Ok(Value::Null);
        }

        Err(DriverError::InvalidResponse(format!(
            "unexpected script: {}",
            script
        )))
    }

    async fn extract_text(&mut self, selector: &str) -> DriverResult<Option<String>> {
        let post = match self.current_post() {
            Some(post) => post,
            None => return Ok(None),
        };

        if selector == selectors::DESCRIPTION {
            return Ok(Some(post.description.to_string()));
        }
        if selector == selectors::TIMESTAMP {
            return Ok(Some(post.timestamp.to_string()));
        }
        Ok(None)
    }

    async fn extract_attribute(
        &mut self,
        selector: &str,
        attribute: &str,
    ) -> DriverResult<Option<String>> {
        let post = match self.current_post() {
            Some(post) => post,
            None => return Ok(None),
        };

        if selector == selectors::SINGLE_IMAGE && attribute == "src" && post.sources.len() == 1 {
            return Ok(Some(post.sources[0].clone()));
        }
        Ok(None)
    }

    async fn extract_attribute_all(
        &mut self,
        selector: &str,
        attribute: &str,
    ) -> DriverResult<Vec<String>> {
        let post = match self.current_post() {
            Some(post) => post,
            None => return Ok(Vec::new()),
        };

        if selector == selectors::SLIDE_IMAGES && attribute == "src" && post.sources.len() > 1 {
            return Ok(post.sources.clone());
        }
        Ok(Vec::new())
    }

    async fn click(&mut self, _selector: &str) -> DriverResult<()> {
        Ok(())
    }

    async fn type_text(&mut self, _selector: &str, _text: &str) -> DriverResult<()> {
        Ok(())
    }

    async fn reload(&mut self) -> DriverResult<()> {
        Ok(())
    }
}

/// Builds a run configuration rooted in a temp directory
fn test_config(dir: &Path) -> Config {
    Config {
        site: SiteConfig {
            base_url: BASE_URL.to_string(),
            webdriver_endpoint: "http://127.0.0.1:9515".to_string(),
        },
        credentials: CredentialsConfig {
            username: "archivist@example.com".to_string(),
            password: "hunter2".to_string(),
        },
        crawler: CrawlerConfig {
            navigation_timeout_ms: 1_000,
            login_timeout_ms: 1_000,
            scroll_tick_ms: 1,
            stability_threshold: 1,
            max_attempts: 3,
        },
        output: OutputConfig {
            database_path: dir.join("archive.db").to_string_lossy().into_owned(),
            download_root: dir.join("downloads").to_string_lossy().into_owned(),
        },
        authors: vec![AuthorEntry {
            id: AUTHOR_ID.to_string(),
            name: "The Painter".to_string(),
        }],
    }
}

/// Mounts a 200 response with image bytes for a media path
async fn mount_media(server: &MockServer, media_path: &str, bytes: &[u8]) {
    Mock::given(method("GET"))
        .and(path(media_path.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(bytes.to_vec()))
        .mount(server)
        .await;
}

/// Runs the coordinator over the given fixtures and returns the store
async fn run_pipeline(config: Config, posts: Vec<PostFixture>) -> (SqliteStore, feedvault::crawler::CrawlReport) {
    let store = open_store(Path::new(&config.output.database_path)).expect("open store");
    let driver = FakePage::new(posts);

    let mut coordinator = Coordinator::new(config, driver, store).expect("coordinator");
    let report = coordinator.run().await.expect("run");

    let (_driver, store) = coordinator.into_parts();
    (store, report)
}

#[tokio::test]
async fn test_full_pipeline_downloads_and_records() {
    let server = MockServer::start().await;
    mount_media(&server, "/media/sunrise.jpg", b"sunrise").await;
    mount_media(&server, "/media/beach1.jpg", b"beach one").await;
    mount_media(&server, "/media/beach2.jpg", b"beach two").await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    // Feed renders newest-first: locked 30, slides 20, single image 10
    let mut locked = PostFixture::new("30", "subscribers only", vec![]);
    locked.locked = true;
    let posts = vec![
        locked,
        PostFixture::new(
            "20",
            "beach set",
            vec![
                format!("{}/media/beach1.jpg?sig=1", server.uri()),
                format!("{}/media/beach2.jpg?sig=2", server.uri()),
            ],
        ),
        PostFixture::new(
            "10",
            "sunrise",
            vec![format!("{}/media/sunrise.jpg?sig=9", server.uri())],
        ),
    ];

    let (store, report) = run_pipeline(config.clone(), posts).await;

    // Every post got a row; media landed for the two open posts
    assert_eq!(store.count_posts().unwrap(), 3);
    assert_eq!(store.count_media().unwrap(), 3);
    assert_eq!(report.authors.len(), 1);
    assert_eq!(report.authors[0].phase, CrawlPhase::Done);
    assert_eq!(report.authors[0].posts_processed, 3);
    assert_eq!(report.authors[0].media_downloaded, 3);

    // Files exist under the author directory, ordinal suffix on the second slide
    let author_dir = Path::new(&config.output.download_root).join(AUTHOR_ID);
    assert!(author_dir.join("painter_sunrise[10].jpg").is_file());
    assert!(author_dir.join("painter_beach_set[20].jpg").is_file());
    assert!(author_dir.join("painter_beach_set[20] (1).jpg").is_file());

    // Counts reconcile with media rows
    let beach = store
        .get_post_by_url(&format!("{}/20/{}", BASE_URL, AUTHOR_ID))
        .unwrap()
        .unwrap();
    assert_eq!(beach.cached_media_count, 2);

    // The locked post is recorded, terminal, and reported as yielding nothing
    let locked = store
        .get_post_by_url(&format!("{}/30/{}", BASE_URL, AUTHOR_ID))
        .unwrap()
        .unwrap();
    assert!(locked.locked);
    assert_eq!(locked.cached_media_count, 0);
    assert_eq!(
        report.authors[0].failed_posts,
        vec![format!("{}/30/{}", BASE_URL, AUTHOR_ID)]
    );

    let seen = store.get_seen_post_ids(AUTHOR_ID).unwrap();
    assert!(seen.contains("10"));
    assert!(seen.contains("20"));
    assert!(seen.contains("30"));
}

#[tokio::test]
async fn test_posts_processed_oldest_first() {
    let server = MockServer::start().await;
    mount_media(&server, "/media/a.jpg", b"a").await;
    mount_media(&server, "/media/b.jpg", b"b").await;
    mount_media(&server, "/media/c.jpg", b"c").await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    // Discovered newest-first as 30, 20, 10
    let posts = vec![
        PostFixture::new("30", "third", vec![format!("{}/media/c.jpg", server.uri())]),
        PostFixture::new("20", "second", vec![format!("{}/media/b.jpg", server.uri())]),
        PostFixture::new("10", "first", vec![format!("{}/media/a.jpg", server.uri())]),
    ];

    let (store, _report) = run_pipeline(config, posts).await;

    // Row ids are assigned in processing order: 10, then 20, then 30
    let id_of = |remote: &str| {
        store
            .get_post_by_url(&format!("{}/{}/{}", BASE_URL, remote, AUTHOR_ID))
            .unwrap()
            .unwrap()
            .id
    };
    assert!(id_of("10") < id_of("20"));
    assert!(id_of("20") < id_of("30"));
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let server = MockServer::start().await;
    mount_media(&server, "/media/a.jpg", b"a").await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let fixtures = vec![PostFixture::new(
        "10",
        "only post",
        vec![format!("{}/media/a.jpg?sig=1", server.uri())],
    )];

    let (store, first) = run_pipeline(config.clone(), fixtures.clone()).await;
    let seen_before = store.get_seen_post_ids(AUTHOR_ID).unwrap();
    assert_eq!(first.authors[0].media_downloaded, 1);
    drop(store);

    // Same remote state, fresh run against the same cache
    let (store, second) = run_pipeline(config.clone(), fixtures).await;

    assert_eq!(second.authors[0].media_downloaded, 0);
    assert_eq!(second.authors[0].posts_processed, 0);
    assert_eq!(store.count_media().unwrap(), 1);

    let post = store
        .get_post_by_url(&format!("{}/10/{}", BASE_URL, AUTHOR_ID))
        .unwrap()
        .unwrap();
    assert_eq!(post.cached_media_count, 1);

    // Seen-set monotonicity
    let seen_after = store.get_seen_post_ids(AUTHOR_ID).unwrap();
    assert!(seen_after.is_superset(&seen_before));

    // The file was not overwritten or duplicated
    let author_dir = Path::new(&config.output.download_root).join(AUTHOR_ID);
    let files: Vec<_> = std::fs::read_dir(author_dir).unwrap().collect();
    assert_eq!(files.len(), 1);
}

#[tokio::test]
async fn test_dedup_by_canonical_url() {
    let server = MockServer::start().await;
    mount_media(&server, "/media/a.jpg", b"a").await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    // Two signed variants of the same asset in one post
    let posts = vec![PostFixture::new(
        "10",
        "signed twice",
        vec![
            format!("{}/media/a.jpg?sig=1", server.uri()),
            format!("{}/media/a.jpg?sig=2", server.uri()),
        ],
    )];

    let (store, report) = run_pipeline(config, posts).await;

    // Exactly one download, one row, count of one
    assert_eq!(report.authors[0].media_downloaded, 1);
    assert_eq!(store.count_media().unwrap(), 1);

    let post = store
        .get_post_by_url(&format!("{}/10/{}", BASE_URL, AUTHOR_ID))
        .unwrap()
        .unwrap();
    assert_eq!(post.cached_media_count, 1);
}

#[tokio::test]
async fn test_partial_failure_isolation() {
    let server = MockServer::start().await;
    mount_media(&server, "/media/a.jpg", b"a").await;
    mount_media(&server, "/media/c.jpg", b"c").await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    // The middle post (in processing order) never renders
    let mut broken = PostFixture::new("20", "broken", vec![]);
    broken.load_fails = true;
    let posts = vec![
        PostFixture::new("30", "third", vec![format!("{}/media/c.jpg", server.uri())]),
        broken,
        PostFixture::new("10", "first", vec![format!("{}/media/a.jpg", server.uri())]),
    ];

    let (store, report) = run_pipeline(config, posts).await;

    // Posts 10 and 30 are fully processed and recorded
    assert_eq!(store.count_media().unwrap(), 2);
    assert_eq!(report.authors[0].posts_processed, 3);
    assert_eq!(report.authors[0].media_downloaded, 2);

    // The failure list contains exactly the broken post
    assert_eq!(
        report.authors[0].failed_posts,
        vec![format!("{}/20/{}", BASE_URL, AUTHOR_ID)]
    );

    // No row was created for it, so a later run rediscovers it
    assert!(store
        .get_post_by_url(&format!("{}/20/{}", BASE_URL, AUTHOR_ID))
        .unwrap()
        .is_none());
    assert!(!store.get_seen_post_ids(AUTHOR_ID).unwrap().contains("20"));
}

#[tokio::test]
async fn test_download_failure_skips_media_row() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/media/gone.jpg"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    let posts = vec![PostFixture::new(
        "10",
        "missing asset",
        vec![format!("{}/media/gone.jpg", server.uri())],
    )];

    let (store, report) = run_pipeline(config, posts).await;

    // The post row exists but no media was recorded and the count stayed at
    // zero, so the post is retried on the next run
    let post = store
        .get_post_by_url(&format!("{}/10/{}", BASE_URL, AUTHOR_ID))
        .unwrap()
        .unwrap();
    assert_eq!(post.cached_media_count, 0);
    assert_eq!(store.count_media().unwrap(), 0);
    assert_eq!(
        report.authors[0].failed_posts,
        vec![format!("{}/10/{}", BASE_URL, AUTHOR_ID)]
    );
    assert!(!store.get_seen_post_ids(AUTHOR_ID).unwrap().contains("10"));
}

// ===== Session establishment =====

/// Login page scripted at the selector level
struct LoginPage {
    feed_renders: bool,
    typed: Vec<(String, String)>,
}

impl PageDriver for LoginPage {
    async fn navigate(
        &mut self,
        _url: &str,
        _wait: WaitUntil,
        _timeout: Duration,
    ) -> DriverResult<()> {
        Ok(())
    }

    async fn wait_for_selector(&mut self, selector: &str, _timeout: Duration) -> DriverResult<bool> {
        if selector == walker::FEED_CONTAINER {
            return Ok(self.feed_renders);
        }
        Ok(true)
    }

    async fn evaluate(&mut self, _script: &str) -> DriverResult<Value> {
        Ok(Value::Null)
    }

    async fn extract_text(&mut self, _selector: &str) -> DriverResult<Option<String>> {
        Ok(None)
    }

    async fn extract_attribute(
        &mut self,
        _selector: &str,
        _attribute: &str,
    ) -> DriverResult<Option<String>> {
        Ok(None)
    }

    async fn extract_attribute_all(
        &mut self,
        _selector: &str,
        _attribute: &str,
    ) -> DriverResult<Vec<String>> {
        Ok(Vec::new())
    }

    async fn click(&mut self, _selector: &str) -> DriverResult<()> {
        Ok(())
    }

    async fn type_text(&mut self, selector: &str, text: &str) -> DriverResult<()> {
        self.typed.push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn reload(&mut self) -> DriverResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_session_establishment_types_credentials() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let mut driver = LoginPage {
        feed_renders: true,
        typed: Vec::new(),
    };

    establish_session(&mut driver, &config).await.unwrap();

    let values: Vec<&str> = driver.typed.iter().map(|(_, v)| v.as_str()).collect();
    assert_eq!(values, vec!["archivist@example.com", "hunter2"]);
}

#[tokio::test]
async fn test_session_establishment_fails_when_feed_never_renders() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());
    let mut driver = LoginPage {
        feed_renders: false,
        typed: Vec::new(),
    };

    let result = establish_session(&mut driver, &config).await;
    assert!(result.is_err());
}
