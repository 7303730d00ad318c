//! Container system build tests against a scripted mock engine.
//!
//! The mock keeps a name-indexed container table and records every call, so
//! tests can assert both the images produced and the guaranteed-removal
//! discipline: no build run may leave containers behind, successful or not.

use async_trait::async_trait;
use cask_build::{
    build_images, BuildError, BuiltImage, ContainerSystem, ImageConfig, LayeredImageBuilder,
    SystemPlan,
};
use cask_container::{
    AccessMode, ContainerEngine, ContainerError, ContainerInspect, CreateOptions, EngineError,
    EngineResult, ImageBuild, Signal, StartOptions,
};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

struct MockContainer {
    image: String,
    running: bool,
    started_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct EngineState {
    containers: HashMap<String, MockContainer>,
    create_order: Vec<String>,
    removed: Vec<String>,
    starts: Vec<(String, StartOptions)>,
    commits: Vec<(String, String)>,
    builds: Vec<ImageBuild>,
}

/// Engine double. Containers exit with the code configured for their image
/// (zero by default); inspect reports the volume paths configured for the
/// image, mimicking image-declared volumes.
#[derive(Default)]
struct MockEngine {
    state: Mutex<EngineState>,
    exit_codes: HashMap<String, i64>,
    image_volumes: HashMap<String, Vec<String>>,
}

impl MockEngine {
    fn with_exit_code(mut self, image: &str, code: i64) -> Self {
        self.exit_codes.insert(image.to_string(), code);
        self
    }

    fn with_volumes(mut self, image: &str, volumes: &[&str]) -> Self {
        self.image_volumes.insert(
            image.to_string(),
            volumes.iter().map(ToString::to_string).collect(),
        );
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, EngineState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl ContainerEngine for MockEngine {
    async fn create(&self, options: CreateOptions) -> EngineResult<String> {
        let mut state = self.state();
        if state.containers.contains_key(&options.name) {
            return Err(EngineError::AlreadyExists(options.name));
        }
        state.create_order.push(options.name.clone());
        state.containers.insert(
            options.name.clone(),
            MockContainer {
                image: options.image,
                running: false,
                started_at: None,
            },
        );
        Ok(options.name)
    }

    async fn start(&self, name: &str, options: StartOptions) -> EngineResult<()> {
        let mut state = self.state();
        state.starts.push((name.to_string(), options));
        let container = state
            .containers
            .get_mut(name)
            .ok_or_else(|| EngineError::NotFound(name.to_string()))?;
        container.running = true;
        container.started_at = Some(Utc::now());
        Ok(())
    }

    async fn signal(&self, name: &str, _signal: Signal) -> EngineResult<()> {
        let mut state = self.state();
        let container = state
            .containers
            .get_mut(name)
            .ok_or_else(|| EngineError::NotFound(name.to_string()))?;
        container.running = false;
        Ok(())
    }

    async fn wait(&self, name: &str, _timeout: Option<Duration>) -> EngineResult<i64> {
        let mut state = self.state();
        let container = state
            .containers
            .get_mut(name)
            .ok_or_else(|| EngineError::NotFound(name.to_string()))?;
        container.running = false;
        let code = self.exit_codes.get(&container.image).copied().unwrap_or(0);
        Ok(code)
    }

    async fn remove(&self, name: &str, _force: bool) -> EngineResult<()> {
        let mut state = self.state();
        state
            .containers
            .remove(name)
            .ok_or_else(|| EngineError::NotFound(name.to_string()))?;
        state.removed.push(name.to_string());
        Ok(())
    }

    async fn inspect(&self, name: &str) -> EngineResult<ContainerInspect> {
        let state = self.state();
        let container = state
            .containers
            .get(name)
            .ok_or_else(|| EngineError::NotFound(name.to_string()))?;
        Ok(ContainerInspect {
            name: name.to_string(),
            image: container.image.clone(),
            running: container.running,
            pid: i64::from(container.running),
            exit_code: None,
            started_at: container.started_at,
            volumes: self
                .image_volumes
                .get(&container.image)
                .cloned()
                .unwrap_or_default(),
        })
    }

    async fn logs(&self, name: &str) -> EngineResult<Vec<u8>> {
        let state = self.state();
        if state.containers.contains_key(name) {
            Ok(b"mock output".to_vec())
        } else {
            Err(EngineError::NotFound(name.to_string()))
        }
    }

    async fn commit(&self, name: &str, tag: &str) -> EngineResult<String> {
        let mut state = self.state();
        state.commits.push((name.to_string(), tag.to_string()));
        Ok(format!("sha256:{tag}"))
    }

    async fn build(&self, build: ImageBuild) -> EngineResult<String> {
        let mut state = self.state();
        let id = format!("sha256:{}", build.tag);
        state.builds.push(build);
        Ok(id)
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("cask_build=debug,cask_container=debug")
        .with_test_writer()
        .try_init();
}

fn run_system(
    engine: &Arc<MockEngine>,
    image: &str,
    config: &ImageConfig,
) -> impl std::future::Future<Output = Result<Vec<BuiltImage>, BuildError>> {
    let plan = SystemPlan::from_config(image, config).expect("plan should resolve");
    let system = ContainerSystem::new(Arc::clone(engine) as Arc<dyn ContainerEngine>, plan)
        .expect("system should materialize");
    system.run()
}

#[tokio::test]
async fn root_commit_produces_one_image_and_removes_everything() {
    init_tracing();
    let engine = Arc::new(MockEngine::default());
    let mut config = ImageConfig::new();
    config.set("from", "base:latest").set("commit", "true");

    let images = run_system(&engine, "app", &config).await.unwrap();

    assert_eq!(images.len(), 1);
    assert_eq!(images[0].tag, "app");

    let state = engine.state();
    assert_eq!(state.commits.len(), 1);
    assert!(state.commits[0].0.starts_with("base."));
    assert_eq!(state.commits[0].1, "app");
    assert!(state.builds.is_empty(), "commit must not trigger extraction");
    assert_eq!(state.create_order.len(), 1);
    assert!(state.containers.is_empty(), "containers were left behind");
}

#[tokio::test]
async fn persist_member_extracts_via_helper_and_builds_target() {
    init_tracing();
    let engine = Arc::new(
        MockEngine::default().with_volumes("data:latest", &["/var/data", "/var/cache"]),
    );
    let mut config = ImageConfig::new();
    config
        .set("from", "base:latest")
        .set("volumes_from", "data:latest then persist to out:img");

    let images = run_system(&engine, "app", &config).await.unwrap();

    assert_eq!(images.len(), 1);
    assert_eq!(images[0].tag, "out:img");

    let state = engine.state();
    // auxiliary, root, extraction helper
    assert_eq!(state.create_order.len(), 3);
    let aux_name = state.create_order[0].clone();
    let helper_name = state.create_order[2].clone();
    assert!(aux_name.starts_with("data."));
    assert!(helper_name.starts_with("busybox."));

    // Helper attaches to the auxiliary's volumes read-only.
    let (_, helper_start) = state
        .starts
        .iter()
        .find(|(name, _)| *name == helper_name)
        .expect("helper was never started");
    assert_eq!(helper_start.volumes_from.len(), 1);
    assert_eq!(helper_start.volumes_from[0].container_name, aux_name);
    assert_eq!(helper_start.volumes_from[0].mode, AccessMode::Ro);
    assert_eq!(helper_start.binds.len(), 1);

    // One image build: auxiliary's image as base, tagged with the target.
    assert_eq!(state.builds.len(), 1);
    assert_eq!(state.builds[0].base_image, "data:latest");
    assert_eq!(state.builds[0].tag, "out:img");
    assert!(state.commits.is_empty());

    assert!(state.containers.is_empty(), "containers were left behind");
    assert_eq!(state.removed.len(), 3);
}

#[tokio::test]
async fn failing_root_aborts_build_but_still_removes_containers() {
    init_tracing();
    let engine = Arc::new(MockEngine::default().with_exit_code("base:latest", 2));
    let mut config = ImageConfig::new();
    config
        .set("from", "base:latest")
        .set("commit", "true")
        .set("volumes_from", "data:latest then discard");

    let err = run_system(&engine, "app", &config).await.unwrap_err();
    match err {
        BuildError::Container(ContainerError::Exit { code, logs, .. }) => {
            assert_eq!(code, 2);
            assert_eq!(logs, "mock output");
        }
        other => panic!("expected exit error, got {other}"),
    }

    let state = engine.state();
    assert!(state.commits.is_empty());
    assert!(state.builds.is_empty());
    assert_eq!(state.create_order.len(), 2);
    assert!(state.containers.is_empty(), "containers were left behind");
}

#[tokio::test]
async fn link_member_runs_detached_and_commits_to_target() {
    init_tracing();
    let engine = Arc::new(MockEngine::default());
    let mut config = ImageConfig::new();
    config
        .set("from", "base:latest")
        .set("links", "db:9 alias db then commit to out:db");

    let images = run_system(&engine, "app", &config).await.unwrap();
    assert_eq!(images.len(), 1);
    assert_eq!(images[0].tag, "out:db");

    let state = engine.state();
    let db_name = state.create_order[0].clone();
    assert!(db_name.starts_with("db."));

    // The root was started with the link wired under its alias.
    let (_, root_start) = state
        .starts
        .iter()
        .find(|(name, _)| name.starts_with("base."))
        .expect("root was never started");
    assert_eq!(root_start.links.len(), 1);
    assert_eq!(root_start.links[0].container_name, db_name);
    assert_eq!(root_start.links[0].alias, "db");

    assert_eq!(state.commits, vec![(db_name, "out:db".to_string())]);
    assert!(state.containers.is_empty(), "containers were left behind");
}

#[tokio::test]
async fn persist_without_volumes_fails_structurally() {
    init_tracing();
    let engine = Arc::new(MockEngine::default());
    let mut config = ImageConfig::new();
    config
        .set("from", "base:latest")
        .set("volumes_from", "data:latest then persist to out:img");

    let err = run_system(&engine, "app", &config).await.unwrap_err();
    assert!(matches!(err, BuildError::NothingToPersist { .. }));

    let state = engine.state();
    assert!(state.builds.is_empty());
    // No helper was created: just the auxiliary and the root.
    assert_eq!(state.create_order.len(), 2);
    assert!(state.containers.is_empty(), "containers were left behind");
}

struct RecordingLayeredBuilder {
    built: Mutex<Vec<String>>,
}

#[async_trait]
impl LayeredImageBuilder for RecordingLayeredBuilder {
    async fn build_image(
        &self,
        image: &str,
        _config: &ImageConfig,
    ) -> Result<BuiltImage, BuildError> {
        self.built.lock().unwrap().push(image.to_string());
        Ok(BuiltImage {
            tag: image.to_string(),
            id: format!("sha256:{image}"),
        })
    }
}

#[tokio::test]
async fn batch_dispatches_by_config_keys_and_keeps_earlier_images() {
    init_tracing();
    let engine = Arc::new(MockEngine::default().with_exit_code("broken:latest", 1));

    let mut plain = ImageConfig::new();
    plain.set("from", "base:latest").set("maintainer", "cask");
    let mut consys = ImageConfig::new();
    consys.set("from", "base:latest").set("commit", "true");
    let mut broken = ImageConfig::new();
    broken.set("from", "broken:latest").set("commit", "true");

    let config: BTreeMap<String, ImageConfig> = [
        ("plain".to_string(), plain),
        ("consys".to_string(), consys),
        ("broken".to_string(), broken),
    ]
    .into_iter()
    .collect();

    let layered = RecordingLayeredBuilder {
        built: Mutex::new(Vec::new()),
    };

    let err = build_images(
        Arc::clone(&engine) as Arc<dyn ContainerEngine>,
        &layered,
        &config,
        &["plain", "consys", "broken"],
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err,
        BuildError::Container(ContainerError::Exit { code: 1, .. })
    ));

    // The plain image went through the layered path, the container system
    // committed before the failing image, and neither is rolled back.
    assert_eq!(*layered.built.lock().unwrap(), vec!["plain".to_string()]);
    let state = engine.state();
    assert_eq!(state.commits.len(), 1);
    assert_eq!(state.commits[0].1, "consys");
    assert!(state.containers.is_empty(), "containers were left behind");
}
