//! Integration tests for Distill

mod library_tests {
    use distill::config::{Config, ConfigManager};
    use distill::store::{filter, DocumentStore, Filter, JsonFileStore, MemoryStore};
    use distill::transform::provenance::{EDGES, NODES};
    use distill::transform::record::TRANSFORMS;
    use distill::transform::{
        CacheManager, Engine, EngineOptions, EngineOutput, EngineRegistry, Progress,
        TransformController,
    };
    use distill::{DistillError, DistillResult};
    use serial_test::serial;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tempfile::TempDir;

    /// Writes "Transformed: " + input
    struct PrefixEngine;

    impl Engine for PrefixEngine {
        fn transform(
            &self,
            input: &Path,
            output: &Path,
            _options: &EngineOptions,
            progress: Progress<'_>,
        ) -> DistillResult<EngineOutput> {
            progress("transforming");
            let text = fs::read_to_string(input)
                .map_err(|e| DistillError::io("reading test input", e))?;
            fs::write(output, format!("Transformed: {}", text))
                .map_err(|e| DistillError::io("writing test output", e))?;
            Ok(EngineOutput::default())
        }

        fn extension(&self, _options: &EngineOptions) -> String {
            "txt".to_string()
        }

        fn kind(&self) -> &'static str {
            "prefix"
        }
    }

    /// Artifact is a byte-for-byte copy, so artifact size equals source size
    struct CopyEngine;

    impl Engine for CopyEngine {
        fn transform(
            &self,
            input: &Path,
            output: &Path,
            _options: &EngineOptions,
            _progress: Progress<'_>,
        ) -> DistillResult<EngineOutput> {
            fs::copy(input, output).map_err(|e| DistillError::io("copying test input", e))?;
            Ok(EngineOutput::default())
        }

        fn extension(&self, _options: &EngineOptions) -> String {
            "bin".to_string()
        }

        fn kind(&self) -> &'static str {
            "copy"
        }
    }

    struct Harness {
        dir: TempDir,
        store: Arc<MemoryStore>,
        controller: TransformController,
    }

    impl Harness {
        fn new(budget: u64) -> Self {
            let dir = TempDir::new().unwrap();
            let store = Arc::new(MemoryStore::new());
            let cache =
                CacheManager::new(dir.path().join("cache"), budget, store.clone()).unwrap();
            let mut registry = EngineRegistry::with_builtins();
            registry.register("test", Arc::new(PrefixEngine), EngineOptions::new());
            registry.register("copy", Arc::new(CopyEngine), EngineOptions::new());
            let controller = TransformController::new(registry, cache, store.clone(), "test");
            Self {
                dir,
                store,
                controller,
            }
        }

        fn write(&self, name: &str, bytes: &[u8]) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, bytes).unwrap();
            path
        }

        fn transform(&self, path: &Path, engine: &str) -> distill::transform::TransformOutcome {
            self.controller
                .transform(path, engine, &EngineOptions::new(), None)
                .unwrap()
        }

        fn recorded_bytes(&self) -> u64 {
            self.controller
                .records()
                .unwrap()
                .iter()
                .map(|r| r.size_bytes)
                .sum()
        }
    }

    #[test]
    fn transform_then_read_back() {
        let h = Harness::new(1024 * 1024);
        let hello = h.write("hello.txt", b"Hello World");

        let first = h.transform(&hello, "test");
        assert!(!first.was_cached);
        assert_eq!(
            h.controller.get_content(&first.cache_key, None).unwrap(),
            "Transformed: Hello World"
        );

        let second = h.transform(&hello, "test");
        assert!(second.was_cached);
        assert_eq!(second.cache_key, first.cache_key);
    }

    #[test]
    fn budget_evicts_least_recently_used() {
        let h = Harness::new(100);
        let a = h.write("a.bin", &[b'a'; 60]);
        let b = h.write("b.bin", &[b'b'; 80]);

        assert!(!h.transform(&a, "copy").was_cached);
        assert_eq!(h.controller.cache().get_current_size().unwrap(), 60);

        assert!(!h.transform(&b, "copy").was_cached);
        assert_eq!(h.controller.cache().get_current_size().unwrap(), 80);

        let again = h.transform(&a, "copy");
        assert!(!again.was_cached, "A should have been evicted");
    }

    #[test]
    fn unknown_key_reports_not_found() {
        let h = Harness::new(1024);
        let err = h.controller.get_content(&"a".repeat(64), None).unwrap_err();
        assert!(err.to_string().contains("not found in database"));
    }

    #[test]
    fn deleted_artifact_heals_record() {
        let h = Harness::new(1024);
        let src = h.write("notes.txt", b"some notes");
        let outcome = h.transform(&src, "test");
        fs::remove_file(&outcome.cache_path).unwrap();

        let err = h
            .controller
            .get_content(&outcome.cache_key, None)
            .unwrap_err();
        assert!(err.to_string().contains("missing"));

        let records = h
            .store
            .find(TRANSFORMS, &Filter::new(), &Default::default())
            .unwrap();
        assert!(records.is_empty());
        assert_eq!(h.controller.cache().get_current_size().unwrap(), 0);
    }

    #[test]
    fn counter_matches_records_under_churn() {
        let budget = 200;
        let h = Harness::new(budget);
        let sizes = [50usize, 120, 30, 90, 10, 70, 150, 40, 60, 20];

        for (round, size) in sizes.iter().cycle().take(30).enumerate() {
            let name = format!("f{}.bin", round % 7);
            let path = h.write(&name, &vec![b'0' + (round % 10) as u8; *size]);
            h.transform(&path, "copy");

            let total = h.controller.cache().get_current_size().unwrap();
            assert_eq!(total, h.recorded_bytes(), "round {}", round);
            assert!(total <= budget, "round {}: {} over budget", round, total);
        }
    }

    #[test]
    fn oversized_artifact_is_kept_alone() {
        let h = Harness::new(50);
        let small = h.write("small.bin", &[1; 20]);
        let huge = h.write("huge.bin", &[2; 400]);

        h.transform(&small, "copy");
        h.transform(&huge, "copy");

        let records = h.controller.records().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].size_bytes, 400);
        assert_eq!(h.controller.cache().get_current_size().unwrap(), 400);
    }

    #[test]
    fn different_options_produce_distinct_entries() {
        let h = Harness::new(1024 * 1024);
        let src = h.write("data.bin", &[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]);

        let mut narrow = EngineOptions::new();
        narrow.insert("width".to_string(), 4.into());
        let default = h.transform(&src, "binary");
        let tuned = h
            .controller
            .transform(&src, "binary", &narrow, None)
            .unwrap();

        assert_ne!(default.cache_key, tuned.cache_key);
        let content = h.controller.get_content(&tuned.cache_key, None).unwrap();
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn provenance_is_not_duplicated() {
        let h = Harness::new(1024);
        let src = h.write("a.txt", b"abc");
        for _ in 0..3 {
            h.transform(&src, "test");
        }

        assert_eq!(h.store.count_documents(NODES, &Filter::new()).unwrap(), 2);
        assert_eq!(
            h.store
                .count_documents(EDGES, &filter([("type", "transform")]))
                .unwrap(),
            1
        );
    }

    #[cfg(unix)]
    #[test]
    fn referenced_artifacts_join_the_graph() {
        let h = Harness::new(1024 * 1024);
        let mut registry = EngineRegistry::with_builtins();
        let options = serde_json::json!({
            "command": ["sh", "-c",
                        "cp \"$0\" \"$1\"; echo a > \"$2/one.png\"; echo b > \"$2/two.png\"",
                        "{input}", "{output}", "{refs}"],
            "references": true,
        });
        registry.register(
            "extract",
            distill::transform::engines::create_engine(distill::config::EngineKind::Command),
            options.as_object().cloned().unwrap(),
        );
        let cache =
            CacheManager::new(h.dir.path().join("cache2"), 1024 * 1024, h.store.clone()).unwrap();
        let controller = TransformController::new(registry, cache, h.store.clone(), "extract");

        let src = h.write("doc.txt", b"document");
        controller
            .transform(&src, "extract", &EngineOptions::new(), None)
            .unwrap();

        let refers = h
            .store
            .count_documents(EDGES, &filter([("type", "refers_to")]))
            .unwrap();
        assert_eq!(refers, 2);
        assert_eq!(h.store.count_documents(NODES, &Filter::new()).unwrap(), 4);
        assert_eq!(controller.records().unwrap()[0].referenced_uris.len(), 2);
    }

    #[cfg(unix)]
    #[test]
    fn eviction_takes_references_with_it() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MemoryStore::new());
        let mut registry = EngineRegistry::with_builtins();
        let options = serde_json::json!({
            "command": ["sh", "-c",
                        "cp \"$0\" \"$1\"; head -c 500 /dev/zero > \"$2/img.png\"",
                        "{input}", "{output}", "{refs}"],
            "references": true,
        });
        registry.register(
            "extract",
            distill::transform::engines::create_engine(distill::config::EngineKind::Command),
            options.as_object().cloned().unwrap(),
        );
        let cache = CacheManager::new(dir.path().join("cache"), 100, store.clone()).unwrap();
        let controller = TransformController::new(registry, cache, store, "extract");

        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        fs::write(&a, vec![b'a'; 60]).unwrap();
        fs::write(&b, vec![b'b'; 80]).unwrap();

        let first = controller
            .transform(&a, "extract", &EngineOptions::new(), None)
            .unwrap();
        let first_refs = distill::transform::record::refs_dir(&first.cache_path);
        assert!(first_refs.join("img.png").exists());

        controller
            .transform(&b, "extract", &EngineOptions::new(), None)
            .unwrap();
        assert!(!first.cache_path.exists());
        assert!(!first_refs.exists());
        assert_eq!(controller.cache().get_current_size().unwrap(), 80);
    }

    #[test]
    fn output_collision_is_refused() {
        let h = Harness::new(1024);
        let src = h.write("a.txt", b"abc");
        let taken = h.write("taken.txt", b"do not overwrite");

        let err = h
            .controller
            .transform(&src, "test", &EngineOptions::new(), Some(&taken))
            .unwrap_err();
        assert!(matches!(err, DistillError::OutputCollision(_)));
        assert_eq!(fs::read_to_string(&taken).unwrap(), "do not overwrite");
    }

    #[test]
    fn unknown_engine_lists_available() {
        let h = Harness::new(1024);
        let src = h.write("a.txt", b"abc");
        let err = h
            .controller
            .transform(&src, "ocr", &EngineOptions::new(), None)
            .unwrap_err();
        assert!(err.to_string().contains("binary, copy, test, text"));
    }

    #[test]
    fn json_store_persists_across_controllers() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.txt");
        fs::write(&src, "persistent").unwrap();

        let build = || {
            let store: Arc<dyn DocumentStore> =
                Arc::new(JsonFileStore::open(dir.path().join("db")).unwrap());
            let cache = CacheManager::new(dir.path().join("cache"), 1024, store.clone()).unwrap();
            TransformController::new(EngineRegistry::with_builtins(), cache, store, "text")
        };

        let first = build()
            .transform(&src, "text", &EngineOptions::new(), None)
            .unwrap();
        let second = build()
            .transform(&src, "text", &EngineOptions::new(), None)
            .unwrap();
        assert!(!first.was_cached);
        assert!(second.was_cached);
    }

    #[test]
    #[serial]
    fn from_config_uses_configured_directories() {
        let dir = TempDir::new().unwrap();
        std::env::set_var("XDG_STATE_HOME", dir.path().join("state"));

        let mut config = Config::default();
        config.cache.dir = Some(dir.path().join("cache"));
        config.database.dir = Some(dir.path().join("db"));
        config.cache.max_size_bytes = Some(4096);

        let controller = TransformController::from_config(&config).unwrap();
        let src = dir.path().join("a.txt");
        fs::write(&src, "configured").unwrap();
        let content = controller
            .get_content(src.to_str().unwrap(), None)
            .unwrap();

        assert_eq!(content, "configured");
        assert_eq!(controller.stats().unwrap().budget_bytes, 4096);
        assert!(dir.path().join("db/transforms.json").exists());
        assert_eq!(ConfigManager::cache_dir(&config), dir.path().join("cache"));

        std::env::remove_var("XDG_STATE_HOME");
    }
}

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use distill::config::Config;
    use predicates::prelude::*;
    use std::fs;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Temp workspace with a config pointing all state inside it
    struct Workspace {
        dir: TempDir,
        config_path: PathBuf,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let mut config = Config::default();
            config.general.journal = false;
            config.cache.dir = Some(dir.path().join("cache"));
            config.database.dir = Some(dir.path().join("db"));

            let config_path = dir.path().join("config.toml");
            fs::write(&config_path, toml::to_string_pretty(&config).unwrap()).unwrap();
            Self { dir, config_path }
        }

        fn distill(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("distill");
            cmd.env("DISTILL_CONFIG", &self.config_path)
                .env("XDG_STATE_HOME", self.dir.path().join("state"))
                .env("CI", "1");
            cmd
        }

        fn file(&self, name: &str, content: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, content).unwrap();
            path
        }

        fn key_for(&self, path: &Path) -> String {
            let output = self
                .distill()
                .args(["transform", "--format", "plain"])
                .arg(path)
                .output()
                .unwrap();
            assert!(output.status.success());
            String::from_utf8(output.stdout).unwrap().trim().to_string()
        }
    }

    #[test]
    fn help_displays() {
        Workspace::new()
            .distill()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("durable transform cache"));
    }

    #[test]
    fn version_displays() {
        Workspace::new()
            .distill()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("distill"));
    }

    #[test]
    fn config_path_and_show() {
        let ws = Workspace::new();
        ws.distill()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
        ws.distill()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"));
    }

    #[test]
    fn config_set_updates_file() {
        let ws = Workspace::new();
        ws.distill()
            .args(["config", "set", "cache.max_size_mb", "8"])
            .assert()
            .success();
        let saved = fs::read_to_string(&ws.config_path).unwrap();
        assert!(saved.contains("max_size_mb = 8"));

        ws.distill()
            .args(["config", "set", "cache.nope", "1"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn engines_lists_builtins() {
        Workspace::new()
            .distill()
            .args(["engines", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("binary").and(predicate::str::contains("text")));
    }

    #[test]
    fn transform_reports_miss_then_hit() {
        let ws = Workspace::new();
        let src = ws.file("notes.txt", "hello");

        ws.distill()
            .arg("transform")
            .arg(&src)
            .assert()
            .success()
            .stdout(predicate::str::contains("(miss)"));
        ws.distill()
            .arg("transform")
            .arg(&src)
            .assert()
            .success()
            .stdout(predicate::str::contains("(hit)"));
    }

    #[test]
    fn get_by_key_prints_content() {
        let ws = Workspace::new();
        let src = ws.file("notes.txt", "plain text body");
        let key = ws.key_for(&src);
        assert_eq!(key.len(), 64);

        ws.distill()
            .args(["get", &key])
            .assert()
            .success()
            .stdout(predicate::str::diff("plain text body\n"));
    }

    #[test]
    fn get_by_path_transforms_first() {
        let ws = Workspace::new();
        let src = ws.file("notes.txt", "via path");
        ws.distill()
            .arg("get")
            .arg(&src)
            .assert()
            .success()
            .stdout(predicate::str::contains("via path"));
    }

    #[test]
    fn get_unknown_key_fails() {
        Workspace::new()
            .distill()
            .args(["get", &"b".repeat(64)])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not found in database"));
    }

    #[test]
    fn get_missing_artifact_fails_then_not_found() {
        let ws = Workspace::new();
        let src = ws.file("notes.txt", "soon gone");
        let key = ws.key_for(&src);
        fs::remove_file(ws.dir.path().join("cache").join(format!("{}.txt", key))).unwrap();

        ws.distill()
            .args(["get", &key])
            .assert()
            .failure()
            .stderr(predicate::str::contains("missing"));
        ws.distill()
            .args(["get", &key])
            .assert()
            .failure()
            .stderr(predicate::str::contains("not found in database"));
    }

    #[test]
    fn transform_unknown_engine_fails_with_hint() {
        let ws = Workspace::new();
        let src = ws.file("notes.txt", "x");
        ws.distill()
            .args(["transform", "-e", "ocr"])
            .arg(&src)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown engine: ocr"))
            .stderr(predicate::str::contains("distill engines"));
    }

    #[test]
    fn transform_missing_file_fails() {
        let ws = Workspace::new();
        ws.distill()
            .arg("transform")
            .arg(ws.dir.path().join("absent.txt"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("File not found"));
    }

    #[test]
    fn cache_stats_list_and_clear() {
        let ws = Workspace::new();
        let key = ws.key_for(&ws.file("a.txt", "aaaa"));

        ws.distill()
            .args(["cache", "stats", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"entries\": 1"));
        ws.distill()
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains(key.as_str()));

        ws.distill()
            .args(["cache", "clear", "--yes"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Cleared 1 artifact(s)"));
        ws.distill()
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached artifacts"));
    }

    #[test]
    fn cache_clear_without_yes_aborts_non_interactively() {
        let ws = Workspace::new();
        ws.key_for(&ws.file("a.txt", "aaaa"));

        ws.distill()
            .args(["cache", "clear"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Aborted"));
    }

    #[test]
    fn cache_recount_repairs_counter() {
        let ws = Workspace::new();
        ws.key_for(&ws.file("a.txt", "12345"));
        fs::write(
            ws.dir.path().join("cache/cache_size.json"),
            r#"{"total_size_bytes":999}"#,
        )
        .unwrap();

        ws.distill()
            .args(["cache", "recount"])
            .assert()
            .success()
            .stdout(predicate::str::contains("999 B -> 5 B"));
    }

    #[test]
    fn completions_generate() {
        Workspace::new()
            .distill()
            .args(["completions", "bash"])
            .assert()
            .success()
            .stdout(predicate::str::contains("distill"));
    }
}
