use std::fs;
use std::sync::Arc;

use async_trait::async_trait;
use parrot_engine::{DrainFailurePolicy, SAVE_CONFIGURATION_MESSAGE, SessionError, SessionOptions, Stage, read_configuration, run};
use parrot_registry::{
    Drain, DrainHandler, DrainHandlerRef, DrainTable, EntityKind, HandlerError, HandlerRegistry, PartialConfiguration, SelectionError, Side,
    Source, SourceHandler, SourceHandlerRef, SourceTable,
};
use parrot_types::{TestResult, TestStatus};
use parrot_util::{Prompter, ScriptedPrompter};
use serde::{Deserialize, Serialize};
use serde_json::json;

const TOKEN_MESSAGE: &str = "Token:";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Origin {
    origin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Prefix {
    prefix: String,
}

struct FixtureSource {
    origin: Origin,
    token: String,
}

#[async_trait]
impl Source for FixtureSource {
    type Inlet = Prefix;

    async fn get_test_results(&self, inlet: &Prefix) -> Result<Vec<TestResult>, HandlerError> {
        assert_eq!(self.token, "s3cret");
        Ok(vec![
            TestResult::new(format!("{}1", inlet.prefix), "first", TestStatus::Pass),
            TestResult::new(format!("{}2", inlet.prefix), "second", TestStatus::Fail),
        ])
    }
}

/// Stores the origin, asks for the token every time.
struct FixtureSourceHandler;

#[async_trait]
impl SourceHandler for FixtureSourceHandler {
    type Source = FixtureSource;
    type SerializedSource = Origin;
    type SerializedInlet = Prefix;

    async fn build_source(&self, prompter: &dyn Prompter) -> Result<FixtureSource, HandlerError> {
        let origin = prompter.input("Origin:", Some("fixture")).await?;
        let token = prompter.password(TOKEN_MESSAGE).await?;
        Ok(FixtureSource {
            origin: Origin { origin },
            token,
        })
    }

    fn serialize_source(&self, source: &FixtureSource) -> Result<Origin, HandlerError> {
        Ok(source.origin.clone())
    }

    async fn deserialize_source(&self, serialized: Origin, prompter: &dyn Prompter) -> Result<FixtureSource, HandlerError> {
        let token = prompter.password(TOKEN_MESSAGE).await?;
        Ok(FixtureSource { origin: serialized, token })
    }

    async fn build_inlet(&self, prompter: &dyn Prompter) -> Result<Prefix, HandlerError> {
        let prefix = prompter.input("Prefix:", None).await?;
        Ok(Prefix { prefix })
    }

    fn serialize_inlet(&self, inlet: &Prefix) -> Result<Prefix, HandlerError> {
        Ok(inlet.clone())
    }

    async fn deserialize_inlet(&self, serialized: Prefix, _prompter: &dyn Prompter) -> Result<Prefix, HandlerError> {
        Ok(serialized)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Label {
    label: String,
}

struct RecordingDrain;

#[async_trait]
impl Drain for RecordingDrain {
    type Outlet = Label;
    type Output = Vec<String>;

    async fn write_test_results(&self, results: &[TestResult], outlet: &Label) -> Result<Vec<String>, HandlerError> {
        Ok(results
            .iter()
            .map(|result| format!("{}:{}:{}", outlet.label, result.id, result.status))
            .collect())
    }
}

struct RecordingDrainHandler;

#[async_trait]
impl DrainHandler for RecordingDrainHandler {
    type Drain = RecordingDrain;
    type SerializedDrain = serde_json::Value;
    type SerializedOutlet = Label;

    async fn build_drain(&self, _prompter: &dyn Prompter) -> Result<RecordingDrain, HandlerError> {
        Ok(RecordingDrain)
    }

    fn serialize_drain(&self, _drain: &RecordingDrain) -> Result<serde_json::Value, HandlerError> {
        Ok(json!({}))
    }

    async fn deserialize_drain(&self, _serialized: serde_json::Value, _prompter: &dyn Prompter) -> Result<RecordingDrain, HandlerError> {
        Ok(RecordingDrain)
    }

    async fn build_outlet(&self, prompter: &dyn Prompter) -> Result<Label, HandlerError> {
        let label = prompter.input("Label:", None).await?;
        Ok(Label { label })
    }

    fn serialize_outlet(&self, outlet: &Label) -> Result<Label, HandlerError> {
        Ok(outlet.clone())
    }

    async fn deserialize_outlet(&self, serialized: Label, _prompter: &dyn Prompter) -> Result<Label, HandlerError> {
        Ok(serialized)
    }
}

struct BrokenDrain;

#[async_trait]
impl Drain for BrokenDrain {
    type Outlet = ();
    type Output = ();

    async fn write_test_results(&self, _results: &[TestResult], _outlet: &()) -> Result<(), HandlerError> {
        Err(HandlerError::collaborator("posting results", std::io::Error::other("connection refused")))
    }
}

struct BrokenDrainHandler;

#[async_trait]
impl DrainHandler for BrokenDrainHandler {
    type Drain = BrokenDrain;
    type SerializedDrain = ();
    type SerializedOutlet = ();

    async fn build_drain(&self, _prompter: &dyn Prompter) -> Result<BrokenDrain, HandlerError> {
        Ok(BrokenDrain)
    }

    fn serialize_drain(&self, _drain: &BrokenDrain) -> Result<(), HandlerError> {
        Ok(())
    }

    async fn deserialize_drain(&self, _serialized: (), _prompter: &dyn Prompter) -> Result<BrokenDrain, HandlerError> {
        Ok(BrokenDrain)
    }

    async fn build_outlet(&self, _prompter: &dyn Prompter) -> Result<(), HandlerError> {
        Ok(())
    }

    fn serialize_outlet(&self, _outlet: &()) -> Result<(), HandlerError> {
        Ok(())
    }

    async fn deserialize_outlet(&self, _serialized: (), _prompter: &dyn Prompter) -> Result<(), HandlerError> {
        Ok(())
    }
}

fn registry() -> HandlerRegistry {
    let source: SourceHandlerRef = Arc::new(FixtureSourceHandler);
    let recorder: DrainHandlerRef = Arc::new(RecordingDrainHandler);
    let broken: DrainHandlerRef = Arc::new(BrokenDrainHandler);
    let mut registry = HandlerRegistry::new();
    registry.merge(
        PartialConfiguration::new()
            .with_sources(SourceTable::new().with_branch("fixture", SourceTable::new().with_leaf("plan", source)))
            .with_drains(DrainTable::new().with_leaf("recorder", recorder).with_leaf("broken", broken)),
    );
    registry
}

fn replay(path: std::path::PathBuf, policy: DrainFailurePolicy) -> SessionOptions {
    SessionOptions {
        config_file: Some(path),
        drain_failure_policy: policy,
    }
}

fn ids(results: &[TestResult]) -> Vec<&str> {
    results.iter().map(|result| result.id.as_str()).collect()
}

#[tokio::test]
async fn fresh_sessions_deliver_results_in_order_and_save() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("config.json");
    let prompter = ScriptedPrompter::new([
        "fixture",
        "plan",
        "",
        "s3cret",
        "nightly",
        "T",
        "smoke",
        "n",
        "n",
        "recorder",
        "log",
        "first",
        "",
        "n",
        "n",
        "y",
        path.to_str().unwrap(),
    ]);

    let report = run(&registry(), &prompter, &SessionOptions::default()).await.unwrap();

    assert_eq!(prompter.remaining(), 0);
    assert_eq!(ids(&report.results), vec!["T1", "T2"]);
    assert_eq!(report.outputs.len(), 1);
    assert_eq!(report.outputs[0].drain, "log");
    assert_eq!(report.outputs[0].outlet, "outlet 1");
    assert_eq!(report.outputs[0].output, json!(["first:T1:pass", "first:T2:fail"]));
    assert!(report.is_success());

    let saved = read_configuration(&path).unwrap();
    assert_eq!(saved.sources[0].name, "nightly");
    assert_eq!(saved.sources[0].selections, vec!["fixture", "plan"]);
    assert_eq!(saved.sources[0].configuration, json!({ "origin": "fixture" }));
    assert_eq!(saved.sources[0].inlets[0].name, "smoke");
    assert_eq!(saved.sources[0].inlets[0].configuration, json!({ "prefix": "T" }));
    assert_eq!(saved.drains[0].selections, vec!["recorder"]);
    assert!(!fs::read_to_string(&path).unwrap().contains("s3cret"));

    let replayed = ScriptedPrompter::new(["s3cret"]);
    let again = run(&registry(), &replayed, &replay(path, DrainFailurePolicy::Abort)).await.unwrap();
    assert_eq!(replayed.asked(), vec![TOKEN_MESSAGE]);
    assert_eq!(again.outputs, report.outputs);
}

#[tokio::test]
async fn declined_saves_skip_the_path_prompt() {
    let prompter = ScriptedPrompter::new(["fixture", "plan", "", "s3cret", "", "T", "", "", "", "recorder", "", "first", "", "", "", "n"]);

    let report = run(&registry(), &prompter, &SessionOptions::default()).await.unwrap();

    assert_eq!(prompter.remaining(), 0);
    assert_eq!(prompter.asked().last().map(String::as_str), Some(SAVE_CONFIGURATION_MESSAGE));
    assert_eq!(report.outputs[0].drain, "recorder");
}

#[tokio::test]
async fn replays_visit_every_parameter_set_in_stored_order() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("config.json");
    let document = json!({
        "sources": [{
            "name": "nightly",
            "selections": ["fixture", "plan"],
            "configuration": { "origin": "ci" },
            "inlets": [
                { "name": "smoke", "configuration": { "prefix": "S" } },
                { "name": "regression", "configuration": { "prefix": "R" } }
            ]
        }],
        "drains": [
            { "selections": ["recorder"], "configuration": {}, "outlet": { "label": "legacy" } },
            {
                "name": "log",
                "selections": ["recorder"],
                "configuration": {},
                "outlets": [
                    { "name": "a", "configuration": { "label": "a" } },
                    { "name": "b", "configuration": { "label": "b" } }
                ]
            }
        ]
    });
    fs::write(&path, document.to_string()).unwrap();
    let prompter = ScriptedPrompter::new(["s3cret"]);

    let report = run(&registry(), &prompter, &replay(path, DrainFailurePolicy::Abort)).await.unwrap();

    assert_eq!(ids(&report.results), vec!["S1", "S2", "R1", "R2"]);
    let written: Vec<(&str, &str)> = report
        .outputs
        .iter()
        .map(|output| (output.drain.as_str(), output.outlet.as_str()))
        .collect();
    assert_eq!(written, vec![("recorder", "default"), ("log", "a"), ("log", "b")]);
    assert_eq!(report.outputs[2].output[3], json!("b:R2:fail"));
}

fn broken_first(directory: &tempfile::TempDir) -> std::path::PathBuf {
    let path = directory.path().join("config.json");
    let document = json!({
        "sources": [{
            "name": "nightly",
            "selections": ["fixture", "plan"],
            "configuration": { "origin": "ci" },
            "inlets": [{ "name": "smoke", "configuration": { "prefix": "T" } }]
        }],
        "drains": [
            { "name": "teams", "selections": ["broken"], "configuration": null, "outlets": [{ "name": "channel", "configuration": null }] },
            { "name": "log", "selections": ["recorder"], "configuration": {}, "outlets": [{ "name": "all", "configuration": { "label": "all" } }] }
        ]
    });
    fs::write(&path, document.to_string()).unwrap();
    path
}

#[tokio::test]
async fn drain_failures_abort_by_default() {
    let directory = tempfile::tempdir().unwrap();
    let path = broken_first(&directory);

    let error = run(&registry(), &ScriptedPrompter::new(["s3cret"]), &replay(path, DrainFailurePolicy::Abort))
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        SessionError::Handler {
            stage: Stage::Run,
            kind: EntityKind::Outlet,
            ..
        }
    ));
    assert!(error.to_string().contains("teams / channel"), "{error}");
    assert!(error.to_string().contains("connection refused"), "{error}");
}

#[tokio::test]
async fn isolated_drain_failures_let_other_outlets_run() {
    let directory = tempfile::tempdir().unwrap();
    let path = broken_first(&directory);

    let report = run(&registry(), &ScriptedPrompter::new(["s3cret"]), &replay(path, DrainFailurePolicy::Isolate))
        .await
        .unwrap();

    assert!(!report.is_success());
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].drain, "teams");
    assert_eq!(report.outputs.len(), 1);
    assert_eq!(report.outputs[0].output, json!(["all:T1:pass", "all:T2:fail"]));
}

#[tokio::test]
async fn unknown_selection_paths_fail_before_anything_runs() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("config.json");
    fs::write(
        &path,
        json!({ "sources": [], "drains": [{ "selections": ["missing", "path"], "configuration": {}, "outlets": [] }] }).to_string(),
    )
    .unwrap();

    let error = run(&registry(), &ScriptedPrompter::default(), &replay(path, DrainFailurePolicy::Abort))
        .await
        .unwrap_err();

    match &error {
        SessionError::Selection {
            side: Side::Drain,
            source: SelectionError::HandlerNotFound { path },
        } => assert_eq!(path, "missing -> path"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn empty_source_tables_fail_without_prompting() {
    let prompter = ScriptedPrompter::default();

    let error = run(&HandlerRegistry::new(), &prompter, &SessionOptions::default()).await.unwrap_err();

    assert!(matches!(
        error,
        SessionError::Selection {
            side: Side::Source,
            source: SelectionError::EmptyTable { .. }
        }
    ));
    assert!(prompter.asked().is_empty());
}
