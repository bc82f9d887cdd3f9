// tests/config_loading.rs
mod common;
use crate::common::{init_tracing, with_timeout, write_config};

use std::error::Error;
use std::time::Duration;

use taskdag::config::{CommandSpec, build_graph, load_and_validate, load_from_path};
use taskdag::dag::TaskStatus;
use taskdag::errors::DagError;
use taskdag::exec::{TaskKind, VolumeMode};

type TestResult = Result<(), Box<dyn Error>>;

const PIPELINE: &str = r#"
[config]
max_parallel_workers = 2
tick_interval_ms = 5

[[task]]
name = "build"
kind = "shell"
command = ["sh", "-c", "echo building"]

[[task]]
name = "lint"
kind = "shell"
command = "echo linting"

[[task]]
name = "test"
kind = "container"
image = "ubuntu:22.04"
command = "make test"
volumes = [{ host = ".", container = "/src", mode = "ro" }, { host = "/tmp", container = "/scratch" }]
after = ["build", "lint"]
"#;

#[test]
fn parses_tasks_in_file_order() -> TestResult {
    init_tracing();

    let file = write_config(PIPELINE);
    let cfg = load_and_validate(file.path())?;

    assert_eq!(cfg.config.max_parallel_workers, 2);
    assert_eq!(cfg.config.tick_interval_ms, 5);

    let names: Vec<&str> = cfg.task.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["build", "lint", "test"]);

    assert_eq!(
        cfg.task[0].command,
        Some(CommandSpec::Argv(vec!["sh".into(), "-c".into(), "echo building".into()]))
    );
    assert_eq!(cfg.task[1].command, Some(CommandSpec::Line("echo linting".into())));
    assert_eq!(cfg.task[2].volumes[0].mode, VolumeMode::ReadOnly);
    assert_eq!(cfg.task[2].volumes[1].mode, VolumeMode::ReadWrite);
    assert_eq!(cfg.task[2].after, vec!["build", "lint"]);

    let options = cfg.graph_options();
    assert_eq!(options.max_parallel_workers, 2);
    assert_eq!(options.tick_interval, Duration::from_millis(5));

    Ok(())
}

#[test]
fn builds_graph_with_kinds_and_edges() -> TestResult {
    init_tracing();

    let file = write_config(PIPELINE);
    let cfg = load_and_validate(file.path())?;
    let graph = build_graph(&cfg, cfg.graph_options())?;

    assert_eq!(graph.len(), 3);
    let build = graph.task_by_name("build").ok_or("missing build")?;
    let test = graph.task_by_name("test").ok_or("missing test")?;
    assert_eq!(build.kind(), TaskKind::Shell);
    assert_eq!(build.describe(), "sh -c echo building");
    assert_eq!(test.kind(), TaskKind::Container);
    assert_eq!(test.describe(), "[ubuntu:22.04] make test");
    assert_eq!(test.upstream(), &[graph.id_of("build")?, graph.id_of("lint")?]);
    assert!(graph.tasks().all(|t| t.status() == TaskStatus::Waiting));

    Ok(())
}

#[test]
fn defaults_apply_when_config_section_is_absent() -> TestResult {
    let file = write_config(
        r#"
[[task]]
name = "only"
kind = "shell"
command = "true"
"#,
    );
    let cfg = load_and_validate(file.path())?;

    assert_eq!(cfg.config.max_parallel_workers, 1);
    assert_eq!(cfg.config.tick_interval_ms, 1000);

    Ok(())
}

#[test]
fn empty_config_is_rejected() {
    let file = write_config("[config]\nmax_parallel_workers = 2\n");

    match load_and_validate(file.path()) {
        Err(DagError::ConfigError(msg)) => assert!(msg.contains("at least one")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn zero_workers_or_tick_is_rejected() {
    for section in ["max_parallel_workers = 0", "tick_interval_ms = 0"] {
        let file = write_config(&format!(
            "[config]\n{section}\n\n[[task]]\nname = \"a\"\nkind = \"shell\"\ncommand = \"true\"\n"
        ));
        assert!(
            matches!(load_and_validate(file.path()), Err(DagError::ConfigError(_))),
            "{section}"
        );
    }
}

#[test]
fn unknown_dependency_is_rejected() {
    let file = write_config(
        r#"
[[task]]
name = "A"
kind = "shell"
command = "echo A"
after = ["NonExistent"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(DagError::ConfigError(msg)) => {
            assert!(msg.contains("unknown dependency"));
            assert!(msg.contains("NonExistent"));
        }
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn self_dependency_is_rejected() {
    let file = write_config(
        r#"
[[task]]
name = "A"
kind = "shell"
command = "echo A"
after = ["A"]
"#,
    );

    match load_and_validate(file.path()) {
        Err(DagError::ConfigError(msg)) => assert!(msg.contains("itself")),
        other => panic!("expected ConfigError, got {other:?}"),
    }
}

#[test]
fn duplicate_names_are_rejected() {
    let file = write_config(
        r#"
[[task]]
name = "A"
kind = "shell"
command = "true"

[[task]]
name = "A"
kind = "shell"
command = "false"
"#,
    );

    assert!(matches!(
        load_and_validate(file.path()),
        Err(DagError::DuplicateName(name)) if name == "A"
    ));
}

#[test]
fn unknown_kind_and_missing_parameters_are_rejected() {
    let unknown = write_config("[[task]]\nname = \"a\"\nkind = \"lambda\"\ncommand = \"x\"\n");
    assert!(matches!(
        load_and_validate(unknown.path()),
        Err(DagError::UnknownTaskKind(kind)) if kind == "lambda"
    ));

    let no_image = write_config("[[task]]\nname = \"a\"\nkind = \"container\"\ncommand = \"x\"\n");
    assert!(matches!(
        load_and_validate(no_image.path()),
        Err(DagError::MissingParameter { param: "image", .. })
    ));

    let no_command = write_config("[[task]]\nname = \"a\"\nkind = \"shell\"\n");
    assert!(matches!(
        load_and_validate(no_command.path()),
        Err(DagError::MissingParameter { param: "command", .. })
    ));

    let in_process = write_config("[[task]]\nname = \"a\"\nkind = \"in_process\"\n");
    assert!(matches!(
        load_and_validate(in_process.path()),
        Err(DagError::ConfigError(_))
    ));
}

#[test]
fn cycle_is_rejected_when_building_the_graph() -> TestResult {
    let file = write_config(
        r#"
[[task]]
name = "A"
kind = "shell"
command = "echo A"
after = ["B"]

[[task]]
name = "B"
kind = "shell"
command = "echo B"
after = ["A"]
"#,
    );

    let cfg = load_and_validate(file.path())?;
    match build_graph(&cfg, cfg.graph_options()) {
        Err(DagError::Cycle { upstream, downstream }) => {
            assert_eq!(upstream, "A");
            assert_eq!(downstream, "B");
        }
        other => panic!("expected Cycle, got {other:?}"),
    }

    Ok(())
}

#[test]
fn malformed_toml_and_missing_file_surface_typed_errors() {
    let file = write_config("[[task]\nname = ");
    assert!(matches!(load_from_path(file.path()), Err(DagError::TomlError(_))));

    assert!(matches!(
        load_and_validate("/definitely/not/here/Taskdag.toml"),
        Err(DagError::IoError(_))
    ));
}

#[cfg(unix)]
#[tokio::test]
async fn config_graph_runs_to_completion() -> TestResult {
    with_timeout(async {
        init_tracing();

        let file = write_config(
            r#"
[config]
max_parallel_workers = 2
tick_interval_ms = 5

[[task]]
name = "fetch"
kind = "shell"
command = "echo fetched"

[[task]]
name = "broken"
kind = "shell"
command = ["sh", "-c", "exit 2"]

[[task]]
name = "publish"
kind = "shell"
command = "echo published"
after = ["fetch", "broken"]
"#,
        );
        let cfg = load_and_validate(file.path())?;
        let mut graph = build_graph(&cfg, cfg.graph_options())?;

        let summary = graph.run().await;

        assert_eq!(summary.succeeded, vec!["fetch"]);
        assert_eq!(summary.failed, vec!["broken", "publish"]);
        assert_eq!(graph.logs(graph.id_of("fetch")?), "fetched\n");

        Ok(())
    })
    .await
}
