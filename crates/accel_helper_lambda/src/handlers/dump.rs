use std::path::{Path, PathBuf};

use accel_helper_core::contract::SUCCESS_MARKER;
use accel_helper_core::diagnostics::diagnostic_report;
use accel_helper_core::listing::list_dir_tree;
use accel_helper_core::HelperError;
use serde_json::json;

use crate::adapters::process::{CommandInvocation, CommandOutput};
use crate::handlers::dispatch::HelperContext;
use crate::logging::{log_error, log_info};

/// Dumps the runtime's class data into `source_dir` and, when `archive` is
/// non-empty, packs it into that file.
///
/// A failed dump or save is still a reply: the text carries the tool output
/// and the diagnostic report, and only a fully successful run starts with the
/// `success,` marker. `Err` is reserved for failures to start the dump.
pub fn run_dump(
    context: &HelperContext<'_>,
    source_dir: &str,
    archive: Option<&str>,
) -> Result<String, HelperError> {
    let runtime_home = context.process.require_runtime_home()?;
    let pid = context.process.pid.to_string();
    let invocation = CommandInvocation::new(tool_program(context), &context.config.work_dir)
        .args(["dump", runtime_home, pid.as_str()]);

    log_info(
        "dump_workflow",
        "dump_started",
        json!({
            "runtime_home": runtime_home,
            "pid": context.process.pid,
            "source_dir": source_dir,
        }),
    );
    let output = context.runner.run(&invocation)?;
    let mut report = dump_output_report(&output);

    if !output.success() {
        log_error(
            "dump_workflow",
            "dump_failed",
            json!({ "exit_code": output.exit_code, "source_dir": source_dir }),
        );
        report.push_str("dump error\n\n");
        report.push_str(&diagnostics(context));
        return Ok(report);
    }

    report.push_str("Acceleration file list: \n");
    report.push_str(&list_dir_tree(source_dir));

    if let Some(archive) = archive.filter(|value| !value.is_empty()) {
        match save_archive(context, source_dir, archive) {
            Ok(message) => report.push_str(&message),
            Err(error) => {
                log_error(
                    "dump_workflow",
                    "save_failed",
                    json!({ "archive": archive, "error": error.to_string() }),
                );
                return Ok(format!("{error}\n{}", diagnostics(context)));
            }
        }
    }

    log_info(
        "dump_workflow",
        "dump_completed",
        json!({ "source_dir": source_dir, "archive": archive }),
    );
    Ok(format!("{SUCCESS_MARKER},{report}"))
}

/// Packs `source_dir` into `archive` with the dump tool's `save` command.
pub fn save_archive(
    context: &HelperContext<'_>,
    source_dir: &str,
    archive: &str,
) -> Result<String, HelperError> {
    let invocation = CommandInvocation::new(tool_program(context), &context.config.work_dir)
        .args(["save", source_dir, archive]);
    let output = context.runner.run(&invocation)?;
    if !output.success() {
        return Err(HelperError::SaveFailed {
            output: output.stdout,
        });
    }

    let created = resolve_in(&context.config.work_dir, archive).exists();
    Ok(format!(
        "archive file created: [{}]",
        if created { archive } else { "" }
    ))
}

fn dump_output_report(output: &CommandOutput) -> String {
    let mut report = format!("\nstdout of dump:\n{}", output.stdout);
    if !output.stderr.is_empty() {
        report.push_str("\nstderr of dump:\n");
        report.push_str(&output.stderr);
    }
    report
}

fn diagnostics(context: &HelperContext<'_>) -> String {
    diagnostic_report(
        &context.process.environment,
        &context.config.bootstrap_script,
    )
}

fn tool_program(context: &HelperContext<'_>) -> String {
    context.config.dump_tool.to_string_lossy().into_owned()
}

fn resolve_in(base: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::fs;

    use super::*;
    use crate::adapters::process::testing::{failed_output, ok_output, ScriptedRunner};
    use crate::adapters::process_context::ProcessContext;
    use crate::config::HelperConfig;

    struct Fixture {
        _dir: tempfile::TempDir,
        config: HelperConfig,
        process: ProcessContext,
        source_dir: String,
        archive: String,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir");
        let source_dir = dir.path().join("sr");
        fs::create_dir(&source_dir).expect("create source dir");
        fs::write(source_dir.join("classes.jsa"), b"jsa").expect("write jsa");
        fs::write(dir.path().join("bootstrap.sh"), "exec java\n").expect("write bootstrap");

        let config = HelperConfig {
            dump_tool: "/code/quickstart.sh".into(),
            work_dir: dir.path().to_path_buf(),
            bootstrap_script: dir.path().join("bootstrap.sh"),
            ..HelperConfig::default()
        };
        let process = ProcessContext {
            runtime_home: Some("/usr/lib/jvm/java-11".to_string()),
            pid: 4242,
            environment: BTreeMap::from([("FC_REGION".to_string(), "cn-chengdu".to_string())]),
        };
        let archive = dir.path().join("srctl.tar.gz").display().to_string();

        Fixture {
            source_dir: source_dir.display().to_string(),
            archive,
            config,
            process,
            _dir: dir,
        }
    }

    fn context<'a>(fixture: &'a Fixture, runner: &'a ScriptedRunner) -> HelperContext<'a> {
        HelperContext {
            config: &fixture.config,
            runner,
            process: &fixture.process,
        }
    }

    #[test]
    fn successful_dump_lists_source_dir_with_marker() {
        let fixture = fixture();
        let runner = ScriptedRunner::with_outputs(vec![ok_output("dumped 812 classes\n")]);

        let report = run_dump(&context(&fixture, &runner), &fixture.source_dir, None)
            .expect("dump should run");

        let expected_head = "success,\nstdout of dump:\ndumped 812 classes\n";
        assert!(report.starts_with(expected_head));
        assert!(report.contains("Acceleration file list: \nclasses.jsa\n"));
        assert!(!report.contains("stderr of dump"));
        assert_eq!(
            runner.command_lines(),
            vec!["/code/quickstart.sh dump /usr/lib/jvm/java-11 4242"]
        );
    }

    #[test]
    fn failed_dump_appends_diagnostics_without_marker() {
        let fixture = fixture();
        let output = failed_output("", "jcmd: no such process\n");
        let runner = ScriptedRunner::with_outputs(vec![output]);

        let report = run_dump(
            &context(&fixture, &runner),
            &fixture.source_dir,
            Some(fixture.archive.as_str()),
        )
        .expect("dump should run");

        assert!(!report.starts_with(SUCCESS_MARKER));
        let stderr_section = "\nstderr of dump:\njcmd: no such process\n";
        let diagnostic_section = "dump error\n\nenvironment variables\nFC_REGION=cn-chengdu\n";
        assert!(report.contains(stderr_section));
        assert!(report.contains(diagnostic_section));
        assert!(report.contains("bootstrap.sh:\nexec java\n"));
        assert!(!report.contains("Acceleration file list"));
        assert_eq!(
            runner.invocations().len(),
            1,
            "save must not run after a failed dump"
        );
    }

    #[test]
    fn save_reports_created_archive() {
        let fixture = fixture();
        fs::write(&fixture.archive, b"tar").expect("write archive");
        let runner = ScriptedRunner::succeeding();

        let report = run_dump(
            &context(&fixture, &runner),
            &fixture.source_dir,
            Some(fixture.archive.as_str()),
        )
        .expect("dump should run");

        assert!(report.starts_with("success,"));
        let created = format!("archive file created: [{}]", fixture.archive);
        assert!(report.ends_with(&created));
        assert_eq!(
            runner.command_lines()[1],
            format!(
                "/code/quickstart.sh save {} {}",
                fixture.source_dir, fixture.archive
            )
        );
    }

    #[test]
    fn save_leaves_brackets_empty_when_archive_is_absent() {
        let fixture = fixture();
        let runner = ScriptedRunner::succeeding();

        let report = run_dump(
            &context(&fixture, &runner),
            &fixture.source_dir,
            Some(fixture.archive.as_str()),
        )
        .expect("dump should run");

        assert!(report.ends_with("archive file created: []"));
    }

    #[test]
    fn failed_save_returns_output_and_diagnostics() {
        let fixture = fixture();
        let runner = ScriptedRunner::with_outputs(vec![
            ok_output(""),
            failed_output("tar: sr: Cannot stat\n", "ignored\n"),
        ]);

        let report = run_dump(
            &context(&fixture, &runner),
            &fixture.source_dir,
            Some(fixture.archive.as_str()),
        )
        .expect("dump should run");

        let expected_head = "save error: tar: sr: Cannot stat\n\nenvironment variables\n";
        assert!(report.starts_with(expected_head));
        assert!(!report.contains("ignored"));
        assert!(!report.contains(SUCCESS_MARKER));
    }

    #[test]
    fn empty_archive_name_skips_save() {
        let fixture = fixture();
        let runner = ScriptedRunner::succeeding();

        run_dump(&context(&fixture, &runner), &fixture.source_dir, Some(""))
            .expect("dump should run");

        assert_eq!(runner.invocations().len(), 1);
    }

    #[test]
    fn missing_runtime_home_is_fatal() {
        let mut fixture = fixture();
        fixture.process.runtime_home = None;
        let runner = ScriptedRunner::succeeding();

        let error = run_dump(&context(&fixture, &runner), &fixture.source_dir, None)
            .expect_err("dump should fail");

        assert!(matches!(error, HelperError::MissingRuntimeHome));
        assert!(runner.invocations().is_empty());
    }
}
