use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

/// Human-readable dump of the environment and the runtime bootstrap script,
/// attached to dump and save failures.
///
/// The environment is passed in rather than read from the process so the
/// report can be built for any captured context.
pub fn diagnostic_report(
    environment: &BTreeMap<String, String>,
    bootstrap_script: &Path,
) -> String {
    let mut report = String::from("environment variables\n");
    for (name, value) in environment {
        let _ = writeln!(report, "{name}={value}");
    }

    let _ = write!(report, "\n{}:\n", script_label(bootstrap_script));
    match std::fs::read_to_string(bootstrap_script) {
        Ok(contents) => {
            for line in contents.lines() {
                report.push_str(line);
                report.push('\n');
            }
        }
        Err(error) => {
            let _ = writeln!(
                report,
                "<unable to read {}: {error}>",
                bootstrap_script.display()
            );
        }
    }

    report
}

fn script_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
