use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the acceleration helper workspace",
    long_about = "A unified CLI for CI checks and for packaging the acceleration\n\
                  helper function into a deployable code zip."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run CI checks (fmt, clippy, tests)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
    /// Build the helper binary and package it as a function code zip
    Package {
        /// Compilation target triple for the function binary
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
        /// Build profile used for the binary
        #[arg(value_enum, long, default_value_t = BuildProfile::Release)]
        profile: BuildProfile,
        /// Extra files placed at the zip root (dump tool, storage CLI, ...)
        #[arg(long = "include")]
        includes: Vec<PathBuf>,
        /// Zip file to write
        #[arg(long, default_value = "dist/accel_helper.zip")]
        output: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting and clippy
    Lint,
    /// Workspace tests
    Test,
    /// Lint + test
    Check,
}

#[derive(Clone, Copy, ValueEnum)]
enum BuildProfile {
    Debug,
    Release,
}

impl BuildProfile {
    fn dir_name(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }

    fn as_cargo_flag(self) -> Option<&'static str> {
        match self {
            Self::Debug => None,
            Self::Release => Some("--release"),
        }
    }
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    Command::new("cargo")
        .args(args)
        .status()
        .expect("failed to execute cargo")
}

fn run_cargo(args: &[&str]) {
    let status = cargo(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn package_helper(target: &str, profile: BuildProfile, includes: &[PathBuf], output: &Path) {
    ensure_rust_target_installed(target);

    step("Build helper binary");
    let mut cargo_args = vec![
        "build",
        "-p",
        "accel_helper_lambda",
        "--target",
        target,
        "--bin",
        "accel_helper",
    ];
    if let Some(flag) = profile.as_cargo_flag() {
        cargo_args.push(flag);
    }
    run_cargo(&cargo_args);

    step("Package function code zip");
    let target_dir = Path::new("target").join(target).join(profile.dir_name());
    if let Some(parent) = output
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        fs::create_dir_all(parent).expect("failed to create zip output directory");
    }

    package_function_zip(
        &target_dir.join(binary_name("accel_helper", target)),
        includes,
        output,
    );

    eprintln!("\nPackaged artifact:\n- {}", output.display());
}

fn ensure_rust_target_installed(target: &str) {
    let output = Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output();

    let output = match output {
        Ok(value) => value,
        Err(error) => {
            eprintln!(
                "warning: failed to run `rustup target list --installed` ({error}); continuing without target preflight"
            );
            return;
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        panic!(
            "failed to list installed rust targets; run `rustup target list --installed` manually. details: {}",
            stderr.trim()
        );
    }

    let installed = String::from_utf8_lossy(&output.stdout);
    if !installed.lines().any(|line| line.trim() == target) {
        panic!(
            "required rust target `{target}` is not installed. install it with `rustup target add {target}` and re-run `cargo run -p xtask -- package`"
        );
    }
}

fn binary_name(bin_name: &str, target: &str) -> String {
    if target.contains("windows") {
        format!("{bin_name}.exe")
    } else {
        bin_name.to_string()
    }
}

/// Writes the binary as `bootstrap` plus every include at the zip root, all
/// executable so bundled tools can run from the code directory.
fn package_function_zip(binary_path: &Path, includes: &[PathBuf], zip_path: &Path) {
    if !binary_path.exists() {
        panic!("expected helper binary at '{}'", binary_path.display());
    }

    let file = fs::File::create(zip_path).expect("failed to create function zip");
    let mut zip = ZipWriter::new(file);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);

    let binary = fs::read(binary_path).expect("failed to read helper binary");
    zip.start_file("bootstrap", options)
        .expect("failed to start bootstrap entry in function zip");
    zip.write_all(&binary)
        .expect("failed to write bootstrap entry");

    for include in includes {
        let name = include
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_else(|| panic!("include '{}' has no file name", include.display()));
        let contents = fs::read(include)
            .unwrap_or_else(|error| panic!("failed to read '{}': {error}", include.display()));
        zip.start_file(name, options)
            .unwrap_or_else(|error| panic!("failed to start zip entry '{name}': {error}"));
        zip.write_all(&contents)
            .unwrap_or_else(|error| panic!("failed to write zip entry '{name}': {error}"));
    }

    zip.finish().expect("failed to finish function zip");
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_lint() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);
}

fn ci_test() {
    step("Test accel_helper_core");
    run_cargo(&["test", "-p", "accel_helper_core"]);

    step("Test accel_helper_lambda");
    run_cargo(&["test", "-p", "accel_helper_lambda"]);
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ci { job } => {
            match job {
                CiJob::Lint => ci_lint(),
                CiJob::Test => ci_test(),
                CiJob::Check => {
                    ci_lint();
                    ci_test();
                }
            }
            eprintln!("\nCI job passed.");
        }
        Commands::Package {
            target,
            profile,
            includes,
            output,
        } => {
            package_helper(&target, profile, &includes, &output);
        }
    }
}
