use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the image pipeline stack workspace",
    long_about = "A unified CLI for synthesizing the image pipeline stack\n\
                  and running CI checks in this workspace."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize the stack into a cloud assembly
    Synth {
        /// Directory containing the layer and function asset directories
        #[arg(long, env = "IMGPIPE_ASSET_ROOT", default_value = ".")]
        asset_root: String,
        /// Output directory for the cloud assembly
        #[arg(long, default_value = "cdk.out")]
        out_dir: String,
        /// Optional stack props JSON file
        #[arg(long)]
        props: Option<String>,
        /// Skip zipping assets
        #[arg(long)]
        no_package: bool,
    },
    /// Run CI checks (fmt, clippy, tests)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting and clippy
    Lint,
    /// Unit and integration tests
    Test,
    /// Lint + test
    Check,
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
    step("Test imgpipe_stack_core");
    run_cargo(&["test", "-p", "imgpipe_stack_core"]);

    step("Test imgpipe_stack_synth");
    run_cargo(&["test", "-p", "imgpipe_stack_synth"]);
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Synth {
            asset_root,
            out_dir,
            props,
            no_package,
        } => {
            step("Synthesize image pipeline stack");
            let mut args: Vec<&str> = vec![
                "run",
                "-p",
                "imgpipe_stack_synth",
                "--bin",
                "synth",
                "--",
                "--asset-root",
                asset_root.as_str(),
                "--out-dir",
                out_dir.as_str(),
            ];
            if let Some(props) = &props {
                args.extend(["--props", props.as_str()]);
            }
            if no_package {
                args.push("--no-package");
            }
            run_cargo(&args);
        }
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
    }
}
