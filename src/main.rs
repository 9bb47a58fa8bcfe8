use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{CommandFactory, Parser};

use hwpx_records::config::{find_default_rules, init_default_rules, EquationMode, ParseRules};
use hwpx_records::hwpx::HwpxPackage;
use hwpx_records::progress::{log_filter, ConsoleProgress};
use hwpx_records::records::{convert_hwpx, inspect_hwpx};

#[derive(Parser, Debug)]
#[command(name = "hwpx-records")]
#[command(about = "Split an HWPX drug handbook into per-record metadata/content JSON", long_about = None)]
struct Args {
    /// Write the default rules file (hwpx-records.toml), then exit
    #[arg(long)]
    init_rules: bool,

    /// Directory to write the rules file (default: current directory)
    #[arg(long, value_name = "DIR")]
    init_rules_dir: Option<PathBuf>,

    /// Overwrite an existing rules file when used with --init-rules
    #[arg(long)]
    force: bool,

    /// Input .hwpx
    #[arg(value_name = "HWPX")]
    input: Option<PathBuf>,

    /// Output directory (default: <input_stem>_records next to the input)
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Rules file path (default: search for hwpx-records.toml upwards)
    #[arg(long, value_name = "TOML")]
    rules: Option<PathBuf>,

    /// Chapter label written into every record
    #[arg(long)]
    chapter: Option<String>,

    /// Paragraph style id that marks section headers (e.g. 7 or style-7)
    #[arg(long, value_name = "ID")]
    section_style: Option<String>,

    /// Line-segment text height of title paragraphs
    #[arg(long, value_name = "N")]
    title_height: Option<u32>,

    /// Equation rendering: placeholder or latex
    #[arg(long, value_name = "MODE")]
    equations: Option<String>,

    /// Print a JSON summary of the package and the records it would produce, then exit
    #[arg(long)]
    inspect: bool,

    /// Extract every archive entry into DIR, then exit
    #[arg(long, value_name = "DIR")]
    unpack: Option<PathBuf>,

    /// No progress output on stderr
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(std::env::var("RUST_LOG").ok().as_deref()))
        .init();

    let args = Args::parse();
    let progress = ConsoleProgress::new(!args.quiet);

    if args.init_rules {
        let dir = args
            .init_rules_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let path = init_default_rules(&dir, args.force).context("init default rules")?;
        eprintln!("Wrote rules: {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let input = match args.input.clone() {
        Some(p) => p,
        None => {
            let mut cmd = Args::command();
            cmd.print_help().context("print help")?;
            eprintln!("\n\nUSAGE:\n  hwpx-records <input.hwpx> [-o DIR]\n");
            return Ok(ExitCode::SUCCESS);
        }
    };

    if let Some(dir) = args.unpack.as_ref() {
        let pkg = HwpxPackage::read(&input)
            .with_context(|| format!("open hwpx: {}", input.display()))?;
        let n = pkg.unpack_to(dir)?;
        progress.info(format!("unpacked {n} entries to {}", dir.display()));
        return Ok(ExitCode::SUCCESS);
    }

    let rules = load_rules(&args, &input)?;

    if args.inspect {
        let summary = inspect_hwpx(&input, &rules)?;
        let json = serde_json::to_string_pretty(&summary).context("serialize summary")?;
        println!("{json}");
        return Ok(ExitCode::SUCCESS);
    }

    let output = args.output.clone().unwrap_or_else(|| default_output_dir(&input));
    let report = convert_hwpx(&input, &output, &rules, &progress)?;
    if !report.is_success() {
        for (name, err) in &report.failed {
            eprintln!("failed: {name}: {err}");
        }
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn load_rules(args: &Args, input: &Path) -> anyhow::Result<ParseRules> {
    let workdir = input.parent().unwrap_or_else(|| Path::new("."));
    let mut rules = match args.rules.clone().or_else(|| find_default_rules(workdir)) {
        Some(path) => {
            tracing::debug!(path = %path.display(), "using rules file");
            ParseRules::from_toml_path(&path)?
        }
        None => ParseRules::default(),
    };
    if let Some(chapter) = args.chapter.clone() {
        rules.metadata.chapter = Some(chapter);
    }
    if let Some(style) = args.section_style.clone() {
        rules.metadata.section_style_id = Some(style);
    }
    if let Some(h) = args.title_height {
        rules.metadata.title_text_height = h;
    }
    if let Some(mode) = args.equations.as_deref() {
        rules.equations.mode = EquationMode::parse(mode)?;
    }
    Ok(rules)
}

fn default_output_dir(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string();
    input.with_file_name(format!("{stem}_records"))
}
