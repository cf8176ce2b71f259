use anyhow::{Context, Result};
use bls_rs::config::{ApiVersion, Config};
use bls_rs::models::parse_year_range;
use bls_rs::table::tabulate_envelope;
use bls_rs::{AccessKey, Client, ResponseEnvelope, SeriesRequest};
use bls_rs::{stats, storage, viz};
use chrono::Datelike;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "bls",
    version,
    about = "Fetch, tabulate, chart & summarize BLS time series"
)]
struct Cli {
    /// Config file (TOML). Defaults to ./bls.toml when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Override the API base URL (e.g. https://api.bls.gov/publicAPI).
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Request timeout in seconds.
    #[arg(long, global = true)]
    timeout: Option<u64>,
    /// Verbose logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch series for a year range (and optionally save, plot, and print stats).
    Get(GetArgs),
    /// Fetch the provider's default recent years for one series (v1, no key).
    Latest(LatestArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OutFormat {
    Csv,
    Json,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum VersionArg {
    V1,
    V2,
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Save observations to file (format inferred by --format or extension).
    #[arg(long)]
    out: Option<PathBuf>,
    /// Output format (csv or json). If omitted, inferred from --out extension.
    #[arg(long, value_enum)]
    format: Option<OutFormat>,
    /// Create a chart at the given path (.svg for SVG, otherwise PNG).
    #[arg(long)]
    plot: Option<PathBuf>,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    /// Locale for tick labels (en, de, fr, ...).
    #[arg(long)]
    locale: Option<String>,
    /// Chart title.
    #[arg(long)]
    title: Option<String>,
    /// Print the year-indexed table to stdout.
    #[arg(long, default_value_t = false)]
    table: bool,
    /// Print per-series statistics to stdout.
    #[arg(long, default_value_t = false)]
    stats: bool,
}

#[derive(Args, Debug)]
struct GetArgs {
    /// Series ids separated by comma or semicolon (e.g., CUUR0000SA0,LNS14000000)
    #[arg(short, long)]
    series: String,
    /// Year (YYYY) or range (YYYY:YYYY). Defaults to the last ten years.
    #[arg(short, long)]
    years: Option<String>,
    /// API version; v2 needs an access key.
    #[arg(long, value_enum)]
    api_version: Option<VersionArg>,
    /// Read the access key from this file instead of BLS_API_KEY / config.
    #[arg(long)]
    key_file: Option<PathBuf>,
    /// Append annual averages (v2 only).
    #[arg(long, default_value_t = false)]
    annual_average: bool,
    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct LatestArgs {
    /// Series id (e.g., LNS14000000)
    series: String,
    #[command(flatten)]
    output: OutputArgs,
}

fn fmt_opt(v: Option<f64>) -> String {
    match v {
        Some(x) if x.is_finite() => {
            // Format up to 4 decimals, then trim trailing zeros and trailing dot.
            let s = format!("{:.4}", x);
            s.trim_end_matches('0').trim_end_matches('.').to_string()
        }
        _ => "NA".to_string(),
    }
}

fn parse_list(s: &str) -> Vec<String> {
    s.split([',', ';'])
        .map(|x| x.trim().to_string())
        .filter(|x| !x.is_empty())
        .collect()
}

fn init_logging(verbose: bool) {
    let default = if verbose { "bls_rs=debug,bls=debug,warn" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(cli.config.as_deref())?;
    config.apply_env();
    if let Some(url) = cli.base_url {
        config.api.base_url = url;
    }
    if let Some(t) = cli.timeout {
        config.api.timeout_secs = t;
    }

    match cli.cmd {
        Command::Get(args) => cmd_get(config, args),
        Command::Latest(args) => cmd_latest(config, args),
    }
}

fn cmd_get(mut config: Config, args: GetArgs) -> Result<()> {
    if let Some(v) = args.api_version {
        config.api.version = match v {
            VersionArg::V1 => ApiVersion::V1,
            VersionArg::V2 => ApiVersion::V2,
        };
    }
    let (start, end) = match &args.years {
        Some(s) => parse_year_range(s)?,
        None => {
            let this_year = chrono::Local::now().year();
            (this_year - 9, this_year)
        }
    };

    let mut request = SeriesRequest::new(parse_list(&args.series), start, end)
        .with_annual_average(args.annual_average);
    if let Some(path) = &args.key_file {
        let key = std::fs::read_to_string(path)
            .with_context(|| format!("read key file {}", path.display()))?;
        request = request.with_access_key(AccessKey::new(key));
    }

    let client = Client::new(config.api.clone())?;
    let envelope = client.fetch(&request)?;
    emit(&config, &envelope, &args.output)
}

fn cmd_latest(config: Config, args: LatestArgs) -> Result<()> {
    let client = Client::new(config.api.clone())?;
    let envelope = client.fetch_latest(&args.series)?;
    emit(&config, &envelope, &args.output)
}

fn emit(config: &Config, envelope: &ResponseEnvelope, args: &OutputArgs) -> Result<()> {
    let observations: Vec<_> = envelope.observations().cloned().collect();

    if let Some(path) = args.out.as_ref() {
        let fmt = match args.format {
            Some(OutFormat::Csv) => "csv",
            Some(OutFormat::Json) => "json",
            None => path.extension().and_then(|e| e.to_str()).unwrap_or("csv"),
        }
        .to_ascii_lowercase();
        match fmt.as_str() {
            "csv" => storage::save_csv(&observations, path)?,
            "json" => storage::save_json(&observations, path)?,
            other => anyhow::bail!("unsupported format: {}", other),
        }
        eprintln!("Saved {} rows to {}", observations.len(), path.display());
    }

    if let Some(plot_path) = args.plot.as_ref() {
        let mut opts = config.plot.clone();
        if let Some(w) = args.width {
            opts.width = w;
        }
        if let Some(h) = args.height {
            opts.height = h;
        }
        if let Some(l) = &args.locale {
            opts.locale = l.clone();
        }
        if let Some(t) = &args.title {
            opts.title = Some(t.clone());
        }
        viz::plot_envelope(envelope, plot_path, &opts)?;
        eprintln!("Wrote plot to {}", plot_path.display());
    }

    if args.table {
        for (id, table) in tabulate_envelope(envelope) {
            println!("{id}");
            for (year, period, value) in table.rows() {
                match period {
                    Some(p) => println!("  {year} {p}\t{}", fmt_opt(value)),
                    None => println!("  {year}\t{}", fmt_opt(value)),
                }
            }
        }
    }

    if args.stats {
        for s in stats::series_summary(envelope) {
            println!(
                "{}  count={} unavailable={}  min={} max={} mean={} median={}  first={} last={}",
                s.series_id,
                s.count,
                s.unavailable,
                fmt_opt(s.min),
                fmt_opt(s.max),
                fmt_opt(s.mean),
                fmt_opt(s.median),
                fmt_opt(s.first),
                fmt_opt(s.last)
            );
        }
    }

    if args.out.is_none() && args.plot.is_none() && !args.table && !args.stats {
        println!("{}", serde_json::to_string_pretty(&observations)?);
    }

    Ok(())
}
