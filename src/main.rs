use catchment_service::alert::mismatch::compare_pairs;
use catchment_service::alert::{Evaluation, evaluate};
use catchment_service::analysis::overview::{DEFAULT_RECENT_READINGS, site_overview};
use catchment_service::analysis::report::{ReportOptions, build_report};
use catchment_service::config::{self, CatchmentConfig};
use catchment_service::error::{CatchmentError, CatchmentResult};
use catchment_service::ingest::load_dataset;
use catchment_service::logging::{self, DataSource, LogLevel};
use catchment_service::model::Site;
use catchment_service::session::{SessionContext, SessionOverrides};
use catchment_service::sites::{SITE_REGISTRY, STATION_CATALOG, find_site};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "catchment", version, about = "Catchment sensor/lab reconciliation and alerting")]
struct Cli {
    /// Config file (default: $CATCHMENT_CONFIG, then ./catchment.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[arg(long, global = true, default_value = "info")]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List monitoring sites, their stations and alarm sensitivity
    Sites {
        /// List every monitoring station in the catchment instead
        #[arg(long)]
        stations: bool,
        #[arg(long)]
        json: bool,
    },
    /// Evaluate the data and print alerts and data gaps
    Alerts {
        #[command(flatten)]
        session: SessionArgs,
        #[arg(long)]
        json: bool,
    },
    /// Show sensor and lab values side by side for one site
    Compare {
        #[arg(value_parser = parse_site)]
        site: Site,
        #[command(flatten)]
        session: SessionArgs,
        #[arg(long)]
        json: bool,
    },
    /// Show one site's readings by parameter group, recent gauge data and alerts
    Overview {
        #[arg(value_parser = parse_site)]
        site: Site,
        /// Gauge readings to show per series
        #[arg(long, default_value_t = DEFAULT_RECENT_READINGS)]
        last: usize,
        #[command(flatten)]
        session: SessionArgs,
        #[arg(long)]
        json: bool,
    },
    /// Write the report CSV
    Export {
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        no_sensor: bool,
        #[arg(long)]
        no_rainfall: bool,
        #[arg(long)]
        no_lab: bool,
    },
}

#[derive(Args, Debug)]
struct SessionArgs {
    /// Restrict to a site (repeatable)
    #[arg(long = "site", value_parser = parse_site)]
    sites: Vec<Site>,
    #[arg(long)]
    from: Option<NaiveDate>,
    #[arg(long)]
    to: Option<NaiveDate>,
    /// Turbidity ceiling in NTU
    #[arg(long)]
    turbidity: Option<f64>,
    /// Daily rainfall ceiling in mm
    #[arg(long)]
    rainfall: Option<f64>,
    /// Sensor vs lab difference ceiling in percent
    #[arg(long)]
    mismatch: Option<f64>,
    #[arg(long)]
    hide_outliers: bool,
}

impl SessionArgs {
    fn overrides(&self) -> SessionOverrides {
        SessionOverrides {
            sites: self.sites.clone(),
            from: self.from,
            to: self.to,
            turbidity_ntu: self.turbidity,
            rainfall_mm: self.rainfall,
            mismatch_pct: self.mismatch,
            hide_outliers: self.hide_outliers,
        }
    }

    fn build(&self, config: &CatchmentConfig) -> CatchmentResult<SessionContext> {
        SessionContext::from_config(config)?.with_overrides(&self.overrides())
    }
}

fn parse_site(s: &str) -> Result<Site, String> {
    find_site(s).ok_or_else(|| CatchmentError::UnknownSite(s.to_string()).to_string())
}

fn print_json<T: Serialize>(value: &T) -> CatchmentResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Serialize)]
struct SiteListing {
    site: Site,
    name: &'static str,
    rainfall_station: Option<u32>,
    streamflow_station: u32,
    latitude: f64,
    longitude: f64,
    sensitivity: f64,
}

fn run_sites(config: &CatchmentConfig, json: bool) -> CatchmentResult<()> {
    let session = SessionContext::from_config(config)?;
    let listing: Vec<SiteListing> = SITE_REGISTRY
        .iter()
        .map(|info| SiteListing {
            site: info.site,
            name: info.site.name(),
            rainfall_station: info.rainfall_station,
            streamflow_station: info.streamflow_station,
            latitude: info.latitude,
            longitude: info.longitude,
            sensitivity: session.sensitivity(info.site),
        })
        .collect();
    if json {
        return print_json(&listing);
    }
    for s in &listing {
        let rain = s
            .rainfall_station
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<26} rain {:<6} flow {:<6} ({:.4}, {:.4})  sensitivity {}%",
            s.name, rain, s.streamflow_station, s.latitude, s.longitude, s.sensitivity
        );
    }
    Ok(())
}

fn run_stations(json: bool) -> CatchmentResult<()> {
    if json {
        return print_json(&STATION_CATALOG);
    }
    for s in STATION_CATALOG {
        println!(
            "{:<24} {:<8} {:<22} {:<20} ({:.4}, {:.4})",
            s.owner,
            s.reference,
            s.name,
            format!("{:?}", s.station_type),
            s.latitude,
            s.longitude
        );
    }
    Ok(())
}

fn print_evaluation(evaluation: &Evaluation, session: &SessionContext) {
    if evaluation.alerts.is_empty() {
        println!("No alerts.");
    }
    for alert in &evaluation.alerts {
        println!(
            "{}  {:<8} {:<26} {:<30} {:.2} > {:.2}",
            alert.timestamp,
            alert.severity,
            alert.site.name(),
            format!("{} ({})", alert.kind, alert.parameter),
            alert.observed_value,
            alert.threshold
        );
    }
    for site in &session.sites {
        let gaps = evaluation.gaps_for(*site);
        if !gaps.is_empty() {
            let labels: Vec<String> = gaps.iter().map(|g| format!("{:?}", g)).collect();
            println!("{}: {}", site.name(), labels.join(", "));
        }
    }
}

fn run_alerts(config: &CatchmentConfig, args: &SessionArgs, json: bool) -> CatchmentResult<()> {
    let session = args.build(config)?;
    let dataset = load_dataset(&config.data)?;
    let evaluation = evaluate(&session, &dataset);
    if json {
        return print_json(&evaluation);
    }
    print_evaluation(&evaluation, &session);
    Ok(())
}

fn run_compare(
    config: &CatchmentConfig,
    site: Site,
    args: &SessionArgs,
    json: bool,
) -> CatchmentResult<()> {
    let session = args.build(config)?.with_sites(vec![site]);
    let dataset = load_dataset(&config.data)?;
    let evaluation = evaluate(&session, &dataset);

    let Some(pairs) = evaluation.alignment.pairs_for(site) else {
        println!("{}: lab data unavailable", site.name());
        return Ok(());
    };
    let rows = compare_pairs(pairs, session.mismatch_threshold(site));
    if json {
        return print_json(&rows);
    }
    if rows.is_empty() {
        println!("{}: no sensor and lab readings share a date", site.name());
    }
    for row in &rows {
        let diff = row
            .difference_pct
            .map(|d| format!("{:.1}%", d))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "{}  {:<22} sensor {:>10.3}  lab {:>10.3}  diff {:>8}{}",
            row.date,
            row.parameter.to_string(),
            row.sensor_value,
            row.lab_value,
            diff,
            if row.exceeds { "  !" } else { "" }
        );
    }
    Ok(())
}

fn run_overview(
    config: &CatchmentConfig,
    site: Site,
    last: usize,
    args: &SessionArgs,
    json: bool,
) -> CatchmentResult<()> {
    let session = args.build(config)?.with_sites(vec![site]);
    let evaluation = evaluate(&session, &load_dataset(&config.data)?);
    let overview = site_overview(&evaluation, site, last);
    if json {
        return print_json(&overview);
    }

    let status = overview
        .status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "OK".to_string());
    println!("{} [{}]", site.name(), status);
    for group in &overview.groups {
        let latest = group.readings.last().map(|o| o.timestamp);
        println!(
            "  {:<20} {:>5} reading(s), latest {}",
            format!("{:?}", group.group),
            group.readings.len(),
            latest.map(|d| d.to_string()).unwrap_or_default()
        );
    }
    for (label, series) in [("rainfall", &overview.rainfall), ("streamflow", &overview.streamflow)] {
        match series.last() {
            Some(o) => println!(
                "  {:<20} {:>5} reading(s), latest {} {} {}",
                label,
                series.len(),
                o.timestamp,
                o.value,
                o.parameter.canonical_unit()
            ),
            None => println!("  {:<20} no data", label),
        }
    }
    for alert in &overview.alerts {
        println!(
            "  {}  {:<8} {} ({}) {:.2} > {:.2}",
            alert.timestamp, alert.severity, alert.kind, alert.parameter, alert.observed_value, alert.threshold
        );
    }
    if !overview.gaps.is_empty() {
        let labels: Vec<String> = overview.gaps.iter().map(|g| format!("{:?}", g)).collect();
        println!("  gaps: {}", labels.join(", "));
    }
    Ok(())
}

fn run_export(config: &CatchmentConfig, out: &Path, options: ReportOptions) -> CatchmentResult<()> {
    let report = build_report(&load_dataset(&config.data)?, options);
    if report.is_empty() {
        return Err(CatchmentError::ReportEmpty);
    }
    std::fs::write(out, report.to_csv())?;
    logging::info(
        DataSource::Engine,
        None,
        &format!("Wrote {} report section(s) to {}", report.sections.len(), out.display()),
    );
    Ok(())
}

fn run(cli: Cli) -> CatchmentResult<()> {
    let config = config::load_config(&config::config_path(cli.config.as_deref()))?;
    match &cli.command {
        Command::Sites { stations: true, json } => run_stations(*json),
        Command::Sites { json, .. } => run_sites(&config, *json),
        Command::Alerts { session, json } => run_alerts(&config, session, *json),
        Command::Compare { site, session, json } => run_compare(&config, *site, session, *json),
        Command::Overview {
            site,
            last,
            session,
            json,
        } => run_overview(&config, *site, *last, session, *json),
        Command::Export {
            out,
            no_sensor,
            no_rainfall,
            no_lab,
        } => run_export(
            &config,
            out,
            ReportOptions {
                include_sensor: !no_sensor,
                include_rainfall: !no_rainfall,
                include_lab: !no_lab,
            },
        ),
    }
}

fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    logging::init_logger(cli.log_level);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            logging::error(DataSource::Engine, None, &e.to_string());
            ExitCode::FAILURE
        }
    }
}
