//! CLI entry point for survey response analytics.
//!
//! Provides subcommands for listing surveys, aggregating one survey's
//! responses, inspecting a single question's distribution, exporting
//! statistics to CSV/JSON, and summarizing every survey at once.

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use survey_insights::analyzers::types::SurveyReport;
use survey_insights::{
    config::AppConfig,
    fetch::{BasicClient, HttpClient, auth::ApiKey},
    filter::{DatePreset, DateRange},
    infra::{api::ApiSurveyStore, local::DirectorySurveyStore},
    output::{ExportFormat, print_pretty, to_json, write_export},
    services::survey_store::SurveyStore,
    session::AnalyticsSession,
};
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "survey_insights")]
#[command(about = "Response analytics for survey results", long_about = None)]
struct Cli {
    /// JSON config file
    #[arg(long, global = true, env = "SURVEY_INSIGHTS_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the survey API (serves /api/surveys and /api/results/{id})
    #[arg(long, global = true, env = "SURVEY_API_URL")]
    api_url: Option<String>,

    /// Directory holding surveys.json and results/<survey>.json; wins over --api-url
    #[arg(long, global = true, env = "SURVEY_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone, Debug)]
struct RangeArgs {
    /// Trailing window relative to now
    #[arg(long, value_enum)]
    range: Option<DatePreset>,

    /// Lower bound (RFC 3339 or YYYY-MM-DD); overrides --range
    #[arg(long)]
    from: Option<String>,

    /// Upper bound (RFC 3339 or YYYY-MM-DD); overrides --range
    #[arg(long)]
    to: Option<String>,
}

impl RangeArgs {
    fn resolve(&self, default: DatePreset) -> DateRange {
        if self.from.is_some() || self.to.is_some() {
            DateRange::from_inputs(self.from.as_deref(), self.to.as_deref())
        } else {
            self.range.unwrap_or(default).range()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List stored surveys with their response counts
    ListSurveys,
    /// Aggregate the responses of one survey
    Stats {
        /// Survey id
        #[arg(short, long)]
        survey: String,

        #[command(flatten)]
        range: RangeArgs,

        /// Print the report as JSON on stdout
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show how one question's answers spread over its options
    Distribution {
        /// Survey id
        #[arg(short, long)]
        survey: String,

        /// Question id
        #[arg(short, long)]
        question: String,

        #[command(flatten)]
        range: RangeArgs,

        /// Print the distribution as JSON on stdout
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Export one survey's statistics to a file
    Export {
        /// Survey id
        #[arg(short, long)]
        survey: String,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        /// Directory to write into (defaults to the configured export_dir)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Gzip the exported file
        #[arg(long, default_value_t = false)]
        gzip: bool,

        #[command(flatten)]
        range: RangeArgs,
    },
    /// Totals across every survey
    Summary {
        /// Print the summary as JSON on stdout
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/survey_insights.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("survey_insights.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::load_or_default(cli.config.as_deref())?;
    let store = build_store(&cli, &config)?;

    match cli.command {
        Commands::ListSurveys => list_surveys(store.as_ref()).await?,
        Commands::Stats {
            survey,
            range,
            json,
        } => {
            let mut session = AnalyticsSession::connect(store.as_ref()).await;
            session.set_range(range.resolve(config.default_range));
            let report = load_report(&mut session, store.as_ref(), &survey).await?;

            if json {
                println!("{}", to_json(report)?);
            } else {
                log_report(report);
            }
        }
        Commands::Distribution {
            survey,
            question,
            range,
            json,
        } => {
            let mut session = AnalyticsSession::connect(store.as_ref()).await;
            session.set_range(range.resolve(config.default_range));
            load_report(&mut session, store.as_ref(), &survey).await?;

            let distribution = session.distribution(&survey, &question);
            if distribution.is_empty() {
                warn!(survey_id = %survey, question_id = %question, "Question has no options to distribute");
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&distribution)?);
            } else {
                info!(
                    survey_id = %survey,
                    question_id = %question,
                    selections = distribution.total(),
                    range = ?session.range(),
                    "Distribution"
                );
                for (label, count) in distribution.labels.iter().zip(&distribution.counts) {
                    info!(label = %label, count, "Option");
                }
                for (value, count) in &distribution.unmatched {
                    info!(value = %value, count, "Unmatched answer");
                }
            }
        }
        Commands::Export {
            survey,
            format,
            output_dir,
            gzip,
            range,
        } => {
            let mut session = AnalyticsSession::connect(store.as_ref()).await;
            session.set_range(range.resolve(config.default_range));
            load_report(&mut session, store.as_ref(), &survey).await?;

            let schema = session
                .survey(&survey)
                .ok_or_else(|| anyhow!("Unknown survey '{survey}'"))?;
            let report = session
                .report(&survey)
                .ok_or_else(|| anyhow!("No statistics computed for '{survey}'"))?;
            let dir = output_dir.unwrap_or_else(|| config.export_dir.clone());
            let path = write_export(&dir, report, schema, format, gzip)?;
            info!(path = %path.display(), "Export complete");
        }
        Commands::Summary { json } => {
            let mut session = AnalyticsSession::connect(store.as_ref()).await;
            let ids: Vec<String> = session.surveys().iter().map(|s| s.id.clone()).collect();
            for id in &ids {
                session.load_survey(store.as_ref(), id).await;
            }

            let summary = session.portfolio();
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                info!(
                    surveys = summary.survey_count,
                    responses = summary.total_responses,
                    average_completion = summary.average_completion,
                    "Portfolio summary"
                );
            }
        }
    }

    Ok(())
}

/// Picks the persistence backend: a local dump directory if one is
/// configured, otherwise the HTTP API (with a bearer token from
/// `SURVEY_API_TOKEN` when set).
fn build_store(cli: &Cli, config: &AppConfig) -> Result<Box<dyn SurveyStore>> {
    if let Some(dir) = cli.data_dir.clone().or_else(|| config.data_dir.clone()) {
        info!(dir = %dir.display(), "Reading surveys from local directory");
        return Ok(Box::new(DirectorySurveyStore::new(dir)));
    }

    let base_url = cli
        .api_url
        .clone()
        .or_else(|| config.api_base_url.clone())
        .context("No data source configured: pass --api-url or --data-dir")?;
    let basic = BasicClient::with_timeouts(config.timeout(), config.connect_timeout())?;
    let client: Box<dyn HttpClient> = match std::env::var("SURVEY_API_TOKEN") {
        Ok(token) if !token.is_empty() => Box::new(ApiKey::bearer(basic, &token)?),
        _ => Box::new(basic),
    };

    info!(base_url = %base_url, "Reading surveys from API");
    Ok(Box::new(ApiSurveyStore::new(&base_url, client)?))
}

/// Loads one survey into the session and returns its report.
#[tracing::instrument(skip(session, store))]
async fn load_report<'a>(
    session: &'a mut AnalyticsSession,
    store: &dyn SurveyStore,
    survey_id: &str,
) -> Result<&'a SurveyReport> {
    if session.survey(survey_id).is_none() {
        warn!("Survey not found in listing, statistics will be empty");
    }
    session
        .load_survey(store, survey_id)
        .await
        .ok_or_else(|| anyhow!("No statistics computed for '{survey_id}'"))
}

async fn list_surveys(store: &dyn SurveyStore) -> Result<()> {
    let mut session = AnalyticsSession::connect(store).await;
    let ids: Vec<String> = session.surveys().iter().map(|s| s.id.clone()).collect();

    for id in &ids {
        session.load_survey(store, id).await;
        let Some(survey) = session.survey(id) else {
            continue;
        };
        let responses = session
            .report(id)
            .map(|r| r.stats.total_responses)
            .unwrap_or(0);
        info!(
            survey_id = %survey.id,
            title = %survey.title,
            questions = survey.questions.len(),
            responses,
            "Survey"
        );
    }

    info!(total = ids.len(), "Survey list summary");
    Ok(())
}

fn log_report(report: &SurveyReport) {
    print_pretty(report);
    info!(
        survey_id = %report.survey_id,
        title = %report.title,
        total_responses = report.stats.total_responses,
        completion_rate = report.stats.completion_rate,
        "Survey statistics"
    );

    for q in &report.stats.questions {
        let top = q.top_option_label().unwrap_or_else(|| "-".to_string());
        info!(
            number = q.number,
            question = %q.text,
            kind = q.kind.as_str(),
            multi_select = q.kind.is_multi_select(),
            responded = q.responded_count,
            dropoff_rate = q.dropoff_rate,
            top_option = %top,
            text_answers = q.text_answers.len(),
            "Question"
        );
        for opt in &q.options {
            info!(
                number = q.number,
                label = %opt.label,
                count = opt.count,
                percent = opt.percent,
                "Option"
            );
        }
    }
}
