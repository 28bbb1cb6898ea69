//! BSA CLI - technical sales proposals from a business case
//!
//! Usage:
//!   bsa init                              Write .bsa/config.toml
//!   bsa run --company <name> --case <txt> Research, analysis and validated design
//!   bsa propose <session>                 Approve the design and draft the proposal
//!   bsa audit <session>                   SMART audit of the proposal
//!   bsa estimate <session>                Cost estimation from the proposal
//!   bsa ask <session> <message>           Ask the expert assistant about a session
//!   bsa sessions list                     List saved sessions

use anyhow::{bail, Context, Result};
use bsa_agent::logo::to_data_uri;
use bsa_agent::{Gateway, LogoFetcher};
use bsa_core::fail_open::fail_open_with_retries;
use bsa_core::{
    BsaConfig, BsaError, ContextDensity, CostEstimation, ExpandConfig, ExpandDensity, ExpandTarget,
    HyperScaler, ProposalRequest,
};
use bsa_orchestrator::Pipeline;
use bsa_session::{SavedSession, SessionStore};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

const AUTOSAVE_ATTEMPTS: usize = 3;

#[derive(Parser)]
#[command(name = "bsa")]
#[command(author, version, about = "Technical sales proposals from a business case")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Project root holding .bsa/
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the default configuration
    Init,

    /// Run discovery: research, business analysis, design and validation
    Run {
        /// Client company name
        #[arg(long)]
        company: String,

        /// Business case text
        #[arg(long = "case", conflicts_with = "case_file")]
        business_case: Option<String>,

        /// Read the business case from a file
        #[arg(long)]
        case_file: Option<PathBuf>,

        /// Target cloud (aws, azure, gcp, oci)
        #[arg(long)]
        hyperscaler: Option<HyperScaler>,

        /// Output language (e.g. English, Spanish)
        #[arg(long)]
        language: Option<String>,

        /// Context forwarded between stages (low, medium, high)
        #[arg(long)]
        density: Option<ContextDensity>,

        /// Seconds to wait before each model call
        #[arg(long)]
        delay: Option<u64>,

        /// Primary text model
        #[arg(long)]
        text_model: Option<String>,

        /// Image model
        #[arg(long)]
        image_model: Option<String>,
    },

    /// Approve the design and draft (or refine) the proposal
    Propose {
        /// Session ID
        session: String,

        /// Rewrite the existing proposal following this feedback
        #[arg(long)]
        feedback: Option<String>,

        /// Write the proposal Markdown to a file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Audit the proposal
    Audit {
        /// Session ID
        session: String,
    },

    /// Estimate delivery cost from the proposal
    Estimate {
        /// Session ID
        session: String,
    },

    /// Rework the cost plan
    RefineCost {
        /// Session ID
        session: String,

        /// e.g. "reduce to 10 weeks"
        instruction: String,
    },

    /// Revise the architecture following feedback
    RefineDesign {
        /// Session ID
        session: String,

        feedback: String,
    },

    /// Customer / provider / proposal alignment analysis
    Metacognition {
        /// Session ID
        session: String,
    },

    /// Deep-dive on one section
    Expand {
        /// Session ID
        session: String,

        /// kyc, business, design, proposal or metacognition
        #[arg(long)]
        target: ExpandTarget,

        /// Section title
        #[arg(long)]
        section: String,

        /// Extra guidance for the writer
        #[arg(long, default_value = "")]
        instruction: String,

        /// low, medium or high
        #[arg(long, default_value = "medium")]
        density: ExpandDensity,
    },

    /// Rewrite the proposal's team and timeline from the cost estimation
    SyncCost {
        /// Session ID
        session: String,

        /// Show the sections without changing the proposal
        #[arg(long)]
        preview: bool,
    },

    /// Ask the expert assistant; it may regenerate visuals, expand KYC
    /// sections or patch the design
    Ask {
        /// Session ID
        session: String,

        /// Question or request
        #[arg(default_value = "")]
        message: String,

        /// Attach an image (png, jpg, webp or gif)
        #[arg(long)]
        image: Option<PathBuf>,
    },

    /// Saved session management
    Sessions {
        #[command(subcommand)]
        action: SessionCommands,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// List saved sessions, most recent first
    List,

    /// Show one session's artifacts
    Show {
        /// Session ID
        id: String,

        /// Print the proposal Markdown
        #[arg(long)]
        proposal: bool,
    },

    /// Delete a session
    Delete {
        /// Session ID
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let root = cli.root;
    match cli.command {
        Commands::Init => cmd_init(&root),
        Commands::Run {
            company,
            business_case,
            case_file,
            hyperscaler,
            language,
            density,
            delay,
            text_model,
            image_model,
        } => {
            let config = load_config(&root)?;
            let business_case = match (business_case, case_file) {
                (Some(text), _) => text,
                (None, Some(path)) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read business case {:?}", path))?,
                (None, None) => bail!("Provide the business case with --case or --case-file"),
            };
            let request = ProposalRequest {
                company_name: company,
                business_case,
                hyper_scaler: hyperscaler.unwrap_or(config.defaults.hyper_scaler),
                language: language.unwrap_or_else(|| config.defaults.language.clone()),
                text_model: text_model.unwrap_or_default(),
                image_model: image_model.unwrap_or_default(),
                context_density: density.unwrap_or(config.defaults.context_density),
                api_delay: delay.unwrap_or(config.gateway.api_delay_secs),
            };
            cmd_run(&root, &config, request).await
        }
        Commands::Propose {
            session,
            feedback,
            output,
        } => cmd_propose(&root, &session, feedback, output).await,
        Commands::Audit { session } => {
            with_session(&root, &session, |mut pipeline| async move {
                let report = pipeline.audit_proposal().await;
                if let Ok(report) = &report {
                    println!("\nScore: {}/100", report.score);
                    if report.improvements.has_critical {
                        println!("Critical improvements flagged; review before sending.");
                    }
                }
                (pipeline, report.map(|_| ()))
            })
            .await
        }
        Commands::Estimate { session } => {
            with_session(&root, &session, |mut pipeline| async move {
                let result = pipeline.estimate_cost().await;
                if let Some(cost) = &pipeline.artifacts().cost {
                    print_cost(cost);
                }
                (pipeline, result)
            })
            .await
        }
        Commands::RefineCost {
            session,
            instruction,
        } => {
            with_session(&root, &session, |mut pipeline| async move {
                let result = pipeline.refine_cost(&instruction).await;
                if let Some(cost) = &pipeline.artifacts().cost {
                    print_cost(cost);
                }
                (pipeline, result)
            })
            .await
        }
        Commands::RefineDesign { session, feedback } => {
            with_session(&root, &session, |mut pipeline| async move {
                let result = pipeline.refine_design(&feedback).await;
                (pipeline, result)
            })
            .await
        }
        Commands::Metacognition { session } => {
            with_session(&root, &session, |mut pipeline| async move {
                let result = pipeline.analyze_metacognition().await;
                if let Some(analysis) = &pipeline.artifacts().metacognition {
                    for alert in &analysis.dissonance_alerts {
                        println!("[{}] {}", alert.severity, alert.description);
                    }
                }
                (pipeline, result)
            })
            .await
        }
        Commands::Expand {
            session,
            target,
            section,
            instruction,
            density,
        } => {
            let config = ExpandConfig {
                instruction,
                density,
            };
            with_session(&root, &session, |mut pipeline| async move {
                let result = pipeline.expand_section(target, &section, &config).await;
                if let Ok(text) = &result {
                    println!("\n{}", text);
                }
                (pipeline, result.map(|_| ()))
            })
            .await
        }
        Commands::SyncCost { session, preview } => {
            with_session(&root, &session, |mut pipeline| async move {
                let result = if preview {
                    pipeline.preview_cost_sync().map(|preview| {
                        println!("--- Current team section ---\n{}", preview.original_team_section);
                        println!("--- New team section ---\n{}", preview.team_section);
                        println!("--- Current timeline section ---\n{}", preview.original_wbs_section);
                        println!("--- New timeline section ---\n{}", preview.wbs_section);
                    })
                } else {
                    pipeline.sync_proposal_with_cost()
                };
                (pipeline, result)
            })
            .await
        }
        Commands::Ask {
            session,
            message,
            image,
        } => {
            let image = match image {
                Some(path) => Some(read_image_uri(&path).await?),
                None => None,
            };
            if message.trim().is_empty() && image.is_none() {
                bail!("Provide a message or --image");
            }
            with_session(&root, &session, |mut pipeline| async move {
                let reply = pipeline.chat_with_expert(&message, image).await;
                println!("\n{}", reply);
                (pipeline, Ok(()))
            })
            .await
        }
        Commands::Sessions { action } => cmd_sessions(&root, action).await,
    }
}

fn load_config(root: &Path) -> Result<BsaConfig> {
    BsaConfig::load_or_default(root).context("Failed to load .bsa/config.toml")
}

fn gateway(config: &BsaConfig) -> Result<Gateway> {
    Gateway::gemini(config.gateway.clone()).context("Failed to create model gateway")
}

fn with_logos(pipeline: Pipeline) -> Pipeline {
    pipeline.with_logo_source(Arc::new(LogoFetcher::default()))
}

fn image_mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/png",
    }
}

async fn read_image_uri(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read image {:?}", path))?;
    Ok(to_data_uri(image_mime_type(path), &bytes))
}

fn print_cost(cost: &CostEstimation) {
    let plan = &cost.optimal_plan;
    println!(
        "\nOptimal plan: {} weeks, {:.0} USD",
        plan.total_weeks, plan.total_cost
    );
    for role in &plan.roles {
        println!("  {:<28} {:>6.0} h  {:>9.0} USD", role.role, role.hours(), role.cost());
    }
    if let Some(comparison) = &cost.proposal_comparison {
        println!("  {}", comparison.recommendation);
    }
}

/// Save without failing the command
async fn autosave(store: &SessionStore, session: &SavedSession) {
    let saved = fail_open_with_retries(
        "session_autosave",
        move || store.save(session),
        AUTOSAVE_ATTEMPTS,
    )
    .await;
    if saved.is_none() {
        eprintln!("Warning: session {} could not be saved", session.id);
    }
}

fn cmd_init(root: &Path) -> Result<()> {
    let path = BsaConfig::write_default(root).context("Failed to write config")?;
    let config = load_config(root)?;
    std::fs::create_dir_all(config.session_dir(root))?;

    println!("Initialized BSA in {:?}", root);
    println!("Created:");
    println!("  {}", path.display());
    println!("  {}", config.session_dir(root).display());
    println!("\nSet GEMINI_API_KEY (or API_KEY) before running 'bsa run'.");
    Ok(())
}

async fn cmd_run(root: &Path, config: &BsaConfig, request: ProposalRequest) -> Result<()> {
    info!("Starting discovery for {}", request.company_name);
    let store = SessionStore::new(config.session_dir(root));
    let mut pipeline = with_logos(Pipeline::new(gateway(config)?, config));

    let result = pipeline.run_discovery(request).await;

    let session = SavedSession::new(pipeline.snapshot());
    autosave(&store, &session).await;
    println!("\nSession: {}", session.id);

    result.context("Discovery failed")?;
    if let Some(design) = &pipeline.artifacts().design {
        println!("\n{}", design.architecture_overview);
        for component in &design.key_components {
            println!("  - {}", component);
        }
    }
    println!("\nNext: bsa propose {}", session.id);
    Ok(())
}

/// Load a session, run one action on its pipeline and save it back
async fn with_session<F, Fut>(root: &Path, id: &str, action: F) -> Result<()>
where
    F: FnOnce(Pipeline) -> Fut,
    Fut: std::future::Future<Output = (Pipeline, bsa_core::Result<()>)>,
{
    let config = load_config(root)?;
    let store = SessionStore::new(config.session_dir(root));
    let mut session = store
        .load(id)
        .await
        .with_context(|| format!("Failed to load session {}", id))?;

    let pipeline = with_logos(Pipeline::from_session(
        gateway(&config)?,
        &config,
        session.data.clone(),
    ));
    let (pipeline, result) = action(pipeline).await;

    session.update(pipeline.snapshot());
    autosave(&store, &session).await;
    result.context("Action failed")?;
    Ok(())
}

async fn cmd_propose(
    root: &Path,
    id: &str,
    feedback: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    with_session(root, id, |mut pipeline| async move {
        let result = match feedback {
            Some(feedback) => pipeline.refine_proposal(&feedback).await,
            None => match pipeline.approve_design() {
                Ok(()) => pipeline.generate_proposal().await,
                Err(e) => Err(e),
            },
        };
        let result = match (result, output) {
            (Ok(()), Some(path)) => {
                match tokio::fs::write(&path, &pipeline.artifacts().proposal).await {
                    Ok(()) => {
                        println!("\nProposal written to {:?}", path);
                        Ok(())
                    }
                    Err(e) => Err(BsaError::from(e)),
                }
            }
            (result, _) => result,
        };
        (pipeline, result)
    })
    .await
}

async fn cmd_sessions(root: &Path, action: SessionCommands) -> Result<()> {
    let config = load_config(root)?;
    let store = SessionStore::new(config.session_dir(root));

    match action {
        SessionCommands::List => {
            let summaries = store.list().await?;
            if summaries.is_empty() {
                println!("No saved sessions");
            }
            for summary in summaries {
                let modified = chrono::DateTime::from_timestamp_millis(summary.last_modified)
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!(
                    "{}  {:<16}  {:<24}  {}",
                    summary.id, modified, summary.name, summary.preview_text
                );
            }
        }
        SessionCommands::Show { id, proposal } => {
            let session = store.load(&id).await?;
            let data = &session.data;
            println!("Session {} ({})", session.id, session.name);
            println!("Step: {:?}", data.step);
            if let Some(request) = &data.request {
                println!(
                    "Request: {} on {} ({}, density {})",
                    request.company_name,
                    request.hyper_scaler,
                    request.language,
                    request.context_density
                );
            }
            let status = |present: bool| if present { "yes" } else { "no" };
            println!("Research:      {}", status(data.research.is_some()));
            println!("Business case: {}", status(data.business.is_some()));
            println!("Design:        {}", status(data.design.is_some()));
            println!("Proposal:      {}", status(!data.proposal_markdown.is_empty()));
            println!("Cost:          {}", status(data.cost_estimation.is_some()));
            println!("Metacognition: {}", status(data.metacognition.is_some()));
            println!("Audit:         {}", status(!data.evaluation_markdown.is_empty()));
            println!("Chat turns:    {}", data.chat_history.len());
            if proposal {
                println!("\n{}", data.proposal_markdown);
            }
        }
        SessionCommands::Delete { id } => {
            if store.delete(&id).await? {
                println!("Deleted session {}", id);
            } else {
                bail!("Session not found: {}", id);
            }
        }
    }
    Ok(())
}
