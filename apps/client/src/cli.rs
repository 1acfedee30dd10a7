use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use dialoguer::{Confirm as Prompt, Input, Password};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::analysis::presenter::{AnalysisView, ExportSink};
use crate::analysis::report::{render_history, render_report};
use crate::api_client::{AnalysisService, HttpAnalysisService};
use crate::config::Config;
use crate::errors::ClientError;
use crate::models::analysis::ExperienceLevel;
use crate::models::upload::ResumeFile;
use crate::session::guard::{GuardDecision, Route, RouteGuard};
use crate::session::storage::FileSlotStorage;
use crate::session::store::{SessionChange, SessionStore};
use crate::workflow::auth::{AuthController, LOGIN_FAILED, SIGNUP_FAILED};
use crate::workflow::history::{
    Confirm, DeleteOutcome, HistoryController, DELETE_FAILED, DELETE_PROMPT,
};
use crate::workflow::upload::{SubmitOutcome, UploadController};
use crate::workflow::Completion;

#[derive(Parser)]
#[command(name = "refinery", version)]
#[command(about = "Score your resume against a job description", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create an account and log in
    Signup {
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
    },

    /// Log in to an existing account
    Login {
        #[arg(long)]
        email: Option<String>,
    },

    /// Forget the stored session
    Logout,

    /// Show who is logged in
    Whoami,

    /// Upload a resume and analyze it against a job description
    Analyze {
        /// Resume file (.pdf or .docx, at most 10MB)
        #[arg(required = true)]
        resume: PathBuf,

        /// Job description text
        #[arg(short, long, conflicts_with = "job_file")]
        job_description: Option<String>,

        /// Read the job description from a file
        #[arg(long)]
        job_file: Option<PathBuf>,

        /// Role you are targeting
        #[arg(short, long)]
        target_role: Option<String>,

        /// fresher, mid or senior
        #[arg(short = 'l', long)]
        experience_level: Option<ExperienceLevel>,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// List past analyses with summary statistics
    History,

    /// Show one past analysis
    View {
        id: String,

        #[command(flatten)]
        export: ExportArgs,
    },

    /// Delete past analyses
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Render a saved analysis JSON file
    Show {
        file: PathBuf,

        #[command(flatten)]
        export: ExportArgs,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct ExportArgs {
    /// Save the analysis as JSON in the download directory
    #[arg(long)]
    save: bool,

    /// Print the missing keywords as one comma-separated line
    #[arg(long)]
    copy_keywords: bool,

    /// Print the analysis as JSON instead of the report
    #[arg(long)]
    json: bool,
}

/// Terminal stand-in for clipboard and browser downloads.
struct TerminalExport {
    download_dir: PathBuf,
}

impl ExportSink for TerminalExport {
    fn copy_text(&self, text: &str) -> Result<(), ClientError> {
        println!("{text}");
        Ok(())
    }

    fn save_file(&self, file_name: &str, contents: &str) -> Result<PathBuf, ClientError> {
        fs::create_dir_all(&self.download_dir)?;
        let path = self.download_dir.join(file_name);
        fs::write(&path, contents)?;
        Ok(path)
    }
}

/// An answer collected before the delete started, so concurrent deletes never
/// prompt over each other.
struct Answered(bool);

impl Confirm for Answered {
    fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

fn ask(prompt: &str) -> bool {
    match Prompt::new().with_prompt(prompt).default(false).interact() {
        Ok(answer) => answer,
        Err(e) => {
            warn!("Confirmation prompt failed, treating as no: {e}");
            false
        }
    }
}

struct App {
    config: Config,
    session: Arc<SessionStore>,
    service: Arc<dyn AnalysisService>,
    guard: RouteGuard,
}

impl App {
    fn build(config: Config) -> Result<Self> {
        let storage = Arc::new(FileSlotStorage::new(config.session_dir.clone()));
        let session = Arc::new(SessionStore::new(storage));
        session.init();

        let service = HttpAnalysisService::new(&config.api_url, config.http_timeout, session.clone())
            .context("Failed to build HTTP client")?;
        debug!("Using analysis service at {}", config.api_url);

        Ok(Self {
            guard: RouteGuard::new(session.clone()),
            service: Arc::new(service),
            session,
            config,
        })
    }

    /// Runs the route guard for the screen a command stands for.
    async fn enter(&self, route: Route) -> Result<()> {
        match self.guard.settle(route).await {
            GuardDecision::Render => Ok(()),
            GuardDecision::Redirect(Route::Login) => {
                bail!("You are not logged in. Run `refinery login` first.")
            }
            GuardDecision::Redirect(other) => bail!("{route} is not available here (go to {other})"),
            GuardDecision::Waiting => bail!("Session is still loading"),
        }
    }

    fn export_sink(&self) -> TerminalExport {
        TerminalExport {
            download_dir: self.config.download_dir.clone(),
        }
    }

    fn present(&self, view: &AnalysisView, args: &ExportArgs) -> Result<()> {
        let sink = self.export_sink();
        if args.json {
            view.copy_json(&sink)?;
        } else {
            print!("{}", render_report(view));
        }
        if args.copy_keywords {
            view.copy_keywords(&sink)?;
        }
        if args.save {
            let path = view.download(&sink)?;
            println!("Saved {}", path.display());
        }
        Ok(())
    }
}

/// Turns a controller failure into the message the controller surfaced.
fn surfaced(err: ClientError, shown: Option<String>) -> anyhow::Error {
    let message = shown.unwrap_or_else(|| err.to_string());
    if err.is_authorization() {
        anyhow!("{message} Run `refinery login`.")
    } else {
        anyhow!(message)
    }
}

/// Built from the task's own error: concurrent deletes share one controller
/// error slot.
fn delete_failure(id: &str, err: ClientError) -> String {
    let shown = err.user_message(DELETE_FAILED);
    format!("{id}: {}", surfaced(err, Some(shown)))
}

fn applied<T>(completion: Completion<T>) -> Result<T> {
    completion
        .applied()
        .context("The result arrived after the screen was left")
}

fn prompt_text(prompt: &str, given: Option<String>) -> Result<String> {
    match given {
        Some(value) => Ok(value),
        None => Input::<String>::new()
            .with_prompt(prompt)
            .interact_text()
            .with_context(|| format!("Failed to read {prompt}")),
    }
}

pub async fn run(cli: Cli, config: Config) -> Result<()> {
    let app = App::build(config)?;
    let outcome = dispatch(&app, cli.command).await;
    if app.session.snapshot().change == SessionChange::Invalidated {
        warn!("Stored session was rejected by the service and has been cleared");
    }
    app.session.teardown();
    outcome
}

async fn dispatch(app: &App, command: Commands) -> Result<()> {
    match command {
        Commands::Signup { name, email } => signup(app, name, email).await,
        Commands::Login { email } => login(app, email).await,
        Commands::Logout => {
            let next = AuthController::new(app.session.clone(), app.service.clone()).logout();
            debug!("Logged out, next route {next}");
            println!("Logged out.");
            Ok(())
        }
        Commands::Whoami => {
            match app.session.current() {
                Some(session) => println!("{} <{}>", session.name, session.email),
                None => println!("Not logged in."),
            }
            Ok(())
        }
        Commands::Analyze {
            resume,
            job_description,
            job_file,
            target_role,
            experience_level,
            export,
        } => {
            let job_description = match (job_description, job_file) {
                (Some(text), _) => text,
                (None, Some(path)) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (None, None) => prompt_text("Job description", None)?,
            };
            analyze(app, &resume, job_description, target_role, experience_level, &export).await
        }
        Commands::History => history(app).await,
        Commands::View { id, export } => view(app, &id, &export).await,
        Commands::Delete { ids, yes } => delete(app, ids, yes).await,
        Commands::Show { file, export } => {
            app.enter(Route::Results).await?;
            let raw = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let payload: serde_json::Value = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not valid JSON", file.display()))?;
            let view = AnalysisView::from_payload(Some(&payload))
                .map_err(|e| anyhow!("{e}. Run `refinery analyze` to create one."))?;
            app.present(&view, &export)
        }
    }
}

async fn signup(app: &App, name: Option<String>, email: Option<String>) -> Result<()> {
    app.enter(Route::Signup).await?;
    let name = prompt_text("Name", name)?;
    let email = prompt_text("Email", email)?;
    let password = Password::new()
        .with_prompt("Password")
        .with_confirmation("Confirm password", "Passwords do not match")
        .interact()
        .context("Failed to read password")?;

    let auth = AuthController::new(app.session.clone(), app.service.clone());
    let session = auth
        .signup(&name, &email, &password)
        .await
        .map_err(|e| anyhow!(e.user_message(SIGNUP_FAILED)))?;
    println!("Welcome, {}! You are logged in.", session.name);
    Ok(())
}

async fn login(app: &App, email: Option<String>) -> Result<()> {
    app.enter(Route::Login).await?;
    let email = prompt_text("Email", email)?;
    let password = Password::new()
        .with_prompt("Password")
        .interact()
        .context("Failed to read password")?;

    let auth = AuthController::new(app.session.clone(), app.service.clone());
    let session = auth
        .login(&email, &password)
        .await
        .map_err(|e| anyhow!(e.user_message(LOGIN_FAILED)))?;
    println!("Logged in as {} <{}>.", session.name, session.email);
    Ok(())
}

async fn analyze(
    app: &App,
    resume: &Path,
    job_description: String,
    target_role: Option<String>,
    experience_level: Option<ExperienceLevel>,
    export: &ExportArgs,
) -> Result<()> {
    let upload = UploadController::new(app.session.clone(), app.service.clone());

    let file = ResumeFile::from_path(resume)
        .await
        .with_context(|| format!("Failed to read {}", resume.display()))?;
    upload.set_file(file)?;
    upload.set_job_description(job_description);
    upload.set_target_role(target_role);
    upload.set_experience_level(experience_level);

    println!("Analyzing {}...", resume.display());
    if !upload.can_submit() {
        bail!("Nothing to submit");
    }
    let outcome = tokio::select! {
        result = upload.submit() => match result {
            Ok(completion) => applied(completion)?,
            Err(err) => return Err(surfaced(err, upload.error())),
        },
        _ = tokio::signal::ctrl_c() => {
            upload.leave();
            bail!("Analysis cancelled");
        }
    };

    match outcome {
        SubmitOutcome::Analyzed(record) => app.present(&AnalysisView::new(record), export),
        SubmitOutcome::Redirect(route) => {
            info!("Submission redirected to {route}");
            bail!("You need an account to analyze a resume. Run `refinery signup` or `refinery login`.")
        }
        SubmitOutcome::Busy => bail!("An analysis is already running"),
    }
}

async fn load_history(history: &HistoryController) -> Result<()> {
    match history.fetch_history().await {
        Ok(completion) => applied(completion).map(|_| ()),
        Err(err) => Err(surfaced(err, history.error())),
    }
}

async fn history(app: &App) -> Result<()> {
    app.enter(Route::History).await?;
    let history = HistoryController::new(app.service.clone());
    load_history(&history).await?;
    print!(
        "{}",
        render_history(&history.records(), history.stats(), |id| history.is_pending(id))
    );
    Ok(())
}

async fn view(app: &App, id: &str, export: &ExportArgs) -> Result<()> {
    app.enter(Route::History).await?;
    let history = HistoryController::new(app.service.clone());
    let view = match history.view_record(id).await {
        Ok(completion) => applied(completion)?,
        Err(err) => return Err(surfaced(err, history.error())),
    };
    app.enter(Route::Results).await?;
    app.present(&view, export)
}

async fn delete(app: &App, ids: Vec<String>, yes: bool) -> Result<()> {
    app.enter(Route::History).await?;
    let history = Arc::new(HistoryController::new(app.service.clone()));
    load_history(&history).await?;

    let mut seen = HashSet::new();
    let mut tasks = JoinSet::new();
    for id in ids.into_iter().filter(|id| seen.insert(id.clone())) {
        let answer = yes || {
            if let Some(record) = history.records().iter().find(|r| r.has_id(&id)) {
                println!("{id}: {} ({}%)", record.resume_file_name, record.ats_score);
            }
            ask(&format!("{DELETE_PROMPT} [{id}]"))
        };
        let history = history.clone();
        tasks.spawn(async move {
            let result = history.delete_record(&id, &Answered(answer)).await;
            (id, result)
        });
    }

    let mut failed = 0usize;
    while let Some(joined) = tasks.join_next().await {
        let (id, result) = joined.context("Delete task panicked")?;
        match result.map(applied) {
            Ok(Ok(DeleteOutcome::Deleted)) => println!("Deleted {id}."),
            Ok(Ok(DeleteOutcome::Cancelled)) => println!("Kept {id}."),
            Ok(Ok(DeleteOutcome::AlreadyPending)) => debug!("Delete of {id} already running"),
            Ok(Err(e)) => return Err(e),
            Err(err) => {
                failed += 1;
                eprintln!("{}", delete_failure(&id, err));
            }
        }
    }

    println!();
    print!(
        "{}",
        render_history(&history.records(), history.stats(), |id| history.is_pending(id))
    );
    if failed > 0 {
        bail!("{failed} deletion(s) failed");
    }
    Ok(())
}
