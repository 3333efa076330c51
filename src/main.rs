use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use curify_studio_lib::api::LoginCredentials;
use curify_studio_lib::poller::{CreditEvent, JobType, ProjectEvent};
use curify_studio_lib::{
    billing, ApiClient, ClientCache, ClientConfig, CreditConfirmationPoller, CreditOutcome,
    ProjectOutcome, ProjectStatusPoller,
};
use std::io::BufRead;
use std::sync::Arc;
use tracing::{debug, info, Level};

#[derive(Parser)]
#[command(name = "curify")]
#[command(about = "Curify Studio client - watch processing jobs and confirm credit top-ups")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, global = true)]
    verbose: bool,

    /// Print events as JSON lines
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll a project until it completes or fails
    Watch {
        /// Project identifier
        project_id: String,

        /// translation, subtitles or reprocessing
        #[arg(long, default_value = "translation")]
        job_type: JobType,
    },

    /// Wait for purchased credits to appear on the profile
    ConfirmCredits,

    /// List projects in the user's library
    Projects,

    /// Show the current profile and credit balances
    Profile,

    /// Sign in and remember the session in the local cache
    Login {
        /// Account email; the password is read from stdin
        #[arg(long, conflicts_with_all = ["google_credential", "token"])]
        email: Option<String>,

        /// Google Identity credential to exchange for a session
        #[arg(long, conflicts_with = "token")]
        google_credential: Option<String>,

        /// Store an access token obtained elsewhere
        #[arg(long)]
        token: Option<String>,
    },

    /// Forget the cached session and profile
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from_env().context("Invalid configuration")?;
    let cache = Arc::new(
        ClientCache::open(&config.cache_path)
            .with_context(|| format!("Cannot open cache {:?}", config.cache_path))?,
    );

    let mut client = ApiClient::new(&config)?;
    if config.access_token.is_none() {
        client.set_access_token(cache.access_token());
    }
    let client = Arc::new(client);
    let json = cli.json;

    match cli.command {
        Commands::Watch {
            project_id,
            job_type,
        } => {
            let listener = move |event: ProjectEvent| print_project_event(&event, json);
            let handle = ProjectStatusPoller::new(client.clone(), cache)
                .with_job_type(job_type)
                .start(&project_id, listener)?;

            let outcome = tokio::select! {
                outcome = handle.join() => outcome?,
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, stopping watch");
                    ProjectOutcome::Cancelled
                }
            };

            match outcome {
                ProjectOutcome::Completed(details) => {
                    info!(
                        "Project {} ready ({} segments)",
                        details.project_id,
                        details.segments.len()
                    );
                }
                ProjectOutcome::Failed(message) => anyhow::bail!(message),
                ProjectOutcome::DetailsUnavailable => {
                    anyhow::bail!("Project completed but its details could not be loaded")
                }
                ProjectOutcome::Cancelled => {}
            }
        }

        Commands::ConfirmCredits => {
            let listener = move |event: CreditEvent| print_credit_event(&event, json);
            let handle = CreditConfirmationPoller::new(client.clone(), cache).start(listener);

            let outcome = tokio::select! {
                outcome = handle.join() => outcome?,
                _ = tokio::signal::ctrl_c() => {
                    info!("Interrupted, stopping credit confirmation");
                    CreditOutcome::Cancelled
                }
            };

            match outcome {
                CreditOutcome::Confirmed(snapshot) => {
                    info!("Balance is now {}", snapshot.current_credits);
                }
                CreditOutcome::TimedOut(snapshot) => {
                    anyhow::bail!(
                        "Credits not updated after {} checks; \
                         they will appear once the payment settles",
                        snapshot.attempt_count
                    );
                }
                CreditOutcome::Cancelled => {}
            }
        }

        Commands::Projects => {
            let projects = client.get_user_projects().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&projects)?);
            } else {
                for project in &projects {
                    println!(
                        "{}  {:<10}  {:>6.1} min  {}",
                        project.project_id,
                        project.status,
                        project.project_duration_minutes,
                        project.project_name
                    );
                }
                println!("{} projects", projects.len());
            }
        }

        Commands::Profile => {
            let user = client.get_profile().await?;
            cache.store_user(&user)?;
            let summary = user.summary(chrono::Utc::now());

            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("{} ({} plan)", user.email, user.plan_name);
                println!(
                    "Credits: {} (~${:.2})",
                    summary.total_credits,
                    billing::credits_to_dollars(summary.total_credits, &user.plan_name)
                );
                println!(
                    "Cycle: {:.0}% elapsed, {} days left",
                    summary.cycle_progress, summary.days_until_cycle_end
                );
            }
        }

        Commands::Login {
            email,
            google_credential,
            token,
        } => {
            if let Some(token) = token {
                cache.store_access_token(Some(&token))?;
                info!("Access token stored in {:?}", config.cache_path);
                return Ok(());
            }

            let response = match (email, google_credential) {
                (_, Some(credential)) => client.google_login(&credential).await?,
                (Some(email), None) => {
                    let password = read_password()?;
                    client.login(&LoginCredentials { email, password }).await?
                }
                (None, None) => anyhow::bail!("Pass --email, --google-credential or --token"),
            };

            if !response.success {
                anyhow::bail!("Login rejected: {}", response.message);
            }
            cache.store_session(&response.data)?;
            info!("Signed in as {}", response.data.user.email);
        }

        Commands::Logout => {
            cache.clear()?;
            info!("Session cleared");
        }
    }

    if cli.verbose {
        for (route, stats) in client.request_stats() {
            debug!(
                "{}: {} requests, {} failed ({} undecodable), avg {}ms",
                route,
                stats.requests,
                stats.failures,
                stats.decode_failures,
                stats.average_latency().as_millis()
            );
        }
    }

    Ok(())
}

fn read_password() -> Result<String> {
    eprint!("Password: ");
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Cannot read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']).to_string();
    if password.is_empty() {
        anyhow::bail!("Password must not be empty");
    }
    Ok(password)
}

fn print_project_event(event: &ProjectEvent, json: bool) {
    if json {
        if let Ok(line) = serde_json::to_string(event) {
            println!("{}", line);
        }
        return;
    }

    match event {
        ProjectEvent::Step {
            raw_status,
            step_index,
            step_label,
            step_count,
        } => println!("[{}/{}] {} ({})", step_index + 1, step_count, step_label, raw_status),
        ProjectEvent::Completed { details } => {
            println!("Completed: {}", details.name);
            if let Some(url) = &details.final_video_signed_url {
                println!("Video: {}", url);
            }
        }
        ProjectEvent::Failed { message } => println!("{}", message),
    }
}

fn print_credit_event(event: &CreditEvent, json: bool) {
    if json {
        if let Ok(line) = serde_json::to_string(event) {
            println!("{}", line);
        }
        return;
    }

    match event {
        CreditEvent::Attempt {
            attempt,
            max_attempts,
            credits,
        } => match credits {
            Some(credits) => println!("Check {}/{}: {} credits", attempt, max_attempts, credits),
            None => println!("Check {}/{}: profile unavailable", attempt, max_attempts),
        },
        CreditEvent::Confirmed { credits } => println!("Payment confirmed: {} credits", credits),
        CreditEvent::TimedOut { attempts } => {
            println!("Still waiting after {} checks", attempts)
        }
        CreditEvent::Redirect { route } => println!("Continue at {}", route),
    }
}
