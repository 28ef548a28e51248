use clap::{Parser, Subcommand};
use genstudio::{
    list_price, Accounts, GenerateError, Registration, Session, Studio, RECENT_HISTORY_LIMIT,
};
use gs_config::{ConfigPaths, StudioConfig};
use gs_gen::{CancellationToken, ErrorCategory, GenerationRequest};
use gs_quota::{snapshot_all, Modality, UsageCounters, User, UsageSnapshot, Voice};
use std::io::IsTerminal;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "genstudio",
    version = genstudio::STUDIO_VERSION,
    about = "Generate video, images and speech from a prompt"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the plan table
    Plans,
    /// Show usage against a plan's limits
    Usage {
        /// Plan name; unknown plans fall back to Free
        #[arg(long)]
        plan: Option<String>,
        #[arg(long, default_value_t = 0)]
        used_video: u32,
        #[arg(long, default_value_t = 0)]
        used_image: u32,
        #[arg(long, default_value_t = 0)]
        used_audio: u32,
    },
    /// Run one generation and save the result
    Generate {
        /// video, image or audio
        modality: Modality,
        #[arg(long)]
        prompt: String,
        /// Voice for audio generation
        #[arg(long)]
        voice: Option<Voice>,
        /// Output file; defaults to the studio output directory
        #[arg(long)]
        out: Option<PathBuf>,
        /// Sign in before generating so the result is recorded
        #[arg(long, requires = "email")]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Never prompt for an API key
        #[arg(long)]
        non_interactive: bool,
        /// Print the resulting session as JSON
        #[arg(long)]
        json: bool,
    },
    /// Synthesize a short voice preview
    Preview {
        #[arg(long)]
        text: String,
        #[arg(long, default_value_t = Voice::default())]
        voice: Voice,
        #[arg(long)]
        out: Option<PathBuf>,
        /// Sign in first so the preview is checked against that plan
        #[arg(long, requires = "email")]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        non_interactive: bool,
    },
    /// Create a (simulated) account and print it
    Register {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
        #[arg(long)]
        accept_terms: bool,
        #[arg(long)]
        accept_privacy: bool,
    },
    /// Sign in and buy a plan through the simulated checkout
    Upgrade {
        /// Plan to buy; defaults to Pro
        #[arg(long)]
        plan: Option<String>,
        /// Amount paid; defaults to the plan's list price
        #[arg(long)]
        amount: Option<u32>,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long)]
        email: String,
        /// Print the receipt and session as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the effective configuration
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "genstudio=info,gs_gen=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = StudioConfig::load()?;

    match cli.command {
        Commands::Plans => {
            println!("{:<12} {:>8} {:>8} {:>8}", "PLAN", "VIDEO", "IMAGE", "AUDIO");
            for (name, limits) in config.plans.iter() {
                println!(
                    "{:<12} {:>8} {:>8} {:>8}",
                    name, limits.video, limits.image, limits.audio
                );
            }
        }
        Commands::Usage {
            plan,
            used_video,
            used_image,
            used_audio,
        } => {
            let mut user = User::new("", "");
            if let Some(plan) = plan {
                user = user.with_plan(plan);
            }
            user.usage = UsageCounters {
                video: used_video,
                image: used_image,
                audio: used_audio,
            };
            print_usage(&snapshot_all(&config.plans, Some(&user)));
        }
        Commands::Generate {
            modality,
            prompt,
            voice,
            out,
            name,
            email,
            non_interactive,
            json,
        } => {
            let studio = Studio::from_config(&config, interactive(non_interactive))?;
            let session = sign_in(&config, name, email).await?;

            let cancel = cancel_on_ctrl_c();
            let request = GenerationRequest::new(modality, prompt, voice);
            let generation = match studio.generate(&session, request, &cancel).await {
                Ok(g) => g,
                Err(e) => {
                    report(&e, &config);
                    std::process::exit(1);
                }
            };

            let path = match out {
                Some(path) => path,
                None => default_output(&config, modality, generation.content.timestamp)?,
            };
            let blob = studio.media().export(generation.content.url(), &path).await?;
            println!("Saved {} ({} bytes) to {}", blob.mime, blob.bytes.len(), path.display());

            if let Some(user) = generation.session.user() {
                print_usage(&studio.usage(&generation.session));
                let recent = user.recent_history(RECENT_HISTORY_LIMIT);
                println!("{} of {} history entries shown", recent.len(), user.history.len());
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&generation.session)?);
            }
        }
        Commands::Preview {
            text,
            voice,
            out,
            name,
            email,
            non_interactive,
        } => {
            let studio = Studio::from_config(&config, interactive(non_interactive))?;
            let session = sign_in(&config, name, email).await?;
            let url = match studio.preview_voice(&session, &text, voice).await {
                Ok(url) => url,
                Err(e) => {
                    report(&e, &config);
                    std::process::exit(1);
                }
            };
            let path = match out {
                Some(path) => path,
                None => {
                    let dir = ConfigPaths::ensure_dir(&config.paths()?.output_dir())?;
                    dir.join(format!("preview-{}.wav", voice.as_str().to_lowercase()))
                }
            };
            studio.media().export(&url, &path).await?;
            println!("Saved {} preview to {}", voice, path.display());
        }
        Commands::Register {
            name,
            email,
            password,
            confirm_password,
            accept_terms,
            accept_privacy,
        } => {
            let form = Registration {
                name,
                email,
                password,
                confirm_password,
                terms_accepted: accept_terms,
                privacy_accepted: accept_privacy,
            };
            let session = Accounts::new(&config.auth).register(&form).await?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        Commands::Upgrade {
            plan,
            amount,
            name,
            email,
            json,
        } => {
            let plan = plan.unwrap_or_default();
            let priced = if plan.trim().is_empty() { "Pro" } else { plan.trim() };
            let Some(amount) = amount.or_else(|| list_price(priced)) else {
                anyhow::bail!("{priced} has no list price; pass --amount");
            };

            let accounts = Accounts::new(&config.auth);
            let session = accounts.login(&name, &email).await?;
            let (session, receipt) = accounts.checkout(session, &plan, amount).await?;
            if json {
                let out = serde_json::json!({ "receipt": receipt, "session": session });
                println!("{}", serde_json::to_string_pretty(&out)?);
            } else {
                println!(
                    "Paid {} for {} ({} credits)",
                    receipt.amount, receipt.plan, receipt.credits
                );
                print_usage(&snapshot_all(&config.plans, session.user()));
            }
        }
        Commands::Config => {
            let paths = config.paths()?;
            println!("# {}", paths.config_path().display());
            print!("{}", config.to_toml()?);
        }
    }

    Ok(())
}

/// Signs in through the simulated account flow when an email is given.
async fn sign_in(
    config: &StudioConfig,
    name: Option<String>,
    email: Option<String>,
) -> anyhow::Result<Session> {
    match email {
        Some(email) => {
            let accounts = Accounts::new(&config.auth);
            Ok(accounts.login(&name.unwrap_or_default(), &email).await?)
        }
        None => Ok(Session::Anonymous),
    }
}

fn interactive(non_interactive: bool) -> bool {
    !non_interactive && std::io::stdin().is_terminal()
}

/// A token cancelled by the first Ctrl-C.
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted; cancelling generation");
            token.cancel();
        }
    });
    cancel
}

fn default_output(
    config: &StudioConfig,
    modality: Modality,
    timestamp: i64,
) -> anyhow::Result<PathBuf> {
    let dir = ConfigPaths::ensure_dir(&config.paths()?.output_dir())?;
    let ext = match modality {
        Modality::Video => "mp4",
        Modality::Image => "png",
        Modality::Audio => "wav",
    };
    Ok(dir.join(format!("{modality}-{timestamp}.{ext}")))
}

fn print_usage(snapshots: &[UsageSnapshot]) {
    for s in snapshots {
        let flag = if s.is_limit_reached { "  (limit reached)" } else { "" };
        println!(
            "{:<6} {:>5}/{:<5} {:>5.1}%  {} plan{}",
            s.modality, s.used, s.limit, s.percentage, s.plan, flag
        );
    }
}

fn report(err: &GenerateError, config: &StudioConfig) {
    eprintln!("error: {err}");
    let Some(category) = err.category() else {
        return;
    };
    eprintln!("  {} [{}]", category.label(), category.code());
    if category == ErrorCategory::LoginRequired {
        eprintln!(
            "  set {} to an API key from a paid project",
            config.generation.api_key_env
        );
    } else if category.is_retryable() {
        eprintln!("  this may succeed if retried later");
    }
}
