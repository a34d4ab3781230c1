use anyhow::Context;
use clap::{Parser, Subcommand};
use fruitslot_core::{
    simulate, EngineParams, EntropyRng, RandomSource, SeededRng, SessionToken, SimulationReport,
    Symbol,
};
use fruitslot_server::{config::DEFAULT_DATABASE_URL, SessionStore, SqliteStore};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fruitslot-cli", about = "Admin CLI for fruitslot server")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Database URL, default sqlite://fruitslot.db
    #[arg(long, value_parser, env = "DATABASE_URL")]
    database_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// View last N spins
    ViewLogs {
        #[arg(default_value_t = 20)]
        n: usize,
    },
    /// Export spins to CSV path
    ExportCsv { path: String },
    /// Print one session
    ShowSession { token: String },
    /// Play simulated sessions offline and report the observed return to player
    Simulate {
        #[arg(long, default_value_t = 10)]
        start: u64,
        #[arg(long, default_value_t = 1000)]
        spins: u64,
        #[arg(long, default_value_t = 1)]
        sessions: u64,
        /// Server seed for a reproducible run; session i uses nonce i
        #[arg(long)]
        seed: Option<String>,
    },
}

fn codes(symbols: &[Symbol]) -> String {
    symbols.iter().map(|s| s.code()).collect()
}

async fn open_store(url: Option<String>) -> anyhow::Result<SqliteStore> {
    let url = url.unwrap_or_else(|| DEFAULT_DATABASE_URL.into());
    let store = SqliteStore::connect(&url, 5)
        .await
        .with_context(|| format!("opening {url}"))?;
    Ok(store)
}

fn run_simulation(start: u64, spins: u64, sessions: u64, seed: Option<&str>) -> SimulationReport {
    let params = EngineParams::default();
    let mut total = SimulationReport::default();
    for i in 0..sessions {
        let mut rng: Box<dyn RandomSource> = match seed {
            Some(seed) => Box::new(SeededRng::new(seed, "simulate", i)),
            None => Box::new(EntropyRng::new()),
        };
        let report = simulate(start, spins, &params, &mut rng);
        total.merge(&report);
    }
    total
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();
    let cli = Cli::parse();

    match cli.command {
        Commands::ViewLogs { n } => {
            let store = open_store(cli.database_url).await?;
            for r in store.recent_spins(n).await? {
                println!(
                    "#{:>6} {} session={} result={} win={} reward={} rerolled={} credits={}",
                    r.id,
                    r.ts.to_rfc3339(),
                    r.session_token,
                    codes(&r.result),
                    r.win,
                    r.reward,
                    r.rerolled,
                    r.credits_after
                );
            }
        }
        Commands::ExportCsv { path } => {
            let store = open_store(cli.database_url).await?;
            let mut wtr = csv::Writer::from_path(&path)?;
            wtr.write_record([
                "id",
                "ts",
                "session_token",
                "result",
                "win",
                "reward",
                "rerolled",
                "credits_after",
            ])?;
            let rows = store.all_spins().await?;
            for r in &rows {
                wtr.write_record(&[
                    r.id.to_string(),
                    r.ts.to_rfc3339(),
                    r.session_token.to_string(),
                    codes(&r.result),
                    r.win.to_string(),
                    r.reward.to_string(),
                    r.rerolled.to_string(),
                    r.credits_after.to_string(),
                ])?;
            }
            wtr.flush()?;
            println!("Exported {} rows to {}", rows.len(), path);
        }
        Commands::ShowSession { token } => {
            let token: SessionToken = token.parse().context("not a session token")?;
            let store = open_store(cli.database_url).await?;
            match store.get(&token).await? {
                Some(s) => println!(
                    "session={} credits={} state={:?} created={} updated={}",
                    s.token(),
                    s.credits(),
                    s.state(),
                    s.created_at().to_rfc3339(),
                    s.updated_at().to_rfc3339()
                ),
                None => println!("Session not found"),
            }
        }
        Commands::Simulate {
            start,
            spins,
            sessions,
            seed,
        } => {
            let report = run_simulation(start, spins, sessions, seed.as_deref());
            println!(
                "sessions={} spins={} wins={} rerolls={} wagered={} paid={} final_balance={} rtp={:.4}",
                sessions,
                report.spins,
                report.wins,
                report.rerolls,
                report.total_wagered,
                report.total_paid,
                report.final_balance,
                report.rtp()
            );
        }
    }

    Ok(())
}
