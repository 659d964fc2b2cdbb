use anyhow::{anyhow, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use nba_agent::models::teams::{self, NbaTeam};
use nba_agent::utils::bets::BetKind;
use nba_agent::utils::data::{load_bets, load_game_log};
use nba_agent::utils::ev_calculator::{american_to_decimal, assess_odds};
use nba_agent::{Config, MatchupPrediction, TrainConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nba-agent", about = "NBA Four Factors predictions and bet tracking")]
struct Cli {
    /// Directory holding the CSV tables and the model (overrides NBA_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Download the team game log (or reuse the cache with USE_CACHE=1)
    Fetch,
    /// Rebuild the rolling feature table from the game log
    Features,
    /// Train and evaluate the model on the feature table
    Train {
        #[arg(long, default_value_t = 1000)]
        epochs: usize,
        #[arg(long, default_value_t = 0.1)]
        learning_rate: f64,
        #[arg(long, default_value_t = 0.2)]
        test_fraction: f64,
    },
    /// Predict a single matchup
    Predict {
        /// Home team abbreviation or id
        #[arg(long)]
        home: String,
        /// Away team abbreviation or id
        #[arg(long)]
        away: String,
        /// Game date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Decimal odds offered on the predicted winner
        #[arg(long, conflicts_with = "american")]
        odds: Option<f64>,
        /// American odds offered on the predicted winner
        #[arg(long, allow_hyphen_values = true)]
        american: Option<i32>,
        /// Log the prediction as a manual bet
        #[arg(long)]
        save: bool,
    },
    /// Predict every game on the scoreboard and log them
    Today {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Settle pending bets against the game log
    Verify,
    /// Show the bet ledger record
    Stats,
    /// Remove duplicate ledger rows, keeping the latest
    Dedupe,
    /// Fetch, rebuild, verify and predict in one go
    Daily {
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

fn resolve_team(name: &str) -> Result<&'static NbaTeam> {
    teams::resolve(name).ok_or_else(|| anyhow!(nba_agent::Error::UnknownTeam(name.to_string())))
}

fn print_prediction(i: usize, prediction: &MatchupPrediction) {
    println!("{}. {}", i + 1, prediction.format());
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nba_agent=info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("Invalid configuration")?;
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }
    let today = Local::now().date_naive();

    match cli.command {
        Command::Fetch => {
            let rows = nba_agent::refresh_game_log(&config).await?;
            println!("Game log ready: {} team rows", rows.len());
        }
        Command::Features => {
            let rows = load_game_log(config.games_file())
                .context("Failed to read game log, run `fetch` first")?;
            let table = nba_agent::rebuild_feature_table(&config, &rows)?;
            println!(
                "Feature table rebuilt: {} rows -> {}",
                table.len(),
                config.features_file().display()
            );
        }
        Command::Train {
            epochs,
            learning_rate,
            test_fraction,
        } => {
            let train_config = TrainConfig {
                epochs,
                learning_rate,
                test_fraction,
                ..TrainConfig::default()
            };
            let report = nba_agent::train_model(&config, &train_config)?;

            println!("Train: {}", report.train);
            match &report.test {
                Some(test) => println!("Test:  {}", test),
                None => println!("Test:  no held-out games"),
            }
            println!("\nFeature importance:");
            for (name, weight) in report.model.feature_importances() {
                println!("  {:<22} {:.4}", name, weight);
            }
            println!("\nSaved model to {}", config.model_file().display());
        }
        Command::Predict {
            home,
            away,
            date,
            odds,
            american,
            save,
        } => {
            let home = resolve_team(&home)?;
            let away = resolve_team(&away)?;
            let date = date.unwrap_or(today);
            let prediction = nba_agent::predict_matchup_for(&config, home.id, away.id, date)?;

            println!("{} vs {} on {}\n", home.full_name(), away.full_name(), date);
            println!("{}", prediction.format());

            let decimal_odds = odds.or(american.map(american_to_decimal));
            if let Some(decimal_odds) = decimal_odds {
                let assessment = assess_odds(prediction.confidence, decimal_odds);
                println!(
                    "Odds {:.2} | Implied {:.1}% | Edge {:+.1}% | EV {:+.3} per unit | {}",
                    assessment.decimal_odds,
                    assessment.implied_prob * 100.0,
                    assessment.edge * 100.0,
                    assessment.expected_value,
                    assessment.quality
                );
            }

            if save {
                if nba_agent::record_bet(&config, &prediction, BetKind::Manual, decimal_odds)? {
                    println!("Bet saved to {}", config.bets_file().display());
                } else {
                    println!("This game is already in the ledger");
                }
            }
        }
        Command::Today { date } => {
            let date = date.unwrap_or(today);
            let predictions = nba_agent::predict_scheduled_games(&config, date).await?;
            if predictions.is_empty() {
                println!("No games to predict on {}", date);
            } else {
                println!("Predictions for {}:\n", date);
                for (i, prediction) in predictions.iter().enumerate() {
                    print_prediction(i, prediction);
                }
            }
        }
        Command::Verify => {
            let rows = load_game_log(config.games_file())
                .context("Failed to read game log, run `fetch` first")?;
            let (updated, summary) = nba_agent::verify_bet_history(&config, &rows)?;
            println!("{} bets settled", updated);
            println!(
                "Record: {}-{} ({:.1}%), {} pending",
                summary.wins, summary.losses, summary.accuracy, summary.pending
            );
        }
        Command::Stats => {
            let ledger = load_bets(config.bets_file()).context("Failed to read bet history")?;
            let summary = nba_agent::utils::bets::summarize(&ledger);
            println!("Total bets:  {}", ledger.len());
            println!("Settled:     {}", summary.settled);
            println!("Wins:        {}", summary.wins);
            println!("Losses:      {}", summary.losses);
            println!("Accuracy:    {:.1}%", summary.accuracy);
            println!("Verdict:     {}", summary.verdict);
        }
        Command::Dedupe => {
            let removed = nba_agent::dedupe_bet_history(&config)?;
            println!("Removed {} duplicate bets", removed);
        }
        Command::Daily { date } => {
            let date = date.unwrap_or(today);
            let report = nba_agent::run_daily_routine(&config, date).await?;
            println!("Game log:      {} rows", report.raw_rows);
            println!("Feature table: {} rows", report.feature_rows);
            println!("Settled:       {} bets", report.settled);
            println!(
                "Record:        {}-{} ({:.1}%) {}",
                report.summary.wins,
                report.summary.losses,
                report.summary.accuracy,
                report.summary.verdict
            );
            println!("\nPredictions for {}:\n", date);
            for (i, prediction) in report.predictions.iter().enumerate() {
                print_prediction(i, prediction);
            }
        }
    }

    Ok(())
}
