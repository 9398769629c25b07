//! duneq - a terminal client for the Dune Analytics query API.

use std::io::BufRead;
use std::sync::Arc;

use duneq::api::{DuneClient, DuneClientConfig, ExecutionApi, PerformanceTier};
use duneq::cli::{Cli, Command, KeyCommand, PollArgs};
use duneq::commands::{self, RunOptions};
use duneq::config::Config;
use duneq::credentials::{self, ApiKeyStore};
use duneq::error::{DuneqError, Result};
use duneq::output;
use duneq::poll::CancelFlag;
use duneq::{logging, tui};

#[tokio::main]
async fn main() {
    // Pick up DUNE_API_KEY from a local .env if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();

    // The watch TUI owns the terminal, so its logs go to a file
    if matches!(cli.command, Command::Watch { .. }) {
        logging::init_file_logging();
    } else {
        logging::init_stderr_logging();
    }

    if let Err(e) = run(cli).await {
        eprintln!("{}: {}", e.category(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load_from_file(&cli.config_path())?;

    // Key management works without a resolved key
    if let Command::Key { command } = &cli.command {
        return handle_key(command);
    }

    let api_key = credentials::resolve_api_key(cli.api_key.as_deref(), &config)?;
    let client = DuneClient::new(DuneClientConfig::from_config(&config.api, api_key))?;
    let api: Arc<dyn ExecutionApi> = Arc::new(client);

    match &cli.command {
        Command::Run {
            query_id,
            params,
            performance,
            poll,
        } => {
            let parameters = commands::prepare_parameters(params)?;
            let opts = run_options(&config, *performance, poll);
            let cancel = cancel_on_ctrl_c();

            let results =
                commands::run_query(api, *query_id, &parameters, &opts, &cancel).await?;
            emit_results(&cli, &config, &results)
        }

        Command::Exec {
            query_id,
            params,
            performance,
        } => {
            let parameters = commands::prepare_parameters(params)?;
            let tier = performance.unwrap_or(config.defaults.performance);

            let response = commands::start_query(api, *query_id, &parameters, tier).await?;
            println!("{}", response.execution_id);
            Ok(())
        }

        Command::Status { execution_id } => {
            let status = commands::execution_status(api, execution_id).await?;
            println!("Execution ID: {}", status.execution_id);
            println!("State:        {}", status.state);
            if let Some(position) = status.queue_position {
                println!("Queue:        {position}");
            }
            if let Some(message) = status.error_message() {
                println!("Error:        {message}");
            }
            Ok(())
        }

        Command::Results { execution_id } => {
            let results = commands::execution_results(api, execution_id).await?;
            emit_results(&cli, &config, &results)
        }

        Command::Cancel { execution_id } => {
            let acknowledged = commands::cancel_execution(api, execution_id).await?;
            if acknowledged {
                println!("Execution {execution_id} cancelled");
            } else {
                println!("Cancellation of {execution_id} was not acknowledged");
            }
            Ok(())
        }

        Command::Latest {
            query_id,
            max_age_hours,
        } => {
            let results = commands::latest_results(api, *query_id, *max_age_hours).await?;
            emit_results(&cli, &config, &results)
        }

        Command::Sql {
            sql,
            file,
            params,
            performance,
            no_wait,
            poll,
        } => {
            let text = read_sql(sql.as_deref(), file.as_deref())?;
            let final_sql = commands::prepare_sql(&text, params)?;
            let tier = performance.unwrap_or(config.defaults.performance);

            if *no_wait {
                let response = commands::start_sql(api, &final_sql, tier).await?;
                println!("{}", response.execution_id);
                return Ok(());
            }

            let opts = run_options(&config, *performance, poll);
            let cancel = cancel_on_ctrl_c();
            let results = commands::run_sql(api, &final_sql, &opts, &cancel).await?;
            emit_results(&cli, &config, &results)
        }

        Command::Watch { execution_id, poll } => {
            tui::watch(
                api,
                execution_id,
                poll.interval(&config.defaults),
                config.defaults.max_display_rows,
            )
            .await
        }

        Command::Key { .. } => unreachable!("handled above"),
    }
}

/// Merges config defaults with the CLI polling flags.
fn run_options(config: &Config, performance: Option<PerformanceTier>, poll: &PollArgs) -> RunOptions {
    RunOptions {
        tier: performance.unwrap_or(config.defaults.performance),
        poll_interval: poll.interval(&config.defaults),
        max_wait: poll.wait_budget(&config.defaults),
    }
}

/// Returns a cancel flag that trips on Ctrl-C.
fn cancel_on_ctrl_c() -> CancelFlag {
    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupt received, cancelling execution...");
            flag.cancel();
        }
    });
    cancel
}

/// Renders and writes results per the output flags.
fn emit_results(cli: &Cli, config: &Config, results: &duneq::api::ResultsResponse) -> Result<()> {
    let rendered = output::render(results, cli.output, config.defaults.max_display_rows)?;

    if cli.output == output::OutputFormat::Table {
        print!("{}", output::format_metadata(results));
        println!();
    }

    output::write_output(&rendered, cli.output_file.as_deref())
}

/// Reads the SQL text from the argument, a file, or stdin.
fn read_sql(inline: Option<&str>, file: Option<&str>) -> Result<String> {
    match (inline, file) {
        (Some(sql), _) => Ok(sql.to_string()),
        (None, Some("-")) => {
            let mut text = String::new();
            for line in std::io::stdin().lock().lines() {
                let line =
                    line.map_err(|e| DuneqError::config(format!("Failed to read stdin: {e}")))?;
                text.push_str(&line);
                text.push('\n');
            }
            Ok(text)
        }
        (None, Some(path)) => std::fs::read_to_string(path)
            .map_err(|e| DuneqError::config(format!("Failed to read {path}: {e}"))),
        (None, None) => Err(DuneqError::config(
            "Provide SQL inline or with --file (\"-\" for stdin)",
        )),
    }
}

/// Handles `duneq key` subcommands.
fn handle_key(command: &KeyCommand) -> Result<()> {
    let store = ApiKeyStore::new();

    match command {
        KeyCommand::Set { value } => {
            let key = match value {
                Some(value) => value.clone(),
                None => {
                    eprint!("API key: ");
                    let mut line = String::new();
                    std::io::stdin()
                        .lock()
                        .read_line(&mut line)
                        .map_err(|e| DuneqError::config(format!("Failed to read key: {e}")))?;
                    line.trim().to_string()
                }
            };

            if key.is_empty() {
                return Err(DuneqError::config("API key is empty"));
            }

            store.store(&key)?;
            println!("Stored API key {}", credentials::mask_secret(&key));
            Ok(())
        }
        KeyCommand::Show => {
            match store.retrieve()? {
                Some(key) => println!("{}", credentials::mask_secret(&key)),
                None => println!("No API key stored"),
            }
            Ok(())
        }
        KeyCommand::Clear => {
            store.delete()?;
            println!("Stored API key removed");
            Ok(())
        }
    }
}
