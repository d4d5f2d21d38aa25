// sql-agent: ask questions about a SQLite database in plain language
//
// With no arguments, starts an interactive session. Each argument is
// otherwise asked in turn as part of one conversation.

use anyhow::{Context, Result};
use sql_agent::agent::{AgentExecutor, ExecutorOptions};
use sql_agent::cli::{Repl, Session, GOODBYE};
use sql_agent::config::Settings;
use sql_agent::database::DatabaseManager;
use sql_agent::llm::create_provider;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sql_agent=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let questions: Vec<String> = std::env::args().skip(1).collect();

    tokio::select! {
        result = run(questions) => result,
        _ = tokio::signal::ctrl_c() => {
            println!("{}", GOODBYE);
            Ok(())
        }
    }
}

async fn run(questions: Vec<String>) -> Result<()> {
    let settings = Settings::load().context("Failed to load configuration")?;
    info!(
        provider = %settings.provider,
        database = %settings.database,
        max_tool_calls = settings.max_tool_calls,
        "configuration loaded"
    );

    let database = DatabaseManager::connect(&settings.database).await?;
    let tables = database.list_tables().await?;
    println!("Tables in {}:", database.location());
    if tables.is_empty() {
        println!("  (none)");
    }
    for table in tables.lines() {
        println!("  {}", table);
    }

    let provider = create_provider(&settings)?;
    let executor = AgentExecutor::for_database(provider, database.clone(), &settings.report_dir)
        .await?
        .with_options(ExecutorOptions::from_settings(&settings));

    let mut session = Session::new(executor, database);
    session.set_verbose(settings.verbose);

    if questions.is_empty() {
        let mut repl = Repl::new(session)?;
        repl.run().await?;
        return Ok(());
    }

    for question in &questions {
        println!("> {}", question);
        let answer = session
            .ask(question)
            .await
            .with_context(|| format!("Failed to answer {:?}", question))?;
        println!("{}\n", answer);
    }

    Ok(())
}
