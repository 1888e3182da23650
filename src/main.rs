mod access;
mod cli;
mod config;
mod directory;
mod error;
mod store;
mod sweeper;
mod utils;

use std::sync::Arc;

use clap::Parser;
use colored::*;
use tracing::{error, info};

use access::SystemClock;
use cli::{Cli, Commands};
use config::Config;
use directory::{Directory, NewUser};
use store::{SqliteStore, UserStore};
use sweeper::{Schedule, SweepService, Sweeper};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "access_warden=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::List { status, format } => list_users(&config, &status, &format).await,
        Commands::Sweep { dry_run } => run_sweep(&config, dry_run).await,
        Commands::Upcoming { days } => show_upcoming(&config, days).await,
        Commands::Auto { interval, dry_run } => run_auto_service(&config, interval, dry_run).await,
        Commands::Stats { format } => show_stats(&config, &format).await,
        Commands::Add { name, email, plan } => add_user(&config, name, email, plan).await,
        Commands::Grant { email, plan } => grant_plan(&config, &email, &plan).await,
        Commands::Rename { email, name } => rename_user(&config, &email, &name).await,
        Commands::Revoke { email, yes } => revoke_access(&config, &email, yes).await,
        Commands::Init => initialize(&config).await,
    };

    if let Err(e) = result {
        error!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
}

fn open_store(config: &Config) -> error::Result<Arc<dyn UserStore>> {
    Ok(Arc::new(SqliteStore::new(&config.store.path)?))
}

fn open_directory(config: &Config) -> error::Result<Directory> {
    Ok(Directory::new(open_store(config)?, Arc::new(SystemClock)))
}

async fn list_users(config: &Config, status_filter: &str, format: &str) -> error::Result<()> {
    let directory = open_directory(config)?;
    let mut users = directory.list_all().await?;
    let evaluator = directory.evaluator();

    if status_filter != "all" {
        users.retain(|u| evaluator.status(u).as_str() == status_filter);
    }
    users.sort_by(|a, b| a.email.cmp(&b.email));

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&users)?);
        return Ok(());
    }

    let now = chrono::Utc::now();
    println!("{}", format!("{} usuários", users.len()).cyan());
    utils::print_table_border(110);
    utils::print_table_row(
        &["", "Nome", "Email", "Status", "Plano", "Expira", "Último acesso", "Origem"],
        &[3, 24, 30, 20, 12, 16, 14, 8],
    );
    utils::print_table_border(110);

    for user in &users {
        let expires = user
            .access_expiration
            .as_deref()
            .and_then(access::parse_timestamp)
            .map(|dt| utils::format_timestamp(&dt))
            .unwrap_or_else(|| "—".to_string());
        utils::print_table_row(
            &[
                &utils::initials(user.display_name()),
                user.display_name(),
                &user.email,
                &evaluator.status_text(user),
                access::plan_label(user.access_plan.as_deref()),
                &expires,
                &utils::format_date_short(user.last_access.as_ref(), now),
                user.partition.as_str(),
            ],
            &[3, 24, 30, 20, 12, 16, 14, 8],
        );
    }
    utils::print_table_border(110);

    Ok(())
}

async fn run_sweep(config: &Config, dry_run: bool) -> error::Result<()> {
    let store = open_store(config)?;
    let sweeper = Sweeper::new(store, Arc::new(SystemClock))
        .with_dry_run(dry_run || config.sweeper.dry_run);

    let count = sweeper.sweep().await;
    if dry_run {
        println!("{}", format!("DRY RUN: {} acessos expirados", count).yellow());
    } else {
        println!("{}", format!("{} acessos desativados", count).green());
    }
    Ok(())
}

async fn show_upcoming(config: &Config, days: i64) -> error::Result<()> {
    let store = open_store(config)?;
    let sweeper = Sweeper::new(store, Arc::new(SystemClock));
    let upcoming = sweeper.upcoming_expirations(days).await;

    if upcoming.is_empty() {
        println!("{}", "Nenhum acesso expirando no período".green());
        return Ok(());
    }

    println!(
        "{}",
        format!("{} acessos expirando em até {} dias:", upcoming.len(), days).yellow()
    );
    utils::print_table_border(80);
    utils::print_table_row(&["Nome", "Email", "Dias restantes"], &[24, 32, 16]);
    utils::print_table_border(80);
    for entry in &upcoming {
        utils::print_table_row(
            &[
                entry.name.as_deref().unwrap_or("Sem nome"),
                &entry.email,
                &entry.days_left.to_string(),
            ],
            &[24, 32, 16],
        );
    }
    utils::print_table_border(80);

    Ok(())
}

async fn run_auto_service(
    config: &Config,
    interval: Option<u64>,
    dry_run: bool,
) -> error::Result<()> {
    let store = open_store(config)?;
    let sweeper = Arc::new(
        Sweeper::new(store, Arc::new(SystemClock)).with_dry_run(dry_run || config.sweeper.dry_run),
    );

    let mut schedule: Schedule = config.schedule();
    if let Some(secs) = interval {
        schedule.sweep_interval = std::time::Duration::from_secs(secs);
    }

    println!("{}", "Iniciando serviço de verificação periódica...".green());
    println!("Sweep a cada {} segundos", schedule.sweep_interval.as_secs());
    println!(
        "Avisos de expiração a cada {} segundos",
        schedule.upcoming_interval.as_secs()
    );

    let handle = SweepService::new(sweeper, schedule).start();

    tokio::signal::ctrl_c()
        .await
        .map_err(|e| error::WardenError::Other(e.into()))?;
    info!("Encerrando...");
    handle.stop().await;

    Ok(())
}

async fn show_stats(config: &Config, format: &str) -> error::Result<()> {
    let directory = open_directory(config)?;
    let stats = directory.stats().await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&stats)?);
        return Ok(());
    }

    println!("{}", "=== Estatísticas de usuários ===".cyan().bold());
    println!("  Total:       {}", stats.total);
    println!("  Ativos:      {}", stats.active.to_string().green());
    println!("  Premium:     {}", stats.premium.to_string().cyan());
    println!("  Expirados:   {}", stats.expired.to_string().red());
    println!("  Sem acesso:  {}", stats.no_access.to_string().yellow());

    Ok(())
}

async fn add_user(config: &Config, name: String, email: String, plan: String) -> error::Result<()> {
    let directory = open_directory(config)?;
    let user = directory.create_user(NewUser { name, email, plan }).await?;

    println!("{}", "✓ Usuário criado".green());
    println!("  Id:      {}", user.id);
    println!("  Email:   {}", user.email);
    println!(
        "  Plano:   {}",
        directory
            .evaluator()
            .plans()
            .plan_name(user.access_plan.as_deref().unwrap_or(""))
    );
    println!(
        "  Expira:  {}",
        user.access_expiration.as_deref().unwrap_or("Nunca (Permanente)")
    );
    Ok(())
}

async fn grant_plan(config: &Config, email: &str, plan: &str) -> error::Result<()> {
    let directory = open_directory(config)?;
    let user = directory
        .find_by_email(email)
        .await?
        .ok_or_else(|| error::WardenError::UserNotFound(email.to_string()))?;

    directory.grant_plan(&user, plan).await?;
    println!(
        "{}",
        format!("✓ Acesso de {} atualizado para o plano {}", email, plan).green()
    );
    Ok(())
}

async fn rename_user(config: &Config, email: &str, name: &str) -> error::Result<()> {
    let directory = open_directory(config)?;
    let user = directory
        .find_by_email(email)
        .await?
        .ok_or_else(|| error::WardenError::UserNotFound(email.to_string()))?;

    directory.rename(&user, name).await?;
    println!("{}", format!("✓ Nome de {} atualizado", email).green());
    Ok(())
}

async fn revoke_access(config: &Config, email: &str, yes: bool) -> error::Result<()> {
    let directory = open_directory(config)?;
    let user = directory
        .find_by_email(email)
        .await?
        .ok_or_else(|| error::WardenError::UserNotFound(email.to_string()))?;

    if !yes
        && !utils::confirm_action(&format!(
            "Remover o acesso de {} ({})?",
            user.display_name(),
            user.email
        ))
    {
        println!("Cancelado");
        return Ok(());
    }

    directory.revoke_access(&user).await?;
    println!("{}", format!("✓ Acesso de {} removido", email).green());
    Ok(())
}

async fn initialize(config: &Config) -> error::Result<()> {
    let _store = SqliteStore::new(&config.store.path)?;
    println!("{}", "✓ Banco de dados inicializado".green());
    println!("\n{}", "Configuração:".cyan());
    println!("  Banco:            {}", config.store.path);
    println!(
        "  Sweep:            a cada {} s",
        config.sweeper.sweep_interval_secs
    );
    println!(
        "  Avisos:           a cada {} s",
        config.sweeper.upcoming_interval_secs
    );
    println!("  Horizonte:        {} dias", config.sweeper.horizon_days);
    println!("  Dry run:          {}", config.sweeper.dry_run);

    println!("\n{}", "Pronto! Experimente:".cyan());
    println!("  {} para listar usuários", "access-warden list".yellow());
    println!("  {} para uma varredura única", "access-warden sweep".yellow());
    println!("  {} para o serviço periódico", "access-warden auto".yellow());
    Ok(())
}
