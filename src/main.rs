use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};

use plugbot::application::events::{EventLog, HostEvent};
use plugbot::application::messaging::{CommandRouter, RouterFlow, UpdateDispatcher, UpdatePoller};
use plugbot::application::services::CommandAggregator;
use plugbot::domain::traits::{LogSink, PlatformClient};
use plugbot::infrastructure::adapters::console::ConsoleInput;
use plugbot::infrastructure::adapters::telegram::TelegramAdapter;
use plugbot::infrastructure::config::Config;
use plugbot::infrastructure::logging::TracingSink;
use plugbot::infrastructure::plugins::loader::DylibLoader;
use plugbot::infrastructure::plugins::registry::PluginRegistry;
use plugbot::plugins::handle::HostServices;
use plugbot::plugins::manager::{LifecycleManager, Loader};

#[derive(Parser)]
#[command(name = "plugbot")]
#[command(about = "A plugin-hosting Telegram bot", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, default_value = "config.yaml")]
    config: String,

    /// Bot token (overrides config)
    #[arg(short, long)]
    token: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the host
    Run,
    /// Show version
    Version,
    /// Generate default config
    InitConfig,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run => {
            run_host(cli.config, cli.token);
        }
        Commands::Version => {
            println!("plugbot v{}", env!("CARGO_PKG_VERSION"));
        }
        Commands::InitConfig => {
            init_config();
        }
    }
}

fn run_host(config_path: String, token_override: Option<String>) {
    let config = if Path::new(&config_path).exists() {
        match Config::load(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("failed to load config: {e}");
                std::process::exit(1);
            }
        }
    } else {
        tracing::warn!("'{config_path}' not found, using defaults");
        Config::default()
    };

    let Some(token) = token_override.or_else(|| config.bot.token.clone()) else {
        tracing::error!("no bot token: set 'bot.token' in {config_path} or pass --token");
        std::process::exit(1);
    };

    tracing::info!("starting {}", config.bot.name);

    let rt = tokio::runtime::Runtime::new().unwrap();
    rt.block_on(run(config, token));
}

async fn run(config: Config, token: String) {
    let sinks: Vec<Arc<dyn LogSink>> = vec![Arc::new(TracingSink)];
    let events = Arc::new(EventLog::new(sinks));

    let adapter = TelegramAdapter::new(token, Some(&config.bot.api_url));
    match adapter.me().await {
        Ok(me) => events.log(&HostEvent::BotStart {
            username: me.username,
        }),
        Err(e) => {
            tracing::error!("cannot reach platform: {e}");
            return;
        }
    }
    let platform: Arc<dyn PlatformClient> = Arc::new(adapter);

    let (mut console, console_tx) = ConsoleInput::spawn(config.console.queue_capacity);
    let registry = Arc::new(PluginRegistry::new());
    let commands_sync = Arc::new(CommandAggregator::new(
        registry.clone(),
        platform.clone(),
        events.clone(),
    ));
    let services = HostServices {
        events: events.clone(),
        platform: platform.clone(),
        commands_sync: commands_sync.clone(),
        console_tx,
    };
    let loader: Arc<dyn Loader> = Arc::new(DylibLoader::new(
        config.plugins.directory.clone(),
        config.plugins.allow_unversioned,
        services,
    ));
    let lifecycle = Arc::new(LifecycleManager::new(
        registry.clone(),
        loader.clone(),
        commands_sync.clone(),
        events.clone(),
    ));
    let dispatcher = Arc::new(UpdateDispatcher::new(registry.clone(), events.clone()));
    let router = CommandRouter::new(
        registry.clone(),
        lifecycle.clone(),
        loader.clone(),
        events.clone(),
    );

    if config.plugins.auto_enable {
        let mut locations = Vec::new();
        for name in loader.available().await {
            if let Some(location) = loader.resolve(&name).await {
                locations.push(location);
            }
        }
        let enabled = lifecycle.enable_all(locations).await;
        events.log(&HostEvent::PluginsEnabled { plugins: enabled });
    }
    commands_sync.sync().await;

    let poller = Arc::new(UpdatePoller::new(
        platform,
        dispatcher,
        events.clone(),
        Duration::from_secs(config.long_polling.timeout_seconds),
        Duration::from_millis(config.long_polling.back_off_ms),
    ));
    let poll_task = {
        let poller = poller.clone();
        tokio::spawn(async move { poller.run().await })
    };

    while let Some(line) = console.next().await {
        if router.handle(&line).await == RouterFlow::Stop {
            break;
        }
    }

    poller.stop();
    let _ = poll_task.await;
    lifecycle.shutdown().await;
    events.log(&HostEvent::BotStop);
}

fn init_config() {
    let config = Config::default();
    println!("{}", config.to_yaml());
    println!("\nSave this to config.yaml and adjust as needed.");
}
