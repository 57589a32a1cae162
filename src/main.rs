use clap::{Arg, ArgAction, Command};
use cmd_sage::clipboard::SystemClipboard;
use cmd_sage::config::Config;
use cmd_sage::context::SystemContext;
use cmd_sage::credentials::Credentials;
use cmd_sage::error::SageError;
use cmd_sage::executor::ShellExecutor;
use cmd_sage::highlight::{Highlighter, Language, PlainHighlighter, SyntectHighlighter};
use cmd_sage::prompt::{ActionPrompt, StdioPrompter};
use cmd_sage::providers::Provider;
use cmd_sage::renderer::StreamRenderer;
use cmd_sage::suggester::{LlmSuggester, MockSuggester, Suggester, Target};
use cmd_sage::suggestion_loop::{Highlighters, LoopConfig, LoopOutcome, SuggestionLoop};
use cmd_sage::terminal::CrosstermTerminal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Conventional exit status for a process stopped by SIGINT.
const INTERRUPTED_EXIT_CODE: i32 = 130;

fn cli() -> Command {
    Command::new("cmd-sage")
        .about("Turn plain-language requests into shell and git commands")
        .long_about(
            "cmd-sage asks a language model for a command, shows it as it streams in, \
             and lets you run, revise, explain, copy or cancel it",
        )
        .arg(
            Arg::new("prompt")
                .help("What you want to do, in your own words")
                .num_args(1..),
        )
        .arg(
            Arg::new("target")
                .short('t')
                .long("target")
                .help("Kind of command to suggest")
                .value_parser(["shell", "git"])
                .default_value("shell"),
        )
        .arg(
            Arg::new("default-action")
                .long("default-action")
                .help("Apply this action every round instead of asking (run, revise, explain, copy, cancel)")
                .value_name("ACTION"),
        )
        .arg(
            Arg::new("no-highlight")
                .long("no-highlight")
                .help("Print suggestions without syntax highlighting")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("set-api-key")
                .long("set-api-key")
                .help("Store an API key for a provider")
                .value_name("API_KEY")
                .num_args(1),
        )
        .arg(
            Arg::new("provider")
                .long("provider")
                .help("Provider the API key belongs to (defaults to the configured provider)")
                .value_parser(Provider::ALL.map(|p| p.id()))
                .requires("set-api-key"),
        )
        .arg(
            Arg::new("model")
                .long("model")
                .help("Model to use with the provider, saved alongside it")
                .value_name("MODEL")
                .requires("set-api-key"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .help("Show configuration information")
                .action(ArgAction::SetTrue),
        )
}

fn build_highlighters(config: &Config) -> Result<Highlighters, SageError> {
    if !config.highlight {
        return Ok(Highlighters {
            command: Box::new(PlainHighlighter),
            explanation: Box::new(PlainHighlighter),
        });
    }
    let syntect = |language| -> Result<Box<dyn Highlighter>, SageError> {
        SyntectHighlighter::new(language, config.theme())
            .map(|h| Box::new(h) as Box<dyn Highlighter>)
            .map_err(|e| SageError::Configuration(e.to_string()))
    };
    Ok(Highlighters {
        command: syntect(Language::Shell)?,
        explanation: syntect(Language::Markdown)?,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();

    // Handle configuration commands
    if let Some(api_key) = matches.get_one::<String>("set-api-key") {
        let chosen = matches
            .get_one::<String>("provider")
            .map(|id| id.parse::<Provider>())
            .transpose()?;
        let model = matches.get_one::<String>("model").map(String::as_str);
        let provider = match chosen {
            Some(provider) => provider,
            None => Config::load()?.provider()?,
        };

        let mut credentials = Credentials::load()?;
        credentials.set_api_key(provider, api_key.clone());
        credentials.save()?;
        println!("✅ API key for {} saved successfully", provider);

        if chosen.is_some() || model.is_some() {
            let config = Config::remember_provider(provider, model)?;
            println!("✅ Now using {} with model {}", config.provider, config.model);
        }
        return Ok(());
    }

    if matches.get_flag("config") {
        Config::show_config_info()?;
        return Ok(());
    }

    let mut config = Config::load()?;
    if matches.get_flag("no-highlight") {
        config.highlight = false;
    }

    let target = matches
        .get_one::<String>("target")
        .map(String::as_str)
        .unwrap_or("shell")
        .parse::<Target>()?;
    let loop_config = LoopConfig::from_config(
        &config,
        target,
        matches.get_one::<String>("default-action").map(String::as_str),
    )?;

    let words: Vec<String> = matches
        .get_many::<String>("prompt")
        .unwrap_or_default()
        .cloned()
        .collect();
    let prompt = if words.is_empty() {
        ActionPrompt::new().prompt_for_request(target)?
    } else {
        words.join(" ")
    };
    info!("Processing request: {}", prompt);

    let context = SystemContext::gather();
    let suggester: Box<dyn Suggester> = if config.is_mock_mode() {
        info!("Mock mode enabled, no provider will be contacted");
        Box::new(MockSuggester::new())
    } else {
        let credentials = Credentials::load()?;
        Box::new(LlmSuggester::from_config(&config, &credentials, context.clone())?)
    };

    let mut sage = SuggestionLoop::new(
        loop_config,
        suggester,
        StreamRenderer::new(CrosstermTerminal::new()),
        build_highlighters(&config)?,
        Box::new(StdioPrompter::new()),
        Box::new(SystemClipboard::new()),
        ShellExecutor::new(context.shell.clone()),
    );

    let interrupt = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Could not listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };
    let report = sage.run(&prompt, interrupt).await?;
    info!(
        "Finished after {} round(s) with {:?}",
        report.rounds, report.outcome
    );

    match report.outcome {
        LoopOutcome::Executed(exit) if !exit.success => std::process::exit(exit.code.unwrap_or(1)),
        LoopOutcome::RunFailed(_) | LoopOutcome::NoSuggestion => std::process::exit(1),
        LoopOutcome::Interrupted => {
            eprintln!("\nOperation cancelled by user.");
            std::process::exit(INTERRUPTED_EXIT_CODE);
        }
        _ => Ok(()),
    }
}
