use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use eyre::{Result, WrapErr, bail};
use log::{debug, info};
use tokio::io::{AsyncBufReadExt, BufReader};

mod cli;

use cli::{Cli, Command, KeyAction, Picks};
use ytgist::config::Config;
use ytgist::gemini::GeminiClient;
use ytgist::host::{HostEnvironment, TerminalHost, VideoWatcher};
use ytgist::prompt::{LANGUAGES, Model, SummaryLength, is_known_language};
use ytgist::reduce::{reduce_plain, render_transcript};
use ytgist::session::{Services, Session, SessionOptions};
use ytgist::store::{FileStorage, Preferences};
use ytgist::timestamp::{link_timestamps, parse_timestamp_to_seconds};
use ytgist::youtube::YoutubeCaptions;

const API_KEY_ENV: &str = "GEMINI_API_KEY";

fn setup_logging() -> Result<()> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;
    let log_file = log_dir.join("ytgist.log");

    let target = Box::new(std::fs::OpenOptions::new().create(true).append(true).open(&log_file)?);

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized: {}", log_file.display());
    Ok(())
}

fn log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("ytgist")
        .join("logs")
}

fn build_after_help(config: &Config) -> String {
    format!(
        "\nAPI key: stored via `ytgist key set`, or {API_KEY_ENV} for a single run\n\n\
         Config: {}\nStorage: {}\nLogs are written to: {}",
        ytgist::config::config_path().display(),
        config.storage_path().display(),
        log_dir().join("ytgist.log").display()
    )
}

fn watch_url(input: &str) -> Result<String> {
    let video_id = ytgist::extract_video_id(input).ok_or_else(|| {
        eyre::eyre!(
            "could not extract video ID from: {input}\n\nSupported formats:\n  \
             https://www.youtube.com/watch?v=ID\n  https://youtu.be/ID\n  \
             https://www.youtube.com/embed/ID\n  https://www.youtube.com/shorts/ID\n  \
             <11-character video ID>"
        )
    })?;
    Ok(format!("https://www.youtube.com/watch?v={video_id}"))
}

/// Overlay command-line picks onto the session's preferences.
fn picked(base: &Preferences, picks: &Picks, length: Option<&str>) -> Result<Preferences> {
    let mut prefs = base.clone();
    if let Some(lang) = &picks.lang {
        if !is_known_language(lang) {
            bail!("unknown language code: {lang} (see `ytgist prefs --list`)");
        }
        prefs.language = lang.clone();
    }
    if let Some(model) = &picks.model {
        prefs.model = model.parse::<Model>().map_err(|e| eyre::eyre!(e))?;
    }
    if let Some(length) = length {
        prefs.length = length.parse::<SummaryLength>().map_err(|e| eyre::eyre!(e))?;
    }
    Ok(prefs)
}

fn print_catalogs() {
    println!("Languages:");
    for (code, label) in LANGUAGES {
        println!("  {code:<4} {label}");
    }
    println!("\nModels:");
    for model in Model::ALL {
        println!("  {:<24} {} - {}", model.value(), model.label(), model.description());
    }
    println!("\nLengths:");
    for length in SummaryLength::ALL {
        println!("  {:<8} {}", length.value(), length.label());
    }
}

fn prompt_line() -> Result<()> {
    print!("> ");
    std::io::stdout().flush()?;
    Ok(())
}

async fn run_chat(session: &mut Session, host: Arc<TerminalHost>, config: &Config) -> Result<()> {
    session.open_chat().await?;
    eprintln!(
        "Chatting about {} ({} segments). Commands: /seek <mm:ss>, /open <url>, /quit",
        session.current_video_id().unwrap_or_default(),
        session.transcript_segments().len()
    );

    let mut changes = VideoWatcher::spawn(host.clone(), config.poll_interval());
    // the first report is the video we started on
    changes.recv().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt_line()?;

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let line = line.trim();

                if line == "/quit" {
                    break;
                } else if let Some(ts) = line.strip_prefix("/seek ") {
                    match parse_timestamp_to_seconds(ts) {
                        Some(offset) => {
                            match session.seek(offset as f64) {
                                Ok(()) => println!("{}", host.last_seek().unwrap_or_default()),
                                Err(e) => eprintln!("Error: {e}"),
                            }
                        }
                        None => eprintln!("not a timestamp: {ts}"),
                    }
                } else if let Some(url) = line.strip_prefix("/open ") {
                    match watch_url(url) {
                        Ok(url) => host.navigate(url),
                        Err(e) => eprintln!("{e}"),
                    }
                } else {
                    match session.send_chat_message(line).await {
                        Ok(Some(reply)) => {
                            let video_id = session.current_video_id().unwrap_or_default();
                            println!("{}\n", link_timestamps(&reply, &video_id));
                        }
                        Ok(None) => {}
                        Err(e) => eprintln!("Error: {e}"),
                    }
                }
                prompt_line()?;
            }
            Some(change) = changes.recv() => {
                session.on_video_changed(change.as_deref());
                eprintln!("\nVideo changed; conversation cleared.");
                if change.is_some()
                    && let Err(e) = session.open_chat().await
                {
                    eprintln!("Error: {e}");
                }
                prompt_line()?;
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    setup_logging()?;

    // Load config file (non-fatal if missing/invalid)
    let config = Config::load().unwrap_or_default();

    let after_help = build_after_help(&config);
    let cmd = <Cli as clap::CommandFactory>::command().after_help(after_help);
    let matches = cmd.get_matches();
    let cli = <Cli as clap::FromArgMatches>::from_arg_matches(&matches)?;

    let page_url = match &cli.command {
        Command::Summary { url, .. } | Command::Transcript { url, .. } | Command::Chat { url, .. } => {
            Some(watch_url(url)?)
        }
        Command::Key { .. } | Command::Prefs { .. } => None,
    };

    let client = reqwest::Client::new();
    let host = Arc::new(page_url.map(TerminalHost::new).unwrap_or_default());
    let storage = Arc::new(FileStorage::new(config.storage_path()));
    debug!("Using storage {}", storage.path().display());

    let services = Services {
        captions: Arc::new(YoutubeCaptions::new(client.clone())),
        model: Arc::new(GeminiClient::new(client)),
        host: host.clone(),
        storage,
    };
    let options = SessionOptions {
        defaults: config.default_preferences(),
        reducer: config.reducer(),
        validation_timeout: config.validation_timeout(),
    };
    let mut session = Session::new(services, options);

    let mut key_from_env = false;
    if session.api_key().is_none()
        && let Ok(key) = std::env::var(API_KEY_ENV)
    {
        debug!("Using API key from {API_KEY_ENV}");
        session.use_unsaved_api_key(&key);
        key_from_env = session.api_key().is_some();
    }

    if cli.verbose {
        let prefs = session.preferences();
        eprintln!(
            "Video: {}\nLanguage: {}\nModel: {}\nLength: {}",
            host.current_video_id().unwrap_or_else(|| "-".to_string()),
            prefs.language,
            prefs.model,
            prefs.length
        );
    }

    match cli.command {
        Command::Summary { picks, length, .. } => {
            let prefs = picked(session.preferences(), &picks, length.as_deref())?;
            session.use_preferences(prefs);
            let summary = session.request_summary().await.wrap_err("summary failed")?;
            let video_id = session.current_video_id().unwrap_or_default();
            println!("{}", link_timestamps(&summary, &video_id));
        }
        Command::Transcript { lang, plain, .. } => {
            let picks = Picks { lang, model: None };
            let prefs = picked(session.preferences(), &picks, None)?;
            session.use_preferences(prefs);
            session.load_transcript().await.wrap_err("transcript failed")?;
            let segments = session.transcript_segments();
            if plain {
                println!("{}", reduce_plain(segments, usize::MAX));
            } else {
                println!("{}", render_transcript(segments));
            }
        }
        Command::Chat { picks, .. } => {
            let prefs = picked(session.preferences(), &picks, None)?;
            session.use_preferences(prefs);
            run_chat(&mut session, host, &config).await?;
        }
        Command::Key { action } => match action {
            KeyAction::Set { key } => {
                session.save_api_key(&key).await.wrap_err("API key not saved")?;
                println!("{}", session.key_notice().unwrap_or("API key saved."));
            }
            KeyAction::Reset => {
                session.reset_api_key()?;
                println!("API key removed.");
            }
            KeyAction::Status => match session.api_key() {
                Some(_) if key_from_env => println!("Using {API_KEY_ENV} (not stored)."),
                Some(_) => println!("API key stored."),
                None => println!("No API key. Get one at https://aistudio.google.com/app/apikey"),
            },
        },
        Command::Prefs { picks, length, list } => {
            if list {
                print_catalogs();
                return Ok(());
            }
            let prefs = picked(session.preferences(), &picks, length.as_deref())?;
            session.set_language(&prefs.language)?;
            session.set_model(prefs.model)?;
            session.set_length(prefs.length)?;
            let prefs = session.preferences();
            println!("language = {}\nmodel = {}\nlength = {}", prefs.language, prefs.model, prefs.length);
        }
    }

    Ok(())
}
