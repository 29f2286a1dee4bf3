use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use utm_beacon::model::{Event, Page, Session, Visitor};
use utm_beacon::persist::{JsonFileStore, PersistStore};
use utm_beacon::request::{self, Request};
use utm_beacon::{Config, Result, Tracker};

/// Send (or print) a Google Analytics `__utm.gif` beacon.
#[derive(Parser)]
#[command(name = "utm-beacon", version)]
struct Cli {
    /// Property id, `UA-XXXXXXX-Y`
    #[arg(long)]
    account: String,

    /// Tracked host name
    #[arg(long)]
    domain: String,

    /// Collector URL, e.g. `http://localhost:8080/__utm.gif`
    #[arg(long)]
    endpoint: Option<String>,

    /// JSON config file; `--endpoint` overrides its endpoint
    #[arg(long)]
    config: Option<PathBuf>,

    /// Visitor/session state file, created if missing
    #[arg(long)]
    state: Option<PathBuf>,

    #[arg(long)]
    user_agent: Option<String>,

    /// e.g. `en-US`
    #[arg(long)]
    locale: Option<String>,

    /// Deliver the beacon instead of printing it
    #[arg(long)]
    send: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    Pageview {
        #[arg(long)]
        path: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        referrer: Option<String>,
    },
    Event {
        #[arg(long)]
        category: String,
        #[arg(long)]
        action: String,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        value: Option<i64>,
    },
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json(&std::fs::read_to_string(path)?)?,
        None => Config::default(),
    };
    if let Some(endpoint) = &cli.endpoint {
        config = config.with_endpoint(endpoint)?;
    }
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let tracker = Tracker::new(&cli.account, &cli.domain, load_config(&cli)?)?;

    let store = cli.state.as_ref().map(JsonFileStore::new);
    let (mut visitor, mut session) = match &store {
        Some(store) => store.load()?,
        None => (Visitor::new(), Session::new()),
    };
    if let Some(ua) = &cli.user_agent {
        visitor.user_agent = Some(ua.clone());
    }
    if let Some(locale) = &cli.locale {
        visitor.locale = Some(locale.clone());
    }

    match &cli.command {
        Command::Pageview {
            path,
            title,
            referrer,
        } => {
            let mut page = Page::new(path.as_str());
            page.title = title.clone();
            page.referrer = referrer.clone();

            if cli.send {
                tracker.track_pageview(&page, &mut session, &mut visitor)?;
            } else {
                print_request(&request::build_pageview(&tracker, &page, &mut session, &mut visitor)?);
            }
        }
        Command::Event {
            category,
            action,
            label,
            value,
        } => {
            let mut event = Event::new(category.as_str(), action.as_str());
            event.label = label.clone();
            event.value = *value;

            if cli.send {
                tracker.track_event(&event, &mut session, &mut visitor)?;
            } else {
                print_request(&request::build_event(&tracker, &event, &mut session, &mut visitor)?);
            }
        }
    }

    if let Some(store) = &store {
        store.save(&visitor, &session)?;
    }
    Ok(())
}

fn print_request(request: &Request) {
    print!("{}", request);
}

fn main() -> ExitCode {
    env_logger::init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("utm-beacon: {}", e);
            ExitCode::FAILURE
        }
    }
}
