//! Windward CLI - conversational flight search at the terminal.
//!
//! Free-text turns collect trip parameters; `search`, `select N [M ...]`,
//! `book N`, and `new` drive the search/selection/booking flow; `quit` or
//! `exit` ends the session. Only configuration problems abort the process.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use windward::adapters::ai::{OpenAiConfig, OpenAiProvider};
use windward::adapters::flights::{SerpApiConfig, SerpApiProvider};
use windward::application::{BookingSession, SessionError};
use windward::config::AppConfig;
use windward::domain::conversation::DialoguePhase;
use windward::domain::search::RoundTripPair;
use windward::ports::{AiProvider, FlightProvider};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("windward=info")),
        )
        .init();

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Failed to load configuration: {err}");
            std::process::exit(1);
        }
    };
    if let Err(err) = config.validate() {
        eprintln!("Invalid configuration: {err}");
        std::process::exit(1);
    }

    let ai = Arc::new(OpenAiProvider::new(
        OpenAiConfig::new(config.ai.openai_api_key.clone().unwrap_or_default())
            .with_model(config.ai.model.clone())
            .with_timeout(config.ai.timeout())
            .with_max_retries(config.ai.max_retries),
    ));
    let flights = Arc::new(SerpApiProvider::new(
        SerpApiConfig::new(config.flights.serpapi_api_key.clone().unwrap_or_default())
            .with_base_url(config.flights.base_url.clone())
            .with_timeout(config.flights.timeout()),
    ));

    let mut session = BookingSession::new(ai, flights, &config);
    println!("{}", session.greeting());

    run(&mut session).await;
}

async fn run<A, F>(session: &mut BookingSession<A, F>)
where
    A: AiProvider + ?Sized,
    F: FlightProvider + ?Sized,
{
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let Ok(Some(line)) = lines.next_line().await else {
            break;
        };
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        match parse_command(input) {
            Command::Search => match session.start_search().await {
                Ok(results) => {
                    println!("Available flights:");
                    print_pairs(results);
                    println!("Pick one with 'select N', or keep chatting to refine.");
                }
                Err(err) => print_error(err),
            },
            Command::Select(indices) => match session.select(&indices).await {
                Ok(pairs) => {
                    println!("Selected itineraries:");
                    print_pairs(pairs);
                    println!("Book one with 'book N'.");
                }
                Err(err) => print_error(err),
            },
            Command::Book(index) => match session.book(index).await {
                Ok(reference) => {
                    println!("Booking ready with {}: {}", reference.vendor, reference.url);
                }
                Err(err) => print_error(err),
            },
            Command::New => {
                session.reset();
                println!("Starting over. {}", session.greeting());
            }
            Command::Turn => match session.handle_turn(input).await {
                Ok(reply) => {
                    println!("{}", reply.message);
                    if reply.accepted {
                        if let Ok(snapshot) =
                            serde_json::to_string_pretty(&session.request().snapshot())
                        {
                            println!("{snapshot}");
                        }
                    }
                    if session.phase() == DialoguePhase::Exited {
                        break;
                    }
                }
                Err(SessionError::Ended) => break,
                Err(err) => print_error(err),
            },
        }
    }
}

enum Command {
    Search,
    Select(Vec<usize>),
    Book(usize),
    New,
    Turn,
}

/// Structured commands win over conversational turns; anything that does
/// not parse cleanly is treated as free text for the model.
fn parse_command(input: &str) -> Command {
    let lowered = input.to_lowercase();
    if lowered == "search" {
        return Command::Search;
    }
    if lowered == "new" {
        return Command::New;
    }
    if let Some(rest) = lowered.strip_prefix("select ") {
        if let Some(indices) = parse_indices(rest) {
            return Command::Select(indices);
        }
    }
    if let Some(rest) = lowered.strip_prefix("book ") {
        if let Some(indices) = parse_indices(rest) {
            if indices.len() == 1 {
                return Command::Book(indices[0]);
            }
        }
    }
    Command::Turn
}

/// One-based on screen, zero-based inside.
fn parse_indices(rest: &str) -> Option<Vec<usize>> {
    let indices: Option<Vec<usize>> = rest
        .split_whitespace()
        .map(|part| part.parse::<usize>().ok().filter(|n| *n > 0).map(|n| n - 1))
        .collect();
    indices.filter(|list| !list.is_empty())
}

fn print_pairs(pairs: &[RoundTripPair]) {
    for (position, pair) in pairs.iter().enumerate() {
        let mut line = format!(
            "  {}. {} | {} | {} | {}",
            position + 1,
            pair.outbound.legs.first().map_or("", |leg| leg.carrier.as_str()),
            pair.outbound.route(),
            format_duration(pair.outbound.duration_minutes),
            format_price(pair.total_price_minor),
        );
        if let Some(return_offer) = &pair.return_offer {
            line.push_str(&format!(
                " (return {} {})",
                return_offer.route(),
                format_duration(return_offer.duration_minutes)
            ));
        }
        println!("{line}");
        for layover in &pair.outbound.layovers {
            println!(
                "     layover at {} ({})",
                layover.airport,
                format_duration(layover.duration_minutes)
            );
        }
    }
}

fn format_price(minor: u32) -> String {
    format!("${}.{:02}", minor / 100, minor % 100)
}

fn format_duration(minutes: u32) -> String {
    format!("{}h{:02}m", minutes / 60, minutes % 60)
}

fn print_error(err: SessionError) {
    match err {
        SessionError::NoFlightsFound => {
            println!("No flights found for these parameters. Let's adjust the trip details.");
        }
        SessionError::NoResults => {
            println!("There are no search results yet. Say 'search' once the trip is complete.");
        }
        SessionError::UnknownOffer { index } => {
            println!("There is no offer number {}.", index + 1);
        }
        SessionError::Ended => {
            println!("This session has ended. Restart to plan another trip.");
        }
        other => println!("{other} - you can retry, or refine the trip and search again."),
    }
}
