use std::env;
use std::process;
use std::str::FromStr;

use tracing::info;

use invest_advisor::config::AppConfig;
use invest_advisor::data::store::AnalysisStore;
use invest_advisor::events::Event;
use invest_advisor::llm::{LlmClient, LlmQueue};
use invest_advisor::models::{
    AnalysisRequest, AnalystKind, DecisionSummary, Market, WatchlistEntry,
};
use invest_advisor::pipeline::AnalysisPipeline;
use invest_advisor::EventBus;

fn usage() -> ! {
    eprintln!(
        "Usage: invest_advisor <symbol> [--market TW|US|HK|AUTO] [--depth 1-5] \
         [--agents technical,fundamental,news,sentiment] [--date YYYY-MM-DD] [--watch]"
    );
    process::exit(1);
}

fn parse_request(args: &[String]) -> Result<(AnalysisRequest, bool), String> {
    let mut symbol: Option<String> = None;
    let mut market = Market::Auto;
    let mut depth: u8 = 3;
    let mut date = chrono::Local::now().format("%Y-%m-%d").to_string();
    let mut selected_agents = AnalystKind::all().to_vec();
    let mut watch = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--market" => {
                let value = iter.next().ok_or("--market needs a value")?;
                market = Market::from_str(value)?;
            }
            "--depth" => {
                let value = iter.next().ok_or("--depth needs a value")?;
                depth = value.parse::<u8>().map_err(|_| "depth must be 1-5")?;
                if !(1..=5).contains(&depth) {
                    return Err("depth must be 1-5".to_string());
                }
            }
            "--agents" => {
                let value = iter.next().ok_or("--agents needs a value")?;
                selected_agents = value
                    .split(',')
                    .map(|name| AnalystKind::from_str(name.trim()))
                    .collect::<Result<Vec<_>, _>>()?;
            }
            "--date" => {
                date = iter.next().ok_or("--date needs a value")?.clone();
            }
            "--watch" => {
                watch = true;
            }
            other if other.starts_with("--") => {
                return Err(format!("unknown flag: {}", other));
            }
            other => {
                symbol = Some(other.trim().to_uppercase());
            }
        }
    }

    let request = AnalysisRequest {
        market,
        symbol: symbol.ok_or("a stock symbol is required")?,
        date,
        depth,
        selected_agents,
    };
    Ok((request, watch))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Setup Logging
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() {
        usage();
    }
    let (request, watch) = match parse_request(&args) {
        Ok(parsed) => parsed,
        Err(message) => {
            eprintln!("Error: {}", message);
            usage();
        }
    };

    info!("Starting invest_advisor...");

    let config = AppConfig::load()?;
    info!("Using LLM Model: {}", config.llm.model);

    let llm_client = LlmClient::new(
        config.resolve_api_key(),
        config.llm.base_url.clone(),
        config.llm.model.clone(),
    );
    let llm = LlmQueue::new(llm_client, config.llm.max_concurrent, config.llm.queue_size);
    let store = AnalysisStore::new(&config.store.data_dir, config.store.history_limit);
    let bus = EventBus::new(64);

    // Progress display: mirror bus events into the log
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = rx.recv().await {
            if let Event::Progress(update) = event {
                info!("➡️  [{:>3.0}%] {}", update.percent, update.step);
            }
        }
    });

    let pipeline = AnalysisPipeline::new(llm, store.clone(), bus.clone(), &config.pipeline);
    let record = pipeline.run(request).await?;

    println!();
    println!("====== {} {} ======", record.market, record.symbol);
    println!(
        "AI 評分: {:.1}/10 ({})",
        record.ai_score.overall,
        record.ai_score.label()
    );
    println!(
        "  技術面 {:.1} | 基本面 {:.1} | 情緒面 {:.1}",
        record.ai_score.technical, record.ai_score.fundamental, record.ai_score.sentiment
    );

    // Best-effort structured summary; the raw text below is the source of truth
    match DecisionSummary::parse(&record.decision) {
        Some(summary) => {
            println!("建議: {}", summary.recommendation);
            if let Some(confidence) = summary.confidence {
                println!("信心度: {:.0}%", confidence);
            }
            if let Some(target_price) = summary.target_price {
                println!("目標價: {}", target_price);
            }
        }
        None => println!("建議: {}", record.recommendation()),
    }
    println!();
    println!("{}", record.decision);

    if watch && store.add_to_watchlist(WatchlistEntry::from_record(&record)) {
        info!("{} added to the watchlist", record.symbol);
    }

    let stats = store.stats();
    info!(
        "History: {} records ({} buy / {} sell signals), watchlist: {}",
        stats.analysis_count, stats.buy_signals, stats.sell_signals, stats.watchlist_count
    );

    Ok(())
}
