use anchored_amm::{
    curve::BondingCurve,
    math::BisectionSolver,
    sequencer::Sequencer,
    sync::{JsonFileStore, PoolStore, SharedPool},
    types::{EventRecord, PoolState, PoolSummary, Result},
    utils::{config::Config, logger::init},
};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let config_path = std::env::args().nth(1);
    let config = Config::load(config_path.as_deref())?;
    init(&config.logging_config().level);
    info!("Starting anchored AMM replay");

    config.validate()?;

    let math = config.math()?;
    let params = config.curve_config().to_parameters(&math)?;
    let solver = BisectionSolver::from_config(&math, config.solver_config())?;
    let sequencer = Sequencer::new(BondingCurve::new(math.clone(), solver), params)?;

    let replay = config.replay_config();
    let store = JsonFileStore::new(&replay.state_path);
    let state = match store.load().await? {
        Some(state) => state,
        None => {
            info!("Starting from an empty {} pool", config.pool_config().asset_pair()?);
            PoolState::new(config.pool_config().asset_pair()?)
        }
    };

    let content = tokio::fs::read_to_string(&replay.events_path).await?;
    let events = EventRecord::parse_log(&content, &math)?;
    info!("Loaded {} events from {}", events.len(), replay.events_path);

    let pool = SharedPool::new(state, sequencer);
    if replay.stop_on_error {
        if let Err(e) = pool.apply_batch(&events).await {
            error!("Replay aborted: {}", e);
            return Err(e);
        }
    } else {
        let report = pool.replay(&events).await;
        for rejection in &report.rejected {
            warn!("Event #{} skipped: {}", rejection.index, rejection.error.user_message());
        }
        info!("Replay stats: {}", serde_json::to_string(&report.stats())?);
    }

    let final_state = pool.snapshot().await;
    store.save(&final_state).await?;

    let summary = PoolSummary::from_state(&final_state, &math)?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
