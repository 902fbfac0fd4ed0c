use supply_chain_service::{config::SimulatorConfig, init_tracing, simulator::Simulator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    init_tracing("info,supply_chain_service=debug");

    let config = SimulatorConfig::from_env()?;
    Simulator::new(config)?.run().await
}
