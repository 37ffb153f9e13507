use tracing::{Instrument, trace_span};
use tracing_subscriber::{
    EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use pgcopy::Result;

mod roundtrip;
mod streaming;
mod from_row;
mod file;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::Registry::default()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    roundtrip::main().instrument(trace_span!("roundtrip")).await?;
    streaming::main().instrument(trace_span!("streaming")).await?;
    from_row::main().instrument(trace_span!("from_row")).await?;

    file::main().instrument(trace_span!("file")).await?;

    Ok(())
}
