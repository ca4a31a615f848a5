use imgweave::{plan, Config, OperationRegistry, RasterBackend, SettingsRegistry, Surface};
use std::env;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn main() -> ExitCode {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);

    let args: Vec<String> = env::args().collect();
    if args.len() != 4 {
        eprintln!("usage: imgweave <directive> <input> <output>");
        return ExitCode::FAILURE;
    }
    let directive = &args[1];
    let input = &args[2];
    let output = &args[3];

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!("failed to load config: {}", err);
            return ExitCode::FAILURE;
        }
    };
    let settings = SettingsRegistry::new(&config);
    let registry = match OperationRegistry::build(&config, &settings) {
        Ok(registry) => registry,
        Err(err) => {
            error!("failed to build operation registry: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let pipeline = match plan(directive, &registry, &settings, config.only_presets) {
        Ok(pipeline) => pipeline,
        Err(err) => {
            error!("failed to plan pipeline: {}", err);
            return ExitCode::FAILURE;
        }
    };

    let decoded = match image::open(input) {
        Ok(decoded) => decoded.to_rgba8(),
        Err(err) => {
            error!("failed to read {}: {}", input, err);
            return ExitCode::FAILURE;
        }
    };
    info!(
        "processing {} ({}x{}) with {} operation(s)",
        input,
        decoded.width(),
        decoded.height(),
        pipeline.steps().len()
    );

    let result = pipeline.execute(Surface::from_image(decoded), &RasterBackend);

    if let Err(err) = result.image().save(output) {
        error!("failed to write {}: {}", output, err);
        return ExitCode::FAILURE;
    }
    info!("wrote {} ({}x{})", output, result.width(), result.height());
    ExitCode::SUCCESS
}
