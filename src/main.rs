use env_logger::Env;
use snowglobe::DioramaConfig;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let mut config = DioramaConfig::from_env();
    if let Some(model) = std::env::args().nth(1) {
        config = config.with_model_path(model);
    }

    log::info!("Loading diorama from {}", config.source.model_path.display());
    snowglobe::run(config)
}
