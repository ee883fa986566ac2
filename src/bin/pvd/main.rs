use pv_keeper::{
    app::{AppData, RuntimeData},
    browser::KeyBrowser,
    config::Config,
    counter::VisitCounter,
    health,
    pagekey::KeyCodec,
    server,
};
use redis::aio::ConnectionManager;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = Config::load().expect("fail to load config");
    init_tracing(&config.log_level);

    let store = prepare_store(&config.redis_addr).await;
    let data = prepare_app_data(store, &config);

    health::spawn_healthcheck_listener(config.health_check_port);

    server::serve(&config.listen_addr, data)
        .await
        .expect("fail to run the visit counter server");
}

fn init_tracing(level: &str) {
    let level = level.parse().unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt().with_max_level(level).init();
}

async fn prepare_store(addr: &str) -> ConnectionManager {
    let client = redis::Client::open(addr).expect("fail to open redis client");
    ConnectionManager::new(client)
        .await
        .unwrap_or_else(|err| panic!("fail to connect to redis at {addr}: {err}"))
}

fn prepare_app_data(store: ConnectionManager, config: &Config) -> AppData<ConnectionManager> {
    let codec = KeyCodec::new();
    let data = RuntimeData::builder()
        .counter(VisitCounter::new(store.clone(), codec))
        .browser(KeyBrowser::new(store, codec))
        .allowed_origin(config.allowed_origin.clone())
        .dashboard_token(config.dashboard_token.clone())
        .build();

    data.into()
}
