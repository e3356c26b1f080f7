use actix_cors::Cors;
use actix_web::http::header;
use actix_web::middleware::{DefaultHeaders, Logger};
use actix_web::{web, App, HttpServer};
use log::{info, warn};

use credit_scoring::config::ServerConfig;
use credit_scoring::{load_model, routes, ScoringService};

fn build_cors(origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "HEAD", "POST"])
        .allowed_header(header::CONTENT_TYPE)
        .max_age(3600);

    if origins.iter().any(|origin| origin == "*") {
        return cors.allow_any_origin();
    }
    origins
        .iter()
        .fold(cors, |cors, origin| cors.allowed_origin(origin))
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .format_module_path(false)
        .init();

    info!("🚀 Starting credit scoring API");

    let config = ServerConfig::from_env()?;

    let model = load_model(&config.model_path, config.model_output);
    if model.is_loaded() {
        info!("✅ Model ready");
    } else {
        warn!("⚠️ Serving without a model: /predict will answer 503");
    }

    let service = ScoringService::new(model, config.threshold).with_artifact(
        config.model_path.display().to_string(),
        config.model_output,
    );
    let service_data = web::Data::new(service);

    let bind_address = config.bind_address();
    let json_limit = config.json_limit;
    let cors_origins = config.cors_origins.clone();

    info!("🌐 Listening on http://{}", bind_address);
    info!("👷 Workers: {}", config.workers);
    info!("🎯 Business threshold: {}", config.threshold.value());
    info!("🔧 Endpoints:");
    info!("   GET|HEAD /            - Health check");
    info!("   GET      /model-info  - Model and schema");
    info!("   POST     /predict     - Score one application");

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(DefaultHeaders::new().add(("X-Content-Type-Options", "nosniff")))
            .wrap(build_cors(&cors_origins))
            .app_data(service_data.clone())
            .app_data(routes::json_config(json_limit))
            .configure(routes::configure)
            .default_service(web::route().to(routes::not_found))
    })
    .workers(config.workers)
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
