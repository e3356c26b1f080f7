use std::time::Instant;

use actix_web::{web, HttpResponse, Responder};
use log::{debug, error, info, warn};

use crate::error::{json_error_handler, ScoringError};
use crate::models::{CreditApplication, ErrorBody};
use crate::service::ScoringService;

// Always 200, whatever the model state: hosting platforms probe this route.
async fn health(service: web::Data<ScoringService>) -> impl Responder {
    HttpResponse::Ok().json(service.health())
}

async fn health_probe() -> impl Responder {
    HttpResponse::Ok().finish()
}

async fn model_info(service: web::Data<ScoringService>) -> impl Responder {
    HttpResponse::Ok().json(service.model_info())
}

async fn predict(
    service: web::Data<ScoringService>,
    req: web::Json<CreditApplication>,
) -> Result<HttpResponse, ScoringError> {
    let start_time = Instant::now();
    info!("New prediction request");

    let application = req.into_inner();
    let service = service.into_inner();

    // Model execution goes to the blocking pool; a panic there comes back as
    // a BlockingError instead of taking the worker down.
    let outcome = web::block(move || service.score(&application))
        .await
        .map_err(|e| {
            error!("Scoring worker failed: {}", e);
            ScoringError::invocation(format!("scoring worker failed: {}", e))
        })?;

    debug!("Prediction handled in {} ms", start_time.elapsed().as_millis());

    match outcome {
        Ok(result) => Ok(HttpResponse::Ok().json(result)),
        Err(e) if e.is_client_error() => {
            warn!("Validation failed: {}", e);
            Err(e)
        }
        Err(e) => {
            error!("Prediction failed: {}", e);
            Err(e)
        }
    }
}

pub async fn not_found() -> impl Responder {
    HttpResponse::NotFound().json(ErrorBody::new("not_found", "endpoint not found"))
}

pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(json_error_handler)
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/")
            .route(web::get().to(health))
            .route(web::head().to(health_probe)),
    )
    .route("/model-info", web::get().to(model_info))
    .route("/predict", web::post().to(predict));
}
