use crate::response::PredictionFailure;
use crate::service::PredictionService;
use actix_cors::Cors;
use actix_web::http::StatusCode;
use actix_web::{web, App, HttpResponse, HttpServer, Result as ActixResult};
use jurusan_core::Error;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct RestApi;

impl RestApi {
    pub async fn start(service: Arc<PredictionService>, port: u16) -> std::io::Result<()> {
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .configure(|cfg| configure(cfg, service.clone()))
        })
        .bind(("0.0.0.0", port))?
        .run()
        .await
    }
}

/// Register the prediction routes on an app.
pub fn configure(cfg: &mut web::ServiceConfig, service: Arc<PredictionService>) {
    cfg.app_data(web::Data::new(service))
        .route("/health", web::get().to(health))
        .route("/model", web::get().to(model_info))
        .route("/model/reload", web::post().to(reload_model))
        .route("/predict", web::post().to(predict));
}

/// HTTP status for a failed request
pub fn status_for(error: &Error) -> StatusCode {
    match error {
        Error::InvalidInput(_) | Error::FeatureCountMismatch { .. } => StatusCode::BAD_REQUEST,
        Error::NotTrained => StatusCode::SERVICE_UNAVAILABLE,
        Error::ModelFileNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure(error: &Error) -> HttpResponse {
    HttpResponse::build(status_for(error)).json(PredictionFailure::from(error))
}

async fn health(service: web::Data<Arc<PredictionService>>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "trained": service.is_trained(),
    })))
}

async fn model_info(service: web::Data<Arc<PredictionService>>) -> ActixResult<HttpResponse> {
    match service.info() {
        Ok(info) => Ok(HttpResponse::Ok().json(info)),
        Err(e) => Ok(failure(&e)),
    }
}

async fn reload_model(service: web::Data<Arc<PredictionService>>) -> ActixResult<HttpResponse> {
    match service.reload() {
        Ok(info) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "model": info,
        }))),
        Err(e) => {
            warn!("Model reload failed, keeping current model: {}", e);
            Ok(failure(&e))
        }
    }
}

async fn predict(service: web::Data<Arc<PredictionService>>, body: web::Bytes) -> ActixResult<HttpResponse> {
    let body: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => return Ok(failure(&Error::InvalidInput(format!("request body is not valid JSON: {}", e)))),
    };

    match service.predict(body) {
        Ok(success) => {
            debug!(
                "Predicted {} ({:.1}%)",
                success.predicted_major, success.confidence
            );
            Ok(HttpResponse::Ok().json(success))
        }
        Err(e) => Ok(failure(&e)),
    }
}
