use actix_web::{Error, HttpRequest, HttpResponse, web};
use log::info;
use shared::{HealthResponse, Level2Response};

use crate::pipeline::ClassificationPipeline;
use crate::upload::read_image;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .service(web::resource("/health").route(web::get().to(health_check)))
            .service(web::resource("/classify").route(web::post().to(classify_lesion)))
            .service(web::resource("/classify/level2").route(web::post().to(classify_level2_only))),
    );
}

async fn health_check(pipeline: web::Data<ClassificationPipeline>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        message: "Oral Lesion Classification API is running".to_string(),
        huggingface_space: pipeline.service_id().to_string(),
    })
}

/// Healthy/unhealthy screening, then malignant/benign for unhealthy images.
async fn classify_lesion(
    req: HttpRequest,
    payload: web::Payload,
    pipeline: web::Data<ClassificationPipeline>,
) -> Result<HttpResponse, Error> {
    let image_bytes = read_image(&req, payload).await?;
    let response = pipeline.classify(&image_bytes).await?;
    Ok(HttpResponse::Ok().json(response))
}

/// Malignant/benign only, for checking the local model on its own.
async fn classify_level2_only(
    req: HttpRequest,
    payload: web::Payload,
    pipeline: web::Data<ClassificationPipeline>,
) -> Result<HttpResponse, Error> {
    let image_bytes = read_image(&req, payload).await?;
    let result = pipeline.classify_level2_only(&image_bytes).await?;
    info!(
        "Level 2 only: {} ({}%)",
        result.classification, result.confidence
    );
    Ok(HttpResponse::Ok().json(Level2Response::from(&result)))
}
