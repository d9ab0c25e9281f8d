mod config;
mod inference;
mod pipeline;
mod remote;
mod routes;
mod upload;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{App, HttpServer, web};
use config::{AppConfig, origin_matches};
use inference::model::LesionModel;
use pipeline::ClassificationPipeline;
use remote::client::RemoteClassifier;
use remote::gradio::GradioTransport;
use routes::configure_routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    // Serving without a usable model is not allowed.
    let model = LesionModel::load(&config.model_path).map_err(|e| {
        log::error!("Failed to load model at startup: {}", e);
        std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Model loading failed: {}", e),
        )
    })?;
    let model = Arc::new(model);

    let transport = GradioTransport::new(config.remote.clone()).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::Other,
            format!("Failed to build remote client: {}", e),
        )
    })?;
    let space_id = transport.space_id().to_string();
    let pipeline = web::Data::new(ClassificationPipeline::new(
        RemoteClassifier::new(Arc::new(transport), space_id.clone()),
        model,
    ));

    let bind_address = format!("{}:{}", config.host, config.port);
    log::info!("Oral Lesion Classification API");
    log::info!("Hugging Face Space: {}", space_id);
    log::info!("Starting server on {}", bind_address);

    let allowed_origins = Arc::new(config.allowed_origins.clone());
    HttpServer::new(move || {
        let allowed_origins = allowed_origins.clone();
        App::new()
            .wrap(Logger::default())
            .wrap(
                Cors::default()
                    .allowed_origin_fn(move |origin, _req_head| {
                        origin.to_str().is_ok_and(|origin| {
                            allowed_origins
                                .iter()
                                .any(|pattern| origin_matches(pattern, origin))
                        })
                    })
                    .allowed_methods(vec!["GET", "POST", "OPTIONS"])
                    .allowed_headers(vec![
                        actix_web::http::header::AUTHORIZATION,
                        actix_web::http::header::ACCEPT,
                        actix_web::http::header::CONTENT_TYPE,
                    ])
                    .supports_credentials()
                    .max_age(3600),
            )
            .app_data(pipeline.clone())
            .configure(configure_routes)
    })
    .bind(&bind_address)?
    .run()
    .await
}
