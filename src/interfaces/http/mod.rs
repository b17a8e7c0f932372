use actix_cors::Cors;
use actix_web::error::InternalError;
use actix_web::http::StatusCode;
use actix_web::{
    dev::Server, get, middleware, post, web, App, HttpResponse, HttpServer, Responder,
    ResponseError,
};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::application::use_cases::model_loader::LoadedModel;
use crate::application::use_cases::prediction::PredictionUseCase;
use crate::domain::error::{AppError, Result};
use crate::domain::inference::InferenceRequest;

/// Shared state for request handlers. Built once before the server binds.
pub struct ServiceContext {
    pub loaded: LoadedModel,
    pub prediction: PredictionUseCase,
}

impl ServiceContext {
    pub fn new(loaded: LoadedModel, strict_validation: bool) -> Result<Self> {
        let prediction =
            PredictionUseCase::new(loaded.model.clone())?.with_range_checks(strict_validation);
        Ok(Self { loaded, prediction })
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            detail: self.to_string(),
        })
    }
}

/// Malformed bodies, wrong types and missing fields all answer 422.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let detail = err.to_string();
        warn!(error = %detail, "Rejected request body");
        InternalError::from_response(
            err,
            HttpResponse::UnprocessableEntity().json(ErrorBody { detail }),
        )
        .into()
    })
}

#[get("/")]
async fn root() -> impl Responder {
    HttpResponse::Ok().json(json!({ "message": "API is up and running!" }))
}

#[post("/predict")]
async fn predict(
    ctx: web::Data<ServiceContext>,
    req: web::Json<InferenceRequest>,
) -> std::result::Result<HttpResponse, AppError> {
    info!(request_id = req.request_id, "Received prediction request");

    let response = ctx.prediction.predict(&req)?;
    info!(
        request_id = req.request_id,
        label = response.label,
        model_source = %ctx.loaded.source,
        "Prediction served"
    );

    Ok(HttpResponse::Ok().json(response))
}

/// Routes and extractor config, shared by the server and tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config()).service(root).service(predict);
}

pub fn start_server(ctx: web::Data<ServiceContext>, host: &str, port: u16) -> std::io::Result<Server> {
    info!(host = %host, port, model = %ctx.loaded.model, "Starting inference API");

    let server = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(ctx.clone())
            .configure(configure)
    })
    .bind((host, port))?
    .run();

    Ok(server)
}
