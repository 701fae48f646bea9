use actix_web::{post, web, HttpResponse};
use serde_json::{Map, Value};

use crate::api::types::ApiTransactionSubmitted;
use crate::api::{ApiError, BlockManagerApi};

#[utoipa::path(
responses(
(status = 200, description = "Queue a transaction for the next block", body = ApiTransactionSubmitted),
(status = 400, description = "Invalid transaction"),
(status = 500, description = "Server failed to process request")),
)]
#[post("/block_manager/transaction")]
pub(crate) async fn submit_transaction(
    params: web::Json<Map<String, Value>>,
    api: web::Data<BlockManagerApi>,
) -> HttpResponse {
    log::debug!("POST /block_manager/transaction {:?}", params);

    match api.submit_transaction(params.into_inner()).await {
        Ok(tx_hash) => HttpResponse::Ok().json(ApiTransactionSubmitted { tx_hash }),
        Err(err) => match err {
            ApiError::InvalidTransaction(_) => {
                log::debug!("Rejected transaction: {err}");
                HttpResponse::BadRequest().json(err.to_string())
            }
            _ => {
                log::error!("Error submitting transaction: {}", err);
                HttpResponse::InternalServerError().json("Server failed to process request")
            }
        },
    }
}
