use actix_web::{get, web, HttpResponse, Responder};

use crate::api::types::Health;
use crate::api::BlockManagerApi;
use crate::utilities::hash::HashType;

#[utoipa::path(
responses(
(status = 200, description = "Endpoint to check if the server is running")),
)]
#[get("/block_manager/health")]
pub(crate) async fn health() -> impl Responder {
    log::debug!("GET /block_manager/health");
    HttpResponse::Ok().json(Health {
        status: "OK".to_string(),
    })
}

#[utoipa::path(
responses(
(status = 200, description = "Height and hash of the last committed block"),
(status = 500, description = "Server failed to process request")),
)]
#[get("/block_manager/status")]
pub(crate) async fn chain_status(api: web::Data<BlockManagerApi>) -> impl Responder {
    log::debug!("GET /block_manager/status");

    match api.get_chain_status().await {
        Ok(status) => HttpResponse::Ok().json(status),
        Err(err) => {
            log::error!("Failed to get chain status: {err}",);
            HttpResponse::InternalServerError().json("Server failed to process request")
        }
    }
}

#[utoipa::path(
responses(
(status = 200, description = "GET block by hash"),
(status = 400, description = "Invalid block hash"),
(status = 404, description = "Block not found"),
(status = 500, description = "Server failed to process request")),
params(("hash", description = "Block hash")),
)]
#[get("/block_manager/block/{hash}")]
pub(crate) async fn block_by_hash(
    hash: web::Path<String>,
    api: web::Data<BlockManagerApi>,
) -> impl Responder {
    log::debug!("GET /block_manager/block/{hash}",);

    let hash = match hash.parse::<HashType>() {
        Ok(hash) => hash,
        Err(err) => {
            log::debug!("Invalid block hash {hash}: {err}");
            return HttpResponse::BadRequest().json("Invalid block hash");
        }
    };

    match api.get_block_by_hash(hash).await {
        Ok(Some(block)) => HttpResponse::Ok().json(block),
        Ok(_) => HttpResponse::NotFound().json("Block not found"),
        Err(err) => {
            log::error!("Failed to get block by hash: {err}",);
            HttpResponse::InternalServerError().json("Server failed to process request")
        }
    }
}

#[utoipa::path(
responses(
(status = 200, description = "Get block by height"),
(status = 404, description = "Block not found"),
(status = 500, description = "Server failed to process request")),
params(("height", description = "Block height")),
)]
#[get("/block_manager/block/height/{height}")]
pub(crate) async fn block_by_height(
    height: web::Path<u64>,
    api: web::Data<BlockManagerApi>,
) -> impl Responder {
    log::debug!("GET /block_manager/block/height/{height}");

    match api.get_block_by_height(height.into_inner()).await {
        Ok(Some(block)) => HttpResponse::Ok().json(block),
        Ok(_) => HttpResponse::NotFound().json("Block not found"),
        Err(err) => {
            log::error!("Failed to get block {err}",);
            HttpResponse::InternalServerError().json("Server failed to process request")
        }
    }
}

#[utoipa::path(
responses(
(status = 200, description = "Get last block"),
(status = 500, description = "Server failed to process request")),
)]
//Need to use plural(blocks), otherwise overlaps with block_by_hash route
#[get("/block_manager/blocks/last")]
pub(crate) async fn last_block(api: web::Data<BlockManagerApi>) -> impl Responder {
    log::debug!("GET /block_manager/blocks/last");

    match api.get_last_block().await {
        Ok(block) => HttpResponse::Ok().json(block),
        Err(err) => {
            log::error!("Failed to get block {err}",);
            HttpResponse::InternalServerError().json("Server failed to process request")
        }
    }
}

#[utoipa::path(
responses(
(status = 200, description = "Get committed transaction by hash"),
(status = 404, description = "Transaction not found"),
(status = 500, description = "Server failed to process request")),
params(("hash", description = "Transaction hash")),
)]
#[get("/block_manager/transaction/{hash}")]
pub(crate) async fn transaction_by_hash(
    hash: web::Path<String>,
    api: web::Data<BlockManagerApi>,
) -> impl Responder {
    log::debug!("GET /block_manager/transaction/{hash}");

    match api.get_transaction(hash.into_inner()).await {
        Ok(Some(tx)) => HttpResponse::Ok().json(tx),
        Ok(_) => HttpResponse::NotFound().json("Transaction not found"),
        Err(err) => {
            log::error!("Failed to get transaction {err}",);
            HttpResponse::InternalServerError().json("Server failed to process request")
        }
    }
}

#[utoipa::path(
responses(
(status = 200, description = "Get transaction result by transaction hash"),
(status = 404, description = "Transaction result not found"),
(status = 500, description = "Server failed to process request")),
params(("hash", description = "Transaction hash")),
)]
#[get("/block_manager/transaction/result/{hash}")]
pub(crate) async fn transaction_result(
    hash: web::Path<String>,
    api: web::Data<BlockManagerApi>,
) -> impl Responder {
    log::debug!("GET /block_manager/transaction/result/{hash}");

    match api.get_transaction_result(hash.into_inner()).await {
        Ok(Some(result)) => HttpResponse::Ok().json(result),
        Ok(_) => HttpResponse::NotFound().json("Transaction result not found"),
        Err(err) => {
            log::error!("Failed to get transaction result {err}",);
            HttpResponse::InternalServerError().json("Server failed to process request")
        }
    }
}
