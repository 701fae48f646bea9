use actix_web::{dev::Server, http::KeepAlive, web::Data, App, HttpServer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::BlockManagerApi;
use crate::core::builder::NodeInfo;

pub(crate) mod query;
pub(crate) mod submit;

/// Starts the HTTP server.
pub(crate) fn init(node_info: &NodeInfo, api: BlockManagerApi) -> anyhow::Result<Server> {
    print_startup_messages(node_info);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(Data::new(api.clone()))
            .service(query::health)
            .service(query::chain_status)
            .service(query::block_by_hash)
            .service(query::block_by_height)
            .service(query::last_block)
            .service(query::transaction_result)
            .service(query::transaction_by_hash)
            .service(submit::submit_transaction)
            .service(swagger_ui())
    })
    .keep_alive(KeepAlive::Os)
    .bind((node_info.ip.as_str(), node_info.http_port))?
    .run();
    Ok(server)
}

/// Builds the Swagger UI.
///
/// Note that all routes you want Swagger docs for must be in the `paths` annotation.
fn swagger_ui() -> SwaggerUi {
    use crate::api::types;
    #[derive(OpenApi)]
    #[openapi(
        paths(
            query::health,
            query::chain_status,
            query::block_by_hash,
            query::block_by_height,
            query::last_block,
            query::transaction_by_hash,
            query::transaction_result,
            submit::submit_transaction,
        ),
        components(schemas(
            types::Health,
            types::ApiTransactionSubmitted,
            types::ApiChainStatus,
        ))
    )]
    struct ApiDoc;
    SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-doc/openapi.json", ApiDoc::openapi())
}

fn print_startup_messages(info: &NodeInfo) {
    let http_root = info.api_address_http();
    log::info!("Server running on {}", http_root);
    log::info!("Swagger UI: {}/swagger-ui/", http_root);
    log::info!("OpenAPI spec is at: {}/api-doc/openapi.json", http_root);
}
