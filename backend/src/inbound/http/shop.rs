//! Marketplace shop information.
//!
//! ```text
//! GET /shop
//! ```

use actix_web::{HttpResponse, get, web};

use crate::inbound::http::ApiResult;
use crate::inbound::http::envelope::ok;
use crate::inbound::http::state::HttpState;

/// Shop profile as reported by the connected marketplace.
#[utoipa::path(
    get,
    path = "/shop",
    responses(
        (status = 200, description = "Marketplace shop information"),
        (status = 503, description = "Marketplace not configured or unreachable")
    ),
    tags = ["shop"],
    operation_id = "shopInfo"
)]
#[get("/shop")]
pub async fn shop_info(state: web::Data<HttpState>) -> ApiResult<HttpResponse> {
    let info = state.shop.shop_info().await?;
    Ok(ok("Success", vec![info]))
}
