//! Product catalogue handlers.
//!
//! ```text
//! POST   /products         [{"name":"Desk lamp","description":null,"price":19.5}]
//! POST   /products         {"name":"Desk lamp","price":19.5}
//! GET    /products?page=1&limit=10&name=lamp&min_price=5&max_price=50
//! GET    /products/{id}
//! PUT    /products         [{"id":1,"price":17.0}]
//! DELETE /products         {"ids":[1,2]}
//! ```

use actix_web::{HttpResponse, delete, get, post, put, web};
use pagination::{DEFAULT_LIMIT, DEFAULT_PAGE, PageRequest};
use serde::{Deserialize, Deserializer};
use serde_json::json;

use crate::domain::entity::EntityId;
use crate::domain::ports::ProductListQuery;
use crate::domain::{Error, NewProduct, ProductChanges};
use crate::inbound::http::ApiResult;
use crate::inbound::http::envelope::{Envelope, created, ok};
use crate::inbound::http::state::HttpState;

/// One product in a `POST /products` batch.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
}

impl From<CreateProductRequest> for NewProduct {
    fn from(value: CreateProductRequest) -> Self {
        Self {
            name: value.name,
            description: value.description,
            price: value.price,
        }
    }
}

/// Body of `POST /products`: a single product or a batch.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
#[serde(untagged)]
pub enum CreateProductsBody {
    One(CreateProductRequest),
    Many(Vec<CreateProductRequest>),
}

impl CreateProductsBody {
    fn into_drafts(self) -> Vec<NewProduct> {
        match self {
            Self::One(product) => vec![product.into()],
            Self::Many(products) => products.into_iter().map(NewProduct::from).collect(),
        }
    }
}

/// One change set in a `PUT /products` batch. Omitted fields are kept;
/// an explicit `"description": null` clears the description.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct UpdateProductRequest {
    #[schema(value_type = i64)]
    pub id: EntityId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default)]
    pub price: Option<f64>,
}

/// Distinguish an explicit `null` from an absent field.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl From<UpdateProductRequest> for ProductChanges {
    fn from(value: UpdateProductRequest) -> Self {
        Self {
            id: value.id,
            name: value.name,
            description: value.description,
            price: value.price,
        }
    }
}

/// Body of `DELETE /products`.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct DeleteProductsRequest {
    #[serde(default)]
    #[schema(value_type = Vec<i64>)]
    pub ids: Vec<EntityId>,
}

/// Query string of `GET /products`.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListProductsParams {
    /// One-based page number (default 1).
    pub page: Option<u32>,
    /// Page size (default 10).
    pub limit: Option<u32>,
    /// Case-insensitive name substring.
    pub name: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl TryFrom<ListProductsParams> for ProductListQuery {
    type Error = Error;

    fn try_from(value: ListProductsParams) -> Result<Self, Self::Error> {
        let page = PageRequest::new(
            value.page.unwrap_or(DEFAULT_PAGE),
            value.limit.unwrap_or(DEFAULT_LIMIT),
        )
        .map_err(|err| {
            Error::invalid_request(err.to_string()).with_details(json!({ "code": "invalid_page" }))
        })?;
        Ok(Self {
            page,
            name: value.name.filter(|name| !name.trim().is_empty()),
            min_price: value.min_price,
            max_price: value.max_price,
            include_deleted: false,
        })
    }
}

fn product_id(raw: i64) -> Result<EntityId, Error> {
    EntityId::new(raw).map_err(|err| {
        Error::invalid_request(err.to_string()).with_details(json!({ "field": "id" }))
    })
}

/// Create one product or a batch of products, all or nothing.
#[utoipa::path(
    post,
    path = "/products",
    request_body = CreateProductsBody,
    responses(
        (status = 201, description = "Products created"),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Conflicting product")
    ),
    tags = ["products"],
    operation_id = "createProducts"
)]
#[post("/products")]
pub async fn create_products(
    state: web::Data<HttpState>,
    payload: web::Json<CreateProductsBody>,
) -> ApiResult<HttpResponse> {
    let drafts = payload.into_inner().into_drafts();
    let products = state.products.create(drafts).await?;
    Ok(created("Products created successfully!", products))
}

/// One page of products, newest change first.
#[utoipa::path(
    get,
    path = "/products",
    params(ListProductsParams),
    responses(
        (status = 200, description = "Page of products with pagination metadata"),
        (status = 400, description = "Invalid paging or filter parameters")
    ),
    tags = ["products"],
    operation_id = "listProducts"
)]
#[get("/products")]
pub async fn list_products(
    state: web::Data<HttpState>,
    params: web::Query<ListProductsParams>,
) -> ApiResult<HttpResponse> {
    let query = ProductListQuery::try_from(params.into_inner())?;
    let page = state.products.list(query).await?;
    Ok(Envelope::page("Get Products Successfully!", page).into_response())
}

/// A single product, including soft-deleted ones.
#[utoipa::path(
    get,
    path = "/products/{id}",
    params(("id" = i64, Path, description = "Product identifier")),
    responses(
        (status = 200, description = "Product detail"),
        (status = 404, description = "Data Not Found")
    ),
    tags = ["products"],
    operation_id = "getProduct"
)]
#[get("/products/{id}")]
pub async fn get_product(
    state: web::Data<HttpState>,
    path: web::Path<i64>,
) -> ApiResult<HttpResponse> {
    let id = product_id(path.into_inner())?;
    let product = state.products.get(id).await?;
    Ok(ok("Get Detail Product Successfully!", vec![product]))
}

/// Apply change sets to existing products.
#[utoipa::path(
    put,
    path = "/products",
    request_body = Vec<UpdateProductRequest>,
    responses(
        (status = 200, description = "Products updated"),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Some product IDs are invalid or not found.")
    ),
    tags = ["products"],
    operation_id = "updateProducts"
)]
#[put("/products")]
pub async fn update_products(
    state: web::Data<HttpState>,
    payload: web::Json<Vec<UpdateProductRequest>>,
) -> ApiResult<HttpResponse> {
    let changes = payload.into_inner().into_iter().map(ProductChanges::from).collect();
    let products = state.products.update(changes).await?;
    Ok(ok("Products updated successfully!", products))
}

/// Soft-delete products by identifier.
#[utoipa::path(
    delete,
    path = "/products",
    request_body = DeleteProductsRequest,
    responses(
        (status = 200, description = "Products soft deleted"),
        (status = 400, description = "Product IDs must be provided."),
        (status = 404, description = "Some product IDs are invalid or not found.")
    ),
    tags = ["products"],
    operation_id = "deleteProducts"
)]
#[delete("/products")]
pub async fn delete_products(
    state: web::Data<HttpState>,
    payload: web::Json<DeleteProductsRequest>,
) -> ApiResult<HttpResponse> {
    let deleted = state.products.delete(payload.into_inner().ids).await?;
    let data = deleted.into_iter().map(|id| json!({ "id": id })).collect();
    Ok(ok("Products soft deleted successfully!", data))
}
