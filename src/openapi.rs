use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "0.3.0",
        description = r#"
# Storefront API

Backend for an e-commerce storefront and its admin dashboard.

## Features

- **Catalog**: products, variants and categories with search and sorting
- **Carts**: guest and customer carts with server-side reconciliation
- **Promotions**: coupon codes and time-boxed flash sales
- **Checkout**: atomic cart-to-order conversion with guarded stock decrements
- **Orders**: fulfillment lifecycle with legal status transitions
- **Reviews & Wishlists**: customer engagement features
- **Admin**: back-office management for every resource

## Authentication

Customer and admin endpoints accept a JWT either as a `session` cookie
or in the Authorization header:

```
Authorization: Bearer <token>
```

## Error Handling

Errors use consistent JSON bodies with appropriate HTTP status codes:

```json
{
  "error": "Not Found",
  "message": "Product 'ceramic-mug' not found",
  "request_id": "req-abc123",
  "timestamp": "2025-11-03T10:30:00Z"
}
```

## Pagination

List endpoints accept `page` and `per_page` query parameters
(default 20, max 100 per page).
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080/api/v1", description = "Local development")
    ),
    tags(
        (name = "Products", description = "Catalog endpoints"),
        (name = "Carts", description = "Cart and reconciliation endpoints"),
        (name = "Checkout", description = "Cart-to-order conversion"),
        (name = "Orders", description = "Order lifecycle endpoints"),
        (name = "Promotions", description = "Coupon and flash sale endpoints"),
        (name = "Payments", description = "Payment processor callbacks"),
        (name = "Admin", description = "Back-office endpoints")
    ),
    paths(
        crate::handlers::payment_webhooks::payment_webhook,
    ),
    components(
        schemas(
            crate::ApiResponse<serde_json::Value>,
            crate::ListQuery,
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_generates() {
        let openapi = ApiDocV1::openapi();
        let json = serde_json::to_string(&openapi).unwrap();
        assert!(json.contains("Storefront API"));
        assert!(json.contains("/api/v1/payments/webhook"));
    }
}
