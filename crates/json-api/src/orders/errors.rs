//! Order Errors

use salvo::http::StatusError;
use tracing::error;

use storefront_app::domain::orders::OrdersServiceError;

pub(crate) fn into_status_error(error: OrdersServiceError) -> StatusError {
    match error {
        OrdersServiceError::CartNotFound => StatusError::not_found().brief("No active cart"),
        OrdersServiceError::NotFound => StatusError::not_found().brief("Order or item not found"),
        OrdersServiceError::EmptyCart | OrdersServiceError::AddressRequired => {
            StatusError::unprocessable_entity().brief(error.to_string())
        }
        OrdersServiceError::InsufficientStock { .. } | OrdersServiceError::InvalidStatus { .. } => {
            StatusError::conflict().brief(error.to_string())
        }
        OrdersServiceError::InvalidQuantity => {
            StatusError::bad_request().brief("Quantity must be greater than zero")
        }
        OrdersServiceError::Transaction(source) => {
            error!("order transaction failed: {source}");

            StatusError::internal_server_error()
        }
    }
}
