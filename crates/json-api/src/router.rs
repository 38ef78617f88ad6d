//! App Router

use salvo::Router;

use crate::{admission, auth, carts, orders, products};

/// Every resource route, behind admission control and authentication.
///
/// The throttle runs first so a saturated server sheds load before doing any
/// work; identification precedes the rate limiter so signed-in callers are
/// counted under their own key.
pub(crate) fn app_router() -> Router {
    Router::new()
        .hoop(admission::throttle::throttle)
        .hoop(auth::middleware::identify)
        .hoop(admission::rate_limit::rate_limit)
        .hoop(auth::middleware::require_user)
        .push(resource_router())
}

fn resource_router() -> Router {
    Router::new()
        .push(
            Router::with_path("cart").get(carts::get::handler).push(
                Router::with_path("items")
                    .post(carts::items::create::handler)
                    .push(
                        Router::with_path("{item}")
                            .put(carts::items::update::handler)
                            .delete(carts::items::delete::handler),
                    ),
            ),
        )
        .push(
            Router::with_path("orders")
                .post(orders::create::handler)
                .push(
                    Router::with_path("{order}")
                        .get(orders::get::handler)
                        .push(Router::with_path("confirm").post(orders::confirm::handler))
                        .push(Router::with_path("cancel").post(orders::cancel::handler))
                        .push(
                            Router::with_path("items/{item}")
                                .put(orders::items::update::handler)
                                .delete(orders::items::delete::handler),
                        ),
                ),
        )
        .push(
            Router::with_path("products")
                .get(products::index::handler)
                .post(products::create::handler)
                .push(
                    Router::with_path("{product}")
                        .get(products::get::handler)
                        .push(Router::with_path("restock").post(products::restock::handler)),
                ),
        )
}
