use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{
            ForgotPasswordRequest, ForgotPasswordResponse, LoginRequest, LoginResponse,
            RegisterRequest, ResetPasswordRequest, UpdateDetailsRequest,
        },
        cart::{AddToCartRequest, CartItemDto, CartList},
        orders::{
            AdminOrder, AdminOrderList, CheckoutLineItem, CreateCheckoutSessionRequest,
            DeletedOrders, OrderList, OrderWithItems, PlacedOrder, PurchasedLineItem,
            UpdateOrderStatusRequest, VerifyPaymentRequest,
        },
        products::{
            CreateProductRequest, CreatedProduct, ProductFilterQuery, ProductList, ReviewList,
            ReviewRequest, UpdateProductRequest,
        },
        users::{AddressList, AddressRequest, UpdateProfileRequest, UserList},
        wishlist::{
            AddWishlistRequest, UpdateWishlistRequest, UserWishlist, WishlistAction,
            WishlistPageQuery, WishlistProductList,
        },
    },
    models::{
        CartItem, Order, OrderItem, Product, ProductDetail, ProductImage, ProductSummary,
        ProductView, Review, User, UserAddress,
    },
    response::{ApiResponse, Meta},
    routes::{auth, cart, health, orders, params, products, users, wishlist},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::user_auth,
        auth::admin_auth,
        auth::forgot_password,
        auth::reset_password,
        auth::update_details,
        products::list_products,
        products::filtered_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::list_reviews,
        products::add_review,
        orders::list_orders,
        orders::get_order,
        orders::create_checkout_session,
        orders::verify_payment,
        orders::list_all_orders,
        orders::update_order_status,
        orders::delete_all_orders,
        users::list_users,
        users::user_orders,
        users::user_wishlist,
        users::wishlist_products,
        users::update_wishlist,
        users::put_wishlist,
        users::get_user,
        users::update_profile,
        users::deactivate_user,
        users::list_addresses,
        users::add_address,
        users::update_address,
        users::delete_address,
        wishlist::list_wishlist,
        wishlist::add_to_wishlist,
        wishlist::remove_from_wishlist,
        wishlist::admin_user_wishlist,
        cart::cart_list,
        cart::add_to_cart,
        cart::remove_from_cart
    ),
    components(
        schemas(
            User,
            UserAddress,
            Product,
            ProductImage,
            ProductView,
            ProductDetail,
            ProductSummary,
            Review,
            CartItem,
            Order,
            OrderItem,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            ForgotPasswordRequest,
            ForgotPasswordResponse,
            ResetPasswordRequest,
            UpdateDetailsRequest,
            CreateProductRequest,
            UpdateProductRequest,
            ProductFilterQuery,
            CreatedProduct,
            ProductList,
            ReviewRequest,
            ReviewList,
            CheckoutLineItem,
            CreateCheckoutSessionRequest,
            PurchasedLineItem,
            VerifyPaymentRequest,
            PlacedOrder,
            OrderWithItems,
            OrderList,
            AdminOrder,
            AdminOrderList,
            UpdateOrderStatusRequest,
            DeletedOrders,
            UpdateProfileRequest,
            AddressRequest,
            AddressList,
            UserList,
            AddWishlistRequest,
            WishlistAction,
            UpdateWishlistRequest,
            WishlistPageQuery,
            WishlistProductList,
            UserWishlist,
            AddToCartRequest,
            CartItemDto,
            CartList,
            params::Pagination,
            Meta,
            ApiResponse<User>,
            ApiResponse<ProductList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<PlacedOrder>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and password reset"),
        (name = "Products", description = "Catalog and reviews"),
        (name = "Orders", description = "Checkout and order history"),
        (name = "Admin", description = "Order administration"),
        (name = "Users", description = "Profiles, addresses and wishlist views"),
        (name = "Wishlist", description = "Wishlist endpoints"),
        (name = "Cart", description = "Cart endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
