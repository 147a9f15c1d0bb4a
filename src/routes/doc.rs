use utoipa::OpenApi;
use utoipa::openapi::OpenApi as OpenApiSpec;
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        categories::{CategoryList, CreateCategoryRequest},
        orders::{CheckoutItem, CheckoutRequest, OrderList, OrderWithItems, UpdateOrderStatusRequest},
        products::{
            AddImageRequest, CreateProductRequest, ProductDetail, ProductList,
            UpdateProductRequest,
        },
        users::CreateUserRequest,
    },
    models::{Category, Order, OrderItem, OrderStatus, Product, ProductImage, User},
    response::{ApiResponse, PageMeta},
    routes::{categories, health, orders, params, products, users},
};

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        products::add_image,
        products::remove_image,
        categories::list_categories,
        categories::create_category,
        categories::delete_category,
        orders::list_orders,
        orders::checkout,
        orders::get_order,
        orders::update_order_status,
        users::create_user,
        users::get_user
    ),
    components(
        schemas(
            User,
            Category,
            Product,
            ProductImage,
            Order,
            OrderItem,
            OrderStatus,
            ProductList,
            ProductDetail,
            CategoryList,
            OrderList,
            OrderWithItems,
            CreateProductRequest,
            UpdateProductRequest,
            AddImageRequest,
            CreateCategoryRequest,
            CheckoutRequest,
            CheckoutItem,
            UpdateOrderStatusRequest,
            CreateUserRequest,
            params::Pagination,
            params::SortOrder,
            params::ProductListQuery,
            params::OrderListQuery,
            PageMeta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<ProductDetail>,
            ApiResponse<CategoryList>,
            ApiResponse<OrderList>,
            ApiResponse<OrderWithItems>
        )
    ),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Product listing and catalog management"),
        (name = "Categories", description = "Category endpoints"),
        (name = "Orders", description = "Checkout and order endpoints"),
        (name = "Users", description = "User endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
