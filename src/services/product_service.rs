use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::products::{
        AddImageRequest, CreateProductRequest, ProductDetail, ProductList, UpdateProductRequest,
    },
    entity::{
        product_images::{
            ActiveModel as ImageActive, Column as ImageCol, Entity as ProductImages,
            Model as ImageModel,
        },
        products::{ActiveModel, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    models::{Product, ProductImage},
    response::{ApiResponse, PageMeta},
    routes::params::{ProductListQuery, SortColumn},
    state::AppState,
};

/// Filtered, sorted, paginated product listing. The sold-count aggregate is
/// joined in only when the response needs it.
pub async fn list_products(
    state: &AppState,
    query: ProductListQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, per_page, offset) = query.pagination.normalize();
    let (sort_col, sort_order) = query.resolve_sort();
    let with_sold_count = query.wants_sold_count();

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT p.id, p.slug, p.name, p.description, p.price, p.stock, p.rating, \
         p.category_id, p.height, p.length, p.weight, p.width, p.created_at, ",
    );
    if with_sold_count {
        builder.push(
            "COALESCE(s.sold_count, 0) AS sold_count FROM products p \
             LEFT JOIN (SELECT product_id, SUM(quantity)::BIGINT AS sold_count \
             FROM order_items GROUP BY product_id) s ON s.product_id = p.id",
        );
    } else {
        builder.push("NULL::BIGINT AS sold_count FROM products p");
    }
    push_filters(&mut builder, &query);

    builder.push(" ORDER BY ");
    builder.push(sort_col.as_sql());
    builder.push(" ");
    builder.push(sort_order.as_sql());
    if sort_col != SortColumn::Id {
        // stable page boundaries when the sort key ties
        builder.push(", p.id DESC");
    }
    builder.push(" LIMIT ");
    builder.push_bind(per_page);
    builder.push(" OFFSET ");
    builder.push_bind(offset);

    let items: Vec<Product> = builder
        .build_query_as::<Product>()
        .fetch_all(&state.pool)
        .await?;

    let mut count_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("SELECT COUNT(*) FROM products p");
    push_filters(&mut count_builder, &query);
    let total: i64 = count_builder
        .build_query_scalar::<i64>()
        .fetch_one(&state.pool)
        .await?;

    let meta = PageMeta::new(page, per_page, total);
    let data = ProductList { items };
    Ok(ApiResponse::success("Products", data, Some(meta)))
}

fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &ProductListQuery) {
    builder.push(" WHERE 1=1");

    if let Some(q) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", q);
        builder.push(" AND (p.name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR p.description ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    if let Some(category_id) = query.category_id {
        builder.push(" AND p.category_id = ");
        builder.push_bind(category_id);
    }
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ProductDetail>> {
    let product = Products::find_by_id(id).one(&state.orm).await?;
    let product = match product {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let images = ProductImages::find()
        .filter(ImageCol::ProductId.eq(id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(image_from_entity)
        .collect();

    let detail = ProductDetail {
        product: product_from_entity(product),
        images,
    };
    Ok(ApiResponse::success("Product", detail, None))
}

pub async fn create_product(
    state: &AppState,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    if payload.slug.is_empty() {
        return Err(AppError::BadRequest("slug must not be empty".into()));
    }

    // v7 ids are time-ordered, which keeps the id-descending "newest" sort
    // aligned with creation order.
    let id = Uuid::now_v7();
    let active = ActiveModel {
        id: Set(id),
        slug: Set(payload.slug),
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        stock: Set(payload.stock),
        rating: Set(payload.rating.unwrap_or_default()),
        category_id: Set(payload.category_id),
        height: Set(payload.height),
        length: Set(payload.length),
        weight: Set(payload.weight),
        width: Set(payload.width),
        created_at: NotSet,
    };
    let product = active.insert(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        None,
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Product created",
        product_from_entity(product),
        None,
    ))
}

pub async fn update_product(
    state: &AppState,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let mut active: ActiveModel = existing.into();
    if let Some(slug) = payload.slug {
        active.slug = Set(slug);
    }
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(rating) = payload.rating {
        active.rating = Set(rating);
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(category_id);
    }
    if let Some(height) = payload.height {
        active.height = Set(Some(height));
    }
    if let Some(length) = payload.length {
        active.length = Set(Some(length));
    }
    if let Some(weight) = payload.weight {
        active.weight = Set(Some(weight));
    }
    if let Some(width) = payload.width {
        active.width = Set(Some(width));
    }

    let product = active.update(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        None,
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Updated",
        product_from_entity(product),
        None,
    ))
}

/// Fails with a conflict while images or order items still reference the
/// product; callers delete the dependents first.
pub async fn delete_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = Products::delete_by_id(id).exec(&state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        &state.pool,
        None,
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Deleted", serde_json::json!({}), None))
}

pub async fn add_image(
    state: &AppState,
    product_id: Uuid,
    payload: AddImageRequest,
) -> AppResult<ApiResponse<ProductImage>> {
    let image = ImageActive {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        image: Set(payload.image),
    }
    .insert(&state.orm)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        None,
        "product_image_add",
        Some("product_images"),
        Some(serde_json::json!({ "product_id": product_id, "image_id": image.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Image added",
        image_from_entity(image),
        None,
    ))
}

pub async fn remove_image(
    state: &AppState,
    product_id: Uuid,
    image_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = ProductImages::delete_many()
        .filter(ImageCol::Id.eq(image_id))
        .filter(ImageCol::ProductId.eq(product_id))
        .exec(&state.orm)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        &state.pool,
        None,
        "product_image_remove",
        Some("product_images"),
        Some(serde_json::json!({ "product_id": product_id, "image_id": image_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("Deleted", serde_json::json!({}), None))
}

pub fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        slug: model.slug,
        name: model.name,
        description: model.description,
        price: model.price,
        stock: model.stock,
        rating: model.rating,
        category_id: model.category_id,
        height: model.height,
        length: model.length,
        weight: model.weight,
        width: model.width,
        created_at: model.created_at.with_timezone(&Utc),
        sold_count: None,
    }
}

fn image_from_entity(model: ImageModel) -> ProductImage {
    ProductImage {
        id: model.id,
        product_id: model.product_id,
        image: model.image,
    }
}
