use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use ulid::Ulid;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{CheckoutRequest, OrderList, OrderWithItems, UpdateOrderStatusRequest},
    entity::{
        categories::Entity as Categories,
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    models::{Order, OrderItem, OrderStatus},
    response::{ApiResponse, PageMeta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

pub async fn list_orders(
    state: &AppState,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, per_page, offset) = query.pagination.normalize();
    let mut condition = Condition::all();
    if let Some(user_id) = query.user_id {
        condition = condition.add(OrderCol::UserId.eq(user_id));
    }
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);

    let mut finder = Orders::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(per_page as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_from_entity)
        .collect();

    let meta = PageMeta::new(page, per_page, total);
    Ok(ApiResponse::success(
        "Orders",
        OrderList { items: orders },
        Some(meta),
    ))
}

/// Checkout is all-or-nothing: stock checks, the order row, every item
/// snapshot and every stock decrement commit together or not at all.
pub async fn checkout(
    state: &AppState,
    payload: CheckoutRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    if payload.items.is_empty() {
        return Err(AppError::BadRequest("Order has no items".into()));
    }
    for item in &payload.items {
        if item.quantity <= 0 {
            return Err(AppError::BadRequest("Quantity must be positive".into()));
        }
    }
    if payload.shipping_cost.is_sign_negative() {
        return Err(AppError::BadRequest("Shipping cost must not be negative".into()));
    }

    let txn = state.orm.begin().await?;

    let mut category_names: HashMap<Uuid, String> = HashMap::new();
    let order_id = Ulid::new().to_string();
    let order_number = build_order_number(&order_id);

    let mut subtotal = rust_decimal::Decimal::ZERO;
    let mut pending_items: Vec<OrderItemActive> = Vec::with_capacity(payload.items.len());

    for item in &payload.items {
        let product = Products::find_by_id(item.product_id)
            .lock(LockType::Update)
            .one(&txn)
            .await?;
        let product = match product {
            Some(p) => p,
            None => {
                return Err(AppError::BadRequest(format!(
                    "Unknown product {}",
                    item.product_id
                )));
            }
        };

        if product.stock < item.quantity {
            return Err(AppError::BadRequest(format!(
                "Insufficient stock for product {}",
                product.id
            )));
        }

        let category_name = match category_names.get(&product.category_id) {
            Some(name) => name.clone(),
            None => {
                let category = Categories::find_by_id(product.category_id)
                    .one(&txn)
                    .await?
                    .ok_or(AppError::NotFound)?;
                category_names.insert(product.category_id, category.name.clone());
                category.name
            }
        };

        let line_total = product.price * rust_decimal::Decimal::from(item.quantity);
        subtotal += line_total;

        // Snapshot of the product at purchase time; later product edits must
        // not show through on the order.
        pending_items.push(OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id.clone()),
            product_id: Set(product.id),
            name: Set(product.name.clone()),
            description: Set(product.description.clone()),
            category_name: Set(category_name),
            price: Set(product.price),
            height: Set(product.height),
            length: Set(product.length),
            weight: Set(product.weight),
            width: Set(product.width),
            quantity: Set(item.quantity),
            created_at: NotSet,
        });

        Products::update_many()
            .col_expr(ProdCol::Stock, Expr::col(ProdCol::Stock).sub(item.quantity))
            .filter(ProdCol::Id.eq(product.id))
            .exec(&txn)
            .await?;
    }

    let subtotal = subtotal.round_dp(2);
    let shipping_cost = payload.shipping_cost.round_dp(2);
    let total = subtotal + shipping_cost;

    let order = OrderActive {
        id: Set(order_id),
        order_number: Set(order_number),
        user_id: Set(payload.user_id),
        subtotal: Set(subtotal),
        shipping_cost: Set(shipping_cost),
        total: Set(total),
        recipient_name: Set(payload.recipient_name),
        recipient_phone: Set(payload.recipient_phone),
        recipient_address: Set(payload.recipient_address),
        shipper_name: Set(payload.shipper_name),
        shipper_phone: Set(payload.shipper_phone),
        shipper_address: Set(payload.shipper_address),
        courier: Set(payload.courier),
        courier_service: Set(payload.courier_service),
        status: Set(OrderStatus::Pending.as_str().into()),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut order_items: Vec<OrderItem> = Vec::with_capacity(pending_items.len());
    for pending in pending_items {
        let item = pending.insert(&txn).await?;
        order_items.push(order_item_from_entity(item));
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(order.user_id),
        "checkout",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id.clone() })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Order placed",
        OrderWithItems {
            order: order_from_entity(order),
            items: order_items,
        },
        None,
    ))
}

pub async fn get_order(state: &AppState, id: String) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id.clone()))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(order_item_from_entity)
        .collect();

    Ok(ApiResponse::success(
        "Order",
        OrderWithItems {
            order: order_from_entity(order),
            items,
        },
        None,
    ))
}

/// Status only moves forward along pending -> shipped -> delivered.
pub async fn update_order_status(
    state: &AppState,
    id: String,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let current = OrderStatus::parse(&order.status)
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("unknown stored status {}", order.status)))?;
    if !current.can_transition_to(payload.status) {
        return Err(AppError::BadRequest(format!(
            "Cannot move order from {} to {}",
            current.as_str(),
            payload.status.as_str()
        )));
    }

    let mut active: OrderActive = order.into();
    active.status = Set(payload.status.as_str().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(order.user_id),
        "order_status_update",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id.clone(), "status": order.status.clone() })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Status updated",
        order_from_entity(order),
        None,
    ))
}

fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        order_number: model.order_number,
        user_id: model.user_id,
        subtotal: model.subtotal,
        shipping_cost: model.shipping_cost,
        total: model.total,
        recipient_name: model.recipient_name,
        recipient_phone: model.recipient_phone,
        recipient_address: model.recipient_address,
        shipper_name: model.shipper_name,
        shipper_phone: model.shipper_phone,
        shipper_address: model.shipper_address,
        courier: model.courier,
        courier_service: model.courier_service,
        status: model.status,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        name: model.name,
        description: model.description,
        category_name: model.category_name,
        price: model.price,
        height: model.height,
        length: model.length,
        weight: model.weight,
        width: model.width,
        quantity: model.quantity,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn build_order_number(order_id: &str) -> String {
    let date = Utc::now().format("%Y%m%d");
    let suffix = &order_id[order_id.len() - 8..];
    format!("ORD-{}-{}", date, suffix)
}
